pub(crate) mod buffer;
pub(crate) mod composite;
pub(crate) mod cpu;
pub(crate) mod paint;
pub(crate) mod raster;
