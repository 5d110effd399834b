pub(crate) mod decode;
pub(crate) mod keypath;
pub(crate) mod model;
pub(crate) mod validate;
