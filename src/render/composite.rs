use crate::{
    foundation::core::{Rgb8, Rgba8},
    foundation::math::mul_div255_u8,
};

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over of a premultiplied `src` scaled by `opacity` onto `dst`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Premultiply a straight-alpha color.
pub fn premultiply(c: Rgba8) -> PremulRgba8 {
    let a = u16::from(c.a);
    [
        mul_div255_u8(u16::from(c.r), a),
        mul_div255_u8(u16::from(c.g), a),
        mul_div255_u8(u16::from(c.b), a),
        c.a,
    ]
}

/// Undo premultiplication; fully transparent pixels become `[0, 0, 0, 0]`.
pub fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0; 4];
    }
    let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), px[3]]
}

/// Composite a premultiplied pixel over an opaque background. The result is opaque.
///
/// Uses truncating division for the background term.
pub fn flatten_on(px: PremulRgba8, bg: Rgb8) -> PremulRgba8 {
    let inv = 255 - u32::from(px[3]);
    let blend = |c: u8, b: u8| {
        let v = u32::from(c) + u32::from(b) * inv / 255;
        v.min(255) as u8
    };
    [blend(px[0], bg.r), blend(px[1], bg.g), blend(px[2], bg.b), 255]
}

/// Rec. 601 luma of a premultiplied pixel in `[0, 1]`; transparent pixels read as 0.
pub fn premul_luma(px: PremulRgba8) -> f32 {
    Rgba8::opaque(px[0], px[1], px[2]).luma()
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
