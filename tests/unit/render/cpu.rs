use super::*;
use crate::{
    eval::evaluator::Evaluator, foundation::core::FrameIndex, scene::model::SceneGraph,
};

fn opts() -> RasterOpts {
    RasterOpts {
        background: None,
        subsamples: 4,
        tolerance: 0.1,
    }
}

fn list(layers: &str) -> RenderList {
    let scene: SceneGraph = serde_json::from_str(&format!(
        r#"{{ "width": 10, "height": 10, "frame_rate": 10.0, "total_frames": 1, "layers": {layers} }}"#
    ))
    .unwrap();
    Evaluator::evaluate(&scene, FrameIndex(0)).unwrap()
}

fn rect(x0: u32, y0: u32, x1: u32, y1: u32, rgba: &str) -> String {
    format!(
        r#"{{ "shape": {{ "geometry": {{ "rect": {{ "rect": [{x0},{y0},{x1},{y1}] }} }},
             "fill": {{ "paint": {{ "solid": {rgba} }} }} }} }}"#
    )
}

fn red_full() -> String {
    rect(0, 0, 10, 10, "[255,0,0,255]")
}

fn alpha_at(buf: &FrameBuffer, x: u32, y: u32) -> u8 {
    buf.pixel(x, y).unwrap()[3]
}

#[test]
fn full_square_covers_every_pixel() {
    let buf = Rasterizer::new(opts())
        .render(&list(&format!("[ {} ]", red_full())), 10, 10)
        .unwrap();
    assert!(buf.pixels().iter().all(|px| *px == [255, 0, 0, 255]));
}

#[test]
fn render_into_clears_previous_content() {
    let raster = Rasterizer::new(opts());
    let mut buf = raster
        .render(&list(&format!("[ {} ]", red_full())), 10, 10)
        .unwrap();
    raster.render_into(&list("[]"), &mut buf).unwrap();
    assert!(buf.pixels().iter().all(|px| *px == [0, 0, 0, 0]));
}

#[test]
fn half_opacity_mask_halves_alpha() {
    let l = list(&format!(
        r#"[ {{ "layer": {{ "masks": [ {{ "geometry": {{ "rect": {{ "rect": [0,0,10,10] }} }}, "opacity": 0.5 }} ],
              "children": [ {} ] }} }} ]"#,
        red_full()
    ));
    let buf = Rasterizer::new(opts()).render(&l, 10, 10).unwrap();
    assert_eq!(buf.pixel(4, 4), Some([128, 0, 0, 128]));
}

#[test]
fn subtract_mask_starts_from_full_coverage() {
    let l = list(&format!(
        r#"[ {{ "layer": {{ "masks": [ {{ "geometry": {{ "rect": {{ "rect": [0,0,5,10] }} }}, "mode": "subtract" }} ],
              "children": [ {} ] }} }} ]"#,
        red_full()
    ));
    let buf = Rasterizer::new(opts()).render(&l, 10, 10).unwrap();
    assert_eq!(alpha_at(&buf, 2, 5), 0);
    assert_eq!(alpha_at(&buf, 7, 5), 255);
}

#[test]
fn clip_limits_children() {
    let l = list(&format!(
        r#"[ {{ "layer": {{ "clip": {{ "rect": {{ "rect": [0,0,5,10] }} }}, "children": [ {} ] }} }} ]"#,
        red_full()
    ));
    let buf = Rasterizer::new(opts()).render(&l, 10, 10).unwrap();
    assert_eq!(alpha_at(&buf, 2, 2), 255);
    assert_eq!(alpha_at(&buf, 7, 2), 0);
}

#[test]
fn overlapping_children_share_one_mask() {
    let l = list(&format!(
        r#"[ {{ "layer": {{ "masks": [ {{ "geometry": {{ "rect": {{ "rect": [0,0,10,10] }} }}, "opacity": 0.5 }} ],
              "children": [ {0}, {0} ] }} }} ]"#,
        red_full()
    ));
    let buf = Rasterizer::new(opts()).render(&l, 10, 10).unwrap();
    assert!(buf.pixels().iter().all(|px| *px == [128, 0, 0, 128]));
}

#[test]
fn nested_masks_gate_each_composite_once() {
    let mask = r#"{ "geometry": { "rect": { "rect": [0,0,10,10] } }, "opacity": 0.5 }"#;
    let l = list(&format!(
        r#"[ {{ "layer": {{ "masks": [ {mask} ], "children": [
              {{ "layer": {{ "masks": [ {mask} ], "children": [ {red}, {red} ] }} }} ] }} }} ]"#,
        red = red_full()
    ));
    let buf = Rasterizer::new(opts()).render(&l, 10, 10).unwrap();
    assert_eq!(buf.pixel(3, 3), Some([64, 0, 0, 64]));
}

fn matte_scene(mode: &str, source_rgba: &str) -> RenderList {
    list(&format!(
        r#"[ {{ "layer": {{ "id": "m", "children": [ {} ] }} }},
             {{ "layer": {{ "id": "t", "matte": {{ "source": "m", "mode": "{mode}" }}, "children": [ {} ] }} }} ]"#,
        rect(0, 0, 5, 10, source_rgba),
        red_full()
    ))
}

#[test]
fn alpha_matte_gates_by_source_alpha() {
    let buf = Rasterizer::new(opts())
        .render(&matte_scene("alpha", "[0,0,255,255]"), 10, 10)
        .unwrap();
    assert_eq!(buf.pixel(2, 5), Some([255, 0, 0, 255]));
    assert_eq!(buf.pixel(7, 5), Some([0, 0, 0, 0]));
}

#[test]
fn inverted_alpha_matte_gates_outside_source() {
    let buf = Rasterizer::new(opts())
        .render(&matte_scene("alpha_inverted", "[0,0,255,255]"), 10, 10)
        .unwrap();
    assert_eq!(alpha_at(&buf, 2, 5), 0);
    assert_eq!(alpha_at(&buf, 7, 5), 255);
}

#[test]
fn luma_matte_uses_source_brightness() {
    let raster = Rasterizer::new(opts());
    let white = raster
        .render(&matte_scene("luma", "[255,255,255,255]"), 10, 10)
        .unwrap();
    assert_eq!(alpha_at(&white, 2, 5), 255);
    assert_eq!(alpha_at(&white, 7, 5), 0);

    let black = raster
        .render(&matte_scene("luma", "[0,0,0,255]"), 10, 10)
        .unwrap();
    assert_eq!(alpha_at(&black, 2, 5), 0);

    let inverted = raster
        .render(&matte_scene("luma_inverted", "[0,0,0,255]"), 10, 10)
        .unwrap();
    assert_eq!(alpha_at(&inverted, 2, 5), 255);
    assert_eq!(alpha_at(&inverted, 7, 5), 255);
}

#[test]
fn overlapping_children_share_one_matte() {
    let l = list(&format!(
        r#"[ {{ "layer": {{ "id": "m", "children": [ {} ] }} }},
             {{ "layer": {{ "id": "t", "matte": {{ "source": "m" }}, "children": [ {1}, {1} ] }} }} ]"#,
        rect(0, 0, 10, 10, "[0,0,255,128]"),
        red_full()
    ));
    let buf = Rasterizer::new(opts()).render(&l, 10, 10).unwrap();
    assert!(buf.pixels().iter().all(|px| *px == [128, 0, 0, 128]));
}

#[test]
fn stroke_paints_only_the_outline() {
    let l = list(
        r#"[ { "shape": { "geometry": { "rect": { "rect": [2,2,8,8] } },
               "stroke": { "paint": { "solid": [0,255,0,255] }, "width": 2 } } } ]"#,
    );
    let buf = Rasterizer::new(opts()).render(&l, 10, 10).unwrap();
    assert_eq!(alpha_at(&buf, 5, 5), 0);
    assert_eq!(alpha_at(&buf, 1, 5), 255);
    assert_eq!(alpha_at(&buf, 2, 5), 255);
    assert_eq!(alpha_at(&buf, 0, 5), 0);
}

#[test]
fn viewport_fits_and_centers_the_scene() {
    let vp = viewport(Canvas::new(10, 10), Canvas::new(20, 10));
    let p = vp * kurbo::Point::new(0.0, 0.0);
    assert!((p.x - 5.0).abs() < 1e-9 && p.y.abs() < 1e-9);
    assert_eq!(viewport(Canvas::new(10, 10), Canvas::new(10, 10)), Affine::IDENTITY);

    let buf = Rasterizer::new(opts())
        .render(&list(&format!("[ {} ]", red_full())), 20, 10)
        .unwrap();
    assert_eq!(alpha_at(&buf, 4, 5), 0);
    assert_eq!(alpha_at(&buf, 5, 5), 255);
    assert_eq!(alpha_at(&buf, 14, 5), 255);
    assert_eq!(alpha_at(&buf, 15, 5), 0);
}

#[test]
fn background_is_flattened_under_translucent_paint() {
    let raster = Rasterizer::new(RasterOpts {
        background: Some(Rgb8::WHITE),
        ..opts()
    });
    let empty = raster.render(&list("[]"), 4, 4).unwrap();
    assert!(empty.pixels().iter().all(|px| *px == [255, 255, 255, 255]));

    let l = list(&format!(
        r#"[ {{ "layer": {{ "opacity": 0.5, "children": [ {} ] }} }} ]"#,
        red_full()
    ));
    let buf = raster.render(&l, 10, 10).unwrap();
    assert_eq!(buf.pixel(3, 3), Some([255, 127, 127, 255]));
}

#[test]
fn zero_sized_output_is_a_no_op() {
    let buf = Rasterizer::new(opts())
        .render(&list(&format!("[ {} ]", red_full())), 0, 0)
        .unwrap();
    assert!(buf.pixels().is_empty());
}
