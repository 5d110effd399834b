use std::io::Write as _;

use super::*;

const SCENE: &str = r#"{
  "width": 20, "height": 10, "frame_rate": 25.0, "total_frames": 50,
  "markers": [{ "name": "intro", "start": 0, "end": 24 }],
  "layers": [ { "layer": { "id": "bg", "children": [
      { "shape": { "id": "box", "geometry": { "rect": { "rect": [0,0,20,10] } },
                   "fill": { "paint": { "solid": [0,0,255,255] } } } } ] } } ]
}"#;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "lottie2gif_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn metadata_queries() {
    let anim = Animation::from_data(SCENE, None).unwrap();
    assert_eq!(anim.size(), Canvas::new(20, 10));
    assert_eq!(anim.total_frames(), 50);
    assert_eq!(anim.frame_rate(), 25.0);
    assert!((anim.duration_secs() - 2.0).abs() < 1e-12);
    assert_eq!(anim.markers()[0].name, "intro");
    assert!(anim.resource_path().is_none());
}

#[test]
fn frame_at_pos_rounds_and_clamps() {
    let anim = Animation::from_data(SCENE, None).unwrap();
    assert_eq!(anim.frame_at_pos(0.0), FrameIndex(0));
    assert_eq!(anim.frame_at_pos(1.0), FrameIndex(49));
    assert_eq!(anim.frame_at_pos(0.5), FrameIndex(25));
    assert_eq!(anim.frame_at_pos(-3.0), FrameIndex(0));
    assert_eq!(anim.frame_at_pos(7.0), FrameIndex(49));
}

#[test]
fn malformed_input_is_scene_load_failed() {
    assert!(matches!(
        Animation::from_data("{ not json", None),
        Err(LottieError::SceneLoadFailed(_))
    ));
    let invalid = SCENE.replace("\"frame_rate\": 25.0", "\"frame_rate\": 0.0");
    assert!(matches!(
        Animation::from_data(&invalid, None),
        Err(LottieError::SceneLoadFailed(_))
    ));
}

#[test]
fn from_scene_validates() {
    let mut scene: SceneGraph = serde_json::from_str(SCENE).unwrap();
    scene.total_frames = 0;
    assert!(matches!(
        Animation::from_scene(scene),
        Err(LottieError::SceneInvalid(_))
    ));
}

#[test]
fn from_path_reads_json_and_tgs() {
    let dir = temp_path("decode");
    std::fs::create_dir_all(&dir).unwrap();

    let json = dir.join("scene.json");
    std::fs::write(&json, SCENE).unwrap();
    let anim = Animation::from_path(&json).unwrap();
    assert_eq!(anim.total_frames(), 50);
    assert_eq!(anim.resource_path(), Some(dir.as_path()));

    let tgs = dir.join("scene.tgs");
    let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    gz.write_all(SCENE.as_bytes()).unwrap();
    std::fs::write(&tgs, gz.finish().unwrap()).unwrap();
    let sticker = Animation::from_path(&tgs).unwrap();
    assert_eq!(sticker.size(), Canvas::new(20, 10));

    let err = Animation::from_path(dir.join("missing.json")).unwrap_err();
    assert!(matches!(err, LottieError::SceneLoadFailed(_)));
    assert!(err.to_string().contains("missing.json"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn render_tree_and_property_override() {
    let mut anim = Animation::from_data(SCENE, None).unwrap();
    let tree = anim.render_tree(FrameIndex(3)).unwrap();
    assert_eq!(tree.nodes.len(), 1);
    assert_eq!(tree.nodes[0].key, "bg.box");

    let changed = anim.set_property(
        "bg.box",
        crate::scene::keypath::PropertyValue::FillColor(crate::foundation::core::Rgba8::opaque(
            1, 2, 3,
        )),
    );
    assert_eq!(changed, 1);
    let tree = anim.render_tree(FrameIndex(0)).unwrap();
    assert_eq!(
        tree.nodes[0].paint,
        crate::eval::evaluator::ResolvedPaint::Solid(crate::foundation::core::Rgba8::opaque(
            1, 2, 3
        ))
    );

    assert!(matches!(
        anim.render_tree(FrameIndex(50)),
        Err(LottieError::OutOfRange {
            frame: 50,
            total: 50
        })
    ));
}
