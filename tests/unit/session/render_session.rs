use super::*;
use crate::{encode::sink::InMemorySink, foundation::core::Rgb8};

// 4 frames at 10 fps; a red square fading in over a white background.
fn fading_square() -> Animation {
    Animation::from_data(
        r#"{ "width": 10, "height": 10, "frame_rate": 10.0, "total_frames": 4, "layers": [
              { "layer": { "opacity": { "keyframes": [ { "frame": 0, "value": 0.0 }, { "frame": 3, "value": 1.0 } ] },
                "children": [ { "shape": { "geometry": { "rect": { "rect": [2,2,8,8] } },
                                 "fill": { "paint": { "solid": [255,0,0,255] } } } } ] } } ] }"#,
        None,
    )
    .unwrap()
}

fn opts() -> RenderSessionOpts {
    RenderSessionOpts {
        raster: RasterOpts {
            background: Some(Rgb8::WHITE),
            subsamples: 4,
            tolerance: 0.1,
        },
        ..RenderSessionOpts::default()
    }
}

fn render(anim: &Animation, opts: RenderSessionOpts) -> (InMemorySink, RenderStats) {
    let mut session = RenderSession::new(anim, None, opts).unwrap();
    let mut sink = InMemorySink::new();
    let stats = session.render_to_sink(&mut sink).unwrap();
    (sink, stats)
}

#[test]
fn delay_is_rounded_and_clamped() {
    assert_eq!(frame_delay_cs(0.2, 2, 1), 10);
    assert_eq!(frame_delay_cs(1.0, 60, 1), 2);
    assert_eq!(frame_delay_cs(1.0, 60, 2), 3);
    assert_eq!(frame_delay_cs(1.0, 300, 1), 1);
    assert_eq!(frame_delay_cs(1.0, 0, 1), 1);
    assert_eq!(frame_delay_cs(1.0e6, 1, 1), u16::MAX);
}

#[test]
fn frames_reach_the_sink_in_order() {
    let anim = fading_square();
    let (sink, stats) = render(&anim, opts());

    let cfg = sink.config().unwrap();
    assert_eq!(cfg.canvas, Canvas::new(10, 10));
    assert_eq!(cfg.frame_count, 4);
    assert_eq!(cfg.delay_cs, 10);
    assert!(sink.is_ended());

    let idx: Vec<u64> = sink.frames().iter().map(|f| f.idx.0).collect();
    assert_eq!(idx, vec![0, 1, 2, 3]);
    assert!(sink.frames().iter().all(|f| f.delay_cs == 10));

    // Frame 0 is fully transparent paint over white.
    assert_eq!(sink.frames()[0].palette.len(), 1);
    assert_eq!(sink.frames()[3].palette.len(), 2);
    assert_eq!(
        stats,
        RenderStats {
            frames_total: 4,
            frames_rendered: 4,
            max_palette_len: 2,
        }
    );
}

#[test]
fn parallel_output_matches_sequential() {
    let anim = fading_square();
    let (seq, _) = render(&anim, opts());
    let (par, stats) = render(
        &anim,
        RenderSessionOpts {
            parallel: true,
            threads: Some(2),
            chunk_size: 3,
            ..opts()
        },
    );
    assert_eq!(stats.frames_rendered, 4);
    assert_eq!(seq.frames(), par.frames());
}

#[test]
fn frame_step_skips_frames_and_stretches_delay() {
    let anim = fading_square();
    let (sink, _) = render(
        &anim,
        RenderSessionOpts {
            frame_step: 2,
            ..opts()
        },
    );
    let idx: Vec<u64> = sink.frames().iter().map(|f| f.idx.0).collect();
    assert_eq!(idx, vec![0, 2]);
    assert_eq!(sink.config().unwrap().delay_cs, 20);
}

#[test]
fn delay_override_is_at_least_one() {
    let anim = fading_square();
    let session = RenderSession::new(
        &anim,
        None,
        RenderSessionOpts {
            delay_override_cs: Some(0),
            ..opts()
        },
    )
    .unwrap();
    assert_eq!(session.frame_delay_cs(), 1);
}

#[test]
fn output_size_scales_frames() {
    let anim = fading_square();
    let mut session = RenderSession::new(&anim, Some(Canvas::new(20, 10)), opts()).unwrap();
    assert_eq!(session.canvas(), Canvas::new(20, 10));
    let buf = session.render_frame(FrameIndex(3)).unwrap();
    assert_eq!(buf.canvas(), Canvas::new(20, 10));
    // Scene x 2..8 lands at 7..13 after centering.
    assert_eq!(buf.pixel(6, 5), Some([255, 255, 255, 255]));
    assert_eq!(buf.pixel(10, 5), Some([255, 0, 0, 255]));
}

#[test]
fn invalid_sessions_are_rejected() {
    let anim = fading_square();
    assert!(RenderSession::new(&anim, Some(Canvas::new(0, 5)), opts()).is_err());
    assert!(
        RenderSession::new(
            &anim,
            None,
            RenderSessionOpts {
                frame_step: 0,
                ..opts()
            }
        )
        .is_err()
    );

    let mut session = RenderSession::new(&anim, None, opts()).unwrap();
    assert!(matches!(
        session.render_frame(FrameIndex(4)),
        Err(LottieError::OutOfRange { frame: 4, total: 4 })
    ));

    let mut zero_threads = RenderSession::new(
        &anim,
        None,
        RenderSessionOpts {
            parallel: true,
            threads: Some(0),
            ..opts()
        },
    )
    .unwrap();
    assert!(zero_threads.render_to_sink(&mut InMemorySink::new()).is_err());
}
