use super::*;

fn frame(width: u32, height: u32, fill: impl Fn(usize) -> [u8; 4]) -> FrameBuffer {
    let mut buf = FrameBuffer::new(width, height);
    for (i, px) in buf.pixels_mut().iter_mut().enumerate() {
        *px = fill(i);
    }
    buf
}

// 100 pixels of one grey, then 300 distinct colors `[0, i >> 8, i & 255, 255]`.
fn busy_frame() -> FrameBuffer {
    frame(20, 20, |i| {
        if i < 100 {
            [9, 9, 9, 255]
        } else {
            let c = i - 100;
            [0, (c >> 8) as u8, (c & 0xff) as u8, 255]
        }
    })
}

#[test]
fn pack_key_is_big_endian_rgba() {
    assert_eq!(pack_key([0x11, 0x22, 0x33, 0x44]), 0x1122_3344);
}

#[test]
fn single_color_frame_has_one_entry() {
    let buf = frame(3, 3, |_| [255, 0, 0, 255]);
    let (indexed, palette) = PaletteQuantizer::default().quantize(&buf).unwrap();
    assert_eq!(palette.colors(), &[Rgba8::opaque(255, 0, 0)]);
    assert_eq!(indexed.indices, vec![0; 9]);
    assert_eq!(indexed.transparent, None);
    assert_eq!(indexed.canvas, Canvas::new(3, 3));
}

#[test]
fn transparent_entry_is_reported() {
    let buf = frame(2, 1, |i| if i == 0 { [0, 0, 0, 0] } else { [255, 0, 0, 255] });
    let (indexed, palette) = PaletteQuantizer::default().quantize(&buf).unwrap();
    assert_eq!(palette.transparent_index(), Some(0));
    assert_eq!(indexed.transparent, Some(0));
    assert_eq!(indexed.indices, vec![0, 1]);
    assert_eq!(palette.to_rgb_bytes(), vec![0, 0, 0, 255, 0, 0]);
}

#[test]
fn frequent_colors_come_first_and_ties_sort_by_key() {
    let (_, palette) = PaletteQuantizer::default().quantize(&busy_frame()).unwrap();
    assert_eq!(palette.len(), MAX_PALETTE_LEN);
    assert_eq!(palette.colors()[0], Rgba8::opaque(9, 9, 9));
    assert_eq!(palette.colors()[1], Rgba8::opaque(0, 0, 0));
    assert_eq!(palette.colors()[255], Rgba8::opaque(0, 0, 254));
}

#[test]
fn dropped_colors_map_to_nearest_entry() {
    let buf = busy_frame();
    let (indexed, _) = PaletteQuantizer::default().quantize(&buf).unwrap();
    // [0, 0, 255] -> [0, 0, 254]
    assert_eq!(indexed.indices[100 + 255], 255);
    // [0, 1, 0] -> [0, 0, 0]
    assert_eq!(indexed.indices[100 + 256], 1);
    // [0, 1, 43] -> [0, 0, 43]
    assert_eq!(indexed.indices[100 + 299], 44);
}

#[test]
fn nearest_prefers_lowest_index_on_ties() {
    let colors = [Rgba8::opaque(0, 0, 0), Rgba8::opaque(2, 0, 0)];
    assert_eq!(nearest(&colors, [1, 0, 0, 255]), 0);
    assert_eq!(nearest(&colors, [2, 0, 0, 250]), 1);
}

#[test]
fn quantization_is_deterministic() {
    let buf = busy_frame();
    let q = PaletteQuantizer::default();
    assert_eq!(q.quantize(&buf).unwrap(), q.quantize(&buf).unwrap());
}

#[test]
fn exact_mode_rejects_overflow() {
    let exact = PaletteQuantizer::new(QuantizeOpts {
        mode: PaletteMode::Exact,
    });
    assert!(matches!(
        exact.quantize(&busy_frame()),
        Err(LottieError::PaletteOverflow { distinct: 301 })
    ));
    assert!(exact.quantize(&frame(4, 4, |_| [1, 2, 3, 255])).is_ok());
}
