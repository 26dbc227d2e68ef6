//! Integration tests: decode gifquant output with the `gif` crate.

use std::io::Cursor;

use gifquant::{
    encode_gif, CaptureMode, CaptureState, DitherMode, EncodeConfig, GifEncoder, IoSink,
    PixelBuffer,
};
use rgb::RGB8;

struct Decoded {
    width: u16,
    height: u16,
    repeat: gif::Repeat,
    frames: Vec<gif::Frame<'static>>,
}

fn decode(data: &[u8]) -> Decoded {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(data).expect("valid gif header");

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().expect("valid gif frame") {
        frames.push(frame.clone());
    }

    Decoded {
        width: decoder.width(),
        height: decoder.height(),
        repeat: decoder.repeat(),
        frames,
    }
}

/// Resolve a decoded frame's indices through its local color table.
fn frame_colors(frame: &gif::Frame<'_>) -> Vec<u32> {
    let palette = frame.palette.as_ref().expect("local color table");
    frame
        .buffer
        .iter()
        .map(|&i| {
            let i = i as usize * 3;
            u32::from(palette[i]) << 16 | u32::from(palette[i + 1]) << 8 | u32::from(palette[i + 2])
        })
        .collect()
}

fn gradient(width: usize, height: usize) -> Vec<u32> {
    (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                let r = (x * 255 / width) as u32;
                let g = (y * 255 / height) as u32;
                let b = ((x + y) * 128 / (width + height)) as u32;
                r << 16 | g << 8 | b
            })
        })
        .collect()
}

fn noisy(width: usize, height: usize) -> Vec<u32> {
    (0..width * height)
        .map(|i| (i as u32).wrapping_mul(2_654_435_761) >> 8)
        .collect()
}

#[test]
fn single_image_round_trip() {
    let pixels = gradient(40, 30);
    let gif = encode_gif(&pixels, 40, 30, &EncodeConfig::new()).unwrap();
    let decoded = decode(&gif);

    assert_eq!((decoded.width, decoded.height), (40, 30));
    assert_eq!(decoded.frames.len(), 1);
    let frame = &decoded.frames[0];
    assert_eq!((frame.width, frame.height), (40, 30));
    assert_eq!(frame.buffer.len(), 40 * 30);
    assert_eq!(frame.transparent, None);

    let table = frame.palette.as_ref().unwrap().len() / 3;
    assert!(frame.buffer.iter().all(|&i| (i as usize) < table));
}

#[test]
fn few_colors_are_lossless() {
    // 100 distinct colors fit in the palette, so every pixel is exact.
    let colors: Vec<u32> = (0..100u32).map(|i| (i * 2) << 16 | (255 - i) << 8 | (i * 7) % 256).collect();
    let pixels: Vec<u32> = (0..50 * 20).map(|i| colors[(i * 7) % colors.len()]).collect();

    let gif = encode_gif(&pixels, 50, 20, &EncodeConfig::new()).unwrap();
    let decoded = decode(&gif);
    assert_eq!(frame_colors(&decoded.frames[0]), pixels);
}

#[test]
fn interlaced_decodes_to_same_image() {
    let pixels = gradient(17, 23);
    let progressive = encode_gif(&pixels, 17, 23, &EncodeConfig::new()).unwrap();
    let interlaced = encode_gif(&pixels, 17, 23, &EncodeConfig::new().interlaced(true)).unwrap();
    assert_ne!(progressive, interlaced);

    // The decoder hands back deinterlaced rows, so read the flag from the
    // image descriptor's packed byte instead.
    assert_eq!(progressive[22] & 0x40, 0);
    assert_eq!(interlaced[22] & 0x40, 0x40);

    let p = decode(&progressive);
    let i = decode(&interlaced);
    assert_eq!(p.frames[0].buffer, i.frames[0].buffer);
}

#[test]
fn noisy_image_survives_table_resets() {
    let pixels = noisy(300, 200);
    let gif = encode_gif(&pixels, 300, 200, &EncodeConfig::new()).unwrap();
    let decoded = decode(&gif);
    assert_eq!(decoded.frames[0].buffer.len(), 300 * 200);
}

#[test]
fn transparency_maps_to_index_zero() {
    let key = 0x00FF00u32;
    let mut pixels = gradient(16, 16);
    for y in 4..12 {
        for x in 4..12 {
            pixels[y * 16 + x] = key;
        }
    }

    let config = EncodeConfig::new().transparent(RGB8::new(0, 255, 0));
    let gif = encode_gif(&pixels, 16, 16, &config).unwrap();
    let decoded = decode(&gif);
    let frame = &decoded.frames[0];

    assert_eq!(frame.transparent, Some(0));
    assert_eq!(frame.dispose, gif::DisposalMethod::Background);
    for (p, &i) in pixels.iter().zip(frame.buffer.iter()) {
        assert_eq!(*p == key, i == 0, "pixel {p:06x} got index {i}");
    }
}

#[test]
fn animation_with_loop() {
    let frames = [gradient(12, 12), noisy(12, 12), gradient(12, 12)];
    let config = EncodeConfig::new().frame_delay(5).looping(true);

    let mut encoder = GifEncoder::new(Vec::new());
    for pixels in &frames {
        encoder
            .add_frame(&PixelBuffer::new(pixels, 12, 12), &config)
            .unwrap();
    }
    let gif = encoder.finish().unwrap();
    let decoded = decode(&gif);

    assert_eq!(decoded.frames.len(), 3);
    assert_eq!(decoded.repeat, gif::Repeat::Infinite);
    for frame in &decoded.frames {
        assert_eq!(frame.delay, 5);
        assert_eq!(frame.buffer.len(), 144);
    }
}

#[test]
fn looping_without_delay_writes_no_extension() {
    let pixels = gradient(8, 8);
    let gif = encode_gif(&pixels, 8, 8, &EncodeConfig::new().looping(true)).unwrap();
    assert!(!gif.windows(11).any(|w| w == b"NETSCAPE2.0"));
    let decoded = decode(&gif);
    assert_eq!(decoded.repeat, gif::Repeat::Finite(0));
}

#[test]
fn capture_session_across_encoders() {
    let frames = [gradient(10, 6), noisy(10, 6)];
    let base = EncodeConfig::new().frame_rate(25).looping(true);
    let mut bytes = Vec::new();
    let mut state = CaptureState::default();

    let mut run = |pixels: &[u32], mode: CaptureMode| {
        let mut encoder = GifEncoder::resume(&mut bytes, state);
        encoder
            .encode(&PixelBuffer::new(pixels, 10, 6), &base.clone().capture(mode))
            .unwrap();
        state = encoder.capture_state();
    };

    run(&frames[0], CaptureMode::MovieStart);
    run(&frames[0], CaptureMode::FrameAdd);
    run(&frames[1], CaptureMode::FrameAdd);
    run(&frames[1], CaptureMode::MovieEnd);

    assert!(state.finished);
    assert_eq!(state.byte_count, bytes.len() as u64);

    let decoded = decode(&bytes);
    assert_eq!(decoded.frames.len(), 2);
    assert_eq!(decoded.repeat, gif::Repeat::Infinite);
    assert!(decoded.frames.iter().all(|f| f.delay == 4));
}

#[test]
fn shared_palette_animation_decodes() {
    let first = gradient(20, 20);
    let second: Vec<u32> = first.iter().map(|p| p ^ 0x000F0F).collect();
    let config = EncodeConfig::new().share_palette(true).frame_delay(10);

    let mut encoder = GifEncoder::new(Vec::new());
    encoder
        .add_frame(&PixelBuffer::new(&first, 20, 20), &config)
        .unwrap();
    encoder
        .add_frame(&PixelBuffer::new(&second, 20, 20), &config)
        .unwrap();
    let decoded = decode(&encoder.finish().unwrap());

    assert_eq!(decoded.frames.len(), 2);
    assert_eq!(decoded.frames[0].palette, decoded.frames[1].palette);
}

#[test]
fn io_sink_file_like_output() {
    let pixels = gradient(9, 9);
    let mut encoder = GifEncoder::new(IoSink::new(Cursor::new(Vec::new())));
    encoder
        .encode(
            &PixelBuffer::new(&pixels, 9, 9),
            &EncodeConfig::new().dither(DitherMode::None),
        )
        .unwrap();
    let data = encoder.into_sink().into_inner().into_inner();
    let decoded = decode(&data);
    assert_eq!(decoded.frames[0].buffer.len(), 81);
}
