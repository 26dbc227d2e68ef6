//! GIF89a encoding for truecolor images.
//!
//! Each frame is quantized to at most 256 colors by median cut, mapped onto
//! the palette with Floyd-Steinberg error diffusion and LZW compressed.
//! Slot 0 of every palette is reserved for the background color, or for the
//! transparent color when one is configured.
//!
//! ```
//! use gifquant::{encode_gif, EncodeConfig};
//!
//! let pixels = [0xFF0000u32, 0x00FF00];
//! let config = EncodeConfig::new().background(rgb::RGB8::new(255, 255, 255));
//! let gif = encode_gif(&pixels, 2, 1, &config).unwrap();
//! assert!(gif.starts_with(b"GIF89a"));
//! ```
//!
//! Animations are written either through [`GifEncoder::add_frame`] and
//! [`GifEncoder::finish`], or one step per call with a [`CaptureMode`].
#![forbid(unsafe_code)]

extern crate alloc;

pub mod dither;
pub mod encoder;
pub mod error;
pub mod histogram;
pub mod interlace;
pub mod lzw;
pub mod median_cut;
pub mod palette;
pub mod sink;
pub mod sub_block;
pub mod writer;

pub use dither::{DitherMode, DitherOptions};
pub use encoder::{build_palette, CaptureMode, CaptureState, GifEncoder};
pub use error::EncodeError;
pub use palette::Palette;
pub use sink::{IoSink, OutputSink};

use alloc::vec::Vec;

use rgb::RGB8;
use tracing::warn;

/// Per-call encoding options.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeConfig {
    /// Color reserved for palette slot 0 when nothing is transparent.
    pub background: RGB8,
    /// Color written as transparent. Takes slot 0 instead of the background.
    pub transparent: Option<RGB8>,
    /// Four-pass interlaced row order. Ignored while capturing.
    pub interlaced: bool,
    /// Write a loop-forever extension once per stream. Needs a frame delay.
    pub looping: bool,
    /// Frame delay in hundredths of a second.
    pub frame_delay: Option<u16>,
    /// Error diffusion mode used when mapping pixels onto the palette.
    pub dither: DitherMode,
    /// Per-channel clamp, in 8-bit RGB units, applied to accumulated dither
    /// error. `None` (the default) diffuses unclamped.
    ///
    /// Diffusion here runs in device RGB rather than a perceptual space, so
    /// a fixed bound would cut the error a flat area needs to average out to
    /// its source color.
    pub error_limit: Option<f32>,
    /// Keep diffused error off pixels that carry the reserved color.
    pub protect_background: bool,
    /// Per-axis weights for cell volume and split-axis choice.
    pub axis_scale: [f32; 3],
    /// Capture session step. `None` writes a complete single image.
    pub capture: Option<CaptureMode>,
    /// Quantize the first frame of a session and reuse its palette.
    pub share_palette: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            background: RGB8::new(0, 0, 0),
            transparent: None,
            interlaced: false,
            looping: false,
            frame_delay: None,
            dither: DitherMode::FloydSteinberg,
            error_limit: None,
            protect_background: true,
            axis_scale: [1.0; 3],
            capture: None,
            share_palette: false,
        }
    }
}

impl EncodeConfig {
    /// Black background, Floyd-Steinberg dithering, no animation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Color for palette slot 0 when nothing is transparent.
    pub fn background(mut self, color: RGB8) -> Self {
        self.background = color;
        self
    }

    /// Mark `color` transparent. It takes palette slot 0.
    pub fn transparent(mut self, color: RGB8) -> Self {
        self.transparent = Some(color);
        self
    }

    /// Write rows in four-pass interlaced order. Capture frames stay
    /// progressive.
    pub fn interlaced(mut self, on: bool) -> Self {
        self.interlaced = on;
        self
    }

    /// Loop the animation forever. Takes effect only with a frame delay.
    pub fn looping(mut self, on: bool) -> Self {
        self.looping = on;
        self
    }

    /// Frame delay in hundredths of a second.
    pub fn frame_delay(mut self, centiseconds: u16) -> Self {
        self.frame_delay = Some(centiseconds);
        self
    }

    /// Delay of `100 / fps` centiseconds; 0 fps means no delay.
    pub fn frame_rate(mut self, fps: u32) -> Self {
        let delay = if fps == 0 { 0 } else { 100 / fps };
        self.frame_delay = Some(delay as u16);
        self
    }

    /// Error diffusion mode.
    pub fn dither(mut self, mode: DitherMode) -> Self {
        self.dither = mode;
        self
    }

    /// Clamp accumulated dither error to `±limit` per channel.
    pub fn error_limit(mut self, limit: f32) -> Self {
        self.error_limit = Some(limit);
        self
    }

    /// Keep diffused error off pixels that carry the reserved color.
    pub fn protect_background(mut self, on: bool) -> Self {
        self.protect_background = on;
        self
    }

    /// Weights for the red, green and blue axes when choosing and splitting
    /// median-cut cells.
    pub fn axis_scale(mut self, scale: [f32; 3]) -> Self {
        self.axis_scale = scale;
        self
    }

    /// Run one step of a capture session.
    pub fn capture(mut self, mode: CaptureMode) -> Self {
        self.capture = Some(mode);
        self
    }

    /// Set the capture mode by name. Unrecognized names are logged and
    /// leave the encoder in single-image mode.
    pub fn capture_mode_name(mut self, name: &str) -> Self {
        self.capture = CaptureMode::from_name(name);
        if self.capture.is_none() {
            warn!(mode = name, "unknown capture mode, writing a complete image");
        }
        self
    }

    /// Reuse the first quantized frame's palette for later frames.
    pub fn share_palette(mut self, on: bool) -> Self {
        self.share_palette = on;
        self
    }

    /// The color that owns palette slot 0.
    pub fn reserved_color(&self) -> RGB8 {
        self.transparent.unwrap_or(self.background)
    }

    /// Options handed to the ditherer.
    pub fn dither_options(&self) -> DitherOptions {
        DitherOptions {
            mode: self.dither,
            error_limit: self.error_limit,
            protect_reserved: self.protect_background,
        }
    }
}

/// Row-major `0xAARRGGBB` pixels. Alpha is ignored.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    pub pixels: &'a [u32],
    pub width: usize,
    pub height: usize,
}

impl<'a> PixelBuffer<'a> {
    pub fn new(pixels: &'a [u32], width: usize, height: usize) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Validated dimensions as GIF 16-bit fields.
    pub fn dimensions(&self) -> Result<(u16, u16), EncodeError> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(EncodeError::ZeroDimension);
        }
        if width.checked_mul(height) != Some(self.pixels.len()) {
            return Err(EncodeError::DimensionMismatch {
                len: self.pixels.len(),
                width,
                height,
            });
        }
        match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) => Ok((w, h)),
            _ => Err(EncodeError::DimensionTooLarge { width, height }),
        }
    }
}

/// Encode `0xAARRGGBB` pixels into a GIF held in memory.
///
/// With no capture mode set this is a complete file. A capture mode yields
/// just that step's bytes.
pub fn encode_gif(
    pixels: &[u32],
    width: usize,
    height: usize,
    config: &EncodeConfig,
) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = GifEncoder::new(Vec::new());
    encoder.encode(&PixelBuffer::new(pixels, width, height), config)?;
    Ok(encoder.into_sink())
}

/// [`encode_gif`] for `rgb` crate pixels.
pub fn encode_gif_rgb(
    pixels: &[RGB8],
    width: usize,
    height: usize,
    config: &EncodeConfig,
) -> Result<Vec<u8>, EncodeError> {
    let argb: Vec<u32> = pixels.iter().map(|&p| histogram::rgb_key(p)).collect();
    encode_gif(&argb, width, height, config)
}
