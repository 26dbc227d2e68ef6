//! Encoder sessions: still images and frame-by-frame capture.

extern crate alloc;
use alloc::vec::Vec;

use tracing::debug;

use crate::dither::dither_image;
use crate::error::EncodeError;
use crate::histogram::build_histogram;
use crate::median_cut::median_cut;
use crate::palette::Palette;
use crate::sink::OutputSink;
use crate::writer::{GifStreamWriter, ImageBlock};
use crate::{EncodeConfig, PixelBuffer};

/// Step of an animation capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Write the header only.
    MovieStart,
    /// Write one frame, no header or trailer.
    FrameAdd,
    /// Write the trailer and close the sink.
    MovieEnd,
    /// Write nothing and cancel the sink.
    Cancel,
}

impl CaptureMode {
    /// Parse a capture step name. Accepts "movie-start" or "movie",
    /// "frame-add" or "add", "movie-end" or "end", and "cancel".
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let is = |s: &str| name.eq_ignore_ascii_case(s);
        if is("movie-start") || is("movie") {
            Some(Self::MovieStart)
        } else if is("frame-add") || is("add") {
            Some(Self::FrameAdd)
        } else if is("movie-end") || is("end") {
            Some(Self::MovieEnd)
        } else if is("cancel") {
            Some(Self::Cancel)
        } else {
            None
        }
    }

    fn gates(self) -> Gates {
        match self {
            Self::MovieStart => Gates {
                header: true,
                image: false,
                trailer: false,
            },
            Self::FrameAdd => Gates {
                header: false,
                image: true,
                trailer: false,
            },
            Self::MovieEnd => Gates {
                header: false,
                image: false,
                trailer: true,
            },
            Self::Cancel => Gates {
                header: false,
                image: false,
                trailer: false,
            },
        }
    }
}

/// Which parts of the stream one encode call may emit.
#[derive(Debug, Clone, Copy)]
struct Gates {
    header: bool,
    image: bool,
    trailer: bool,
}

impl Gates {
    const SINGLE: Self = Self {
        header: true,
        image: true,
        trailer: true,
    };

    const FRAME: Self = Self {
        header: true,
        image: true,
        trailer: false,
    };
}

/// Bookkeeping carried between the calls of one output stream.
///
/// Hand it to [`GifEncoder::resume`] to continue a capture session with a
/// fresh encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureState {
    pub header_written: bool,
    pub loop_written: bool,
    /// Trailer written or session cancelled.
    pub finished: bool,
    /// Bytes appended to the sink so far.
    pub byte_count: u64,
}

/// Quantize a frame into a palette whose slot 0 is the configured
/// background (or transparent) color.
pub fn build_palette(pixels: &[u32], config: &EncodeConfig) -> Palette {
    let items = build_histogram(pixels);
    Palette::from_cells(median_cut(items, config.reserved_color(), config.axis_scale))
}

/// Writes one GIF stream into a sink, one block group per call.
#[derive(Debug)]
pub struct GifEncoder<S: OutputSink> {
    sink: S,
    state: CaptureState,
    shared_palette: Option<Palette>,
}

impl<S: OutputSink> GifEncoder<S> {
    pub fn new(sink: S) -> Self {
        Self::resume(sink, CaptureState::default())
    }

    /// Continue a stream whose earlier parts were written by another encoder.
    pub fn resume(sink: S, state: CaptureState) -> Self {
        Self {
            sink,
            state,
            shared_palette: None,
        }
    }

    pub fn capture_state(&self) -> CaptureState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Palette reused by frames encoded with `share_palette`, once the first
    /// such frame has been quantized.
    pub fn shared_palette(&self) -> Option<&Palette> {
        self.shared_palette.as_ref()
    }

    /// Seed the shared palette, typically with the one a previous encoder of
    /// the same capture session built.
    pub fn with_shared_palette(mut self, palette: Palette) -> Self {
        self.shared_palette = Some(palette);
        self
    }

    /// Split into sink, session state and shared palette, everything needed
    /// to [`resume`](Self::resume) the stream later.
    pub fn into_parts(self) -> (S, CaptureState, Option<Palette>) {
        (self.sink, self.state, self.shared_palette)
    }

    /// Encode according to `config.capture`.
    ///
    /// Without a capture mode this writes a complete file (header unless one
    /// was already written, image, trailer) and closes the sink.
    pub fn encode(
        &mut self,
        image: &PixelBuffer<'_>,
        config: &EncodeConfig,
    ) -> Result<(), EncodeError> {
        match config.capture {
            None => self.write(image, config, Gates::SINGLE),
            Some(CaptureMode::Cancel) => self.cancel(),
            Some(mode) => self.write(image, config, mode.gates()),
        }
    }

    /// Append one animation frame, writing the header first if needed.
    pub fn add_frame(
        &mut self,
        image: &PixelBuffer<'_>,
        config: &EncodeConfig,
    ) -> Result<(), EncodeError> {
        self.write(image, config, Gates::FRAME)
    }

    /// Terminate the stream, close the sink and hand it back.
    pub fn finish(mut self) -> Result<S, EncodeError> {
        if !self.state.finished {
            let mut writer = GifStreamWriter::new();
            writer.trailer();
            self.emit(&writer.into_bytes())?;
            self.state.finished = true;
            self.sink.close()?;
        }
        Ok(self.sink)
    }

    /// Abandon the stream without writing anything further.
    pub fn cancel(&mut self) -> Result<(), EncodeError> {
        self.ensure_open()?;
        self.sink.cancel();
        self.state.finished = true;
        debug!("gif stream cancelled");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), EncodeError> {
        if self.state.finished {
            Err(EncodeError::StreamFinished)
        } else {
            Ok(())
        }
    }

    fn write(
        &mut self,
        image: &PixelBuffer<'_>,
        config: &EncodeConfig,
        gates: Gates,
    ) -> Result<(), EncodeError> {
        self.ensure_open()?;

        let mut writer = GifStreamWriter::new();
        let mut wrote_loop = false;

        if gates.header || gates.image {
            let (width, height) = image.dimensions()?;

            if gates.header && !self.state.header_written {
                writer.header(width, height);
            }
            if gates.image {
                wrote_loop = self.write_frame(&mut writer, image, config, width, height);
            }
        }
        if gates.trailer {
            writer.trailer();
        }

        self.emit(&writer.into_bytes())?;
        self.state.header_written |= gates.header;
        self.state.loop_written |= wrote_loop;

        if gates.trailer {
            self.state.finished = true;
            self.sink.close()?;
        }
        Ok(())
    }

    /// Quantize, dither and lay out one frame. Returns whether the loop
    /// extension was written.
    fn write_frame(
        &mut self,
        writer: &mut GifStreamWriter,
        image: &PixelBuffer<'_>,
        config: &EncodeConfig,
        width: u16,
        height: u16,
    ) -> bool {
        let wants_loop = config.looping && config.frame_delay.is_some() && !self.state.loop_written;
        // Capture sessions are always progressive.
        let interlaced = config.interlaced && config.capture.is_none();

        let owned;
        let palette: &Palette = if config.share_palette {
            &*self
                .shared_palette
                .get_or_insert_with(|| build_palette(image.pixels, config))
        } else {
            owned = build_palette(image.pixels, config);
            &owned
        };

        let indices: Vec<u8> = dither_image(
            image.pixels,
            image.width,
            image.height,
            palette,
            &config.dither_options(),
        );

        writer.graphic_control(config.transparent.is_some(), config.frame_delay);
        if wants_loop {
            writer.netscape_loop();
        }
        writer.image(&ImageBlock {
            width,
            height,
            interlaced,
            palette,
            indices: &indices,
        });
        wants_loop
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        if !bytes.is_empty() {
            self.sink.append_bytes(bytes)?;
        }
        self.state.byte_count += bytes.len() as u64;
        debug!(
            appended = bytes.len(),
            total = self.state.byte_count,
            "gif bytes written"
        );
        Ok(())
    }
}
