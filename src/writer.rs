//! GIF89a block grammar.
//!
//! [`GifStreamWriter`] only knows how to lay out blocks; deciding which
//! blocks a call emits (header once, trailer at the end) is the encoder's job.

extern crate alloc;
use alloc::vec::Vec;

use crate::interlace::reorder_rows;
use crate::lzw::{compress, min_code_size};
use crate::palette::Palette;

const EXTENSION: u8 = 0x21;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const APPLICATION_LABEL: u8 = 0xFF;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

/// Graphic control packed byte: transparent index valid, restore to background.
const GCE_TRANSPARENT: u8 = 0x09;
/// Graphic control packed byte bit set alongside a nonzero delay.
const GCE_DELAYED: u8 = 0x02;

/// One quantized frame, ready to be written as an image block.
#[derive(Debug, Clone, Copy)]
pub struct ImageBlock<'a> {
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub palette: &'a Palette,
    /// Palette indices in row-major order.
    pub indices: &'a [u8],
}

/// Appends GIF blocks to an in-memory buffer.
#[derive(Debug, Default)]
pub struct GifStreamWriter {
    buf: Vec<u8>,
}

impl GifStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn put_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Little-endian 16-bit word.
    #[inline]
    pub fn put_word(&mut self, word: u16) {
        self.buf.extend_from_slice(&word.to_le_bytes());
    }

    pub fn put_str(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
    }

    /// Signature and logical screen descriptor. No global color table.
    pub fn header(&mut self, width: u16, height: u16) {
        self.put_str("GIF89a");
        self.put_word(width);
        self.put_word(height);
        // flags, background index, aspect ratio
        self.put_byte(0);
        self.put_byte(0);
        self.put_byte(0);
    }

    /// Graphic control extension. Written only when the frame is transparent
    /// or has a delay; the transparent index is always 0.
    pub fn graphic_control(&mut self, transparent: bool, delay: Option<u16>) {
        if !transparent && delay.is_none() {
            return;
        }
        let delay = delay.unwrap_or(0);

        let mut packed = 0;
        if transparent {
            packed |= GCE_TRANSPARENT;
        }
        if delay > 0 {
            packed |= GCE_DELAYED;
        }

        self.put_byte(EXTENSION);
        self.put_byte(GRAPHIC_CONTROL_LABEL);
        self.put_byte(4);
        self.put_byte(packed);
        self.put_word(delay);
        self.put_byte(0);
        self.put_byte(0);
    }

    /// NETSCAPE2.0 application extension, looping forever.
    pub fn netscape_loop(&mut self) {
        self.put_byte(EXTENSION);
        self.put_byte(APPLICATION_LABEL);
        self.put_byte(11);
        self.put_str("NETSCAPE2.0");
        self.put_byte(3);
        self.put_byte(1);
        self.put_word(0);
        self.put_byte(0);
    }

    /// Image descriptor, local color table and LZW-compressed data.
    pub fn image(&mut self, block: &ImageBlock<'_>) {
        let bits = block.palette.bits_per_pixel();
        debug_assert_eq!(
            block.indices.len(),
            usize::from(block.width) * usize::from(block.height)
        );

        self.put_byte(IMAGE_SEPARATOR);
        self.put_word(0);
        self.put_word(0);
        self.put_word(block.width);
        self.put_word(block.height);

        let mut packed = 0x80 | (bits - 1);
        if block.interlaced {
            packed |= 0x40;
        }
        self.put_byte(packed);
        self.buf.extend_from_slice(&block.palette.color_table());

        let code_size = min_code_size(bits);
        self.put_byte(code_size);
        let rows = reorder_rows(
            block.indices,
            usize::from(block.width),
            usize::from(block.height),
            block.interlaced,
        );
        compress(rows, code_size, &mut self.buf);
    }

    pub fn trailer(&mut self) {
        self.put_byte(TRAILER);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::build_histogram;
    use crate::median_cut::median_cut;
    use rgb::RGB8;

    #[test]
    fn header_bytes() {
        let mut w = GifStreamWriter::new();
        w.header(0x0102, 3);
        assert_eq!(w.into_bytes(), b"GIF89a\x02\x01\x03\x00\x00\x00\x00".to_vec());
    }

    #[test]
    fn graphic_control_flags() {
        let mut w = GifStreamWriter::new();
        w.graphic_control(false, None);
        assert!(w.is_empty());

        w.graphic_control(true, None);
        assert_eq!(w.into_bytes(), vec![0x21, 0xF9, 4, 0x09, 0, 0, 0, 0]);

        let mut w = GifStreamWriter::new();
        w.graphic_control(false, Some(10));
        assert_eq!(w.into_bytes(), vec![0x21, 0xF9, 4, 0x02, 10, 0, 0, 0]);

        let mut w = GifStreamWriter::new();
        w.graphic_control(true, Some(0));
        assert_eq!(w.into_bytes(), vec![0x21, 0xF9, 4, 0x09, 0, 0, 0, 0]);
    }

    #[test]
    fn netscape_block() {
        let mut w = GifStreamWriter::new();
        w.netscape_loop();
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..3], &[0x21, 0xFF, 0x0B]);
        assert_eq!(&bytes[3..14], b"NETSCAPE2.0");
        assert_eq!(&bytes[14..], &[3, 1, 0, 0, 0]);
    }

    #[test]
    fn image_block_layout() {
        let cells = median_cut(
            build_histogram(&[0xFF0000, 0x00FF00]),
            RGB8::new(255, 255, 255),
            [1.0; 3],
        );
        let palette = Palette::from_cells(cells);
        let mut w = GifStreamWriter::new();
        w.image(&ImageBlock {
            width: 2,
            height: 1,
            interlaced: false,
            palette: &palette,
            indices: &[2, 1],
        });
        assert_eq!(
            w.into_bytes(),
            vec![
                0x2C, 0, 0, 0, 0, 2, 0, 1, 0, 0x81, //
                255, 255, 255, 0, 255, 0, 255, 0, 0, 255, 0, 0, //
                2, 2, 0x54, 0x0A, 0,
            ]
        );
    }

    #[test]
    fn interlace_flag() {
        let cells = median_cut(build_histogram(&[0x000000]), RGB8::new(0, 0, 0), [1.0; 3]);
        let palette = Palette::from_cells(cells);
        let mut w = GifStreamWriter::new();
        w.image(&ImageBlock {
            width: 1,
            height: 1,
            interlaced: true,
            palette: &palette,
            indices: &[0],
        });
        let bytes = w.into_bytes();
        // one-entry palette: depth 1, so the size field is 0
        assert_eq!(bytes[9], 0x80 | 0x40);
        assert_eq!(bytes[10..16], [0, 0, 0, 0, 0, 0]);
    }
}
