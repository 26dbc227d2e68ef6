//! Variable-length-code LZW compression for GIF image data.
//!
//! Codes are packed least-significant-bit first and framed as sub-blocks.
//! The string table is an open-addressed hash keyed by (prefix code, next
//! index) and is reset with a clear code once 4096 codes are in use.

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

use tracing::trace;

use crate::sub_block::SubBlockBuffer;

/// Largest code width.
const MAX_BITS: u32 = 12;
/// First code that no longer fits in 12 bits.
const MAX_MAX_CODE: u32 = 1 << MAX_BITS;
/// Hash table size, a prime comfortably above 4096.
const HSIZE: usize = 5003;
const VACANT: u32 = u32::MAX;

/// Minimum code size for a color table of depth `bits_per_pixel`.
pub fn min_code_size(bits_per_pixel: u8) -> u8 {
    bits_per_pixel.max(2)
}

#[inline]
fn max_code(n_bits: u32) -> u32 {
    (1 << n_bits) - 1
}

/// LSB-first code packer feeding a sub-block buffer.
struct BitPacker<'a> {
    blocks: SubBlockBuffer<'a>,
    acc: u32,
    bits: u32,
}

impl BitPacker<'_> {
    #[inline]
    fn put(&mut self, code: u32, width: u32) {
        self.acc |= code << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.blocks.push(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    /// Emit the partial byte, if any, and the last short sub-block.
    fn finish(mut self) {
        if self.bits > 0 {
            self.blocks.push(self.acc as u8);
        }
        self.blocks.flush();
    }
}

struct Compressor<'a> {
    packer: BitPacker<'a>,
    init_bits: u32,
    n_bits: u32,
    max_code: u32,
    clear_code: u32,
    eof_code: u32,
    free_ent: u32,
    clear_flag: bool,
    hash_shift: u32,
    htab: Vec<u32>,
    codetab: Vec<u16>,
}

impl<'a> Compressor<'a> {
    fn new(min_code_size: u8, out: &'a mut Vec<u8>) -> Self {
        let init_bits = u32::from(min_code_size) + 1;
        let clear_code = 1 << min_code_size;

        let mut shift = 0;
        let mut fcode = HSIZE;
        while fcode < 65536 {
            shift += 1;
            fcode *= 2;
        }

        Self {
            packer: BitPacker {
                blocks: SubBlockBuffer::new(out),
                acc: 0,
                bits: 0,
            },
            init_bits,
            n_bits: init_bits,
            max_code: max_code(init_bits),
            clear_code,
            eof_code: clear_code + 1,
            free_ent: clear_code + 2,
            clear_flag: false,
            hash_shift: 8 - shift,
            htab: vec![VACANT; HSIZE],
            codetab: vec![0; HSIZE],
        }
    }

    fn output(&mut self, code: u32) {
        self.packer.put(code, self.n_bits);

        if self.free_ent > self.max_code || self.clear_flag {
            if self.clear_flag {
                self.n_bits = self.init_bits;
                self.max_code = max_code(self.n_bits);
                self.clear_flag = false;
            } else {
                self.n_bits += 1;
                self.max_code = if self.n_bits == MAX_BITS {
                    MAX_MAX_CODE
                } else {
                    max_code(self.n_bits)
                };
            }
        }
    }

    fn clear_table(&mut self) {
        self.htab.fill(VACANT);
        self.free_ent = self.clear_code + 2;
        self.clear_flag = true;
        trace!("lzw table full, emitting clear code");
        self.output(self.clear_code);
    }

    /// Slot holding `fcode`, or the vacant slot where it belongs.
    fn probe(&self, fcode: u32, c: u32, ent: u32) -> (usize, bool) {
        let mut i = ((c << self.hash_shift) ^ ent) as usize;
        if self.htab[i] == fcode {
            return (i, true);
        }
        if self.htab[i] != VACANT {
            let disp = if i == 0 { 1 } else { HSIZE - i };
            loop {
                i = if i >= disp { i - disp } else { i + HSIZE - disp };
                if self.htab[i] == fcode {
                    return (i, true);
                }
                if self.htab[i] == VACANT {
                    break;
                }
            }
        }
        (i, false)
    }

    fn run(mut self, indices: impl IntoIterator<Item = u8>) {
        self.output(self.clear_code);

        let mut pixels = indices.into_iter();
        if let Some(first) = pixels.next() {
            let mut ent = u32::from(first);
            for pixel in pixels {
                let c = u32::from(pixel);
                let fcode = (c << MAX_BITS) + ent;
                let (slot, found) = self.probe(fcode, c, ent);
                if found {
                    ent = u32::from(self.codetab[slot]);
                    continue;
                }

                self.output(ent);
                ent = c;
                if self.free_ent < MAX_MAX_CODE {
                    self.codetab[slot] = self.free_ent as u16;
                    self.htab[slot] = fcode;
                    self.free_ent += 1;
                } else {
                    self.clear_table();
                }
            }
            self.output(ent);
        }

        self.output(self.eof_code);
        self.packer.finish();
    }
}

/// Compress palette indices into `out` as a sub-block run, zero terminator
/// included. The minimum code size byte itself is not written.
///
/// Every index must be below `1 << min_code_size`.
pub fn compress(indices: impl IntoIterator<Item = u8>, min_code_size: u8, out: &mut Vec<u8>) {
    debug_assert!((2..=8).contains(&min_code_size));
    Compressor::new(min_code_size, out).run(indices);
    out.push(0);
}
