//! GIF data sub-blocks: a length byte (1..=255) followed by that many bytes.
//! A run of sub-blocks ends with a zero length byte.

extern crate alloc;
use alloc::vec::Vec;

/// Largest payload of a single sub-block.
pub const MAX_SUB_BLOCK: usize = 255;

/// Accumulates bytes and emits a sub-block each time 255 are buffered.
///
/// The terminating zero byte is not written here; the caller closes the run.
#[derive(Debug)]
pub struct SubBlockBuffer<'a> {
    out: &'a mut Vec<u8>,
    buf: [u8; MAX_SUB_BLOCK],
    len: usize,
}

impl<'a> SubBlockBuffer<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self {
            out,
            buf: [0; MAX_SUB_BLOCK],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len == MAX_SUB_BLOCK {
            self.flush();
        }
    }

    /// Emit whatever is buffered as one (possibly short) sub-block.
    pub fn flush(&mut self) {
        if self.len > 0 {
            self.out.push(self.len as u8);
            self.out.extend_from_slice(&self.buf[..self.len]);
            self.len = 0;
        }
    }
}

/// Frame `data` as sub-blocks, including the zero terminator.
pub fn write_sub_blocks(out: &mut Vec<u8>, data: &[u8]) {
    for chunk in data.chunks(MAX_SUB_BLOCK) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
}

/// Concatenate the payloads of a sub-block run starting at `data[0]`.
///
/// Returns the payload and the number of bytes consumed, terminator included,
/// or `None` if the run is truncated.
pub fn read_sub_blocks(data: &[u8]) -> Option<(Vec<u8>, usize)> {
    let mut payload = Vec::new();
    let mut pos = 0;
    loop {
        let len = *data.get(pos)? as usize;
        pos += 1;
        if len == 0 {
            return Some((payload, pos));
        }
        payload.extend_from_slice(data.get(pos..pos + len)?);
        pos += len;
    }
}
