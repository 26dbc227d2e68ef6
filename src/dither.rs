extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use crate::histogram::{argb_to_rgb, from_coord, rgb_key, to_coord};
use crate::palette::Palette;

/// Dithering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    /// No error diffusion; each pixel maps to its own cell.
    None,
    /// Floyd-Steinberg error diffusion.
    #[default]
    FloydSteinberg,
}

/// Knobs for [`dither_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DitherOptions {
    pub mode: DitherMode,
    /// Clamp accumulated error to +/- this value per channel before it is applied.
    pub error_limit: Option<f32>,
    /// Pixels of the reserved (slot 0) color never receive diffused error.
    pub protect_reserved: bool,
}

impl Default for DitherOptions {
    fn default() -> Self {
        Self {
            mode: DitherMode::FloydSteinberg,
            error_limit: None,
            protect_reserved: true,
        }
    }
}

/// Pending per-pixel corrections. Entries are created on first write and
/// removed when the target pixel reads them.
#[derive(Debug)]
pub(crate) struct ErrorBuffer {
    pending: Vec<Option<[f32; 3]>>,
    width: usize,
    height: usize,
}

impl ErrorBuffer {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            pending: vec![None; width * height],
            width,
            height,
        }
    }

    pub(crate) fn take(&mut self, idx: usize) -> Option<[f32; 3]> {
        self.pending[idx].take()
    }

    fn add(&mut self, idx: usize, err: [f32; 3], sixteenths: f32) {
        let scale = sixteenths / 16.0;
        let slot = self.pending[idx].get_or_insert([0.0; 3]);
        for axis in 0..3 {
            slot[axis] += err[axis] * scale;
        }
    }

    /// Spread `err` from (x, y) over the unvisited neighbors.
    ///
    /// Floyd-Steinberg kernel: right 7/16, bottom-left 3/16, bottom 5/16,
    /// bottom-right 1/16. Targets outside the image or rejected by `accept`
    /// are skipped.
    pub(crate) fn diffuse(
        &mut self,
        x: usize,
        y: usize,
        err: [f32; 3],
        accept: impl Fn(usize) -> bool,
    ) {
        let idx = y * self.width + x;
        let push = |buf: &mut Self, target: usize, sixteenths: f32| {
            if accept(target) {
                buf.add(target, err, sixteenths);
            }
        };

        if x + 1 < self.width {
            push(self, idx + 1, 7.0);
        }
        if y + 1 < self.height {
            let below = idx + self.width;
            if x > 0 {
                push(self, below - 1, 3.0);
            }
            push(self, below, 5.0);
            if x + 1 < self.width {
                push(self, below + 1, 1.0);
            }
        }
    }
}

/// Map every ARGB pixel to a palette slot, in row-major order.
///
/// A pixel whose working color (source plus pending error) equals a
/// representative takes that slot directly. Otherwise the search walks the
/// linked cells starting from the cell that owns the undithered source color.
/// Source colors unknown to the palette (a palette shared from another frame)
/// start from the brute-force nearest cell instead.
pub fn dither_image(
    pixels: &[u32],
    width: usize,
    height: usize,
    palette: &Palette,
    options: &DitherOptions,
) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);

    let reserved = palette.reserved();
    let diffuse = options.mode == DitherMode::FloydSteinberg;

    let mut errors = ErrorBuffer::new(width, height);
    let mut indices = vec![0u8; pixels.len()];
    let mut fallback: BTreeMap<u32, usize> = BTreeMap::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let source = argb_to_rgb(pixels[idx]);

            let working = match errors.take(idx) {
                None => source,
                Some(mut err) => {
                    if let Some(limit) = options.error_limit {
                        for e in &mut err {
                            *e = e.clamp(-limit, limit);
                        }
                    }
                    let base = to_coord(source);
                    from_coord(core::array::from_fn(|axis| base[axis] + err[axis]))
                }
            };

            if let Some(slot) = palette.exact(working) {
                indices[idx] = slot as u8;
                continue;
            }

            let start = palette.owner(source).unwrap_or_else(|| {
                *fallback
                    .entry(rgb_key(source))
                    .or_insert_with(|| palette.nearest(to_coord(source)))
            });
            let target = to_coord(working);
            let slot = palette.walk(start, target);
            assert!(slot < palette.len(), "palette slot {slot} out of range");
            indices[idx] = slot as u8;

            if diffuse {
                let rep = palette.cells()[slot].coord;
                let residual = core::array::from_fn(|axis| target[axis] - rep[axis]);
                errors.diffuse(x, y, residual, |t| {
                    !(options.protect_reserved && argb_to_rgb(pixels[t]) == reserved)
                });
            }
        }
    }

    indices
}
