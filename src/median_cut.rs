extern crate alloc;
use alloc::vec::Vec;

use rgb::RGB8;
use tracing::debug;

use crate::histogram::{to_coord, ColorItem};

/// Upper bound on the number of cells, and so on palette entries.
pub const MAX_CELLS: usize = 256;

/// Distance between adjacent values on a quantization axis.
const QUANTUM: f32 = 1.0;

/// A node of the median-cut partition.
///
/// Cells live in one arena (`Vec<ColorCell>`); neighbor relations are plain
/// indices into it. Along the axis a cell was split on, `next`/`prev` form a
/// doubly linked list. On the other axes a new cell inherits its parent's
/// neighbors as one-way references.
#[derive(Debug, Clone)]
pub struct ColorCell {
    /// Palette slot.
    pub index: usize,
    members: Vec<ColorItem>,
    /// Inclusive partition bounds per axis.
    pub min: [f32; 3],
    pub max: [f32; 3],
    volume: Option<f32>,
    splittable: bool,
    /// Representative color, set once quantization finishes.
    pub rgb: RGB8,
    pub coord: [f32; 3],
    pub next: [Option<usize>; 3],
    pub prev: [Option<usize>; 3],
    /// Largest positive deviation from `coord` still closer to this cell than to `next`.
    pub upper_err: [f32; 3],
    /// Largest negative deviation from `coord` still closer to this cell than to `prev`.
    pub lower_err: [f32; 3],
}

impl ColorCell {
    fn new(index: usize, members: Vec<ColorItem>, min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            index,
            members,
            min,
            max,
            volume: None,
            splittable: true,
            rgb: RGB8::default(),
            coord: [0.0; 3],
            next: [None; 3],
            prev: [None; 3],
            upper_err: [f32::INFINITY; 3],
            lower_err: [f32::NEG_INFINITY; 3],
        }
    }

    /// Colors assigned to this cell.
    pub fn members(&self) -> &[ColorItem] {
        &self.members
    }

    /// Per-axis (max - min) over the member colors, divided by `scale`.
    fn ranges(&self, scale: [f32; 3]) -> [f32; 3] {
        let mut lo = [f32::MAX; 3];
        let mut hi = [f32::MIN; 3];
        for item in &self.members {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(item.coord[axis]);
                hi[axis] = hi[axis].max(item.coord[axis]);
            }
        }
        core::array::from_fn(|axis| (hi[axis] - lo[axis]) / scale[axis])
    }

    /// Sum of squared normalized ranges. `None` for cells that cannot be split.
    fn volume(&mut self, scale: [f32; 3]) -> Option<f32> {
        if !self.splittable || self.members.len() < 2 {
            return None;
        }
        if self.volume.is_none() {
            let r = self.ranges(scale);
            self.volume = Some(r[0] * r[0] + r[1] * r[1] + r[2] * r[2]);
        }
        self.volume
    }

    fn widest_axis(&self, scale: [f32; 3]) -> usize {
        let r = self.ranges(scale);
        if r[0] >= r[1] {
            if r[0] >= r[2] {
                0
            } else {
                2
            }
        } else if r[1] >= r[2] {
            1
        } else {
            2
        }
    }

    /// Count-weighted mean of the members, floored and clamped to 0..=255.
    fn set_color(&mut self) {
        assert!(!self.members.is_empty(), "cell {} has no colors", self.index);

        let total: f64 = self.members.iter().map(|c| f64::from(c.count)).sum();
        let mut sum = [0.0f64; 3];
        for item in &self.members {
            // A reserved color absent from the image has count 0.
            let w = if total > 0.0 { f64::from(item.count) } else { 1.0 };
            for axis in 0..3 {
                sum[axis] += f64::from(item.coord[axis]) * w;
            }
        }
        let denom = if total > 0.0 {
            total
        } else {
            self.members.len() as f64
        };
        let channel = |axis: usize| (sum[axis] / denom).floor().clamp(0.0, 255.0) as u8;

        self.rgb = RGB8::new(channel(0), channel(1), channel(2));
        self.coord = to_coord(self.rgb);
    }
}

/// Working state of one quantization run.
struct ColorQuantizer {
    cells: Vec<ColorCell>,
    scale: [f32; 3],
}

impl ColorQuantizer {
    /// Seed cell 0 with the reserved color and cell 1 with everything else.
    fn new(items: Vec<ColorItem>, reserved: RGB8, scale: [f32; 3]) -> Self {
        let reserved_item = items
            .iter()
            .find(|c| c.rgb == reserved)
            .copied()
            .unwrap_or_else(|| ColorItem::new(reserved, 0));
        let reserved_coord = reserved_item.coord;

        let mut cells = Vec::with_capacity(MAX_CELLS);
        cells.push(ColorCell::new(
            0,
            alloc::vec![reserved_item],
            reserved_coord,
            reserved_coord,
        ));

        let others: Vec<ColorItem> = items.into_iter().filter(|c| c.rgb != reserved).collect();
        if !others.is_empty() {
            cells.push(ColorCell::new(1, others, [0.0; 3], [255.0; 3]));
        }

        Self { cells, scale }
    }

    /// Cell (other than the reserved one) with the largest volume.
    fn select(&mut self) -> Option<usize> {
        let scale = self.scale;
        let mut best: Option<(usize, f32)> = None;
        for (i, cell) in self.cells.iter_mut().enumerate().skip(1) {
            let Some(v) = cell.volume(scale) else {
                continue;
            };
            if v > best.map_or(0.0, |(_, b)| b) {
                best = Some((i, v));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Split cell `idx` at the median of its widest axis.
    fn split(&mut self, idx: usize) -> bool {
        let scale = self.scale;
        let new_index = self.cells.len();

        let cell = &mut self.cells[idx];
        let axis = cell.widest_axis(scale);
        cell.members
            .sort_unstable_by(|a, b| a.coord[axis].total_cmp(&b.coord[axis]));

        let Some(at) = split_point(&cell.members, axis) else {
            cell.splittable = false;
            return false;
        };
        let value = cell.members[at - 1].coord[axis];
        let moved = cell.members.split_off(at);
        cell.volume = None;

        let mut fresh = ColorCell::new(new_index, moved, cell.min, cell.max);
        fresh.next = cell.next;
        fresh.prev = cell.prev;
        fresh.min[axis] = value + QUANTUM;
        fresh.prev[axis] = Some(idx);
        cell.max[axis] = value;
        let successor = cell.next[axis].replace(new_index);

        if let Some(s) = successor {
            self.cells[s].prev[axis] = Some(new_index);
        }
        self.cells.push(fresh);
        true
    }

    fn run(mut self) -> Vec<ColorCell> {
        while self.cells.len() < MAX_CELLS {
            let Some(idx) = self.select() else {
                break;
            };
            // An unsplittable pick is marked and skipped next round.
            self.split(idx);
        }

        for cell in &mut self.cells {
            cell.set_color();
        }
        self.set_thresholds();
        self.cells
    }

    /// Midpoint decision boundaries between linked neighbors.
    fn set_thresholds(&mut self) {
        for i in 0..self.cells.len() {
            for axis in 0..3 {
                let cell = &self.cells[i];
                let upper = cell.next[axis].map_or(f32::INFINITY, |n| {
                    (self.cells[n].min[axis] + cell.max[axis]) / 2.0 - cell.coord[axis]
                });
                let lower = cell.prev[axis].map_or(f32::NEG_INFINITY, |p| {
                    (self.cells[p].max[axis] + cell.min[axis]) / 2.0 - cell.coord[axis]
                });
                let cell = &mut self.cells[i];
                cell.upper_err[axis] = upper;
                cell.lower_err[axis] = lower;
            }
        }
    }
}

/// Index of the first member that moves to the new cell.
///
/// `members` must be sorted along `axis`. Starts at the median and walks
/// outward until two neighbors differ, so both halves are non-empty.
fn split_point(members: &[ColorItem], axis: usize) -> Option<usize> {
    let n = members.len();
    if n < 2 {
        return None;
    }
    let boundary = |i: usize| members[i - 1].coord[axis] < members[i].coord[axis];
    let mid = n / 2;

    for d in 0..n {
        let up = mid + d;
        if up < n && boundary(up) {
            return Some(up);
        }
        if d > 0 && d < mid && boundary(mid - d) {
            return Some(mid - d);
        }
    }
    None
}

/// Partition the distinct colors of a frame into at most [`MAX_CELLS`] cells.
///
/// Cell 0 always holds `reserved` (the background or transparent color),
/// whether or not the image contains it. The returned cells have their
/// representative colors and search thresholds set.
pub fn median_cut(items: Vec<ColorItem>, reserved: RGB8, scale: [f32; 3]) -> Vec<ColorCell> {
    let distinct = items.len();
    let cells = ColorQuantizer::new(items, reserved, scale).run();
    debug!(distinct, cells = cells.len(), "median cut finished");
    cells
}
