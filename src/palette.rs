extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::histogram::rgb_key;
use crate::median_cut::ColorCell;

/// Smallest GIF color-table depth (1, 2, 4 or 8 bits) holding `colors` entries.
pub fn bits_for(colors: usize) -> u8 {
    match colors {
        0..=2 => 1,
        3..=4 => 2,
        5..=16 => 4,
        _ => 8,
    }
}

/// A quantized palette together with the cell structure used to search it.
#[derive(Debug, Clone)]
pub struct Palette {
    cells: Vec<ColorCell>,
    entries: Vec<[u8; 3]>,
    bits_per_pixel: u8,
    /// Representative color -> cell.
    exact: BTreeMap<u32, usize>,
    /// Source color -> cell it was assigned to.
    owner: BTreeMap<u32, usize>,
}

impl Palette {
    /// Build a palette from finished median-cut cells. Cell `i` is palette slot `i`.
    pub fn from_cells(cells: Vec<ColorCell>) -> Self {
        assert!(!cells.is_empty(), "palette needs at least the reserved cell");

        let entries: Vec<[u8; 3]> = cells.iter().map(|c| [c.rgb.r, c.rgb.g, c.rgb.b]).collect();

        let mut exact = BTreeMap::new();
        let mut owner = BTreeMap::new();
        for cell in &cells {
            exact.entry(rgb_key(cell.rgb)).or_insert(cell.index);
            for item in cell.members() {
                owner.insert(item.key(), cell.index);
            }
        }

        Self {
            bits_per_pixel: bits_for(entries.len()),
            cells,
            entries,
            exact,
            owner,
        }
    }

    /// Palette entries, one per cell.
    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cells(&self) -> &[ColorCell] {
        &self.cells
    }

    /// Color-table depth: 1, 2, 4 or 8.
    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// Number of entries written to the color table (`2^bits_per_pixel`).
    pub fn table_len(&self) -> usize {
        1 << self.bits_per_pixel
    }

    /// The color owning slot 0.
    pub fn reserved(&self) -> RGB8 {
        self.cells[0].rgb
    }

    /// Color table bytes, padded by repeating the last entry.
    pub fn color_table(&self) -> Vec<u8> {
        let last = self.entries[self.entries.len() - 1];
        (0..self.table_len())
            .flat_map(|i| self.entries.get(i).copied().unwrap_or(last))
            .collect()
    }

    /// Slot whose representative is exactly `rgb`.
    pub fn exact(&self, rgb: RGB8) -> Option<usize> {
        self.exact.get(&rgb_key(rgb)).copied()
    }

    /// Slot that `rgb` was assigned to during quantization.
    pub fn owner(&self, rgb: RGB8) -> Option<usize> {
        self.owner.get(&rgb_key(rgb)).copied()
    }

    /// Walk the linked cells from `start` toward `color`.
    ///
    /// At each cell the deviation from its representative is checked against
    /// the midpoint thresholds, axis by axis; the first violated axis moves to
    /// that neighbor. Stops when all axes are in bounds or the violated axis
    /// has no neighbor. This is a local walk, not an exact nearest search.
    pub fn walk(&self, start: usize, color: [f32; 3]) -> usize {
        let mut current = start;
        for _ in 0..self.cells.len() {
            match self.step(&self.cells[current], color) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn step(&self, cell: &ColorCell, color: [f32; 3]) -> Option<usize> {
        for axis in 0..3 {
            let d = color[axis] - cell.coord[axis];
            if d > cell.upper_err[axis] {
                return cell.next[axis];
            }
            if d < cell.lower_err[axis] {
                return cell.prev[axis];
            }
        }
        None
    }

    /// Nearest slot by squared RGB distance (brute force), skipping the reserved slot.
    pub fn nearest(&self, color: [f32; 3]) -> usize {
        let start = if self.cells.len() > 1 { 1 } else { 0 };

        let mut best_idx = start;
        let mut best_dist = f32::MAX;

        for cell in &self.cells[start..] {
            let d: f32 = (0..3)
                .map(|axis| {
                    let delta = color[axis] - cell.coord[axis];
                    delta * delta
                })
                .sum();
            if d < best_dist {
                best_dist = d;
                best_idx = cell.index;
            }
        }

        best_idx
    }
}
