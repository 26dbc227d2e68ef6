extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use rgb::RGB8;

/// One distinct opaque color observed in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorItem {
    pub rgb: RGB8,
    /// Position in the quantization space (device RGB, one unit per channel step).
    pub coord: [f32; 3],
    /// Number of pixels carrying this color.
    pub count: u32,
}

impl ColorItem {
    pub fn new(rgb: RGB8, count: u32) -> Self {
        Self {
            rgb,
            coord: to_coord(rgb),
            count,
        }
    }

    pub fn key(&self) -> u32 {
        rgb_key(self.rgb)
    }
}

/// Drop the alpha byte of an ARGB pixel.
#[inline]
pub fn argb_to_rgb(argb: u32) -> RGB8 {
    RGB8::new((argb >> 16) as u8, (argb >> 8) as u8, argb as u8)
}

/// Pack a color as `0x00RRGGBB`, the lookup key used throughout the encoder.
#[inline]
pub fn rgb_key(rgb: RGB8) -> u32 {
    (u32::from(rgb.r) << 16) | (u32::from(rgb.g) << 8) | u32::from(rgb.b)
}

#[inline]
pub fn to_coord(rgb: RGB8) -> [f32; 3] {
    [f32::from(rgb.r), f32::from(rgb.g), f32::from(rgb.b)]
}

/// Round and clamp a working coordinate back onto the 8-bit grid.
#[inline]
pub fn from_coord(coord: [f32; 3]) -> RGB8 {
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    RGB8::new(channel(coord[0]), channel(coord[1]), channel(coord[2]))
}

/// Count the distinct colors of an ARGB buffer. Alpha is ignored.
///
/// Entries come back in ascending `0xRRGGBB` order so quantization is
/// deterministic regardless of pixel order.
pub fn build_histogram(pixels: &[u32]) -> Vec<ColorItem> {
    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();

    for &argb in pixels {
        *counts.entry(argb & 0x00FF_FFFF).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(key, count)| ColorItem::new(argb_to_rgb(key), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_is_ignored() {
        let hist = build_histogram(&[0xFF10_2030, 0x0010_2030, 0x8010_2030]);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].count, 3);
        assert_eq!(hist[0].rgb, RGB8::new(0x10, 0x20, 0x30));
    }

    #[test]
    fn entries_sorted_by_key() {
        let hist = build_histogram(&[0x00FF_0000, 0x0000_FF00, 0x00FF_0000, 0x0000_0001]);
        let keys: Vec<u32> = hist.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec![0x0000_0001, 0x0000_FF00, 0x00FF_0000]);
        assert_eq!(hist[2].count, 2);
    }

    #[test]
    fn coord_round_trip_clamps() {
        assert_eq!(from_coord([-12.0, 127.6, 300.0]), RGB8::new(0, 128, 255));
        let c = RGB8::new(1, 2, 3);
        assert_eq!(from_coord(to_coord(c)), c);
    }
}
