/// (first row, row step) for each of the four GIF interlace passes.
const PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Rows of an image in the order they are written.
///
/// Interlaced order visits every eighth row from 0, every eighth from 4,
/// every fourth from 2, then every second from 1. Each row appears once.
pub fn row_order(height: usize, interlaced: bool) -> impl Iterator<Item = usize> {
    let passes: &'static [(usize, usize)] = if interlaced { &PASSES } else { &[(0, 1)] };
    passes
        .iter()
        .flat_map(move |&(start, step)| (start..height).step_by(step))
}

/// Palette indices in write order, row by row.
pub fn reorder_rows<'a>(
    indices: &'a [u8],
    width: usize,
    height: usize,
    interlaced: bool,
) -> impl Iterator<Item = u8> + 'a {
    row_order(height, interlaced).flat_map(move |row| {
        indices[row * width..(row + 1) * width].iter().copied()
    })
}
