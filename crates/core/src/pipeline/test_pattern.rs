use ndarray::s;

use crate::shared::frame::VideoFrame;

/// Overwrites the top-left quarter of the luma plane with a diagonal ramp
/// that scrolls with `iteration`: `Y[y][x] = (x + y + 3 * iteration) mod 256`.
///
/// Chroma and the rest of the picture are left as decoded.
pub fn paint_luma_pattern(frame: &mut VideoFrame, iteration: usize) {
    let rows = frame.height() as usize / 2;
    let cols = frame.width() as usize / 2;
    let offset = iteration.wrapping_mul(3);

    frame
        .luma_mut()
        .slice_mut(s![..rows, ..cols])
        .indexed_iter_mut()
        .for_each(|((y, x), v)| *v = x.wrapping_add(y).wrapping_add(offset) as u8);
}
