//! Pixel enlargement for display.
//!
//! This is a thickening of existing bins into their empty neighbors, not an
//! interpolation. Passes run in a fixed order and a later pass overwrites
//! what an earlier one wrote, so the result depends on that order. Enlarged
//! bins keep zero weight; only `data` changes.
use ndarray::Array2;

/// Number of enlargement iterations.
pub const ENLARGE_ITERATIONS: usize = 5;

/// Copy values into empty neighboring bins, [`ENLARGE_ITERATIONS`] times.
///
/// Each iteration makes four passes, each pulling from the neighbor on one
/// side: left to right (from `ix + 1`), right to left (from `ix - 1`), top
/// to bottom (from `iy + 1`) and bottom to top (from `iy - 1`). Any bin with
/// zero weight is a target, including one an earlier pass already wrote.
/// A neighbor is a source if it has weight or was written by an earlier pass.
///
/// Returns the number of bins enlarged.
pub fn enlarge_pixels(data: &mut Array2<f64>, weight: &Array2<f64>) -> usize {
    let (nx, ny) = data.dim();
    let mut filled = weight.mapv(|w| w > 0.0);

    let pull = |data: &mut Array2<f64>, filled: &mut Array2<bool>, to: [usize; 2], from: [usize; 2]| {
        if weight[to] <= 0.0 && filled[from] {
            data[to] = data[from];
            filled[to] = true;
        }
    };

    for _ in 0..ENLARGE_ITERATIONS {
        for ix in 0..nx.saturating_sub(1) {
            for iy in 0..ny {
                pull(data, &mut filled, [ix, iy], [ix + 1, iy]);
            }
        }
        for ix in (1..nx).rev() {
            for iy in 0..ny {
                pull(data, &mut filled, [ix, iy], [ix - 1, iy]);
            }
        }
        for iy in 0..ny.saturating_sub(1) {
            for ix in 0..nx {
                pull(data, &mut filled, [ix, iy], [ix, iy + 1]);
            }
        }
        for iy in (1..ny).rev() {
            for ix in 0..nx {
                pull(data, &mut filled, [ix, iy], [ix, iy - 1]);
            }
        }
    }

    filled
        .iter()
        .zip(weight.iter())
        .filter(|(f, w)| **f && **w <= 0.0)
        .count()
}
