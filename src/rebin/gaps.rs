//! Interior gap filling along each destination axis.
//!
//! A gap is a maximal run of empty bins in one row (or column) of the grid.
//! Runs with a filled bin on both sides are bridged when the two boundary bin
//! centers are within the interpolation tolerance, in tag widths. Runs open at
//! one end of the grid are only filled in nearest-neighbor mode, from the
//! single boundary, and only within half a tag width of it.
use ndarray::{Array2, ArrayViewMut1};

use super::{fraction, InterpolateKind, TagWidth};

/// Fill gaps along x, one destination row at a time.
///
/// `centers` are the x bin centers, in the units of `width`.
///
/// Returns the number of bins filled.
pub fn fill_interpolate_x(
    data: &mut Array2<f64>,
    weight: &mut Array2<f64>,
    centers: &[f64],
    width: TagWidth,
    kind: InterpolateKind,
) -> usize {
    (0..data.ncols())
        .map(|iy| {
            fill_line(
                data.column_mut(iy),
                weight.column_mut(iy),
                centers,
                width,
                kind,
                false,
                false,
            )
        })
        .sum()
}

/// Fill gaps along y, one destination column at a time.
///
/// `widths` holds the y tag width for each destination x column; columns
/// without one are left alone. Fractions are taken in log space only on a
/// log axis, while the width alone decides how spans are measured. A single
/// empty bin between two filled ones is always bridged, whatever the width;
/// this allowance is kept for compatibility with existing renderings and may
/// be dropped.
///
/// Returns the number of bins filled.
pub fn fill_interpolate_y(
    data: &mut Array2<f64>,
    weight: &mut Array2<f64>,
    centers: &[f64],
    widths: &[Option<TagWidth>],
    log_axis: bool,
    kind: InterpolateKind,
) -> usize {
    let mut filled = 0;
    for (ix, width) in widths.iter().enumerate().take(data.nrows()) {
        let Some(width) = *width else {
            continue;
        };
        filled += fill_line(
            data.row_mut(ix),
            weight.row_mut(ix),
            centers,
            width,
            kind,
            log_axis,
            true,
        );
    }
    filled
}

fn fill_line(
    mut data: ArrayViewMut1<f64>,
    mut weight: ArrayViewMut1<f64>,
    centers: &[f64],
    width: TagWidth,
    kind: InterpolateKind,
    log: bool,
    single_bin_allowance: bool,
) -> usize {
    let n = centers.len();
    let nearest = kind == InterpolateKind::NearestNeighbor;
    let snap = 0.5 * width.width();
    let mut filled = 0;
    let mut prev: Option<usize> = None;

    for b in 0..n {
        if weight[b] <= 0.0 {
            continue;
        }
        match prev {
            Some(a) if b - a > 1 => {
                let bridged = width.bridges(centers[a], centers[b], kind.tolerance())
                    || (single_bin_allowance && b - a == 2);
                if bridged {
                    let (va, vb) = ((data[a], weight[a]), (data[b], weight[b]));
                    for k in a + 1..b {
                        let alpha = fraction(centers[a], centers[b], centers[k], log);
                        let (v, w) = kind.blend(va, vb, alpha);
                        data[k] = v;
                        weight[k] = w;
                        filled += 1;
                    }
                }
            }
            None if nearest => {
                for k in 0..b {
                    if width.span(centers[k], centers[b]) <= snap {
                        data[k] = data[b];
                        weight[k] = weight[b];
                        filled += 1;
                    }
                }
            }
            _ => {}
        }
        prev = Some(b);
    }

    if let (true, Some(a)) = (nearest, prev) {
        for k in a + 1..n {
            if width.span(centers[a], centers[k]) <= snap {
                data[k] = data[a];
                weight[k] = weight[a];
                filled += 1;
            }
        }
    }
    filled
}
