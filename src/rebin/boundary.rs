//! Filling of empty bins on the outer edges and corners of the grid.
//!
//! Bin centers on the grid's edges often fall between two source samples
//! that landed in neighboring bins, or outside the grid, leaving the edge bin
//! empty. These passes go back to the source samples bracketing the bin
//! center and interpolate between them. Only bins with zero weight are
//! written, and only when both bracketing samples are valid.
use ndarray::Array2;

use super::{fraction, InterpolateKind, Source, TagWidth};
use crate::dataset::search::matching_row;

/// Minimum bracketing span, in tag widths, for edge interpolation. Narrower
/// brackets would have put a sample in the bin already.
const MIN_EDGE_SPAN: f64 = 0.9;

/// Largest x bracketing span, in tag widths, for corners.
const MAX_CORNER_SPAN: f64 = 1.1;

/// First and last index of an axis with `n` bins, once each.
fn extremes(n: usize) -> impl Iterator<Item = usize> {
    let last = n.saturating_sub(1);
    std::iter::once(0).chain((last > 0).then_some(last))
}

/// Source columns bracketing destination x coordinate `xc`, if they are
/// distinct and their span suits `width`.
fn bracket_columns(
    src: &Source<'_>,
    xc: f64,
    width: TagWidth,
    min_span: f64,
    max_span: f64,
) -> Option<(usize, usize)> {
    let i0 = src.previous_column(xc)?;
    let i1 = src.next_column(xc)?;
    if i0 == i1 {
        return None;
    }
    let span = width.span(src.x(i0), src.x(i1));
    (span > min_span * width.width() && span <= max_span * width.width()).then_some((i0, i1))
}

/// Fill the first and last destination columns from the source columns on
/// either side of their centers, row by row. Rows are matched across a table
/// boundary by y tag.
///
/// Returns the number of bins filled.
pub fn fill_left_right(
    src: &Source<'_>,
    data: &mut Array2<f64>,
    weight: &mut Array2<f64>,
    width: TagWidth,
    kind: InterpolateKind,
) -> usize {
    // Without an x axis every column holds its own sample
    if src.x_axis.is_none() {
        return 0;
    }
    let ds = src.ds;
    let mut filled = 0;
    for ix in extremes(data.nrows()) {
        let xc = src.x_center(ix);
        let Some((i0, i1)) = bracket_columns(src, xc, width, MIN_EDGE_SPAN, kind.tolerance())
        else {
            continue;
        };
        let alpha = fraction(src.x(i0), src.x(i1), xc, false);
        let (t0, t1) = (ds.table_of_index(i0), ds.table_of_index(i1));
        for j0 in 0..ds.y_length(t0) {
            let Some(iy) = src.y_bin(t0, j0) else {
                continue;
            };
            if weight[[ix, iy]] > 0.0 {
                continue;
            }
            let j1 = if t0 == t1 {
                Some(j0)
            } else {
                matching_row(ds, t1, ds.y_tag(t0, j0))
            };
            let Some(j1) = j1 else {
                continue;
            };
            if let (Some(a), Some(b)) = (src.sample(i0, j0), src.sample(i1, j1)) {
                let (v, w) = kind.blend(a, b, alpha);
                data[[ix, iy]] = v;
                weight[[ix, iy]] = w;
                filled += 1;
            }
        }
    }
    filled
}

/// Fill the first and last destination rows from the source rows on either
/// side of their centers, table by table. The fraction is taken in log space
/// on a log y axis.
///
/// `widths` holds the y tag width of each source table.
///
/// Returns the number of bins filled.
pub fn fill_top_bottom(
    src: &Source<'_>,
    data: &mut Array2<f64>,
    weight: &mut Array2<f64>,
    widths: &[Option<TagWidth>],
    kind: InterpolateKind,
) -> usize {
    if src.y_axis.is_none() {
        return 0;
    }
    let ds = src.ds;
    let log = src.y_is_log();
    let mut filled = 0;
    for (table, width) in widths.iter().enumerate() {
        let Some(width) = *width else {
            continue;
        };
        for iy in extremes(data.ncols()) {
            let yc = src.y_center(iy);
            let Some((j0, j1)) = src.bracket_rows(table, yc) else {
                continue;
            };
            if j0 == j1 {
                continue;
            }
            let (y0, y1) = (src.y(table, j0), src.y(table, j1));
            let span = width.span(y0, y1);
            if !(span > MIN_EDGE_SPAN * width.width() && span <= kind.tolerance() * width.width()) {
                continue;
            }
            let alpha = fraction(y0, y1, yc, log);
            for i in ds.table_range(table) {
                let Some(ix) = src.x_bin(i) else {
                    continue;
                };
                if weight[[ix, iy]] > 0.0 {
                    continue;
                }
                if let (Some(a), Some(b)) = (src.sample(i, j0), src.sample(i, j1)) {
                    let (v, w) = kind.blend(a, b, alpha);
                    data[[ix, iy]] = v;
                    weight[[ix, iy]] = w;
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Fill the four corner bins from the four source samples around each
/// corner's center. Needs both axes, all four samples valid, and an x
/// bracket no wider than 1.1 tag widths.
///
/// Returns the number of bins filled.
pub fn fill_corners(
    src: &Source<'_>,
    data: &mut Array2<f64>,
    weight: &mut Array2<f64>,
    width: TagWidth,
    kind: InterpolateKind,
) -> usize {
    if src.x_axis.is_none() || src.y_axis.is_none() {
        return 0;
    }
    let ds = src.ds;
    let log = src.y_is_log();
    let mut filled = 0;
    for ix in extremes(data.nrows()) {
        let xc = src.x_center(ix);
        let Some((i0, i1)) = bracket_columns(src, xc, width, 0.0, MAX_CORNER_SPAN) else {
            continue;
        };
        let ax = fraction(src.x(i0), src.x(i1), xc, false);
        let (t0, t1) = (ds.table_of_index(i0), ds.table_of_index(i1));

        for iy in extremes(data.ncols()) {
            if weight[[ix, iy]] > 0.0 {
                continue;
            }
            let yc = src.y_center(iy);
            let (Some((j00, j01)), Some((j10, j11))) =
                (src.bracket_rows(t0, yc), src.bracket_rows(t1, yc))
            else {
                continue;
            };
            let corners = (
                src.sample(i0, j00),
                src.sample(i0, j01),
                src.sample(i1, j10),
                src.sample(i1, j11),
            );
            let (Some(s00), Some(s01), Some(s10), Some(s11)) = corners else {
                continue;
            };
            let ay0 = column_fraction(src, t0, j00, j01, yc, log);
            let ay1 = column_fraction(src, t1, j10, j11, yc, log);
            let left = kind.blend(s00, s01, ay0);
            let right = kind.blend(s10, s11, ay1);
            let (v, w) = kind.blend(left, right, ax);
            data[[ix, iy]] = v;
            weight[[ix, iy]] = w;
            filled += 1;
        }
    }
    filled
}

/// y fraction within one source column; zero when both rows coincide.
fn column_fraction(src: &Source<'_>, table: usize, j0: usize, j1: usize, yc: f64, log: bool) -> f64 {
    if j0 == j1 {
        0.0
    } else {
        fraction(src.y(table, j0), src.y(table, j1), yc, log)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dataset::{DefaultTableDataSet, TableDataSetBuilder};
    use crate::descriptor::RebinDescriptor;
    use crate::rebin::average::{accumulate, normalize};
    use crate::testing::segmented_dataset;
    use crate::units::{Units, DEFAULT_FILL};

    /// Samples every 1 s from 0 to 9 over y = 1, 2, 3 Hz with `z = x + 10 y`.
    fn grid() -> DefaultTableDataSet {
        let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
        for i in 0..10 {
            let x = i as f64;
            b.add_scan(x, &[1.0, 2.0, 3.0], &[x + 10.0, x + 20.0, x + 30.0])
                .unwrap();
        }
        b.build().unwrap()
    }

    fn working(src: &Source<'_>) -> (Array2<f64>, Array2<f64>) {
        let mut data = Array2::zeros((src.nx(), src.ny()));
        let mut weight = Array2::zeros((src.nx(), src.ny()));
        accumulate(src, &mut data, &mut weight);
        normalize(&mut data, &weight, DEFAULT_FILL);
        (data, weight)
    }

    #[test]
    fn test_left_right() {
        let ds = grid();
        // Bins of 0.4 s; neither the first bin [0.4, 0.8) nor the last bin
        // [9.6, 10) holds a sample
        let x = RebinDescriptor::new(0.4, 10.0, 24, false, Units::T2000).unwrap();
        let src = Source::new(&ds, None, Some(&x), None).unwrap();
        let (mut data, mut weight) = working(&src);
        assert_eq!(weight[[0, 0]], 0.0);

        let w = TagWidth::Linear(1.0);
        let n = fill_left_right(&src, &mut data, &mut weight, w, InterpolateKind::Linear);
        assert_eq!(n, 3);
        // Center 0.6 between x = 0 and x = 1
        assert!((data[[0, 1]] - 20.6).abs() < 1e-12);
        assert!((weight[[0, 1]] - 1.0).abs() < 1e-12);

        let (mut data, mut weight) = working(&src);
        fill_left_right(&src, &mut data, &mut weight, w, InterpolateKind::NearestNeighbor);
        assert_eq!(data[[0, 2]], 31.0);

        // A declared width far below the spacing forbids bridging
        let (mut data, mut weight) = working(&src);
        let narrow = TagWidth::Linear(0.5);
        assert_eq!(
            fill_left_right(&src, &mut data, &mut weight, narrow, InterpolateKind::Linear),
            0
        );
    }

    #[test]
    fn test_top_bottom_log() {
        let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
        for i in 0..3 {
            b.add_scan(i as f64, &[1.0, 10.0, 100.0], &[1.0, 2.0, 3.0]).unwrap();
        }
        let ds = b.build().unwrap();
        // Decade-wide bins with centers at 10^0.5 and 10^1.5
        let y = RebinDescriptor::new(1.0, 100.0, 2, true, Units::HERTZ).unwrap();
        let src = Source::new(&ds, None, None, Some(&y)).unwrap();
        let widths = [Some(TagWidth::LogRatio(10.0_f64.ln()))];

        let mut data = Array2::from_elem((3, 2), DEFAULT_FILL);
        let mut weight = Array2::zeros((3, 2));
        let n = fill_top_bottom(&src, &mut data, &mut weight, &widths, InterpolateKind::Linear);
        assert_eq!(n, 6);
        // Halfway in log space between 1 (z = 1) and 10 (z = 2)
        assert!((data[[1, 0]] - 1.5).abs() < 1e-12);
        assert!((data[[1, 1]] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_corners() {
        let ds = grid();
        let x = RebinDescriptor::new(0.4, 10.0, 24, false, Units::T2000).unwrap();
        // Bins of 0.8 Hz from 1.2; first center at 1.6, last at 2.4
        let y = RebinDescriptor::new(1.2, 2.8, 2, false, Units::HERTZ).unwrap();
        let src = Source::new(&ds, None, Some(&x), Some(&y)).unwrap();
        let mut data = Array2::from_elem((24, 2), DEFAULT_FILL);
        let mut weight = Array2::zeros((24, 2));

        let n = fill_corners(&src, &mut data, &mut weight, TagWidth::Linear(1.0), InterpolateKind::Linear);
        // The last column's center is past the data
        assert_eq!(n, 2);
        // z = x + 10 y at (0.6, 1.6)
        assert!((data[[0, 0]] - 16.6).abs() < 1e-9);
        assert!((data[[0, 1]] - 24.6).abs() < 1e-9);
        assert_eq!(weight[[23, 0]], 0.0);
    }

    #[test]
    fn test_left_right_across_tables() {
        let ds = segmented_dataset();
        // First bin [3.2, 3.6) sits between x = 3 (first table) and x = 4
        // (second table)
        let x = RebinDescriptor::new(3.2, 7.6, 11, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(0.5, 8.5, 8, false, Units::HERTZ).unwrap();
        let src = Source::new(&ds, None, Some(&x), Some(&y)).unwrap();
        let (mut data, mut weight) = working(&src);
        assert_eq!(weight[[0, 0]], 0.0);

        let n = fill_left_right(&src, &mut data, &mut weight, TagWidth::Linear(1.0), InterpolateKind::Linear);
        // Rows 1, 2, 4 and 8 Hz exist in both tables; the last bin has
        // nothing after it
        assert_eq!(n, 4);
        for (iy, yv) in [(0, 1.0), (1, 2.0), (3, 4.0), (7, 8.0)] {
            assert!((data[[0, iy]] - (3.4 + yv)).abs() < 1e-12, "row {iy}");
        }
        assert_eq!(weight[[0, 2]], 0.0);
    }

    #[test]
    fn test_top_bottom_per_table() {
        let ds = segmented_dataset();
        // Centers at 1.35 and 1.65 Hz, between the 1 and 2 Hz rows of both
        // tables
        let y = RebinDescriptor::new(1.2, 1.8, 2, false, Units::HERTZ).unwrap();
        let src = Source::new(&ds, None, None, Some(&y)).unwrap();
        let octave = Some(TagWidth::LogRatio(2.0_f64.ln()));

        let (mut data, mut weight) = working(&src);
        assert_eq!(weight.sum(), 0.0);
        let n = fill_top_bottom(&src, &mut data, &mut weight, &[octave, octave], InterpolateKind::Linear);
        assert_eq!(n, 16);
        for ix in 0..8 {
            let x = ix as f64;
            assert!((data[[ix, 0]] - (x + 1.35)).abs() < 1e-12, "column {ix}");
            assert!((data[[ix, 1]] - (x + 1.65)).abs() < 1e-12, "column {ix}");
        }

        // Each table is filled on its own width
        let (mut data, mut weight) = working(&src);
        let n = fill_top_bottom(&src, &mut data, &mut weight, &[None, octave], InterpolateKind::Linear);
        assert_eq!(n, 8);
        assert_eq!(weight[[3, 0]], 0.0);
        assert!((data[[4, 0]] - 5.35).abs() < 1e-12);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(extremes(1).collect::<Vec<_>>(), vec![0]);
        assert_eq!(extremes(4).collect::<Vec<_>>(), vec![0, 3]);
    }
}
