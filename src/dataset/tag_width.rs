//! Nominal tag spacing ("tag width") of a dataset.
//!
//! The tag width is the tolerance unit for interpolation and nearest-neighbor
//! matching. Datasets may declare it through [`PROPERTY_X_TAG_WIDTH`] and
//! [`PROPERTY_Y_TAG_WIDTH`]; otherwise it is inferred from the tags.
use itertools::{Itertools, MinMaxResult};

use super::{TableDataSet, PROPERTY_X_TAG_WIDTH, PROPERTY_Y_TAG_WIDTH};
use crate::units::{Datum, Units};

fn median(mut v: Vec<f64>) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = v.len();
    if n % 2 == 1 {
        Some(v[n / 2])
    } else {
        Some(0.5 * (v[n / 2 - 1] + v[n / 2]))
    }
}

/// Range of the values relative to their median.
fn relative_spread(v: &[f64]) -> f64 {
    let Some(mid) = median(v.to_vec()) else {
        return f64::INFINITY;
    };
    match v.iter().copied().minmax() {
        MinMaxResult::MinMax(lo, hi) => (hi - lo) / mid.abs(),
        MinMaxResult::OneElement(_) => 0.0,
        MinMaxResult::NoElements => f64::INFINITY,
    }
}

/// Median spacing of the x tags, in the x interval units.
///
/// Table boundaries may break the spacing; the median ignores a few such
/// discontinuities. Returns `None` with fewer than two x tags.
pub fn guess_x_tag_width(ds: &dyn TableDataSet) -> Option<Datum> {
    let diffs = (0..ds.x_length())
        .map(|i| ds.x_tag(i))
        .tuple_windows()
        .map(|(a, b)| b - a)
        .filter(|d| *d > 0.0 && d.is_finite())
        .collect_vec();
    let w = median(diffs)?;
    Some(Datum::new(w, ds.x_units().offset_units()))
}

/// Median spacing of the y tags of `table`.
///
/// When the tags are positive and more evenly spaced in log than in value,
/// the width is returned as a natural-log ratio ([`Units::LOG_E_RATIO`]).
/// Returns `None` with fewer than two y tags.
pub fn guess_y_tag_width(ds: &dyn TableDataSet, table: usize) -> Option<Datum> {
    let tags = ds.y_tags(table);
    let diffs = tags.iter().tuple_windows().map(|(a, b)| b - a).collect_vec();
    let linear = median(diffs.clone())?;

    if tags.len() > 2 && tags[0] > 0.0 {
        let ratios = tags
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b / a).ln())
            .collect_vec();
        if relative_spread(&ratios) < relative_spread(&diffs) {
            return median(ratios).map(|w| Datum::new(w, Units::LOG_E_RATIO));
        }
    }
    Some(Datum::new(linear, ds.y_units().offset_units()))
}

/// Declared x tag width if the dataset has one, else the inferred width.
pub fn x_tag_width(ds: &dyn TableDataSet) -> Option<Datum> {
    ds.property(PROPERTY_X_TAG_WIDTH)
        .and_then(|p| p.as_datum().cloned())
        .or_else(|| guess_x_tag_width(ds))
}

/// Declared y tag width of `table` (table property, then dataset property)
/// if there is one, else the inferred width.
pub fn y_tag_width(ds: &dyn TableDataSet, table: usize) -> Option<Datum> {
    ds.table_properties(table)
        .get(PROPERTY_Y_TAG_WIDTH)
        .and_then(|p| p.as_datum().cloned())
        .or_else(|| {
            ds.property(PROPERTY_Y_TAG_WIDTH)
                .and_then(|p| p.as_datum().cloned())
        })
        .or_else(|| guess_y_tag_width(ds, table))
}
