//! Index searches over increasing tag sequences.
//!
//! Tags are read through a closure so the same searches work on x tags of
//! any [`TableDataSet`], on the y tags of one of its tables, or on plain
//! slices.
use super::TableDataSet;

/// Distance measure between two tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `|a - b|`
    Linear,
    /// `|ln(a / b)|`, for positive tags on ratiometric axes
    LogRatio,
}

impl Metric {
    #[inline]
    pub fn distance(self, a: f64, b: f64) -> f64 {
        match self {
            Metric::Linear => (a - b).abs(),
            Metric::LogRatio => (a / b).ln().abs(),
        }
    }
}

/// First index in `0..len` whose tag is not less than `target`,
/// assuming increasing tags. Same contract as `slice::partition_point`, for
/// tags that are only reachable by index.
#[inline]
fn lower_bound(len: usize, tag: impl Fn(usize) -> f64, target: f64) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if tag(mid) < target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Largest index whose tag is `<= target`.
pub fn previous_index(len: usize, tag: impl Fn(usize) -> f64, target: f64) -> Option<usize> {
    let i = lower_bound(len, &tag, target);
    if i < len && tag(i) == target {
        Some(i)
    } else {
        i.checked_sub(1)
    }
}

/// Smallest index whose tag is `>= target`.
pub fn next_index(len: usize, tag: impl Fn(usize) -> f64, target: f64) -> Option<usize> {
    let i = lower_bound(len, tag, target);
    (i < len).then_some(i)
}

/// Closest index to `target`, walking outward from `guess`.
///
/// With increasing tags the distance to `target` is unimodal in the index,
/// so starting from the previous match of an increasing sequence of targets
/// keeps the total cost linear. Ties resolve to the lower index.
///
/// Panics if `len` is zero.
pub fn closest_index_from(
    len: usize,
    tag: impl Fn(usize) -> f64,
    target: f64,
    guess: usize,
    metric: Metric,
) -> usize {
    assert!(len > 0, "cannot search an empty tag sequence");
    let mut i = guess.min(len - 1);
    let mut d = metric.distance(tag(i), target);
    while i > 0 {
        let dl = metric.distance(tag(i - 1), target);
        if dl <= d {
            i -= 1;
            d = dl;
        } else {
            break;
        }
    }
    while i + 1 < len {
        let dr = metric.distance(tag(i + 1), target);
        if dr < d {
            i += 1;
            d = dr;
        } else {
            break;
        }
    }
    i
}

/// Index of the y tag in `table` equal to `y` within a relative tolerance.
pub fn matching_row(ds: &dyn TableDataSet, table: usize, y: f64) -> Option<usize> {
    let n = ds.y_length(table);
    if n == 0 {
        return None;
    }
    let j = closest_index_from(n, |j| ds.y_tag(table, j), y, 0, Metric::Linear);
    let tol = 1e-9 * y.abs().max(f64::MIN_POSITIVE);
    ((ds.y_tag(table, j) - y).abs() <= tol).then_some(j)
}

/// Largest x index whose tag is `<= x`.
pub fn previous_column(ds: &dyn TableDataSet, x: f64) -> Option<usize> {
    previous_index(ds.x_length(), |i| ds.x_tag(i), x)
}

/// Smallest x index whose tag is `>= x`.
pub fn next_column(ds: &dyn TableDataSet, x: f64) -> Option<usize> {
    next_index(ds.x_length(), |i| ds.x_tag(i), x)
}
