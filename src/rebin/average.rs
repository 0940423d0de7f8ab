//! Accumulation of source samples into destination bins.
use ndarray::Array2;

use super::Source;

/// Add every usable sample into its bin: `z * w` into `data` and `w` into
/// `weight`. Samples outside either axis, fill values and nonpositive
/// weights are skipped.
///
/// Returns the number of samples used.
pub fn accumulate(src: &Source<'_>, data: &mut Array2<f64>, weight: &mut Array2<f64>) -> usize {
    let ds = src.ds;
    let mut used = 0;
    for table in 0..ds.table_count() {
        // y bins depend only on the table
        let y_bins: Vec<Option<usize>> = (0..ds.y_length(table))
            .map(|j| src.y_bin(table, j))
            .collect();
        for i in ds.table_range(table) {
            let Some(ix) = src.x_bin(i) else {
                continue;
            };
            for (j, iy) in y_bins.iter().enumerate() {
                let Some(iy) = *iy else {
                    continue;
                };
                if let Some((z, w)) = src.sample(i, j) {
                    data[[ix, iy]] += z * w;
                    weight[[ix, iy]] += w;
                    used += 1;
                }
            }
        }
    }
    used
}

/// Turn weighted sums into means. Bins with no weight become `fill`.
pub fn normalize(data: &mut Array2<f64>, weight: &Array2<f64>, fill: f64) {
    ndarray::Zip::from(data).and(weight).for_each(|d, &w| {
        if w > 0.0 {
            *d /= w;
        } else {
            *d = fill;
        }
    });
}
