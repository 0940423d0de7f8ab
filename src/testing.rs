use rand::Rng;
use rand::SeedableRng;
use rand::distr::StandardUniform;
use rand::rngs::StdRng;

use crate::dataset::{DefaultTableDataSet, TableDataSetBuilder, PLANE_WEIGHTS};
use crate::units::{Units, DEFAULT_FILL};

/// Fixed random seed to support repeatable testing
const SEED: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6,
    5, 4, 3, 2, 1,
];

/// Get a random number generator with a const seed for repeatable testing
pub fn rng_fixed_seed() -> StdRng {
    StdRng::from_seed(SEED)
}

/// Generate `n` random numbers using provided generator
pub fn randn<T>(rng: &mut StdRng, n: usize) -> Vec<T>
where
    StandardUniform: rand::distr::Distribution<T>,
{
    std::iter::repeat_with(|| rng.random::<T>())
        .take(n)
        .collect()
}

/// Route `log` output through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Six scans at x = 0..5 s over y = [10, 20] Hz, with the scan at x = 2
/// missing entirely.
pub fn example_dataset() -> DefaultTableDataSet {
    let f = DEFAULT_FILL;
    DefaultTableDataSet::new(
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        Units::T2000,
        vec![10.0, 20.0],
        Units::HERTZ,
        vec![1.0, 2.0, 3.0, 4.0, f, f, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
        Units::DIMENSIONLESS,
    )
    .unwrap()
}

/// Single table on a regular `nx` x `ny` grid with uniform random z and a
/// unit weights plane. x tags are `0..nx` s, y tags `1..=ny` Hz.
pub fn random_dataset(rng: &mut StdRng, nx: usize, ny: usize) -> DefaultTableDataSet {
    let x = (0..nx).map(|i| i as f64).collect();
    let y = (1..=ny).map(|j| j as f64).collect();
    let z = randn::<f64>(rng, nx * ny);
    DefaultTableDataSet::new(x, Units::T2000, y, Units::HERTZ, z, Units::DIMENSIONLESS)
        .unwrap()
        .with_plane(PLANE_WEIGHTS, Units::DIMENSIONLESS, vec![1.0; nx * ny])
        .unwrap()
}

/// Two tables with different y tags: x = 0..4 s over y = [1, 2, 4, 8] Hz,
/// then x = 4..8 s over y = [1, 2, 4, 8, 16] Hz. z is `x + y`.
pub fn segmented_dataset() -> DefaultTableDataSet {
    let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
    for (range, y) in [
        (0..4, &[1.0, 2.0, 4.0, 8.0][..]),
        (4..8, &[1.0, 2.0, 4.0, 8.0, 16.0][..]),
    ] {
        for i in range {
            let x = i as f64;
            let z: Vec<f64> = y.iter().map(|v| x + v).collect();
            b.add_scan(x, y, &z).unwrap();
        }
    }
    b.build().unwrap()
}
