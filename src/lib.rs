//! Rebinning of two-dimensional table datasets onto regular display grids,
//! with gap filling between neighboring samples.
//!
//! Source data is a sequence of scans: each x tag (typically time) carries a
//! column of z values over y tags (typically frequency or energy). Consecutive
//! scans sharing the same y tags form a table, and a dataset may hold several
//! tables. A [`RebinDescriptor`] describes one destination axis, linear or
//! logarithmic, and a [`TableRebinner`] maps the source onto the grid spanned
//! by one or two descriptors.
//!
//! | Strategy                       | Output                    | Cost per bin              |
//! |--------------------------------|---------------------------|---------------------------|
//! | [`AverageTableRebinner`]       | new `DefaultTableDataSet` | every sample, once        |
//! | [`NearestNeighborTableRebinner`] | lazy view on the source | O(1) after construction   |
//!
//! Averaging keeps a weighted mean per bin and can patch empty bins by
//! interpolating between neighbors no further apart than the tag width allows.
//! Nearest-neighbor selection reads the closest source sample directly, and
//! reports fill where nothing is within half a tag width.
//!
//! # Example: Averaging and Nearest-Neighbor Rebinning
//! ```rust
//! use rebin2d::{
//!     AverageTableRebinner, DefaultTableDataSet, NearestNeighborTableRebinner, RebinDescriptor,
//!     TableDataSet, TableRebinner,
//! };
//! use rebin2d::units::Units;
//!
//! // Four scans of two channels
//! let ds = DefaultTableDataSet::new(
//!     vec![0.0, 1.0, 2.0, 3.0],
//!     Units::T2000,
//!     vec![10.0, 20.0],
//!     Units::HERTZ,
//!     vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
//!     Units::DIMENSIONLESS,
//! )
//! .unwrap();
//!
//! // Two bins of two seconds each
//! let x = RebinDescriptor::new(0.0, 4.0, 2, false, Units::T2000).unwrap();
//!
//! let avg = AverageTableRebinner::default().rebin_dataset(&ds, &x, None).unwrap();
//! assert_eq!(avg.x_tags(), vec![1.0, 3.0]);
//! assert_eq!(avg.value(0, 0), 2.0);
//! assert_eq!(avg.value(1, 1), 7.0);
//!
//! // Bin centers land on the scans at 1 s and 3 s
//! let nn = NearestNeighborTableRebinner::default().rebin_dataset(&ds, &x, None).unwrap();
//! assert_eq!(nn.value(0, 0), 3.0);
//! assert_eq!(nn.value(1, 1), 8.0);
//! ```
// These "needless" range loops read closer to the bin index arithmetic
#![allow(clippy::needless_range_loop)]

pub mod error;
pub use error::RebinError;

pub mod units;

pub mod descriptor;
pub use descriptor::RebinDescriptor;

pub mod dataset;
pub use dataset::{AppendTableDataSet, DefaultTableDataSet, TableDataSet, TableDataSetBuilder};

pub mod rebin;
pub use rebin::{AverageTableRebinner, InterpolateKind, RebinConfig, TableRebinner};

pub mod nearest;
pub use nearest::{NearestNeighborTableDataSet, NearestNeighborTableRebinner};

pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
