//! Nearest-neighbor resampling.
//!
//! A lighter alternative to averaging: each destination bin reads the single
//! closest source sample, or fill when there is none within half a tag width.
//! See [`NearestNeighborTableDataSet`] for the matching rules.

pub mod table;

pub use table::NearestNeighborTableDataSet;

use crate::dataset::{Properties, TableDataSet};
use crate::descriptor::RebinDescriptor;
use crate::error::Result;
use crate::rebin::TableRebinner;

/// [`TableRebinner`] producing a [`NearestNeighborTableDataSet`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestNeighborTableRebinner {
    overrides: Option<Properties>,
}

impl NearestNeighborTableRebinner {
    /// `overrides` are passed to every view this rebinner builds.
    pub fn new(overrides: Option<Properties>) -> Self {
        Self { overrides }
    }
}

impl TableRebinner for NearestNeighborTableRebinner {
    fn rebin_dataset<'a>(
        &self,
        source: &'a dyn TableDataSet,
        x_axis: &RebinDescriptor,
        y_axis: Option<&RebinDescriptor>,
    ) -> Result<Box<dyn TableDataSet + 'a>> {
        let view = NearestNeighborTableDataSet::new(source, x_axis, y_axis, self.overrides.clone())?;
        Ok(Box::new(view))
    }
}
