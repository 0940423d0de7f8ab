//! Segmented table datasets.
//!
//! A table dataset is a dependent quantity `z[i][j]` where `i` runs over a
//! single x index space `0..x_length()` and `j` runs over the y tags of the
//! table (segment) that `i` falls in. Tables are contiguous runs of x
//! indices sharing one y tag array; x tags are strictly increasing across the
//! whole dataset while y tags may differ from table to table.
//!
//! ```text
//!            table 0           table 1
//! y tags   [10, 20, 30]      [15, 25]
//! x index   0  1  2  3        4  5  6
//! ```
//!
//! [`TableDataSet`] is the read-only contract shared by stored datasets
//! ([`DefaultTableDataSet`]), composites ([`AppendTableDataSet`]) and views
//! ([`PlanarView`], [`crate::NearestNeighborTableDataSet`]), so any of them can
//! be handed to a rebinner or to downstream consumers.
use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::units::{Datum, Units};

pub mod append;
pub mod search;
pub mod table;
pub mod tag_width;
pub mod view;

pub use append::AppendTableDataSet;
pub use table::{DefaultTableDataSet, TableDataSetBuilder};
pub use tag_width::{guess_x_tag_width, guess_y_tag_width, x_tag_width, y_tag_width};
pub use view::{PlanarView, XSlice, YSlice};

/// Id of the plane holding per-sample weights. Zero means no data,
/// positive values are relative confidence.
pub const PLANE_WEIGHTS: &str = "weights";

/// Nominal spacing of x tags, a [`Datum`] in x interval units.
pub const PROPERTY_X_TAG_WIDTH: &str = "x_tag_width";
/// Nominal spacing of y tags, a [`Datum`] in y interval units or in
/// ratiometric units for logarithmically spaced channels.
pub const PROPERTY_Y_TAG_WIDTH: &str = "y_tag_width";
pub const PROPERTY_TITLE: &str = "title";

/// A metadata value attached to a dataset or table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Datum(Datum),
    Number(f64),
    Text(String),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_datum(&self) -> Option<&Datum> {
        match self {
            PropertyValue::Datum(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Datum> for PropertyValue {
    fn from(d: Datum) -> Self {
        PropertyValue::Datum(d)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

/// Named metadata, ordered by key.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Read-only access to a segmented table dataset.
///
/// Index arguments are not bounds-checked beyond what slice indexing does;
/// out-of-range indices panic.
pub trait TableDataSet: Send + Sync {
    /// Number of x samples across all tables.
    fn x_length(&self) -> usize;

    /// x tag of sample `i`, in [`TableDataSet::x_units`].
    fn x_tag(&self, i: usize) -> f64;

    fn x_units(&self) -> &Units;

    fn y_units(&self) -> &Units;

    fn z_units(&self) -> &Units;

    fn table_count(&self) -> usize;

    /// First x index of `table`.
    fn table_start(&self, table: usize) -> usize;

    /// One past the last x index of `table`.
    fn table_end(&self, table: usize) -> usize;

    /// The table containing x index `i`.
    fn table_of_index(&self, i: usize) -> usize;

    fn y_length(&self, table: usize) -> usize;

    /// y tag `j` of `table`, in [`TableDataSet::y_units`].
    fn y_tag(&self, table: usize, j: usize) -> f64;

    /// z value at x index `i` and y index `j` of the table containing `i`,
    /// in [`TableDataSet::z_units`].
    fn value(&self, i: usize, j: usize) -> f64;

    /// Ids of the auxiliary planes carried alongside z.
    fn plane_ids(&self) -> Vec<String>;

    /// Value of plane `plane` at `(i, j)`, or `None` if there is no such plane.
    fn plane_value(&self, plane: &str, i: usize, j: usize) -> Option<f64>;

    fn plane_units(&self, plane: &str) -> Option<&Units>;

    /// Dataset-level metadata.
    fn properties(&self) -> Properties;

    /// Metadata of a single table; empty unless the dataset records some.
    fn table_properties(&self, _table: usize) -> Properties {
        Properties::new()
    }

    /// A single metadata entry. Table properties do not fall through here.
    fn property(&self, key: &str) -> Option<PropertyValue> {
        self.properties().remove(key)
    }

    fn table_range(&self, table: usize) -> Range<usize> {
        self.table_start(table)..self.table_end(table)
    }

    fn x_tag_datum(&self, i: usize) -> Datum {
        Datum::new(self.x_tag(i), self.x_units().clone())
    }

    fn x_tags(&self) -> Vec<f64> {
        (0..self.x_length()).map(|i| self.x_tag(i)).collect()
    }

    fn y_tags(&self, table: usize) -> Vec<f64> {
        (0..self.y_length(table))
            .map(|j| self.y_tag(table, j))
            .collect()
    }

    fn datum(&self, i: usize, j: usize) -> Datum {
        Datum::new(self.value(i, j), self.z_units().clone())
    }

    /// z value converted to `units`; fill maps to `units`' fill.
    ///
    /// # Errors
    /// * If the z units are not convertible to `units`
    fn value_in(&self, i: usize, j: usize, units: &Units) -> Result<f64> {
        self.z_units().convert(self.value(i, j), units)
    }

    fn has_plane(&self, plane: &str) -> bool {
        self.plane_units(plane).is_some()
    }

    /// Plane `plane` as a dataset of its own. On trait objects use
    /// [`PlanarView::new`].
    ///
    /// # Errors
    /// * If there is no such plane
    fn planar_view<'a>(&'a self, plane: &'a str) -> Result<PlanarView<'a>>
    where
        Self: Sized,
    {
        PlanarView::new(self, plane)
    }

    /// The scan at x index `i`.
    fn x_slice(&self, i: usize) -> XSlice<'_>
    where
        Self: Sized,
    {
        XSlice::new(self, i)
    }

    /// Row `j` of `table`, along x.
    fn y_slice(&self, table: usize, j: usize) -> YSlice<'_>
    where
        Self: Sized,
    {
        YSlice::new(self, table, j)
    }
}
