//! In-memory table dataset with arena-style storage.
//!
//! All tables share one flat z array. Each [`TableSegment`] records its x
//! index range, its y tags and the offset of its first value, so that
//! `z(i, j)` lives at `offset + (i - start) * ny + j` (C-style ordering within
//! a table). Auxiliary planes use the same layout.
use log::trace;

use super::{Properties, PropertyValue, TableDataSet};
use crate::error::{RebinError, Result};
use crate::units::Units;

/// One table: a contiguous x index range sharing a set of y tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSegment {
    start: usize,
    end: usize,
    y_tags: Vec<f64>,
    offset: usize,
    properties: Properties,
}

impl TableSegment {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn y_tags(&self) -> &[f64] {
        &self.y_tags
    }
}

/// An auxiliary plane with the same shape as z.
#[derive(Debug, Clone, PartialEq)]
struct Plane {
    id: String,
    units: Units,
    values: Vec<f64>,
}

/// A stored, immutable table dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultTableDataSet {
    x_tags: Vec<f64>,
    x_units: Units,
    y_units: Units,
    z_units: Units,
    tables: Vec<TableSegment>,
    z: Vec<f64>,
    planes: Vec<Plane>,
    properties: Properties,
}

impl DefaultTableDataSet {
    /// Single-table dataset with `z` in C-style order
    /// (z(x0, y0), z(x0, y1), ..., z(x0, yn), z(x1, y0), ...).
    ///
    /// # Errors
    /// * If there are no x or y tags
    /// * If `z.len() != x_tags.len() * y_tags.len()`
    /// * If x or y tags are not strictly increasing
    pub fn new(
        x_tags: Vec<f64>,
        x_units: Units,
        y_tags: Vec<f64>,
        y_units: Units,
        z: Vec<f64>,
        z_units: Units,
    ) -> Result<Self> {
        if x_tags.is_empty() || y_tags.is_empty() {
            return Err(RebinError::EmptyDataSet);
        }
        check_increasing(&x_tags, "x tags")?;
        check_increasing(&y_tags, "y tags")?;
        let expected = x_tags.len() * y_tags.len();
        if z.len() != expected {
            return Err(RebinError::ShapeMismatch {
                what: "z values",
                expected,
                got: z.len(),
            });
        }

        let segment = TableSegment {
            start: 0,
            end: x_tags.len(),
            y_tags,
            offset: 0,
            properties: Properties::new(),
        };
        Ok(Self {
            x_tags,
            x_units,
            y_units,
            z_units,
            tables: vec![segment],
            z,
            planes: vec![],
            properties: Properties::new(),
        })
    }

    /// Attach an auxiliary plane laid out like z.
    ///
    /// # Errors
    /// * If `values` does not have as many entries as z
    pub fn with_plane(mut self, id: &str, units: Units, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.z.len() {
            return Err(RebinError::ShapeMismatch {
                what: "plane values",
                expected: self.z.len(),
                got: values.len(),
            });
        }
        self.planes.retain(|p| p.id != id);
        self.planes.push(Plane {
            id: id.to_owned(),
            units,
            values,
        });
        Ok(self)
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }

    pub fn tables(&self) -> &[TableSegment] {
        &self.tables
    }

    /// Flat z storage, table after table.
    pub fn z_values(&self) -> &[f64] {
        &self.z
    }

    /// Flat storage of an auxiliary plane.
    pub fn plane_values(&self, plane: &str) -> Option<&[f64]> {
        self.plane(plane).map(|p| &p.values[..])
    }

    fn plane(&self, id: &str) -> Option<&Plane> {
        self.planes.iter().find(|p| p.id == id)
    }

    #[inline]
    fn flat_index(&self, i: usize, j: usize) -> usize {
        let t = &self.tables[self.table_of_index(i)];
        debug_assert!(j < t.y_tags.len(), "y index {j} out of range");
        t.offset + (i - t.start) * t.y_tags.len() + j
    }
}

impl TableDataSet for DefaultTableDataSet {
    fn x_length(&self) -> usize {
        self.x_tags.len()
    }

    fn x_tag(&self, i: usize) -> f64 {
        self.x_tags[i]
    }

    fn x_units(&self) -> &Units {
        &self.x_units
    }

    fn y_units(&self) -> &Units {
        &self.y_units
    }

    fn z_units(&self) -> &Units {
        &self.z_units
    }

    fn table_count(&self) -> usize {
        self.tables.len()
    }

    fn table_start(&self, table: usize) -> usize {
        self.tables[table].start
    }

    fn table_end(&self, table: usize) -> usize {
        self.tables[table].end
    }

    #[inline]
    fn table_of_index(&self, i: usize) -> usize {
        // Segment starts are increasing and the first one is zero
        self.tables
            .partition_point(|t| t.start <= i)
            .saturating_sub(1)
    }

    fn y_length(&self, table: usize) -> usize {
        self.tables[table].y_tags.len()
    }

    fn y_tag(&self, table: usize, j: usize) -> f64 {
        self.tables[table].y_tags[j]
    }

    #[inline]
    fn value(&self, i: usize, j: usize) -> f64 {
        self.z[self.flat_index(i, j)]
    }

    fn plane_ids(&self) -> Vec<String> {
        self.planes.iter().map(|p| p.id.clone()).collect()
    }

    fn plane_value(&self, plane: &str, i: usize, j: usize) -> Option<f64> {
        let p = self.plane(plane)?;
        Some(p.values[self.flat_index(i, j)])
    }

    fn plane_units(&self, plane: &str) -> Option<&Units> {
        self.plane(plane).map(|p| &p.units)
    }

    fn properties(&self) -> Properties {
        self.properties.clone()
    }

    fn table_properties(&self, table: usize) -> Properties {
        self.tables[table].properties.clone()
    }

    fn y_tags(&self, table: usize) -> Vec<f64> {
        self.tables[table].y_tags.clone()
    }

    fn x_tags(&self) -> Vec<f64> {
        self.x_tags.clone()
    }
}

fn check_increasing(tags: &[f64], what: &'static str) -> Result<()> {
    match tags.windows(2).position(|w| !(w[1] > w[0])) {
        Some(k) => Err(RebinError::NonMonotonic { what, index: k + 1 }),
        None if tags.iter().any(|v| !v.is_finite()) => Err(RebinError::InvalidParameter(
            format!("{what} must be finite"),
        )),
        None => Ok(()),
    }
}

/// Incremental construction of a [`DefaultTableDataSet`] from scans.
///
/// Each scan is one x sample with its y tags and z values. A new table is
/// started whenever the y tags differ from those of the current table.
///
/// ```rust
/// use rebin2d::{TableDataSet, TableDataSetBuilder, units::Units};
///
/// let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
/// b.add_scan(0.0, &[10.0, 20.0], &[1.0, 2.0]).unwrap();
/// b.add_scan(1.0, &[10.0, 20.0], &[3.0, 4.0]).unwrap();
/// b.add_scan(2.0, &[15.0, 25.0, 35.0], &[5.0, 6.0, 7.0]).unwrap();
/// let ds = b.build().unwrap();
///
/// assert_eq!(ds.table_count(), 2);
/// assert_eq!(ds.table_of_index(2), 1);
/// assert_eq!(ds.value(2, 2), 7.0);
/// ```
#[derive(Debug, Clone)]
pub struct TableDataSetBuilder {
    x_tags: Vec<f64>,
    x_units: Units,
    y_units: Units,
    z_units: Units,
    tables: Vec<TableSegment>,
    z: Vec<f64>,
    planes: Vec<Plane>,
    properties: Properties,
}

impl TableDataSetBuilder {
    pub fn new(x_units: Units, y_units: Units, z_units: Units) -> Self {
        Self {
            x_tags: vec![],
            x_units,
            y_units,
            z_units,
            tables: vec![],
            z: vec![],
            planes: vec![],
            properties: Properties::new(),
        }
    }

    /// Declare an auxiliary plane. Scans added without values for it are
    /// padded with the plane's fill value.
    pub fn with_plane(mut self, id: &str, units: Units) -> Self {
        if self.planes.iter().all(|p| p.id != id) {
            let values = vec![units.fill(); self.z.len()];
            self.planes.push(Plane {
                id: id.to_owned(),
                units,
                values,
            });
        }
        self
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(key.to_owned(), value.into());
    }

    /// Set a property on the table currently being filled.
    ///
    /// # Errors
    /// * If no scan has been added yet
    pub fn set_table_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let t = self.tables.last_mut().ok_or(RebinError::EmptyDataSet)?;
        t.properties.insert(key.to_owned(), value.into());
        Ok(())
    }

    pub fn add_scan(&mut self, x: f64, y_tags: &[f64], z: &[f64]) -> Result<()> {
        self.add_scan_with_planes(x, y_tags, z, &[])
    }

    /// Append one x sample.
    ///
    /// # Errors
    /// * If `x` is not greater than the previous x tag
    /// * If `z` or any plane's values do not match `y_tags` in length
    /// * If `y_tags` is empty or not strictly increasing
    /// * If a plane was not declared with [`TableDataSetBuilder::with_plane`]
    pub fn add_scan_with_planes(
        &mut self,
        x: f64,
        y_tags: &[f64],
        z: &[f64],
        planes: &[(&str, &[f64])],
    ) -> Result<()> {
        if !x.is_finite() {
            return Err(RebinError::InvalidParameter(format!(
                "x tag must be finite, got {x}"
            )));
        }
        if let Some(&last) = self.x_tags.last() {
            if x <= last {
                return Err(RebinError::NonMonotonic {
                    what: "x tags",
                    index: self.x_tags.len(),
                });
            }
        }
        if y_tags.is_empty() {
            return Err(RebinError::EmptyDataSet);
        }
        if z.len() != y_tags.len() {
            return Err(RebinError::ShapeMismatch {
                what: "z values",
                expected: y_tags.len(),
                got: z.len(),
            });
        }
        for (id, values) in planes {
            if values.len() != y_tags.len() {
                return Err(RebinError::ShapeMismatch {
                    what: "plane values",
                    expected: y_tags.len(),
                    got: values.len(),
                });
            }
            if self.planes.iter().all(|p| p.id != *id) {
                return Err(RebinError::UnknownPlane((*id).to_owned()));
            }
        }

        let i = self.x_tags.len();
        let same_table = self
            .tables
            .last()
            .is_some_and(|t| t.y_tags.as_slice() == y_tags);
        if same_table {
            if let Some(t) = self.tables.last_mut() {
                t.end = i + 1;
            }
        } else {
            check_increasing(y_tags, "y tags")?;
            trace!("starting table {} at x index {i}", self.tables.len());
            self.tables.push(TableSegment {
                start: i,
                end: i + 1,
                y_tags: y_tags.to_vec(),
                offset: self.z.len(),
                properties: Properties::new(),
            });
        }

        self.x_tags.push(x);
        self.z.extend_from_slice(z);
        for plane in self.planes.iter_mut() {
            match planes.iter().find(|(id, _)| *id == plane.id) {
                Some((_, values)) => plane.values.extend_from_slice(values),
                None => plane
                    .values
                    .extend(std::iter::repeat(plane.units.fill()).take(y_tags.len())),
            }
        }
        Ok(())
    }

    /// Finish building.
    ///
    /// # Errors
    /// * If no scans were added
    pub fn build(self) -> Result<DefaultTableDataSet> {
        if self.x_tags.is_empty() {
            return Err(RebinError::EmptyDataSet);
        }
        Ok(DefaultTableDataSet {
            x_tags: self.x_tags,
            x_units: self.x_units,
            y_units: self.y_units,
            z_units: self.z_units,
            tables: self.tables,
            z: self.z,
            planes: self.planes,
            properties: self.properties,
        })
    }
}
