//! Lightweight views over a [`TableDataSet`].
use super::{Properties, TableDataSet};
use crate::error::{RebinError, Result};
use crate::units::Units;

/// An auxiliary plane of a dataset presented as a dataset in its own right,
/// with the plane's values as z.
#[derive(Clone, Copy)]
pub struct PlanarView<'a> {
    source: &'a dyn TableDataSet,
    plane: &'a str,
    units: &'a Units,
}

impl<'a> PlanarView<'a> {
    /// # Errors
    /// * If `source` has no plane named `plane`
    pub fn new(source: &'a dyn TableDataSet, plane: &'a str) -> Result<Self> {
        let units = source
            .plane_units(plane)
            .ok_or_else(|| RebinError::UnknownPlane(plane.to_owned()))?;
        Ok(Self {
            source,
            plane,
            units,
        })
    }

    pub fn plane(&self) -> &str {
        self.plane
    }
}

impl TableDataSet for PlanarView<'_> {
    fn x_length(&self) -> usize {
        self.source.x_length()
    }

    fn x_tag(&self, i: usize) -> f64 {
        self.source.x_tag(i)
    }

    fn x_units(&self) -> &Units {
        self.source.x_units()
    }

    fn y_units(&self) -> &Units {
        self.source.y_units()
    }

    fn z_units(&self) -> &Units {
        self.units
    }

    fn table_count(&self) -> usize {
        self.source.table_count()
    }

    fn table_start(&self, table: usize) -> usize {
        self.source.table_start(table)
    }

    fn table_end(&self, table: usize) -> usize {
        self.source.table_end(table)
    }

    fn table_of_index(&self, i: usize) -> usize {
        self.source.table_of_index(i)
    }

    fn y_length(&self, table: usize) -> usize {
        self.source.y_length(table)
    }

    fn y_tag(&self, table: usize, j: usize) -> f64 {
        self.source.y_tag(table, j)
    }

    fn value(&self, i: usize, j: usize) -> f64 {
        self.source
            .plane_value(self.plane, i, j)
            .unwrap_or_else(|| self.units.fill())
    }

    fn plane_ids(&self) -> Vec<String> {
        vec![]
    }

    fn plane_value(&self, _plane: &str, _i: usize, _j: usize) -> Option<f64> {
        None
    }

    fn plane_units(&self, _plane: &str) -> Option<&Units> {
        None
    }

    fn properties(&self) -> Properties {
        self.source.properties()
    }

    fn table_properties(&self, table: usize) -> Properties {
        self.source.table_properties(table)
    }
}

/// One scan: the values along y at a fixed x index.
#[derive(Clone, Copy)]
pub struct XSlice<'a> {
    source: &'a dyn TableDataSet,
    i: usize,
    table: usize,
}

impl<'a> XSlice<'a> {
    pub fn new(source: &'a dyn TableDataSet, i: usize) -> Self {
        let table = source.table_of_index(i);
        Self { source, i, table }
    }

    pub fn len(&self) -> usize {
        self.source.y_length(self.table)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_tag(&self) -> f64 {
        self.source.x_tag(self.i)
    }

    pub fn tag(&self, j: usize) -> f64 {
        self.source.y_tag(self.table, j)
    }

    pub fn value(&self, j: usize) -> f64 {
        self.source.value(self.i, j)
    }

    /// `(y tag, z)` pairs in y order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.len()).map(|j| (self.tag(j), self.value(j)))
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len()).map(|j| self.value(j)).collect()
    }
}

/// Values along x at a fixed y index, within one table.
#[derive(Clone, Copy)]
pub struct YSlice<'a> {
    source: &'a dyn TableDataSet,
    table: usize,
    j: usize,
}

impl<'a> YSlice<'a> {
    pub fn new(source: &'a dyn TableDataSet, table: usize, j: usize) -> Self {
        Self { source, table, j }
    }

    pub fn len(&self) -> usize {
        self.source.table_end(self.table) - self.source.table_start(self.table)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn y_tag(&self) -> f64 {
        self.source.y_tag(self.table, self.j)
    }

    pub fn tag(&self, k: usize) -> f64 {
        self.source.x_tag(self.source.table_start(self.table) + k)
    }

    pub fn value(&self, k: usize) -> f64 {
        self.source
            .value(self.source.table_start(self.table) + k, self.j)
    }

    /// `(x tag, z)` pairs in x order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.len()).map(|k| (self.tag(k), self.value(k)))
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len()).map(|k| self.value(k)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dataset::{TableDataSetBuilder, PLANE_WEIGHTS};

    #[test]
    fn test_views() {
        let mut b = TableDataSetBuilder::new(Units::SECONDS, Units::HERTZ, Units::DIMENSIONLESS)
            .with_plane(PLANE_WEIGHTS, Units::DIMENSIONLESS);
        b.add_scan_with_planes(0.0, &[1.0, 2.0], &[1.0, 2.0], &[(PLANE_WEIGHTS, &[1.0, 0.0][..])])
            .unwrap();
        b.add_scan(1.0, &[1.0, 2.0], &[3.0, 4.0]).unwrap();
        b.add_scan(2.0, &[5.0, 6.0, 7.0], &[5.0, 6.0, 7.0]).unwrap();
        let ds = b.build().unwrap();

        let scan = ds.x_slice(2);
        assert_eq!(scan.len(), 3);
        assert_eq!(scan.x_tag(), 2.0);
        assert_eq!(scan.iter().collect::<Vec<_>>(), vec![(5.0, 5.0), (6.0, 6.0), (7.0, 7.0)]);

        let row = YSlice::new(&ds, 0, 1);
        assert_eq!(row.y_tag(), 2.0);
        assert_eq!(row.values(), vec![2.0, 4.0]);
        assert_eq!(YSlice::new(&ds, 1, 0).tag(0), 2.0);

        let w = ds.planar_view(PLANE_WEIGHTS).unwrap();
        assert_eq!(w.value(0, 0), 1.0);
        assert_eq!(w.value(0, 1), 0.0);
        assert!(w.z_units().is_fill(w.value(1, 0)));
        assert_eq!(w.table_count(), 2);
        assert!(PlanarView::new(&ds, "nope").is_err());
    }
}
