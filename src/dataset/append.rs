//! Zero-copy concatenation of table datasets along x.
use log::debug;

use super::{Properties, TableDataSet};
use crate::error::{RebinError, Result};
use crate::units::{Units, UnitsConverter};

/// Several datasets presented as one, in order along x.
///
/// Calls are forwarded to the part holding the requested index, with x, y and
/// z values converted to the units of the first part. Nothing is copied.
///
/// ```rust
/// use rebin2d::{AppendTableDataSet, DefaultTableDataSet, TableDataSet, units::Units};
///
/// let part = |x0: f64, n: usize| {
///     let x = (0..n).map(|i| x0 + i as f64).collect();
///     DefaultTableDataSet::new(x, Units::T2000, vec![1.0], Units::HERTZ, vec![0.0; n], Units::DIMENSIONLESS)
///         .unwrap()
/// };
/// let (a, b) = (part(0.0, 5), part(5.0, 7));
/// let ds = AppendTableDataSet::new(vec![&a, &b]).unwrap();
///
/// assert_eq!(ds.table_count(), 2);
/// assert_eq!(ds.table_of_index(5), 1);
/// assert_eq!(ds.x_length(), 12);
/// ```
pub struct AppendTableDataSet<'a> {
    parts: Vec<Part<'a>>,

    /// First global x index of each part, plus the total length
    x_offsets: Vec<usize>,

    /// First global table index of each part, plus the total count
    table_offsets: Vec<usize>,
}

struct Part<'a> {
    ds: &'a dyn TableDataSet,
    x: UnitsConverter,
    y: UnitsConverter,
    z: UnitsConverter,
}

impl<'a> AppendTableDataSet<'a> {
    /// # Errors
    /// * If `parts` is empty
    /// * If any part's units are not convertible to the first part's
    /// * If x tags do not keep increasing across part boundaries
    pub fn new(parts: Vec<&'a dyn TableDataSet>) -> Result<Self> {
        let first = *parts.first().ok_or(RebinError::EmptyDataSet)?;
        let (xu, yu, zu) = (first.x_units(), first.y_units(), first.z_units());

        let mut x_offsets = vec![0];
        let mut table_offsets = vec![0];
        let mut out: Vec<Part<'a>> = Vec::with_capacity(parts.len());
        let mut last_x: Option<f64> = None;
        for ds in parts {
            let part = Part {
                ds,
                x: ds.x_units().converter_to(xu)?,
                y: ds.y_units().converter_to(yu)?,
                z: ds.z_units().converter_to(zu)?,
            };
            let n = ds.x_length();
            if n > 0 {
                let x0 = part.x.convert(ds.x_tag(0));
                if let Some(prev) = last_x {
                    if x0 <= prev {
                        return Err(RebinError::NonMonotonic {
                            what: "x tags across appended datasets",
                            index: x_offsets[x_offsets.len() - 1],
                        });
                    }
                }
                last_x = Some(part.x.convert(ds.x_tag(n - 1)));
            }
            x_offsets.push(x_offsets[x_offsets.len() - 1] + n);
            table_offsets.push(table_offsets[table_offsets.len() - 1] + ds.table_count());
            out.push(part);
        }
        debug!(
            "appended {} datasets: {} x samples in {} tables",
            out.len(),
            x_offsets[out.len()],
            table_offsets[out.len()]
        );

        Ok(Self {
            parts: out,
            x_offsets,
            table_offsets,
        })
    }

    /// Two datasets, `a` before `b`.
    pub fn append(a: &'a dyn TableDataSet, b: &'a dyn TableDataSet) -> Result<Self> {
        Self::new(vec![a, b])
    }

    /// Part holding global x index `i`, and the local index.
    #[inline]
    fn locate(&self, i: usize) -> (&Part<'a>, usize) {
        let p = self.x_offsets[1..]
            .partition_point(|&end| end <= i)
            .min(self.parts.len() - 1);
        (&self.parts[p], i - self.x_offsets[p])
    }

    /// Part holding global table `table`, and the local table index.
    #[inline]
    fn locate_table(&self, table: usize) -> (&Part<'a>, usize) {
        let p = self.table_offsets[1..]
            .partition_point(|&end| end <= table)
            .min(self.parts.len() - 1);
        (&self.parts[p], table - self.table_offsets[p])
    }

    fn part_index_of_table(&self, table: usize) -> usize {
        self.table_offsets[1..]
            .partition_point(|&end| end <= table)
            .min(self.parts.len() - 1)
    }
}

impl TableDataSet for AppendTableDataSet<'_> {
    fn x_length(&self) -> usize {
        self.x_offsets[self.parts.len()]
    }

    fn x_tag(&self, i: usize) -> f64 {
        let (part, k) = self.locate(i);
        part.x.convert(part.ds.x_tag(k))
    }

    fn x_units(&self) -> &Units {
        self.parts[0].ds.x_units()
    }

    fn y_units(&self) -> &Units {
        self.parts[0].ds.y_units()
    }

    fn z_units(&self) -> &Units {
        self.parts[0].ds.z_units()
    }

    fn table_count(&self) -> usize {
        self.table_offsets[self.parts.len()]
    }

    fn table_start(&self, table: usize) -> usize {
        let p = self.part_index_of_table(table);
        let part = &self.parts[p];
        self.x_offsets[p] + part.ds.table_start(table - self.table_offsets[p])
    }

    fn table_end(&self, table: usize) -> usize {
        let p = self.part_index_of_table(table);
        let part = &self.parts[p];
        self.x_offsets[p] + part.ds.table_end(table - self.table_offsets[p])
    }

    fn table_of_index(&self, i: usize) -> usize {
        let p = self.x_offsets[1..]
            .partition_point(|&end| end <= i)
            .min(self.parts.len() - 1);
        let part = &self.parts[p];
        self.table_offsets[p] + part.ds.table_of_index(i - self.x_offsets[p])
    }

    fn y_length(&self, table: usize) -> usize {
        let (part, t) = self.locate_table(table);
        part.ds.y_length(t)
    }

    fn y_tag(&self, table: usize, j: usize) -> f64 {
        let (part, t) = self.locate_table(table);
        part.y.convert(part.ds.y_tag(t, j))
    }

    fn value(&self, i: usize, j: usize) -> f64 {
        let (part, k) = self.locate(i);
        part.z.convert(part.ds.value(k, j))
    }

    /// Planes present in every part.
    fn plane_ids(&self) -> Vec<String> {
        let mut ids = self.parts[0].ds.plane_ids();
        ids.retain(|id| self.parts.iter().all(|p| p.ds.has_plane(id)));
        ids
    }

    fn plane_value(&self, plane: &str, i: usize, j: usize) -> Option<f64> {
        let units = self.plane_units(plane)?;
        let (part, k) = self.locate(i);
        let v = part.ds.plane_value(plane, k, j)?;
        part.ds.plane_units(plane)?.convert(v, units).ok()
    }

    fn plane_units(&self, plane: &str) -> Option<&Units> {
        if self.parts.iter().all(|p| p.ds.has_plane(plane)) {
            self.parts[0].ds.plane_units(plane)
        } else {
            None
        }
    }

    /// Properties of the first part.
    fn properties(&self) -> Properties {
        self.parts[0].ds.properties()
    }

    fn table_properties(&self, table: usize) -> Properties {
        let (part, t) = self.locate_table(table);
        part.ds.table_properties(t)
    }
}
