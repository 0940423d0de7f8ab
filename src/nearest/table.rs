//! Nearest-sample view of a table dataset on a destination grid.
use std::collections::HashMap;

use log::debug;

use crate::dataset::search::{closest_index_from, Metric};
use crate::dataset::{
    x_tag_width, y_tag_width, Properties, TableDataSet, PROPERTY_X_TAG_WIDTH,
    PROPERTY_Y_TAG_WIDTH,
};
use crate::descriptor::RebinDescriptor;
use crate::error::{RebinError, Result};
use crate::rebin::TagWidth;
use crate::units::{Datum, Units};

/// A source dataset sampled at the destination bin centers.
///
/// Each destination bin takes the value of the closest source sample, as
/// long as that sample is within half a tag width of the bin center along
/// both axes; otherwise it reads as the z fill value. Nothing is averaged and
/// nothing is copied: the index maps are computed once and every accessor
/// reads through them.
///
/// ```rust
/// use rebin2d::{NearestNeighborTableDataSet, RebinDescriptor, TableDataSet, TableDataSetBuilder};
/// use rebin2d::units::Units;
///
/// let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
/// for i in 0..4 {
///     b.add_scan(i as f64, &[10.0, 20.0], &[i as f64, 10.0 + i as f64]).unwrap();
/// }
/// let ds = b.build().unwrap();
///
/// // Half-second bins: every other bin center sits on a sample
/// let x = RebinDescriptor::new(-0.25, 3.75, 8, false, Units::T2000).unwrap();
/// let nn = NearestNeighborTableDataSet::new(&ds, &x, None, None).unwrap();
///
/// assert_eq!(nn.x_length(), 8);
/// assert_eq!(nn.value(2, 1), 11.0);
/// assert_eq!(nn.value(3, 0), 1.0);
/// ```
pub struct NearestNeighborTableDataSet<'a> {
    source: &'a dyn TableDataSet,
    x_axis: RebinDescriptor,
    y_tags: Vec<f64>,
    y_units: Units,

    /// Per destination x bin: the source x index and its slot in `y_maps`
    x_map: Vec<Option<(usize, usize)>>,

    /// Per distinct source table touched by `x_map`: source row of each y bin
    y_maps: Vec<Vec<Option<usize>>>,

    properties: Properties,
}

impl<'a> NearestNeighborTableDataSet<'a> {
    /// Precompute the index maps from destination bins to source samples.
    ///
    /// The effective tag width along each axis is the larger of the source's
    /// (declared or inferred) width and the width given in `overrides` under
    /// [`PROPERTY_X_TAG_WIDTH`] or [`PROPERTY_Y_TAG_WIDTH`]. Without either,
    /// the destination bin width is used. `overrides` also take precedence
    /// over the source's properties when reading [`TableDataSet::properties`].
    ///
    /// # Errors
    /// * If the source has no tables or no x samples
    /// * If `y_axis` is `None` and the source has more than one table
    /// * If the axes' units are not convertible to the source's
    pub fn new(
        source: &'a dyn TableDataSet,
        x_axis: &RebinDescriptor,
        y_axis: Option<&RebinDescriptor>,
        overrides: Option<Properties>,
    ) -> Result<Self> {
        if source.table_count() == 0 || source.x_length() == 0 {
            return Err(RebinError::EmptyDataSet);
        }
        if y_axis.is_none() && source.table_count() > 1 {
            return Err(RebinError::AmbiguousYTags {
                tables: source.table_count(),
            });
        }
        let overrides = overrides.unwrap_or_default();

        // x map, scanning outward from the previous match
        let to_x = source.x_units().converter_to(x_axis.units())?;
        let x_interval = x_axis.units().offset_units();
        let x_width = effective_width(
            x_tag_width(source),
            overridden(&overrides, PROPERTY_X_TAG_WIDTH),
            &x_interval,
        )?
        .unwrap_or_else(|| TagWidth::from_axis(x_axis));
        let x_metric = metric(x_width);

        let nx = x_axis.number_of_bins();
        let n_source = source.x_length();
        let mut x_match: Vec<Option<usize>> = Vec::with_capacity(nx);
        let mut guess = 0;
        let mut rejected = 0;
        for ix in 0..nx {
            let center = x_axis.bin_center(ix);
            let i = closest_index_from(n_source, |i| to_x.convert(source.x_tag(i)), center, guess, x_metric);
            guess = i;
            if x_metric.distance(to_x.convert(source.x_tag(i)), center) <= 0.5 * x_width.width() {
                x_match.push(Some(i));
            } else {
                x_match.push(None);
                rejected += 1;
            }
        }

        // y maps, once per distinct table
        let (y_tags, y_units) = match y_axis {
            Some(a) => (a.bin_centers(), a.units().clone()),
            None => (source.y_tags(0), source.y_units().clone()),
        };
        let to_y = source.y_units().converter_to(&y_units)?;
        let y_interval = y_units.offset_units();
        let y_override = overridden(&overrides, PROPERTY_Y_TAG_WIDTH);

        let mut slots: HashMap<usize, usize> = HashMap::new();
        let mut y_maps: Vec<Vec<Option<usize>>> = vec![];
        let mut x_map = Vec::with_capacity(nx);
        for m in x_match {
            let Some(i) = m else {
                x_map.push(None);
                continue;
            };
            let table = source.table_of_index(i);
            let slot = match slots.get(&table) {
                Some(&slot) => slot,
                None => {
                    let map = match y_axis {
                        Some(a) => {
                            let width = effective_width(y_tag_width(source, table), y_override.clone(), &y_interval)?
                                .unwrap_or_else(|| TagWidth::from_axis(a));
                            y_map(source, table, &y_tags, width, |v| to_y.convert(v))
                        }
                        None => (0..y_tags.len()).map(Some).collect(),
                    };
                    y_maps.push(map);
                    slots.insert(table, y_maps.len() - 1);
                    y_maps.len() - 1
                }
            };
            x_map.push(Some((i, slot)));
        }

        debug!(
            "nearest neighbor: {} of {nx} x bins matched, {rejected} beyond tolerance, {} tables mapped",
            nx - rejected,
            y_maps.len()
        );

        let mut properties = source.properties();
        properties.extend(overrides);

        Ok(Self {
            source,
            x_axis: x_axis.clone(),
            y_tags,
            y_units,
            x_map,
            y_maps,
            properties,
        })
    }

    /// Source `(i, j)` feeding destination bin `(ix, iy)`, if any.
    #[inline]
    pub fn source_index(&self, ix: usize, iy: usize) -> Option<(usize, usize)> {
        let (i, slot) = self.x_map[ix]?;
        let j = self.y_maps[slot][iy]?;
        Some((i, j))
    }

    pub fn source(&self) -> &'a dyn TableDataSet {
        self.source
    }
}

fn overridden(overrides: &Properties, key: &str) -> Option<Datum> {
    overrides.get(key).and_then(|p| p.as_datum().cloned())
}

fn metric(width: TagWidth) -> Metric {
    match width {
        TagWidth::Linear(_) => Metric::Linear,
        TagWidth::LogRatio(_) => Metric::LogRatio,
    }
}

/// Larger of the source's width and the override. An override that cannot
/// be compared with the source's width replaces it.
fn effective_width(
    source: Option<Datum>,
    overridden: Option<Datum>,
    interval: &Units,
) -> Result<Option<TagWidth>> {
    let width = match (source, overridden) {
        (Some(s), Some(o)) => Some(s.max(&o).unwrap_or(o)),
        (s, o) => o.or(s),
    };
    width
        .map(|w| TagWidth::from_datum(&w, interval))
        .transpose()
}

/// Closest source row of `table` for each destination y tag, within half
/// of `width`.
fn y_map(
    source: &dyn TableDataSet,
    table: usize,
    targets: &[f64],
    width: TagWidth,
    convert: impl Fn(f64) -> f64,
) -> Vec<Option<usize>> {
    let n = source.y_length(table);
    let m = metric(width);
    let tag = |j: usize| convert(source.y_tag(table, j));
    let mut guess = 0;
    targets
        .iter()
        .map(|&target| {
            if n == 0 {
                return None;
            }
            let j = closest_index_from(n, tag, target, guess, m);
            guess = j;
            (m.distance(tag(j), target) <= 0.5 * width.width()).then_some(j)
        })
        .collect()
}

impl TableDataSet for NearestNeighborTableDataSet<'_> {
    fn x_length(&self) -> usize {
        self.x_axis.number_of_bins()
    }

    fn x_tag(&self, i: usize) -> f64 {
        self.x_axis.bin_center(i)
    }

    fn x_units(&self) -> &Units {
        self.x_axis.units()
    }

    fn y_units(&self) -> &Units {
        &self.y_units
    }

    fn z_units(&self) -> &Units {
        self.source.z_units()
    }

    fn table_count(&self) -> usize {
        1
    }

    fn table_start(&self, _table: usize) -> usize {
        0
    }

    fn table_end(&self, _table: usize) -> usize {
        self.x_length()
    }

    fn table_of_index(&self, _i: usize) -> usize {
        0
    }

    fn y_length(&self, _table: usize) -> usize {
        self.y_tags.len()
    }

    fn y_tag(&self, _table: usize, j: usize) -> f64 {
        self.y_tags[j]
    }

    fn value(&self, i: usize, j: usize) -> f64 {
        match self.source_index(i, j) {
            Some((si, sj)) => self.source.value(si, sj),
            None => self.source.z_units().fill(),
        }
    }

    fn plane_ids(&self) -> Vec<String> {
        self.source.plane_ids()
    }

    fn plane_value(&self, plane: &str, i: usize, j: usize) -> Option<f64> {
        let units = self.source.plane_units(plane)?;
        match self.source_index(i, j) {
            Some((si, sj)) => self.source.plane_value(plane, si, sj),
            None => Some(units.fill()),
        }
    }

    fn plane_units(&self, plane: &str) -> Option<&Units> {
        self.source.plane_units(plane)
    }

    /// Source properties with the overrides applied.
    fn properties(&self) -> Properties {
        self.properties.clone()
    }
}
