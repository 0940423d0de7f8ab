//! Averaging rebinner and the rebinning strategy interface.
//!
//! [`AverageTableRebinner`] maps every valid source sample into a destination
//! bin and keeps the weighted mean, then optionally patches empty bins:
//!
//! 1. accumulation and normalization ([`average`])
//! 2. edges and corners of the grid ([`boundary`])
//! 3. interior gaps along x, then y ([`gaps`])
//! 4. pixel enlargement, only when interpolation is off ([`enlarge`])
//!
//! Each stage is a free function over the `[nx, ny]` working arrays, so it can
//! be run and tested on its own. Empty bins hold the z fill value and zero
//! weight throughout.
//!
//! ```rust
//! use rebin2d::{AverageTableRebinner, RebinDescriptor, TableDataSet, TableDataSetBuilder};
//! use rebin2d::units::Units;
//!
//! let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
//! for i in 0..4 {
//!     b.add_scan(i as f64, &[10.0, 20.0], &[i as f64, 2.0 * i as f64]).unwrap();
//! }
//! let ds = b.build().unwrap();
//!
//! let x = RebinDescriptor::new(0.0, 4.0, 2, false, Units::T2000).unwrap();
//! let out = AverageTableRebinner::default().rebin(&ds, None, Some(&x), None).unwrap();
//!
//! assert_eq!(out.x_tags(), vec![1.0, 3.0]);
//! assert_eq!(out.value(0, 0), 0.5);
//! assert_eq!(out.value(1, 1), 5.0);
//! ```
use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dataset::{
    x_tag_width, y_tag_width, DefaultTableDataSet, TableDataSet, PLANE_WEIGHTS,
    PROPERTY_X_TAG_WIDTH, PROPERTY_Y_TAG_WIDTH,
};
use crate::descriptor::RebinDescriptor;
use crate::error::{RebinError, Result};
use crate::units::{Datum, Units, UnitsConverter};

pub mod average;
pub mod boundary;
pub mod enlarge;
pub mod gaps;

/// How empty bins are patched from their neighbors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterpolateKind {
    /// Fraction-weighted blend of the two bracketing values.
    #[default]
    Linear,

    /// Copy of whichever bracketing value is closer.
    NearestNeighbor,
}

impl InterpolateKind {
    /// Largest bracketing span, in tag widths, that may be bridged.
    pub fn tolerance(self) -> f64 {
        match self {
            InterpolateKind::Linear => 1.5,
            InterpolateKind::NearestNeighbor => 1.1,
        }
    }

    /// Combine two `(value, weight)` pairs at fraction `alpha` from `a` to `b`.
    #[inline]
    pub fn blend(self, a: (f64, f64), b: (f64, f64), alpha: f64) -> (f64, f64) {
        match self {
            InterpolateKind::Linear => (
                a.0 * (1.0 - alpha) + b.0 * alpha,
                a.1 * (1.0 - alpha) + b.1 * alpha,
            ),
            InterpolateKind::NearestNeighbor => {
                if alpha <= 0.5 {
                    a
                } else {
                    b
                }
            }
        }
    }
}

/// Caller settings for [`AverageTableRebinner`].
///
/// ```rust
/// use rebin2d::{InterpolateKind, RebinConfig};
///
/// let cfg: RebinConfig = serde_json::from_str(r#"{"interpolate_kind": "nearest_neighbor"}"#).unwrap();
/// assert!(cfg.interpolate);
/// assert_eq!(cfg.interpolate_kind, InterpolateKind::NearestNeighbor);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RebinConfig {
    /// Run the boundary and gap passes.
    pub interpolate: bool,

    pub interpolate_kind: InterpolateKind,

    /// Thicken pixels when `interpolate` is off. Display only: enlarged bins
    /// keep zero weight.
    pub enlarge_pixels: bool,

    /// Replaces the source's x tag width.
    pub x_tag_width: Option<Datum>,

    /// Replaces the source's y tag width.
    pub y_tag_width: Option<Datum>,
}

impl Default for RebinConfig {
    fn default() -> Self {
        Self {
            interpolate: true,
            interpolate_kind: InterpolateKind::Linear,
            enlarge_pixels: true,
            x_tag_width: None,
            y_tag_width: None,
        }
    }
}

/// Nominal tag spacing, either as a difference or as a natural-log ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagWidth {
    Linear(f64),
    LogRatio(f64),
}

impl TagWidth {
    /// Express `width` in `interval` units, or as a log ratio if ratiometric.
    ///
    /// # Errors
    /// * If a non-ratiometric width is not convertible to `interval`
    pub fn from_datum(width: &Datum, interval: &Units) -> Result<Self> {
        match width.log_ratio() {
            Some(r) => Ok(TagWidth::LogRatio(r)),
            None => Ok(TagWidth::Linear(width.value_in(interval)?)),
        }
    }

    /// Pitch of a destination axis, as a log ratio on log axes.
    pub fn from_axis(axis: &RebinDescriptor) -> Self {
        if axis.is_log() {
            TagWidth::LogRatio(axis.bin_width())
        } else {
            TagWidth::Linear(axis.bin_width())
        }
    }

    pub fn width(self) -> f64 {
        match self {
            TagWidth::Linear(w) | TagWidth::LogRatio(w) => w,
        }
    }

    /// The larger of two widths of the same kind; `self` if they differ in kind.
    pub fn wider(self, other: TagWidth) -> TagWidth {
        match (self, other) {
            (TagWidth::Linear(a), TagWidth::Linear(b)) if b > a => other,
            (TagWidth::LogRatio(a), TagWidth::LogRatio(b)) if b > a => other,
            _ => self,
        }
    }

    /// Distance from `a` to `b` measured the same way as the width.
    #[inline]
    pub fn span(self, a: f64, b: f64) -> f64 {
        match self {
            TagWidth::Linear(_) => (b - a).abs(),
            TagWidth::LogRatio(_) => (b / a).ln().abs(),
        }
    }

    /// Whether `a` and `b` are within `factor` widths of each other.
    #[inline]
    pub fn bridges(self, a: f64, b: f64, factor: f64) -> bool {
        self.span(a, b) <= factor * self.width()
    }
}

/// Fraction of the way from `a` to `b` at `v`, in log space if `log`.
#[inline]
pub(crate) fn fraction(a: f64, b: f64, v: f64, log: bool) -> f64 {
    if log {
        (v / a).ln() / (b / a).ln()
    } else {
        (v - a) / (b - a)
    }
}

/// A source dataset read in the destination axes' units.
///
/// Bins along an axis without a descriptor are the source indices themselves
/// (the first table's y indices for y).
pub struct Source<'a> {
    pub ds: &'a dyn TableDataSet,
    weights: Option<&'a dyn TableDataSet>,
    pub x_axis: Option<&'a RebinDescriptor>,
    pub y_axis: Option<&'a RebinDescriptor>,

    /// Source x units to destination x units
    x_conv: UnitsConverter,
    /// Destination x units to source x units
    x_back: UnitsConverter,
    y_conv: UnitsConverter,
    y_back: UnitsConverter,

    /// Destination units of each axis
    x_units: Units,
    y_units: Units,
}

impl<'a> Source<'a> {
    /// # Errors
    /// * If the source has no tables or no x samples
    /// * If the weights do not have the shape of the source
    /// * If a descriptor's units are not convertible to the source's
    /// * If `y_axis` is `None` and the source has several tables
    pub fn new(
        ds: &'a dyn TableDataSet,
        weights: Option<&'a dyn TableDataSet>,
        x_axis: Option<&'a RebinDescriptor>,
        y_axis: Option<&'a RebinDescriptor>,
    ) -> Result<Self> {
        if ds.table_count() == 0 || ds.x_length() == 0 {
            return Err(RebinError::EmptyDataSet);
        }
        if y_axis.is_none() && ds.table_count() > 1 {
            return Err(RebinError::AmbiguousYTags {
                tables: ds.table_count(),
            });
        }
        if let Some(w) = weights {
            check_same_shape(ds, w)?;
        }

        let x_units = x_axis.map_or_else(|| ds.x_units().clone(), |a| a.units().clone());
        let y_units = y_axis.map_or_else(|| ds.y_units().clone(), |a| a.units().clone());
        Ok(Self {
            ds,
            weights,
            x_axis,
            y_axis,
            x_conv: ds.x_units().converter_to(&x_units)?,
            x_back: x_units.converter_to(ds.x_units())?,
            y_conv: ds.y_units().converter_to(&y_units)?,
            y_back: y_units.converter_to(ds.y_units())?,
            x_units,
            y_units,
        })
    }

    pub fn nx(&self) -> usize {
        self.x_axis
            .map_or_else(|| self.ds.x_length(), |a| a.number_of_bins())
    }

    pub fn ny(&self) -> usize {
        self.y_axis
            .map_or_else(|| self.ds.y_length(0), |a| a.number_of_bins())
    }

    pub fn x_units(&self) -> &Units {
        &self.x_units
    }

    pub fn y_units(&self) -> &Units {
        &self.y_units
    }

    /// x tag of source sample `i`, in destination units.
    #[inline]
    pub fn x(&self, i: usize) -> f64 {
        self.x_conv.convert(self.ds.x_tag(i))
    }

    /// y tag `j` of source `table`, in destination units.
    #[inline]
    pub fn y(&self, table: usize, j: usize) -> f64 {
        self.y_conv.convert(self.ds.y_tag(table, j))
    }

    #[inline]
    pub fn x_bin(&self, i: usize) -> Option<usize> {
        match self.x_axis {
            Some(a) => a.which_bin_native(self.x(i)),
            None => Some(i),
        }
    }

    #[inline]
    pub fn y_bin(&self, table: usize, j: usize) -> Option<usize> {
        match self.y_axis {
            Some(a) => a.which_bin_native(self.y(table, j)),
            None => Some(j),
        }
    }

    /// Destination x coordinate of column `ix`.
    #[inline]
    pub fn x_center(&self, ix: usize) -> f64 {
        match self.x_axis {
            Some(a) => a.bin_center(ix),
            None => self.x(ix),
        }
    }

    /// Destination y coordinate of row `iy`.
    #[inline]
    pub fn y_center(&self, iy: usize) -> f64 {
        match self.y_axis {
            Some(a) => a.bin_center(iy),
            None => self.y(0, iy),
        }
    }

    pub fn y_is_log(&self) -> bool {
        self.y_axis.is_some_and(|a| a.is_log())
    }

    /// Largest source x index at or before destination coordinate `x`.
    pub fn previous_column(&self, x: f64) -> Option<usize> {
        crate::dataset::search::previous_column(self.ds, self.x_back.convert(x))
    }

    /// Smallest source x index at or after destination coordinate `x`.
    pub fn next_column(&self, x: f64) -> Option<usize> {
        crate::dataset::search::next_column(self.ds, self.x_back.convert(x))
    }

    /// Rows of `table` bracketing destination coordinate `y`.
    pub fn bracket_rows(&self, table: usize, y: f64) -> Option<(usize, usize)> {
        use crate::dataset::search::{next_index, previous_index};
        let target = self.y_back.convert(y);
        let n = self.ds.y_length(table);
        let tag = |j: usize| self.ds.y_tag(table, j);
        Some((
            previous_index(n, tag, target)?,
            next_index(n, tag, target)?,
        ))
    }

    /// `(z, weight)` of a usable sample, or `None` for fill or nonpositive
    /// weight.
    #[inline]
    pub fn sample(&self, i: usize, j: usize) -> Option<(f64, f64)> {
        let z = self.ds.value(i, j);
        if self.ds.z_units().is_fill(z) {
            return None;
        }
        let w = match self.weights {
            Some(w) => {
                let v = w.value(i, j);
                if w.z_units().is_fill(v) {
                    return None;
                }
                v
            }
            None => 1.0,
        };
        // Also rejects NaN
        if w > 0.0 {
            Some((z, w))
        } else {
            None
        }
    }

    /// y tag width for each destination x column, taken from the tables
    /// whose scans land in it. Columns no scan lands in, and columns fed by
    /// several tables, use the widest width involved.
    pub fn column_y_widths(&self, table_widths: &[Option<TagWidth>]) -> Vec<Option<TagWidth>> {
        let widest = table_widths.iter().flatten().copied().reduce(TagWidth::wider);
        let mut columns: Vec<Option<TagWidth>> = vec![None; self.nx()];
        for (table, width) in table_widths.iter().enumerate() {
            let Some(width) = *width else {
                continue;
            };
            for i in self.ds.table_range(table) {
                if let Some(ix) = self.x_bin(i) {
                    columns[ix] = Some(columns[ix].map_or(width, |w| w.wider(width)));
                }
            }
        }
        columns.iter().map(|c| c.or(widest)).collect()
    }

    /// Effective x tag width in destination interval units.
    pub fn x_tag_width(&self, overridden: Option<&Datum>) -> Result<Option<TagWidth>> {
        let interval = self.x_units.offset_units();
        match overridden.cloned().or_else(|| x_tag_width(self.ds)) {
            Some(d) => Ok(Some(TagWidth::from_datum(&d, &interval)?)),
            None => Ok(None),
        }
    }

    /// Effective y tag width of `table` in destination interval units.
    pub fn y_tag_width(&self, table: usize, overridden: Option<&Datum>) -> Result<Option<TagWidth>> {
        let interval = self.y_units.offset_units();
        match overridden.cloned().or_else(|| y_tag_width(self.ds, table)) {
            Some(d) => Ok(Some(TagWidth::from_datum(&d, &interval)?)),
            None => Ok(None),
        }
    }
}

/// Weights must match the source scan for scan and row for row.
fn check_same_shape(ds: &dyn TableDataSet, w: &dyn TableDataSet) -> Result<()> {
    let mismatch = |what, expected, got| {
        Err(RebinError::ShapeMismatch {
            what,
            expected,
            got,
        })
    };
    if w.x_length() != ds.x_length() {
        return mismatch("weights x length", ds.x_length(), w.x_length());
    }
    if w.table_count() != ds.table_count() {
        return mismatch("weights table count", ds.table_count(), w.table_count());
    }
    for t in 0..ds.table_count() {
        if w.table_range(t) != ds.table_range(t) {
            return mismatch("weights table end", ds.table_end(t), w.table_end(t));
        }
        if w.y_length(t) != ds.y_length(t) {
            return mismatch("weights y length", ds.y_length(t), w.y_length(t));
        }
    }
    Ok(())
}

/// A rebinning strategy producing a dataset on the destination grid.
///
/// Callers pick averaging or nearest-sample semantics without changing what
/// they do with the result.
pub trait TableRebinner: Send + Sync {
    /// # Errors
    /// * On empty or ambiguous sources, or non-convertible units
    fn rebin_dataset<'a>(
        &self,
        source: &'a dyn TableDataSet,
        x_axis: &RebinDescriptor,
        y_axis: Option<&RebinDescriptor>,
    ) -> Result<Box<dyn TableDataSet + 'a>>;
}

/// Weighted-average rebinning with optional gap filling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AverageTableRebinner {
    config: RebinConfig,
}

impl AverageTableRebinner {
    pub fn new(config: RebinConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RebinConfig {
        &self.config
    }

    /// Average `source` onto the destination grid.
    ///
    /// `weights`, if given, has the shape of `source` and holds per-sample
    /// weights as its z values. An axis without a descriptor keeps the
    /// source's tags.
    ///
    /// The result has a single table with z and a [`PLANE_WEIGHTS`] plane.
    /// Empty bins are the z fill value with weight zero.
    ///
    /// # Errors
    /// * If `source` has no tables or no samples
    /// * If `x_axis` is given and the source's x range lies entirely outside it
    /// * If `y_axis` is `None` and `source` has more than one table
    /// * If units are not convertible, including tag width overrides
    pub fn rebin(
        &self,
        source: &dyn TableDataSet,
        weights: Option<&dyn TableDataSet>,
        x_axis: Option<&RebinDescriptor>,
        y_axis: Option<&RebinDescriptor>,
    ) -> Result<DefaultTableDataSet> {
        let src = Source::new(source, weights, x_axis, y_axis)?;
        if let Some(a) = x_axis {
            let first = src.x(0);
            let last = src.x(source.x_length() - 1);
            if last < a.start() || first >= a.end() {
                return Err(RebinError::NoDataInInterval {
                    start: a.start(),
                    end: a.end(),
                    units: a.units().to_string(),
                    reason: "source x range lies outside the destination axis",
                });
            }
        }

        let (nx, ny) = (src.nx(), src.ny());
        let fill = source.z_units().fill();
        let mut data = Array2::<f64>::zeros((nx, ny));
        let mut weight = Array2::<f64>::zeros((nx, ny));

        let used = average::accumulate(&src, &mut data, &mut weight);
        average::normalize(&mut data, &weight, fill);
        debug!("accumulated {used} samples into {nx}x{ny} bins");

        let cfg = &self.config;
        if cfg.interpolate {
            let kind = cfg.interpolate_kind;
            let xw = src.x_tag_width(cfg.x_tag_width.as_ref())?;
            let yw = (0..source.table_count())
                .map(|t| src.y_tag_width(t, cfg.y_tag_width.as_ref()))
                .collect::<Result<Vec<_>>>()?;

            let mut filled = 0;
            if let Some(xw) = xw {
                filled += boundary::fill_left_right(&src, &mut data, &mut weight, xw, kind);
            }
            filled += boundary::fill_top_bottom(&src, &mut data, &mut weight, &yw, kind);
            if let Some(xw) = xw {
                filled += boundary::fill_corners(&src, &mut data, &mut weight, xw, kind);
            }
            debug!("boundary passes filled {filled} bins");

            let centers_x: Vec<f64> = (0..nx).map(|ix| src.x_center(ix)).collect();
            let centers_y: Vec<f64> = (0..ny).map(|iy| src.y_center(iy)).collect();
            if let Some(xw) = xw {
                let n = gaps::fill_interpolate_x(&mut data, &mut weight, &centers_x, xw, kind);
                debug!("x gap pass filled {n} bins");
            }
            let column_widths = src.column_y_widths(&yw);
            let n = gaps::fill_interpolate_y(
                &mut data,
                &mut weight,
                &centers_y,
                &column_widths,
                src.y_is_log(),
                kind,
            );
            debug!("y gap pass filled {n} bins");
        } else if cfg.enlarge_pixels {
            let n = enlarge::enlarge_pixels(&mut data, &weight);
            debug!("pixel enlargement touched {n} bins");
        }

        assemble(&src, data, weight)
    }
}

impl TableRebinner for AverageTableRebinner {
    /// Uses the source's [`PLANE_WEIGHTS`] plane when it has one.
    fn rebin_dataset<'a>(
        &self,
        source: &'a dyn TableDataSet,
        x_axis: &RebinDescriptor,
        y_axis: Option<&RebinDescriptor>,
    ) -> Result<Box<dyn TableDataSet + 'a>> {
        let view = crate::dataset::PlanarView::new(source, PLANE_WEIGHTS).ok();
        let weights = view.as_ref().map(|v| v as &dyn TableDataSet);
        let out = self.rebin(source, weights, Some(x_axis), y_axis)?;
        Ok(Box::new(out))
    }
}

/// Wrap the working arrays into a single-table dataset.
fn assemble(src: &Source<'_>, data: Array2<f64>, weight: Array2<f64>) -> Result<DefaultTableDataSet> {
    let ds = src.ds;
    let x_tags = match src.x_axis {
        Some(a) => a.bin_centers(),
        None => ds.x_tags(),
    };
    let y_tags = match src.y_axis {
        Some(a) => a.bin_centers(),
        None => ds.y_tags(0),
    };

    let mut properties = ds.properties();
    if let Some(a) = src.x_axis {
        properties.insert(PROPERTY_X_TAG_WIDTH.to_owned(), a.bin_width_datum().into());
    }
    if let Some(a) = src.y_axis {
        properties.insert(PROPERTY_Y_TAG_WIDTH.to_owned(), a.bin_width_datum().into());
    }

    let z: Vec<f64> = data.iter().copied().collect();
    let w: Vec<f64> = weight.iter().copied().collect();
    Ok(DefaultTableDataSet::new(
        x_tags,
        src.x_units().clone(),
        y_tags,
        src.y_units().clone(),
        z,
        ds.z_units().clone(),
    )?
    .with_plane(PLANE_WEIGHTS, Units::DIMENSIONLESS, w)?
    .with_properties(properties))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dataset::{PlanarView, TableDataSetBuilder};
    use crate::testing::{example_dataset, init_logging, random_dataset, rng_fixed_seed, segmented_dataset};

    fn weights_of(ds: &DefaultTableDataSet) -> Vec<f64> {
        ds.plane_values(PLANE_WEIGHTS).unwrap().to_vec()
    }

    #[test]
    fn test_example_scenario() {
        init_logging();
        let ds = example_dataset();
        let x = RebinDescriptor::new(0.0, 6.0, 3, false, Units::T2000).unwrap();
        let out = AverageTableRebinner::default()
            .rebin(&ds, None, Some(&x), None)
            .unwrap();

        assert_eq!(out.x_tags(), vec![1.0, 3.0, 5.0]);
        assert_eq!(out.y_tags(0), vec![10.0, 20.0]);
        assert_eq!(out.z_values(), &[2.0, 3.0, 7.0, 8.0, 10.0, 11.0]);
        assert_eq!(weights_of(&out), vec![2.0, 2.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(
            out.property(PROPERTY_X_TAG_WIDTH).unwrap().as_datum(),
            Some(&Datum::new(2.0, Units::SECONDS))
        );
    }

    #[test]
    fn test_identity_rebin() {
        let rng = &mut rng_fixed_seed();
        let ds = random_dataset(rng, 8, 5);
        // Bin centers at the source tags
        let x = RebinDescriptor::new(-0.5, 7.5, 8, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(0.5, 5.5, 5, false, Units::HERTZ).unwrap();
        let out = AverageTableRebinner::default()
            .rebin(&ds, None, Some(&x), Some(&y))
            .unwrap();

        assert_eq!(out.x_tags(), ds.x_tags());
        assert_eq!(out.y_tags(0), ds.y_tags(0));
        assert_eq!(out.z_values(), ds.z_values());
        assert!(weights_of(&out).iter().all(|w| *w == 1.0));

        // No descriptors at all passes the grid through as well
        let out = AverageTableRebinner::default().rebin(&ds, None, None, None).unwrap();
        assert_eq!(out.z_values(), ds.z_values());
    }

    #[test]
    fn test_weight_conservation() {
        let rng = &mut rng_fixed_seed();
        let ds = random_dataset(rng, 40, 6);
        let w_values = crate::testing::randn::<f64>(rng, 40 * 6);
        let w = DefaultTableDataSet::new(
            ds.x_tags(),
            Units::T2000,
            ds.y_tags(0),
            Units::HERTZ,
            w_values.clone(),
            Units::DIMENSIONLESS,
        )
        .unwrap();

        let x = RebinDescriptor::new(0.0, 40.0, 7, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(1.0, 7.0, 2, false, Units::HERTZ).unwrap();
        let cfg = RebinConfig {
            interpolate: false,
            enlarge_pixels: false,
            ..Default::default()
        };
        let out = AverageTableRebinner::new(cfg)
            .rebin(&ds, Some(&w), Some(&x), Some(&y))
            .unwrap();

        for ix in 0..7 {
            for iy in 0..2 {
                let (mut sum, mut sw) = (0.0, 0.0);
                for i in 0..40 {
                    for j in 0..6 {
                        if x.which_bin_native(ds.x_tag(i)) == Some(ix)
                            && y.which_bin_native(ds.y_tag(0, j)) == Some(iy)
                        {
                            let wij = w_values[i * 6 + j];
                            sum += ds.value(i, j) * wij;
                            sw += wij;
                        }
                    }
                }
                let got = out.value(ix, iy);
                assert!(sw > 0.0);
                assert!((got - sum / sw).abs() < 1e-12, "bin ({ix}, {iy})");
                let got_w = out.plane_value(PLANE_WEIGHTS, ix, iy).unwrap();
                assert!((got_w - sw).abs() < 1e-12);
            }
        }
    }

    /// x = 0..3 then 6..9 s, one row; bins of 1 s from 0 to 10 s.
    fn gapped(step: f64) -> DefaultTableDataSet {
        let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
        let mut x = 0.0;
        while x < 10.0 {
            if !(3.5..6.0).contains(&x) {
                b.add_scan(x, &[1.0], &[x]).unwrap();
            }
            x += step;
        }
        b.build().unwrap()
    }

    #[test]
    fn test_interpolation_fills_small_gaps() {
        let ds = gapped(0.5);
        let x = RebinDescriptor::new(0.0, 10.0, 20, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(0.5, 1.5, 1, false, Units::HERTZ).unwrap();
        // Declared width wide enough to bridge the 2.5 s hole
        let cfg = RebinConfig {
            x_tag_width: Some(Datum::new(2.0, Units::SECONDS)),
            ..Default::default()
        };
        let out = AverageTableRebinner::new(cfg)
            .rebin(&ds, None, Some(&x), Some(&y))
            .unwrap();
        for ix in 0..20 {
            assert!(!out.z_units().is_fill(out.value(ix, 0)), "bin {ix}");
        }
        // Halfway between bin 6 (z = 3) and bin 12 (z = 6)
        assert!((out.value(9, 0) - 4.5).abs() < 1e-12);
        let w = out.plane_value(PLANE_WEIGHTS, 9, 0).unwrap();
        assert!((w - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolation_locality() {
        let ds = gapped(0.5);
        let x = RebinDescriptor::new(0.0, 10.0, 20, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(0.5, 1.5, 1, false, Units::HERTZ).unwrap();
        // Inferred width is 0.5 s; the 2.5 s hole is far beyond 1.5 widths
        for kind in [InterpolateKind::Linear, InterpolateKind::NearestNeighbor] {
            let cfg = RebinConfig {
                interpolate_kind: kind,
                ..Default::default()
            };
            let out = AverageTableRebinner::new(cfg)
                .rebin(&ds, None, Some(&x), Some(&y))
                .unwrap();
            for ix in 8..12 {
                assert!(out.z_units().is_fill(out.value(ix, 0)), "bin {ix} {kind:?}");
                assert_eq!(out.plane_value(PLANE_WEIGHTS, ix, 0), Some(0.0));
            }
        }
    }

    #[test]
    fn test_nearest_neighbor_sub_mode() {
        let ds = gapped(0.5);
        let x = RebinDescriptor::new(0.0, 10.0, 40, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(0.5, 1.5, 1, false, Units::HERTZ).unwrap();
        let cfg = RebinConfig {
            interpolate_kind: InterpolateKind::NearestNeighbor,
            ..Default::default()
        };
        let out = AverageTableRebinner::new(cfg)
            .rebin(&ds, None, Some(&x), Some(&y))
            .unwrap();
        // Quarter-second bins; every other bin is empty and takes a neighbor's value
        for ix in 0..13 {
            let v = out.value(ix, 0);
            assert!(!out.z_units().is_fill(v), "bin {ix}");
            assert_eq!(v, 0.5 * (ix / 2) as f64, "bin {ix}");
        }
    }

    #[test]
    fn test_enlarge_pixels() {
        let ds = gapped(2.0);
        let x = RebinDescriptor::new(0.0, 10.0, 10, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(0.5, 1.5, 1, false, Units::HERTZ).unwrap();
        let cfg = RebinConfig {
            interpolate: false,
            enlarge_pixels: true,
            ..Default::default()
        };
        let out = AverageTableRebinner::new(cfg)
            .rebin(&ds, None, Some(&x), Some(&y))
            .unwrap();
        // Samples at 0, 2, 6 and 8 s; right to left runs last, so empty
        // bins end up with their left neighbor's value
        assert_eq!(out.value(1, 0), 0.0);
        assert_eq!(out.value(4, 0), 2.0);
        assert_eq!(out.value(5, 0), 6.0);
        assert_eq!(out.value(9, 0), 8.0);
        assert_eq!(out.plane_value(PLANE_WEIGHTS, 1, 0), Some(0.0));
        assert_eq!(out.plane_value(PLANE_WEIGHTS, 2, 0), Some(1.0));
        assert!(out.z_values().iter().all(|v| !out.z_units().is_fill(*v)));

        let cfg = RebinConfig {
            interpolate: false,
            enlarge_pixels: false,
            ..Default::default()
        };
        let out = AverageTableRebinner::new(cfg)
            .rebin(&ds, None, Some(&x), Some(&y))
            .unwrap();
        assert!(out.z_units().is_fill(out.value(1, 0)));
    }

    #[test]
    fn test_preconditions() {
        let ds = example_dataset();
        let outside = RebinDescriptor::new(10.0, 20.0, 3, false, Units::T2000).unwrap();
        assert!(matches!(
            AverageTableRebinner::default().rebin(&ds, None, Some(&outside), None),
            Err(RebinError::NoDataInInterval { .. })
        ));

        let seg = segmented_dataset();
        let x = RebinDescriptor::new(0.0, 8.0, 4, false, Units::T2000).unwrap();
        assert_eq!(
            AverageTableRebinner::default().rebin(&seg, None, Some(&x), None),
            Err(RebinError::AmbiguousYTags { tables: 2 })
        );

        let hz = RebinDescriptor::new(0.0, 8.0, 4, false, Units::HERTZ).unwrap();
        assert!(matches!(
            AverageTableRebinner::default().rebin(&seg, None, Some(&hz), Some(&hz)),
            Err(RebinError::UnitMismatch { .. })
        ));

        let bad_width = RebinConfig {
            x_tag_width: Some(Datum::new(1.0, Units::HERTZ)),
            ..Default::default()
        };
        assert!(matches!(
            AverageTableRebinner::new(bad_width).rebin(&ds, None, Some(&x), None),
            Err(RebinError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_weights_shape_checked() {
        let ds = example_dataset();
        let x = RebinDescriptor::new(0.0, 6.0, 3, false, Units::T2000).unwrap();
        // Same scans, one row short
        let w = DefaultTableDataSet::new(
            ds.x_tags(),
            Units::T2000,
            vec![10.0],
            Units::HERTZ,
            vec![1.0; 6],
            Units::DIMENSIONLESS,
        )
        .unwrap();
        assert_eq!(
            AverageTableRebinner::default().rebin(&ds, Some(&w), Some(&x), None),
            Err(RebinError::ShapeMismatch {
                what: "weights y length",
                expected: 2,
                got: 1
            })
        );

        // Same length, different table split
        let seg = segmented_dataset();
        let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
        for i in 0..8 {
            let y: &[f64] = if i < 3 { &[1.0, 2.0, 4.0, 8.0] } else { &[1.0, 2.0, 4.0, 8.0, 16.0] };
            b.add_scan(i as f64, y, &vec![1.0; y.len()]).unwrap();
        }
        let w = b.build().unwrap();
        let y = RebinDescriptor::new(0.5, 16.5, 4, false, Units::HERTZ).unwrap();
        let x = RebinDescriptor::new(0.0, 8.0, 4, false, Units::T2000).unwrap();
        assert_eq!(
            AverageTableRebinner::default().rebin(&seg, Some(&w), Some(&x), Some(&y)),
            Err(RebinError::ShapeMismatch {
                what: "weights table end",
                expected: 4,
                got: 3
            })
        );
    }

    #[test]
    fn test_segmented_log_y() {
        let seg = segmented_dataset();
        let x = RebinDescriptor::new(0.0, 8.0, 8, false, Units::T2000).unwrap();
        // Bin centers at 1, 2, 4, 8 and 16 Hz
        let y = RebinDescriptor::new(0.5_f64.sqrt(), 16.0 * 2.0_f64.sqrt(), 5, true, Units::HERTZ)
            .unwrap();
        let out = AverageTableRebinner::default()
            .rebin(&seg, None, Some(&x), Some(&y))
            .unwrap();

        assert_eq!(out.table_count(), 1);
        assert!(y.units().is_convertible_to(out.y_units()));
        // y tag 16 Hz only exists in the second table
        for ix in 4..8 {
            assert_eq!(out.value(ix, 4), ix as f64 + 16.0);
        }
        assert!(out
            .property(PROPERTY_Y_TAG_WIDTH)
            .unwrap()
            .as_datum()
            .unwrap()
            .units()
            .is_ratiometric());
    }

    #[test]
    fn test_y_gaps_use_each_tables_width() {
        // Channels every 1 Hz, then every 3 Hz from x = 4 s on
        let mut b = TableDataSetBuilder::new(Units::T2000, Units::HERTZ, Units::DIMENSIONLESS);
        for i in 0..8 {
            let x = i as f64;
            let y: &[f64] = if i < 4 {
                &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]
            } else {
                &[1.0, 4.0, 7.0]
            };
            let z: Vec<f64> = y.iter().map(|v| x + v).collect();
            b.add_scan(x, y, &z).unwrap();
        }
        let ds = b.build().unwrap();
        let y = RebinDescriptor::new(0.5, 7.5, 7, false, Units::HERTZ).unwrap();
        let out = AverageTableRebinner::default()
            .rebin(&ds, None, None, Some(&y))
            .unwrap();

        // The coarse table's own 3 Hz width bridges its two-bin gaps
        for ix in 4..8 {
            for iy in [1, 2, 4, 5] {
                let expected = ix as f64 + (iy + 1) as f64;
                assert!((out.value(ix, iy) - expected).abs() < 1e-12, "bin ({ix}, {iy})");
                let w = out.plane_value(PLANE_WEIGHTS, ix, iy).unwrap();
                assert!((w - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_rebinner_trait_uses_weights_plane() {
        let ds = example_dataset();
        let n = ds.z_values().len();
        let mut w = vec![1.0; n];
        w[0] = 3.0;
        let ds = ds.with_plane(PLANE_WEIGHTS, Units::DIMENSIONLESS, w).unwrap();
        let x = RebinDescriptor::new(0.0, 6.0, 3, false, Units::T2000).unwrap();

        let rebinner: &dyn TableRebinner = &AverageTableRebinner::default();
        let out = rebinner.rebin_dataset(&ds, &x, None).unwrap();
        // (1 * 3 + 3 * 1) / 4
        assert_eq!(out.value(0, 0), 1.5);
        assert_eq!(out.plane_value(PLANE_WEIGHTS, 0, 0), Some(4.0));
        assert!(PlanarView::new(&*out, PLANE_WEIGHTS).is_ok());
    }

    #[test]
    fn test_concurrent_rebin() {
        let rng = &mut rng_fixed_seed();
        let ds = random_dataset(rng, 64, 16);
        let x = RebinDescriptor::new(0.0, 64.0, 10, false, Units::T2000).unwrap();
        let y = RebinDescriptor::new(1.0, 17.0, 4, false, Units::HERTZ).unwrap();
        let rebinner = AverageTableRebinner::default();
        let expected = rebinner.rebin(&ds, None, Some(&x), Some(&y)).unwrap();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| rebinner.rebin(&ds, None, Some(&x), Some(&y)).unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_config_serde() {
        let cfg = RebinConfig {
            interpolate: false,
            interpolate_kind: InterpolateKind::NearestNeighbor,
            enlarge_pixels: false,
            x_tag_width: Some(Datum::new(4.0, Units::SECONDS)),
            y_tag_width: None,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"nearest_neighbor\""));
        let back: RebinConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);

        let defaults: RebinConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, RebinConfig::default());
    }
}
