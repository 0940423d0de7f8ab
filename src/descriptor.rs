//! Regular destination axis for rebinning.
//!
//! A [`RebinDescriptor`] divides `[start, end)` into `n` contiguous bins of
//! equal width, either in the value itself or, for logarithmic axes, in its
//! natural log. Bins are always numbered in increasing value order.
//!
//! ```rust
//! use rebin2d::{RebinDescriptor, units::Units};
//!
//! let dd = RebinDescriptor::new(0.0, 6.0, 3, false, Units::SECONDS).unwrap();
//! assert_eq!(dd.bin_center(1), 3.0);
//! assert_eq!(dd.which_bin(4500.0, &Units::MILLISECONDS).unwrap(), Some(2));
//! assert_eq!(dd.which_bin(6.0, &Units::SECONDS).unwrap(), None);
//! ```
use crate::error::{RebinError, Result};
use crate::units::{Datum, Units, UnitsConverter};
use crate::utils::{count, linspace};

/// An immutable set of regular bins along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RebinDescriptor {
    start: f64,
    end: f64,
    nbins: usize,
    is_log: bool,
    units: Units,

    /// Start of the axis in transformed (log or linear) space
    lo: f64,

    /// Bin pitch in transformed space
    step: f64,
}

impl RebinDescriptor {
    /// Build a descriptor with `nbins` bins covering `[start, end)`.
    ///
    /// # Errors
    /// * If `nbins` is zero
    /// * If either bound is not finite, or `start >= end`
    /// * If the axis is logarithmic and `start <= 0`
    pub fn new(start: f64, end: f64, nbins: usize, is_log: bool, units: Units) -> Result<Self> {
        if nbins == 0 {
            return Err(RebinError::DegenerateAxis("zero bins".into()));
        }
        if !(start.is_finite() && end.is_finite()) {
            return Err(RebinError::DegenerateAxis(format!(
                "bounds must be finite, got [{start}, {end})"
            )));
        }
        if start >= end {
            return Err(RebinError::DegenerateAxis(format!(
                "start must be less than end, got [{start}, {end})"
            )));
        }
        if is_log && start <= 0.0 {
            return Err(RebinError::DegenerateAxis(format!(
                "log axis must be positive, got [{start}, {end})"
            )));
        }

        let (lo, hi) = if is_log {
            (start.ln(), end.ln())
        } else {
            (start, end)
        };
        let step = (hi - lo) / count::<f64>(nbins);

        Ok(Self {
            start,
            end,
            nbins,
            is_log,
            units,
            lo,
            step,
        })
    }

    /// Build a descriptor from two data, converting `end` to `start`'s units.
    ///
    /// # Errors
    /// * If the two data are not in convertible units
    /// * For the same reasons as [`RebinDescriptor::new`]
    pub fn from_data(start: &Datum, end: &Datum, nbins: usize, is_log: bool) -> Result<Self> {
        let units = start.units().clone();
        let end = end.value_in(&units)?;
        Self::new(start.value(), end, nbins, is_log, units)
    }

    pub fn number_of_bins(&self) -> usize {
        self.nbins
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn is_log(&self) -> bool {
        self.is_log
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    #[inline]
    fn forward(&self, v: f64) -> f64 {
        if self.is_log {
            v.ln()
        } else {
            v
        }
    }

    #[inline]
    fn inverse(&self, t: f64) -> f64 {
        if self.is_log {
            t.exp()
        } else {
            t
        }
    }

    #[inline]
    fn at(&self, fractional_bin: f64) -> f64 {
        self.inverse(self.lo + self.step * fractional_bin)
    }

    /// Center of bin `i`; the geometric center on log axes.
    #[inline]
    pub fn bin_center(&self, i: usize) -> f64 {
        self.at(count::<f64>(i) + 0.5)
    }

    #[inline]
    pub fn bin_start(&self, i: usize) -> f64 {
        if i == 0 {
            return self.start;
        }
        self.at(count(i))
    }

    #[inline]
    pub fn bin_stop(&self, i: usize) -> f64 {
        if i + 1 == self.nbins {
            return self.end;
        }
        self.at(count(i + 1))
    }

    /// Bin pitch: a plain width on linear axes, the natural-log ratio
    /// between neighboring bins on log axes.
    pub fn bin_width(&self) -> f64 {
        self.step
    }

    /// [`RebinDescriptor::bin_width`] with units attached: the axis' interval
    /// units when linear, [`Units::LOG_E_RATIO`] when logarithmic.
    pub fn bin_width_datum(&self) -> Datum {
        if self.is_log {
            Datum::new(self.step, Units::LOG_E_RATIO)
        } else {
            Datum::new(self.step, self.units.offset_units())
        }
    }

    pub fn bin_centers(&self) -> Vec<f64> {
        (0..self.nbins).map(|i| self.bin_center(i)).collect()
    }

    /// All `n + 1` bin boundaries, first and last pinned to the axis bounds.
    pub fn bin_edges(&self) -> Vec<f64> {
        let hi = self.forward(self.end);
        let mut edges: Vec<f64> = linspace(self.lo, hi, self.nbins + 1)
            .into_iter()
            .map(|t| self.inverse(t))
            .collect();
        edges[0] = self.start;
        edges[self.nbins] = self.end;
        edges
    }

    pub fn bin_starts(&self) -> Vec<f64> {
        let mut edges = self.bin_edges();
        edges.pop();
        edges
    }

    pub fn bin_stops(&self) -> Vec<f64> {
        self.bin_edges().split_off(1)
    }

    /// Bin containing `v`, which is already in the descriptor's units.
    #[inline]
    pub fn which_bin_native(&self, v: f64) -> Option<usize> {
        if !(v >= self.start && v < self.end) {
            // Also rejects NaN
            return None;
        }
        let t = (self.forward(v) - self.lo) / self.step;
        // Rounding can push values just below `end` onto the last edge
        Some((t.floor().max(0.0) as usize).min(self.nbins - 1))
    }

    /// Bin containing `v` given in `units`, or `None` outside `[start, end)`.
    ///
    /// # Errors
    /// * If `units` is not convertible to the descriptor's units
    pub fn which_bin(&self, v: f64, units: &Units) -> Result<Option<usize>> {
        let c = self.converter_from(units)?;
        Ok(self.which_bin_native(c.convert(v)))
    }

    /// Conversion from `units` into the descriptor's units.
    pub fn converter_from(&self, units: &Units) -> Result<UnitsConverter> {
        units.converter_to(&self.units)
    }
}
