//! Physical units, fill sentinels and tagged values.
//!
//! Every tag and value array in a dataset carries a [`Units`]. Rebinning only
//! needs three things from it: conversion between convertible units, a fill
//! value meaning "no measurement", and whether a unit measures multiplicative
//! (ratiometric) distance rather than absolute difference.
//!
//! ```rust
//! use rebin2d::units::{Datum, Units};
//!
//! let t = Datum::new(1500.0, Units::MILLISECONDS);
//! assert_eq!(t.value_in(&Units::SECONDS).unwrap(), 1.5);
//!
//! // Location units are not interchangeable with interval units.
//! assert!(Units::T2000.converter_to(&Units::SECONDS).is_err());
//! assert_eq!(Units::T2000.offset_units(), Units::SECONDS);
//! ```
use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RebinError, Result};

/// Fill sentinel used unless a unit declares its own.
pub const DEFAULT_FILL: f64 = -1e31;

/// Physical dimension; units convert only within a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Dimensionless,
    Time,
    Frequency,
    Energy,
    Length,
    /// Multiplicative distance between two positive values.
    LogRatio,
}

/// Mapping from a unit to the base unit of its dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Transform {
    /// `base = value * scale + offset`
    Affine { scale: f64, offset: f64 },
    /// `base = ln(1 + value / 100)`, with natural-log ratio as the base.
    PercentIncrease,
}

impl Transform {
    #[inline]
    fn to_base(self, v: f64) -> f64 {
        match self {
            Transform::Affine { scale, offset } => v * scale + offset,
            Transform::PercentIncrease => (1.0 + v / 100.0).ln(),
        }
    }

    #[inline]
    fn from_base(self, b: f64) -> f64 {
        match self {
            Transform::Affine { scale, offset } => (b - offset) / scale,
            Transform::PercentIncrease => (b.exp() - 1.0) * 100.0,
        }
    }
}

/// A unit of measure with its fill sentinel.
///
/// Location units (`T2000`, `US2000`, ...) name points on an axis and carry
/// the id of the interval units that measure distances between those points,
/// see [`Units::offset_units`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Units {
    id: Cow<'static, str>,
    dimension: Dimension,
    transform: Transform,
    fill: f64,
    interval: Option<Cow<'static, str>>,
}

impl Units {
    pub const DIMENSIONLESS: Units = Units::interval_const("", Dimension::Dimensionless, 1.0);
    pub const PERCENT: Units = Units::interval_const("%", Dimension::Dimensionless, 0.01);

    pub const NANOSECONDS: Units = Units::interval_const("ns", Dimension::Time, 1e-9);
    pub const MICROSECONDS: Units = Units::interval_const("microseconds", Dimension::Time, 1e-6);
    pub const MILLISECONDS: Units = Units::interval_const("ms", Dimension::Time, 1e-3);
    pub const SECONDS: Units = Units::interval_const("s", Dimension::Time, 1.0);
    pub const MINUTES: Units = Units::interval_const("min", Dimension::Time, 60.0);
    pub const HOURS: Units = Units::interval_const("hr", Dimension::Time, 3600.0);
    pub const DAYS: Units = Units::interval_const("days", Dimension::Time, 86400.0);

    /// Seconds since 2000-01-01T00:00Z, ignoring leap seconds.
    pub const T2000: Units = Units::location_const("t2000", Dimension::Time, 1.0, 0.0, "s");
    /// Microseconds since 2000-01-01T00:00Z, ignoring leap seconds.
    pub const US2000: Units =
        Units::location_const("us2000", Dimension::Time, 1e-6, 0.0, "microseconds");
    /// Seconds since 1970-01-01T00:00Z, ignoring leap seconds.
    pub const T1970: Units =
        Units::location_const("t1970", Dimension::Time, 1.0, -946_684_800.0, "s");

    pub const HERTZ: Units = Units::interval_const("Hz", Dimension::Frequency, 1.0);
    pub const KILOHERTZ: Units = Units::interval_const("kHz", Dimension::Frequency, 1e3);
    pub const MEGAHERTZ: Units = Units::interval_const("MHz", Dimension::Frequency, 1e6);

    pub const EV: Units = Units::interval_const("eV", Dimension::Energy, 1.0);
    pub const KEV: Units = Units::interval_const("keV", Dimension::Energy, 1e3);

    pub const METERS: Units = Units::interval_const("m", Dimension::Length, 1.0);
    pub const KILOMETERS: Units = Units::interval_const("km", Dimension::Length, 1e3);

    /// Natural-log ratio `ln(b / a)`.
    pub const LOG_E_RATIO: Units = Units::interval_const("log(e) ratio", Dimension::LogRatio, 1.0);
    /// Decade ratio `log10(b / a)`.
    pub const LOG10_RATIO: Units = Units::interval_const(
        "log(10) ratio",
        Dimension::LogRatio,
        std::f64::consts::LN_10,
    );
    /// Percent increase `100 * (b / a - 1)`.
    pub const PERCENT_INCREASE: Units = Units {
        id: Cow::Borrowed("% increase"),
        dimension: Dimension::LogRatio,
        transform: Transform::PercentIncrease,
        fill: DEFAULT_FILL,
        interval: None,
    };

    const fn interval_const(id: &'static str, dimension: Dimension, scale: f64) -> Self {
        Units {
            id: Cow::Borrowed(id),
            dimension,
            transform: Transform::Affine { scale, offset: 0.0 },
            fill: DEFAULT_FILL,
            interval: None,
        }
    }

    const fn location_const(
        id: &'static str,
        dimension: Dimension,
        scale: f64,
        offset: f64,
        interval: &'static str,
    ) -> Self {
        Units {
            id: Cow::Borrowed(id),
            dimension,
            transform: Transform::Affine { scale, offset },
            fill: DEFAULT_FILL,
            interval: Some(Cow::Borrowed(interval)),
        }
    }

    /// Interval units with the given scale relative to the dimension's base unit.
    ///
    /// # Errors
    /// * If `scale` is zero or not finite
    pub fn new(id: impl Into<String>, dimension: Dimension, scale: f64) -> Result<Self> {
        if !(scale.is_finite() && scale != 0.0) {
            return Err(RebinError::InvalidParameter(format!(
                "unit scale must be finite and nonzero, got {scale}"
            )));
        }
        Ok(Units {
            id: Cow::Owned(id.into()),
            dimension,
            transform: Transform::Affine { scale, offset: 0.0 },
            fill: DEFAULT_FILL,
            interval: None,
        })
    }

    /// Same units with a different fill sentinel.
    pub fn with_fill(mut self, fill: f64) -> Self {
        self.fill = fill;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn fill(&self) -> f64 {
        self.fill
    }

    /// True for the fill sentinel and for NaN.
    #[inline]
    pub fn is_fill(&self, v: f64) -> bool {
        if v.is_nan() || v == self.fill {
            return true;
        }
        // Tolerate fill values that went through a lossy round trip
        self.fill != 0.0 && ((v - self.fill) / self.fill).abs() < 1e-7
    }

    /// True when distances in these units are multiplicative.
    pub fn is_ratiometric(&self) -> bool {
        self.dimension == Dimension::LogRatio
    }

    pub fn is_location(&self) -> bool {
        self.interval.is_some()
    }

    /// Units for differences between two values in these units.
    pub fn offset_units(&self) -> Units {
        match (&self.interval, self.transform) {
            (Some(id), Transform::Affine { scale, .. }) => Units {
                id: id.clone(),
                dimension: self.dimension,
                transform: Transform::Affine { scale, offset: 0.0 },
                fill: self.fill,
                interval: None,
            },
            _ => self.clone(),
        }
    }

    pub fn is_convertible_to(&self, other: &Units) -> bool {
        self.dimension == other.dimension && self.is_location() == other.is_location()
    }

    /// Precompute a conversion from these units to `to`.
    ///
    /// # Errors
    /// * If the two units measure different dimensions, or one is a
    ///   location and the other an interval
    pub fn converter_to(&self, to: &Units) -> Result<UnitsConverter> {
        if !self.is_convertible_to(to) {
            return Err(RebinError::UnitMismatch {
                from: self.to_string(),
                to: to.to_string(),
            });
        }
        Ok(UnitsConverter {
            from: self.transform,
            to: to.transform,
            from_fill: self.fill,
            to_fill: to.fill,
            identity: self.transform == to.transform && self.fill == to.fill,
        })
    }

    /// Convert a single value; prefer [`Units::converter_to`] in loops.
    pub fn convert(&self, v: f64, to: &Units) -> Result<f64> {
        Ok(self.converter_to(to)?.convert(v))
    }

    pub fn datum(&self, value: f64) -> Datum {
        Datum::new(value, self.clone())
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id.is_empty() {
            write!(f, "(dimensionless)")
        } else {
            write!(f, "{}", self.id)
        }
    }
}

/// Precomputed conversion between two convertible units.
///
/// Fill values in the source units become the destination fill value.
#[derive(Debug, Clone, Copy)]
pub struct UnitsConverter {
    from: Transform,
    to: Transform,
    from_fill: f64,
    to_fill: f64,
    identity: bool,
}

impl UnitsConverter {
    #[inline]
    pub fn convert(&self, v: f64) -> f64 {
        if self.identity {
            return v;
        }
        if v.is_nan() || v == self.from_fill {
            return self.to_fill;
        }
        self.to.from_base(self.from.to_base(v))
    }
}

/// A value tagged with its units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    value: f64,
    units: Units,
}

impl Datum {
    pub fn new(value: f64, units: Units) -> Self {
        Self { value, units }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn is_fill(&self) -> bool {
        self.units.is_fill(self.value)
    }

    /// The value expressed in `units`.
    ///
    /// # Errors
    /// * If the units are not convertible
    pub fn value_in(&self, units: &Units) -> Result<f64> {
        self.units.convert(self.value, units)
    }

    /// Natural-log ratio for ratiometric data, `None` otherwise.
    pub fn log_ratio(&self) -> Option<f64> {
        if self.units.is_ratiometric() {
            self.value_in(&Units::LOG_E_RATIO).ok()
        } else {
            None
        }
    }

    /// Larger of two data; `other` is converted to `self`'s units.
    ///
    /// # Errors
    /// * If the units are not convertible
    pub fn max(self, other: &Datum) -> Result<Datum> {
        let v = other.value_in(&self.units)?;
        if v > self.value {
            Ok(Datum::new(v, self.units))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.units.id.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.units.id)
        }
    }
}
