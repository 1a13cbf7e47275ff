use std::fmt;
use std::num::ParseFloatError;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ToleranceParseError {
    #[error("Tolerance {0:?} has no unit, expected a `ppm` or `da` suffix")]
    MissingUnit(String),
    #[error("Tolerance {0:?} has an unrecognized unit")]
    UnknownUnit(String),
    #[error("Tolerance {0:?} has an invalid width: {1}")]
    InvalidWidth(String, ParseFloatError),
    #[error("Tolerance {0:?} must have a positive, finite width")]
    NonPositiveWidth(String),
    #[error("Tolerance {0:?} must be narrower than 1e6 ppm")]
    WidthTooLarge(String),
}

/// A mass accuracy window used to decide whether two peaks describe the same ion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// An absolute window in m/z units
    Da(f64),
    /// A relative window in parts-per-million of the reference m/z
    PPM(f64),
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::PPM(15.0)
    }
}

impl Tolerance {
    /// The width of the window in the tolerance's own unit
    pub fn width(&self) -> f64 {
        match self {
            Self::Da(w) | Self::PPM(w) => *w,
        }
    }

    /// The signed error of `query` against the reference `alt`, in the tolerance's unit
    pub fn call(&self, query: f64, alt: f64) -> f64 {
        match self {
            Self::Da(_) => query - alt,
            Self::PPM(_) => (query - alt) / alt * 1e6,
        }
    }

    pub fn lower_bound(&self, alt: f64) -> f64 {
        match self {
            Self::Da(w) => alt - w,
            Self::PPM(w) => alt - alt * w / 1e6,
        }
    }

    pub fn upper_bound(&self, alt: f64) -> f64 {
        match self {
            Self::Da(w) => alt + w,
            Self::PPM(w) => alt + alt * w / 1e6,
        }
    }

    /// Whether `query` falls within this window around `alt`
    pub fn test(&self, query: f64, alt: f64) -> bool {
        self.call(query, alt).abs() <= self.width()
    }

    /// The range of reference values `alt` for which `test(query, alt)` can hold.
    ///
    /// A relative window of 1e6 ppm or wider has no upper bound.
    pub fn reference_bounds(&self, query: f64) -> (f64, f64) {
        match self {
            Self::Da(w) => (query - w, query + w),
            Self::PPM(w) => {
                let e = w / 1e6;
                let upper = if e < 1.0 {
                    query / (1.0 - e)
                } else {
                    f64::INFINITY
                };
                (query / (1.0 + e), upper)
            }
        }
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Da(w) => write!(f, "{w}Da"),
            Self::PPM(w) => write!(f, "{w}ppm"),
        }
    }
}

impl FromStr for Tolerance {
    type Err = ToleranceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let width_text = text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        if width_text.len() == text.len() {
            return Err(ToleranceParseError::MissingUnit(s.to_string()));
        }
        let (width, unit) = text.split_at(width_text.len());
        let width: f64 = width
            .trim()
            .parse()
            .map_err(|e| ToleranceParseError::InvalidWidth(s.to_string(), e))?;
        if !width.is_finite() || width <= 0.0 {
            return Err(ToleranceParseError::NonPositiveWidth(s.to_string()));
        }
        match unit.trim().to_ascii_lowercase().as_str() {
            "ppm" if width >= 1e6 => Err(ToleranceParseError::WidthTooLarge(s.to_string())),
            "ppm" => Ok(Self::PPM(width)),
            "da" | "th" | "mz" => Ok(Self::Da(width)),
            _ => Err(ToleranceParseError::UnknownUnit(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("15ppm".parse::<Tolerance>().unwrap(), Tolerance::PPM(15.0));
        assert_eq!(" 0.02 Da".parse::<Tolerance>().unwrap(), Tolerance::Da(0.02));
        assert!(matches!(
            "0.02".parse::<Tolerance>(),
            Err(ToleranceParseError::MissingUnit(_))
        ));
        assert!(matches!(
            "5furlongs".parse::<Tolerance>(),
            Err(ToleranceParseError::UnknownUnit(_))
        ));
        assert!(matches!(
            "-5ppm".parse::<Tolerance>(),
            Err(ToleranceParseError::NonPositiveWidth(_))
        ));
        assert!(matches!(
            "1e6ppm".parse::<Tolerance>(),
            Err(ToleranceParseError::WidthTooLarge(_))
        ));
        assert_eq!("1e6da".parse::<Tolerance>().unwrap(), Tolerance::Da(1e6));
        assert_eq!(Tolerance::PPM(10.0).to_string(), "10ppm");
    }

    #[test]
    fn test_window() {
        let tol = Tolerance::PPM(10.0);
        assert!(tol.test(1000.009, 1000.0));
        assert!(!tol.test(1000.011, 1000.0));
        assert!((tol.lower_bound(1000.0) - 999.99).abs() < 1e-9);
        assert!((tol.upper_bound(1000.0) - 1000.01).abs() < 1e-9);

        let tol = Tolerance::Da(0.5);
        assert!(tol.test(100.4, 100.0));
        assert!(!tol.test(99.4, 100.0));
        assert_eq!(tol.call(100.25, 100.0), 0.25);
    }

    #[test]
    fn test_wide_ppm_bounds() {
        let (low, high) = Tolerance::PPM(10.0).reference_bounds(1000.0);
        assert!(low < 1000.0 && high > 1000.0);
        assert!(high.is_finite());

        let tol = Tolerance::PPM(2e6);
        let (low, high) = tol.reference_bounds(100.0);
        assert!((low - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(high, f64::INFINITY);
        assert!(tol.test(100.0, 5000.0));
        assert!(low <= 5000.0 && 5000.0 <= high);
    }
}
