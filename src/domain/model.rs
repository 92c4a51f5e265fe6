use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw board units per kilogram.
pub const RAW_UNITS_PER_KG: f64 = 100.0;

/// Pounds per kilogram.
pub const POUNDS_PER_KG: f64 = 2.20462;

/// Number of pressure sensors on a balance board.
pub const CORNER_COUNT: usize = 4;

/// Number of coefficients in the model.
pub const MIN_REFERENCE_PAIRS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("at least {} reference pairs are required, got {found}", MIN_REFERENCE_PAIRS)]
    InsufficientData { found: usize },

    #[error("normal equations are not positive-definite; reference readings are degenerate")]
    SingularSystem,

    #[error("reference pair #{index} contains a non-finite value")]
    NonFiniteReference { index: usize },

    #[error("malformed sample: {reason}")]
    MalformedSample { reason: String },
}

/// Reference weights recorded against a certified scale, as `(scale, wii)` in pounds.
pub const DEFAULT_REFERENCE_PAIRS: [(f64, f64); 9] = [
    (71.5, 63.0),
    (52.0, 43.65),
    (193.5, 185.5),
    (141.0, 133.2),
    (146.5, 138.6),
    (203.0, 194.5),
    (145.5, 137.5),
    (173.5, 165.2),
    (143.5, 135.6),
];

/// Converts one raw corner value into pounds.
///
/// Calibration rows and runtime samples must both go through this function so
/// the model sees a single input domain.
#[inline]
pub fn raw_to_pounds(raw: f64) -> f64 {
    raw / RAW_UNITS_PER_KG * POUNDS_PER_KG
}

/// One calibration observation: a known weight and what the board read for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePair {
    pub scale_weight: f64,
    pub device_reading: f64,
}

impl ReferencePair {
    pub const fn new(scale_weight: f64, device_reading: f64) -> Self {
        Self {
            scale_weight,
            device_reading,
        }
    }

    /// Builds a pair from an unconverted raw sum, applying the sample-time conversion.
    pub fn from_raw_sum(scale_weight: f64, raw_sum: f64) -> Self {
        Self::new(scale_weight, raw_to_pounds(raw_sum))
    }
}

pub fn default_reference_pairs() -> Vec<ReferencePair> {
    DEFAULT_REFERENCE_PAIRS
        .iter()
        .map(|&(scale, wii)| ReferencePair::new(scale, wii))
        .collect()
}

/// Coefficients of `weight = a*x^2 + b*x + c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl CalibrationModel {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Passes the converted reading through unchanged.
    pub const fn identity() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }
}

pub type CalibratedWeight = f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; CORNER_COUNT] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomLeft => 2,
            Corner::BottomRight => 3,
        }
    }

    /// Index of this corner in the device's channel order `[tr, bl, tl, br]`.
    pub fn channel(self) -> usize {
        match self {
            Corner::TopRight => 0,
            Corner::BottomLeft => 1,
            Corner::TopLeft => 2,
            Corner::BottomRight => 3,
        }
    }
}

/// Four raw corner readings in `[tl, tr, bl, br]` order, in device units.
///
/// Values are validated on construction: finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawSample {
    corners: [f64; CORNER_COUNT],
}

impl RawSample {
    pub fn new(corners: [f64; CORNER_COUNT]) -> Result<Self, CalibrationError> {
        for (corner, value) in Corner::ALL.iter().zip(corners.iter()) {
            if !value.is_finite() {
                return Err(CalibrationError::MalformedSample {
                    reason: format!("{:?} reading is not a finite number", corner),
                });
            }
            if *value < 0.0 {
                return Err(CalibrationError::MalformedSample {
                    reason: format!("{:?} reading {} is negative", corner, value),
                });
            }
        }
        Ok(Self { corners })
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, CalibrationError> {
        let corners: [f64; CORNER_COUNT] =
            values
                .try_into()
                .map_err(|_| CalibrationError::MalformedSample {
                    reason: format!("expected {} corner readings, got {}", CORNER_COUNT, values.len()),
                })?;
        Self::new(corners)
    }

    /// Builds a sample from values in the device's channel order.
    pub fn from_channels(channels: [f64; CORNER_COUNT]) -> Result<Self, CalibrationError> {
        let mut corners = [0.0; CORNER_COUNT];
        for corner in Corner::ALL {
            corners[corner.index()] = channels[corner.channel()];
        }
        Self::new(corners)
    }

    pub fn corners(&self) -> &[f64; CORNER_COUNT] {
        &self.corners
    }

    pub fn corner(&self, corner: Corner) -> f64 {
        self.corners[corner.index()]
    }

    /// Each corner converted to pounds.
    pub fn converted(&self) -> [f64; CORNER_COUNT] {
        self.corners.map(raw_to_pounds)
    }

    /// The model input: the sum of the converted corners.
    pub fn converted_sum(&self) -> f64 {
        self.converted().iter().sum()
    }
}

/// One reported value, handed to every reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightReading {
    pub timestamp: DateTime<Utc>,
    pub weight: CalibratedWeight,
    /// Converted corner values in `[tl, tr, bl, br]` order (pounds).
    pub corners: [f64; CORNER_COUNT],
}

impl WeightReading {
    pub fn new(weight: CalibratedWeight, sample: &RawSample) -> Self {
        Self {
            timestamp: Utc::now(),
            weight,
            corners: sample.converted(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Sample(RawSample),
    /// The board went away; no further events follow.
    Hangup,
    /// Any non balance-board event (keys, accelerometer, IR, extensions).
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion_of_hundred_raw_units() {
        let sample = RawSample::new([100.0; 4]).unwrap();
        assert!((sample.converted_sum() - 8.81848).abs() < 1e-12);
        for value in sample.converted() {
            assert!((value - 2.20462).abs() < 1e-12);
        }
    }

    #[test]
    fn test_from_channels_maps_device_order() {
        // channels: [tr, bl, tl, br]
        let sample = RawSample::from_channels([1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(sample.corner(Corner::TopLeft), 3.0);
        assert_eq!(sample.corner(Corner::TopRight), 1.0);
        assert_eq!(sample.corner(Corner::BottomLeft), 2.0);
        assert_eq!(sample.corner(Corner::BottomRight), 4.0);
    }

    #[test]
    fn test_malformed_samples_rejected() {
        assert!(matches!(
            RawSample::new([1.0, -0.5, 1.0, 1.0]),
            Err(CalibrationError::MalformedSample { .. })
        ));
        assert!(matches!(
            RawSample::new([1.0, f64::NAN, 1.0, 1.0]),
            Err(CalibrationError::MalformedSample { .. })
        ));
        assert!(matches!(
            RawSample::from_slice(&[1.0, 2.0, 3.0]),
            Err(CalibrationError::MalformedSample { .. })
        ));
        assert!(RawSample::from_slice(&[0.0, 0.0, 0.0, 0.0]).is_ok());
    }

    #[test]
    fn test_reference_pair_from_raw_sum_uses_sample_conversion() {
        let sample = RawSample::new([250.0, 250.0, 250.0, 250.0]).unwrap();
        let pair = ReferencePair::from_raw_sum(22.0, 1000.0);
        assert!((pair.device_reading - sample.converted_sum()).abs() < 1e-12);
    }

    #[test]
    fn test_default_pairs() {
        let pairs = default_reference_pairs();
        assert_eq!(pairs.len(), 9);
        assert_eq!(pairs[0], ReferencePair::new(71.5, 63.0));
    }
}
