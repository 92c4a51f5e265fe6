//! Calibration engine: fits `weight = a*x^2 + b*x + c` from reference pairs and
//! evaluates it on raw board samples.
//!
//! Everything here is pure. Errors come back as [`CalibrationError`] values and
//! the caller decides how to recover.

use crate::core::regression;
use crate::domain::model::{CalibratedWeight, CalibrationModel, RawSample, ReferencePair};
use serde::Serialize;

pub use crate::domain::model::{CalibrationError, MIN_REFERENCE_PAIRS};

/// Fits the quadratic model to `pairs` by least squares.
pub fn fit(pairs: &[ReferencePair]) -> Result<CalibrationModel, CalibrationError> {
    if pairs.len() < MIN_REFERENCE_PAIRS {
        return Err(CalibrationError::InsufficientData { found: pairs.len() });
    }
    if let Some(index) = pairs
        .iter()
        .position(|p| !p.scale_weight.is_finite() || !p.device_reading.is_finite())
    {
        return Err(CalibrationError::NonFiniteReference { index });
    }

    let xs: Vec<f64> = pairs.iter().map(|p| p.device_reading).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.scale_weight).collect();
    let [a, b, c] = regression::fit_quadratic(&xs, &ys)?;

    Ok(CalibrationModel::new(a, b, c))
}

/// Converts `sample` to pounds, sums the corners and evaluates `model`.
#[inline]
pub fn apply(model: &CalibrationModel, sample: &RawSample) -> CalibratedWeight {
    model.evaluate(sample.converted_sum())
}

pub fn residual_sum_of_squares(model: &CalibrationModel, pairs: &[ReferencePair]) -> f64 {
    pairs
        .iter()
        .map(|p| {
            let residual = model.evaluate(p.device_reading) - p.scale_weight;
            residual * residual
        })
        .sum()
}

/// Fit diagnostics kept next to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitReport {
    pub model: CalibrationModel,
    pub pair_count: usize,
    pub residual_sum_of_squares: f64,
    pub rmse: f64,
    pub min_reading: f64,
    pub max_reading: f64,
}

impl FitReport {
    fn from_fit(model: CalibrationModel, pairs: &[ReferencePair]) -> Self {
        let rss = residual_sum_of_squares(&model, pairs);
        let (min_reading, max_reading) = pairs.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), p| (lo.min(p.device_reading), hi.max(p.device_reading)),
        );
        Self {
            model,
            pair_count: pairs.len(),
            residual_sum_of_squares: rss,
            rmse: (rss / pairs.len() as f64).sqrt(),
            min_reading,
            max_reading,
        }
    }

    /// Report for a model that was not fitted from data.
    pub fn unfitted(model: CalibrationModel) -> Self {
        Self {
            model,
            pair_count: 0,
            residual_sum_of_squares: 0.0,
            rmse: 0.0,
            min_reading: f64::NEG_INFINITY,
            max_reading: f64::INFINITY,
        }
    }
}

/// A calibrator that has not been fitted yet. Fitting consumes it.
#[derive(Debug, Default)]
pub struct Calibrator {
    _private: (),
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(self, pairs: &[ReferencePair]) -> Result<FittedCalibrator, CalibrationError> {
        let model = fit(pairs)?;
        Ok(FittedCalibrator {
            report: FitReport::from_fit(model, pairs),
        })
    }

    /// Skips fitting and uses `model` as is.
    pub fn with_model(self, model: CalibrationModel) -> FittedCalibrator {
        FittedCalibrator {
            report: FitReport::unfitted(model),
        }
    }
}

/// Terminal state: holds an immutable model and only evaluates it.
#[derive(Debug, Clone)]
pub struct FittedCalibrator {
    report: FitReport,
}

impl FittedCalibrator {
    #[inline]
    pub fn apply(&self, sample: &RawSample) -> CalibratedWeight {
        apply(&self.report.model, sample)
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.report.model
    }

    pub fn report(&self) -> &FitReport {
        &self.report
    }

    /// True when `x` lies outside the range of readings the model was fitted on.
    pub fn is_extrapolating(&self, x: f64) -> bool {
        x < self.report.min_reading || x > self.report.max_reading
    }
}
