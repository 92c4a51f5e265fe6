use crate::domain::model::{RawSample, ReferencePair};

/// Averages the converted sums of consecutive samples while a known weight
/// stands on the board.
///
/// # Usage
///
/// 1. Create an averager with the number of samples to collect
/// 2. Feed samples using `add_sample()` until it returns `true`
/// 3. Call `reference_pair()` with the scale weight to get the new row
#[derive(Debug, Clone)]
pub struct ReadingAverager {
    sum: f64,
    collected: usize,
    required_samples: usize,
}

impl ReadingAverager {
    pub fn new(required_samples: usize) -> Self {
        Self {
            sum: 0.0,
            collected: 0,
            required_samples,
        }
    }

    /// Returns `true` once enough samples have been collected; extra samples are ignored.
    pub fn add_sample(&mut self, sample: &RawSample) -> bool {
        if self.collected < self.required_samples {
            self.sum += sample.converted_sum();
            self.collected += 1;
        }
        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.collected >= self.required_samples
    }

    pub fn sample_count(&self) -> usize {
        self.collected
    }

    pub fn required_samples(&self) -> usize {
        self.required_samples
    }

    /// Fraction of samples collected (0.0 to 1.0).
    pub fn progress(&self) -> f64 {
        if self.required_samples == 0 {
            return 1.0;
        }
        (self.collected as f64 / self.required_samples as f64).min(1.0)
    }

    /// Mean converted reading, if any sample was collected.
    pub fn average(&self) -> Option<f64> {
        if self.collected == 0 {
            return None;
        }
        Some(self.sum / self.collected as f64)
    }

    pub fn reference_pair(&self, scale_weight: f64) -> Option<ReferencePair> {
        self.average()
            .map(|reading| ReferencePair::new(scale_weight, reading))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_converted_sums() {
        let mut averager = ReadingAverager::new(2);
        assert_eq!(averager.average(), None);

        assert!(!averager.add_sample(&RawSample::new([100.0; 4]).unwrap()));
        assert!((averager.progress() - 0.5).abs() < f64::EPSILON);
        assert!(averager.add_sample(&RawSample::new([300.0; 4]).unwrap()));

        // (8.81848 + 26.45544) / 2
        let average = averager.average().unwrap();
        assert!((average - 17.63696).abs() < 1e-9);

        let pair = averager.reference_pair(150.0).unwrap();
        assert_eq!(pair.scale_weight, 150.0);
        assert_eq!(pair.device_reading, average);
    }

    #[test]
    fn test_ignores_samples_past_target() {
        let mut averager = ReadingAverager::new(1);
        assert!(averager.add_sample(&RawSample::new([100.0; 4]).unwrap()));
        assert!(averager.add_sample(&RawSample::new([900.0; 4]).unwrap()));
        assert_eq!(averager.sample_count(), 1);
        assert!((averager.average().unwrap() - 8.81848).abs() < 1e-9);
    }

    #[test]
    fn test_zero_required_is_ready() {
        let averager = ReadingAverager::new(0);
        assert!(averager.is_ready());
        assert_eq!(averager.progress(), 1.0);
        assert!(averager.reference_pair(10.0).is_none());
    }
}
