use crate::domain::model::{DeviceEvent, ReferencePair, WeightReading};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Source of board events. `next_event` waits until data or a hangup is available.
pub trait SampleReader: Send {
    fn next_event(&mut self) -> impl std::future::Future<Output = Result<DeviceEvent>> + Send;
}

/// Durable table of reference pairs.
pub trait CalibrationStore: Send + Sync {
    fn load(&self) -> impl std::future::Future<Output = Result<Vec<ReferencePair>>> + Send;

    fn append(&self, pair: ReferencePair) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Discards every stored pair and writes `pairs` in their place, as one batch.
    fn replace_all(
        &self,
        pairs: &[ReferencePair],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Reporter: Send {
    async fn report(&mut self, reading: &WeightReading) -> Result<()>;

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitFailurePolicy {
    /// Surface the fit error to the caller.
    Abort,
    /// Log a warning and continue with the identity model.
    Identity,
}

impl FitFailurePolicy {
    pub const NAMES: [&'static str; 2] = ["abort", "identity"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "abort" => Some(FitFailurePolicy::Abort),
            "identity" => Some(FitFailurePolicy::Identity),
            _ => None,
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    /// Calibration table location; `None` keeps the table in memory.
    fn calibration_path(&self) -> Option<&str>;
    fn seed_defaults(&self) -> bool;
    fn fit_failure_policy(&self) -> FitFailurePolicy;
    /// Event stream to replay; `-` reads stdin.
    fn sample_source(&self) -> &str;
    fn replay_interval_ms(&self) -> u64;
    fn max_samples(&self) -> Option<u64>;
    fn console_output(&self) -> bool;
    fn json_output(&self) -> bool;
    fn csv_output(&self) -> Option<&str>;
    fn precision(&self) -> usize;
}
