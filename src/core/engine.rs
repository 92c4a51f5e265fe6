use crate::core::calibrator::FittedCalibrator;
use crate::core::{DeviceEvent, RawSample, Reporter, SampleReader, WeightReading};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    Hangup,
    SampleLimit,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub samples: u64,
    pub ignored_events: u64,
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub mean_weight: Option<f64>,
    pub last_weight: Option<f64>,
    pub ended_by: SessionEnd,
}

#[derive(Default)]
struct WeightStats {
    samples: u64,
    ignored_events: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
    last: Option<f64>,
}

impl WeightStats {
    fn record(&mut self, weight: f64) {
        self.samples += 1;
        self.sum += weight;
        self.min = Some(self.min.map_or(weight, |m| m.min(weight)));
        self.max = Some(self.max.map_or(weight, |m| m.max(weight)));
        self.last = Some(weight);
    }

    fn into_summary(self, ended_by: SessionEnd) -> SessionSummary {
        let mean_weight = (self.samples > 0).then(|| self.sum / self.samples as f64);
        SessionSummary {
            samples: self.samples,
            ignored_events: self.ignored_events,
            min_weight: self.min,
            max_weight: self.max,
            mean_weight,
            last_weight: self.last,
            ended_by,
        }
    }
}

/// Drives the read → apply → report loop for one board session.
pub struct WeighEngine<R: SampleReader> {
    calibrator: FittedCalibrator,
    reader: R,
    reporters: Vec<Box<dyn Reporter>>,
    max_samples: Option<u64>,
    monitor: SystemMonitor,
    warned_extrapolation: bool,
}

impl<R: SampleReader> WeighEngine<R> {
    pub fn new(calibrator: FittedCalibrator, reader: R) -> Self {
        Self::new_with_monitoring(calibrator, reader, false)
    }

    pub fn new_with_monitoring(calibrator: FittedCalibrator, reader: R, monitor_enabled: bool) -> Self {
        Self {
            calibrator,
            reader,
            reporters: Vec::new(),
            max_samples: None,
            monitor: SystemMonitor::new(monitor_enabled),
            warned_extrapolation: false,
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn with_max_samples(mut self, max_samples: Option<u64>) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn calibrator(&self) -> &FittedCalibrator {
        &self.calibrator
    }

    /// Runs until the board hangs up or the sample limit is reached.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also stops when `shutdown` resolves.
    ///
    /// Every reporter is finished even when the session fails; the first error wins.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<SessionSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = WeightStats::default();

        tracing::info!("Waiting for balance board events");
        self.monitor.log_stats("Session start");

        let outcome = self.drive(shutdown.as_mut(), &mut stats).await;
        let finished = self.finish_reporters().await;
        let ended_by = outcome?;
        finished?;

        self.monitor.log_final_stats();
        let summary = stats.into_summary(ended_by);
        tracing::info!(
            "Session ended ({:?}) after {} samples, {} other events",
            summary.ended_by,
            summary.samples,
            summary.ignored_events
        );
        Ok(summary)
    }

    async fn drive<F>(&mut self, mut shutdown: Pin<&mut F>, stats: &mut WeightStats) -> Result<SessionEnd>
    where
        F: Future<Output = ()>,
    {
        loop {
            if let Some(limit) = self.max_samples {
                if stats.samples >= limit {
                    tracing::info!("Reached sample limit of {}", limit);
                    return Ok(SessionEnd::SampleLimit);
                }
            }

            let event = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    return Ok(SessionEnd::Shutdown);
                }
                event = self.reader.next_event() => event?,
            };

            match event {
                DeviceEvent::Sample(sample) => {
                    let weight = self.handle_sample(&sample).await?;
                    stats.record(weight);
                }
                DeviceEvent::Hangup => {
                    tracing::info!("Device gone");
                    return Ok(SessionEnd::Hangup);
                }
                DeviceEvent::Other(kind) => {
                    tracing::debug!("{} event", kind);
                    stats.ignored_events += 1;
                }
            }
        }
    }

    async fn finish_reporters(&mut self) -> Result<()> {
        let mut first_error = None;
        for reporter in self.reporters.iter_mut() {
            if let Err(e) = reporter.finish().await {
                tracing::error!("Reporter failed to finish: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn handle_sample(&mut self, sample: &RawSample) -> Result<f64> {
        let x = sample.converted_sum();
        if !self.warned_extrapolation && self.calibrator.is_extrapolating(x) {
            let report = self.calibrator.report();
            tracing::warn!(
                "Reading {:.2} lb is outside the calibrated range [{:.2}, {:.2}], weights may be inaccurate",
                x,
                report.min_reading,
                report.max_reading
            );
            self.warned_extrapolation = true;
        }

        let weight = self.calibrator.apply(sample);
        let reading = WeightReading::new(weight, sample);
        for reporter in self.reporters.iter_mut() {
            reporter.report(&reading).await?;
        }
        Ok(weight)
    }
}
