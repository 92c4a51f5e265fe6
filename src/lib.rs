pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, TomlConfig};

pub use adapters::{CsvCalibrationStore, LineSampleReader, MemoryCalibrationStore};
pub use core::calibrator::{CalibrationError, Calibrator, FitReport, FittedCalibrator};
pub use core::engine::{SessionEnd, SessionSummary, WeighEngine};
pub use domain::model::{CalibrationModel, RawSample, ReferencePair};
pub use utils::error::{Result, WiightError};
