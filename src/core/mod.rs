pub mod averager;
pub mod calibrator;
pub mod engine;
pub mod regression;

pub use crate::domain::model::{
    CalibratedWeight, CalibrationModel, DeviceEvent, RawSample, ReferencePair, WeightReading,
};
pub use crate::domain::ports::{
    CalibrationStore, ConfigProvider, FitFailurePolicy, Reporter, SampleReader,
};
pub use crate::utils::error::Result;
