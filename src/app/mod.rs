pub mod calibration;
pub mod session;
