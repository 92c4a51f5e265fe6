use crate::domain::model::CalibrationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WiightError {
    #[error("Calibration failed: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Malformed event on line {line}: {message}")]
    SampleParse { line: usize, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

/// 錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Calibration,
    Device,
    Storage,
    Output,
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WiightError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WiightError::Calibration(_) => ErrorCategory::Calibration,
            WiightError::CsvError(_) => ErrorCategory::Storage,
            WiightError::IoError(_) => ErrorCategory::Storage,
            WiightError::SerializationError(_) => ErrorCategory::Output,
            WiightError::ConfigError { .. }
            | WiightError::ConfigValidationError { .. }
            | WiightError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            WiightError::SampleParse { .. } => ErrorCategory::Device,
            WiightError::ProcessingError { .. } => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WiightError::SampleParse { .. } => ErrorSeverity::Medium,
            WiightError::Calibration(CalibrationError::MalformedSample { .. }) => {
                ErrorSeverity::Medium
            }
            WiightError::Calibration(_) => ErrorSeverity::High,
            WiightError::ConfigError { .. }
            | WiightError::ConfigValidationError { .. }
            | WiightError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            WiightError::ProcessingError { .. } => ErrorSeverity::High,
            WiightError::CsvError(_) | WiightError::SerializationError(_) => ErrorSeverity::High,
            WiightError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            WiightError::Calibration(CalibrationError::InsufficientData { .. }) => {
                "Record at least three reference weights with `wiight calibration add` or `capture`"
            }
            WiightError::Calibration(CalibrationError::SingularSystem) => {
                "Record reference weights that are spread further apart, then run `wiight fit` again"
            }
            WiightError::Calibration(CalibrationError::NonFiniteReference { .. }) => {
                "Remove the corrupted row from the calibration table or run `wiight calibration reset`"
            }
            WiightError::Calibration(CalibrationError::MalformedSample { .. })
            | WiightError::SampleParse { .. } => {
                "Check that every sample line carries four non-negative sensor values"
            }
            WiightError::CsvError(_) => "Check the calibration table for malformed rows",
            WiightError::IoError(_) => "Check that the file exists and that its directory is writable",
            WiightError::SerializationError(_) => "Re-run with --verbose to see the offending reading",
            WiightError::ConfigError { .. }
            | WiightError::ConfigValidationError { .. }
            | WiightError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command-line flags and try again"
            }
            WiightError::ProcessingError { .. } => "Re-run with --verbose for more detail",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            WiightError::Calibration(CalibrationError::InsufficientData { found }) => format!(
                "Not enough calibration data: {} reference pair(s), at least 3 needed",
                found
            ),
            WiightError::Calibration(CalibrationError::SingularSystem) => {
                "Calibration data is degenerate: the reference readings are too similar".to_string()
            }
            WiightError::SampleParse { line, .. } => {
                format!("Could not read the sample stream at line {}", line)
            }
            WiightError::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WiightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_errors_are_high_severity() {
        let err = WiightError::from(CalibrationError::SingularSystem);
        assert_eq!(err.category(), ErrorCategory::Calibration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("spread"));
    }

    #[test]
    fn test_user_friendly_message_mentions_pair_count() {
        let err = WiightError::from(CalibrationError::InsufficientData { found: 2 });
        assert!(err.user_friendly_message().contains("2 reference pair"));
    }

    #[test]
    fn test_sample_parse_is_device_error() {
        let err = WiightError::SampleParse {
            line: 7,
            message: "expected 4 values".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Device);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn test_config_errors_share_category() {
        let errors = [
            WiightError::ConfigError {
                message: "bad pattern".to_string(),
            },
            WiightError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: "unexpected key".to_string(),
            },
            WiightError::InvalidConfigValueError {
                field: "--precision".to_string(),
                value: "9".to_string(),
                reason: "out of range".to_string(),
            },
        ];
        for err in errors {
            assert_eq!(err.category(), ErrorCategory::Configuration);
            assert_eq!(err.severity(), ErrorSeverity::High);
            assert!(err.recovery_suggestion().contains("configuration"));
        }
    }
}
