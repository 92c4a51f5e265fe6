use crate::utils::error::{Result, WiightError};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(WiightError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(WiightError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(WiightError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    match std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed_set.contains(extension) => Ok(()),
        Some(extension) => Err(WiightError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(WiightError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(WiightError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: format!("Expected one of: {}", allowed.join(", ")),
    })
}

pub fn validate_finite(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(WiightError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a finite number".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(WiightError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("calibration.path", "calibration.csv").is_ok());
        assert!(validate_path("calibration.path", "").is_err());
        assert!(validate_path("calibration.path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("capture.samples", 5, 1).is_ok());
        assert!(validate_positive_number("capture.samples", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("calibration.path", "cal.csv", &["csv"]).is_ok());
        assert!(validate_file_extension("calibration.path", "cal.txt", &["csv"]).is_err());
        assert!(validate_file_extension("calibration.path", "cal", &["csv"]).is_err());
    }

    #[test]
    fn test_validate_one_of() {
        assert!(validate_one_of("policy", "abort", &["abort", "identity"]).is_ok());
        assert!(validate_one_of("policy", "guess", &["abort", "identity"]).is_err());
    }

    #[test]
    fn test_validate_range_and_finite() {
        assert!(validate_range("report.precision", 2usize, 0, 6).is_ok());
        assert!(validate_range("report.precision", 9usize, 0, 6).is_err());
        assert!(validate_finite("scale", f64::NAN).is_err());
        assert!(validate_finite("scale", 150.0).is_ok());
    }
}
