use crate::core::{ConfigProvider, FitFailurePolicy};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand};

pub const DEFAULT_SOURCE: &str = "-";
pub const DEFAULT_PRECISION: usize = 2;
pub const MAX_PRECISION: usize = 6;

#[derive(Debug, Clone, Parser)]
#[command(name = "wiight")]
#[command(about = "Calibrated weight readings from a Wii Balance Board")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log process CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    /// Calibration table (CSV); omit to keep the table in memory
    #[arg(long, global = true)]
    pub calibration: Option<String>,

    /// Do not seed an empty calibration table with the built-in reference weights
    #[arg(long, global = true)]
    pub no_seed: bool,

    /// What to do when the model cannot be fitted: abort or identity
    #[arg(long, global = true)]
    pub on_fit_failure: Option<String>,

    /// Board event stream to read, `-` for stdin
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// Delay between replayed samples in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Stop after this many samples
    #[arg(long, global = true)]
    pub max_samples: Option<u64>,

    /// Do not print the live console line
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Print JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Append every reading to this CSV file
    #[arg(long, global = true)]
    pub csv_out: Option<String>,

    /// Decimal places in console output
    #[arg(long, global = true)]
    pub precision: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Stream calibrated weights from the board (default)
    Run,
    /// Fit the calibration model and print its coefficients
    Fit,
    /// Inspect or edit the calibration table
    #[command(subcommand)]
    Calibration(CalibrationCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum CalibrationCommand {
    /// List stored reference pairs
    List,
    /// Record a reference pair by hand
    Add {
        /// Weight shown by the reference scale
        #[arg(long)]
        scale: f64,
        /// Board reading for the same load
        #[arg(long)]
        wii: f64,
        /// `--wii` is a raw device sum rather than pounds
        #[arg(long)]
        raw: bool,
    },
    /// Replace the whole table with the built-in reference weights
    Reset {
        /// Leave the table empty instead
        #[arg(long)]
        empty: bool,
    },
    /// Average board samples for a known weight and record the pair
    Capture {
        /// Weight shown by the reference scale
        #[arg(long)]
        scale: f64,
        /// Number of samples to average
        #[arg(long, default_value = "50")]
        samples: usize,
    },
}

impl CliConfig {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

impl ConfigProvider for CliConfig {
    fn calibration_path(&self) -> Option<&str> {
        self.calibration.as_deref()
    }

    fn seed_defaults(&self) -> bool {
        !self.no_seed
    }

    fn fit_failure_policy(&self) -> FitFailurePolicy {
        self.on_fit_failure
            .as_deref()
            .and_then(FitFailurePolicy::parse)
            .unwrap_or(FitFailurePolicy::Abort)
    }

    fn sample_source(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_SOURCE)
    }

    fn replay_interval_ms(&self) -> u64 {
        self.interval_ms.unwrap_or(0)
    }

    fn max_samples(&self) -> Option<u64> {
        self.max_samples
    }

    fn console_output(&self) -> bool {
        !self.quiet
    }

    fn json_output(&self) -> bool {
        self.json
    }

    fn csv_output(&self) -> Option<&str> {
        self.csv_out.as_deref()
    }

    fn precision(&self) -> usize {
        self.precision.unwrap_or(DEFAULT_PRECISION)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.calibration {
            validation::validate_path("--calibration", path)?;
            validation::validate_file_extension("--calibration", path, &["csv"])?;
        }
        if let Some(policy) = &self.on_fit_failure {
            validation::validate_one_of("--on-fit-failure", policy, &FitFailurePolicy::NAMES)?;
        }
        if let Some(source) = &self.source {
            validation::validate_path("--source", source)?;
        }
        if let Some(path) = &self.csv_out {
            validation::validate_path("--csv-out", path)?;
            validation::validate_file_extension("--csv-out", path, &["csv"])?;
        }
        if let Some(precision) = self.precision {
            validation::validate_range("--precision", precision, 0, MAX_PRECISION)?;
        }
        if let Some(Command::Calibration(cmd)) = &self.command {
            match cmd {
                CalibrationCommand::Add { scale, wii, .. } => {
                    validation::validate_finite("--scale", *scale)?;
                    validation::validate_finite("--wii", *wii)?;
                }
                CalibrationCommand::Capture { scale, samples } => {
                    validation::validate_finite("--scale", *scale)?;
                    validation::validate_positive_number("--samples", *samples, 1)?;
                }
                CalibrationCommand::List | CalibrationCommand::Reset { .. } => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_subcommand() {
        let config = CliConfig::parse_from(["wiight"]);
        assert!(matches!(config.command(), Command::Run));
        assert_eq!(config.calibration_path(), None);
        assert!(config.seed_defaults());
        assert_eq!(config.fit_failure_policy(), FitFailurePolicy::Abort);
        assert_eq!(config.sample_source(), "-");
        assert_eq!(config.precision(), 2);
        assert!(config.console_output());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config = CliConfig::parse_from([
            "wiight",
            "run",
            "--source",
            "board.log",
            "--max-samples",
            "10",
            "--on-fit-failure",
            "identity",
            "--quiet",
        ]);
        assert_eq!(config.sample_source(), "board.log");
        assert_eq!(config.max_samples(), Some(10));
        assert_eq!(config.fit_failure_policy(), FitFailurePolicy::Identity);
        assert!(!config.console_output());
    }

    #[test]
    fn test_calibration_subcommands() {
        let config = CliConfig::parse_from([
            "wiight",
            "calibration",
            "capture",
            "--scale",
            "150.5",
            "--samples",
            "20",
        ]);
        match config.command() {
            Command::Calibration(CalibrationCommand::Capture { scale, samples }) => {
                assert_eq!(scale, 150.5);
                assert_eq!(samples, 20);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_policy = CliConfig::parse_from(["wiight", "--on-fit-failure", "guess"]);
        assert!(bad_policy.validate().is_err());

        let bad_extension = CliConfig::parse_from(["wiight", "--calibration", "table.txt"]);
        assert!(bad_extension.validate().is_err());

        let bad_samples =
            CliConfig::parse_from(["wiight", "calibration", "capture", "--scale", "100", "--samples", "0"]);
        assert!(bad_samples.validate().is_err());

        let bad_precision = CliConfig::parse_from(["wiight", "--precision", "12"]);
        assert!(bad_precision.validate().is_err());
    }
}
