use crate::config::cli::{CliConfig, DEFAULT_PRECISION, DEFAULT_SOURCE, MAX_PRECISION};
use crate::core::{ConfigProvider, FitFailurePolicy};
use crate::utils::error::{Result, WiightError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub path: Option<String>,
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
    pub on_fit_failure: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: Option<String>,
    pub replay_interval_ms: Option<u64>,
    pub max_samples: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_true")]
    pub console: bool,
    #[serde(default)]
    pub json: bool,
    pub csv_path: Option<String>,
    pub precision: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            path: None,
            seed_defaults: true,
            on_fit_failure: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            console: true,
            json: false,
            csv_path: None,
            precision: None,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WiightError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| WiightError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WIIGHT_DATA})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WiightError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 套用命令列明確指定的設定
    pub fn apply_overrides(&mut self, cli: &CliConfig) {
        if let Some(path) = &cli.calibration {
            self.calibration.path = Some(path.clone());
        }
        if cli.no_seed {
            self.calibration.seed_defaults = false;
        }
        if let Some(policy) = &cli.on_fit_failure {
            self.calibration.on_fit_failure = Some(policy.clone());
        }
        if let Some(source) = &cli.source {
            self.source.path = Some(source.clone());
        }
        if let Some(interval) = cli.interval_ms {
            self.source.replay_interval_ms = Some(interval);
        }
        if let Some(max) = cli.max_samples {
            self.source.max_samples = Some(max);
        }
        if cli.quiet {
            self.report.console = false;
        }
        if cli.json {
            self.report.json = true;
        }
        if let Some(path) = &cli.csv_out {
            self.report.csv_path = Some(path.clone());
        }
        if let Some(precision) = cli.precision {
            self.report.precision = Some(precision);
        }
        if cli.monitor {
            let monitoring = self.monitoring.get_or_insert(MonitoringConfig {
                enabled: true,
                log_level: None,
            });
            monitoring.enabled = true;
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(path) = &self.calibration.path {
            validation::validate_path("calibration.path", path)?;
            validation::validate_file_extension("calibration.path", path, &["csv"])?;
        }
        if let Some(policy) = &self.calibration.on_fit_failure {
            validation::validate_one_of("calibration.on_fit_failure", policy, &FitFailurePolicy::NAMES)?;
        }
        if let Some(path) = &self.source.path {
            validation::validate_path("source.path", path)?;
        }
        if let Some(path) = &self.report.csv_path {
            validation::validate_path("report.csv_path", path)?;
            validation::validate_file_extension("report.csv_path", path, &["csv"])?;
        }
        if let Some(precision) = self.report.precision {
            validation::validate_range("report.precision", precision, 0, MAX_PRECISION)?;
        }
        if let Some(level) = self.log_level() {
            validation::validate_one_of("monitoring.log_level", level, &["debug", "info", "warn", "error"])?;
        }
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn calibration_path(&self) -> Option<&str> {
        self.calibration.path.as_deref()
    }

    fn seed_defaults(&self) -> bool {
        self.calibration.seed_defaults
    }

    fn fit_failure_policy(&self) -> FitFailurePolicy {
        self.calibration
            .on_fit_failure
            .as_deref()
            .and_then(FitFailurePolicy::parse)
            .unwrap_or(FitFailurePolicy::Abort)
    }

    fn sample_source(&self) -> &str {
        self.source.path.as_deref().unwrap_or(DEFAULT_SOURCE)
    }

    fn replay_interval_ms(&self) -> u64 {
        self.source.replay_interval_ms.unwrap_or(0)
    }

    fn max_samples(&self) -> Option<u64> {
        self.source.max_samples
    }

    fn console_output(&self) -> bool {
        self.report.console
    }

    fn json_output(&self) -> bool {
        self.report.json
    }

    fn csv_output(&self) -> Option<&str> {
        self.report.csv_path.as_deref()
    }

    fn precision(&self) -> usize {
        self.report.precision.unwrap_or(DEFAULT_PRECISION)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
