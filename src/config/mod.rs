#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CalibrationCommand, CliConfig, Command};
#[cfg(feature = "cli")]
pub use toml_config::TomlConfig;
