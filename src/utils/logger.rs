use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable honoured as a plain level override (debug/info/warn/error)
pub const LOG_LEVEL_ENV: &str = "LOGLEVEL";

/// 解析日誌過濾器：RUST_LOG > LOGLEVEL > 設定檔 log_level > --verbose 預設值
pub fn resolve_filter(verbose: bool, config_level: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if let Some(directive) = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| level_directive(&level))
        .or_else(|| config_level.and_then(level_directive))
    {
        return EnvFilter::new(directive);
    }

    if verbose {
        EnvFilter::new("wiight=debug,info")
    } else {
        EnvFilter::new("wiight=info")
    }
}

/// Maps a `LOGLEVEL` value onto a filter directive; unknown values are ignored.
pub fn level_directive(level: &str) -> Option<String> {
    match level.trim().to_lowercase().as_str() {
        "debug" => Some("wiight=debug".to_string()),
        "info" => Some("wiight=info".to_string()),
        "warn" => Some("wiight=warn".to_string()),
        "error" => Some("wiight=error".to_string()),
        _ => None,
    }
}

pub fn init_cli_logger(verbose: bool, config_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(resolve_filter(verbose, config_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

pub fn init_json_logger(verbose: bool, config_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(resolve_filter(verbose, config_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("DEBUG").as_deref(), Some("wiight=debug"));
        assert_eq!(level_directive(" warn ").as_deref(), Some("wiight=warn"));
        assert_eq!(level_directive("trace"), None);
        assert_eq!(level_directive(""), None);
    }
}
