use clap::Parser;
use wiight::app::{calibration, session};
use wiight::config::{CalibrationCommand, Command};
use wiight::core::calibrator::Calibrator;
use wiight::core::{CalibrationStore, ConfigProvider};
use wiight::utils::error::ErrorSeverity;
use wiight::utils::{logger, validation::Validate};
use wiight::{CliConfig, TomlConfig, WiightError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置，命令列參數優先
    let toml_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(mut config) => {
                config.apply_overrides(&cli);
                Some(config)
            }
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => None,
    };

    // 初始化日誌
    let config_level = toml_config.as_ref().and_then(|c| c.log_level());
    if cli.log_json {
        logger::init_json_logger(cli.verbose, config_level);
    } else {
        logger::init_cli_logger(cli.verbose, config_level);
    }

    tracing::info!("Starting wiight");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let monitor_enabled = cli.monitor
        || toml_config
            .as_ref()
            .map(|c| c.monitoring_enabled())
            .unwrap_or(false);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match &toml_config {
        Some(config) => execute(config, &cli, monitor_enabled).await,
        None => execute(&cli, &cli, monitor_enabled).await,
    };

    if let Err(e) = result {
        report_failure(&e);
    }

    Ok(())
}

async fn execute<C>(config: &C, cli: &CliConfig, monitor_enabled: bool) -> wiight::Result<()>
where
    C: ConfigProvider + Validate,
{
    // 驗證配置
    config.validate()?;
    cli.validate()?;

    match cli.command() {
        Command::Run => run_session(config, monitor_enabled).await,
        Command::Fit => print_fit(config).await,
        Command::Calibration(command) => run_calibration(config, command).await,
    }
}

async fn run_session<C: ConfigProvider>(config: &C, monitor_enabled: bool) -> wiight::Result<()> {
    let mut engine = session::build_engine(config, monitor_enabled).await?;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Could not install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };
    let summary = engine.run_until(shutdown).await?;

    match (summary.mean_weight, summary.min_weight, summary.max_weight) {
        (Some(mean), Some(min), Some(max)) => tracing::info!(
            "✅ {} samples: mean {:.2} lb, min {:.2} lb, max {:.2} lb",
            summary.samples,
            mean,
            min,
            max
        ),
        _ => tracing::info!("No balance board samples received"),
    }
    Ok(())
}

async fn print_fit<C: ConfigProvider>(config: &C) -> wiight::Result<()> {
    let store = session::open_store(config).await?;
    let pairs = store.load().await?;
    let calibrator = Calibrator::new().fit(&pairs)?;
    let report = calibrator.report();

    if config.json_output() {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("📋 Calibration Model:");
    println!("  a = {:.9e}", report.model.a);
    println!("  b = {:.9}", report.model.b);
    println!("  c = {:.9}", report.model.c);
    println!(
        "  Pairs: {}, RSS: {:.4}, RMSE: {:.4} lb",
        report.pair_count, report.residual_sum_of_squares, report.rmse
    );
    println!(
        "  Fitted reading range: {:.2} .. {:.2} lb",
        report.min_reading, report.max_reading
    );
    println!();
    println!("  {:>8} {:>8} {:>8} {:>8}", "scale", "wii", "fitted", "error");
    for pair in &pairs {
        let fitted = report.model.evaluate(pair.device_reading);
        println!(
            "  {:>8.2} {:>8.2} {:>8.2} {:>+8.2}",
            pair.scale_weight,
            pair.device_reading,
            fitted,
            fitted - pair.scale_weight
        );
    }
    Ok(())
}

async fn run_calibration<C: ConfigProvider>(config: &C, command: CalibrationCommand) -> wiight::Result<()> {
    if config.calibration_path().is_none() && !matches!(command, CalibrationCommand::List) {
        tracing::warn!("No --calibration table given, changes will not outlive this process");
    }

    match command {
        CalibrationCommand::List => {
            // 唯讀指令，不建立或寫入校正表
            let store = session::ConfiguredStore::from_config(config);
            let pairs = store.load().await?;
            if config.json_output() {
                println!("{}", serde_json::to_string_pretty(&pairs)?);
            } else {
                println!("  {:>3} {:>8} {:>8}", "#", "scale", "wii");
                for (idx, pair) in pairs.iter().enumerate() {
                    println!(
                        "  {:>3} {:>8.2} {:>8.2}",
                        idx + 1,
                        pair.scale_weight,
                        pair.device_reading
                    );
                }
            }
        }
        CalibrationCommand::Add { scale, wii, raw } => {
            let store = session::open_store(config).await?;
            let pair = calibration::add_pair(&store, scale, wii, raw).await?;
            println!("✅ Recorded {:.2} lb <=> {:.2} lb", pair.scale_weight, pair.device_reading);
        }
        CalibrationCommand::Reset { empty } => {
            let store = session::ConfiguredStore::from_config(config);
            let count = calibration::reset_table(&store, empty).await?;
            println!("✅ Calibration table now holds {} reference pairs", count);
        }
        CalibrationCommand::Capture { scale, samples } => {
            let store = session::open_store(config).await?;
            let mut reader = session::open_reader(config).await?;
            let pair = calibration::capture_pair(&mut reader, &store, scale, samples).await?;
            println!("✅ Captured {:.2} lb <=> {:.2} lb", pair.scale_weight, pair.device_reading);
        }
    }
    Ok(())
}

fn report_failure(e: &WiightError) {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ wiight failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
