use crate::adapters::{
    BoxedLineReader, ConsoleReporter, CsvCalibrationStore, CsvReporter, JsonLinesReporter,
    MemoryCalibrationStore,
};
use crate::app::calibration::reset_table;
use crate::core::calibrator::{Calibrator, FittedCalibrator};
use crate::core::engine::WeighEngine;
use crate::core::{CalibrationModel, CalibrationStore, ConfigProvider, FitFailurePolicy, ReferencePair, Reporter};
use crate::utils::error::Result;
use std::time::Duration;

/// The calibration table selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredStore {
    Csv(CsvCalibrationStore),
    Memory(MemoryCalibrationStore),
}

impl ConfiguredStore {
    /// Builds the store without touching disk. An in-memory table starts with
    /// the built-in pairs when seeding is on.
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        match config.calibration_path() {
            Some(path) => ConfiguredStore::Csv(CsvCalibrationStore::new(path)),
            None if config.seed_defaults() => {
                ConfiguredStore::Memory(MemoryCalibrationStore::with_defaults())
            }
            None => ConfiguredStore::Memory(MemoryCalibrationStore::new()),
        }
    }

    /// False only for a table file that was never created.
    pub fn exists(&self) -> bool {
        match self {
            ConfiguredStore::Csv(store) => store.exists(),
            ConfiguredStore::Memory(_) => true,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ConfiguredStore::Csv(store) => store.path().display().to_string(),
            ConfiguredStore::Memory(_) => "in-memory table".to_string(),
        }
    }
}

impl CalibrationStore for ConfiguredStore {
    async fn load(&self) -> Result<Vec<ReferencePair>> {
        match self {
            ConfiguredStore::Csv(store) => store.load().await,
            ConfiguredStore::Memory(store) => store.load().await,
        }
    }

    async fn append(&self, pair: ReferencePair) -> Result<()> {
        match self {
            ConfiguredStore::Csv(store) => store.append(pair).await,
            ConfiguredStore::Memory(store) => store.append(pair).await,
        }
    }

    async fn replace_all(&self, pairs: &[ReferencePair]) -> Result<()> {
        match self {
            ConfiguredStore::Csv(store) => store.replace_all(pairs).await,
            ConfiguredStore::Memory(store) => store.replace_all(pairs).await,
        }
    }
}

/// Opens the configured table, creating it from the built-in pairs when it does
/// not exist yet and seeding is on. An existing table is never reseeded, even
/// when empty.
pub async fn open_store<C: ConfigProvider>(config: &C) -> Result<ConfiguredStore> {
    let store = ConfiguredStore::from_config(config);
    tracing::info!("Using calibration table: {}", store.describe());

    if config.seed_defaults() && !store.exists() {
        tracing::info!("Calibration table does not exist yet, seeding built-in reference pairs");
        reset_table(&store, false).await?;
    }
    Ok(store)
}

/// Fits a calibrator from the stored pairs, applying `policy` when the fit fails.
pub async fn calibrate<S: CalibrationStore>(store: &S, policy: FitFailurePolicy) -> Result<FittedCalibrator> {
    let pairs = store.load().await?;
    tracing::debug!("Fitting calibration model from {} reference pairs", pairs.len());

    match Calibrator::new().fit(&pairs) {
        Ok(calibrator) => {
            let report = calibrator.report();
            tracing::info!(
                "Calibration: weight = {:.6e}*x^2 + {:.6}*x + {:.4} (rmse {:.3} lb over {} pairs)",
                report.model.a,
                report.model.b,
                report.model.c,
                report.rmse,
                report.pair_count
            );
            Ok(calibrator)
        }
        Err(e) => match policy {
            FitFailurePolicy::Abort => Err(e.into()),
            FitFailurePolicy::Identity => {
                tracing::warn!("⚠️ Calibration failed ({}), falling back to identity calibration", e);
                Ok(Calibrator::new().with_model(CalibrationModel::identity()))
            }
        },
    }
}

pub fn build_reporters<C: ConfigProvider>(config: &C) -> Result<Vec<Box<dyn Reporter>>> {
    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();

    if config.json_output() {
        reporters.push(Box::new(JsonLinesReporter::stdout()));
    } else if config.console_output() {
        reporters.push(Box::new(ConsoleReporter::stdout(config.precision())));
    }
    if let Some(path) = config.csv_output() {
        reporters.push(Box::new(CsvReporter::create(path)?));
    }

    if reporters.is_empty() {
        tracing::warn!("No reporter configured, readings will only be counted");
    }
    Ok(reporters)
}

pub async fn open_reader<C: ConfigProvider>(config: &C) -> Result<BoxedLineReader> {
    let reader = BoxedLineReader::open(config.sample_source()).await?;
    Ok(reader.with_interval(Duration::from_millis(config.replay_interval_ms())))
}

/// Wires store, calibrator, reader and reporters into a ready-to-run engine.
pub async fn build_engine<C: ConfigProvider>(
    config: &C,
    monitor_enabled: bool,
) -> Result<WeighEngine<BoxedLineReader>> {
    let store = open_store(config).await?;
    let calibrator = calibrate(&store, config.fit_failure_policy()).await?;
    let reader = open_reader(config).await?;

    let mut engine = WeighEngine::new_with_monitoring(calibrator, reader, monitor_enabled)
        .with_max_samples(config.max_samples());
    for reporter in build_reporters(config)? {
        engine = engine.with_reporter(reporter);
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calibrator::CalibrationError;
    use crate::utils::error::WiightError;

    #[tokio::test]
    async fn test_abort_policy_surfaces_error() {
        let store = MemoryCalibrationStore::with_pairs(vec![ReferencePair::new(1.0, 1.0)]);
        let result = calibrate(&store, FitFailurePolicy::Abort).await;
        assert!(matches!(
            result,
            Err(WiightError::Calibration(CalibrationError::InsufficientData { found: 1 }))
        ));
    }

    #[tokio::test]
    async fn test_identity_policy_falls_back() {
        let store = MemoryCalibrationStore::new();
        let calibrator = calibrate(&store, FitFailurePolicy::Identity).await.unwrap();
        assert_eq!(*calibrator.model(), CalibrationModel::identity());
    }

    #[tokio::test]
    async fn test_calibrate_from_defaults() {
        let store = MemoryCalibrationStore::with_defaults();
        let calibrator = calibrate(&store, FitFailurePolicy::Abort).await.unwrap();
        assert_eq!(calibrator.report().pair_count, 9);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_memory_table_seeded_at_construction() {
        let mut config = crate::config::TomlConfig::from_toml_str("").unwrap();
        let store = ConfiguredStore::from_config(&config);
        assert!(store.exists());
        assert_eq!(tokio_test::block_on(store.load()).unwrap().len(), 9);

        config.calibration.seed_defaults = false;
        let store = ConfiguredStore::from_config(&config);
        assert!(tokio_test::block_on(store.load()).unwrap().is_empty());
    }
}
