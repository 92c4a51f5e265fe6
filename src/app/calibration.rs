use crate::core::averager::ReadingAverager;
use crate::core::{CalibrationStore, DeviceEvent, ReferencePair, SampleReader};
use crate::domain::model::{default_reference_pairs, raw_to_pounds};
use crate::utils::error::{Result, WiightError};

/// Records one pair. With `raw`, `wii` is a raw device sum and gets converted first.
pub async fn add_pair<S: CalibrationStore>(store: &S, scale: f64, wii: f64, raw: bool) -> Result<ReferencePair> {
    let pair = if raw {
        ReferencePair::from_raw_sum(scale, wii)
    } else {
        ReferencePair::new(scale, wii)
    };
    store.append(pair).await?;
    tracing::info!(
        "Recorded reference pair: scale {:.2} lb <=> board {:.2} lb",
        pair.scale_weight,
        pair.device_reading
    );
    Ok(pair)
}

/// Replaces the whole table with the built-in dataset, or empties it.
pub async fn reset_table<S: CalibrationStore>(store: &S, empty: bool) -> Result<usize> {
    let pairs = if empty { Vec::new() } else { default_reference_pairs() };
    store.replace_all(&pairs).await?;
    tracing::info!("Calibration table reset with {} reference pairs", pairs.len());
    Ok(pairs.len())
}

/// Averages `samples` board readings while the reference weight stands on the
/// board, then records the resulting pair.
pub async fn capture_pair<R, S>(reader: &mut R, store: &S, scale: f64, samples: usize) -> Result<ReferencePair>
where
    R: SampleReader,
    S: CalibrationStore,
{
    let mut averager = ReadingAverager::new(samples);
    tracing::info!("Capturing {} samples for a {:.2} lb reference weight", samples, scale);

    while !averager.is_ready() {
        match reader.next_event().await? {
            DeviceEvent::Sample(sample) => {
                averager.add_sample(&sample);
                tracing::debug!(
                    "Capture progress {:.0}% (last reading {:.2} lb)",
                    averager.progress() * 100.0,
                    sample.converted_sum()
                );
            }
            DeviceEvent::Hangup => {
                return Err(WiightError::ProcessingError {
                    message: format!(
                        "device hung up after {} of {} capture samples",
                        averager.sample_count(),
                        averager.required_samples()
                    ),
                });
            }
            DeviceEvent::Other(kind) => tracing::debug!("{} event", kind),
        }
    }

    let pair = averager
        .reference_pair(scale)
        .ok_or_else(|| WiightError::ProcessingError {
            message: "no samples were captured".to_string(),
        })?;
    store.append(pair).await?;
    tracing::info!(
        "Captured reference pair: scale {:.2} lb <=> board {:.2} lb (raw sum {:.0})",
        pair.scale_weight,
        pair.device_reading,
        pair.device_reading / raw_to_pounds(1.0)
    );
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{LineSampleReader, MemoryCalibrationStore};

    #[tokio::test]
    async fn test_add_raw_pair_converts() {
        let store = MemoryCalibrationStore::new();
        let pair = add_pair(&store, 22.0, 1000.0, true).await.unwrap();
        assert!((pair.device_reading - 22.0462).abs() < 1e-9);
        assert_eq!(store.load().await.unwrap(), vec![pair]);
    }

    #[tokio::test]
    async fn test_reset_table() {
        let store = MemoryCalibrationStore::with_pairs(vec![ReferencePair::new(1.0, 1.0)]);
        assert_eq!(reset_table(&store, false).await.unwrap(), 9);
        assert_eq!(store.load().await.unwrap(), default_reference_pairs());
        assert_eq!(reset_table(&store, true).await.unwrap(), 0);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capture_averages_samples() {
        let store = MemoryCalibrationStore::new();
        let mut reader = LineSampleReader::new("100,100,100,100\nkey\n300,300,300,300\n".as_bytes());

        let pair = capture_pair(&mut reader, &store, 20.0, 2).await.unwrap();
        assert_eq!(pair.scale_weight, 20.0);
        assert!((pair.device_reading - 17.63696).abs() < 1e-9);
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_capture_fails_on_early_hangup() {
        let store = MemoryCalibrationStore::new();
        let mut reader = LineSampleReader::new("100,100,100,100\ngone\n".as_bytes());

        let result = capture_pair(&mut reader, &store, 20.0, 5).await;
        assert!(matches!(result, Err(WiightError::ProcessingError { .. })));
        assert!(store.load().await.unwrap().is_empty());
    }
}
