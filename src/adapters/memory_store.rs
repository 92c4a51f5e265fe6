use crate::core::{CalibrationStore, ReferencePair};
use crate::domain::model::default_reference_pairs;
use crate::utils::error::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Calibration table that lives only for the current process.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalibrationStore {
    pairs: Arc<Mutex<Vec<ReferencePair>>>,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pairs(pairs: Vec<ReferencePair>) -> Self {
        Self {
            pairs: Arc::new(Mutex::new(pairs)),
        }
    }

    /// Store pre-filled with the built-in reference dataset.
    pub fn with_defaults() -> Self {
        Self::with_pairs(default_reference_pairs())
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    async fn load(&self) -> Result<Vec<ReferencePair>> {
        Ok(self.pairs.lock().await.clone())
    }

    async fn append(&self, pair: ReferencePair) -> Result<()> {
        self.pairs.lock().await.push(pair);
        Ok(())
    }

    async fn replace_all(&self, pairs: &[ReferencePair]) -> Result<()> {
        *self.pairs.lock().await = pairs.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_batch_replacement() {
        tokio_test::block_on(async {
            let store = MemoryCalibrationStore::with_defaults();
            assert_eq!(store.load().await.unwrap().len(), 9);

            store.append(ReferencePair::new(180.0, 172.0)).await.unwrap();
            assert_eq!(store.load().await.unwrap().len(), 10);

            let fresh = [ReferencePair::new(10.0, 9.0)];
            store.replace_all(&fresh).await.unwrap();
            assert_eq!(store.load().await.unwrap(), fresh.to_vec());
        });
    }

    #[test]
    fn test_clones_share_table() {
        tokio_test::block_on(async {
            let store = MemoryCalibrationStore::new();
            let clone = store.clone();
            clone.append(ReferencePair::new(1.0, 2.0)).await.unwrap();
            assert_eq!(store.load().await.unwrap().len(), 1);
        });
    }
}
