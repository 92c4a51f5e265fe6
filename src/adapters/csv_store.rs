use crate::core::{CalibrationStore, ReferencePair};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// 校正資料表的一列，欄位與原始資料表一致 (id, scale, wii)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibrationRow {
    id: u64,
    scale: f64,
    wii: f64,
}

impl From<&CalibrationRow> for ReferencePair {
    fn from(row: &CalibrationRow) -> Self {
        ReferencePair::new(row.scale, row.wii)
    }
}

/// Calibration table kept in a CSV file. `wii` readings are stored in pounds.
#[derive(Debug, Clone)]
pub struct CsvCalibrationStore {
    path: PathBuf,
}

impl CsvCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the table file has been created, even if it holds no rows.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_rows(&self) -> Result<Vec<CalibrationRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CalibrationStore for CsvCalibrationStore {
    async fn load(&self) -> Result<Vec<ReferencePair>> {
        let rows = self.read_rows()?;
        tracing::debug!("Loaded {} calibration rows from {}", rows.len(), self.path.display());
        Ok(rows.iter().map(ReferencePair::from).collect())
    }

    async fn append(&self, pair: ReferencePair) -> Result<()> {
        let rows = self.read_rows()?;
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        self.ensure_parent_dir()?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(CalibrationRow {
            id: next_id,
            scale: pair.scale_weight,
            wii: pair.device_reading,
        })?;
        writer.flush()?;

        tracing::debug!("Appended calibration row {} to {}", next_id, self.path.display());
        Ok(())
    }

    async fn replace_all(&self, pairs: &[ReferencePair]) -> Result<()> {
        self.ensure_parent_dir()?;
        let temp_path = self.temp_path();

        // 先寫入暫存檔，再以 rename 一次替換整張表
        {
            let mut writer = csv::Writer::from_path(&temp_path)?;
            for (idx, pair) in pairs.iter().enumerate() {
                writer.serialize(CalibrationRow {
                    id: idx as u64 + 1,
                    scale: pair.scale_weight,
                    wii: pair.device_reading,
                })?;
            }
            if pairs.is_empty() {
                writer.write_record(["id", "scale", "wii"])?;
            }
            writer.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!("Replaced calibration table {} with {} rows", self.path.display(), pairs.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::default_reference_pairs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = CsvCalibrationStore::new(dir.path().join("missing.csv"));
        assert!(store.load().await.unwrap().is_empty());
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn test_emptied_table_still_exists() {
        let dir = TempDir::new().unwrap();
        let store = CsvCalibrationStore::new(dir.path().join("table.csv"));
        store.replace_all(&[]).await.unwrap();
        assert!(store.exists());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_creates_header_and_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("calibration.csv");
        let store = CsvCalibrationStore::new(&path);

        store.append(ReferencePair::new(71.5, 63.0)).await.unwrap();
        store.append(ReferencePair::new(52.0, 43.65)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,scale,wii");
        assert_eq!(lines[1], "1,71.5,63.0");
        assert_eq!(lines[2], "2,52.0,43.65");

        let pairs = store.load().await.unwrap();
        assert_eq!(pairs, vec![ReferencePair::new(71.5, 63.0), ReferencePair::new(52.0, 43.65)]);
    }

    #[tokio::test]
    async fn test_replace_all_discards_previous_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calibration.csv");
        let store = CsvCalibrationStore::new(&path);

        store.append(ReferencePair::new(1.0, 1.0)).await.unwrap();
        store.replace_all(&default_reference_pairs()).await.unwrap();

        let pairs = store.load().await.unwrap();
        assert_eq!(pairs, default_reference_pairs());
        assert!(!store.temp_path().exists());

        store.append(ReferencePair::new(100.0, 92.0)).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().last().unwrap().starts_with("10,"));
    }

    #[tokio::test]
    async fn test_replace_all_with_nothing_leaves_empty_table() {
        let dir = TempDir::new().unwrap();
        let store = CsvCalibrationStore::new(dir.path().join("calibration.csv"));
        store.append(ReferencePair::new(1.0, 1.0)).await.unwrap();
        store.replace_all(&[]).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
