use crate::core::{Reporter, WeightReading};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Rewrites a single terminal line per reading: weight followed by the four corners.
pub struct ConsoleReporter<W: Write + Send> {
    out: W,
    precision: usize,
    wrote_line: bool,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout(precision: usize) -> Self {
        Self::new(std::io::stdout(), precision)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, precision: usize) -> Self {
        Self {
            out,
            precision,
            wrote_line: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn format_line(&self, reading: &WeightReading) -> String {
        let p = self.precision;
        let [tl, tr, bl, br] = reading.corners;
        format!(
            "Values: {:6.p$} <== {:6.p$} {:6.p$} {:6.p$} {:6.p$}",
            reading.weight,
            tl,
            tr,
            bl,
            br,
            p = p
        )
    }
}

#[async_trait]
impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    async fn report(&mut self, reading: &WeightReading) -> Result<()> {
        let line = self.format_line(reading);
        write!(self.out, "{}\r", line)?;
        self.out.flush()?;
        self.wrote_line = true;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if self.wrote_line {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }
}

/// Streams one JSON object per reading.
pub struct JsonLinesReporter<W: Write + Send> {
    out: W,
}

impl JsonLinesReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> Reporter for JsonLinesReporter<W> {
    async fn report(&mut self, reading: &WeightReading) -> Result<()> {
        serde_json::to_writer(&mut self.out, reading)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WeightRow {
    timestamp: String,
    weight: f64,
    top_left: f64,
    top_right: f64,
    bottom_left: f64,
    bottom_right: f64,
}

impl From<&WeightReading> for WeightRow {
    fn from(reading: &WeightReading) -> Self {
        let [top_left, top_right, bottom_left, bottom_right] = reading.corners;
        Self {
            timestamp: reading.timestamp.to_rfc3339(),
            weight: reading.weight,
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }
}

/// Appends readings to a CSV log, writing the header only into a new file.
pub struct CsvReporter {
    writer: csv::Writer<File>,
    rows: usize,
}

impl CsvReporter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        tracing::info!("Persisting weights to {}", path.display());

        Ok(Self {
            writer: csv::WriterBuilder::new()
                .has_headers(needs_header)
                .from_writer(file),
            rows: 0,
        })
    }
}

#[async_trait]
impl Reporter for CsvReporter {
    async fn report(&mut self, reading: &WeightReading) -> Result<()> {
        self.writer.serialize(WeightRow::from(reading))?;
        self.rows += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        tracing::debug!("Flushed {} weight rows", self.rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawSample;
    use tempfile::TempDir;

    fn reading(weight: f64) -> WeightReading {
        WeightReading::new(weight, &RawSample::new([100.0, 200.0, 300.0, 400.0]).unwrap())
    }

    #[tokio::test]
    async fn test_console_line_format() {
        let mut reporter = ConsoleReporter::new(Vec::new(), 2);
        reporter.report(&reading(150.0)).await.unwrap();
        reporter.finish().await.unwrap();

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(output, "Values: 150.00 <==   2.20   4.41   6.61   8.82\r\n");
    }

    #[tokio::test]
    async fn test_console_finish_without_readings_writes_nothing() {
        let mut reporter = ConsoleReporter::new(Vec::new(), 1);
        reporter.finish().await.unwrap();
        assert!(reporter.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_json_lines() {
        let mut reporter = JsonLinesReporter::new(Vec::new());
        reporter.report(&reading(1.5)).await.unwrap();
        reporter.report(&reading(2.5)).await.unwrap();

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["weight"], 2.5);
        assert_eq!(value["corners"].as_array().unwrap().len(), 4);
        assert!(value["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_csv_reporter_appends_with_single_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("weights.csv");

        for weight in [10.0, 20.0] {
            let mut reporter = CsvReporter::create(&path).unwrap();
            reporter.report(&reading(weight)).await.unwrap();
            reporter.finish().await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,weight,top_left,top_right,bottom_left,bottom_right"
        );
        assert!(lines[2].contains(",20.0,"));
    }
}
