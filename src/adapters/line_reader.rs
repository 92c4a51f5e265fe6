//! Replays board events recorded as text, one event per line.
//!
//! ```text
//! # channel order: tr bl tl br (raw device units)
//! 1520, 1490, 1610, 1575
//! key
//! 1522 1488 1611 1574
//! gone
//! ```

use crate::core::{DeviceEvent, RawSample, SampleReader};
use crate::utils::error::{Result, WiightError};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// Event names forwarded as [`DeviceEvent::Other`].
pub const OTHER_EVENT_KINDS: [&str; 10] = [
    "key",
    "accel",
    "ir",
    "motion_plus",
    "nunchuk",
    "classic",
    "pro",
    "guitar",
    "drums",
    "watch",
];

pub type BoxedLineReader = LineSampleReader<Box<dyn AsyncBufRead + Unpin + Send>>;

pub struct LineSampleReader<R> {
    lines: Lines<R>,
    line_no: usize,
    interval: Option<Duration>,
}

impl<R: AsyncBufRead + Unpin + Send> LineSampleReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            interval: None,
        }
    }

    /// Waits `interval` before handing out each sample.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = (!interval.is_zero()).then_some(interval);
        self
    }
}

impl BoxedLineReader {
    /// Opens `source`, where `-` means stdin.
    pub async fn open(source: &str) -> Result<Self> {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = if source == "-" {
            tracing::info!("Reading board events from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        } else {
            tracing::info!("Reading board events from {}", source);
            let file = tokio::fs::File::open(Path::new(source)).await?;
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

/// Parses one line; `None` for blank lines and comments.
pub fn parse_event(line: &str, line_no: usize) -> Result<Option<DeviceEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let keyword = trimmed.to_lowercase();
    if keyword == "gone" {
        return Ok(Some(DeviceEvent::Hangup));
    }
    if let Some(kind) = OTHER_EVENT_KINDS.iter().find(|k| **k == keyword) {
        return Ok(Some(DeviceEvent::Other(kind.to_string())));
    }

    let values = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .map(|field| {
            field.parse::<f64>().map_err(|_| WiightError::SampleParse {
                line: line_no,
                message: format!("'{}' is not a number", field),
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let channels: [f64; 4] = values.as_slice().try_into().map_err(|_| WiightError::SampleParse {
        line: line_no,
        message: format!("expected 4 sensor values, got {}", values.len()),
    })?;

    let sample = RawSample::from_channels(channels).map_err(|e| WiightError::SampleParse {
        line: line_no,
        message: e.to_string(),
    })?;
    Ok(Some(DeviceEvent::Sample(sample)))
}

impl<R: AsyncBufRead + Unpin + Send> SampleReader for LineSampleReader<R> {
    async fn next_event(&mut self) -> Result<DeviceEvent> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                // 輸入結束視同裝置離線
                return Ok(DeviceEvent::Hangup);
            };
            self.line_no += 1;

            let Some(event) = parse_event(&line, self.line_no)? else {
                continue;
            };
            if let (DeviceEvent::Sample(_), Some(interval)) = (&event, self.interval) {
                tokio::time::sleep(interval).await;
            }
            return Ok(event);
        }
    }
}
