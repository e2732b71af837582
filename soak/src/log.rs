//! Append-only CSV log of batch aggregates.
use crate::error::SoakError;
use soak_core::BatchResult;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const LOG_HEADER: [&str; 10] = [
    "timestamp",
    "concurrency",
    "tier",
    "successful",
    "failed",
    "avg_server_latency",
    "avg_client_latency",
    "avg_input_tokens",
    "avg_output_tokens",
    "batch_time",
];

/// Durable per-run batch log.
///
/// The file is reopened in append mode for every row and each row goes out in a single write, so
/// a crash can at worst truncate the row being written.
#[derive(Debug, Clone)]
pub struct BatchLog {
    path: PathBuf,
}

impl BatchLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, timestamp: OffsetDateTime, res: &BatchResult) -> Result<(), SoakError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(SoakError::io(parent))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(SoakError::io(&self.path))?;
        let is_new = file.metadata().map_err(SoakError::io(&self.path))?.len() == 0;

        let mut out = String::new();
        if is_new {
            out.push_str(&LOG_HEADER.join(","));
            out.push('\n');
        }
        out.push_str(&format_row(timestamp, res));
        out.push('\n');

        file.write_all(out.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(SoakError::io(&self.path))
    }
}

fn format_row(timestamp: OffsetDateTime, res: &BatchResult) -> String {
    let timestamp = timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.unix_timestamp().to_string());

    [
        csv_escape(&timestamp),
        res.concurrency.to_string(),
        csv_escape(res.tier.as_str()),
        res.successful.to_string(),
        res.failed.to_string(),
        format!("{:.2}", res.avg_server_latency),
        format!("{:.2}", res.avg_client_latency),
        format!("{:.2}", res.avg_input_tokens),
        format!("{:.2}", res.avg_output_tokens),
        format!("{:.3}", res.batch_time.as_secs_f64()),
    ]
    .join(",")
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
