use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::services::freeze::ScrollReport;

#[derive(Debug, Serialize)]
pub struct ScrollRecord<'a> {
    pub recorded_at: DateTime<Utc>,
    pub sequence: u64,
    #[serde(flatten)]
    pub report: &'a ScrollReport,
}

/// Appends one NDJSON record per scroll.
pub struct ScrollLog<W: Write> {
    writer: W,
    sequence: u64,
}

impl ScrollLog<BufWriter<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open scroll log {}", path.display()))?;
        info!("Writing scroll log to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ScrollLog<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            sequence: 0,
        }
    }

    pub fn append(&mut self, report: &ScrollReport) -> Result<()> {
        self.sequence += 1;
        let record = ScrollRecord {
            recorded_at: Utc::now(),
            sequence: self.sequence,
            report,
        };
        serde_json::to_writer(&mut self.writer, &record).context("Failed to encode scroll record")?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
