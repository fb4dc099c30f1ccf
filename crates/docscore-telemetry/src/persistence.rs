//! Metrics artifact persistence
//!
//! Two files live under the logs directory:
//! - `metrics.json`, the most recent run, overwritten atomically
//! - `runs.jsonl`, one line per run, append-only

use crate::record::TrainingMetrics;
use docscore_core::{Error, ModelId, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the latest-run artifact
pub const LATEST_FILE: &str = "metrics.json";

/// File name of the run history
pub const HISTORY_FILE: &str = "runs.jsonl";

/// Configuration for metrics persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding the metrics files
    pub logs_dir: PathBuf,

    /// Also append each run to the history file
    #[serde(default = "default_keep_history")]
    pub keep_history: bool,
}

impl PersistenceConfig {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            keep_history: default_keep_history(),
        }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.logs_dir.join(LATEST_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.logs_dir.join(HISTORY_FILE)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self::new("logs")
    }
}

fn default_keep_history() -> bool {
    true
}

/// Write `path` so readers observe either the old contents or the new
/// contents, never a partial file.
///
/// The payload goes to a temporary file in the same directory, is synced,
/// then renamed over `path`. The directory is synced after the rename so the
/// new entry survives a crash once this returns.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        write(&mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| Error::storage(format!("failed to persist {}: {}", path.display(), e)))?;
    sync_dir(dir)
}

/// Flush directory entries (renames, creations) in `dir` to disk
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| Error::storage(format!("failed to sync directory {}: {}", dir.display(), e)))
}

/// Directory handles cannot be synced here; renames are durable on return.
#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Writes metrics artifacts for completed runs
pub struct MetricsWriter {
    config: PersistenceConfig,
    lock: Mutex<()>,
}

impl MetricsWriter {
    /// Create a new writer, creating the logs directory if needed
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.logs_dir)?;
        info!(logs_dir = %config.logs_dir.display(), "Metrics writer initialized");
        Ok(Self {
            config,
            lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Persist one run: replace the latest artifact and append to history
    pub fn write(&self, metrics: &TrainingMetrics) -> Result<()> {
        // Concurrent runs must not interleave history lines or race the rename.
        let _guard = self.lock.lock();

        let latest = self.config.latest_path();
        write_atomic(&latest, |out| {
            serde_json::to_writer_pretty(&mut *out, metrics)?;
            out.write_all(b"\n")?;
            Ok(())
        })?;

        if self.config.keep_history {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.config.history_path())?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer(&mut out, metrics)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }

        debug!(
            model_id = %metrics.model_id,
            path = %latest.display(),
            "Metrics artifact written"
        );
        Ok(())
    }
}

/// Reads persisted metrics artifacts
pub struct MetricsReader {
    config: PersistenceConfig,
}

impl MetricsReader {
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config }
    }

    /// Most recent run, if any run has completed
    pub fn latest(&self) -> Result<Option<TrainingMetrics>> {
        let path = self.config.latest_path();
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let metrics = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(metrics))
    }

    /// All recorded runs, oldest first
    ///
    /// Lines that fail to parse are skipped.
    pub fn history(&self) -> Result<Vec<TrainingMetrics>> {
        let path = self.config.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut runs = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TrainingMetrics>(&line) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(line = i + 1, error = %e, "Skipping unreadable run record"),
            }
        }
        Ok(runs)
    }

    /// Most recent run that produced `model_id`
    pub fn find(&self, model_id: &ModelId) -> Result<Option<TrainingMetrics>> {
        Ok(self
            .history()?
            .into_iter()
            .rev()
            .find(|run| &run.model_id == model_id))
    }
}
