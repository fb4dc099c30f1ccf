//! `docscore report`: text summaries of recorded training runs

use anyhow::{anyhow, Result};
use docscore_core::ModelId;
use docscore_telemetry::{render_history, render_summary, MetricsReader, PersistenceConfig};
use std::path::Path;
use std::str::FromStr;

/// Render the latest run, the run for `model`, or the whole history
pub fn build_report(logs_dir: &Path, model: Option<&str>, history: bool) -> Result<String> {
    let reader = MetricsReader::new(PersistenceConfig::new(logs_dir));

    if history {
        let runs = reader.history()?;
        if runs.is_empty() {
            return Err(anyhow!("No training runs recorded in {}", logs_dir.display()));
        }
        return Ok(render_history(&runs));
    }

    let metrics = match model {
        Some(raw) => {
            let id = ModelId::from_str(raw)?;
            reader
                .find(&id)?
                .ok_or_else(|| anyhow!("No recorded run for model {}", id))?
        }
        None => reader
            .latest()?
            .ok_or_else(|| anyhow!("No metrics found in {}", logs_dir.display()))?,
    };

    Ok(render_summary(&metrics))
}
