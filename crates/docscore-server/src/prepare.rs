//! Training pool preparation
//!
//! Splits a one-document-per-line corpus into equally sized positive and
//! negative pool directories, one document per file.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for [`prepare`]
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub limit: usize,
    pub min_words: usize,
    pub seed: Option<u64>,
}

/// Counts reported after a prepare run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareSummary {
    /// Lines read from the input
    pub scanned: usize,
    /// Documents that passed the word filter
    pub kept: usize,
    pub positive: usize,
    pub negative: usize,
}

/// Read, filter, shuffle, and split the corpus into `output/positive` and `output/negative`
pub fn prepare(opts: &PrepareOptions) -> Result<PrepareSummary> {
    let file = File::open(&opts.input)
        .with_context(|| format!("Failed to open corpus {}", opts.input.display()))?;

    let mut scanned = 0;
    let mut docs = Vec::new();
    for line in BufReader::new(file).lines() {
        if docs.len() >= opts.limit {
            break;
        }
        let line = line.with_context(|| format!("Failed to read {}", opts.input.display()))?;
        scanned += 1;

        let text = line.trim();
        if text.split_whitespace().count() > opts.min_words {
            docs.push(text.to_string());
        }
    }

    info!(scanned, kept = docs.len(), "Filtered corpus");
    if docs.len() < opts.limit {
        warn!(kept = docs.len(), limit = opts.limit, "Corpus yielded fewer documents than the limit");
    }

    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    docs.shuffle(&mut rng);

    let half = docs.len() / 2;
    let positive_dir = opts.output.join("positive");
    let negative_dir = opts.output.join("negative");
    write_pool(&positive_dir, &docs[..half])?;
    write_pool(&negative_dir, &docs[half..2 * half])?;

    info!(
        positive = half,
        negative = half,
        positive_dir = %positive_dir.display(),
        negative_dir = %negative_dir.display(),
        "Wrote training pools"
    );

    Ok(PrepareSummary {
        scanned,
        kept: docs.len(),
        positive: half,
        negative: half,
    })
}

fn write_pool(dir: &Path, docs: &[String]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    for (i, doc) in docs.iter().enumerate() {
        let path = dir.join(format!("doc_{}.txt", i));
        fs::write(&path, doc).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    debug!(dir = %dir.display(), count = docs.len(), "Wrote pool");
    Ok(())
}
