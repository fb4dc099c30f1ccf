//! Mock engines and fixtures for service tests
//!
//! `MockBackend` fits instantly and produces a `MockEngine` whose answers
//! depend only on keywords, so tests can assert exact probabilities.

#![allow(dead_code)]

use docscore_core::{Error, Label, Result, TrainParams};
use docscore_engine::{ClassifierEngine, EngineBackend, FitOutcome, Prediction};
use docscore_service::{DocScoreService, ServiceConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Keyword-driven engine: "POSITIVE" -> positive 0.9, "NEGATIVE" -> negative 0.8,
/// anything else -> the default prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockEngine {
    pub default_label: Label,
    pub default_confidence: f32,
    pub trained_on: usize,
}

impl MockEngine {
    pub fn new(default_label: Label, default_confidence: f32) -> Self {
        Self {
            default_label,
            default_confidence,
            trained_on: 0,
        }
    }
}

impl ClassifierEngine for MockEngine {
    fn predict(&self, text: &str) -> Result<Prediction> {
        if text.contains('\n') {
            return Err(Error::engine("predict processes one line at a time"));
        }
        Ok(if text.contains("POSITIVE") {
            Prediction::new(Label::Positive, 0.9)
        } else if text.contains("NEGATIVE") {
            Prediction::new(Label::Negative, 0.8)
        } else {
            Prediction::new(self.default_label, self.default_confidence)
        })
    }

    fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// An engine that cannot be serialized, for storage failure paths
pub struct UnwritableEngine;

impl ClassifierEngine for UnwritableEngine {
    fn predict(&self, _text: &str) -> Result<Prediction> {
        Ok(Prediction::new(Label::Positive, 0.5))
    }

    fn write_to(&self, _writer: &mut dyn Write) -> Result<()> {
        Err(Error::storage("disk full"))
    }

    fn name(&self) -> &str {
        "unwritable"
    }
}

/// An engine that persists fine but fails every prediction
pub struct BrokenEngine;

impl ClassifierEngine for BrokenEngine {
    fn predict(&self, _text: &str) -> Result<Prediction> {
        Err(Error::engine("predict boom"))
    }

    fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_all(b"{}")?;
        Ok(())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Backend producing [`MockEngine`]s, with call counters and a record of
/// every staged corpus it was handed
#[derive(Default)]
pub struct MockBackend {
    fit_calls: AtomicUsize,
    load_calls: AtomicUsize,
    fail_fit: bool,
    broken_engine: bool,
    corpora: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every fit fails
    pub fn failing() -> Self {
        Self {
            fail_fit: true,
            ..Self::default()
        }
    }

    /// A backend whose fits succeed with a [`BrokenEngine`]
    pub fn with_broken_engine() -> Self {
        Self {
            broken_engine: true,
            ..Self::default()
        }
    }

    pub fn fit_calls(&self) -> usize {
        self.fit_calls.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Staged corpus paths and their lines, in fit order
    pub fn corpora(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.corpora.lock().clone()
    }
}

impl EngineBackend for MockBackend {
    fn fit(&self, corpus: &Path, _params: &TrainParams) -> Result<FitOutcome> {
        self.fit_calls.fetch_add(1, Ordering::SeqCst);

        let reader = BufReader::new(std::fs::File::open(corpus)?);
        let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
        self.corpora
            .lock()
            .push((corpus.to_path_buf(), lines.clone()));

        if self.fail_fit {
            return Err(Error::engine("mock fit failure"));
        }
        if self.broken_engine {
            return Ok(FitOutcome {
                engine: Box::new(BrokenEngine),
                loss_trace: vec![0.7],
                examples: lines.len(),
            });
        }

        let mut engine = MockEngine::new(Label::Negative, 0.6);
        engine.trained_on = lines.len();
        Ok(FitOutcome {
            engine: Box::new(engine),
            loss_trace: vec![0.7, 0.5, 0.3],
            examples: lines.len(),
        })
    }

    fn load(&self, reader: &mut dyn Read) -> Result<Box<dyn ClassifierEngine>> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let engine: MockEngine = serde_json::from_reader(reader)
            .map_err(|e| Error::engine(format!("corrupt mock artifact: {}", e)))?;
        Ok(Box::new(engine))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Temporary workspace with pools, models, logs, and scratch directories
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Write `docs` as one file per document under `name`
    pub fn write_pool(&self, name: &str, docs: &[String]) -> PathBuf {
        let dir = self.path(name);
        std::fs::create_dir_all(&dir).unwrap();
        for (i, doc) in docs.iter().enumerate() {
            std::fs::write(dir.join(format!("doc_{:05}.txt", i)), doc).unwrap();
        }
        dir
    }

    /// Config pointing every path into this workspace
    pub fn config(&self) -> ServiceConfig {
        ServiceConfig {
            models_dir: self.path("trained_models"),
            logs_dir: self.path("logs"),
            positive_pool: self.path("positive"),
            negative_pool: self.path("negative"),
            scratch_dir: Some(self.path("scratch")),
            seed: Some(7),
            ..ServiceConfig::default()
        }
    }

    /// Files currently left in the scratch directory
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.path("scratch"))
            .map(|rd| rd.count())
            .unwrap_or(0)
    }
}

pub fn positive_docs(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("POSITIVE sample document {} about compilers", i))
        .collect()
}

pub fn negative_docs(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("NEGATIVE sample document {} about gardening", i))
        .collect()
}

/// Service over a mock backend with `pos` positive and `neg` negative pool docs
pub fn mock_service(pos: usize, neg: usize) -> (Workspace, Arc<MockBackend>, DocScoreService) {
    let ws = Workspace::new();
    ws.write_pool("positive", &positive_docs(pos));
    ws.write_pool("negative", &negative_docs(neg));
    let backend = Arc::new(MockBackend::new());
    let service = DocScoreService::with_backend(ws.config(), backend.clone()).unwrap();
    (ws, backend, service)
}
