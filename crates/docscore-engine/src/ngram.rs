//! Hashed n-gram linear text classifier
//!
//! A document is represented by its in-vocabulary words plus every word
//! n-gram (2..=`wordNgrams`) hashed into `bucket` slots. Class scores are the
//! average of the feature rows; training is plain SGD with a linearly
//! decaying learning rate, using either a softmax or one-vs-all loss.
//!
//! Training is deterministic for a given corpus order, and the serialized
//! form round-trips exactly.

use crate::engine::{ClassifierEngine, EngineBackend, FitOutcome, Prediction};
use docscore_core::{Error, Label, LossKind, Result, TrainParams, LABEL_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

const ENGINE_NAME: &str = "ngram";
const FORMAT_VERSION: u32 = 1;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Backend that fits and loads [`NgramModel`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct NgramBackend;

impl NgramBackend {
    pub fn new() -> Self {
        Self
    }
}

impl EngineBackend for NgramBackend {
    fn fit(&self, corpus: &Path, params: &TrainParams) -> Result<FitOutcome> {
        let examples = read_corpus(corpus)?;
        let (model, loss_trace) = NgramModel::train(&examples, params)?;
        Ok(FitOutcome {
            engine: Box::new(model),
            loss_trace,
            examples: examples.len(),
        })
    }

    fn load(&self, reader: &mut dyn Read) -> Result<Box<dyn ClassifierEngine>> {
        Ok(Box::new(NgramModel::read_from(reader)?))
    }

    fn name(&self) -> &str {
        ENGINE_NAME
    }
}

/// One parsed corpus line: engine-native label string plus tokens
#[derive(Debug, Clone)]
pub struct CorpusExample {
    pub label: String,
    pub tokens: Vec<String>,
}

/// Read a staged corpus file. Blank lines are ignored; a line without a
/// leading class tag is an error.
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusExample>> {
    let file = File::open(path)
        .map_err(|e| Error::engine(format!("failed to open corpus {}: {e}", path.display())))?;
    let mut examples = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        let Some(label) = tokens.next() else {
            continue;
        };
        if !label.starts_with(LABEL_PREFIX) || label.len() == LABEL_PREFIX.len() {
            return Err(Error::engine(format!(
                "corpus line {} has no class tag",
                line_no + 1
            )));
        }
        examples.push(CorpusExample {
            label: label.to_string(),
            tokens: tokens.map(str::to_string).collect(),
        });
    }

    Ok(examples)
}

/// Trained hashed n-gram model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NgramModel {
    format_version: u32,

    /// Hyperparameters the model was trained with
    params: TrainParams,

    /// Engine-native labels, sorted
    labels: Vec<String>,

    /// Word id -> word
    vocab: Vec<String>,

    /// Feature ids that received updates, sorted
    feature_ids: Vec<u64>,

    /// Row-major weights, one row of `labels.len()` per feature id
    weights: Vec<f32>,

    #[serde(skip)]
    word_index: HashMap<String, u64>,

    #[serde(skip)]
    row_index: HashMap<u64, usize>,
}

impl NgramModel {
    /// Fit a model on parsed examples, returning it with the per-epoch loss
    pub fn train(examples: &[CorpusExample], params: &TrainParams) -> Result<(Self, Vec<f32>)> {
        params.validate()?;
        if examples.is_empty() {
            return Err(Error::engine("cannot train on an empty corpus"));
        }

        let start = Instant::now();
        let labels: Vec<String> = examples
            .iter()
            .map(|e| e.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let label_of: HashMap<String, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();

        let vocab = build_vocab(examples, params.min_count);
        let mut model = Self {
            format_version: FORMAT_VERSION,
            params: params.clone(),
            labels,
            vocab,
            feature_ids: Vec::new(),
            weights: Vec::new(),
            word_index: HashMap::new(),
            row_index: HashMap::new(),
        };
        model.rebuild_word_index();

        // Compact every observed feature into a dense row.
        let mut row_of: HashMap<u64, usize> = HashMap::new();
        let mut row_features: Vec<u64> = Vec::new();
        let mut rows: Vec<(Vec<usize>, usize)> = Vec::with_capacity(examples.len());
        for example in examples {
            let feature_rows = model
                .features(&example.tokens)
                .into_iter()
                .map(|f| {
                    *row_of.entry(f).or_insert_with(|| {
                        row_features.push(f);
                        row_features.len() - 1
                    })
                })
                .collect();
            rows.push((feature_rows, label_of[example.label.as_str()]));
        }

        let nlabels = model.labels.len();
        let mut weights = vec![0.0f32; row_features.len() * nlabels];
        let mut loss_trace = Vec::with_capacity(params.epoch);
        let total_steps = (params.epoch * rows.len()) as f32;
        let mut scores = vec![0.0f32; nlabels];
        let mut grad = vec![0.0f32; nlabels];

        for epoch in 0..params.epoch {
            let mut epoch_loss = 0.0f64;
            for (i, (features, target)) in rows.iter().enumerate() {
                let progress = (epoch * rows.len() + i) as f32 / total_steps;
                let lr = params.lr * (1.0 - progress);

                average_rows(&weights, features, nlabels, &mut scores);
                let loss = match params.loss {
                    LossKind::Softmax => softmax_step(&mut scores, *target, &mut grad),
                    LossKind::Ova => ova_step(&mut scores, *target, &mut grad),
                };
                epoch_loss += loss as f64;

                if features.is_empty() {
                    continue;
                }
                let scale = lr / features.len() as f32;
                for &row in features {
                    let offset = row * nlabels;
                    for (w, g) in weights[offset..offset + nlabels].iter_mut().zip(&grad) {
                        *w += scale * g;
                    }
                }
            }
            let mean = (epoch_loss / rows.len() as f64) as f32;
            debug!(epoch = epoch + 1, loss = mean, "epoch complete");
            loss_trace.push(mean);
        }

        // Store rows sorted by feature id so the artifact is deterministic.
        let mut order: Vec<usize> = (0..row_features.len()).collect();
        order.sort_by_key(|&r| row_features[r]);
        model.feature_ids = order.iter().map(|&r| row_features[r]).collect();
        model.weights = order
            .iter()
            .flat_map(|&r| weights[r * nlabels..(r + 1) * nlabels].iter().copied())
            .collect();
        model.rebuild_row_index();

        info!(
            examples = examples.len(),
            words = model.vocab.len(),
            features = model.feature_ids.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ngram model trained"
        );

        Ok((model, loss_trace))
    }

    /// Read a model previously written with [`ClassifierEngine::write_to`]
    pub fn read_from(reader: &mut dyn Read) -> Result<Self> {
        let mut model: Self = serde_json::from_reader(reader)
            .map_err(|e| Error::engine(format!("failed to decode ngram model: {e}")))?;

        if model.format_version != FORMAT_VERSION {
            return Err(Error::engine(format!(
                "unsupported ngram model format {}",
                model.format_version
            )));
        }
        if model.labels.is_empty()
            || model.weights.len() != model.feature_ids.len() * model.labels.len()
        {
            return Err(Error::engine("ngram model weights are inconsistent"));
        }

        model.rebuild_word_index();
        model.rebuild_row_index();
        Ok(model)
    }

    /// Engine-native top-k labels with their probabilities, best first.
    pub fn predict_top_k(&self, text: &str, k: usize) -> Result<Vec<(String, f32)>> {
        if text.contains(['\n', '\r']) {
            return Err(Error::engine(
                "predict processes one line at a time (remove line breaks)",
            ));
        }

        let tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let features = self.features(&tokens);
        let nlabels = self.labels.len();
        let mut scores = vec![0.0f32; nlabels];

        if !features.is_empty() {
            for feature in &features {
                if let Some(&row) = self.row_index.get(feature) {
                    let offset = row * nlabels;
                    for (s, w) in scores.iter_mut().zip(&self.weights[offset..offset + nlabels]) {
                        *s += w;
                    }
                }
            }
            let inv = 1.0 / features.len() as f32;
            scores.iter_mut().for_each(|s| *s *= inv);
        }

        match self.params.loss {
            LossKind::Softmax => softmax(&mut scores),
            LossKind::Ova => scores.iter_mut().for_each(|s| *s = sigmoid(*s)),
        }

        let mut ranked: Vec<(String, f32)> = self.labels.iter().cloned().zip(scores).collect();
        // Stable sort keeps label order on ties.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Hyperparameters used for training
    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    /// Engine-native labels
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Vocabulary size after `minCount` filtering
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Whether `word` survived `minCount` filtering
    pub fn in_vocab(&self, word: &str) -> bool {
        self.word_index.contains_key(word)
    }

    /// Feature ids for a tokenized document
    fn features(&self, tokens: &[String]) -> Vec<u64> {
        let nwords = self.vocab.len() as u64;
        let mut features: Vec<u64> = tokens
            .iter()
            .filter_map(|t| self.word_index.get(t).copied())
            .collect();

        if self.params.bucket > 0 {
            let bucket = self.params.bucket as u64;
            for n in 2..=self.params.word_ngrams {
                for window in tokens.windows(n) {
                    features.push(nwords + hash_ngram(window) % bucket);
                }
            }
        }

        features
    }

    fn rebuild_word_index(&mut self) {
        self.word_index = self
            .vocab
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i as u64))
            .collect();
    }

    fn rebuild_row_index(&mut self) {
        self.row_index = self
            .feature_ids
            .iter()
            .enumerate()
            .map(|(row, &f)| (f, row))
            .collect();
    }
}

impl ClassifierEngine for NgramModel {
    fn predict(&self, text: &str) -> Result<Prediction> {
        let (tag, confidence) = self
            .predict_top_k(text, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::engine("ngram model has no labels"))?;
        let label = Label::from_tag(&tag)
            .ok_or_else(|| Error::engine(format!("engine produced unknown label {tag}")))?;
        Ok(Prediction::new(label, confidence))
    }

    fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    fn name(&self) -> &str {
        ENGINE_NAME
    }
}

/// Words occurring at least `min_count` times, in first-seen order
fn build_vocab(examples: &[CorpusExample], min_count: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in examples.iter().flat_map(|e| &e.tokens) {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut seen = std::collections::HashSet::new();
    examples
        .iter()
        .flat_map(|e| &e.tokens)
        .filter(|t| counts[t.as_str()] >= min_count && seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// FNV-1a over the window's tokens, space separated
fn hash_ngram(window: &[String]) -> u64 {
    let mut hash = FNV_OFFSET;
    for (i, token) in window.iter().enumerate() {
        if i > 0 {
            hash ^= b' ' as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        for &byte in token.as_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

fn average_rows(weights: &[f32], rows: &[usize], nlabels: usize, out: &mut [f32]) {
    out.iter_mut().for_each(|s| *s = 0.0);
    if rows.is_empty() {
        return;
    }
    for &row in rows {
        let offset = row * nlabels;
        for (s, w) in out.iter_mut().zip(&weights[offset..offset + nlabels]) {
            *s += w;
        }
    }
    let inv = 1.0 / rows.len() as f32;
    out.iter_mut().for_each(|s| *s *= inv);
}

fn softmax(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    scores.iter_mut().for_each(|s| *s /= sum);
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turns `scores` into probabilities, fills `grad`, returns the loss
fn softmax_step(scores: &mut [f32], target: usize, grad: &mut [f32]) -> f32 {
    softmax(scores);
    for (j, (g, p)) in grad.iter_mut().zip(scores.iter()).enumerate() {
        let y = if j == target { 1.0 } else { 0.0 };
        *g = y - p;
    }
    -scores[target].max(1e-12).ln()
}

fn ova_step(scores: &mut [f32], target: usize, grad: &mut [f32]) -> f32 {
    let mut loss = 0.0;
    for (j, (g, s)) in grad.iter_mut().zip(scores.iter_mut()).enumerate() {
        *s = sigmoid(*s);
        let y = if j == target { 1.0 } else { 0.0 };
        *g = y - *s;
        loss -= if j == target {
            s.max(1e-12).ln()
        } else {
            (1.0 - *s).max(1e-12).ln()
        };
    }
    loss
}
