//! Dataset assembly
//!
//! Loads positive and negative example pools, balances the classes by
//! sampling negatives without replacement, and produces a shuffled labeled
//! corpus ready to be staged for the engine.

use docscore_core::{normalize_document, Error, Label, LabeledExample, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// A local collection of example documents.
///
/// A directory holds one document per file, read in file-name order. A plain
/// file holds one document per line.
#[derive(Debug, Clone)]
pub struct DocumentPool {
    path: PathBuf,
}

impl DocumentPool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every document, normalized, dropping ones that normalize to empty
    pub fn load(&self) -> Result<Vec<String>> {
        let meta = std::fs::metadata(&self.path).map_err(|e| {
            Error::storage(format!(
                "document pool {} is unreadable: {}",
                self.path.display(),
                e
            ))
        })?;

        let docs = if meta.is_dir() {
            self.load_directory()?
        } else {
            self.load_lines()?
        };

        debug!(pool = %self.path.display(), documents = docs.len(), "Loaded document pool");
        Ok(docs)
    }

    fn load_directory(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut docs = Vec::with_capacity(files.len());
        for file in files {
            let raw = std::fs::read_to_string(&file)?;
            if let Some(doc) = normalize_document(&raw) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    fn load_lines(&self) -> Result<Vec<String>> {
        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        let mut docs = Vec::new();
        for line in reader.lines() {
            if let Some(doc) = normalize_document(&line?) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

/// Where the positive class comes from
#[derive(Debug, Clone)]
pub enum PositiveSource {
    /// Caller-supplied raw documents; must be non-empty after normalization
    Documents(Vec<String>),
    /// The configured local positive pool
    LocalPool,
}

/// Balanced, shuffled labeled examples
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    examples: Vec<LabeledExample>,
}

impl TrainingCorpus {
    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn count(&self, label: Label) -> usize {
        self.examples.iter().filter(|e| e.label == label).count()
    }

    /// Write the corpus to a temporary file, one labeled example per line.
    ///
    /// The file is removed when the returned handle is dropped.
    pub fn stage(&self, scratch_dir: Option<&Path>) -> Result<NamedTempFile> {
        let file = match scratch_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                tempfile::Builder::new()
                    .prefix("corpus-")
                    .suffix(".txt")
                    .tempfile_in(dir)?
            }
            None => tempfile::Builder::new()
                .prefix("corpus-")
                .suffix(".txt")
                .tempfile()?,
        };

        {
            let mut out = BufWriter::new(file.as_file());
            for example in &self.examples {
                writeln!(out, "{}", example)?;
            }
            out.flush()?;
        }

        debug!(path = %file.path().display(), examples = self.len(), "Staged training corpus");
        Ok(file)
    }
}

/// Builds balanced training corpora from a positive source and the
/// negative pool
pub struct DatasetAssembler {
    positive_pool: DocumentPool,
    negative_pool: DocumentPool,
    rng: Mutex<StdRng>,
}

impl DatasetAssembler {
    pub fn new(positive_pool: DocumentPool, negative_pool: DocumentPool) -> Self {
        Self {
            positive_pool,
            negative_pool,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Make sampling and shuffling reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn positive_pool(&self) -> &DocumentPool {
        &self.positive_pool
    }

    pub fn negative_pool(&self) -> &DocumentPool {
        &self.negative_pool
    }

    /// Assemble a corpus from `source` and the negative pool
    pub fn assemble(&self, source: PositiveSource) -> Result<TrainingCorpus> {
        let positives = self.resolve_positives(source)?;
        let negatives = self.load_negatives()?;
        self.assemble_documents(positives, negatives)
    }

    /// Normalized positive documents for `source`
    pub fn resolve_positives(&self, source: PositiveSource) -> Result<Vec<String>> {
        match source {
            PositiveSource::Documents(raw) => {
                let provided = raw.len();
                let docs: Vec<String> = raw.iter().filter_map(|d| normalize_document(d)).collect();
                if docs.is_empty() {
                    return Err(Error::empty_input(format!(
                        "none of the {} provided positive documents contain text",
                        provided
                    )));
                }
                info!(provided, usable = docs.len(), "Using provided positive examples");
                Ok(docs)
            }
            PositiveSource::LocalPool => {
                let docs = self.positive_pool.load()?;
                if docs.is_empty() {
                    return Err(Error::empty_input(format!(
                        "positive pool {} has no documents",
                        self.positive_pool.path().display()
                    )));
                }
                info!(
                    pool = %self.positive_pool.path().display(),
                    documents = docs.len(),
                    "Using local positive pool"
                );
                Ok(docs)
            }
        }
    }

    /// Normalized negative pool documents
    pub fn load_negatives(&self) -> Result<Vec<String>> {
        self.negative_pool.load()
    }

    /// Balance `positives` against `negatives` and shuffle.
    ///
    /// Exactly `positives.len()` negatives are sampled without replacement;
    /// a smaller negative set fails with the shortfall.
    pub fn assemble_documents(
        &self,
        positives: Vec<String>,
        negatives: Vec<String>,
    ) -> Result<TrainingCorpus> {
        let positives: Vec<LabeledExample> = positives
            .iter()
            .filter_map(|d| LabeledExample::new(Label::Positive, d))
            .collect();
        if positives.is_empty() {
            return Err(Error::empty_input("no positive documents to train on"));
        }

        let needed = positives.len();
        if negatives.len() < needed {
            return Err(Error::insufficient(
                Label::Negative.name(),
                needed,
                negatives.len(),
            ));
        }

        let mut rng = self.rng.lock();
        let sampled: Vec<LabeledExample> = negatives
            .choose_multiple(&mut *rng, needed)
            .filter_map(|d| LabeledExample::new(Label::Negative, d))
            .collect();

        // Pool documents are normalized on load, so sampling cannot lose any.
        if sampled.len() != needed {
            return Err(Error::insufficient(
                Label::Negative.name(),
                needed,
                sampled.len(),
            ));
        }

        let mut examples = positives;
        examples.extend(sampled);
        examples.shuffle(&mut *rng);

        info!(
            positive = needed,
            negative = needed,
            total = examples.len(),
            "Assembled training corpus"
        );
        Ok(TrainingCorpus { examples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn docs(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{} document number {}", prefix, i)).collect()
    }

    fn assembler() -> DatasetAssembler {
        DatasetAssembler::new(DocumentPool::new("unused"), DocumentPool::new("unused"))
            .with_seed(42)
    }

    #[test]
    fn test_directory_pool_reads_in_name_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second\n\tdoc").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first doc").unwrap();
        std::fs::write(dir.path().join("c.txt"), "   \n").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let loaded = DocumentPool::new(dir.path()).load().unwrap();
        assert_eq!(loaded, vec!["first doc", "second doc"]);
    }

    #[test]
    fn test_line_pool_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pool.txt");
        std::fs::write(&path, "one  doc\n\n  two doc \n").unwrap();

        let loaded = DocumentPool::new(&path).load().unwrap();
        assert_eq!(loaded, vec!["one doc", "two doc"]);
    }

    #[test]
    fn test_missing_pool_is_storage_error() {
        let err = DocumentPool::new("/nonexistent/pool").load().unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_corpus_is_balanced() {
        let corpus = assembler()
            .assemble_documents(docs("pos", 5), docs("neg", 12))
            .unwrap();
        assert_eq!(corpus.len(), 10);
        assert_eq!(corpus.count(Label::Positive), 5);
        assert_eq!(corpus.count(Label::Negative), 5);
    }

    #[test]
    fn test_negatives_sampled_without_replacement() {
        let corpus = assembler()
            .assemble_documents(docs("pos", 8), docs("neg", 8))
            .unwrap();
        let mut negatives: Vec<_> = corpus
            .examples()
            .iter()
            .filter(|e| e.label == Label::Negative)
            .map(|e| e.text.clone())
            .collect();
        negatives.sort();
        negatives.dedup();
        assert_eq!(negatives.len(), 8);
    }

    #[test]
    fn test_shortfall_is_reported() {
        let err = assembler()
            .assemble_documents(docs("pos", 100), docs("neg", 50))
            .unwrap_err();
        match err {
            Error::InsufficientData {
                needed,
                available,
                shortfall,
                ..
            } => {
                assert_eq!(needed, 100);
                assert_eq!(available, 50);
                assert_eq!(shortfall, 50);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_explicit_documents_fail() {
        let source = PositiveSource::Documents(vec!["  ".into(), "\n\t".into()]);
        let err = assembler().resolve_positives(source).unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_shuffle_mixes_classes() {
        let corpus = assembler()
            .assemble_documents(docs("pos", 50), docs("neg", 50))
            .unwrap();
        let first_half_positive = corpus.examples()[..50]
            .iter()
            .filter(|e| e.label == Label::Positive)
            .count();
        assert!(first_half_positive > 0 && first_half_positive < 50);
    }

    #[test]
    fn test_same_seed_same_corpus() {
        let a = assembler()
            .assemble_documents(docs("pos", 10), docs("neg", 30))
            .unwrap();
        let b = assembler()
            .assemble_documents(docs("pos", 10), docs("neg", 30))
            .unwrap();
        assert_eq!(a.examples(), b.examples());
    }

    #[test]
    fn test_stage_writes_labeled_lines_and_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let corpus = assembler()
            .assemble_documents(docs("pos", 3), docs("neg", 3))
            .unwrap();

        let staged = corpus.stage(Some(scratch.path())).unwrap();
        let path = staged.path().to_path_buf();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 6);
        assert!(content.lines().all(|l| l.starts_with("__label__")));

        drop(staged);
        assert!(!path.exists());
    }
}
