//! Error types for docscore

/// Result type alias using docscore's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docscore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable documents were supplied
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A document normalized to nothing
    #[error("invalid document at index {index}: {reason}")]
    InvalidDocument { index: usize, reason: String },

    /// A pool cannot supply enough examples to balance the corpus
    #[error(
        "insufficient {class} examples: need {needed}, found {available} (shortfall of {shortfall})"
    )]
    InsufficientData {
        class: String,
        needed: usize,
        available: usize,
        shortfall: usize,
    },

    /// No cached handle and no durable artifact for this identity
    #[error("model {0} not found")]
    ModelNotFound(String),

    /// Classifier engine failures (fit, predict, artifact decoding)
    #[error("engine error: {0}")]
    Engine(String),

    /// Durable storage failures (artifacts, pools, metrics)
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used at the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client supplied something unusable
    Input,
    /// Not enough data to run the requested training
    DataSufficiency,
    /// Unknown model identity
    Lookup,
    /// Engine, storage, or internal fault
    Fault,
}

impl ErrorKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::DataSufficiency => "data_sufficiency",
            Self::Lookup => "lookup",
            Self::Fault => "fault",
        }
    }
}

impl Error {
    /// Create a new empty input error
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create a new invalid document error
    pub fn invalid_document(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            index,
            reason: reason.into(),
        }
    }

    /// Create a new insufficient data error, computing the shortfall
    pub fn insufficient(class: impl Into<String>, needed: usize, available: usize) -> Self {
        Self::InsufficientData {
            class: class.into(),
            needed,
            available,
            shortfall: needed.saturating_sub(available),
        }
    }

    /// Create a new model-not-found error
    pub fn model_not_found(id: impl Into<String>) -> Self {
        Self::ModelNotFound(id.into())
    }

    /// Create a new engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Which part of the error taxonomy this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput(_) | Self::InvalidDocument { .. } => ErrorKind::Input,
            Self::InsufficientData { .. } => ErrorKind::DataSufficiency,
            Self::ModelNotFound(_) => ErrorKind::Lookup,
            Self::Engine(_)
            | Self::Storage(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::Fault,
        }
    }
}
