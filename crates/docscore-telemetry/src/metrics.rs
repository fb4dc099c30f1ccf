//! Prometheus metric names and descriptions
//!
//! Emission goes through the `metrics` facade; a recorder is installed by the
//! server binary. Without one every macro call is a no-op.

pub const TRAIN_RUNS_TOTAL: &str = "docscore_train_runs_total";
pub const TRAIN_DURATION_MS: &str = "docscore_train_duration_ms";
pub const SCORE_REQUESTS_TOTAL: &str = "docscore_score_requests_total";
pub const DOCUMENTS_SCORED_TOTAL: &str = "docscore_documents_scored_total";
pub const MODEL_CACHE_TOTAL: &str = "docscore_model_cache_total";
pub const ERRORS_TOTAL: &str = "docscore_errors_total";

/// Register descriptions for every docscore metric
pub fn describe_metrics() {
    ::metrics::describe_counter!(
        TRAIN_RUNS_TOTAL,
        "Total number of training runs by outcome"
    );
    ::metrics::describe_histogram!(
        TRAIN_DURATION_MS,
        ::metrics::Unit::Milliseconds,
        "Wall-clock duration of successful training runs"
    );
    ::metrics::describe_counter!(SCORE_REQUESTS_TOTAL, "Total number of scoring requests");
    ::metrics::describe_counter!(
        DOCUMENTS_SCORED_TOTAL,
        "Total number of documents scored"
    );
    ::metrics::describe_counter!(
        MODEL_CACHE_TOTAL,
        "Model registry cache lookups by result"
    );
    ::metrics::describe_counter!(ERRORS_TOTAL, "Total number of errors by kind");
}

/// Count one failed operation under its error kind
pub fn record_error(kind: &'static str) {
    ::metrics::counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}
