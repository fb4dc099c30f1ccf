//! Training orchestration tests against the mock engine

mod common;

use common::{mock_service, negative_docs, positive_docs, MockBackend, Workspace};
use docscore_core::{Error, ErrorKind, TrainParams};
use docscore_service::{DocScoreService, EvaluationStrategy, PositiveSource};
use std::collections::HashSet;
use std::sync::Arc;

fn count_tagged(lines: &[String], tag: &str) -> usize {
    lines.iter().filter(|l| l.starts_with(tag)).count()
}

#[tokio::test]
async fn test_pool_corpus_is_balanced() {
    let (_ws, backend, service) = mock_service(30, 80);

    let outcome = service.train(PositiveSource::LocalPool).await.unwrap();

    let corpora = backend.corpora();
    assert_eq!(corpora.len(), 1);
    let lines = &corpora[0].1;
    assert_eq!(lines.len(), 60);
    assert_eq!(count_tagged(lines, "__label__positive "), 30);
    assert_eq!(count_tagged(lines, "__label__negative "), 30);
    assert_eq!(outcome.metrics.corpus.positive, 30);
    assert_eq!(outcome.metrics.corpus.negative, 30);
}

#[tokio::test]
async fn test_explicit_documents_replace_local_positives() {
    let (_ws, backend, service) = mock_service(30, 80);
    let uploaded = vec![
        "POSITIVE uploaded one".to_string(),
        "POSITIVE\tuploaded\n two".to_string(),
        "   ".to_string(),
    ];

    service
        .train(PositiveSource::Documents(uploaded))
        .await
        .unwrap();

    let lines = &backend.corpora()[0].1;
    assert_eq!(lines.len(), 4);
    assert!(lines.contains(&"__label__positive POSITIVE uploaded two".to_string()));
    assert_eq!(count_tagged(lines, "__label__negative "), 2);
}

#[tokio::test]
async fn test_upload_with_no_valid_documents_is_input_error() {
    let (_ws, backend, service) = mock_service(30, 80);

    let err = service
        .train(PositiveSource::Documents(vec!["".into(), " \n ".into()]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EmptyInput(_)));
    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(backend.fit_calls(), 0);
    assert!(service.list_models().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_insufficient_negatives_names_shortfall() {
    let (_ws, backend, service) = mock_service(100, 50);

    let err = service.train(PositiveSource::LocalPool).await.unwrap_err();

    match &err {
        Error::InsufficientData { shortfall, .. } => assert_eq!(*shortfall, 50),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("shortfall of 50"));
    assert_eq!(err.kind(), ErrorKind::DataSufficiency);
    assert_eq!(backend.fit_calls(), 0);
    assert!(service.list_models().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_each_run_mints_a_new_identity() {
    let (_ws, _backend, service) = mock_service(10, 20);

    let mut ids = HashSet::new();
    for _ in 0..5 {
        let outcome = service.train(PositiveSource::LocalPool).await.unwrap();
        ids.insert(outcome.model_id);
    }

    assert_eq!(ids.len(), 5);
    assert_eq!(service.list_models().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let (_ws, backend, service) = mock_service(10, 20);

    let runs = (0..4).map(|_| service.train(PositiveSource::LocalPool));
    let outcomes = futures::future::join_all(runs).await;

    let ids: HashSet<_> = outcomes
        .into_iter()
        .map(|o| o.unwrap().model_id)
        .collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(backend.fit_calls(), 4);
    assert_eq!(service.registry().cached_count(), 4);
}

#[tokio::test]
async fn test_staged_corpus_is_removed_after_success() {
    let (ws, backend, service) = mock_service(10, 20);

    service.train(PositiveSource::LocalPool).await.unwrap();

    let (path, _) = &backend.corpora()[0];
    assert!(path.starts_with(ws.path("scratch")));
    assert!(!path.exists());
    assert_eq!(ws.scratch_entries(), 0);
}

#[tokio::test]
async fn test_failed_fit_leaves_no_model_and_no_corpus() {
    let ws = Workspace::new();
    ws.write_pool("positive", &positive_docs(10));
    ws.write_pool("negative", &negative_docs(20));
    let backend = Arc::new(MockBackend::failing());
    let service = DocScoreService::with_backend(ws.config(), backend.clone()).unwrap();

    let err = service.train(PositiveSource::LocalPool).await.unwrap_err();

    assert!(matches!(err, Error::Engine(_)));
    assert_eq!(err.kind(), ErrorKind::Fault);
    assert_eq!(backend.fit_calls(), 1);
    assert_eq!(ws.scratch_entries(), 0);
    assert!(service.list_models().await.unwrap().is_empty());
    assert!(service.latest_metrics().unwrap().is_none());
}

#[tokio::test]
async fn test_failed_evaluation_keeps_the_stored_model() {
    let ws = Workspace::new();
    ws.write_pool("positive", &positive_docs(10));
    ws.write_pool("negative", &negative_docs(20));
    let backend = Arc::new(MockBackend::with_broken_engine());
    let service = DocScoreService::with_backend(ws.config(), backend.clone()).unwrap();

    let err = service.train(PositiveSource::LocalPool).await.unwrap_err();
    assert!(matches!(err, Error::Engine(_)));
    assert_eq!(err.kind(), ErrorKind::Fault);

    // The artifact was durable before evaluation started; no metrics describe it.
    let stored = service.list_models().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(service.registry().is_cached(&stored[0]));
    assert!(service.latest_metrics().unwrap().is_none());
    assert_eq!(ws.scratch_entries(), 0);
}

#[tokio::test]
async fn test_metrics_artifact_describes_the_run() {
    let (ws, _backend, service) = mock_service(30, 150);

    let outcome = service.train(PositiveSource::LocalPool).await.unwrap();

    let latest = service.latest_metrics().unwrap().unwrap();
    assert_eq!(latest.model_id, outcome.model_id);
    assert_eq!(latest.train_loss, vec![0.7, 0.5, 0.3]);
    assert_eq!(latest.model_params, TrainParams::default());

    // Self-consistent evaluation: every positive, first 100 negatives.
    let eval = &latest.eval_metrics;
    assert_eq!(eval.num_test_samples, 130);
    assert_eq!(eval.class_distribution["positive"], 30);
    assert_eq!(eval.class_distribution["negative"], 100);
    assert!((eval.accuracy - 1.0).abs() < 1e-9);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(ws.path("logs/metrics.json")).unwrap())
            .unwrap();
    assert_eq!(raw["model_params"]["wordNgrams"], 2);
    assert_eq!(raw["model_params"]["loss"], "softmax");

    assert!(service.metrics_for(&outcome.model_id).unwrap().is_some());
}

#[tokio::test]
async fn test_explicit_params_override_configured_ones() {
    let (_ws, _backend, service) = mock_service(10, 20);
    let params = TrainParams::default().with_epoch(3).with_word_ngrams(1);

    let outcome = service
        .train_with_params(PositiveSource::LocalPool, params.clone())
        .await
        .unwrap();
    assert_eq!(outcome.metrics.model_params, params);

    // The default path is unaffected by the override.
    let outcome = service.train(PositiveSource::LocalPool).await.unwrap();
    assert_eq!(outcome.metrics.model_params, TrainParams::default());
}

#[tokio::test]
async fn test_invalid_params_fail_before_fitting() {
    let (_ws, backend, service) = mock_service(10, 20);

    let err = service
        .train_with_params(PositiveSource::LocalPool, TrainParams::default().with_epoch(0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(backend.fit_calls(), 0);
}

#[tokio::test]
async fn test_holdout_documents_are_not_trained_on() {
    let ws = Workspace::new();
    ws.write_pool("positive", &positive_docs(10));
    ws.write_pool("negative", &negative_docs(30));
    let mut config = ws.config();
    config.evaluation.strategy = EvaluationStrategy::Holdout;
    let backend = Arc::new(MockBackend::new());
    let service = DocScoreService::with_backend(config, backend.clone()).unwrap();

    let outcome = service.train(PositiveSource::LocalPool).await.unwrap();

    // 20% of each class is held out.
    let eval = &outcome.metrics.eval_metrics;
    assert_eq!(eval.class_distribution["positive"], 2);
    assert_eq!(eval.class_distribution["negative"], 6);

    let lines = &backend.corpora()[0].1;
    assert_eq!(count_tagged(lines, "__label__positive "), 8);
    assert_eq!(count_tagged(lines, "__label__negative "), 8);
    for held in &positive_docs(2) {
        assert!(!lines.iter().any(|l| l.ends_with(held.as_str())));
    }
}

#[tokio::test]
async fn test_missing_pool_is_a_fault() {
    let ws = Workspace::new();
    ws.write_pool("positive", &positive_docs(10));
    let service =
        DocScoreService::with_backend(ws.config(), Arc::new(MockBackend::new())).unwrap();

    let err = service.train(PositiveSource::LocalPool).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}
