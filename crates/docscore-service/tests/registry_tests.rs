//! Model registry tests: persistence, cache behavior, and rehydration

mod common;

use common::{mock_service, MockBackend, MockEngine, UnwritableEngine, Workspace};
use docscore_core::{Error, ErrorKind, Label, ModelId};
use docscore_service::{DocScoreService, ModelRegistry, ModelStore, PositiveSource};
use std::str::FromStr;
use std::sync::Arc;

fn registry(ws: &Workspace, capacity: Option<usize>) -> (Arc<MockBackend>, ModelRegistry) {
    let backend = Arc::new(MockBackend::new());
    let store = ModelStore::new(ws.path("trained_models"), backend.clone()).unwrap();
    (backend, ModelRegistry::new(store, capacity))
}

fn engine() -> Box<MockEngine> {
    Box::new(MockEngine::new(Label::Negative, 0.6))
}

#[tokio::test]
async fn test_store_is_durable_before_returning() {
    let ws = Workspace::new();
    let (_backend, registry) = registry(&ws, None);

    let id = registry.store(engine()).await.unwrap();

    let path = ws.path("trained_models").join(format!("{}.model", id));
    assert!(path.is_file());
    assert_eq!(registry.artifact_store().artifact_path(&id), path);
    assert!(registry.is_cached(&id));
}

#[tokio::test]
async fn test_repeated_resolves_hit_the_cache() {
    let ws = Workspace::new();
    let (backend, registry) = registry(&ws, None);
    let id = registry.store(engine()).await.unwrap();

    for _ in 0..3 {
        registry.resolve(&id).await.unwrap();
    }
    assert_eq!(backend.load_calls(), 0);
}

#[tokio::test]
async fn test_evicted_model_is_rehydrated_once() {
    let ws = Workspace::new();
    let (backend, registry) = registry(&ws, None);
    let id = registry.store(engine()).await.unwrap();
    let before = registry.resolve(&id).await.unwrap().predict("plain text").unwrap();

    assert!(registry.evict(&id));
    assert!(!registry.is_cached(&id));

    let after = registry.resolve(&id).await.unwrap().predict("plain text").unwrap();
    registry.resolve(&id).await.unwrap();

    assert_eq!(backend.load_calls(), 1);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_unknown_identity_is_not_found() {
    let ws = Workspace::new();
    let (_backend, registry) = registry(&ws, None);

    let err = registry.resolve(&ModelId::new()).await.err().unwrap();
    assert!(matches!(err, Error::ModelNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn test_garbage_identity_is_not_found() {
    let err = ModelId::from_str("not-a-model").unwrap_err();
    assert!(matches!(err, Error::ModelNotFound(_)));
}

#[tokio::test]
async fn test_corrupt_artifact_is_a_fault_not_a_lookup_error() {
    let ws = Workspace::new();
    let (_backend, registry) = registry(&ws, None);
    let id = registry.store(engine()).await.unwrap();
    registry.clear_cache();
    std::fs::write(registry.artifact_store().artifact_path(&id), b"{ truncated").unwrap();

    let err = registry.resolve(&id).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Fault);
}

#[tokio::test]
async fn test_failed_write_leaves_nothing_behind() {
    let ws = Workspace::new();
    let (_backend, registry) = registry(&ws, None);

    let err = registry.store(Box::new(UnwritableEngine)).await.unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(registry.cached_count(), 0);
    assert!(registry.list_stored().await.unwrap().is_empty());
    let leftovers = std::fs::read_dir(ws.path("trained_models")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_bounded_cache_evicts_least_recently_used() {
    let ws = Workspace::new();
    let (backend, registry) = registry(&ws, Some(2));

    let a = registry.store(engine()).await.unwrap();
    let b = registry.store(engine()).await.unwrap();
    registry.resolve(&a).await.unwrap();
    let c = registry.store(engine()).await.unwrap();

    assert_eq!(registry.cached_count(), 2);
    assert!(registry.is_cached(&a));
    assert!(!registry.is_cached(&b));
    assert!(registry.is_cached(&c));

    // Evicted models are still resolvable from their artifacts.
    registry.resolve(&b).await.unwrap();
    assert_eq!(backend.load_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_first_resolves_all_succeed() {
    let ws = Workspace::new();
    let (backend, registry) = registry(&ws, None);
    let id = registry.store(engine()).await.unwrap();
    registry.clear_cache();

    let resolves = (0..8).map(|_| registry.resolve(&id));
    for result in futures::future::join_all(resolves).await {
        assert!(result.is_ok());
    }

    assert_eq!(registry.cached_count(), 1);
    let loads = backend.load_calls();
    assert!((1..=8).contains(&loads));
}

#[tokio::test]
async fn test_list_stored_ignores_foreign_files() {
    let ws = Workspace::new();
    let (_backend, registry) = registry(&ws, None);
    let a = registry.store(engine()).await.unwrap();
    let b = registry.store(engine()).await.unwrap();
    std::fs::write(ws.path("trained_models/README.txt"), "notes").unwrap();
    std::fs::write(ws.path("trained_models/not-a-uuid.model"), "{}").unwrap();

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(registry.list_stored().await.unwrap(), expected);
}

#[tokio::test]
async fn test_models_survive_a_restart() {
    let (ws, _backend, service) = mock_service(10, 20);
    let outcome = service.train(PositiveSource::LocalPool).await.unwrap();
    let docs = vec!["POSITIVE doc".to_string(), "something else".to_string()];
    let before = service.score(&outcome.model_id, &docs).await.unwrap();
    drop(service);

    let backend = Arc::new(MockBackend::new());
    let restarted = DocScoreService::with_backend(ws.config(), backend.clone()).unwrap();
    assert_eq!(restarted.registry().cached_count(), 0);

    let after = restarted.score(&outcome.model_id, &docs).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(backend.load_calls(), 1);
    assert_eq!(restarted.list_models().await.unwrap(), vec![outcome.model_id]);
}
