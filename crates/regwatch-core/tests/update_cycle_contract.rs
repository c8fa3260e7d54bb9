//! Contract tests: the update cycle
//!
//! Verifies the fetch → diff → persist → notify flow end to end against
//! in-memory doubles:
//! - Exactly one dispatch per action of an updated image, in declared order
//! - Unchanged and first-seen images never notify
//! - Per-image failures are isolated
//! - The persisted state reflects only this cycle's successful checks

mod common;

use common::{MockRegistry, RecordingHandler, config_from_json};
use regwatch_core::state::MemoryStateStore;
use regwatch_core::traits::ImageStateStore;
use regwatch_core::{HandlerRegistry, StateEntry, TrackedImage, UpdateWatcher};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn seeded_store(entries: &[(&str, &str)]) -> MemoryStateStore {
    let mut state = regwatch_core::traits::StateMap::new();
    for (reference, last_updated) in entries {
        let image = TrackedImage::parse(reference).unwrap();
        state.insert(image.identity(), StateEntry::new(&image, *last_updated));
    }
    MemoryStateStore::with_state(state)
}

fn handlers_with_recorder() -> (Arc<HandlerRegistry>, Arc<std::sync::Mutex<Vec<String>>>) {
    let handler = RecordingHandler::new();
    let log = handler.execution_log();
    let handlers = Arc::new(HandlerRegistry::new());
    handlers.register("mock-hook", Arc::new(handler));
    (handlers, log)
}

#[tokio::test]
async fn updated_image_dispatches_every_action_in_declared_order() {
    // app-a has a newer instant than stored, app-b is unchanged
    let registry = MockRegistry::new()
        .with_repository("library/app-a", "2026-02-01T00:00:00Z")
        .with_repository("library/app-b", "2026-01-01T00:00:00Z");

    let store = seeded_store(&[
        ("app-a", "2026-01-15T00:00:00Z"),
        ("app-b", "2026-01-01T00:00:00Z"),
    ]);

    let (handlers, log) = handlers_with_recorder();

    let config = config_from_json(json!({
        "services": [
            {
                "image": "app-a",
                "actions": [
                    { "type": "mock-hook", "instance": "first" },
                    { "type": "mock-hook", "instance": "second" }
                ]
            },
            {
                "image": "app-b",
                "actions": [{ "type": "mock-hook", "instance": "third" }]
            }
        ]
    }));

    let watcher = UpdateWatcher::new(
        Box::new(registry),
        Box::new(store.clone()),
        handlers,
        config,
    )
    .unwrap();

    watcher.run_cycle().await.unwrap();

    // Only app-a's actions fired, in the order they were declared
    let executed = log.lock().unwrap().clone();
    assert_eq!(
        executed,
        vec![
            "first:library/app-a".to_string(),
            "second:library/app-a".to_string(),
        ]
    );

    // Both images were checked successfully, so both are in the new state
    let state = store.load().await.unwrap();
    assert_eq!(state.len(), 2);
    assert_eq!(
        state.get("library/app-a").unwrap().last_updated,
        "2026-02-01T00:00:00Z"
    );
}

#[tokio::test]
async fn first_seen_image_establishes_baseline_silently() {
    let registry = MockRegistry::new().with_repository("library/app-a", "2026-02-01T00:00:00Z");
    let store = MemoryStateStore::new();
    let (handlers, log) = handlers_with_recorder();

    let config = config_from_json(json!({
        "services": [
            { "image": "app-a", "actions": [{ "type": "mock-hook", "instance": "ops" }] }
        ]
    }));

    let watcher = UpdateWatcher::new(
        Box::new(registry),
        Box::new(store.clone()),
        handlers,
        config,
    )
    .unwrap();

    watcher.run_cycle().await.unwrap();

    assert!(log.lock().unwrap().is_empty(), "baseline must not notify");

    let state = store.load().await.unwrap();
    assert!(state.contains_key("library/app-a"));
}

#[tokio::test]
async fn missing_tag_excludes_only_that_image() {
    // app-a watches a tag that does not exist; app-b updates normally
    let registry = MockRegistry::new()
        .with_tags(
            "library/app-a",
            &[("v1", "2026-01-01T00:00:00Z"), ("v3", "2026-01-02T00:00:00Z")],
        )
        .with_repository("library/app-b", "2026-02-01T00:00:00Z");

    let store = seeded_store(&[
        ("app-a:v2", "2026-01-01T00:00:00Z"),
        ("app-b", "2026-01-15T00:00:00Z"),
    ]);

    let (handlers, log) = handlers_with_recorder();

    let config = config_from_json(json!({
        "services": [
            { "image": "app-a:v2", "actions": [{ "type": "mock-hook", "instance": "a" }] },
            { "image": "app-b", "actions": [{ "type": "mock-hook", "instance": "b" }] }
        ]
    }));

    let watcher = UpdateWatcher::new(
        Box::new(registry),
        Box::new(store.clone()),
        handlers,
        config,
    )
    .unwrap();

    watcher.run_cycle().await.unwrap();

    // app-b still completed and notified
    let executed = log.lock().unwrap().clone();
    assert_eq!(executed, vec!["b:library/app-b".to_string()]);

    // The failed image's entry was dropped, not carried over
    let state = store.load().await.unwrap();
    assert!(!state.contains_key("library/app-a:v2"));
    assert!(state.contains_key("library/app-b"));
}

#[tokio::test]
async fn watched_tag_is_located_in_the_listing() {
    let registry = MockRegistry::new().with_tags(
        "grafana/loki",
        &[
            ("2.8", "2026-01-01T00:00:00Z"),
            ("2.9", "2026-02-01T00:00:00Z"),
            ("latest", "2026-02-01T00:00:00Z"),
        ],
    );

    let store = seeded_store(&[("grafana/loki:2.9", "2026-01-15T00:00:00Z")]);
    let (handlers, log) = handlers_with_recorder();

    let config = config_from_json(json!({
        "services": [
            { "image": "grafana/loki:2.9", "actions": [{ "type": "mock-hook", "instance": "ops" }] }
        ]
    }));

    let watcher = UpdateWatcher::new(
        Box::new(registry),
        Box::new(store.clone()),
        handlers,
        config,
    )
    .unwrap();

    watcher.run_cycle().await.unwrap();

    let executed = log.lock().unwrap().clone();
    assert_eq!(executed, vec!["ops:grafana/loki:2.9".to_string()]);

    let state = store.load().await.unwrap();
    assert_eq!(
        state.get("grafana/loki:2.9").unwrap().last_updated,
        "2026-02-01T00:00:00Z"
    );
}

#[tokio::test]
async fn authentication_happens_once_per_cycle_and_failure_degrades() {
    let registry = MockRegistry::new()
        .with_repository("library/app-a", "2026-01-01T00:00:00Z")
        .with_repository("library/app-b", "2026-01-01T00:00:00Z")
        .failing_auth();
    let auth_calls = registry.auth_call_counter();
    let repo_calls = registry.repo_call_counter();

    let store = MemoryStateStore::new();
    let (handlers, _log) = handlers_with_recorder();

    let config = config_from_json(json!({
        "registry": { "username": "Watcher", "password": "hunter2" },
        "services": [
            { "image": "app-a", "actions": [{ "type": "mock-hook", "instance": "a" }] },
            { "image": "app-b", "actions": [{ "type": "mock-hook", "instance": "b" }] }
        ]
    }));

    let watcher =
        UpdateWatcher::new(Box::new(registry), Box::new(store.clone()), handlers, config).unwrap();

    watcher.run_cycle().await.unwrap();
    watcher.run_cycle().await.unwrap();

    // One login attempt per cycle, not per image
    assert_eq!(auth_calls.load(Ordering::SeqCst), 2);

    // The failed login degraded to anonymous fetches, it did not abort
    assert_eq!(repo_calls.load(Ordering::SeqCst), 4);

    let state = store.load().await.unwrap();
    assert_eq!(state.len(), 2);
}

#[tokio::test]
async fn second_cycle_notifies_only_after_a_real_change() {
    let registry = MockRegistry::new().with_repository("library/app-a", "2026-02-01T00:00:00Z");
    let store = MemoryStateStore::new();
    let (handlers, log) = handlers_with_recorder();

    let config = config_from_json(json!({
        "services": [
            { "image": "app-a", "actions": [{ "type": "mock-hook", "instance": "ops" }] }
        ]
    }));

    let watcher =
        UpdateWatcher::new(Box::new(registry), Box::new(store.clone()), handlers, config).unwrap();

    // First cycle baselines, second sees the same instant
    watcher.run_cycle().await.unwrap();
    watcher.run_cycle().await.unwrap();

    assert!(log.lock().unwrap().is_empty());
}
