//! # Fetch Lifecycle Tests
//!
//! End-to-end behaviour of fetch stores driven through a registry.

use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use storekit_core::error_store::{self, get_error, get_error_for_selector};
use storekit_core::{
    Action, FetchResult, FetchStore, FetchStoreOptions, Params, Registry, ServiceError, StoreError,
    StoreFragment, combine_stores, create_fetch_store, create_reducer,
};
use tokio::sync::Notify;

// =============================================================================
// HELPERS
// =============================================================================

fn slug_params(args: &[Value]) -> Params {
    let mut params = Params::new();
    if let Some(slug) = args.first() {
        params.insert("slug".into(), slug.clone());
    }
    params
}

fn require_slug(params: &Params) -> Result<(), StoreError> {
    match params.get("slug").and_then(Value::as_str) {
        Some(slug) if !slug.is_empty() => Ok(()),
        _ => Err(StoreError::Validation("slug required".into())),
    }
}

/// Stores the latest response under `things`.
fn thing_store(options: FetchStoreOptions) -> FetchStore {
    create_fetch_store(options.reducer_callback(|draft, response, _params| {
        draft.insert("things", response.clone());
        Ok(())
    }))
    .expect("fetch store")
}

/// Records every action type reaching the reducers.
fn recorder() -> (StoreFragment, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let fragment = StoreFragment::new().with_reducer(create_reducer(move |_draft, action| {
        sink.lock().expect("log lock").push(action.kind.clone());
        Ok(())
    }));
    (fragment, log)
}

fn registry_with_log(store: &FetchStore) -> (Registry, Arc<Mutex<Vec<String>>>) {
    let (log_fragment, log) = recorder();
    let combined = combine_stores([store.fragment().clone(), log_fragment]).expect("combine");
    (Registry::new(combined), log)
}

fn count(log: &Arc<Mutex<Vec<String>>>, kind: &str) -> usize {
    log.lock().expect("log lock").iter().filter(|k| *k == kind).count()
}

// =============================================================================
// SUCCESS & FAILURE
// =============================================================================

#[tokio::test]
async fn successful_fetch_returns_response_and_updates_state() {
    let store = thing_store(
        FetchStoreOptions::new("getThing")
            .control_callback(|_params: Params| async { Ok(json!({ "id": 1 })) }),
    );
    let (registry, log) = registry_with_log(&store);

    let result = store.run(&registry, &[]).await.expect("run");
    assert_eq!(result, FetchResult::success(json!({ "id": 1 })));
    assert_eq!(registry.state().get("things"), Some(&json!({ "id": 1 })));

    assert_eq!(count(&log, "START_FETCH_GET_THING"), 1);
    assert_eq!(count(&log, "RECEIVE_GET_THING"), 1);
    assert_eq!(count(&log, "FINISH_FETCH_GET_THING"), 1);
    assert_eq!(count(&log, "CATCH_FETCH_GET_THING"), 0);
    assert!(!store.is_fetching(&registry.state(), &[]));
}

#[tokio::test]
async fn dispatching_by_name_returns_result_value() {
    let store = thing_store(
        FetchStoreOptions::new("getThing")
            .control_callback(|_params: Params| async { Ok(json!({ "id": 1 })) }),
    );
    let registry = Registry::new(store.fragment().clone());

    let value = registry
        .dispatch_action("fetchGetThing", &[])
        .await
        .expect("dispatch");
    assert_eq!(value, json!({ "response": { "id": 1 }, "error": null }));
}

#[tokio::test]
async fn failed_fetch_records_error_and_returns_it() {
    let store = thing_store(FetchStoreOptions::new("getThing").control_callback(
        |_params: Params| async { Err(ServiceError::new("boom", "boom")) },
    ));
    let (registry, log) = registry_with_log(&store);

    let result = store.run(&registry, &[]).await.expect("run");
    let error = ServiceError::new("boom", "boom");
    assert_eq!(result, FetchResult::failure(error.clone()));

    let state = registry.state();
    assert_eq!(get_error_for_selector(&state, "getThing", &[]), Some(error.clone()));
    assert_eq!(get_error(&state), Some(error.clone()));
    assert_eq!(
        registry.select("getErrorForSelector", &[json!("getThing"), json!([])]),
        Ok(error.to_value())
    );
    assert_eq!(state.get("things"), None);

    assert_eq!(count(&log, "RECEIVE_GET_THING"), 0);
    assert_eq!(count(&log, "CATCH_FETCH_GET_THING"), 1);
    assert_eq!(count(&log, "FINISH_FETCH_GET_THING"), 0);
    assert!(!store.is_fetching(&state, &[]));
}

#[tokio::test]
async fn next_attempt_clears_previous_error() {
    let attempts = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&attempts);
    let store = thing_store(FetchStoreOptions::new("getThing").control_callback(
        move |_params: Params| {
            let counter = Arc::clone(&counter);
            async move {
                let mut n = counter.lock().expect("counter lock");
                *n += 1;
                if *n == 1 {
                    Err(ServiceError::new("boom", "boom"))
                } else {
                    Ok(json!("ok"))
                }
            }
        },
    ));
    let registry = Registry::new(store.fragment().clone());

    assert!(!store.run(&registry, &[]).await.expect("run").is_success());
    assert!(get_error_for_selector(&registry.state(), "getThing", &[]).is_some());

    assert!(store.run(&registry, &[]).await.expect("run").is_success());
    assert_eq!(get_error_for_selector(&registry.state(), "getThing", &[]), None);
    assert_eq!(get_error(&registry.state()), None);
}

#[tokio::test]
async fn failing_reducer_callback_takes_failure_branch() {
    let store = create_fetch_store(
        FetchStoreOptions::new("getThing")
            .control_callback(|_params: Params| async { Ok(json!(1)) })
            .reducer_callback(|_draft, _response, _params| {
                Err(StoreError::Reducer("cannot store".into()))
            }),
    )
    .expect("fetch store");
    let (registry, log) = registry_with_log(&store);

    let result = store.run(&registry, &[]).await.expect("run");
    let error = result.error.expect("failure");
    assert_eq!(error.code, "internal_error");
    assert_eq!(count(&log, "CATCH_FETCH_GET_THING"), 1);
    assert!(!store.is_fetching(&registry.state(), &[]));
}

#[tokio::test]
async fn missing_control_takes_failure_branch() {
    let store = thing_store(
        FetchStoreOptions::new("getThing").control_callback(|_params: Params| async { Ok(json!(1)) }),
    );
    // Keep the lifecycle reducer but drop the control.
    let mut fragment = store.fragment().clone();
    fragment.controls.clear();
    let registry = Registry::new(fragment);

    let result = store.run(&registry, &[]).await.expect("run");
    assert!(!result.is_success());
    assert!(!store.is_fetching(&registry.state(), &[]));
}

#[tokio::test]
async fn rejected_finish_falls_through_to_catch() {
    let store = thing_store(
        FetchStoreOptions::new("getThing").control_callback(|_params: Params| async { Ok(json!(1)) }),
    );
    let refuse_finish = StoreFragment::new().with_reducer(create_reducer(|_draft, action| {
        if action.kind.starts_with("FINISH_FETCH_") {
            return Err(StoreError::Reducer("refuse".into()));
        }
        Ok(())
    }));
    let registry =
        Registry::new(combine_stores([store.fragment().clone(), refuse_finish]).expect("combine"));

    let result = store.run(&registry, &[]).await.expect("run");
    let error = result.error.expect("failure");
    assert_eq!(error.code, "internal_error");
    assert!(error.message.contains("refuse"));
    assert_eq!(result.response, None);

    let state = registry.state();
    assert!(!store.is_fetching(&state, &[]));
    assert_eq!(get_error_for_selector(&state, "getThing", &[]), Some(error));
}

// =============================================================================
// VALIDATION
// =============================================================================

#[tokio::test]
async fn invalid_params_fail_before_any_dispatch() {
    let store = thing_store(
        FetchStoreOptions::new("getThing")
            .control_callback(|_params: Params| async { Ok(json!(1)) })
            .args_to_params(slug_params)
            .validate_params(require_slug),
    );
    let (registry, log) = registry_with_log(&store);
    let before = registry.state();

    assert!(matches!(store.fetch(&[]), Err(StoreError::Validation(_))));
    assert!(matches!(
        registry.dispatch_action("fetchGetThing", &[]).await,
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(store.run(&registry, &[]).await, Err(StoreError::Validation(_))));

    assert!(Arc::ptr_eq(&before, &registry.state()));
    assert!(log.lock().expect("log lock").is_empty());
}

#[tokio::test]
async fn receive_dispatched_by_name_applies_reducer_callback() {
    let store = thing_store(
        FetchStoreOptions::new("getThing")
            .control_callback(|_params: Params| async { Ok(json!(1)) })
            .args_to_params(slug_params)
            .validate_params(require_slug),
    );
    let registry = Registry::new(store.fragment().clone());

    registry
        .dispatch_action("receiveGetThing", &[json!({ "id": 7 }), json!({ "slug": "home" })])
        .await
        .expect("receive");
    assert_eq!(registry.state().get("things"), Some(&json!({ "id": 7 })));

    assert!(matches!(
        registry
            .dispatch_action("receiveGetThing", &[json!({ "id": 8 }), json!({})])
            .await,
        Err(StoreError::Validation(_))
    ));
}

// =============================================================================
// IN-FLIGHT TRACKING
// =============================================================================

/// A control callback that waits for `gate` before answering with its params.
fn gated(gate: Arc<Notify>) -> FetchStoreOptions {
    FetchStoreOptions::new("getThing")
        .control_callback(move |params: Params| {
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                Ok(Value::Object(params))
            }
        })
        .args_to_params(slug_params)
        .validate_params(require_slug)
}

#[tokio::test]
async fn in_flight_flag_is_set_while_pending() {
    let gate = Arc::new(Notify::new());
    let store = thing_store(gated(Arc::clone(&gate)));
    let registry = Registry::new(store.fragment().clone());

    let task = {
        let (store, registry) = (store.clone(), registry.clone());
        tokio::spawn(async move { store.run(&registry, &[json!("a")]).await })
    };

    let mut updates = registry.subscribe();
    updates
        .wait_for(|state| store.is_fetching(state, &[json!("a")]))
        .await
        .expect("registry alive");
    assert_eq!(
        registry.select("isFetchingGetThing", &[json!("a")]),
        Ok(json!(true))
    );

    gate.notify_one();
    let result = task.await.expect("join").expect("run");
    assert_eq!(result.response, Some(json!({ "slug": "a" })));
    assert!(!store.is_fetching(&registry.state(), &[json!("a")]));
}

#[tokio::test]
async fn concurrent_fetches_track_params_independently() {
    let gate_a = Arc::new(Notify::new());
    let gate_b = Arc::new(Notify::new());
    let gates = (Arc::clone(&gate_a), Arc::clone(&gate_b));

    let store = thing_store(
        FetchStoreOptions::new("getThing")
            .control_callback(move |params: Params| {
                let gate = if params.get("slug") == Some(&json!("a")) {
                    Arc::clone(&gates.0)
                } else {
                    Arc::clone(&gates.1)
                };
                async move {
                    gate.notified().await;
                    Ok(Value::Object(params))
                }
            })
            .args_to_params(slug_params)
            .validate_params(require_slug),
    );
    let registry = Registry::new(store.fragment().clone());

    let spawn = |slug: &'static str| {
        let (store, registry) = (store.clone(), registry.clone());
        tokio::spawn(async move { store.run(&registry, &[json!(slug)]).await })
    };
    let task_a = spawn("a");
    let task_b = spawn("b");

    let mut updates = registry.subscribe();
    updates
        .wait_for(|state| {
            store.is_fetching(state, &[json!("a")]) && store.is_fetching(state, &[json!("b")])
        })
        .await
        .expect("registry alive");

    gate_a.notify_one();
    assert!(task_a.await.expect("join").expect("run").is_success());
    let state = registry.state();
    assert!(!store.is_fetching(&state, &[json!("a")]));
    assert!(store.is_fetching(&state, &[json!("b")]));

    gate_b.notify_one();
    assert!(task_b.await.expect("join").expect("run").is_success());
    assert!(!store.is_fetching(&registry.state(), &[json!("b")]));
}

#[tokio::test]
async fn joined_fetches_each_receive_once() {
    let store = thing_store(
        FetchStoreOptions::new("getThing")
            .control_callback(|params: Params| async move { Ok(Value::Object(params)) })
            .args_to_params(slug_params)
            .validate_params(require_slug),
    );
    let (registry, log) = registry_with_log(&store);

    let args_a = [json!("a")];
    let args_b = [json!("b")];
    let (a, b) = tokio::join!(
        store.run(&registry, &args_a),
        store.run(&registry, &args_b)
    );
    assert!(a.expect("run a").is_success());
    assert!(b.expect("run b").is_success());
    assert_eq!(count(&log, "START_FETCH_GET_THING"), 2);
    assert_eq!(count(&log, "RECEIVE_GET_THING"), 2);
    assert_eq!(count(&log, "FINISH_FETCH_GET_THING"), 2);
}

// =============================================================================
// ERROR SUB-STORE THROUGH THE REGISTRY
// =============================================================================

#[tokio::test]
async fn clear_error_is_idempotent() {
    let store = thing_store(FetchStoreOptions::new("getThing").control_callback(
        |_params: Params| async { Err(ServiceError::new("boom", "boom")) },
    ));
    let registry = Registry::new(store.fragment().clone());
    store.run(&registry, &[]).await.expect("run");

    registry
        .dispatch(error_store::clear_error(Some("getThing"), &[]))
        .expect("clear");
    let once = registry.state();
    assert_eq!(get_error_for_selector(&once, "getThing", &[]), None);

    registry
        .dispatch(error_store::clear_error(Some("getThing"), &[]))
        .expect("clear again");
    assert!(Arc::ptr_eq(&once, &registry.state()));
}

#[tokio::test]
async fn selector_data_for_error_supports_retry() {
    let store = thing_store(
        FetchStoreOptions::new("getThing")
            .control_callback(|_params: Params| async {
                Err(ServiceError::new("rest_forbidden", "Forbidden").with_data(json!({ "status": 403 })))
            })
            .args_to_params(slug_params)
            .validate_params(require_slug),
    );
    let registry = Registry::new(store.fragment().clone());
    let result = store.run(&registry, &[json!("home")]).await.expect("run");
    let error = result.error.expect("failure");

    let located = registry
        .select("getSelectorDataForError", &[error.to_value()])
        .expect("select");
    assert_eq!(located, json!({ "name": "getThing", "args": ["home"] }));

    registry
        .dispatch(Action::new(
            error_store::CLEAR_ERRORS,
            json!({ "baseName": null }),
        ))
        .expect("clear all");
    assert_eq!(registry.select("getErrors", &[]), Ok(json!([])));
}
