//! # Composition Tests
//!
//! Combining fragments and resolving selectors through a registry.

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use storekit_core::{
    Action, Dispatchable, FetchStoreOptions, Params, Registry, StoreError, StoreFragment,
    action_creator, combine_stores, create_fetch_store, create_reducer, error_store, selector,
    stringify_params,
};

fn counter(slice: &'static str, action: &'static str) -> StoreFragment {
    StoreFragment::new()
        .with_initial_state(slice, json!(0))
        .with_reducer(create_reducer(move |draft, incoming| {
            if incoming.kind == action {
                let n = draft.get(slice).and_then(Value::as_i64).unwrap_or(0);
                draft.insert(slice, json!(n + 1));
            }
            Ok(())
        }))
}

// =============================================================================
// COMBINATOR
// =============================================================================

#[test]
fn shared_initial_slice_survives_either_reducer() {
    let a = counter("count", "A").with_initial_state("onlyA", json!("a"));
    let b = counter("count", "B").with_initial_state("onlyB", json!("b"));
    let combined = combine_stores([a, b]).expect("combine");
    assert_eq!(combined.initial_state.get("count"), Some(&json!(0)));

    let state = combined.initial_state.clone();
    let after_a = combined.reduce(&state, &Action::bare("A")).expect("reduce").into_owned();
    assert_eq!(after_a.get("count"), Some(&json!(1)));
    assert_eq!(after_a.get("onlyB"), Some(&json!("b")));

    let after_b = combined.reduce(&after_a, &Action::bare("B")).expect("reduce").into_owned();
    assert_eq!(after_b.get("count"), Some(&json!(2)));
    assert_eq!(after_b.get("onlyA"), Some(&json!("a")));
}

#[test]
fn fetch_stores_share_one_error_store() {
    let fetch = |name: &str| {
        create_fetch_store(
            FetchStoreOptions::new(name).control_callback(|_params: Params| async { Ok(json!(1)) }),
        )
        .expect("fetch store")
        .into_fragment()
    };
    let combined =
        combine_stores([fetch("getOne"), fetch("getTwo"), error_store()]).expect("combine");

    // One lifecycle reducer per fetch store plus the error reducer.
    assert_eq!(combined.reducers().len(), 3);
    assert!(combined.actions.contains_key("fetchGetOne"));
    assert!(combined.actions.contains_key("fetchGetTwo"));
    assert!(combined.actions.contains_key("clearErrors"));
}

#[test]
fn same_base_name_twice_is_rejected() {
    let fetch = || {
        create_fetch_store(
            FetchStoreOptions::new("getThing")
                .control_callback(|_params: Params| async { Ok(json!(1)) }),
        )
        .expect("fetch store")
        .into_fragment()
    };
    assert!(matches!(
        combine_stores([fetch(), fetch()]),
        Err(StoreError::Composition(_))
    ));
}

// =============================================================================
// RESOLVERS
// =============================================================================

fn cached_thing(calls: Arc<AtomicUsize>) -> StoreFragment {
    let fetch = create_fetch_store(
        FetchStoreOptions::new("fetchThingData")
            .control_callback(move |params: Params| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::task::yield_now().await;
                    Ok(json!({ "for": params }))
                }
            })
            .args_to_params(|args: &[Value]| {
                let mut params = Params::new();
                params.insert("id".into(), args.first().cloned().unwrap_or(Value::Null));
                params
            })
            .reducer_callback(|draft, response, params| {
                let key = stringify_params(params);
                draft.update_slice("things", |things| things.insert(key, response.clone()));
                Ok(())
            }),
    )
    .expect("fetch store");

    let read = |state: &storekit_core::State, args: &[Value]| {
        let mut params = Params::new();
        params.insert("id".into(), args.first().cloned().unwrap_or(Value::Null));
        state
            .get("things")
            .and_then(|things| things.get(stringify_params(&params)))
            .cloned()
            .unwrap_or(Value::Null)
    };

    let resolver = {
        let fetch = fetch.clone();
        action_creator(move |args| {
            let fetch = fetch.clone();
            let args = args.to_vec();
            Ok(Dispatchable::routine(move |registry: Registry| async move {
                let result = fetch.run(&registry, &args).await?;
                Ok(result.to_value())
            }))
        })
    };

    let own = StoreFragment::new()
        .with_initial_state("things", json!({}))
        .with_selector("getThing", selector(read))
        .with_resolver("getThing", resolver);

    combine_stores([fetch.into_fragment(), own]).expect("combine")
}

#[tokio::test]
async fn concurrent_resolutions_share_one_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new(cached_thing(Arc::clone(&calls)));

    let args = [json!(1)];
    let (first, second) = tokio::join!(
        registry.resolve_select("getThing", &args),
        registry.resolve_select("getThing", &args)
    );
    assert_eq!(first, Ok(json!({ "for": { "id": 1 } })));
    assert_eq!(second, Ok(json!({ "for": { "id": 1 } })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    registry
        .resolve_select("getThing", &[json!(2)])
        .await
        .expect("select");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn select_without_resolution_does_not_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new(cached_thing(Arc::clone(&calls)));

    assert_eq!(registry.select("getThing", &[json!(1)]), Ok(Value::Null));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!registry.has_started_resolution("getThing", &[json!(1)]));
}

#[tokio::test]
async fn invalidated_resolution_fetches_again() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new(cached_thing(Arc::clone(&calls)));

    registry.resolve_select("getThing", &[json!(1)]).await.expect("select");
    registry.resolve_select("getThing", &[json!(1)]).await.expect("select");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    registry.invalidate_resolution_for_selector("getThing");
    registry.resolve_select("getThing", &[json!(1)]).await.expect("select");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
