//! # Dashboard Store
//!
//! Builds one combined store from the configured datapoints.
//!
//! For a datapoint named `report`:
//!
//! | Item                    | Name                    |
//! |-------------------------|-------------------------|
//! | fetch store base name   | `getReport`             |
//! | fetch action            | `fetchGetReport`        |
//! | in-flight selector      | `isFetchingGetReport`   |
//! | cache slice             | `report`                |
//! | cached selector         | `getReport`             |
//! | resolver                | `getReport`             |
//!
//! The cache slice maps `stringify_params(params)` to the last response.
//! Selecting `getReport` through the registry's resolving path fetches once
//! when nothing is cached for those params.

use crate::client::{ApiRequest, SharedTransport};
use crate::config::{AppConfig, DatapointConfig};
use serde_json::{Value, json};
use std::sync::Arc;
use storekit_core::naming::pascal_case;
use storekit_core::{
    Dispatchable, FetchStore, FetchStoreOptions, Params, Registry, State, StoreError,
    StoreFragment, action_creator, combine_stores, create_fetch_store, error_store, selector,
    stringify_params,
};

/// One configured datapoint and its fetch store.
#[derive(Debug, Clone)]
pub struct Datapoint {
    pub config: DatapointConfig,
    pub store: FetchStore,
}

impl Datapoint {
    /// Name of the cached selector and its resolver (`get<Name>`).
    #[must_use]
    pub fn selector_name(&self) -> &str {
        &self.store.names().base_name
    }

    /// The cached response for `args`, if any.
    #[must_use]
    pub fn cached(&self, state: &State, args: &[Value]) -> Option<Value> {
        let params = self.store.params_for(args).ok()?;
        cached_response(state, &self.config.name, &params)
    }
}

/// The combined dashboard store.
#[derive(Debug, Clone)]
pub struct Dashboard {
    fragment: StoreFragment,
    datapoints: Vec<Datapoint>,
}

impl Dashboard {
    /// Build the store for every datapoint in `config`.
    pub fn build(config: &AppConfig, transport: SharedTransport) -> Result<Self, StoreError> {
        let mut fragments = Vec::with_capacity(config.datapoints.len() + 1);
        let mut datapoints = Vec::with_capacity(config.datapoints.len());

        for datapoint in &config.datapoints {
            let store = datapoint_store(datapoint, Arc::clone(&transport))?;
            fragments.push(store.fragment().clone());
            fragments.push(cache_fragment(datapoint, &store));
            datapoints.push(Datapoint {
                config: datapoint.clone(),
                store,
            });
        }
        // Present even without datapoints.
        fragments.push(error_store());

        let fragment = combine_stores(fragments)?;
        tracing::debug!(
            datapoints = datapoints.len(),
            selectors = fragment.selectors.len(),
            "dashboard store built"
        );
        Ok(Self {
            fragment,
            datapoints,
        })
    }

    /// The combined fragment.
    #[must_use]
    pub fn fragment(&self) -> &StoreFragment {
        &self.fragment
    }

    /// Configured datapoints in declaration order.
    #[must_use]
    pub fn datapoints(&self) -> &[Datapoint] {
        &self.datapoints
    }

    /// Look up a datapoint by name.
    #[must_use]
    pub fn datapoint(&self, name: &str) -> Option<&Datapoint> {
        self.datapoints.iter().find(|d| d.config.name == name)
    }

    /// Start a registry running this store.
    #[must_use]
    pub fn registry(&self) -> Registry {
        Registry::new(self.fragment.clone())
    }
}

// =============================================================================
// PER-DATAPOINT FRAGMENTS
// =============================================================================

fn datapoint_store(
    datapoint: &DatapointConfig,
    transport: SharedTransport,
) -> Result<FetchStore, StoreError> {
    let base_name = format!("get{}", pascal_case(&datapoint.name));
    let slice = datapoint.name.clone();
    let param_names = datapoint.params.clone();
    let required = datapoint.required.clone();
    let request = ApiRequest {
        method: datapoint.method,
        module: datapoint.module.clone(),
        endpoint: datapoint.endpoint.clone(),
        params: Params::new(),
    };

    create_fetch_store(
        FetchStoreOptions::new(base_name)
            .control_callback(move |params: Params| {
                transport.request(ApiRequest {
                    params,
                    ..request.clone()
                })
            })
            .args_to_params(move |args: &[Value]| {
                param_names
                    .iter()
                    .zip(args)
                    .filter(|(_, value)| !value.is_null())
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .validate_params(move |params: &Params| {
                match required.iter().find(|name| is_blank(params.get(name.as_str()))) {
                    Some(name) => Err(StoreError::Validation(format!("{name} is required"))),
                    None => Ok(()),
                }
            })
            .reducer_callback(move |draft, response, params| {
                let key = stringify_params(params);
                draft.update_slice(&slice, |cache| cache.insert(key, response.clone()));
                Ok(())
            }),
    )
}

fn cache_fragment(datapoint: &DatapointConfig, store: &FetchStore) -> StoreFragment {
    let name = store.names().base_name.clone();

    let read = {
        let store = store.clone();
        let slice = datapoint.name.clone();
        selector(move |state, args| match store.params_for(args) {
            Ok(params) => cached_response(state, &slice, &params).unwrap_or(Value::Null),
            Err(_) => Value::Null,
        })
    };

    let resolve = {
        let store = store.clone();
        let slice = datapoint.name.clone();
        action_creator(move |args| {
            let params = store.params_for(args)?;
            let (store, slice, args) = (store.clone(), slice.clone(), args.to_vec());
            Ok(Dispatchable::routine(move |registry: Registry| async move {
                if cached_response(&registry.state(), &slice, &params).is_some() {
                    return Ok(Value::Null);
                }
                let result = store.run(&registry, &args).await?;
                Ok(result.to_value())
            }))
        })
    };

    StoreFragment::new()
        .with_initial_state(datapoint.name.clone(), json!({}))
        .with_selector(name.clone(), read)
        .with_resolver(name, resolve)
}

fn cached_response(state: &State, slice: &str, params: &Params) -> Option<Value> {
    state
        .get(slice)
        .and_then(|cache| cache.get(stringify_params(params)))
        .cloned()
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================
