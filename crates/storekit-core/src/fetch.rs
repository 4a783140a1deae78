//! # Fetch-Store Factory
//!
//! Builds the fragment for one server-backed request:
//!
//! ```text
//! fetchX(args)            validate params (Err before any dispatch)
//!   START_FETCH_X         isFetchingX[key] = true
//!   clearError(X, args)   plus the legacy global slot
//!   FETCH_X  ───────────▶ control ──▶ control_callback(params)
//!   ├─ Ok(response)
//!   │   RECEIVE_X         reducer_callback(state, response, params)
//!   │   FINISH_FETCH_X    isFetchingX[key] = false
//!   └─ Err(error)
//!       receiveError(error, X, args)   plus the legacy global slot
//!       CATCH_FETCH_X     isFetchingX[key] = false
//! ```
//!
//! Every `START_FETCH_X` is followed by exactly one `FINISH_FETCH_X` or
//! `CATCH_FETCH_X`. Request failures are recorded and returned in
//! [`FetchResult`], never raised. Nothing is retried.

use crate::combine::combine_stores;
use crate::error_store::{self, error_store};
use crate::fragment::{StoreFragment, action_creator, control, selector};
use crate::key::stringify_params;
use crate::naming::FetchNames;
use crate::reducer::{Draft, create_reducer};
use crate::registry::Registry;
use crate::{Action, BoxFuture, Dispatchable, FetchResult, Params, ServiceError, State, StoreError};
use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Performs the request: `params -> response`.
pub type ControlCallback =
    Arc<dyn Fn(Params) -> BoxFuture<'static, Result<Value, ServiceError>> + Send + Sync>;

/// Folds a successful response into the state.
pub type ReducerCallback =
    Arc<dyn Fn(&mut Draft<'_>, &Value, &Params) -> Result<(), StoreError> + Send + Sync>;

/// Maps call-site arguments to the parameter object.
pub type ArgsToParams = Arc<dyn Fn(&[Value]) -> Params + Send + Sync>;

/// Rejects invalid parameter combinations.
pub type ValidateParams = Arc<dyn Fn(&Params) -> Result<(), StoreError> + Send + Sync>;

// =============================================================================
// OPTIONS
// =============================================================================

/// Inputs of [`create_fetch_store`].
#[derive(Clone)]
pub struct FetchStoreOptions {
    base_name: String,
    control_callback: Option<ControlCallback>,
    reducer_callback: Option<ReducerCallback>,
    args_to_params: Option<ArgsToParams>,
    validate_params: Option<ValidateParams>,
}

impl FetchStoreOptions {
    /// Start options for `base_name`.
    #[must_use]
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            control_callback: None,
            reducer_callback: None,
            args_to_params: None,
            validate_params: None,
        }
    }

    /// Set the request function (required).
    #[must_use]
    pub fn control_callback<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ServiceError>> + Send + 'static,
    {
        self.control_callback = Some(Arc::new(
            move |params| -> BoxFuture<'static, Result<Value, ServiceError>> {
                Box::pin(f(params))
            },
        ));
        self
    }

    /// Set a prepared request function.
    #[must_use]
    pub fn control_callback_arc(mut self, callback: ControlCallback) -> Self {
        self.control_callback = Some(callback);
        self
    }

    /// Set how a response is folded into state. Defaults to no change.
    #[must_use]
    pub fn reducer_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Draft<'_>, &Value, &Params) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        self.reducer_callback = Some(Arc::new(f));
        self
    }

    /// Set how arguments become params. Defaults to `{}`.
    #[must_use]
    pub fn args_to_params<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Params + Send + Sync + 'static,
    {
        self.args_to_params = Some(Arc::new(f));
        self
    }

    /// Set params validation. Defaults to accepting everything.
    #[must_use]
    pub fn validate_params<F>(mut self, f: F) -> Self
    where
        F: Fn(&Params) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        self.validate_params = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for FetchStoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStoreOptions")
            .field("base_name", &self.base_name)
            .field("control_callback", &self.control_callback.is_some())
            .field("reducer_callback", &self.reducer_callback.is_some())
            .field("args_to_params", &self.args_to_params.is_some())
            .field("validate_params", &self.validate_params.is_some())
            .finish()
    }
}

// =============================================================================
// FETCH STORE
// =============================================================================

/// A fetch store: its fragment plus typed entry points.
#[derive(Clone)]
pub struct FetchStore {
    core: Arc<FetchCore>,
    fragment: StoreFragment,
}

struct FetchCore {
    names: FetchNames,
    requires_params: bool,
    control_callback: ControlCallback,
    reducer_callback: Option<ReducerCallback>,
    args_to_params: ArgsToParams,
    validate_params: ValidateParams,
}

/// Build a fetch store.
///
/// Fails with `StoreError::Composition` for an empty base name or a missing
/// control callback.
pub fn create_fetch_store(options: FetchStoreOptions) -> Result<FetchStore, StoreError> {
    let names = FetchNames::new(&options.base_name)?;
    let control_callback = options.control_callback.ok_or_else(|| {
        StoreError::Composition(format!(
            "fetch store `{}` requires a control callback",
            names.base_name
        ))
    })?;
    let args_to_params = options
        .args_to_params
        .unwrap_or_else(|| Arc::new(|_args: &[Value]| Params::new()));
    let validate_params = options
        .validate_params
        .unwrap_or_else(|| Arc::new(|_params: &Params| Ok(())));

    // Probe once: if the defaults validate, the operation needs no params.
    let requires_params = validate_params(&args_to_params(&[])).is_err();

    let core = Arc::new(FetchCore {
        names,
        requires_params,
        control_callback,
        reducer_callback: options.reducer_callback,
        args_to_params,
        validate_params,
    });

    let own = build_fragment(&core);
    let fragment = combine_stores([own, error_store()])?;
    Ok(FetchStore { core, fragment })
}

impl FetchStore {
    /// The derived identifiers.
    #[must_use]
    pub fn names(&self) -> &FetchNames {
        &self.core.names
    }

    /// The fragment (includes the shared error sub-store).
    #[must_use]
    pub fn fragment(&self) -> &StoreFragment {
        &self.fragment
    }

    /// Consume into the fragment.
    #[must_use]
    pub fn into_fragment(self) -> StoreFragment {
        self.fragment
    }

    /// Whether the operation needs parameters at all.
    #[must_use]
    pub fn requires_params(&self) -> bool {
        self.core.requires_params
    }

    /// Compute and validate params for call-site arguments.
    pub fn params_for(&self, args: &[Value]) -> Result<Params, StoreError> {
        self.core.params_for(args)
    }

    /// `fetchX(...args)`: validate now, return the routine.
    pub fn fetch(&self, args: &[Value]) -> Result<Dispatchable, StoreError> {
        self.core.fetch_action(args)
    }

    /// Validate and run the fetch routine to completion.
    pub async fn run(&self, registry: &Registry, args: &[Value]) -> Result<FetchResult, StoreError> {
        let params = self.core.params_for(args)?;
        self.core.fetch(registry, params, args.to_vec()).await
    }

    /// `receiveX(response, params)`.
    pub fn receive(&self, response: Value, params: &Params) -> Result<Action, StoreError> {
        self.core.receive(Some(response), params)
    }

    /// `isFetchingX(...args)` against a state value.
    #[must_use]
    pub fn is_fetching(&self, state: &State, args: &[Value]) -> bool {
        self.core.is_fetching(state, args)
    }
}

impl fmt::Debug for FetchStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStore")
            .field("names", &self.core.names)
            .field("requires_params", &self.core.requires_params)
            .field("fragment", &self.fragment)
            .finish()
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

impl FetchCore {
    fn params_for(&self, args: &[Value]) -> Result<Params, StoreError> {
        let params = (self.args_to_params)(args);
        (self.validate_params)(&params)?;
        Ok(params)
    }

    fn lifecycle_action(&self, kind: &str, params: &Params) -> Action {
        Action::new(kind, json!({ "params": params }))
    }

    fn fetch_action(self: &Arc<Self>, args: &[Value]) -> Result<Dispatchable, StoreError> {
        let params = self.params_for(args)?;
        let core = Arc::clone(self);
        let args = args.to_vec();
        Ok(Dispatchable::routine(move |registry: Registry| async move {
            let result = core.fetch(&registry, params, args).await?;
            Ok(result.to_value())
        }))
    }

    fn receive(&self, response: Option<Value>, params: &Params) -> Result<Action, StoreError> {
        let response = response.ok_or_else(|| {
            StoreError::Validation(format!("{}: response is required", self.names.receive_action))
        })?;
        if self.requires_params {
            (self.validate_params)(params)?;
        }
        Ok(Action::new(
            &self.names.receive_type,
            json!({ "response": response, "params": params }),
        ))
    }

    async fn fetch(
        &self,
        registry: &Registry,
        params: Params,
        args: Vec<Value>,
    ) -> Result<FetchResult, StoreError> {
        let base_name = self.names.base_name.as_str();
        registry.dispatch(self.lifecycle_action(&self.names.start_type, &params))?;
        tracing::debug!(base_name, key = %stringify_params(&params), "fetch started");

        // From here on exactly one terminal action must be applied. A rejected
        // FINISH leaves the state untouched, so it falls through to CATCH.
        let outcome = match self.perform(registry, &params, &args).await {
            Ok(response) => registry
                .dispatch(self.lifecycle_action(&self.names.finish_type, &params))
                .map(|()| response),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(response) => Ok(FetchResult::success(response)),
            Err(err) => {
                let error = ServiceError::from(err);
                tracing::debug!(base_name, error = %error, "fetch failed");
                dispatch_best_effort(
                    registry,
                    error_store::receive_error(&error, Some(base_name), &args),
                );
                dispatch_best_effort(registry, error_store::receive_error(&error, None, &[]));
                registry.dispatch(self.lifecycle_action(&self.names.catch_type, &params))?;
                Ok(FetchResult::failure(error))
            }
        }
    }

    async fn perform(
        &self,
        registry: &Registry,
        params: &Params,
        args: &[Value],
    ) -> Result<Value, StoreError> {
        dispatch_best_effort(
            registry,
            error_store::clear_error(Some(&self.names.base_name), args),
        );
        dispatch_best_effort(registry, error_store::clear_error(None, &[]));

        let response = registry
            .control(self.lifecycle_action(&self.names.fetch_type, params))
            .await?;
        registry.dispatch(self.receive(Some(response.clone()), params)?)?;
        Ok(response)
    }

    fn is_fetching(&self, state: &State, args: &[Value]) -> bool {
        // Unresolved params elsewhere in the UI are not a fetch-state error.
        let Ok(params) = self.params_for(args) else {
            return false;
        };
        state
            .get(&self.names.is_fetching_selector)
            .and_then(|slice| slice.get(stringify_params(&params)))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn reduce(&self, draft: &mut Draft<'_>, action: &Action) -> Result<(), StoreError> {
        let names = &self.names;
        let kind = action.kind.as_str();

        if kind == names.start_type {
            set_fetching(draft, &names.is_fetching_selector, &action.params(), true);
        } else if kind == names.finish_type || kind == names.catch_type {
            set_fetching(draft, &names.is_fetching_selector, &action.params(), false);
        } else if kind == names.receive_type {
            if let Some(callback) = &self.reducer_callback {
                let response = action.field("response").cloned().unwrap_or(Value::Null);
                callback(draft, &response, &action.params())?;
            }
        }
        Ok(())
    }
}

fn set_fetching(draft: &mut Draft<'_>, slice: &str, params: &Params, value: bool) {
    let key = stringify_params(params);
    draft.update_slice(slice, |in_flight| in_flight.insert(key, Value::Bool(value)));
}

fn dispatch_best_effort(registry: &Registry, action: Action) {
    let kind = action.kind.clone();
    if let Err(err) = registry.dispatch(action) {
        tracing::warn!(action = %kind, error = %err, "best-effort dispatch failed");
    }
}

// =============================================================================
// FRAGMENT
// =============================================================================

fn build_fragment(core: &Arc<FetchCore>) -> StoreFragment {
    let names = &core.names;

    let fetch = {
        let core = Arc::clone(core);
        action_creator(move |args| core.fetch_action(args))
    };

    let receive = {
        let core = Arc::clone(core);
        action_creator(move |args| {
            let params = match args.get(1) {
                None | Some(Value::Null) => Params::new(),
                Some(Value::Object(params)) => params.clone(),
                Some(other) => {
                    return Err(StoreError::Validation(format!(
                        "{}: params must be an object, got {other}",
                        core.names.receive_action
                    )));
                }
            };
            Ok(core.receive(args.first().cloned(), &params)?.into())
        })
    };

    let perform = {
        let callback = Arc::clone(&core.control_callback);
        control(move |effect: Action| {
            let callback = Arc::clone(&callback);
            async move { callback(effect.params()).await.map_err(StoreError::from) }
        })
    };

    let reducer = {
        let core = Arc::clone(core);
        create_reducer(move |draft, action| core.reduce(draft, action))
    };

    let is_fetching = {
        let core = Arc::clone(core);
        selector(move |state, args| Value::Bool(core.is_fetching(state, args)))
    };

    StoreFragment::new()
        .with_initial_state(names.is_fetching_selector.clone(), json!({}))
        .with_action(names.fetch_action.clone(), fetch)
        .with_action(names.receive_action.clone(), receive)
        .with_control(names.fetch_type.clone(), perform)
        .with_reducer(reducer)
        .with_selector(names.is_fetching_selector.clone(), is_fetching)
}

// =============================================================================
// TESTS
// =============================================================================
