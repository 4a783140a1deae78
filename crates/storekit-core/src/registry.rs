//! # Registry
//!
//! The host that stores state and drives routines.
//!
//! ## Side-effect interpretation
//!
//! Action creators return either a plain action, reduced immediately by
//! [`Registry::dispatch`], or a routine. A routine receives the registry
//! handle and awaits [`Registry::control`] for every effect; the control
//! registered for the effect type performs it and its value resumes the
//! routine. A failing control surfaces as an `Err` inside the routine.
//!
//! ## Resolver scheduling
//!
//! [`Registry::resolve_select`] runs the resolver named like the selector at
//! most once per `(selector, argument key)` until invalidated. Concurrent
//! callers with the same key wait on the same run.

use crate::fragment::StoreFragment;
use crate::key::stringify_args;
use crate::{Action, Dispatchable, State, StoreError};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OnceCell, watch};

/// `(selector name, stringified args)`.
type ResolutionKey = (String, String);

/// A handle to a running store. Clones share the same store.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

struct Inner {
    fragment: StoreFragment,
    state: watch::Sender<Arc<State>>,
    resolutions: Mutex<BTreeMap<ResolutionKey, Arc<OnceCell<()>>>>,
}

impl Registry {
    /// Start a store from a (combined) fragment and its initial state.
    #[must_use]
    pub fn new(fragment: StoreFragment) -> Self {
        let initial = fragment.initial_state.clone();
        Self::with_state(fragment, initial)
    }

    /// Start a store from a fragment with an explicit state.
    #[must_use]
    pub fn with_state(fragment: StoreFragment, state: State) -> Self {
        let (sender, _receiver) = watch::channel(Arc::new(state));
        Self {
            inner: Arc::new(Inner {
                fragment,
                state: sender,
                resolutions: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// The fragment this store runs.
    #[must_use]
    pub fn fragment(&self) -> &StoreFragment {
        &self.inner.fragment
    }

    /// The current published state.
    #[must_use]
    pub fn state(&self) -> Arc<State> {
        Arc::clone(&self.inner.state.borrow())
    }

    /// Receive every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<State>> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Reduce a plain action into the state.
    ///
    /// A reducer error leaves the published state untouched.
    pub fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        let fragment = &self.inner.fragment;
        let mut outcome = Ok(());

        let changed = self.inner.state.send_if_modified(|current| {
            let reduced = fragment.reduce(current, &action).map(|next| match next {
                Cow::Borrowed(_) => None,
                Cow::Owned(state) => Some(state),
            });
            match reduced {
                Ok(Some(next)) => {
                    *current = Arc::new(next);
                    true
                }
                Ok(None) => false,
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            }
        });

        tracing::trace!(action = %action.kind, changed, "dispatch");
        outcome
    }

    /// Route an effect to its control and await the result.
    pub async fn control(&self, effect: Action) -> Result<Value, StoreError> {
        let handler = self
            .inner
            .fragment
            .controls
            .get(&effect.kind)
            .cloned()
            .ok_or_else(|| StoreError::UnknownControl(effect.kind.clone()))?;
        tracing::debug!(effect = %effect.kind, "routing effect to control");
        handler(effect).await
    }

    /// Dispatch a plain action or drive a routine to completion.
    ///
    /// A plain action evaluates to its JSON form.
    pub async fn run(&self, dispatchable: Dispatchable) -> Result<Value, StoreError> {
        match dispatchable {
            Dispatchable::Action(action) => {
                let value = action.to_value();
                self.dispatch(action)?;
                Ok(value)
            }
            Dispatchable::Routine(routine) => routine(self.clone()).await,
        }
    }

    /// Look up an action creator by name and run what it returns.
    pub async fn dispatch_action(&self, name: &str, args: &[Value]) -> Result<Value, StoreError> {
        let creator = self
            .inner
            .fragment
            .actions
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownAction(name.to_string()))?;
        let dispatchable = creator(args)?;
        self.run(dispatchable).await
    }

    // =========================================================================
    // SELECTION & RESOLUTION
    // =========================================================================

    /// Evaluate a selector against the current state. Never runs resolvers.
    pub fn select(&self, name: &str, args: &[Value]) -> Result<Value, StoreError> {
        let state = self.state();
        self.inner.fragment.select(&state, name, args)
    }

    /// Run the selector's resolver (at most once per argument key), then select.
    pub async fn resolve_select(&self, name: &str, args: &[Value]) -> Result<Value, StoreError> {
        self.resolve(name, args).await?;
        self.select(name, args)
    }

    /// Run the resolver for `(name, args)` unless it already ran.
    ///
    /// Resolver failures are logged; the resolution still counts as finished
    /// until invalidated.
    pub async fn resolve(&self, name: &str, args: &[Value]) -> Result<(), StoreError> {
        if !self.inner.fragment.selectors.contains_key(name) {
            return Err(StoreError::UnknownSelector(name.to_string()));
        }
        let Some(resolver) = self.inner.fragment.resolvers.get(name).cloned() else {
            return Ok(());
        };

        let cell = {
            let mut resolutions = self.resolutions();
            Arc::clone(
                resolutions
                    .entry(resolution_key(name, args))
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        cell.get_or_init(|| async move {
            tracing::debug!(selector = name, "running resolver");
            let outcome = match resolver(args) {
                Ok(dispatchable) => self.run(dispatchable).await.map(|_| ()),
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                tracing::warn!(selector = name, error = %err, "resolver failed");
            }
        })
        .await;

        Ok(())
    }

    /// Whether the resolver for `(name, args)` has been started.
    #[must_use]
    pub fn has_started_resolution(&self, name: &str, args: &[Value]) -> bool {
        self.resolutions().contains_key(&resolution_key(name, args))
    }

    /// Whether the resolver for `(name, args)` has completed.
    #[must_use]
    pub fn has_finished_resolution(&self, name: &str, args: &[Value]) -> bool {
        self.resolutions()
            .get(&resolution_key(name, args))
            .is_some_and(|cell| cell.initialized())
    }

    /// Whether the resolver for `(name, args)` is running.
    #[must_use]
    pub fn is_resolving(&self, name: &str, args: &[Value]) -> bool {
        self.resolutions()
            .get(&resolution_key(name, args))
            .is_some_and(|cell| !cell.initialized())
    }

    /// Allow the resolver for `(name, args)` to run again.
    pub fn invalidate_resolution(&self, name: &str, args: &[Value]) {
        self.resolutions().remove(&resolution_key(name, args));
    }

    /// Allow every resolution of one selector to run again.
    pub fn invalidate_resolution_for_selector(&self, name: &str) {
        self.resolutions().retain(|(selector, _), _| selector != name);
    }

    /// Allow every resolution to run again.
    pub fn invalidate_resolution_for_store(&self) {
        self.resolutions().clear();
    }

    fn resolutions(&self) -> MutexGuard<'_, BTreeMap<ResolutionKey, Arc<OnceCell<()>>>> {
        self.inner
            .resolutions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn resolution_key(name: &str, args: &[Value]) -> ResolutionKey {
    (name.to_string(), stringify_args(args))
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("fragment", &self.inner.fragment)
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
