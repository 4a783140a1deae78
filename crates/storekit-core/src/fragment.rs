//! # Store Fragments
//!
//! A fragment is a partial store definition: initial state, action
//! creators, controls, reducers, resolvers and selectors. Fragments are
//! merged with [`combine_stores`](crate::combine_stores) and handed to a
//! [`Registry`](crate::Registry).

use crate::reducer::{self, Reducer};
use crate::{Action, BoxFuture, Dispatchable, State, StoreError};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// `(...args) -> action | routine`. Also the shape of a resolver.
pub type ActionCreator = Arc<dyn Fn(&[Value]) -> Result<Dispatchable, StoreError> + Send + Sync>;

/// Handler performing the side effect for one effect type.
pub type Control = Arc<dyn Fn(Action) -> BoxFuture<'static, Result<Value, StoreError>> + Send + Sync>;

/// `(state, ...args) -> value`. Pure and synchronous.
pub type Selector = Arc<dyn Fn(&State, &[Value]) -> Value + Send + Sync>;

/// Wrap an action creator (or resolver) function.
pub fn action_creator<F>(f: F) -> ActionCreator
where
    F: Fn(&[Value]) -> Result<Dispatchable, StoreError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap an async control handler.
pub fn control<F, Fut>(f: F) -> Control
where
    F: Fn(Action) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, StoreError>> + Send + 'static,
{
    Arc::new(move |effect| -> BoxFuture<'static, Result<Value, StoreError>> {
        Box::pin(f(effect))
    })
}

/// Wrap a selector function.
pub fn selector<F>(f: F) -> Selector
where
    F: Fn(&State, &[Value]) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

// =============================================================================
// STORE FRAGMENT
// =============================================================================

/// A partial store definition.
///
/// Cloning a fragment clones handles, not functions: a clone merged twice
/// is recognised as the same fragment by the combinator.
#[derive(Clone, Default)]
pub struct StoreFragment {
    /// Slice key -> initial value.
    pub initial_state: State,
    /// Action creator name -> creator.
    pub actions: BTreeMap<String, ActionCreator>,
    /// Effect type -> control.
    pub controls: BTreeMap<String, Control>,
    /// Selector name -> resolver.
    pub resolvers: BTreeMap<String, ActionCreator>,
    /// Selector name -> selector.
    pub selectors: BTreeMap<String, Selector>,
    reducers: Vec<Reducer>,
}

impl StoreFragment {
    /// Create an empty fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state slice with its initial value.
    #[must_use]
    pub fn with_initial_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.initial_state.insert(key.into(), value);
        self
    }

    /// Add an action creator.
    #[must_use]
    pub fn with_action(mut self, name: impl Into<String>, creator: ActionCreator) -> Self {
        self.actions.insert(name.into(), creator);
        self
    }

    /// Add a control for an effect type.
    #[must_use]
    pub fn with_control(mut self, effect_type: impl Into<String>, handler: Control) -> Self {
        self.controls.insert(effect_type.into(), handler);
        self
    }

    /// Add a resolver for the same-named selector.
    #[must_use]
    pub fn with_resolver(mut self, name: impl Into<String>, resolver: ActionCreator) -> Self {
        self.resolvers.insert(name.into(), resolver);
        self
    }

    /// Add a selector.
    #[must_use]
    pub fn with_selector(mut self, name: impl Into<String>, select: Selector) -> Self {
        self.selectors.insert(name.into(), select);
        self
    }

    /// Append a reducer. Reducers run in the order they were added.
    #[must_use]
    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducers.push(reducer);
        self
    }

    /// The reducers of this fragment, in execution order.
    #[must_use]
    pub fn reducers(&self) -> &[Reducer] {
        &self.reducers
    }

    pub(crate) fn push_reducer_once(&mut self, reducer: Reducer) {
        if !self.reducers.iter().any(|r| Arc::ptr_eq(r, &reducer)) {
            self.reducers.push(reducer);
        }
    }

    /// The composed reducer, or `None` for a fragment without reducers.
    #[must_use]
    pub fn reducer(&self) -> Option<Reducer> {
        if self.reducers.is_empty() {
            return None;
        }
        let reducers = self.reducers.clone();
        Some(reducer::from_fn(move |state, action| {
            reducer::reduce_all(&reducers, state, action)
        }))
    }

    /// Run every reducer of this fragment.
    pub fn reduce<'a>(&self, state: &'a State, action: &Action) -> Result<Cow<'a, State>, StoreError> {
        reducer::reduce_all(&self.reducers, state, action)
    }

    /// Evaluate a selector directly against a state value.
    pub fn select(&self, state: &State, name: &str, args: &[Value]) -> Result<Value, StoreError> {
        let select = self
            .selectors
            .get(name)
            .ok_or_else(|| StoreError::UnknownSelector(name.to_string()))?;
        Ok(select(state, args))
    }
}

impl fmt::Debug for StoreFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreFragment")
            .field("initial_state", &self.initial_state)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("controls", &self.controls.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("selectors", &self.selectors.keys().collect::<Vec<_>>())
            .field("reducers", &self.reducers.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
