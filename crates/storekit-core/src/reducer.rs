//! # Reducer Builder
//!
//! Reducers take the published state by reference and return either the
//! same reference (`Cow::Borrowed`, nothing changed) or a fresh value
//! (`Cow::Owned`). The published state is never mutated.
//!
//! `create_reducer` lets an author write direct mutations against a
//! [`Draft`]. The draft is copy-on-write: reads go to the base state and the
//! first write takes a private copy. A mutation that fails discards the copy,
//! so either every mutation of the call is applied or none is.

use crate::{Action, State, StoreError};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;

/// `(state, action) -> state`.
pub type Reducer = Arc<
    dyn for<'a> Fn(&'a State, &Action) -> Result<Cow<'a, State>, StoreError> + Send + Sync,
>;

/// Wrap a reducer function.
pub fn from_fn<F>(f: F) -> Reducer
where
    F: for<'a> Fn(&'a State, &Action) -> Result<Cow<'a, State>, StoreError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Build a reducer from a draft-mutation function.
pub fn create_reducer<F>(mutate: F) -> Reducer
where
    F: Fn(&mut Draft<'_>, &Action) -> Result<(), StoreError> + Send + Sync + 'static,
{
    from_fn(move |state, action| {
        let mut draft = Draft::new(state);
        mutate(&mut draft, action)?;
        Ok(draft.finish())
    })
}

/// Thread `state` through `reducers` in order.
///
/// Each reducer sees the output of the previous one. Returns the input
/// reference if no reducer changed anything.
pub fn reduce_all<'a>(
    reducers: &[Reducer],
    state: &'a State,
    action: &Action,
) -> Result<Cow<'a, State>, StoreError> {
    let mut next: Option<State> = None;

    for reducer in reducers {
        let base = next.as_ref().unwrap_or(state);
        let changed = match reducer(base, action)? {
            Cow::Borrowed(_) => None,
            Cow::Owned(updated) => Some(updated),
        };
        if changed.is_some() {
            next = changed;
        }
    }

    Ok(next.map_or(Cow::Borrowed(state), Cow::Owned))
}

// =============================================================================
// DRAFT
// =============================================================================

/// A copy-on-write view of the state handed to mutation functions.
#[derive(Debug)]
pub struct Draft<'a> {
    base: &'a State,
    copy: Option<State>,
}

impl<'a> Draft<'a> {
    /// Start a draft over `base`.
    #[must_use]
    pub fn new(base: &'a State) -> Self {
        Self { base, copy: None }
    }

    /// The current view (base until the first write).
    #[must_use]
    pub fn state(&self) -> &State {
        self.copy.as_ref().unwrap_or(self.base)
    }

    /// Read a top-level slice.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state().get(key)
    }

    /// Read an object slice.
    #[must_use]
    pub fn slice(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    /// Mutable access to the whole state. Takes the private copy.
    pub fn state_mut(&mut self) -> &mut State {
        let base = self.base;
        self.copy.get_or_insert_with(|| base.clone())
    }

    /// Replace a top-level slice.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state_mut().insert(key.into(), value)
    }

    /// Remove a top-level slice. Does not copy when the key is absent.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if !self.state().contains_key(key) {
            return None;
        }
        self.state_mut().remove(key)
    }

    /// Mutate an object slice in place, creating it if missing.
    ///
    /// A slice that holds a non-object value is replaced by an empty object.
    pub fn update_slice<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut Map<String, Value>) -> R,
    ) -> R {
        let state = self.state_mut();
        let mut slice = match state.remove(key) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let out = f(&mut slice);
        state.insert(key.to_string(), Value::Object(slice));
        out
    }

    /// Whether any write has happened.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.copy.is_some()
    }

    /// Publish the result: the copy if written, the base reference otherwise.
    #[must_use]
    pub fn finish(self) -> Cow<'a, State> {
        match self.copy {
            Some(copy) => Cow::Owned(copy),
            None => Cow::Borrowed(self.base),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
