//! # Error Sub-Store
//!
//! Records the last request failure per `(action name, arguments)` pair.
//!
//! ## State
//!
//! - `errors`: `"<actionName>::<argsKey>"` -> error
//! - `errorArgs`: same keys -> the original argument list
//! - `error`: legacy global slot for call sites that pass no action name
//!
//! [`error_store`] always returns the same shared fragment, so fetch stores
//! can each include it and the combinator merges it exactly once.

use crate::fragment::{action_creator, selector};
use crate::key::stringify_args;
use crate::reducer::{Draft, create_reducer};
use crate::{Action, ServiceError, State, StoreError, StoreFragment};
use serde_json::{Map, Value, json};
use std::sync::OnceLock;

/// Action type recording an error.
pub const RECEIVE_ERROR: &str = "RECEIVE_ERROR";
/// Action type clearing one error.
pub const CLEAR_ERROR: &str = "CLEAR_ERROR";
/// Action type clearing all errors of an action, or all errors.
pub const CLEAR_ERRORS: &str = "CLEAR_ERRORS";

const ERRORS: &str = "errors";
const ERROR_ARGS: &str = "errorArgs";
const LEGACY_ERROR: &str = "error";

static ERROR_STORE: OnceLock<StoreFragment> = OnceLock::new();

/// The shared error sub-store fragment.
#[must_use]
pub fn error_store() -> StoreFragment {
    ERROR_STORE.get_or_init(build_error_store).clone()
}

/// Key under which an error for `(base_name, args)` is recorded.
#[must_use]
pub fn error_key(base_name: &str, args: &[Value]) -> String {
    format!("{base_name}::{}", stringify_args(args))
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Record `error` for `(base_name, args)`, or in the legacy slot when
/// `base_name` is `None`.
#[must_use]
pub fn receive_error(error: &ServiceError, base_name: Option<&str>, args: &[Value]) -> Action {
    Action::new(
        RECEIVE_ERROR,
        json!({ "error": error.to_value(), "baseName": base_name, "args": args }),
    )
}

/// Clear the error for `(base_name, args)`, or the legacy slot.
#[must_use]
pub fn clear_error(base_name: Option<&str>, args: &[Value]) -> Action {
    Action::new(CLEAR_ERROR, json!({ "baseName": base_name, "args": args }))
}

/// Clear every error of `base_name`, or every error at all.
#[must_use]
pub fn clear_errors(base_name: Option<&str>) -> Action {
    Action::new(CLEAR_ERRORS, json!({ "baseName": base_name }))
}

// =============================================================================
// SELECTORS
// =============================================================================

/// The error recorded for `(base_name, args)`.
#[must_use]
pub fn get_error_for_selector(state: &State, base_name: &str, args: &[Value]) -> Option<ServiceError> {
    state
        .get(ERRORS)
        .and_then(|errors| errors.get(error_key(base_name, args)))
        .and_then(ServiceError::from_value)
}

/// The legacy global error.
#[must_use]
pub fn get_error(state: &State) -> Option<ServiceError> {
    state.get(LEGACY_ERROR).and_then(ServiceError::from_value)
}

/// Every keyed error, without duplicates, in key order.
#[must_use]
pub fn get_errors(state: &State) -> Vec<ServiceError> {
    let mut unique: Vec<ServiceError> = Vec::new();
    for error in sorted_entries(state, ERRORS)
        .into_iter()
        .filter_map(|(_, value)| ServiceError::from_value(value))
    {
        if !unique.contains(&error) {
            unique.push(error);
        }
    }
    unique
}

/// The action name and arguments that produced `error`, if recorded.
#[must_use]
pub fn get_selector_data_for_error(state: &State, error: &ServiceError) -> Option<(String, Vec<Value>)> {
    let key = sorted_entries(state, ERRORS)
        .into_iter()
        .find(|(_, value)| ServiceError::from_value(value).as_ref() == Some(error))
        .map(|(key, _)| key.clone())?;
    let (name, _) = key.split_once("::")?;
    let args = state
        .get(ERROR_ARGS)
        .and_then(|all| all.get(&key))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Some((name.to_string(), args))
}

fn sorted_entries<'a>(state: &'a State, slice: &str) -> Vec<(&'a String, &'a Value)> {
    let mut entries: Vec<_> = state
        .get(slice)
        .and_then(Value::as_object)
        .map(|map| map.iter().collect())
        .unwrap_or_default();
    entries.sort_by(|a: &(&String, &Value), b| a.0.cmp(b.0));
    entries
}

// =============================================================================
// FRAGMENT
// =============================================================================

/// Argument list at `index`, or empty.
fn args_at(args: &[Value], index: usize) -> Vec<Value> {
    args.get(index)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Optional action-name argument at `index`.
fn name_at(args: &[Value], index: usize) -> Result<Option<String>, StoreError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.clone())),
        Some(other) => Err(StoreError::Validation(format!(
            "action name must be a string, got {other}"
        ))),
    }
}

fn payload_name(action: &Action) -> Option<&str> {
    action.field("baseName").and_then(Value::as_str)
}

fn payload_args(action: &Action) -> Vec<Value> {
    action
        .field("args")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn reduce_errors(draft: &mut Draft<'_>, action: &Action) -> Result<(), StoreError> {
    match action.kind.as_str() {
        RECEIVE_ERROR => {
            let error = action
                .field("error")
                .cloned()
                .ok_or_else(|| StoreError::Reducer("RECEIVE_ERROR without error".into()))?;
            match payload_name(action) {
                Some(name) => {
                    let args = payload_args(action);
                    let key = error_key(name, &args);
                    draft.update_slice(ERRORS, |errors| errors.insert(key.clone(), error));
                    draft.update_slice(ERROR_ARGS, |all| all.insert(key, Value::Array(args)));
                }
                None => {
                    draft.insert(LEGACY_ERROR, error);
                }
            }
        }
        CLEAR_ERROR => match payload_name(action) {
            Some(name) => {
                let key = error_key(name, &payload_args(action));
                remove_keys(draft, |candidate| candidate == key);
            }
            None => {
                if draft.get(LEGACY_ERROR).is_some_and(|e| !e.is_null()) {
                    draft.insert(LEGACY_ERROR, Value::Null);
                }
            }
        },
        CLEAR_ERRORS => match payload_name(action) {
            Some(name) => {
                let prefix = format!("{name}::");
                remove_keys(draft, |candidate| candidate.starts_with(&prefix));
            }
            None => {
                remove_keys(draft, |_| true);
                if draft.get(LEGACY_ERROR).is_some_and(|e| !e.is_null()) {
                    draft.insert(LEGACY_ERROR, Value::Null);
                }
            }
        },
        _ => {}
    }
    Ok(())
}

/// Remove matching keys from both keyed slices. Leaves the draft untouched
/// when nothing matches.
fn remove_keys(draft: &mut Draft<'_>, matches: impl Fn(&str) -> bool) {
    for slice in [ERRORS, ERROR_ARGS] {
        let present = draft
            .slice(slice)
            .is_some_and(|map| map.keys().any(|k| matches(k)));
        if present {
            draft.update_slice(slice, |map: &mut Map<String, Value>| {
                map.retain(|k, _| !matches(k));
            });
        }
    }
}

fn build_error_store() -> StoreFragment {
    StoreFragment::new()
        .with_initial_state(ERRORS, json!({}))
        .with_initial_state(ERROR_ARGS, json!({}))
        .with_initial_state(LEGACY_ERROR, Value::Null)
        .with_action(
            "receiveError",
            action_creator(|args| {
                let raw = args
                    .first()
                    .ok_or_else(|| StoreError::Validation("error is required".into()))?;
                let error = ServiceError::from_value(raw).ok_or_else(|| {
                    StoreError::Validation(format!("not a service error: {raw}"))
                })?;
                let name = name_at(args, 1)?;
                Ok(receive_error(&error, name.as_deref(), &args_at(args, 2)).into())
            }),
        )
        .with_action(
            "clearError",
            action_creator(|args| {
                let name = name_at(args, 0)?;
                Ok(clear_error(name.as_deref(), &args_at(args, 1)).into())
            }),
        )
        .with_action(
            "clearErrors",
            action_creator(|args| {
                let name = name_at(args, 0)?;
                Ok(clear_errors(name.as_deref()).into())
            }),
        )
        .with_reducer(create_reducer(reduce_errors))
        .with_selector("getErrorForSelector", selector(select_error_for))
        .with_selector("getErrorForAction", selector(select_error_for))
        .with_selector(
            "getError",
            selector(|state, _args| state.get(LEGACY_ERROR).cloned().unwrap_or(Value::Null)),
        )
        .with_selector(
            "getErrors",
            selector(|state, _args| {
                Value::Array(get_errors(state).iter().map(ServiceError::to_value).collect())
            }),
        )
        .with_selector(
            "getSelectorDataForError",
            selector(|state, args| {
                let found = args
                    .first()
                    .and_then(ServiceError::from_value)
                    .and_then(|error| get_selector_data_for_error(state, &error));
                match found {
                    Some((name, args)) => json!({ "name": name, "args": args }),
                    None => Value::Null,
                }
            }),
        )
}

fn select_error_for(state: &State, args: &[Value]) -> Value {
    let Some(name) = args.first().and_then(Value::as_str) else {
        return Value::Null;
    };
    state
        .get(ERRORS)
        .and_then(|errors| errors.get(error_key(name, &args_at(args, 1))))
        .cloned()
        .unwrap_or(Value::Null)
}

// =============================================================================
// TESTS
// =============================================================================
