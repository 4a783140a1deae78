//! # Store Combinator
//!
//! Merges fragments into one.
//!
//! - `initial_state`: shallow merge, later fragments win
//! - actions, controls, selectors, resolvers: shallow merge; a name declared
//!   by two different functions is a composition error
//! - reducers: concatenated in declaration order
//!
//! A function handle seen twice (the same `Arc`) is merged once. This is how
//! a shared sub-store pulled in by several fragments ends up in the combined
//! store exactly once.

use crate::{StoreError, StoreFragment};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Combine fragments in declaration order.
pub fn combine_stores<I>(fragments: I) -> Result<StoreFragment, StoreError>
where
    I: IntoIterator<Item = StoreFragment>,
{
    let mut combined = StoreFragment::new();

    for fragment in fragments {
        let reducers = fragment.reducers().to_vec();
        let StoreFragment {
            initial_state,
            actions,
            controls,
            resolvers,
            selectors,
            ..
        } = fragment;

        for (key, value) in initial_state {
            if combined.initial_state.get(&key).is_some_and(|prev| *prev != value) {
                tracing::debug!(slice = %key, "initial state re-declared, later fragment wins");
            }
            combined.initial_state.insert(key, value);
        }

        merge_unique("action", &mut combined.actions, actions)?;
        merge_unique("control", &mut combined.controls, controls)?;
        merge_unique("resolver", &mut combined.resolvers, resolvers)?;
        merge_unique("selector", &mut combined.selectors, selectors)?;

        for reducer in reducers {
            combined.push_reducer_once(reducer);
        }
    }

    Ok(combined)
}

fn merge_unique<T: ?Sized>(
    kind: &str,
    target: &mut BTreeMap<String, Arc<T>>,
    source: BTreeMap<String, Arc<T>>,
) -> Result<(), StoreError> {
    for (name, handle) in source {
        match target.get(&name) {
            Some(existing) if Arc::ptr_eq(existing, &handle) => {}
            Some(_) => {
                return Err(StoreError::Composition(format!(
                    "{kind} `{name}` is declared by more than one fragment"
                )));
            }
            None => {
                target.insert(name, handle);
            }
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_store::error_store;
    use crate::fragment::{action_creator, selector};
    use crate::reducer::create_reducer;
    use crate::Action;
    use serde_json::{Value, json};

    fn named(name: &str) -> StoreFragment {
        let slice = name.to_string();
        StoreFragment::new()
            .with_initial_state(name, json!(0))
            .with_selector(
                format!("get_{name}"),
                selector(move |state, _| state.get(&slice).cloned().unwrap_or(Value::Null)),
            )
    }

    #[test]
    fn merges_disjoint_fragments() {
        let combined = combine_stores([named("a"), named("b")]).expect("combine");
        assert_eq!(combined.initial_state.len(), 2);
        assert!(combined.selectors.contains_key("get_a"));
        assert!(combined.selectors.contains_key("get_b"));
    }

    #[test]
    fn duplicate_selector_is_rejected() {
        let result = combine_stores([named("a"), named("a")]);
        assert!(matches!(result, Err(StoreError::Composition(msg)) if msg.contains("get_a")));
    }

    #[test]
    fn duplicate_action_is_rejected() {
        let make = || {
            StoreFragment::new()
                .with_action("reset", action_creator(|_| Ok(Action::bare("RESET").into())))
        };
        assert!(matches!(
            combine_stores([make(), make()]),
            Err(StoreError::Composition(_))
        ));
    }

    #[test]
    fn initial_state_last_wins() {
        let first = StoreFragment::new().with_initial_state("count", json!(0));
        let second = StoreFragment::new().with_initial_state("count", json!(5));
        let combined = combine_stores([first, second]).expect("combine");
        assert_eq!(combined.initial_state.get("count"), Some(&json!(5)));
    }

    #[test]
    fn shared_fragment_is_merged_once() {
        let with_errors = |name: &str| combine_stores([named(name), error_store()]).expect("combine");
        let combined = combine_stores([with_errors("a"), with_errors("b"), error_store()])
            .expect("combine");

        let error_reducers = error_store().reducers().len();
        assert_eq!(combined.reducers().len(), error_reducers);
        assert!(combined.selectors.contains_key("getErrorForSelector"));
    }

    #[test]
    fn reducers_run_in_declaration_order() {
        let append = |suffix: &'static str| {
            StoreFragment::new().with_reducer(create_reducer(move |draft, _action| {
                let current = draft.get("trail").and_then(Value::as_str).unwrap_or("").to_string();
                draft.insert("trail", json!(format!("{current}{suffix}")));
                Ok(())
            }))
        };
        let combined = combine_stores([append("a"), append("b"), append("c")]).expect("combine");
        let state = combined.initial_state.clone();
        let next = combined.reduce(&state, &Action::bare("ANY")).expect("reduce");
        assert_eq!(next.get("trail"), Some(&json!("abc")));
    }
}
