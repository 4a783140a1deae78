//! # storekit-core
//!
//! Composable stores for server-backed state - THE LOGIC.
//!
//! A store is assembled from fragments. Each fragment declares initial
//! state slices, action creators, controls, reducers, resolvers and
//! selectors. The crate provides:
//! - deterministic keys for parameter objects (`key`)
//! - a copy-on-write reducer builder (`reducer`)
//! - a shared error sub-store (`error_store`)
//! - a factory for request-backed fetch stores (`fetch`)
//! - a fail-fast combinator (`combine`)
//! - a reference registry that drives routines and resolvers (`registry`)
//!
//! ## Architectural Constraints
//!
//! - Transport-agnostic: every request is an injected control callback
//! - The published state is never mutated; reducers return a new value or
//!   the same reference
//! - No runtime is started here; only `tokio::sync` primitives are used

// =============================================================================
// MODULES
// =============================================================================

pub mod combine;
pub mod error_store;
pub mod fetch;
pub mod fragment;
pub mod key;
pub mod naming;
pub mod reducer;
pub mod registry;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Action, BoxFuture, Dispatchable, FetchResult, Params, Routine, ServiceError, State, StoreError,
};

// =============================================================================
// RE-EXPORTS: Store Building
// =============================================================================

pub use combine::combine_stores;
pub use error_store::error_store;
pub use fetch::{FetchStore, FetchStoreOptions, create_fetch_store};
pub use fragment::{ActionCreator, Control, Selector, StoreFragment, action_creator, control, selector};
pub use key::{stringify_args, stringify_params, stringify_value};
pub use naming::FetchNames;
pub use reducer::{Draft, Reducer, create_reducer};
pub use registry::Registry;
