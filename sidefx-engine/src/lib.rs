//! sidefx Registry-and-Reduction Engine
//!
//! This crate folds the props of many live instances of one wrapped unit into
//! a single derived state and drives a side effect from it once per relevant
//! change. Instances anywhere in a tree contribute to the same state without a
//! coordinator owning them.
//!
//! # Architecture
//!
//! A [`SideEffect`] factory holds the caller's three functions:
//!
//! - **reduce**: ordered props of every live instance -> state
//! - **dispatch_client**: side effect run with each new state (interactive)
//! - **map_server** (optional): post-processing of the state (non-interactive)
//!
//! [`SideEffect::wrap`] binds them to a [`Wrapped`] unit, which is the manager:
//! one ordered registry, one cached state and one environment flag.
//!
//! ```text
//! attach / update / detach -> registry -> reduce -> dispatch_client (interactive)
//!                                               \-> map_server -> cache (non-interactive)
//! ```
//!
//! ## Key Properties
//!
//! - **Attachment order**: reducers see props in the order instances attached
//! - **Synchronous**: the state is recomputed before every lifecycle call returns
//! - **No-op updates**: shallow-equal props skip both reduce and dispatch
//! - **Explicit reset**: non-interactive passes end with [`Wrapped::finalize`],
//!   which takes the state and empties the registry
//!
//! # Example
//!
//! ```rust
//! use sidefx_engine::prelude::*;
//! use std::sync::Arc;
//!
//! fn join_titles(props: &[PropsBag]) -> String {
//!     props
//!         .iter()
//!         .filter_map(|p| p.get("title").and_then(|v| v.to_text()))
//!         .collect::<Vec<_>>()
//!         .join(" ")
//! }
//!
//! let title = create(join_titles, |_: &String| {})
//!     .with_environment(Environment::NonInteractive)
//!     .wrap(unit_fn(|_: &PropsBag| ()).labeled("Title"))
//!     .unwrap();
//! let title = Arc::new(title);
//!
//! let _page = title.mount(PropsBag::new().with("title", "Docs"));
//! let _section = title.mount(PropsBag::new().with("title", "Install"));
//!
//! assert_eq!(title.peek().as_deref(), Some("Docs Install"));
//! assert_eq!(title.finalize().unwrap().as_deref(), Some("Docs Install"));
//! assert!(title.is_empty());
//! ```

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod factory;
pub mod lifecycle;
pub mod manager;
pub mod metrics;
pub mod pipeline;
pub mod registry;

pub use config::EngineConfig;
pub use error::{ConfigError, Error, PreconditionError};
pub use factory::{create, create_with_server_mapper, unit_fn, FnUnit, SideEffect, SideEffectBuilder, Unit};
pub use lifecycle::{Lifecycle, Mounted};
pub use manager::Wrapped;
pub use metrics::{EmitMetrics, MetricsSnapshot};
pub use pipeline::{DispatchFn, MapServerFn, Pipeline, ReduceFn, Revision, Routed};
pub use registry::{Instance, Registry, UpdateOutcome};
pub use sidefx_types::{shallow_equal, Environment, InstanceId, PropValue, PropsBag, PropsMap, ShallowEq};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{ConfigError, PreconditionError};
    pub use crate::factory::{create, create_with_server_mapper, unit_fn, SideEffect, Unit};
    pub use crate::lifecycle::{Lifecycle, Mounted};
    pub use crate::manager::Wrapped;
    pub use sidefx_types::{Environment, InstanceId, PropValue, PropsBag, ShallowEq};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_basic_usage() {
        let wrapped = create(|props: &[i64]| props.len(), |_: &usize| {})
            .wrap(unit_fn(|_: &i64| ()))
            .unwrap();
        assert_eq!(wrapped.peek(), None);
        assert_eq!(wrapped.revision(), crate::Revision::ZERO);
    }
}
