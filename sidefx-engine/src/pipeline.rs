//! Reduction pipeline
//!
//! Turns the ordered props of every live instance into one state and routes it
//! according to the execution environment: interactive managers hand the state
//! to the client dispatcher, non-interactive ones optionally pass it through the
//! server mapper and keep it for `peek`/`finalize`.

use sidefx_types::Environment;
use std::fmt;
use std::sync::Arc;

/// Folds the ordered props of live instances into one state
pub type ReduceFn<P, S> = Arc<dyn Fn(&[P]) -> S + Send + Sync>;

/// Interactive side effect driven by each new state
pub type DispatchFn<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Non-interactive post-processing applied before the state is cached
pub type MapServerFn<S> = Arc<dyn Fn(S) -> S + Send + Sync>;

/// Number of reductions a manager has run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(pub u64);

impl Revision {
    pub const ZERO: Revision = Revision(0);

    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// What one pipeline run did besides producing the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Handed to the client dispatcher
    Dispatched,

    /// Passed through the server mapper before caching
    ServerMapped,

    /// Cached as the raw reducer output
    Cached,
}

/// The caller-supplied closures of one factory
pub struct Pipeline<P, S> {
    reduce: ReduceFn<P, S>,
    dispatch_client: DispatchFn<S>,
    map_server: Option<MapServerFn<S>>,
}

impl<P, S> Clone for Pipeline<P, S> {
    fn clone(&self) -> Self {
        Pipeline {
            reduce: Arc::clone(&self.reduce),
            dispatch_client: Arc::clone(&self.dispatch_client),
            map_server: self.map_server.clone(),
        }
    }
}

impl<P, S> fmt::Debug for Pipeline<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("map_server", &self.map_server.is_some())
            .finish_non_exhaustive()
    }
}

impl<P, S> Pipeline<P, S> {
    pub fn new(
        reduce: ReduceFn<P, S>,
        dispatch_client: DispatchFn<S>,
        map_server: Option<MapServerFn<S>>,
    ) -> Self {
        Pipeline {
            reduce,
            dispatch_client,
            map_server,
        }
    }

    pub fn has_server_mapper(&self) -> bool {
        self.map_server.is_some()
    }

    /// Reduce `props` and route the result
    ///
    /// Returns the value to cache. In an interactive environment that is the
    /// raw reducer output, already handed to the dispatcher.
    pub fn run(&self, props: &[P], environment: Environment) -> (S, Routed) {
        let state = (self.reduce)(props);

        if environment.is_interactive() {
            (self.dispatch_client)(&state);
            return (state, Routed::Dispatched);
        }

        match &self.map_server {
            Some(map_server) => (map_server(state), Routed::ServerMapped),
            None => (state, Routed::Cached),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn join(props: &[&'static str]) -> String {
        props.join(" ")
    }

    fn pipeline(
        recorded: Arc<Mutex<Vec<String>>>,
        map: Option<MapServerFn<String>>,
    ) -> Pipeline<&'static str, String> {
        Pipeline::new(
            Arc::new(join),
            Arc::new(move |state: &String| recorded.lock().push(state.clone())),
            map,
        )
    }

    #[test]
    fn test_interactive_dispatches_raw_state() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let map: MapServerFn<String> = Arc::new(|s: String| format!("<{s}>"));
        let p = pipeline(recorded.clone(), Some(map));

        let (state, routed) = p.run(&["A", "B"], Environment::Interactive);
        assert_eq!(state, "A B");
        assert_eq!(routed, Routed::Dispatched);
        assert_eq!(*recorded.lock(), ["A B"]);
    }

    #[test]
    fn test_non_interactive_maps_without_dispatch() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let map: MapServerFn<String> = Arc::new(|s: String| format!("<{s}>"));
        let p = pipeline(recorded.clone(), Some(map));

        let (state, routed) = p.run(&["A"], Environment::NonInteractive);
        assert_eq!(state, "<A>");
        assert_eq!(routed, Routed::ServerMapped);
        assert!(recorded.lock().is_empty());
    }

    #[test]
    fn test_non_interactive_without_mapper_caches_raw() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let p = pipeline(recorded.clone(), None);

        let (state, routed) = p.run(&[], Environment::NonInteractive);
        assert_eq!(state, "");
        assert_eq!(routed, Routed::Cached);
        assert!(!p.has_server_mapper());
    }

    #[test]
    fn test_revision_ordering() {
        assert!(Revision::ZERO < Revision(1));
        assert_eq!(Revision::ZERO.next(), Revision(1));
        assert_eq!(Revision(4).to_string(), "r4");
    }
}
