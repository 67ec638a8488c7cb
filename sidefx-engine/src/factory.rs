//! Side-effect factories
//!
//! A [`SideEffect`] closes over the caller's reduce, client dispatch and
//! optional server-mapping functions. Each call to [`SideEffect::wrap`] binds
//! those functions to a fresh manager for one unit, so independent managers
//! never share a registry.

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::manager::Wrapped;
use crate::pipeline::{DispatchFn, MapServerFn, Pipeline, ReduceFn};
use sidefx_types::Environment;
use std::fmt;
use std::sync::Arc;

/// A unit that can be wrapped: renders from props and may carry a label
pub trait Unit<P> {
    type Output;

    fn render(&self, props: &P) -> Self::Output;

    /// Own diagnostic label, if any
    fn label(&self) -> Option<&str> {
        None
    }
}

/// A [`Unit`] made from a render closure
pub struct FnUnit<F> {
    label: Option<String>,
    render: F,
}

/// Build a unit from a render closure
pub fn unit_fn<F>(render: F) -> FnUnit<F> {
    FnUnit {
        label: None,
        render,
    }
}

impl<F> FnUnit<F> {
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl<P, O, F> Unit<P> for FnUnit<F>
where
    F: Fn(&P) -> O,
{
    type Output = O;

    fn render(&self, props: &P) -> O {
        (self.render)(props)
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl<F> fmt::Debug for FnUnit<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnUnit").field("label", &self.label).finish_non_exhaustive()
    }
}

/// Build a factory from a reducer and a client dispatcher
pub fn create<P, S, R, D>(reduce: R, dispatch_client: D) -> SideEffect<P, S>
where
    R: Fn(&[P]) -> S + Send + Sync + 'static,
    D: Fn(&S) + Send + Sync + 'static,
{
    SideEffect {
        pipeline: Pipeline::new(Arc::new(reduce), Arc::new(dispatch_client), None),
        config: EngineConfig::default(),
    }
}

/// Build a factory whose non-interactive state passes through `map_server`
pub fn create_with_server_mapper<P, S, R, D, M>(
    reduce: R,
    dispatch_client: D,
    map_server: M,
) -> SideEffect<P, S>
where
    R: Fn(&[P]) -> S + Send + Sync + 'static,
    D: Fn(&S) + Send + Sync + 'static,
    M: Fn(S) -> S + Send + Sync + 'static,
{
    SideEffect {
        pipeline: Pipeline::new(
            Arc::new(reduce),
            Arc::new(dispatch_client),
            Some(Arc::new(map_server)),
        ),
        config: EngineConfig::default(),
    }
}

/// Reduce/dispatch/map functions plus the environment new managers start in
pub struct SideEffect<P, S> {
    pipeline: Pipeline<P, S>,
    config: EngineConfig,
}

impl<P, S> SideEffect<P, S> {
    pub fn builder() -> SideEffectBuilder<P, S> {
        SideEffectBuilder::default()
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Wrap `unit` into a new manager
    ///
    /// The manager's label is `SideEffect(<unit label>)`, falling back to the
    /// configured label when the unit has none. A blank unit label is rejected.
    pub fn wrap<U>(&self, unit: U) -> Result<Wrapped<U, P, S>, ConfigError>
    where
        U: Unit<P>,
    {
        let name = match unit.label() {
            Some(label) if label.trim().is_empty() => {
                return Err(ConfigError::InvalidUnit(
                    "unit label must not be blank".to_string(),
                ));
            }
            Some(label) => label.to_string(),
            None => self.config.fallback_label.clone(),
        };
        let label = format!("SideEffect({name})");
        tracing::debug!("wrapping {} ({})", label, self.config.environment);

        Ok(Wrapped::new(
            label,
            unit,
            self.pipeline.clone(),
            self.config.environment,
        ))
    }
}

impl<P, S> fmt::Debug for SideEffect<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideEffect")
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .finish()
    }
}

/// Step-by-step construction of a [`SideEffect`]
pub struct SideEffectBuilder<P, S> {
    reduce: Option<ReduceFn<P, S>>,
    dispatch_client: Option<DispatchFn<S>>,
    map_server: Option<MapServerFn<S>>,
    config: EngineConfig,
}

impl<P, S> Default for SideEffectBuilder<P, S> {
    fn default() -> Self {
        SideEffectBuilder {
            reduce: None,
            dispatch_client: None,
            map_server: None,
            config: EngineConfig::default(),
        }
    }
}

impl<P, S> SideEffectBuilder<P, S> {
    pub fn reduce(mut self, reduce: impl Fn(&[P]) -> S + Send + Sync + 'static) -> Self {
        self.reduce = Some(Arc::new(reduce));
        self
    }

    pub fn dispatch_client(mut self, dispatch: impl Fn(&S) + Send + Sync + 'static) -> Self {
        self.dispatch_client = Some(Arc::new(dispatch));
        self
    }

    pub fn map_server(mut self, map_server: impl Fn(S) -> S + Send + Sync + 'static) -> Self {
        self.map_server = Some(Arc::new(map_server));
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<SideEffect<P, S>, ConfigError> {
        let reduce = self.reduce.ok_or(ConfigError::MissingReduce)?;
        let dispatch_client = self.dispatch_client.ok_or(ConfigError::MissingDispatch)?;

        Ok(SideEffect {
            pipeline: Pipeline::new(reduce, dispatch_client, self.map_server),
            config: self.config,
        })
    }
}

impl<P, S> fmt::Debug for SideEffectBuilder<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideEffectBuilder")
            .field("reduce", &self.reduce.is_some())
            .field("dispatch_client", &self.dispatch_client.is_some())
            .field("map_server", &self.map_server.is_some())
            .field("config", &self.config)
            .finish()
    }
}
