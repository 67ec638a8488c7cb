//! The manager behind one wrapped unit
//!
//! A [`Wrapped`] owns the registry of live instances, the cached state and the
//! environment flag. Every attach, accepted update and detach re-runs the
//! reduction pipeline before returning, so the state always reflects the
//! registry as of the last mutation.

use crate::error::PreconditionError;
use crate::factory::Unit;
use crate::lifecycle::{Lifecycle, Mounted};
use crate::metrics::{EmitMetrics, MetricsSnapshot};
use crate::pipeline::{Pipeline, Revision};
use crate::registry::{Registry, UpdateOutcome};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use sidefx_types::{Environment, InstanceId, ShallowEq};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

struct Inner<P, S> {
    registry: Registry<P>,
    state: Option<S>,
}

/// A unit wrapped by a side-effect factory, together with its manager
pub struct Wrapped<U, P, S> {
    /// Diagnostic label, `SideEffect(<unit label>)`
    label: String,

    unit: U,

    pipeline: Pipeline<P, S>,

    /// Registry and cached state, always mutated together
    inner: Mutex<Inner<P, S>>,

    environment: RwLock<Environment>,

    /// Last allocated instance id
    next_id: AtomicU64,

    revision: AtomicU64,

    /// Serializes mutation plus emit across threads. The cell is set while
    /// the pipeline runs, so a same-thread reentry can be told apart.
    op_lock: ReentrantMutex<Cell<bool>>,

    metrics: EmitMetrics,
}

/// Clears the emitting flag even when a caller-supplied closure panics
struct EmitGuard<'a>(&'a Cell<bool>);

impl Drop for EmitGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

type OpGuard<'a> = ReentrantMutexGuard<'a, Cell<bool>>;

impl<U, P, S> Wrapped<U, P, S> {
    pub(crate) fn new(
        label: String,
        unit: U,
        pipeline: Pipeline<P, S>,
        environment: Environment,
    ) -> Self {
        Wrapped {
            metrics: EmitMetrics::new(label.clone()),
            label,
            unit,
            pipeline,
            inner: Mutex::new(Inner {
                registry: Registry::new(),
                state: None,
            }),
            environment: RwLock::new(environment),
            next_id: AtomicU64::new(0),
            revision: AtomicU64::new(0),
            op_lock: ReentrantMutex::new(Cell::new(false)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The wrapped unit itself
    pub fn unit(&self) -> &U {
        &self.unit
    }

    pub fn environment(&self) -> Environment {
        *self.environment.read()
    }

    /// Swap the environment flag of this manager
    ///
    /// Meant for test harnesses that drive one manager through both contexts.
    /// The next pipeline run routes its state by the new flag.
    pub fn set_environment(&self, environment: Environment) {
        let previous = std::mem::replace(&mut *self.environment.write(), environment);
        if previous != environment {
            tracing::debug!("{}: environment {} -> {}", self.label, previous, environment);
        }
    }

    /// Current cached state, without touching the registry
    pub fn peek(&self) -> Option<S>
    where
        S: Clone,
    {
        self.inner.lock().state.clone()
    }

    /// Take the cached state and drop every live instance
    ///
    /// Must run once at the end of every non-interactive pass, otherwise the
    /// instances of that pass leak into the next one. Fails without touching
    /// anything when the manager is interactive.
    pub fn finalize(&self) -> Result<Option<S>, PreconditionError> {
        if self.environment().is_interactive() {
            tracing::warn!("{}: finalize called in an interactive environment", self.label);
            return Err(PreconditionError::FinalizeInInteractive {
                label: self.label.clone(),
            });
        }
        let _op = self.begin("finalize");

        let (state, dropped) = {
            let mut inner = self.inner.lock();
            let dropped = inner.registry.len();
            inner.registry.clear();
            (inner.state.take(), dropped)
        };

        self.metrics.record_finalize();
        tracing::debug!("{}: finalized, dropped {} instances", self.label, dropped);
        Ok(state)
    }

    /// Alias of [`Wrapped::finalize`]
    pub fn rewind(&self) -> Result<Option<S>, PreconditionError> {
        self.finalize()
    }

    /// Number of pipeline runs so far
    pub fn revision(&self) -> Revision {
        Revision(self.revision.load(Ordering::SeqCst))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Zero every metrics counter; the revision is left alone
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.inner.lock().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().registry.is_empty()
    }

    /// Live instance ids in attachment order
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.inner.lock().registry.ids()
    }

    pub fn is_live(&self, id: InstanceId) -> bool {
        self.inner.lock().registry.contains(id)
    }

    pub fn props_of(&self, id: InstanceId) -> Option<P>
    where
        P: Clone,
    {
        self.inner.lock().registry.get(id).map(|inst| inst.props.clone())
    }

    /// Forward the instance's current props unchanged to the wrapped unit
    pub fn render(&self, id: InstanceId) -> Option<U::Output>
    where
        U: Unit<P>,
        P: Clone,
    {
        let props = self.props_of(id)?;
        Some(self.unit.render(&props))
    }

    /// Attach `props` and return a guard that detaches on drop
    pub fn mount(self: &Arc<Self>, props: P) -> Mounted<U, P, S>
    where
        P: ShallowEq + Clone,
    {
        let id = self.attach(props);
        Mounted::new(Arc::clone(self), id)
    }

    /// Enter a mutating operation
    ///
    /// Other threads block here until the running operation and its emit
    /// finish. Reentry from the thread that is running the pipeline panics.
    fn begin(&self, operation: &str) -> OpGuard<'_> {
        let op = self.op_lock.lock();
        if op.get() {
            panic!(
                "{}: {} called while emit_change was running; \
                 reducers and dispatchers must not mutate their own manager",
                self.label, operation
            );
        }
        op
    }

    /// Reduce the props of every live instance and route the state
    fn emit_change(&self, op: &OpGuard<'_>)
    where
        P: Clone,
    {
        op.set(true);
        let _guard = EmitGuard(op);

        let props = self.inner.lock().registry.props();
        let environment = self.environment();

        let started = Instant::now();
        let (state, routed) = self.pipeline.run(&props, environment);
        self.metrics.record_reduce(routed, started.elapsed());

        let revision = Revision(self.revision.fetch_add(1, Ordering::SeqCst)).next();
        tracing::trace!(
            "{}: emit_change {} over {} instances ({:?})",
            self.label,
            revision,
            props.len(),
            routed
        );

        self.inner.lock().state = Some(state);
    }
}

impl<U, P, S> Lifecycle<P> for Wrapped<U, P, S>
where
    P: ShallowEq + Clone,
{
    fn attach(&self, props: P) -> InstanceId {
        let op = self.begin("attach");

        let id = InstanceId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.inner.lock().registry.attach(id, props);
        self.metrics.record_attach();
        tracing::debug!("{}: attached {}", self.label, id);

        self.emit_change(&op);
        id
    }

    fn update(&self, id: InstanceId, props: P) -> bool {
        let op = self.begin("update");

        let outcome = self.inner.lock().registry.update(id, props);
        match outcome {
            UpdateOutcome::Committed => {
                self.metrics.record_update(true);
                tracing::debug!("{}: updated {}", self.label, id);
                self.emit_change(&op);
                true
            }
            UpdateOutcome::Unchanged => {
                self.metrics.record_update(false);
                tracing::trace!("{}: update of {} skipped, props unchanged", self.label, id);
                false
            }
            UpdateOutcome::Missing => {
                tracing::warn!("{}: update for {} which is not live", self.label, id);
                false
            }
        }
    }

    fn detach(&self, id: InstanceId) {
        let op = self.begin("detach");

        let removed = self.inner.lock().registry.detach(id);
        if removed.is_none() {
            tracing::debug!("{}: detach of {} ignored, not live", self.label, id);
            return;
        }

        self.metrics.record_detach();
        tracing::debug!("{}: detached {}", self.label, id);
        self.emit_change(&op);
    }
}

impl<U, P, S> fmt::Debug for Wrapped<U, P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("label", &self.label)
            .field("environment", &self.environment())
            .field("instances", &self.len())
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}
