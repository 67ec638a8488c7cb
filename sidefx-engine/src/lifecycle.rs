//! Lifecycle contract with the embedding UI layer
//!
//! The embedder calls [`Lifecycle::attach`] once per instance, then
//! [`Lifecycle::update`] zero or more times, then [`Lifecycle::detach`]
//! exactly once. [`Mounted`] packages that sequence as an RAII guard.

use crate::factory::Unit;
use crate::manager::Wrapped;
use sidefx_types::{InstanceId, ShallowEq};
use std::fmt;
use std::sync::Arc;

/// The three lifecycle events a manager reacts to
pub trait Lifecycle<P> {
    /// Register a new instance at the tail of the registry and re-reduce
    fn attach(&self, props: P) -> InstanceId;

    /// Offer new props to a live instance
    ///
    /// Returns whether the update committed. Props shallow-equal to the
    /// current ones are dropped without re-reducing or re-rendering.
    fn update(&self, id: InstanceId, props: P) -> bool;

    /// Remove a live instance and re-reduce over the remaining ones
    fn detach(&self, id: InstanceId);
}

/// A mounted instance that detaches from its manager when dropped
pub struct Mounted<U, P, S>
where
    P: ShallowEq + Clone,
{
    manager: Arc<Wrapped<U, P, S>>,
    id: InstanceId,
    detached: bool,
}

impl<U, P, S> Mounted<U, P, S>
where
    P: ShallowEq + Clone,
{
    pub(crate) fn new(manager: Arc<Wrapped<U, P, S>>, id: InstanceId) -> Self {
        Mounted {
            manager,
            id,
            detached: false,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn manager(&self) -> &Arc<Wrapped<U, P, S>> {
        &self.manager
    }

    /// Offer new props; see [`Lifecycle::update`]
    pub fn update(&self, props: P) -> bool {
        self.manager.update(self.id, props)
    }

    pub fn render(&self) -> Option<U::Output>
    where
        U: Unit<P>,
    {
        self.manager.render(self.id)
    }

    /// Detach now instead of at drop
    pub fn unmount(mut self) {
        self.detach_once();
    }

    fn detach_once(&mut self) {
        if !self.detached {
            self.detached = true;
            self.manager.detach(self.id);
        }
    }
}

impl<U, P, S> Drop for Mounted<U, P, S>
where
    P: ShallowEq + Clone,
{
    fn drop(&mut self) {
        self.detach_once();
    }
}

impl<U, P, S> fmt::Debug for Mounted<U, P, S>
where
    P: ShallowEq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mounted")
            .field("label", &self.manager.label())
            .field("id", &self.id)
            .field("detached", &self.detached)
            .finish()
    }
}
