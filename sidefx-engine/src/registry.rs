//! Ordered registry of live instances
//!
//! The registry keeps every attached instance exactly once, in attachment
//! order. Updates replace props in place so an instance never moves.

use sidefx_types::{InstanceId, ShallowEq};

/// One live registration
#[derive(Debug, Clone)]
pub struct Instance<P> {
    /// Identity handed back to the embedder on attach
    pub id: InstanceId,

    /// Props from the last accepted update
    pub props: P,
}

/// Outcome of offering new props to a registered instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Props replaced; the state must be recomputed
    Committed,

    /// New props were shallow-equal to the current ones
    Unchanged,

    /// No live instance with that id
    Missing,
}

/// Live instances in attachment order
#[derive(Debug, Clone)]
pub struct Registry<P> {
    instances: Vec<Instance<P>>,
}

impl<P> Registry<P> {
    pub fn new() -> Self {
        Registry {
            instances: Vec::new(),
        }
    }

    /// Append an instance at the tail
    pub fn attach(&mut self, id: InstanceId, props: P) {
        debug_assert!(
            !self.contains(id),
            "instance {id} attached twice to the same registry"
        );
        self.instances.push(Instance { id, props });
    }

    /// Remove the first instance with this id
    pub fn detach(&mut self, id: InstanceId) -> Option<Instance<P>> {
        let index = self.instances.iter().position(|inst| inst.id == id)?;
        Some(self.instances.remove(index))
    }

    /// Replace props unless they are shallow-equal to the current ones
    pub fn update(&mut self, id: InstanceId, props: P) -> UpdateOutcome
    where
        P: ShallowEq,
    {
        match self.get_mut(id) {
            Some(instance) if instance.props.shallow_eq(&props) => UpdateOutcome::Unchanged,
            Some(instance) => {
                instance.props = props;
                UpdateOutcome::Committed
            }
            None => UpdateOutcome::Missing,
        }
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance<P>> {
        self.instances.iter().find(|inst| inst.id == id)
    }

    fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance<P>> {
        self.instances.iter_mut().find(|inst| inst.id == id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    /// Props of every live instance, in attachment order
    pub fn props(&self) -> Vec<P>
    where
        P: Clone,
    {
        self.instances.iter().map(|inst| inst.props.clone()).collect()
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(|inst| inst.id).collect()
    }

    /// Drop every instance
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<P> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}
