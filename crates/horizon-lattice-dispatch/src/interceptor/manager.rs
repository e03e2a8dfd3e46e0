//! The interceptor registry.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Interceptor;

/// Handle of a registered interceptor.
///
/// Handles are never reused: after [`InterceptorManager::clear`] new
/// registrations get fresh handles, and stale ones eject nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

impl InterceptorId {
    /// Get the registration index this handle refers to.
    pub fn index(self) -> usize {
        self.0
    }
}

struct Registry<T> {
    // Handle of slots[0]; advanced by `clear` so handles stay unique
    base: usize,
    slots: Vec<Option<Arc<Interceptor<T>>>>,
}

/// An ordered registry of interceptors with stable handles.
///
/// Ejecting an interceptor leaves an empty slot behind, so handles issued
/// earlier keep referring to the same registration. The registry can be
/// changed at any time, including while requests are in flight; a request
/// works on the snapshot taken when it started.
pub struct InterceptorManager<T> {
    registry: RwLock<Registry<T>>,
}

impl<T> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self {
            registry: RwLock::new(Registry {
                base: 0,
                slots: Vec::new(),
            }),
        }
    }
}

impl<T: 'static> InterceptorManager<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interceptor, returning its handle.
    pub fn register(&self, interceptor: Interceptor<T>) -> InterceptorId {
        let mut registry = self.registry.write();
        let id = InterceptorId(registry.base + registry.slots.len());
        registry.slots.push(Some(Arc::new(interceptor)));
        tracing::trace!(
            target: "horizon_lattice_dispatch::interceptor",
            id = id.0,
            "interceptor registered"
        );
        id
    }

    /// Remove a registered interceptor.
    ///
    /// Unknown, stale and already-ejected handles are ignored.
    pub fn eject(&self, id: InterceptorId) {
        let mut registry = self.registry.write();
        let Some(index) = id.0.checked_sub(registry.base) else {
            return;
        };
        if let Some(slot) = registry.slots.get_mut(index)
            && slot.take().is_some()
        {
            tracing::trace!(
                target: "horizon_lattice_dispatch::interceptor",
                id = id.0,
                "interceptor ejected"
            );
        }
    }

    /// Remove every interceptor. All handles issued so far become invalid.
    pub fn clear(&self) {
        let mut registry = self.registry.write();
        let cleared = registry.slots.len();
        registry.base += cleared;
        registry.slots.clear();
    }

    /// Call `f` for each registered interceptor, in registration order.
    ///
    /// `f` runs on a snapshot, so it may register or eject interceptors.
    pub fn for_each_active<F>(&self, mut f: F)
    where
        F: FnMut(InterceptorId, &Interceptor<T>),
    {
        for (id, interceptor) in self.entries() {
            f(id, &interceptor);
        }
    }

    /// Number of registered (non-ejected) interceptors.
    pub fn len(&self) -> usize {
        self.registry.read().slots.iter().flatten().count()
    }

    /// Check if no interceptors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Interceptor<T>>> {
        self.registry.read().slots.iter().flatten().cloned().collect()
    }

    fn entries(&self) -> Vec<(InterceptorId, Arc<Interceptor<T>>)> {
        let registry = self.registry.read();
        registry
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref()
                    .map(|interceptor| (InterceptorId(registry.base + index), interceptor.clone()))
            })
            .collect()
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("InterceptorManager")
            .field("slots", &registry.slots.len())
            .field("active", &registry.slots.iter().flatten().count())
            .finish()
    }
}
