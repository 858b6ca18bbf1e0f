//! Play-state listener registry.
//!
//! Listeners are identified by the `Arc` they were registered with, so adding
//! the same handle twice keeps a single registration.

use std::sync::Arc;

/// Callback receiving the new playing flag after each transition.
pub type PlayStateListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(ListenerId, PlayStateListener)>,
}

fn same_listener(a: &PlayStateListener, b: &PlayStateListener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl ListenerRegistry {
    /// Register `listener`, returning the existing id if already present.
    pub(crate) fn add(&mut self, listener: PlayStateListener) -> ListenerId {
        if let Some((id, _)) = self
            .entries
            .iter()
            .find(|(_, existing)| same_listener(existing, &listener))
        {
            return *id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, listener: &PlayStateListener) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|(_, existing)| !same_listener(existing, listener));
        self.entries.len() != before
    }

    pub(crate) fn remove_by_id(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    /// Copy of the current listeners, so callers can notify without holding
    /// the session lock.
    pub(crate) fn snapshot(&self) -> Vec<PlayStateListener> {
        self.entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
