use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;
use slabmap::SlabMap;

use crate::VecChanges;

#[cfg(test)]
mod tests;

/// Receives the finished changes of one transaction.
///
/// The cursor is rewound before each listener is called.
pub trait ListChangeListener<T> {
    fn on_changed(&self, changes: &mut VecChanges<T>);
}
impl<T, F: Fn(&mut VecChanges<T>)> ListChangeListener<T> for F {
    fn on_changed(&self, changes: &mut VecChanges<T>) {
        self(changes)
    }
}

/// Identifies one registration in a [`ListenerSet`].
///
/// Keys are never reused, so removing with a stale key is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    slot: usize,
    seq: u64,
}

/// Registered listeners of one source, dispatched in registration order.
///
/// Registration is additive: the same listener added twice is called twice.
pub struct ListenerSet<L> {
    entries: SlabMap<Entry<L>>,
    next_seq: u64,
}

struct Entry<L> {
    seq: u64,
    listener: L,
}

impl<L> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> ListenerSet<L> {
    pub fn new() -> Self {
        Self {
            entries: SlabMap::new(),
            next_seq: 0,
        }
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn insert(&mut self, listener: L) -> ListenerKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        let slot = self.entries.insert(Entry { seq, listener });
        ListenerKey { slot, seq }
    }

    /// Returns `false` if `key` was already removed.
    pub fn remove(&mut self, key: ListenerKey) -> bool {
        match self.entries.get(key.slot) {
            Some(e) if e.seq == key.seq => {
                self.entries.remove(key.slot);
                true
            }
            _ => false,
        }
    }

    /// Copies the current registrations so dispatch tolerates changes made by listeners.
    pub fn snapshot(&self) -> Vec<(ListenerKey, L)>
    where
        L: Clone,
    {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(slot, e)| {
                let key = ListenerKey { slot, seq: e.seq };
                (key, e.listener.clone())
            })
            .collect();
        entries.sort_by_key(|(key, _)| key.seq);
        entries
    }
}

#[derive_ex(Clone(bound()))]
pub(crate) enum ListListener<T: 'static> {
    Invalidation(Rc<dyn Fn()>),
    Change(Rc<dyn ListChangeListener<T>>),
    Weak(Weak<dyn ListChangeListener<T>>),
}

/// Listener registry shared by every observable list node.
pub(crate) struct ListListeners<T: 'static>(RefCell<ListenerSet<ListListener<T>>>);

impl<T: 'static> ListListeners<T> {
    pub fn new() -> Self {
        Self(RefCell::new(ListenerSet::new()))
    }
    pub fn add(&self, listener: ListListener<T>) -> ListenerKey {
        self.0.borrow_mut().insert(listener)
    }
    pub fn remove(&self, key: ListenerKey) -> bool {
        self.0.borrow_mut().remove(key)
    }
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn notify(&self, changes: &mut VecChanges<T>) {
        let listeners = self.0.borrow().snapshot();
        for (key, listener) in listeners {
            match listener {
                ListListener::Invalidation(f) => f(),
                ListListener::Change(l) => {
                    changes.reset();
                    l.on_changed(changes);
                }
                ListListener::Weak(l) => {
                    if let Some(l) = l.upgrade() {
                        changes.reset();
                        l.on_changed(changes);
                    } else {
                        tracing::debug!(?key, "dropping dead weak listener");
                        self.remove(key);
                    }
                }
            }
        }
    }
}
