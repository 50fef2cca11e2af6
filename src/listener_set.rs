use std::collections::{BTreeMap, HashMap};

use crate::listener::{AnyListener, Listener, ListenerId};

pub(crate) trait Identified: Clone {
    fn identity(&self) -> ListenerId;
}

impl<T> Identified for Listener<T> {
    fn identity(&self) -> ListenerId {
        self.id()
    }
}

impl<T> Identified for AnyListener<T> {
    fn identity(&self) -> ListenerId {
        self.id()
    }
}

/// Set of listeners keyed by identity which remembers insertion order.
/// Re-inserting a present listener keeps its original position.
pub(crate) struct ListenerSet<L> {
    order: BTreeMap<u64, L>,
    index: HashMap<ListenerId, u64>,
    next_seq: u64,
}

impl<L: Identified> ListenerSet<L> {
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }
    /// Returns ```false``` if the listener was already present
    pub fn insert(&mut self, listener: L) -> bool {
        let id = listener.identity();
        if self.index.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(id, seq);
        self.order.insert(seq, listener);
        true
    }
    /// Returns the removed listener. The caller decides where it gets dropped.
    pub fn remove(&mut self, id: ListenerId) -> Option<L> {
        let seq = self.index.remove(&id)?;
        self.order.remove(&seq)
    }
    pub fn contains(&self, id: ListenerId) -> bool {
        self.index.contains_key(&id)
    }
    pub fn len(&self) -> usize {
        self.index.len()
    }
    /// Copy of current members in insertion order
    pub fn snapshot(&self) -> Vec<L> {
        self.order.values().cloned().collect()
    }
}

impl<L: Identified> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}
