//! Bidirectional key and id mapping for nodes.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::types::NodeId;

/// Append-only bidirectional mapping between external node keys and sequential ids.
///
/// Ids are dense and start at zero, so the reverse direction is a plain vector.
#[derive(Debug, Default)]
pub struct IdMap {
    by_key: FxHashMap<Arc<str>, NodeId>,
    by_id: Vec<Arc<str>>,
}

impl IdMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next newly seen key will receive.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.by_id.len() as u64)
    }

    /// Returns the id of `key`, if assigned.
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.by_key.get(key).copied()
    }

    /// Returns the key that received `id`, if any.
    pub fn key(&self, id: NodeId) -> Option<&str> {
        usize::try_from(id.0)
            .ok()
            .and_then(|idx| self.by_id.get(idx))
            .map(|key| key.as_ref())
    }

    /// Assigns the next id to `key`, or returns the existing one. The flag is true when
    /// a new id was assigned.
    pub fn assign(&mut self, key: &str) -> (NodeId, bool) {
        if let Some(id) = self.get(key) {
            return (id, false);
        }
        let id = self.next_id();
        let shared: Arc<str> = Arc::from(key);
        self.by_key.insert(shared.clone(), id);
        self.by_id.push(shared);
        (id, true)
    }

    /// Number of assigned ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when no key has been assigned.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Keys paired with their ids in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.by_id
            .iter()
            .enumerate()
            .map(|(idx, key)| (key.as_ref(), NodeId(idx as u64)))
    }
}
