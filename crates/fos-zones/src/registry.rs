//! Pending and lost registries
//!
//! Both sets are ordered by `ZoneId`, which is allocated in registration
//! order, so iteration is FIFO.

use std::collections::BTreeSet;

use crate::ZoneId;

/// Pending/lost bookkeeping for one engine
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    pending: BTreeSet<ZoneId>,
    lost: BTreeSet<ZoneId>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a zone for placement. A lost zone moves back to pending.
    pub fn push_pending(&mut self, id: ZoneId) -> bool {
        self.lost.remove(&id);
        self.pending.insert(id)
    }

    /// Record a failed attempt
    pub fn mark_lost(&mut self, id: ZoneId) {
        self.pending.remove(&id);
        self.lost.insert(id);
    }

    /// Remove a zone from both sets. Returns true if it was in either.
    pub fn forget(&mut self, id: ZoneId) -> bool {
        let pending = self.pending.remove(&id);
        let lost = self.lost.remove(&id);
        pending || lost
    }

    /// Move every lost zone back to pending, returning how many moved
    pub fn requeue_lost(&mut self) -> usize {
        let lost = std::mem::take(&mut self.lost);
        let count = lost.len();
        self.pending.extend(lost);
        count
    }

    /// First `n` pending zones in registration order
    pub fn pending_batch(&self, n: usize) -> Vec<ZoneId> {
        self.pending.iter().take(n).copied().collect()
    }

    pub fn pending_ids(&self) -> Vec<ZoneId> {
        self.pending.iter().copied().collect()
    }

    pub fn lost_ids(&self) -> Vec<ZoneId> {
        self.lost.iter().copied().collect()
    }

    pub fn is_pending(&self, id: ZoneId) -> bool {
        self.pending.contains(&id)
    }

    pub fn is_lost(&self, id: ZoneId) -> bool {
        self.lost.contains(&id)
    }

    pub fn contains(&self, id: ZoneId) -> bool {
        self.is_pending(id) || self.is_lost(id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn lost_len(&self) -> usize {
        self.lost.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.lost.is_empty()
    }
}
