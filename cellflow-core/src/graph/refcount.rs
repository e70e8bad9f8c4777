//! Ref-counted reachability set.
//!
//! Tracks, per node, how many upstream trigger paths could still make the node
//! fire in the current cycle. Building a plan increments once per visit; a
//! cycle decrements once per upstream source that failed to resolve.

use std::collections::HashMap;

use super::NodeId;

#[derive(Debug, Clone, Default)]
pub struct RefCount {
    counts: HashMap<NodeId, usize>,
}

impl RefCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, id: NodeId) {
        *self.counts.entry(id).or_insert(0) += 1;
    }

    /// Decrement the count of `id`.
    ///
    /// Returns `true` exactly when this call brought the count to zero.
    /// Untracked nodes and nodes already at zero are left alone.
    pub fn decrement(&mut self, id: NodeId) -> bool {
        match self.counts.get_mut(&id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                *count == 0
            }
            _ => false,
        }
    }

    pub fn get(&self, id: NodeId) -> usize {
        self.counts.get(&id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeat_increments() {
        let mut rc = RefCount::new();
        let id = NodeId::new();
        rc.increment(id);
        rc.increment(id);
        assert_eq!(rc.get(id), 2);

        assert!(!rc.decrement(id));
        assert!(rc.decrement(id));
        assert_eq!(rc.get(id), 0);
    }

    #[test]
    fn decrement_ignores_unknown_and_zero() {
        let mut rc = RefCount::new();
        let id = NodeId::new();
        assert!(!rc.decrement(id));

        rc.increment(id);
        assert!(rc.decrement(id));
        assert!(!rc.decrement(id));
    }

    #[test]
    fn clones_are_independent() {
        let mut rc = RefCount::new();
        let id = NodeId::new();
        rc.increment(id);

        let mut copy = rc.clone();
        assert!(copy.decrement(id));
        assert_eq!(rc.get(id), 1);
    }
}
