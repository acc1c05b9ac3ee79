//! The `missing`/`orphan`/`unviable` sets (spec.md §4.4): blocks the DAG can't place yet because
//! their parent hasn't arrived, plus the closure that releases them once it does.

use std::{collections::HashSet, num::NonZeroUsize, sync::Arc};

use features::Feature;
use lru::LruCache;
use types::combined::ForkedSignedBeaconBlock;
use types::primitives::H256;

/// Round-number default (spec.md §9's resolved Open Question: "choose LRU by default"); a few
/// hundred orphans is enough to ride out a short gossip re-ordering without holding unbounded
/// memory for blocks that will likely never land.
pub const DEFAULT_ORPHAN_CAPACITY: usize = 256;

/// Holds blocks whose parent is unknown (`orphan`), tracks roots advertised but not yet received
/// (`missing`), and roots that can never become canonical (`unviable`) so the network layer stops
/// re-requesting them. `orphan` capacity is enforced on every insert; which entry is sacrificed
/// when full is governed by [`Feature::PreferOldestOrphanEviction`] (spec.md §9).
pub struct Quarantine {
    missing: HashSet<H256>,
    orphans: LruCache<H256, Arc<ForkedSignedBeaconBlock>>,
    unviable: HashSet<H256>,
    capacity: usize,
}

impl Default for Quarantine {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ORPHAN_CAPACITY)
    }
}

impl Quarantine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let unbounded = NonZeroUsize::new(usize::MAX).unwrap_or(NonZeroUsize::MIN);

        Self {
            missing: HashSet::new(),
            orphans: LruCache::new(unbounded),
            unviable: HashSet::new(),
            capacity,
        }
    }

    pub fn add_missing(&mut self, root: H256) {
        self.missing.insert(root);
    }

    pub fn remove_missing(&mut self, root: H256) {
        self.missing.remove(&root);
    }

    #[must_use]
    pub fn is_missing(&self, root: H256) -> bool {
        self.missing.contains(&root)
    }

    #[must_use]
    pub fn is_unviable(&self, root: H256) -> bool {
        self.unviable.contains(&root)
    }

    /// spec.md §4.4: "`add_orphan` MUST enforce an upper bound ... and drop on overflow; dropped
    /// entries return `false`." A block whose parent is already known unviable is rejected
    /// outright rather than held, and is itself recorded unviable (transitivity, spec.md §4.4/§8
    /// scenario 6).
    pub fn add_orphan(&mut self, block: Arc<ForkedSignedBeaconBlock>) -> bool {
        let root = block.message_hash_tree_root();
        let parent_root = block.parent_root();

        if self.unviable.contains(&parent_root) {
            self.unviable.insert(root);
            return false;
        }

        if self.orphans.contains(&root) {
            return true;
        }

        if self.orphans.len() >= self.capacity {
            if Feature::PreferOldestOrphanEviction.is_enabled() {
                self.orphans.pop_lru();
            } else {
                return false;
            }
        }

        self.orphans.put(root, block);

        true
    }

    /// `pop(root)` per spec.md §4.4: every orphan whose `parent_root == root`, removed atomically
    /// so a concurrent inspection never observes a partially-released batch (we're single
    /// cooperative-threaded per spec.md §5, but the atomicity is part of the contract regardless).
    pub fn pop(&mut self, root: H256) -> Vec<Arc<ForkedSignedBeaconBlock>> {
        let matching: Vec<H256> = self
            .orphans
            .iter()
            .filter(|(_, block)| block.parent_root() == root)
            .map(|(root, _)| *root)
            .collect();

        matching
            .into_iter()
            .filter_map(|root| self.orphans.pop(&root))
            .collect()
    }

    /// Unviability is transitive (spec.md §4.4): marking `root` unviable also marks every orphan
    /// descending from it, evicting them from `orphan` as it goes.
    pub fn mark_unviable(&mut self, root: H256) {
        self.unviable.insert(root);
        self.missing.remove(&root);

        let mut frontier = vec![root];

        while let Some(current) = frontier.pop() {
            let children: Vec<H256> = self
                .orphans
                .iter()
                .filter(|(_, block)| block.parent_root() == current)
                .map(|(root, _)| *root)
                .collect();

            for child in children {
                self.orphans.pop(&child);
                self.unviable.insert(child);
                frontier.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use types::phase0;

    use super::*;

    fn block(parent_root: H256, slot: u64) -> Arc<ForkedSignedBeaconBlock> {
        let mut message = phase0::BeaconBlock::default();
        message.slot = types::primitives::Slot::new(slot);
        message.parent_root = parent_root;

        Arc::new(ForkedSignedBeaconBlock::Phase0(phase0::SignedBeaconBlock {
            message,
            ..Default::default()
        }))
    }

    #[test]
    fn add_orphan_then_pop_returns_exactly_the_added_children() {
        let mut quarantine = Quarantine::new();
        let parent_root = H256::repeat_byte(1);

        let first = block(parent_root, 1);
        let second = block(parent_root, 2);

        assert!(quarantine.add_orphan(first.clone()));
        assert!(quarantine.add_orphan(second.clone()));

        let released = quarantine.pop(parent_root);

        assert_eq!(released.len(), 2);
        assert!(quarantine.pop(parent_root).is_empty());
    }

    #[test]
    fn capacity_overflow_drops_the_new_orphan_by_default() {
        let mut quarantine = Quarantine::with_capacity(1);
        let parent_root = H256::repeat_byte(1);

        assert!(quarantine.add_orphan(block(parent_root, 1)));
        assert!(!quarantine.add_orphan(block(parent_root, 2)));
        assert_eq!(quarantine.pop(parent_root).len(), 1);
    }

    #[test]
    fn marking_root_unviable_evicts_and_propagates_to_orphaned_descendants() {
        let mut quarantine = Quarantine::new();
        let root = H256::repeat_byte(1);

        let child = block(root, 1);
        let child_root = child.message_hash_tree_root();
        let grandchild = block(child_root, 2);
        let grandchild_root = grandchild.message_hash_tree_root();

        quarantine.add_orphan(child);
        quarantine.add_orphan(grandchild);

        quarantine.mark_unviable(root);

        assert!(quarantine.is_unviable(child_root));
        assert!(quarantine.is_unviable(grandchild_root));
        assert!(quarantine.pop(root).is_empty());
    }

    #[test]
    fn orphan_with_already_unviable_parent_is_rejected_and_marked_unviable() {
        let mut quarantine = Quarantine::new();
        let root = H256::repeat_byte(1);
        quarantine.mark_unviable(root);

        let child = block(root, 1);
        let child_root = child.message_hash_tree_root();

        assert!(!quarantine.add_orphan(child));
        assert!(quarantine.is_unviable(child_root));
    }
}
