//! Per-block post-state cache (spec.md §4.3/§4.5), grounded on the reference
//! `StateCacheProcessor<P>`: the block processor calls [`StateCacheProcessor::get_or_insert_with`]
//! once per block it processes so a block that's already been validated (e.g. re-delivered via
//! two gossip topics) doesn't re-run the state-transition function, and
//! [`StateCacheProcessor::before_or_at_slot`] lets callers reuse a cached *ancestor* state and
//! replay only the handful of empty slots since, instead of rewinding all the way to the parent's
//! own slot.

use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use parking_lot::Mutex;
use std_ext::ArcExt as _;
use types::{
    combined::ForkedBeaconState,
    preset::Preset,
    primitives::{Slot, H256},
};

use crate::{error::BlockAction, store::Store};

struct Entry {
    slot: Slot,
    state: Arc<ForkedBeaconState>,
}

/// Keyed by block root. Entries are never evicted here; `Store::advance_finalization`'s own
/// pruning is what bounds memory, by dropping roots this cache is never asked about again.
pub struct StateCacheProcessor<P> {
    cache: Mutex<HashMap<H256, Entry>>,
    _preset: PhantomData<P>,
}

impl<P: Preset> Default for StateCacheProcessor<P> {
    fn default() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            _preset: PhantomData,
        }
    }
}

impl<P: Preset> StateCacheProcessor<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `build` only if `block_root` isn't already cached, or `force` is set (the teacher's
    /// flag for "this call is the authoritative state-transition, not a read-only gossip check").
    /// Caches whatever state `build` returns on success.
    pub fn get_or_insert_with<E>(
        &self,
        block_root: H256,
        slot: Slot,
        force: bool,
        build: impl FnOnce() -> Result<(Arc<ForkedBeaconState>, Option<BlockAction>), E>,
    ) -> Result<(Arc<ForkedBeaconState>, Option<BlockAction>), E> {
        if !force {
            if let Some(entry) = self.cache.lock().get(&block_root) {
                return Ok((entry.state.clone_arc(), None));
            }
        }

        let (state, action) = build()?;

        self.cache.lock().insert(
            block_root,
            Entry {
                slot,
                state: state.clone_arc(),
            },
        );

        Ok((state, action))
    }

    /// The cached state for the nearest ancestor of `root` (inclusive) at or before `slot`,
    /// walking up parent pointers through `store`'s DAG. `None` if no ancestor has a cached
    /// state, in which case the caller falls back to the parent `ChainLink`'s own state.
    #[must_use]
    pub fn before_or_at_slot(
        &self,
        store: &Store<P>,
        root: H256,
        slot: Slot,
    ) -> Option<Arc<ForkedBeaconState>> {
        let cache = self.cache.lock();
        let mut current = Some(root);

        while let Some(candidate_root) = current {
            if let Some(entry) = cache.get(&candidate_root) {
                if entry.slot <= slot {
                    return Some(entry.state.clone_arc());
                }
            }

            current = store.parent_root_of(candidate_root);
        }

        None
    }

    /// Drops every cached state whose root `store` no longer knows about, called after
    /// `Store::advance_finalization` prunes the DAG.
    pub fn retain_known(&self, store: &Store<P>) {
        self.cache.lock().retain(|root, _| store.contains_block(*root));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use types::{phase0, Minimal};

    use super::*;
    use crate::store::Store;

    #[test]
    fn second_call_for_same_root_is_served_from_cache() {
        let genesis_state = Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default()));
        let genesis_block = Arc::new(types::combined::ForkedSignedBeaconBlock::Phase0(
            phase0::SignedBeaconBlock::default(),
        ));

        let store = Store::<Minimal>::new(
            Arc::new(types::config::Config::minimal()),
            genesis_block,
            genesis_state.clone_arc(),
        );

        let cache = StateCacheProcessor::<Minimal>::new();
        let root = H256::repeat_byte(9);

        let mut calls = 0;
        let (state, _) = cache
            .get_or_insert_with::<std::convert::Infallible>(root, Slot::new(1), false, || {
                calls += 1;
                Ok((genesis_state.clone_arc(), None))
            })
            .unwrap();

        let (state_again, _) = cache
            .get_or_insert_with::<std::convert::Infallible>(root, Slot::new(1), false, || {
                calls += 1;
                Ok((genesis_state.clone_arc(), None))
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&state, &state_again));
        drop(store);
    }
}
