//! The DAG node (spec.md §4.5): [`BlockRef`] is the parent-pointer skeleton every inserted block
//! gets; [`ChainLink`] pairs it with the block itself and, once computed, its post-state.

use std::sync::Arc;

use types::{
    combined::{ForkedBeaconState, ForkedSignedBeaconBlock},
    primitives::{ExecutionBlockHash, Slot, H256},
};

/// The parent-pointer skeleton spec.md §4.5 names directly: "root, slot, parent pointer,
/// execution block hash". Child edges live in `Store`'s own index rather than here, since a
/// block's children are only known after later insertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRef {
    pub root: H256,
    pub parent_root: H256,
    pub slot: Slot,
    pub execution_block_hash: Option<ExecutionBlockHash>,
}

/// A block plus everything the DAG knows about it. `state` is `None` for backfill blocks
/// (spec.md §4.3: blocks at or below the finalized slot, restored from an era archive rather
/// than replayed) and for any block whose post-state has been dropped to save memory; callers
/// that need it fall back to replaying from the nearest ancestor that still has one.
#[derive(Clone)]
pub struct ChainLink {
    pub block_root: H256,
    pub block: Arc<ForkedSignedBeaconBlock>,
    pub block_ref: BlockRef,
    pub state: Option<Arc<ForkedBeaconState>>,
    pub unviable: bool,
}

impl ChainLink {
    #[must_use]
    pub fn new(
        block_root: H256,
        block: Arc<ForkedSignedBeaconBlock>,
        state: Option<Arc<ForkedBeaconState>>,
        execution_block_hash: Option<ExecutionBlockHash>,
    ) -> Self {
        let block_ref = BlockRef {
            root: block_root,
            parent_root: block.parent_root(),
            slot: block.slot(),
            execution_block_hash,
        };

        Self {
            block_root,
            block,
            block_ref,
            state,
            unviable: false,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.block_ref.slot
    }

    #[must_use]
    pub fn parent_root(&self) -> H256 {
        self.block_ref.parent_root
    }
}
