//! The fork-choice error taxonomy (spec.md §4.5, §7): `Duplicate` is idempotent success, the
//! other three are the outcomes `add_head_block`/`validate_block_with_custom_state_transition`
//! report back up to the block processor.

use thiserror::Error;
use types::{combined::ForkedBeaconState, primitives::H256};

use crate::block_ref::ChainLink;

#[derive(Debug, Error)]
pub enum Error {
    #[error("block {0:?} is already present in the DAG")]
    Duplicate(H256),
    #[error("parent {parent_root:?} of block {block_root:?} is not in the DAG")]
    MissingParent { block_root: H256, parent_root: H256 },
    #[error("block is invalid: {0}")]
    Invalid(String),
    #[error("block descends from unviable root {unviable_root:?}")]
    UnviableFork { unviable_root: H256 },
}

impl From<transition_functions::Error> for Error {
    fn from(error: transition_functions::Error) -> Self {
        Self::Invalid(error.to_string())
    }
}

impl From<bls::Error> for Error {
    fn from(error: bls::Error) -> Self {
        Self::Invalid(error.to_string())
    }
}

impl From<helper_functions::verifier::Error> for Error {
    fn from(error: helper_functions::verifier::Error) -> Self {
        Self::Invalid(error.to_string())
    }
}

/// What happened to a block the store was asked to insert (spec.md §4.5's `add_head_block`
/// contract, surfaced by `validate_block_with_custom_state_transition`). `Ignore` carries
/// whether the block should still be retried later (`true`) or is dead for good (`false`) —
/// mirrors the merge-block "not yet, but not invalid either" case in [`crate::validate_merge_block`].
#[derive(Clone)]
pub enum BlockAction {
    Accept(Box<ChainLink>),
    Ignore(bool),
}

/// The narrower outcome [`crate::validate_merge_block`] reports (spec.md §4.5's Bellatrix note):
/// there is no state to hand back yet, only whether processing may continue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartialBlockAction {
    Accept,
    Ignore,
}

/// Satisfies `validate_block_with_custom_state_transition`'s closure contract even when no
/// post-state exists yet — used only by call sites that intend to map the early-exit branch
/// straight through without touching `ForkedBeaconState`.
pub type ClosureResult = Result<(std::sync::Arc<ForkedBeaconState>, Option<BlockAction>), Error>;
