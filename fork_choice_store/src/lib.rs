//! The in-memory block DAG and LMD-GHOST fork-choice store (spec.md §4.5): a caller inserts
//! blocks through [`Store::validate_block_for_gossip`]/[`Store::validate_block_with_custom_state_transition`],
//! which thread a closure through to the parent's post-state so `fork_choice_control`'s block
//! processor decides how the state-transition function is actually run (gossip-time checks skip
//! BLS, import-time checks don't). [`StateCacheProcessor`] memoizes post-states per block root so
//! a block delivered twice doesn't replay the state-transition function twice.

pub mod block_ref;
pub mod error;
pub mod merge;
pub mod state_cache;
pub mod store;

pub use block_ref::{BlockRef, ChainLink};
pub use error::{BlockAction, ClosureResult, Error, PartialBlockAction};
pub use merge::validate_merge_block;
pub use state_cache::StateCacheProcessor;
pub use store::{AttestationWeights, Store};
