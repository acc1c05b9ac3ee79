//! The state-transition function (spec.md §4.2): slot advancement, epoch processing, and
//! per-block operation processing, plus the `state_transition` entrypoint the block processor and
//! fork choice store drive blocks through.
//!
//! Every sub-phase is written once against the narrow [`types::BeaconState`]/[`types::BlockBody`]
//! traits (spec.md §9) instead of matching on the active fork three times; only the handful of
//! places where Phase0 and Altair+ genuinely diverge (attestation bookkeeping, sync aggregates,
//! the execution payload) branch per fork.

pub mod block_processing;
pub mod epoch_processing;
pub mod error;
pub mod operations;
pub mod slot_processing;

pub use block_processing::{process_block, state_transition, BlockProcessingFlags};
pub use error::Error;
