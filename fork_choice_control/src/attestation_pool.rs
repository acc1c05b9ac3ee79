//! Named-interface stub for the attestation pool and the gossip/network producer side of the
//! pipeline (spec.md §1 Non-goals: "the peer-to-peer network stack" is an external collaborator;
//! spec.md §4.5 names only what fork choice needs from it: "attestation weights (from the
//! attestation pool)"). No gossip validation, aggregation, or subnet subscription logic lives in
//! this crate — only the trait [`fork_choice_store::AttestationWeights`] a real pool would
//! implement, plus the producer-facing shape §6 describes.

use std::sync::Arc;

use types::{combined::ForkedSignedBeaconBlock, primitives::H256};

use crate::consensus_manager::{BlockOrigin, ProcessingOutcome};

/// What the network layer feeds into [`crate::ConsensusManager::add_block`] (spec.md §4.3: "add
/// block(src, forked_block, result_callback, validation_duration)"). `src` is this crate's
/// [`BlockOrigin`]; `result_callback` and `validation_duration` are the caller's own concern and
/// aren't modeled as part of this trait itself (real producers get a future back from
/// `add_block`, per spec.md §6's "per-block completion futures").
pub trait AttestationPool: Send + Sync {
    /// `register_attestation`: a verified attestation the pool should fold into its tally of
    /// latest messages, which is what feeds [`fork_choice_store::AttestationWeights::weight`].
    fn register_attestation(&self, validator_index: types::primitives::ValidatorIndex, block_root: H256);
}

/// A gossip/sync/request producer's view of the queue (spec.md §6: "to the network layer").
/// `has_blocks` backs the `has_blocks() -> bool` signal; `notify` is the per-block completion
/// callback, called exactly once per enqueued block (spec.md §8's "every non-null result future
/// resolves exactly once").
pub trait BlockProducer: Send + Sync {
    fn has_blocks(&self) -> bool;

    fn notify(&self, origin: BlockOrigin, block: &Arc<ForkedSignedBeaconBlock>, outcome: ProcessingOutcome);
}
