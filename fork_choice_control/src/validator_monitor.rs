//! Named-interface stub for the validator-duties subsystem (spec.md §1 Non-goals: "the validator
//! duties/signing system" is an external collaborator; spec.md §6 names only the three call sites
//! the block processor makes into it). No concrete validator-performance tracking lives in this
//! crate — only the trait a real implementation would satisfy.

use types::{altair::SyncAggregate, combined::ForkedSignedBeaconBlock, phase0::Attestation, primitives::H256};

/// `register_beacon_block` / `register_attestation_in_block` / `register_sync_aggregate_in_block`
/// per spec.md §6. `store_block` calls these once a block clears fork choice, so a real
/// implementation can track per-validator block/attestation/sync-committee participation for
/// monitoring dashboards — none of which this core defines the behavior of.
pub trait ValidatorMonitor: Send + Sync {
    fn register_beacon_block(&self, block_root: H256, block: &ForkedSignedBeaconBlock);

    fn register_attestation_in_block(&self, attestation: &Attestation, block_root: H256);

    fn register_sync_aggregate_in_block(&self, sync_aggregate: &SyncAggregate, block_root: H256);
}

/// Does nothing with any of the three calls. The only implementation this crate ships; a real
/// validator-duties system (out of scope, spec.md §1) would implement [`ValidatorMonitor`] itself
/// instead of wrapping this one.
pub struct NullValidatorMonitor;

impl ValidatorMonitor for NullValidatorMonitor {
    fn register_beacon_block(&self, _block_root: H256, _block: &ForkedSignedBeaconBlock) {}

    fn register_attestation_in_block(&self, _attestation: &Attestation, _block_root: H256) {}

    fn register_sync_aggregate_in_block(&self, _sync_aggregate: &SyncAggregate, _block_root: H256) {}
}
