//! The narrow `BlockBody` trait (spec.md §9's guidance applied to bodies the same way
//! `beacon_state.rs` applies it to states): `process_operations`'s five fixed-order operations
//! (spec.md §4.2) read identical field shapes out of every fork's `BeaconBlockBody`, so
//! `transition_functions::operations` is written once against this trait instead of matching on
//! the block's fork three times. Sync aggregate (Altair+) and the execution payload
//! (Bellatrix+) are reached through the two extension traits below, following the same
//! "downcast for fork-specific fields" shape as [`crate::beacon_state::PostAltairBeaconState`].

use bls::SignatureBytes;
use ssz::ContiguousList;

use crate::{
    altair::SyncAggregate,
    bellatrix::ExecutionPayload,
    phase0::{AttesterSlashing, Attestation, Deposit, Eth1Data, ProposerSlashing, SignedVoluntaryExit},
    preset::capacity,
    primitives::H256,
};

pub trait BlockBody {
    fn randao_reveal(&self) -> SignatureBytes;
    fn eth1_data(&self) -> Eth1Data;
    fn graffiti(&self) -> H256;
    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, { capacity::MAX_PROPOSER_SLASHINGS }>;
    fn attester_slashings(&self) -> &ContiguousList<AttesterSlashing, { capacity::MAX_ATTESTER_SLASHINGS }>;
    fn attestations(&self) -> &ContiguousList<Attestation, { capacity::MAX_ATTESTATIONS }>;
    fn deposits(&self) -> &ContiguousList<Deposit, { capacity::MAX_DEPOSITS }>;
    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, { capacity::MAX_VOLUNTARY_EXITS }>;
}

macro_rules! impl_block_body {
    ($type:ty) => {
        impl BlockBody for $type {
            fn randao_reveal(&self) -> SignatureBytes {
                self.randao_reveal
            }

            fn eth1_data(&self) -> Eth1Data {
                self.eth1_data
            }

            fn graffiti(&self) -> H256 {
                self.graffiti
            }

            fn proposer_slashings(
                &self,
            ) -> &ContiguousList<ProposerSlashing, { capacity::MAX_PROPOSER_SLASHINGS }> {
                &self.proposer_slashings
            }

            fn attester_slashings(
                &self,
            ) -> &ContiguousList<AttesterSlashing, { capacity::MAX_ATTESTER_SLASHINGS }> {
                &self.attester_slashings
            }

            fn attestations(&self) -> &ContiguousList<Attestation, { capacity::MAX_ATTESTATIONS }> {
                &self.attestations
            }

            fn deposits(&self) -> &ContiguousList<Deposit, { capacity::MAX_DEPOSITS }> {
                &self.deposits
            }

            fn voluntary_exits(
                &self,
            ) -> &ContiguousList<SignedVoluntaryExit, { capacity::MAX_VOLUNTARY_EXITS }> {
                &self.voluntary_exits
            }
        }
    };
}

impl_block_body!(crate::phase0::BeaconBlockBody);
impl_block_body!(crate::altair::BeaconBlockBody);
impl_block_body!(crate::bellatrix::BeaconBlockBody);

/// Altair+ sync aggregate (spec.md §4.2's "process sync aggregate (Altair+)" step).
pub trait HasSyncAggregate: BlockBody {
    fn sync_aggregate(&self) -> &SyncAggregate;
}

impl HasSyncAggregate for crate::altair::BeaconBlockBody {
    fn sync_aggregate(&self) -> &SyncAggregate {
        &self.sync_aggregate
    }
}

impl HasSyncAggregate for crate::bellatrix::BeaconBlockBody {
    fn sync_aggregate(&self) -> &SyncAggregate {
        &self.sync_aggregate
    }
}

/// Bellatrix+ embedded execution payload (spec.md §4.2's "process execution payload
/// (Bellatrix+)" step).
pub trait HasExecutionPayload: HasSyncAggregate {
    fn execution_payload(&self) -> &ExecutionPayload;
}

impl HasExecutionPayload for crate::bellatrix::BeaconBlockBody {
    fn execution_payload(&self) -> &ExecutionPayload {
        &self.execution_payload
    }
}
