//! Altair additions (spec.md §3/§4.2): sync committees replace the gossip-based sync protocol,
//! and per-validator participation flags replace Phase0's `PendingAttestation` lists.

use bls::{PublicKeyBytes, SignatureBytes};
use ssz::{BitVector, Cached, ContiguousList, Ssz, Vector};

use crate::{
    nonstandard::ParticipationFlags,
    phase0::{
        AttesterSlashing, BeaconBlockHeader, Checkpoint, Deposit, Eth1Data, Fork,
        ProposerSlashing, SignedVoluntaryExit,
    },
    preset::capacity,
    primitives::{Gwei, Root, Slot, UnixSeconds, ValidatorIndex, H256},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct SyncCommittee {
    pub pubkeys: Vector<PublicKeyBytes, { capacity::SYNC_COMMITTEE_SIZE }>,
    pub aggregate_pubkey: PublicKeyBytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct SyncAggregate {
    pub sync_committee_bits: BitVector<{ capacity::SYNC_COMMITTEE_SIZE }>,
    pub sync_committee_signature: SignatureBytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct BeaconBlockBody {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub proposer_slashings: ContiguousList<ProposerSlashing, { capacity::MAX_PROPOSER_SLASHINGS }>,
    pub attester_slashings: ContiguousList<AttesterSlashing, { capacity::MAX_ATTESTER_SLASHINGS }>,
    pub attestations: ContiguousList<crate::phase0::Attestation, { capacity::MAX_ATTESTATIONS }>,
    pub deposits: ContiguousList<Deposit, { capacity::MAX_DEPOSITS }>,
    pub voluntary_exits: ContiguousList<SignedVoluntaryExit, { capacity::MAX_VOLUNTARY_EXITS }>,
    pub sync_aggregate: SyncAggregate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body: BeaconBlockBody,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

/// Field-for-field the same as [`crate::phase0::BeaconState`] except `previous_epoch_attestations`
/// / `current_epoch_attestations` become flag bytes, and sync committees + inactivity scores are
/// added. Grounded on the teacher's `upgrade_to_altair` destructuring in `helper_functions::fork`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct BeaconState {
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: Root,
    pub slot: Slot,
    pub fork: Fork,
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: Cached<Vector<H256, { capacity::SLOTS_PER_HISTORICAL_ROOT }>>,
    pub state_roots: Cached<Vector<H256, { capacity::SLOTS_PER_HISTORICAL_ROOT }>>,
    pub historical_roots: Cached<ContiguousList<H256, { capacity::HISTORICAL_ROOTS_LIMIT }>>,
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: Cached<ContiguousList<Eth1Data, { capacity::ETH1_DATA_VOTES_LENGTH }>>,
    pub eth1_deposit_index: u64,
    pub validators: Cached<ContiguousList<crate::phase0::Validator, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    pub balances: Cached<ContiguousList<Gwei, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    pub randao_mixes: Cached<Vector<H256, { capacity::EPOCHS_PER_HISTORICAL_VECTOR }>>,
    pub slashings: Cached<Vector<Gwei, { capacity::EPOCHS_PER_SLASHINGS_VECTOR }>>,
    pub previous_epoch_participation:
        Cached<ContiguousList<ParticipationFlags, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    pub current_epoch_participation:
        Cached<ContiguousList<ParticipationFlags, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    pub justification_bits: BitVector<4>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub inactivity_scores: Cached<ContiguousList<u64, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    pub current_sync_committee: SyncCommittee,
    pub next_sync_committee: SyncCommittee,
}
