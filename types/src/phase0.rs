//! Phase0 data model (spec.md §3): the validator registry, attestations, slashings, and the
//! base block/state shape every later fork extends.

use bls::{PublicKeyBytes, SignatureBytes};
use ssz::{BitList, Cached, ContiguousList, Ssz, Vector};

use crate::{
    preset::capacity,
    primitives::{Epoch, Gwei, Root, Slot, UnixSeconds, ValidatorIndex, H256},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct Fork {
    pub previous_version: [u8; 4],
    pub current_version: [u8; 4],
    pub epoch: Epoch,
}

/// A zero-valued root denotes "none", per spec.md §3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Root,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    #[must_use]
    pub fn is_active(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    #[must_use]
    pub fn is_slashable(&self, epoch: Epoch) -> bool {
        !self.slashed && self.activation_epoch <= epoch && epoch < self.withdrawable_epoch
    }

    #[must_use]
    pub fn is_eligible_for_activation_queue(&self, far_future_epoch: Epoch) -> bool {
        self.activation_eligibility_epoch == far_future_epoch
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct Eth1Data {
    pub deposit_root: Root,
    pub deposit_count: u64,
    pub block_hash: H256,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body_root: Root,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,
    /// LMD-GHOST vote: the block root the attester saw as head.
    pub beacon_block_root: Root,
    /// FFG source vote.
    pub source: Checkpoint,
    /// FFG target vote.
    pub target: Checkpoint,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct Attestation {
    pub aggregation_bits: BitList<{ capacity::MAX_VALIDATORS_PER_COMMITTEE }>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

/// An [`Attestation`] whose signature has already been verified (spec.md §3). The distinction
/// is tracked at the type level so call sites cannot accidentally skip a verification step; it
/// carries no claim about whether the referenced state transition is itself valid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustedAttestation(pub Attestation);

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct IndexedAttestation {
    pub attesting_indices: ContiguousList<ValidatorIndex, { capacity::MAX_VALIDATORS_PER_COMMITTEE }>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct PendingAttestation {
    pub aggregation_bits: BitList<{ capacity::MAX_VALIDATORS_PER_COMMITTEE }>,
    pub data: AttestationData,
    pub inclusion_delay: Slot,
    pub proposer_index: ValidatorIndex,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct AttesterSlashing {
    pub attestation_1: IndexedAttestation,
    pub attestation_2: IndexedAttestation,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub amount: Gwei,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Ssz)]
pub struct Deposit {
    pub proof: [H256; capacity::DEPOSIT_CONTRACT_TREE_DEPTH + 1],
    pub data: DepositData,
}

impl Default for Deposit {
    fn default() -> Self {
        Self {
            proof: [H256::zero(); capacity::DEPOSIT_CONTRACT_TREE_DEPTH + 1],
            data: DepositData::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct VoluntaryExit {
    pub epoch: Epoch,
    pub validator_index: ValidatorIndex,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ssz)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: SignatureBytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct BeaconBlockBody {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub proposer_slashings: ContiguousList<ProposerSlashing, { capacity::MAX_PROPOSER_SLASHINGS }>,
    pub attester_slashings: ContiguousList<AttesterSlashing, { capacity::MAX_ATTESTER_SLASHINGS }>,
    pub attestations: ContiguousList<Attestation, { capacity::MAX_ATTESTATIONS }>,
    pub deposits: ContiguousList<Deposit, { capacity::MAX_DEPOSITS }>,
    pub voluntary_exits: ContiguousList<SignedVoluntaryExit, { capacity::MAX_VOLUNTARY_EXITS }>,
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

pub mod consts {
    use crate::primitives::{Epoch, Slot};

    pub const GENESIS_SLOT: Slot = Slot::new(0);
    pub const GENESIS_EPOCH: Epoch = Epoch::new(0);
    pub const FAR_FUTURE_EPOCH: Epoch = Epoch::new(u64::MAX);
    pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = super::capacity::DEPOSIT_CONTRACT_TREE_DEPTH;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Ssz)]
pub struct BeaconState {
    // > Versioning
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: Root,
    pub slot: Slot,
    pub fork: Fork,
    // > History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: Cached<Vector<H256, { capacity::SLOTS_PER_HISTORICAL_ROOT }>>,
    pub state_roots: Cached<Vector<H256, { capacity::SLOTS_PER_HISTORICAL_ROOT }>>,
    pub historical_roots: Cached<ContiguousList<H256, { capacity::HISTORICAL_ROOTS_LIMIT }>>,
    // > Eth1
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: Cached<ContiguousList<Eth1Data, { capacity::ETH1_DATA_VOTES_LENGTH }>>,
    pub eth1_deposit_index: u64,
    // > Registry
    pub validators: Cached<ContiguousList<Validator, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    pub balances: Cached<ContiguousList<Gwei, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    // > Randomness
    pub randao_mixes: Cached<Vector<H256, { capacity::EPOCHS_PER_HISTORICAL_VECTOR }>>,
    // > Slashings
    pub slashings: Cached<Vector<Gwei, { capacity::EPOCHS_PER_SLASHINGS_VECTOR }>>,
    // > Attestations
    pub previous_epoch_attestations:
        Cached<ContiguousList<PendingAttestation, { capacity::MAX_ATTESTATIONS }>>,
    pub current_epoch_attestations:
        Cached<ContiguousList<PendingAttestation, { capacity::MAX_ATTESTATIONS }>>,
    // > Finality
    pub justification_bits: ssz::BitVector<4>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
}
