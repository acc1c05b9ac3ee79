//! The error taxonomy state transition raises (spec.md §4.2, §7). Every variant other than
//! `Invalid` is a plumbing detail internal to this crate; `state_transition` callers only ever
//! see `Error::Invalid` (spec.md §7: "STF errors are captured and converted into `Invalid` for
//! the caller").

use thiserror::Error;
use types::primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error("block: {0}")]
    Invalid(String),

    #[error(transparent)]
    Accessor(#[from] helper_functions::accessors::Error),

    #[error(transparent)]
    Predicate(#[from] helper_functions::predicates::Error),

    #[error(transparent)]
    Bls(#[from] bls::Error),

    #[error("list bound exceeded: {0}")]
    ListBounds(#[from] ssz::ListBoundsError),

    #[error("slot {target} is not ahead of state slot {current}")]
    SlotNotAhead { current: Slot, target: Slot },

    #[error("proposer index {actual} does not match expected {expected}")]
    WrongProposerIndex {
        expected: ValidatorIndex,
        actual: ValidatorIndex,
    },

    #[error("parent root {actual:?} does not match latest block header root {expected:?}")]
    ParentRootMismatch { expected: H256, actual: H256 },

    #[error("randao reveal does not match epoch {epoch}'s mix seed")]
    InvalidRandaoReveal { epoch: Epoch },

    #[error("deposit index {index} does not match state.eth1_deposit_index {expected}")]
    DepositIndexMismatch { expected: u64, index: u64 },

    #[error("deposit Merkle proof does not verify against eth1_data.deposit_root")]
    InvalidDepositProof,

    #[error("voluntary exit: validator is not yet active long enough to exit")]
    ExitTooEarly,

    #[error("voluntary exit: validator already exited")]
    AlreadyExited,

    #[error("slashing: validator already slashed")]
    AlreadySlashed,

    #[error("slashing proof did not name a genuinely slashable double-vote/surround-vote")]
    NotSlashable,

    #[error("attestation data.slot {slot} outside inclusion window [{min}, {max}]")]
    AttestationOutsideInclusionWindow { slot: Slot, min: Slot, max: Slot },

    #[error("attestation target epoch {target} does not match attestation slot's own epoch")]
    AttestationTargetEpochMismatch { target: Epoch },

    #[error("attestation committee index {index} out of range")]
    AttestationBadCommitteeIndex { index: u64 },

    #[error("sync aggregate bit count does not match signature")]
    InvalidSyncAggregate,

    #[error("execution payload timestamp {actual} does not match expected slot start {expected}")]
    ExecutionPayloadBadTimestamp { expected: u64, actual: u64 },

    #[error("execution payload parent hash does not match state's latest payload header")]
    ExecutionPayloadBadParentHash,

    #[error("insufficient total balance {total} to pay {amount} Gwei")]
    InsufficientBalance { total: Gwei, amount: Gwei },

    #[error("block: state root verification failed")]
    StateRootMismatch,

    #[error("empty committee")]
    EmptyCommittee,
}

impl Error {
    /// Funnels every internal failure variant into the single `Invalid(reason)` shape
    /// `state_transition`'s public contract promises callers (spec.md §4.2, §7).
    #[must_use]
    pub fn into_invalid(self) -> Self {
        match self {
            Self::Invalid(_) => self,
            other => Self::Invalid(other.to_string()),
        }
    }
}
