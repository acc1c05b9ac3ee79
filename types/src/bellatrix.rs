//! Bellatrix additions (spec.md §3): the embedded execution payload that merges consensus and
//! execution into a single block, plus the payload header the state retains between blocks.

use ssz::{Cached, ContiguousList, Ssz, Vector};

use crate::{
    altair::SyncAggregate,
    nonstandard::ParticipationFlags,
    phase0::{
        AttesterSlashing, BeaconBlockHeader, Checkpoint, Deposit, Eth1Data, Fork,
        ProposerSlashing, SignedVoluntaryExit,
    },
    preset::capacity,
    primitives::{
        ExecutionAddress, ExecutionBlockHash, ExecutionBlockNumber, Gwei, Root, Slot,
        UnixSeconds, ValidatorIndex, H256,
    },
};
use bls::SignatureBytes;

/// An opaque, already RLP-encoded execution transaction. The consensus layer never decodes it;
/// it only needs enough structure (a variable-length byte string) to hash and forward to the
/// execution engine's `newPayload` call.
pub type Transaction = ContiguousList<u8, { capacity::MAX_BYTES_PER_TRANSACTION }>;

#[derive(Clone, Debug, PartialEq, Eq, Ssz)]
pub struct ExecutionPayload {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Vector<u8, { capacity::BYTES_PER_LOGS_BLOOM }>,
    pub prev_randao: H256,
    pub block_number: ExecutionBlockNumber,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: UnixSeconds,
    pub extra_data: ContiguousList<u8, { capacity::MAX_EXTRA_DATA_BYTES }>,
    pub base_fee_per_gas: [u8; 32],
    pub block_hash: ExecutionBlockHash,
    pub transactions: ContiguousList<Transaction, { capacity::MAX_TRANSACTIONS_PER_PAYLOAD }>,
}

impl Default for ExecutionPayload {
    fn default() -> Self {
        Self {
            parent_hash: ExecutionBlockHash::zero(),
            fee_recipient: [0; 20],
            state_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: Vector::default(),
            prev_randao: H256::zero(),
            block_number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: ContiguousList::default(),
            base_fee_per_gas: [0; 32],
            block_hash: ExecutionBlockHash::zero(),
            transactions: ContiguousList::default(),
        }
    }
}

impl ExecutionPayload {
    /// "payload equal to default" per spec.md §9's Open Question: local Bellatrix devnets
    /// started before the merge propose blocks carrying this sentinel until TTD is reached.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn to_header(&self) -> ExecutionPayloadHeader {
        ExecutionPayloadHeader {
            parent_hash: self.parent_hash,
            fee_recipient: self.fee_recipient,
            state_root: self.state_root,
            receipts_root: self.receipts_root,
            logs_bloom: self.logs_bloom.clone(),
            prev_randao: self.prev_randao,
            block_number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            base_fee_per_gas: self.base_fee_per_gas,
            block_hash: self.block_hash,
            transactions_root: ssz::SszHash::hash_tree_root(&self.transactions),
        }
    }
}

/// The state only ever retains the header of the most recently applied payload (spec.md §3);
/// the full transaction bodies live with the execution client, not the consensus state.
#[derive(Clone, Debug, PartialEq, Eq, Ssz)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Vector<u8, { capacity::BYTES_PER_LOGS_BLOOM }>,
    pub prev_randao: H256,
    pub block_number: ExecutionBlockNumber,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: UnixSeconds,
    pub extra_data: ContiguousList<u8, { capacity::MAX_EXTRA_DATA_BYTES }>,
    pub base_fee_per_gas: [u8; 32],
    pub block_hash: ExecutionBlockHash,
    pub transactions_root: H256,
}

impl Default for ExecutionPayloadHeader {
    fn default() -> Self {
        Self {
            parent_hash: ExecutionBlockHash::zero(),
            fee_recipient: [0; 20],
            state_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: Vector::default(),
            prev_randao: H256::zero(),
            block_number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: ContiguousList::default(),
            base_fee_per_gas: [0; 32],
            block_hash: ExecutionBlockHash::zero(),
            transactions_root: H256::zero(),
        }
    }
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
    pub execution_payload: ExecutionPayload,
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
    pub justification_bits: ssz::BitVector<4>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub inactivity_scores: Cached<ContiguousList<u64, { capacity::VALIDATOR_REGISTRY_LIMIT }>>,
    pub current_sync_committee: crate::altair::SyncCommittee,
    pub next_sync_committee: crate::altair::SyncCommittee,
    pub latest_execution_payload_header: ExecutionPayloadHeader,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_payload_is_vacuously_valid() {
        assert!(ExecutionPayload::default().is_default());
    }

    #[test]
    fn header_transactions_root_matches_list() {
        let payload = ExecutionPayload::default();
        let header = payload.to_header();
        assert_eq!(
            header.transactions_root,
            ssz::SszHash::hash_tree_root(&payload.transactions),
        );
    }
}
