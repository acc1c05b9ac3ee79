//! The narrow `BeaconState` trait called out in spec.md §9 ("replace [the teacher's] generic
//! `ForkyBeaconState` ... by a trait/interface with the narrow set of accessors the callers
//! actually need"). `helper_functions` and `transition_functions` are written against this trait
//! instead of matching on `ForkedBeaconState` themselves, so the per-slot/per-epoch machinery
//! that is identical across forks (history rings, registry, randomness, slashings, finality) is
//! written once. Fork-specific extensions (participation flags, sync committees, the execution
//! payload header) are reached through `downcast_ref`/`downcast_mut` on the concrete type after
//! matching on `ForkedBeaconState`/`Phase`, not through this trait.

use ssz::{BitVector, Cached, ContiguousList, Vector};

use crate::{
    phase0::{BeaconBlockHeader, Checkpoint, Eth1Data, Fork, Validator},
    preset::capacity,
    primitives::{Gwei, Root, Slot, UnixSeconds, H256},
};

pub type BlockRootsRing = Cached<Vector<H256, { capacity::SLOTS_PER_HISTORICAL_ROOT }>>;
pub type StateRootsRing = Cached<Vector<H256, { capacity::SLOTS_PER_HISTORICAL_ROOT }>>;
pub type HistoricalRoots = Cached<ContiguousList<H256, { capacity::HISTORICAL_ROOTS_LIMIT }>>;
pub type Eth1DataVotes = Cached<ContiguousList<Eth1Data, { capacity::ETH1_DATA_VOTES_LENGTH }>>;
pub type ValidatorRegistry =
    Cached<ContiguousList<Validator, { capacity::VALIDATOR_REGISTRY_LIMIT }>>;
pub type Balances = Cached<ContiguousList<Gwei, { capacity::VALIDATOR_REGISTRY_LIMIT }>>;
pub type RandaoMixes = Cached<Vector<H256, { capacity::EPOCHS_PER_HISTORICAL_VECTOR }>>;
pub type Slashings = Cached<Vector<Gwei, { capacity::EPOCHS_PER_SLASHINGS_VECTOR }>>;

pub trait BeaconState {
    fn genesis_time(&self) -> UnixSeconds;
    fn genesis_validators_root(&self) -> Root;
    fn slot(&self) -> Slot;
    fn slot_mut(&mut self) -> &mut Slot;
    fn fork(&self) -> Fork;
    fn fork_mut(&mut self) -> &mut Fork;
    fn latest_block_header(&self) -> &BeaconBlockHeader;
    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader;
    fn block_roots(&self) -> &BlockRootsRing;
    fn block_roots_mut(&mut self) -> &mut BlockRootsRing;
    fn state_roots(&self) -> &StateRootsRing;
    fn state_roots_mut(&mut self) -> &mut StateRootsRing;
    fn historical_roots(&self) -> &HistoricalRoots;
    fn historical_roots_mut(&mut self) -> &mut HistoricalRoots;
    fn eth1_data(&self) -> &Eth1Data;
    fn eth1_data_mut(&mut self) -> &mut Eth1Data;
    fn eth1_data_votes(&self) -> &Eth1DataVotes;
    fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes;
    fn eth1_deposit_index(&self) -> u64;
    fn eth1_deposit_index_mut(&mut self) -> &mut u64;
    fn validators(&self) -> &ValidatorRegistry;
    fn validators_mut(&mut self) -> &mut ValidatorRegistry;
    fn balances(&self) -> &Balances;
    fn balances_mut(&mut self) -> &mut Balances;
    fn randao_mixes(&self) -> &RandaoMixes;
    fn randao_mixes_mut(&mut self) -> &mut RandaoMixes;
    fn slashings(&self) -> &Slashings;
    fn slashings_mut(&mut self) -> &mut Slashings;
    fn justification_bits(&self) -> BitVector<4>;
    fn justification_bits_mut(&mut self) -> &mut BitVector<4>;
    fn previous_justified_checkpoint(&self) -> Checkpoint;
    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn current_justified_checkpoint(&self) -> Checkpoint;
    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn finalized_checkpoint(&self) -> Checkpoint;
    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint;
}

macro_rules! impl_beacon_state {
    ($type:ty) => {
        impl BeaconState for $type {
            fn genesis_time(&self) -> UnixSeconds {
                self.genesis_time
            }

            fn genesis_validators_root(&self) -> Root {
                self.genesis_validators_root
            }

            fn slot(&self) -> Slot {
                self.slot
            }

            fn slot_mut(&mut self) -> &mut Slot {
                &mut self.slot
            }

            fn fork(&self) -> Fork {
                self.fork
            }

            fn fork_mut(&mut self) -> &mut Fork {
                &mut self.fork
            }

            fn latest_block_header(&self) -> &BeaconBlockHeader {
                &self.latest_block_header
            }

            fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader {
                &mut self.latest_block_header
            }

            fn block_roots(&self) -> &BlockRootsRing {
                &self.block_roots
            }

            fn block_roots_mut(&mut self) -> &mut BlockRootsRing {
                &mut self.block_roots
            }

            fn state_roots(&self) -> &StateRootsRing {
                &self.state_roots
            }

            fn state_roots_mut(&mut self) -> &mut StateRootsRing {
                &mut self.state_roots
            }

            fn historical_roots(&self) -> &HistoricalRoots {
                &self.historical_roots
            }

            fn historical_roots_mut(&mut self) -> &mut HistoricalRoots {
                &mut self.historical_roots
            }

            fn eth1_data(&self) -> &Eth1Data {
                &self.eth1_data
            }

            fn eth1_data_mut(&mut self) -> &mut Eth1Data {
                &mut self.eth1_data
            }

            fn eth1_data_votes(&self) -> &Eth1DataVotes {
                &self.eth1_data_votes
            }

            fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes {
                &mut self.eth1_data_votes
            }

            fn eth1_deposit_index(&self) -> u64 {
                self.eth1_deposit_index
            }

            fn eth1_deposit_index_mut(&mut self) -> &mut u64 {
                &mut self.eth1_deposit_index
            }

            fn validators(&self) -> &ValidatorRegistry {
                &self.validators
            }

            fn validators_mut(&mut self) -> &mut ValidatorRegistry {
                &mut self.validators
            }

            fn balances(&self) -> &Balances {
                &self.balances
            }

            fn balances_mut(&mut self) -> &mut Balances {
                &mut self.balances
            }

            fn randao_mixes(&self) -> &RandaoMixes {
                &self.randao_mixes
            }

            fn randao_mixes_mut(&mut self) -> &mut RandaoMixes {
                &mut self.randao_mixes
            }

            fn slashings(&self) -> &Slashings {
                &self.slashings
            }

            fn slashings_mut(&mut self) -> &mut Slashings {
                &mut self.slashings
            }

            fn justification_bits(&self) -> BitVector<4> {
                self.justification_bits
            }

            fn justification_bits_mut(&mut self) -> &mut BitVector<4> {
                &mut self.justification_bits
            }

            fn previous_justified_checkpoint(&self) -> Checkpoint {
                self.previous_justified_checkpoint
            }

            fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
                &mut self.previous_justified_checkpoint
            }

            fn current_justified_checkpoint(&self) -> Checkpoint {
                self.current_justified_checkpoint
            }

            fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
                &mut self.current_justified_checkpoint
            }

            fn finalized_checkpoint(&self) -> Checkpoint {
                self.finalized_checkpoint
            }

            fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint {
                &mut self.finalized_checkpoint
            }
        }
    };
}

impl_beacon_state!(crate::phase0::BeaconState);
impl_beacon_state!(crate::altair::BeaconState);
impl_beacon_state!(crate::bellatrix::BeaconState);

pub type ParticipationFlagsList =
    Cached<ContiguousList<crate::nonstandard::ParticipationFlags, { capacity::VALIDATOR_REGISTRY_LIMIT }>>;
pub type InactivityScores = Cached<ContiguousList<u64, { capacity::VALIDATOR_REGISTRY_LIMIT }>>;

/// The Altair+ fields spec.md §9 calls out as fork-specific extensions reached "behind
/// downcast" rather than widening the narrow [`BeaconState`] trait every fork must implement.
/// Only `altair::BeaconState` and `bellatrix::BeaconState` implement this; Phase0 states have no
/// sync committees or participation flags to expose.
pub trait PostAltairBeaconState: BeaconState {
    fn previous_epoch_participation(&self) -> &ParticipationFlagsList;
    fn previous_epoch_participation_mut(&mut self) -> &mut ParticipationFlagsList;
    fn current_epoch_participation(&self) -> &ParticipationFlagsList;
    fn current_epoch_participation_mut(&mut self) -> &mut ParticipationFlagsList;
    fn inactivity_scores(&self) -> &InactivityScores;
    fn inactivity_scores_mut(&mut self) -> &mut InactivityScores;
    fn current_sync_committee(&self) -> &crate::altair::SyncCommittee;
    fn current_sync_committee_mut(&mut self) -> &mut crate::altair::SyncCommittee;
    fn next_sync_committee(&self) -> &crate::altair::SyncCommittee;
    fn next_sync_committee_mut(&mut self) -> &mut crate::altair::SyncCommittee;
}

macro_rules! impl_post_altair_beacon_state {
    ($type:ty) => {
        impl PostAltairBeaconState for $type {
            fn previous_epoch_participation(&self) -> &ParticipationFlagsList {
                &self.previous_epoch_participation
            }

            fn previous_epoch_participation_mut(&mut self) -> &mut ParticipationFlagsList {
                &mut self.previous_epoch_participation
            }

            fn current_epoch_participation(&self) -> &ParticipationFlagsList {
                &self.current_epoch_participation
            }

            fn current_epoch_participation_mut(&mut self) -> &mut ParticipationFlagsList {
                &mut self.current_epoch_participation
            }

            fn inactivity_scores(&self) -> &InactivityScores {
                &self.inactivity_scores
            }

            fn inactivity_scores_mut(&mut self) -> &mut InactivityScores {
                &mut self.inactivity_scores
            }

            fn current_sync_committee(&self) -> &crate::altair::SyncCommittee {
                &self.current_sync_committee
            }

            fn current_sync_committee_mut(&mut self) -> &mut crate::altair::SyncCommittee {
                &mut self.current_sync_committee
            }

            fn next_sync_committee(&self) -> &crate::altair::SyncCommittee {
                &self.next_sync_committee
            }

            fn next_sync_committee_mut(&mut self) -> &mut crate::altair::SyncCommittee {
                &mut self.next_sync_committee
            }
        }
    };
}

impl_post_altair_beacon_state!(crate::altair::BeaconState);
impl_post_altair_beacon_state!(crate::bellatrix::BeaconState);

impl BeaconState for crate::combined::ForkedBeaconState {
    fn genesis_time(&self) -> UnixSeconds {
        crate::with_state!(self, |state| state.genesis_time())
    }

    fn genesis_validators_root(&self) -> Root {
        crate::with_state!(self, |state| state.genesis_validators_root())
    }

    fn slot(&self) -> Slot {
        crate::with_state!(self, |state| state.slot())
    }

    fn slot_mut(&mut self) -> &mut Slot {
        crate::with_state!(self, |state| state.slot_mut())
    }

    fn fork(&self) -> Fork {
        crate::with_state!(self, |state| state.fork())
    }

    fn fork_mut(&mut self) -> &mut Fork {
        crate::with_state!(self, |state| state.fork_mut())
    }

    fn latest_block_header(&self) -> &BeaconBlockHeader {
        crate::with_state!(self, |state| state.latest_block_header())
    }

    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader {
        crate::with_state!(self, |state| state.latest_block_header_mut())
    }

    fn block_roots(&self) -> &BlockRootsRing {
        crate::with_state!(self, |state| state.block_roots())
    }

    fn block_roots_mut(&mut self) -> &mut BlockRootsRing {
        crate::with_state!(self, |state| state.block_roots_mut())
    }

    fn state_roots(&self) -> &StateRootsRing {
        crate::with_state!(self, |state| state.state_roots())
    }

    fn state_roots_mut(&mut self) -> &mut StateRootsRing {
        crate::with_state!(self, |state| state.state_roots_mut())
    }

    fn historical_roots(&self) -> &HistoricalRoots {
        crate::with_state!(self, |state| state.historical_roots())
    }

    fn historical_roots_mut(&mut self) -> &mut HistoricalRoots {
        crate::with_state!(self, |state| state.historical_roots_mut())
    }

    fn eth1_data(&self) -> &Eth1Data {
        crate::with_state!(self, |state| state.eth1_data())
    }

    fn eth1_data_mut(&mut self) -> &mut Eth1Data {
        crate::with_state!(self, |state| state.eth1_data_mut())
    }

    fn eth1_data_votes(&self) -> &Eth1DataVotes {
        crate::with_state!(self, |state| state.eth1_data_votes())
    }

    fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes {
        crate::with_state!(self, |state| state.eth1_data_votes_mut())
    }

    fn eth1_deposit_index(&self) -> u64 {
        crate::with_state!(self, |state| state.eth1_deposit_index())
    }

    fn eth1_deposit_index_mut(&mut self) -> &mut u64 {
        crate::with_state!(self, |state| state.eth1_deposit_index_mut())
    }

    fn validators(&self) -> &ValidatorRegistry {
        crate::with_state!(self, |state| state.validators())
    }

    fn validators_mut(&mut self) -> &mut ValidatorRegistry {
        crate::with_state!(self, |state| state.validators_mut())
    }

    fn balances(&self) -> &Balances {
        crate::with_state!(self, |state| state.balances())
    }

    fn balances_mut(&mut self) -> &mut Balances {
        crate::with_state!(self, |state| state.balances_mut())
    }

    fn randao_mixes(&self) -> &RandaoMixes {
        crate::with_state!(self, |state| state.randao_mixes())
    }

    fn randao_mixes_mut(&mut self) -> &mut RandaoMixes {
        crate::with_state!(self, |state| state.randao_mixes_mut())
    }

    fn slashings(&self) -> &Slashings {
        crate::with_state!(self, |state| state.slashings())
    }

    fn slashings_mut(&mut self) -> &mut Slashings {
        crate::with_state!(self, |state| state.slashings_mut())
    }

    fn justification_bits(&self) -> BitVector<4> {
        crate::with_state!(self, |state| state.justification_bits())
    }

    fn justification_bits_mut(&mut self) -> &mut BitVector<4> {
        crate::with_state!(self, |state| state.justification_bits_mut())
    }

    fn previous_justified_checkpoint(&self) -> Checkpoint {
        crate::with_state!(self, |state| state.previous_justified_checkpoint())
    }

    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        crate::with_state!(self, |state| state.previous_justified_checkpoint_mut())
    }

    fn current_justified_checkpoint(&self) -> Checkpoint {
        crate::with_state!(self, |state| state.current_justified_checkpoint())
    }

    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        crate::with_state!(self, |state| state.current_justified_checkpoint_mut())
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        crate::with_state!(self, |state| state.finalized_checkpoint())
    }

    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint {
        crate::with_state!(self, |state| state.finalized_checkpoint_mut())
    }
}
