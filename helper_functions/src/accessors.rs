//! State accessors: the read side of the state-transition function (spec.md §4.2's tie-breaks —
//! proposer selection, committee shuffling, attestation validity windows — all bottom out here).
//!
//! Every function is generic over `P: Preset` for the behavioral constants (committee sizing,
//! epoch lengths) it needs; `P` is resolved at the call site, usually via the same `P` the caller
//! was already generic over.

use std::collections::HashSet;

use itertools::Itertools as _;
use ssz::BitVector;
use thiserror::Error;
use types::{
    altair::SyncCommittee,
    config::domains,
    phase0::{AttestationData, Checkpoint},
    preset::Preset,
    primitives::{Domain, DomainType, Epoch, Gwei, Slot, ValidatorIndex, H256},
    BeaconState,
};

use crate::shuffling::{compute_committee, compute_shuffled_index};

#[derive(Debug, Error)]
pub enum Error {
    #[error("slot {slot} out of range for block-roots ring (state slot {state_slot})")]
    SlotOutOfRange { slot: Slot, state_slot: Slot },
    #[error("empty committee")]
    EmptyCommittee,
    #[error("committee index {index} out of range ({count} committees this slot)")]
    CommitteeIndexOutOfRange { index: u64, count: u64 },
    #[error("no active validators to sample a proposer from")]
    NoActiveValidators,
    #[error("aggregation bits length {actual} does not match committee size {expected}")]
    AggregationBitsLength { expected: usize, actual: usize },
}

#[must_use]
pub fn get_current_epoch<P: Preset>(state: &impl BeaconState) -> Epoch {
    state.slot().epoch(P::SLOTS_PER_EPOCH)
}

#[must_use]
pub fn get_previous_epoch<P: Preset>(state: &impl BeaconState) -> Epoch {
    let current = get_current_epoch::<P>(state).get();
    Epoch::new(current.saturating_sub(1))
}

pub fn get_block_root_at_slot<P: Preset>(
    state: &impl BeaconState,
    slot: Slot,
) -> Result<H256, Error> {
    if slot >= state.slot() || state.slot().get() > slot.get() + P::SLOTS_PER_HISTORICAL_ROOT {
        return Err(Error::SlotOutOfRange {
            slot,
            state_slot: state.slot(),
        });
    }

    let index = slot.get() % P::SLOTS_PER_HISTORICAL_ROOT;

    Ok(*state
        .block_roots()
        .get()
        .get(index as usize)
        .expect("index bounded by ring capacity"))
}

pub fn get_block_root<P: Preset>(state: &impl BeaconState, epoch: Epoch) -> Result<H256, Error> {
    get_block_root_at_slot::<P>(state, epoch.start_slot(P::SLOTS_PER_EPOCH))
}

#[must_use]
pub fn get_randao_mix<P: Preset>(state: &impl BeaconState, epoch: Epoch) -> H256 {
    let index = epoch.get() % P::EPOCHS_PER_HISTORICAL_VECTOR;

    *state
        .randao_mixes()
        .get()
        .get(index as usize)
        .expect("index bounded by ring capacity")
}

#[must_use]
pub fn get_active_validator_indices(
    state: &impl BeaconState,
    epoch: Epoch,
) -> Vec<ValidatorIndex> {
    state
        .validators()
        .get()
        .iter()
        .enumerate()
        .filter(|(_, validator)| validator.is_active(epoch))
        .map(|(index, _)| ValidatorIndex::new(index as u32))
        .collect()
}

#[must_use]
pub fn get_total_balance(state: &impl BeaconState, indices: &[ValidatorIndex]) -> Gwei {
    let sum: Gwei = indices
        .iter()
        .map(|index| {
            *state
                .balances()
                .get()
                .get(usize::from(*index))
                .unwrap_or(&0)
        })
        .sum();

    sum.max(1)
}

#[must_use]
pub fn get_total_active_balance<P: Preset>(state: &impl BeaconState) -> Gwei {
    let epoch = get_current_epoch::<P>(state);
    let indices = get_active_validator_indices(state, epoch);
    get_total_balance(state, &indices)
}

#[must_use]
pub fn get_validator_churn_limit<P: Preset>(state: &impl BeaconState) -> u64 {
    let active_count = get_active_validator_indices(state, get_current_epoch::<P>(state)).len() as u64;
    (active_count / P::CHURN_LIMIT_QUOTIENT).max(P::MIN_PER_EPOCH_CHURN_LIMIT)
}

#[must_use]
pub fn get_seed<P: Preset>(state: &impl BeaconState, epoch: Epoch, domain_type: DomainType) -> H256 {
    let lookahead = P::EPOCHS_PER_HISTORICAL_VECTOR - P::MIN_SEED_LOOKAHEAD - 1;
    let mix_epoch = Epoch::new(epoch.get() + lookahead);
    let mix = get_randao_mix::<P>(state, mix_epoch);

    let mut preimage = Vec::with_capacity(4 + 8 + 32);
    preimage.extend_from_slice(&domain_type);
    preimage.extend_from_slice(&epoch.get().to_le_bytes());
    preimage.extend_from_slice(mix.as_bytes());

    hashing::hash(preimage)
}

#[must_use]
pub fn get_committee_count_per_slot<P: Preset>(state: &impl BeaconState, epoch: Epoch) -> u64 {
    let active_count = get_active_validator_indices(state, epoch).len() as u64;

    (active_count / P::SLOTS_PER_EPOCH / P::TARGET_COMMITTEE_SIZE)
        .clamp(1, P::MAX_COMMITTEES_PER_SLOT)
}

pub fn get_beacon_committee<P: Preset>(
    state: &impl BeaconState,
    slot: Slot,
    committee_index: u64,
) -> Result<Vec<ValidatorIndex>, Error> {
    let epoch = slot.epoch(P::SLOTS_PER_EPOCH);
    let committees_per_slot = get_committee_count_per_slot::<P>(state, epoch);

    if committee_index >= committees_per_slot {
        return Err(Error::CommitteeIndexOutOfRange {
            index: committee_index,
            count: committees_per_slot,
        });
    }

    let indices = get_active_validator_indices(state, epoch)
        .into_iter()
        .map(u64::from)
        .collect_vec();

    if indices.is_empty() {
        return Err(Error::EmptyCommittee);
    }

    let seed = get_seed::<P>(state, epoch, domains::BEACON_ATTESTER);
    let slot_in_epoch = slot.get() % P::SLOTS_PER_EPOCH;
    let index_in_epoch = slot_in_epoch * committees_per_slot + committee_index;
    let count = committees_per_slot * P::SLOTS_PER_EPOCH;

    let committee = compute_committee(
        &indices,
        seed,
        index_in_epoch,
        count,
        P::SHUFFLE_ROUND_COUNT,
    )
    .into_iter()
    .map(|index| ValidatorIndex::new(index as u32))
    .collect();

    Ok(committee)
}

pub fn compute_proposer_index<P: Preset>(
    state: &impl BeaconState,
    indices: &[ValidatorIndex],
    seed: H256,
) -> Result<ValidatorIndex, Error> {
    const MAX_RANDOM_BYTE: u64 = u8::MAX as u64;

    if indices.is_empty() {
        return Err(Error::NoActiveValidators);
    }

    let mut i = 0_u64;

    loop {
        let shuffled = compute_shuffled_index(
            i % indices.len() as u64,
            indices.len() as u64,
            seed,
            P::SHUFFLE_ROUND_COUNT,
        );
        let candidate = indices[shuffled as usize];

        let mut preimage = seed.as_bytes().to_vec();
        preimage.extend_from_slice(&(i / 32).to_le_bytes());
        let random_byte = hashing::hash(preimage).as_bytes()[(i % 32) as usize] as u64;

        let effective_balance = state
            .validators()
            .get()
            .get(usize::from(candidate))
            .map_or(0, |validator| validator.effective_balance);

        if effective_balance * MAX_RANDOM_BYTE >= P::MAX_EFFECTIVE_BALANCE * random_byte {
            return Ok(candidate);
        }

        i += 1;
    }
}

pub fn get_beacon_proposer_index<P: Preset>(
    state: &impl BeaconState,
) -> Result<ValidatorIndex, Error> {
    let epoch = get_current_epoch::<P>(state);

    let mut preimage = Vec::with_capacity(40);
    preimage.extend_from_slice(
        get_seed::<P>(state, epoch, domains::BEACON_PROPOSER).as_bytes(),
    );
    preimage.extend_from_slice(&state.slot().get().to_le_bytes());
    let seed = hashing::hash(preimage);

    let indices = get_active_validator_indices(state, epoch);

    compute_proposer_index::<P>(state, &indices, seed)
}

pub fn get_domain<P: Preset>(
    state: &impl BeaconState,
    domain_type: DomainType,
    message_epoch: Option<Epoch>,
) -> Domain {
    let epoch = message_epoch.unwrap_or_else(|| get_current_epoch::<P>(state));
    let fork = state.fork();

    let version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    crate::signing::compute_domain(domain_type, version, state.genesis_validators_root())
}

pub fn get_attesting_indices<P: Preset>(
    state: &impl BeaconState,
    data: &AttestationData,
    aggregation_bits: &ssz::BitList<{ types::preset::capacity::MAX_VALIDATORS_PER_COMMITTEE }>,
) -> Result<Vec<ValidatorIndex>, Error> {
    let committee = get_beacon_committee::<P>(state, data.slot, data.index)?;

    if aggregation_bits.len() != committee.len() {
        return Err(Error::AggregationBitsLength {
            expected: committee.len(),
            actual: aggregation_bits.len(),
        });
    }

    Ok(committee
        .into_iter()
        .enumerate()
        .filter(|(i, _)| aggregation_bits.get(*i).unwrap_or(false))
        .map(|(_, index)| index)
        .collect())
}

/// Altair+ per-validator sync-committee selection (spec.md §4.2's every-`EPOCHS_PER_SYNC_COMMITTEE_PERIOD`
/// rotation): rejection-sample 512 distinct active validators weighted by effective balance.
pub fn get_next_sync_committee_indices<P: Preset>(
    state: &impl BeaconState,
) -> Result<Vec<ValidatorIndex>, Error> {
    const MAX_RANDOM_BYTE: u64 = u8::MAX as u64;

    let epoch = Epoch::new(get_current_epoch::<P>(state).get() + 1);
    let active_indices = get_active_validator_indices(state, epoch);

    if active_indices.is_empty() {
        return Err(Error::NoActiveValidators);
    }

    let active_count = active_indices.len() as u64;
    let seed = get_seed::<P>(state, epoch, domains::SYNC_COMMITTEE);

    let mut i = 0_u64;
    let mut selected = Vec::with_capacity(P::SYNC_COMMITTEE_SIZE as usize);

    while selected.len() < P::SYNC_COMMITTEE_SIZE as usize {
        let shuffled = compute_shuffled_index(i % active_count, active_count, seed, P::SHUFFLE_ROUND_COUNT);
        let candidate = active_indices[shuffled as usize];

        let mut preimage = seed.as_bytes().to_vec();
        preimage.extend_from_slice(&(i / 32).to_le_bytes());
        let random_byte = hashing::hash(preimage).as_bytes()[(i % 32) as usize] as u64;

        let effective_balance = state
            .validators()
            .get()
            .get(usize::from(candidate))
            .map_or(0, |validator| validator.effective_balance);

        if effective_balance * MAX_RANDOM_BYTE >= P::MAX_EFFECTIVE_BALANCE * random_byte {
            selected.push(candidate);
        }

        i += 1;
    }

    Ok(selected)
}

pub fn get_next_sync_committee<P: Preset>(
    state: &impl BeaconState,
) -> Result<SyncCommittee, Error> {
    let indices = get_next_sync_committee_indices::<P>(state)?;

    let pubkeys = indices
        .iter()
        .map(|index| {
            state
                .validators()
                .get()
                .get(usize::from(*index))
                .map(|validator| validator.pubkey)
                .unwrap_or_default()
        })
        .collect_vec();

    let aggregate_pubkey = aggregate_pubkey_bytes(&pubkeys);

    Ok(SyncCommittee {
        pubkeys: ssz::Vector::try_from_iter(pubkeys).expect("exactly SYNC_COMMITTEE_SIZE entries"),
        aggregate_pubkey,
    })
}

fn aggregate_pubkey_bytes(pubkeys: &[bls::PublicKeyBytes]) -> bls::PublicKeyBytes {
    let keys = pubkeys
        .iter()
        .filter_map(|bytes| bytes.try_into_public_key().ok())
        .collect_vec();

    bls::aggregate_public_keys(&keys)
        .map(bls::PublicKey::to_bytes)
        .unwrap_or_default()
}

/// Altair per-flag reward eligibility (spec.md §4.2): which of the three participation flags an
/// attestation earns its attesters, based on how promptly it was included and whether its votes
/// match the state's view of head/target/source.
#[must_use]
pub fn get_attestation_participation_flags<P: Preset>(
    state: &impl BeaconState,
    data: &AttestationData,
    inclusion_delay: Slot,
) -> types::nonstandard::ParticipationFlags {
    use types::nonstandard::ParticipationFlags as Flags;

    let is_matching_source = {
        let justified = if data.target.epoch == get_current_epoch::<P>(state) {
            state.current_justified_checkpoint()
        } else {
            state.previous_justified_checkpoint()
        };

        data.source == justified
    };

    let is_matching_target = is_matching_source
        && get_block_root::<P>(state, data.target.epoch)
            .map(|root| root == data.target.root)
            .unwrap_or(false);

    let is_matching_head = is_matching_target
        && get_block_root_at_slot::<P>(state, data.slot)
            .map(|root| root == data.beacon_block_root)
            .unwrap_or(false);

    let mut flags = Flags::default();

    if is_matching_source && inclusion_delay.get() <= isqrt(P::SLOTS_PER_EPOCH) {
        flags = flags.with(Flags::TIMELY_SOURCE);
    }

    if is_matching_target && inclusion_delay.get() <= P::SLOTS_PER_EPOCH {
        flags = flags.with(Flags::TIMELY_TARGET);
    }

    if is_matching_head && inclusion_delay.get() == P::MIN_ATTESTATION_INCLUSION_DELAY {
        flags = flags.with(Flags::TIMELY_HEAD);
    }

    flags
}

fn isqrt(value: u64) -> u64 {
    if value == 0 {
        return 0;
    }

    let mut x = value;
    let mut y = (x + 1) / 2;

    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }

    x
}

#[must_use]
pub fn get_justification_bit_shifted(bits: BitVector<4>) -> BitVector<4> {
    let mut shifted = BitVector::default();

    for i in (1..4).rev() {
        shifted.set(i, bits.get(i - 1));
    }

    shifted
}

#[must_use]
pub fn finalizable_checkpoint(epoch: Epoch, root: H256) -> Checkpoint {
    Checkpoint { epoch, root }
}

#[must_use]
pub fn distinct_roots(checkpoints: &[Checkpoint]) -> HashSet<H256> {
    checkpoints.iter().map(|checkpoint| checkpoint.root).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isqrt_matches_known_values() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(8), 2);
        assert_eq!(isqrt(9), 3);
    }

    #[test]
    fn justification_bit_shift_moves_bits_up() {
        let mut bits = BitVector::<4>::default();
        bits.set(0, true);

        let shifted = get_justification_bit_shifted(bits);

        assert!(!shifted.get(0));
        assert!(shifted.get(1));
    }
}
