//! `process_epoch` (spec.md §4.2): justification/finalization, reward/penalty deltas, registry
//! updates, effective-balance updates, RANDAO mix rotation, historical-root append, and (Altair+)
//! participation-flag rotation and sync-committee rotation.
//!
//! Phase0 and Altair/Bellatrix diverge only in how attester participation is recorded
//! (`PendingAttestation` lists vs. a per-validator flag byte) and how rewards are derived from
//! it; every other sub-phase is written once against the narrow [`BeaconState`] trait and shared
//! by both `process_epoch` (Phase0) and `process_epoch_post_altair` (Altair, Bellatrix).

use std::collections::HashSet;

use itertools::Itertools as _;
use ssz::{Cached, ContiguousList, SszHash as _};
use types::{
    nonstandard::ParticipationFlags,
    phase0::{self, consts, Checkpoint, PendingAttestation},
    preset::{capacity, Preset},
    primitives::{Epoch, Gwei, ValidatorIndex},
    BeaconState, PostAltairBeaconState,
};

use crate::error::Error;
use helper_functions::accessors;

/// `get_total_balance`-scaled base reward, shared (with a deliberate simplification recorded in
/// `DESIGN.md`) by both the Phase0 per-attestation deltas and the Altair per-flag deltas: one
/// effective-balance increment earns `BASE_REWARD_FACTOR / sqrt(total_active_balance_in_increments)`
/// Gwei per epoch, split `BASE_REWARDS_PER_EPOCH` ways across source/target/head in Phase0, or
/// by flag weight in Altair.
pub(crate) fn base_reward<P: Preset>(effective_balance: Gwei, total_active_balance: Gwei) -> Gwei {
    let increments = effective_balance / P::EFFECTIVE_BALANCE_INCREMENT;
    let balance_increments = (total_active_balance / P::EFFECTIVE_BALANCE_INCREMENT).max(1);

    increments * P::BASE_REWARD_FACTOR / integer_sqrt(balance_increments) / P::BASE_REWARDS_PER_EPOCH
}

pub(crate) fn integer_sqrt(value: u64) -> u64 {
    if value == 0 {
        return 0;
    }

    let mut x = value;
    let mut y = (x + 1) / 2;

    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }

    x.max(1)
}

pub(crate) fn increase_balance(state: &mut impl BeaconState, index: ValidatorIndex, delta: Gwei) {
    if let Some(balance) = state.balances_mut().get_mut().get_mut(index) {
        *balance += delta;
    }
}

pub(crate) fn decrease_balance(state: &mut impl BeaconState, index: ValidatorIndex, delta: Gwei) {
    if let Some(balance) = state.balances_mut().get_mut().get_mut(index) {
        *balance = balance.saturating_sub(delta);
    }
}

// ---------------------------------------------------------------------------------------------
// Justification and finalization
// ---------------------------------------------------------------------------------------------

fn weigh_justification_and_finalization<P: Preset>(
    state: &mut impl BeaconState,
    total_active_balance: Gwei,
    previous_target_balance: Gwei,
    current_target_balance: Gwei,
) -> Result<(), Error> {
    let previous_epoch = accessors::get_previous_epoch::<P>(state);
    let current_epoch = accessors::get_current_epoch::<P>(state);

    if current_epoch.get() <= consts::GENESIS_EPOCH.get() + 1 {
        return Ok(());
    }

    let old_previous_justified = state.previous_justified_checkpoint();
    let old_current_justified = state.current_justified_checkpoint();

    *state.previous_justified_checkpoint_mut() = old_current_justified;

    let mut bits = state.justification_bits();
    bits.shift_up_and_set_lowest(false);

    if previous_target_balance.saturating_mul(3) >= total_active_balance.saturating_mul(2) {
        let root = accessors::get_block_root::<P>(state, previous_epoch)?;
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: previous_epoch,
            root,
        };
        bits.set(1, true);
    }

    if current_target_balance.saturating_mul(3) >= total_active_balance.saturating_mul(2) {
        let root = accessors::get_block_root::<P>(state, current_epoch)?;
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: current_epoch,
            root,
        };
        bits.set(0, true);
    }

    *state.justification_bits_mut() = bits.clone();

    if bits.get(1) && bits.get(2) && bits.get(3) && old_previous_justified.epoch.get() + 3 == current_epoch.get() {
        *state.finalized_checkpoint_mut() = old_previous_justified;
    }

    if bits.get(1) && bits.get(2) && old_previous_justified.epoch.get() + 2 == current_epoch.get() {
        *state.finalized_checkpoint_mut() = old_previous_justified;
    }

    if bits.get(0) && bits.get(1) && bits.get(2) && old_current_justified.epoch.get() + 2 == current_epoch.get() {
        *state.finalized_checkpoint_mut() = old_current_justified;
    }

    if bits.get(0) && bits.get(1) && old_current_justified.epoch.get() + 1 == current_epoch.get() {
        *state.finalized_checkpoint_mut() = old_current_justified;
    }

    Ok(())
}

fn matching_target_indices_phase0<P: Preset>(
    state: &phase0::BeaconState,
    epoch: Epoch,
    attestations: &ContiguousList<PendingAttestation, { capacity::MAX_ATTESTATIONS }>,
) -> Result<HashSet<ValidatorIndex>, Error> {
    let target_root = accessors::get_block_root::<P>(state, epoch)?;

    let mut indices = HashSet::new();

    for attestation in attestations.iter() {
        if attestation.data.target.root != target_root {
            continue;
        }

        for index in accessors::get_attesting_indices::<P>(
            state,
            &attestation.data,
            &attestation.aggregation_bits,
        )? {
            indices.insert(index);
        }
    }

    Ok(indices)
}

fn matching_target_balance_phase0<P: Preset>(
    state: &phase0::BeaconState,
    epoch: Epoch,
    attestations: &ContiguousList<PendingAttestation, { capacity::MAX_ATTESTATIONS }>,
) -> Result<Gwei, Error> {
    let indices = matching_target_indices_phase0::<P>(state, epoch, attestations)?;

    Ok(accessors::get_total_balance(
        state,
        &indices.into_iter().collect_vec(),
    ))
}

pub fn process_justification_and_finalization_phase0<P: Preset>(
    state: &mut phase0::BeaconState,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);

    if current_epoch.get() <= consts::GENESIS_EPOCH.get() + 1 {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch::<P>(state);
    let total_active_balance = accessors::get_total_active_balance::<P>(state);

    let previous_target_balance = matching_target_balance_phase0::<P>(
        state,
        previous_epoch,
        state.previous_epoch_attestations.get(),
    )?;
    let current_target_balance = matching_target_balance_phase0::<P>(
        state,
        current_epoch,
        state.current_epoch_attestations.get(),
    )?;

    weigh_justification_and_finalization::<P>(
        state,
        total_active_balance,
        previous_target_balance,
        current_target_balance,
    )
}

fn unslashed_participating_balance<P: Preset, S: PostAltairBeaconState>(
    state: &S,
    epoch: Epoch,
    flag: u8,
) -> Result<Gwei, Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);
    let participation = if epoch == current_epoch {
        state.current_epoch_participation()
    } else {
        state.previous_epoch_participation()
    };

    let indices = accessors::get_active_validator_indices(state, epoch)
        .into_iter()
        .filter(|index| {
            let unslashed = state
                .validators()
                .get()
                .get(*index)
                .map_or(false, |validator| !validator.slashed);

            let has_flag = participation
                .get()
                .get(*index)
                .map_or(false, |flags| flags.has(flag));

            unslashed && has_flag
        })
        .collect_vec();

    Ok(accessors::get_total_balance(state, &indices))
}

pub fn process_justification_and_finalization_altair<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);

    if current_epoch.get() <= consts::GENESIS_EPOCH.get() + 1 {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch::<P>(state);
    let total_active_balance = accessors::get_total_active_balance::<P>(state);

    let previous_target_balance = unslashed_participating_balance::<P, S>(
        state,
        previous_epoch,
        ParticipationFlags::TIMELY_TARGET,
    )?;
    let current_target_balance = unslashed_participating_balance::<P, S>(
        state,
        current_epoch,
        ParticipationFlags::TIMELY_TARGET,
    )?;

    weigh_justification_and_finalization::<P>(
        state,
        total_active_balance,
        previous_target_balance,
        current_target_balance,
    )
}

// ---------------------------------------------------------------------------------------------
// Rewards and penalties
// ---------------------------------------------------------------------------------------------

pub fn process_rewards_and_penalties_phase0<P: Preset>(
    state: &mut phase0::BeaconState,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);

    if current_epoch == consts::GENESIS_EPOCH {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch::<P>(state);
    let total_active_balance = accessors::get_total_active_balance::<P>(state);

    let source_indices = matching_source_indices_phase0::<P>(state, previous_epoch)?;
    let target_indices = matching_target_indices_phase0::<P>(
        state,
        previous_epoch,
        state.previous_epoch_attestations.get(),
    )?;
    let head_indices = matching_head_indices_phase0::<P>(state, previous_epoch)?;

    let eligible_indices = accessors::get_active_validator_indices(state, previous_epoch);

    for index in eligible_indices {
        let validator = match state.validators.get().get(index) {
            Some(validator) => *validator,
            None => continue,
        };

        let reward = base_reward::<P>(validator.effective_balance, total_active_balance);

        if source_indices.contains(&index) {
            increase_balance(state, index, reward);
        } else {
            decrease_balance(state, index, reward);
        }

        if target_indices.contains(&index) {
            increase_balance(state, index, reward);
        } else {
            decrease_balance(state, index, reward);
        }

        if head_indices.contains(&index) {
            increase_balance(state, index, reward);
        } else {
            decrease_balance(state, index, reward);
        }
    }

    Ok(())
}

fn matching_source_indices_phase0<P: Preset>(
    state: &phase0::BeaconState,
    epoch: Epoch,
) -> Result<HashSet<ValidatorIndex>, Error> {
    let source = state.previous_justified_checkpoint;
    let mut indices = HashSet::new();

    for attestation in state.previous_epoch_attestations.get().iter() {
        if attestation.data.target.epoch != epoch || attestation.data.source != source {
            continue;
        }

        for index in accessors::get_attesting_indices::<P>(
            state,
            &attestation.data,
            &attestation.aggregation_bits,
        )? {
            indices.insert(index);
        }
    }

    Ok(indices)
}

fn matching_head_indices_phase0<P: Preset>(
    state: &phase0::BeaconState,
    epoch: Epoch,
) -> Result<HashSet<ValidatorIndex>, Error> {
    let mut indices = HashSet::new();

    for attestation in state.previous_epoch_attestations.get().iter() {
        if attestation.data.target.epoch != epoch {
            continue;
        }

        let matches_head = accessors::get_block_root_at_slot::<P>(state, attestation.data.slot)
            .map(|root| root == attestation.data.beacon_block_root)
            .unwrap_or(false);

        if !matches_head {
            continue;
        }

        for index in accessors::get_attesting_indices::<P>(
            state,
            &attestation.data,
            &attestation.aggregation_bits,
        )? {
            indices.insert(index);
        }
    }

    Ok(indices)
}

pub(crate) const FLAG_WEIGHTS: [(u8, u64); 3] = [
    (ParticipationFlags::TIMELY_SOURCE, 14),
    (ParticipationFlags::TIMELY_TARGET, 26),
    (ParticipationFlags::TIMELY_HEAD, 14),
];
pub(crate) const WEIGHT_DENOMINATOR: u64 = 64;

/// `get_flag_index_deltas` (Altair): every one of the three participation flags earns or
/// forfeits its own weighted share of the base reward, independent of the other two.
pub fn process_rewards_and_penalties_altair<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);

    if current_epoch == consts::GENESIS_EPOCH {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch::<P>(state);
    let total_active_balance = accessors::get_total_active_balance::<P>(state);

    let flag_balances = FLAG_WEIGHTS
        .iter()
        .map(|(flag, _)| unslashed_participating_balance::<P, S>(state, previous_epoch, *flag))
        .collect::<Result<Vec<_>, Error>>()?;

    let eligible_indices = accessors::get_active_validator_indices(state, previous_epoch);
    let participation = state.previous_epoch_participation().get().clone();

    for index in eligible_indices {
        let validator = match state.validators().get().get(index) {
            Some(validator) => *validator,
            None => continue,
        };

        let reward = base_reward::<P>(validator.effective_balance, total_active_balance);
        let flags = participation.get(index).copied().unwrap_or_default();
        let is_in_inactivity_leak = is_in_inactivity_leak::<P>(state, previous_epoch);

        for (flag_index, (flag, weight)) in FLAG_WEIGHTS.iter().enumerate() {
            let flag_balance = flag_balances[flag_index];

            if flags.has(*flag) {
                if !is_in_inactivity_leak {
                    let numerator = reward * weight * (flag_balance / P::EFFECTIVE_BALANCE_INCREMENT).max(1);
                    let denominator = WEIGHT_DENOMINATOR
                        * (total_active_balance / P::EFFECTIVE_BALANCE_INCREMENT).max(1);
                    increase_balance(state, index, numerator / denominator.max(1));
                }
            } else {
                decrease_balance(state, index, reward * weight / WEIGHT_DENOMINATOR);
            }
        }
    }

    Ok(())
}

fn is_in_inactivity_leak<P: Preset>(state: &impl BeaconState, epoch: Epoch) -> bool {
    let finalized = state.finalized_checkpoint().epoch;
    epoch.get().saturating_sub(finalized.get()) > P::MIN_EPOCHS_TO_INACTIVITY_PENALTY
}

/// Altair inactivity-score bookkeeping, run before rewards/penalties: scores rise for
/// non-participants and decay for participants, and during a long inactivity leak they directly
/// drain balances proportional to the score (spec.md §4.2's per-epoch registry bookkeeping).
pub fn process_inactivity_updates<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);

    if current_epoch == consts::GENESIS_EPOCH {
        return Ok(());
    }

    let previous_epoch = accessors::get_previous_epoch::<P>(state);
    let in_leak = is_in_inactivity_leak::<P>(state, previous_epoch);
    let eligible_indices = accessors::get_active_validator_indices(state, previous_epoch);

    let target_participation = state.previous_epoch_participation().get().clone();

    for index in eligible_indices {
        let is_timely_target = target_participation
            .get(index)
            .map_or(false, |flags| flags.has(ParticipationFlags::TIMELY_TARGET));

        let score = state
            .inactivity_scores_mut()
            .get_mut()
            .get_mut(index)
            .copied()
            .unwrap_or(0);

        let score = if is_timely_target {
            score.saturating_sub(1.min(score))
        } else {
            score + P::INACTIVITY_SCORE_BIAS
        };

        let score = if in_leak {
            score
        } else {
            score.saturating_sub(P::INACTIVITY_SCORE_RECOVERY_RATE.min(score))
        };

        if let Some(slot) = state.inactivity_scores_mut().get_mut().get_mut(index) {
            *slot = score;
        }

        if in_leak {
            let validator = state.validators().get().get(index).copied().unwrap_or_default();
            let penalty_numerator = validator.effective_balance * score;
            let penalty_denominator =
                P::INACTIVITY_SCORE_BIAS * P::INACTIVITY_PENALTY_QUOTIENT_ALTAIR;
            decrease_balance(state, index, penalty_numerator / penalty_denominator.max(1));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------------------------
// Shared registry / slashings / housekeeping (identical across forks)
// ---------------------------------------------------------------------------------------------

pub fn process_registry_updates<P: Preset>(state: &mut impl BeaconState) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);
    let validator_count = state.validators().get().len();

    let mut activation_eligible = Vec::new();
    let mut ejected = Vec::new();

    for index in 0..validator_count {
        let index = ValidatorIndex::new(index as u32);
        let validator = *state.validators().get().get(index).expect("bounded by loop");

        if validator.is_eligible_for_activation_queue(consts::FAR_FUTURE_EPOCH)
            && validator.effective_balance == P::MAX_EFFECTIVE_BALANCE
        {
            activation_eligible.push(index);
        }

        if validator.is_active(current_epoch)
            && validator.effective_balance <= P::EJECTION_BALANCE
            && validator.exit_epoch == consts::FAR_FUTURE_EPOCH
        {
            ejected.push(index);
        }
    }

    for index in activation_eligible {
        if let Some(validator) = state.validators_mut().get_mut().get_mut(index) {
            validator.activation_eligibility_epoch = Epoch::new(current_epoch.get() + 1);
        }
    }

    for index in ejected {
        crate::operations::initiate_validator_exit::<P>(state, index);
    }

    let activation_queue = (0..state.validators().get().len())
        .map(|index| ValidatorIndex::new(index as u32))
        .filter(|index| {
            let validator = state.validators().get().get(*index).expect("bounded");
            validator.activation_eligibility_epoch != consts::FAR_FUTURE_EPOCH
                && validator.activation_epoch == consts::FAR_FUTURE_EPOCH
        })
        .sorted_by_key(|index| {
            state
                .validators()
                .get()
                .get(*index)
                .expect("bounded")
                .activation_eligibility_epoch
        })
        .collect_vec();

    let churn_limit = accessors::get_validator_churn_limit::<P>(state) as usize;
    let delayed_activation_epoch = compute_activation_exit_epoch::<P>(current_epoch);

    for index in activation_queue.into_iter().take(churn_limit) {
        if let Some(validator) = state.validators_mut().get_mut().get_mut(index) {
            validator.activation_epoch = delayed_activation_epoch;
        }
    }

    Ok(())
}

/// `compute_activation_exit_epoch`: activations/exits only ever take effect after the
/// seed-lookahead delay, so that shuffling for the affected epoch is already fixed when the
/// change becomes visible.
#[must_use]
pub fn compute_activation_exit_epoch<P: Preset>(epoch: Epoch) -> Epoch {
    Epoch::new(epoch.get() + 1 + P::MAX_SEED_LOOKAHEAD)
}

/// `is_bellatrix` selects between the Bellatrix and pre-Bellatrix proportional-slashing
/// multiplier (`types::preset::Preset`'s `_BELLATRIX`-suffixed vs. plain constant); Phase0 and
/// Altair share the smaller multiplier.
pub fn process_slashings<P: Preset>(
    state: &mut impl BeaconState,
    is_bellatrix: bool,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);
    let total_balance = accessors::get_total_active_balance::<P>(state);
    let total_slashings: Gwei = state.slashings().get().iter().copied().sum();

    let proportional_slashing_multiplier = if is_bellatrix {
        P::PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX
    } else {
        P::PROPORTIONAL_SLASHING_MULTIPLIER
    };

    let adjusted_total_slashing_balance = total_slashings
        .saturating_mul(proportional_slashing_multiplier)
        .min(total_balance);

    let validator_count = state.validators().get().len();

    for i in 0..validator_count {
        let index = ValidatorIndex::new(i as u32);
        let validator = *state.validators().get().get(index).expect("bounded");

        let half_epochs = P::EPOCHS_PER_SLASHINGS_VECTOR / 2;

        if validator.slashed
            && current_epoch.get() + half_epochs == validator.withdrawable_epoch.get()
        {
            let increment = P::EFFECTIVE_BALANCE_INCREMENT;
            let penalty_numerator = (validator.effective_balance / increment)
                * adjusted_total_slashing_balance;
            let penalty = (penalty_numerator / total_balance.max(1)) * increment;

            decrease_balance(state, index, penalty);
        }
    }

    Ok(())
}

pub fn process_effective_balance_updates<P: Preset>(
    state: &mut impl BeaconState,
) -> Result<(), Error> {
    let hysteresis_increment = P::EFFECTIVE_BALANCE_INCREMENT / P::HYSTERESIS_QUOTIENT;
    let downward_threshold = hysteresis_increment * P::HYSTERESIS_DOWNWARD_MULTIPLIER;
    let upward_threshold = hysteresis_increment * P::HYSTERESIS_UPWARD_MULTIPLIER;

    let validator_count = state.validators().get().len();

    for i in 0..validator_count {
        let index = ValidatorIndex::new(i as u32);
        let balance = *state.balances().get().get(index).unwrap_or(&0);
        let effective_balance = state
            .validators()
            .get()
            .get(index)
            .map_or(0, |validator| validator.effective_balance);

        if balance + downward_threshold < effective_balance
            || effective_balance + upward_threshold < balance
        {
            let new_effective_balance = (balance - balance % P::EFFECTIVE_BALANCE_INCREMENT)
                .min(P::MAX_EFFECTIVE_BALANCE);

            if let Some(validator) = state.validators_mut().get_mut().get_mut(index) {
                validator.effective_balance = new_effective_balance;
            }
        }
    }

    Ok(())
}

pub fn process_slashings_reset<P: Preset>(state: &mut impl BeaconState) -> Result<(), Error> {
    let next_epoch = Epoch::new(accessors::get_current_epoch::<P>(state).get() + 1);
    let index = (next_epoch.get() % P::EPOCHS_PER_SLASHINGS_VECTOR) as usize;

    if let Some(slashings) = state.slashings_mut().get_mut().get_mut(index) {
        *slashings = 0;
    }

    Ok(())
}

pub fn process_randao_mixes_reset<P: Preset>(state: &mut impl BeaconState) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);
    let next_epoch = Epoch::new(current_epoch.get() + 1);

    let mix = accessors::get_randao_mix::<P>(state, current_epoch);
    let index = (next_epoch.get() % P::EPOCHS_PER_HISTORICAL_VECTOR) as usize;

    if let Some(slot) = state.randao_mixes_mut().get_mut().get_mut(index) {
        *slot = mix;
    }

    Ok(())
}

pub fn process_historical_roots_update<P: Preset>(
    state: &mut impl BeaconState,
) -> Result<(), Error> {
    let next_epoch = Epoch::new(accessors::get_current_epoch::<P>(state).get() + 1);
    let period = P::SLOTS_PER_HISTORICAL_ROOT / P::SLOTS_PER_EPOCH;

    if next_epoch.get() % period != 0 {
        return Ok(());
    }

    let block_roots_root = ssz::SszHash::hash_tree_root(state.block_roots().get());
    let state_roots_root = ssz::SszHash::hash_tree_root(state.state_roots().get());
    let combined = hashing::hash_256_256(block_roots_root, state_roots_root);

    state.historical_roots_mut().get_mut().push(combined)?;

    Ok(())
}

/// Rotates `eth1_data_votes` back to empty at the start of a fresh voting period, and drains the
/// previous epoch's `PendingAttestation`/participation bookkeeping. Phase0-only: Altair+ uses
/// [`process_participation_flag_updates`] instead, since there are no `PendingAttestation` lists
/// to rotate.
pub fn process_participation_record_updates(state: &mut phase0::BeaconState) -> Result<(), Error> {
    state.previous_epoch_attestations = state.current_epoch_attestations.clone();
    state.current_epoch_attestations = Cached::new(ContiguousList::default());

    Ok(())
}

pub fn process_participation_flag_updates<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
) -> Result<(), Error> {
    let current = state.current_epoch_participation().get().clone();

    *state.previous_epoch_participation_mut() = Cached::new(current);
    *state.current_epoch_participation_mut() =
        Cached::new(ContiguousList::repeat_zero_with_length_of(
            state.previous_epoch_participation().get(),
        ));

    Ok(())
}

pub fn process_sync_committee_updates<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
) -> Result<(), Error> {
    let next_epoch = Epoch::new(accessors::get_current_epoch::<P>(state).get() + 1);

    if next_epoch.get() % P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD != 0 {
        return Ok(());
    }

    let next_sync_committee = accessors::get_next_sync_committee::<P>(state)?;
    let promoted = state.next_sync_committee().clone();

    *state.current_sync_committee_mut() = promoted;
    *state.next_sync_committee_mut() = next_sync_committee;

    Ok(())
}

/// Full Phase0 `process_epoch` (spec.md §4.2).
pub fn process_epoch<P: Preset>(state: &mut phase0::BeaconState) -> Result<(), Error> {
    process_justification_and_finalization_phase0::<P>(state)?;
    process_rewards_and_penalties_phase0::<P>(state)?;
    process_registry_updates::<P>(state)?;
    process_slashings::<P>(state, false)?;
    reset_eth1_data_votes::<P>(state);
    process_effective_balance_updates::<P>(state)?;
    process_slashings_reset::<P>(state)?;
    process_randao_mixes_reset::<P>(state)?;
    process_historical_roots_update::<P>(state)?;
    process_participation_record_updates(state)?;

    Ok(())
}

/// Full Altair/Bellatrix `process_epoch` (spec.md §4.2): identical shape, but participation
/// lives in flag bytes and the sync-committee rotation/inactivity-score bookkeeping is added.
/// `is_bellatrix` distinguishes Altair from Bellatrix for [`process_slashings`]'s
/// fork-dependent constants; the caller knows the concrete fork statically (it matched on
/// `ForkedBeaconState` to get here) so this is a plain bool rather than a runtime lookup.
pub fn process_epoch_post_altair<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
    is_bellatrix: bool,
) -> Result<(), Error> {
    process_justification_and_finalization_altair::<P, S>(state)?;
    process_inactivity_updates::<P, S>(state)?;
    process_rewards_and_penalties_altair::<P, S>(state)?;
    process_registry_updates::<P>(state)?;
    process_slashings::<P>(state, is_bellatrix)?;
    reset_eth1_data_votes::<P>(state);
    process_effective_balance_updates::<P>(state)?;
    process_slashings_reset::<P>(state)?;
    process_randao_mixes_reset::<P>(state)?;
    process_historical_roots_update::<P>(state)?;
    process_participation_flag_updates::<P, S>(state)?;
    process_sync_committee_updates::<P, S>(state)?;

    Ok(())
}

fn reset_eth1_data_votes<P: Preset>(state: &mut impl BeaconState) {
    let next_epoch = Epoch::new(accessors::get_current_epoch::<P>(state).get() + 1);
    let period = capacity::ETH1_DATA_VOTES_LENGTH as u64 / P::SLOTS_PER_EPOCH;

    if next_epoch.get() % period == 0 {
        *state.eth1_data_votes_mut() = Cached::new(ContiguousList::default());
    }
}

#[cfg(test)]
mod tests {
    use types::Minimal;

    use super::*;

    #[test]
    fn base_reward_scales_with_effective_balance() {
        let small = base_reward::<Minimal>(1_000_000_000, 1_000_000_000_000);
        let large = base_reward::<Minimal>(32_000_000_000, 1_000_000_000_000);

        assert!(large > small);
    }

    #[test]
    fn process_epoch_phase0_does_not_panic_on_default_state() {
        let mut state = phase0::BeaconState::default();
        state.slot = types::primitives::Slot::new(Minimal::SLOTS_PER_EPOCH);

        process_epoch::<Minimal>(&mut state).expect("default state is a degenerate but valid input");
    }
}
