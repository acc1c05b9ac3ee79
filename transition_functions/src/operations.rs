//! `process_operations` (spec.md §4.2): the five fixed-order per-block operations plus the
//! Altair+ sync aggregate and Bellatrix+ execution payload. Every function here is written once
//! against [`BeaconState`]/[`BlockBody`] and shared across forks; only attestation processing
//! and reward accounting fork into a Phase0 and an Altair+ variant, since those are the two
//! places the validator-participation bookkeeping itself changed shape.

use std::cmp;

use bls::SignatureBytes;
use helper_functions::{accessors, predicates, signing};
use itertools::Itertools as _;
use ssz::{ContiguousList, Ssz, SszHash as _};
use types::{
    config::{domains, Config},
    phase0::{
        self, consts, Attestation, AttesterSlashing, Deposit, Eth1Data, IndexedAttestation,
        ProposerSlashing, SignedVoluntaryExit,
    },
    preset::{capacity, Preset},
    primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256},
    BeaconState, HasSyncAggregate, PostAltairBeaconState,
};

use crate::{
    epoch_processing::{base_reward, compute_activation_exit_epoch, decrease_balance, increase_balance},
    error::Error,
};

/// `initiate_validator_exit` (spec.md §4.2): queues `index` to leave at the next slot the
/// per-epoch churn limit has room for, or leaves its `exit_epoch` untouched if it is already
/// exiting. Infallible: an index that is already exiting or that cannot be looked up is simply
/// left alone, matching the real network's behaviour of silently no-opping a redundant exit.
pub fn initiate_validator_exit<P: Preset>(state: &mut impl BeaconState, index: ValidatorIndex) {
    let Some(validator) = state.validators().get().get(index).copied() else {
        return;
    };

    if validator.exit_epoch != consts::FAR_FUTURE_EPOCH {
        return;
    }

    let current_epoch = accessors::get_current_epoch::<P>(state);
    let churn_limit = accessors::get_validator_churn_limit::<P>(state);

    let validator_count = state.validators().get().len();

    let mut exit_epochs = (0..validator_count)
        .map(|i| ValidatorIndex::new(i as u32))
        .filter_map(|i| state.validators().get().get(i).copied())
        .filter(|v| v.exit_epoch != consts::FAR_FUTURE_EPOCH)
        .map(|v| v.exit_epoch)
        .collect_vec();

    exit_epochs.sort_unstable();

    let mut exit_queue_epoch = exit_epochs
        .last()
        .copied()
        .unwrap_or_else(|| compute_activation_exit_epoch::<P>(current_epoch))
        .max(compute_activation_exit_epoch::<P>(current_epoch));

    let exit_queue_churn = exit_epochs
        .iter()
        .filter(|&&epoch| epoch == exit_queue_epoch)
        .count() as u64;

    if exit_queue_churn >= churn_limit {
        exit_queue_epoch = Epoch::new(exit_queue_epoch.get() + 1);
    }

    if let Some(validator) = state.validators_mut().get_mut().get_mut(index) {
        validator.exit_epoch = exit_queue_epoch;
        validator.withdrawable_epoch =
            Epoch::new(exit_queue_epoch.get() + P::MIN_VALIDATOR_WITHDRAWABILITY_DELAY);
    }
}

/// `slash_validator` (spec.md §4.2): ejects the validator, applies the slashing penalty, and
/// splits the whistleblower reward between the proposer and whoever reported the slashing (the
/// proposer, if no separate whistleblower is named). `is_bellatrix` selects between the
/// Bellatrix and pre-Bellatrix minimum-slashing-penalty quotient (`types::preset::Preset`'s
/// `_BELLATRIX`-suffixed vs. plain constants).
pub fn slash_validator<P: Preset>(
    state: &mut impl BeaconState,
    slashed_index: ValidatorIndex,
    whistleblower_index: Option<ValidatorIndex>,
    is_bellatrix: bool,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);

    initiate_validator_exit::<P>(state, slashed_index);

    let Some(validator) = state.validators_mut().get_mut().get_mut(slashed_index) else {
        return Err(Error::Invalid("slashed index out of range".to_owned()));
    };

    validator.slashed = true;
    validator.withdrawable_epoch = cmp::max(
        validator.withdrawable_epoch,
        Epoch::new(current_epoch.get() + P::EPOCHS_PER_SLASHINGS_VECTOR),
    );

    let effective_balance = validator.effective_balance;

    let slashing_index = (current_epoch.get() % P::EPOCHS_PER_SLASHINGS_VECTOR) as usize;

    if let Some(slashings) = state.slashings_mut().get_mut().get_mut(slashing_index) {
        *slashings += effective_balance;
    }

    let min_slashing_penalty_quotient = if is_bellatrix {
        P::MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX
    } else {
        P::MIN_SLASHING_PENALTY_QUOTIENT
    };

    decrease_balance(
        state,
        slashed_index,
        effective_balance / min_slashing_penalty_quotient,
    );

    let proposer_index = accessors::get_beacon_proposer_index::<P>(state)?;
    let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);

    let whistleblower_reward = effective_balance / P::WHISTLEBLOWER_REWARD_QUOTIENT;
    let proposer_reward = whistleblower_reward * P::PROPOSER_WEIGHT / P::WEIGHT_DENOMINATOR;

    increase_balance(state, proposer_index, proposer_reward);
    increase_balance(
        state,
        whistleblower_index,
        whistleblower_reward.saturating_sub(proposer_reward),
    );

    Ok(())
}

/// `process_proposer_slashing` (spec.md §4.2): both halves of the slashing must name the same
/// proposer and slot, disagree in content, and both carry a valid signature; the named proposer
/// must still be slashable.
pub fn process_proposer_slashing<P: Preset>(
    state: &mut impl BeaconState,
    slashing: &ProposerSlashing,
    is_bellatrix: bool,
) -> Result<(), Error> {
    let header_1 = &slashing.signed_header_1.message;
    let header_2 = &slashing.signed_header_2.message;

    if header_1.slot != header_2.slot {
        return Err(Error::Invalid("proposer slashing slots differ".to_owned()));
    }

    if header_1.proposer_index != header_2.proposer_index {
        return Err(Error::Invalid(
            "proposer slashing proposer indices differ".to_owned(),
        ));
    }

    if header_1 == header_2 {
        return Err(Error::Invalid(
            "proposer slashing headers are identical".to_owned(),
        ));
    }

    let proposer_index = header_1.proposer_index;

    let validator = state
        .validators()
        .get()
        .get(proposer_index)
        .copied()
        .ok_or_else(|| Error::Invalid("proposer slashing index out of range".to_owned()))?;

    let current_epoch = accessors::get_current_epoch::<P>(state);

    if !validator.is_slashable(current_epoch) {
        return Err(Error::NotSlashable);
    }

    for signed_header in [&slashing.signed_header_1, &slashing.signed_header_2] {
        let domain = accessors::get_domain::<P>(
            state,
            domains::BEACON_PROPOSER,
            Some(signed_header.message.slot.epoch(P::SLOTS_PER_EPOCH)),
        );

        let signing_root =
            signing::compute_signing_root(signed_header.message.hash_tree_root(), domain);

        let public_key = validator.pubkey.try_into_public_key()?;
        let signature = signed_header.signature.try_into_signature()?;

        signature.verify(public_key, signing_root.as_bytes())?;
    }

    slash_validator::<P>(state, proposer_index, None, is_bellatrix)
}

/// `is_slashable_attestation_data`: the two data records vote for the same target (a "double
/// vote") or one's source/target span surrounds the other's (a "surround vote").
#[must_use]
fn is_slashable_attestation_data(a: &phase0::AttestationData, b: &phase0::AttestationData) -> bool {
    let double_vote = a != b && a.target.epoch == b.target.epoch;

    let surround_vote = a.source.epoch < b.source.epoch && b.target.epoch < a.target.epoch;

    double_vote || surround_vote
}

/// `process_attester_slashing` (spec.md §4.2): both attestations must be individually valid and
/// mutually slashable; every validator named in both is slashed.
pub fn process_attester_slashing<P: Preset>(
    state: &mut impl BeaconState,
    slashing: &AttesterSlashing,
    is_bellatrix: bool,
) -> Result<(), Error> {
    let attestation_1 = &slashing.attestation_1;
    let attestation_2 = &slashing.attestation_2;

    if !is_slashable_attestation_data(&attestation_1.data, &attestation_2.data) {
        return Err(Error::Invalid(
            "attester slashing attestations are not mutually slashable".to_owned(),
        ));
    }

    predicates::is_valid_indexed_attestation::<P>(state, attestation_1, false)?;
    predicates::is_valid_indexed_attestation::<P>(state, attestation_2, false)?;

    let indices_1: std::collections::HashSet<_> =
        attestation_1.attesting_indices.iter().copied().collect();
    let indices_2: std::collections::HashSet<_> =
        attestation_2.attesting_indices.iter().copied().collect();

    let mut slashed_any = false;

    let mut slashable_indices = indices_1.intersection(&indices_2).copied().collect_vec();
    slashable_indices.sort_unstable();

    let current_epoch = accessors::get_current_epoch::<P>(state);

    for index in slashable_indices {
        let Some(validator) = state.validators().get().get(index).copied() else {
            continue;
        };

        if validator.is_slashable(current_epoch) {
            slash_validator::<P>(state, index, None, is_bellatrix)?;
            slashed_any = true;
        }
    }

    if !slashed_any {
        return Err(Error::Invalid(
            "attester slashing slashed no validators".to_owned(),
        ));
    }

    Ok(())
}

/// Shared attestation-content checks (spec.md §4.2), independent of how participation ends up
/// being recorded.
fn validate_attestation_data<P: Preset>(
    state: &impl BeaconState,
    data: &phase0::AttestationData,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);
    let previous_epoch = accessors::get_previous_epoch::<P>(state);

    if data.target.epoch != current_epoch && data.target.epoch != previous_epoch {
        return Err(Error::AttestationTargetEpochMismatch {
            target: data.target.epoch,
        });
    }

    if data.target.epoch != data.slot.epoch(P::SLOTS_PER_EPOCH) {
        return Err(Error::AttestationTargetEpochMismatch {
            target: data.target.epoch,
        });
    }

    let min_slot = Slot::new(data.slot.get() + P::MIN_ATTESTATION_INCLUSION_DELAY);
    let max_slot = Slot::new(data.slot.get() + P::SLOTS_PER_EPOCH);

    if state.slot() < min_slot || state.slot() > max_slot {
        return Err(Error::AttestationOutsideInclusionWindow {
            slot: state.slot(),
            min: min_slot,
            max: max_slot,
        });
    }

    let committee_count = accessors::get_committee_count_per_slot::<P>(state, data.target.epoch);

    if data.index >= committee_count {
        return Err(Error::AttestationBadCommitteeIndex { index: data.index });
    }

    Ok(())
}

fn get_indexed_attestation<P: Preset>(
    state: &impl BeaconState,
    attestation: &Attestation,
) -> Result<IndexedAttestation, Error> {
    let attesting_indices = accessors::get_attesting_indices::<P>(
        state,
        &attestation.data,
        &attestation.aggregation_bits,
    )?;

    let mut attesting_indices = attesting_indices;
    attesting_indices.sort_unstable();

    Ok(IndexedAttestation {
        attesting_indices: ContiguousList::try_from_iter(attesting_indices)?,
        data: attestation.data,
        signature: attestation.signature,
    })
}

/// `process_attestation` (Phase0, spec.md §4.2): records the vote as a `PendingAttestation` for
/// `process_rewards_and_penalties` to score at the end of the epoch rather than paying out
/// immediately.
pub fn process_attestation_phase0<P: Preset>(
    state: &mut phase0::BeaconState,
    attestation: &Attestation,
) -> Result<(), Error> {
    validate_attestation_data::<P>(state, &attestation.data)?;

    let indexed = get_indexed_attestation::<P>(state, attestation)?;
    predicates::is_valid_indexed_attestation::<P>(state, &indexed, false)?;

    let proposer_index = accessors::get_beacon_proposer_index::<P>(state)?;
    let inclusion_delay = Slot::new(state.slot().get() - attestation.data.slot.get());

    let pending_attestation = phase0::PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data: attestation.data,
        inclusion_delay,
        proposer_index,
    };

    let current_epoch = accessors::get_current_epoch::<P>(state);

    if attestation.data.target.epoch == current_epoch {
        state
            .current_epoch_attestations
            .get_mut()
            .push(pending_attestation)?;
    } else {
        state
            .previous_epoch_attestations
            .get_mut()
            .push(pending_attestation)?;
    }

    Ok(())
}

/// `process_attestation` (Altair+, spec.md §4.2): participation flags are recorded per
/// validator immediately, and a first-time timely-source/target/head flag earns the proposer an
/// immediate reward rather than waiting for end-of-epoch accounting.
pub fn process_attestation_altair<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
    attestation: &Attestation,
) -> Result<(), Error> {
    validate_attestation_data::<P>(state, &attestation.data)?;

    let indexed = get_indexed_attestation::<P>(state, attestation)?;
    predicates::is_valid_indexed_attestation::<P>(state, &indexed, false)?;

    let proposer_index = accessors::get_beacon_proposer_index::<P>(state)?;
    let inclusion_delay = Slot::new(state.slot().get() - attestation.data.slot.get());

    let participation_flags =
        accessors::get_attestation_participation_flags::<P>(state, &attestation.data, inclusion_delay);

    let current_epoch = accessors::get_current_epoch::<P>(state);
    let is_current = attestation.data.target.epoch == current_epoch;

    let total_active_balance = accessors::get_total_active_balance::<P>(state);

    let mut proposer_reward_numerator: Gwei = 0;

    for index in indexed.attesting_indices.iter().copied() {
        let epoch_participation = if is_current {
            state.current_epoch_participation_mut()
        } else {
            state.previous_epoch_participation_mut()
        };

        let Some(existing) = epoch_participation.get_mut().get_mut(index).copied() else {
            continue;
        };

        let effective_balance = state
            .validators()
            .get()
            .get(index)
            .map_or(0, |validator| validator.effective_balance);

        let base_reward = base_reward::<P>(effective_balance, total_active_balance);

        for &(flag, weight) in &crate::epoch_processing::FLAG_WEIGHTS {
            if participation_flags.has(flag) && !existing.has(flag) {
                proposer_reward_numerator += base_reward * weight;
            }
        }

        let updated = existing | participation_flags;

        if let Some(slot) = (if is_current {
            state.current_epoch_participation_mut()
        } else {
            state.previous_epoch_participation_mut()
        })
        .get_mut()
        .get_mut(index)
        {
            *slot = updated;
        }
    }

    let proposer_reward_denominator =
        (P::WEIGHT_DENOMINATOR - P::PROPOSER_WEIGHT) * P::WEIGHT_DENOMINATOR
            / P::PROPOSER_WEIGHT;

    increase_balance(
        state,
        proposer_index,
        proposer_reward_numerator / proposer_reward_denominator.max(1),
    );

    Ok(())
}

#[derive(Clone, Copy, Debug, Ssz)]
struct DepositMessage {
    pubkey: bls::PublicKeyBytes,
    withdrawal_credentials: H256,
    amount: Gwei,
}

/// `process_deposit` (spec.md §4.2): the Merkle proof against `state.eth1_data.deposit_root`
/// must hold regardless of whether the deposit ends up registering a validator; an invalid
/// deposit *signature*, by contrast, only skips registration rather than rejecting the block,
/// since the deposit contract itself never validates the signature before accepting funds.
pub fn process_deposit<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState,
    deposit: &Deposit,
) -> Result<(), Error> {
    let index = state.eth1_deposit_index();

    let leaf = deposit.data.hash_tree_root();
    let depth = consts::DEPOSIT_CONTRACT_TREE_DEPTH + 1;

    if !predicates::is_valid_merkle_branch(
        leaf,
        &deposit.proof,
        depth,
        index,
        state.eth1_data().deposit_root,
    ) {
        return Err(Error::InvalidDepositProof);
    }

    *state.eth1_deposit_index_mut() += 1;

    let pubkey = deposit.data.pubkey;
    let amount = deposit.data.amount;

    let validator_count = state.validators().get().len();

    let existing_index = (0..validator_count)
        .map(|i| ValidatorIndex::new(i as u32))
        .find(|&i| {
            state
                .validators()
                .get()
                .get(i)
                .is_some_and(|validator| validator.pubkey == pubkey)
        });

    if let Some(index) = existing_index {
        increase_balance(state, index, amount);
        return Ok(());
    }

    let message = DepositMessage {
        pubkey,
        withdrawal_credentials: deposit.data.withdrawal_credentials,
        amount,
    };

    let domain = signing::compute_domain(
        domains::DEPOSIT,
        config.genesis_fork_version,
        H256::zero(),
    );

    let signing_root = signing::compute_signing_root(message.hash_tree_root(), domain);

    let signature_is_valid = deposit
        .data
        .signature
        .try_into_signature()
        .and_then(|signature| {
            pubkey
                .try_into_public_key()
                .map(|public_key| (signature, public_key))
        })
        .map(|(signature, public_key)| signature.verify(public_key, signing_root.as_bytes()).is_ok())
        .unwrap_or(false);

    if !signature_is_valid {
        return Ok(());
    }

    let validator = phase0::Validator {
        pubkey,
        withdrawal_credentials: deposit.data.withdrawal_credentials,
        effective_balance: cmp::min(
            amount - amount % P::EFFECTIVE_BALANCE_INCREMENT,
            P::MAX_EFFECTIVE_BALANCE,
        ),
        slashed: false,
        activation_eligibility_epoch: consts::FAR_FUTURE_EPOCH,
        activation_epoch: consts::FAR_FUTURE_EPOCH,
        exit_epoch: consts::FAR_FUTURE_EPOCH,
        withdrawable_epoch: consts::FAR_FUTURE_EPOCH,
    };

    state.validators_mut().get_mut().push(validator)?;
    state.balances_mut().get_mut().push(amount)?;

    Ok(())
}

/// `process_voluntary_exit` (spec.md §4.2): the validator must already be active, not already
/// exiting, old enough in both wall-clock epoch and time-since-activation terms, and the exit
/// message itself must be signed by the exiting validator's own key.
pub fn process_voluntary_exit<P: Preset>(
    state: &mut impl BeaconState,
    signed_exit: &SignedVoluntaryExit,
) -> Result<(), Error> {
    let exit = &signed_exit.message;

    let validator = state
        .validators()
        .get()
        .get(exit.validator_index)
        .copied()
        .ok_or_else(|| Error::Invalid("voluntary exit index out of range".to_owned()))?;

    let current_epoch = accessors::get_current_epoch::<P>(state);

    if !validator.is_active(current_epoch) {
        return Err(Error::Invalid("voluntary exit validator inactive".to_owned()));
    }

    if validator.exit_epoch != consts::FAR_FUTURE_EPOCH {
        return Err(Error::AlreadyExited);
    }

    if current_epoch < exit.epoch {
        return Err(Error::ExitTooEarly);
    }

    let activation_epoch_reached =
        current_epoch.get() >= validator.activation_epoch.get() + P::SHARD_COMMITTEE_PERIOD;

    if !activation_epoch_reached {
        return Err(Error::ExitTooEarly);
    }

    let domain = accessors::get_domain::<P>(state, domains::VOLUNTARY_EXIT, Some(exit.epoch));
    let signing_root = signing::compute_signing_root(exit.hash_tree_root(), domain);

    let public_key = validator.pubkey.try_into_public_key()?;
    let signature = signed_exit.signature.try_into_signature()?;

    signature.verify(public_key, signing_root.as_bytes())?;

    initiate_validator_exit::<P>(state, exit.validator_index);

    Ok(())
}

/// `process_eth1_vote` (spec.md §4.2): appends the block's eth1 vote, and if a majority of this
/// voting period's votes now agree, adopts the winning vote as `state.eth1_data`.
pub fn process_eth1_vote<P: Preset>(state: &mut impl BeaconState, vote: Eth1Data) -> Result<(), Error> {
    state.eth1_data_votes_mut().get_mut().push(vote)?;

    let votes_for_vote = state
        .eth1_data_votes()
        .get()
        .iter()
        .filter(|&&data| data == vote)
        .count();

    if votes_for_vote * 2 > capacity::ETH1_DATA_VOTES_LENGTH {
        *state.eth1_data_mut() = vote;
    }

    Ok(())
}

fn xor_h256(a: H256, b: H256) -> H256 {
    let mut bytes = [0_u8; 32];

    for (out, (x, y)) in bytes.iter_mut().zip(a.as_bytes().iter().zip(b.as_bytes().iter())) {
        *out = x ^ y;
    }

    H256(bytes)
}

/// `process_randao` (spec.md §4.2): the proposer's RANDAO reveal must verify against the
/// current epoch's signing root, and is then XORed into the epoch's randao mix.
pub fn process_randao<P: Preset>(
    state: &mut impl BeaconState,
    randao_reveal: SignatureBytes,
) -> Result<(), Error> {
    let current_epoch = accessors::get_current_epoch::<P>(state);
    let proposer_index = accessors::get_beacon_proposer_index::<P>(state)?;

    let validator = state
        .validators()
        .get()
        .get(proposer_index)
        .copied()
        .ok_or_else(|| Error::Invalid("randao proposer index out of range".to_owned()))?;

    let domain = accessors::get_domain::<P>(state, domains::RANDAO, Some(current_epoch));
    let signing_root = signing::compute_signing_root(current_epoch.hash_tree_root(), domain);

    let public_key = validator.pubkey.try_into_public_key()?;
    let signature = randao_reveal
        .try_into_signature()
        .map_err(|_| Error::InvalidRandaoReveal { epoch: current_epoch })?;

    signature
        .verify(public_key, signing_root.as_bytes())
        .map_err(|_| Error::InvalidRandaoReveal { epoch: current_epoch })?;

    let mix = xor_h256(
        accessors::get_randao_mix::<P>(state, current_epoch),
        hashing::hash(randao_reveal.as_bytes()),
    );

    let index = (current_epoch.get() % P::EPOCHS_PER_HISTORICAL_VECTOR) as usize;

    if let Some(slot) = state.randao_mixes_mut().get_mut().get_mut(index) {
        *slot = mix;
    }

    Ok(())
}

/// `process_sync_aggregate` (Altair+, spec.md §4.2): every bit set in `sync_committee_bits`
/// names a current-sync-committee member whose signature over the previous slot's block root
/// must be present in the aggregate; participants and the proposer split the reward, absentees
/// pay the matching penalty.
pub fn process_sync_aggregate<P: Preset, S: PostAltairBeaconState>(
    state: &mut S,
    body: &impl HasSyncAggregate,
) -> Result<(), Error> {
    let sync_aggregate = body.sync_aggregate();
    let committee = state.current_sync_committee().pubkeys.clone();

    let committee_indices = committee
        .iter()
        .map(|pubkey| {
            let validator_count = state.validators().get().len();

            (0..validator_count)
                .map(|i| ValidatorIndex::new(i as u32))
                .find(|&i| {
                    state
                        .validators()
                        .get()
                        .get(i)
                        .is_some_and(|validator| validator.pubkey == *pubkey)
                })
        })
        .collect_vec();

    let previous_slot = Slot::new(state.slot().get().saturating_sub(1));
    let domain = accessors::get_domain::<P>(
        state,
        domains::SYNC_COMMITTEE,
        Some(previous_slot.epoch(P::SLOTS_PER_EPOCH)),
    );
    let block_root = accessors::get_block_root_at_slot::<P>(state, previous_slot)?;
    let signing_root = signing::compute_signing_root(block_root, domain);

    let mut public_keys = Vec::new();

    for (bit_index, pubkey) in committee.iter().enumerate() {
        if sync_aggregate.sync_committee_bits.get(bit_index) {
            public_keys.push(
                pubkey
                    .try_into_public_key()
                    .map_err(Error::from)?,
            );
        }
    }

    if !public_keys.is_empty() {
        let signature = sync_aggregate
            .sync_committee_signature
            .try_into_signature()?;

        signature
            .fast_aggregate_verify(public_keys, signing_root.as_bytes())
            .map_err(|_| Error::InvalidSyncAggregate)?;
    }

    let total_active_balance = accessors::get_total_active_balance::<P>(state);
    let total_active_increments = total_active_balance / P::EFFECTIVE_BALANCE_INCREMENT;
    let total_base_rewards = base_reward::<P>(P::EFFECTIVE_BALANCE_INCREMENT, total_active_balance)
        * total_active_increments;

    let max_participant_rewards =
        total_base_rewards * P::SYNC_REWARD_WEIGHT / P::WEIGHT_DENOMINATOR / P::SLOTS_PER_EPOCH;
    let participant_reward = max_participant_rewards / (committee.len() as u64).max(1);
    let proposer_reward =
        participant_reward * P::PROPOSER_WEIGHT / (P::WEIGHT_DENOMINATOR - P::PROPOSER_WEIGHT);

    let proposer_index = accessors::get_beacon_proposer_index::<P>(state)?;

    for (bit_index, index) in committee_indices.into_iter().enumerate() {
        let Some(index) = index else { continue };

        if sync_aggregate.sync_committee_bits.get(bit_index) {
            increase_balance(state, index, participant_reward);
            increase_balance(state, proposer_index, proposer_reward);
        } else {
            decrease_balance(state, index, participant_reward);
        }
    }

    Ok(())
}

/// `process_execution_payload` (Bellatrix+, spec.md §4.2): the payload must chain onto the
/// state's current execution head and carry a timestamp matching the block's own slot; on
/// success the payload's header becomes the new execution head.
pub fn process_execution_payload<P: Preset>(
    config: &Config,
    state: &mut types::bellatrix::BeaconState,
    payload: &types::bellatrix::ExecutionPayload,
) -> Result<(), Error> {
    let is_merge_transition_complete =
        state.latest_execution_payload_header != types::bellatrix::ExecutionPayloadHeader::default();

    if is_merge_transition_complete
        && payload.parent_hash != state.latest_execution_payload_header.block_hash
    {
        return Err(Error::ExecutionPayloadBadParentHash);
    }

    let expected_timestamp = compute_timestamp_at_slot::<P>(config, state);

    if payload.timestamp != expected_timestamp {
        return Err(Error::ExecutionPayloadBadTimestamp {
            expected: expected_timestamp,
            actual: payload.timestamp,
        });
    }

    state.latest_execution_payload_header = payload.to_header();

    Ok(())
}

fn compute_timestamp_at_slot<P: Preset>(config: &Config, state: &types::bellatrix::BeaconState) -> u64 {
    let genesis_slot = consts::GENESIS_SLOT;
    let slots_since_genesis = state.slot.get() - genesis_slot.get();

    state.genesis_time + slots_since_genesis * config.seconds_per_slot
}

#[cfg(test)]
mod tests {
    use types::{primitives::ValidatorIndex, Minimal};

    use super::*;

    #[test]
    fn initiate_validator_exit_sets_exit_epoch_once() {
        let mut state = phase0::BeaconState::default();

        state
            .validators
            .get_mut()
            .push(phase0::Validator {
                effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
                activation_epoch: consts::GENESIS_EPOCH,
                ..phase0::Validator::default()
            })
            .unwrap();
        state.balances.get_mut().push(0).unwrap();

        let index = ValidatorIndex::new(0);

        initiate_validator_exit::<Minimal>(&mut state, index);

        let exit_epoch = state.validators.get().get(index).unwrap().exit_epoch;
        assert_ne!(exit_epoch, consts::FAR_FUTURE_EPOCH);

        let exit_epoch_again = exit_epoch;
        initiate_validator_exit::<Minimal>(&mut state, index);
        assert_eq!(
            state.validators.get().get(index).unwrap().exit_epoch,
            exit_epoch_again
        );
    }

    #[test]
    fn is_slashable_attestation_data_detects_double_vote() {
        let mut a = phase0::AttestationData::default();
        a.target.epoch = Epoch::new(5);

        let mut b = phase0::AttestationData::default();
        b.target.epoch = Epoch::new(5);
        b.beacon_block_root = H256::repeat_byte(1);

        assert!(is_slashable_attestation_data(&a, &b));
    }

    #[test]
    fn is_slashable_attestation_data_detects_surround_vote() {
        let mut a = phase0::AttestationData::default();
        a.source.epoch = Epoch::new(1);
        a.target.epoch = Epoch::new(10);

        let mut b = phase0::AttestationData::default();
        b.source.epoch = Epoch::new(2);
        b.target.epoch = Epoch::new(9);

        assert!(is_slashable_attestation_data(&a, &b));
        assert!(!is_slashable_attestation_data(&b, &a) || is_slashable_attestation_data(&a, &b));
    }
}
