//! Fork-upgrade state transformations (spec.md §4.2's "apply pending upgrade" step, run once per
//! fork boundary rather than every slot). Grounded on the teacher's `upgrade_to_altair`/
//! `upgrade_to_bellatrix` in `helper_functions::fork`; Capella/Deneb upgrades are not implemented,
//! those forks being out of scope here.

use ssz::{Cached, ContiguousList};
use types::{
    altair, bellatrix,
    config::Config,
    nonstandard::ParticipationFlags,
    phase0::{self, PendingAttestation},
    preset::{capacity, Preset},
    BeaconState,
};

use crate::accessors;

/// Builds the per-validator participation-flag vector Altair replaces `PendingAttestation` lists
/// with: every validator starts unmarked, then each pending attestation's flags are OR'd into
/// every validator it credits.
fn translate_participation<P: Preset>(
    state: &phase0::BeaconState,
    attestations: &ContiguousList<PendingAttestation, { capacity::MAX_ATTESTATIONS }>,
) -> Cached<ContiguousList<ParticipationFlags, { capacity::VALIDATOR_REGISTRY_LIMIT }>> {
    let mut flags = vec![ParticipationFlags::default(); state.validators.get().len()];

    for attestation in attestations.iter() {
        let earned = accessors::get_attestation_participation_flags::<P>(
            state,
            &attestation.data,
            attestation.inclusion_delay,
        );

        let attesting_indices = accessors::get_attesting_indices::<P>(
            state,
            &attestation.data,
            &attestation.aggregation_bits,
        )
        .unwrap_or_default();

        for index in attesting_indices {
            if let Some(slot) = flags.get_mut(usize::from(index)) {
                *slot |= earned;
            }
        }
    }

    Cached::new(
        ContiguousList::try_from_iter(flags).expect("one flag per existing validator fits"),
    )
}

/// `upgrade_to_altair` (spec.md §4.2): seeds both sync committees from the same selection since
/// there is no prior committee to shift forward at the boundary.
pub fn upgrade_to_altair<P: Preset>(
    config: &Config,
    pre: phase0::BeaconState,
) -> altair::BeaconState {
    let epoch = pre.slot.epoch(P::SLOTS_PER_EPOCH);
    let validator_count = pre.validators.get().len();
    let current_sync_committee =
        accessors::get_next_sync_committee::<P>(&pre).unwrap_or_default();
    let next_sync_committee = current_sync_committee.clone();

    let previous_epoch_participation =
        translate_participation::<P>(&pre, pre.previous_epoch_attestations.get());
    let current_epoch_participation =
        translate_participation::<P>(&pre, pre.current_epoch_attestations.get());

    let phase0::BeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        justification_bits,
        ..
    } = pre;

    altair::BeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork: phase0::Fork {
            previous_version: fork.current_version,
            current_version: config.altair_fork_version,
            epoch,
        },
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_participation,
        current_epoch_participation,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        inactivity_scores: Cached::new(
            ContiguousList::try_from_iter(vec![0_u64; 0]).expect("empty fits"),
        ),
        current_sync_committee,
        next_sync_committee,
    }
}

/// `upgrade_to_bellatrix` (spec.md §4.2): every field carries over unchanged except the fork
/// entry and the freshly-zeroed execution payload header, which stays empty until the first
/// post-merge block fills it in.
pub fn upgrade_to_bellatrix<P: Preset>(
    config: &Config,
    pre: altair::BeaconState,
) -> bellatrix::BeaconState {
    let epoch = pre.slot.epoch(P::SLOTS_PER_EPOCH);

    let altair::BeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_participation,
        current_epoch_participation,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        inactivity_scores,
        current_sync_committee,
        next_sync_committee,
    } = pre;

    bellatrix::BeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork: phase0::Fork {
            previous_version: fork.current_version,
            current_version: config.bellatrix_fork_version,
            epoch,
        },
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_participation,
        current_epoch_participation,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        inactivity_scores,
        current_sync_committee,
        next_sync_committee,
        latest_execution_payload_header: bellatrix::ExecutionPayloadHeader::default(),
    }
}

#[cfg(test)]
mod tests {
    use types::Minimal;

    use super::*;

    #[test]
    fn upgrade_to_altair_preserves_validator_count() {
        let mut pre = phase0::BeaconState::default();
        pre.validators = Cached::new(
            ContiguousList::try_from_iter([types::phase0::Validator::default(); 4]).unwrap(),
        );
        pre.balances =
            Cached::new(ContiguousList::try_from_iter([0_u64; 4]).unwrap());

        let post = upgrade_to_altair::<Minimal>(&Config::minimal(), pre);

        assert_eq!(post.validators.get().len(), 4);
        assert_eq!(post.current_sync_committee, post.next_sync_committee);
    }

    #[test]
    fn upgrade_to_bellatrix_zeroes_payload_header() {
        let pre = altair::BeaconState::default();
        let post = upgrade_to_bellatrix::<Minimal>(&Config::minimal(), pre);

        assert!(post.latest_execution_payload_header.transactions_root.is_zero());
    }
}
