//! `process_slots` and `process_slot` (spec.md §4.2 step 1), including the fork-upgrade
//! dispatch that runs at the boundary between `FORK_EPOCH - 1`'s last slot and `FORK_EPOCH`'s
//! first slot.

use helper_functions::accessors;
use ssz::SszHash as _;
use types::{
    combined::ForkedBeaconState,
    config::Config,
    preset::Preset,
    primitives::Slot,
    BeaconState,
};

use crate::{block_processing::BlockProcessingFlags, epoch_processing, error::Error};

/// `process_slot` (spec.md §4.2): caches the pre-state root into the state-roots ring,
/// backfills `latest_block_header.state_root` the first time it is read after being proposed
/// with the zero sentinel, then caches the (now-complete) header's root into the block-roots
/// ring. `skip_root_calc` implements `skip_last_state_root_calc` (spec.md:77): when set, the
/// state-roots ring entry and the `latest_block_header.state_root` backfill for this call are
/// left untouched, since both are about to be superseded by the block processing that is about
/// to follow in the same `state_transition` call.
pub fn process_slot<P: Preset, S: BeaconState + ssz::SszHash>(state: &mut S, skip_root_calc: bool) {
    let index = (state.slot().get() % P::SLOTS_PER_HISTORICAL_ROOT) as usize;

    if !skip_root_calc {
        let previous_state_root = state.hash_tree_root();

        if let Some(slot) = state.state_roots_mut().get_mut().get_mut(index) {
            *slot = previous_state_root;
        }

        if state.latest_block_header().state_root.is_zero() {
            state.latest_block_header_mut().state_root = previous_state_root;
        }
    }

    let previous_block_root = ssz::SszHash::hash_tree_root(state.latest_block_header());

    if let Some(slot) = state.block_roots_mut().get_mut().get_mut(index) {
        *slot = previous_block_root;
    }
}

/// `process_slots(state, target_slot)` (spec.md §4.2): advances `state` one slot at a time,
/// running `process_epoch` at every epoch boundary and upgrading the state's fork variant when
/// `target_slot` crosses a configured fork epoch. `flags.slot_already_processed` skips
/// [`process_slot`] for `state`'s current slot on the first iteration only (the caller already
/// ran it); `flags.skip_last_state_root_calc` skips the state-root hash computation on the
/// iteration that lands on `target_slot - 1`, the one immediately preceding `signed_block`.
pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut ForkedBeaconState,
    target_slot: Slot,
    flags: BlockProcessingFlags,
) -> Result<(), Error> {
    if target_slot <= state.slot() {
        return Err(Error::SlotNotAhead {
            current: state.slot(),
            target: target_slot,
        });
    }

    let mut skip_process_slot = flags.slot_already_processed;

    while state.slot() < target_slot {
        let is_last_iteration = state.slot().get() + 1 == target_slot.get();

        if !std::mem::take(&mut skip_process_slot) {
            let skip_root_calc = is_last_iteration && flags.skip_last_state_root_calc;

            match state {
                ForkedBeaconState::Phase0(inner) => process_slot::<P, _>(inner, skip_root_calc),
                ForkedBeaconState::Altair(inner) => process_slot::<P, _>(inner, skip_root_calc),
                ForkedBeaconState::Bellatrix(inner) => process_slot::<P, _>(inner, skip_root_calc),
            }
        }

        let next_slot = Slot::new(state.slot().get() + 1);

        if next_slot.is_epoch_start(P::SLOTS_PER_EPOCH) {
            match state {
                ForkedBeaconState::Phase0(inner) => epoch_processing::process_epoch::<P>(inner)?,
                ForkedBeaconState::Altair(inner) => {
                    epoch_processing::process_epoch_post_altair::<P, _>(inner, false)?
                }
                ForkedBeaconState::Bellatrix(inner) => {
                    epoch_processing::process_epoch_post_altair::<P, _>(inner, true)?
                }
            }
        }

        *state.slot_mut() = next_slot;

        upgrade_if_at_fork_boundary::<P>(config, state);
    }

    Ok(())
}

fn upgrade_if_at_fork_boundary<P: Preset>(config: &Config, state: &mut ForkedBeaconState) {
    let epoch = accessors::get_current_epoch::<P>(state);
    let placeholder = || ForkedBeaconState::Phase0(types::phase0::BeaconState::default());

    if matches!(state, ForkedBeaconState::Phase0(_)) && epoch >= config.altair_fork_epoch {
        let ForkedBeaconState::Phase0(pre) = std::mem::replace(state, placeholder()) else {
            unreachable!("just matched Phase0 above");
        };

        *state = ForkedBeaconState::Altair(helper_functions::fork::upgrade_to_altair::<P>(
            config, pre,
        ));
    }

    if matches!(state, ForkedBeaconState::Altair(_)) && epoch >= config.bellatrix_fork_epoch {
        let ForkedBeaconState::Altair(pre) = std::mem::replace(state, placeholder()) else {
            unreachable!("just matched Altair above");
        };

        *state = ForkedBeaconState::Bellatrix(helper_functions::fork::upgrade_to_bellatrix::<P>(
            config, pre,
        ));
    }
}

#[cfg(test)]
mod tests {
    use types::Minimal;

    use super::*;

    #[test]
    fn process_slots_advances_slot_and_errors_on_non_advance() {
        let mut state = ForkedBeaconState::Phase0(types::phase0::BeaconState::default());

        process_slots::<Minimal>(&Config::minimal(), &mut state, Slot::new(1), BlockProcessingFlags::default())
            .unwrap();
        assert_eq!(state.slot(), Slot::new(1));

        let error = process_slots::<Minimal>(
            &Config::minimal(),
            &mut state,
            Slot::new(1),
            BlockProcessingFlags::default(),
        );
        assert!(error.is_err());
    }

    #[test]
    fn process_slots_upgrades_to_altair_at_genesis_under_minimal_config() {
        let mut state = ForkedBeaconState::Phase0(types::phase0::BeaconState::default());

        process_slots::<Minimal>(&Config::minimal(), &mut state, Slot::new(1), BlockProcessingFlags::default())
            .unwrap();

        assert!(matches!(state, ForkedBeaconState::Altair(_)));
    }

    #[test]
    fn skip_last_state_root_calc_leaves_state_roots_ring_untouched_on_final_iteration() {
        let mut state = ForkedBeaconState::Phase0(types::phase0::BeaconState::default());

        let flags = BlockProcessingFlags {
            skip_last_state_root_calc: true,
            ..BlockProcessingFlags::default()
        };

        process_slots::<Minimal>(&Config::minimal(), &mut state, Slot::new(1), flags).unwrap();

        let ForkedBeaconState::Altair(inner) = &state else {
            panic!("minimal config upgrades to Altair at genesis");
        };

        assert_eq!(inner.state_roots.get().get(0).copied(), Some(types::primitives::H256::zero()));
    }

    #[test]
    fn slot_already_processed_skips_process_slot_on_first_iteration_only() {
        let mut without_skip = ForkedBeaconState::Phase0(types::phase0::BeaconState::default());
        let mut with_skip = ForkedBeaconState::Phase0(types::phase0::BeaconState::default());

        process_slots::<Minimal>(
            &Config::minimal(),
            &mut without_skip,
            Slot::new(2),
            BlockProcessingFlags::default(),
        )
        .unwrap();

        let flags = BlockProcessingFlags {
            slot_already_processed: true,
            ..BlockProcessingFlags::default()
        };

        process_slots::<Minimal>(&Config::minimal(), &mut with_skip, Slot::new(2), flags).unwrap();

        assert_eq!(without_skip.slot(), with_skip.slot());
    }
}
