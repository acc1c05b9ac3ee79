//! `process_block` and the public `state_transition` entrypoint (spec.md §4.2).
//!
//! The teacher threads a mutable state reference through the whole STF and expects the caller to
//! roll it back on failure. Here `state_transition` instead clones the incoming state into a
//! scratch copy, mutates only the scratch copy, and swaps it into the caller's slot on success;
//! on any error the clone is simply dropped and the caller's original state is untouched. This
//! removes the rollback-callback contract entirely at the cost of one clone per call (`DESIGN.md`).

use bls::SignatureBytes;
use helper_functions::{accessors, signing};
use ssz::SszHash as _;
use types::{
    altair, bellatrix,
    config::{domains, Config},
    phase0,
    primitives::{Slot, ValidatorIndex, H256},
    BeaconState, BlockBody, ForkedBeaconState, ForkedSignedBeaconBlock, HasExecutionPayload,
    HasSyncAggregate, PostAltairBeaconState,
};

use crate::{error::Error, operations, slot_processing};

/// Flags `state_transition` callers can set to skip specific checks (spec.md §4.2). Skipping a
/// check only ever widens acceptance, never narrows it, so determinism holds across flag values
/// for any block that validates with every flag off.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockProcessingFlags {
    pub skip_bls: bool,
    pub skip_state_root: bool,
    /// Skip the hash-tree-root computation in the last [`slot_processing::process_slot`] call
    /// before `block`'s own slot, since its only consumers (the state-roots ring entry and the
    /// zero-sentinel backfill of `latest_block_header.state_root`) are about to be superseded by
    /// `process_block_header` and by `verify_state_root`'s own root computation anyway.
    pub skip_last_state_root_calc: bool,
    /// The caller already ran [`slot_processing::process_slot`] for `state`'s current slot
    /// (e.g. while computing a gossip-validation state eagerly), so `process_slots` should not
    /// run it again for that slot.
    pub slot_already_processed: bool,
}

/// Verifies and applies `block` on top of `state`, including advancing `state`'s slot up to
/// `block`'s own slot first. On success `state` is the post-block state; on any error `state` is
/// left exactly as it was (spec.md §4.2's rollback guarantee, given here via scratch-copy rather
/// than caller-supplied rollback).
pub fn state_transition<P: types::preset::Preset>(
    config: &Config,
    state: &mut ForkedBeaconState,
    signed_block: &ForkedSignedBeaconBlock,
    flags: BlockProcessingFlags,
) -> Result<(), Error> {
    let mut scratch = state.clone();

    slot_processing::process_slots::<P>(config, &mut scratch, signed_block.slot(), flags)?;
    process_block::<P>(config, &mut scratch, signed_block, flags)?;

    if !flags.skip_state_root {
        verify_state_root(signed_block, scratch.hash_tree_root())?;
    }

    *state = scratch;

    Ok(())
}

fn verify_state_root(
    signed_block: &ForkedSignedBeaconBlock,
    computed_root: H256,
) -> Result<(), Error> {
    if signed_block.state_root() != computed_root {
        return Err(Error::StateRootMismatch);
    }

    Ok(())
}

/// Dispatches to the per-fork block processing function. `state` and `signed_block` must be the
/// same fork; a mismatch (which only a caller bug or corrupted storage could produce) is reported
/// as `Error::Invalid` rather than panicking.
pub fn process_block<P: types::preset::Preset>(
    config: &Config,
    state: &mut ForkedBeaconState,
    signed_block: &ForkedSignedBeaconBlock,
    flags: BlockProcessingFlags,
) -> Result<(), Error> {
    match (state, signed_block) {
        (ForkedBeaconState::Phase0(state), ForkedSignedBeaconBlock::Phase0(signed_block)) => {
            process_block_phase0::<P>(config, state, &signed_block.message, signed_block.signature, flags)
        }
        (ForkedBeaconState::Altair(state), ForkedSignedBeaconBlock::Altair(signed_block)) => {
            process_block_altair::<P>(config, state, &signed_block.message, signed_block.signature, flags)
        }
        (ForkedBeaconState::Bellatrix(state), ForkedSignedBeaconBlock::Bellatrix(signed_block)) => {
            process_block_bellatrix::<P>(config, state, &signed_block.message, signed_block.signature, flags)
        }
        (state, signed_block) => Err(Error::Invalid(format!(
            "block is {:?} but state is {:?}",
            signed_block.phase(),
            state.phase(),
        ))),
    }
}

/// `verify_block_signature` (spec.md §4.2): the proposer's signature over the block's own signing
/// root, skipped entirely when `flags.skip_bls` is set (used by historical replay, where every
/// signature is already known-good and re-verifying tens of millions of them is wasted work).
fn verify_block_signature<P: types::preset::Preset>(
    state: &impl BeaconState,
    proposer_index: ValidatorIndex,
    message_root: H256,
    signature: SignatureBytes,
    flags: BlockProcessingFlags,
) -> Result<(), Error> {
    if flags.skip_bls {
        return Ok(());
    }

    let validator = state
        .validators()
        .get()
        .get(proposer_index)
        .copied()
        .ok_or_else(|| Error::Invalid("block proposer index out of range".to_owned()))?;

    let domain = accessors::get_domain::<P>(state, domains::BEACON_PROPOSER, None);
    let signing_root = signing::compute_signing_root(message_root, domain);

    let public_key = validator.pubkey.try_into_public_key()?;
    let signature = signature.try_into_signature()?;

    signature.verify(public_key, signing_root.as_bytes())?;

    Ok(())
}

/// `process_block_header` (spec.md §4.2): the shared header checks and `latest_block_header`
/// update, written once against any body type since every fork's header fields are shaped
/// identically.
fn process_block_header<P: types::preset::Preset, B: ssz::SszHash>(
    state: &mut impl BeaconState,
    slot: Slot,
    proposer_index: ValidatorIndex,
    parent_root: H256,
    body: &B,
) -> Result<(), Error> {
    if slot != state.slot() {
        return Err(Error::Invalid(format!(
            "block slot {slot} does not match state slot {}",
            state.slot()
        )));
    }

    if slot <= state.latest_block_header().slot {
        return Err(Error::Invalid(format!(
            "block slot {slot} is not ahead of latest block header slot {}",
            state.latest_block_header().slot
        )));
    }

    let expected_proposer = accessors::get_beacon_proposer_index::<P>(state)?;

    if proposer_index != expected_proposer {
        return Err(Error::WrongProposerIndex {
            expected: expected_proposer,
            actual: proposer_index,
        });
    }

    let expected_parent_root = state.latest_block_header().hash_tree_root();

    if parent_root != expected_parent_root {
        return Err(Error::ParentRootMismatch {
            expected: expected_parent_root,
            actual: parent_root,
        });
    }

    *state.latest_block_header_mut() = phase0::BeaconBlockHeader {
        slot,
        proposer_index,
        parent_root,
        state_root: H256::zero(),
        body_root: body.hash_tree_root(),
    };

    Ok(())
}

/// The five fixed-order operations common to every fork (spec.md §4.2), parameterised over how
/// attestations get scored since that is the one step whose bookkeeping changed shape at Altair.
fn process_operations<P: types::preset::Preset, S: BeaconState, B: BlockBody>(
    config: &Config,
    state: &mut S,
    body: &B,
    is_bellatrix: bool,
    mut process_attestation: impl FnMut(&mut S, &phase0::Attestation) -> Result<(), Error>,
) -> Result<(), Error> {
    let expected_deposits = body
        .eth1_data()
        .deposit_count
        .saturating_sub(state.eth1_deposit_index())
        .min(types::preset::capacity::MAX_DEPOSITS as u64);

    if body.deposits().len() as u64 != expected_deposits {
        return Err(Error::DepositIndexMismatch {
            expected: expected_deposits,
            index: body.deposits().len() as u64,
        });
    }

    for slashing in body.proposer_slashings().iter() {
        operations::process_proposer_slashing::<P>(state, slashing, is_bellatrix)?;
    }

    for slashing in body.attester_slashings().iter() {
        operations::process_attester_slashing::<P>(state, slashing, is_bellatrix)?;
    }

    for attestation in body.attestations().iter() {
        process_attestation(state, attestation)?;
    }

    for deposit in body.deposits().iter() {
        operations::process_deposit::<P>(config, state, deposit)?;
    }

    for exit in body.voluntary_exits().iter() {
        operations::process_voluntary_exit::<P>(state, exit)?;
    }

    Ok(())
}

fn process_block_phase0<P: types::preset::Preset>(
    config: &Config,
    state: &mut phase0::BeaconState,
    block: &phase0::BeaconBlock,
    signature: SignatureBytes,
    flags: BlockProcessingFlags,
) -> Result<(), Error> {
    process_block_header::<P, _>(
        state,
        block.slot,
        block.proposer_index,
        block.parent_root,
        &block.body,
    )?;

    verify_block_signature::<P>(state, block.proposer_index, block.hash_tree_root(), signature, flags)?;

    operations::process_randao::<P>(state, block.body.randao_reveal)?;
    operations::process_eth1_vote::<P>(state, block.body.eth1_data)?;

    process_operations::<P, _, _>(config, state, &block.body, false, |state, attestation| {
        operations::process_attestation_phase0::<P>(state, attestation)
    })
}

fn process_block_altair<P: types::preset::Preset>(
    config: &Config,
    state: &mut altair::BeaconState,
    block: &altair::BeaconBlock,
    signature: SignatureBytes,
    flags: BlockProcessingFlags,
) -> Result<(), Error> {
    process_block_header::<P, _>(
        state,
        block.slot,
        block.proposer_index,
        block.parent_root,
        &block.body,
    )?;

    verify_block_signature::<P>(state, block.proposer_index, block.hash_tree_root(), signature, flags)?;

    operations::process_randao::<P>(state, block.body.randao_reveal)?;
    operations::process_eth1_vote::<P>(state, block.body.eth1_data)?;

    process_operations::<P, _, _>(config, state, &block.body, false, |state, attestation| {
        operations::process_attestation_altair::<P, _>(state, attestation)
    })?;

    if !flags.skip_bls {
        process_sync_aggregate_checked::<P>(state, &block.body)?;
    }

    Ok(())
}

fn process_block_bellatrix<P: types::preset::Preset>(
    config: &Config,
    state: &mut bellatrix::BeaconState,
    block: &bellatrix::BeaconBlock,
    signature: SignatureBytes,
    flags: BlockProcessingFlags,
) -> Result<(), Error> {
    process_block_header::<P, _>(
        state,
        block.slot,
        block.proposer_index,
        block.parent_root,
        &block.body,
    )?;

    verify_block_signature::<P>(state, block.proposer_index, block.hash_tree_root(), signature, flags)?;

    if is_execution_enabled(state, &block.body) {
        operations::process_execution_payload::<P>(config, state, &block.body.execution_payload)?;
    }

    operations::process_randao::<P>(state, block.body.randao_reveal)?;
    operations::process_eth1_vote::<P>(state, block.body.eth1_data)?;

    process_operations::<P, _, _>(config, state, &block.body, true, |state, attestation| {
        operations::process_attestation_altair::<P, _>(state, attestation)
    })?;

    if !flags.skip_bls {
        process_sync_aggregate_checked::<P>(state, &block.body)?;
    }

    Ok(())
}

/// `flags.skip_bls` only ever widens acceptance (spec.md §4.2's determinism invariant), so when
/// it is set the sync aggregate's signature and reward accounting are skipped together rather
/// than half-applying `process_sync_aggregate`'s balance changes without having checked the
/// signature they are supposed to be conditioned on.
fn process_sync_aggregate_checked<P: types::preset::Preset, S: PostAltairBeaconState>(
    state: &mut S,
    body: &impl HasSyncAggregate,
) -> Result<(), Error> {
    operations::process_sync_aggregate::<P, _>(state, body)
}

/// `is_execution_enabled` (spec.md §4.2): true once the state has a genuine execution head, or
/// for the one block that first supplies a non-empty payload while the state still doesn't.
fn is_execution_enabled(
    state: &bellatrix::BeaconState,
    body: &impl HasExecutionPayload,
) -> bool {
    let merge_transition_complete =
        state.latest_execution_payload_header != bellatrix::ExecutionPayloadHeader::default();

    merge_transition_complete || *body.execution_payload() != bellatrix::ExecutionPayload::default()
}

#[cfg(test)]
mod tests {
    use types::Minimal;

    use super::*;

    #[test]
    fn process_block_header_rejects_non_advancing_slot() {
        let mut state = phase0::BeaconState {
            slot: Slot::new(5),
            ..phase0::BeaconState::default()
        };
        state.latest_block_header.slot = Slot::new(5);

        let body = phase0::BeaconBlockBody::default();

        let error = process_block_header::<Minimal, _>(
            &mut state,
            Slot::new(5),
            ValidatorIndex::new(0),
            H256::zero(),
            &body,
        )
        .unwrap_err();

        assert!(matches!(error, Error::Invalid(_)));
    }

    #[test]
    fn is_execution_enabled_true_once_transition_complete() {
        let mut state = bellatrix::BeaconState::default();
        state.latest_execution_payload_header.block_number = 1;

        let body = bellatrix::BeaconBlockBody::default();

        assert!(is_execution_enabled(&state, &body));
    }

    #[test]
    fn is_execution_enabled_false_before_transition_with_empty_payload() {
        let state = bellatrix::BeaconState::default();
        let body = bellatrix::BeaconBlockBody::default();

        assert!(!is_execution_enabled(&state, &body));
    }
}
