//! Stateless validity checks (spec.md §4.2): Merkle-proof verification for deposits and the
//! indexed-attestation well-formedness check that gates every vote the fork choice consumes.

use itertools::Itertools as _;
use types::{
    phase0::IndexedAttestation,
    preset::Preset,
    primitives::{ValidatorIndex, H256},
    BeaconState,
};

use crate::{accessors, signing};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("indexed attestation has no attesting indices")]
    EmptyAttestingIndices,
    #[error("attesting indices are not sorted and unique")]
    UnsortedAttestingIndices,
    #[error(transparent)]
    Accessor(#[from] accessors::Error),
    #[error(transparent)]
    Bls(#[from] bls::Error),
}

/// `is_valid_merkle_branch` (spec.md §4.2's deposit-inclusion check): recomputes the root from a
/// leaf and its sibling path, mixing in `index` as the generalized index at each level exactly as
/// the deposit contract's incremental Merkle tree does.
#[must_use]
pub fn is_valid_merkle_branch(
    leaf: H256,
    branch: &[H256],
    depth: usize,
    index: u64,
    root: H256,
) -> bool {
    let mut value = leaf;

    for (level, &sibling) in branch.iter().enumerate().take(depth) {
        value = if (index >> level) & 1 == 1 {
            hashing::hash_256_256(sibling, value)
        } else {
            hashing::hash_256_256(value, sibling)
        };
    }

    value == root
}

/// `is_valid_indexed_attestation` (spec.md §4.2): indices must be sorted, deduplicated, and
/// non-empty, and the aggregate signature must verify against the domain-specific signing root
/// of `attestation.data` under every named validator's public key.
pub fn is_valid_indexed_attestation<P: Preset>(
    state: &impl BeaconState,
    attestation: &IndexedAttestation,
    skip_bls: bool,
) -> Result<(), Error> {
    let indices = attestation.attesting_indices.iter().copied().collect_vec();

    if indices.is_empty() {
        return Err(Error::EmptyAttestingIndices);
    }

    if !indices.iter().tuple_windows().all(|(a, b)| a < b) {
        return Err(Error::UnsortedAttestingIndices);
    }

    if skip_bls {
        return Ok(());
    }

    let domain = accessors::get_domain::<P>(
        state,
        types::config::domains::BEACON_ATTESTER,
        Some(attestation.data.target.epoch),
    );
    let signing_root = signing::compute_signing_root(
        ssz::SszHash::hash_tree_root(&attestation.data),
        domain,
    );

    let public_keys = indices
        .iter()
        .map(|index| -> Result<bls::PublicKey, Error> {
            let bytes = state
                .validators()
                .get()
                .get(usize::from(*index))
                .map(|validator| validator.pubkey)
                .unwrap_or_default();

            Ok(bytes.try_into_public_key()?)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let signature = attestation.signature.try_into_signature()?;

    signature
        .fast_aggregate_verify(public_keys, signing_root.as_bytes())
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_level_merkle_branch_round_trips() {
        let leaf = H256::repeat_byte(1);
        let sibling = H256::repeat_byte(2);

        let root = hashing::hash_256_256(leaf, sibling);

        assert!(is_valid_merkle_branch(leaf, &[sibling], 1, 0, root));
        assert!(!is_valid_merkle_branch(leaf, &[sibling], 1, 1, root));
    }

    #[test]
    fn rejects_unsorted_indices() {
        let mut attestation = IndexedAttestation::default();
        attestation.attesting_indices = ssz::ContiguousList::try_from_iter([
            ValidatorIndex::new(2),
            ValidatorIndex::new(1),
        ])
        .expect("within bounds");

        let error = is_valid_indexed_attestation::<types::Minimal>(
            &types::phase0::BeaconState::default(),
            &attestation,
            true,
        )
        .unwrap_err();

        assert!(matches!(error, Error::UnsortedAttestingIndices));
    }
}
