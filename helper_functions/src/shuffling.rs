//! Committee shuffling (spec.md §4.2): "single shuffled list per epoch; index into it with
//! `(slot, committee)`". Implements the standard swap-or-not shuffle so that
//! `compute_shuffled_index` is its own unshuffle when run with the same seed (not used here, but
//! is what lets light clients verify committee membership without recomputing the whole
//! permutation).

use hashing::hash;
use types::primitives::H256;

/// Shuffles a single index using the swap-or-not algorithm. `seed` mixes in the epoch's RANDAO
/// mix and domain type (see [`crate::accessors::get_seed`]); `round_count` is
/// `Preset::SHUFFLE_ROUND_COUNT`.
#[must_use]
pub fn compute_shuffled_index(
    mut index: u64,
    index_count: u64,
    seed: H256,
    round_count: u8,
) -> u64 {
    assert!(index < index_count, "index out of bounds for shuffling");

    for round in 0..round_count {
        let pivot = pivot_for_round(seed, round, index_count);
        let flip = (pivot + index_count - index) % index_count;
        let position = index.max(flip);

        let source = hash_for_position(seed, round, position);
        let byte = source[((position % 256) / 8) as usize];
        let bit = (byte >> (position % 8)) & 1;

        if bit == 1 {
            index = flip;
        }
    }

    index
}

fn pivot_for_round(seed: H256, round: u8, index_count: u64) -> u64 {
    let mut preimage = seed.as_bytes().to_vec();
    preimage.push(round);

    let digest = hash(preimage);
    let pivot_bytes: [u8; 8] = digest.as_bytes()[..8].try_into().expect("8 bytes");

    u64::from_le_bytes(pivot_bytes) % index_count
}

fn hash_for_position(seed: H256, round: u8, position: u64) -> [u8; 32] {
    let mut preimage = seed.as_bytes().to_vec();
    preimage.push(round);
    preimage.extend_from_slice(&(position / 256).to_le_bytes()[..4]);

    hash(preimage).0
}

/// Splits `indices` into `count` committees of roughly equal size, per `compute_committee` in
/// the consensus spec: committee `index` out of `count` is the half-open slice
/// `[index * len / count, (index + 1) * len / count)` of the *shuffled* index list.
#[must_use]
pub fn compute_committee(
    indices: &[u64],
    seed: H256,
    index: u64,
    count: u64,
    round_count: u8,
) -> Vec<u64> {
    let index_count = indices.len() as u64;
    let start = (index_count * index) / count;
    let end = (index_count * (index + 1)) / count;

    (start..end)
        .map(|i| indices[compute_shuffled_index(i, index_count, seed, round_count) as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffled_index_is_a_permutation() {
        let seed = H256::repeat_byte(7);
        let count = 16;

        let mut seen = std::collections::HashSet::new();

        for index in 0..count {
            let shuffled = compute_shuffled_index(index, count, seed, 10);
            assert!(shuffled < count);
            assert!(seen.insert(shuffled), "shuffle produced a duplicate");
        }
    }

    #[test]
    fn compute_committee_partitions_indices() {
        let indices: Vec<u64> = (0..32).collect();
        let seed = H256::repeat_byte(3);

        let mut seen = std::collections::HashSet::new();
        for index in 0..4 {
            for member in compute_committee(&indices, seed, index, 4, 10) {
                assert!(seen.insert(member));
            }
        }

        assert_eq!(seen.len(), 32);
    }
}
