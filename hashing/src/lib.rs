//! SHA-256 primitives used to Merkleize SSZ chunks into a hash-tree-root.

use ethereum_types::H256;
use sha2::{Digest as _, Sha256};

/// Hashes an arbitrary byte string. Used for non-chunked digests (signing roots, etc.).
#[must_use]
pub fn hash(bytes: impl AsRef<[u8]>) -> H256 {
    H256(Sha256::digest(bytes).into())
}

/// Hashes the concatenation of two 32-byte chunks, as required at every level of a Merkle tree.
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    H256(hasher.finalize().into())
}

/// Merkleizes a slice of 32-byte chunks, padding with zero chunks up to the next power of two,
/// up to `depth` levels (`depth` = log2 of the number of leaves at the base of the tree).
///
/// Returns the root. Callers that need the intermediate levels (to maintain the per-field
/// subtree cache described by the SSZ spec) should use [`merkleize_with_cache`] instead.
#[must_use]
pub fn merkleize(chunks: &[H256], depth: usize) -> H256 {
    merkleize_with_cache(chunks, depth)
        .pop()
        .and_then(|root_level| root_level.first().copied())
        .unwrap_or_default()
}

/// The hash of an all-zero subtree of each height up to `depth`: `zero_hashes[0]` is the zero
/// leaf itself, `zero_hashes[k] = hash_256_256(zero_hashes[k - 1], zero_hashes[k - 1])`. Standard
/// trick for Merkleizing a mostly-empty tree (`VALIDATOR_REGISTRY_LIMIT` alone is `2**30`)
/// without ever materializing the padding: any subtree with no real chunks in it is equal to
/// `zero_hashes[its height]` by induction, so the padding never needs to be allocated.
#[must_use]
pub fn zero_hashes(depth: usize) -> Vec<H256> {
    let mut zeros = Vec::with_capacity(depth + 1);
    zeros.push(H256::zero());

    for level in 0..depth {
        zeros.push(hash_256_256(zeros[level], zeros[level]));
    }

    zeros
}

/// Merkleizes `chunks` and returns every level of the tree, from the leaf level (index 0) up to
/// the root (last index, a single-element `Vec`). This is the representation the hash-tree-root
/// cache in the `ssz` crate stores per field so that mutating one field does not force
/// recomputation of unrelated siblings.
///
/// Levels are sized to the actual chunk count at that height, not `1 << (depth - level)`: a
/// missing right sibling is filled in from [`zero_hashes`] instead of being stored, so Merkleizing
/// a handful of chunks at a capacity-derived `depth` (lists bounded by `VALIDATOR_REGISTRY_LIMIT`
/// chief among them) costs work proportional to `chunks.len()`, not to `2.pow(depth)`.
#[must_use]
pub fn merkleize_with_cache(chunks: &[H256], depth: usize) -> Vec<Vec<H256>> {
    let leaf_count = 1_usize << depth;
    assert!(chunks.len() <= leaf_count, "too many chunks for depth");

    let zeros = zero_hashes(depth);

    let mut current = if chunks.is_empty() {
        vec![zeros[0]]
    } else {
        chunks.to_vec()
    };

    let mut levels = vec![current.clone()];

    for level in 0..depth {
        let next = current
            .chunks(2)
            .map(|pair| hash_256_256(pair[0], pair.get(1).copied().unwrap_or(zeros[level])))
            .collect::<Vec<_>>();

        levels.push(next.clone());
        current = next;
    }

    levels
}

/// The 32-byte little-endian length chunk mixed in at the top of every SSZ list's tree. Exposed
/// on its own (not just folded into [`mix_in_length`]) because a Merkle proof into a list field
/// — a deposit proof against `eth1_data.deposit_root` chief among them — needs this exact chunk
/// as the final sibling in the branch, one level above the root [`merkleize`] returns.
#[must_use]
pub fn length_mixin_chunk(length: usize) -> H256 {
    let mut length_chunk = [0; 32];
    length_chunk[..8].copy_from_slice(&(length as u64).to_le_bytes());
    H256(length_chunk)
}

/// Mixes a little-endian length suffix into a Merkle root, as required for SSZ lists.
#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    hash_256_256(root, length_mixin_chunk(length))
}

/// Mixes a little-endian selector suffix into a Merkle root, as required for SSZ unions
/// (used here for the tagged `ForkedBeaconState`/`ForkedSignedBeaconBlock` variants).
#[must_use]
pub fn mix_in_selector(root: H256, selector: u8) -> H256 {
    let mut selector_chunk = [0; 32];
    selector_chunk[0] = selector;
    hash_256_256(root, H256(selector_chunk))
}

/// Smallest `depth` such that `1 << depth >= leaf_count`.
#[must_use]
pub const fn depth_for_leaf_count(leaf_count: usize) -> usize {
    let mut depth = 0;
    let mut capacity = 1_usize;

    while capacity < leaf_count {
        capacity <<= 1;
        depth += 1;
    }

    depth
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn hash_is_sha256() {
        assert_eq!(
            hash(b"").0,
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"),
        );
    }

    #[test]
    fn merkleize_single_chunk_is_identity() {
        let chunk = H256::repeat_byte(7);
        assert_eq!(merkleize(&[chunk], 0), chunk);
    }

    #[test]
    fn depth_for_leaf_count_examples() {
        assert_eq!(depth_for_leaf_count(1), 0);
        assert_eq!(depth_for_leaf_count(2), 1);
        assert_eq!(depth_for_leaf_count(3), 2);
        assert_eq!(depth_for_leaf_count(4), 2);
        assert_eq!(depth_for_leaf_count(5), 3);
    }

    #[test]
    fn merkleize_two_chunks_matches_manual_hash() {
        let left = H256::repeat_byte(1);
        let right = H256::repeat_byte(2);
        assert_eq!(merkleize(&[left, right], 1), hash_256_256(left, right));
    }

    #[test]
    fn merkleize_with_cache_root_matches_merkleize() {
        let chunks = [H256::repeat_byte(4), H256::repeat_byte(5)];
        let levels = merkleize_with_cache(&chunks, 1);
        assert_eq!(levels.last().and_then(|level| level.first().copied()), Some(merkleize(&chunks, 1)));
    }

    #[test]
    fn empty_input_merkleizes_to_zero_hash_at_depth() {
        let zeros = zero_hashes(3);
        assert_eq!(merkleize(&[], 3), zeros[3]);
    }

    /// `VALIDATOR_REGISTRY_LIMIT` is `2**30`; padding eagerly at this depth would require over a
    /// billion leaf hashes. This only terminates because `merkleize_with_cache` fills missing
    /// siblings in from `zero_hashes` instead of materializing them.
    #[test]
    fn merkleize_at_registry_limit_depth_stays_cheap() {
        let chunks = [H256::repeat_byte(1), H256::repeat_byte(2), H256::repeat_byte(3)];
        assert_ne!(merkleize(&chunks, 30), H256::zero());
    }
}
