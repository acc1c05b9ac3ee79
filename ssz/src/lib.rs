//! Canonical SSZ encoding and hash-tree-root Merkleization.
//!
//! See `DESIGN.md` for how this crate's const-generic containers relate to the teacher's
//! `typenum`-based ones.

// Lets `ssz_derive`'s generated code refer to this crate as `::ssz` even when the derive is used
// on a type defined inside `ssz` itself (as in this crate's own tests).
extern crate self as ssz;

mod bit_list;
mod bit_vector;
mod cached;
mod contiguous_list;
mod persistent_list;
mod porcelain;
mod primitives_impl;
mod vector;

pub use bit_list::{BitList, BoundsError as BitListBoundsError};
pub use bit_vector::BitVector;
pub use cached::Cached;
pub use contiguous_list::{
    read_homogeneous_sequence, write_homogeneous_sequence, BoundsError as ListBoundsError,
    ContiguousList,
};
pub use persistent_list::{
    BoundsError as PersistentListBoundsError, IndexError, PersistentList,
};
pub use porcelain::{ReadError, Size, Ssz, SszHash, SszRead, SszReadDefault, SszSize, SszWrite};
pub use primitives_impl::combine;
pub use ssz_derive::Ssz;
pub use vector::{LengthError as VectorLengthError, Vector};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Ssz)]
    struct Simple {
        a: u64,
        b: ContiguousList<u8, 16>,
        c: H256Wrapper,
    }

    // `ethereum_types::H256` already implements the `ssz` traits directly, but the derive macro
    // needs `ssz`/`hashing`/`ethereum_types` in scope by their crate-root paths, which a
    // `#[cfg(test)]` module inside the `ssz` crate itself does not get via `use super::*`.
    type H256Wrapper = ethereum_types::H256;

    #[test]
    fn round_trips_mixed_fixed_and_variable_fields() {
        let value = Simple {
            a: 42,
            b: ContiguousList::try_from_iter([1, 2, 3]).unwrap(),
            c: ethereum_types::H256::repeat_byte(9),
        };

        let bytes = value.to_ssz();
        let decoded = Simple::from_ssz_unchecked(&(), &bytes).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn hash_tree_root_is_stable_across_clones() {
        let value = Simple {
            a: 1,
            b: ContiguousList::default(),
            c: ethereum_types::H256::zero(),
        };

        assert_eq!(value.hash_tree_root(), value.clone().hash_tree_root());
    }

    #[test]
    fn list_rejects_overflow() {
        let result = ContiguousList::<u8, 2>::try_from_iter([1, 2, 3]);
        assert!(result.is_err());
    }

    #[test]
    fn bitlist_round_trips() {
        let mut bits = BitList::<64>::with_length(10).unwrap();
        bits.set(3, true);
        bits.set(9, true);

        let bytes = bits.to_ssz();
        let decoded = BitList::<64>::from_ssz_unchecked(&(), &bytes).unwrap();

        assert_eq!(bits, decoded);
        assert_eq!(decoded.count_ones(), 2);
    }

    #[test]
    fn cached_invalidates_only_on_mutation() {
        let mut cached = Cached::new(ContiguousList::<u64, 4>::try_from_iter([1, 2]).unwrap());
        let root_before = cached.hash_tree_root();
        assert_eq!(cached.hash_tree_root(), root_before);

        cached.get_mut().push(3).unwrap();
        assert_ne!(cached.hash_tree_root(), root_before);
    }
}
