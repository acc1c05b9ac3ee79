//! Variable-length bitlists (attestation aggregation bits). SSZ encodes a bitlist as its bits
//! packed little-endian-first into bytes, with a single sentinel `1` bit appended just past the
//! last real bit to recover the logical length on decode.

use ethereum_types::H256;
use itertools::Itertools as _;
use thiserror::Error;

use crate::porcelain::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitList<const N: usize> {
    bits: Vec<bool>,
}

#[derive(Debug, Error)]
#[error("bitlist length {length} exceeds maximum length {maximum}")]
pub struct BoundsError {
    length: usize,
    maximum: usize,
}

impl<const N: usize> BitList<N> {
    pub const MAX_LENGTH: usize = N;

    pub fn with_length(length: usize) -> Result<Self, BoundsError> {
        if length > N {
            return Err(BoundsError { length, maximum: N });
        }

        Ok(Self {
            bits: vec![false; length],
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, index: impl Into<usize>) -> Option<bool> {
        self.bits.get(index.into()).copied()
    }

    pub fn set(&mut self, index: impl Into<usize>, value: bool) {
        if let Some(bit) = self.bits.get_mut(index.into()) {
            *bit = value;
        }
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(index, &bit)| bit.then_some(index))
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    /// Bitwise OR, used to combine attestation aggregation bits and participation flags.
    pub fn union_with(&mut self, other: &Self) {
        for index in other.iter_ones() {
            self.set(index, true);
        }
    }
}

impl<const N: usize> Default for BitList<N> {
    fn default() -> Self {
        Self { bits: Vec::new() }
    }
}

impl<const N: usize> SszSize for BitList<N> {
    const SIZE: Size = Size::Variable;
}

impl<const N: usize> SszWrite for BitList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        let total_bits = self.bits.len() + 1;
        let total_bytes = total_bits.div_ceil(8);
        let mut out = vec![0_u8; total_bytes.max(1)];

        for (index, &bit) in self.bits.iter().enumerate() {
            if bit {
                out[index / 8] |= 1 << (index % 8);
            }
        }

        let sentinel = self.bits.len();
        out[sentinel / 8] |= 1 << (sentinel % 8);

        bytes.extend_from_slice(&out);
    }
}

impl<const N: usize> SszRead<()> for BitList<N> {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.is_empty() {
            return Err(ReadError::InvalidBitlist("empty bitlist encoding"));
        }

        let highest_set_bit = bytes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(byte_index, &byte)| {
                (0..8)
                    .rev()
                    .find(|bit_index| byte & (1 << bit_index) != 0)
                    .map(|bit_index| byte_index * 8 + bit_index)
            })
            .ok_or(ReadError::InvalidBitlist("missing length sentinel bit"))?;

        let length = highest_set_bit;

        if length > N {
            return Err(ReadError::ListTooLong { maximum: N });
        }

        let bits = (0..length)
            .map(|index| bytes[index / 8] & (1 << (index % 8)) != 0)
            .collect();

        Ok(Self { bits })
    }
}

impl<const N: usize> SszHash for BitList<N> {
    fn hash_tree_root(&self) -> H256 {
        let packed_byte_len = self.bits.len().div_ceil(8);
        let mut packed = vec![0_u8; packed_byte_len];

        for (index, &bit) in self.bits.iter().enumerate() {
            if bit {
                packed[index / 8] |= 1 << (index % 8);
            }
        }

        let byte_chunks = packed
            .chunks(32)
            .map(|chunk| {
                let mut padded = [0; 32];
                padded[..chunk.len()].copy_from_slice(chunk);
                H256(padded)
            })
            .collect_vec();

        let leaf_count = (N.div_ceil(256)).max(1);
        let depth = hashing::depth_for_leaf_count(leaf_count);
        let root = hashing::merkleize(&byte_chunks, depth);

        hashing::mix_in_length(root, self.bits.len())
    }
}
