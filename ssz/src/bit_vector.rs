//! Fixed-length bit vectors (justification bits, sync committee participation bits).
//! Unlike `BitList` there is no sentinel bit: the length `N` is known statically.

use ethereum_types::H256;
use itertools::Itertools as _;

use crate::porcelain::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitVector<const N: usize> {
    bits: [bool; N],
}

impl<const N: usize> Default for BitVector<N> {
    fn default() -> Self {
        Self { bits: [false; N] }
    }
}

impl<const N: usize> BitVector<N> {
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    pub fn set(&mut self, index: usize, value: bool) {
        self.bits[index] = value;
    }

    /// Shifts all bits left by one, dropping the top bit and setting the new bottom bit.
    /// This is exactly how `process_justification_and_finalization` rotates `justification_bits`
    /// at the start of every epoch.
    pub fn shift_up_and_set_lowest(&mut self, lowest: bool) {
        for index in (1..N).rev() {
            self.bits[index] = self.bits[index - 1];
        }

        if N > 0 {
            self.bits[0] = lowest;
        }
    }
}

impl<const N: usize> SszSize for BitVector<N> {
    const SIZE: Size = Size::Fixed(N.div_ceil(8).max(1));
}

impl<const N: usize> SszWrite for BitVector<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        let mut packed = vec![0_u8; N.div_ceil(8).max(1)];

        for (index, &bit) in self.bits.iter().enumerate() {
            if bit {
                packed[index / 8] |= 1 << (index % 8);
            }
        }

        bytes.extend_from_slice(&packed);
    }
}

impl<const N: usize> SszRead<()> for BitVector<N> {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        let expected = N.div_ceil(8).max(1);

        if bytes.len() != expected {
            return Err(ReadError::WrongFixedLength {
                expected,
                actual: bytes.len(),
            });
        }

        let mut bits = [false; N];

        for (index, bit) in bits.iter_mut().enumerate() {
            *bit = bytes[index / 8] & (1 << (index % 8)) != 0;
        }

        Ok(Self { bits })
    }
}

impl<const N: usize> SszHash for BitVector<N> {
    fn hash_tree_root(&self) -> H256 {
        let mut packed = vec![0_u8; N.div_ceil(8).max(1)];

        for (index, &bit) in self.bits.iter().enumerate() {
            if bit {
                packed[index / 8] |= 1 << (index % 8);
            }
        }

        let chunks = packed
            .chunks(32)
            .map(|chunk| {
                let mut padded = [0; 32];
                padded[..chunk.len()].copy_from_slice(chunk);
                H256(padded)
            })
            .collect_vec();

        let leaf_count = N.div_ceil(256).max(1);
        hashing::merkleize(&chunks, hashing::depth_for_leaf_count(leaf_count))
    }
}
