//! `Ssz` impls for fixed-width primitives and 32-byte digests.

use ethereum_types::{H256, U256};
use hashing::hash_256_256;

use crate::porcelain::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

macro_rules! impl_ssz_for_uint {
    ($type:ty) => {
        impl SszSize for $type {
            const SIZE: Size = Size::Fixed(core::mem::size_of::<$type>());
        }

        impl SszWrite for $type {
            fn write_variable(&self, bytes: &mut Vec<u8>) {
                bytes.extend_from_slice(&self.to_le_bytes());
            }
        }

        impl SszRead<()> for $type {
            fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
                let expected = core::mem::size_of::<$type>();

                let array = bytes.try_into().map_err(|_| ReadError::WrongFixedLength {
                    expected,
                    actual: bytes.len(),
                })?;

                Ok(Self::from_le_bytes(array))
            }
        }

        impl SszHash for $type {
            fn hash_tree_root(&self) -> H256 {
                let mut chunk = [0; 32];
                chunk[..core::mem::size_of::<$type>()].copy_from_slice(&self.to_le_bytes());
                H256(chunk)
            }
        }
    };
}

impl_ssz_for_uint!(u8);
impl_ssz_for_uint!(u16);
impl_ssz_for_uint!(u32);
impl_ssz_for_uint!(u64);
impl_ssz_for_uint!(u128);

impl SszSize for bool {
    const SIZE: Size = Size::Fixed(1);
}

impl SszWrite for bool {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        bytes.push(u8::from(*self));
    }
}

impl SszRead<()> for bool {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        match bytes {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(ReadError::WrongFixedLength {
                expected: 1,
                actual: bytes.len(),
            }),
        }
    }
}

impl SszHash for bool {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = [0; 32];
        chunk[0] = u8::from(*self);
        H256(chunk)
    }
}

impl SszSize for H256 {
    const SIZE: Size = Size::Fixed(32);
}

impl SszWrite for H256 {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(self.as_bytes());
    }
}

impl SszRead<()> for H256 {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| ReadError::WrongFixedLength {
            expected: 32,
            actual: bytes.len(),
        })?;

        Ok(Self(array))
    }
}

impl SszHash for H256 {
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

/// Fixed-size byte vectors (BLS public keys, signatures, the fee-recipient address, etc.) are
/// represented as plain `[u8; N]`. Hash-tree-root chunks the bytes and Merkleizes them, matching
/// how the real spec treats `Vector[uint8, N]`.
impl<const N: usize> SszSize for [u8; N] {
    const SIZE: Size = Size::Fixed(N);
}

impl<const N: usize> SszWrite for [u8; N] {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(self);
    }
}

impl<const N: usize> SszRead<()> for [u8; N] {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        bytes.try_into().map_err(|_| ReadError::WrongFixedLength {
            expected: N,
            actual: bytes.len(),
        })
    }
}

impl<const N: usize> SszHash for [u8; N] {
    fn hash_tree_root(&self) -> H256 {
        let chunk_count = N.div_ceil(32);
        let mut chunks = Vec::with_capacity(chunk_count);

        for chunk_start in (0..N).step_by(32) {
            let chunk_end = (chunk_start + 32).min(N);
            let mut chunk = [0; 32];
            chunk[..chunk_end - chunk_start].copy_from_slice(&self[chunk_start..chunk_end]);
            chunks.push(H256(chunk));
        }

        if chunks.is_empty() {
            chunks.push(H256::zero());
        }

        hashing::merkleize(&chunks, hashing::depth_for_leaf_count(chunks.len()))
    }
}

/// Hashes a pair of already-computed roots. Exposed for container impls generated by
/// `ssz_derive` that need to combine field roots without re-deriving the Merkleization logic.
#[must_use]
pub fn combine(left: H256, right: H256) -> H256 {
    hash_256_256(left, right)
}
