//! Fixed-length SSZ vectors backed by a flat `Vec`, always exactly `N` elements.
//!
//! Differs from [`crate::ContiguousList`] only in that length is part of the type's contract
//! rather than bounded-but-variable: construction fails if the element count is not exactly
//! `N`, and `hash_tree_root` skips the length mix-in a `List` applies.

use ethereum_types::H256;
use itertools::Itertools as _;
use thiserror::Error;

use crate::contiguous_list::{read_homogeneous_sequence, write_homogeneous_sequence};
use crate::porcelain::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

#[derive(Debug, Error)]
#[error("vector of length {actual} does not match required length {expected}")]
pub struct LengthError {
    expected: usize,
    actual: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vector<T, const N: usize> {
    elements: Vec<T>,
}

impl<T: Default + Clone, const N: usize> Default for Vector<T, N> {
    fn default() -> Self {
        Self {
            elements: vec![T::default(); N],
        }
    }
}

impl<T, const N: usize> Vector<T, N> {
    pub const LENGTH: usize = N;

    pub fn try_from_iter(iterator: impl IntoIterator<Item = T>) -> Result<Self, LengthError> {
        let elements = iterator.into_iter().collect_vec();

        if elements.len() != N {
            return Err(LengthError {
                expected: N,
                actual: elements.len(),
            });
        }

        Ok(Self { elements })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: impl Into<usize>) -> Option<&T> {
        self.elements.get(index.into())
    }

    pub fn get_mut(&mut self, index: impl Into<usize>) -> Option<&mut T> {
        self.elements.get_mut(index.into())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.elements.iter_mut()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a Vector<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T, const N: usize> IntoIterator for Vector<T, N> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<T: SszSize, const N: usize> SszSize for Vector<T, N> {
    const SIZE: Size = match T::SIZE {
        Size::Fixed(width) => Size::Fixed(width * N),
        Size::Variable => Size::Variable,
    };
}

impl<T: SszWrite + SszSize, const N: usize> SszWrite for Vector<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        write_homogeneous_sequence(&self.elements, bytes);
    }
}

impl<C, T: SszRead<C> + SszSize, const N: usize> SszRead<C> for Vector<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let elements = read_homogeneous_sequence(context, bytes)?;

        if elements.len() != N {
            return Err(ReadError::ListTooLong { maximum: N });
        }

        Ok(Self { elements })
    }
}

impl<T: SszHash, const N: usize> SszHash for Vector<T, N> {
    fn hash_tree_root(&self) -> H256 {
        let chunks = self.elements.iter().map(SszHash::hash_tree_root).collect_vec();
        let depth = hashing::depth_for_leaf_count(N.max(1));
        hashing::merkleize(&chunks, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(Vector::<u64, 4>::try_from_iter([1, 2, 3]).is_err());
        assert!(Vector::<u64, 4>::try_from_iter([1, 2, 3, 4]).is_ok());
    }

    #[test]
    fn default_is_full_length() {
        let vector = Vector::<u64, 8>::default();
        assert_eq!(vector.len(), 8);
    }
}
