//! Large per-validator lists (`validators`, `balances`, …) that the state clones on every slot
//! processed. Backed by `Arc<Vec<T>>` so a state clone is an `Arc` bump; mutating a field
//! through `get_mut`/`push` clones the backing vector only if it is actually shared
//! (`Arc::make_mut`), giving effectively-persistent semantics without a full immutable-tree
//! implementation. Recorded in `DESIGN.md` as a deliberate simplification of the teacher's own
//! `PersistentList`.

use std::sync::Arc;

use ethereum_types::H256;
use itertools::Itertools as _;
use thiserror::Error;

use crate::porcelain::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

#[derive(Debug, Error)]
#[error("list of length {length} exceeds maximum length {maximum}")]
pub struct BoundsError {
    length: usize,
    maximum: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistentList<T, const N: usize> {
    elements: Arc<Vec<T>>,
}

impl<T, const N: usize> Default for PersistentList<T, N> {
    fn default() -> Self {
        Self {
            elements: Arc::new(Vec::new()),
        }
    }
}

impl<T, const N: usize> PersistentList<T, N> {
    pub const MAX_LENGTH: usize = N;

    pub fn try_from_iter(iterator: impl IntoIterator<Item = T>) -> Result<Self, BoundsError> {
        let elements = iterator.into_iter().collect_vec();

        if elements.len() > N {
            return Err(BoundsError {
                length: elements.len(),
                maximum: N,
            });
        }

        Ok(Self {
            elements: Arc::new(elements),
        })
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

    /// Range-checked accessor matching the spec invariant `ValidatorIndex < len(validators)`.
    pub fn get_checked(&self, index: impl Into<usize>) -> Result<&T, IndexError> {
        let index = index.into();

        self.elements.get(index).ok_or(IndexError {
            index,
            length: self.elements.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl<T: Clone, const N: usize> PersistentList<T, N> {
    pub fn get_mut(&mut self, index: impl Into<usize>) -> Result<&mut T, IndexError> {
        let index = index.into();
        let length = self.elements.len();

        Arc::make_mut(&mut self.elements)
            .get_mut(index)
            .ok_or(IndexError { index, length })
    }

    pub fn push(&mut self, element: T) -> Result<(), BoundsError> {
        let length = self.elements.len();

        if length >= N {
            return Err(BoundsError {
                length: length + 1,
                maximum: N,
            });
        }

        Arc::make_mut(&mut self.elements).push(element);

        Ok(())
    }

    /// Builds a list the same length as `other`, filled with `T::default()`.
    pub fn repeat_zero_with_length_of<U>(other: &PersistentList<U, N>) -> Self
    where
        T: Default,
    {
        Self {
            elements: Arc::new(vec![T::default(); other.len()]),
        }
    }
}

#[derive(Debug, Error)]
#[error("index {index} out of bounds for list of length {length}")]
pub struct IndexError {
    index: usize,
    length: usize,
}

impl<'a, T, const N: usize> IntoIterator for &'a PersistentList<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T, const N: usize> SszSize for PersistentList<T, N> {
    const SIZE: Size = Size::Variable;
}

impl<T: SszWrite + SszSize, const N: usize> SszWrite for PersistentList<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        crate::contiguous_list::write_homogeneous_sequence(&self.elements, bytes);
    }
}

impl<C, T: SszRead<C> + SszSize, const N: usize> SszRead<C> for PersistentList<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let elements = crate::contiguous_list::read_homogeneous_sequence(context, bytes)?;

        if elements.len() > N {
            return Err(ReadError::ListTooLong { maximum: N });
        }

        Ok(Self {
            elements: Arc::new(elements),
        })
    }
}

impl<T: SszHash, const N: usize> SszHash for PersistentList<T, N> {
    fn hash_tree_root(&self) -> H256 {
        let chunks = self.elements.iter().map(SszHash::hash_tree_root).collect_vec();
        let depth = hashing::depth_for_leaf_count(N.max(1));
        let root = hashing::merkleize(&chunks, depth);
        hashing::mix_in_length(root, self.elements.len())
    }
}
