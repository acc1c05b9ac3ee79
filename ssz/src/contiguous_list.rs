//! Variable-length SSZ lists backed by a flat `Vec`, bounded at compile time by `N`.
//!
//! Matches the role of the teacher's `typenum`-parameterized `ContiguousList` but keyed by a
//! `const N: usize` instead of a `typenum` unsigned integer (see `DESIGN.md`).

use std::slice;

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
pub struct ContiguousList<T, const N: usize> {
    elements: Vec<T>,
}

impl<T, const N: usize> Default for ContiguousList<T, N> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
        }
    }
}

impl<T, const N: usize> ContiguousList<T, N> {
    pub const MAX_LENGTH: usize = N;

    pub fn try_from_iter(
        iterator: impl IntoIterator<Item = T>,
    ) -> Result<Self, BoundsError> {
        let elements = iterator.into_iter().collect_vec();

        if elements.len() > N {
            return Err(BoundsError {
                length: elements.len(),
                maximum: N,
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

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.elements.iter_mut()
    }

    /// Appends `element`, enforcing the `N` bound. Used by the transition functions for
    /// append-only fields (`eth1_data_votes`, `historical_roots`, …).
    pub fn push(&mut self, element: T) -> Result<(), BoundsError> {
        if self.elements.len() >= N {
            return Err(BoundsError {
                length: self.elements.len() + 1,
                maximum: N,
            });
        }

        self.elements.push(element);

        Ok(())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl<T: Clone, const N: usize> ContiguousList<T, N> {
    /// Builds a list the same length as `other`, filled with `T::default()`. Mirrors the
    /// teacher's `PersistentList::repeat_zero_with_length_of`, used when upgrading a state to a
    /// fork that adds a parallel per-validator field (participation flags, inactivity scores).
    pub fn repeat_zero_with_length_of<U>(other: &ContiguousList<U, N>) -> Self
    where
        T: Default,
    {
        Self {
            elements: vec![T::default(); other.len()],
        }
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a ContiguousList<T, N> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T, const N: usize> IntoIterator for ContiguousList<T, N> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<T, const N: usize> SszSize for ContiguousList<T, N> {
    const SIZE: Size = Size::Variable;
}

impl<T: SszWrite + SszSize, const N: usize> SszWrite for ContiguousList<T, N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        write_homogeneous_sequence(&self.elements, bytes);
    }
}

impl<C, T: SszRead<C> + SszSize, const N: usize> SszRead<C> for ContiguousList<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let elements = read_homogeneous_sequence(context, bytes)?;

        if elements.len() > N {
            return Err(ReadError::ListTooLong { maximum: N });
        }

        Ok(Self { elements })
    }
}

impl<T: SszHash, const N: usize> SszHash for ContiguousList<T, N> {
    fn hash_tree_root(&self) -> H256 {
        let chunks = self.elements.iter().map(SszHash::hash_tree_root).collect_vec();
        let depth = hashing::depth_for_leaf_count(N.max(1));
        let root = hashing::merkleize(&chunks, depth);
        hashing::mix_in_length(root, self.elements.len())
    }
}

/// Shared by [`ContiguousList`] and any future homogeneous-element container: writes either a
/// flat concatenation (fixed-size elements) or an offset-table-prefixed payload (variable-size
/// elements), following the same algorithm containers use for their fields.
pub fn write_homogeneous_sequence<T: SszWrite + SszSize>(elements: &[T], bytes: &mut Vec<u8>) {
    match T::SIZE {
        Size::Fixed(_) => {
            for element in elements {
                element.write_variable(bytes);
            }
        }
        Size::Variable => {
            let fixed_len = elements.len() * 4;
            let mut variable_part = Vec::new();
            let mut offset = fixed_len;

            for element in elements {
                bytes.extend_from_slice(&u32::try_from(offset).unwrap_or(u32::MAX).to_le_bytes());

                let before = variable_part.len();
                element.write_variable(&mut variable_part);
                offset += variable_part.len() - before;
            }

            bytes.extend(variable_part);
        }
    }
}

pub fn read_homogeneous_sequence<C, T: SszRead<C> + SszSize>(
    context: &C,
    bytes: &[u8],
) -> Result<Vec<T>, ReadError> {
    match T::SIZE {
        Size::Fixed(width) => {
            if width == 0 {
                return Ok(Vec::new());
            }

            if !bytes.len().is_multiple_of(width) {
                return Err(ReadError::WrongFixedLength {
                    expected: width,
                    actual: bytes.len(),
                });
            }

            bytes
                .chunks_exact(width)
                .map(|chunk| T::from_ssz_unchecked(context, chunk))
                .collect()
        }
        Size::Variable => {
            if bytes.is_empty() {
                return Ok(Vec::new());
            }

            let first_offset = read_offset(bytes, 0)?;

            if !first_offset.is_multiple_of(4) {
                return Err(ReadError::InvalidOffset {
                    offset: first_offset,
                    length: bytes.len(),
                });
            }

            let count = first_offset / 4;
            let mut offsets = Vec::with_capacity(count);

            for i in 0..count {
                offsets.push(read_offset(bytes, i * 4)?);
            }

            offsets.push(bytes.len());

            offsets
                .windows(2)
                .map(|window| {
                    let [start, end] = *window else {
                        unreachable!("windows(2) always yields 2-element slices")
                    };

                    if start > end || end > bytes.len() {
                        return Err(ReadError::InvalidOffset {
                            offset: start,
                            length: bytes.len(),
                        });
                    }

                    T::from_ssz_unchecked(context, &bytes[start..end])
                })
                .collect()
        }
    }
}

fn read_offset(bytes: &[u8], position: usize) -> Result<usize, ReadError> {
    let slice = bytes
        .get(position..position + 4)
        .ok_or(ReadError::TooShort {
            expected: position + 4,
            actual: bytes.len(),
        })?;

    let array: [u8; 4] = slice.try_into().expect("slice has length 4");

    Ok(u32::from_le_bytes(array) as usize)
}

trait IsMultipleOfUsize {
    fn is_multiple_of(self, other: Self) -> bool;
}

impl IsMultipleOfUsize for usize {
    fn is_multiple_of(self, other: Self) -> bool {
        other != 0 && self % other == 0
    }
}
