//! Per-field hash-tree-root memoization (spec.md §4.1).
//!
//! `Cached<T>` wraps a field that is expensive to Merkleize (a validator registry, a balances
//! list, a block-roots ring) so that `BeaconState::hash_tree_root` does not redo that work every
//! slot. `get_mut` is the only way to reach the inner value mutably; doing so drops the memoized
//! root, so the next `hash_tree_root` call recomputes just that field's subtree. Sibling fields
//! keep their own `Cached` slots untouched, which is what gives us "mutating a field invalidates
//! its subtree and all ancestors but preserves siblings": the container's own root is never
//! itself cached, only combined fresh from whichever field roots are available.

use once_cell::sync::OnceCell;

use crate::porcelain::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

#[derive(Debug, Default)]
pub struct Cached<T> {
    value: T,
    root: OnceCell<ethereum_types::H256>,
}

impl<T> Cached<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            root: OnceCell::new(),
        }
    }

    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Invalidates the memoized root and returns a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut T {
        self.root.take();
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Clone> Clone for Cached<T> {
    fn clone(&self) -> Self {
        // The cached root is still valid for the cloned value; no need to recompute it.
        Self {
            value: self.value.clone(),
            root: self.root.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for Cached<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Cached<T> {}

impl<T: SszSize> SszSize for Cached<T> {
    const SIZE: Size = T::SIZE;
}

impl<T: SszWrite> SszWrite for Cached<T> {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        self.value.write_variable(bytes);
    }

    fn ssz_bytes_len(&self) -> usize {
        self.value.ssz_bytes_len()
    }
}

impl<C, T: SszRead<C>> SszRead<C> for Cached<T> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        T::from_ssz_unchecked(context, bytes).map(Self::new)
    }
}

impl<T: SszHash> SszHash for Cached<T> {
    fn hash_tree_root(&self) -> ethereum_types::H256 {
        *self.root.get_or_init(|| self.value.hash_tree_root())
    }
}
