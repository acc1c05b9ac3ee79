//! The on-disk DAG database collaborator (spec.md §6): spec.md keeps the real database out of
//! scope ("the on-disk DAG database" is listed among the external collaborators §1 names but
//! does not define), so this crate ships only the narrow [`Database`] trait the DAG needs plus
//! an in-memory implementation behind it. A real on-disk backend (the teacher uses `libmdbx`)
//! can be swapped in later without touching callers, which is the point of keeping the trait
//! boundary here instead of letting `fork_choice_store` reach for a concrete store directly.

use std::collections::BTreeMap;

use anyhow::Result;
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database key not found")]
    NotFound,
}

/// Byte-oriented key-value store. Keys sort lexicographically so prefix scans (e.g. "every
/// block in an era") are cheap regardless of the backend.
pub trait Database: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    fn put_batch(&self, entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        for (key, value) in entries {
            self.put(key, value)?;
        }

        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Every stored entry whose key starts with `prefix`, in key order.
    fn prefix_iterator(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// The only backend this crate ships (`DESIGN.md`): an in-memory `BTreeMap` behind a
/// `RwLock`, since the real on-disk backend (teacher: `libmdbx`) is out of scope per spec.md §1.
#[derive(Default)]
pub struct InMemoryDatabase {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for InMemoryDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let db = InMemoryDatabase::new();
        db.put(b"a".to_vec(), b"1".to_vec()).unwrap();

        assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.get(b"missing").unwrap(), None);
    }

    #[test]
    fn delete_removes_entry() {
        let db = InMemoryDatabase::new();
        db.put(b"a".to_vec(), b"1".to_vec()).unwrap();
        db.delete(b"a").unwrap();

        assert_eq!(db.get(b"a").unwrap(), None);
    }

    #[test]
    fn prefix_iterator_only_returns_matching_keys() {
        let db = InMemoryDatabase::new();
        db.put(b"block/01".to_vec(), b"x".to_vec()).unwrap();
        db.put(b"block/02".to_vec(), b"y".to_vec()).unwrap();
        db.put(b"state/01".to_vec(), b"z".to_vec()).unwrap();

        let found = db.prefix_iterator(b"block/").unwrap();
        assert_eq!(found.len(), 2);
    }
}
