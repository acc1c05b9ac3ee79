//! The `E2Index` record body (spec.md §4.7): `startSlot | offsets... | count`, with offsets
//! stored as wrapping two's-complement signed values relative to the index record's own start
//! position (spec.md §9's "wrapping-arithmetic offsets" re-architecture note, implemented here
//! as an explicit cast rather than relying on Rust's `as` truncation rules to "just work").

use arithmetic::{wrapping_i64_to_u64, wrapping_u64_to_i64};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Index {
    pub start_slot: u64,
    /// Offsets relative to the index record's own start position in the file.
    pub offsets: Vec<i64>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("index body length {actual} is not 16 + 8*count (count {count})")]
    BadLength { actual: usize, count: u64 },
    #[error("index declares {declared} entries but body only encodes {actual}")]
    CountMismatch { declared: u64, actual: usize },
    #[error("index body is too short to contain a start slot and count")]
    TooShort,
}

impl Index {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(16 + 8 * self.offsets.len());

        body.extend_from_slice(&self.start_slot.to_le_bytes());

        for &offset in &self.offsets {
            body.extend_from_slice(&wrapping_i64_to_u64(offset).to_le_bytes());
        }

        body.extend_from_slice(&(self.offsets.len() as u64).to_le_bytes());

        body
    }

    pub fn decode(body: &[u8]) -> Result<Self, Error> {
        if body.len() < 16 {
            return Err(Error::TooShort);
        }

        let count_bytes: [u8; 8] = body[body.len() - 8..].try_into().expect("checked above");
        let count = u64::from_le_bytes(count_bytes);

        let expected_length = 16 + 8 * count;

        if body.len() as u64 != expected_length {
            return Err(Error::BadLength {
                actual: body.len(),
                count,
            });
        }

        let start_slot = u64::from_le_bytes(body[..8].try_into().expect("checked above"));

        let offsets_bytes = &body[8..body.len() - 8];

        if offsets_bytes.len() as u64 != 8 * count {
            return Err(Error::CountMismatch {
                declared: count,
                actual: offsets_bytes.len() / 8,
            });
        }

        let offsets = offsets_bytes
            .chunks_exact(8)
            .map(|chunk| {
                let raw = u64::from_le_bytes(chunk.try_into().expect("chunks_exact(8)"));
                wrapping_u64_to_i64(raw)
            })
            .collect();

        Ok(Self {
            start_slot,
            offsets,
        })
    }

    /// Absolute file position of entry `i`, given where this index record itself starts.
    #[must_use]
    pub fn absolute_position(&self, index_start: u64, i: usize) -> u64 {
        index_start.wrapping_add(self.offsets[i] as u64)
    }

    /// The offset to store for an entry at `absolute_position`, given where this index record
    /// will start once written.
    #[must_use]
    pub fn relative_offset(index_start: u64, absolute_position: u64) -> i64 {
        (absolute_position as i64).wrapping_sub(index_start as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        let index = Index {
            start_slot: 8192,
            offsets: vec![-24, -16, -8],
        };

        let encoded = index.encode();
        let decoded = Index::decode(&encoded).unwrap();

        assert_eq!(decoded, index);
    }

    #[test]
    fn absolute_position_applies_offset_to_index_start() {
        let index = Index {
            start_slot: 0,
            offsets: vec![-100],
        };

        assert_eq!(index.absolute_position(1_000, 0), 900);
    }

    #[test]
    fn relative_offset_round_trips_through_absolute_position() {
        let index_start = 5_000;
        let absolute = 120;

        let offset = Index::relative_offset(index_start, absolute);
        let index = Index {
            start_slot: 0,
            offsets: vec![offset],
        };

        assert_eq!(index.absolute_position(index_start, 0), absolute);
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let mut body = Index {
            start_slot: 0,
            offsets: vec![1, 2],
        }
        .encode();
        body.pop();

        assert!(Index::decode(&body).is_err());
    }
}
