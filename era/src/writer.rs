//! The era file writer (spec.md §4.7): `Version | Block_0 … Block_{n-1} | BlockIndex (if n>0) |
//! State | StateIndex(1 entry)`. `init` writes the version marker immediately; `update` appends
//! one Snappy-framed block and remembers its absolute position; `finish` appends the terminal
//! state and both index records.

use std::io::{Seek, SeekFrom, Write};

use crate::{
    compress,
    index::Index,
    record::{self, E2_INDEX, E2_VERSION, SNAPPY_BEACON_BLOCK, SNAPPY_BEACON_STATE},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Record(#[from] record::Error),
    #[error(transparent)]
    Compress(#[from] compress::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("era writer: update() called with slot {slot} before start slot {start_slot}")]
    SlotBeforeStart { slot: u64, start_slot: u64 },
}

pub struct EraWriter<W> {
    handle: W,
    start_slot: Option<u64>,
    /// Absolute position of each appended block, indexed by `slot - start_slot`. A hole (no
    /// block at that slot) is represented by offset `0`, matching spec.md §4.7's index format
    /// (the reader treats an all-zero offset as "no block" when `start_slot` is known).
    block_positions: Vec<Option<u64>>,
    position: u64,
}

impl<W: Write + Seek> EraWriter<W> {
    /// Opens the writer and immediately emits the `E2Version` marker record. `start_slot` fixes
    /// the slot `update`'s first call is expected to land on; later calls must be monotonically
    /// increasing from there.
    pub fn init(mut handle: W, start_slot: Option<u64>) -> Result<Self, Error> {
        let written = record::write_record(&mut handle, E2_VERSION, &[])?;

        Ok(Self {
            handle,
            start_slot,
            block_positions: Vec::new(),
            position: written,
        })
    }

    /// Appends one Snappy-framed SSZ-encoded signed block at `slot`.
    pub fn update(&mut self, slot: u64, ssz_bytes: &[u8]) -> Result<(), Error> {
        let start_slot = *self.start_slot.get_or_insert(slot);

        if slot < start_slot {
            return Err(Error::SlotBeforeStart { slot, start_slot });
        }

        let compressed = compress::compress(ssz_bytes)?;

        let index = (slot - start_slot) as usize;

        if self.block_positions.len() <= index {
            self.block_positions.resize(index + 1, None);
        }

        self.block_positions[index] = Some(self.position);

        let written = record::write_record(&mut self.handle, SNAPPY_BEACON_BLOCK, &compressed)?;
        self.position += written;

        Ok(())
    }

    /// Writes the terminal state record and both index records, consuming the writer.
    pub fn finish(mut self, state_slot: u64, state_ssz_bytes: &[u8]) -> Result<W, Error> {
        if !self.block_positions.is_empty() {
            self.write_block_index()?;
        }

        let compressed = compress::compress(state_ssz_bytes)?;

        let state_position = self.position;
        let written = record::write_record(&mut self.handle, SNAPPY_BEACON_STATE, &compressed)?;
        self.position += written;

        let index_start = self.position;
        let offset = Index::relative_offset(index_start, state_position);

        let state_index = Index {
            start_slot: state_slot,
            offsets: vec![offset],
        };

        record::write_record(&mut self.handle, E2_INDEX, &state_index.encode())?;

        self.handle.flush()?;
        self.handle.seek(SeekFrom::Current(0))?;

        Ok(self.handle)
    }

    fn write_block_index(&mut self) -> Result<(), Error> {
        let index_start = self.position;

        let offsets = self
            .block_positions
            .iter()
            .map(|position| match position {
                Some(absolute) => Index::relative_offset(index_start, *absolute),
                None => 0,
            })
            .collect();

        let index = Index {
            start_slot: self.start_slot.unwrap_or(0),
            offsets,
        };

        let written = record::write_record(&mut self.handle, E2_INDEX, &index.encode())?;
        self.position += written;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::reader::EraReader;

    #[test]
    fn round_trips_blocks_and_state() {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = EraWriter::init(&mut buffer, Some(100)).unwrap();

        for slot in 100..103 {
            writer
                .update(slot, format!("block-{slot}").as_bytes())
                .unwrap();
        }

        writer.finish(103, b"terminal-state").unwrap();

        let bytes = buffer.into_inner();
        let reader = EraReader::open(Cursor::new(bytes)).unwrap();

        for slot in 100..103 {
            let block = reader.read_block(slot).unwrap().unwrap();
            assert_eq!(block, format!("block-{slot}").as_bytes());
        }

        assert_eq!(reader.read_state().unwrap(), b"terminal-state");
    }
}
