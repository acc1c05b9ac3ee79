//! The era file reader (spec.md §4.7): seeks to the trailing `count` field, locates the state
//! index, validates it, then supports random-access reads of any block by slot plus the
//! terminal state.

use std::io::{Read, Seek, SeekFrom};

use crate::{
    compress,
    index::{self, Index},
    record::{self, E2_INDEX, SNAPPY_BEACON_BLOCK, SNAPPY_BEACON_STATE},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Record(#[from] record::Error),
    #[error(transparent)]
    IndexFormat(#[from] index::Error),
    #[error(transparent)]
    Compress(#[from] compress::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("era file too short to contain an index record")]
    TooShort,
    #[error("index declares {count} entries but file only has room for {max}")]
    CountOutOfRange { count: u64, max: u64 },
    #[error("index offset resolves to position {position}, outside file bounds (size {size})")]
    OffsetOutOfRange { position: u64, size: u64 },
    #[error("index start slot {0} does not fit in 32 bits")]
    StartSlotTooLarge(u64),
    #[error("record at the declared position is not the expected type")]
    WrongRecordType,
    #[error("slot {0} has no block recorded (index offset is zero)")]
    NoBlockAtSlot(u64),
}

pub struct EraReader<R> {
    handle: std::cell::RefCell<R>,
    file_size: u64,
    state_index_start: u64,
    state_index: Index,
    block_index: Option<(u64, Index)>,
}

impl<R: Read + Seek> EraReader<R> {
    pub fn open(mut handle: R) -> Result<Self, Error> {
        let file_size = handle.seek(SeekFrom::End(0))?;

        let (state_index_start, state_index) = read_trailing_index(&mut handle, file_size)?;

        if state_index.start_slot > u64::from(u32::MAX) {
            return Err(Error::StartSlotTooLarge(state_index.start_slot));
        }

        validate_index(&state_index, state_index_start, file_size)?;

        let block_index = if state_index_start > 0 {
            read_block_index(&mut handle, state_index_start, file_size).ok()
        } else {
            None
        };

        log::debug!(
            "opened era file: {} bytes, state index at {state_index_start}, {} block entries",
            file_size,
            block_index.as_ref().map_or(0, |(_, index)| index.offsets.len()),
        );

        Ok(Self {
            handle: std::cell::RefCell::new(handle),
            file_size,
            state_index_start,
            state_index,
            block_index,
        })
    }

    /// Decompresses and returns the raw (still SSZ-encoded) bytes of the block at `slot`, or
    /// `None` if no block index exists in this file (an empty era) or the file has no block
    /// index record at all.
    pub fn read_block(&self, slot: u64) -> Result<Option<Vec<u8>>, Error> {
        let Some((index_start, index)) = &self.block_index else {
            return Ok(None);
        };

        if slot < index.start_slot {
            return Ok(None);
        }

        let entry = (slot - index.start_slot) as usize;

        if entry >= index.offsets.len() {
            return Ok(None);
        }

        if index.offsets[entry] == 0 {
            return Err(Error::NoBlockAtSlot(slot));
        }

        let position = index.absolute_position(*index_start, entry);
        let bytes = self.read_record_at(position, SNAPPY_BEACON_BLOCK)?;

        Ok(Some(compress::decompress(&bytes)?))
    }

    /// Every block position this file's block index enumerates, in slot order (spec.md §8
    /// scenario 5: "reader must enumerate all 32 block offsets from the index").
    pub fn block_slots(&self) -> Vec<u64> {
        let Some((_, index)) = &self.block_index else {
            return Vec::new();
        };

        (0..index.offsets.len() as u64)
            .filter(|&i| index.offsets[i as usize] != 0)
            .map(|i| index.start_slot + i)
            .collect()
    }

    pub fn read_state(&self) -> Result<Vec<u8>, Error> {
        let position = self
            .state_index
            .absolute_position(self.state_index_start, 0);
        let bytes = self.read_record_at(position, SNAPPY_BEACON_STATE)?;

        compress::decompress(&bytes).map_err(Error::from)
    }

    fn read_record_at(&self, position: u64, expected_type: u16) -> Result<Vec<u8>, Error> {
        if position > self.file_size {
            return Err(Error::OffsetOutOfRange {
                position,
                size: self.file_size,
            });
        }

        let mut handle = self.handle.borrow_mut();
        handle.seek(SeekFrom::Start(position))?;

        let (header, body) = record::read_record(&mut *handle)?;

        if header.record_type != expected_type {
            return Err(Error::WrongRecordType);
        }

        Ok(body)
    }
}

/// Reads the final record in the file, which must be an `E2Index` (the state index, one entry).
/// Per spec.md §4.7: "seek backward 8 bytes to read `count`", i.e. the index body's final 8
/// bytes (the `count` field) are the last 8 bytes of the file.
fn read_trailing_index<R: Read + Seek>(
    handle: &mut R,
    file_size: u64,
) -> Result<(u64, Index), Error> {
    if file_size < 8 {
        return Err(Error::TooShort);
    }

    handle.seek(SeekFrom::End(-8))?;

    let mut count_bytes = [0_u8; 8];
    handle.read_exact(&mut count_bytes)?;
    let count = u64::from_le_bytes(count_bytes);

    let body_length = 16 + 8 * count;
    let record_length = record::HEADER_LENGTH + body_length;

    if record_length > file_size {
        return Err(Error::CountOutOfRange {
            count,
            max: (file_size / 8).saturating_sub(3),
        });
    }

    let index_start = file_size - record_length;

    handle.seek(SeekFrom::Start(index_start))?;
    let (header, body) = record::read_record(handle)?;

    if header.record_type != E2_INDEX {
        return Err(Error::WrongRecordType);
    }

    let index = Index::decode(&body)?;

    Ok((index_start, index))
}

/// Reads the block index record that (if any blocks were written) immediately precedes the
/// state record, given where the state index starts.
fn read_block_index<R: Read + Seek>(
    handle: &mut R,
    state_index_start: u64,
    file_size: u64,
) -> Result<(u64, Index), Error> {
    // The state record sits right before the state index; walk back over it to find where the
    // state record's header starts, then the block index (if present) sits right before that.
    handle.seek(SeekFrom::Start(0))?;

    let mut cursor = 0_u64;
    let mut block_index_candidate: Option<(u64, record::RecordHeader)> = None;

    while cursor < state_index_start {
        handle.seek(SeekFrom::Start(cursor))?;
        let header = record::RecordHeader::read(handle)?;
        let record_start = cursor;
        cursor += record::HEADER_LENGTH + header.length;

        if header.record_type == E2_INDEX {
            block_index_candidate = Some((record_start, header));
        }

        if cursor > file_size {
            return Err(Error::TooShort);
        }
    }

    let (record_start, header) = block_index_candidate.ok_or(Error::TooShort)?;

    handle.seek(SeekFrom::Start(record_start))?;
    let (read_header, body) = record::read_record(handle)?;
    debug_assert_eq!(read_header.record_type, header.record_type);

    let index = Index::decode(&body)?;
    validate_index(&index, record_start, file_size)?;

    Ok((record_start, index))
}

fn validate_index(index: &Index, index_start: u64, file_size: u64) -> Result<(), Error> {
    let max_count = (file_size / 8).saturating_sub(3);

    if index.offsets.len() as u64 > max_count {
        return Err(Error::CountOutOfRange {
            count: index.offsets.len() as u64,
            max: max_count,
        });
    }

    for (i, &offset) in index.offsets.iter().enumerate() {
        if offset == 0 {
            continue;
        }

        let position = index.absolute_position(index_start, i);

        if position > file_size {
            return Err(Error::OffsetOutOfRange {
                position,
                size: file_size,
            });
        }
    }

    Ok(())
}
