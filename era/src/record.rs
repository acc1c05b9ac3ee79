//! The record header and type tags spec.md §4.7 defines (`E2Version`, `SnappyBeaconBlock`,
//! `SnappyBeaconState`, `E2Index`). An era file is a flat concatenation of these records; this
//! module knows only how to frame one at a time, not how they compose into a whole file (that's
//! `reader`/`writer`).

use std::io::{self, Read, Write};

use thiserror::Error;

pub const HEADER_LENGTH: u64 = 8;

/// `E2Version` = `0x6532` ("e2" read little-endian), length 0: the file marker record.
pub const E2_VERSION: u16 = 0x6532;
/// `SnappyBeaconBlock` = `0x0100`: a Snappy-framed SSZ-encoded signed block.
pub const SNAPPY_BEACON_BLOCK: u16 = 0x0100;
/// `SnappyBeaconState` = `0x0200`: a Snappy-framed SSZ-encoded beacon state.
pub const SNAPPY_BEACON_STATE: u16 = 0x0200;
/// `E2Index` = `0x6932` ("i2" read little-endian): an index record.
pub const E2_INDEX: u16 = 0x6932;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u16,
    pub length: u64,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("era record I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("era record length {length} does not fit the 6-byte length field")]
    LengthTooLarge { length: u64 },
    #[error("era record declares length {declared} but body has {actual} bytes")]
    LengthMismatch { declared: u64, actual: usize },
    #[error("unrecognized era record type {0:#06x}")]
    UnknownType(u16),
}

/// The whole 6-byte length field is little-endian but only 48 bits wide (spec.md §4.7's "6-byte
/// little-endian length"); the top two bytes of any `u64` passed in must be zero.
const MAX_LENGTH: u64 = (1 << 48) - 1;

impl RecordHeader {
    pub fn write(self, out: &mut impl Write) -> Result<(), Error> {
        if self.length > MAX_LENGTH {
            return Err(Error::LengthTooLarge {
                length: self.length,
            });
        }

        let mut bytes = [0_u8; 8];
        bytes[..2].copy_from_slice(&self.record_type.to_le_bytes());
        bytes[2..].copy_from_slice(&self.length.to_le_bytes()[..6]);

        out.write_all(&bytes)?;

        Ok(())
    }

    pub fn read(input: &mut impl Read) -> Result<Self, Error> {
        let mut bytes = [0_u8; 8];
        input.read_exact(&mut bytes)?;

        let record_type = u16::from_le_bytes([bytes[0], bytes[1]]);

        let mut length_bytes = [0_u8; 8];
        length_bytes[..6].copy_from_slice(&bytes[2..]);
        let length = u64::from_le_bytes(length_bytes);

        Ok(Self {
            record_type,
            length,
        })
    }
}

/// Writes a complete record (header + body) and returns the number of bytes written.
pub fn write_record(out: &mut impl Write, record_type: u16, body: &[u8]) -> Result<u64, Error> {
    RecordHeader {
        record_type,
        length: body.len() as u64,
    }
    .write(out)?;

    out.write_all(body)?;

    Ok(HEADER_LENGTH + body.len() as u64)
}

/// Reads one complete record (header + body) from the front of `input`.
pub fn read_record(input: &mut impl Read) -> Result<(RecordHeader, Vec<u8>), Error> {
    let header = RecordHeader::read(input)?;

    let mut body = vec![0_u8; header.length as usize];
    input.read_exact(&mut body)?;

    Ok((header, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips() {
        let mut buffer = Vec::new();
        write_record(&mut buffer, SNAPPY_BEACON_BLOCK, b"hello").unwrap();

        let mut cursor = io::Cursor::new(buffer);
        let (header, body) = read_record(&mut cursor).unwrap();

        assert_eq!(header.record_type, SNAPPY_BEACON_BLOCK);
        assert_eq!(header.length, 5);
        assert_eq!(body, b"hello");
    }

    #[test]
    fn header_length_field_is_six_bytes_little_endian() {
        let mut buffer = Vec::new();
        RecordHeader {
            record_type: E2_INDEX,
            length: 0x01_0203_0405,
        }
        .write(&mut buffer)
        .unwrap();

        assert_eq!(buffer, [0x32, 0x69, 0x05, 0x04, 0x03, 0x02, 0x01, 0x00]);
    }
}
