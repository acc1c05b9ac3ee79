//! Snappy framing (spec.md §4.7: "Snappy-framed SSZ-encoded ..."), factored out so the writer
//! and reader share one implementation of the frame format rather than each reaching for a
//! different corner of the `snap` crate's API.

use std::io::{Read, Write};

use snap::{read::FrameDecoder, write::FrameEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("snappy frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = FrameEncoder::new(Vec::new());
    encoder.write_all(bytes)?;
    encoder.into_inner().map_err(|error| error.into_error().into())
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = FrameDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_then_decompress_round_trips() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(4);
        let compressed = compress(&original).unwrap();
        let decompressed = decompress(&compressed).unwrap();

        assert_eq!(decompressed, original);
    }
}
