//! Era archive files (spec.md §4.7): an append-only, length-prefixed, Snappy-framed record
//! format holding one epoch's worth of blocks plus the state at the epoch boundary, closed by a
//! pair of self-describing index records.
//!
//! Layout: `Version | Block_0 .. Block_{n-1} | BlockIndex? | State | StateIndex`. `writer` builds
//! this left to right; `reader` opens a complete file by reading backward from the trailing
//! `count` field.

pub mod compress;
pub mod filename;
pub mod index;
pub mod reader;
pub mod record;
pub mod writer;

pub use filename::{era_filename, historical_root_for_era, shortlog};
pub use reader::EraReader;
pub use writer::EraWriter;

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// spec.md §8 scenario 5: 32 blocks at slots 8192..8223 plus the terminal state at slot
    /// 8224; the reader must enumerate all 32 block offsets from the index and decode the state.
    #[test]
    fn era_file_round_trips_a_full_epoch_of_blocks() {
        let start_slot = 8192_u64;
        let block_count = 32_u64;

        let mut buffer = Cursor::new(Vec::new());
        let mut writer = EraWriter::init(&mut buffer, Some(start_slot)).unwrap();

        for slot in start_slot..start_slot + block_count {
            writer
                .update(slot, format!("ssz-block-{slot}").as_bytes())
                .unwrap();
        }

        let state_slot = start_slot + block_count;
        writer
            .finish(state_slot, b"ssz-terminal-state")
            .unwrap();

        let bytes = buffer.into_inner();
        let reader = EraReader::open(Cursor::new(bytes)).unwrap();

        let slots = reader.block_slots();
        assert_eq!(slots.len(), block_count as usize);
        assert_eq!(slots, (start_slot..start_slot + block_count).collect::<Vec<_>>());

        for slot in start_slot..start_slot + block_count {
            let block = reader.read_block(slot).unwrap().unwrap();
            assert_eq!(block, format!("ssz-block-{slot}").as_bytes());
        }

        assert_eq!(reader.read_state().unwrap(), b"ssz-terminal-state");
    }

    #[test]
    fn era_file_with_no_blocks_still_yields_state() {
        let mut buffer = Cursor::new(Vec::new());
        let writer = EraWriter::init(&mut buffer, Some(100)).unwrap();
        writer.finish(100, b"genesis-state").unwrap();

        let bytes = buffer.into_inner();
        let reader = EraReader::open(Cursor::new(bytes)).unwrap();

        assert!(reader.block_slots().is_empty());
        assert_eq!(reader.read_state().unwrap(), b"genesis-state");
    }

    #[test]
    fn filename_round_trips_through_historical_root_lookup() {
        use ethereum_types::H256;

        let genesis_root = H256::repeat_byte(7);
        let name = era_filename("mainnet", 0, historical_root_for_era(0, genesis_root, &[]));

        assert_eq!(name, format!("mainnet-00000-00001-{}.era", shortlog(genesis_root)));
    }
}
