//! Era filenames (spec.md §4.7): `"<network>-<era:05>-<1:05>-<shortlog(historical_root)>.era"`.
//! The historical root named in the filename is `genesis_validators_root` for era 0,
//! `state.historical_roots[era-1]` for eras within range, else the zero digest.

use ethereum_types::H256;

/// Every era file covers exactly one era, so the `<1:05>` field is always `"00001"`.
const ERA_COUNT_FIELD: &str = "00001";

#[must_use]
pub fn era_filename(network: &str, era: u64, historical_root: H256) -> String {
    format!(
        "{network}-{era:05}-{ERA_COUNT_FIELD}-{}.era",
        shortlog(historical_root),
    )
}

/// The first 4 bytes of a digest, lowercase hex, as used in filenames and fork-digest logging
/// throughout the workspace.
#[must_use]
pub fn shortlog(root: H256) -> String {
    hex::encode(&root.as_bytes()[..4])
}

/// `historical_root` to embed in the filename for `era`, given the resolved slice of
/// `state.historical_roots` (spec.md §4.7).
#[must_use]
pub fn historical_root_for_era(
    era: u64,
    genesis_validators_root: H256,
    historical_roots: &[H256],
) -> H256 {
    if era == 0 {
        return genesis_validators_root;
    }

    historical_roots
        .get((era - 1) as usize)
        .copied()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_has_five_digit_era_and_fixed_count_field() {
        let name = era_filename("mainnet", 42, H256::repeat_byte(0xab));
        assert_eq!(name, "mainnet-00042-00001-abababab.era");
    }

    #[test]
    fn era_zero_uses_genesis_validators_root() {
        let genesis_root = H256::repeat_byte(1);
        let historical_roots = [H256::repeat_byte(2)];

        assert_eq!(
            historical_root_for_era(0, genesis_root, &historical_roots),
            genesis_root,
        );
    }

    #[test]
    fn era_within_range_uses_historical_roots_entry() {
        let genesis_root = H256::repeat_byte(1);
        let historical_roots = [H256::repeat_byte(2), H256::repeat_byte(3)];

        assert_eq!(
            historical_root_for_era(2, genesis_root, &historical_roots),
            H256::repeat_byte(3),
        );
    }

    #[test]
    fn era_beyond_range_is_zero() {
        let genesis_root = H256::repeat_byte(1);

        assert_eq!(
            historical_root_for_era(5, genesis_root, &[]),
            H256::zero(),
        );
    }
}
