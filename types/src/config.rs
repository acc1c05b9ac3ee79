//! `RuntimeConfig` (spec.md §2): the frozen, network-specific values layered on top of a
//! `Preset` — fork epochs/versions, timing parameters, and the handful of knobs that differ
//! between mainnet, a testnet, and a local devnet using the same preset.

use crate::primitives::{Epoch, UnixSeconds, Version};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub genesis_fork_version: Version,
    pub genesis_delay: UnixSeconds,
    pub seconds_per_slot: UnixSeconds,

    pub altair_fork_version: Version,
    pub altair_fork_epoch: Epoch,

    pub bellatrix_fork_version: Version,
    pub bellatrix_fork_epoch: Epoch,

    /// Not a real `TERMINAL_TOTAL_DIFFICULTY`; kept as a marker so Bellatrix-pre-merge local
    /// devnets can be told apart from post-merge mainnet, per the Open Question in spec.md §9
    /// about default/empty execution payloads before the merge.
    pub terminal_total_difficulty_reached_at_genesis: bool,

    pub min_genesis_active_validator_count: u64,
    pub min_genesis_time: UnixSeconds,

    pub proposer_score_boost: u64,
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            genesis_fork_version: [0, 0, 0, 0],
            genesis_delay: 604_800,
            seconds_per_slot: 12,
            altair_fork_version: [1, 0, 0, 0],
            altair_fork_epoch: Epoch::new(74_240),
            bellatrix_fork_version: [2, 0, 0, 0],
            bellatrix_fork_epoch: Epoch::new(144_896),
            terminal_total_difficulty_reached_at_genesis: false,
            min_genesis_active_validator_count: 16_384,
            min_genesis_time: 1_606_824_000,
            proposer_score_boost: 40,
        }
    }

    /// A config suitable for tests and local devnets: forks are active from genesis so tests do
    /// not need to run hundreds of thousands of slots to reach Bellatrix.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            genesis_fork_version: [0, 0, 0, 1],
            genesis_delay: 0,
            seconds_per_slot: 6,
            altair_fork_version: [1, 0, 0, 1],
            altair_fork_epoch: Epoch::new(0),
            bellatrix_fork_version: [2, 0, 0, 1],
            bellatrix_fork_epoch: Epoch::new(0),
            terminal_total_difficulty_reached_at_genesis: true,
            min_genesis_active_validator_count: 4,
            min_genesis_time: 0,
            proposer_score_boost: 40,
        }
    }
}

/// Domain constants (4-byte little-padded tags), per spec.md §6.
pub mod domains {
    use crate::primitives::DomainType;

    pub const BEACON_PROPOSER: DomainType = [0x00, 0x00, 0x00, 0x00];
    pub const BEACON_ATTESTER: DomainType = [0x01, 0x00, 0x00, 0x00];
    pub const RANDAO: DomainType = [0x02, 0x00, 0x00, 0x00];
    pub const DEPOSIT: DomainType = [0x03, 0x00, 0x00, 0x00];
    pub const VOLUNTARY_EXIT: DomainType = [0x04, 0x00, 0x00, 0x00];
    pub const SELECTION_PROOF: DomainType = [0x05, 0x00, 0x00, 0x00];
    pub const AGGREGATE_AND_PROOF: DomainType = [0x06, 0x00, 0x00, 0x00];
    pub const SYNC_COMMITTEE: DomainType = [0x07, 0x00, 0x00, 0x00];
    pub const SYNC_COMMITTEE_SELECTION_PROOF: DomainType = [0x08, 0x00, 0x00, 0x00];
    pub const CONTRIBUTION_AND_PROOF: DomainType = [0x09, 0x00, 0x00, 0x00];
}
