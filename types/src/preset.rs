//! Frozen numeric constants that parameterize the state-transition algorithms (spec.md §2).
//!
//! Unlike the teacher's `typenum`-driven `Preset`, these associated consts never flow into a
//! container's compile-time length bound (`DESIGN.md` explains why: doing so on stable Rust
//! without `generic_const_exprs` isn't possible for a type generic over `P`). Every SSZ
//! container in this crate uses the real mainnet capacity as a fixed literal regardless of which
//! `Preset` is active; `Preset` instead governs the *behavioral* constants actually used in
//! loops and arithmetic (committee sizing, epoch lengths, reward quotients), which is all a
//! frozen-at-startup preset needs to vary for our purposes. `Minimal` exists for fast unit tests
//! that exercise slot/epoch arithmetic and shuffling without needing a full mainnet-sized state.

use core::fmt::Debug;

/// Marker trait implemented by `Mainnet` and `Minimal`. `BeaconState<P>`/`BeaconBlock<P>` carry
/// `P` as a `PhantomData` tag so that generic transition-function code
/// (`fn process_epoch<P: Preset>(...)`) reads the same as the teacher's, even though container
/// byte layout no longer depends on it.
pub trait Preset: Clone + Copy + Debug + Default + PartialEq + Eq + Send + Sync + 'static {
    const MAX_EFFECTIVE_BALANCE: u64;
    const EFFECTIVE_BALANCE_INCREMENT: u64;
    const HYSTERESIS_QUOTIENT: u64 = 4;
    const HYSTERESIS_DOWNWARD_MULTIPLIER: u64 = 1;
    const HYSTERESIS_UPWARD_MULTIPLIER: u64 = 5;
    const MIN_PER_EPOCH_CHURN_LIMIT: u64 = 4;
    const CHURN_LIMIT_QUOTIENT: u64 = 65536;
    const SLOTS_PER_EPOCH: u64;
    const SLOTS_PER_HISTORICAL_ROOT: u64;
    const EPOCHS_PER_HISTORICAL_VECTOR: u64;
    const EPOCHS_PER_SLASHINGS_VECTOR: u64;
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: u64;
    const MIN_ATTESTATION_INCLUSION_DELAY: u64;
    const MIN_SEED_LOOKAHEAD: u64;
    const MAX_SEED_LOOKAHEAD: u64;
    const MIN_EPOCHS_TO_INACTIVITY_PENALTY: u64;
    const MIN_VALIDATOR_WITHDRAWABILITY_DELAY: u64;
    const SHARD_COMMITTEE_PERIOD: u64;
    const SHUFFLE_ROUND_COUNT: u8;
    const TARGET_COMMITTEE_SIZE: u64;
    const MAX_COMMITTEES_PER_SLOT: u64;
    const MAX_VALIDATORS_PER_COMMITTEE: u64;
    const SYNC_COMMITTEE_SIZE: u64;
    const EJECTION_BALANCE: u64;
    const MIN_SLASHING_PENALTY_QUOTIENT: u64;
    const MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX: u64;
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64;
    const PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX: u64;
    const INACTIVITY_PENALTY_QUOTIENT: u64;
    const INACTIVITY_PENALTY_QUOTIENT_ALTAIR: u64;
    const INACTIVITY_SCORE_BIAS: u64;
    const INACTIVITY_SCORE_RECOVERY_RATE: u64;
    const BASE_REWARD_FACTOR: u64;
    const BASE_REWARDS_PER_EPOCH: u64 = 4;
    const WHISTLEBLOWER_REWARD_QUOTIENT: u64;
    const PROPOSER_WEIGHT: u64 = 8;
    const WEIGHT_DENOMINATOR: u64 = 64;
    const TIMELY_SOURCE_WEIGHT: u64 = 14;
    const TIMELY_TARGET_WEIGHT: u64 = 26;
    const TIMELY_HEAD_WEIGHT: u64 = 14;
    const SYNC_REWARD_WEIGHT: u64 = 2;

    const NAME: &'static str;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mainnet;

impl Preset for Mainnet {
    const MAX_EFFECTIVE_BALANCE: u64 = 32_000_000_000;
    const EFFECTIVE_BALANCE_INCREMENT: u64 = 1_000_000_000;
    const SLOTS_PER_EPOCH: u64 = 32;
    const SLOTS_PER_HISTORICAL_ROOT: u64 = 8192;
    const EPOCHS_PER_HISTORICAL_VECTOR: u64 = 65536;
    const EPOCHS_PER_SLASHINGS_VECTOR: u64 = 8192;
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: u64 = 256;
    const MIN_ATTESTATION_INCLUSION_DELAY: u64 = 1;
    const MIN_SEED_LOOKAHEAD: u64 = 1;
    const MAX_SEED_LOOKAHEAD: u64 = 4;
    const MIN_EPOCHS_TO_INACTIVITY_PENALTY: u64 = 4;
    const MIN_VALIDATOR_WITHDRAWABILITY_DELAY: u64 = 256;
    const SHARD_COMMITTEE_PERIOD: u64 = 256;
    const SHUFFLE_ROUND_COUNT: u8 = 90;
    const TARGET_COMMITTEE_SIZE: u64 = 128;
    const MAX_COMMITTEES_PER_SLOT: u64 = 64;
    const MAX_VALIDATORS_PER_COMMITTEE: u64 = 2048;
    const SYNC_COMMITTEE_SIZE: u64 = 512;
    const EJECTION_BALANCE: u64 = 16_000_000_000;
    const MIN_SLASHING_PENALTY_QUOTIENT: u64 = 128;
    const MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX: u64 = 32;
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 1;
    const PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX: u64 = 3;
    const INACTIVITY_PENALTY_QUOTIENT: u64 = 67_108_864;
    const INACTIVITY_PENALTY_QUOTIENT_ALTAIR: u64 = 50_331_648;
    const INACTIVITY_SCORE_BIAS: u64 = 4;
    const INACTIVITY_SCORE_RECOVERY_RATE: u64 = 16;
    const BASE_REWARD_FACTOR: u64 = 64;
    const WHISTLEBLOWER_REWARD_QUOTIENT: u64 = 512;

    const NAME: &'static str = "mainnet";
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Minimal;

impl Preset for Minimal {
    const MAX_EFFECTIVE_BALANCE: u64 = 32_000_000_000;
    const EFFECTIVE_BALANCE_INCREMENT: u64 = 1_000_000_000;
    const SLOTS_PER_EPOCH: u64 = 8;
    const SLOTS_PER_HISTORICAL_ROOT: u64 = 64;
    const EPOCHS_PER_HISTORICAL_VECTOR: u64 = 64;
    const EPOCHS_PER_SLASHINGS_VECTOR: u64 = 64;
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: u64 = 8;
    const MIN_ATTESTATION_INCLUSION_DELAY: u64 = 1;
    const MIN_SEED_LOOKAHEAD: u64 = 1;
    const MAX_SEED_LOOKAHEAD: u64 = 4;
    const MIN_EPOCHS_TO_INACTIVITY_PENALTY: u64 = 4;
    const MIN_VALIDATOR_WITHDRAWABILITY_DELAY: u64 = 256;
    const SHARD_COMMITTEE_PERIOD: u64 = 64;
    const SHUFFLE_ROUND_COUNT: u8 = 10;
    const TARGET_COMMITTEE_SIZE: u64 = 4;
    const MAX_COMMITTEES_PER_SLOT: u64 = 4;
    const MAX_VALIDATORS_PER_COMMITTEE: u64 = 2048;
    const SYNC_COMMITTEE_SIZE: u64 = 32;
    const EJECTION_BALANCE: u64 = 16_000_000_000;
    const MIN_SLASHING_PENALTY_QUOTIENT: u64 = 128;
    const MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX: u64 = 32;
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 1;
    const PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX: u64 = 3;
    const INACTIVITY_PENALTY_QUOTIENT: u64 = 33_554_432;
    const INACTIVITY_PENALTY_QUOTIENT_ALTAIR: u64 = 50_331_648;
    const INACTIVITY_SCORE_BIAS: u64 = 4;
    const INACTIVITY_SCORE_RECOVERY_RATE: u64 = 16;
    const BASE_REWARD_FACTOR: u64 = 64;
    const WHISTLEBLOWER_REWARD_QUOTIENT: u64 = 512;

    const NAME: &'static str = "minimal";
}

/// Capacity literals for the SSZ containers. Always mainnet-sized regardless of `Preset` (see
/// the module doc comment); the active `Preset` only ever narrows how many of the slots a
/// genesis state actually fills in.
pub mod capacity {
    pub const VALIDATOR_REGISTRY_LIMIT: usize = 1 << 30;
    pub const HISTORICAL_ROOTS_LIMIT: usize = 1 << 24;
    pub const SLOTS_PER_HISTORICAL_ROOT: usize = 8192;
    pub const EPOCHS_PER_HISTORICAL_VECTOR: usize = 65536;
    pub const EPOCHS_PER_SLASHINGS_VECTOR: usize = 8192;
    pub const MAX_VALIDATORS_PER_COMMITTEE: usize = 2048;
    pub const SYNC_COMMITTEE_SIZE: usize = 512;
    pub const MAX_PROPOSER_SLASHINGS: usize = 16;
    pub const MAX_ATTESTER_SLASHINGS: usize = 2;
    pub const MAX_ATTESTATIONS: usize = 128;
    pub const MAX_DEPOSITS: usize = 16;
    pub const MAX_VOLUNTARY_EXITS: usize = 16;
    pub const ETH1_DATA_VOTES_LENGTH: usize = 64 * 32; // EPOCHS_PER_ETH1_VOTING_PERIOD * SLOTS_PER_EPOCH
    pub const BYTES_PER_LOGS_BLOOM: usize = 256;
    pub const MAX_EXTRA_DATA_BYTES: usize = 32;
    pub const MAX_BYTES_PER_TRANSACTION: usize = 1 << 30;
    pub const MAX_TRANSACTIONS_PER_PAYLOAD: usize = 1 << 20;
    pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = 32;
}
