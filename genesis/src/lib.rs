//! Deposit-based genesis state construction (spec.md §1 SUPPLEMENT): the block processor and
//! the state-transition function need *something* to bootstrap `fork_choice_store::Store` from
//! in tests and local devnets, and this crate builds it. It covers the same ground as
//! `eth2-testnet-genesis`-style tooling in other clients, minus the eth1 deposit-contract
//! event-following and CLI side of it, which stays external per spec.md §1's Non-goals.
//!
//! Deposits fed in here are trusted inputs (interop keys, a devnet operator's deposit list), not
//! events read off a real deposit contract, so [`genesis_state_from_deposits`] applies them
//! directly rather than re-deriving and re-verifying a Merkle proof against a root it is itself
//! computing — see the function's doc comment for why that would be circular. Everything else
//! (validator construction, activation, the eth1 data bookkeeping) runs through
//! `transition_functions::operations::process_deposit`, the same function a live node replays
//! deposits included in a block through.

use std::{fs, path::Path};

use bls::{PublicKeyBytes, SecretKey, SignatureBytes};
use helper_functions::{fork, signing};
use ssz::{Ssz, SszHash as _};
use thiserror::Error;
use types::{
    altair, bellatrix,
    combined::{ForkedBeaconState, ForkedSignedBeaconBlock},
    config::{domains, Config},
    nonstandard::Phase,
    phase0::{self, BeaconBlockHeader, Deposit, DepositData, Eth1Data, Fork, Validator},
    preset::{capacity, Preset},
    primitives::{Epoch, ExecutionBlockHash, Gwei, UnixSeconds, H256},
    BeaconState as _,
};

/// `BLS_WITHDRAWAL_PREFIX` (spec.md §3's withdrawal-credentials convention): a withdrawal
/// credential starting with this byte commits to the SHA-256 of a BLS pubkey rather than an
/// execution-layer address.
const BLS_WITHDRAWAL_PREFIX: u8 = 0x00;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read genesis state file")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ssz(#[from] ssz::ReadError),

    #[error(transparent)]
    Deposit(#[from] transition_functions::Error),

    #[error("{0} deposits are not enough to reach an activating validator set")]
    NoValidators(usize),
}

/// Mirrors `transition_functions::operations::DepositMessage`: the three fields a deposit
/// signature is actually computed over. Kept as its own (private) type here rather than
/// reaching into that crate's private struct, the same way a second, independent signer of
/// deposit data would derive it from the public spec rather than from the other crate's source.
#[derive(Clone, Copy, Debug, Ssz)]
struct DepositMessage {
    pubkey: PublicKeyBytes,
    withdrawal_credentials: H256,
    amount: Gwei,
}

/// Deterministic interop/quick-start deposits (spec.md §1 SUPPLEMENT): validator index `i` gets
/// `SecretKey::from_seed(i.to_le_bytes())`, a withdrawal credential derived from its own pubkey,
/// and the maximum effective balance for `P`. The same scheme every "quick start" devnet
/// generator across clients uses, so independently-started nodes given the same validator count
/// arrive at byte-identical genesis states.
#[must_use]
pub fn quick_start_deposits<P: Preset>(config: &Config, validator_count: u64) -> Vec<DepositData> {
    (0..validator_count)
        .map(|index| {
            let secret_key = SecretKey::from_seed(&index.to_le_bytes());
            let pubkey = secret_key.public_key().to_bytes();

            let mut withdrawal_credentials = hashing::hash(pubkey.as_bytes());
            withdrawal_credentials.0[0] = BLS_WITHDRAWAL_PREFIX;

            let amount = P::MAX_EFFECTIVE_BALANCE;

            let message = DepositMessage {
                pubkey,
                withdrawal_credentials,
                amount,
            };

            let domain = signing::compute_domain(domains::DEPOSIT, config.genesis_fork_version, H256::zero());
            let signing_root = signing::compute_signing_root(message.hash_tree_root(), domain);
            let signature = secret_key.sign(signing_root.as_bytes()).to_bytes();

            DepositData {
                pubkey,
                withdrawal_credentials,
                amount,
                signature,
            }
        })
        .collect()
}

/// Builds the `List[DepositData, 2**DEPOSIT_CONTRACT_TREE_DEPTH]` Merkle tree `eth1_data`'s
/// `deposit_root` commits to, plus a depth-33 proof per deposit (32 levels of the binary tree of
/// deposit-data roots, one more for the length mixin every SSZ list's hash-tree-root ends with —
/// exactly the shape `predicates::is_valid_merkle_branch` checks). `hashing::merkleize_with_cache`
/// fills in missing siblings from `hashing::zero_hashes` rather than padding to the full
/// `2**32`-leaf tree, so this stays cheap for the handful of deposits a devnet or test actually
/// has, despite using the real deposit-contract depth.
fn deposit_tree(deposits: &[DepositData]) -> (H256, Vec<[H256; phase0::consts::DEPOSIT_CONTRACT_TREE_DEPTH + 1]>) {
    let depth = phase0::consts::DEPOSIT_CONTRACT_TREE_DEPTH;
    let zeros = hashing::zero_hashes(depth);

    let leaves = deposits.iter().map(|data| data.hash_tree_root()).collect::<Vec<_>>();
    let levels = hashing::merkleize_with_cache(&leaves, depth);

    let root = levels[depth][0];
    let deposit_root = hashing::mix_in_length(root, deposits.len());
    let length_chunk = hashing::length_mixin_chunk(deposits.len());

    let proofs = (0..deposits.len())
        .map(|index| {
            let mut branch = [H256::zero(); phase0::consts::DEPOSIT_CONTRACT_TREE_DEPTH + 1];

            for (level, sibling) in branch.iter_mut().take(depth).enumerate() {
                let sibling_index = (index >> level) ^ 1;
                *sibling = levels[level].get(sibling_index).copied().unwrap_or(zeros[level]);
            }

            branch[depth] = length_chunk;
            branch
        })
        .collect();

    (deposit_root, proofs)
}

/// `initialize_beacon_state_from_eth1` (spec.md §1 SUPPLEMENT): folds `deposits` into a fresh
/// Phase0 state one at a time through the real deposit-processing path, activates every
/// validator that reached `P::MAX_EFFECTIVE_BALANCE`, stamps `genesis_validators_root`, and
/// upgrades the result to whichever fork `config` says is already active at the genesis epoch.
///
/// The Merkle proof `process_deposit` checks every deposit against is built from `deposits`
/// itself via [`deposit_tree`] — genesis has no independent eth1 log to check the list against,
/// so the proof only guards against a bug in this function, not against a dishonest input.
pub fn genesis_state_from_deposits<P: Preset>(
    config: &Config,
    genesis_time: UnixSeconds,
    eth1_block_hash: ExecutionBlockHash,
    deposits: &[DepositData],
) -> Result<ForkedBeaconState, Error> {
    let (deposit_root, proofs) = deposit_tree(deposits);

    let mut state = phase0::BeaconState {
        genesis_time,
        fork: Fork {
            previous_version: config.genesis_fork_version,
            current_version: config.genesis_fork_version,
            epoch: phase0::consts::GENESIS_EPOCH,
        },
        eth1_data: Eth1Data {
            deposit_root,
            deposit_count: deposits.len() as u64,
            block_hash: eth1_block_hash,
        },
        latest_block_header: BeaconBlockHeader {
            body_root: phase0::BeaconBlockBody::default().hash_tree_root(),
            ..BeaconBlockHeader::default()
        },
        randao_mixes: ssz::Cached::new(
            ssz::Vector::try_from_iter(
                std::iter::repeat(eth1_block_hash).take(capacity::EPOCHS_PER_HISTORICAL_VECTOR),
            )
            .expect("EPOCHS_PER_HISTORICAL_VECTOR zero-filled entries fit the vector"),
        ),
        ..phase0::BeaconState::default()
    };

    for (data, proof) in deposits.iter().zip(proofs) {
        let deposit = Deposit {
            proof,
            data: *data,
        };

        transition_functions::operations::process_deposit::<P>(config, &mut state, &deposit)?;
    }

    activate_genesis_validators::<P>(&mut state);

    state.genesis_validators_root = state.validators.hash_tree_root();

    let forked = ForkedBeaconState::Phase0(state);

    Ok(upgrade_to_configured_fork::<P>(config, forked))
}

/// `get_initial_active_index_roots`-adjacent genesis activation step (spec.md §1 SUPPLEMENT):
/// every validator that deposited the maximum effective balance is activated at genesis rather
/// than waiting out the normal churn-limited activation queue, which only applies post-genesis.
fn activate_genesis_validators<P: Preset>(state: &mut phase0::BeaconState) {
    for validator in state.validators.get_mut().iter_mut() {
        if validator.effective_balance == P::MAX_EFFECTIVE_BALANCE {
            validator.activation_eligibility_epoch = phase0::consts::GENESIS_EPOCH;
            validator.activation_epoch = phase0::consts::GENESIS_EPOCH;
        }
    }
}

/// Applies `upgrade_to_altair`/`upgrade_to_bellatrix` when `config`'s fork epochs are already at
/// (or before) genesis, so a devnet configured with `Config::minimal()`-style all-forks-active
/// settings gets a state in the right variant straight away instead of one that only becomes
/// valid once slot processing runs the upgrade at the fork boundary.
fn upgrade_to_configured_fork<P: Preset>(config: &Config, state: ForkedBeaconState) -> ForkedBeaconState {
    let ForkedBeaconState::Phase0(phase0_state) = state else {
        return state;
    };

    if config.altair_fork_epoch != phase0::consts::GENESIS_EPOCH {
        return ForkedBeaconState::Phase0(phase0_state);
    }

    let altair_state = fork::upgrade_to_altair::<P>(config, phase0_state);

    if config.bellatrix_fork_epoch != phase0::consts::GENESIS_EPOCH {
        return ForkedBeaconState::Altair(altair_state);
    }

    ForkedBeaconState::Bellatrix(fork::upgrade_to_bellatrix::<P>(config, altair_state))
}

/// Counts validators active at the genesis epoch, for [`is_valid_genesis_state`].
fn active_validator_count(state: &ForkedBeaconState) -> usize {
    let genesis_epoch = phase0::consts::GENESIS_EPOCH;

    state
        .validators()
        .get()
        .iter()
        .filter(|validator: &&Validator| validator.is_active(genesis_epoch))
        .count()
}

/// `is_valid_genesis_state` (spec.md §1 SUPPLEMENT): both the wall-clock floor and the minimum
/// active-validator-set-size floor from `Config` must hold, per the real genesis-trigger
/// condition an eth1-follow genesis watcher (out of scope here) would otherwise evaluate.
#[must_use]
pub fn is_valid_genesis_state(config: &Config, state: &ForkedBeaconState) -> bool {
    state.genesis_time() >= config.min_genesis_time
        && active_validator_count(state) as u64 >= config.min_genesis_active_validator_count
}

/// Loads a previously-serialized genesis state (spec.md §1 SUPPLEMENT: "an SSZ-file loader"),
/// the same `ForkedBeaconState::from_ssz` entrypoint the era archive reader and database layer
/// use to deserialize any other persisted state.
pub fn load_genesis_state_from_ssz_file(phase: Phase, path: impl AsRef<Path>) -> Result<ForkedBeaconState, Error> {
    let bytes = fs::read(path)?;
    Ok(ForkedBeaconState::from_ssz(phase, &bytes)?)
}

/// Builds the synthetic anchor block `fork_choice_store::Store::new` pins the DAG's root to: an
/// empty-bodied block whose `state_root` is `state`'s own root and whose other header fields
/// come straight from `state.latest_block_header` (left zeroed at genesis by construction). Its
/// `message_hash_tree_root` is therefore guaranteed to equal `state.latest_block_header`'s root
/// once `state_root` is filled in, the same invariant a post-genesis block's header would satisfy
/// against its own parent state.
#[must_use]
pub fn anchor_block_for_state(state: &ForkedBeaconState) -> ForkedSignedBeaconBlock {
    let header = state.latest_block_header();
    let slot = header.slot;
    let proposer_index = header.proposer_index;
    let parent_root = header.parent_root;
    let state_root = state.hash_tree_root();

    match state {
        ForkedBeaconState::Phase0(_) => ForkedSignedBeaconBlock::Phase0(phase0::SignedBeaconBlock {
            message: phase0::BeaconBlock {
                slot,
                proposer_index,
                parent_root,
                state_root,
                body: phase0::BeaconBlockBody::default(),
            },
            signature: SignatureBytes::default(),
        }),
        ForkedBeaconState::Altair(_) => ForkedSignedBeaconBlock::Altair(altair::SignedBeaconBlock {
            message: altair::BeaconBlock {
                slot,
                proposer_index,
                parent_root,
                state_root,
                body: altair::BeaconBlockBody::default(),
            },
            signature: SignatureBytes::default(),
        }),
        ForkedBeaconState::Bellatrix(_) => ForkedSignedBeaconBlock::Bellatrix(bellatrix::SignedBeaconBlock {
            message: bellatrix::BeaconBlock {
                slot,
                proposer_index,
                parent_root,
                state_root,
                body: bellatrix::BeaconBlockBody::default(),
            },
            signature: SignatureBytes::default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn quick_start_deposits_are_deterministic() {
        let config = Config::minimal();

        let first = quick_start_deposits::<Minimal>(&config, 4);
        let second = quick_start_deposits::<Minimal>(&config, 4);

        assert_eq!(first, second);
    }

    #[test]
    fn quick_start_deposits_have_distinct_pubkeys() {
        let config = Config::minimal();
        let deposits = quick_start_deposits::<Minimal>(&config, 8);

        let mut pubkeys = deposits.iter().map(|deposit| deposit.pubkey).collect::<Vec<_>>();
        pubkeys.sort_by_key(PublicKeyBytes::as_bytes);
        pubkeys.dedup();

        assert_eq!(pubkeys.len(), 8);
    }

    #[test]
    fn genesis_state_activates_every_funded_validator() {
        let config = Config::minimal();
        let deposits = quick_start_deposits::<Minimal>(&config, 8);

        let state = genesis_state_from_deposits::<Minimal>(&config, 1_600_000_000, H256::zero(), &deposits)
            .expect("deposits are well-formed");

        assert_eq!(state.validator_count(), 8);
        assert!(active_validator_count(&state) as u64 == 8);
    }

    #[test]
    fn genesis_state_upgrades_to_the_configured_fork() {
        let config = Config::minimal();
        let deposits = quick_start_deposits::<Minimal>(&config, 4);

        let state = genesis_state_from_deposits::<Minimal>(&config, 0, H256::zero(), &deposits)
            .expect("deposits are well-formed");

        assert_eq!(state.phase(), Phase::Bellatrix);
    }

    #[test]
    fn anchor_block_hash_tree_root_matches_state_latest_block_header() {
        let config = Config::minimal();
        let deposits = quick_start_deposits::<Minimal>(&config, 4);

        let state = genesis_state_from_deposits::<Minimal>(&config, 0, H256::zero(), &deposits)
            .expect("deposits are well-formed");

        let anchor = anchor_block_for_state(&state);
        let mut expected_header = *state.latest_block_header();
        expected_header.state_root = state.hash_tree_root();

        assert_eq!(anchor.message_hash_tree_root(), expected_header.hash_tree_root());
    }

    #[test]
    fn is_valid_genesis_state_respects_validator_count_floor() {
        let mut config = Config::minimal();
        config.min_genesis_active_validator_count = 100;

        let deposits = quick_start_deposits::<Minimal>(&config, 4);
        let state = genesis_state_from_deposits::<Minimal>(&config, 0, H256::zero(), &deposits)
            .expect("deposits are well-formed");

        assert!(!is_valid_genesis_state(&config, &state));
    }
}
