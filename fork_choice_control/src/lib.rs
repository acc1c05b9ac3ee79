//! The block processor (spec.md §2, §4.3, §4.4, §4.5, §6): wires the DAG/fork-choice store
//! (`fork_choice_store`), the quarantine, the state-transition driver, and the execution-engine
//! client into the single-consumer consensus loop spec.md §5 describes. Everything a network
//! layer, validator-duties system, or test harness needs from this core is named by the traits
//! in [`attestation_pool`] and [`validator_monitor`]; the concrete wiring lives in
//! [`consensus_manager`].

pub mod attestation_pool;
pub mod block_processor;
pub mod consensus_manager;
pub mod quarantine;
pub mod validator_monitor;

pub use attestation_pool::{AttestationPool, BlockProducer};
pub use block_processor::{BlockProcessor, TimingMetrics};
pub use consensus_manager::{
    BlockEntry, BlockOrigin, BlockQueue, ConsensusManager, LatestMessageWeights, ProcessingOutcome,
};
pub use quarantine::{Quarantine, DEFAULT_ORPHAN_CAPACITY};
pub use validator_monitor::{NullValidatorMonitor, ValidatorMonitor};
