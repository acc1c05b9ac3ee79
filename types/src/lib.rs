//! The beacon data model (spec.md §3): validators, attestations, per-fork block/state variants,
//! and the tagged unions over them. Pure data plus the handful of methods (`is_active`, `phase`,
//! accessors on the forked wrappers) that belong to the type regardless of which crate consumes
//! it; the state-transition algorithms themselves live in `transition_functions`.

pub mod altair;
pub mod beacon_state;
pub mod bellatrix;
pub mod block_body;
pub mod combined;
pub mod config;
pub mod nonstandard;
pub mod phase0;
pub mod preset;
pub mod primitives;

pub use beacon_state::{BeaconState, PostAltairBeaconState};
pub use block_body::{BlockBody, HasExecutionPayload, HasSyncAggregate};
pub use combined::{ForkedBeaconState, ForkedSignedBeaconBlock};
pub use config::Config;
pub use nonstandard::Phase;
pub use preset::{Mainnet, Minimal, Preset};
