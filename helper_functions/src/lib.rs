//! Stateless and state-reading helpers shared by `transition_functions` and
//! `fork_choice_store` (spec.md §4.2, §4.5): epoch/committee accessors, shuffling,
//! domain/signing-root computation, fork upgrades, and the handful of boolean predicates
//! that gate attestation and deposit validity.

pub mod accessors;
pub mod fork;
pub mod predicates;
pub mod shuffling;
pub mod signing;
pub mod verifier;
