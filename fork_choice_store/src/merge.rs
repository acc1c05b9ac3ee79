//! `validate_merge_block` (spec.md §4.5's Bellatrix note, §9 Open Question): whether a Bellatrix
//! block that crosses from an empty/default execution payload to a real one may proceed.
//!
//! Real terminal-total-difficulty tracking needs execution-layer block headers this workspace
//! never fetches (out of scope per spec.md §1: only `newPayload`/`forkchoiceUpdated`/`getPayload`
//! are in the execution-engine interface). `DESIGN.md` resolves the Open Question by using
//! `Config::terminal_total_difficulty_reached_at_genesis` as the stand-in: networks that start
//! post-merge (mainnet, any testnet launched after the merge) skip the check entirely; networks
//! that don't treat a still-default payload as "not yet" (`Ignore`, retryable) rather than
//! `Invalid`, since a real execution client may simply not have crossed its own TTD yet.

use types::{combined::ForkedSignedBeaconBlock, config::Config};

use crate::error::PartialBlockAction;

#[must_use]
pub fn validate_merge_block(config: &Config, block: &ForkedSignedBeaconBlock) -> PartialBlockAction {
    if config.terminal_total_difficulty_reached_at_genesis {
        return PartialBlockAction::Accept;
    }

    match block.execution_payload() {
        Some(payload) if payload.is_default() => PartialBlockAction::Ignore,
        _ => PartialBlockAction::Accept,
    }
}

#[cfg(test)]
mod tests {
    use types::bellatrix;

    use super::*;

    #[test]
    fn accepts_when_merge_already_happened_at_genesis() {
        let mut config = Config::minimal();
        config.terminal_total_difficulty_reached_at_genesis = true;

        let block = ForkedSignedBeaconBlock::Bellatrix(bellatrix::SignedBeaconBlock::default());

        assert_eq!(validate_merge_block(&config, &block), PartialBlockAction::Accept);
    }

    #[test]
    fn defers_on_default_payload_before_the_merge() {
        let mut config = Config::minimal();
        config.terminal_total_difficulty_reached_at_genesis = false;

        let block = ForkedSignedBeaconBlock::Bellatrix(bellatrix::SignedBeaconBlock::default());

        assert_eq!(validate_merge_block(&config, &block), PartialBlockAction::Ignore);
    }

    #[test]
    fn accepts_non_default_payload_before_the_merge() {
        let mut config = Config::minimal();
        config.terminal_total_difficulty_reached_at_genesis = false;

        let mut signed_block = bellatrix::SignedBeaconBlock::default();
        signed_block.message.body.execution_payload.gas_limit = 30_000_000;

        let block = ForkedSignedBeaconBlock::Bellatrix(signed_block);

        assert_eq!(validate_merge_block(&config, &block), PartialBlockAction::Accept);
    }
}
