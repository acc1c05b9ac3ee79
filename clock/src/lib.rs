//! Wall-clock ↔ slot/epoch mapping (spec.md §2, §4.5, §6).
//!
//! Fork choice's head-update rule and proposer-boost both need "what slot is it right now", and
//! the block processor's optimistic-sync path needs "what time did we start waiting for this
//! payload". Both read off the same monotonic-ish wall clock, parameterized only by
//! `genesis_time` and `seconds_per_slot` (spec.md §3's `Config`/`Preset` split).

use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use types::primitives::{Slot, UnixSeconds};

/// A point in time relative to genesis. Negative-of-genesis ("before genesis started") is
/// represented by `after_genesis = false`; everything else the caller needs (is it slot N yet)
/// is derived from `to_slot`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeaconTime {
    pub after_genesis: bool,
    pub since_genesis: Duration,
}

#[derive(Clone, Copy, Debug)]
pub struct BeaconClock {
    genesis_time: UnixSeconds,
    seconds_per_slot: UnixSeconds,
}

impl BeaconClock {
    #[must_use]
    pub const fn new(genesis_time: UnixSeconds, seconds_per_slot: UnixSeconds) -> Self {
        Self {
            genesis_time,
            seconds_per_slot,
        }
    }

    /// Real wall-clock "now", per spec.md §6 (`to the beacon clock: now() -> BeaconTime`).
    #[must_use]
    pub fn now(&self) -> BeaconTime {
        let unix_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        self.time_at_unix(unix_now)
    }

    #[must_use]
    pub fn time_at_unix(&self, unix_time: Duration) -> BeaconTime {
        let genesis = Duration::from_secs(self.genesis_time);

        match unix_time.checked_sub(genesis) {
            Some(since_genesis) => BeaconTime {
                after_genesis: true,
                since_genesis,
            },
            None => BeaconTime {
                after_genesis: false,
                since_genesis: genesis - unix_time,
            },
        }
    }

    /// `to_slot(time) -> (after_genesis, slot)` per spec.md §6. Before genesis this returns slot
    /// 0 with `after_genesis = false`; callers must check the flag rather than trust the slot
    /// alone.
    #[must_use]
    pub fn to_slot(&self, time: BeaconTime) -> (bool, Slot) {
        if !time.after_genesis {
            return (false, Slot::new(0));
        }

        let slot = time.since_genesis.as_secs() / self.seconds_per_slot;

        (true, Slot::new(slot))
    }

    #[must_use]
    pub fn current_slot(&self) -> Option<Slot> {
        let (after_genesis, slot) = self.to_slot(self.now());
        after_genesis.then_some(slot)
    }

    /// Unix time at which `slot` starts.
    #[must_use]
    pub fn slot_start(&self, slot: Slot) -> UnixSeconds {
        self.genesis_time + slot.get() * self.seconds_per_slot
    }

    /// How far into `slot` the given wall-clock instant is, used by proposer-boost (spec.md
    /// §4.5): the boost only applies to a block seen before `ATTESTATION_DUE` into its slot.
    #[must_use]
    pub fn elapsed_in_slot(&self, slot: Slot, time: BeaconTime) -> Option<Duration> {
        if !time.after_genesis {
            return None;
        }

        let slot_start = Duration::from_secs(self.slot_start(slot));
        time.since_genesis.checked_sub(slot_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_at_genesis_is_zero() {
        let clock = BeaconClock::new(1_000, 12);
        let (after_genesis, slot) = clock.to_slot(clock.time_at_unix(Duration::from_secs(1_000)));

        assert!(after_genesis);
        assert_eq!(slot, Slot::new(0));
    }

    #[test]
    fn slot_advances_with_time() {
        let clock = BeaconClock::new(1_000, 12);
        let (after_genesis, slot) = clock.to_slot(clock.time_at_unix(Duration::from_secs(1_036)));

        assert!(after_genesis);
        assert_eq!(slot, Slot::new(3));
    }

    #[test]
    fn before_genesis_is_flagged() {
        let clock = BeaconClock::new(1_000, 12);
        let (after_genesis, _) = clock.to_slot(clock.time_at_unix(Duration::from_secs(500)));

        assert!(!after_genesis);
    }

    #[test]
    fn slot_start_round_trips() {
        let clock = BeaconClock::new(1_000, 12);
        assert_eq!(clock.slot_start(Slot::new(5)), 1_060);
    }
}
