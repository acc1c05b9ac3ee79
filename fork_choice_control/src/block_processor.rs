//! Runs the state-transition function on a block's behalf and times every call into the DAG
//! (spec.md §4.3), grounded on the reference `BlockProcessor<P>`'s timing-wrapped
//! `process_*_block_with_report` methods, adapted to this workspace's scratch-copy
//! `transition_functions::state_transition` entrypoint (§9: no rollback-callback plumbing) in
//! place of the reference's mutable-state-plus-rollback contract.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use helper_functions::verifier::Verifier;
use parking_lot::Mutex;
use std_ext::ArcExt as _;
use transition_functions::BlockProcessingFlags;
use types::{
    combined::{ForkedBeaconState, ForkedSignedBeaconBlock},
    config::Config,
    preset::Preset,
};

use fork_choice_store::{BlockAction, ChainLink, Error, StateCacheProcessor, Store};

/// How many recent samples [`TimingMetrics`] keeps before evicting the oldest (teacher: a fixed
/// rolling window rather than an unbounded history, so long-running nodes don't grow this
/// forever).
const TIMING_WINDOW: usize = 64;

/// A rolling window of recent durations for one named operation (teacher: `TimingMetrics`).
/// Purely observational: nothing in the block processor's own logic reads these back, they only
/// feed `tracing`/logs.
#[derive(Default)]
pub struct TimingMetrics {
    samples: VecDeque<Duration>,
    count: u64,
}

impl TimingMetrics {
    fn update(&mut self, duration: Duration) {
        self.samples.push_back(duration);
        self.count += 1;

        if self.samples.len() > TIMING_WINDOW {
            self.samples.pop_front();
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    #[must_use]
    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().copied().min()
    }

    #[must_use]
    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().copied().max()
    }

    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        let count = u32::try_from(self.samples.len()).unwrap_or(u32::MAX);
        (count > 0).then(|| self.samples.iter().sum::<Duration>() / count)
    }

    #[must_use]
    pub fn median(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<Duration> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        Some(sorted[sorted.len() / 2])
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.samples.iter().sum()
    }
}

impl fmt::Display for TimingMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count: {}, last: {:?}, min: {:?}, max: {:?}, avg: {:?}, median: {:?}",
            self.count,
            self.last().unwrap_or_default(),
            self.min().unwrap_or_default(),
            self.max().unwrap_or_default(),
            self.average().unwrap_or_default(),
            self.median().unwrap_or_default(),
        )
    }
}

/// Drives the state-transition function on the DAG's behalf (spec.md §4.3). Holds no per-block
/// state of its own; `chain_config` and `state_cache` are shared, `Arc`-backed resources so a
/// `BlockProcessor` can be cheaply handed to multiple call sites (the gossip-validation path and
/// the consumer loop both use the same instance in `ConsensusManager`).
pub struct BlockProcessor<P> {
    chain_config: Arc<Config>,
    state_cache: Arc<StateCacheProcessor<P>>,
    metrics: Mutex<HashMap<&'static str, TimingMetrics>>,
}

impl<P: Preset> BlockProcessor<P> {
    #[must_use]
    pub fn new(chain_config: Arc<Config>, state_cache: Arc<StateCacheProcessor<P>>) -> Self {
        Self {
            chain_config,
            state_cache,
            metrics: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, operation: &'static str, elapsed: Duration) {
        self.metrics.lock().entry(operation).or_default().update(elapsed);
        tracing::trace!(operation, ?elapsed, "block processor step");
    }

    /// A one-line-per-operation summary, the way the teacher periodically logs `TimingMetrics`
    /// (`Display` impl above) for every tracked operation.
    #[must_use]
    pub fn metrics_report(&self) -> String {
        self.metrics
            .lock()
            .iter()
            .map(|(name, metrics)| format!("{name} -> {metrics}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// `validate_block_for_gossip` per spec.md §4.3/§6: a read-only check run against the
    /// parent's state with `skip_bls` set, since gossip validation only needs to know "would this
    /// be accepted", and the real proposer/operation signatures are checked again at import time
    /// through [`Self::store_block`].
    pub fn validate_block_for_gossip(
        &self,
        store: &Store<P>,
        block: &ForkedSignedBeaconBlock,
    ) -> Result<Option<BlockAction>, Error> {
        let start = Instant::now();

        let result = store.validate_block_for_gossip(block, |parent| {
            let parent_state = self.ancestor_state(store, parent)?;

            let post_state = self.run_state_transition(
                &parent_state,
                block,
                BlockProcessingFlags {
                    skip_bls: true,
                    skip_state_root: false,
                },
            )?;

            Ok((Arc::new(post_state), None))
        });

        self.record("validate_block_for_gossip", start.elapsed());

        result
    }

    /// `store_block` per spec.md §4.3: verifies the block's proposer signature through
    /// `verifier`, runs the full state-transition function, and lets [`Store::add_head_block`]
    /// insert it and recompute the head. The post-state is memoized per block root
    /// ([`StateCacheProcessor::get_or_insert_with`]) so a block delivered twice — once via gossip,
    /// once via a sync response racing it — doesn't replay the state-transition function twice.
    pub fn store_block(
        &self,
        store: &mut Store<P>,
        verifier: &mut impl Verifier,
        block: Arc<ForkedSignedBeaconBlock>,
    ) -> Result<BlockAction, Error> {
        let start = Instant::now();
        let slot = block.slot();
        let parent_root = block.parent_root();

        // `run` (below) only ever sees `&ChainLink`, not `&Store`, so any rewind across a
        // backfilled ancestor with no cached state has to be resolved here, before the store is
        // mutably borrowed for the insertion itself.
        let fallback_state = store
            .chain_link(parent_root)
            .filter(|parent| parent.state.is_none())
            .and_then(|_| self.state_cache.before_or_at_slot(store, parent_root, slot));

        let state_cache = self.state_cache.clone_arc();
        let chain_config = self.chain_config.clone_arc();
        let block_for_transition = block.clone_arc();

        let result = store.validate_block_with_custom_state_transition(
            block,
            verifier,
            move |block_root, parent| {
                let parent_state = parent
                    .state
                    .clone()
                    .or(fallback_state)
                    .ok_or_else(|| Error::Invalid("no ancestor state available to build on".to_owned()))?;

                state_cache.get_or_insert_with(block_root, slot, true, || {
                    let mut scratch = (*parent_state).clone();

                    transition_functions::state_transition::<P>(
                        &chain_config,
                        &mut scratch,
                        &block_for_transition,
                        BlockProcessingFlags {
                            skip_bls: false,
                            skip_state_root: false,
                        },
                    )?;

                    Ok::<_, Error>((Arc::new(scratch), None))
                })
            },
        );

        self.record("store_block", start.elapsed());

        result
    }

    /// `add_backfill_block` per spec.md §4.3/§6: blocks at or below the finalized slot came from
    /// an already-trusted era archive and never run the state-transition function or affect head
    /// selection.
    pub fn store_backfill_block(&self, store: &mut Store<P>, block: Arc<ForkedSignedBeaconBlock>) {
        let start = Instant::now();
        store.add_backfill_block(block);
        self.record("store_backfill_block", start.elapsed());
    }

    fn ancestor_state(
        &self,
        store: &Store<P>,
        parent: &ChainLink,
    ) -> Result<Arc<ForkedBeaconState>, Error> {
        parent
            .state
            .clone()
            .or_else(|| self.state_cache.before_or_at_slot(store, parent.block_root, parent.slot()))
            .ok_or_else(|| Error::Invalid("no ancestor state available to build on".to_owned()))
    }

    fn run_state_transition(
        &self,
        parent_state: &ForkedBeaconState,
        block: &ForkedSignedBeaconBlock,
        flags: BlockProcessingFlags,
    ) -> Result<ForkedBeaconState, Error> {
        let mut scratch = parent_state.clone();
        transition_functions::state_transition::<P>(&self.chain_config, &mut scratch, block, flags)?;
        Ok(scratch)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::TimingMetrics;

    #[test]
    fn metrics_report_basic_statistics() {
        let mut metrics = TimingMetrics::default();

        metrics.update(Duration::from_millis(10));
        metrics.update(Duration::from_millis(30));
        metrics.update(Duration::from_millis(20));

        assert_eq!(metrics.count(), 3);
        assert_eq!(metrics.min(), Some(Duration::from_millis(10)));
        assert_eq!(metrics.max(), Some(Duration::from_millis(30)));
        assert_eq!(metrics.median(), Some(Duration::from_millis(20)));
        assert_eq!(metrics.last(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn window_evicts_oldest_sample_past_capacity() {
        let mut metrics = TimingMetrics::default();

        for millis in 0..100 {
            metrics.update(Duration::from_millis(millis));
        }

        assert_eq!(metrics.count(), 100);
        assert_eq!(metrics.min(), Some(Duration::from_millis(36)));
    }
}
