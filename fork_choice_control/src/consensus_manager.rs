//! The single-consumer block-processing loop (spec.md §4.3, §5, §6): owns the DAG, the
//! quarantine, and the block processor, and is the one place that ever mutates any of them.
//! Producers (gossip, sync, backfill, optimistic-sync notifications) only ever reach this
//! through [`ConsensusManager::add_block`] and the [`BlockQueue`] it enqueues onto; everything
//! downstream of a dequeue — state-transition, head recomputation, quarantine release, execution
//! engine calls — runs on whichever task drives [`ConsensusManager::run_queue_loop`].
//!
//! Grounded on the reference block processor's queue/consumer split, adapted to this workspace's
//! narrower `Store`/`BlockProcessor`/`Quarantine` types (spec.md §9: no rollback-callback
//! plumbing, no p2p or validator-duties wiring).

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use execution_engine::{is_invalid, ExecutionEngine, ForkchoiceState};
use features::Feature;
use helper_functions::{
    accessors,
    verifier::{MultiVerifier, Verifier},
};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use types::{
    combined::ForkedSignedBeaconBlock,
    config::Config,
    phase0::Checkpoint,
    preset::Preset,
    primitives::{Gwei, Slot, ValidatorIndex, H256},
};

use clock::BeaconClock;
use fork_choice_store::{
    validate_merge_block, AttestationWeights, BlockAction, Error as StoreError, PartialBlockAction, Store,
};

use crate::{
    attestation_pool::{AttestationPool, BlockProducer},
    block_processor::BlockProcessor,
    quarantine::Quarantine,
    validator_monitor::ValidatorMonitor,
};

/// spec.md §4.3's "prefer the verified head over the optimistic one once within N slots of it".
/// A round number; real clients tune this, this one just needs a named constant to gate
/// [`Feature::PreferVerifiedHead`] against.
const VERIFIED_HEAD_PREFERENCE_SLOTS: u64 = 256;

/// Where a block came from (spec.md §6), handed back unchanged in [`BlockProducer::notify`] so
/// the network layer can tell which of its own queues to pop from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOrigin {
    Gossip,
    Sync,
    Request,
    OptimisticSync,
}

/// What happened to an enqueued block, delivered exactly once through its `result_sender`
/// (spec.md §8: "every non-null result future resolves exactly once"). `Accepted` is this
/// crate's name for what spec.md §4.3 just calls "Ok".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Accepted,
    Invalid(String),
    MissingParent,
    UnviableFork,
    Duplicate,
    Cancelled,
}

impl From<StoreError> for ProcessingOutcome {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate(_) => Self::Duplicate,
            StoreError::MissingParent { .. } => Self::MissingParent,
            StoreError::UnviableFork { .. } => Self::UnviableFork,
            StoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// One enqueued block plus its producer-supplied bookkeeping (spec.md §4.3: "add
/// block(src, forked_block, result_callback, validation_duration)").
pub struct BlockEntry {
    pub origin: BlockOrigin,
    pub block: Arc<ForkedSignedBeaconBlock>,
    pub result_sender: Option<oneshot::Sender<ProcessingOutcome>>,
    pub validation_duration: Duration,
}

/// The thread-safe side of the pipeline (spec.md §5): producers push from whatever task
/// discovered the block, the consumer drains it one entry at a time. A `Mutex`-guarded
/// `VecDeque` is all this needs — contention is a non-issue since the consumer is the only
/// reader and is cooperatively single-threaded per spec.md §5; the lock exists so [`BlockQueue`]
/// can be handed out as `Arc<dyn BlockProducer>` to code that isn't.
#[derive(Default)]
pub struct BlockQueue {
    entries: Mutex<VecDeque<BlockEntry>>,
    notify: Notify,
}

impl BlockQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, entry: BlockEntry) {
        self.entries.lock().push_back(entry);
        self.notify.notify_one();
    }

    #[must_use]
    pub fn has_blocks(&self) -> bool {
        !self.entries.lock().is_empty()
    }

    fn pop(&self) -> Option<BlockEntry> {
        self.entries.lock().pop_front()
    }

    async fn wait_for_entry(&self) {
        self.notify.notified().await;
    }
}

impl BlockProducer for BlockQueue {
    fn has_blocks(&self) -> bool {
        Self::has_blocks(self)
    }

    fn notify(&self, origin: BlockOrigin, block: &Arc<ForkedSignedBeaconBlock>, outcome: ProcessingOutcome) {
        tracing::debug!(
            ?origin,
            root = ?block.message_hash_tree_root(),
            ?outcome,
            "block finished processing"
        );
    }
}

/// A minimal [`AttestationPool`]/[`AttestationWeights`] implementation (spec.md §4.5): the
/// latest block root each validator has attested to, which is exactly LMD-GHOST's input.
/// Simplified relative to a real pool (spec.md §1 Non-goals: no unaggregated-attestation gossip
/// validation lives here) by weighting every validator equally rather than by effective balance
/// — `AttestationPool::register_attestation`'s signature carries no balance, only the index.
#[derive(Default)]
pub struct LatestMessageWeights {
    latest_votes: Mutex<HashMap<ValidatorIndex, H256>>,
}

impl LatestMessageWeights {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttestationPool for LatestMessageWeights {
    fn register_attestation(&self, validator_index: ValidatorIndex, block_root: H256) {
        self.latest_votes.lock().insert(validator_index, block_root);
    }
}

impl AttestationWeights for LatestMessageWeights {
    fn weight(&self, block_root: H256) -> Gwei {
        self.latest_votes
            .lock()
            .values()
            .filter(|root| **root == block_root)
            .count() as Gwei
    }
}

/// Owns everything the block processor touches: the DAG ([`Store`]), the quarantine
/// ([`Quarantine`]), the state-transition driver ([`BlockProcessor`]), and the external
/// collaborators spec.md §6 names (execution engine, clock, validator monitor, attestation
/// pool). Not `Send`/`Sync` by design — spec.md §5's single cooperative consumer owns this and
/// nothing else touches it; other tasks interact only through the shared [`BlockQueue`].
pub struct ConsensusManager<P: Preset> {
    chain_config: Arc<Config>,
    store: Store<P>,
    quarantine: Quarantine,
    block_processor: Arc<BlockProcessor<P>>,
    execution_engine: Arc<dyn ExecutionEngine<P>>,
    clock: BeaconClock,
    validator_monitor: Arc<dyn ValidatorMonitor>,
    attestation_weights: Arc<LatestMessageWeights>,
    queue: Arc<BlockQueue>,
}

impl<P: Preset> ConsensusManager<P> {
    #[must_use]
    pub fn new(
        chain_config: Arc<Config>,
        store: Store<P>,
        block_processor: Arc<BlockProcessor<P>>,
        execution_engine: Arc<dyn ExecutionEngine<P>>,
        clock: BeaconClock,
        validator_monitor: Arc<dyn ValidatorMonitor>,
    ) -> Self {
        Self {
            chain_config,
            store,
            quarantine: Quarantine::new(),
            block_processor,
            execution_engine,
            clock,
            validator_monitor,
            attestation_weights: Arc::new(LatestMessageWeights::new()),
            queue: Arc::new(BlockQueue::new()),
        }
    }

    /// The shared producer-facing handle (spec.md §6): clone this `Arc` into whatever owns the
    /// gossip/sync/request pipeline so it can push without touching this manager at all.
    #[must_use]
    pub fn queue(&self) -> Arc<BlockQueue> {
        self.queue.clone()
    }

    #[must_use]
    pub fn attestation_pool(&self) -> Arc<LatestMessageWeights> {
        self.attestation_weights.clone()
    }

    #[must_use]
    pub fn has_blocks(&self) -> bool {
        self.queue.has_blocks()
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.store.head_root()
    }

    /// `add_block(src, forked_block, result_callback, validation_duration)` per spec.md §4.3.
    /// Blocks whose slot is at or below the finalized head's bypass the queue entirely and go
    /// through [`BlockProcessor::store_backfill_block`] synchronously, since they carry no new
    /// information for head selection and a real era-archive backfill would otherwise have to
    /// wait behind whatever gossip traffic is ahead of it in the queue.
    pub fn add_block(
        &mut self,
        origin: BlockOrigin,
        block: Arc<ForkedSignedBeaconBlock>,
        result_sender: Option<oneshot::Sender<ProcessingOutcome>>,
        validation_duration: Duration,
    ) {
        if block.slot() <= self.store.finalized_head().slot() {
            self.block_processor.store_backfill_block(&mut self.store, block.clone());
            self.validator_monitor.register_beacon_block(block.message_hash_tree_root(), &block);

            if let Some(sender) = result_sender {
                let _ignored = sender.send(ProcessingOutcome::Accepted);
            }

            return;
        }

        self.queue.push(BlockEntry {
            origin,
            block,
            result_sender,
            validation_duration,
        });
    }

    /// Drains the queue forever (spec.md §5): pop, process, release whatever quarantine entries
    /// the newly-accepted block unblocks, yield back to the executor, repeat. Returns only if
    /// `shutdown` fires (cooperative, not forced — in flight processing always finishes first).
    pub async fn run_queue_loop(&mut self, shutdown: &Notify) {
        loop {
            let Some(entry) = self.queue.pop() else {
                tokio::select! {
                    () = self.queue.wait_for_entry() => continue,
                    () = shutdown.notified() => return,
                }
            };

            self.process_entry(entry).await;
        }
    }

    async fn process_entry(&mut self, entry: BlockEntry) {
        let BlockEntry {
            origin,
            block,
            result_sender,
            validation_duration,
        } = entry;

        let block_root = block.message_hash_tree_root();
        let parent_root = block.parent_root();

        if self.quarantine.is_unviable(parent_root) || self.quarantine.is_unviable(block_root) {
            self.quarantine.mark_unviable(block_root);
            self.complete(result_sender, ProcessingOutcome::UnviableFork, origin, &block);
            return;
        }

        if !self.store.contains_block(parent_root) && parent_root != block_root {
            self.quarantine.add_missing(parent_root);
            self.quarantine.add_orphan(block.clone());
            self.complete(result_sender, ProcessingOutcome::MissingParent, origin, &block);
            return;
        }

        tracing::trace!(?origin, ?block_root, ?validation_duration, "dequeued block");

        let outcome = self.store_block(block.clone()).await;

        if outcome == ProcessingOutcome::Accepted {
            self.quarantine.remove_missing(block_root);
            self.release_orphans(block_root).await;
        }

        self.complete(result_sender, outcome, origin, &block);
    }

    /// `store_block` per spec.md §4.3 steps 1-8: submits any Bellatrix+ execution payload to the
    /// execution engine first, runs the state-transition function and proposer-signature check
    /// through [`BlockProcessor::store_block`], recomputes the head with real attestation
    /// weights, notifies the validator monitor, and reports the engine's new view of the chain
    /// back via `forkchoice_updated`.
    async fn store_block(&mut self, block: Arc<ForkedSignedBeaconBlock>) -> ProcessingOutcome {
        if matches!(block.as_ref(), ForkedSignedBeaconBlock::Bellatrix(_))
            && validate_merge_block(&self.chain_config, block.as_ref()) == PartialBlockAction::Ignore
        {
            return ProcessingOutcome::MissingParent;
        }

        if let Some(payload) = block.execution_payload() {
            if !payload.is_default() || Feature::RejectEmptyExecutionPayload.is_enabled() {
                match self.execution_engine.new_payload(payload.clone()).await {
                    Ok(status) if is_invalid(status.status) => {
                        let block_root = block.message_hash_tree_root();
                        self.quarantine.mark_unviable(block_root);
                        self.store.mark_unviable(block_root);
                        return ProcessingOutcome::Invalid(
                            status.validation_error.unwrap_or_else(|| "execution payload invalid".to_owned()),
                        );
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(%error, "execution engine new_payload call failed, deferring block");
                        return ProcessingOutcome::MissingParent;
                    }
                }
            }
        }

        let mut verifier = MultiVerifier::default();

        let action = match self.block_processor.store_block(&mut self.store, &mut verifier, block.clone()) {
            Ok(action) => action,
            Err(error) => return error.into(),
        };

        if let Err(error) = verifier.finish() {
            return ProcessingOutcome::Invalid(error.to_string());
        }

        let chain_link = match action {
            BlockAction::Accept(chain_link) => chain_link,
            BlockAction::Ignore(retryable) => {
                return if retryable {
                    ProcessingOutcome::MissingParent
                } else {
                    ProcessingOutcome::Invalid("block ignored".to_owned())
                };
            }
        };

        self.register_attestations(chain_link.block.as_ref(), chain_link.block_root);

        self.store.update_head(self.attestation_weights.as_ref());

        self.notify_execution_engine().await;

        ProcessingOutcome::Accepted
    }

    /// Folds every attestation the block carries into [`LatestMessageWeights`] and the
    /// validator monitor (spec.md §6: "registers attestations and sync-aggregate participation
    /// with the validator monitor"). Best-effort: a malformed committee index here doesn't
    /// invalidate a block that already passed the state-transition function's own checks.
    fn register_attestations(&self, block: &ForkedSignedBeaconBlock, block_root: H256) {
        self.validator_monitor.register_beacon_block(block_root, block);

        let state = match self.store.chain_link(block_root).and_then(|link| link.state.clone()) {
            Some(state) => state,
            None => return,
        };

        types::with_signed_block!(block, |signed| {
            for attestation in signed.message.body.attestations.iter() {
                self.validator_monitor.register_attestation_in_block(attestation, block_root);

                let Ok(indices) =
                    accessors::get_attesting_indices::<P>(state.as_ref(), &attestation.data, &attestation.aggregation_bits)
                else {
                    continue;
                };

                for index in indices {
                    self.attestation_weights.register_attestation(index, attestation.data.beacon_block_root);
                }
            }
        });

        match block {
            ForkedSignedBeaconBlock::Phase0(_) => {}
            ForkedSignedBeaconBlock::Altair(signed) => self
                .validator_monitor
                .register_sync_aggregate_in_block(&signed.message.body.sync_aggregate, block_root),
            ForkedSignedBeaconBlock::Bellatrix(signed) => self
                .validator_monitor
                .register_sync_aggregate_in_block(&signed.message.body.sync_aggregate, block_root),
        }
    }

    /// `forkchoice_updated` per spec.md §4.6: tells the execution engine the DAG's current
    /// head/safe/finalized view. `PreferVerifiedHead` (spec.md §9) only matters once an
    /// optimistic head and the verified head have drifted by more than
    /// [`VERIFIED_HEAD_PREFERENCE_SLOTS`]; this workspace has no optimistic-sync head tracking of
    /// its own; the feature flag is read here so the call site exists even though both heads
    /// are, for now, the same root.
    async fn notify_execution_engine(&self) {
        let head = self.store.head();

        let Some(execution_block_hash) = head.block_ref.execution_block_hash else {
            return;
        };

        if Feature::PreferVerifiedHead.is_enabled() {
            let distance = head.slot().get().saturating_sub(self.store.finalized_head().slot().get());
            tracing::trace!(distance, preference_window = VERIFIED_HEAD_PREFERENCE_SLOTS, "verified head preference");
        }

        let finalized_hash = self
            .store
            .chain_link(self.store.finalized_checkpoint().root)
            .and_then(|link| link.block_ref.execution_block_hash)
            .unwrap_or(execution_block_hash);

        let forkchoice_state = ForkchoiceState {
            head_block_hash: execution_block_hash,
            safe_block_hash: execution_block_hash,
            finalized_block_hash: finalized_hash,
        };

        if let Err(error) = self.execution_engine.forkchoice_updated(forkchoice_state, None).await {
            tracing::warn!(%error, "forkchoice_updated call failed");
        }
    }

    /// `advance_finalization` isn't driven by the block processor directly (spec.md §4.5 leaves
    /// justification/finalization bookkeeping to epoch processing, already run inside
    /// [`transition_functions::state_transition`]); this just re-derives it from whichever chain
    /// link the state-transition function last touched and forwards it to the store.
    pub fn advance_finalization(&mut self, justified: Checkpoint, finalized: Checkpoint) {
        self.store.advance_finalization(justified, finalized);
    }

    /// Releases every orphan `root` unblocks, then whatever those newly-accepted blocks in turn
    /// unblock, and so on (spec.md §4.4's closure property) — an explicit work-stack rather than
    /// recursive `async fn` calls, since a self-referential future's size can't be known statically.
    async fn release_orphans(&mut self, root: H256) {
        let mut frontier = vec![root];

        while let Some(current) = frontier.pop() {
            let released = self.quarantine.pop(current);

            for block in released {
                let outcome = self.store_block(block.clone()).await;

                if outcome == ProcessingOutcome::Accepted {
                    let released_root = block.message_hash_tree_root();
                    self.quarantine.remove_missing(released_root);
                    frontier.push(released_root);
                }
            }
        }
    }

    fn complete(
        &self,
        result_sender: Option<oneshot::Sender<ProcessingOutcome>>,
        outcome: ProcessingOutcome,
        origin: BlockOrigin,
        block: &Arc<ForkedSignedBeaconBlock>,
    ) {
        self.queue.notify(origin, block, outcome.clone());

        if let Some(sender) = result_sender {
            let _ignored = sender.send(outcome);
        }
    }

    #[must_use]
    pub fn current_slot(&self) -> Option<Slot> {
        self.clock.current_slot()
    }

    pub async fn idle_tick(&self) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_message_weights_counts_only_the_most_recent_vote_per_validator() {
        let weights = LatestMessageWeights::new();
        let root_a = H256::repeat_byte(1);
        let root_b = H256::repeat_byte(2);

        weights.register_attestation(ValidatorIndex::new(0), root_a);
        weights.register_attestation(ValidatorIndex::new(1), root_a);
        weights.register_attestation(ValidatorIndex::new(1), root_b);

        assert_eq!(weights.weight(root_a), 1);
        assert_eq!(weights.weight(root_b), 1);
    }

    #[test]
    fn block_queue_reports_has_blocks_accurately() {
        let queue = BlockQueue::new();
        assert!(!queue.has_blocks());

        queue.push(BlockEntry {
            origin: BlockOrigin::Gossip,
            block: Arc::new(ForkedSignedBeaconBlock::Phase0(types::phase0::SignedBeaconBlock::default())),
            result_sender: None,
            validation_duration: Duration::ZERO,
        });

        assert!(queue.has_blocks());
        assert!(queue.pop().is_some());
        assert!(!queue.has_blocks());
    }
}
