//! The in-memory block DAG and fork-choice store (spec.md §4.5): LMD-GHOST with proposer-boost
//! over `ChainLink` nodes, justified/finalized checkpoint tracking, and the two validation
//! entrypoints (`validate_block_for_gossip`, `validate_block_with_custom_state_transition`) that
//! thread a caller-supplied closure through to the parent's state without the store needing to
//! know how the caller wants to run the state-transition function — grounded on the reference
//! `Store<P>`'s `validate_block_for_gossip`/`validate_block_with_custom_state_transition` shape.

use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
    sync::Arc,
};

use helper_functions::{accessors, signing, verifier::Verifier};
use types::{
    combined::{ForkedBeaconState, ForkedSignedBeaconBlock},
    config::{domains, Config},
    phase0::Checkpoint,
    preset::Preset,
    primitives::{Gwei, Slot, H256},
    BeaconState,
};

use crate::{
    block_ref::{BlockRef, ChainLink},
    error::{BlockAction, Error},
};

/// Supplies each block's accumulated LMD-GHOST attester weight (spec.md §4.5: "attestation
/// weights (from the attestation pool)"). The attestation pool is an external collaborator
/// (spec.md §1 lists it among pieces kept out of this core's scope); `fork_choice_control`'s
/// consensus glue owns a concrete implementation that tracks validators' latest messages and
/// feeds weights in here. A `()` implementation (weight 0 everywhere) degrades head selection to
/// "first child inserted wins" plus proposer-boost, which is enough for tests that only ever
/// build a single chain.
pub trait AttestationWeights {
    fn weight(&self, block_root: H256) -> Gwei;
}

impl AttestationWeights for () {
    fn weight(&self, _block_root: H256) -> Gwei {
        0
    }
}

pub struct Store<P> {
    config: Arc<Config>,
    anchor_root: H256,
    chain_links: HashMap<H256, ChainLink>,
    children: HashMap<H256, Vec<H256>>,
    unviable_roots: HashSet<H256>,
    justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    head_root: H256,
    proposer_boost_root: Option<H256>,
    _preset: PhantomData<P>,
}

impl<P: Preset> Store<P> {
    /// `anchor_block`/`anchor_state` are the trusted starting point: either the real genesis
    /// block/state or a weak-subjectivity checkpoint. Both justified and finalized checkpoints
    /// start out pointing at the anchor (spec.md §3 invariant: finalized epoch ≤ justified epoch
    /// ≤ current epoch, trivially true when both equal the anchor's own epoch).
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        anchor_block: Arc<ForkedSignedBeaconBlock>,
        anchor_state: Arc<ForkedBeaconState>,
    ) -> Self {
        let anchor_root = anchor_block.message_hash_tree_root();
        let anchor_epoch = accessors::get_current_epoch::<P>(anchor_state.as_ref());
        let anchor_checkpoint = Checkpoint {
            epoch: anchor_epoch,
            root: anchor_root,
        };

        let chain_link = ChainLink::new(anchor_root, anchor_block, Some(anchor_state), None);

        let mut chain_links = HashMap::new();
        chain_links.insert(anchor_root, chain_link);

        Self {
            config,
            anchor_root,
            chain_links,
            children: HashMap::new(),
            unviable_roots: HashSet::new(),
            justified_checkpoint: anchor_checkpoint,
            finalized_checkpoint: anchor_checkpoint,
            head_root: anchor_root,
            proposer_boost_root: None,
            _preset: PhantomData,
        }
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.head_root
    }

    /// `head` per spec.md §6's DAG interface.
    #[must_use]
    pub fn head(&self) -> &ChainLink {
        &self.chain_links[&self.head_root]
    }

    /// `finalized_head` per spec.md §6.
    #[must_use]
    pub fn finalized_head(&self) -> &ChainLink {
        &self.chain_links[&self.finalized_checkpoint.root]
    }

    #[must_use]
    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    /// `get_ref(root)` per spec.md §6.
    #[must_use]
    pub fn get_ref(&self, root: H256) -> Option<BlockRef> {
        self.chain_links.get(&root).map(|link| link.block_ref)
    }

    #[must_use]
    pub fn chain_link(&self, root: H256) -> Option<&ChainLink> {
        self.chain_links.get(&root)
    }

    #[must_use]
    pub fn contains_block(&self, root: H256) -> bool {
        self.chain_links.contains_key(&root)
    }

    #[must_use]
    pub fn parent_root_of(&self, root: H256) -> Option<H256> {
        self.chain_links.get(&root).map(ChainLink::parent_root)
    }

    /// `clearance_state` per spec.md §6: the post-state a caller may build the next block or a
    /// gossip check on top of, if this root's has not been dropped.
    #[must_use]
    pub fn clearance_state(&self, root: H256) -> Option<Arc<ForkedBeaconState>> {
        self.chain_links.get(&root).and_then(|link| link.state.clone())
    }

    #[must_use]
    pub fn is_unviable(&self, root: H256) -> bool {
        self.unviable_roots.contains(&root)
    }

    /// The block proposed for the current wall slot, seen early enough to earn proposer-boost
    /// (spec.md §4.5). `fork_choice_control`'s consensus glue calls this right after a successful
    /// `add_head_block` for a block whose slot matches the wall clock's current slot and whose
    /// `BeaconClock::elapsed_in_slot` is still within the attestation-due window; it is the
    /// caller's job to know "now", since `Store` itself carries no clock dependency.
    pub fn set_proposer_boost_root(&mut self, root: Option<H256>) {
        self.proposer_boost_root = root;
    }

    /// `validate_block_for_gossip` per the reference `Store`: runs `run` against the parent's
    /// chain link without mutating the DAG. Used for the gossip-validation path, which only ever
    /// needs to know "would this be accepted", not to actually insert the block.
    pub fn validate_block_for_gossip(
        &self,
        block: &ForkedSignedBeaconBlock,
        run: impl FnOnce(&ChainLink) -> Result<(Arc<ForkedBeaconState>, Option<BlockAction>), Error>,
    ) -> Result<Option<BlockAction>, Error> {
        let block_root = block.message_hash_tree_root();

        if self.chain_links.contains_key(&block_root) {
            return Err(Error::Duplicate(block_root));
        }

        let parent_root = block.parent_root();

        let parent = self
            .chain_links
            .get(&parent_root)
            .ok_or(Error::MissingParent { block_root, parent_root })?;

        if parent.unviable || self.unviable_roots.contains(&parent_root) {
            return Err(Error::UnviableFork { unviable_root: parent_root });
        }

        let (_, action) = run(parent)?;

        Ok(action)
    }

    /// `validate_block_with_custom_state_transition` per the reference `Store`: `run` receives
    /// the block's own root plus the parent chain link, computes (or reuses) the post-state, and
    /// returns `Some(action)` to short-circuit (e.g. the merge-block `Ignore` case) or `None` to
    /// let the store finish the normal insertion via [`Store::add_head_block`].
    pub fn validate_block_with_custom_state_transition(
        &mut self,
        block: Arc<ForkedSignedBeaconBlock>,
        verifier: &mut impl Verifier,
        run: impl FnOnce(H256, &ChainLink) -> Result<(Arc<ForkedBeaconState>, Option<BlockAction>), Error>,
    ) -> Result<BlockAction, Error> {
        let block_root = block.message_hash_tree_root();

        if let Some(existing) = self.chain_links.get(&block_root) {
            return Ok(BlockAction::Accept(Box::new(existing.clone())));
        }

        let parent_root = block.parent_root();

        let parent = self
            .chain_links
            .get(&parent_root)
            .cloned()
            .ok_or(Error::MissingParent { block_root, parent_root })?;

        if parent.unviable || self.unviable_roots.contains(&parent_root) {
            self.mark_unviable(block_root);
            return Err(Error::UnviableFork { unviable_root: parent_root });
        }

        let (state, early_action) = run(block_root, &parent)?;

        if let Some(action) = early_action {
            return Ok(action);
        }

        self.add_head_block(block, state, verifier)
    }

    /// `add_head_block` per spec.md §4.5: verifies the block's own proposer signature through
    /// `verifier` (batched alongside whatever else the caller has queued — `verifier.finish()` is
    /// the caller's responsibility, not this method's, since one call here may be one of many
    /// blocks verified together), inserts the `ChainLink`, and recomputes the head.
    pub fn add_head_block(
        &mut self,
        block: Arc<ForkedSignedBeaconBlock>,
        post_state: Arc<ForkedBeaconState>,
        verifier: &mut impl Verifier,
    ) -> Result<BlockAction, Error> {
        let block_root = block.message_hash_tree_root();

        if let Some(existing) = self.chain_links.get(&block_root) {
            return Ok(BlockAction::Accept(Box::new(existing.clone())));
        }

        let parent_root = block.parent_root();

        if !self.chain_links.contains_key(&parent_root) {
            return Err(Error::MissingParent { block_root, parent_root });
        }

        if self.chain_links[&parent_root].unviable || self.unviable_roots.contains(&parent_root) {
            self.mark_unviable(block_root);
            return Err(Error::UnviableFork { unviable_root: parent_root });
        }

        let proposer_index = block.proposer_index();
        let public_key_bytes = post_state
            .validators()
            .get()
            .get(usize::from(proposer_index))
            .map(|validator| validator.pubkey)
            .ok_or_else(|| Error::Invalid(format!("proposer index {proposer_index:?} out of range")))?;

        let domain = accessors::get_domain::<P>(post_state.as_ref(), domains::BEACON_PROPOSER, None);
        let signing_root = signing::compute_signing_root(block.message_hash_tree_root(), domain);

        verifier.verify_singular(
            signing_root.as_bytes(),
            block.signature().try_into_signature()?,
            public_key_bytes.try_into_public_key()?,
        )?;

        let execution_block_hash = block
            .execution_payload()
            .map(|payload| payload.block_hash)
            .filter(|hash| !hash.is_zero());

        let chain_link = ChainLink::new(block_root, block, Some(post_state), execution_block_hash);

        self.chain_links.insert(block_root, chain_link.clone());
        self.children.entry(parent_root).or_default().push(block_root);

        self.update_head(&());

        Ok(BlockAction::Accept(Box::new(chain_link)))
    }

    /// `add_backfill_block` per spec.md §6/§4.3: blocks at or below the finalized slot, restored
    /// from an era archive, are trusted outright and never need a post-state or to affect head
    /// selection — they exist only so descendant lookups and `get_ref` work uniformly.
    pub fn add_backfill_block(&mut self, block: Arc<ForkedSignedBeaconBlock>) {
        let block_root = block.message_hash_tree_root();

        self.chain_links
            .entry(block_root)
            .or_insert_with(|| ChainLink::new(block_root, block, None, None));
    }

    /// Recursively marks `root` and every known descendant unviable (spec.md §4.4's closure
    /// property, applied here to blocks already in the DAG rather than the quarantine's orphans).
    pub fn mark_unviable(&mut self, root: H256) {
        if !self.unviable_roots.insert(root) {
            return;
        }

        if let Some(link) = self.chain_links.get_mut(&root) {
            link.unviable = true;
        }

        let children = self.children.get(&root).cloned().unwrap_or_default();

        for child in children {
            self.mark_unviable(child);
        }
    }

    /// `update_head(wall_slot)` per spec.md §4.5/§6: walks from the justified root down child
    /// edges picking the child with maximal cumulative (subtree) attester weight, breaking ties
    /// by root so the rule is deterministic across replicas that received blocks in different
    /// orders. Proposer-boost adds `config.proposer_score_boost` percent of the justified state's
    /// per-slot committee weight to whichever root `set_proposer_boost_root` last named.
    pub fn update_head(&mut self, weights: &impl AttestationWeights) {
        let boost_amount = self.proposer_boost_amount();
        let proposer_boost_root = self.proposer_boost_root;

        let mut current = self.justified_root();

        loop {
            let children: Vec<H256> = self
                .children
                .get(&current)
                .into_iter()
                .flatten()
                .copied()
                .filter(|root| !self.unviable_roots.contains(root))
                .collect();

            let Some(best) = children.into_iter().max_by_key(|&root| {
                (
                    self.subtree_weight(root, weights, proposer_boost_root, boost_amount),
                    root,
                )
            }) else {
                break;
            };

            current = best;
        }

        self.head_root = current;
    }

    fn justified_root(&self) -> H256 {
        if self.chain_links.contains_key(&self.justified_checkpoint.root) {
            self.justified_checkpoint.root
        } else {
            self.anchor_root
        }
    }

    fn subtree_weight(
        &self,
        root: H256,
        weights: &impl AttestationWeights,
        proposer_boost_root: Option<H256>,
        boost_amount: Gwei,
    ) -> Gwei {
        let mut total = weights.weight(root);

        if proposer_boost_root == Some(root) {
            total += boost_amount;
        }

        for &child in self.children.get(&root).map_or(&[][..], Vec::as_slice) {
            if !self.unviable_roots.contains(&child) {
                total += self.subtree_weight(child, weights, proposer_boost_root, boost_amount);
            }
        }

        total
    }

    fn proposer_boost_amount(&self) -> Gwei {
        let Some(link) = self.chain_links.get(&self.justified_root()) else {
            return 0;
        };

        let Some(state) = &link.state else {
            return 0;
        };

        let total_active_balance = accessors::get_total_active_balance::<P>(state.as_ref());
        let committee_weight = total_active_balance / P::SLOTS_PER_EPOCH;

        committee_weight / 100 * self.config.proposer_score_boost
    }

    /// Advances justification/finalization from `process_epoch`'s output checkpoints (spec.md
    /// §4.5) and prunes every block strictly below the new finalized slot, except the finalized
    /// block itself.
    pub fn advance_finalization(&mut self, justified: Checkpoint, finalized: Checkpoint) {
        self.justified_checkpoint = justified;

        if finalized.epoch > self.finalized_checkpoint.epoch {
            self.finalized_checkpoint = finalized;
            self.prune_finalized();
        }
    }

    fn prune_finalized(&mut self) {
        let finalized_root = self.finalized_checkpoint.root;

        let finalized_slot = self
            .chain_links
            .get(&finalized_root)
            .map_or(Slot::new(0), ChainLink::slot);

        let retained_roots: HashSet<H256> = self
            .chain_links
            .iter()
            .filter(|(root, link)| **root == finalized_root || link.slot() >= finalized_slot)
            .map(|(root, _)| *root)
            .collect();

        self.chain_links.retain(|root, _| retained_roots.contains(root));

        for children in self.children.values_mut() {
            children.retain(|root| retained_roots.contains(root));
        }

        self.children.retain(|root, _| retained_roots.contains(root));
        self.unviable_roots.retain(|root| retained_roots.contains(root));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use helper_functions::verifier::NullVerifier;
    use types::{phase0, Minimal};

    use super::*;

    fn genesis_store() -> Store<Minimal> {
        let state = Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default()));
        let block = Arc::new(ForkedSignedBeaconBlock::Phase0(phase0::SignedBeaconBlock::default()));

        Store::new(Arc::new(Config::minimal()), block, state)
    }

    fn child_block(parent_root: H256, slot: u64, proposer_index: u32) -> Arc<ForkedSignedBeaconBlock> {
        let mut message = phase0::BeaconBlock::default();
        message.slot = Slot::new(slot);
        message.parent_root = parent_root;
        message.proposer_index = types::primitives::ValidatorIndex::new(proposer_index);

        Arc::new(ForkedSignedBeaconBlock::Phase0(phase0::SignedBeaconBlock {
            message,
            ..Default::default()
        }))
    }

    #[test]
    fn head_starts_at_anchor() {
        let store = genesis_store();
        assert_eq!(store.head_root(), store.justified_checkpoint().root);
    }

    #[test]
    fn add_head_block_rejects_unknown_parent() {
        let mut store = genesis_store();
        let block = child_block(H256::repeat_byte(0xaa), 1, 0);
        let mut verifier = NullVerifier;

        let error = store
            .add_head_block(block, Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default())), &mut verifier)
            .unwrap_err();

        assert!(matches!(error, Error::MissingParent { .. }));
    }

    #[test]
    fn add_head_block_inserts_and_moves_head() {
        let mut store = genesis_store();
        let anchor_root = store.head_root();
        let block = child_block(anchor_root, 1, 0);
        let mut verifier = NullVerifier;

        let action = store
            .add_head_block(
                block.clone(),
                Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default())),
                &mut verifier,
            )
            .unwrap();

        let BlockAction::Accept(chain_link) = action else {
            panic!("expected Accept");
        };

        assert_eq!(store.head_root(), chain_link.block_root);
        assert_eq!(store.head_root(), block.message_hash_tree_root());
    }

    #[test]
    fn duplicate_insertion_is_idempotent() {
        let mut store = genesis_store();
        let anchor_root = store.head_root();
        let block = child_block(anchor_root, 1, 0);
        let mut verifier = NullVerifier;

        store
            .add_head_block(
                block.clone(),
                Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default())),
                &mut verifier,
            )
            .unwrap();

        let second = store
            .add_head_block(
                block,
                Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default())),
                &mut verifier,
            )
            .unwrap();

        assert!(matches!(second, BlockAction::Accept(_)));
    }

    #[test]
    fn marking_root_unviable_propagates_to_children() {
        let mut store = genesis_store();
        let anchor_root = store.head_root();
        let child = child_block(anchor_root, 1, 0);
        let child_root = child.message_hash_tree_root();
        let grandchild = child_block(child_root, 2, 0);
        let grandchild_root = grandchild.message_hash_tree_root();
        let mut verifier = NullVerifier;

        store
            .add_head_block(child, Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default())), &mut verifier)
            .unwrap();
        store
            .add_head_block(grandchild, Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default())), &mut verifier)
            .unwrap();

        store.mark_unviable(child_root);

        assert!(store.is_unviable(child_root));
        assert!(store.is_unviable(grandchild_root));
    }

    #[test]
    fn finalization_prunes_blocks_below_the_finalized_slot() {
        let mut store = genesis_store();
        let anchor_root = store.head_root();
        let child = child_block(anchor_root, 1, 0);
        let child_root = child.message_hash_tree_root();
        let mut verifier = NullVerifier;

        store
            .add_head_block(child, Arc::new(ForkedBeaconState::Phase0(phase0::BeaconState::default())), &mut verifier)
            .unwrap();

        store.advance_finalization(
            Checkpoint { epoch: types::primitives::Epoch::new(1), root: child_root },
            Checkpoint { epoch: types::primitives::Epoch::new(1), root: child_root },
        );

        assert!(!store.contains_block(anchor_root));
        assert!(store.contains_block(child_root));
    }
}
