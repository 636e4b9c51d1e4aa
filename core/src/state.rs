//! Local anchor state and ledger resync.
//!
//! The tree and its deposit history are the client's cache of the ledger's
//! accumulator. They change in two ways only: a confirmed transaction
//! appends its own commitments, or a full leaf sequence is accepted after
//! its root checks out against the ledger.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use vanchor_privacy::{Element, MerkleTree};

use crate::error::{AnchorError, AnchorResult};
use crate::services::LedgerClient;

#[derive(Debug, Clone)]
pub struct AnchorState {
    tree: MerkleTree,
    /// Root right after each leaf was inserted
    deposit_history: BTreeMap<u32, Element>,
    latest_synced_block: u64,
}

impl AnchorState {
    pub fn new(tree: MerkleTree) -> Self {
        Self {
            tree,
            deposit_history: BTreeMap::new(),
            latest_synced_block: 0,
        }
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn root(&self) -> Element {
        self.tree.root()
    }

    pub fn deposit_history(&self) -> &BTreeMap<u32, Element> {
        &self.deposit_history
    }

    pub fn history_root(&self, leaf_index: u32) -> Option<Element> {
        self.deposit_history.get(&leaf_index).copied()
    }

    /// Index of the most recently inserted leaf
    pub fn latest_leaf_index(&self) -> Option<u32> {
        self.tree.len().checked_sub(1).and_then(|i| u32::try_from(i).ok())
    }

    pub fn latest_synced_block(&self) -> u64 {
        self.latest_synced_block
    }

    /// Fails unless `count` more leaves fit in the tree
    pub(crate) fn ensure_room(&self, count: usize) -> AnchorResult<()> {
        let capacity = self.tree.capacity();
        let free = capacity - self.tree.len() as u64;
        if count as u64 > free {
            return Err(AnchorError::CapacityExceeded { capacity });
        }
        Ok(())
    }

    /// Append a ledger-confirmed commitment
    pub(crate) fn insert_commitment(&mut self, commitment: Element) -> AnchorResult<u32> {
        let index = self.tree.insert(commitment)?;
        let root = self.tree.root();
        self.deposit_history.insert(index, root);
        debug!("Inserted leaf {} -> root {}", index, root);
        Ok(index)
    }

    /// Replace local state with `leaves` if their root is the ledger's
    /// current root.
    ///
    /// Returns `false` and leaves state untouched otherwise, including for a
    /// stale prefix whose root is still in the ledger's history.
    /// `synced_block` defaults to the ledger's current block.
    pub async fn set_with_leaves(
        &mut self,
        ledger: &dyn LedgerClient,
        leaves: &[Element],
        synced_block: Option<u64>,
    ) -> AnchorResult<bool> {
        let (candidate, history) = self.rebuild(leaves)?;
        let root = candidate.root();

        let authoritative = ledger.last_root().await.map_err(AnchorError::Ledger)?;
        if root != authoritative {
            warn!(
                "Rejected resync of {} leaves: root {} != ledger root {}",
                leaves.len(),
                root,
                authoritative
            );
            return Ok(false);
        }

        let synced_block = match synced_block {
            Some(block) => block,
            None => ledger.block_number().await.map_err(AnchorError::Ledger)?,
        };

        self.tree = candidate;
        self.deposit_history = history;
        self.latest_synced_block = synced_block;
        info!(
            "Resynced {} leaves at block {} (root {})",
            leaves.len(),
            synced_block,
            root
        );
        Ok(true)
    }

    /// Like [`set_with_leaves`](Self::set_with_leaves) but a rejected
    /// candidate is an error
    pub async fn resync(
        &mut self,
        ledger: &dyn LedgerClient,
        leaves: &[Element],
        synced_block: Option<u64>,
    ) -> AnchorResult<()> {
        if self.set_with_leaves(ledger, leaves, synced_block).await? {
            Ok(())
        } else {
            let candidate = self.tree.rebuild_from(leaves)?.root();
            Err(AnchorError::RootMismatch {
                candidate: candidate.to_fixed_hex(),
            })
        }
    }

    /// Candidate tree plus the per-leaf root history, without touching `self`
    fn rebuild(&self, leaves: &[Element]) -> AnchorResult<(MerkleTree, BTreeMap<u32, Element>)> {
        let mut candidate = self.tree.rebuild_from(&[])?;
        let capacity = candidate.capacity();
        if leaves.len() as u64 > capacity {
            return Err(AnchorError::CapacityExceeded { capacity });
        }

        let mut history = BTreeMap::new();
        for leaf in leaves {
            let index = candidate.insert(*leaf)?;
            history.insert(index, candidate.root());
        }
        Ok((candidate, history))
    }
}
