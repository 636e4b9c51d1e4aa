//! Merkle Accumulator for Note Commitments
//!
//! Append-only, fixed-depth binary tree mirroring the on-ledger commitment
//! tree. Leaves are stored in insertion order (= ledger order); each insert
//! rehashes only the path from the new leaf to the root.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   H3
//!               |   |   |    |
//!              C0  C1  C2   C3  (Note Commitments)
//! ```
//!
//! Unset positions hold the zero leaf; `zeros[l]` is the root of an empty
//! subtree of height `l`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::element::Element;
use crate::error::MerkleError;
use crate::hasher::FieldHasher;

/// Deepest tree supported (leaf indices fit in a u32)
pub const MAX_TREE_DEPTH: usize = 32;

/// Number of recent roots a tree remembers by default
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// The leaf this path was generated for
    pub element: Element,
    /// Root the path recomputes to
    pub root: Element,
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Element>,
    /// Position bits (false = left, true = right)
    pub path_bits: Vec<bool>,
    /// The leaf position
    pub index: u32,
}

impl MerklePath {
    /// All-zero path used by zero-amount notes that are not in any tree
    pub fn zeroed(levels: usize, element: Element, root: Element) -> Self {
        Self {
            element,
            root,
            siblings: vec![Element::ZERO; levels],
            path_bits: vec![false; levels],
            index: 0,
        }
    }

    /// Recompute the root for `leaf` along this path
    pub fn compute_root(&self, leaf: &Element, hasher: &dyn FieldHasher) -> Element {
        let mut current = *leaf;

        for (sibling, is_right) in self.siblings.iter().zip(self.path_bits.iter()) {
            current = if *is_right {
                hasher.hash_pair(sibling, &current)
            } else {
                hasher.hash_pair(&current, sibling)
            };
        }

        current
    }

    /// Verify that this path proves inclusion of its element in its root
    pub fn verify(&self, hasher: &dyn FieldHasher) -> bool {
        self.compute_root(&self.element, hasher) == self.root
    }

    /// Direction bits as circuit inputs (0 = left, 1 = right)
    pub fn path_indices(&self) -> Vec<u8> {
        self.path_bits.iter().map(|bit| u8::from(*bit)).collect()
    }

    pub fn is_zeroed(&self) -> bool {
        self.siblings.iter().all(Element::is_zero) && self.path_bits.iter().all(|b| !b)
    }
}

/// Fixed-depth incremental Merkle tree
#[derive(Clone)]
pub struct MerkleTree {
    levels: usize,
    /// Leaves in insertion order
    leaves: Vec<Element>,
    /// Non-empty internal nodes: (level, index) -> hash, level >= 1
    nodes: HashMap<(usize, u64), Element>,
    /// Empty subtree roots, `zeros[0]` is the zero leaf
    zeros: Vec<Element>,
    root: Element,
    history: RootHistory,
    hasher: Arc<dyn FieldHasher>,
}

impl MerkleTree {
    /// Create an empty tree of the given depth
    pub fn new(levels: usize, hasher: Arc<dyn FieldHasher>) -> Result<Self, MerkleError> {
        Self::with_history(levels, DEFAULT_ROOT_HISTORY_SIZE, hasher)
    }

    /// Create an empty tree that remembers `history_size` recent roots
    pub fn with_history(
        levels: usize,
        history_size: usize,
        hasher: Arc<dyn FieldHasher>,
    ) -> Result<Self, MerkleError> {
        if levels == 0 || levels > MAX_TREE_DEPTH {
            return Err(MerkleError::InvalidDepth(levels));
        }

        let mut zeros = Vec::with_capacity(levels + 1);
        zeros.push(hasher.zero_leaf());
        for level in 0..levels {
            let below = zeros[level];
            zeros.push(hasher.hash_pair(&below, &below));
        }
        let root = zeros[levels];

        let mut history = RootHistory::new(history_size);
        history.push(root);

        Ok(Self {
            levels,
            leaves: Vec::new(),
            nodes: HashMap::new(),
            zeros,
            root,
            history,
            hasher,
        })
    }

    /// Build a tree from an explicit ordered leaf sequence
    pub fn from_leaves(
        levels: usize,
        leaves: &[Element],
        hasher: Arc<dyn FieldHasher>,
    ) -> Result<Self, MerkleError> {
        let mut tree = Self::new(levels, hasher)?;
        tree.extend(leaves)?;
        Ok(tree)
    }

    /// Build a fresh tree with this tree's depth, hasher, and history window.
    ///
    /// Leaves `self` untouched; the caller decides whether to swap it in.
    pub fn rebuild_from(&self, leaves: &[Element]) -> Result<Self, MerkleError> {
        let mut tree = Self::with_history(self.levels, self.history.max_size, self.hasher.clone())?;
        tree.extend(leaves)?;
        Ok(tree)
    }

    /// Current root, cached from the last insert
    pub fn root(&self) -> Element {
        self.root
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Maximum number of leaves (`2^levels`)
    pub fn capacity(&self) -> u64 {
        1u64 << self.levels
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Leaves in insertion order
    pub fn leaves(&self) -> &[Element] {
        &self.leaves
    }

    pub fn leaf(&self, index: u32) -> Option<Element> {
        self.leaves.get(index as usize).copied()
    }

    /// Position of the first leaf equal to `element`
    pub fn index_of(&self, element: &Element) -> Option<u32> {
        self.leaves
            .iter()
            .position(|leaf| leaf == element)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Root of the empty tree of this depth
    pub fn zero_root(&self) -> Element {
        self.zeros[self.levels]
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHasher> {
        &self.hasher
    }

    /// Whether `root` is the current root or one of the recent ones
    pub fn is_known_root(&self, root: &Element) -> bool {
        self.history.is_valid(root)
    }

    pub fn root_history(&self) -> &RootHistory {
        &self.history
    }

    /// Append a leaf and return its position
    pub fn insert(&mut self, leaf: Element) -> Result<u32, MerkleError> {
        let capacity = self.capacity();
        let position = self.leaves.len() as u64;
        if position >= capacity {
            return Err(MerkleError::CapacityExceeded { capacity });
        }
        let index = u32::try_from(position).map_err(|_| MerkleError::CapacityExceeded { capacity })?;

        self.leaves.push(leaf);
        self.update_path(position, leaf);
        self.history.push(self.root);

        Ok(index)
    }

    /// Append several leaves, failing before any insert if they do not fit
    pub fn extend(&mut self, leaves: &[Element]) -> Result<(), MerkleError> {
        let capacity = self.capacity();
        if (self.leaves.len() + leaves.len()) as u64 > capacity {
            return Err(MerkleError::CapacityExceeded { capacity });
        }
        for leaf in leaves {
            self.insert(*leaf)?;
        }
        Ok(())
    }

    /// Get the Merkle path for a position
    pub fn path(&self, index: u32) -> Result<MerklePath, MerkleError> {
        let Some(element) = self.leaf(index) else {
            return Err(MerkleError::IndexOutOfRange {
                index: i64::from(index),
                len: self.leaves.len(),
            });
        };

        let mut siblings = Vec::with_capacity(self.levels);
        let mut path_bits = Vec::with_capacity(self.levels);
        let mut current_index = u64::from(index);

        for level in 0..self.levels {
            path_bits.push(current_index & 1 == 1);
            siblings.push(self.node(level, current_index ^ 1));
            current_index >>= 1;
        }

        Ok(MerklePath {
            element,
            root: self.root,
            siblings,
            path_bits,
            index,
        })
    }

    fn node(&self, level: usize, index: u64) -> Element {
        let stored = if level == 0 {
            usize::try_from(index)
                .ok()
                .and_then(|i| self.leaves.get(i))
                .copied()
        } else {
            self.nodes.get(&(level, index)).copied()
        };
        stored.unwrap_or(self.zeros[level])
    }

    fn update_path(&mut self, position: u64, leaf: Element) {
        let mut current_index = position;
        let mut current_hash = leaf;

        for level in 0..self.levels {
            let sibling = self.node(level, current_index ^ 1);

            current_hash = if current_index & 1 == 1 {
                self.hasher.hash_pair(&sibling, &current_hash)
            } else {
                self.hasher.hash_pair(&current_hash, &sibling)
            };

            current_index >>= 1;
            self.nodes.insert((level + 1, current_index), current_hash);
        }

        self.root = current_hash;
    }
}

impl fmt::Debug for MerkleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("levels", &self.levels)
            .field("leaves", &self.leaves.len())
            .field("root", &self.root)
            .finish()
    }
}

/// Root history for Merkle trees
///
/// Stores recent roots so proofs built against a slightly stale root
/// remain acceptable.
#[derive(Debug, Clone)]
pub struct RootHistory {
    /// Recent roots (most recent first)
    roots: Vec<Element>,
    /// Maximum history size
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: Vec::with_capacity(max_size),
            max_size: max_size.max(1),
        }
    }

    /// Add a new root
    pub fn push(&mut self, root: Element) {
        self.roots.insert(0, root);
        if self.roots.len() > self.max_size {
            self.roots.pop();
        }
    }

    /// Check if a root is valid (current or recent)
    pub fn is_valid(&self, root: &Element) -> bool {
        self.roots.contains(root)
    }

    /// Get the most recent root
    pub fn current(&self) -> Option<&Element> {
        self.roots.first()
    }

    /// Recent roots, most recent first
    pub fn roots(&self) -> &[Element] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
