//! Identity Group
//!
//! A second accumulator whose leaves are member public keys rather than
//! value commitments. Identity proofs may lag value proofs by a few blocks,
//! so any root from the bounded history stays acceptable. Roots of the same
//! group on linked chains are tracked alongside the local root.

use std::sync::Arc;

use crate::element::Element;
use crate::error::{MerkleError, PrivacyError};
use crate::hasher::FieldHasher;
use crate::merkle::{MerklePath, MerkleTree};

/// Membership group over public keys
#[derive(Debug, Clone)]
pub struct IdentityGroup {
    tree: MerkleTree,
    /// Latest known roots of this group on linked chains
    linked_roots: Vec<Element>,
}

impl IdentityGroup {
    /// Empty group with `linked` linked-chain root slots
    pub fn new(
        depth: usize,
        history_size: usize,
        linked: usize,
        hasher: Arc<dyn FieldHasher>,
    ) -> Result<Self, MerkleError> {
        let tree = MerkleTree::with_history(depth, history_size, hasher)?;
        let linked_roots = vec![tree.zero_root(); linked];
        Ok(Self { tree, linked_roots })
    }

    pub fn depth(&self) -> usize {
        self.tree.levels()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn root(&self) -> Element {
        self.tree.root()
    }

    pub fn members(&self) -> &[Element] {
        self.tree.leaves()
    }

    /// Add a member public key, returning its position
    pub fn add_member(&mut self, public_key: Element) -> Result<u32, MerkleError> {
        let index = self.tree.insert(public_key)?;
        tracing::debug!(index, root = %self.tree.root(), "identity member added");
        Ok(index)
    }

    pub fn index_of(&self, public_key: &Element) -> Option<u32> {
        self.tree.index_of(public_key)
    }

    /// Membership path for a member public key
    pub fn proof_for(&self, public_key: &Element) -> Result<MerklePath, PrivacyError> {
        let index = self
            .index_of(public_key)
            .ok_or_else(|| PrivacyError::MemberNotFound(public_key.to_fixed_hex()))?;
        Ok(self.tree.path(index)?)
    }

    /// All-zero path used for zero-amount outputs
    pub fn zero_proof(&self) -> MerklePath {
        MerklePath::zeroed(self.depth(), Element::ZERO, Element::ZERO)
    }

    /// Record the group root observed on a linked chain
    pub fn update_linked_root(&mut self, slot: usize, root: Element) -> Result<(), MerkleError> {
        let len = self.linked_roots.len();
        let entry = self
            .linked_roots
            .get_mut(slot)
            .ok_or(MerkleError::IndexOutOfRange {
                index: slot as i64,
                len,
            })?;
        *entry = root;
        Ok(())
    }

    pub fn linked_roots(&self) -> &[Element] {
        &self.linked_roots
    }

    /// `[local root, linked roots...]` in slot order
    pub fn roots(&self) -> Vec<Element> {
        std::iter::once(self.tree.root())
            .chain(self.linked_roots.iter().copied())
            .collect()
    }

    /// Whether `root` is a recent local root or a linked root
    pub fn is_known_root(&self, root: &Element) -> bool {
        self.tree.is_known_root(root) || self.linked_roots.contains(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::PoseidonHasher;

    fn group() -> IdentityGroup {
        IdentityGroup::new(4, 5, 1, Arc::new(PoseidonHasher::new())).unwrap()
    }

    #[test]
    fn test_membership_proof_verifies() {
        let mut g = group();
        let alice = Element::from_u64(1);
        let bob = Element::from_u64(2);
        g.add_member(alice).unwrap();
        g.add_member(bob).unwrap();

        let proof = g.proof_for(&bob).unwrap();
        assert_eq!(proof.index, 1);
        assert_eq!(proof.root, g.root());
        assert!(proof.verify(&PoseidonHasher::new()));
    }

    #[test]
    fn test_unknown_member() {
        let g = group();
        assert!(matches!(
            g.proof_for(&Element::from_u64(9)),
            Err(PrivacyError::MemberNotFound(_))
        ));
    }

    #[test]
    fn test_roots_order_and_history() {
        let mut g = group();
        let empty_root = g.root();
        g.add_member(Element::from_u64(1)).unwrap();

        let linked = Element::from_u64(999);
        g.update_linked_root(0, linked).unwrap();

        assert_eq!(g.roots(), vec![g.root(), linked]);
        assert!(g.is_known_root(&empty_root), "lagging roots stay valid");
        assert!(g.is_known_root(&linked));
        assert!(g.update_linked_root(1, linked).is_err());
    }

    #[test]
    fn test_zero_proof_has_group_depth() {
        let g = group();
        let proof = g.zero_proof();
        assert_eq!(proof.siblings.len(), 4);
        assert!(proof.is_zeroed());
    }
}
