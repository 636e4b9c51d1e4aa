//! Nullifiers
//!
//! Implements nullifier derivation for double-spend prevention.
//!
//! ```text
//! signature = H(private_key, commitment, index)
//! nullifier = H(commitment, index, signature)
//! ```
//!
//! The leaf index is part of the derivation, so the same commitment inserted
//! twice yields two distinct spendable notes. Once a nullifier is published,
//! the corresponding note cannot be spent again.

use std::fmt;
use std::sync::Arc;

use crate::element::Element;
use crate::hasher::FieldHasher;

/// Nullifier derivation key
///
/// Wraps the owner's private key; knowledge of it is required to derive
/// valid nullifiers.
#[derive(Clone)]
pub struct NullifierKey {
    private_key: Element,
    hasher: Arc<dyn FieldHasher>,
}

impl NullifierKey {
    pub fn new(private_key: Element, hasher: Arc<dyn FieldHasher>) -> Self {
        Self {
            private_key,
            hasher,
        }
    }

    /// Ownership signature over a commitment at a leaf index
    pub fn sign(&self, commitment: &Element, index: u32) -> Element {
        self.hasher.hash(&[
            self.private_key,
            *commitment,
            Element::from_u64(u64::from(index)),
        ])
    }

    /// Derive the nullifier for a note at a leaf index
    pub fn derive_nullifier(&self, commitment: &Element, index: u32) -> Element {
        let signature = self.sign(commitment, index);
        self.hasher.hash(&[
            *commitment,
            Element::from_u64(u64::from(index)),
            signature,
        ])
    }
}

impl fmt::Debug for NullifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullifierKey")
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::PoseidonHasher;

    fn key(sk: u64) -> NullifierKey {
        NullifierKey::new(Element::from_u64(sk), Arc::new(PoseidonHasher::new()))
    }

    #[test]
    fn test_nullifier_deterministic() {
        let nk = key(9);
        let commitment = Element::from_u64(100);

        let n1 = nk.derive_nullifier(&commitment, 0);
        let n2 = nk.derive_nullifier(&commitment, 0);
        assert_eq!(n1, n2, "nullifier derivation must be deterministic");
    }

    #[test]
    fn test_different_positions_different_nullifiers() {
        let nk = key(9);
        let commitment = Element::from_u64(100);

        assert_ne!(
            nk.derive_nullifier(&commitment, 0),
            nk.derive_nullifier(&commitment, 1),
            "same note at different positions should have different nullifiers"
        );
    }

    #[test]
    fn test_different_keys_different_nullifiers() {
        let commitment = Element::from_u64(100);
        assert_ne!(
            key(1).derive_nullifier(&commitment, 3),
            key(2).derive_nullifier(&commitment, 3)
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", key(77));
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(&Element::from_u64(77).to_fixed_hex()));
    }
}
