//! Note Commitments
//!
//! Binds a note's value and secret material into one field element, the
//! only representation of a note that ever reaches the accumulator.
//!
//! ```text
//! UTXO commitment    = H(chain_id, amount, owner_pk, blinding)
//! Deposit commitment = H(chain_id, nullifier, secret)
//! Nullifier hash     = H(nullifier, nullifier)
//! ```

use std::fmt;
use std::sync::Arc;

use crate::element::Element;
use crate::hasher::{FieldHasher, PoseidonHasher};

/// Commitment scheme over an injected field hasher
#[derive(Clone)]
pub struct CommitmentScheme {
    hasher: Arc<dyn FieldHasher>,
}

impl CommitmentScheme {
    pub fn new(hasher: Arc<dyn FieldHasher>) -> Self {
        Self { hasher }
    }

    /// Scheme backed by the default Poseidon hasher
    pub fn poseidon() -> Self {
        Self::new(Arc::new(PoseidonHasher::new()))
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHasher> {
        &self.hasher
    }

    /// Commitment of a variable-amount note
    pub fn commit_utxo(
        &self,
        chain_id: u64,
        amount: u128,
        owner_pk: &Element,
        blinding: &Element,
    ) -> Element {
        self.hasher.hash(&[
            Element::from_u64(chain_id),
            Element::from_u128(amount),
            *owner_pk,
            *blinding,
        ])
    }

    /// Commitment of a fixed-denomination deposit
    pub fn commit_deposit(&self, chain_id: u64, nullifier: &Element, secret: &Element) -> Element {
        self.hasher
            .hash(&[Element::from_u64(chain_id), *nullifier, *secret])
    }

    /// Public nullifier hash revealed when a deposit is withdrawn
    pub fn deposit_nullifier_hash(&self, nullifier: &Element) -> Element {
        self.hasher.hash_pair(nullifier, nullifier)
    }
}

impl Default for CommitmentScheme {
    fn default() -> Self {
        Self::poseidon()
    }
}

impl fmt::Debug for CommitmentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitmentScheme").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_deterministic() {
        let scheme = CommitmentScheme::poseidon();
        let pk = Element::from_u64(11);
        let blinding = Element::from_u64(42);

        let c1 = scheme.commit_utxo(1, 1000, &pk, &blinding);
        let c2 = scheme.commit_utxo(1, 1000, &pk, &blinding);
        assert_eq!(c1, c2, "commitment should be deterministic");
    }

    #[test]
    fn test_commitment_binds_every_field() {
        let scheme = CommitmentScheme::poseidon();
        let pk = Element::from_u64(11);
        let blinding = Element::from_u64(42);
        let base = scheme.commit_utxo(1, 1000, &pk, &blinding);

        assert_ne!(base, scheme.commit_utxo(2, 1000, &pk, &blinding));
        assert_ne!(base, scheme.commit_utxo(1, 1001, &pk, &blinding));
        assert_ne!(base, scheme.commit_utxo(1, 1000, &Element::from_u64(12), &blinding));
        assert_ne!(base, scheme.commit_utxo(1, 1000, &pk, &Element::from_u64(43)));
    }

    #[test]
    fn test_deposit_commitment_differs_from_nullifier_hash() {
        let scheme = CommitmentScheme::poseidon();
        let nullifier = Element::from_u64(5);
        let secret = Element::from_u64(6);

        let commitment = scheme.commit_deposit(1, &nullifier, &secret);
        let nullifier_hash = scheme.deposit_nullifier_hash(&nullifier);
        assert_ne!(commitment, nullifier_hash);
        assert_eq!(nullifier_hash, scheme.deposit_nullifier_hash(&nullifier));
    }
}
