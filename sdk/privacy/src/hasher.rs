//! Field Hash Adapter
//!
//! All commitments, nullifiers, keys, and Merkle nodes go through one
//! injected hash over small tuples of field elements. The default backend is
//! a Poseidon sponge over BN254; tests may swap in any deterministic hasher.
//!
//! ```text
//! hash(x_1, ..., x_n) = Poseidon(n, x_1, ..., x_n)
//! ```

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use sha3::{Digest, Keccak256};

use crate::element::Element;

/// Deterministic hash of a fixed-arity tuple of field elements
pub trait FieldHasher: Send + Sync {
    fn hash(&self, inputs: &[Element]) -> Element;

    /// Parent node of two Merkle children
    fn hash_pair(&self, left: &Element, right: &Element) -> Element {
        self.hash(&[*left, *right])
    }

    /// Value of an unset leaf
    fn zero_leaf(&self) -> Element {
        default_zero_leaf()
    }
}

/// `keccak256("tornado") mod p`, the conventional empty-leaf value
pub fn default_zero_leaf() -> Element {
    let digest = Keccak256::digest(b"tornado");
    Element::from_be_bytes_mod_order(&digest)
}

/// Poseidon sponge hasher over BN254
#[derive(Clone)]
pub struct PoseidonHasher {
    config: PoseidonConfig<Fr>,
}

impl PoseidonHasher {
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldHasher for PoseidonHasher {
    fn hash(&self, inputs: &[Element]) -> Element {
        let mut sponge = PoseidonSponge::new(&self.config);

        // Arity is absorbed first so tuples of different length never collide
        sponge.absorb(&Fr::from(inputs.len() as u64));
        for input in inputs {
            sponge.absorb(&input.to_field());
        }

        let result: Fr = sponge.squeeze_field_elements(1)[0];
        Element::from_field(result)
    }
}

/// Poseidon parameters
///
/// Field: BN254 Fr (254 bits)
/// Rate: 2, Capacity: 1
/// Security: 128 bits
fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits: u64 = 254;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let hasher = PoseidonHasher::new();
        let a = Element::from_u64(1);
        let b = Element::from_u64(2);
        assert_eq!(hasher.hash(&[a, b]), hasher.hash(&[a, b]));
        assert_eq!(hasher.hash_pair(&a, &b), hasher.hash(&[a, b]));
    }

    #[test]
    fn test_order_and_arity_matter() {
        let hasher = PoseidonHasher::new();
        let a = Element::from_u64(1);
        let b = Element::from_u64(2);
        assert_ne!(hasher.hash(&[a, b]), hasher.hash(&[b, a]));
        assert_ne!(hasher.hash(&[a, b]), hasher.hash(&[a, b, Element::ZERO]));
    }

    #[test]
    fn test_zero_leaf_is_reduced() {
        let zero = default_zero_leaf();
        assert!(!zero.is_zero());
        assert_eq!(Element::from_field(zero.to_field()), zero);
    }
}
