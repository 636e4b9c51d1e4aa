//! Groth16 Proof Calldata
//!
//! The verifier contract takes a proof as 8 big-endian words. The G2 point
//! `B` is written with its two Fq2 limbs swapped (c1 before c0), which is the
//! order the EVM pairing precompile expects:
//!
//! ```text
//! [A.x, A.y, B.x.c1, B.x.c0, B.y.c1, B.y.c0, C.x, C.y]   // 8 x 32 bytes
//! ```

use ark_bn254::{Bn254, Fq};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::Proof;
use serde::{Deserialize, Serialize};
use vanchor_privacy::Element;
use vanchor_proposals::EncodingError;

/// Groth16 proof in prover orientation: `pi_b[i] = [c0, c1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: [Element; 2],
    pub pi_b: [[Element; 2]; 2],
    pub pi_c: [Element; 2],
}

impl Groth16Proof {
    pub const ENCODED_LEN: usize = 8 * 32;

    /// Convert an arkworks proof
    pub fn from_ark(proof: &Proof<Bn254>) -> Self {
        Self {
            pi_a: [fq_word(proof.a.x), fq_word(proof.a.y)],
            pi_b: [
                [fq_word(proof.b.x.c0), fq_word(proof.b.x.c1)],
                [fq_word(proof.b.y.c0), fq_word(proof.b.y.c1)],
            ],
            pi_c: [fq_word(proof.c.x), fq_word(proof.c.y)],
        }
    }

    /// The 8 calldata words, B limbs swapped
    pub fn to_words(&self) -> [Element; 8] {
        [
            self.pi_a[0],
            self.pi_a[1],
            self.pi_b[0][1],
            self.pi_b[0][0],
            self.pi_b[1][1],
            self.pi_b[1][0],
            self.pi_c[0],
            self.pi_c[1],
        ]
    }

    pub fn from_words(words: &[Element; 8]) -> Self {
        Self {
            pi_a: [words[0], words[1]],
            pi_b: [[words[3], words[2]], [words[5], words[4]]],
            pi_c: [words[6], words[7]],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        for word in self.to_words() {
            out.extend_from_slice(word.as_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(EncodingError::EncodingLengthMismatch {
                expected: Self::ENCODED_LEN,
                actual: bytes.len(),
            });
        }
        let words = split_words(bytes)?;
        let words: [Element; 8] = words
            .try_into()
            .map_err(|w: Vec<Element>| EncodingError::EncodingLengthMismatch {
                expected: 8,
                actual: w.len(),
            })?;
        Ok(Self::from_words(&words))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.encode()))
    }
}

/// Base-field coordinate as a big-endian word (not reduced into the scalar field)
fn fq_word(f: Fq) -> Element {
    let bytes = f.into_bigint().to_bytes_be();
    let mut arr = [0u8; 32];
    arr[32 - bytes.len()..].copy_from_slice(&bytes);
    Element(arr)
}

/// Concatenate roots into the single calldata argument the anchor expects
pub fn create_roots_bytes(roots: &[Element]) -> Vec<u8> {
    let mut out = Vec::with_capacity(roots.len() * 32);
    for root in roots {
        out.extend_from_slice(root.as_bytes());
    }
    out
}

/// Split a byte string into 32-byte words
pub fn split_words(bytes: &[u8]) -> Result<Vec<Element>, EncodingError> {
    if bytes.len() % 32 != 0 {
        return Err(EncodingError::EncodingLengthMismatch {
            expected: bytes.len().next_multiple_of(32),
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(32)
        .map(|chunk| {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(chunk);
            Element(arr)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{G1Affine, G2Affine};
    use ark_ec::AffineRepr;

    fn sample() -> Groth16Proof {
        let w = |n: u64| Element::from_u64(n);
        Groth16Proof {
            pi_a: [w(1), w(2)],
            pi_b: [[w(3), w(4)], [w(5), w(6)]],
            pi_c: [w(7), w(8)],
        }
    }

    #[test]
    fn test_b_limbs_are_swapped() {
        let bytes = sample().encode();
        assert_eq!(bytes.len(), 256);

        let order: Vec<u8> = bytes.chunks(32).map(|c| c[31]).collect();
        assert_eq!(order, vec![1, 2, 4, 3, 6, 5, 7, 8]);
    }

    #[test]
    fn test_decode_restores_orientation() {
        let proof = sample();
        assert_eq!(Groth16Proof::decode(&proof.encode()).unwrap(), proof);
        assert!(matches!(
            Groth16Proof::decode(&[0u8; 255]),
            Err(EncodingError::EncodingLengthMismatch { expected: 256, actual: 255 })
        ));
    }

    #[test]
    fn test_from_ark_uses_big_endian_coordinates() {
        let ark = Proof::<Bn254> {
            a: G1Affine::generator(),
            b: G2Affine::generator(),
            c: G1Affine::generator(),
        };
        let proof = Groth16Proof::from_ark(&ark);

        // BN254 G1 generator is (1, 2)
        assert_eq!(proof.pi_a, [Element::from_u64(1), Element::from_u64(2)]);
        assert_eq!(proof.pi_c, proof.pi_a);
        assert_eq!(proof.pi_b[0][0], fq_word(ark.b.x.c0));
        assert_eq!(proof.encode()[64..96], fq_word(ark.b.x.c1).0);
    }

    #[test]
    fn test_roots_bytes() {
        let roots = [Element::from_u64(9), Element::ZERO];
        let bytes = create_roots_bytes(&roots);
        assert_eq!(bytes.len(), 64);
        assert_eq!(bytes[31], 9);
        assert_eq!(split_words(&bytes).unwrap(), roots.to_vec());
        assert!(split_words(&bytes[..40]).is_err());
    }
}
