//! Public Inputs
//!
//! The identity-linked circuit exposes its public signals as one flat list:
//!
//! ```text
//! [identityRoots(R_id), chainId, publicAmount, extDataHash,
//!  inputNullifiers(nIns), outputCommitments(nOuts), vanchorRoots(R_v)]
//! ```
//!
//! The slice boundaries come from `CircuitArity` and must match the arities
//! the assembler padded to.

use serde::{Deserialize, Serialize};
use vanchor_config::CircuitConfig;
use vanchor_privacy::Element;
use vanchor_proposals::EncodingError;

use crate::error::{AnchorError, AnchorResult};
use crate::proof::{Groth16Proof, split_words};

/// Fixed shape of one circuit instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitArity {
    pub n_ins: usize,
    pub n_outs: usize,
    pub identity_roots: usize,
    pub vanchor_roots: usize,
}

impl CircuitArity {
    pub fn new(circuit: &CircuitConfig, n_ins: usize) -> Self {
        Self {
            n_ins,
            n_outs: circuit.n_outs,
            identity_roots: circuit.identity_roots,
            vanchor_roots: circuit.vanchor_roots,
        }
    }

    /// Total number of public signals
    pub fn signal_count(&self) -> usize {
        self.identity_roots + 3 + self.n_ins + self.n_outs + self.vanchor_roots
    }
}

impl Default for CircuitArity {
    fn default() -> Self {
        Self::new(&CircuitConfig::default(), CircuitConfig::default().n_ins_small)
    }
}

/// Parsed public signals of an identity-linked transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPublicInputs {
    pub identity_roots: Vec<Element>,
    pub chain_id: Element,
    pub public_amount: Element,
    pub ext_data_hash: Element,
    pub input_nullifiers: Vec<Element>,
    pub output_commitments: Vec<Element>,
    pub vanchor_roots: Vec<Element>,
}

impl IdentityPublicInputs {
    pub fn arity(&self) -> CircuitArity {
        CircuitArity {
            n_ins: self.input_nullifiers.len(),
            n_outs: self.output_commitments.len(),
            identity_roots: self.identity_roots.len(),
            vanchor_roots: self.vanchor_roots.len(),
        }
    }

    pub fn from_signals(signals: &[Element], arity: &CircuitArity) -> AnchorResult<Self> {
        let expected = arity.signal_count();
        if signals.len() != expected {
            return Err(AnchorError::SignalCountMismatch {
                expected,
                actual: signals.len(),
            });
        }

        let mut offset = 0;
        let mut take = |n: usize| {
            let slice = signals[offset..offset + n].to_vec();
            offset += n;
            slice
        };

        let identity_roots = take(arity.identity_roots);
        let chain_id = take(1)[0];
        let public_amount = take(1)[0];
        let ext_data_hash = take(1)[0];
        let input_nullifiers = take(arity.n_ins);
        let output_commitments = take(arity.n_outs);
        let vanchor_roots = take(arity.vanchor_roots);

        Ok(Self {
            identity_roots,
            chain_id,
            public_amount,
            ext_data_hash,
            input_nullifiers,
            output_commitments,
            vanchor_roots,
        })
    }

    pub fn to_signals(&self) -> Vec<Element> {
        let mut out = Vec::with_capacity(self.arity().signal_count());
        out.extend_from_slice(&self.identity_roots);
        out.push(self.chain_id);
        out.push(self.public_amount);
        out.push(self.ext_data_hash);
        out.extend_from_slice(&self.input_nullifiers);
        out.extend_from_slice(&self.output_commitments);
        out.extend_from_slice(&self.vanchor_roots);
        out
    }
}

/// `proof(256) || public signals (32 each)`
pub fn encode_transact_calldata(proof: &Groth16Proof, inputs: &IdentityPublicInputs) -> Vec<u8> {
    let signals = inputs.to_signals();
    let mut out = proof.encode();
    out.reserve(signals.len() * 32);
    for signal in &signals {
        out.extend_from_slice(signal.as_bytes());
    }
    out
}

pub fn decode_transact_calldata(
    bytes: &[u8],
    arity: &CircuitArity,
) -> AnchorResult<(Groth16Proof, IdentityPublicInputs)> {
    let expected = Groth16Proof::ENCODED_LEN + arity.signal_count() * 32;
    if bytes.len() != expected {
        return Err(EncodingError::EncodingLengthMismatch {
            expected,
            actual: bytes.len(),
        }
        .into());
    }
    let (proof_bytes, signal_bytes) = bytes.split_at(Groth16Proof::ENCODED_LEN);
    let proof = Groth16Proof::decode(proof_bytes)?;
    let signals = split_words(signal_bytes)?;
    let inputs = IdentityPublicInputs::from_signals(&signals, arity)?;
    Ok((proof, inputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(start: u64, n: usize) -> Vec<Element> {
        (start..start + n as u64).map(Element::from_u64).collect()
    }

    fn inputs() -> IdentityPublicInputs {
        IdentityPublicInputs {
            identity_roots: numbered(1, 2),
            chain_id: Element::from_u64(3),
            public_amount: Element::from_u64(4),
            ext_data_hash: Element::from_u64(5),
            input_nullifiers: numbered(6, 2),
            output_commitments: numbered(8, 2),
            vanchor_roots: numbered(10, 2),
        }
    }

    #[test]
    fn test_signal_order() {
        let signals = inputs().to_signals();
        assert_eq!(signals, numbered(1, 11));
        assert_eq!(CircuitArity::default().signal_count(), 11);
    }

    #[test]
    fn test_slices_follow_arity() {
        let arity = CircuitArity {
            n_ins: 16,
            n_outs: 2,
            identity_roots: 2,
            vanchor_roots: 2,
        };
        let signals = numbered(100, arity.signal_count());
        let parsed = IdentityPublicInputs::from_signals(&signals, &arity).unwrap();

        assert_eq!(parsed.chain_id, Element::from_u64(102));
        assert_eq!(parsed.input_nullifiers.len(), 16);
        assert_eq!(parsed.input_nullifiers[0], Element::from_u64(105));
        assert_eq!(parsed.output_commitments[0], Element::from_u64(121));
        assert_eq!(parsed.vanchor_roots, numbered(123, 2));
        assert_eq!(parsed.arity(), arity);
    }

    #[test]
    fn test_wrong_signal_count() {
        let err = IdentityPublicInputs::from_signals(&numbered(0, 10), &CircuitArity::default()).unwrap_err();
        assert!(matches!(
            err,
            AnchorError::SignalCountMismatch { expected: 11, actual: 10 }
        ));
    }

    #[test]
    fn test_calldata_roundtrip() {
        let proof = Groth16Proof::from_words(&numbered(50, 8).try_into().unwrap());
        let inputs = inputs();
        let calldata = encode_transact_calldata(&proof, &inputs);
        assert_eq!(calldata.len(), 256 + 11 * 32);

        let (decoded_proof, decoded_inputs) = decode_transact_calldata(&calldata, &CircuitArity::default()).unwrap();
        assert_eq!(decoded_proof.to_words().to_vec(), numbered(50, 8));
        assert_eq!(decoded_inputs, inputs);

        assert!(matches!(
            decode_transact_calldata(&calldata[1..], &CircuitArity::default()),
            Err(AnchorError::Encoding(EncodingError::EncodingLengthMismatch { .. }))
        ));
    }
}
