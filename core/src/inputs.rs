//! Witness Inputs
//!
//! Private and public signals handed to the proof service. Field names on the
//! wire follow the circuit signal names so a witness can be serialized
//! straight into a prover's input file.

use serde::{Deserialize, Serialize};
use vanchor_privacy::Element;

use crate::public_inputs::IdentityPublicInputs;

/// Witness for an identity-linked transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityWitness {
    pub private_key: Element,
    #[serde(rename = "semaphoreTreePathIndices")]
    pub identity_path_indices: Vec<u8>,
    #[serde(rename = "semaphoreTreeSiblings")]
    pub identity_path_elements: Vec<Element>,
    #[serde(rename = "semaphoreRoots")]
    pub identity_roots: Vec<Element>,
    #[serde(rename = "chainID")]
    pub chain_id: Element,
    pub public_amount: Element,
    pub ext_data_hash: Element,

    pub input_nullifier: Vec<Element>,
    pub in_amount: Vec<Element>,
    pub in_private_key: Vec<Element>,
    pub in_blinding: Vec<Element>,
    /// Leaf index of each input (0 for dummies)
    pub in_path_indices: Vec<Element>,
    pub in_path_elements: Vec<Vec<Element>>,

    pub output_commitment: Vec<Element>,
    #[serde(rename = "outChainID")]
    pub out_chain_id: Vec<Element>,
    pub out_amount: Vec<Element>,
    pub out_pubkey: Vec<Element>,
    pub out_blinding: Vec<Element>,
    #[serde(rename = "outSemaphoreTreePathIndices")]
    pub out_identity_path_indices: Vec<Vec<u8>>,
    #[serde(rename = "outSemaphoreTreeElements")]
    pub out_identity_path_elements: Vec<Vec<Element>>,

    pub vanchor_roots: Vec<Element>,
}

impl IdentityWitness {
    /// Public signals a correct proof over this witness must expose
    pub fn public_inputs(&self) -> IdentityPublicInputs {
        IdentityPublicInputs {
            identity_roots: self.identity_roots.clone(),
            chain_id: self.chain_id,
            public_amount: self.public_amount,
            ext_data_hash: self.ext_data_hash,
            input_nullifiers: self.input_nullifier.clone(),
            output_commitments: self.output_commitment.clone(),
            vanchor_roots: self.vanchor_roots.clone(),
        }
    }
}

/// Witness for a fixed-denomination withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawWitness {
    pub nullifier_hash: Element,
    pub recipient: Element,
    pub relayer: Element,
    pub fee: Element,
    pub refund: Element,
    #[serde(rename = "chainID")]
    pub chain_id: Element,
    pub roots: Vec<Element>,

    pub nullifier: Element,
    pub secret: Element,
    pub path_elements: Vec<Element>,
    pub path_indices: Vec<u8>,
    /// `roots[i] - root` for the root the path proves against
    pub diffs: Vec<Element>,
}

impl WithdrawWitness {
    /// `[nullifierHash, recipient, relayer, fee, refund, chainID, roots...]`
    pub fn public_signals(&self) -> Vec<Element> {
        let mut out = vec![
            self.nullifier_hash,
            self.recipient,
            self.relayer,
            self.fee,
            self.refund,
            self.chain_id,
        ];
        out.extend_from_slice(&self.roots);
        out
    }
}

/// Everything a proof service can be asked to prove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "circuit", rename_all = "snake_case")]
pub enum Witness {
    Identity(IdentityWitness),
    Withdraw(WithdrawWitness),
}

impl Witness {
    pub fn public_signals(&self) -> Vec<Element> {
        match self {
            Witness::Identity(w) => w.public_inputs().to_signals(),
            Witness::Withdraw(w) => w.public_signals(),
        }
    }

    pub fn circuit_name(&self) -> &'static str {
        match self {
            Witness::Identity(_) => "identity_vanchor",
            Witness::Withdraw(_) => "anchor_withdraw",
        }
    }

    /// Prover input JSON (the witness fields without the circuit tag)
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Witness::Identity(w) => serde_json::to_value(w),
            Witness::Withdraw(w) => serde_json::to_value(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn withdraw() -> WithdrawWitness {
        WithdrawWitness {
            nullifier_hash: Element::from_u64(1),
            recipient: Element::from_u64(2),
            relayer: Element::from_u64(3),
            fee: Element::from_u64(4),
            refund: Element::from_u64(5),
            chain_id: Element::from_u64(6),
            roots: vec![Element::from_u64(7), Element::ZERO],
            nullifier: Element::from_u64(8),
            secret: Element::from_u64(9),
            path_elements: vec![Element::ZERO; 3],
            path_indices: vec![0, 1, 0],
            diffs: vec![Element::ZERO, Element::from_u64(7)],
        }
    }

    #[test]
    fn test_withdraw_public_signal_order() {
        let signals = Witness::Withdraw(withdraw()).public_signals();
        assert_eq!(signals.len(), 8);
        assert_eq!(signals[0], Element::from_u64(1));
        assert_eq!(signals[5], Element::from_u64(6));
        assert_eq!(signals[6], Element::from_u64(7));
    }

    #[test]
    fn test_json_uses_circuit_signal_names() {
        let json = Witness::Withdraw(withdraw()).to_json().unwrap();
        assert!(json.get("nullifierHash").is_some());
        assert!(json.get("chainID").is_some());
        assert!(json.get("pathIndices").is_some());
        assert!(json.get("circuit").is_none());
        assert_eq!(json["diffs"][1], Element::from_u64(7).to_fixed_hex());
    }
}
