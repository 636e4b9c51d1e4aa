use rand::rngs::OsRng;
use vanchor_privacy::{CommitmentScheme, DepositNote, Element, Keypair, Utxo};
use vanchor_proposals::{Address, AnchorUpdate, ResourceId, TypedChainId};

use super::fakes::{CHAIN_ID, FakeProver, ProverMode, anchor_address, plain_fixture};
use crate::anchor::{Anchor, TransactRequest, WithdrawRequest, encode_withdraw_calldata};
use crate::error::AnchorError;
use crate::proof::Groth16Proof;
use crate::services::LedgerCall;

fn chain() -> u64 {
    TypedChainId::evm(CHAIN_ID).as_u64()
}

#[tokio::test]
async fn test_deposit_then_withdraw() {
    let (mut anchor, ledger) = plain_fixture(FakeProver::new(ProverMode::Honest)).await;

    let first = anchor.deposit(chain()).await.unwrap();
    let second = anchor.deposit(chain()).await.unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(second.index, 1);
    assert_eq!(anchor.state().root(), ledger.root());

    let request = WithdrawRequest::new(second.note.clone(), second.index, Address([0x42; 20]));
    let receipt = anchor.withdraw(request.clone()).await.unwrap();
    assert_eq!(receipt.block_number, ledger.block());

    match ledger.calls().last() {
        Some(LedgerCall::Withdraw { calldata }) => {
            assert_eq!(calldata.len(), 256 + 64 + 32 + 20 + 20 + 32 + 32);
            assert_eq!(&calldata[256..288], anchor.state().root().as_bytes());
            assert_eq!(&calldata[320..352], second.note.nullifier_hash.as_bytes());
        }
        other => panic!("expected a withdraw call, got {:?}", other),
    }

    // Spent nullifiers are refused by the ledger
    let err = anchor.withdraw(request).await.unwrap_err();
    assert!(matches!(err, AnchorError::Ledger(_)));
}

#[tokio::test]
async fn test_withdraw_checks_leaf_position() {
    let (mut anchor, _ledger) = plain_fixture(FakeProver::new(ProverMode::Honest)).await;
    let first = anchor.deposit(chain()).await.unwrap();
    anchor.deposit(chain()).await.unwrap();

    let err = anchor
        .withdraw(WithdrawRequest::new(first.note.clone(), 1, Address::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, AnchorError::CommitmentNotFound(_)));

    let err = anchor
        .withdraw(WithdrawRequest::new(first.note, 7, Address::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, AnchorError::IndexOutOfRange { index: 7, .. }));
}

#[tokio::test]
async fn test_unsound_proof_is_never_submitted() {
    let (mut anchor, ledger) = plain_fixture(FakeProver::new(ProverMode::Unsound)).await;
    let deposit = anchor.deposit(chain()).await.unwrap();

    let err = anchor
        .withdraw(WithdrawRequest::new(deposit.note, deposit.index, Address::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, AnchorError::ProofVerificationFailed));
    assert_eq!(ledger.calls().len(), 1);
}

#[tokio::test]
async fn test_failed_deposit_is_not_inserted() {
    let (mut anchor, ledger) = plain_fixture(FakeProver::new(ProverMode::Honest)).await;
    ledger.fail_submissions(true);

    let err = anchor.deposit(chain()).await.unwrap_err();
    assert_eq!(err.to_string(), "ledger rejected deposit");
    assert!(anchor.state().tree().is_empty());
}

#[tokio::test]
async fn test_proposal_data_is_anchor_update() {
    let (mut anchor, ledger) = plain_fixture(FakeProver::new(ProverMode::Honest)).await;
    anchor.deposit(chain()).await.unwrap();

    let id = anchor.create_resource_id();
    let data = anchor.get_proposal_data(&id, None).await.unwrap();
    assert_eq!(data.len(), AnchorUpdate::LEN);

    let update = AnchorUpdate::decode(&data).unwrap();
    assert_eq!(update.chain_id, u64::from(CHAIN_ID));
    assert_eq!(update.block_height, ledger.block());
    assert_eq!(update.root, anchor.state().root().to_bytes());
}

#[tokio::test]
async fn test_legacy_resource_id_layout() {
    let (anchor, _ledger) = plain_fixture(FakeProver::new(ProverMode::Honest)).await;
    let id = anchor.create_resource_id();

    assert_eq!(id, ResourceId::legacy(&anchor_address(), CHAIN_ID));
    assert_eq!(&id.as_bytes()[..8], &[0u8; 8]);
    assert_eq!(&id.as_bytes()[8..28], anchor_address().as_bytes());
    assert_eq!(&id.as_bytes()[28..], &CHAIN_ID.to_be_bytes());
}

#[tokio::test]
async fn test_transact_is_unsupported() {
    let (mut anchor, ledger) = plain_fixture(FakeProver::new(ProverMode::Honest)).await;
    let scheme = CommitmentScheme::poseidon();
    let keypair = Keypair::random(&mut OsRng, scheme.hasher().as_ref()).unwrap();
    let output = Utxo::generate(&scheme, &mut OsRng, chain(), 10, Some(keypair.clone()), 31).unwrap();

    let request = TransactRequest {
        keypair,
        inputs: vec![],
        outputs: vec![output],
        fee: 0,
        refund: 0,
        recipient: Address::ZERO,
        relayer: Address::ZERO,
        token: None,
    };
    assert!(matches!(
        anchor.transact(request).await,
        Err(AnchorError::UnimplementedOperation("transact"))
    ));
    assert!(ledger.calls().is_empty());
}

#[test]
fn test_withdraw_calldata_layout() {
    let scheme = CommitmentScheme::poseidon();
    let note = DepositNote::generate(&scheme, &mut OsRng, chain(), 31, 31).unwrap();
    let mut request = WithdrawRequest::new(note.clone(), 0, Address([0x42; 20]));
    request.relayer = Address([0x43; 20]);
    request.fee = 5;
    request.refund = 1;

    let proof = Groth16Proof::from_words(&[Element::from_u64(9); 8]);
    let roots = [Element::from_u64(1), Element::from_u64(2)];
    let calldata = encode_withdraw_calldata(&proof, &roots, &request);

    assert_eq!(calldata.len(), 456);
    assert_eq!(&calldata[..256], proof.encode().as_slice());
    assert_eq!(&calldata[288..320], Element::from_u64(2).as_bytes());
    assert_eq!(&calldata[320..352], note.nullifier_hash.as_bytes());
    assert_eq!(&calldata[352..372], &[0x42; 20]);
    assert_eq!(&calldata[372..392], &[0x43; 20]);
    assert_eq!(calldata[423], 5);
    assert_eq!(calldata[455], 1);
}
