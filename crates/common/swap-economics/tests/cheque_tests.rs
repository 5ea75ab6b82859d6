mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use swap_economics::{sign_cheque, InMemoryStateStore, Swap, SwapConfig, SwapError};
use swap_identity::{KeyPair, Owner};
use swap_types::{ChequeError, EmitChequeMsg};

struct Pair {
    alice: Swap,
    bob: Swap,
    alice_key: KeyPair,
    bob_key: KeyPair,
    /// Alice's handle on Bob; records what Alice sends.
    to_bob: Arc<RecordingPeer>,
}

// Alice is peer 1 on Bob's side, Bob is peer 2 on Alice's side.
async fn pair() -> Pair {
    let alice_key = KeyPair::generate();
    let bob_key = KeyPair::generate();
    let config = SwapConfig::with_thresholds(100, 1_000);

    let alice = new_swap(
        Arc::new(InMemoryStateStore::new()),
        alice_key.clone(),
        config.clone(),
    );
    let bob = new_swap(Arc::new(InMemoryStateStore::new()), bob_key.clone(), config);

    let to_bob = Arc::new(RecordingPeer::with_addresses(
        peer_id(2),
        bob_key.address,
        bob_key.address,
    ));
    alice.add_peer(to_bob.clone()).await;
    bob.add_peer(Arc::new(RecordingPeer::with_addresses(
        peer_id(1),
        alice_key.address,
        alice_key.address,
    )))
    .await;

    Pair { alice, bob, alice_key, bob_key, to_bob }
}

#[tokio::test]
async fn received_cheque_is_stored_and_credited() {
    let p = pair().await;
    let (alice_id, bob_id) = (peer_id(1), peer_id(2));

    // Bob served Alice: Bob's side sees a positive balance
    p.bob.add(101, &alice_id).await.unwrap();
    p.alice.add(-101, &bob_id).await.unwrap();

    let msg = p.to_bob.sent().pop().unwrap();
    assert_eq!(msg.cheque.params.beneficiary, p.bob_key.address);
    p.bob.handle_emit_cheque(&alice_id, msg.clone()).await.unwrap();

    assert_eq!(p.bob.balance(&alice_id).await.unwrap(), 0);
    assert_eq!(
        p.bob.load_last_received_cheque(&alice_id).await.unwrap(),
        Some(msg.cheque.clone())
    );

    // Replaying the same cheque is refused
    let err = p.bob.handle_emit_cheque(&alice_id, msg).await.unwrap_err();
    assert!(matches!(err, SwapError::Cheque(ChequeError::StaleSerial { serial: 1, last: 1 })));
    assert_eq!(p.bob.balance(&alice_id).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_write_of_received_cheque_changes_nothing() {
    let p = pair().await;
    let alice_id = peer_id(1);
    let store = Arc::new(FlakyStore::default());
    let bob = new_swap(store.clone(), p.bob_key.clone(), SwapConfig::with_thresholds(100, 1_000));
    bob.add_peer(Arc::new(RecordingPeer::with_addresses(
        alice_id,
        p.alice_key.address,
        p.alice_key.address,
    )))
    .await;

    bob.add(120, &alice_id).await.unwrap();
    p.alice.add(-120, &peer_id(2)).await.unwrap();
    let msg = p.to_bob.sent().pop().unwrap();

    store.fail_batches.store(true, Ordering::SeqCst);
    assert!(matches!(
        bob.handle_emit_cheque(&alice_id, msg.clone()).await,
        Err(SwapError::Store(_))
    ));
    assert_eq!(bob.balance(&alice_id).await.unwrap(), 120);
    assert!(bob.load_last_received_cheque(&alice_id).await.unwrap().is_none());

    // The same cheque is still accepted once the store recovers
    store.fail_batches.store(false, Ordering::SeqCst);
    bob.handle_emit_cheque(&alice_id, msg).await.unwrap();
    assert_eq!(bob.balance(&alice_id).await.unwrap(), 0);
}

#[tokio::test]
async fn cheque_signed_by_someone_else_is_invalid() {
    let p = pair().await;
    let alice_id = peer_id(1);

    p.alice.add(-150, &peer_id(2)).await.unwrap();
    let mut msg = p.to_bob.sent().pop().unwrap();

    let mallory = Owner::new(KeyPair::generate(), msg.cheque.params.contract);
    let mut params = msg.cheque.params.clone();
    params.amount = 1_000_000;
    msg.cheque = sign_cheque(params, &mallory).unwrap();

    let err = p.bob.handle_emit_cheque(&alice_id, msg).await.unwrap_err();
    assert!(matches!(err, SwapError::Cheque(ChequeError::InvalidSignature)));
    assert!(p.bob.load_last_received_cheque(&alice_id).await.unwrap().is_none());
}

#[tokio::test]
async fn cheque_for_another_beneficiary_is_refused() {
    let p = pair().await;
    let owner = Owner::new(p.alice_key.clone(), CONTRACT);
    let mut params = {
        p.alice.add(-150, &peer_id(2)).await.unwrap();
        p.to_bob.sent().pop().unwrap().cheque.params
    };
    params.beneficiary = p.alice_key.address;
    let msg = EmitChequeMsg { cheque: sign_cheque(params, &owner).unwrap() };

    let err = p.bob.handle_emit_cheque(&peer_id(1), msg).await.unwrap_err();
    assert!(matches!(err, SwapError::Cheque(ChequeError::WrongBeneficiary { .. })));
}

#[tokio::test]
async fn cumulative_amount_may_not_shrink() {
    let p = pair().await;
    let alice_id = peer_id(1);
    let owner = Owner::new(p.alice_key.clone(), CONTRACT);

    p.alice.add(-150, &peer_id(2)).await.unwrap();
    let first = p.to_bob.sent().pop().unwrap();
    p.bob.handle_emit_cheque(&alice_id, first.clone()).await.unwrap();

    let mut params = first.cheque.params.clone();
    params.serial = 2;
    params.amount = 100;
    let msg = EmitChequeMsg { cheque: sign_cheque(params, &owner).unwrap() };
    let err = p.bob.handle_emit_cheque(&alice_id, msg).await.unwrap_err();
    assert!(matches!(
        err,
        SwapError::Cheque(ChequeError::DecreasingAmount { amount: 100, last: 150 })
    ));
}

#[tokio::test]
async fn cheque_from_unknown_peer_is_refused() {
    let p = pair().await;
    p.alice.add(-150, &peer_id(2)).await.unwrap();
    let msg = p.to_bob.sent().pop().unwrap();
    let err = p.bob.handle_emit_cheque(&peer_id(7), msg).await.unwrap_err();
    assert!(matches!(err, SwapError::UnknownPeer(_)));
}

#[tokio::test]
async fn save_and_load_last_received_cheque() {
    let p = pair().await;
    let alice_id = peer_id(1);
    p.alice.add(-120, &peer_id(2)).await.unwrap();
    let cheque = p.to_bob.sent().pop().unwrap().cheque;

    assert!(p.bob.load_last_received_cheque(&alice_id).await.unwrap().is_none());
    p.bob.save_last_received_cheque(&alice_id, cheque.clone()).await.unwrap();
    assert_eq!(
        p.bob.load_last_received_cheque(&alice_id).await.unwrap(),
        Some(cheque)
    );
}

#[tokio::test]
async fn deploy_moves_cheques_to_new_contract() {
    let chain = Arc::new(HappyChain::default());
    let keypair = KeyPair::generate();
    let swap = Swap::new(
        Arc::new(InMemoryStateStore::new()),
        keypair.clone(),
        CONTRACT,
        settlement(chain.clone()),
    )
    .with_config(SwapConfig::with_thresholds(100, 1_000));

    assert_eq!(swap.contract().await, CONTRACT);
    let address = swap.deploy(None).await.unwrap();
    assert_eq!(address, DEPLOYED);
    assert_eq!(swap.contract().await, DEPLOYED);
    assert_eq!(swap.owner().await.address, keypair.address);

    let summary = swap.deploy_success().await;
    assert!(summary.contains(&DEPLOYED.to_string()));
    assert!(summary.contains(&keypair.address.to_string()));

    let p = peer_id(3);
    let peer = RecordingPeer::new(p);
    swap.add_peer(peer.clone()).await;
    swap.add(-100, &p).await.unwrap();
    assert_eq!(peer.sent()[0].cheque.params.contract, DEPLOYED);
}

#[tokio::test]
async fn contract_checks_go_through_settlement() {
    let chain = Arc::new(HappyChain::default());
    *chain.issuer.lock().unwrap() = Some(swap_types::Address([0x77; 20]));
    let swap = Swap::new(
        Arc::new(InMemoryStateStore::new()),
        KeyPair::generate(),
        CONTRACT,
        settlement(chain),
    );

    swap.verify_contract(DEPLOYED).await.unwrap();
    assert!(matches!(
        swap.verify_contract(CONTRACT).await,
        Err(SwapError::Contract(_))
    ));
    assert_eq!(
        swap.get_contract_owner(DEPLOYED).await.unwrap(),
        swap_types::Address([0x77; 20])
    );
}
