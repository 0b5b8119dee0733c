use serde_json::json;
use std::sync::Arc;
use vex_client::{
    amount::{
        LedgerAmount,
        ONE_NEAR,
    },
    catalog::MatchCatalog,
    error::GatewayError,
    gateway::{
        ContractGateway,
        MAKE_BET,
        VIEW_BETS,
        VIEW_MATCHES,
        VIEW_POTENTIAL_WINNINGS,
    },
    model::Match,
    test_helpers::{
        FakeWallet,
        RecordedCall,
    },
};

const CONTRACT: &str = "vex.testnet";

fn gateway(wallet: &FakeWallet) -> ContractGateway<FakeWallet> {
    ContractGateway::new(CONTRACT, Arc::new(wallet.clone())).unwrap()
}

#[test]
fn new__rejects_empty_contract_id() {
    let wallet = FakeWallet::new();

    assert!(ContractGateway::new("  ", Arc::new(wallet)).is_err());
}

#[tokio::test]
async fn get_matches__queries_all_and_keeps_server_order() {
    // given
    let wallet = FakeWallet::new();
    wallet.respond_view(
        VIEW_MATCHES,
        Ok(json!([
            ["m2", "C", 1.1, "D", 3.0, null, false],
            ["m1", "A", 1.5, "B", 2.5, null, false]
        ])),
    );
    let gateway = gateway(&wallet);

    // when
    let matches = gateway.get_matches().await.unwrap();

    // then
    let ids: Vec<_> = matches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m2", "m1"]);
    assert_eq!(
        wallet.calls(),
        vec![RecordedCall::View {
            contract_id: CONTRACT.to_string(),
            method: VIEW_MATCHES.to_string(),
            args: json!({ "match_id": "all" }),
        }]
    );
}

#[tokio::test]
async fn get_potential_winnings__passes_stake_text_through() {
    // given
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_POTENTIAL_WINNINGS, Ok(json!(4.2)));
    let gateway = gateway(&wallet);

    // when
    let value = gateway
        .get_potential_winnings("m1", "B", "10")
        .await
        .unwrap();

    // then
    assert_eq!(value, 4.2);
    let calls = wallet.calls_to(VIEW_POTENTIAL_WINNINGS);
    assert_eq!(
        calls[0].args(),
        &json!({ "match_id": "m1", "team": "B", "bet_amount": "10" })
    );
}

#[tokio::test]
async fn query__works_without_session() {
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_BETS, Ok(json!([])));
    let gateway = gateway(&wallet);

    let bets = gateway.get_bets("m1", None).await.unwrap();

    assert!(bets.is_empty());
    assert_eq!(
        wallet.calls_to(VIEW_BETS)[0].args(),
        &json!({ "match_id": "m1", "name": "all" })
    );
}

#[tokio::test]
async fn get_bets__decodes_records_for_account() {
    let wallet = FakeWallet::new();
    wallet.respond_view(
        VIEW_BETS,
        Ok(json!([{
            "bettor": "alice.testnet",
            "decision": "B",
            "bet_amount": 10.0,
            "potential_winnings": 26.5,
            "payed_out": false
        }])),
    );
    let gateway = gateway(&wallet);

    let bets = gateway
        .get_bets("m1", Some("alice.testnet"))
        .await
        .unwrap();

    assert_eq!(bets[0].decision, "B");
    assert_eq!(bets[0].potential_winnings, 26.5);
    assert_eq!(
        wallet.calls_to(VIEW_BETS)[0].args()["name"],
        json!("alice.testnet")
    );
}

#[tokio::test]
async fn query__unexpected_shape_is_contract_error() {
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_POTENTIAL_WINNINGS, Ok(json!("not a number")));
    let gateway = gateway(&wallet);

    let err = gateway
        .get_potential_winnings("m1", "B", "10")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Contract { .. }));
}

#[tokio::test]
async fn query__propagates_wallet_errors_unchanged() {
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_MATCHES, Err(GatewayError::rpc("connection refused")));
    let gateway = gateway(&wallet);

    let err = gateway.get_matches().await.unwrap_err();

    assert_eq!(err, GatewayError::rpc("connection refused"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn mutate__without_session_never_reaches_wallet() {
    // given
    let wallet = FakeWallet::new();
    let gateway = gateway(&wallet);

    // when
    let err = gateway
        .place_bet("m1", "B", LedgerAmount::from_yocto(ONE_NEAR))
        .await
        .unwrap_err();

    // then
    assert_eq!(err, GatewayError::not_authorized(MAKE_BET));
    assert!(wallet.calls().is_empty());
}

#[tokio::test]
async fn place_bet__sends_decision_and_deposit() {
    let wallet = FakeWallet::signed_in("alice.testnet");
    let gateway = gateway(&wallet);
    let deposit = LedgerAmount::from_yocto(2 * ONE_NEAR);

    let outcome = gateway.place_bet("m1", "B", deposit).await.unwrap();

    assert!(!outcome.transaction_hash.is_empty());
    assert_eq!(
        wallet.calls(),
        vec![RecordedCall::Call {
            contract_id: CONTRACT.to_string(),
            method: MAKE_BET.to_string(),
            args: json!({ "match_id": "m1", "decision": "B" }),
            deposit,
        }]
    );
}

#[tokio::test]
async fn catalog_load__issues_exactly_one_query() {
    // given
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_MATCHES, Ok(json!([["m1", "A", 1.5, "B", 2.5]])));
    let gateway = gateway(&wallet);

    // when
    let catalog = MatchCatalog::load(&gateway).await.unwrap();

    // then
    assert_eq!(catalog.matches(), &[Match::new("m1", "A", 1.5, "B", 2.5)]);
    assert!(catalog.fetched_at().is_some());
    assert_eq!(wallet.calls_to(VIEW_MATCHES).len(), 1);
}

#[tokio::test]
async fn catalog_refresh__keeps_snapshot_on_failure() {
    let wallet = FakeWallet::new();
    wallet.push_view(VIEW_MATCHES, Ok(json!([["m1", "A", 1.5, "B", 2.5]])));
    wallet.push_view(VIEW_MATCHES, Err(GatewayError::rpc("timeout")));
    let gateway = gateway(&wallet);
    let mut catalog = MatchCatalog::load(&gateway).await.unwrap();

    let result = catalog.refresh(&gateway).await;

    assert!(result.is_err());
    assert_eq!(catalog.len(), 1);
}
