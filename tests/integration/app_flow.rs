use serde_json::json;
use std::{
    sync::Arc,
    time::Duration,
};
use vex_client::{
    app::AppController,
    error::GatewayError,
    gateway::{
        ContractGateway,
        MAKE_BET,
        VIEW_BETS,
        VIEW_MATCHES,
        VIEW_POTENTIAL_WINNINGS,
    },
    model::Side,
    test_helpers::FakeWallet,
};

fn matches_payload() -> serde_json::Value {
    json!([
        ["m1", "A", 1.5, "B", 2.5, null, false],
        ["m2", "C", 1.1, "D", 3.0, null, false]
    ])
}

async fn controller(wallet: &FakeWallet) -> AppController<FakeWallet> {
    wallet.respond_view(VIEW_MATCHES, Ok(matches_payload()));
    let gateway = ContractGateway::new("vex.testnet", Arc::new(wallet.clone())).unwrap();
    let mut controller = AppController::new(gateway, Duration::ZERO, "Testnet");
    controller.start_up().await;
    controller
}

#[tokio::test]
async fn start_up__loads_catalog_once_and_restores_session() {
    // given
    let wallet = FakeWallet::signed_in("alice.testnet");

    // when
    let controller = controller(&wallet).await;

    // then
    let snap = controller.snapshot();
    assert!(snap.signed_in);
    assert_eq!(snap.account.as_deref(), Some("alice.testnet"));
    assert_eq!(snap.matches.len(), 2);
    assert_eq!(wallet.calls_to(VIEW_MATCHES).len(), 1);
}

#[tokio::test]
async fn start_up__catalog_failure_is_reported_not_fatal() {
    let wallet = FakeWallet::new();
    wallet.push_view(VIEW_MATCHES, Err(GatewayError::rpc("connection refused")));
    let gateway = ContractGateway::new("vex.testnet", Arc::new(wallet.clone())).unwrap();
    let mut controller = AppController::new(gateway, Duration::ZERO, "Testnet");

    controller.start_up().await;

    assert!(controller.catalog().is_empty());
    assert!(controller.errors()[0].contains("connection refused"));
}

#[tokio::test]
async fn select_match__without_session_never_shows_form() {
    // given
    let wallet = FakeWallet::new();
    let mut controller = controller(&wallet).await;

    // when
    let refused = !controller.select_at_cursor();
    controller.select_match("m1");

    // then
    assert!(refused);
    let snap = controller.snapshot();
    assert!(!snap.selection_enabled);
    assert_eq!(controller.selection().selected(), Some("m1"));
    assert!(snap.form.is_none());
    assert!(controller.set_stake("10").is_none());
    assert!(controller.begin_submission().is_none());
    assert!(wallet.calls_to(VIEW_POTENTIAL_WINNINGS).is_empty());
}

#[tokio::test]
async fn toggle_session__sign_out_clears_selection_and_form() {
    let wallet = FakeWallet::signed_in("alice.testnet");
    let mut controller = controller(&wallet).await;
    assert!(controller.select_at_cursor());
    controller.set_side(Side::team("A"));
    assert!(controller.snapshot().form.is_some());

    controller.toggle_session().await;

    let snap = controller.snapshot();
    assert!(!snap.signed_in);
    assert!(snap.form.is_none());
    assert_eq!(controller.selection().selected(), None);
    assert_eq!(controller.estimator().input().side, Side::Unselected);
}

#[tokio::test]
async fn form__estimate_flows_from_inputs_to_snapshot() {
    // given
    let wallet = FakeWallet::signed_in("alice.testnet");
    wallet.respond_view(VIEW_POTENTIAL_WINNINGS, Ok(json!(26.5)));
    let mut controller = controller(&wallet).await;
    controller.select_match("m1");

    // when
    assert!(controller.cycle_side(true).is_none());
    let ticket = controller.set_stake("10").unwrap();
    let computing = controller.snapshot().form.unwrap().computing;
    let outcome = controller.estimate_future(ticket).await;
    controller.apply_estimate(outcome);

    // then
    let form = controller.snapshot().form.unwrap();
    assert!(computing);
    assert_eq!(form.side, Side::team("A"));
    assert_eq!(form.estimate, 26.5);
    assert!(form.can_submit);
    assert_eq!(
        wallet.calls_to(VIEW_POTENTIAL_WINNINGS)[0].args(),
        &json!({ "match_id": "m1", "team": "A", "bet_amount": "10" })
    );
}

#[tokio::test]
async fn select_match__switching_resets_form() {
    let wallet = FakeWallet::signed_in("alice.testnet");
    wallet.respond_view(VIEW_POTENTIAL_WINNINGS, Ok(json!(1.0)));
    let mut controller = controller(&wallet).await;
    controller.select_match("m1");
    controller.set_side(Side::team("B"));
    let ticket = controller.set_stake("4").unwrap();

    controller.select_match("m2");
    let outcome = controller.estimate_future(ticket).await;

    assert!(!controller.apply_estimate(outcome));
    let form = controller.snapshot().form.unwrap();
    assert_eq!(form.match_id, "m2");
    assert_eq!(form.side, Side::Unselected);
    assert_eq!(form.stake, "");
    assert_eq!(form.estimate, 0.0);
    assert!(!form.can_submit);
}

#[tokio::test]
async fn submission__blocks_second_bet_until_first_resolves() {
    // given
    let wallet = FakeWallet::signed_in("alice.testnet");
    let release = wallet.hold_call();
    let mut controller = controller(&wallet).await;
    controller.select_match("m1");
    controller.set_side(Side::team("B"));
    controller.set_stake("2");

    // when
    let bet = controller.begin_submission().unwrap();
    let pending = controller.submission_future(bet);
    let second = controller.begin_submission();
    release.resolve(Ok(Default::default()));
    let result = pending.await;
    controller.finish_submission(result);

    // then
    assert!(second.is_none());
    assert!(!controller.is_submitting());
    assert_eq!(wallet.calls_to(MAKE_BET).len(), 1);
    assert!(controller.status().starts_with("Bet placed"));
    assert!(controller.begin_submission().is_some());
}

#[tokio::test]
async fn submission__continues_after_switching_match() {
    let wallet = FakeWallet::signed_in("alice.testnet");
    let release = wallet.hold_call();
    let mut controller = controller(&wallet).await;
    controller.select_match("m1");
    controller.set_side(Side::team("B"));
    controller.set_stake("2");
    let bet = controller.begin_submission().unwrap();
    let pending = controller.submission_future(bet);

    controller.select_match("m2");
    release.resolve(Err(GatewayError::contract(MAKE_BET, "Match is already finished")));
    controller.finish_submission(pending.await);

    assert!(!controller.is_submitting());
    assert!(controller.errors().last().unwrap().contains("Match is already finished"));
    assert_eq!(controller.selection().selected(), Some("m2"));
}

#[tokio::test]
async fn submission__invalid_stake_is_reported() {
    let wallet = FakeWallet::signed_in("alice.testnet");
    let mut controller = controller(&wallet).await;
    controller.select_match("m1");
    controller.set_side(Side::team("A"));

    let bet = controller.begin_submission();

    assert!(bet.is_none());
    assert!(!controller.is_submitting());
    assert!(controller.errors()[0].contains("invalid stake"));
    assert!(wallet.calls_to(MAKE_BET).is_empty());
}

#[tokio::test]
async fn load_bets__opens_view_for_selected_match() {
    let wallet = FakeWallet::signed_in("alice.testnet");
    wallet.respond_view(
        VIEW_BETS,
        Ok(json!([{
            "bettor": "bob.testnet",
            "decision": "D",
            "bet_amount": 1.0,
            "potential_winnings": 3.0,
            "payed_out": false
        }])),
    );
    let mut controller = controller(&wallet).await;
    controller.select_match("m2");

    controller.load_bets().await;

    let bets = controller.snapshot().bets.unwrap();
    assert_eq!(bets.match_id, "m2");
    assert_eq!(bets.bets[0].bettor, "bob.testnet");
    controller.close_bets();
    assert!(controller.snapshot().bets.is_none());
}
