use futures::{
    StreamExt,
    stream::FuturesUnordered,
};
use serde_json::json;
use std::{
    sync::Arc,
    time::Duration,
};
use vex_client::{
    error::GatewayError,
    estimator::{
        EstimateState,
        WinningsEstimator,
        run_estimate,
    },
    gateway::{
        ContractGateway,
        VIEW_POTENTIAL_WINNINGS,
    },
    model::Side,
    test_helpers::FakeWallet,
};

const DEBOUNCE: Duration = Duration::from_millis(250);

fn gateway(wallet: &FakeWallet) -> ContractGateway<FakeWallet> {
    ContractGateway::new("vex.testnet", Arc::new(wallet.clone())).unwrap()
}

fn estimator_on(match_id: &str) -> WinningsEstimator {
    let mut estimator = WinningsEstimator::new();
    estimator.select_match(Some(match_id.to_string()));
    estimator
}

#[tokio::test]
async fn run_estimate__queries_tuple_and_settles() {
    // given
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_POTENTIAL_WINNINGS, Ok(json!(4.2)));
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("B"));
    let ticket = estimator.set_stake("10").unwrap();

    // when
    let outcome = run_estimate(gateway(&wallet), ticket, Duration::ZERO).await;
    let applied = estimator.resolve(outcome);

    // then
    assert!(applied);
    assert_eq!(estimator.estimate(), 4.2);
    assert_eq!(estimator.state(), EstimateState::Settled);
    assert_eq!(
        wallet.calls_to(VIEW_POTENTIAL_WINNINGS)[0].args(),
        &json!({ "match_id": "m1", "team": "B", "bet_amount": "10" })
    );
}

#[tokio::test]
async fn run_estimate__clearing_stake_before_resolution_discards_late_value() {
    // given
    let wallet = FakeWallet::new();
    let release = wallet.hold_view(VIEW_POTENTIAL_WINNINGS);
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("B"));
    let ticket = estimator.set_stake("10").unwrap();
    let pending = run_estimate(gateway(&wallet), ticket, Duration::ZERO);
    tokio::pin!(pending);
    assert!(futures::poll!(&mut pending).is_pending());

    // when
    assert!(estimator.set_stake("").is_none());
    let shown_immediately = estimator.estimate();
    assert!(release.resolve(Ok(json!(4.2))));
    let outcome = pending.await;

    // then
    assert_eq!(shown_immediately, 0.0);
    assert!(!estimator.resolve(outcome));
    assert_eq!(estimator.estimate(), 0.0);
}

#[tokio::test]
async fn run_estimate__match_switch_discards_in_flight_result() {
    // given
    let wallet = FakeWallet::new();
    let release = wallet.hold_view(VIEW_POTENTIAL_WINNINGS);
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("A"));
    let ticket = estimator.set_stake("3").unwrap();
    let args = json!({ "match_id": "m1", "team": "A", "bet_amount": "3" });
    let pending = run_estimate(gateway(&wallet), ticket, Duration::ZERO);
    tokio::pin!(pending);
    assert!(futures::poll!(&mut pending).is_pending());

    // when
    estimator.select_match(Some("m2".to_string()));
    release.resolve(Ok(json!(9.9)));
    let outcome = pending.await;

    // then
    assert!(!estimator.resolve(outcome));
    assert_eq!(estimator.estimate(), 0.0);
    assert_eq!(estimator.input().side, Side::Unselected);
    assert_eq!(estimator.input().stake, "");
    assert_eq!(wallet.peak_in_flight(VIEW_POTENTIAL_WINNINGS, &args), 1);
}

#[tokio::test]
async fn run_estimate__returning_to_pending_tuple_reuses_its_query() {
    // given
    let wallet = FakeWallet::new();
    let first_release = wallet.hold_view(VIEW_POTENTIAL_WINNINGS);
    let second_release = wallet.hold_view(VIEW_POTENTIAL_WINNINGS);
    let gateway = gateway(&wallet);
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("B"));
    let ten = json!({ "match_id": "m1", "team": "B", "bet_amount": "10" });

    let first = estimator.set_stake("10").unwrap();
    let first_seq = first.seq;
    let first_pending = run_estimate(gateway.clone(), first, Duration::ZERO);
    tokio::pin!(first_pending);
    assert!(futures::poll!(&mut first_pending).is_pending());

    let second = estimator.set_stake("100").unwrap();
    let second_pending = run_estimate(gateway.clone(), second, Duration::ZERO);
    tokio::pin!(second_pending);
    assert!(futures::poll!(&mut second_pending).is_pending());

    // when
    let third = estimator.set_stake("10");

    // then
    assert!(third.is_none());
    assert_eq!(
        estimator.state(),
        EstimateState::Computing { seq: first_seq }
    );
    assert!(first_release.resolve(Ok(json!(4.2))));
    assert!(estimator.resolve(first_pending.await));
    assert_eq!(estimator.estimate(), 4.2);
    assert!(second_release.resolve(Ok(json!(42.0))));
    assert!(!estimator.resolve(second_pending.await));
    assert_eq!(estimator.estimate(), 4.2);
    assert_eq!(wallet.calls_to(VIEW_POTENTIAL_WINNINGS).len(), 2);
    assert_eq!(wallet.peak_in_flight(VIEW_POTENTIAL_WINNINGS, &ten), 1);
}

#[tokio::test]
async fn run_estimate__returning_to_answered_tuple_queries_again() {
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_POTENTIAL_WINNINGS, Ok(json!(4.2)));
    let gateway = gateway(&wallet);
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("B"));
    let first = estimator.set_stake("10").unwrap();
    let outcome = run_estimate(gateway.clone(), first, Duration::ZERO).await;
    estimator.resolve(outcome);
    estimator.set_stake("100");

    let again = estimator.set_stake("10");

    assert!(again.is_some());
}

#[tokio::test(start_paused = true)]
async fn run_estimate__debounce_sends_only_the_last_keystroke() {
    // given
    let wallet = FakeWallet::new();
    wallet.respond_view(VIEW_POTENTIAL_WINNINGS, Ok(json!(12.5)));
    let gateway = gateway(&wallet);
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("B"));
    let mut pending = FuturesUnordered::new();

    // when
    for stake in ["1", "10", "100"] {
        let ticket = estimator.set_stake(stake).unwrap();
        pending.push(run_estimate(gateway.clone(), ticket, DEBOUNCE));
    }
    let mut applied = 0;
    while let Some(outcome) = pending.next().await {
        if estimator.resolve(outcome) {
            applied += 1;
        }
    }

    // then
    assert_eq!(applied, 1);
    assert_eq!(estimator.estimate(), 12.5);
    let calls = wallet.calls_to(VIEW_POTENTIAL_WINNINGS);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args()["bet_amount"], json!("100"));
}

#[tokio::test(start_paused = true)]
async fn run_estimate__superseded_ticket_skips_network() {
    let wallet = FakeWallet::new();
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("B"));
    let ticket = estimator.set_stake("5").unwrap();
    estimator.set_side(Side::Unselected);

    let outcome = run_estimate(gateway(&wallet), ticket, DEBOUNCE).await;

    assert_eq!(outcome.result, None);
    assert!(wallet.calls().is_empty());
    assert!(!estimator.resolve(outcome));
}

#[tokio::test]
async fn run_estimate__failure_keeps_last_good_value() {
    // given
    let wallet = FakeWallet::new();
    wallet.push_view(VIEW_POTENTIAL_WINNINGS, Ok(json!(4.2)));
    wallet.push_view(
        VIEW_POTENTIAL_WINNINGS,
        Err(GatewayError::contract(
            VIEW_POTENTIAL_WINNINGS,
            "That is not a valid team",
        )),
    );
    let gateway = gateway(&wallet);
    let mut estimator = estimator_on("m1");
    estimator.set_side(Side::team("B"));
    let first = estimator.set_stake("10").unwrap();
    estimator.resolve(run_estimate(gateway.clone(), first, Duration::ZERO).await);

    // when
    let second = estimator.set_stake("20").unwrap();
    let applied = estimator.resolve(run_estimate(gateway, second, Duration::ZERO).await);

    // then
    assert!(applied);
    assert_eq!(estimator.estimate(), 4.2);
    assert!(matches!(
        estimator.last_error(),
        Some(GatewayError::Contract { .. })
    ));
}
