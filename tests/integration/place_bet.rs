use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use vex_client::{
    amount::{
        AmountError,
        LedgerAmount,
        ONE_NEAR,
    },
    error::GatewayError,
    estimator::BetInput,
    gateway::{
        ContractGateway,
        MAKE_BET,
    },
    model::{
        Side,
        TxOutcome,
    },
    submission::{
        BetSubmission,
        SubmissionError,
        can_submit,
    },
    test_helpers::{
        FakeWallet,
        RecordedCall,
    },
};

fn gateway(wallet: &FakeWallet) -> ContractGateway<FakeWallet> {
    ContractGateway::new("vex.testnet", Arc::new(wallet.clone())).unwrap()
}

fn input(side: Side, stake: &str) -> BetInput {
    BetInput {
        side,
        stake: stake.to_string(),
    }
}

#[tokio::test]
async fn place_bet__attaches_exact_deposit() {
    // given
    let wallet = FakeWallet::signed_in("alice.testnet");
    wallet.push_call(Ok(TxOutcome {
        transaction_hash: "9xHash".to_string(),
        logs: vec!["You have made a bet on B".to_string()],
    }));
    let bet = BetSubmission::prepare("m1", &input(Side::team("B"), "1.5")).unwrap();

    // when
    let outcome = bet.submit(&gateway(&wallet)).await.unwrap();

    // then
    assert_eq!(outcome.transaction_hash, "9xHash");
    assert_eq!(
        wallet.calls(),
        vec![RecordedCall::Call {
            contract_id: "vex.testnet".to_string(),
            method: MAKE_BET.to_string(),
            args: json!({ "match_id": "m1", "decision": "B" }),
            deposit: LedgerAmount::from_yocto(ONE_NEAR + ONE_NEAR / 2),
        }]
    );
}

#[tokio::test]
async fn place_bet__fails_without_session() {
    let wallet = FakeWallet::new();
    let bet = BetSubmission::prepare("m1", &input(Side::team("B"), "1")).unwrap();

    let err = bet.submit(&gateway(&wallet)).await.unwrap_err();

    assert_eq!(
        err,
        SubmissionError::Gateway(GatewayError::not_authorized(MAKE_BET))
    );
    assert!(wallet.calls().is_empty());
}

#[tokio::test]
async fn place_bet__surfaces_contract_rejection() {
    let wallet = FakeWallet::signed_in("alice.testnet");
    wallet.push_call(Err(GatewayError::contract(MAKE_BET, "Match is already finished")));
    let bet = BetSubmission::prepare("m1", &input(Side::team("A"), "2")).unwrap();

    let err = bet.submit(&gateway(&wallet)).await.unwrap_err();

    assert!(matches!(
        err,
        SubmissionError::Gateway(GatewayError::Contract { .. })
    ));
}

#[test]
fn prepare__rejects_stake_before_any_network_call() {
    assert_eq!(
        BetSubmission::prepare("m1", &input(Side::team("A"), "1.2.3")),
        Err(SubmissionError::InvalidStake(AmountError::Malformed(
            "1.2.3".to_string()
        )))
    );
    assert!(matches!(
        BetSubmission::prepare("m1", &input(Side::team("A"), "0.0000000000000000000000001")),
        Err(SubmissionError::InvalidStake(AmountError::TooPrecise(_)))
    ));
}

proptest! {
    #[test]
    fn can_submit__iff_side_selected(
        team in proptest::option::of("[A-Za-z ]{1,12}"),
        stake in "[0-9.]{0,8}",
    ) {
        let side = match team {
            Some(name) => Side::Team(name),
            None => Side::Unselected,
        };
        let expected = side.is_selected();

        prop_assert_eq!(can_submit(&input(side, &stake)), expected);
    }

    #[test]
    fn prepare__deposit_renders_back_to_stake(
        whole in 0u64..1_000_000,
        fraction in proptest::option::of("[0-9]{0,23}[1-9]"),
    ) {
        let stake = match &fraction {
            Some(f) => format!("{whole}.{f}"),
            None => whole.to_string(),
        };

        let bet = BetSubmission::prepare("m1", &input(Side::team("A"), &stake)).unwrap();

        prop_assert_eq!(bet.deposit().to_near_string(), stake);
    }
}
