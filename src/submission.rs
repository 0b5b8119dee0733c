use crate::{
    amount::{
        AmountError,
        LedgerAmount,
    },
    error::GatewayError,
    estimator::BetInput,
    gateway::ContractGateway,
    model::TxOutcome,
    wallet::Wallet,
};
use thiserror::Error;
use tracing::{
    error,
    info,
};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SubmissionError {
    #[error("choose a team before placing a bet")]
    SideNotSelected,
    #[error("invalid stake: {0}")]
    InvalidStake(#[from] AmountError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The submit control is enabled only once a side is chosen. The stake is
/// validated when the bet is prepared.
pub fn can_submit(input: &BetInput) -> bool {
    input.side.is_selected()
}

/// A validated wager, ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetSubmission {
    match_id: String,
    side: String,
    deposit: LedgerAmount,
}

impl BetSubmission {
    pub fn prepare(match_id: impl Into<String>, input: &BetInput) -> Result<Self, SubmissionError> {
        let side = input
            .side
            .as_team()
            .ok_or(SubmissionError::SideNotSelected)?
            .to_string();
        let deposit = LedgerAmount::parse_near(&input.stake)?;
        Ok(Self {
            match_id: match_id.into(),
            side,
            deposit,
        })
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn side(&self) -> &str {
        &self.side
    }

    pub fn deposit(&self) -> LedgerAmount {
        self.deposit
    }

    /// Sends `make_bet` with the stake attached as deposit. Nothing local is
    /// updated; callers refresh from the ledger if they want to.
    pub async fn submit<W: Wallet>(
        self,
        gateway: &ContractGateway<W>,
    ) -> Result<TxOutcome, SubmissionError> {
        info!(
            match_id = %self.match_id,
            side = %self.side,
            deposit = %self.deposit,
            "placing bet"
        );
        match gateway
            .place_bet(&self.match_id, &self.side, self.deposit)
            .await
        {
            Ok(outcome) => {
                info!(hash = %outcome.transaction_hash, "bet placed");
                Ok(outcome)
            }
            Err(err) => {
                error!(%err, match_id = %self.match_id, "bet failed");
                Err(err.into())
            }
        }
    }
}
