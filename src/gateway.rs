use crate::{
    amount::LedgerAmount,
    error::GatewayError,
    model::{
        BetRecord,
        Match,
        TxOutcome,
    },
    wallet::{
        FunctionCall,
        ViewCall,
        Wallet,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use serde::de::DeserializeOwned;
use serde_json::{
    Value,
    json,
};
use std::sync::Arc;
use tracing::debug;

pub const VIEW_MATCHES: &str = "view_matches";
pub const VIEW_POTENTIAL_WINNINGS: &str = "view_potential_winnings";
pub const MAKE_BET: &str = "make_bet";
pub const VIEW_BETS: &str = "view_bets";

/// Typed access to the betting contract.
///
/// Holds nothing but the contract id and a shared handle to the wallet, so
/// clones are cheap and can be moved into pending requests.
pub struct ContractGateway<W> {
    contract_id: String,
    wallet: Arc<W>,
}

impl<W> Clone for ContractGateway<W> {
    fn clone(&self) -> Self {
        Self {
            contract_id: self.contract_id.clone(),
            wallet: Arc::clone(&self.wallet),
        }
    }
}

impl<W: Wallet> ContractGateway<W> {
    pub fn new(contract_id: impl Into<String>, wallet: Arc<W>) -> Result<Self> {
        let contract_id = contract_id.into().trim().to_string();
        if contract_id.is_empty() {
            return Err(eyre!("A contract id is required before talking to the ledger"));
        }
        Ok(Self {
            contract_id,
            wallet,
        })
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// Read-only call. Works with or without a session.
    pub async fn query<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Value,
    ) -> Result<T, GatewayError> {
        debug!(method, %args, "query");
        let value = self
            .wallet
            .view_method(ViewCall {
                contract_id: &self.contract_id,
                method,
                args: &args,
            })
            .await?;
        serde_json::from_value(value).map_err(|e| {
            GatewayError::contract(method, format!("unexpected return shape: {e}"))
        })
    }

    /// State-changing call with an attached deposit. Refuses before reaching
    /// the wallet when no session is active.
    pub async fn mutate(
        &self,
        method: &str,
        args: Value,
        deposit: LedgerAmount,
    ) -> Result<TxOutcome, GatewayError> {
        if !self.wallet.is_signed_in() {
            return Err(GatewayError::not_authorized(method));
        }
        debug!(method, %args, %deposit, "mutate");
        self.wallet
            .call_method(FunctionCall {
                contract_id: &self.contract_id,
                method,
                args: &args,
                deposit,
            })
            .await
    }

    pub async fn get_matches(&self) -> Result<Vec<Match>, GatewayError> {
        self.query(VIEW_MATCHES, json!({ "match_id": "all" }))
            .await
    }

    /// `stake` is passed through as the user typed it; the contract parses it.
    pub async fn get_potential_winnings(
        &self,
        match_id: &str,
        side: &str,
        stake: &str,
    ) -> Result<f64, GatewayError> {
        self.query(
            VIEW_POTENTIAL_WINNINGS,
            json!({
                "match_id": match_id,
                "team": side,
                "bet_amount": stake,
            }),
        )
        .await
    }

    pub async fn place_bet(
        &self,
        match_id: &str,
        side: &str,
        deposit: LedgerAmount,
    ) -> Result<TxOutcome, GatewayError> {
        self.mutate(
            MAKE_BET,
            json!({
                "match_id": match_id,
                "decision": side,
            }),
            deposit,
        )
        .await
    }

    /// Bets on a match, either for one account or for everyone.
    pub async fn get_bets(
        &self,
        match_id: &str,
        account: Option<&str>,
    ) -> Result<Vec<BetRecord>, GatewayError> {
        self.query(
            VIEW_BETS,
            json!({
                "match_id": match_id,
                "name": account.unwrap_or("all"),
            }),
        )
        .await
    }
}
