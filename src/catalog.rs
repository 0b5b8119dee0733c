use crate::{
    error::GatewayError,
    gateway::ContractGateway,
    model::Match,
    wallet::Wallet,
};
use chrono::{
    DateTime,
    Local,
};
use tracing::info;

/// Point-in-time snapshot of the open matches, in server order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchCatalog {
    matches: Vec<Match>,
    fetched_at: Option<DateTime<Local>>,
}

impl MatchCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_matches(matches: Vec<Match>) -> Self {
        Self {
            matches,
            fetched_at: Some(Local::now()),
        }
    }

    /// Issues exactly one `view_matches` query.
    pub async fn load<W: Wallet>(gateway: &ContractGateway<W>) -> Result<Self, GatewayError> {
        let matches = gateway.get_matches().await?;
        info!(count = matches.len(), "loaded match catalog");
        Ok(Self::from_matches(matches))
    }

    /// Replaces the snapshot. On failure the previous snapshot is kept.
    pub async fn refresh<W: Wallet>(
        &mut self,
        gateway: &ContractGateway<W>,
    ) -> Result<(), GatewayError> {
        *self = Self::load(gateway).await?;
        Ok(())
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn get(&self, id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.matches.iter().position(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Local>> {
        self.fetched_at
    }

    /// Human readable age of the snapshot, e.g. "fetched 14:02:11".
    pub fn freshness(&self) -> String {
        match self.fetched_at {
            Some(at) => format!("fetched {}", at.format("%H:%M:%S")),
            None => String::from("not loaded"),
        }
    }
}
