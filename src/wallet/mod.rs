//! The wallet collaborator: session handling plus the two remote primitives
//! the contract gateway is built on.

use crate::{
    amount::LedgerAmount,
    error::GatewayError,
    model::TxOutcome,
};
use color_eyre::eyre::Result;
use serde_json::Value;

pub mod keystore;
pub mod near;
pub mod rpc;
pub mod transaction;

pub use near::KeystoreWallet;

/// A read-only contract call.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewCall<'a> {
    pub contract_id: &'a str,
    pub method: &'a str,
    pub args: &'a Value,
}

/// A state-changing contract call with an attached deposit.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall<'a> {
    pub contract_id: &'a str,
    pub method: &'a str,
    pub args: &'a Value,
    pub deposit: LedgerAmount,
}

pub trait Wallet {
    /// Restores a previous session if one exists and reports whether the
    /// wallet is now signed in.
    fn start_up(&self) -> impl Future<Output = Result<bool>>;

    /// Begins the authorization flow and returns the signed-in account.
    fn sign_in(&self) -> impl Future<Output = Result<String>>;

    fn sign_out(&self);

    fn is_signed_in(&self) -> bool;

    fn account_id(&self) -> Option<String>;

    fn view_method(
        &self,
        call: ViewCall<'_>,
    ) -> impl Future<Output = Result<Value, GatewayError>>;

    fn call_method(
        &self,
        call: FunctionCall<'_>,
    ) -> impl Future<Output = Result<TxOutcome, GatewayError>>;
}
