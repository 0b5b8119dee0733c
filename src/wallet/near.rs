use crate::{
    error::GatewayError,
    model::TxOutcome,
    wallet::{
        FunctionCall,
        ViewCall,
        Wallet,
        keystore::{
            self,
            Credentials,
        },
        rpc::RpcClient,
        transaction::{
            DEFAULT_FUNCTION_CALL_GAS,
            FunctionCallAction,
            Transaction,
        },
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde_json::Value;
use std::{
    path::PathBuf,
    sync::RwLock,
};
use tracing::{
    info,
    warn,
};

/// A wallet that keeps a full-access key on local disk and signs
/// transactions in-process.
///
/// Credentials live at `<credentials_dir>/<network>/<account>.json`, the
/// layout written by the NEAR CLI. The session is the unlocked key held in
/// memory; signing out forgets it without touching the file.
pub struct KeystoreWallet {
    rpc: RpcClient,
    credentials_dir: PathBuf,
    account_id: Option<String>,
    session: RwLock<Option<Credentials>>,
}

impl KeystoreWallet {
    pub fn new(
        rpc: RpcClient,
        credentials_dir: PathBuf,
        account_id: Option<String>,
    ) -> Self {
        Self {
            rpc,
            credentials_dir,
            account_id,
            session: RwLock::new(None),
        }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    fn load_configured(&self) -> Result<Credentials> {
        let account = match &self.account_id {
            Some(account) => account.clone(),
            None => {
                let mut found = keystore::list_credentials(&self.credentials_dir)?;
                match found.len() {
                    0 => {
                        return Err(eyre!(
                            "No credentials found in {}",
                            self.credentials_dir.display()
                        ));
                    }
                    1 => found.remove(0).account_id,
                    _ => {
                        return Err(eyre!(
                            "Several accounts in {}; choose one with --account",
                            self.credentials_dir.display()
                        ));
                    }
                }
            }
        };
        let descriptor = keystore::find_credentials(&self.credentials_dir, &account)?;
        keystore::load_credentials(&descriptor)
    }

    fn session(&self) -> Option<Credentials> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }

    fn store_session(&self, credentials: Option<Credentials>) {
        match self.session.write() {
            Ok(mut guard) => *guard = credentials,
            Err(poisoned) => *poisoned.into_inner() = credentials,
        }
    }
}

impl Wallet for KeystoreWallet {
    async fn start_up(&self) -> Result<bool> {
        if self.is_signed_in() {
            return Ok(true);
        }
        match self.load_configured() {
            Ok(credentials) => {
                info!(account = %credentials.account_id, "restored wallet session");
                self.store_session(Some(credentials));
                Ok(true)
            }
            Err(err) => {
                info!(%err, "no wallet session to restore");
                Ok(false)
            }
        }
    }

    async fn sign_in(&self) -> Result<String> {
        let credentials = self.load_configured()?;
        self.rpc
            .view_access_key(
                "view_access_key",
                &credentials.account_id,
                &credentials.public_key_string(),
            )
            .await
            .wrap_err_with(|| {
                format!(
                    "Key for '{}' is not registered on chain",
                    credentials.account_id
                )
            })?;
        let account = credentials.account_id.clone();
        self.store_session(Some(credentials));
        info!(%account, "signed in");
        Ok(account)
    }

    fn sign_out(&self) {
        if let Some(credentials) = self.session() {
            info!(account = %credentials.account_id, "signed out");
        }
        self.store_session(None);
    }

    fn is_signed_in(&self) -> bool {
        self.session().is_some()
    }

    fn account_id(&self) -> Option<String> {
        self.session().map(|c| c.account_id)
    }

    async fn view_method(&self, call: ViewCall<'_>) -> Result<Value, GatewayError> {
        self.rpc
            .call_function(call.contract_id, call.method, call.args)
            .await
    }

    async fn call_method(&self, call: FunctionCall<'_>) -> Result<TxOutcome, GatewayError> {
        let credentials = self
            .session()
            .ok_or_else(|| GatewayError::not_authorized(call.method))?;
        let access_key = self
            .rpc
            .view_access_key(
                call.method,
                &credentials.account_id,
                &credentials.public_key_string(),
            )
            .await?;
        let action = FunctionCallAction {
            method_name: call.method.to_string(),
            args: call.args.to_string().into_bytes(),
            gas: DEFAULT_FUNCTION_CALL_GAS,
            deposit: call.deposit.as_yocto(),
        };
        let signed = Transaction::function_call(
            &credentials,
            call.contract_id,
            access_key.nonce + 1,
            access_key.block_hash,
            action,
        )
        .sign(&credentials)
        .map_err(|e| GatewayError::rpc(format!("failed to sign transaction: {e}")))?;
        match signed.hash_string() {
            Ok(hash) => info!(%hash, method = call.method, deposit = %call.deposit, "broadcasting transaction"),
            Err(err) => warn!(%err, "could not hash transaction for logging"),
        }
        self.rpc.broadcast_tx_commit(call.method, &signed).await
    }
}
