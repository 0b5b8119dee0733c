use crate::{
    error::GatewayError,
    model::TxOutcome,
    wallet::transaction::SignedTransaction,
};
use base64::{
    Engine as _,
    engine::general_purpose::STANDARD as BASE64,
};
use color_eyre::eyre::WrapErr;
use serde::Deserialize;
use serde_json::{
    Value,
    json,
};

/// Node-side failures worth retrying; every other handler error is the
/// contract or the request being rejected.
const TRANSIENT_CAUSES: [&str; 4] = [
    "TIMEOUT_ERROR",
    "UNKNOWN_BLOCK",
    "NOT_SYNCED_YET",
    "UNAVAILABLE_SHARD",
];

#[derive(Clone)]
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessKeyView {
    pub nonce: u64,
    pub block_hash: [u8; 32],
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> color_eyre::eyre::Result<Self> {
        let url = url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for the NEAR RPC")?;
        Ok(Self { url, http })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call_function(
        &self,
        contract_id: &str,
        method: &str,
        args: &Value,
    ) -> Result<Value, GatewayError> {
        let args_base64 = BASE64.encode(args.to_string());
        let result = self
            .request(
                method,
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": contract_id,
                    "method_name": method,
                    "args_base64": args_base64,
                }),
            )
            .await?;
        decode_call_result(method, result)
    }

    /// `context` is the method the key is needed for; a rejected key is
    /// reported against it.
    pub async fn view_access_key(
        &self,
        context: &str,
        account_id: &str,
        public_key: &str,
    ) -> Result<AccessKeyView, GatewayError> {
        let result = self
            .request(
                context,
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": "final",
                    "account_id": account_id,
                    "public_key": public_key,
                }),
            )
            .await?;
        decode_access_key(result)
    }

    pub async fn broadcast_tx_commit(
        &self,
        method: &str,
        signed: &SignedTransaction,
    ) -> Result<TxOutcome, GatewayError> {
        let encoded = signed
            .to_base64()
            .map_err(|e| GatewayError::rpc(format!("failed to encode transaction: {e}")))?;
        let result = self
            .request(method, "broadcast_tx_commit", json!([encoded]))
            .await?;
        decode_tx_outcome(method, result)
    }

    /// Sends one JSON-RPC request and returns its `result` member.
    /// `context` names the contract method for error reporting.
    async fn request(
        &self,
        context: &str,
        rpc_method: &str,
        params: Value,
    ) -> Result<Value, GatewayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": rpc_method,
            "params": params,
        });
        let res = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::rpc(format!("request to {} failed: {e}", self.url)))?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| {
            GatewayError::rpc(format!("failed to read RPC response body: {e}"))
        })?;
        // Handler errors come back with 200 on older nodes and 4xx/5xx on newer
        // ones, so look for a JSON-RPC envelope before judging the status.
        match serde_json::from_slice::<RpcEnvelope>(&bytes) {
            Ok(envelope) => envelope.into_result(context),
            Err(_) if !status.is_success() => {
                let body = String::from_utf8_lossy(&bytes);
                Err(GatewayError::rpc(format!(
                    "RPC responded with {status} during `{rpc_method}`: {body}"
                )))
            }
            Err(e) => Err(GatewayError::rpc(format!(
                "invalid RPC payload for `{rpc_method}`: {e}"
            ))),
        }
    }
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorDto>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorDto {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cause: Option<RpcCauseDto>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcCauseDto {
    name: String,
    #[serde(default)]
    info: Option<Value>,
}

impl RpcEnvelope {
    fn into_result(self, context: &str) -> Result<Value, GatewayError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(classify_rpc_error(context, error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(GatewayError::rpc("RPC response had neither result nor error")),
        }
    }
}

fn classify_rpc_error(context: &str, error: RpcErrorDto) -> GatewayError {
    let cause = error.cause.as_ref().map(|c| c.name.as_str());
    let detail = error
        .cause
        .as_ref()
        .and_then(|c| c.info.as_ref())
        .map(Value::to_string)
        .or_else(|| error.data.as_ref().map(Value::to_string))
        .or(error.message.clone())
        .unwrap_or_default();
    let summary = format!("{}: {detail}", cause.unwrap_or("UNKNOWN"));
    match error.name.as_deref() {
        Some("HANDLER_ERROR") if cause.is_some_and(|c| TRANSIENT_CAUSES.contains(&c)) => {
            GatewayError::rpc(summary)
        }
        Some("HANDLER_ERROR") | Some("REQUEST_VALIDATION_ERROR") => {
            GatewayError::contract(context, summary)
        }
        _ => GatewayError::rpc(summary),
    }
}

fn decode_call_result(method: &str, result: Value) -> Result<Value, GatewayError> {
    #[derive(Deserialize)]
    struct CallResultDto {
        #[serde(default)]
        result: Option<Vec<u8>>,
        #[serde(default)]
        error: Option<String>,
    }

    let dto: CallResultDto = serde_json::from_value(result)
        .map_err(|e| GatewayError::rpc(format!("invalid call_function payload: {e}")))?;
    if let Some(error) = dto.error {
        return Err(GatewayError::contract(method, error));
    }
    let bytes = dto
        .result
        .ok_or_else(|| GatewayError::rpc("call_function result missing"))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| {
        GatewayError::contract(method, format!("return value is not JSON: {e}"))
    })
}

fn decode_access_key(result: Value) -> Result<AccessKeyView, GatewayError> {
    #[derive(Deserialize)]
    struct AccessKeyDto {
        nonce: u64,
        block_hash: String,
    }

    let dto: AccessKeyDto = serde_json::from_value(result)
        .map_err(|e| GatewayError::rpc(format!("invalid access key payload: {e}")))?;
    let raw = bs58::decode(&dto.block_hash)
        .into_vec()
        .map_err(|e| GatewayError::rpc(format!("invalid block hash: {e}")))?;
    let block_hash: [u8; 32] = raw
        .try_into()
        .map_err(|_| GatewayError::rpc("block hash is not 32 bytes"))?;
    Ok(AccessKeyView {
        nonce: dto.nonce,
        block_hash,
    })
}

fn decode_tx_outcome(method: &str, result: Value) -> Result<TxOutcome, GatewayError> {
    if let Some(failure) = result.pointer("/status/Failure") {
        return Err(GatewayError::contract(method, failure.to_string()));
    }
    let transaction_hash = result
        .pointer("/transaction/hash")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let logs = result
        .get("receipts_outcome")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|receipt| receipt.pointer("/outcome/logs").and_then(Value::as_array))
        .flatten()
        .filter_map(|log| log.as_str().map(str::to_string))
        .collect();
    Ok(TxOutcome {
        transaction_hash,
        logs,
    })
}
