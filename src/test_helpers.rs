//! In-memory wallet for exercising the gateway and the app controller
//! without a node.

use crate::{
    amount::LedgerAmount,
    error::GatewayError,
    model::TxOutcome,
    wallet::{
        FunctionCall,
        ViewCall,
        Wallet,
    },
};
use color_eyre::eyre::Result;
use serde_json::Value;
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tokio::sync::oneshot;

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCall {
    View {
        contract_id: String,
        method: String,
        args: Value,
    },
    Call {
        contract_id: String,
        method: String,
        args: Value,
        deposit: LedgerAmount,
    },
}

impl RecordedCall {
    pub fn method(&self) -> &str {
        match self {
            RecordedCall::View { method, .. } | RecordedCall::Call { method, .. } => method,
        }
    }

    pub fn args(&self) -> &Value {
        match self {
            RecordedCall::View { args, .. } | RecordedCall::Call { args, .. } => args,
        }
    }
}

enum Scripted<T> {
    Ready(Result<T, GatewayError>),
    Held(oneshot::Receiver<Result<T, GatewayError>>),
}

/// Completes a response queued with one of the `hold_*` methods.
pub struct Release<T> {
    tx: oneshot::Sender<Result<T, GatewayError>>,
}

impl<T> Release<T> {
    /// Returns false if the request was dropped before it was answered.
    pub fn resolve(self, result: Result<T, GatewayError>) -> bool {
        self.tx.send(result).is_ok()
    }
}

#[derive(Default)]
struct FakeState {
    signed_in: bool,
    account: String,
    calls: Vec<RecordedCall>,
    queued_views: HashMap<String, VecDeque<Scripted<Value>>>,
    default_views: HashMap<String, Result<Value, GatewayError>>,
    queued_calls: VecDeque<Scripted<TxOutcome>>,
    in_flight: HashMap<String, usize>,
    peak_in_flight: HashMap<String, usize>,
}

/// Scriptable wallet. Every view and call is recorded; responses come from
/// per-method queues first, then from per-method defaults.
#[derive(Clone, Default)]
pub struct FakeWallet {
    state: Arc<Mutex<FakeState>>,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(account: impl Into<String>) -> Self {
        let wallet = Self::new();
        {
            let mut state = wallet.lock();
            state.signed_in = true;
            state.account = account.into();
        }
        wallet
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_account(&self, account: impl Into<String>) {
        self.lock().account = account.into();
    }

    /// Answer every `method` view with `result` once the queue is empty.
    pub fn respond_view(&self, method: &str, result: Result<Value, GatewayError>) {
        self.lock().default_views.insert(method.to_string(), result);
    }

    /// Answer the next `method` view with `result`.
    pub fn push_view(&self, method: &str, result: Result<Value, GatewayError>) {
        self.lock()
            .queued_views
            .entry(method.to_string())
            .or_default()
            .push_back(Scripted::Ready(result));
    }

    /// The next `method` view stays pending until the returned handle is
    /// resolved.
    pub fn hold_view(&self, method: &str) -> Release<Value> {
        let (tx, rx) = oneshot::channel();
        self.lock()
            .queued_views
            .entry(method.to_string())
            .or_default()
            .push_back(Scripted::Held(rx));
        Release { tx }
    }

    pub fn push_call(&self, result: Result<TxOutcome, GatewayError>) {
        self.lock().queued_calls.push_back(Scripted::Ready(result));
    }

    pub fn hold_call(&self) -> Release<TxOutcome> {
        let (tx, rx) = oneshot::channel();
        self.lock().queued_calls.push_back(Scripted::Held(rx));
        Release { tx }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method() == method)
            .cloned()
            .collect()
    }

    /// Highest number of simultaneously pending views seen for one
    /// `(method, args)` pair.
    pub fn peak_in_flight(&self, method: &str, args: &Value) -> usize {
        self.lock()
            .peak_in_flight
            .get(&flight_key(method, args))
            .copied()
            .unwrap_or(0)
    }

    fn enter_flight(&self, key: &str) {
        let mut state = self.lock();
        let now = {
            let count = state.in_flight.entry(key.to_string()).or_default();
            *count += 1;
            *count
        };
        let peak = state.peak_in_flight.entry(key.to_string()).or_default();
        *peak = (*peak).max(now);
    }

    fn leave_flight(&self, key: &str) {
        if let Some(count) = self.lock().in_flight.get_mut(key) {
            *count = count.saturating_sub(1);
        }
    }
}

fn flight_key(method: &str, args: &Value) -> String {
    format!("{method}:{args}")
}

async fn settle<T>(scripted: Scripted<T>) -> Result<T, GatewayError> {
    match scripted {
        Scripted::Ready(result) => result,
        Scripted::Held(rx) => rx
            .await
            .unwrap_or_else(|_| Err(GatewayError::rpc("held response was dropped"))),
    }
}

impl Wallet for FakeWallet {
    async fn start_up(&self) -> Result<bool> {
        Ok(self.lock().signed_in)
    }

    async fn sign_in(&self) -> Result<String> {
        let mut state = self.lock();
        state.signed_in = true;
        if state.account.is_empty() {
            state.account = String::from("alice.testnet");
        }
        Ok(state.account.clone())
    }

    fn sign_out(&self) {
        self.lock().signed_in = false;
    }

    fn is_signed_in(&self) -> bool {
        self.lock().signed_in
    }

    fn account_id(&self) -> Option<String> {
        let state = self.lock();
        state.signed_in.then(|| state.account.clone())
    }

    async fn view_method(&self, call: ViewCall<'_>) -> Result<Value, GatewayError> {
        let key = flight_key(call.method, call.args);
        let scripted = {
            let mut state = self.lock();
            state.calls.push(RecordedCall::View {
                contract_id: call.contract_id.to_string(),
                method: call.method.to_string(),
                args: call.args.clone(),
            });
            let queued = state
                .queued_views
                .get_mut(call.method)
                .and_then(VecDeque::pop_front);
            match queued {
                Some(scripted) => scripted,
                None => Scripted::Ready(
                    state
                        .default_views
                        .get(call.method)
                        .cloned()
                        .unwrap_or_else(|| {
                            Err(GatewayError::rpc(format!(
                                "no scripted response for `{}`",
                                call.method
                            )))
                        }),
                ),
            }
        };
        self.enter_flight(&key);
        let result = settle(scripted).await;
        self.leave_flight(&key);
        result
    }

    async fn call_method(&self, call: FunctionCall<'_>) -> Result<TxOutcome, GatewayError> {
        let scripted = {
            let mut state = self.lock();
            if !state.signed_in {
                return Err(GatewayError::not_authorized(call.method));
            }
            state.calls.push(RecordedCall::Call {
                contract_id: call.contract_id.to_string(),
                method: call.method.to_string(),
                args: call.args.clone(),
                deposit: call.deposit,
            });
            let count = state.calls.len();
            state.queued_calls.pop_front().unwrap_or_else(|| {
                Scripted::Ready(Ok(TxOutcome {
                    transaction_hash: format!("fake-tx-{count}"),
                    logs: Vec::new(),
                }))
            })
        };
        settle(scripted).await
    }
}
