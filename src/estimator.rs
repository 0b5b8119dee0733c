//! Potential-winnings estimate for the bet form.
//!
//! The form's inputs change faster than the ledger answers, so every query is
//! tagged with a sequence number and only the newest one may settle the
//! estimate. Anything older is dropped on arrival.

use crate::{
    error::GatewayError,
    gateway::ContractGateway,
    model::Side,
    wallet::Wallet,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{
            AtomicU8,
            AtomicU64,
            Ordering,
        },
    },
    time::Duration,
};
use tracing::{
    debug,
    warn,
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// What the user has typed into the form for the current match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BetInput {
    pub side: Side,
    pub stake: String,
}

impl BetInput {
    pub fn has_stake(&self) -> bool {
        !self.stake.trim().is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EstimateState {
    #[default]
    Idle,
    Computing {
        seq: u64,
    },
    Settled,
}

/// Result of looking at the inputs alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Derivation {
    Zero,
    Query { side: String, stake: String },
}

/// Decides, without side effects, whether the inputs call for a query.
pub fn derive_estimate(side: &Side, stake: &str) -> Derivation {
    let stake = stake.trim();
    match side.as_team() {
        Some(team) if !stake.is_empty() => Derivation::Query {
            side: team.to_string(),
            stake: stake.to_string(),
        },
        _ => Derivation::Zero,
    }
}

const WAITING: u8 = 0;
const SENT: u8 = 1;
const DONE: u8 = 2;

/// A query the estimator wants issued.
#[derive(Clone, Debug)]
pub struct EstimateTicket {
    pub seq: u64,
    pub match_id: String,
    pub side: String,
    pub stake: String,
    latest: Arc<AtomicU64>,
    phase: Arc<AtomicU8>,
}

impl EstimateTicket {
    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::Acquire) != self.seq
    }
}

type Tuple = (String, String, String);

#[derive(Debug)]
struct InFlight {
    seq: u64,
    phase: Arc<AtomicU8>,
}

/// What came back for a ticket. `result` is `None` when the ticket was
/// superseded before its query went out.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateOutcome {
    pub seq: u64,
    pub match_id: String,
    pub result: Option<Result<f64, GatewayError>>,
}

/// Keep a single instance for the lifetime of the form so sequence numbers
/// keep increasing across match switches.
///
/// `seq` is the ticket allowed to settle the estimate. It usually equals the
/// newest issued number, except when the inputs come back to a tuple whose
/// query is still out; that query is then made current again instead of
/// sending a duplicate.
#[derive(Debug, Default)]
pub struct WinningsEstimator {
    match_id: Option<String>,
    input: BetInput,
    estimate: f64,
    state: EstimateState,
    issued: u64,
    seq: u64,
    latest: Arc<AtomicU64>,
    in_flight: HashMap<Tuple, InFlight>,
    last_error: Option<GatewayError>,
}

impl WinningsEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_id(&self) -> Option<&str> {
        self.match_id.as_deref()
    }

    pub fn input(&self) -> &BetInput {
        &self.input
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn state(&self) -> EstimateState {
        self.state
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn last_error(&self) -> Option<&GatewayError> {
        self.last_error.as_ref()
    }

    /// Switching matches always resets the form, whatever is in flight.
    pub fn select_match(&mut self, match_id: Option<String>) {
        self.match_id = match_id;
        self.input = BetInput::default();
        self.estimate = 0.0;
        self.state = EstimateState::Idle;
        self.last_error = None;
        self.bump();
    }

    pub fn set_side(&mut self, side: Side) -> Option<EstimateTicket> {
        if self.input.side == side {
            return None;
        }
        self.input.side = side;
        self.recompute()
    }

    pub fn set_stake(&mut self, stake: impl Into<String>) -> Option<EstimateTicket> {
        let stake = stake.into();
        if self.input.stake == stake {
            return None;
        }
        self.input.stake = stake;
        self.recompute()
    }

    /// Applies a finished query. Returns false when the outcome was stale and
    /// got dropped.
    pub fn resolve(&mut self, outcome: EstimateOutcome) -> bool {
        self.in_flight.retain(|_, flight| flight.seq != outcome.seq);
        if outcome.seq != self.seq {
            debug!(
                seq = outcome.seq,
                current = self.seq,
                match_id = %outcome.match_id,
                "discarding stale estimate"
            );
            return false;
        }
        match outcome.result {
            None => false,
            Some(Ok(value)) => {
                self.estimate = value;
                self.state = EstimateState::Settled;
                self.last_error = None;
                true
            }
            Some(Err(err)) => {
                warn!(%err, match_id = %outcome.match_id, "estimate query failed");
                self.state = EstimateState::Settled;
                self.last_error = Some(err);
                true
            }
        }
    }

    fn bump(&mut self) -> u64 {
        self.issued += 1;
        self.make_current(self.issued);
        self.seq
    }

    fn make_current(&mut self, seq: u64) {
        self.seq = seq;
        self.latest.store(seq, Ordering::Release);
    }

    fn recompute(&mut self) -> Option<EstimateTicket> {
        let derivation = match &self.match_id {
            Some(_) => derive_estimate(&self.input.side, &self.input.stake),
            None => Derivation::Zero,
        };
        let query = match (derivation, &self.match_id) {
            (Derivation::Query { side, stake }, Some(match_id)) => {
                Some((match_id.clone(), side, stake))
            }
            _ => None,
        };
        let Some(tuple) = query else {
            self.bump();
            self.estimate = 0.0;
            self.state = EstimateState::Idle;
            self.last_error = None;
            return None;
        };

        self.in_flight
            .retain(|_, flight| flight.phase.load(Ordering::Acquire) != DONE);
        if let Some(flight) = self.in_flight.get(&tuple)
            && flight.phase.load(Ordering::Acquire) == SENT
        {
            let seq = flight.seq;
            debug!(seq, match_id = %tuple.0, "estimate already in flight, reusing it");
            self.make_current(seq);
            self.state = EstimateState::Computing { seq };
            return None;
        }

        let seq = self.bump();
        self.state = EstimateState::Computing { seq };
        let phase = Arc::new(AtomicU8::new(WAITING));
        self.in_flight.insert(
            tuple.clone(),
            InFlight {
                seq,
                phase: Arc::clone(&phase),
            },
        );
        let (match_id, side, stake) = tuple;
        Some(EstimateTicket {
            seq,
            match_id,
            side,
            stake,
            latest: Arc::clone(&self.latest),
            phase,
        })
    }
}

/// Waits out the debounce window, then queries unless a newer ticket was
/// issued meanwhile.
pub async fn run_estimate<W: Wallet>(
    gateway: ContractGateway<W>,
    ticket: EstimateTicket,
    debounce: Duration,
) -> EstimateOutcome {
    if !debounce.is_zero() {
        tokio::time::sleep(debounce).await;
    }
    if ticket.is_superseded() {
        ticket.phase.store(DONE, Ordering::Release);
        debug!(seq = ticket.seq, "estimate superseded before query");
        return EstimateOutcome {
            seq: ticket.seq,
            match_id: ticket.match_id,
            result: None,
        };
    }
    ticket.phase.store(SENT, Ordering::Release);
    let result = gateway
        .get_potential_winnings(&ticket.match_id, &ticket.side, &ticket.stake)
        .await;
    ticket.phase.store(DONE, Ordering::Release);
    EstimateOutcome {
        seq: ticket.seq,
        match_id: ticket.match_id,
        result: Some(result),
    }
}
