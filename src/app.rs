use crate::{
    catalog::MatchCatalog,
    estimator::{
        EstimateOutcome,
        EstimateState,
        EstimateTicket,
        WinningsEstimator,
        run_estimate,
    },
    gateway::ContractGateway,
    model::{
        BetRecord,
        Side,
        TxOutcome,
        display_meta,
    },
    submission::{
        BetSubmission,
        SubmissionError,
        can_submit,
    },
    selection::SelectionCoordinator,
    ui,
    wallet::Wallet,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use crossterm::event::EventStream;
use futures::{
    FutureExt,
    StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use std::time::Duration;
use tracing::{
    error,
    info,
};

const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug, PartialEq)]
pub struct MatchRow {
    pub id: String,
    pub title: String,
    pub side_a_meta: String,
    pub side_b_meta: String,
    pub finished: bool,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormView {
    pub match_id: String,
    pub title: String,
    pub side: Side,
    pub side_options: Vec<Side>,
    pub stake: String,
    pub estimate: f64,
    pub computing: bool,
    pub estimate_error: Option<String>,
    pub can_submit: bool,
    pub submitting: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BetsView {
    pub match_id: String,
    pub bets: Vec<BetRecord>,
}

/// Everything the UI needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSnapshot {
    pub network: String,
    pub contract_id: String,
    pub account: Option<String>,
    pub signed_in: bool,
    pub selection_enabled: bool,
    pub matches: Vec<MatchRow>,
    pub catalog_freshness: String,
    pub cursor: usize,
    pub form: Option<FormView>,
    pub bets: Option<BetsView>,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController<W> {
    gateway: ContractGateway<W>,
    catalog: MatchCatalog,
    selection: SelectionCoordinator,
    estimator: WinningsEstimator,
    debounce: Duration,
    network: String,
    cursor: usize,
    submitting: bool,
    bets: Option<BetsView>,
    status: String,
    errors: Vec<String>,
}

impl<W: Wallet + 'static> AppController<W> {
    pub fn new(gateway: ContractGateway<W>, debounce: Duration, network: impl Into<String>) -> Self {
        Self {
            gateway,
            catalog: MatchCatalog::empty(),
            selection: SelectionCoordinator::new(false),
            estimator: WinningsEstimator::new(),
            debounce,
            network: network.into(),
            cursor: 0,
            submitting: false,
            bets: None,
            status: String::from("Starting..."),
            errors: Vec::new(),
        }
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn estimator(&self) -> &WinningsEstimator {
        &self.estimator
    }

    pub fn catalog(&self) -> &MatchCatalog {
        &self.catalog
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Restores the wallet session, then loads the catalog once.
    pub async fn start_up(&mut self) {
        match self.gateway.wallet().start_up().await {
            Ok(signed_in) => {
                self.selection.set_signed_in(signed_in);
                match self.gateway.wallet().account_id() {
                    Some(account) if signed_in => {
                        self.set_status(format!("Signed in as {account}"))
                    }
                    _ => self.set_status("Not signed in; press l to sign in"),
                }
            }
            Err(e) => self.push_errors(vec![format!("Wallet start-up failed: {e}")]),
        }
        self.refresh_catalog().await;
    }

    pub async fn refresh_catalog(&mut self) {
        match self.catalog.refresh(&self.gateway).await {
            Ok(()) => {
                self.cursor = self.cursor.min(self.catalog.len().saturating_sub(1));
                let count = self.catalog.len();
                self.set_status(format!("Loaded {count} match(es)"));
            }
            Err(e) => self.push_errors(vec![format!("Loading matches failed: {e}")]),
        }
    }

    pub async fn toggle_session(&mut self) {
        let wallet = std::sync::Arc::clone(self.gateway.wallet());
        if wallet.is_signed_in() {
            wallet.sign_out();
            if self.selection.set_signed_in(false) {
                self.estimator.select_match(None);
            }
            self.set_status("Signed out");
            return;
        }
        match wallet.sign_in().await {
            Ok(account) => {
                self.selection.set_signed_in(true);
                self.set_status(format!("Signed in as {account}"));
            }
            Err(e) => self.push_errors(vec![format!("Sign in failed: {e:#}")]),
        }
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        let max = self.catalog.len().saturating_sub(1);
        self.cursor = (self.cursor + 1).min(max);
    }

    /// The interactive path: refuses while signed out.
    pub fn select_at_cursor(&mut self) -> bool {
        if !self.selection.selection_enabled() {
            self.set_status("Sign in to select a match");
            return false;
        }
        let Some(id) = self.catalog.matches().get(self.cursor).map(|m| m.id.clone()) else {
            return false;
        };
        self.select_match(id);
        true
    }

    /// Stores the selection without checking the session, the way any
    /// caller outside the UI would.
    pub fn select_match(&mut self, match_id: impl Into<String>) {
        let match_id = match_id.into();
        if self.selection.select(match_id.clone()) {
            self.estimator.select_match(Some(match_id.clone()));
            if let Some(pos) = self.catalog.position(&match_id) {
                self.cursor = pos;
            }
        }
    }

    pub fn set_side(&mut self, side: Side) -> Option<EstimateTicket> {
        if !self.selection.is_form_visible() {
            return None;
        }
        self.estimator.set_side(side)
    }

    pub fn cycle_side(&mut self, forward: bool) -> Option<EstimateTicket> {
        let options: Vec<Side> = match self.selection.active_match(&self.catalog) {
            Some(m) => m.side_options().to_vec(),
            None => return None,
        };
        let current = options
            .iter()
            .position(|side| side == &self.estimator.input().side)
            .unwrap_or(0);
        let len = options.len();
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.set_side(options[next].clone())
    }

    pub fn set_stake(&mut self, stake: impl Into<String>) -> Option<EstimateTicket> {
        if !self.selection.is_form_visible() {
            return None;
        }
        self.estimator.set_stake(stake)
    }

    pub fn estimate_future(&self, ticket: EstimateTicket) -> LocalBoxFuture<'static, EstimateOutcome> {
        run_estimate(self.gateway.clone(), ticket, self.debounce).boxed_local()
    }

    pub fn apply_estimate(&mut self, outcome: EstimateOutcome) -> bool {
        self.estimator.resolve(outcome)
    }

    /// Validates the form. A bet already in progress blocks another one.
    pub fn begin_submission(&mut self) -> Option<BetSubmission> {
        if self.submitting {
            self.set_status("A bet is already being placed");
            return None;
        }
        if !self.selection.is_form_visible() {
            return None;
        }
        let match_id = self.selection.selected()?.to_string();
        match BetSubmission::prepare(match_id, self.estimator.input()) {
            Ok(bet) => {
                self.submitting = true;
                self.set_status(format!(
                    "Placing {} on {}...",
                    bet.deposit(),
                    bet.side()
                ));
                Some(bet)
            }
            Err(e) => {
                self.push_errors(vec![format!("Bet not placed: {e}")]);
                None
            }
        }
    }

    pub fn submission_future(
        &self,
        bet: BetSubmission,
    ) -> LocalBoxFuture<'static, Result<TxOutcome, SubmissionError>> {
        let gateway = self.gateway.clone();
        async move { bet.submit(&gateway).await }.boxed_local()
    }

    pub fn finish_submission(&mut self, result: Result<TxOutcome, SubmissionError>) {
        self.submitting = false;
        match result {
            Ok(outcome) => {
                let mut status = format!("Bet placed ({})", outcome.transaction_hash);
                if let Some(log) = outcome.logs.last() {
                    status.push_str(&format!(": {log}"));
                }
                self.set_status(status);
            }
            Err(e) => self.push_errors(vec![format!("Bet failed: {e}")]),
        }
    }

    /// Opens the bets view for the selected match, or the one under the
    /// cursor when nothing is selected.
    pub async fn load_bets(&mut self) {
        let match_id = match self.selection.selected() {
            Some(id) => id.to_string(),
            None => match self.catalog.matches().get(self.cursor) {
                Some(m) => m.id.clone(),
                None => return,
            },
        };
        match self.gateway.get_bets(&match_id, None).await {
            Ok(bets) => {
                self.set_status(format!("{} bet(s) on {match_id}", bets.len()));
                self.bets = Some(BetsView { match_id, bets });
            }
            Err(e) => self.push_errors(vec![format!("Loading bets failed: {e}")]),
        }
    }

    pub fn close_bets(&mut self) {
        self.bets = None;
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let selected = self.selection.selected();
        let matches = self
            .catalog
            .matches()
            .iter()
            .map(|m| MatchRow {
                id: m.id.clone(),
                title: m.title(),
                side_a_meta: display_meta(&m.side_a_meta),
                side_b_meta: display_meta(&m.side_b_meta),
                finished: m.is_finished(),
                selected: selected == Some(m.id.as_str()),
            })
            .collect();
        let form = match selected {
            Some(match_id) if self.selection.is_form_visible() => {
                let active = self.selection.active_match(&self.catalog);
                let input = self.estimator.input();
                Some(FormView {
                    match_id: match_id.to_string(),
                    title: active.map(|m| m.title()).unwrap_or_else(|| match_id.to_string()),
                    side: input.side.clone(),
                    side_options: active
                        .map(|m| m.side_options().to_vec())
                        .unwrap_or_else(|| vec![Side::Unselected]),
                    stake: input.stake.clone(),
                    estimate: self.estimator.estimate(),
                    computing: matches!(self.estimator.state(), EstimateState::Computing { .. }),
                    estimate_error: self.estimator.last_error().map(|e| e.to_string()),
                    can_submit: can_submit(input) && !self.submitting,
                    submitting: self.submitting,
                })
            }
            _ => None,
        };
        AppSnapshot {
            network: self.network.clone(),
            contract_id: self.gateway.contract_id().to_string(),
            account: self.gateway.wallet().account_id(),
            signed_in: self.selection.is_signed_in(),
            selection_enabled: self.selection.selection_enabled(),
            matches,
            catalog_freshness: self.catalog.freshness(),
            cursor: self.cursor,
            form,
            bets: self.bets.clone(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        info!(status = %self.status);
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

pub async fn run_app<W: Wallet + 'static>(controller: AppController<W>) -> Result<()> {
    let mut ui_state = ui::UiState::default();
    let mut input_events = EventStream::new();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

fn show_processing_status<W: Wallet + 'static>(
    controller: &mut AppController<W>,
    ui_state: &mut ui::UiState,
    message: impl Into<String>,
    context: &'static str,
) -> Result<()> {
    controller.set_status(message);
    ui::draw(ui_state, &controller.snapshot()).wrap_err(context)
}

async fn run_loop<W: Wallet + 'static>(
    mut controller: AppController<W>,
    ui_state: &mut ui::UiState,
    input_events: &mut EventStream,
) -> Result<()> {
    info!("Running app loop");
    show_processing_status(
        &mut controller,
        ui_state,
        "Loading matches...",
        "draw before start-up failed",
    )?;
    controller.start_up().await;
    ui::draw(ui_state, &controller.snapshot()).wrap_err("draw after start-up failed")?;

    let mut estimates: FuturesUnordered<LocalBoxFuture<'static, EstimateOutcome>> =
        FuturesUnordered::new();
    let mut submission: Option<LocalBoxFuture<'static, Result<TxOutcome, SubmissionError>>> =
        None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            Some(outcome) = estimates.next(), if !estimates.is_empty() => {
                controller.apply_estimate(outcome);
            }
            result = async {
                match submission.as_mut() {
                    Some(pending) => pending.await,
                    None => std::future::pending().await,
                }
            }, if submission.is_some() => {
                submission = None;
                controller.finish_submission(result);
            }
            maybe_event = input_events.next() => {
                let event = match maybe_event {
                    Some(event) => event.wrap_err("reading terminal input failed")?,
                    None => break,
                };
                let snapshot = controller.snapshot();
                let Some(ev) = ui::interpret_event(ui_state, &snapshot, event) else {
                    continue;
                };
                let ticket = match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => None,
                    ui::UserEvent::CursorUp => {
                        controller.cursor_up();
                        None
                    }
                    ui::UserEvent::CursorDown => {
                        controller.cursor_down();
                        None
                    }
                    ui::UserEvent::SelectMatch => {
                        controller.select_at_cursor();
                        None
                    }
                    ui::UserEvent::ToggleSession => {
                        if !snapshot.signed_in {
                            show_processing_status(
                                &mut controller,
                                ui_state,
                                "Signing in...",
                                "draw while signing in failed",
                            )?;
                        }
                        controller.toggle_session().await;
                        None
                    }
                    ui::UserEvent::Refresh => {
                        show_processing_status(
                            &mut controller,
                            ui_state,
                            "Refreshing matches...",
                            "draw while refreshing failed",
                        )?;
                        controller.refresh_catalog().await;
                        None
                    }
                    ui::UserEvent::NextSide => controller.cycle_side(true),
                    ui::UserEvent::PrevSide => controller.cycle_side(false),
                    ui::UserEvent::SetStake(stake) => controller.set_stake(stake),
                    ui::UserEvent::Submit => {
                        if let Some(bet) = controller.begin_submission() {
                            submission = Some(controller.submission_future(bet));
                        }
                        None
                    }
                    ui::UserEvent::ViewBets => {
                        show_processing_status(
                            &mut controller,
                            ui_state,
                            "Loading bets...",
                            "draw while loading bets failed",
                        )?;
                        controller.load_bets().await;
                        None
                    }
                    ui::UserEvent::CloseBets => {
                        controller.close_bets();
                        None
                    }
                };
                if let Some(ticket) = ticket {
                    estimates.push(controller.estimate_future(ticket));
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}
