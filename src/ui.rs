use crate::app::{
    AppSnapshot,
    BetsView,
    FormView,
};
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

const MAX_STAKE_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    CursorUp,
    CursorDown,
    SelectMatch,
    ToggleSession,
    Refresh,
    NextSide,
    PrevSide,
    SetStake(String),
    Submit,
    ViewBets,
    CloseBets,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Focus {
    #[default]
    Matches,
    Form,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    focus: Focus,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if snap.form.is_none() {
        state.focus = Focus::Matches;
    }
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event onto an app action. `None` means nothing to do.
pub fn interpret_event(
    state: &mut UiState,
    snap: &AppSnapshot,
    event: Event,
) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };

    // raw mode delivers Ctrl-C as a key, never as SIGINT
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(UserEvent::Quit);
    }

    if state.mode == Mode::QuitModal {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }

    if snap.bets.is_some() {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('v') | KeyCode::Char('q') => {
                Some(UserEvent::CloseBets)
            }
            _ => None,
        };
    }

    if state.focus == Focus::Form {
        match &snap.form {
            Some(form) => {
                if let Some(ev) = interpret_form_key(state, form, key) {
                    return Some(ev);
                }
            }
            None => state.focus = Focus::Matches,
        }
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Up | KeyCode::Char('k') => Some(UserEvent::CursorUp),
        KeyCode::Down | KeyCode::Char('j') => Some(UserEvent::CursorDown),
        KeyCode::Enter => {
            if snap.selection_enabled {
                state.focus = Focus::Form;
            }
            Some(UserEvent::SelectMatch)
        }
        KeyCode::Tab if snap.form.is_some() => {
            state.focus = Focus::Form;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('l') => Some(UserEvent::ToggleSession),
        KeyCode::Char('r') => Some(UserEvent::Refresh),
        KeyCode::Char('v') => Some(UserEvent::ViewBets),
        _ => None,
    }
}

fn interpret_form_key(state: &mut UiState, form: &FormView, key: KeyEvent) -> Option<UserEvent> {
    match key.code {
        KeyCode::Tab | KeyCode::Esc => {
            state.focus = Focus::Matches;
            Some(UserEvent::Redraw)
        }
        KeyCode::Left => Some(UserEvent::PrevSide),
        KeyCode::Right => Some(UserEvent::NextSide),
        // disabled submit swallows Enter instead of reselecting the match
        KeyCode::Enter => form.can_submit.then_some(UserEvent::Submit).or(Some(UserEvent::Redraw)),
        code => edit_stake(&form.stake, code).map(UserEvent::SetStake),
    }
}

/// Applies one keystroke to the stake text. Only digits and a single
/// decimal point are accepted.
pub fn edit_stake(current: &str, code: KeyCode) -> Option<String> {
    match code {
        KeyCode::Backspace => {
            let mut next = current.to_string();
            next.pop()?;
            Some(next)
        }
        KeyCode::Char(c) if c.is_ascii_digit() && current.len() < MAX_STAKE_LEN => {
            Some(format!("{current}{c}"))
        }
        KeyCode::Char('.') if !current.contains('.') && current.len() < MAX_STAKE_LEN => {
            Some(format!("{current}."))
        }
        _ => None,
    }
}

/// Four decimals, trailing zeros dropped.
pub fn format_winnings(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" || text == "-0" {
        String::from("0")
    } else {
        text.to_string()
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // status
            Constraint::Min(8),    // matches + form
            Constraint::Length(6), // errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    draw_matches(f, state, body[0], snap);
    draw_form(f, state, body[1], snap);
    draw_errors(f, chunks[2], snap);
    draw_help(f, chunks[3], snap);
    draw_modals(f, state, snap);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let account = match &snap.account {
        Some(account) if snap.signed_in => account.as_str(),
        _ => "signed out",
    };
    let status = Paragraph::new(format!(
        "Network: {} | Contract: {} | Account: {}\n{}",
        snap.network, snap.contract_id, account, snap.status
    ))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

fn draw_matches(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let mut lines = Vec::new();
    if snap.matches.is_empty() {
        lines.push(Line::styled("No matches", Style::default().fg(Color::DarkGray)));
    }
    for (i, row) in snap.matches.iter().enumerate() {
        let cur = if i == snap.cursor { ">" } else { " " };
        let mark = if row.selected { "[x]" } else { "[ ]" };
        let finished = if row.finished { " (finished)" } else { "" };
        let text = format!(
            "{cur} {mark} {} ({} / {}){finished}",
            row.title, row.side_a_meta, row.side_b_meta
        );
        let style = if !snap.selection_enabled {
            Style::default().fg(Color::DarkGray)
        } else if row.selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::styled(text, style));
    }
    let title = format!("Matches ({})", snap.catalog_freshness);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(focus_style(state.focus == Focus::Matches));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_form(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Place Bet")
        .border_style(focus_style(state.focus == Focus::Form));
    let Some(form) = &snap.form else {
        let hint = if snap.signed_in {
            "Select a match to place a bet"
        } else {
            "Sign in (l) to place bets"
        };
        let p = Paragraph::new(Line::styled(hint, Style::default().fg(Color::DarkGray)))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let mut lines = vec![
        Line::from(form.title.clone()),
        Line::from(""),
        Line::from(format!("Team:   < {} >", form.side)),
        Line::from(format!("Amount: {}_ NEAR", form.stake)),
    ];
    let pending = if form.computing { " ..." } else { "" };
    lines.push(Line::from(format!(
        "Potential winnings: {} NEAR{pending}",
        format_winnings(form.estimate)
    )));
    if let Some(err) = &form.estimate_error {
        lines.push(Line::styled(
            format!("Estimate unavailable: {err}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    lines.push(Line::from(""));
    let (label, style) = if form.submitting {
        ("[ Placing bet... ]", Style::default().fg(Color::Yellow))
    } else if form.can_submit {
        (
            "[ Place bet ]",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        ("[ Place bet ]", Style::default().fg(Color::DarkGray))
    };
    lines.push(Line::styled(label, style));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_errors(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let visible = area.height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    if snap.errors.is_empty() {
        lines.push(Line::from("No errors"));
    } else {
        let skip = snap.errors.len().saturating_sub(visible);
        for e in snap.errors.iter().skip(skip) {
            lines.push(Line::from(e.clone()));
        }
    }
    let color = if snap.errors.is_empty() {
        Color::DarkGray
    } else {
        Color::Red
    };
    let errors = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Errors"))
        .style(Style::default().fg(color));
    f.render_widget(errors, area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let text = if snap.form.is_some() {
        "↑/↓ move | Enter select/submit | Tab form | ←/→ team | digits amount | l sign in/out | r refresh | v bets | q quit"
    } else {
        "↑/↓ move | Enter select | l sign in/out | r refresh | v bets | q quit"
    };
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    if let Some(bets) = &snap.bets {
        draw_bets_modal(f, bets);
    }
    if state.mode == Mode::QuitModal {
        let area = centered_rect(40, 20, f.area());
        let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
        let p = Paragraph::new("Quit? (Y/N)");
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
    }
}

fn draw_bets_modal(f: &mut Frame, view: &BetsView) {
    let area = centered_rect(70, 60, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Bets on {}", view.match_id));
    let mut lines = Vec::new();
    if view.bets.is_empty() {
        lines.push(Line::from("No bets yet"));
    } else {
        lines.push(Line::styled(
            format!("{:<24} {:<16} {:>10} {:>10} paid", "bettor", "team", "amount", "winnings"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        for bet in &view.bets {
            lines.push(Line::from(format!(
                "{:<24} {:<16} {:>10} {:>10} {}",
                bet.bettor,
                bet.decision,
                format_winnings(bet.bet_amount),
                format_winnings(bet.potential_winnings),
                if bet.payed_out { "yes" } else { "no" }
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Esc=close"));
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(Paragraph::new(lines), block.inner(area));
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
