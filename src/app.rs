//! Terminal front end state. Rendering lives in [`crate::ui`]; every change
//! to a practice session goes through the engine's methods.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::Error;
use crate::model::PracticeMode;
use crate::practice::{PracticeSession, Tally};
use crate::stats::Statistics;
use crate::store::PracticeLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Practice,
    Summary,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

/// One-line message under the current screen, cleared by the next key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusLine {
    fn from_error(err: &Error) -> Self {
        if err.is_validation() {
            return Self {
                kind: StatusKind::Warning,
                text: err.to_string(),
            };
        }
        let text = match err {
            Error::Store(_) => format!("Result not saved: {err}"),
            other => other.to_string(),
        };
        Self {
            kind: StatusKind::Error,
            text,
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub session: Option<PracticeSession>,
    /// Shown above the practice screen, e.g. "🇩🇪 German"
    pub heading: String,
    pub statistics: Option<Statistics>,
    pub status: Option<StatusLine>,
    pub scroll_offset: usize,
    pub now: DateTime<Utc>,
}

impl App {
    pub fn practice(session: PracticeSession, heading: impl Into<String>) -> Self {
        Self {
            state: AppState::Practice,
            session: Some(session),
            heading: heading.into(),
            statistics: None,
            status: None,
            scroll_offset: 0,
            now: Utc::now(),
        }
    }

    pub fn dashboard(statistics: Statistics, now: DateTime<Utc>) -> Self {
        Self {
            state: AppState::Dashboard,
            session: None,
            heading: "Statistics".to_string(),
            statistics: Some(statistics),
            status: None,
            scroll_offset: 0,
            now,
        }
    }

    pub fn tally(&self) -> Tally {
        self.session.as_ref().map(PracticeSession::tally).unwrap_or_default()
    }

    /// Line printed after the terminal is restored
    pub fn exit_summary(&self) -> Option<String> {
        let tally = self.tally();
        if self.session.is_none() || tally.answered == 0 {
            return None;
        }
        Some(format!(
            "{} answers, {} correct ({:.0}%)",
            tally.answered,
            tally.correct,
            tally.success_ratio()
        ))
    }

    pub fn on_key(&mut self, key: KeyEvent, log: &dyn PracticeLog) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }
        self.status = None;

        match self.state {
            AppState::Practice => self.on_practice_key(key, log),
            AppState::Summary => match key.code {
                KeyCode::Char('r') => {
                    self.state = AppState::Practice;
                    Flow::Continue
                }
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Flow::Quit,
                _ => Flow::Continue,
            },
            AppState::Dashboard => self.on_dashboard_key(key),
        }
    }

    fn on_practice_key(&mut self, key: KeyEvent, log: &dyn PracticeLog) -> Flow {
        if key.code == KeyCode::Esc {
            self.state = AppState::Summary;
            return Flow::Continue;
        }
        let Some(session) = self.session.as_mut() else {
            return Flow::Quit;
        };

        let outcome = match session.mode() {
            PracticeMode::Flashcard => flashcard_key(session, key.code, log),
            PracticeMode::MultipleChoice => multiple_choice_key(session, key.code, log),
            PracticeMode::ChainReaction => chain_key(session, key.code, log),
        };

        match outcome {
            Ok(Some(status)) => self.status = Some(status),
            Ok(None) => {}
            Err(e) => self.status = Some(StatusLine::from_error(&e)),
        }
        Flow::Continue
    }

    fn on_dashboard_key(&mut self, key: KeyEvent) -> Flow {
        let rows = self
            .statistics
            .as_ref()
            .map(|s| s.per_language.len())
            .unwrap_or(0);
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Up => self.scroll_offset = self.scroll_offset.saturating_sub(1),
            KeyCode::Down => {
                if self.scroll_offset + 1 < rows {
                    self.scroll_offset += 1;
                }
            }
            KeyCode::Home => self.scroll_offset = 0,
            _ => {}
        }
        Flow::Continue
    }
}

type KeyOutcome = crate::error::Result<Option<StatusLine>>;

fn info(text: impl Into<String>) -> Option<StatusLine> {
    Some(StatusLine {
        kind: StatusKind::Info,
        text: text.into(),
    })
}

fn flashcard_key(session: &mut PracticeSession, code: KeyCode, log: &dyn PracticeLog) -> KeyOutcome {
    match code {
        KeyCode::Char(' ') | KeyCode::Enter if !session.is_revealed() => session.reveal()?,
        KeyCode::Char('y') | KeyCode::Right => session.answer_flashcard(true, log)?,
        KeyCode::Char('n') | KeyCode::Left => session.answer_flashcard(false, log)?,
        KeyCode::Tab => session.next_card()?,
        _ => {}
    }
    Ok(None)
}

fn multiple_choice_key(
    session: &mut PracticeSession,
    code: KeyCode,
    log: &dyn PracticeLog,
) -> KeyOutcome {
    let count = session.options().len();
    match code {
        KeyCode::Char(c @ '1'..='9') => {
            let idx = c as usize - '1' as usize;
            session.select_option(idx)?;
        }
        KeyCode::Up | KeyCode::Down if !session.is_checked() && count > 0 => {
            let current = session.selected_option();
            let next = match (code, current) {
                (KeyCode::Up, Some(i)) => (i + count - 1) % count,
                (KeyCode::Down, Some(i)) => (i + 1) % count,
                (KeyCode::Up, None) => count - 1,
                _ => 0,
            };
            session.select_option(next)?;
        }
        KeyCode::Enter if session.is_checked() => session.next_card()?,
        KeyCode::Enter => {
            let correct = session.check_answer(log)?;
            return Ok(if correct {
                info("Correct!")
            } else {
                info(format!("The answer was: {}", session.current_card().translation))
            });
        }
        _ => {}
    }
    Ok(None)
}

fn chain_key(session: &mut PracticeSession, code: KeyCode, log: &dyn PracticeLog) -> KeyOutcome {
    if session.is_chain_complete() {
        if matches!(code, KeyCode::Enter | KeyCode::Char('r')) {
            session.restart_chain()?;
        }
        return Ok(None);
    }

    match code {
        KeyCode::Char(c) => session.push_chain_char(c),
        KeyCode::Backspace => session.pop_chain_char(),
        KeyCode::Enter => {
            session.submit_chain_answer(log)?;
            if session.is_chain_complete() {
                let (correct, total) = session.chain_score();
                return Ok(info(format!("Chain complete: {correct}/{total}")));
            }
        }
        _ => {}
    }
    Ok(None)
}
