//! Mode-scoped conversation state: three isolated histories, one active mode,
//! and the controller that routes a submitted line through the query router.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::router::{Answer, QueryError, QueryRouter};
use crate::transcript;

/// The three conversation contexts. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Chat,
    Code,
    Knowledge,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Chat, Mode::Code, Mode::Knowledge];

    /// Short label for the mode tabs.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Chat => "Chat",
            Mode::Code => "Code",
            Mode::Knowledge => "Notes",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Chat => write!(f, "chat"),
            Mode::Code => write!(f, "code"),
            Mode::Knowledge => write!(f, "knowledge"),
        }
    }
}

/// One completed user turn. Immutable once created; appended to exactly one
/// mode's history and kept for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub user_text: String,
    pub assistant_text: String,
    pub at: DateTime<Utc>,
}

impl Exchange {
    pub fn new(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            at: Utc::now(),
        }
    }
}

/// Per-mode exchange histories plus the single active-mode flag.
///
/// `append` always targets the history of the mode that is active at the
/// moment of the call; `set_active` never touches history contents. All
/// operations are total over the three-variant domain.
pub struct ModeStore {
    active: Mode,
    chat: Vec<Exchange>,
    code: Vec<Exchange>,
    knowledge: Vec<Exchange>,
}

impl ModeStore {
    /// All histories empty, `Chat` active.
    pub fn new() -> Self {
        Self {
            active: Mode::Chat,
            chat: Vec::new(),
            code: Vec::new(),
            knowledge: Vec::new(),
        }
    }

    pub fn active(&self) -> Mode {
        self.active
    }

    pub fn set_active(&mut self, mode: Mode) {
        self.active = mode;
    }

    /// Appends to the currently active mode's history.
    pub fn append(&mut self, exchange: Exchange) {
        let mode = self.active;
        self.slot_mut(mode).push(exchange);
    }

    pub fn history(&self, mode: Mode) -> &[Exchange] {
        match mode {
            Mode::Chat => &self.chat,
            Mode::Code => &self.code,
            Mode::Knowledge => &self.knowledge,
        }
    }

    fn slot_mut(&mut self, mode: Mode) -> &mut Vec<Exchange> {
        match mode {
            Mode::Chat => &mut self.chat,
            Mode::Code => &mut self.code,
            Mode::Knowledge => &mut self.knowledge,
        }
    }
}

impl Default for ModeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller state. `AwaitingAnswer` only exists for the duration of a
/// blocking `submit` call: the event loop is run-to-completion, so no other
/// event (re-submission, mode switch) can interleave an outstanding query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingAnswer,
}

/// Result of a submit: the user line echoed before dispatch, and the
/// collaborator's answer or failure.
pub struct SubmitOutcome {
    pub echo: String,
    pub result: Result<Answer, QueryError>,
}

/// Top-level orchestration: receives submit and mode-switch events, invokes
/// the router, appends successful exchanges, and produces transcript text.
pub struct SessionController {
    store: ModeStore,
    router: QueryRouter,
    state: SessionState,
}

impl SessionController {
    pub fn new(router: QueryRouter) -> Self {
        Self {
            store: ModeStore::new(),
            router,
            state: SessionState::Idle,
        }
    }

    pub fn active_mode(&self) -> Mode {
        self.store.active()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self, mode: Mode) -> &[Exchange] {
        self.store.history(mode)
    }

    /// Full transcript of the active mode's history.
    pub fn transcript(&self) -> String {
        transcript::render(self.store.history(self.store.active()))
    }

    /// Dispatches `text` to the active mode's collaborator and, on success,
    /// appends the exchange to that mode's history. Blocks until the
    /// collaborator returns. Empty input is dispatched like any other; the
    /// input widget's contents are not validated here.
    ///
    /// On failure no exchange is stored: the echoed user line is the only
    /// trace of the attempt, and it disappears on the next full re-render.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        let mode = self.store.active();
        self.state = SessionState::AwaitingAnswer;
        let echo = transcript::user_line(text);

        tracing::debug!(%mode, len = text.len(), "dispatching query");
        let result = self.router.dispatch(mode, text);

        match &result {
            Ok(answer) => {
                // The blocking dispatch means the active mode cannot have
                // changed since submit time.
                debug_assert_eq!(mode, self.store.active());
                self.store
                    .append(Exchange::new(text, answer.text.clone()));
            }
            Err(err) => {
                tracing::warn!(%mode, error = %err, "query failed");
            }
        }

        self.state = SessionState::Idle;
        SubmitOutcome { echo, result }
    }

    /// Activates `mode` and returns its full transcript, which replaces
    /// whatever was displayed before. Never issues a query and never
    /// mutates any history.
    pub fn switch_mode(&mut self, mode: Mode) -> String {
        self.store.set_active(mode);
        transcript::render(self.store.history(mode))
    }
}
