//! Application state: wires the session controller to the input line,
//! display surface, and status line. Submits happen in two phases so the
//! echoed user line is drawn before the blocking collaborator call.

use chrono::{DateTime, Utc};

use crate::command::{help_text, Action, CommandParser, COMMANDS};
use crate::session::{Mode, SessionController};
use crate::transcript;

pub struct App {
    pub session: SessionController,
    pub input: String,
    /// Full contents of the display surface; replaced wholesale on every
    /// render step.
    pub display: String,
    pub scroll_offset: usize,
    pub is_loading: bool,
    pub status_message: Option<String>,
    pub should_quit: bool,
    pub tick_count: u64,
    status_timeout_ticks: u64,
    status_set_at: u64,

    /// Whether a chat agent is wired (shown in the status bar).
    pub chat_ready: bool,
    /// Vault chunk count when an index was built.
    pub vault_chunks: Option<usize>,
    pub last_activity: Option<DateTime<Utc>>,

    // Command popup state: None = original input, Some(n) = nth filtered
    // command highlighted.
    pub command_selection: Option<usize>,
}

impl App {
    pub fn new(
        session: SessionController,
        chat_ready: bool,
        vault_chunks: Option<usize>,
        status_timeout_ticks: u64,
    ) -> Self {
        Self {
            session,
            input: String::new(),
            display: String::new(),
            scroll_offset: 0,
            is_loading: false,
            status_message: None,
            should_quit: false,
            tick_count: 0,
            status_timeout_ticks,
            status_set_at: 0,
            chat_ready,
            vault_chunks,
            last_activity: None,
            command_selection: None,
        }
    }

    pub fn active_mode(&self) -> Mode {
        self.session.active_mode()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_set_at = self.tick_count;
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;
        if self.status_message.is_some()
            && self.tick_count.saturating_sub(self.status_set_at) > self.status_timeout_ticks
        {
            self.status_message = None;
        }
    }

    // ── Submit flow ──────────────────────────────────────────────────

    /// Phase one of a submit: handles slash commands locally, otherwise
    /// echoes the user line to the display, clears the input, and returns
    /// the text to dispatch. The caller draws a frame before phase two so
    /// the echo is visible while the query blocks.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.input.trim_start().starts_with('/') {
            self.handle_command();
            return None;
        }

        // Empty input is dispatched like any other text; the collaborator
        // sees exactly what the input widget held.
        let text = std::mem::take(&mut self.input);
        self.command_selection = None;
        self.display = self.session.transcript();
        self.display.push_str(&transcript::user_line(&text));
        self.is_loading = true;
        self.scroll_offset = 0;
        self.set_status("Thinking...");
        Some(text)
    }

    /// Phase two: the blocking dispatch and the render that follows it.
    pub fn complete_submit(&mut self, text: &str) {
        let outcome = self.session.submit(text);
        match outcome.result {
            Ok(answer) => {
                self.display = self.session.transcript();
                if answer.sources.is_empty() {
                    self.status_message = None;
                } else {
                    self.set_status(format!("Sources: {}", answer.sources.join(", ")));
                }
                self.last_activity = Some(Utc::now());
            }
            Err(err) => {
                // No exchange was stored; keep the echoed line visible and
                // surface the failure explicitly.
                self.display = self.session.transcript();
                self.display.push_str(&outcome.echo);
                self.set_status(format!("Error: {}", err));
            }
        }
        self.is_loading = false;
        self.scroll_offset = 0;
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        self.display = self.session.switch_mode(mode);
        self.scroll_offset = 0;
        self.status_message = None;
    }

    fn handle_command(&mut self) {
        let input = std::mem::take(&mut self.input);
        self.command_selection = None;
        match CommandParser::parse(&input) {
            Ok(Action::SwitchMode(mode)) => self.switch_mode(mode),
            Ok(Action::Help) => {
                // Shown on the display surface; the next render step
                // replaces it with the active transcript.
                self.display = help_text();
                self.scroll_offset = 0;
            }
            Ok(Action::Quit) => self.should_quit = true,
            Err(message) => self.set_status(message),
        }
    }

    // ── Command popup ────────────────────────────────────────────────

    pub fn showing_command_popup(&self) -> bool {
        self.input.starts_with('/') && !self.input.contains(' ')
    }

    pub fn get_filtered_commands(&self) -> Vec<(&'static str, &'static str)> {
        if !self.input.starts_with('/') {
            return vec![];
        }
        let filter = &self.input[1..];
        COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd[1..].starts_with(filter))
            .copied()
            .collect()
    }

    pub fn command_select_up(&mut self) {
        let filtered = self.get_filtered_commands();
        if filtered.is_empty() {
            return;
        }
        self.command_selection = match self.command_selection {
            None => Some(filtered.len() - 1),
            Some(0) => None,
            Some(n) => Some(n - 1),
        };
    }

    pub fn command_select_down(&mut self) {
        let filtered = self.get_filtered_commands();
        if filtered.is_empty() {
            return;
        }
        self.command_selection = match self.command_selection {
            None => Some(0),
            Some(n) if n >= filtered.len() - 1 => None,
            Some(n) => Some(n + 1),
        };
    }

    pub fn apply_command_selection(&mut self) {
        if let Some(idx) = self.command_selection {
            let filtered = self.get_filtered_commands();
            if let Some((cmd, _)) = filtered.get(idx) {
                self.input = cmd.to_string();
            }
        }
        self.command_selection = None;
    }

    pub fn reset_command_selection(&mut self) {
        self.command_selection = None;
    }

    // ── Scrolling ────────────────────────────────────────────────────

    pub fn display_line_count(&self) -> usize {
        self.display.lines().count()
    }

    pub fn scroll_up(&mut self) {
        if self.scroll_offset < self.display_line_count().saturating_sub(1) {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Agent, QueryError, QueryRouter};

    struct EchoAgent;

    impl Agent for EchoAgent {
        fn invoke(&mut self, prompt: &str) -> Result<String, QueryError> {
            Ok(format!("echo: {}", prompt))
        }
    }

    fn app() -> App {
        let router = QueryRouter::new().with_chat_agent(Box::new(EchoAgent));
        App::new(SessionController::new(router), true, None, 50)
    }

    #[test]
    fn test_submit_two_phase_echo_then_answer() {
        let mut app = app();
        app.input = "hello".to_string();

        let text = app.begin_submit().unwrap();
        assert_eq!(text, "hello");
        assert!(app.input.is_empty());
        assert!(app.is_loading);
        assert_eq!(app.display, "user:\n hello\n");

        app.complete_submit(&text);
        assert!(!app.is_loading);
        assert_eq!(app.display, "user:\n hello\nassistant:\n echo: hello\n");
    }

    #[test]
    fn test_failed_submit_keeps_echo_without_assistant_line() {
        let mut app = App::new(
            SessionController::new(QueryRouter::new()),
            false,
            None,
            50,
        );
        app.input = "hi".to_string();

        let text = app.begin_submit().unwrap();
        app.complete_submit(&text);

        assert_eq!(app.display, "user:\n hi\n");
        assert!(app
            .status_message
            .as_deref()
            .unwrap()
            .starts_with("Error:"));
        assert!(app.session.history(Mode::Chat).is_empty());
    }

    #[test]
    fn test_mode_switch_replaces_display() {
        let mut app = app();
        app.input = "hello".to_string();
        let text = app.begin_submit().unwrap();
        app.complete_submit(&text);

        app.switch_mode(Mode::Knowledge);
        assert_eq!(app.display, "");

        app.switch_mode(Mode::Chat);
        assert_eq!(app.display, "user:\n hello\nassistant:\n echo: hello\n");
    }

    #[test]
    fn test_slash_command_switches_mode_without_dispatch() {
        let mut app = app();
        app.input = "/notes".to_string();

        assert!(app.begin_submit().is_none());
        assert_eq!(app.active_mode(), Mode::Knowledge);
        assert!(app.input.is_empty());
        assert!(app.session.history(Mode::Knowledge).is_empty());
    }

    #[test]
    fn test_empty_submit_is_dispatched() {
        let mut app = app();
        let text = app.begin_submit().unwrap();
        assert_eq!(text, "");
        app.complete_submit(&text);
        assert_eq!(app.session.history(Mode::Chat).len(), 1);
    }

    #[test]
    fn test_popup_filtering_and_cycling() {
        let mut app = app();
        app.input = "/c".to_string();
        assert!(app.showing_command_popup());

        let filtered = app.get_filtered_commands();
        assert_eq!(filtered.len(), 2); // /chat, /code

        app.command_select_down();
        assert_eq!(app.command_selection, Some(0));
        app.command_select_down();
        assert_eq!(app.command_selection, Some(1));
        app.command_select_down();
        assert_eq!(app.command_selection, None);
        app.command_select_up();
        assert_eq!(app.command_selection, Some(1));

        app.apply_command_selection();
        assert_eq!(app.input, "/code");
        assert_eq!(app.command_selection, None);
    }

    #[test]
    fn test_status_message_times_out() {
        let mut app = app();
        app.set_status("hello");
        for _ in 0..50 {
            app.tick();
        }
        assert!(app.status_message.is_some());
        app.tick();
        assert!(app.status_message.is_none());
    }

    #[test]
    fn test_unknown_command_sets_status() {
        let mut app = app();
        app.input = "/bogus".to_string();
        assert!(app.begin_submit().is_none());
        assert!(app.status_message.as_deref().unwrap().contains("/bogus"));
    }
}
