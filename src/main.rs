mod agent;
mod app;
mod calc;
mod command;
mod config;
mod openai;
mod router;
mod session;
mod transcript;
mod ui;
mod vault;

use std::env;
use std::io;
use std::time::Duration;

use anyhow::Context;
use arboard::Clipboard;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use agent::ChatAgent;
use app::App;
use config::Config;
use openai::OpenAiClient;
use router::QueryRouter;
use session::{Mode, SessionController};
use ui::draw;
use vault::{OpenAiEmbedder, VaultAnswerer, VaultIndex};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_env_and_args(&args);

    init_logging()?;

    let (router, chat_ready, vault_chunks) = build_router(&config);
    let session = SessionController::new(router);
    let mut app = App::new(session, chat_ready, vault_chunks, config.status_timeout_ticks);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, config.tick_rate_ms);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

fn init_logging() -> anyhow::Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("vaultchat.log")
        .context("failed to open vaultchat.log")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Wires the collaborators the configuration allows. A missing key or vault
/// leaves the corresponding slot empty; the session still runs and reports
/// the gap on dispatch.
fn build_router(config: &Config) -> (QueryRouter, bool, Option<usize>) {
    let mut router = QueryRouter::new();
    let mut chat_ready = false;
    let mut vault_chunks = None;

    if config.offline {
        tracing::info!("offline mode, no collaborators wired");
        return (router, chat_ready, vault_chunks);
    }

    let client = match &config.api_key {
        Some(key) => match OpenAiClient::new(key, config.request_timeout) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "failed to build API client");
                None
            }
        },
        None => {
            tracing::warn!("OPENAI_API_KEY not set, chat agent and vault disabled");
            None
        }
    };

    if let Some(client) = &client {
        let agent = ChatAgent::new(
            Box::new(client.clone()),
            &config.chat_model,
            config.memory_window,
            config.max_tool_iterations,
        );
        router = router.with_chat_agent(Box::new(agent));
        chat_ready = true;
        // Code mode stays unwired: the reference configuration has no code
        // collaborator, and dispatching it reports the gap explicitly.
    }

    if let (Some(client), Some(path)) = (&client, &config.vault_path) {
        println!("Building vault index from {}...", path.display());
        let embedder = OpenAiEmbedder::new(client.clone(), &config.embed_model);
        match VaultIndex::build(path, Box::new(embedder)) {
            Ok(index) => {
                let answerer =
                    VaultAnswerer::new(index, client.clone(), &config.chat_model, config.top_k);
                vault_chunks = Some(answerer.chunk_count());
                router = router.with_note_index(Box::new(answerer));
            }
            Err(e) => {
                tracing::warn!(error = %e, vault = %path.display(), "vault index build failed");
                eprintln!("Vault index unavailable: {}", e);
            }
        }
    }

    (router, chat_ready, vault_chunks)
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick_rate_ms: u64,
) -> io::Result<()> {
    loop {
        app.tick();

        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            return Ok(());
        }

        if !event::poll(Duration::from_millis(tick_rate_ms))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => match key.code {
                KeyCode::Esc => {
                    if app.showing_command_popup() && app.command_selection.is_some() {
                        app.reset_command_selection();
                    } else if app.input.is_empty() {
                        return Ok(());
                    } else {
                        app.input.clear();
                        app.reset_command_selection();
                    }
                }
                KeyCode::Enter => {
                    if app.showing_command_popup() && app.command_selection.is_some() {
                        app.apply_command_selection();
                    } else if let Some(text) = app.begin_submit() {
                        // Show the echoed user line before the blocking
                        // collaborator call.
                        terminal.draw(|frame| draw(frame, app))?;
                        app.complete_submit(&text);
                    }
                }
                KeyCode::Tab => {
                    if app.showing_command_popup() && app.command_selection.is_some() {
                        app.apply_command_selection();
                    }
                }
                KeyCode::F(1) => app.switch_mode(Mode::Chat),
                KeyCode::F(2) => app.switch_mode(Mode::Code),
                KeyCode::F(3) => app.switch_mode(Mode::Knowledge),
                KeyCode::Backspace => {
                    app.input.pop();
                    app.reset_command_selection();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(());
                }
                KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if let Ok(mut clipboard) = Clipboard::new() {
                        if let Ok(text) = clipboard.get_text() {
                            app.input.push_str(&flatten_newlines(&text));
                            app.reset_command_selection();
                        }
                    }
                }
                KeyCode::Char(c) => {
                    app.input.push(c);
                    app.reset_command_selection();
                }
                KeyCode::Up => {
                    if app.showing_command_popup() {
                        app.command_select_up();
                    } else {
                        app.scroll_up();
                    }
                }
                KeyCode::Down => {
                    if app.showing_command_popup() {
                        app.command_select_down();
                    } else {
                        app.scroll_down();
                    }
                }
                _ => {}
            },
            Event::Paste(text) => {
                app.input.push_str(&flatten_newlines(&text));
                app.reset_command_selection();
            }
            _ => {}
        }
    }
}

/// The input line is single-line; pasted newlines become spaces.
fn flatten_newlines(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\r')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}
