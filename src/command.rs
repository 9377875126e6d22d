//! Slash-command parsing for the input line. Mode switches are also bound
//! to F1/F2/F3; the commands are the keyboard-free equivalent.

use crate::session::Mode;

/// Commands shown in the input popup.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/chat", "Switch to the chat agent"),
    ("/code", "Switch to code mode"),
    ("/notes", "Switch to note-vault lookup"),
    ("/help", "Show available commands"),
    ("/quit", "Exit vaultchat"),
];

/// User actions triggered by commands or key bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SwitchMode(Mode),
    Help,
    Quit,
}

pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> Result<Action, String> {
        let input = input.trim();
        if !input.starts_with('/') {
            return Err("Not a command".to_string());
        }

        let (cmd, _args) = input.split_once(' ').unwrap_or((input, ""));

        match cmd {
            "/chat" => Ok(Action::SwitchMode(Mode::Chat)),
            "/code" => Ok(Action::SwitchMode(Mode::Code)),
            "/notes" => Ok(Action::SwitchMode(Mode::Knowledge)),
            "/help" => Ok(Action::Help),
            "/quit" => Ok(Action::Quit),
            _ => Err(format!(
                "Unknown command: {}. Type /help for available commands.",
                cmd
            )),
        }
    }
}

pub fn help_text() -> String {
    let mut text = String::from("Available commands:\n");
    for (cmd, desc) in COMMANDS {
        text.push_str(&format!("  {} - {}\n", cmd, desc));
    }
    text.push_str("Keys: F1/F2/F3 switch modes, Up/Down scroll, Esc clears or exits.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_commands() {
        assert_eq!(
            CommandParser::parse("/chat"),
            Ok(Action::SwitchMode(Mode::Chat))
        );
        assert_eq!(
            CommandParser::parse("/code"),
            Ok(Action::SwitchMode(Mode::Code))
        );
        assert_eq!(
            CommandParser::parse("/notes"),
            Ok(Action::SwitchMode(Mode::Knowledge))
        );
    }

    #[test]
    fn test_trims_and_ignores_args() {
        assert_eq!(CommandParser::parse("  /quit  "), Ok(Action::Quit));
        assert_eq!(CommandParser::parse("/help me please"), Ok(Action::Help));
    }

    #[test]
    fn test_unknown_command() {
        let err = CommandParser::parse("/frobnicate").unwrap_err();
        assert!(err.contains("/frobnicate"));
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert!(CommandParser::parse("hello world").is_err());
    }

    #[test]
    fn test_help_text_lists_every_command() {
        let help = help_text();
        for (cmd, _) in COMMANDS {
            assert!(help.contains(cmd), "missing {}", cmd);
        }
    }
}
