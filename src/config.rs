//! Application configuration. Everything the collaborators need is resolved
//! here, once, from the environment and argv, and passed in explicitly at
//! construction time.

use std::path::PathBuf;
use std::time::Duration;

pub struct Config {
    /// Hosted model API key (`OPENAI_API_KEY`). Absent key leaves the chat
    /// agent and vault index unconfigured; the UI still runs.
    pub api_key: Option<String>,

    /// Note-vault folder (`--vault` or `VAULTCHAT_VAULT`).
    pub vault_path: Option<PathBuf>,

    /// Chat completions model (`--model`).
    pub chat_model: String,

    /// Embeddings model for the vault index.
    pub embed_model: String,

    /// Running-memory window of the chat agent, in exchanges.
    pub memory_window: usize,

    /// Chunks retrieved per vault query.
    pub top_k: usize,

    /// Upper bound on calculator tool rounds per query.
    pub max_tool_iterations: usize,

    /// HTTP timeout; also bounds how long a query can block the UI.
    pub request_timeout: Duration,

    /// Skip all collaborators (`--offline` / `-o`).
    pub offline: bool,

    /// Event poll interval in milliseconds.
    pub tick_rate_ms: u64,

    /// How many ticks a status message stays visible.
    pub status_timeout_ticks: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            vault_path: None,
            chat_model: "gpt-4o-mini".to_string(),
            embed_model: "text-embedding-3-small".to_string(),
            memory_window: 5,
            top_k: 4,
            max_tool_iterations: 3,
            request_timeout: Duration::from_secs(60),
            offline: false,
            tick_rate_ms: 100,
            status_timeout_ticks: 50,
        }
    }
}

impl Config {
    pub fn from_env_and_args(args: &[String]) -> Self {
        let mut config = Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            vault_path: std::env::var("VAULTCHAT_VAULT").ok().map(PathBuf::from),
            ..Self::default()
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--offline" | "-o" => config.offline = true,
                "--vault" => {
                    if let Some(path) = iter.next() {
                        config.vault_path = Some(PathBuf::from(path));
                    }
                }
                "--model" => {
                    if let Some(model) = iter.next() {
                        config.chat_model = model.clone();
                    }
                }
                _ => {}
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.memory_window, 5);
        assert_eq!(config.max_tool_iterations, 3);
        assert_eq!(config.top_k, 4);
        assert!(!config.offline);
    }

    #[test]
    fn test_flag_parsing() {
        let config = Config::from_env_and_args(&args(&[
            "--offline",
            "--vault",
            "/tmp/notes",
            "--model",
            "gpt-4o",
        ]));
        assert!(config.offline);
        assert_eq!(
            config.vault_path.as_deref(),
            Some(std::path::Path::new("/tmp/notes"))
        );
        assert_eq!(config.chat_model, "gpt-4o");
    }

    #[test]
    fn test_short_offline_flag() {
        let config = Config::from_env_and_args(&args(&["-o"]));
        assert!(config.offline);
        assert_eq!(config.chat_model, "gpt-4o-mini");
    }
}
