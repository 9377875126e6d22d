//! Query routing: picks the external collaborator for the active mode and
//! propagates its answer or failure unchanged. No retries, no caching, no
//! input validation.

use thiserror::Error;

use crate::session::Mode;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Network, auth, or configuration failure from an external call.
    #[error("collaborator unavailable: {reason}")]
    Unavailable { reason: String },
    /// The selected mode has no collaborator wired.
    #[error("no collaborator is wired for {0} mode")]
    UnconfiguredMode(Mode),
}

/// Answer text plus the source citations a document-index collaborator may
/// attach. Sources are shown transiently and never stored in an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}

impl Answer {
    pub fn plain(text: String) -> Self {
        Self {
            text,
            sources: Vec::new(),
        }
    }
}

/// Conversational-agent collaborator. Implementations maintain their own
/// bounded memory of recent turns.
pub trait Agent {
    fn invoke(&mut self, prompt: &str) -> Result<String, QueryError>;
}

/// Answer from a document-index query.
#[derive(Debug, Clone)]
pub struct IndexAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Document-index collaborator, built once at startup from a note folder.
pub trait NoteIndex {
    fn query_with_sources(&self, query: &str) -> Result<IndexAnswer, QueryError>;
}

/// Holds the collaborator for each mode. Slots left empty fail the
/// corresponding dispatch: a missing chat agent or note index means the
/// collaborator could not be configured (`Unavailable`), while the code slot
/// is a known gap in the reference configuration and fails with
/// `UnconfiguredMode` until something is wired into it.
pub struct QueryRouter {
    chat: Option<Box<dyn Agent>>,
    code: Option<Box<dyn Agent>>,
    knowledge: Option<Box<dyn NoteIndex>>,
}

impl QueryRouter {
    pub fn new() -> Self {
        Self {
            chat: None,
            code: None,
            knowledge: None,
        }
    }

    pub fn with_chat_agent(mut self, agent: Box<dyn Agent>) -> Self {
        self.chat = Some(agent);
        self
    }

    pub fn with_code_agent(mut self, agent: Box<dyn Agent>) -> Self {
        self.code = Some(agent);
        self
    }

    pub fn with_note_index(mut self, index: Box<dyn NoteIndex>) -> Self {
        self.knowledge = Some(index);
        self
    }

    /// Invokes exactly one collaborator, selected by `mode`. Empty input is
    /// dispatched like any other text.
    pub fn dispatch(&mut self, mode: Mode, input: &str) -> Result<Answer, QueryError> {
        match mode {
            Mode::Chat => {
                let agent = self.chat.as_mut().ok_or_else(|| QueryError::Unavailable {
                    reason: "chat agent not configured (set OPENAI_API_KEY)".to_string(),
                })?;
                agent.invoke(input).map(Answer::plain)
            }
            Mode::Code => match self.code.as_mut() {
                Some(agent) => agent.invoke(input).map(Answer::plain),
                None => Err(QueryError::UnconfiguredMode(Mode::Code)),
            },
            Mode::Knowledge => {
                let index = self
                    .knowledge
                    .as_ref()
                    .ok_or_else(|| QueryError::Unavailable {
                        reason: "note vault not configured (set VAULTCHAT_VAULT or --vault)"
                            .to_string(),
                    })?;
                index.query_with_sources(input).map(|ia| Answer {
                    text: ia.answer,
                    sources: ia.sources,
                })
            }
        }
    }
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}
