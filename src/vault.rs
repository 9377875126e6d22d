//! Note-vault collaborator: loads a folder of Markdown notes once at
//! startup, embeds paragraph chunks through a hosted embeddings endpoint,
//! and answers queries from the best-matching chunks with source citations.

use std::path::Path;

use walkdir::WalkDir;

use crate::openai::{ChatRequest, OpenAiClient, WireMessage};
use crate::router::{IndexAnswer, NoteIndex, QueryError};

/// Paragraphs shorter than this are noise (stray headers, separators).
const MIN_CHUNK_CHARS: usize = 8;

/// Seam over the embeddings call so index construction and ranking are
/// testable without a network.
pub trait Embedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QueryError>;
}

/// Hosted embeddings endpoint.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QueryError> {
        self.client.embed(&self.model, texts)
    }
}

/// One paragraph of one note.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    /// Path of the note, relative to the vault root.
    pub source: String,
}

/// In-memory chunk index over a note folder.
pub struct VaultIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    embedder: Box<dyn Embedder>,
}

impl VaultIndex {
    /// Loads every `.md` file under `root`, chunks it, and embeds the
    /// chunks. An empty vault produces a working index that finds nothing.
    pub fn build(root: &Path, embedder: Box<dyn Embedder>) -> Result<Self, QueryError> {
        let chunks = load_chunks(root);
        tracing::info!(vault = %root.display(), chunks = chunks.len(), "building vault index");

        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            embedder.embed(&texts)?
        };

        Ok(Self {
            chunks,
            vectors,
            embedder,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunks most similar to `query`, best first.
    pub fn top_k(&self, query: &str, k: usize) -> Result<Vec<&Chunk>, QueryError> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self
            .embedder
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::Unavailable {
                reason: "empty query embedding".to_string(),
            })?;

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (cosine(&query_vec, v), i))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, i)| &self.chunks[i])
            .collect())
    }
}

fn load_chunks(root: &Path) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let text = match std::fs::read_to_string(entry.path()) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable note");
                continue;
            }
        };
        let source = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();
        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.len() >= MIN_CHUNK_CHARS {
                chunks.push(Chunk {
                    text: paragraph.to_string(),
                    source: source.clone(),
                });
            }
        }
    }
    chunks
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Composes the answering prompt from the retrieved chunks.
pub fn context_prompt(query: &str, chunks: &[&Chunk]) -> String {
    let mut prompt = String::from(
        "Answer the question using only the following notes. \
         If the notes do not contain the answer, say so.\n\n",
    );
    for chunk in chunks {
        prompt.push_str(&format!("[{}]\n{}\n\n", chunk.source, chunk.text));
    }
    prompt.push_str(&format!("Question: {}", query));
    prompt
}

/// The `NoteIndex` collaborator: ranks chunks, asks the chat model to answer
/// from them, and cites the note paths the answer drew on.
pub struct VaultAnswerer {
    index: VaultIndex,
    client: OpenAiClient,
    model: String,
    top_k: usize,
}

impl VaultAnswerer {
    pub fn new(index: VaultIndex, client: OpenAiClient, model: &str, top_k: usize) -> Self {
        Self {
            index,
            client,
            model: model.to_string(),
            top_k,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.index.chunk_count()
    }
}

impl NoteIndex for VaultAnswerer {
    fn query_with_sources(&self, query: &str) -> Result<IndexAnswer, QueryError> {
        let hits = self.index.top_k(query, self.top_k)?;
        if hits.is_empty() {
            return Ok(IndexAnswer {
                answer: "The vault has no notes to search.".to_string(),
                sources: Vec::new(),
            });
        }

        let sources = dedup_sources(&hits);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::text("user", context_prompt(query, &hits))],
            tools: None,
            temperature: 0.0,
        };
        let completion = self.client.chat(&request)?;
        let answer = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| QueryError::Unavailable {
                reason: "vault answer had no content".to_string(),
            })?;

        Ok(IndexAnswer { answer, sources })
    }
}

fn dedup_sources(chunks: &[&Chunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        if !sources.iter().any(|s| s == &chunk.source) {
            sources.push(chunk.source.clone());
        }
    }
    sources
}
