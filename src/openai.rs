//! Blocking HTTP client for the hosted model API: chat completions (with
//! function-calling tools) and embeddings. Shared by the chat agent and the
//! vault index.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::router::QueryError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
    pub temperature: f32,
}

/// One message in the chat completions wire format. `tool_calls` appears on
/// assistant messages that requested a tool; `tool_call_id` on the tool-role
/// message carrying the result back.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: &str, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

/// Function-calling tool definition.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "tool_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn tool_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

// ── Client ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, QueryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Unavailable {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion, QueryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let started = std::time::Instant::now();
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|e| QueryError::Unavailable {
                reason: format!("chat request failed: {}", e),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            return Err(QueryError::Unavailable {
                reason: format!("chat error {}: {}", status, body),
            });
        }

        let completion: ChatCompletion = resp.json().map_err(|e| QueryError::Unavailable {
            reason: format!("bad chat response: {}", e),
        })?;
        tracing::debug!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion"
        );
        Ok(completion)
    }

    /// Embeds each input text, one vector per input, in input order.
    pub fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, QueryError> {
        let url = format!("{}/embeddings", self.base_url);
        let req = EmbeddingsRequest {
            model: model.to_string(),
            input: input.to_vec(),
        };
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .map_err(|e| QueryError::Unavailable {
                reason: format!("embedding request failed: {}", e),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            return Err(QueryError::Unavailable {
                reason: format!("embedding error {}: {}", status, body),
            });
        }

        let body: EmbeddingsResponse = resp.json().map_err(|e| QueryError::Unavailable {
            reason: format!("bad embedding response: {}", e),
        })?;
        if body.data.len() != input.len() {
            return Err(QueryError::Unavailable {
                reason: format!(
                    "embedding count mismatch: sent {}, got {}",
                    input.len(),
                    body.data.len()
                ),
            });
        }
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completion_deserialize_text_answer() {
        let json = r#"{
            "choices": [
                {"message": {"content": "4"}}
            ]
        }"#;

        let completion: ChatCompletion = serde_json::from_str(json).unwrap();

        assert_eq!(completion.choices.len(), 1);
        assert_eq!(completion.choices[0].message.content.as_deref(), Some("4"));
        assert!(completion.choices[0].message.tool_calls.is_none());
    }

    #[test]
    fn test_chat_completion_deserialize_tool_call() {
        let json = r#"{
            "choices": [
                {"message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "calculator", "arguments": "{\"expression\": \"2+2\"}"}}
                    ]
                }}
            ]
        }"#;

        let completion: ChatCompletion = serde_json::from_str(json).unwrap();
        let calls = completion.choices[0].message.tool_calls.as_ref().unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "calculator");
        assert!(calls[0].function.arguments.contains("2+2"));
    }

    #[test]
    fn test_chat_request_skips_empty_tools() {
        let req = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![WireMessage::text("user", "hi")],
            tools: None,
            temperature: 0.0,
        };

        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("tools"));
        assert!(!json.contains("tool_call_id"));
    }

    #[test]
    fn test_tool_result_message_shape() {
        let msg = WireMessage::tool_result("call_1", "4");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert_eq!(json["content"], "4");
    }

    #[test]
    fn test_embeddings_response_deserialize() {
        let json = r#"{
            "data": [
                {"embedding": [0.1, 0.2]},
                {"embedding": [0.3, 0.4]}
            ]
        }"#;

        let resp: EmbeddingsResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[1].embedding, vec![0.3, 0.4]);
    }
}
