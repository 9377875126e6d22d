//! Conversational-agent collaborator: a hosted chat model with a bounded
//! running memory of recent turns and a calculator tool it may call through
//! function calling.

use std::collections::VecDeque;

use crate::calc;
use crate::openai::{
    ChatCompletion, ChatRequest, FunctionDef, OpenAiClient, ToolDef, WireMessage,
};
use crate::router::{Agent, QueryError};

/// Fixed system instruction, set once at startup. The model is steered to
/// the calculator tool for arithmetic instead of guessing.
pub const SYSTEM_PROMPT: &str = "\
You are a helpful assistant able to discuss a wide range of topics and answer \
questions conversationally.

You are terrible at mental arithmetic. For any math, no matter how simple, \
call the `calculator` tool instead of working it out yourself, and report the \
tool's result.";

const CALCULATOR_TOOL: &str = "calculator";

/// Seam over the chat completions call so the tool loop and memory window
/// are testable without a network.
pub trait ChatApi {
    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, QueryError>;
}

impl ChatApi for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, QueryError> {
        self.chat(request)
    }
}

pub struct ChatAgent {
    api: Box<dyn ChatApi>,
    model: String,
    memory_window: usize,
    max_tool_iterations: usize,
    /// Last k (user, assistant) pairs, oldest first.
    memory: VecDeque<(String, String)>,
}

impl ChatAgent {
    pub fn new(
        api: Box<dyn ChatApi>,
        model: &str,
        memory_window: usize,
        max_tool_iterations: usize,
    ) -> Self {
        Self {
            api,
            model: model.to_string(),
            memory_window,
            max_tool_iterations,
            memory: VecDeque::new(),
        }
    }

    fn base_messages(&self, prompt: &str) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(self.memory.len() * 2 + 2);
        messages.push(WireMessage::text("system", SYSTEM_PROMPT));
        for (user, assistant) in &self.memory {
            messages.push(WireMessage::text("user", user.clone()));
            messages.push(WireMessage::text("assistant", assistant.clone()));
        }
        messages.push(WireMessage::text("user", prompt));
        messages
    }

    fn remember(&mut self, user: &str, assistant: &str) {
        self.memory.push_back((user.to_string(), assistant.to_string()));
        while self.memory.len() > self.memory_window {
            self.memory.pop_front();
        }
    }
}

impl Agent for ChatAgent {
    fn invoke(&mut self, prompt: &str) -> Result<String, QueryError> {
        let mut messages = self.base_messages(prompt);

        for round in 0..=self.max_tool_iterations {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                tools: Some(vec![calculator_tool()]),
                temperature: 0.0,
            };
            let completion = self.api.complete(&request)?;
            let choice = completion
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| QueryError::Unavailable {
                    reason: "chat response had no choices".to_string(),
                })?;

            match choice.message.tool_calls {
                Some(calls) if !calls.is_empty() => {
                    if round == self.max_tool_iterations {
                        return Err(QueryError::Unavailable {
                            reason: "calculator tool iteration limit reached".to_string(),
                        });
                    }
                    messages.push(WireMessage {
                        role: "assistant".to_string(),
                        content: choice.message.content,
                        tool_calls: Some(calls.clone()),
                        tool_call_id: None,
                    });
                    for call in &calls {
                        let output = run_calculator(&call.function.arguments);
                        tracing::debug!(tool = %call.function.name, %output, "tool call");
                        messages.push(WireMessage::tool_result(&call.id, output));
                    }
                }
                _ => {
                    let answer = choice.message.content.unwrap_or_default();
                    self.remember(prompt, &answer);
                    return Ok(answer);
                }
            }
        }
        unreachable!("tool loop always returns within the iteration bound")
    }
}

fn calculator_tool() -> ToolDef {
    ToolDef {
        tool_type: "function".to_string(),
        function: FunctionDef {
            name: CALCULATOR_TOOL.to_string(),
            description: "Evaluates an arithmetic expression and returns the numeric result."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Arithmetic expression, e.g. \"2 + 2 * 3\""
                    }
                },
                "required": ["expression"]
            }),
        },
    }
}

/// Executes one calculator call. Malformed arguments or expressions produce
/// an error string fed back to the model, not a query failure.
fn run_calculator(arguments: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Args {
        expression: String,
    }

    let args: Args = match serde_json::from_str(arguments) {
        Ok(a) => a,
        Err(e) => return format!("calculator error: bad arguments: {}", e),
    };
    match calc::evaluate(&args.expression) {
        Ok(value) => format_number(value),
        Err(e) => format!("calculator error: {}", e),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::{Choice, FunctionCall, ResponseMessage, ToolCall};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Serves canned completions and records each request as JSON.
    struct Scripted {
        responses: RefCell<VecDeque<ChatCompletion>>,
        requests: RefCell<Vec<serde_json::Value>>,
    }

    impl Scripted {
        fn new(responses: Vec<ChatCompletion>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl ChatApi for Rc<Scripted> {
        fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, QueryError> {
            self.requests
                .borrow_mut()
                .push(serde_json::to_value(request).unwrap());
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| QueryError::Unavailable {
                    reason: "script exhausted".to_string(),
                })
        }
    }

    fn text_completion(content: &str) -> ChatCompletion {
        ChatCompletion {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: Some(content.to_string()),
                    tool_calls: None,
                },
            }],
        }
    }

    fn tool_completion(expression: &str) -> ChatCompletion {
        ChatCompletion {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: None,
                    tool_calls: Some(vec![ToolCall {
                        id: "call_1".to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: CALCULATOR_TOOL.to_string(),
                            arguments: format!("{{\"expression\": \"{}\"}}", expression),
                        },
                    }]),
                },
            }],
        }
    }

    #[test]
    fn test_plain_answer_no_tools() {
        let api = Rc::new(Scripted::new(vec![text_completion("hello there")]));
        let mut agent = ChatAgent::new(Box::new(api), "test-model", 5, 3);
        assert_eq!(agent.invoke("hi").unwrap(), "hello there");
    }

    #[test]
    fn test_tool_round_feeds_result_back() {
        let api = Rc::new(Scripted::new(vec![
            tool_completion("2+2"),
            text_completion("The answer is 4."),
        ]));

        let mut agent = ChatAgent::new(Box::new(Rc::clone(&api)), "test-model", 5, 3);
        assert_eq!(agent.invoke("what is 2+2?").unwrap(), "The answer is 4.");

        let requests = api.requests.borrow();
        assert_eq!(requests.len(), 2);
        let second = requests[1]["messages"].as_array().unwrap();
        let tool_msg = second.iter().find(|m| m["role"] == "tool").unwrap();
        assert_eq!(tool_msg["content"], "4");
        assert_eq!(tool_msg["tool_call_id"], "call_1");
    }

    #[test]
    fn test_tool_iteration_limit() {
        let api = Rc::new(Scripted::new(vec![
            tool_completion("1+1"),
            tool_completion("2+2"),
            tool_completion("3+3"),
        ]));
        let mut agent = ChatAgent::new(Box::new(api), "test-model", 5, 2);
        match agent.invoke("loop forever") {
            Err(QueryError::Unavailable { reason }) => {
                assert!(reason.contains("iteration limit"));
            }
            other => panic!("expected iteration limit error, got {:?}", other),
        }
    }

    #[test]
    fn test_memory_window_bounds_context() {
        let api = Rc::new(Scripted::new(vec![
            text_completion("a1"),
            text_completion("a2"),
            text_completion("a3"),
        ]));

        let mut agent = ChatAgent::new(Box::new(Rc::clone(&api)), "test-model", 1, 3);
        agent.invoke("q1").unwrap();
        agent.invoke("q2").unwrap();
        agent.invoke("q3").unwrap();

        // Third request: system + one remembered pair (q2/a2) + new prompt.
        let requests = api.requests.borrow();
        let third = requests[2]["messages"].as_array().unwrap();
        assert_eq!(third.len(), 4);
        assert_eq!(third[1]["content"], "q2");
        assert_eq!(third[2]["content"], "a2");
        assert_eq!(third[3]["content"], "q3");
    }

    #[test]
    fn test_run_calculator_handles_bad_input() {
        assert_eq!(run_calculator("{\"expression\": \"6*7\"}"), "42");
        assert!(run_calculator("{\"expression\": \"1/0\"}").starts_with("calculator error"));
        assert!(run_calculator("not json").starts_with("calculator error"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(4.5), "4.5");
    }
}
