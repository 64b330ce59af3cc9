//! Scripted providers shared by this crate's tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wordtutor_core::error::ProviderError;
use wordtutor_core::message::MessageToolCall;
use wordtutor_core::error::ToolError;
use wordtutor_core::provider::{ChunkStream, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
use wordtutor_core::tool::{Tool, ToolContext, ToolRegistry, ToolResult};
use wordtutor_core::Message;

/// One scripted reply: text split into stream chunks, or tool calls, or an
/// error.
#[derive(Clone)]
pub enum Step {
    Text(Vec<&'static str>),
    Tools(Vec<MessageToolCall>),
    Fail(ProviderError),
    /// Streams the parts, then breaks off with an error.
    Interrupted(Vec<&'static str>),
}

/// Returns scripted steps in order and records every request it sees.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(replies: &[&'static str]) -> Self {
        Self::new(replies.iter().map(|r| Step::Text(vec![r])).collect())
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, request: ProviderRequest) -> Step {
        self.requests.lock().unwrap().push(request);
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: no more steps")
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

/// Minimal `word_usage` stand-in so this crate's tests don't depend on the
/// tools crate.
pub struct UsageTool;

#[async_trait]
impl Tool for UsageTool {
    fn name(&self) -> &str {
        "word_usage"
    }

    fn description(&self) -> &str {
        "usage"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(&self, _args: serde_json::Value, ctx: ToolContext<'_>) -> Result<ToolResult, ToolError> {
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!("{} 的详细用法是...", ctx.word),
        })
    }
}

pub fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(UsageTool));
    Arc::new(registry)
}

fn text_chunk(part: &str) -> Result<StreamChunk, ProviderError> {
    Ok(StreamChunk {
        content: Some(part.to_string()),
        ..StreamChunk::default()
    })
}

fn usage() -> Option<Usage> {
    Some(Usage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 15 })
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let mut message = Message::assistant("");
        match self.next(request) {
            Step::Text(parts) => message.content = parts.concat(),
            Step::Tools(calls) => message.tool_calls = calls,
            Step::Fail(e) => return Err(e),
            Step::Interrupted(_) => return Err(ProviderError::StreamInterrupted("scripted".into())),
        }
        Ok(ProviderResponse { message, usage: usage(), model })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        let step = self.next(request);
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let mut chunks: Vec<Result<StreamChunk, ProviderError>> = Vec::new();
        match step {
            Step::Text(parts) => {
                chunks.extend(parts.into_iter().map(text_chunk));
                chunks.push(Ok(StreamChunk { done: true, usage: usage(), ..StreamChunk::default() }));
            }
            Step::Tools(calls) => {
                chunks.push(Ok(StreamChunk { tool_calls: calls, done: true, ..StreamChunk::default() }));
            }
            Step::Fail(e) => return Err(e),
            Step::Interrupted(parts) => {
                chunks.extend(parts.into_iter().map(text_chunk));
                chunks.push(Err(ProviderError::StreamInterrupted("connection reset".into())));
            }
        }
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}
