//! One model exchange: prompt, call, optional tool round-trips, relay.
//!
//! Tool calls and their results are collected in the exchange transcript
//! alongside the final assistant turn. The caller commits the transcript as
//! a whole once the exchange succeeds, so stored history replays to exactly
//! the requests that produced it.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wordtutor_config::AppConfig;
use wordtutor_core::error::{ChannelError, ProviderError};
use wordtutor_core::message::MessageToolCall;
use wordtutor_core::provider::{ChunkStream, Provider, ProviderRequest, ProviderResponse};
use wordtutor_core::tool::{ToolCall, ToolContext, ToolRegistry};
use wordtutor_core::{Message, ReplySink};

use crate::prompt::{PlaceholderFilter, PromptAssembler, fill_placeholder};

/// A model reply in the shape the call site asked for.
pub enum Reply {
    /// Whole message in one piece.
    Atomic(ProviderResponse),
    /// Ordered increments.
    Streamed(ChunkStream),
}

/// The visible result of an exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exchange {
    /// Everything relayed to the user, placeholders filled.
    pub text: String,
    /// Output of each tool that ran, in call order.
    pub tool_outputs: Vec<String>,
    /// Turns to append to history: tool-call turns and their results, then
    /// the final assistant turn.
    pub transcript: Vec<Message>,
}

impl Exchange {
    /// A single assistant turn that needed no model call.
    pub fn canned(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            transcript: vec![Message::assistant(text.clone())],
            text,
            tool_outputs: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Model gateway error: {0}")]
    Provider(#[from] ProviderError),

    /// The reply sink went away mid-reply.
    #[error("Client disconnected: {0}")]
    Disconnected(#[from] ChannelError),
}

pub struct Tutor {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    streaming: bool,
    tools: Arc<ToolRegistry>,
    max_tool_iterations: usize,
    assembler: PromptAssembler,
}

impl Tutor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.1,
            max_tokens: Some(512),
            streaming: true,
            tools: Arc::new(ToolRegistry::new()),
            max_tool_iterations: 5,
            assembler: PromptAssembler::new(),
        }
    }

    /// Generation settings, template, and iteration cap from config.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        let assembler = config
            .tutor
            .system_prompt
            .as_deref()
            .and_then(PromptAssembler::with_template)
            .unwrap_or_default();
        let tools = if config.tutor.tools_enabled {
            tools
        } else {
            Arc::new(ToolRegistry::new())
        };

        Self::new(provider, model)
            .with_temperature(config.model.temperature)
            .with_max_tokens(config.model.max_tokens)
            .with_streaming(config.model.streaming)
            .with_tools(tools)
            .with_max_tool_iterations(config.tutor.max_tool_iterations)
            .with_assembler(assembler)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Ask for streamed replies. Providers without native streaming fall back
    /// to a single chunk.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Call the model once in the configured mode.
    pub async fn call(&self, request: ProviderRequest) -> Result<Reply, ProviderError> {
        if request.stream {
            Ok(Reply::Streamed(self.provider.stream(request).await?))
        } else {
            Ok(Reply::Atomic(self.provider.complete(request).await?))
        }
    }

    /// Run one exchange and relay the reply to `sink`.
    ///
    /// `history` is the stored context before this exchange; `user_text` is
    /// the new user input, or empty for the session-start greeting.
    pub async fn respond(
        &self,
        word: &str,
        history: &[Message],
        user_text: &str,
        sink: &mut dyn ReplySink,
    ) -> Result<Exchange, TurnError> {
        let mut messages = self.assembler.build(word, history, user_text).messages;
        let definitions = self.tools.definitions();
        let mut exchange = Exchange::default();
        let mut filter = PlaceholderFilter::new(word);

        for iteration in 1..=self.max_tool_iterations {
            // The last round offers no tools so the model has to answer.
            let offer_tools = iteration < self.max_tool_iterations && !definitions.is_empty();
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: if offer_tools { definitions.clone() } else { Vec::new() },
                stream: self.streaming,
            };
            debug!(word, iteration, messages = request.messages.len(), "Calling model");

            let round_start = exchange.text.len();
            let tool_calls = match self.call(request).await? {
                Reply::Atomic(response) => {
                    let text = fill_placeholder(&response.message.content, word);
                    if !text.is_empty() {
                        sink.chunk(&text).await?;
                        exchange.text.push_str(&text);
                    }
                    response.message.tool_calls
                }
                Reply::Streamed(rx) => self.relay(rx, &mut filter, sink, &mut exchange).await?,
            };
            let round_text = exchange.text[round_start..].to_string();

            if tool_calls.is_empty() {
                if round_text.trim().is_empty() {
                    return Err(empty_reply());
                }
                exchange.transcript.push(Message::assistant(round_text));
                sink.finish().await?;
                info!(word, chars = exchange.text.chars().count(), tools = exchange.tool_outputs.len(), "Reply complete");
                return Ok(exchange);
            }

            let mut call_turn = Message::assistant(round_text);
            call_turn.tool_calls = tool_calls.clone();
            messages.push(call_turn.clone());
            exchange.transcript.push(call_turn);
            for tc in &tool_calls {
                let output = self.run_tool(tc, word, history).await;
                exchange.tool_outputs.push(output.clone());
                let result = Message::tool_result(&tc.id, output);
                messages.push(result.clone());
                exchange.transcript.push(result);
            }
        }

        // Only reachable when the model ignores the empty tool list.
        warn!(word, "Model kept requesting tools after the last round");
        Err(TurnError::Provider(ProviderError::ApiError {
            status_code: 502,
            message: "model requested tools after the final round".into(),
        }))
    }

    /// Forward stream chunks through the placeholder filter. Returns the tool
    /// calls carried by the final chunk.
    async fn relay(
        &self,
        mut rx: ChunkStream,
        filter: &mut PlaceholderFilter,
        sink: &mut dyn ReplySink,
        exchange: &mut Exchange,
    ) -> Result<Vec<MessageToolCall>, TurnError> {
        let mut tool_calls = Vec::new();
        while let Some(next) = rx.recv().await {
            let chunk = next?;
            if let Some(content) = chunk.content.as_deref() {
                let ready = filter.push(content);
                if !ready.is_empty() {
                    sink.chunk(&ready).await?;
                    exchange.text.push_str(&ready);
                }
            }
            if chunk.done {
                tool_calls = chunk.tool_calls;
                break;
            }
        }

        let rest = filter.finish();
        if !rest.is_empty() {
            sink.chunk(&rest).await?;
            exchange.text.push_str(&rest);
        }
        Ok(tool_calls)
    }

    async fn run_tool(&self, tc: &MessageToolCall, word: &str, history: &[Message]) -> String {
        let arguments = if tc.arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&tc.arguments).unwrap_or_default()
        };
        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        };

        match self.tools.execute(&call, ToolContext { word, history }).await {
            Ok(result) => {
                debug!(tool = %tc.name, "Tool executed");
                result.output
            }
            Err(e) => {
                warn!(tool = %tc.name, error = %e, "Tool execution failed");
                format!("Error: {e}")
            }
        }
    }
}

fn empty_reply() -> TurnError {
    TurnError::Provider(ProviderError::ApiError {
        status_code: 502,
        message: "model returned an empty reply".into(),
    })
}
