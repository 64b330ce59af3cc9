//! Incremental decoder for OpenAI-style server-sent event streams.
//!
//! Bytes are buffered until a full line is available, so multi-byte UTF-8
//! characters split across network reads are never mangled.

use std::collections::BTreeMap;

use serde::Deserialize;
use wordtutor_core::message::MessageToolCall;
use wordtutor_core::provider::{StreamChunk, Usage};

use crate::openai_compat::ApiUsage;

/// Turns raw SSE bytes into [`StreamChunk`]s.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    usage: Option<ApiUsage>,
    done: bool,
}

impl SseDecoder {
    /// Feed one network read. Returns every chunk completed by it, in order.
    /// The last returned chunk has `done` set once the stream has ended.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some(chunk) = self.decode_line(line) {
                let finished = chunk.done;
                out.push(chunk);
                if finished {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
            }
        }
        out
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    /// The closing chunk for a stream that ended without `[DONE]`.
    pub(crate) fn finish(mut self) -> StreamChunk {
        self.final_chunk()
    }

    fn decode_line(&mut self, line: &str) -> Option<StreamChunk> {
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let data = line.strip_prefix("data:")?.trim();

        if data == "[DONE]" {
            return Some(self.final_chunk());
        }

        let event: StreamResponse = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
                return None;
            }
        };

        let usage_only = event.choices.is_empty();
        let mut content = None;
        if let Some(choice) = event.choices.into_iter().next() {
            for delta in choice.delta.tool_calls.unwrap_or_default() {
                let acc = self.tool_calls.entry(delta.index).or_default();
                if let Some(id) = delta.id {
                    acc.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        acc.name = name;
                    }
                    if let Some(args) = function.arguments {
                        acc.arguments.push_str(&args);
                    }
                }
            }
            content = choice.delta.content.filter(|c| !c.is_empty());
        }

        // Some servers repeat usage on every chunk. Only a choice-less usage
        // event (`include_usage`) ends the stream.
        if let Some(usage) = event.usage {
            self.usage = Some(usage);
            if usage_only {
                return Some(self.final_chunk());
            }
        }

        content.map(|text| StreamChunk {
            content: Some(text),
            ..StreamChunk::default()
        })
    }

    fn final_chunk(&mut self) -> StreamChunk {
        let tool_calls = std::mem::take(&mut self.tool_calls)
            .into_values()
            .map(ToolCallAccumulator::into_tool_call)
            .collect();
        StreamChunk {
            content: None,
            tool_calls,
            done: true,
            usage: self.usage.take().map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// Tool calls arrive in fragments keyed by index.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn into_tool_call(self) -> MessageToolCall {
        MessageToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}
