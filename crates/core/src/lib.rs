//! # wordtutor core
//!
//! Domain types, traits, and error definitions for the wordtutor vocabulary
//! assistant. Every other crate in the workspace depends inward on this one.
//!
//! ## Layout
//!
//! - [`message`]: turns, the append-only [`History`], and [`SessionId`]
//! - [`session`]: the per-session state a store hands out
//! - [`provider`]: the language-model gateway trait
//! - [`tool`]: function tools the model may call, plus their registry
//! - [`retrieval`]: document index and knowledge-base seams
//! - [`channel`]: inbound line channels and outbound reply sinks

pub mod error;
pub mod message;
pub mod session;
pub mod provider;
pub mod channel;
pub mod tool;
pub mod retrieval;

pub use error::{Error, Result};
pub use message::{History, Message, Role, SessionId};
pub use session::Session;
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use channel::{Channel, ChannelMessage, ReplySink};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult};
pub use retrieval::{DocumentChunk, DocumentIndex, KnowledgeBase};
