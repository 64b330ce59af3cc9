//! Model gateway implementations for wordtutor.
//!
//! All providers implement `wordtutor_core::Provider`.

pub mod fallback;
pub mod from_config;
pub mod openai_compat;
mod sse;

pub use fallback::FallbackProvider;
pub use from_config::{BuildError, ChatModel, build_embedder, build_from_config};
pub use openai_compat::OpenAiCompatProvider;
