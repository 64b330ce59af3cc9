//! Retrieval seams: a document index that ranks chunks, and a knowledge base
//! that answers questions from them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, MemoryError};
use crate::message::Message;

/// A retrievable slice of a local document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Source file the chunk came from
    pub source: String,

    pub text: String,
}

/// Ranks stored chunks against a query. Ranking quality belongs to the
/// implementation.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<DocumentChunk>, MemoryError>;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Answers a question from local documents, given the conversation so far.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn answer(&self, question: &str, history: &[Message]) -> std::result::Result<String, Error>;
}
