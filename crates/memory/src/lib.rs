//! Session storage and document retrieval for wordtutor.

pub mod embedding_index;
pub mod session_store;
pub mod vector;

pub use embedding_index::{EmbeddingIndex, chunk_text};
pub use session_store::{InMemorySessionStore, SessionHandle};
pub use vector::{cosine_similarity, mmr_select, top_n};
