//! Wires configuration into a ready [`TurnCycle`].

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use wordtutor_config::AppConfig;
use wordtutor_core::KnowledgeBase;
use wordtutor_core::error::MemoryError;
use wordtutor_memory::{EmbeddingIndex, InMemorySessionStore};
use wordtutor_providers::{BuildError, build_embedder, build_from_config};

use crate::retrieval::RetrievalHelper;
use crate::tutor::Tutor;
use crate::turn::TurnCycle;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Document index failed: {0}")]
    Index(#[from] MemoryError),
}

/// Build the model client, tools, optional document index, and session store
/// described by `config`.
///
/// A configured but missing documents directory disables local retrieval
/// with a warning instead of failing startup.
pub async fn build_cycle(config: &AppConfig) -> Result<TurnCycle, RuntimeError> {
    let chat = build_from_config(config)?;

    let knowledge: Option<Arc<dyn KnowledgeBase>> = match build_embedder(config)? {
        Some(embedder) => {
            let retrieval = &config.retrieval;
            let dir = Path::new(&retrieval.documents_dir);
            if dir.is_dir() {
                let mut index = EmbeddingIndex::new(embedder, retrieval.embedding_model.clone(), retrieval.fetch_k);
                index.ingest_dir(dir, retrieval.chunk_chars).await?;
                let helper = RetrievalHelper::new(chat.provider.clone(), chat.model.clone(), Arc::new(index))
                    .with_top_k(retrieval.top_k)
                    .with_temperature(config.model.temperature)
                    .with_max_tokens(config.model.max_tokens);
                Some(Arc::new(helper))
            } else {
                warn!(dir = %dir.display(), "Documents directory not found, local retrieval disabled");
                None
            }
        }
        None => None,
    };

    let tools = Arc::new(wordtutor_tools::default_registry(knowledge));
    info!(model = %chat.model, tools = tools.len(), "Tutor ready");

    let tutor = Tutor::from_config(chat.provider, chat.model, tools, config);
    let store = Arc::new(InMemorySessionStore::new(
        config.tutor.default_word.clone(),
        config.sessions.max_sessions,
    ));

    Ok(TurnCycle::new(store, Arc::new(tutor)).with_greeting(config.tutor.greeting))
}
