//! Embedding-backed document index over local text files.
//!
//! Documents are split into paragraph chunks, embedded once at ingest time
//! through the configured provider, and searched by cosine similarity with an
//! MMR re-ranking pass over the top `fetch_k` candidates.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use wordtutor_core::error::MemoryError;
use wordtutor_core::provider::EmbeddingRequest;
use wordtutor_core::{DocumentChunk, DocumentIndex, Provider};

use crate::vector::{mmr_select, top_n};

const EMBED_BATCH: usize = 32;
const DEFAULT_LAMBDA: f32 = 0.5;

pub struct EmbeddingIndex {
    embedder: Arc<dyn Provider>,
    model: String,
    fetch_k: usize,
    lambda: f32,
    chunks: Vec<DocumentChunk>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Provider>, model: impl Into<String>, fetch_k: usize) -> Self {
        Self {
            embedder,
            model: model.into(),
            fetch_k,
            lambda: DEFAULT_LAMBDA,
            chunks: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Relevance/diversity trade-off for MMR. 1.0 disables diversity.
    pub fn with_lambda(mut self, lambda: f32) -> Self {
        self.lambda = lambda.clamp(0.0, 1.0);
        self
    }

    /// Chunk, embed, and store `text` under `source`. Returns chunks added.
    pub async fn ingest(&mut self, source: &str, text: &str, chunk_chars: usize) -> Result<usize, MemoryError> {
        let pieces = chunk_text(text, chunk_chars);
        if pieces.is_empty() {
            return Ok(0);
        }

        for batch in pieces.chunks(EMBED_BATCH) {
            let vectors = self.embed(batch.to_vec()).await?;
            if vectors.len() != batch.len() {
                return Err(MemoryError::EmbeddingFailed(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            self.vectors.extend(vectors);
            self.chunks.extend(batch.iter().map(|text| DocumentChunk {
                source: source.to_string(),
                text: text.clone(),
            }));
        }

        debug!(source, chunks = pieces.len(), "Document ingested");
        Ok(pieces.len())
    }

    /// Ingest every `.txt` and `.md` file directly under `dir`, in name order.
    pub async fn ingest_dir(&mut self, dir: &Path, chunk_chars: usize) -> Result<usize, MemoryError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| MemoryError::Storage(format!("{}: {e}", dir.display())))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?
        {
            let path = entry.path();
            let is_text = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("txt") || e.eq_ignore_ascii_case("md"));
            if is_text {
                paths.push(path);
            }
        }
        paths.sort();

        let mut total = 0;
        for path in &paths {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| MemoryError::Storage(format!("{}: {e}", path.display())))?;
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            total += self.ingest(&source, &text, chunk_chars).await?;
        }

        info!(dir = %dir.display(), files = paths.len(), chunks = total, "Document index built");
        Ok(total)
    }

    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, MemoryError> {
        let response = self
            .embedder
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs,
            })
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;
        Ok(response.embeddings)
    }
}

#[async_trait]
impl DocumentIndex for EmbeddingIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, MemoryError> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::QueryFailed("empty query embedding".into()))?;

        let candidates = top_n(&query_vec, &self.vectors, self.fetch_k.max(k));
        let candidate_vecs: Vec<Vec<f32>> = candidates.iter().map(|&i| self.vectors[i].clone()).collect();

        Ok(mmr_select(&query_vec, &candidate_vecs, k, self.lambda)
            .into_iter()
            .map(|pos| self.chunks[candidates[pos]].clone())
            .collect())
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Split on blank lines, merging short paragraphs up to `max_chars` and
/// hard-splitting long ones on character boundaries.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    let paragraphs = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty());

    for paragraph in paragraphs {
        let len = paragraph.chars().count();
        if len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = paragraph.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let joined = current.chars().count() + len + 1;
        if !current.is_empty() && joined > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordtutor_core::error::ProviderError;
    use wordtutor_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    /// Embeds text as counts of a few marker words.
    struct KeywordEmbedder;

    const MARKERS: [&str; 4] = ["apple", "fruit", "boy", "child"];

    #[async_trait]
    impl Provider for KeywordEmbedder {
        fn name(&self) -> &str {
            "keywords"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("embeddings only".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            let embeddings = request
                .inputs
                .iter()
                .map(|text| {
                    let lower = text.to_lowercase();
                    MARKERS.iter().map(|m| lower.matches(m).count() as f32 + 0.01).collect()
                })
                .collect();
            Ok(EmbeddingResponse { embeddings, model: request.model })
        }
    }

    fn index() -> EmbeddingIndex {
        EmbeddingIndex::new(Arc::new(KeywordEmbedder), "test-embed", 10)
    }

    #[test]
    fn chunk_merges_short_paragraphs() {
        let chunks = chunk_text("one\n\ntwo\n\nthree", 100);
        assert_eq!(chunks, vec!["one\ntwo\nthree"]);
    }

    #[test]
    fn chunk_respects_limit() {
        let chunks = chunk_text("aaaa\n\nbbbb\n\ncccc", 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn chunk_splits_long_paragraph_on_char_boundaries() {
        let chunks = chunk_text("苹果是一种水果", 3);
        assert_eq!(chunks, vec!["苹果是", "一种水", "果"]);
    }

    #[test]
    fn chunk_empty_text() {
        assert!(chunk_text("\n\n  \n\n", 10).is_empty());
    }

    #[tokio::test]
    async fn search_returns_relevant_chunk_first() {
        let mut idx = index();
        idx.ingest("words.md", "An apple is a fruit.\n\nA boy is a male child.", 25)
            .await
            .unwrap();
        assert_eq!(idx.len(), 2);

        let hits = idx.search("boy", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("boy"));
        assert_eq!(hits[0].source, "words.md");
    }

    #[tokio::test]
    async fn search_on_empty_index() {
        assert!(index().search("apple", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ingest_dir_reads_text_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "apple fruit").unwrap();
        std::fs::write(dir.path().join("b.md"), "boy child").unwrap();
        std::fs::write(dir.path().join("c.bin"), "ignored").unwrap();

        let mut idx = index();
        let added = idx.ingest_dir(dir.path(), 200).await.unwrap();
        assert_eq!(added, 2);

        let hits = idx.search("apple", 2).await.unwrap();
        assert_eq!(hits[0].source, "a.txt");
    }

    #[tokio::test]
    async fn ingest_dir_missing_directory() {
        let mut idx = index();
        let err = idx.ingest_dir(Path::new("/nonexistent/docs"), 200).await.unwrap_err();
        assert!(matches!(err, MemoryError::Storage(_)));
    }
}
