//! Retrieval-augmented answers over the local document index.
//!
//! # Flow
//!
//! 1. With prior turns, ask the model to rewrite the question so it stands
//!    on its own. Without any, use the question as given.
//! 2. Search the index for the most relevant, mutually diverse chunks.
//! 3. Answer from those chunks in at most three sentences.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use wordtutor_core::error::{Error, MemoryError};
use wordtutor_core::provider::{Provider, ProviderRequest};
use wordtutor_core::retrieval::{DocumentChunk, DocumentIndex, KnowledgeBase};
use wordtutor_core::{Message, Role};

const CONDENSE_PROMPT: &str = "给出聊天记录和最新的用户问题。可能会引用聊天记录中的上下文，提出一个可以理解的独立问题。没有聊天记录，请勿回答。必要时重新配制，否则原样退还。";

const ANSWER_PROMPT: &str = "你是回答问题的助手。使用下列检索到的上下文回答。这个问题。如果你不知道答案，就说你不知道。最多使用三句话，并保持回答简明扼要。\n\n{context}";

pub struct RetrievalHelper {
    provider: Arc<dyn Provider>,
    model: String,
    index: Arc<dyn DocumentIndex>,
    top_k: usize,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl RetrievalHelper {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, index: Arc<dyn DocumentIndex>) -> Self {
        Self {
            provider,
            model: model.into(),
            index,
            top_k: 5,
            temperature: 0.1,
            max_tokens: Some(512),
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: Vec::new(),
            stream: false,
        }
    }

    /// Rewrite `question` into a standalone one using `history`.
    async fn condense(&self, question: &str, history: &[Message]) -> Result<String, Error> {
        if dialogue(history).next().is_none() {
            return Ok(question.to_string());
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(CONDENSE_PROMPT));
        messages.extend(dialogue(history));
        messages.push(Message::user(question));

        let response = self.provider.complete(self.request(messages)).await?;
        let rewritten = response.message.content.trim();
        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>, MemoryError> {
        self.index.search(query, self.top_k).await
    }
}

/// User and assistant text turns. Tool round-trips stay out of retrieval
/// requests, which offer no tools.
fn dialogue(history: &[Message]) -> impl Iterator<Item = Message> + '_ {
    history
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant) && m.tool_calls.is_empty())
        .cloned()
}

fn join_context(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl KnowledgeBase for RetrievalHelper {
    async fn answer(&self, question: &str, history: &[Message]) -> Result<String, Error> {
        let standalone = self.condense(question, history).await?;
        let chunks = self.retrieve(&standalone).await?;
        debug!(query = %standalone, hits = chunks.len(), "Retrieved context");

        let system = ANSWER_PROMPT.replace("{context}", &join_context(&chunks));
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        messages.extend(dialogue(history));
        messages.push(Message::user(question));

        let response = self.provider.complete(self.request(messages)).await?;
        info!(sources = chunks.len(), "Local knowledge answered");
        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use std::sync::Mutex;
    use wordtutor_core::Role;

    struct FixedIndex {
        chunks: Vec<DocumentChunk>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl FixedIndex {
        fn new(texts: &[&str]) -> Self {
            Self {
                chunks: texts
                    .iter()
                    .map(|t| DocumentChunk { source: "notes.md".into(), text: t.to_string() })
                    .collect(),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentIndex for FixedIndex {
        async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, MemoryError> {
            self.queries.lock().unwrap().push((query.to_string(), k));
            Ok(self.chunks.iter().take(k).cloned().collect())
        }

        fn len(&self) -> usize {
            self.chunks.len()
        }
    }

    #[tokio::test]
    async fn without_history_question_is_searched_directly() {
        let provider = Arc::new(ScriptedProvider::texts(&["apple 源自古英语。"]));
        let index = Arc::new(FixedIndex::new(&["apple comes from Old English æppel."]));
        let helper = RetrievalHelper::new(provider.clone(), "m", index.clone());

        let answer = helper.answer("apple 的词源", &[]).await.unwrap();
        assert_eq!(answer, "apple 源自古英语。");
        assert_eq!(provider.calls(), 1);
        assert_eq!(index.queries.lock().unwrap()[0], ("apple 的词源".to_string(), 5));

        let request = &provider.requests()[0];
        assert!(!request.stream);
        assert!(request.tools.is_empty());
        assert!(request.messages[0].content.contains("æppel"));
        assert_eq!(request.messages.last().unwrap().content, "apple 的词源");
    }

    #[tokio::test]
    async fn history_triggers_condense_step() {
        let provider = Arc::new(ScriptedProvider::texts(&["apple 的复数形式是什么？", "apples。"]));
        let index = Arc::new(FixedIndex::new(&["plural: apples", "fruit"]));
        let helper = RetrievalHelper::new(provider.clone(), "m", index.clone()).with_top_k(1);
        let history = vec![Message::user("apple"), Message::assistant("这个单词的意思是‘苹果’")];

        let answer = helper.answer("它的复数呢", &history).await.unwrap();
        assert_eq!(answer, "apples。");

        let queries = index.queries.lock().unwrap();
        assert_eq!(queries[0], ("apple 的复数形式是什么？".to_string(), 1));

        let requests = provider.requests();
        assert_eq!(requests[0].messages[0].content, CONDENSE_PROMPT);
        let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert!(requests[1].messages[0].content.ends_with("plural: apples"));
    }

    #[tokio::test]
    async fn tool_turns_are_left_out_of_requests() {
        let provider = Arc::new(ScriptedProvider::texts(&["它的复数？", "apples。"]));
        let index = Arc::new(FixedIndex::new(&["plural: apples"]));
        let helper = RetrievalHelper::new(provider.clone(), "m", index);

        let mut call_turn = Message::assistant("");
        call_turn.tool_calls = vec![crate::testing::tool_call("c1", "word_usage", "{}")];
        let history = vec![
            Message::user("详细用法"),
            call_turn,
            Message::tool_result("c1", "apple 的详细用法是..."),
            Message::assistant("apple 可以作名词。"),
        ];

        helper.answer("复数呢", &history).await.unwrap();
        for request in provider.requests() {
            assert!(request.messages.iter().all(|m| m.role != Role::Tool && m.tool_calls.is_empty()));
            assert_eq!(request.messages.len(), 4);
        }
    }

    #[tokio::test]
    async fn only_tool_turns_skip_condense() {
        let provider = Arc::new(ScriptedProvider::texts(&["不知道。"]));
        let index = Arc::new(FixedIndex::new(&["x"]));
        let helper = RetrievalHelper::new(provider.clone(), "m", index);
        let history = vec![Message::tool_result("c1", "out")];

        helper.answer("apple", &history).await.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn context_joins_chunks_in_order() {
        let chunks = vec![
            DocumentChunk { source: "a".into(), text: "one".into() },
            DocumentChunk { source: "b".into(), text: "two".into() },
        ];
        assert_eq!(join_context(&chunks), "one\n\ntwo");
    }
}
