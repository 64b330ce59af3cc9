//! Answers questions from the local document collection.

use std::sync::Arc;

use async_trait::async_trait;
use wordtutor_core::KnowledgeBase;
use wordtutor_core::error::ToolError;
use wordtutor_core::tool::{Tool, ToolContext, ToolResult};

pub struct LocalKnowledgeTool {
    knowledge: Arc<dyn KnowledgeBase>,
}

impl LocalKnowledgeTool {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for LocalKnowledgeTool {
    fn name(&self) -> &str {
        "get_info_from_local"
    }

    fn description(&self) -> &str {
        "从本地资料中检索与问题相关的内容并给出简明回答"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "需要查询的问题"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: ToolContext<'_>) -> Result<ToolResult, ToolError> {
        let question = arguments["question"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'question' argument".into()))?;

        tracing::debug!(question, word = ctx.word, "Querying local knowledge");
        let answer = self
            .knowledge
            .answer(question, ctx.history)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: answer,
        })
    }
}
