//! Word study tools: usage, example, collocation, affix, quiz.
//!
//! These are placeholders that return a short lead-in sentence for the
//! requested word. The model fills in the substance; the tools exist so that
//! its function-calling path has something concrete to dispatch to.

use async_trait::async_trait;
use wordtutor_core::error::ToolError;
use wordtutor_core::tool::{Tool, ToolContext, ToolResult};

/// Which facet of the word a tool covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordFacet {
    Usage,
    Example,
    Collocation,
    Affix,
    Quiz,
}

impl WordFacet {
    pub const ALL: [WordFacet; 5] = [
        WordFacet::Usage,
        WordFacet::Example,
        WordFacet::Collocation,
        WordFacet::Affix,
        WordFacet::Quiz,
    ];

    fn tool_name(self) -> &'static str {
        match self {
            WordFacet::Usage => "word_usage",
            WordFacet::Example => "word_example",
            WordFacet::Collocation => "word_collocation",
            WordFacet::Affix => "word_affix",
            WordFacet::Quiz => "word_quiz",
        }
    }

    fn description(self) -> &'static str {
        match self {
            WordFacet::Usage => "获取单词的详细用法",
            WordFacet::Example => "获取单词的例句",
            WordFacet::Collocation => "获取单词的固定搭配",
            WordFacet::Affix => "获取单词的词根词缀分析",
            WordFacet::Quiz => "生成关于单词的选择题",
        }
    }

    fn render(self, word: &str) -> String {
        match self {
            WordFacet::Usage => format!("{word} 的详细用法是..."),
            WordFacet::Example => format!("{word} 的例句是..."),
            WordFacet::Collocation => format!("{word} 的固定搭配有..."),
            WordFacet::Affix => format!("{word} 的词根词缀分析..."),
            WordFacet::Quiz => format!("关于 {word} 的选择题如下..."),
        }
    }
}

pub struct WordTool {
    facet: WordFacet,
}

impl WordTool {
    pub fn new(facet: WordFacet) -> Self {
        Self { facet }
    }

    pub fn facet(&self) -> WordFacet {
        self.facet
    }
}

#[async_trait]
impl Tool for WordTool {
    fn name(&self) -> &str {
        self.facet.tool_name()
    }

    fn description(&self) -> &str {
        self.facet.description()
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "word": {
                    "type": "string",
                    "description": "要查询的英文单词，省略时使用当前学习单词"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: ToolContext<'_>) -> Result<ToolResult, ToolError> {
        let word = match arguments.get("word") {
            None | Some(serde_json::Value::Null) => ctx.word,
            Some(serde_json::Value::String(w)) if w.trim().is_empty() => ctx.word,
            Some(serde_json::Value::String(w)) => w.trim(),
            Some(other) => {
                return Err(ToolError::InvalidArguments(format!(
                    "'word' must be a string, got {other}"
                )));
            }
        };

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: self.facet.render(word),
        })
    }
}
