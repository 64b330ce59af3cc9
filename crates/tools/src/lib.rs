//! Function tools exposed to the tutoring model.
//!
//! - five word study tools, always available
//! - `get_info_from_local`, registered when a knowledge base is configured

pub mod local_knowledge;
pub mod word;

use std::sync::Arc;

use wordtutor_core::KnowledgeBase;
use wordtutor_core::tool::ToolRegistry;

pub use local_knowledge::LocalKnowledgeTool;
pub use word::{WordFacet, WordTool};

/// Registry with every word tool, plus local knowledge when `knowledge` is set.
pub fn default_registry(knowledge: Option<Arc<dyn KnowledgeBase>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for facet in WordFacet::ALL {
        registry.register(Box::new(WordTool::new(facet)));
    }
    if let Some(knowledge) = knowledge {
        registry.register(Box::new(LocalKnowledgeTool::new(knowledge)));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_word_tools() {
        let registry = default_registry(None);
        assert_eq!(
            registry.names(),
            vec!["word_affix", "word_collocation", "word_example", "word_quiz", "word_usage"]
        );
        assert!(registry.get("get_info_from_local").is_none());
    }
}
