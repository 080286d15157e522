//! Text-processing agents and their registry.
//!
//! Each agent owns a small family of related tools and implements the
//! [`TextAgent`](crate::domain::TextAgent) trait:
//! - `cleaner` - whitespace, HTML and special-character cleanup
//! - `diacritics` - accent removal and transliteration to ASCII
//! - `analyzer` - statistics, readability and word-frequency metrics
//! - `grammar` - model-backed correction and improvement suggestions
//! - `summarizer` - summaries, key points and headlines
//! - `language` - language identification via trigram profiles
//! - `sentiment` - sentiment analysis and tone transformation
//! - `anonymizer` - detection and removal of sensitive information
//!
//! `registry` routes tool calls to the owning agent; `llm` holds the
//! model client the language-model-backed agents share.

pub mod analyzer;
pub mod anonymizer;
pub mod base;
pub mod cleaner;
pub mod diacritics;
pub mod error;
pub mod grammar;
pub mod language;
pub mod llm;
pub mod registry;
pub mod sentiment;
pub mod summarizer;

use std::sync::Arc;

pub use base::AgentContext;
pub use error::{AgentError, AgentResult};
pub use registry::{AgentInfo, AgentRegistry, ExecutionOutcome, ToolDescriptor};

use analyzer::AnalyzerAgent;
use anonymizer::AnonymizerAgent;
use cleaner::CleanerAgent;
use diacritics::DiacriticsAgent;
use grammar::GrammarAgent;
use language::LanguageAgent;
use sentiment::SentimentAgent;
use summarizer::SummarizerAgent;

/// Construct every agent and register it. Fails only on a tool-name
/// collision, which is a programming error caught at startup.
pub fn build_registry(context: AgentContext) -> anyhow::Result<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(CleanerAgent::new(context.clone())))?;
    registry.register(Arc::new(DiacriticsAgent::new(context.clone())))?;
    registry.register(Arc::new(AnalyzerAgent::new(context.clone())))?;
    registry.register(Arc::new(GrammarAgent::new(context.clone())))?;
    registry.register(Arc::new(SummarizerAgent::new(context.clone())))?;
    registry.register(Arc::new(LanguageAgent::new(context.clone())))?;
    registry.register(Arc::new(SentimentAgent::new(context.clone())))?;
    registry.register(Arc::new(AnonymizerAgent::new(context)))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::testing;

    #[test]
    fn full_registry_has_eight_agents_with_unique_tools() {
        let registry = build_registry(testing::context()).unwrap();

        assert_eq!(registry.agent_count(), 8);
        assert_eq!(registry.tool_count(), 26);
        assert!(registry.has_tool("clean_text"));
        assert!(registry.has_tool("analyze_readability"));
        assert!(registry.has_tool("anonymize_text"));

        let agents: Vec<String> = registry
            .agent_infos()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(
            agents,
            [
                "cleaner",
                "diacritics",
                "analyzer",
                "grammar",
                "summarizer",
                "language",
                "sentiment",
                "anonymizer"
            ]
        );
    }
}
