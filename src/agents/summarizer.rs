//! Model-backed summarization: summaries, key points and headlines.
//!
//! Long input is chunked at word boundaries; each chunk is summarized on
//! its own and the partial summaries are combined in one final call.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::agents::base::{bool_arg, chunk_text, text_or_url, usize_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::ChatMessage;
use crate::domain::{TextAgent, Tool, ToolOutput};

pub struct SummarizerAgent {
    context: AgentContext,
}

impl SummarizerAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    async fn chat(&self, system: &str, user: String) -> AgentResult<String> {
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        self.context.client.ensure_model_available(None).await;
        let result = self.context.client.chat(&messages, &Default::default()).await?;
        Ok(result.response.trim().to_string())
    }

    async fn summarize_text(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = text_or_url(&self.context, "summarize_text", args).await?;

        let summary_type = args.get("summary_type").and_then(Value::as_str).unwrap_or("abstractive");
        let length = args.get("length").and_then(Value::as_str).unwrap_or("short");
        let focus = args.get("focus").and_then(Value::as_str).unwrap_or("main_points");
        let compression = args
            .get("compression_ratio")
            .and_then(Value::as_str)
            .unwrap_or("high");

        let system = summary_system_prompt(summary_type, length, focus, compression);
        let chunk_size = self.context.settings().await.text.chunk_size;

        if text.chars().count() <= chunk_size {
            let summary = self
                .chat(&system, format!("Summarize this text:\n\n{text}"))
                .await?;
            return Ok(ToolOutput::Text(summary));
        }

        let chunks = chunk_text(&text, chunk_size);
        debug!(chunks = chunks.len(), "Summarizing long input in parts");

        let mut partials = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let summary = self
                .chat(
                    &system,
                    format!(
                        "Summarize this text (part {} of {}):\n\n{chunk}",
                        i + 1,
                        chunks.len()
                    ),
                )
                .await?;
            partials.push(summary);
        }

        if partials.len() == 1 {
            return Ok(ToolOutput::Text(partials.remove(0)));
        }

        let combined = partials
            .iter()
            .enumerate()
            .map(|(i, summary)| format!("Part {}: {}", i + 1, summary))
            .collect::<Vec<_>>()
            .join("\n\n");
        let final_summary = self
            .chat(
                &system,
                format!(
                    "Combine these partial summaries into one coherent {length} summary:\n\n{combined}"
                ),
            )
            .await?;
        Ok(ToolOutput::Text(final_summary))
    }

    async fn extract_key_points(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = text_or_url(&self.context, "extract_key_points", args).await?;
        let max_points = usize_arg(args, "max_points", 5);
        let include_context = bool_arg(args, "include_context", true);

        let context_instruction = if include_context {
            "with brief context for each point"
        } else {
            "as concise statements"
        };
        let system = format!(
            "You are an expert at identifying key information in text. Extract the {max_points} \
             most important key points from the provided text.\n\n\
             Present the key points as a numbered list {context_instruction}. Focus on the most \
             significant ideas, findings, or conclusions that someone should know about this text."
        );

        let points = self
            .chat(&system, format!("Extract key points from this text:\n\n{text}"))
            .await?;
        Ok(ToolOutput::Text(points))
    }

    async fn generate_headlines(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = text_or_url(&self.context, "generate_headlines", args).await?;
        let count = usize_arg(args, "count", 3);
        let style = args.get("style").and_then(Value::as_str).unwrap_or("neutral");

        let style_instruction = match style {
            "neutral" => "straightforward and informative",
            "catchy" => "engaging and attention-grabbing",
            "professional" => "formal and business-appropriate",
            "academic" => "scholarly and precise",
            _ => "neutral and informative",
        };
        let system = format!(
            "You are a skilled headline writer. Generate {count} {style_instruction} headlines \
             or titles that accurately capture the essence of the provided text.\n\n\
             Each headline should be:\n\
             - Concise and clear\n\
             - Accurately representative of the content\n\
             - {style_instruction} in tone\n\n\
             Present the headlines as a numbered list."
        );

        let headlines = self
            .chat(&system, format!("Generate headlines for this text:\n\n{text}"))
            .await?;
        Ok(ToolOutput::Text(headlines))
    }
}

fn summary_system_prompt(summary_type: &str, length: &str, focus: &str, compression: &str) -> String {
    let base = "You are an expert text summarizer. Your task is to create a high-quality, \
                extremely concise summary that dramatically reduces the original text length \
                while preserving essential information.";

    let type_instruction = match summary_type {
        "extractive" => "Extract and combine ONLY the most critical sentences from the original text.",
        "bullet_points" => "Summarize as the most essential bullet points only.",
        "key_insights" => "Focus ONLY on the most crucial insights and conclusions.",
        _ => {
            "Create a new, highly compressed version that captures ONLY the core essence in \
             your own words."
        }
    };

    let length_instruction = match length {
        "medium" => "Create a concise summary - maximum 2-3 sentences or 50-80 words.",
        "long" => "Provide a detailed but still compressed summary - maximum 1 paragraph or 80-120 words.",
        _ => "Keep the summary extremely brief - maximum 1-2 sentences or 20-50 words.",
    };

    let focus_instruction = match focus {
        "conclusions" => "Emphasize ONLY the most important conclusions, results, and final outcomes.",
        "actions" => "Highlight ONLY the most essential actionable items and recommendations.",
        "facts" => "Prioritize ONLY the most crucial factual information and data.",
        "opinions" => "Focus ONLY on the most significant viewpoints and assessments.",
        _ => "Focus ONLY on the most critical central arguments and primary themes.",
    };

    let compression_instruction = match compression {
        "extreme" => {
            "Compress to less than 5% of original length. Use only the most essential words \
             and phrases."
        }
        "medium" => "Compress to 10-20% of original length. Focus on core concepts only.",
        "low" => "Compress to 20-30% of original length. Include main points with minimal detail.",
        _ => "Compress to 5-10% of original length. Be extremely selective about what to include.",
    };

    format!(
        "{base}\n\n{type_instruction}\n\n{length_instruction}\n\n{focus_instruction}\n\n\
         {compression_instruction}\n\n\
         IMPORTANT: Be ruthlessly concise. Every word must add significant value. Eliminate all \
         redundancy, filler words, and minor details. Your summary should be dramatically \
         shorter than the original while capturing its essence."
    )
}

#[async_trait]
impl TextAgent for SummarizerAgent {
    fn name(&self) -> &str {
        "summarizer"
    }

    fn description(&self) -> &str {
        "Summarizes text and extracts key points and headlines"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "summarize_text",
                "Generate a concise summary of text from direct input or a URL",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to summarize (either this or 'url' must be provided)"
                        },
                        "url": {
                            "type": "string",
                            "description": "URL to fetch content from and summarize (either this or 'text' must be provided)"
                        },
                        "summary_type": {
                            "type": "string",
                            "description": "Type of summary to generate",
                            "enum": ["extractive", "abstractive", "bullet_points", "key_insights"],
                            "default": "abstractive"
                        },
                        "length": {
                            "type": "string",
                            "description": "Desired summary length",
                            "enum": ["short", "medium", "long"],
                            "default": "short"
                        },
                        "compression_ratio": {
                            "type": "string",
                            "description": "How aggressively to compress the text",
                            "enum": ["extreme", "high", "medium", "low"],
                            "default": "high"
                        },
                        "focus": {
                            "type": "string",
                            "description": "What to focus on in the summary",
                            "enum": ["main_points", "conclusions", "actions", "facts", "opinions"],
                            "default": "main_points"
                        }
                    }
                }),
            ),
            Tool::new(
                "extract_key_points",
                "Extract key points and main ideas from text or URL content",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to extract key points from (either this or 'url' must be provided)"
                        },
                        "url": {
                            "type": "string",
                            "description": "URL to fetch content from and extract key points (either this or 'text' must be provided)"
                        },
                        "max_points": {
                            "type": "integer",
                            "description": "Maximum number of key points to extract",
                            "default": 5
                        },
                        "include_context": {
                            "type": "boolean",
                            "description": "Whether to include context for each key point",
                            "default": true
                        }
                    }
                }),
            ),
            Tool::new(
                "generate_headlines",
                "Generate catchy headlines or titles for text or URL content",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to generate headlines for (either this or 'url' must be provided)"
                        },
                        "url": {
                            "type": "string",
                            "description": "URL to fetch content from and generate headlines (either this or 'text' must be provided)"
                        },
                        "count": {
                            "type": "integer",
                            "description": "Number of headline options to generate",
                            "default": 3
                        },
                        "style": {
                            "type": "string",
                            "description": "Style of headlines to generate",
                            "enum": ["neutral", "catchy", "professional", "academic"],
                            "default": "neutral"
                        }
                    }
                }),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "summarize_text" => self.summarize_text(arguments).await,
            "extract_key_points" => self.extract_key_points(arguments).await,
            "generate_headlines" => self.generate_headlines(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}
