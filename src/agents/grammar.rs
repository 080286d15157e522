//! Model-backed grammar checking, improvement suggestions and correction
//! explanations.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::base::{bool_arg, str_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::ChatMessage;
use crate::domain::{TextAgent, Tool, ToolOutput};

/// Lines opening with these are treated as preamble, not corrected text.
const PREAMBLE_PREFIXES: &[&str] = &["Corrected", "Here", "The", "I've", "Changes"];

pub struct GrammarAgent {
    context: AgentContext,
}

impl GrammarAgent {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    async fn check_grammar(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let correction_level = opt_enum(args, "correction_level", "standard");
        let style = opt_enum(args, "style", "standard");
        let preserve_tone = bool_arg(args, "preserve_tone", true);

        let system = grammar_system_prompt(correction_level, style, preserve_tone);
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!("Please check and correct this text:\n\n{text}")),
        ];

        self.context.client.ensure_model_available(None).await;
        let result = self.context.client.chat(&messages, &Default::default()).await?;
        Ok(ToolOutput::Text(extract_corrected(&result.response)))
    }

    async fn suggest_improvements(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let focus_areas: Vec<String> = args
            .get("focus_areas")
            .and_then(Value::as_array)
            .map(|areas| {
                areas
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "clarity".to_string(),
                    "conciseness".to_string(),
                    "flow".to_string(),
                ]
            });

        let system = format!(
            "You are a writing improvement specialist. Analyze the provided text and suggest \
             specific improvements focusing on {}.\n\n\
             Provide your suggestions in the following format:\n\
             1. **Improvement Area**: [Brief description]\n\
             \x20  - **Issue**: [What could be improved]\n\
             \x20  - **Suggestion**: [How to improve it]\n\
             \x20  - **Example**: [Show the improvement if applicable]\n\n\
             Focus on practical, actionable suggestions that will make the writing more effective.",
            focus_areas.join(", ")
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!(
                "Please analyze this text and suggest improvements:\n\n{text}"
            )),
        ];

        self.context.client.ensure_model_available(None).await;
        let result = self.context.client.chat(&messages, &Default::default()).await?;
        Ok(ToolOutput::Text(result.response))
    }

    async fn explain_corrections(&self, args: &Value) -> AgentResult<ToolOutput> {
        let original = self
            .context
            .validate_text_input(str_arg(args, "original_text"))
            .await?;
        let corrected = self
            .context
            .validate_text_input(str_arg(args, "corrected_text"))
            .await?;

        let system = "You are a grammar and writing expert. Compare the original and corrected \
                      texts and explain the changes made.\n\n\
                      Provide explanations in this format:\n\
                      1. **Change**: [Describe what was changed]\n\
                      \x20  - **Rule/Reason**: [Grammar rule or writing principle that applies]\n\
                      \x20  - **Example**: Show the before and after\n\n\
                      Focus on educational explanations that help the user understand the \
                      reasoning behind each correction.";
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!(
                "Original text:\n{original}\n\nCorrected text:\n{corrected}\n\n\
                 Please explain the corrections made."
            )),
        ];

        self.context.client.ensure_model_available(None).await;
        let result = self.context.client.chat(&messages, &Default::default()).await?;
        Ok(ToolOutput::Text(result.response))
    }
}

fn opt_enum<'a>(args: &'a Value, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn grammar_system_prompt(correction_level: &str, style: &str, preserve_tone: bool) -> String {
    let base = "You are an expert grammar checker and editor. Your task is to correct grammar, \
                spelling, and punctuation errors in the provided text.";

    let level = match correction_level {
        "basic" => {
            "Focus only on obvious grammar, spelling, and punctuation errors. Make minimal changes."
        }
        "standard" => {
            "Correct grammar, spelling, punctuation, and basic style issues. Improve clarity where needed."
        }
        _ => {
            "Provide comprehensive corrections including grammar, spelling, punctuation, style, \
             word choice, and sentence structure improvements."
        }
    };

    let style_instruction = match style {
        "formal" => {
            "Ensure the text maintains a formal, professional tone with proper grammar and \
             sophisticated vocabulary."
        }
        "casual" => "Keep the text conversational and approachable while maintaining correctness.",
        "academic" => {
            "Use precise, scholarly language appropriate for academic writing with proper \
             citations format if applicable."
        }
        "business" => "Optimize for business communication - clear, concise, and professional.",
        _ => "",
    };

    let tone = if preserve_tone {
        "Preserve the original author's voice and tone while making corrections."
    } else {
        "Feel free to adjust tone and voice as needed for better communication."
    };

    format!(
        "{base}\n\n{level}\n\n{style_instruction}\n\n{tone}\n\n\
         Provide only the corrected text without explanations unless specifically requested."
    )
}

/// Models often wrap the corrected text in a short preamble. When the reply
/// has paragraph breaks, drop leading lines that look like commentary.
fn extract_corrected(response: &str) -> String {
    let trimmed = response.trim();
    if !trimmed.contains("\n\n") {
        return trimmed.to_string();
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !line.trim().is_empty()
            && !PREAMBLE_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
        {
            return lines[i..].join("\n");
        }
    }
    trimmed.to_string()
}

#[async_trait]
impl TextAgent for GrammarAgent {
    fn name(&self) -> &str {
        "grammar"
    }

    fn description(&self) -> &str {
        "Checks grammar and style and explains corrections"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "check_grammar",
                "Check and correct grammar, spelling, and basic style issues in text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to check for grammar and spelling issues"
                        },
                        "correction_level": {
                            "type": "string",
                            "description": "Level of corrections to apply",
                            "enum": ["basic", "standard", "advanced"],
                            "default": "standard"
                        },
                        "style": {
                            "type": "string",
                            "description": "Writing style to optimize for",
                            "enum": ["formal", "casual", "academic", "business"],
                            "default": "standard"
                        },
                        "preserve_tone": {
                            "type": "boolean",
                            "description": "Whether to preserve the original tone and voice",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "suggest_improvements",
                "Suggest style and clarity improvements for text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to analyze for improvement suggestions"
                        },
                        "focus_areas": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Specific areas to focus on for improvements",
                            "default": ["clarity", "conciseness", "flow"]
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "explain_corrections",
                "Explain grammar rules and corrections made to text",
                json!({
                    "type": "object",
                    "properties": {
                        "original_text": {
                            "type": "string",
                            "description": "The original text before corrections"
                        },
                        "corrected_text": {
                            "type": "string",
                            "description": "The corrected version of the text"
                        }
                    },
                    "required": ["original_text", "corrected_text"]
                }),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "check_grammar" => self.check_grammar(arguments).await,
            "suggest_improvements" => self.suggest_improvements(arguments).await,
            "explain_corrections" => self.explain_corrections(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}
