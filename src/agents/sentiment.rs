//! Model-backed sentiment analysis, transformation and comparison.
//!
//! The model answers in prose; [`SentimentAgent::parse_sentiment_response`]
//! extracts labeled fields from it. Extraction is best effort and never
//! fails: fields without a recognizable pattern keep their defaults.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::agents::base::{bool_arg, str_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::ChatMessage;
use crate::domain::{TextAgent, Tool, ToolOutput};

/// Section labels that the emotion patterns match but are not emotions.
const NON_EMOTION_WORDS: &[&str] = &[
    "confidence",
    "intensity",
    "explanation",
    "overall",
    "sentiment",
    "analysis",
    "detected",
    "level",
];

pub struct SentimentAgent {
    context: AgentContext,
    sentiment_patterns: Vec<Regex>,
    confidence_pattern: Regex,
    intensity_pattern: Regex,
    quoted_pattern: Regex,
    emotion_patterns: Vec<Regex>,
}

impl SentimentAgent {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            // Ordered: the fully labeled field wins over the bare one.
            sentiment_patterns: vec![
                Regex::new(r"(?i)Overall Sentiment:\**\s*([^\n]+)").unwrap(),
                Regex::new(r"(?i)Sentiment:\**\s*([^\n]+)").unwrap(),
            ],
            confidence_pattern: Regex::new(r"(?i)Confidence:\**\s*(\d+(?:\.\d+)?)%?").unwrap(),
            intensity_pattern: Regex::new(r"(?i)Intensity:\**\s*([^\n]+)").unwrap(),
            quoted_pattern: Regex::new(r#""([^"]+)""#).unwrap(),
            emotion_patterns: vec![
                Regex::new(r"(?i)\*\s*\*\*([A-Za-z]+)\*\*:\s*([^(\n]+)(?:\(intensity level (\d+)/10\))?")
                    .unwrap(),
                Regex::new(r"(?i)\*\s*([A-Za-z]+):\s*([^(\n]+)(?:\(intensity level (\d+)/10\))?")
                    .unwrap(),
                Regex::new(r"(?i)\*\s*\*\*([A-Za-z]+)\*\*\s*\(([^)]+)\)").unwrap(),
            ],
        }
    }

    async fn analyze_sentiment(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let detail_level = args.get("detail_level").and_then(Value::as_str).unwrap_or("detailed");
        let include_emotions = bool_arg(args, "include_emotions", true);

        let system = sentiment_system_prompt(detail_level, include_emotions);
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!("Analyze the sentiment of this text:\n\n{text}")),
        ];

        self.context.client.ensure_model_available(None).await;
        let result = self.context.client.chat(&messages, &Default::default()).await?;
        Ok(ToolOutput::Json(self.parse_sentiment_response(&result.response)))
    }

    async fn transform_sentiment(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let target = args
            .get("target_sentiment")
            .and_then(Value::as_str)
            .unwrap_or("positive");
        let preserve_meaning = bool_arg(args, "preserve_meaning", true);

        let system = transform_system_prompt(target, preserve_meaning);
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!(
                "Transform this text to have a {target} sentiment:\n\n{text}"
            )),
        ];

        self.context.client.ensure_model_available(None).await;
        let result = self.context.client.chat(&messages, &Default::default()).await?;
        Ok(ToolOutput::Text(result.response.trim().to_string()))
    }

    async fn sentiment_comparison(&self, args: &Value) -> AgentResult<ToolOutput> {
        let texts: Vec<&str> = args
            .get("texts")
            .and_then(Value::as_array)
            .map(|texts| texts.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if texts.is_empty() {
            return Err(AgentError::Validation(
                "At least one text must be provided".to_string(),
            ));
        }

        let mut labels: Vec<String> = args
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        labels.truncate(texts.len());
        while labels.len() < texts.len() {
            labels.push(format!("Text {}", labels.len() + 1));
        }

        let system = "You are a sentiment analysis expert. Compare the sentiment across multiple \
                      texts and provide:\n\
                      1. Individual sentiment for each text (positive/negative/neutral with confidence)\n\
                      2. Overall comparison summary\n\
                      3. Key differences in emotional tone\n\n\
                      Format your response as structured data that can be parsed.";
        let mut user = String::from("Compare the sentiment of these texts:\n\n");
        for (text, label) in texts.iter().zip(&labels) {
            user.push_str(&format!("{label}:\n{text}\n\n"));
        }

        self.context.client.ensure_model_available(None).await;
        let result = self
            .context
            .client
            .chat(&[ChatMessage::system(system), ChatMessage::user(user)], &Default::default())
            .await?;

        Ok(ToolOutput::Json(json!({
            "comparison_analysis": result.response,
            "texts_analyzed": texts.len(),
            "labels": labels,
        })))
    }

    /// Best-effort extraction of labeled fields from the model's reply.
    /// Unmatched fields keep their defaults; this never errors.
    fn parse_sentiment_response(&self, response: &str) -> Value {
        let mut overall = "neutral";
        for pattern in &self.sentiment_patterns {
            if let Some(caps) = pattern.captures(response) {
                let label = caps[1].trim().to_lowercase();
                overall = if label.contains("negative") {
                    "negative"
                } else if label.contains("positive") {
                    "positive"
                } else {
                    "neutral"
                };
                break;
            }
        }

        let mut confidence = 0.5;
        if let Some(caps) = self.confidence_pattern.captures(response) {
            if let Ok(value) = caps[1].parse::<f64>() {
                confidence = if value > 1.0 { value / 100.0 } else { value };
            }
        }

        let intensity = self
            .intensity_pattern
            .captures(response)
            .map(|caps| caps[1].trim().to_lowercase())
            .unwrap_or_else(|| "medium".to_string());

        let mut key_indicators: Vec<&str> = Vec::new();
        let mut seen = HashSet::new();
        for caps in self.quoted_pattern.captures_iter(response) {
            let phrase = caps.get(1).map_or("", |m| m.as_str()).trim();
            if phrase.is_empty() || phrase.split_whitespace().count() > 4 {
                continue;
            }
            if seen.insert(phrase.to_lowercase()) {
                key_indicators.push(phrase);
            }
        }

        let emotions = self.parse_emotions(response);

        json!({
            "overall_sentiment": overall,
            "confidence": confidence,
            "intensity": intensity,
            "key_indicators": key_indicators,
            "explanation": response,
            "emotions_detected": emotions,
        })
    }

    fn parse_emotions(&self, response: &str) -> Vec<Value> {
        let mut emotions = Vec::new();
        let mut seen = HashSet::new();

        for pattern in &self.emotion_patterns {
            for caps in pattern.captures_iter(response) {
                let emotion = caps.get(1).map_or("", |m| m.as_str()).trim();
                if emotion.is_empty() {
                    continue;
                }
                let lowered = emotion.to_lowercase();
                if NON_EMOTION_WORDS.contains(&lowered.as_str()) || seen.contains(&lowered) {
                    continue;
                }

                let description = caps.get(2).map_or("", |m| m.as_str()).to_lowercase();
                let numeric = caps.get(3).and_then(|m| m.as_str().parse::<u64>().ok());
                let intensity = match numeric {
                    Some(level) => level * 10,
                    None if description.contains("high") => 80,
                    None if description.contains("medium") => 60,
                    None if description.contains("low") => 30,
                    None => 50,
                };

                seen.insert(lowered);
                emotions.push(json!({"emotion": emotion, "intensity": intensity}));
            }
        }

        emotions
    }
}

fn sentiment_system_prompt(detail_level: &str, include_emotions: bool) -> String {
    let base = "You are an expert sentiment analyst. Analyze the emotional tone and sentiment \
                of the provided text.";

    let analysis = match detail_level {
        "basic" => {
            "Provide a simple sentiment classification (positive, negative, or neutral) with a \
             brief explanation."
        }
        "detailed" => {
            "Provide detailed sentiment analysis including polarity, intensity, and key \
             sentiment indicators."
        }
        _ => {
            "Provide comprehensive sentiment analysis including polarity, intensity, \
             subjectivity, emotional indicators, and contextual factors."
        }
    };

    let emotion_instruction = if include_emotions {
        "Also identify specific emotions present (joy, anger, sadness, fear, surprise, disgust, \
         etc.) with intensity levels."
    } else {
        ""
    };

    let mut format_instruction = String::from(
        "Format your response with clear sections:\n\
         - Overall Sentiment: [positive/negative/neutral]\n\
         - Confidence: [0-100%] (Use 95-100% for very clear sentiment, 85-94% for clear \
         sentiment, 70-84% for moderate sentiment, below 70% for ambiguous sentiment)\n\
         - Intensity: [low/medium/high]\n\
         - Key Indicators: [words/phrases that indicate sentiment]\n\
         - Explanation: [brief reasoning]",
    );
    if include_emotions {
        format_instruction.push_str("\n- Emotions Detected: [list with intensity levels]");
    }

    format!("{base}\n\n{analysis}\n\n{emotion_instruction}\n\n{format_instruction}")
}

fn transform_system_prompt(target: &str, preserve_meaning: bool) -> String {
    let base = "You are an expert text rewriter specializing in sentiment transformation.";

    let target_description = match target {
        "positive" => {
            "optimistic, upbeat, cheerful, encouraging, and hopeful. Use positive language, \
             focus on benefits and opportunities."
        }
        "negative" => {
            "critical, pessimistic, disappointed, or concerned. Use cautious language, focus \
             on problems and risks."
        }
        "neutral" => {
            "objective, balanced, factual, and impartial. Use neutral language, avoid \
             emotional words."
        }
        "professional" => {
            "formal, business-appropriate, respectful, and courteous. Use professional \
             vocabulary and tone."
        }
        "friendly" => {
            "warm, approachable, conversational, and welcoming. Use friendly language and \
             inclusive tone."
        }
        "enthusiastic" => {
            "excited, energetic, passionate, and animated. Use dynamic language and show \
             excitement."
        }
        _ => "the requested sentiment",
    };

    let preservation = if preserve_meaning {
        "IMPORTANT: Preserve the core meaning and factual content of the original text. Only \
         change the emotional tone and style, not the fundamental message or information."
    } else {
        "You may adjust the meaning slightly to better match the target sentiment, but keep \
         the general topic and context."
    };

    format!(
        "{base}\n\nYour task is to rewrite text to sound {target_description}\n\n{preservation}\n\n\
         Guidelines:\n\
         1. Maintain the same basic structure and format\n\
         2. Keep important details and facts intact\n\
         3. Adjust word choice, tone, and phrasing to match the target sentiment\n\
         4. Ensure the result sounds natural and authentic\n\
         5. Return ONLY the transformed text, no additional commentary"
    )
}

#[async_trait]
impl TextAgent for SentimentAgent {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn description(&self) -> &str {
        "Analyzes, transforms and compares the emotional tone of text"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "analyze_sentiment",
                "Analyze the emotional tone and sentiment of text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to analyze for sentiment"
                        },
                        "detail_level": {
                            "type": "string",
                            "description": "Level of analysis detail",
                            "enum": ["basic", "detailed", "comprehensive"],
                            "default": "detailed"
                        },
                        "include_emotions": {
                            "type": "boolean",
                            "description": "Whether to include specific emotion detection",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "transform_sentiment",
                "Transform text to match a desired sentiment while preserving meaning",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to transform"
                        },
                        "target_sentiment": {
                            "type": "string",
                            "description": "The desired sentiment for the transformed text",
                            "enum": ["positive", "negative", "neutral", "professional", "friendly", "enthusiastic"],
                            "default": "positive"
                        },
                        "preserve_meaning": {
                            "type": "boolean",
                            "description": "Whether to preserve the core meaning of the text",
                            "default": true
                        }
                    },
                    "required": ["text", "target_sentiment"]
                }),
            ),
            Tool::new(
                "sentiment_comparison",
                "Compare sentiment between multiple texts",
                json!({
                    "type": "object",
                    "properties": {
                        "texts": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "List of texts to compare sentiment"
                        },
                        "labels": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Optional labels for each text",
                            "default": []
                        }
                    },
                    "required": ["texts"]
                }),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "analyze_sentiment" => self.analyze_sentiment(arguments).await,
            "transform_sentiment" => self.transform_sentiment(arguments).await,
            "sentiment_comparison" => self.sentiment_comparison(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}
