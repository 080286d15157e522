//! Language identification over whole texts and per-segment mixtures.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use whatlang::detect;

use crate::agents::base::{bool_arg, str_arg, usize_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::domain::{TextAgent, Tool, ToolOutput};

pub struct LanguageAgent {
    context: AgentContext,
    segment_break: Regex,
}

impl LanguageAgent {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            segment_break: Regex::new(r"[.!?\n]+").unwrap(),
        }
    }

    async fn detect_language(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let include_confidence = bool_arg(args, "include_confidence", true);

        let Some(info) = detect(text) else {
            return Ok(ToolOutput::Json(json!({
                "language": "unknown",
                "language_name": "Unknown",
                "error": "Could not detect language",
            })));
        };

        let value = if include_confidence {
            json!({
                "language": info.lang().code(),
                "language_name": info.lang().eng_name(),
                "confidence": round3(info.confidence()),
                "confidence_level": confidence_level(info.confidence()),
                "is_reliable": info.is_reliable(),
            })
        } else {
            json!({
                "language": info.lang().code(),
                "language_name": info.lang().eng_name(),
            })
        };
        Ok(ToolOutput::Json(value))
    }

    /// Detection runs per sentence-like segment and the hits are aggregated,
    /// so mixed-language input surfaces every language with enough text.
    async fn detect_multiple_languages(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let max_languages = usize_arg(args, "max_languages", 3);

        let mut tallies: HashMap<&'static str, LanguageTally> = HashMap::new();
        for segment in self
            .segment_break
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let Some(info) = detect(segment) else {
                continue;
            };
            let tally = tallies
                .entry(info.lang().code())
                .or_insert_with(|| LanguageTally::new(info.lang().eng_name()));
            tally.segments += 1;
            tally.confidence_sum += info.confidence();
        }

        if tallies.is_empty() {
            return Ok(ToolOutput::Json(json!({
                "detected_languages": [],
                "error": "Could not detect languages",
            })));
        }

        let total_candidates = tallies.len();
        let mut ranked: Vec<(&str, LanguageTally)> = tallies.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.segments
                .cmp(&a.1.segments)
                .then_with(|| b.1.average().total_cmp(&a.1.average()))
        });
        ranked.truncate(max_languages);

        let languages: Vec<Value> = ranked
            .iter()
            .enumerate()
            .map(|(i, (code, tally))| {
                json!({
                    "language": code,
                    "language_name": tally.name,
                    "confidence": round3(tally.average()),
                    "confidence_level": confidence_level(tally.average()),
                    "segments": tally.segments,
                    "rank": i + 1,
                })
            })
            .collect();

        Ok(ToolOutput::Json(json!({
            "primary_language": languages.first().cloned(),
            "detected_languages": languages,
            "total_candidates": total_candidates,
        })))
    }
}

struct LanguageTally {
    name: &'static str,
    segments: usize,
    confidence_sum: f64,
}

impl LanguageTally {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            segments: 0,
            confidence_sum: 0.0,
        }
    }

    fn average(&self) -> f64 {
        if self.segments == 0 {
            0.0
        } else {
            self.confidence_sum / self.segments as f64
        }
    }
}

fn confidence_level(confidence: f64) -> &'static str {
    if confidence >= 0.9 {
        "Very High"
    } else if confidence >= 0.8 {
        "High"
    } else if confidence >= 0.6 {
        "Medium"
    } else if confidence >= 0.4 {
        "Low"
    } else {
        "Very Low"
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[async_trait]
impl TextAgent for LanguageAgent {
    fn name(&self) -> &str {
        "language"
    }

    fn description(&self) -> &str {
        "Identifies the language of text, including mixed-language input"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "detect_language",
                "Detect the primary language of the given text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to analyze for language detection"
                        },
                        "include_confidence": {
                            "type": "boolean",
                            "description": "Whether to include confidence scores",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "detect_multiple_languages",
                "Detect multiple languages in text with confidence scores",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to analyze for multiple languages"
                        },
                        "max_languages": {
                            "type": "integer",
                            "description": "Maximum number of languages to return",
                            "default": 3
                        }
                    },
                    "required": ["text"]
                }),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "detect_language" => self.detect_language(arguments).await,
            "detect_multiple_languages" => self.detect_multiple_languages(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::testing::context;

    async fn run(tool: &str, args: Value) -> Value {
        let agent = LanguageAgent::new(context());
        match agent.execute_tool(tool, &args).await.unwrap() {
            ToolOutput::Json(value) => value,
            ToolOutput::Text(text) => panic!("expected JSON, got text: {text}"),
        }
    }

    #[tokio::test]
    async fn english_prose_is_detected() {
        let out = run(
            "detect_language",
            json!({"text": "The weather is very nice today and the children are playing outside in the garden."}),
        )
        .await;

        assert_eq!(out["language"], "eng");
        assert_eq!(out["language_name"], "English");
        assert!(out["confidence"].as_f64().unwrap() > 0.0);
        assert!(out["confidence_level"].is_string());
    }

    #[tokio::test]
    async fn russian_prose_is_detected() {
        let out = run(
            "detect_language",
            json!({"text": "Сегодня прекрасная погода, и дети играют в саду возле старого дома."}),
        )
        .await;

        assert_eq!(out["language"], "rus");
        assert_eq!(out["language_name"], "Russian");
    }

    #[tokio::test]
    async fn confidence_can_be_omitted() {
        let out = run(
            "detect_language",
            json!({
                "text": "The weather is very nice today and the children are playing outside.",
                "include_confidence": false
            }),
        )
        .await;

        assert_eq!(out["language"], "eng");
        assert!(out.get("confidence").is_none());
    }

    #[tokio::test]
    async fn undetectable_input_reports_unknown() {
        let out = run("detect_language", json!({"text": "12345 67890 !!! ???"})).await;

        assert_eq!(out["language"], "unknown");
        assert_eq!(out["language_name"], "Unknown");
        assert_eq!(out["error"], "Could not detect language");
    }

    #[tokio::test]
    async fn mixed_text_surfaces_multiple_languages() {
        let text = "The weather is very nice today and the children are playing in the garden. \
                    Le gouvernement français a annoncé une nouvelle politique économique pour les entreprises.";
        let out = run("detect_multiple_languages", json!({"text": text})).await;

        let languages = out["detected_languages"].as_array().unwrap();
        assert!(!languages.is_empty());
        assert_eq!(languages[0]["rank"], 1);
        assert_eq!(out["primary_language"], languages[0]);

        let codes: Vec<&str> = languages
            .iter()
            .map(|l| l["language"].as_str().unwrap())
            .collect();
        assert!(codes.contains(&"eng"));
    }

    #[tokio::test]
    async fn max_languages_caps_the_list() {
        let text = "The weather is very nice today and the children are playing in the garden. \
                    Le gouvernement français a annoncé une nouvelle politique économique pour les entreprises.";
        let out = run(
            "detect_multiple_languages",
            json!({"text": text, "max_languages": 1}),
        )
        .await;

        assert_eq!(out["detected_languages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn confidence_bands_have_fixed_edges() {
        assert_eq!(confidence_level(0.95), "Very High");
        assert_eq!(confidence_level(0.9), "Very High");
        assert_eq!(confidence_level(0.85), "High");
        assert_eq!(confidence_level(0.7), "Medium");
        assert_eq!(confidence_level(0.5), "Low");
        assert_eq!(confidence_level(0.1), "Very Low");
    }
}
