//! Rule-based and model-assisted removal of sensitive information.
//!
//! Pattern matching does the bulk of the work; the model is only consulted
//! for entities regexes cannot see (names in context, free-form addresses),
//! and a model failure there degrades to rule-only results.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use fake::faker::address::en::{BuildingNumber, StreetName};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use regex::Regex;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::agents::base::{bool_arg, str_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::ChatMessage;
use crate::domain::{TextAgent, Tool, ToolOutput};

/// Detection patterns in application order. The first two form the `basic`
/// tier, the first five `standard`, the whole list `aggressive`/`strict`.
const PATTERNS: &[(&str, &str)] = &[
    ("email", r"(?i)\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
    ("phone", r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}"),
    ("ssn", r"\b\d{3}-?\d{2}-?\d{4}\b"),
    ("credit_card", r"\b(?:\d{4}[-\s]?){3}\d{4}\b"),
    ("ip_address", r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
    (
        "url",
        r"(?i)https?://[-\w.]+(?::\d+)?(?:/[\w/_.]*(?:\?[\w&=%.]*)?(?:#\w*)?)?",
    ),
    (
        "date",
        r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b",
    ),
    (
        "address_number",
        r"(?i)\b\d+\s+[A-Za-z\s]+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Drive|Dr|Lane|Ln|Way|Court|Ct)\b",
    ),
    ("name", r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b"),
];

const DEFAULT_DETECTION_TYPES: &[&str] =
    &["names", "emails", "phones", "addresses", "ids", "financial"];

/// Placeholder vocabularies counted by the anonymization report. Covers
/// both the rule-based placeholders and the ones the model is asked to use.
const REPORT_CATEGORIES: &[(&str, &str)] = &[
    ("names", r"\[(?:NAME|FIRST_NAME|LAST_NAME)\]"),
    ("emails", r"\[EMAIL\]"),
    ("phones", r"\[PHONE\]"),
    ("addresses", r"\[ADDRESS\]"),
    ("ids", r"\[(?:ID_NUMBER|SSN)\]"),
    ("financial", r"\[(?:CREDIT_CARD|BANK_ACCOUNT)\]"),
    ("dates", r"\[DATE\]"),
    ("network", r"\[(?:IP_ADDRESS|URL)\]"),
    ("redacted", r"\[(?:REDACTED|SENSITIVE_DATA|HASH_[0-9a-f]{8})\]"),
];

pub struct AnonymizerAgent {
    context: AgentContext,
    patterns: Vec<(&'static str, Regex)>,
}

impl AnonymizerAgent {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            patterns: PATTERNS
                .iter()
                .map(|(kind, pattern)| (*kind, Regex::new(pattern).unwrap()))
                .collect(),
        }
    }

    fn patterns_for_level(&self, level: &str) -> &[(&'static str, Regex)] {
        match level {
            "basic" => &self.patterns[..2],
            "standard" => &self.patterns[..5],
            _ => &self.patterns,
        }
    }

    async fn anonymize_text(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let level = args
            .get("anonymization_level")
            .and_then(Value::as_str)
            .unwrap_or("standard");
        let strategy = args
            .get("replacement_strategy")
            .and_then(Value::as_str)
            .unwrap_or("placeholder");
        let preserve_structure = bool_arg(args, "preserve_structure", true);

        let custom: Vec<Regex> = args
            .get("custom_patterns")
            .and_then(Value::as_array)
            .map(|patterns| {
                patterns
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|p| {
                        Regex::new(p).map_err(|e| {
                            AgentError::Validation(format!("Invalid custom pattern '{p}': {e}"))
                        })
                    })
                    .collect::<Result<_, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let mut anonymized = text.to_string();
        for (kind, pattern) in self.patterns_for_level(level) {
            anonymized = pattern
                .replace_all(&anonymized, |caps: &regex::Captures<'_>| {
                    replacement(&caps[0], kind, strategy, preserve_structure)
                })
                .into_owned();
        }
        for pattern in &custom {
            anonymized = pattern
                .replace_all(&anonymized, |caps: &regex::Captures<'_>| {
                    replacement(&caps[0], "custom", strategy, preserve_structure)
                })
                .into_owned();
        }

        Ok(ToolOutput::Text(anonymized))
    }

    async fn detect_sensitive_info(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let detection_types: Vec<String> = args
            .get("detection_types")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_DETECTION_TYPES.iter().map(|t| t.to_string()).collect());
        let threshold = args
            .get("confidence_threshold")
            .and_then(Value::as_f64)
            .unwrap_or(0.7);

        let mut detections: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for (kind, pattern) in &self.patterns {
            let wanted = detection_types.iter().any(|t| t == kind || t == category_of(kind));
            if !wanted {
                continue;
            }
            for m in pattern.find_iter(text) {
                let (start, end) = char_span(text, m.start(), m.as_str());
                detections.entry(kind.to_string()).or_default().push(json!({
                    "text": m.as_str(),
                    "start": start,
                    "end": end,
                    "confidence": 0.9,
                    "type": kind,
                }));
            }
        }

        let wants_model = detection_types.iter().any(|t| t == "names" || t == "addresses");
        if wants_model {
            for (kind, items) in self.model_detect_entities(text, threshold).await {
                detections.entry(kind).or_default().extend(items);
            }
        }

        let total: usize = detections.values().map(Vec::len).sum();
        let detections: Map<String, Value> = detections
            .into_iter()
            .map(|(kind, items)| (kind, Value::Array(items)))
            .collect();

        Ok(ToolOutput::Json(json!({
            "detections": detections,
            "total_sensitive_items": total,
            "text_length": text.chars().count(),
            "detection_types_used": detection_types,
        })))
    }

    /// Ask the model for entities the regexes cannot see. Lines come back
    /// as `TYPE:TEXT:CONFIDENCE:START_POS`; anything else is skipped, and
    /// a model failure yields no detections rather than an error.
    async fn model_detect_entities(
        &self,
        text: &str,
        threshold: f64,
    ) -> BTreeMap<String, Vec<Value>> {
        let system = format!(
            "You are a privacy expert. Identify sensitive personal information in the provided \
             text. Look for:\n\
             - Personal names (people, not companies or places)\n\
             - Home/business addresses\n\
             - Any other personally identifiable information\n\n\
             For each item found, specify:\n\
             1. The exact text\n\
             2. The type (name, address, etc.)\n\
             3. Confidence level (0.0-1.0)\n\
             4. Character position in text\n\n\
             Only include items with confidence >= {threshold}. \
             Format as: TYPE:TEXT:CONFIDENCE:START_POS"
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!("Analyze this text:\n\n{text}")),
        ];

        self.context.client.ensure_model_available(None).await;
        let reply = match self.context.client.chat(&messages, &Default::default()).await {
            Ok(result) => result.response,
            Err(e) => {
                warn!(error = %e, "Entity detection model call failed");
                return BTreeMap::new();
            }
        };

        let mut detections: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for line in reply.lines() {
            let parts: Vec<&str> = line.split(':').collect();
            if parts.len() < 4 {
                continue;
            }
            let kind = parts[0].trim().to_lowercase();
            let found = parts[1].trim();
            let confidence = parts[2]
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|c| (0.0..=1.0).contains(c))
                .unwrap_or(0.5);
            if found.is_empty() || confidence < threshold {
                continue;
            }

            let Some(byte_start) = text.find(found) else {
                continue;
            };
            let (start, end) = char_span(text, byte_start, found);
            detections.entry(kind.clone()).or_default().push(json!({
                "text": found,
                "start": start,
                "end": end,
                "confidence": confidence,
                "type": kind,
            }));
        }
        detections
    }

    async fn smart_anonymize(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let context = args.get("context").and_then(Value::as_str).unwrap_or("general");
        let preserve_meaning = bool_arg(args, "preserve_meaning", true);

        let meaning_instruction = if preserve_meaning {
            "while preserving the overall meaning and context"
        } else {
            "thoroughly"
        };
        let system = format!(
            "You are a data privacy expert specializing in text anonymization. Your task is to \
             identify and anonymize all sensitive personal information in the provided {context} \
             text {meaning_instruction}.\n\n\
             Anonymize the following types of sensitive information:\n\
             - Personal names (first, last, middle names)\n\
             - Email addresses\n\
             - Phone numbers\n\
             - Physical addresses\n\
             - Social Security Numbers, ID numbers\n\
             - Financial information (credit card, bank account numbers)\n\
             - Medical information\n\
             - Dates of birth\n\
             - License plate numbers\n\
             - Any other personally identifiable information (PII)\n\n\
             Replace sensitive information with appropriate placeholders:\n\
             - Names: [NAME], [FIRST_NAME], [LAST_NAME]\n\
             - Emails: [EMAIL]\n\
             - Phones: [PHONE]\n\
             - Addresses: [ADDRESS]\n\
             - IDs: [ID_NUMBER]\n\
             - Financial: [CREDIT_CARD], [BANK_ACCOUNT]\n\
             - Dates: [DATE]\n\n\
             Maintain the text structure and readability. Return only the anonymized text."
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!("Anonymize this {context} text:\n\n{text}")),
        ];

        self.context.client.ensure_model_available(None).await;
        let result = self.context.client.chat(&messages, &Default::default()).await?;
        Ok(ToolOutput::Text(result.response.trim().to_string()))
    }

    async fn create_anonymization_report(&self, args: &Value) -> AgentResult<ToolOutput> {
        let original = self
            .context
            .validate_text_input(str_arg(args, "original_text"))
            .await?;
        let anonymized = self
            .context
            .validate_text_input(str_arg(args, "anonymized_text"))
            .await?;

        let original_words: HashSet<&str> = original.split_whitespace().collect();
        let anonymized_words: HashSet<&str> = anonymized.split_whitespace().collect();
        let removed = original_words.difference(&anonymized_words).count();
        let added = anonymized_words.difference(&original_words).count();

        let mut by_type = Map::new();
        for (category, pattern) in REPORT_CATEGORIES {
            let count = Regex::new(pattern).unwrap().find_iter(anonymized).count();
            if count > 0 {
                by_type.insert(category.to_string(), json!(count));
            }
        }

        let original_len = original.chars().count();
        let anonymized_len = anonymized.chars().count();
        let ratio = if original_words.is_empty() {
            0.0
        } else {
            removed as f64 / original_words.len() as f64
        };
        let readability_preserved = original_len == 0
            || (original_len.abs_diff(anonymized_len) as f64 / original_len as f64) < 0.3;

        Ok(ToolOutput::Json(json!({
            "original_length": original_len,
            "anonymized_length": anonymized_len,
            "items_anonymized": removed,
            "placeholders_added": added,
            "anonymization_by_type": by_type,
            "anonymization_ratio": ratio,
            "readability_preserved": readability_preserved,
        })))
    }
}

fn category_of(kind: &str) -> &'static str {
    match kind {
        "email" => "emails",
        "phone" => "phones",
        "ssn" => "ids",
        "credit_card" => "financial",
        "ip_address" | "url" => "network",
        "date" => "dates",
        "address_number" => "addresses",
        "name" => "names",
        _ => "other",
    }
}

fn replacement(original: &str, kind: &str, strategy: &str, preserve_structure: bool) -> String {
    match strategy {
        "remove" => "[REDACTED]".to_string(),
        "hash" => {
            let digest = Sha256::digest(original.as_bytes());
            let hex = format!("{digest:x}");
            format!("[HASH_{}]", &hex[..8])
        }
        "fake_data" => fake_value(kind),
        _ => {
            if !preserve_structure {
                return "[REDACTED]".to_string();
            }
            match kind {
                "email" => "[EMAIL]",
                "phone" => "[PHONE]",
                "ssn" => "[SSN]",
                "credit_card" => "[CREDIT_CARD]",
                "ip_address" => "[IP_ADDRESS]",
                "url" => "[URL]",
                "date" => "[DATE]",
                "address_number" => "[ADDRESS]",
                "name" => "[NAME]",
                _ => "[SENSITIVE_DATA]",
            }
            .to_string()
        }
    }
}

/// Format-shaped stand-ins. Identifier-like values stay fixed so the output
/// is reproducible; person-facing values come from the faker.
fn fake_value(kind: &str) -> String {
    match kind {
        "email" => SafeEmail().fake(),
        "phone" => PhoneNumber().fake(),
        "name" => Name().fake(),
        "address_number" => format!(
            "{} {}",
            BuildingNumber().fake::<String>(),
            StreetName().fake::<String>()
        ),
        "ssn" => "123-45-6789".to_string(),
        "credit_card" => "1234 5678 9012 3456".to_string(),
        "ip_address" => "192.168.1.1".to_string(),
        "url" => "https://example.com".to_string(),
        "date" => "01/01/2000".to_string(),
        _ => "FAKE_DATA".to_string(),
    }
}

fn char_span(text: &str, byte_start: usize, matched: &str) -> (usize, usize) {
    let start = text[..byte_start].chars().count();
    (start, start + matched.chars().count())
}

#[async_trait]
impl TextAgent for AnonymizerAgent {
    fn name(&self) -> &str {
        "anonymizer"
    }

    fn description(&self) -> &str {
        "Detects and removes sensitive personal information from text"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "anonymize_text",
                "Remove or replace sensitive information in text with placeholders",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to anonymize"
                        },
                        "anonymization_level": {
                            "type": "string",
                            "description": "Level of anonymization to apply",
                            "enum": ["basic", "standard", "aggressive", "strict"],
                            "default": "standard"
                        },
                        "replacement_strategy": {
                            "type": "string",
                            "description": "How to replace sensitive information",
                            "enum": ["placeholder", "fake_data", "hash", "remove"],
                            "default": "placeholder"
                        },
                        "preserve_structure": {
                            "type": "boolean",
                            "description": "Whether to maintain text structure and readability",
                            "default": true
                        },
                        "custom_patterns": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Custom regex patterns to anonymize",
                            "default": []
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "detect_sensitive_info",
                "Detect and identify sensitive information in text without anonymizing",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to scan for sensitive information"
                        },
                        "detection_types": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Types of sensitive info to detect",
                            "default": ["names", "emails", "phones", "addresses", "ids", "financial"]
                        },
                        "confidence_threshold": {
                            "type": "number",
                            "description": "Minimum confidence threshold for AI detection",
                            "default": 0.7
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "smart_anonymize",
                "Use AI to intelligently identify and anonymize personal information",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to anonymize using AI"
                        },
                        "context": {
                            "type": "string",
                            "description": "Context about the text type (email, report, document, etc.)",
                            "default": "general"
                        },
                        "preserve_meaning": {
                            "type": "boolean",
                            "description": "Whether to preserve the overall meaning while anonymizing",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "create_anonymization_report",
                "Generate a report of what sensitive information was found and anonymized",
                json!({
                    "type": "object",
                    "properties": {
                        "original_text": {
                            "type": "string",
                            "description": "The original text before anonymization"
                        },
                        "anonymized_text": {
                            "type": "string",
                            "description": "The text after anonymization"
                        }
                    },
                    "required": ["original_text", "anonymized_text"]
                }),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "anonymize_text" => self.anonymize_text(arguments).await,
            "detect_sensitive_info" => self.detect_sensitive_info(arguments).await,
            "smart_anonymize" => self.smart_anonymize(arguments).await,
            "create_anonymization_report" => self.create_anonymization_report(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::testing::{context, context_with, ScriptedClient};
    use std::sync::Arc;

    fn agent() -> AnonymizerAgent {
        AnonymizerAgent::new(context())
    }

    async fn run_text(agent: &AnonymizerAgent, tool: &str, args: Value) -> String {
        agent.execute_tool(tool, &args).await.unwrap().into_text()
    }

    async fn run_json(agent: &AnonymizerAgent, tool: &str, args: Value) -> Value {
        match agent.execute_tool(tool, &args).await.unwrap() {
            ToolOutput::Json(value) => value,
            ToolOutput::Text(text) => panic!("expected JSON, got text: {text}"),
        }
    }

    #[tokio::test]
    async fn standard_level_replaces_contact_details() {
        let out = run_text(
            &agent(),
            "anonymize_text",
            json!({"text": "Contact john.doe@corp.com or 555-123-4567 now."}),
        )
        .await;

        assert_eq!(out, "Contact [EMAIL] or [PHONE] now.");
    }

    #[tokio::test]
    async fn basic_level_leaves_ids_alone() {
        let text = "Mail a@b.io about SSN 123-45-6789.";

        let basic = run_text(
            &agent(),
            "anonymize_text",
            json!({"text": text, "anonymization_level": "basic"}),
        )
        .await;
        assert!(basic.contains("123-45-6789"));
        assert!(basic.contains("[EMAIL]"));

        let standard = run_text(&agent(), "anonymize_text", json!({"text": text})).await;
        assert!(standard.contains("[SSN]"));
    }

    #[tokio::test]
    async fn aggressive_level_covers_names_and_urls() {
        let out = run_text(
            &agent(),
            "anonymize_text",
            json!({
                "text": "Her name is Jane Smith, see https://example.com/profile on 12/31/2024.",
                "anonymization_level": "aggressive"
            }),
        )
        .await;

        assert_eq!(out, "Her name is [NAME], see [URL] on [DATE].");
    }

    #[tokio::test]
    async fn hash_strategy_is_deterministic() {
        let args = json!({
            "text": "Reach me at a@b.io today.",
            "replacement_strategy": "hash"
        });
        let first = run_text(&agent(), "anonymize_text", args.clone()).await;
        let second = run_text(&agent(), "anonymize_text", args).await;

        assert_eq!(first, second);
        let hash = first
            .split_whitespace()
            .find(|w| w.starts_with("[HASH_"))
            .unwrap();
        assert_eq!(hash.len(), "[HASH_]".len() + 8);
    }

    #[tokio::test]
    async fn remove_strategy_redacts_everything_found() {
        let out = run_text(
            &agent(),
            "anonymize_text",
            json!({"text": "Mail a@b.io or call 555-123-4567.", "replacement_strategy": "remove"}),
        )
        .await;

        assert_eq!(out, "Mail [REDACTED] or call [REDACTED].");
    }

    #[tokio::test]
    async fn fake_data_keeps_an_email_shape() {
        let out = run_text(
            &agent(),
            "anonymize_text",
            json!({"text": "Mail a@b.io please.", "replacement_strategy": "fake_data"}),
        )
        .await;

        assert!(!out.contains("a@b.io"));
        assert!(out.contains('@'));
    }

    #[tokio::test]
    async fn flat_placeholders_without_structure() {
        let out = run_text(
            &agent(),
            "anonymize_text",
            json!({"text": "Mail a@b.io please.", "preserve_structure": false}),
        )
        .await;

        assert_eq!(out, "Mail [REDACTED] please.");
    }

    #[tokio::test]
    async fn custom_patterns_extend_the_rules() {
        let out = run_text(
            &agent(),
            "anonymize_text",
            json!({
                "text": "Ticket code alpha-7731 is private.",
                "custom_patterns": [r"\balpha-\d+\b"]
            }),
        )
        .await;

        assert_eq!(out, "Ticket code [SENSITIVE_DATA] is private.");
    }

    #[tokio::test]
    async fn invalid_custom_pattern_is_a_validation_error() {
        let err = agent()
            .execute_tool(
                "anonymize_text",
                &json!({"text": "hello there", "custom_patterns": ["("]}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn detection_reports_types_and_spans() {
        let client = Arc::new(ScriptedClient::fixed("unused"));
        let agent = AnonymizerAgent::new(context_with(client.clone()));

        let out = run_json(
            &agent,
            "detect_sensitive_info",
            json!({
                "text": "Email bob@x.io, card 4111 1111 1111 1111, IP 10.0.0.1.",
                "detection_types": ["emails", "financial", "network"]
            }),
        )
        .await;

        assert_eq!(out["total_sensitive_items"], 3);
        let email = &out["detections"]["email"][0];
        assert_eq!(email["text"], "bob@x.io");
        assert_eq!(email["start"], 6);
        assert_eq!(email["end"], 14);
        assert_eq!(email["confidence"], 0.9);
        assert!(out["detections"]["credit_card"][0]["text"]
            .as_str()
            .unwrap()
            .contains("4111"));
        assert_eq!(out["detections"]["ip_address"][0]["text"], "10.0.0.1");
        // No name/address types requested, so the model is never consulted.
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn model_detections_merge_with_rule_hits() {
        let client = Arc::new(ScriptedClient::fixed("name:jane smith:0.95:12"));
        let agent = AnonymizerAgent::new(context_with(client.clone()));

        let out = run_json(
            &agent,
            "detect_sensitive_info",
            json!({"text": "her name is jane smith.", "detection_types": ["names"]}),
        )
        .await;

        let names = out["detections"]["name"].as_array().unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0]["text"], "jane smith");
        assert_eq!(names[0]["start"], 12);
        assert_eq!(names[0]["confidence"], 0.95);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn low_confidence_model_lines_are_dropped() {
        let client = Arc::new(ScriptedClient::fixed("name:jane smith:0.4:12"));
        let agent = AnonymizerAgent::new(context_with(client));

        let out = run_json(
            &agent,
            "detect_sensitive_info",
            json!({"text": "her name is jane smith.", "detection_types": ["names"]}),
        )
        .await;

        assert_eq!(out["total_sensitive_items"], 0);
    }

    #[tokio::test]
    async fn report_counts_placeholders_by_category() {
        let out = run_json(
            &agent(),
            "create_anonymization_report",
            json!({
                "original_text": "Contact John Smith at john@x.io",
                "anonymized_text": "Contact [NAME] at [EMAIL]"
            }),
        )
        .await;

        assert_eq!(out["items_anonymized"], 3);
        assert_eq!(out["placeholders_added"], 2);
        assert_eq!(out["anonymization_by_type"]["names"], 1);
        assert_eq!(out["anonymization_by_type"]["emails"], 1);
        assert_eq!(out["anonymization_ratio"], 0.6);
        assert_eq!(out["readability_preserved"], true);
    }

    #[tokio::test]
    async fn smart_anonymize_returns_model_text() {
        let client = Arc::new(ScriptedClient::fixed("Contact [NAME] at [EMAIL]."));
        let agent = AnonymizerAgent::new(context_with(client.clone()));

        let out = run_text(
            &agent,
            "smart_anonymize",
            json!({"text": "Contact Ann Lee at ann@lee.io.", "context": "email"}),
        )
        .await;

        assert_eq!(out, "Contact [NAME] at [EMAIL].");
        assert_eq!(client.calls(), 1);
    }
}
