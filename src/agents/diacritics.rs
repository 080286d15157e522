//! Diacritic removal and ASCII folding.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::agents::base::{bool_arg, str_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::domain::{TextAgent, Tool, ToolOutput};

pub struct DiacriticsAgent {
    context: AgentContext,
    whitespace: Regex,
}

impl DiacriticsAgent {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    async fn remove_diacritics(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let method = args.get("method").and_then(Value::as_str).unwrap_or("ascii");
        let preserve_case = bool_arg(args, "preserve_case", true);

        let mut result = match method {
            "ascii" => fold_ascii(text),
            "unicode" => strip_marks(text),
            other => {
                return Err(AgentError::Validation(format!(
                    "Unknown method: {}",
                    other
                )))
            }
        };

        if !preserve_case {
            result = result.to_lowercase();
        }
        Ok(ToolOutput::Text(result))
    }

    async fn transliterate_text(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let preserve_spacing = bool_arg(args, "preserve_spacing", true);

        let mut result = fold_ascii(text);
        if !preserve_spacing {
            result = self.whitespace.replace_all(&result, " ").trim().to_string();
        }
        Ok(ToolOutput::Text(result))
    }

    async fn normalize_text(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let remove_diacritics = bool_arg(args, "remove_diacritics", true);
        let to_lowercase = bool_arg(args, "to_lowercase", false);
        let replace_spaces = bool_arg(args, "replace_spaces", false);

        let mut result = text.to_string();
        if remove_diacritics {
            result = fold_ascii(&result);
        }
        if to_lowercase {
            result = result.to_lowercase();
        }
        if replace_spaces {
            result = result.replace(' ', "_");
        }
        Ok(ToolOutput::Text(result))
    }
}

/// NFD-decompose and drop combining marks. Characters without a
/// decomposition (ß, ø, ...) pass through unchanged.
fn strip_marks(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Latin-oriented ASCII folding: mark stripping plus the common Latin
/// letters that have no Unicode decomposition. Non-Latin scripts pass
/// through unchanged.
fn fold_ascii(text: &str) -> String {
    let stripped = strip_marks(text);
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match c {
            'ß' => out.push_str("ss"),
            'ẞ' => out.push_str("SS"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'đ' => out.push('d'),
            'Đ' => out.push('D'),
            'ð' => out.push('d'),
            'Ð' => out.push('D'),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("Th"),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'ı' => out.push('i'),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl TextAgent for DiacriticsAgent {
    fn name(&self) -> &str {
        "diacritics"
    }

    fn description(&self) -> &str {
        "Removes diacritical marks and folds Latin text toward ASCII"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "remove_diacritics",
                "Remove diacritical marks and accents from text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text from which to remove diacritics"
                        },
                        "method": {
                            "type": "string",
                            "description": "Removal method: 'ascii' also folds unlisted Latin letters, 'unicode' only strips combining marks",
                            "enum": ["ascii", "unicode"],
                            "default": "ascii"
                        },
                        "preserve_case": {
                            "type": "boolean",
                            "description": "Keep the original case instead of lowercasing the result",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "transliterate_text",
                "Transliterate text to ASCII characters",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to transliterate"
                        },
                        "preserve_spacing": {
                            "type": "boolean",
                            "description": "Keep the original spacing instead of collapsing it",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "normalize_text",
                "Normalize text by removing diacritics and applying optional transformations",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to normalize"
                        },
                        "remove_diacritics": {
                            "type": "boolean",
                            "description": "Remove diacritical marks",
                            "default": true
                        },
                        "to_lowercase": {
                            "type": "boolean",
                            "description": "Convert to lowercase",
                            "default": false
                        },
                        "replace_spaces": {
                            "type": "boolean",
                            "description": "Replace spaces with underscores",
                            "default": false
                        }
                    },
                    "required": ["text"]
                }),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "remove_diacritics" => self.remove_diacritics(arguments).await,
            "transliterate_text" => self.transliterate_text(arguments).await,
            "normalize_text" => self.normalize_text(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::testing::context;

    fn agent() -> DiacriticsAgent {
        DiacriticsAgent::new(context())
    }

    async fn run(agent: &DiacriticsAgent, tool: &str, args: Value) -> String {
        agent.execute_tool(tool, &args).await.unwrap().into_text()
    }

    #[tokio::test]
    async fn accents_fold_to_plain_letters() {
        let out = run(
            &agent(),
            "remove_diacritics",
            json!({"text": "Crème brûlée à Łódź"}),
        )
        .await;
        assert_eq!(out, "Creme brulee a Lodz");
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let agent = agent();
        let once = run(&agent, "remove_diacritics", json!({"text": "Café à Montréal"})).await;
        assert_eq!(once, "Cafe a Montreal");

        let twice = run(&agent, "remove_diacritics", json!({"text": once.clone()})).await;
        assert_eq!(twice, once);
    }

    #[tokio::test]
    async fn ascii_method_folds_undecomposable_letters() {
        let out = run(&agent(), "remove_diacritics", json!({"text": "straße Ærø"})).await;
        assert_eq!(out, "strasse AEro");
    }

    #[tokio::test]
    async fn unicode_method_only_strips_marks() {
        let out = run(
            &agent(),
            "remove_diacritics",
            json!({"text": "straße café", "method": "unicode"}),
        )
        .await;
        assert_eq!(out, "straße cafe");
    }

    #[tokio::test]
    async fn non_latin_scripts_pass_through() {
        let out = run(&agent(), "remove_diacritics", json!({"text": "Москва 東京"})).await;
        assert_eq!(out, "Москва 東京");
    }

    #[tokio::test]
    async fn case_can_be_dropped() {
        let out = run(
            &agent(),
            "remove_diacritics",
            json!({"text": "ÉLAN", "preserve_case": false}),
        )
        .await;
        assert_eq!(out, "elan");
    }

    #[tokio::test]
    async fn unknown_method_is_a_validation_error() {
        let err = agent()
            .execute_tool(
                "remove_diacritics",
                &json!({"text": "x", "method": "latin1"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn transliterate_can_collapse_spacing() {
        let out = run(
            &agent(),
            "transliterate_text",
            json!({"text": "  naïve   café  ", "preserve_spacing": false}),
        )
        .await;
        assert_eq!(out, "naive cafe");
    }

    #[tokio::test]
    async fn normalize_builds_identifiers() {
        let out = run(
            &agent(),
            "normalize_text",
            json!({"text": "Crème Brûlée", "to_lowercase": true, "replace_spaces": true}),
        )
        .await;
        assert_eq!(out, "creme_brulee");
    }

    #[tokio::test]
    async fn normalize_can_skip_diacritic_removal() {
        let out = run(
            &agent(),
            "normalize_text",
            json!({"text": "Crème", "remove_diacritics": false, "to_lowercase": true}),
        )
        .await;
        assert_eq!(out, "crème");
    }
}
