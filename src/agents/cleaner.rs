//! Text cleaning and normalization tools.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use unicode_normalization::UnicodeNormalization;

use crate::agents::base::{bool_arg, str_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::domain::{TextAgent, Tool, ToolOutput};

const DEFAULT_SYMBOLS: &str = "@!%^&*()_+}{:\"?<>";

pub struct CleanerAgent {
    context: AgentContext,
    url: Regex,
    email: Regex,
    digits: Regex,
    non_word: Regex,
    noisy_symbols: Regex,
    ellipsis_run: Regex,
    double_punct: Regex,
    comma_run: Regex,
    whitespace: Regex,
    html_tag: Regex,
    html_element: Regex,
    html_self_closing: Regex,
}

impl CleanerAgent {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            url: Regex::new(r"https?://\S+").unwrap(),
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            digits: Regex::new(r"\d+").unwrap(),
            non_word: Regex::new(r"[^\w\s]").unwrap(),
            noisy_symbols: Regex::new(r#"[@!%^&*()_+}{:"?<>\\/\[\]#$~`|;=]"#).unwrap(),
            ellipsis_run: Regex::new(r"[.!?]{3,}").unwrap(),
            double_punct: Regex::new(r"[.!?]{2}").unwrap(),
            comma_run: Regex::new(r",{2,}").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
            html_tag: Regex::new(r"<[^>]+>").unwrap(),
            html_element: Regex::new(r"(?s)<[^>]*>.*?</[^>]*>").unwrap(),
            html_self_closing: Regex::new(r"<[^>]*?/>").unwrap(),
        }
    }

    async fn clean_text(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let cleaning = self.context.settings().await.cleaning;

        let remove_numbers = bool_arg(args, "remove_numbers", false);
        let remove_punctuation = bool_arg(args, "remove_punctuation", false);
        let normalize_whitespace = bool_arg(args, "normalize_whitespace", true);
        let to_lowercase = bool_arg(args, "to_lowercase", false);
        let remove_urls = bool_arg(args, "remove_urls", cleaning.remove_urls);
        let remove_emails = bool_arg(args, "remove_emails", cleaning.remove_emails);

        let mut text = text.to_string();
        if remove_urls {
            text = self.url.replace_all(&text, " ").into_owned();
        }
        if remove_emails {
            text = self.email.replace_all(&text, " ").into_owned();
        }
        if remove_numbers {
            text = self.digits.replace_all(&text, "").into_owned();
        }

        if remove_punctuation {
            text = self.non_word.replace_all(&text, "").into_owned();
        } else {
            // Keep sentence punctuation but drop noisy symbols and collapse
            // stuttered punctuation runs.
            text = self.noisy_symbols.replace_all(&text, "").into_owned();
            text = self.ellipsis_run.replace_all(&text, "...").into_owned();
            text = self.double_punct.replace_all(&text, ".").into_owned();
            text = self.comma_run.replace_all(&text, ",").into_owned();
        }

        if normalize_whitespace {
            text = self.whitespace.replace_all(&text, " ").trim().to_string();
        }
        if to_lowercase {
            text = text.to_lowercase();
        }

        Ok(ToolOutput::Text(text))
    }

    async fn remove_special_symbols(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;

        let symbols = args
            .get("symbols_to_remove")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SYMBOLS);
        let preserve_basic = bool_arg(args, "preserve_basic_punctuation", true);

        let banned: std::collections::HashSet<char> = symbols.chars().collect();
        let cleaned: String = text
            .chars()
            .filter(|c| {
                if banned.contains(c) {
                    return false;
                }
                if preserve_basic {
                    return true;
                }
                c.is_alphanumeric() || *c == '_' || c.is_whitespace()
            })
            .collect();

        let cleaned = self.whitespace.replace_all(&cleaned, " ").trim().to_string();
        Ok(ToolOutput::Text(cleaned))
    }

    async fn normalize_unicode(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let form = args
            .get("form")
            .and_then(Value::as_str)
            .unwrap_or("NFC")
            .to_uppercase();

        let normalized = match form.as_str() {
            "NFC" => text.nfc().collect::<String>(),
            "NFD" => text.nfd().collect::<String>(),
            "NFKC" => text.nfkc().collect::<String>(),
            "NFKD" => text.nfkd().collect::<String>(),
            other => {
                return Err(AgentError::Validation(format!(
                    "Invalid normalization form: {}",
                    other
                )))
            }
        };

        Ok(ToolOutput::Text(normalized))
    }

    async fn remove_html_tags(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = self.context.validate_text_input(str_arg(args, "text")).await?;
        let preserve_content = bool_arg(args, "preserve_content", true);

        let stripped = if preserve_content {
            self.html_tag.replace_all(text, "").into_owned()
        } else {
            let without_elements = self.html_element.replace_all(text, "").into_owned();
            self.html_self_closing
                .replace_all(&without_elements, "")
                .into_owned()
        };

        let stripped = self.whitespace.replace_all(&stripped, " ").trim().to_string();
        Ok(ToolOutput::Text(stripped))
    }
}

#[async_trait]
impl TextAgent for CleanerAgent {
    fn name(&self) -> &str {
        "cleaner"
    }

    fn description(&self) -> &str {
        "Cleans and normalizes text: symbols, whitespace, Unicode forms and HTML"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "clean_text",
                "Clean and normalize text by removing special characters, extra whitespace, and formatting",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to clean and normalize"
                        },
                        "remove_numbers": {
                            "type": "boolean",
                            "description": "Remove digits from the text",
                            "default": false
                        },
                        "remove_punctuation": {
                            "type": "boolean",
                            "description": "Remove all punctuation from the text",
                            "default": false
                        },
                        "normalize_whitespace": {
                            "type": "boolean",
                            "description": "Collapse runs of spaces, tabs and newlines",
                            "default": true
                        },
                        "to_lowercase": {
                            "type": "boolean",
                            "description": "Convert the text to lowercase",
                            "default": false
                        },
                        "remove_urls": {
                            "type": "boolean",
                            "description": "Remove URLs from the text",
                            "default": false
                        },
                        "remove_emails": {
                            "type": "boolean",
                            "description": "Remove email addresses from the text",
                            "default": false
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "normalize_unicode",
                "Normalize Unicode characters in text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to normalize"
                        },
                        "form": {
                            "type": "string",
                            "description": "Unicode normalization form (NFC, NFD, NFKC, NFKD)",
                            "default": "NFC"
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "remove_special_symbols",
                "Remove specific special symbols while preserving text readability",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to clean of special symbols"
                        },
                        "symbols_to_remove": {
                            "type": "string",
                            "description": "Custom symbols to remove",
                            "default": DEFAULT_SYMBOLS
                        },
                        "preserve_basic_punctuation": {
                            "type": "boolean",
                            "description": "Keep periods, commas and apostrophes",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "remove_html_tags",
                "Remove HTML tags from text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text containing HTML tags to remove"
                        },
                        "preserve_content": {
                            "type": "boolean",
                            "description": "Keep the text content inside tags",
                            "default": true
                        }
                    },
                    "required": ["text"]
                }),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "clean_text" => self.clean_text(arguments).await,
            "normalize_unicode" => self.normalize_unicode(arguments).await,
            "remove_special_symbols" => self.remove_special_symbols(arguments).await,
            "remove_html_tags" => self.remove_html_tags(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::testing::context;

    fn agent() -> CleanerAgent {
        CleanerAgent::new(context())
    }

    async fn run(agent: &CleanerAgent, tool: &str, args: Value) -> String {
        agent.execute_tool(tool, &args).await.unwrap().into_text()
    }

    #[tokio::test]
    async fn urls_and_emails_survive_by_default() {
        let out = run(
            &agent(),
            "clean_text",
            json!({"text": "Visit https://example.com or mail a.b@example.com"}),
        )
        .await;

        assert!(out.contains("https://example.com"));
        assert!(out.contains("a.b@example.com"));
    }

    #[tokio::test]
    async fn explicit_flags_remove_urls_and_emails() {
        let out = run(
            &agent(),
            "clean_text",
            json!({
                "text": "Visit https://example.com or mail a.b@example.com now",
                "remove_urls": true,
                "remove_emails": true
            }),
        )
        .await;

        assert!(!out.contains("example.com"));
        assert!(out.contains("now"));
    }

    #[tokio::test]
    async fn noisy_symbols_are_dropped_without_touching_sentences() {
        let out = run(
            &agent(),
            "clean_text",
            json!({"text": "Price: high. Questions, comments #tags @user"}),
        )
        .await;

        assert_eq!(out, "Price high. Questions, comments tags user");
    }

    #[tokio::test]
    async fn punctuation_runs_are_collapsed() {
        let out = run(&agent(), "clean_text", json!({"text": "so,,, then,, done.."})).await;
        assert_eq!(out, "so, then, done.");

        // Long runs shrink in two passes, so five dots end up as two.
        let out = run(&agent(), "clean_text", json!({"text": "Wait....."})).await;
        assert_eq!(out, "Wait..");
    }

    #[tokio::test]
    async fn numbers_and_punctuation_flags() {
        let out = run(
            &agent(),
            "clean_text",
            json!({"text": "Call 555 now, ok", "remove_numbers": true, "remove_punctuation": true}),
        )
        .await;
        assert_eq!(out, "Call now ok");
    }

    #[tokio::test]
    async fn lowercase_flag_applies_last() {
        let out = run(
            &agent(),
            "clean_text",
            json!({"text": "MiXeD Case", "to_lowercase": true}),
        )
        .await;
        assert_eq!(out, "mixed case");
    }

    #[tokio::test]
    async fn unicode_forms_round_between_composed_and_decomposed() {
        let composed = run(
            &agent(),
            "normalize_unicode",
            json!({"text": "cafe\u{0301}", "form": "NFC"}),
        )
        .await;
        assert_eq!(composed, "café");

        let decomposed = run(
            &agent(),
            "normalize_unicode",
            json!({"text": "café", "form": "NFD"}),
        )
        .await;
        assert_eq!(decomposed.chars().count(), 5);
    }

    #[tokio::test]
    async fn invalid_normalization_form_is_a_validation_error() {
        let err = agent()
            .execute_tool("normalize_unicode", &json!({"text": "x", "form": "NFX"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn default_symbol_set_keeps_periods() {
        let out = run(
            &agent(),
            "remove_special_symbols",
            json!({"text": "Done. Really? Yes!"}),
        )
        .await;
        assert_eq!(out, "Done. Really Yes");
    }

    #[tokio::test]
    async fn custom_symbols_and_strict_mode() {
        let out = run(
            &agent(),
            "remove_special_symbols",
            json!({"text": "a-b.c,d", "symbols_to_remove": "-", "preserve_basic_punctuation": false}),
        )
        .await;
        assert_eq!(out, "abcd");
    }

    #[tokio::test]
    async fn html_tags_removed_content_kept() {
        let out = run(
            &agent(),
            "remove_html_tags",
            json!({"text": "<p>Hello <b>world</b></p>"}),
        )
        .await;
        assert_eq!(out, "Hello world");
    }

    #[tokio::test]
    async fn html_elements_removed_entirely_when_asked() {
        let out = run(
            &agent(),
            "remove_html_tags",
            json!({"text": "before <b>bold</b> after <br/>", "preserve_content": false}),
        )
        .await;
        assert_eq!(out, "before after");
    }

    #[tokio::test]
    async fn whitespace_and_tag_cleanup_are_stable_on_reapplication() {
        let agent = agent();

        let once = run(
            &agent,
            "clean_text",
            json!({"text": "Some   messy\t\ttext.  One line. \n\n Done."}),
        )
        .await;
        assert_eq!(once, "Some messy text. One line. Done.");
        let twice = run(&agent, "clean_text", json!({"text": once.clone()})).await;
        assert_eq!(twice, once);

        let once = run(
            &agent,
            "remove_html_tags",
            json!({"text": "<div>Keep <b>this</b>  text</div>"}),
        )
        .await;
        assert_eq!(once, "Keep this text");
        let twice = run(&agent, "remove_html_tags", json!({"text": once.clone()})).await;
        assert_eq!(twice, once);
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let err = agent()
            .execute_tool("clean_text", &json!({"text": "   "}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let err = agent()
            .execute_tool("shine_text", &json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }
}
