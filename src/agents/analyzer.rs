//! Statistical text analysis: basic counts, readability, word frequency
//! and complexity scoring. No model calls; everything is computed locally.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::agents::base::{bool_arg, text_or_url, usize_arg, AgentContext};
use crate::agents::error::{AgentError, AgentResult};
use crate::domain::{TextAgent, Tool, ToolOutput};

const EDGE_PUNCT: &[char] = &['.', ',', '!', '?', ';', ':', '"', '(', ')', '[', ']'];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "this", "that", "these", "those", "i",
    "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your", "his",
    "its", "our", "their",
];

pub struct AnalyzerAgent {
    context: AgentContext,
    word: Regex,
    sentence_break: Regex,
    stop_words: HashSet<&'static str>,
}

impl AnalyzerAgent {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            word: Regex::new(r"\b\w+\b").unwrap(),
            sentence_break: Regex::new(r"[.!?]+").unwrap(),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn sentences(&self, text: &str) -> Vec<String> {
        self.sentence_break
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    async fn analyze_text_basic(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = text_or_url(&self.context, "analyze_text_basic", args).await?;
        let include_whitespace = bool_arg(args, "include_whitespace", true);

        let total_chars = text.chars().count();
        let chars_no_spaces = text.chars().filter(|c| !c.is_whitespace()).count();
        let char_count = if include_whitespace {
            total_chars
        } else {
            chars_no_spaces
        };

        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len();
        let unique_words: HashSet<String> = words
            .iter()
            .map(|w| w.trim_matches(EDGE_PUNCT).to_lowercase())
            .collect();
        let avg_word_length = if word_count > 0 {
            words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count as f64
        } else {
            0.0
        };

        let sentences = self.sentences(&text);
        let sentence_count = sentences.len();
        let avg_sentence_length = if sentence_count > 0 {
            word_count as f64 / sentence_count as f64
        } else {
            0.0
        };

        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let paragraph_count = paragraphs.len();

        Ok(ToolOutput::Json(json!({
            "character_statistics": {
                "total_characters": char_count,
                "characters_without_spaces": chars_no_spaces,
                "whitespace_characters": char_count.saturating_sub(chars_no_spaces),
            },
            "word_statistics": {
                "total_words": word_count,
                "unique_words": unique_words.len(),
                "vocabulary_richness": ratio(unique_words.len(), word_count),
                "average_word_length": round2(avg_word_length),
            },
            "sentence_statistics": {
                "total_sentences": sentence_count,
                "average_sentence_length": round2(avg_sentence_length),
            },
            "paragraph_statistics": {
                "total_paragraphs": paragraph_count,
                "average_paragraph_length": round2(ratio(sentence_count, paragraph_count)),
            },
            "text_density": {
                "words_per_paragraph": round2(ratio(word_count, paragraph_count)),
                "characters_per_word": round2(ratio(chars_no_spaces, word_count)),
            },
        })))
    }

    async fn analyze_readability(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = text_or_url(&self.context, "analyze_readability", args).await?;
        let selected: Vec<String> = args
            .get("metrics")
            .and_then(Value::as_array)
            .map(|metrics| {
                metrics
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "flesch_kincaid".to_string(),
                    "flesch_reading_ease".to_string(),
                    "coleman_liau".to_string(),
                    "automated_readability".to_string(),
                ]
            });

        let counts = TextCounts::of(&text);
        let mut metrics = serde_json::Map::new();

        if selected.iter().any(|m| m == "flesch_kincaid") {
            metrics.insert(
                "flesch_kincaid_grade".to_string(),
                match counts.flesch_kincaid_grade() {
                    Some(score) => json!({
                        "score": round2(score),
                        "description": "Grade level needed to understand the text",
                    }),
                    None => json!({"error": "Could not calculate"}),
                },
            );
        }
        if selected.iter().any(|m| m == "flesch_reading_ease") {
            metrics.insert(
                "flesch_reading_ease".to_string(),
                match counts.flesch_reading_ease() {
                    Some(score) => json!({
                        "score": round2(score),
                        "level": flesch_level(score),
                        "description": "Reading ease score (higher = easier)",
                    }),
                    None => json!({"error": "Could not calculate"}),
                },
            );
        }
        if selected.iter().any(|m| m == "coleman_liau") {
            metrics.insert(
                "coleman_liau_index".to_string(),
                match counts.coleman_liau_index() {
                    Some(score) => json!({
                        "score": round2(score),
                        "description": "Grade level based on characters per word and sentences per word",
                    }),
                    None => json!({"error": "Could not calculate"}),
                },
            );
        }
        if selected.iter().any(|m| m == "automated_readability") {
            metrics.insert(
                "automated_readability_index".to_string(),
                match counts.automated_readability_index() {
                    Some(score) => json!({
                        "score": round2(score),
                        "description": "Grade level based on character and sentence length",
                    }),
                    None => json!({"error": "Could not calculate"}),
                },
            );
        }

        let assessment = readability_assessment(&metrics);
        Ok(ToolOutput::Json(json!({
            "readability_metrics": Value::Object(metrics),
            "overall_assessment": assessment,
        })))
    }

    async fn word_frequency_analysis(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = text_or_url(&self.context, "word_frequency_analysis", args).await?;
        let top_n = usize_arg(args, "top_n", 10);
        let min_length = usize_arg(args, "min_length", 3);
        let exclude_common = bool_arg(args, "exclude_common", true);

        let lowered = text.to_lowercase();
        let filtered: Vec<&str> = self
            .word
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|w| w.chars().count() >= min_length)
            .filter(|w| !exclude_common || !self.stop_words.contains(w))
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in &filtered {
            *counts.entry(word).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&str, usize)> = counts.iter().map(|(w, c)| (*w, *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(top_n);

        let total = filtered.len();
        let most_frequent: Vec<Value> = ranked
            .iter()
            .map(|(word, count)| {
                json!({
                    "word": word,
                    "count": count,
                    "frequency": ratio(*count, total),
                })
            })
            .collect();

        Ok(ToolOutput::Json(json!({
            "word_frequency": {
                "total_words_analyzed": total,
                "unique_words": counts.len(),
                "most_frequent": most_frequent,
            },
            "analysis_parameters": {
                "minimum_word_length": min_length,
                "excluded_common_words": exclude_common,
                "total_unique_words_found": counts.len(),
            },
        })))
    }

    async fn text_complexity_analysis(&self, args: &Value) -> AgentResult<ToolOutput> {
        let text = text_or_url(&self.context, "text_complexity_analysis", args).await?;

        let words: Vec<&str> = text.split_whitespace().collect();
        let sentences = self.sentences(&text);

        let unique: HashSet<String> = words
            .iter()
            .map(|w| w.trim_matches(EDGE_PUNCT).to_lowercase())
            .collect();
        let ttr = ratio(unique.len(), words.len());

        let avg_sentence_length = ratio(words.len(), sentences.len());
        let stripped: Vec<&str> = words.iter().map(|w| w.trim_matches(EDGE_PUNCT)).collect();
        let avg_word_length = if stripped.is_empty() {
            0.0
        } else {
            stripped.iter().map(|w| w.chars().count()).sum::<usize>() as f64
                / stripped.len() as f64
        };
        let avg_syllables = if words.is_empty() {
            0.0
        } else {
            stripped.iter().map(|w| estimate_syllables(w)).sum::<usize>() as f64
                / words.len() as f64
        };

        let complexity_score = (avg_sentence_length / 20.0) * 0.3
            + (avg_word_length / 8.0) * 0.2
            + (avg_syllables / 3.0) * 0.3
            + ((1.0 - ttr) * 2.0) * 0.2;

        Ok(ToolOutput::Json(json!({
            "complexity_metrics": {
                "type_token_ratio": round3(ttr),
                "average_sentence_length": round2(avg_sentence_length),
                "average_word_length": round2(avg_word_length),
                "average_syllables_per_word": round2(avg_syllables),
                "complexity_score": round3(complexity_score),
            },
            "complexity_assessment": complexity_assessment(complexity_score),
            "vocabulary_analysis": {
                "total_words": words.len(),
                "unique_words": unique.len(),
                "vocabulary_richness": round3(ttr),
            },
        })))
    }
}

/// Word, sentence, syllable and character tallies behind the readability
/// formulas.
struct TextCounts {
    words: usize,
    sentences: usize,
    syllables: usize,
    letters: usize,
}

impl TextCounts {
    fn of(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let sentences = Regex::new(r"[.!?]+")
            .unwrap()
            .split(text)
            .filter(|s| !s.trim().is_empty())
            .count();
        let stripped: Vec<&str> = words.iter().map(|w| w.trim_matches(EDGE_PUNCT)).collect();
        let syllables = stripped.iter().map(|w| estimate_syllables(w)).sum();
        let letters = text.chars().filter(|c| c.is_alphanumeric()).count();

        Self {
            words: words.len(),
            sentences,
            syllables,
            letters,
        }
    }

    fn usable(&self) -> bool {
        self.words > 0 && self.sentences > 0
    }

    fn flesch_reading_ease(&self) -> Option<f64> {
        if !self.usable() {
            return None;
        }
        let wps = self.words as f64 / self.sentences as f64;
        let spw = self.syllables as f64 / self.words as f64;
        Some(206.835 - 1.015 * wps - 84.6 * spw)
    }

    fn flesch_kincaid_grade(&self) -> Option<f64> {
        if !self.usable() {
            return None;
        }
        let wps = self.words as f64 / self.sentences as f64;
        let spw = self.syllables as f64 / self.words as f64;
        Some(0.39 * wps + 11.8 * spw - 15.59)
    }

    fn coleman_liau_index(&self) -> Option<f64> {
        if !self.usable() {
            return None;
        }
        let l = self.letters as f64 / self.words as f64 * 100.0;
        let s = self.sentences as f64 / self.words as f64 * 100.0;
        Some(0.0588 * l - 0.296 * s - 15.8)
    }

    fn automated_readability_index(&self) -> Option<f64> {
        if !self.usable() {
            return None;
        }
        let cpw = self.letters as f64 / self.words as f64;
        let wps = self.words as f64 / self.sentences as f64;
        Some(4.71 * cpw + 0.58 * wps - 21.43)
    }
}

/// Vowel-group syllable estimate with a silent-e correction; never below 1
/// for a non-empty word.
fn estimate_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    if word.is_empty() {
        return 0;
    }

    let mut syllables = 0usize;
    let mut prev_was_vowel = false;
    for c in word.chars() {
        let is_vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if is_vowel && !prev_was_vowel {
            syllables += 1;
        }
        prev_was_vowel = is_vowel;
    }

    if word.ends_with('e') && syllables > 1 {
        syllables -= 1;
    }
    syllables.max(1)
}

fn flesch_level(score: f64) -> &'static str {
    if score >= 90.0 {
        "Very Easy"
    } else if score >= 80.0 {
        "Easy"
    } else if score >= 70.0 {
        "Fairly Easy"
    } else if score >= 60.0 {
        "Standard"
    } else if score >= 50.0 {
        "Fairly Difficult"
    } else if score >= 30.0 {
        "Difficult"
    } else {
        "Very Difficult"
    }
}

/// Blend the computed grades onto a rough 0-10 scale and band them.
fn readability_assessment(metrics: &serde_json::Map<String, Value>) -> String {
    let mut scores = Vec::new();
    for (name, data) in metrics {
        let Some(score) = data.get("score").and_then(Value::as_f64) else {
            continue;
        };
        if name == "flesch_reading_ease" {
            scores.push(score / 10.0);
        } else {
            scores.push(score.min(20.0) / 2.0);
        }
    }

    if scores.is_empty() {
        return "Unable to assess".to_string();
    }

    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    let band = if avg <= 3.0 {
        "Elementary level"
    } else if avg <= 6.0 {
        "Middle school level"
    } else if avg <= 9.0 {
        "High school level"
    } else if avg <= 12.0 {
        "College level"
    } else {
        "Graduate level"
    };
    band.to_string()
}

fn complexity_assessment(score: f64) -> &'static str {
    if score <= 0.3 {
        "Simple"
    } else if score <= 0.6 {
        "Moderate"
    } else if score <= 0.8 {
        "Complex"
    } else {
        "Very Complex"
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[async_trait]
impl TextAgent for AnalyzerAgent {
    fn name(&self) -> &str {
        "analyzer"
    }

    fn description(&self) -> &str {
        "Computes text statistics, readability scores and word frequencies"
    }

    fn tools(&self) -> Vec<Tool> {
        let source_properties = json!({
            "text": {
                "type": "string",
                "description": "The text to analyze"
            },
            "url": {
                "type": "string",
                "description": "URL to fetch and analyze instead of direct text"
            }
        });

        let mut basic = source_properties.clone();
        basic["include_whitespace"] = json!({
            "type": "boolean",
            "description": "Count whitespace in the character total",
            "default": true
        });

        let mut readability = source_properties.clone();
        readability["metrics"] = json!({
            "type": "array",
            "items": {"type": "string"},
            "description": "Metrics to compute (flesch_kincaid, flesch_reading_ease, coleman_liau, automated_readability)"
        });

        let mut frequency = source_properties.clone();
        frequency["top_n"] = json!({
            "type": "integer",
            "description": "How many words to return",
            "default": 10
        });
        frequency["min_length"] = json!({
            "type": "integer",
            "description": "Minimum word length to count",
            "default": 3
        });
        frequency["exclude_common"] = json!({
            "type": "boolean",
            "description": "Skip common stop words",
            "default": true
        });

        vec![
            Tool::new(
                "analyze_text_basic",
                "Compute basic statistics: characters, words, sentences and paragraphs",
                json!({"type": "object", "properties": basic}),
            ),
            Tool::new(
                "analyze_readability",
                "Score text readability with standard formulas",
                json!({"type": "object", "properties": readability}),
            ),
            Tool::new(
                "word_frequency_analysis",
                "Rank the most frequent words in the text",
                json!({"type": "object", "properties": frequency}),
            ),
            Tool::new(
                "text_complexity_analysis",
                "Score vocabulary richness and structural complexity",
                json!({"type": "object", "properties": source_properties}),
            ),
        ]
    }

    async fn execute_tool(&self, name: &str, arguments: &Value) -> AgentResult<ToolOutput> {
        match name {
            "analyze_text_basic" => self.analyze_text_basic(arguments).await,
            "analyze_readability" => self.analyze_readability(arguments).await,
            "word_frequency_analysis" => self.word_frequency_analysis(arguments).await,
            "text_complexity_analysis" => self.text_complexity_analysis(arguments).await,
            other => Err(AgentError::NotFound(other.to_string())),
        }
    }
}
