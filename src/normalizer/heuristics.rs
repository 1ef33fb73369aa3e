//! Cheap content heuristics: token estimates, model names and previews.

use lazy_static::lazy_static;
use regex::Regex;

use crate::normalizer::redact::redact_credentials;

lazy_static! {
    /// Model-name patterns, tried in order; the first match wins
    static ref MODEL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(claude-[\w.-]+)").expect("model pattern must compile"),
        Regex::new(r"(?i)(gpt-[\w.-]+)").expect("model pattern must compile"),
        Regex::new(r"(?i)\b(o[1-9]-[\w.-]+)").expect("model pattern must compile"),
        Regex::new(r"(?i)(gemini-[\w.-]+)").expect("model pattern must compile"),
        Regex::new(r"(?i)(llama-[\w.-]+)").expect("model pattern must compile"),
        Regex::new(r"(?i)(mistral-[\w.-]+)").expect("model pattern must compile"),
        Regex::new(r"(?i)(command-r[\w.-]*)").expect("model pattern must compile"),
    ];
}

/// Rough token count: one token per four characters.
pub fn estimate_tokens(text: &str) -> i64 {
    (text.chars().count() / 4) as i64
}

/// Extract the first model identifier mentioned in `text`.
pub fn identify_model(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    MODEL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .map(|caps| caps[1].to_string())
}

/// Redact `text` and cut it to at most `max_chars` characters.
///
/// Truncated previews end in `...` and still fit within `max_chars`.
pub fn content_preview(text: &str, max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let sanitized = redact_credentials(text);
    if sanitized.chars().count() <= max_chars {
        return sanitized;
    }
    let keep = max_chars.saturating_sub(3);
    let mut preview: String = sanitized.chars().take(keep).collect();
    preview.push_str("...");
    preview
}

/// Redact a raw payload and keep it only when the redacted text is shorter
/// than `max_chars`.
///
/// Placeholders can be longer than what they replace, so the bound is taken
/// after redaction.
pub fn cap_raw_data(raw: String, max_chars: usize) -> Option<String> {
    let redacted = redact_credentials(&raw);
    if redacted.chars().count() < max_chars {
        Some(redacted)
    } else {
        None
    }
}
