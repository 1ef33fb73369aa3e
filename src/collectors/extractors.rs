//! Handlers turning one matched file (or store directory) into artifacts.
//!
//! Each handler returns `Err` only for problems with its own file; the
//! engine logs the error and moves on to the next file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::params_from_iter;
use serde_json::{json, Map, Value};

use crate::collectors::collector::CollectorContext;
use crate::collectors::permission_tracker::PermissionTracker;
use crate::collectors::records::{ChatMessage, RawRecord};
use crate::config::{BrowserFlavor, ExtractorKind, SqliteMapping};
use crate::constants::{AI_URL_PATTERNS, MAX_CARVED_SAMPLES, MAX_CONVERSATION_IDS, REDACTION_PLACEHOLDER};
use crate::models::Artifact;
use crate::normalizer::{content_preview, estimate_tokens, identify_model, normalize_json_timestamp};
use crate::safeio::{
    bounded_read, read_jsonl, read_only_query, read_structured_bounded, table_row_counts,
    Bounded, Carver, Row, StructuredContent,
};

lazy_static! {
    static ref UUID: Regex = Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
    )
    .expect("uuid pattern must compile");
}

/// Carved sample previews are kept short.
const SAMPLE_PREVIEW_CHARS: usize = 200;

/// Matching log lines kept as samples.
const MAX_LOG_SAMPLES: usize = 5;

/// Messages folded into a conversation preview.
const PREVIEW_MESSAGES: usize = 3;

/// One file handed to an extractor.
pub struct FileInput<'a> {
    pub source_tool: &'a str,
    pub artifact_type: &'a str,
    pub path: &'a Path,
    pub ctx: &'a CollectorContext,
}

impl FileInput<'_> {
    fn template(&self) -> Artifact {
        self.ctx.file_artifact(self.source_tool, self.artifact_type, self.path)
    }

    fn max_bytes(&self) -> u64 {
        self.ctx.policy.max_file_bytes
    }

    fn stem(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    }
}

/// Dispatch on the extractor kind.
pub fn extract(kind: &ExtractorKind, input: &FileInput<'_>) -> Result<Vec<Artifact>> {
    match kind {
        ExtractorKind::JsonlMessages => jsonl_messages(input),
        ExtractorKind::JsonDocument => json_document(input),
        ExtractorKind::TextFile => text_file(input),
        ExtractorKind::SqliteQuery(mapping) => sqlite_query(input, mapping),
        ExtractorKind::SqliteSummary => sqlite_summary(input),
        ExtractorKind::BrowserHistory { flavor } => browser_history(input, *flavor),
        ExtractorKind::LeveldbCarve => leveldb_carve(input),
        ExtractorKind::MetadataOnly => metadata_only(input),
        ExtractorKind::KeywordLog { keywords } => keyword_log(input, keywords),
    }
}

/// Read a text file, turning markers into errors for this file.
fn read_text(input: &FileInput<'_>) -> Result<String> {
    match bounded_read(input.path, input.max_bytes()) {
        Bounded::Content(text) => Ok(text),
        Bounded::TooLarge { size, limit } => {
            bail!("{} bytes exceeds the {} byte bound", size, limit)
        }
        Bounded::Unreadable(reason) => bail!("unreadable: {}", reason),
    }
}

/// Fail early, with the I/O error, when the file cannot be opened at all.
fn ensure_openable(path: &Path) -> Result<()> {
    File::open(path)
        .map(|_| ())
        .with_context(|| format!("Failed to open {}", path.display()))
}

fn fill_message(artifact: &mut Artifact, message: &ChatMessage, ctx: &CollectorContext) {
    artifact.timestamp = message.timestamp.clone().or(artifact.timestamp.take());
    artifact.message_role = message.role.clone();
    artifact.content_preview = Some(ctx.policy.preview(&message.text));
    artifact.token_estimate = Some(estimate_tokens(&message.text));
    artifact.model_identified = message
        .model
        .clone()
        .or_else(|| identify_model(&message.text));
    if message.conversation_id.is_some() {
        artifact.conversation_id = message.conversation_id.clone();
    }
}

fn message_artifacts(
    input: &FileInput<'_>,
    template: &Artifact,
    messages: Vec<ChatMessage>,
    extra: Value,
) -> Vec<Artifact> {
    messages
        .into_iter()
        .map(|message| {
            let mut artifact = template.sibling();
            fill_message(&mut artifact, &message, input.ctx);
            artifact.metadata = Some(extra.clone());
            artifact
        })
        .collect()
}

fn jsonl_messages(input: &FileInput<'_>) -> Result<Vec<Artifact>> {
    ensure_openable(input.path)?;
    let mut template = input.template();
    template.conversation_id = input.stem();

    let mut artifacts = Vec::new();
    for (index, value) in read_jsonl(input.path, input.max_bytes()).into_iter().enumerate() {
        let raw = input.ctx.policy.keep_raw(value.to_string());
        for message in RawRecord::classify(&value).into_messages() {
            let mut artifact = template.sibling();
            fill_message(&mut artifact, &message, input.ctx);
            artifact.raw_data = raw.clone();
            artifact.metadata = Some(json!({ "record_index": index }));
            artifacts.push(artifact);
        }
    }
    Ok(artifacts)
}

/// Replace the values of a top-level `env` object, keeping its key names.
fn scrub_env_block(document: &mut Value) -> Vec<String> {
    let Some(Value::Object(env)) = document.get_mut("env") else {
        return Vec::new();
    };
    let names: Vec<String> = env.keys().cloned().collect();
    for value in env.values_mut() {
        *value = Value::String(REDACTION_PLACEHOLDER.to_string());
    }
    names
}

fn json_document(input: &FileInput<'_>) -> Result<Vec<Artifact>> {
    let mut document = match read_structured_bounded(input.path, input.max_bytes()) {
        StructuredContent::Json(value) => value,
        StructuredContent::Text(text) => {
            let mut artifact = input.template();
            artifact.content_preview = Some(input.ctx.policy.preview(&text));
            artifact.token_estimate = Some(estimate_tokens(&text));
            artifact.raw_data = input.ctx.policy.keep_raw(text);
            artifact.metadata = Some(json!({ "parsed": false }));
            return Ok(vec![artifact]);
        }
        StructuredContent::Unavailable(reason) => bail!("unreadable: {}", reason),
    };

    match RawRecord::classify(&document) {
        RawRecord::Conversation { id, title, timestamp, messages } if !messages.is_empty() => {
            let mut template = input.template();
            template.conversation_id = id.or_else(|| input.stem());
            template.timestamp = timestamp;
            let extra = json!({ "title": title, "message_count": messages.len() });
            Ok(message_artifacts(input, &template, messages, extra))
        }
        RawRecord::Message(message) => {
            let template = input.template();
            Ok(message_artifacts(input, &template, vec![message], json!({})))
        }
        _ => {
            let env_names = scrub_env_block(&mut document);
            let serialized = document.to_string();

            let mut artifact = input.template();
            artifact.content_preview = Some(input.ctx.policy.preview(&serialized));
            artifact.model_identified = identify_model(&serialized);
            artifact.raw_data = input.ctx.policy.keep_raw(serialized);

            let top_level_keys: Vec<&String> = document
                .as_object()
                .map(|obj| obj.keys().collect())
                .unwrap_or_default();
            artifact.metadata = Some(json!({
                "top_level_keys": top_level_keys,
                "has_env_block": !env_names.is_empty(),
                "env_variable_names": env_names,
            }));
            Ok(vec![artifact])
        }
    }
}

fn text_file(input: &FileInput<'_>) -> Result<Vec<Artifact>> {
    let text = read_text(input)?;
    let mut artifact = input.template();
    artifact.content_preview = Some(input.ctx.policy.preview(&text));
    artifact.token_estimate = Some(estimate_tokens(&text));
    artifact.model_identified = identify_model(&text);
    artifact.metadata = Some(json!({ "line_count": text.lines().count() }));
    artifact.raw_data = input.ctx.policy.keep_raw(text);
    Ok(vec![artifact])
}

fn column_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn sqlite_query(input: &FileInput<'_>, mapping: &SqliteMapping) -> Result<Vec<Artifact>> {
    let rows = read_only_query(input.path, &mapping.query, []);
    let template = input.template();

    let mut artifacts = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let content = mapping
            .content_columns
            .iter()
            .filter_map(|column| column_text(row, column))
            .collect::<Vec<_>>()
            .join("\n");

        let mut artifact = template.sibling();
        artifact.conversation_id = mapping
            .conversation_column
            .as_deref()
            .and_then(|column| column_text(row, column));
        artifact.message_role = mapping
            .role_column
            .as_deref()
            .and_then(|column| column_text(row, column));
        artifact.timestamp = mapping
            .timestamp_column
            .as_deref()
            .and_then(|column| row.get(column))
            .and_then(normalize_json_timestamp);

        // Values are frequently JSON documents holding a whole conversation
        let mut preview_text = content.clone();
        let mut message_count = None;
        if let Ok(parsed) = serde_json::from_str::<Value>(&content) {
            match RawRecord::classify(&parsed) {
                RawRecord::Conversation { title, timestamp, messages, .. } => {
                    message_count = Some(messages.len());
                    let joined = messages
                        .iter()
                        .take(PREVIEW_MESSAGES)
                        .map(|m| m.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    preview_text = match title {
                        Some(title) => format!("[{}] {}", title, joined),
                        None => joined,
                    };
                    artifact.timestamp = artifact.timestamp.take().or(timestamp);
                    if artifact.model_identified.is_none() {
                        artifact.model_identified = messages.iter().find_map(|m| m.model.clone());
                    }
                }
                RawRecord::Message(message) => {
                    preview_text = message.text.clone();
                    artifact.message_role = artifact.message_role.take().or(message.role);
                    artifact.timestamp = artifact.timestamp.take().or(message.timestamp);
                    artifact.model_identified = message.model;
                }
                _ => {
                    if let Value::Object(obj) = &parsed {
                        artifact.model_identified = obj
                            .get("model")
                            .or_else(|| obj.get("modelId"))
                            .and_then(Value::as_str)
                            .map(String::from);
                    }
                }
            }
        }

        if let Some(column) = mapping.model_column.as_deref() {
            if let Some(model) = column_text(row, column) {
                artifact.model_identified = Some(model);
            }
        }
        if artifact.model_identified.is_none() {
            artifact.model_identified = identify_model(&content);
        }

        artifact.content_preview = Some(input.ctx.policy.preview(preview_text.trim()));
        artifact.token_estimate = Some(estimate_tokens(&content));
        artifact.metadata = Some(json!({
            "row_index": index,
            "value_size_bytes": content.len(),
            "message_count": message_count,
        }));
        artifact.raw_data = input.ctx.policy.keep_raw(content);
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

fn sqlite_summary(input: &FileInput<'_>) -> Result<Vec<Artifact>> {
    ensure_openable(input.path)?;
    let counts = table_row_counts(input.path);

    let mut artifact = input.template();
    let listing = counts
        .iter()
        .map(|(name, count)| format!("{} ({})", name, count))
        .collect::<Vec<_>>()
        .join(", ");
    artifact.content_preview = Some(
        input
            .ctx
            .policy
            .preview(&format!("{} tables: {}", counts.len(), listing)),
    );
    let tables: Map<String, Value> = counts
        .into_iter()
        .map(|(name, count)| (name, Value::from(count)))
        .collect();
    artifact.metadata = Some(json!({ "tables": tables }));
    Ok(vec![artifact])
}

fn like_filter(column: &str) -> String {
    (1..=AI_URL_PATTERNS.len())
        .map(|i| format!("{} LIKE ?{}", column, i))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Query text for the AI-service visits of a browser history database.
pub fn browser_history_sql(flavor: BrowserFlavor) -> String {
    match flavor {
        BrowserFlavor::Chromium => format!(
            "SELECT u.url AS url, u.title AS title, v.visit_time AS visit_time, \
             v.visit_duration AS visit_duration \
             FROM urls u JOIN visits v ON u.id = v.url \
             WHERE ({}) ORDER BY v.visit_time DESC",
            like_filter("u.url")
        ),
        BrowserFlavor::Safari => format!(
            "SELECT hi.url AS url, hv.title AS title, hv.visit_time AS visit_time \
             FROM history_items hi JOIN history_visits hv ON hi.id = hv.history_item \
             WHERE ({}) ORDER BY hv.visit_time DESC",
            like_filter("hi.url")
        ),
    }
}

fn browser_history(input: &FileInput<'_>, flavor: BrowserFlavor) -> Result<Vec<Artifact>> {
    if let Err(e) = File::open(input.path) {
        if flavor == BrowserFlavor::Safari && PermissionTracker::is_permission_io_error(&e) {
            // Safari history sits behind macOS privacy protection
            let mut note = input.ctx.artifact(input.source_tool, "access_note");
            note.file_path = Some(input.path.to_string_lossy().into_owned());
            note.content_preview = Some(
                "Safari history not readable: grant Full Disk Access to collect it".to_string(),
            );
            note.metadata = Some(json!({ "error": "TCC_denied", "requires": "Full Disk Access" }));
            return Ok(vec![note]);
        }
        return Err(e).with_context(|| format!("Failed to open {}", input.path.display()));
    }

    let rows = read_only_query(
        input.path,
        &browser_history_sql(flavor),
        params_from_iter(AI_URL_PATTERNS.iter()),
    );
    let template = input.template();

    Ok(rows
        .iter()
        .map(|row| {
            let url = column_text(row, "url").unwrap_or_default();
            let title = column_text(row, "title").unwrap_or_default();
            let mut artifact = template.sibling();
            artifact.timestamp = row.get("visit_time").and_then(normalize_json_timestamp);
            let label = if title.is_empty() {
                url.clone()
            } else {
                format!("{} - {}", title, url)
            };
            artifact.content_preview = Some(input.ctx.policy.preview(&label));
            artifact.metadata = Some(json!({
                "url": url,
                "title": title,
                "visit_duration_us": row.get("visit_duration").cloned().unwrap_or(Value::Null),
                "browser": format!("{:?}", flavor).to_lowercase(),
            }));
            artifact
        })
        .collect())
}

fn leveldb_carve(input: &FileInput<'_>) -> Result<Vec<Artifact>> {
    let carved = Carver::from_policy(&input.ctx.policy).carve_directory(input.path);

    let mut summary = input.template();
    let segments: BTreeSet<&str> = carved.iter().map(|c| c.source_file.as_str()).collect();
    let mut conversation_ids: BTreeSet<String> = BTreeSet::new();
    for carved_string in &carved {
        for found in UUID.find_iter(&carved_string.content) {
            if conversation_ids.len() >= MAX_CONVERSATION_IDS {
                break;
            }
            conversation_ids.insert(found.as_str().to_lowercase());
        }
    }
    let samples: Vec<String> = carved
        .iter()
        .take(MAX_CARVED_SAMPLES)
        .map(|c| content_preview(&c.content, SAMPLE_PREVIEW_CHARS))
        .collect();

    summary.model_identified = carved.iter().find_map(|c| identify_model(&c.content));
    summary.content_preview = Some(format!(
        "{} strings carved from {} segments",
        carved.len(),
        segments.len()
    ));
    summary.metadata = Some(json!({
        "segments": segments.len(),
        "carved_strings": carved.len(),
        "conversation_ids": conversation_ids,
        "samples": samples,
    }));

    let mut artifacts = vec![summary.clone()];
    for carved_string in &carved {
        let Some(value) = &carved_string.json else { continue };
        let messages = RawRecord::classify(value).into_messages();
        let mut template = summary.sibling();
        template.artifact_type = "carved_message".to_string();
        template.file_path = Some(carved_string.source_file.clone());
        template.model_identified = None;
        let extra = json!({ "offset": carved_string.offset });
        artifacts.extend(message_artifacts(input, &template, messages, extra));
    }
    Ok(artifacts)
}

fn metadata_only(input: &FileInput<'_>) -> Result<Vec<Artifact>> {
    let mut artifact = input.template();
    let name = input
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    artifact.content_preview = Some(match artifact.file_size_bytes {
        Some(size) => format!("{} ({} bytes)", name, size),
        None => name,
    });
    artifact.metadata = Some(json!({ "content_read": false }));
    Ok(vec![artifact])
}

fn keyword_log(input: &FileInput<'_>, keywords: &[String]) -> Result<Vec<Artifact>> {
    let text = read_text(input)?;
    let lowered_keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut samples = Vec::new();
    let mut matching_lines = 0usize;
    for line in text.lines() {
        let lowered = line.to_lowercase();
        let mut hit = false;
        for keyword in &lowered_keywords {
            let occurrences = lowered.matches(keyword.as_str()).count();
            if occurrences > 0 {
                *counts.entry(keyword.as_str()).or_default() += occurrences;
                hit = true;
            }
        }
        if hit {
            matching_lines += 1;
            if samples.len() < MAX_LOG_SAMPLES {
                samples.push(content_preview(line.trim(), SAMPLE_PREVIEW_CHARS));
            }
        }
    }

    if counts.is_empty() {
        return Ok(Vec::new());
    }

    let matched: Vec<&str> = counts.keys().copied().collect();
    let mut artifact = input.template();
    artifact.content_preview = Some(
        input
            .ctx
            .policy
            .preview(&format!("Log contains AI keywords: {}", matched.join(", "))),
    );
    artifact.model_identified = samples.iter().find_map(|s| identify_model(s));
    artifact.metadata = Some(json!({
        "matched_keywords": matched,
        "match_count": counts.values().sum::<usize>(),
        "matching_lines": matching_lines,
        "samples": samples,
    }));
    Ok(vec![artifact])
}
