//! Persisted schema and row mapping.

use rusqlite::Row;
use serde_json::Value;

use crate::models::{Artifact, CollectionRun};

/// Schema objects, all idempotent.
pub const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS artifacts (
        id TEXT PRIMARY KEY,
        source_tool TEXT NOT NULL,
        artifact_type TEXT NOT NULL,
        timestamp TEXT,
        file_path TEXT,
        file_hash_sha256 TEXT,
        file_size_bytes INTEGER,
        file_modified TEXT,
        file_created TEXT,
        user TEXT,
        hostname TEXT,
        content_preview TEXT,
        raw_data TEXT,
        model_identified TEXT,
        conversation_id TEXT,
        message_role TEXT,
        token_estimate INTEGER,
        metadata TEXT,
        collection_timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_source_tool ON artifacts(source_tool);
    CREATE INDEX IF NOT EXISTS idx_timestamp ON artifacts(timestamp);
    CREATE INDEX IF NOT EXISTS idx_artifact_type ON artifacts(artifact_type);
    CREATE INDEX IF NOT EXISTS idx_conversation_id ON artifacts(conversation_id);

    CREATE TABLE IF NOT EXISTS collection_runs (
        id TEXT PRIMARY KEY,
        start_time TEXT NOT NULL,
        end_time TEXT,
        collectors_run TEXT,
        total_artifacts INTEGER DEFAULT 0,
        errors TEXT,
        hostname TEXT,
        username TEXT
    );
";

/// Column order shared by every artifact INSERT and SELECT.
pub const ARTIFACT_COLUMNS: [&str; 19] = [
    "id",
    "source_tool",
    "artifact_type",
    "timestamp",
    "file_path",
    "file_hash_sha256",
    "file_size_bytes",
    "file_modified",
    "file_created",
    "user",
    "hostname",
    "content_preview",
    "raw_data",
    "model_identified",
    "conversation_id",
    "message_role",
    "token_estimate",
    "metadata",
    "collection_timestamp",
];

pub const RUN_COLUMNS: [&str; 8] = [
    "id",
    "start_time",
    "end_time",
    "collectors_run",
    "total_artifacts",
    "errors",
    "hostname",
    "username",
];

pub fn artifact_select() -> String {
    format!("SELECT {} FROM artifacts", ARTIFACT_COLUMNS.join(", "))
}

pub fn artifact_insert() -> String {
    let placeholders: Vec<String> = (1..=ARTIFACT_COLUMNS.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT OR REPLACE INTO artifacts ({}) VALUES ({})",
        ARTIFACT_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

pub fn run_select() -> String {
    format!("SELECT {} FROM collection_runs", RUN_COLUMNS.join(", "))
}

/// Metadata is stored as JSON text.
pub fn metadata_to_text(metadata: &Option<Value>) -> Option<String> {
    metadata.as_ref().map(|value| value.to_string())
}

fn metadata_from_text(text: Option<String>) -> Option<Value> {
    text.map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

fn list_from_text(text: Option<String>) -> Vec<String> {
    text.and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

pub fn list_to_text(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

/// Map a row selected with [`artifact_select`].
pub fn artifact_from_row(row: &Row<'_>) -> rusqlite::Result<Artifact> {
    Ok(Artifact {
        id: row.get(0)?,
        source_tool: row.get(1)?,
        artifact_type: row.get(2)?,
        timestamp: row.get(3)?,
        file_path: row.get(4)?,
        file_hash_sha256: row.get(5)?,
        file_size_bytes: row.get(6)?,
        file_modified: row.get(7)?,
        file_created: row.get(8)?,
        user: row.get(9)?,
        hostname: row.get(10)?,
        content_preview: row.get(11)?,
        raw_data: row.get(12)?,
        model_identified: row.get(13)?,
        conversation_id: row.get(14)?,
        message_role: row.get(15)?,
        token_estimate: row.get(16)?,
        metadata: metadata_from_text(row.get(17)?),
        collection_timestamp: row.get(18)?,
    })
}

/// Map a row selected with [`run_select`].
pub fn run_from_row(row: &Row<'_>) -> rusqlite::Result<CollectionRun> {
    Ok(CollectionRun {
        id: row.get(0)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        collectors_run: list_from_text(row.get(3)?),
        total_artifacts: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        errors: list_from_text(row.get(5)?),
        hostname: row.get(6)?,
        username: row.get(7)?,
    })
}
