use serde::{Deserialize, Serialize};
use std::fmt;

/// One AI tool: where it keeps its data and how each file is read.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Candidate roots; `~`, home-relative paths and environment variables
    /// are expanded. Missing roots are ignored.
    pub roots: Vec<String>,
    pub rules: Vec<PathRule>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Maps root-relative paths to an artifact type and extractor.
///
/// `pattern` is a regular expression matched against the path relative to
/// the root with `/` separators. The first matching rule wins.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PathRule {
    pub pattern: String,
    #[serde(default)]
    pub exclude: Option<String>,
    pub artifact_type: String,
    pub extractor: ExtractorKind,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// How a matched file (or directory) is turned into artifacts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorKind {
    /// One artifact per chat message in a JSON Lines file
    JsonlMessages,
    /// A JSON/YAML document: conversations are expanded, anything else is
    /// stored as a single configuration artifact
    JsonDocument,
    /// Plain text or markdown transcript stored as one artifact
    TextFile,
    /// Rows of a parameterless query mapped onto artifact fields
    SqliteQuery(SqliteMapping),
    /// One artifact listing the row count of every table
    SqliteSummary,
    /// AI-service visits from a browser history database
    BrowserHistory { flavor: BrowserFlavor },
    /// Printable strings carved from a log-structured store directory
    LeveldbCarve,
    /// Hash, size and timestamps only; content is never read
    MetadataOnly,
    /// Lines of a log file mentioning any of the keywords
    KeywordLog { keywords: Vec<String> },
}

impl ExtractorKind {
    /// Whether the rule matches directories instead of files.
    pub fn matches_directories(&self) -> bool {
        matches!(self, ExtractorKind::LeveldbCarve)
    }

    /// Whether the extractor reads file content, and is therefore subject
    /// to the size bound.
    pub fn reads_content(&self) -> bool {
        !matches!(self, ExtractorKind::MetadataOnly)
    }
}

/// Column mapping for [`ExtractorKind::SqliteQuery`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SqliteMapping {
    pub query: String,
    #[serde(default)]
    pub timestamp_column: Option<String>,
    /// Concatenated (newline separated) to form the content
    #[serde(default)]
    pub content_columns: Vec<String>,
    #[serde(default)]
    pub conversation_column: Option<String>,
    #[serde(default)]
    pub role_column: Option<String>,
    #[serde(default)]
    pub model_column: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrowserFlavor {
    /// `urls` / `visits` tables, WebKit microsecond timestamps
    Chromium,
    /// `history_items` / `history_visits`, Cocoa second timestamps
    Safari,
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorKind::JsonlMessages => write!(f, "jsonl_messages"),
            ExtractorKind::JsonDocument => write!(f, "json_document"),
            ExtractorKind::TextFile => write!(f, "text_file"),
            ExtractorKind::SqliteQuery(_) => write!(f, "sqlite_query"),
            ExtractorKind::SqliteSummary => write!(f, "sqlite_summary"),
            ExtractorKind::BrowserHistory { .. } => write!(f, "browser_history"),
            ExtractorKind::LeveldbCarve => write!(f, "leveldb_carve"),
            ExtractorKind::MetadataOnly => write!(f, "metadata_only"),
            ExtractorKind::KeywordLog { .. } => write!(f, "keyword_log"),
        }
    }
}
