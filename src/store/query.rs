//! Query parameters and aggregate results.

use serde::Serialize;

use crate::constants::{DEFAULT_QUERY_LIMIT, DEFAULT_TIMELINE_LIMIT, MAX_QUERY_LIMIT};

/// Filters for [`ArtifactStore::query`](super::ArtifactStore::query).
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactQuery {
    pub source_tool: Option<String>,
    pub artifact_type: Option<String>,
    pub conversation_id: Option<String>,
    pub model_identified: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ArtifactQuery {
    fn default() -> Self {
        Self {
            source_tool: None,
            artifact_type: None,
            conversation_id: None,
            model_identified: None,
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
        }
    }
}

impl ArtifactQuery {
    pub fn source_tool(mut self, source_tool: impl Into<String>) -> Self {
        self.source_tool = Some(source_tool.into());
        self
    }

    pub fn artifact_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = Some(artifact_type.into());
        self
    }

    pub fn conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model_identified = Some(model.into());
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// Bounds for [`ArtifactStore::timeline`](super::ArtifactStore::timeline).
///
/// `start` and `end` accept anything the timestamp normalizer accepts and
/// are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub source_tool: Option<String>,
    pub limit: usize,
}

impl Default for TimelineQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            source_tool: None,
            limit: DEFAULT_TIMELINE_LIMIT,
        }
    }
}

/// Aggregate view of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_artifacts: i64,
    pub by_source: Vec<(String, i64)>,
    pub by_type: Vec<(String, i64)>,
    pub by_model: Vec<(String, i64)>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub total_token_estimate: i64,
    pub collection_runs: i64,
}

/// Clamp a caller-supplied limit into `1..=MAX_QUERY_LIMIT`.
pub fn clamp_limit(limit: usize) -> i64 {
    limit.clamp(1, MAX_QUERY_LIMIT) as i64
}

/// Escape `\`, `%` and `_` so `needle` matches literally inside a LIKE
/// pattern using `ESCAPE '\'`.
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
