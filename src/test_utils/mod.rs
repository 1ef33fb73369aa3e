//! Test utilities for ai_trace_collector
//!
//! Helpers for building synthetic home directories, evidence files and
//! artifacts shared by the unit tests.

#![cfg(test)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

use crate::collectors::CollectorContext;
use crate::models::Artifact;
use crate::security::SecurityPolicy;

/// Creates a temporary directory that is automatically cleaned up
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a temporary file with the given content
pub fn create_temp_file(content: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    use std::io::Write;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

/// Write `content` at `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &[u8]) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}

/// Context rooted at `home` with fixed user and host names.
pub fn test_context(home: &Path) -> CollectorContext {
    CollectorContext {
        home: home.to_path_buf(),
        user: Some("analyst".to_string()),
        hostname: Some("workstation".to_string()),
        policy: SecurityPolicy::default(),
    }
}

/// Artifact from `source` with an optional normalized timestamp.
pub fn artifact_at(source: &str, timestamp: Option<&str>) -> Artifact {
    let mut artifact = Artifact::new(source, "conversation_message");
    artifact.timestamp = timestamp.map(str::to_string);
    artifact
}

/// Synthetic home directories populated with assistant data
pub mod generators {
    use super::write_file;
    use anyhow::Result;
    use tempfile::TempDir;

    pub const CLAUDE_SESSION: &str = concat!(
        "{\"type\":\"user\",\"sessionId\":\"s-1\",\"timestamp\":\"2024-03-01T09:00:00Z\",",
        "\"message\":{\"role\":\"user\",\"content\":\"refactor the parser\"}}\n",
        "{\"type\":\"assistant\",\"sessionId\":\"s-1\",\"timestamp\":\"2024-03-01T09:00:05Z\",",
        "\"message\":{\"role\":\"assistant\",\"model\":\"claude-3-5-sonnet-20241022\",",
        "\"content\":[{\"type\":\"text\",\"text\":\"Done.\"}]}}\n",
    );

    pub const CODEX_HISTORY: &str = concat!(
        "{\"session_id\":\"c-1\",\"ts\":1709283600,\"text\":\"add a test\"}\n",
        "not json\n",
        "{\"session_id\":\"c-1\",\"ts\":1709301600,\"text\":\"export OPENAI_API_KEY=sk-abcdefghijklmnopqrstuvwxyz012345\"}\n",
    );

    /// Home with Claude Code and Codex data.
    pub fn synthetic_home() -> Result<TempDir> {
        let home = TempDir::new()?;
        write_file(home.path(), ".claude/projects/demo/s-1.jsonl", CLAUDE_SESSION.as_bytes())?;
        write_file(home.path(), ".claude/settings.json", br#"{"model":"opus","env":{"API_TOKEN":"abc"}}"#)?;
        write_file(home.path(), ".claude/.credentials.json", br#"{"token":"secret"}"#)?;
        write_file(home.path(), ".codex/history.jsonl", CODEX_HISTORY.as_bytes())?;
        Ok(home)
    }
}

/// Assertion helpers for custom types
pub mod assertions {
    use crate::models::Artifact;

    /// Assert that an artifact carries the chain-of-custody fields of a file
    pub fn assert_custody(artifact: &Artifact, size: i64) {
        assert_eq!(artifact.file_size_bytes, Some(size), "Artifact size mismatch");
        assert!(artifact.file_path.is_some(), "Artifact path missing");
        assert!(artifact.file_modified.is_some(), "Artifact mtime missing");
        assert_eq!(
            artifact.file_hash_sha256.as_ref().map(String::len),
            Some(64),
            "Artifact digest missing"
        );
    }

    /// Assert that no free-text field of `artifact` contains `secret`
    pub fn assert_no_secret(artifact: &Artifact, secret: &str) {
        let fields = [
            &artifact.content_preview,
            &artifact.raw_data,
            &artifact.file_path,
            &artifact.conversation_id,
        ];
        for field in fields.into_iter().flatten() {
            assert!(!field.contains(secret), "Secret leaked in {:?}", field);
        }
        if let Some(metadata) = &artifact.metadata {
            assert!(!metadata.to_string().contains(secret), "Secret leaked in metadata");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{tool_collectors, Collector};
    use crate::config::builtin_tools;

    #[test]
    fn test_synthetic_home_is_collected() {
        let home = generators::synthetic_home().unwrap();
        let ctx = test_context(home.path());
        let tools = builtin_tools();
        let collectors = tool_collectors(&tools, &ctx);

        let claude = collectors
            .iter()
            .find(|c| c.name() == "claude_code")
            .unwrap();
        assert!(claude.detect());
        let artifacts = claude.collect().unwrap();
        let messages: Vec<_> = artifacts
            .iter()
            .filter(|a| a.artifact_type == "conversation_message")
            .collect();
        assert_eq!(messages.len(), 2);
        assertions::assert_custody(messages[0], generators::CLAUDE_SESSION.len() as i64);
        assert!(artifacts
            .iter()
            .all(|a| !a.file_path.as_deref().unwrap_or("").ends_with(".credentials.json")));
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = create_temp_dir().unwrap();
        let path = write_file(dir.path(), "a/b/c.txt", b"x").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"x");

        let file = create_temp_file(b"abc").unwrap();
        assert_eq!(fs::read(file.path()).unwrap(), b"abc");
    }
}
