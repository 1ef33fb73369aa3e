//! Bounded file reads.
//!
//! Nothing here truncates silently: a file either fits within the bound and
//! is returned whole, or the caller gets a marker saying why it was not read.

use log::debug;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::constants::MAX_FILE_READ_BYTES;
use crate::normalizer::normalize_timestamp;

/// Result of a bounded read.
#[derive(Debug, Clone, PartialEq)]
pub enum Bounded<T> {
    /// The whole content
    Content(T),
    /// The file exceeds the bound and was not read
    TooLarge { size: u64, limit: u64 },
    /// The file could not be opened or read
    Unreadable(String),
}

impl<T> Bounded<T> {
    pub fn into_content(self) -> Option<T> {
        match self {
            Bounded::Content(content) => Some(content),
            _ => None,
        }
    }

    pub fn is_too_large(&self) -> bool {
        matches!(self, Bounded::TooLarge { .. })
    }
}

/// Read at most `max_bytes` bytes of `path`.
///
/// The size is checked from metadata first and again while reading, so a
/// file that grows between the two is still reported as too large.
pub fn bounded_read_bytes(path: &Path, max_bytes: u64) -> Bounded<Vec<u8>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => return Bounded::Unreadable(e.to_string()),
    };
    if !metadata.is_file() {
        return Bounded::Unreadable("not a regular file".to_string());
    }
    if metadata.len() > max_bytes {
        return Bounded::TooLarge {
            size: metadata.len(),
            limit: max_bytes,
        };
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return Bounded::Unreadable(e.to_string()),
    };

    let mut buffer = Vec::with_capacity(metadata.len() as usize);
    if let Err(e) = file.take(max_bytes.saturating_add(1)).read_to_end(&mut buffer) {
        return Bounded::Unreadable(e.to_string());
    }
    if buffer.len() as u64 > max_bytes {
        return Bounded::TooLarge {
            size: buffer.len() as u64,
            limit: max_bytes,
        };
    }
    Bounded::Content(buffer)
}

/// Read `path` as text within `max_bytes`. Invalid UTF-8 is replaced.
pub fn bounded_read(path: &Path, max_bytes: u64) -> Bounded<String> {
    match bounded_read_bytes(path, max_bytes) {
        Bounded::Content(bytes) => Bounded::Content(String::from_utf8_lossy(&bytes).into_owned()),
        Bounded::TooLarge { size, limit } => Bounded::TooLarge { size, limit },
        Bounded::Unreadable(reason) => Bounded::Unreadable(reason),
    }
}

/// Content of a configuration-like file.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredContent {
    /// Parsed document
    Json(Value),
    /// The text did not parse; returned as-is
    Text(String),
    /// The file was not read
    Unavailable(String),
}

/// Parse a file as JSON (or YAML for `.yaml`/`.yml`), falling back to raw
/// text when parsing fails.
pub fn read_structured(path: &Path) -> StructuredContent {
    read_structured_bounded(path, MAX_FILE_READ_BYTES)
}

pub fn read_structured_bounded(path: &Path, max_bytes: u64) -> StructuredContent {
    let text = match bounded_read(path, max_bytes) {
        Bounded::Content(text) => text,
        Bounded::TooLarge { size, limit } => {
            return StructuredContent::Unavailable(format!("file too large: {} > {} bytes", size, limit))
        }
        Bounded::Unreadable(reason) => return StructuredContent::Unavailable(reason),
    };

    let is_yaml = path
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "yaml" || ext == "yml"
        })
        .unwrap_or(false);

    let parsed = if is_yaml {
        serde_yaml::from_str::<Value>(&text).ok()
    } else {
        serde_json::from_str::<Value>(&text).ok()
    };

    match parsed {
        Some(value) => StructuredContent::Json(value),
        None => StructuredContent::Text(text),
    }
}

/// Parse every well-formed JSON line of a JSONL file.
///
/// Malformed and blank lines are skipped. Files over the bound yield nothing.
pub fn read_jsonl(path: &Path, max_bytes: u64) -> Vec<Value> {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            debug!("Skipping {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    if size > max_bytes {
        debug!("Skipping {}: {} bytes exceeds bound", path.display(), size);
        return Vec::new();
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Skipping {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut values = Vec::new();
    let reader = BufReader::new(file.take(max_bytes));
    for line in reader.split(b'\n') {
        let Ok(line) = line else { break };
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            values.push(value);
        }
    }
    values
}

/// Size and normalized timestamps of a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileFacts {
    pub size: u64,
    pub modified: Option<String>,
    pub created: Option<String>,
}

/// Collect size and timestamps without reading content.
pub fn file_facts(path: &Path) -> Option<FileFacts> {
    let metadata = fs::metadata(path).ok()?;
    Some(FileFacts {
        size: metadata.len(),
        modified: metadata.modified().ok().and_then(normalize_timestamp),
        created: metadata.created().ok().and_then(normalize_timestamp),
    })
}
