//! Heuristic string carving from opaque binary blobs.
//!
//! Log-structured stores (LevelDB segments in particular) are not parsed.
//! Their bytes are scanned for runs of printable ASCII instead, which also
//! works on truncated or compacted segments since no record boundary is
//! assumed.

use log::debug;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::constants::CARVE_SEGMENT_EXTENSIONS;
use crate::normalizer::contains_credentials;
use crate::safeio::read::{bounded_read_bytes, Bounded};
use crate::security::SecurityPolicy;

/// A printable run recovered from a binary file.
#[derive(Debug, Clone, PartialEq)]
pub struct CarvedString {
    pub source_file: String,
    /// Byte offset of the run within the file
    pub offset: usize,
    pub content: String,
    /// The run parsed as JSON, when it happens to be a complete document
    pub json: Option<Value>,
}

/// Find every run of printable ASCII (0x20..=0x7e) of at least `min_length`
/// bytes. Returns `(offset, text)` pairs in file order.
pub fn carve_bytes(data: &[u8], min_length: usize) -> Vec<(usize, String)> {
    let min_length = min_length.max(1);
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (index, byte) in data.iter().enumerate() {
        let printable = (0x20..=0x7e).contains(byte);
        match (printable, start) {
            (true, None) => start = Some(index),
            (false, Some(begin)) => {
                if index - begin >= min_length {
                    runs.push((begin, String::from_utf8_lossy(&data[begin..index]).into_owned()));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        if data.len() - begin >= min_length {
            runs.push((begin, String::from_utf8_lossy(&data[begin..]).into_owned()));
        }
    }
    runs
}

/// String carver configured from the security policy.
#[derive(Debug, Clone)]
pub struct Carver {
    policy: SecurityPolicy,
    min_length: usize,
}

impl Default for Carver {
    fn default() -> Self {
        Self::from_policy(&SecurityPolicy::default())
    }
}

impl Carver {
    pub fn from_policy(policy: &SecurityPolicy) -> Self {
        Self {
            policy: policy.clone(),
            min_length: policy.carve_min_length,
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    fn keep(&self, run: &str) -> bool {
        !self.policy.has_carve_keyword(run) && !contains_credentials(run)
    }

    /// Carve one file, dropping runs that look sensitive.
    pub fn carve_file(&self, path: &Path) -> Vec<CarvedString> {
        let data = match bounded_read_bytes(path, self.policy.max_file_bytes) {
            Bounded::Content(data) => data,
            Bounded::TooLarge { size, limit } => {
                debug!("Not carving {}: {} bytes exceeds {}", path.display(), size, limit);
                return Vec::new();
            }
            Bounded::Unreadable(reason) => {
                debug!("Not carving {}: {}", path.display(), reason);
                return Vec::new();
            }
        };

        let source_file = path.to_string_lossy().into_owned();
        carve_bytes(&data, self.min_length)
            .into_iter()
            .filter(|(_, content)| self.keep(content))
            .map(|(offset, content)| {
                let json = parse_json_run(&content);
                CarvedString {
                    source_file: source_file.clone(),
                    offset,
                    content,
                    json,
                }
            })
            .collect()
    }

    /// Carve every `.log` / `.ldb` segment directly inside `dir`.
    ///
    /// Symlinked and oversized segments are skipped.
    pub fn carve_directory(&self, dir: &Path) -> Vec<CarvedString> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut segments: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_type()
                    .map(|ft| ft.is_file() && !ft.is_symlink())
                    .unwrap_or(false)
            })
            .map(|entry| entry.path())
            .filter(|path| is_segment(path))
            .collect();
        segments.sort();

        segments
            .iter()
            .flat_map(|segment| self.carve_file(segment))
            .collect()
    }
}

fn is_segment(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            CARVE_SEGMENT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn parse_json_run(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Carve `path` with the default policy and the given minimum run length.
pub fn carve_strings(path: &Path, min_length: usize) -> Vec<CarvedString> {
    Carver::default().with_min_length(min_length).carve_file(path)
}

/// Carve every segment of a log-structured store directory with defaults.
pub fn carve_directory(dir: &Path) -> Vec<CarvedString> {
    Carver::default().carve_directory(dir)
}
