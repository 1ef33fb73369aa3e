use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::constants::HASH_CHUNK_SIZE;

/// Calculate SHA-256 hash of a file
///
/// Returns None if:
/// - The file is larger than max_bytes
/// - The path is not a regular file
///
/// The file is streamed in fixed 64 KiB chunks; bytes read are counted so a
/// file that grows past the bound mid-read is also rejected.
pub fn calculate_sha256(path: &Path, max_bytes: u64) -> io::Result<Option<String>> {
    let metadata = std::fs::metadata(path)?;

    if metadata.len() > max_bytes {
        return Ok(None);
    }

    if !metadata.is_file() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(HASH_CHUNK_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        total += bytes_read as u64;
        if total > max_bytes {
            return Ok(None);
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Some(format!("{:x}", hasher.finalize())))
}

/// SHA-256 hex digest of `path`, absent when over the bound or unreadable.
pub fn digest(path: &Path, max_bytes: u64) -> Option<String> {
    match calculate_sha256(path, max_bytes) {
        Ok(hash) => hash,
        Err(e) => {
            log::debug!("Cannot hash {}: {}", path.display(), e);
            None
        }
    }
}

/// SHA-256 hex digest of an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_digest_known_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(digest(&path, 1024).as_deref(), Some(ABC_SHA256));
        assert_eq!(digest_bytes(b"abc"), ABC_SHA256);
    }

    #[test]
    fn test_digest_bound_is_inclusive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(digest(&path, 3).as_deref(), Some(ABC_SHA256));
        assert_eq!(digest(&path, 2), None);
    }

    #[test]
    fn test_digest_spans_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big");
        let data = vec![7u8; HASH_CHUNK_SIZE * 3 + 17];
        std::fs::write(&path, &data).unwrap();

        assert_eq!(digest(&path, data.len() as u64), Some(digest_bytes(&data)));
    }

    #[test]
    fn test_digest_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(digest(&temp_dir.path().join("missing"), 10), None);
        assert_eq!(digest(temp_dir.path(), u64::MAX), None);
        assert!(calculate_sha256(&temp_dir.path().join("missing"), 10).is_err());
    }
}
