//! Bounded-risk I/O on untrusted evidence.
//!
//! Every function in this module treats its input as hostile: reads are
//! size-bounded, databases are opened immutable, and problems with a single
//! file surface as markers or absent values instead of errors.
//!
//! ## Components
//!
//! - **read**: bounded text/byte reads, structured parse with text fallback, JSONL
//! - **hash**: chunked SHA-256 digests under a size bound
//! - **sqlite**: read-only immutable queries and per-table row counts
//! - **carve**: printable-string carving from binary segments

pub mod carve;
pub mod hash;
pub mod read;
pub mod sqlite;

pub use carve::{carve_bytes, carve_directory, carve_strings, CarvedString, Carver};
pub use hash::{calculate_sha256, digest, digest_bytes};
pub use read::{
    bounded_read, bounded_read_bytes, file_facts, read_jsonl, read_structured,
    read_structured_bounded, Bounded, FileFacts, StructuredContent,
};
pub use sqlite::{open_read_only, read_only_query, table_names, table_row_counts, try_query, Row};
