//! # ai_trace_collector
//!
//! A forensic collector for the traces AI assistants leave on a workstation:
//! prompt histories, conversation logs, editor chat databases, desktop-app
//! caches, browser visits to AI services and installed applications.
//!
//! ## Overview
//!
//! Evidence is read without modifying it. Every file is opened read-only and
//! size-bounded, SQLite databases are opened immutable, and credential stores
//! are never read. What the collectors find is normalized into a single
//! [`models::Artifact`] record (UTC timestamps, model family, token estimate,
//! SHA-256 of the source file), redacted, and persisted to a local SQLite
//! store together with a ledger of collection runs.
//!
//! ## Usage
//!
//! ```no_run
//! use ai_trace_collector::collectors::{run_collection, tool_collectors, Collector, CollectorContext};
//! use ai_trace_collector::config::load_or_create_config;
//! use ai_trace_collector::store::ArtifactStore;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = load_or_create_config(None)?;
//! let ctx = CollectorContext::new(config.resolve_home()?, config.security.clone());
//! let collectors: Vec<Box<dyn Collector>> = tool_collectors(config.enabled_tools(), &ctx)
//!     .into_iter()
//!     .map(|c| Box::new(c) as Box<dyn Collector>)
//!     .collect();
//!
//! let store = ArtifactStore::open(&config.resolve_db_path()?)?;
//! let run = run_collection(&collectors, &store, &ctx)?;
//! println!("Collected {} artifacts", run.total_artifacts);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: The artifact and collection-run records
//! - [`collectors`]: Collector contract, traversal engine and extractors
//! - [`config`]: Configuration and the built-in tool table
//! - [`safeio`]: Bounded reads, digests, read-only SQLite and string carving
//! - [`normalizer`]: Timestamps, redaction and content heuristics
//! - [`store`]: The SQLite artifact store
//! - [`analysis`]: Timeline gaps and per-day grouping
//! - [`security`]: Read policy, identifier and path validation
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models
pub mod models;

/// Artifact collectors
pub mod collectors;

/// Configuration management and tool definitions
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Bounded-risk I/O on evidence files
pub mod safeio;

/// Timestamp, redaction and content normalization
pub mod normalizer;

/// SQLite artifact store
pub mod store;

/// Timeline analysis over stored artifacts
pub mod analysis;

/// Security utilities for path validation and credential protection
pub mod security;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
