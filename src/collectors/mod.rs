//! Artifact collection implementations.
//!
//! Every source of evidence is a [`Collector`]. Assistants described in the
//! tool table are served by the generic [`ToolCollector`]; the installed
//! application inventory has its own collector.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        run_collection (runner)          │
//! ├─────────────────────────────────────────┤
//! │              Collectors                 │
//! │  ┌──────────────────┬────────────────┐  │
//! │  │  ToolCollector   │   Inventory    │  │
//! │  │ (one per tool)   │                │  │
//! │  └──────────────────┴────────────────┘  │
//! ├─────────────────────────────────────────┤
//! │     Extractors  +  Record classifier    │
//! ├─────────────────────────────────────────┤
//! │    SafeIO  /  Normalizer  /  Security   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use ai_trace_collector::collectors::{run_collection, tool_collectors, Collector, CollectorContext};
//! use ai_trace_collector::config::builtin_tools;
//! use ai_trace_collector::security::SecurityPolicy;
//! use ai_trace_collector::store::ArtifactStore;
//! use std::path::PathBuf;
//!
//! # fn example() -> anyhow::Result<()> {
//! let ctx = CollectorContext::new(PathBuf::from("/home/analyst"), SecurityPolicy::default());
//! let tools = builtin_tools();
//! let collectors: Vec<Box<dyn Collector>> = tool_collectors(&tools, &ctx)
//!     .into_iter()
//!     .map(|c| Box::new(c) as Box<dyn Collector>)
//!     .collect();
//!
//! let store = ArtifactStore::open_in_memory()?;
//! let run = run_collection(&collectors, &store, &ctx)?;
//! println!("Collected {} artifacts", run.total_artifacts);
//! # Ok(())
//! # }
//! ```

/// Collector trait, shared context and the run loop
pub mod collector;

/// Table-driven traversal of a tool's roots
pub mod engine;

/// Per-file extractors selected by path rules
pub mod extractors;

/// Installed-application inventory
pub mod inventory;

/// Permission error tracking and reporting
pub mod permission_tracker;

/// Classification of heterogeneous JSON records
pub mod records;

pub use collector::{detect_collectors, run_collection, Collector, CollectorContext};
pub use engine::{tool_collectors, ToolCollector};
pub use inventory::{InstalledApp, InventoryCollector};
pub use permission_tracker::PermissionTracker;
pub use records::{ChatMessage, RawRecord};
