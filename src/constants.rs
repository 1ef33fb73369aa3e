//! Global constants for the trace collector.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Size bounds
/// Default per-file size bound applied before any hash or content read (50MB)
pub const MAX_FILE_READ_BYTES: u64 = 50 * 1024 * 1024;

/// Chunk size for streamed hashing (64KB)
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Maximum characters kept in a content preview
pub const CONTENT_PREVIEW_MAX: usize = 500;

/// raw_data is only stored below this many characters
pub const RAW_DATA_MAX_CHARS: usize = 50_000;

/// Minimum printable run length for string carving
pub const CARVE_MIN_LENGTH: usize = 20;

/// Segment extensions of log-structured stores that are carved
pub const CARVE_SEGMENT_EXTENSIONS: &[&str] = &["log", "ldb"];

/// Cap on conversation ids recorded in a single summary artifact
pub const MAX_CONVERSATION_IDS: usize = 50;

/// Cap on carved samples recorded in a single summary artifact
pub const MAX_CARVED_SAMPLES: usize = 20;

// Redaction
/// The single literal substituted for every detected secret
pub const REDACTION_PLACEHOLDER: &str = "[REDACTED]";

// Epoch schemes
/// Seconds between 1601-01-01 and 1970-01-01 (Chrome/WebKit epoch)
pub const CHROME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Seconds between 1970-01-01 and 2001-01-01 (Cocoa epoch)
pub const COCOA_EPOCH_OFFSET_SECS: i64 = 978_307_200;

// Store query defaults
pub const DEFAULT_QUERY_LIMIT: usize = 1000;
pub const DEFAULT_SEARCH_LIMIT: usize = 100;
pub const DEFAULT_TIMELINE_LIMIT: usize = 5000;
pub const DEFAULT_RUNS_LIMIT: usize = 20;

/// Hard cap on any caller-supplied limit
pub const MAX_QUERY_LIMIT: usize = 100_000;

// Timeline analysis
/// Default minimum gap reported by gap detection
pub const DEFAULT_GAP_HOURS: f64 = 4.0;

// System inventory
/// Hard timeout for the external inventory process
pub const INVENTORY_TIMEOUT_SECS: u64 = 30;

// Default locations
pub const DEFAULT_DB_DIR_NAME: &str = ".ai-forensics";
pub const DEFAULT_DB_FILE_NAME: &str = "traces.db";
pub const DEFAULT_CONFIG_NAME: &str = "ai-trace.yaml";

/// Files whose content is never extracted
pub const CREDENTIAL_FILE_NAMES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".env.development",
    "credentials.json",
    "auth.json",
    "hosts.yml",
    ".netrc",
    ".npmrc",
    ".pypirc",
    "token",
    "token.json",
];

/// Substrings that cause a carved string to be discarded
pub const CARVE_SENSITIVE_KEYWORDS: &[&str] = &[
    "token",
    "auth",
    "cookie",
    "session",
    "password",
    "secret",
    "credential",
    "oauth",
];

/// URL patterns (SQL LIKE syntax) of AI services looked up in browser history
pub const AI_URL_PATTERNS: &[&str] = &[
    "%chat.openai.com%",
    "%chatgpt.com%",
    "%claude.ai%",
    "%anthropic.com%",
    "%bard.google.com%",
    "%gemini.google.com%",
    "%perplexity.ai%",
    "%copilot.microsoft.com%",
    "%github.com/copilot%",
    "%huggingface.co%",
    "%poe.com%",
    "%character.ai%",
    "%you.com%",
    "%phind.com%",
    "%cursor.sh%",
    "%v0.dev%",
    "%bolt.new%",
    "%replit.com%",
    "%labs.google.com%",
];

/// Keywords identifying AI applications in the installed-app inventory
pub const AI_APP_KEYWORDS: &[&str] = &[
    "claude",
    "chatgpt",
    "openai",
    "cursor",
    "copilot",
    "ollama",
    "lm studio",
    "jan",
    "gpt4all",
    "msty",
    "perplexity",
    "windsurf",
    "raycast",
    "diffusionbee",
    "draw things",
    "pieces",
    "warp",
];

/// Keywords that flag a generic application log as AI-related
pub const AI_LOG_KEYWORDS: &[&str] = &[
    "anthropic",
    "openai",
    "chatgpt",
    "claude",
    "copilot",
    "gemini",
    "ollama",
    "llama",
    "mistral",
];
