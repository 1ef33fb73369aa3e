mod collection_config;
mod default_configs;
pub mod env_vars;
mod tool_defs;

// Re-export application config
pub use collection_config::{load_or_create_config, AppConfig, InventoryConfig};

pub use default_configs::builtin_tools;

// Re-export tool table types
pub use tool_defs::{BrowserFlavor, ExtractorKind, PathRule, SqliteMapping, ToolDefinition};

// Re-export root expansion
pub use env_vars::{expand_root, expand_vars_with};
