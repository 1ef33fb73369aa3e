//! Built-in tool table.
//!
//! Every supported assistant is described as data: candidate roots plus an
//! ordered list of path rules. Roots that do not exist on the host are
//! skipped by the engine, so the table lists macOS, Linux and Windows
//! locations side by side.

use crate::config::tool_defs::{
    BrowserFlavor, ExtractorKind, PathRule, SqliteMapping, ToolDefinition,
};
use crate::constants::AI_LOG_KEYWORDS;

fn rule(pattern: &str, artifact_type: &str, extractor: ExtractorKind) -> PathRule {
    PathRule {
        pattern: pattern.to_string(),
        exclude: None,
        artifact_type: artifact_type.to_string(),
        extractor,
        max_depth: None,
    }
}

fn shallow(mut rule: PathRule, max_depth: usize) -> PathRule {
    rule.max_depth = Some(max_depth);
    rule
}

fn tool(name: &str, description: &str, roots: &[&str], rules: Vec<PathRule>) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        roots: roots.iter().map(|r| r.to_string()).collect(),
        rules,
        enabled: true,
    }
}

fn chromium(name: &str, description: &str, roots: &[&str]) -> ToolDefinition {
    tool(
        name,
        description,
        roots,
        vec![shallow(
            rule(
                r"^(Default|Profile [0-9]+)/History$",
                "browser_history",
                ExtractorKind::BrowserHistory { flavor: BrowserFlavor::Chromium },
            ),
            2,
        )],
    )
}

/// The default tool definitions.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        tool(
            "claude_code",
            "Claude Code CLI",
            &["~/.claude"],
            vec![
                rule(r"^history\.jsonl$", "prompt_history", ExtractorKind::JsonlMessages),
                rule(r"^projects/.+\.jsonl$", "conversation_message", ExtractorKind::JsonlMessages),
                rule(r"^settings(\.local)?\.json$", "config", ExtractorKind::JsonDocument),
                rule(r"^stats-cache\.json$", "analytics", ExtractorKind::JsonDocument),
                rule(r"^todos/.+\.json$", "task", ExtractorKind::JsonDocument),
                rule(r"^plans/.+\.md$", "plan", ExtractorKind::TextFile),
                rule(r"^debug/.+\.txt$", "debug_log", ExtractorKind::MetadataOnly),
            ],
        ),
        tool(
            "claude_desktop",
            "Claude desktop application",
            &[
                "~/Library/Application Support/Claude",
                "~/.config/Claude",
                "%APPDATA%/Claude",
            ],
            vec![
                rule(
                    r"^(Local Storage/leveldb|IndexedDB/[^/]+\.leveldb)$",
                    "leveldb_store",
                    ExtractorKind::LeveldbCarve,
                ),
                rule(r"^(claude_desktop_)?config\.json$", "config", ExtractorKind::JsonDocument),
                rule(r"^logs/.+\.log$", "app_log", ExtractorKind::MetadataOnly),
                shallow(
                    PathRule {
                        exclude: Some(r"(?i)cookies".to_string()),
                        ..rule(r"\.(sqlite|db)$", "database_summary", ExtractorKind::SqliteSummary)
                    },
                    3,
                ),
            ],
        ),
        tool(
            "chatgpt",
            "ChatGPT desktop application",
            &[
                "~/Library/Group Containers/group.com.openai.chat",
                "~/Library/Application Support/com.openai.chat",
            ],
            vec![
                rule(
                    r"conversations-[^/]+/[^/]+\.data$",
                    "encrypted_conversation",
                    ExtractorKind::MetadataOnly,
                ),
                shallow(rule(r"\.json$", "config", ExtractorKind::JsonDocument), 3),
            ],
        ),
        tool(
            "cursor",
            "Cursor IDE",
            &[
                "~/Library/Application Support/Cursor",
                "~/.config/Cursor",
                "%APPDATA%/Cursor",
            ],
            vec![
                rule(
                    r"^User/globalStorage/state\.vscdb$",
                    "conversation",
                    ExtractorKind::SqliteQuery(SqliteMapping {
                        query: "SELECT key, value FROM cursorDiskKV \
                                WHERE key LIKE 'composerData:%' OR key LIKE 'bubbleId:%'"
                            .to_string(),
                        timestamp_column: None,
                        content_columns: vec!["value".to_string()],
                        conversation_column: Some("key".to_string()),
                        role_column: None,
                        model_column: None,
                    }),
                ),
                rule(
                    r"^User/workspaceStorage/[^/]+/state\.vscdb$",
                    "workspace_chat",
                    ExtractorKind::SqliteQuery(SqliteMapping {
                        query: "SELECT key, value FROM ItemTable \
                                WHERE key LIKE '%aichat%' OR key LIKE '%composer%'"
                            .to_string(),
                        timestamp_column: None,
                        content_columns: vec!["value".to_string()],
                        conversation_column: Some("key".to_string()),
                        role_column: None,
                        model_column: None,
                    }),
                ),
                rule(r"^User/settings\.json$", "config", ExtractorKind::JsonDocument),
                rule(r"^logs/.+\.log$", "app_log", ExtractorKind::MetadataOnly),
            ],
        ),
        tool(
            "codex",
            "OpenAI Codex CLI",
            &["~/.codex"],
            vec![
                rule(r"^history\.jsonl$", "prompt_history", ExtractorKind::JsonlMessages),
                rule(r"^sessions/.+\.jsonl$", "conversation_message", ExtractorKind::JsonlMessages),
                rule(r"^sessions/.+\.json$", "conversation", ExtractorKind::JsonDocument),
                rule(r"^config\.toml$", "config", ExtractorKind::TextFile),
                rule(r"^log/.+\.log$", "app_log", ExtractorKind::MetadataOnly),
            ],
        ),
        tool(
            "ollama",
            "Ollama local model runner",
            &["~/.ollama"],
            vec![
                rule(r"^history$", "prompt_history", ExtractorKind::TextFile),
                rule(r"^models/manifests/.+", "model_manifest", ExtractorKind::JsonDocument),
                rule(r"^logs/.+\.log$", "app_log", ExtractorKind::MetadataOnly),
            ],
        ),
        tool(
            "aider",
            "Aider pair-programming CLI",
            &["~"],
            vec![
                shallow(rule(r"^\.aider\.chat\.history\.md$", "conversation", ExtractorKind::TextFile), 1),
                shallow(rule(r"^\.aider\.input\.history$", "prompt_history", ExtractorKind::TextFile), 1),
                shallow(rule(r"^\.aider\.conf\.ya?ml$", "config", ExtractorKind::JsonDocument), 1),
            ],
        ),
        chromium(
            "chrome",
            "Google Chrome AI-service history",
            &[
                "~/Library/Application Support/Google/Chrome",
                "~/.config/google-chrome",
                "%LOCALAPPDATA%/Google/Chrome/User Data",
            ],
        ),
        chromium(
            "brave",
            "Brave AI-service history",
            &[
                "~/Library/Application Support/BraveSoftware/Brave-Browser",
                "~/.config/BraveSoftware/Brave-Browser",
                "%LOCALAPPDATA%/BraveSoftware/Brave-Browser/User Data",
            ],
        ),
        chromium(
            "edge",
            "Microsoft Edge AI-service history",
            &[
                "~/Library/Application Support/Microsoft Edge",
                "~/.config/microsoft-edge",
                "%LOCALAPPDATA%/Microsoft/Edge/User Data",
            ],
        ),
        tool(
            "safari",
            "Safari AI-service history",
            &["~/Library/Safari"],
            vec![shallow(
                rule(
                    r"^History\.db$",
                    "browser_history",
                    ExtractorKind::BrowserHistory { flavor: BrowserFlavor::Safari },
                ),
                1,
            )],
        ),
        tool(
            "generic_logs",
            "Application logs mentioning AI services",
            &["~/Library/Logs"],
            vec![shallow(
                rule(
                    r"(?i)\.(log|txt|jsonl)$",
                    "log_entry",
                    ExtractorKind::KeywordLog {
                        keywords: AI_LOG_KEYWORDS.iter().map(|s| s.to_string()).collect(),
                    },
                ),
                3,
            )],
        ),
    ]
}
