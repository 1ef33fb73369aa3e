use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_CONFIG_NAME, DEFAULT_GAP_HOURS, DEFAULT_QUERY_LIMIT, DEFAULT_RUNS_LIMIT,
    DEFAULT_SEARCH_LIMIT, DEFAULT_TIMELINE_LIMIT,
};

/// Command-line arguments for the ai-trace tool.
///
/// Global options select the configuration, the database and the home
/// directory to examine; the subcommand picks the operation.
#[derive(Parser, Debug)]
#[clap(name = "ai-trace", about = "Forensic collector for AI-assistant traces")]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration YAML file
    #[clap(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Artifact database path (default: ~/.ai-forensics/traces.db)
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    /// Home directory to examine (default: current user's home)
    #[clap(long, global = true)]
    pub home: Option<PathBuf>,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every detected collector and store the results
    Collect {
        /// Only report which collectors would run
        #[clap(long)]
        dry_run: bool,

        /// Restrict collection to these tools (comma-separated)
        #[clap(short = 't', long)]
        tools: Option<String>,
    },

    /// List stored artifacts with optional filters
    Browse(BrowseOpts),

    /// Search previews, paths and raw data for a literal string
    Search {
        /// Text to look for
        query: String,

        /// Maximum number of results
        #[clap(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },

    /// Summarize the store
    Stats,

    /// Show timestamped artifacts in chronological order
    Timeline(TimelineOpts),

    /// List recent collection runs
    Runs {
        /// Maximum number of runs
        #[clap(short, long, default_value_t = DEFAULT_RUNS_LIMIT)]
        limit: usize,
    },

    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = DEFAULT_CONFIG_NAME)]
        path: PathBuf,
    },
}

/// Filters for the browse subcommand.
#[derive(ClapArgs, Debug)]
pub struct BrowseOpts {
    /// Source tool (e.g. claude_code, cursor)
    #[clap(long)]
    pub tool: Option<String>,

    /// Artifact type (e.g. conversation_message)
    #[clap(long = "type")]
    pub artifact_type: Option<String>,

    /// Conversation or session id
    #[clap(long)]
    pub conversation: Option<String>,

    /// Identified model family
    #[clap(long)]
    pub model: Option<String>,

    #[clap(short, long, default_value_t = DEFAULT_QUERY_LIMIT)]
    pub limit: usize,

    #[clap(long, default_value_t = 0)]
    pub offset: usize,
}

/// Bounds for the timeline subcommand.
#[derive(ClapArgs, Debug)]
pub struct TimelineOpts {
    /// Inclusive start (any supported timestamp form)
    #[clap(long)]
    pub start: Option<String>,

    /// Inclusive end (any supported timestamp form)
    #[clap(long)]
    pub end: Option<String>,

    /// Source tool
    #[clap(long)]
    pub tool: Option<String>,

    #[clap(short, long, default_value_t = DEFAULT_TIMELINE_LIMIT)]
    pub limit: usize,

    /// Report quiet periods of at least this many hours instead of entries
    #[clap(long, num_args = 0..=1, default_missing_value = "4", conflicts_with = "by_day")]
    pub gaps: Option<f64>,

    /// Report artifact counts per day instead of entries
    #[clap(long)]
    pub by_day: bool,
}

impl TimelineOpts {
    /// Gap threshold, if gap reporting was requested.
    pub fn gap_hours(&self) -> Option<f64> {
        self.gaps.map(|hours| if hours > 0.0 { hours } else { DEFAULT_GAP_HOURS })
    }
}

/// Split a comma-separated tool list.
pub fn parse_tool_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_collect_with_globals() {
        let args = Args::parse_from([
            "ai-trace",
            "--verbose",
            "--db", "/tmp/traces.db",
            "--home", "/evidence/home",
            "collect",
            "--dry-run",
        ]);

        assert!(args.verbose);
        assert_eq!(args.db, Some(PathBuf::from("/tmp/traces.db")));
        assert_eq!(args.home, Some(PathBuf::from("/evidence/home")));
        match args.command {
            Commands::Collect { dry_run, tools } => {
                assert!(dry_run);
                assert_eq!(tools, None);
            }
            _ => panic!("Expected Collect command"),
        }
    }

    #[test]
    fn test_global_flag_after_subcommand() {
        let args = Args::parse_from(["ai-trace", "stats", "--config", "custom.yaml"]);
        assert_eq!(args.config, Some(PathBuf::from("custom.yaml")));
        assert!(matches!(args.command, Commands::Stats));
    }

    #[test]
    fn test_browse_filters() {
        let args = Args::parse_from([
            "ai-trace",
            "browse",
            "--tool", "cursor",
            "--type", "conversation_message",
            "--limit", "5",
        ]);

        match args.command {
            Commands::Browse(opts) => {
                assert_eq!(opts.tool.as_deref(), Some("cursor"));
                assert_eq!(opts.artifact_type.as_deref(), Some("conversation_message"));
                assert_eq!(opts.limit, 5);
                assert_eq!(opts.offset, 0);
                assert_eq!(opts.model, None);
            }
            _ => panic!("Expected Browse command"),
        }
    }

    #[test]
    fn test_search_defaults() {
        let args = Args::parse_from(["ai-trace", "search", "100%"]);
        match args.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "100%");
                assert_eq!(limit, DEFAULT_SEARCH_LIMIT);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_timeline_gaps() {
        let args = Args::parse_from(["ai-trace", "timeline", "--gaps"]);
        match args.command {
            Commands::Timeline(opts) => assert_eq!(opts.gap_hours(), Some(4.0)),
            _ => panic!("Expected Timeline command"),
        }

        let args = Args::parse_from(["ai-trace", "timeline", "--gaps", "8.5", "--start", "2024-01-01"]);
        match args.command {
            Commands::Timeline(opts) => {
                assert_eq!(opts.gap_hours(), Some(8.5));
                assert_eq!(opts.start.as_deref(), Some("2024-01-01"));
            }
            _ => panic!("Expected Timeline command"),
        }

        let args = Args::parse_from(["ai-trace", "timeline"]);
        match args.command {
            Commands::Timeline(opts) => assert_eq!(opts.gap_hours(), None),
            _ => panic!("Expected Timeline command"),
        }
    }

    #[test]
    fn test_timeline_by_day() {
        let args = Args::parse_from(["ai-trace", "timeline", "--by-day", "--tool", "codex"]);
        match args.command {
            Commands::Timeline(opts) => {
                assert!(opts.by_day);
                assert_eq!(opts.gap_hours(), None);
                assert_eq!(opts.tool.as_deref(), Some("codex"));
            }
            _ => panic!("Expected Timeline command"),
        }

        assert!(Args::try_parse_from(["ai-trace", "timeline", "--by-day", "--gaps"]).is_err());
    }

    #[test]
    fn test_init_config_default_path() {
        let args = Args::parse_from(["ai-trace", "init-config"]);
        match args.command {
            Commands::InitConfig { path } => assert_eq!(path, PathBuf::from(DEFAULT_CONFIG_NAME)),
            _ => panic!("Expected InitConfig command"),
        }
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Args::try_parse_from(["ai-trace"]).is_err());
    }

    #[test]
    fn test_parse_tool_list() {
        assert_eq!(parse_tool_list("cursor, codex,,"), vec!["cursor", "codex"]);
        assert!(parse_tool_list("").is_empty());
    }
}
