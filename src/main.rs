use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use ai_trace_collector::analysis::{daily_counts, find_gaps};
use ai_trace_collector::cli::{parse_tool_list, Args, BrowseOpts, Commands, TimelineOpts};
use ai_trace_collector::collectors::{
    detect_collectors, run_collection, tool_collectors, Collector, CollectorContext,
    InventoryCollector,
};
use ai_trace_collector::config::{load_or_create_config, AppConfig};
use ai_trace_collector::models::{Artifact, CollectionRun};
use ai_trace_collector::store::{ArtifactQuery, ArtifactStore, StoreStats, TimelineQuery};

const INVENTORY_COLLECTOR: &str = "system_inventory";

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    if let Commands::InitConfig { path } = &args.command {
        info!("Creating default configuration file at {}", path.display());
        AppConfig::create_default_config_file(path)?;
        info!("Configuration created successfully");
        return Ok(());
    }

    let config = load_config(&args)?;

    match &args.command {
        Commands::Collect { dry_run, tools } => handle_collect(&config, *dry_run, tools.as_deref()),
        Commands::Browse(opts) => handle_browse(&config, opts),
        Commands::Search { query, limit } => {
            let store = open_store(&config)?;
            print_artifacts(&store.search(query, *limit)?);
            Ok(())
        }
        Commands::Stats => {
            let store = open_store(&config)?;
            print_stats(&store.stats()?);
            Ok(())
        }
        Commands::Timeline(opts) => handle_timeline(&config, opts),
        Commands::Runs { limit } => {
            let store = open_store(&config)?;
            print_runs(&store.list_runs(*limit)?);
            Ok(())
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Load configuration and apply command-line overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = load_or_create_config(args.config.as_deref())?;
    if let Some(home) = &args.home {
        config.home = Some(home.clone());
    }
    if let Some(db) = &args.db {
        config.db_path = Some(db.clone());
    }
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<ArtifactStore> {
    let db_path = config.resolve_db_path()?;
    ArtifactStore::open(&db_path)
        .with_context(|| format!("Failed to open artifact store at {}", db_path.display()))
}

/// Tool collectors for the enabled (and, if given, selected) tools, followed
/// by the inventory collector.
fn build_collectors(
    config: &AppConfig,
    ctx: &CollectorContext,
    selected: Option<&[String]>,
) -> Vec<Box<dyn Collector>> {
    let wanted = |name: &str| selected.map_or(true, |names| names.iter().any(|n| n == name));

    if let Some(names) = selected {
        for name in names {
            let known = name == INVENTORY_COLLECTOR || config.tools.iter().any(|t| &t.name == name);
            if !known {
                warn!("Unknown tool: {}", name);
            }
        }
    }

    let tools = config.enabled_tools().filter(|tool| wanted(tool.name.as_str()));
    let mut collectors: Vec<Box<dyn Collector>> = tool_collectors(tools, ctx)
        .into_iter()
        .map(|c| Box::new(c) as Box<dyn Collector>)
        .collect();
    if wanted(INVENTORY_COLLECTOR) {
        collectors.push(Box::new(InventoryCollector::new(config.inventory.clone(), ctx.clone())));
    }
    collectors
}

fn handle_collect(config: &AppConfig, dry_run: bool, tools: Option<&str>) -> Result<()> {
    let home = config.resolve_home()?;
    let ctx = CollectorContext::new(home.clone(), config.security.clone());
    let selected = tools.map(parse_tool_list);
    let collectors = build_collectors(config, &ctx, selected.as_deref());

    if dry_run {
        let (detected, missing) = detect_collectors(&collectors);
        println!("Home: {}", home.display());
        println!("Would run ({}):", detected.len());
        for name in &detected {
            println!("  {}", name);
        }
        println!("Not detected ({}):", missing.len());
        for name in &missing {
            println!("  {}", name);
        }
        return Ok(());
    }

    info!("Starting AI trace collection for {}", home.display());
    let store = open_store(config)?;
    let run = run_collection(&collectors, &store, &ctx)?;

    println!("Run {}", run.id);
    println!("  Collectors: {}", run.collectors_run.join(", "));
    println!("  Artifacts:  {}", run.total_artifacts);
    println!("  Database:   {}", store.path().display());
    if !run.errors.is_empty() {
        println!("  Errors:");
        for error in &run.errors {
            println!("    {}", error);
        }
    }
    Ok(())
}

fn handle_browse(config: &AppConfig, opts: &BrowseOpts) -> Result<()> {
    let mut filter = ArtifactQuery::default().page(opts.limit, opts.offset);
    if let Some(tool) = &opts.tool {
        filter = filter.source_tool(tool);
    }
    if let Some(artifact_type) = &opts.artifact_type {
        filter = filter.artifact_type(artifact_type);
    }
    if let Some(conversation) = &opts.conversation {
        filter = filter.conversation_id(conversation);
    }
    if let Some(model) = &opts.model {
        filter = filter.model(model);
    }

    let store = open_store(config)?;
    print_artifacts(&store.query(&filter)?);
    Ok(())
}

fn handle_timeline(config: &AppConfig, opts: &TimelineOpts) -> Result<()> {
    let filter = TimelineQuery {
        start: opts.start.clone(),
        end: opts.end.clone(),
        source_tool: opts.tool.clone(),
        limit: opts.limit,
    };
    let store = open_store(config)?;
    let artifacts = store.timeline(&filter)?;

    match opts.gap_hours() {
        Some(hours) => {
            let gaps = find_gaps(&artifacts, hours);
            println!("{} gaps of at least {} hours", gaps.len(), hours);
            for gap in gaps {
                println!("  {} -> {}  ({:.2} h)", gap.before, gap.after, gap.hours);
            }
        }
        None if opts.by_day => {
            for (day, count) in daily_counts(&artifacts) {
                println!("  {}  {}", day, count);
            }
        }
        None => print_artifacts(&artifacts),
    }
    Ok(())
}

fn print_artifacts(artifacts: &[Artifact]) {
    for artifact in artifacts {
        println!(
            "{:<25}  {:<16}  {:<22}  {}",
            artifact.timestamp.as_deref().unwrap_or("-"),
            artifact.source_tool,
            artifact.artifact_type,
            artifact
                .content_preview
                .as_deref()
                .or(artifact.file_path.as_deref())
                .unwrap_or("")
        );
    }
    println!("{} artifacts", artifacts.len());
}

fn print_groups(title: &str, groups: &[(String, i64)]) {
    if groups.is_empty() {
        return;
    }
    println!("{}:", title);
    for (name, count) in groups {
        println!("  {:<24} {}", name, count);
    }
}

fn print_stats(stats: &StoreStats) {
    println!("Total artifacts:  {}", stats.total_artifacts);
    println!("Collection runs:  {}", stats.collection_runs);
    println!("Token estimate:   {}", stats.total_token_estimate);
    if let (Some(earliest), Some(latest)) = (&stats.earliest, &stats.latest) {
        println!("Time range:       {} .. {}", earliest, latest);
    }
    print_groups("By source", &stats.by_source);
    print_groups("By type", &stats.by_type);
    print_groups("By model", &stats.by_model);
}

fn print_runs(runs: &[CollectionRun]) {
    for run in runs {
        println!(
            "{}  {} -> {}  {} artifacts  {} errors  [{}]",
            run.id,
            run.start_time,
            run.end_time.as_deref().unwrap_or("unfinished"),
            run.total_artifacts,
            run.errors.len(),
            run.collectors_run.join(", ")
        );
    }
}
