//! Generic traversal engine driven by a [`ToolDefinition`].
//!
//! Each root is walked without following symlinks. Every entry is matched
//! against the tool's rules by its root-relative path (with `/` separators);
//! the first matching rule picks the extractor. Extraction of a single file
//! runs inside its own error boundary so one bad file never costs the rest.

use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::collectors::collector::{Collector, CollectorContext};
use crate::collectors::extractors::{extract, FileInput};
use crate::collectors::permission_tracker::PermissionTracker;
use crate::config::{expand_root, PathRule, ToolDefinition};
use crate::models::Artifact;
use crate::normalizer::safe_error_message;
use crate::security::policy::{log_security_event, SecurityEvent};

struct CompiledRule {
    rule: PathRule,
    pattern: Regex,
    exclude: Option<Regex>,
}

impl CompiledRule {
    fn compile(rule: &PathRule) -> Result<Self> {
        let pattern = Regex::new(&rule.pattern)
            .with_context(|| format!("Invalid rule pattern: {}", rule.pattern))?;
        let exclude = rule
            .exclude
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| format!("Invalid exclude pattern for rule {}", rule.pattern))?;
        Ok(Self { rule: rule.clone(), pattern, exclude })
    }

    fn matches(&self, relative: &str, is_dir: bool, depth: usize) -> bool {
        if is_dir != self.rule.extractor.matches_directories() {
            return false;
        }
        if self.rule.max_depth.map_or(false, |max| depth > max) {
            return false;
        }
        self.pattern.is_match(relative)
            && !self.exclude.as_ref().map_or(false, |ex| ex.is_match(relative))
    }
}

/// Collector for one entry of the tool table.
pub struct ToolCollector {
    tool: ToolDefinition,
    ctx: CollectorContext,
    rules: Vec<CompiledRule>,
    permissions: PermissionTracker,
}

impl ToolCollector {
    pub fn new(tool: ToolDefinition, ctx: CollectorContext) -> Result<Self> {
        let rules = tool
            .rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid rules for tool {}", tool.name))?;
        Ok(Self { tool, ctx, rules, permissions: PermissionTracker::new() })
    }

    /// Expanded roots; roots that fail expansion are dropped.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.tool
            .roots
            .iter()
            .filter_map(|raw| match expand_root(raw, &self.ctx.home) {
                Ok(path) => Some(path),
                Err(e) => {
                    log_security_event(SecurityEvent::PathValidationFailed {
                        path: format!("{}: {}", self.tool.name, raw),
                        reason: e.to_string(),
                    });
                    None
                }
            })
            .collect()
    }

    fn existing_roots(&self) -> Vec<PathBuf> {
        self.roots().into_iter().filter(|root| root.exists()).collect()
    }

    /// Walk depth: unbounded unless every rule carries a depth limit.
    fn walk_depth(&self) -> Option<usize> {
        self.rules
            .iter()
            .map(|r| r.rule.max_depth)
            .collect::<Option<Vec<_>>>()
            .and_then(|depths| depths.into_iter().max())
    }

    fn match_rule(&self, relative: &str, is_dir: bool, depth: usize) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matches(relative, is_dir, depth))
    }

    /// Paths skipped so far because of permissions.
    pub fn permission_failures(&self) -> Vec<String> {
        self.permissions.failures()
    }

    fn note_io_error(&self, path: &Path, error: &io::Error) {
        if PermissionTracker::is_permission_io_error(error) {
            let display = path.display().to_string();
            log_security_event(SecurityEvent::PermissionDenied { path: display.clone() });
            self.permissions.record_permission_failure(&display);
        } else {
            debug!("Skipping {}: {}", path.display(), error);
        }
    }

    /// Fail only when the root itself cannot be listed.
    fn check_root(&self, root: &Path) -> Result<()> {
        if root.is_dir() {
            if let Err(e) = fs::read_dir(root) {
                self.note_io_error(root, &e);
                return Err(anyhow!(e)).with_context(|| format!("Cannot list root {}", root.display()));
            }
        }
        Ok(())
    }

    fn collect_root(&self, root: &Path, artifacts: &mut Vec<Artifact>) -> Result<()> {
        self.check_root(root)?;

        let mut walker = WalkDir::new(root).follow_links(false);
        if let Some(depth) = self.walk_depth() {
            walker = walker.max_depth(depth);
        }

        let mut entries = walker.into_iter();
        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    match e.io_error() {
                        Some(io_error) => self.note_io_error(&path, io_error),
                        None => debug!("Skipping {}: {}", path.display(), e),
                    }
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                debug!("Skipping symlink {}", entry.path().display());
                continue;
            }
            let is_dir = file_type.is_dir();
            if entry.depth() == 0 && is_dir {
                continue;
            }

            let relative = relative_path(root, entry.path());
            let Some(rule) = self.match_rule(&relative, is_dir, entry.depth()) else {
                continue;
            };
            if is_dir {
                entries.skip_current_dir();
            }
            self.process(rule, entry.path(), is_dir, artifacts);
        }
        Ok(())
    }

    fn process(&self, rule: &CompiledRule, path: &Path, is_dir: bool, artifacts: &mut Vec<Artifact>) {
        if !is_dir {
            if self.ctx.policy.is_credential_file(path) {
                log_security_event(SecurityEvent::CredentialFileSkipped {
                    path: path.display().to_string(),
                });
                return;
            }
            if rule.rule.extractor.reads_content() {
                match fs::metadata(path) {
                    Ok(metadata) if !self.ctx.policy.is_file_size_allowed(metadata.len()) => {
                        debug!(
                            "Skipping {}: {} bytes exceeds the size bound",
                            path.display(),
                            metadata.len()
                        );
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.note_io_error(path, &e);
                        return;
                    }
                }
            }
        }

        let input = FileInput {
            source_tool: &self.tool.name,
            artifact_type: &rule.rule.artifact_type,
            path,
            ctx: &self.ctx,
        };
        match panic::catch_unwind(AssertUnwindSafe(|| extract(&rule.rule.extractor, &input))) {
            Ok(Ok(mut found)) => {
                debug!("{}: {} artifacts from {}", self.tool.name, found.len(), path.display());
                artifacts.append(&mut found);
            }
            Ok(Err(e)) => {
                let chain = format!("{:#}", e);
                if PermissionTracker::is_permission_error(&chain) {
                    self.permissions.record_permission_failure(&path.display().to_string());
                }
                debug!("{}", safe_error_message(&path.display().to_string(), &chain));
            }
            Err(_) => {
                warn!(
                    "{}: {} extractor panicked on {}",
                    self.tool.name,
                    rule.rule.extractor,
                    path.display()
                );
            }
        }
    }
}

/// Root-relative path with `/` separators. A root that is itself a file is
/// matched by its file name.
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path.file_name().map(PathBuf::from).unwrap_or_default(),
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl Collector for ToolCollector {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn detect(&self) -> bool {
        !self.existing_roots().is_empty()
    }

    fn collect(&self) -> Result<Vec<Artifact>> {
        let roots = self.existing_roots();
        if roots.is_empty() {
            bail!("No root of {} exists", self.tool.name);
        }

        let mut artifacts = Vec::new();
        let mut root_errors = Vec::new();
        for root in &roots {
            info!("{}: scanning {}", self.tool.name, root.display());
            if let Err(e) = self.collect_root(root, &mut artifacts) {
                warn!("{}", safe_error_message(&self.tool.name, &format!("{:#}", e)));
                root_errors.push(e);
            }
        }
        self.permissions.report_failures(&self.tool.name);

        if root_errors.len() == roots.len() {
            if let Some(e) = root_errors.pop() {
                return Err(e);
            }
        }
        Ok(artifacts)
    }
}

/// Build a collector for every enabled tool definition.
///
/// Definitions with invalid rules are reported and left out.
pub fn tool_collectors<'a>(
    tools: impl IntoIterator<Item = &'a ToolDefinition>,
    ctx: &CollectorContext,
) -> Vec<ToolCollector> {
    tools
        .into_iter()
        .filter(|tool| tool.enabled)
        .filter_map(|tool| match ToolCollector::new(tool.clone(), ctx.clone()) {
            Ok(collector) => Some(collector),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        })
        .collect()
}
