use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::models::{Artifact, CollectionRun};
use crate::normalizer::safe_error_message;
use crate::safeio::{digest, file_facts};
use crate::security::policy::SecurityPolicy;
use crate::store::ArtifactStore;

/// A source of artifacts.
///
/// `detect` must be fast and side-effect free. `collect` recovers from
/// per-file problems itself and only fails when its whole source is
/// unusable.
pub trait Collector {
    fn name(&self) -> &str;
    fn detect(&self) -> bool;
    fn collect(&self) -> Result<Vec<Artifact>>;
}

/// Host facts and policy shared by every collector in a run.
#[derive(Debug, Clone)]
pub struct CollectorContext {
    pub home: PathBuf,
    pub user: Option<String>,
    pub hostname: Option<String>,
    pub policy: SecurityPolicy,
}

impl CollectorContext {
    pub fn new(home: PathBuf, policy: SecurityPolicy) -> Self {
        Self {
            home,
            user: current_user(),
            hostname: current_hostname(),
            policy,
        }
    }

    /// Artifact stamped with this host and user.
    pub fn artifact(&self, source_tool: &str, artifact_type: &str) -> Artifact {
        let mut artifact = Artifact::new(source_tool, artifact_type);
        artifact.user = self.user.clone();
        artifact.hostname = self.hostname.clone();
        artifact
    }

    /// Artifact carrying the chain-of-custody facts of `path`.
    ///
    /// The digest is only computed when the file is within the size bound.
    pub fn file_artifact(&self, source_tool: &str, artifact_type: &str, path: &Path) -> Artifact {
        let mut artifact = self.artifact(source_tool, artifact_type);
        artifact.file_path = Some(path.to_string_lossy().into_owned());
        if let Some(facts) = file_facts(path) {
            artifact.file_size_bytes = i64::try_from(facts.size).ok();
            artifact.file_modified = facts.modified;
            artifact.file_created = facts.created;
            if path.is_file() && self.policy.is_file_size_allowed(facts.size) {
                artifact.file_hash_sha256 = digest(path, self.policy.max_file_bytes);
            }
        }
        artifact
    }
}

fn current_user() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|user| !user.is_empty())
}

fn current_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Split collectors into (detected, not detected) names.
pub fn detect_collectors(collectors: &[Box<dyn Collector>]) -> (Vec<String>, Vec<String>) {
    let mut detected = Vec::new();
    let mut missing = Vec::new();
    for collector in collectors {
        if collector.detect() {
            detected.push(collector.name().to_string());
        } else {
            missing.push(collector.name().to_string());
        }
    }
    (detected, missing)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "collector panicked".to_string()
    }
}

/// Run every detected collector in order and persist what they return.
///
/// A collector that errors or panics is recorded in the run's error list and
/// the remaining collectors still run. Storage failures abort the run.
pub fn run_collection(
    collectors: &[Box<dyn Collector>],
    store: &ArtifactStore,
    ctx: &CollectorContext,
) -> Result<CollectionRun> {
    let mut run = CollectionRun::start(ctx.hostname.clone(), ctx.user.clone());
    store
        .insert_run(&run)
        .context("Failed to record collection run start")?;
    info!("Collection run {} started", run.id);

    for collector in collectors {
        let name = collector.name().to_string();
        if !collector.detect() {
            debug!("{} not detected, skipping", name);
            continue;
        }

        info!("Running collector {}", name);
        run.collectors_run.push(name.clone());

        match panic::catch_unwind(AssertUnwindSafe(|| collector.collect())) {
            Ok(Ok(artifacts)) => {
                let stored = store
                    .insert_batch(&artifacts)
                    .with_context(|| format!("Failed to store artifacts from {}", name))?;
                run.total_artifacts += stored as i64;
                info!("{} - {} artifacts", name, stored);
            }
            Ok(Err(e)) => {
                let message = safe_error_message(&name, &format!("{:#}", e));
                warn!("Collector failed: {}", message);
                run.errors.push(message);
            }
            Err(payload) => {
                let message = safe_error_message(&name, &panic_message(payload.as_ref()));
                warn!("Collector panicked: {}", message);
                run.errors.push(message);
            }
        }
    }

    run.finish();
    store
        .finish_run(&run)
        .context("Failed to record collection run end")?;
    info!(
        "Collection run {} finished: {} artifacts, {} errors",
        run.id,
        run.total_artifacts,
        run.errors.len()
    );
    Ok(run)
}
