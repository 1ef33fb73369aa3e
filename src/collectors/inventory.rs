//! Installed-application inventory.
//!
//! Runs the platform inventory command (`system_profiler` on macOS) under a
//! hard timeout and reports applications whose names mention an AI product.
//! A missing, failing or slow command yields no artifacts.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use serde_json::json;

use crate::collectors::collector::{Collector, CollectorContext};
use crate::config::InventoryConfig;
use crate::models::Artifact;

/// One application block from the inventory listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstalledApp {
    pub name: String,
    pub version: Option<String>,
    pub location: Option<String>,
}

/// Run `program` and capture its stdout, giving up after `timeout`.
///
/// The child is killed when the timeout fires.
pub fn run_with_timeout(program: &str, args: &[String], timeout: Duration) -> Option<String> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Failed to start runtime for {}: {}", program, e);
            return None;
        }
    };

    runtime.block_on(async {
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to execute {}: {}", program, e);
                return None;
            }
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                debug!("{} exited with {}", program, output.status);
                None
            }
            Ok(Err(e)) => {
                debug!("{} failed: {}", program, e);
                None
            }
            Err(_) => {
                warn!("{} timed out after {:?}", program, timeout);
                None
            }
        }
    })
}

/// Parse `Name:` headed blocks with indented `Version:` / `Location:` lines.
pub fn parse_applications(text: &str) -> Vec<InstalledApp> {
    let mut apps = Vec::new();
    let mut current: Option<InstalledApp> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        if let Some(version) = stripped.strip_prefix("Version:") {
            if let Some(app) = current.as_mut() {
                app.version = Some(version.trim().to_string());
            }
        } else if let Some(location) = stripped.strip_prefix("Location:") {
            if let Some(app) = current.as_mut() {
                app.location = Some(location.trim().to_string());
            }
        } else if let Some(name) = stripped.strip_suffix(':') {
            if name.contains(": ") || (name == "Applications" && line == stripped) {
                continue;
            }
            if let Some(done) = current.take() {
                apps.push(done);
            }
            current = Some(InstalledApp { name: name.to_string(), ..Default::default() });
        }
    }
    if let Some(done) = current {
        apps.push(done);
    }
    apps
}

pub struct InventoryCollector {
    config: InventoryConfig,
    ctx: CollectorContext,
}

impl InventoryCollector {
    pub fn new(config: InventoryConfig, ctx: CollectorContext) -> Self {
        Self { config, ctx }
    }

    fn is_ai_app(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.config
            .app_keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }

    fn app_artifact(&self, app: &InstalledApp) -> Artifact {
        let mut artifact = self.ctx.artifact(self.name(), "installed_app");
        artifact.file_path = app.location.clone();
        let label = match &app.version {
            Some(version) => format!("Installed AI app: {} v{}", app.name, version),
            None => format!("Installed AI app: {}", app.name),
        };
        artifact.content_preview = Some(self.ctx.policy.preview(&label));
        artifact.metadata = Some(json!({
            "app_name": app.name,
            "version": app.version,
            "location": app.location,
        }));
        artifact
    }
}

impl Collector for InventoryCollector {
    fn name(&self) -> &str {
        "system_inventory"
    }

    fn detect(&self) -> bool {
        self.config.enabled && !self.config.command.is_empty()
    }

    fn collect(&self) -> Result<Vec<Artifact>> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let Some(output) = run_with_timeout(&self.config.command, &self.config.args, timeout) else {
            return Ok(Vec::new());
        };

        let artifacts: Vec<Artifact> = parse_applications(&output)
            .iter()
            .filter(|app| self.is_ai_app(&app.name))
            .map(|app| self.app_artifact(app))
            .collect();
        info!("Inventory found {} AI applications", artifacts.len());
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::SecurityPolicy;
    use std::path::PathBuf;

    const LISTING: &str = "Applications:

    Claude:

      Version: 0.7.1
      Obtained from: Identified Developer
      Location: /Applications/Claude.app

    Calculator:

      Version: 11.0
      Location: /System/Applications/Calculator.app

    Cursor:

      Location: /Applications/Cursor.app
";

    fn ctx() -> CollectorContext {
        CollectorContext {
            home: PathBuf::from("/synthetic"),
            user: None,
            hostname: None,
            policy: SecurityPolicy::default(),
        }
    }

    #[test]
    fn test_parse_applications() {
        let apps = parse_applications(LISTING);
        assert_eq!(apps.len(), 3);
        assert_eq!(
            apps[0],
            InstalledApp {
                name: "Claude".to_string(),
                version: Some("0.7.1".to_string()),
                location: Some("/Applications/Claude.app".to_string()),
            }
        );
        assert_eq!(apps[2].version, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_filters_ai_apps() {
        let config = InventoryConfig {
            enabled: true,
            command: "printf".to_string(),
            args: vec!["%s".to_string(), LISTING.to_string()],
            ..Default::default()
        };
        let collector = InventoryCollector::new(config, ctx());
        assert!(collector.detect());

        let artifacts = collector.collect().unwrap();
        let names: Vec<_> = artifacts
            .iter()
            .map(|a| a.metadata.as_ref().unwrap()["app_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Claude", "Cursor"]);
        assert_eq!(
            artifacts[0].content_preview.as_deref(),
            Some("Installed AI app: Claude v0.7.1")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_degrades_to_nothing() {
        let started = std::time::Instant::now();
        let output = run_with_timeout("sleep", &["5".to_string()], Duration::from_millis(100));
        assert_eq!(output, None);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program() {
        let output = run_with_timeout("definitely-not-a-real-binary-xyz", &[], Duration::from_secs(1));
        assert_eq!(output, None);

        let config = InventoryConfig { enabled: false, ..Default::default() };
        assert!(!InventoryCollector::new(config, ctx()).detect());
    }
}
