use ai_trace_collector::models::{Artifact, CollectionRun};
use ai_trace_collector::normalizer::normalize_timestamp;
use ai_trace_collector::store::{ArtifactQuery, ArtifactStore, TimelineQuery};
use serde_json::json;
use tempfile::TempDir;

fn artifact(source: &str, artifact_type: &str, timestamp: Option<&str>, preview: &str) -> Artifact {
    let mut artifact = Artifact::new(source, artifact_type);
    artifact.timestamp = timestamp.map(str::to_string);
    artifact.content_preview = Some(preview.to_string());
    artifact
}

fn seeded_store(dir: &TempDir) -> ArtifactStore {
    let store = ArtifactStore::open(&dir.path().join("case").join("traces.db")).unwrap();
    let mut claude = artifact("claude_code", "conversation_message", Some("2024-03-01T09:00:00+00:00"), "refactor the parser");
    claude.conversation_id = Some("s-1".to_string());
    claude.model_identified = Some("claude".to_string());
    claude.token_estimate = Some(5);

    let mut codex = artifact("codex", "prompt_history", Some("2024-03-02T10:00:00+00:00"), "coverage at 100% please");
    codex.token_estimate = Some(7);

    let untimed = artifact("cursor", "config", None, "settings");
    let later = artifact("claude_code", "conversation_message", Some("2024-03-03T08:00:00+00:00"), "Ship it");

    store.insert_batch(&[claude, codex, untimed, later]).unwrap();
    store
}

#[test]
fn test_open_creates_nested_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a").join("b").join("traces.db");
    let store = ArtifactStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), path.as_path());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path.parent().unwrap()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}

#[test]
fn test_query_filters_and_ordering() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let all = store.query(&ArtifactQuery::default()).unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].timestamp.as_deref(), Some("2024-03-03T08:00:00+00:00"));
    assert_eq!(all[3].timestamp, None);

    let claude = store
        .query(&ArtifactQuery::default().source_tool("claude_code"))
        .unwrap();
    assert_eq!(claude.len(), 2);

    let session = store
        .query(&ArtifactQuery::default().conversation_id("s-1").model("claude"))
        .unwrap();
    assert_eq!(session.len(), 1);
    assert_eq!(session[0].content_preview.as_deref(), Some("refactor the parser"));

    let page = store.query(&ArtifactQuery::default().page(2, 1)).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].source_tool, "codex");
}

#[test]
fn test_far_future_epoch_keeps_descending_order() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(&dir.path().join("traces.db")).unwrap();

    let mut garbage = Artifact::new("codex", "prompt_history");
    garbage.timestamp = normalize_timestamp(500_000_000_000_000_i64);
    let mut real = Artifact::new("codex", "prompt_history");
    real.timestamp = normalize_timestamp(1_704_067_200_000_i64);
    store.insert_batch(&[garbage, real]).unwrap();

    let all = store.query(&ArtifactQuery::default()).unwrap();
    assert_eq!(all[0].timestamp.as_deref(), Some("2024-01-01T00:00:00+00:00"));
    assert_eq!(all[1].timestamp, None);
}

#[test]
fn test_search_is_literal_and_case_insensitive() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    assert_eq!(store.search("100%", 10).unwrap().len(), 1);
    assert_eq!(store.search("%", 10).unwrap().len(), 1);
    assert_eq!(store.search("SHIP IT", 10).unwrap().len(), 1);
    assert!(store.search("nothing like this", 10).unwrap().is_empty());
}

#[test]
fn test_timeline_bounds() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let all = store.timeline(&TimelineQuery::default()).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].source_tool, "claude_code");
    assert_eq!(all[2].timestamp.as_deref(), Some("2024-03-03T08:00:00+00:00"));

    let bounded = store
        .timeline(&TimelineQuery {
            start: Some("2024-03-02T00:00:00Z".to_string()),
            end: Some("1709456400".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(bounded.len(), 2);

    let invalid = TimelineQuery { start: Some("yesterday-ish".to_string()), ..Default::default() };
    assert!(store.timeline(&invalid).is_err());
}

#[test]
fn test_stats() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_artifacts, 4);
    assert_eq!(stats.by_source[0], ("claude_code".to_string(), 2));
    assert_eq!(stats.by_model, vec![("claude".to_string(), 1)]);
    assert_eq!(stats.earliest.as_deref(), Some("2024-03-01T09:00:00+00:00"));
    assert_eq!(stats.latest.as_deref(), Some("2024-03-03T08:00:00+00:00"));
    assert_eq!(stats.total_token_estimate, 12);
    assert_eq!(stats.collection_runs, 0);
}

#[test]
fn test_secrets_never_reach_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("traces.db");
    let secret = "sk-abcdefghijklmnopqrstuvwxyz0123456789";
    {
        let store = ArtifactStore::open(&path).unwrap();
        let mut a = artifact("codex", "prompt_history", None, &format!("use {}", secret));
        a.raw_data = Some(format!("{{\"text\":\"{}\"}}", secret));
        a.metadata = Some(json!({"api_key": "plain", "nested": {"note": secret}}));
        store.insert(&a).unwrap();
    }

    let store = ArtifactStore::open(&path).unwrap();
    let stored = store.query(&ArtifactQuery::default()).unwrap().remove(0);
    assert!(!stored.content_preview.unwrap().contains(secret));
    assert!(!stored.raw_data.unwrap().contains(secret));
    let metadata = stored.metadata.unwrap();
    assert_eq!(metadata["api_key"], json!("[REDACTED]"));
    assert!(!metadata.to_string().contains(secret));
}

#[test]
fn test_run_ledger() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(&dir.path().join("traces.db")).unwrap();

    let mut run = CollectionRun::start(Some("host".to_string()), Some("analyst".to_string()));
    store.insert_run(&run).unwrap();
    assert!(!store.list_runs(10).unwrap()[0].is_finished());

    run.collectors_run.push("codex".to_string());
    run.total_artifacts = 3;
    run.errors.push("codex: token=abcdefghijklmnopqrstuvwxyz".to_string());
    run.finish();
    store.finish_run(&run).unwrap();
    assert!(store.finish_run(&run).is_err());

    let listed = store.list_runs(10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].collectors_run, vec!["codex"]);
    assert_eq!(listed[0].total_artifacts, 3);
    assert!(listed[0].is_finished());
    assert!(!listed[0].errors[0].contains("abcdefghijklmnopqrstuvwxyz"));
    assert_eq!(store.stats().unwrap().collection_runs, 1);
}
