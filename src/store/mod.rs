//! Artifact store.
//!
//! SQLite database in WAL mode holding two tables: `artifacts` and
//! `collection_runs`. Every artifact is redacted on its way in. Writers
//! serialize behind a single connection lock, and consumers only see the
//! query methods below, never the connection.

pub mod query;
pub mod schema;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::models::{now_iso, Artifact, CollectionRun};
use crate::normalizer::{normalize_timestamp, redact_credentials};

pub use query::{clamp_limit, escape_like, ArtifactQuery, StoreStats, TimelineQuery};
use schema::{
    artifact_from_row, artifact_insert, artifact_select, list_to_text, metadata_to_text,
    run_from_row, run_select, SCHEMA_SQL,
};

/// Ordering shared by `query` and `search`: newest first, untimed last.
const NEWEST_FIRST: &str = "ORDER BY timestamp IS NULL, timestamp DESC, id";

/// SQLite-backed artifact store
pub struct ArtifactStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl ArtifactStore {
    /// Open or create the store at `path`, creating its directory (mode 0700
    /// on Unix) and schema as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_private_dir(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        Self::init(conn, path.to_path_buf())
    }

    /// In-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Self> {
        // In-memory databases report "memory" here; only file databases get WAL
        let _mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .context("Failed to set journal mode")?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to create schema")?;

        debug!("Opened artifact store at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Artifact store lock poisoned"))
    }

    /// Upsert one artifact (last write wins).
    pub fn insert(&self, artifact: &Artifact) -> Result<()> {
        let conn = self.lock()?;
        write_artifact(&conn, &artifact.sanitized())
            .with_context(|| format!("Failed to insert artifact {}", artifact.id))?;
        Ok(())
    }

    /// Upsert many artifacts in one transaction. Returns the number written.
    ///
    /// If any row fails, nothing is written.
    pub fn insert_batch(&self, artifacts: &[Artifact]) -> Result<usize> {
        if artifacts.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;
        for artifact in artifacts {
            write_artifact(&tx, &artifact.sanitized())
                .with_context(|| format!("Failed to insert artifact {}", artifact.id))?;
        }
        tx.commit().context("Failed to commit artifact batch")?;
        Ok(artifacts.len())
    }

    /// Total number of artifacts.
    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))
            .context("Failed to count artifacts")
    }

    /// Fetch a single artifact by id.
    pub fn get(&self, id: &str) -> Result<Option<Artifact>> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE id = ?1", artifact_select());
        conn.query_row(&sql, params![id], artifact_from_row)
            .optional()
            .context("Failed to fetch artifact")
    }

    /// Filtered, paginated query ordered by timestamp descending with
    /// untimed artifacts last.
    pub fn query(&self, filter: &ArtifactQuery) -> Result<Vec<Artifact>> {
        let mut conditions = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        let filters = [
            ("source_tool", &filter.source_tool),
            ("artifact_type", &filter.artifact_type),
            ("conversation_id", &filter.conversation_id),
            ("model_identified", &filter.model_identified),
        ];
        for (column, value) in filters {
            if let Some(value) = value {
                values.push(SqlValue::Text(value.clone()));
                conditions.push(format!("{} = ?{}", column, values.len()));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        values.push(SqlValue::Integer(clamp_limit(filter.limit)));
        values.push(SqlValue::Integer(filter.offset.min(i64::MAX as usize) as i64));
        let sql = format!(
            "{}{} {} LIMIT ?{} OFFSET ?{}",
            artifact_select(),
            where_clause,
            NEWEST_FIRST,
            values.len() - 1,
            values.len()
        );

        self.select_artifacts(&sql, values)
            .context("Failed to query artifacts")
    }

    /// Artifacts whose preview, path or raw data contains `needle`.
    ///
    /// The needle is matched literally; LIKE wildcards in it are escaped.
    /// Matching is ASCII case-insensitive.
    pub fn search(&self, needle: &str, limit: usize) -> Result<Vec<Artifact>> {
        let pattern = format!("%{}%", escape_like(needle));
        let sql = format!(
            "{} WHERE content_preview LIKE ?1 ESCAPE '\\' \
               OR file_path LIKE ?1 ESCAPE '\\' \
               OR raw_data LIKE ?1 ESCAPE '\\' \
             {} LIMIT ?2",
            artifact_select(),
            NEWEST_FIRST
        );
        let values = vec![SqlValue::Text(pattern), SqlValue::Integer(clamp_limit(limit))];
        self.select_artifacts(&sql, values)
            .context("Failed to search artifacts")
    }

    /// Timestamped artifacts in ascending order within optional bounds.
    pub fn timeline(&self, filter: &TimelineQuery) -> Result<Vec<Artifact>> {
        let mut conditions = vec!["timestamp IS NOT NULL".to_string()];
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(start) = &filter.start {
            let start = normalize_timestamp(start)
                .ok_or_else(|| anyhow!("Invalid timeline start: {}", start))?;
            values.push(SqlValue::Text(start));
            conditions.push(format!("timestamp >= ?{}", values.len()));
        }
        if let Some(end) = &filter.end {
            let end = normalize_timestamp(end)
                .ok_or_else(|| anyhow!("Invalid timeline end: {}", end))?;
            values.push(SqlValue::Text(end));
            conditions.push(format!("timestamp <= ?{}", values.len()));
        }
        if let Some(source_tool) = &filter.source_tool {
            values.push(SqlValue::Text(source_tool.clone()));
            conditions.push(format!("source_tool = ?{}", values.len()));
        }

        values.push(SqlValue::Integer(clamp_limit(filter.limit)));
        let sql = format!(
            "{} WHERE {} ORDER BY timestamp ASC, id LIMIT ?{}",
            artifact_select(),
            conditions.join(" AND "),
            values.len()
        );
        self.select_artifacts(&sql, values)
            .context("Failed to build timeline")
    }

    fn select_artifacts(&self, sql: &str, values: Vec<SqlValue>) -> Result<Vec<Artifact>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values), artifact_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Grouped counts, time range, summed token estimate and run count.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;

        let total_artifacts: i64 = conn
            .query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))
            .context("Failed to count artifacts")?;
        let by_source = grouped_counts(&conn, "source_tool")?;
        let by_type = grouped_counts(&conn, "artifact_type")?;
        let by_model = grouped_counts(&conn, "model_identified")?;
        let (earliest, latest): (Option<String>, Option<String>) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp) FROM artifacts WHERE timestamp IS NOT NULL",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to read time range")?;
        let total_token_estimate: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(token_estimate), 0) FROM artifacts",
                [],
                |row| row.get(0),
            )
            .context("Failed to sum token estimates")?;
        let collection_runs: i64 = conn
            .query_row("SELECT COUNT(*) FROM collection_runs", [], |row| row.get(0))
            .context("Failed to count runs")?;

        Ok(StoreStats {
            total_artifacts,
            by_source,
            by_type,
            by_model,
            earliest,
            latest,
            total_token_estimate,
            collection_runs,
        })
    }

    /// Record the start of a run.
    pub fn insert_run(&self, run: &CollectionRun) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO collection_runs (id, start_time, end_time, collectors_run, total_artifacts, errors, hostname, username)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run.id,
                run.start_time,
                run.end_time,
                list_to_text(&run.collectors_run),
                run.total_artifacts,
                list_to_text(&redacted_list(&run.errors)),
                run.hostname,
                run.username,
            ],
        )
        .with_context(|| format!("Failed to record run {}", run.id))?;
        Ok(())
    }

    /// Complete a run. A run can be finished only once.
    pub fn finish_run(&self, run: &CollectionRun) -> Result<()> {
        let end_time = run.end_time.clone().unwrap_or_else(now_iso);
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE collection_runs
                 SET end_time = ?1, collectors_run = ?2, total_artifacts = ?3, errors = ?4
                 WHERE id = ?5 AND end_time IS NULL",
                params![
                    end_time,
                    list_to_text(&run.collectors_run),
                    run.total_artifacts,
                    list_to_text(&redacted_list(&run.errors)),
                    run.id,
                ],
            )
            .with_context(|| format!("Failed to finish run {}", run.id))?;
        if updated == 0 {
            bail!("Run {} is unknown or already finished", run.id);
        }
        Ok(())
    }

    /// Most recent runs first.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<CollectionRun>> {
        let conn = self.lock()?;
        let sql = format!("{} ORDER BY start_time DESC, id LIMIT ?1", run_select());
        let mut stmt = conn.prepare(&sql).context("Failed to prepare run listing")?;
        let runs = stmt
            .query_map(params![clamp_limit(limit)], run_from_row)
            .context("Failed to list runs")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read runs")?;
        Ok(runs)
    }
}

fn write_artifact(conn: &Connection, a: &Artifact) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(&artifact_insert())?;
    stmt.execute(params![
        a.id,
        a.source_tool,
        a.artifact_type,
        a.timestamp,
        a.file_path,
        a.file_hash_sha256,
        a.file_size_bytes,
        a.file_modified,
        a.file_created,
        a.user,
        a.hostname,
        a.content_preview,
        a.raw_data,
        a.model_identified,
        a.conversation_id,
        a.message_role,
        a.token_estimate,
        metadata_to_text(&a.metadata),
        a.collection_timestamp,
    ])
}

fn grouped_counts(conn: &Connection, column: &str) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "SELECT {col}, COUNT(*) AS cnt FROM artifacts WHERE {col} IS NOT NULL \
         GROUP BY {col} ORDER BY cnt DESC, {col}",
        col = column
    );
    let mut stmt = conn.prepare(&sql).context("Failed to prepare grouping")?;
    let groups = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .with_context(|| format!("Failed to group by {}", column))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read groups for {}", column))?;
    Ok(groups)
}

fn redacted_list(items: &[String]) -> Vec<String> {
    items.iter().map(|item| redact_credentials(item)).collect()
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}
