//! Read-only access to embedded SQLite evidence databases.
//!
//! Databases are opened through a `file:` URI with `immutable=1`, which makes
//! SQLite skip locking and never create `-wal`, `-shm` or `-journal` files
//! next to the evidence. Any engine failure degrades to an empty result for
//! that source.

use log::debug;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Params};
use serde_json::{Map, Number, Value};
use std::path::Path;

use crate::security::identifier::quote_identifier;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Build an immutable read-only SQLite URI for `path`.
///
/// Characters with meaning in a URI are percent-encoded. Non UTF-8 paths
/// are rejected.
pub fn sqlite_uri(path: &Path) -> Option<String> {
    let raw = path.to_str()?;
    let mut encoded = String::with_capacity(raw.len() + 16);
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    Some(format!("file:{}?immutable=1", encoded))
}

/// Open an evidence database read-only and immutable.
pub fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    let uri = sqlite_uri(path).ok_or_else(|| {
        rusqlite::Error::InvalidPath(path.to_path_buf())
    })?;
    if !path.is_file() {
        return Err(rusqlite::Error::InvalidPath(path.to_path_buf()));
    }
    Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<binary:{} bytes>", bytes.len())),
    }
}

fn query_rows<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params)?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Map::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            record.insert(name.clone(), value_to_json(row.get_ref(index)?));
        }
        results.push(record);
    }
    Ok(results)
}

/// Like [`read_only_query`] but surfaces the engine error, for callers that
/// record why a source could not be read.
pub fn try_query<P: Params>(db_path: &Path, sql: &str, params: P) -> rusqlite::Result<Vec<Row>> {
    let conn = open_read_only(db_path)?;
    query_rows(&conn, sql, params)
}

/// Run a parameterized query against an evidence database.
///
/// Returns an empty vector on any failure: missing file, locked or corrupt
/// database, missing table, bad SQL.
pub fn read_only_query<P: Params>(db_path: &Path, sql: &str, params: P) -> Vec<Row> {
    match try_query(db_path, sql, params) {
        Ok(rows) => rows,
        Err(e) => {
            debug!("Query on {} failed: {}", db_path.display(), e);
            Vec::new()
        }
    }
}

/// Names of the user tables in an evidence database.
pub fn table_names(db_path: &Path) -> Vec<String> {
    read_only_query(
        db_path,
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        [],
    )
    .into_iter()
    .filter_map(|row| row.get("name").and_then(Value::as_str).map(String::from))
    .collect()
}

/// Row count of every table whose name passes identifier validation.
///
/// Tables with unusual names are skipped rather than interpolated.
pub fn table_row_counts(db_path: &Path) -> Vec<(String, i64)> {
    let conn = match open_read_only(db_path) {
        Ok(conn) => conn,
        Err(e) => {
            debug!("Cannot open {}: {}", db_path.display(), e);
            return Vec::new();
        }
    };

    let names = match query_rows(
        &conn,
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        [],
    ) {
        Ok(rows) => rows,
        Err(e) => {
            debug!("Cannot list tables of {}: {}", db_path.display(), e);
            return Vec::new();
        }
    };

    let mut counts = Vec::new();
    for row in names {
        let Some(name) = row.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(quoted) = quote_identifier(name) else {
            debug!("Skipping table with unsafe name in {}", db_path.display());
            continue;
        };
        let sql = format!("SELECT COUNT(*) FROM {}", quoted);
        match conn.query_row(&sql, [], |r| r.get::<_, i64>(0)) {
            Ok(count) => counts.push((name.to_string(), count)),
            Err(e) => debug!("Cannot count {} in {}: {}", name, db_path.display(), e),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn make_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("chat.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (id INTEGER PRIMARY KEY, body TEXT, created REAL, data BLOB);
             INSERT INTO messages (body, created, data) VALUES ('hello', 1704067200.5, x'0102');
             INSERT INTO messages (body, created, data) VALUES ('world', NULL, NULL);
             CREATE TABLE \"odd name\" (x INTEGER);",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_sqlite_uri_escapes() {
        let uri = sqlite_uri(Path::new("/tmp/a b/c?d#e%f.db")).unwrap();
        assert_eq!(uri, "file:/tmp/a%20b/c%3Fd%23e%25f.db?immutable=1");
    }

    #[test]
    fn test_read_only_query() {
        let temp_dir = TempDir::new().unwrap();
        let db = make_db(temp_dir.path());

        let rows = read_only_query(
            &db,
            "SELECT body, created, data FROM messages WHERE body = ?1",
            params!["hello"],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["body"], Value::from("hello"));
        assert_eq!(rows[0]["created"], Value::from(1704067200.5));
        assert_eq!(rows[0]["data"], Value::from("<binary:2 bytes>"));
    }

    #[test]
    fn test_failures_yield_empty() {
        let temp_dir = TempDir::new().unwrap();
        let db = make_db(temp_dir.path());

        assert!(read_only_query(&db, "SELECT * FROM missing_table", []).is_empty());
        assert!(read_only_query(&temp_dir.path().join("none.db"), "SELECT 1", []).is_empty());

        let garbage = temp_dir.path().join("garbage.db");
        std::fs::write(&garbage, b"this is not a database file at all").unwrap();
        assert!(read_only_query(&garbage, "SELECT 1", []).is_empty());
    }

    #[test]
    fn test_no_side_files() {
        let temp_dir = TempDir::new().unwrap();
        let db = make_db(temp_dir.path());
        let before: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();

        let _ = read_only_query(&db, "SELECT COUNT(*) FROM messages", []);
        let after: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn test_table_row_counts_skip_unsafe_names() {
        let temp_dir = TempDir::new().unwrap();
        let db = make_db(temp_dir.path());

        let counts = table_row_counts(&db);
        assert_eq!(counts, vec![("messages".to_string(), 2)]);

        let names = table_names(&db);
        assert!(names.contains(&"odd name".to_string()));
    }
}
