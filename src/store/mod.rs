//! Storage handle. Every component takes an explicit `Connection`, so the
//! reconciler, query layer, and importer can run against a file or an
//! isolated in-memory store.

pub mod loader;
pub mod schema_gen;

pub use loader::*;
pub use schema_gen::*;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::normalize::normalize_key;
use crate::schema::{DependencyResolver, ALL_TABLES};

/// SQL scalar function exposing [`normalize_key`] to queries
pub const NORM_KEY_FN: &str = "norm_key";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open an existing database file. A missing file is reported as
/// unavailable instead of silently creating an empty database.
pub fn open(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(Error::Unavailable(format!(
            "database file {:?} not found",
            path
        )));
    }

    let conn = Connection::open(path).map_err(|e| Error::Unavailable(e.to_string()))?;
    configure(&conn)?;
    Ok(conn)
}

/// Create a fresh database at `path` with an empty schema, replacing any
/// file already there
pub fn create(path: &Path) -> Result<Connection> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let conn = Connection::open(path).map_err(|e| Error::Unavailable(e.to_string()))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;
    configure(&conn)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Open a private in-memory database with the schema already created
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(|e| Error::Unavailable(e.to_string()))?;
    configure(&conn)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Apply per-connection settings: FK enforcement, busy timeout, and the
/// `norm_key` SQL function.
pub fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    register_functions(conn)?;
    Ok(())
}

/// Register the `norm_key(name)` scalar function on a connection.
/// Re-registering replaces the previous definition.
pub fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        NORM_KEY_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let name: Option<String> = ctx.get(0)?;
            Ok(name.map(|n| normalize_key(&n)))
        },
    )?;
    Ok(())
}

/// Create all five tables (parents first) and their indexes
pub fn create_schema(conn: &Connection) -> Result<()> {
    let order = DependencyResolver::new()
        .creation_order()
        .map_err(Error::Integrity)?;

    for schema in order {
        conn.execute(&generate_create_table(schema), [])?;
        for index_sql in generate_indexes(schema) {
            conn.execute(&index_sql, [])?;
        }
    }

    Ok(())
}

/// Row count per table, in registry order
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>> {
    ALL_TABLES
        .iter()
        .map(|schema| {
            let sql = format!("SELECT COUNT(*) FROM {}", schema.name);
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok((schema.name, count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = open(&dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[test]
    fn test_create_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        std::fs::write(&path, "not a database").unwrap();

        let conn = create(&path).unwrap();
        assert_eq!(table_counts(&conn).unwrap().len(), 5);
        drop(conn);

        assert!(open(&path).is_ok());
    }

    #[test]
    fn test_in_memory_store_has_empty_tables() {
        let conn = open_in_memory().unwrap();
        let counts = table_counts(&conn).unwrap();
        assert_eq!(counts.len(), 5);
        assert!(counts.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_norm_key_function() {
        let conn = open_in_memory().unwrap();
        let key: String = conn
            .query_row("SELECT norm_key(?1)", ["  Run-Away"], |row| row.get(0))
            .unwrap();
        assert_eq!(key, "run away");

        let null: Option<String> = conn
            .query_row("SELECT norm_key(NULL)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(null, None);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = open_in_memory().unwrap();
        let result = conn.execute(
            "INSERT INTO pokemon (id, name, type1_id) VALUES (1, 'Pikachu', 42)",
            [],
        );
        assert!(result.is_err());
    }
}
