//! Shared fixtures for the integration tests.
//!
//! `tests/fixtures/` holds a small raw dataset with every defect the
//! reconciler repairs: case and separator variants, known typos, a corrupt
//! ability, an unused placeholder type and a reference to a type that was
//! never exported.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

use pokedex_reconcile::reconcile::{reconcile, ReconcileRules};
use pokedex_reconcile::store::{self, load_dataset};
use pokedex_reconcile::ui::SilentUi;

pub static FIXTURE_DIR: Lazy<PathBuf> =
    Lazy::new(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures"));

/// Built-in corrections plus the fixture's removal rules
pub static FIXTURE_RULES: Lazy<ReconcileRules> = Lazy::new(|| {
    ReconcileRules::default().extend(
        ReconcileRules::from_file(&FIXTURE_DIR.join("rules.json"))
            .expect("fixture rules should parse"),
    )
});

/// A database file in its own temporary directory
pub struct TestDb {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn open(&self) -> Connection {
        store::open(&self.path).expect("test database should open")
    }
}

/// The raw fixture dataset, loaded but not reconciled
pub fn raw_db() -> TestDb {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("pokemon_assessment.db");
    load_dataset(&FIXTURE_DIR, &path, &mut SilentUi).expect("fixture dataset should load");
    TestDb { _dir: dir, path }
}

/// The fixture dataset after a successful reconciliation
pub fn reconciled_db() -> TestDb {
    let db = raw_db();
    let mut conn = db.open();
    reconcile(&mut conn, &FIXTURE_RULES, &mut SilentUi).expect("fixture should reconcile");
    db
}

pub fn names(conn: &Connection, table: &str) -> Vec<(i64, String)> {
    let mut stmt = conn
        .prepare(&format!("SELECT id, name FROM {} ORDER BY id", table))
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

/// Link rows as (trainer, pokemon, ability), sorted
pub fn links(conn: &Connection) -> Vec<(i64, i64, i64)> {
    let mut stmt = conn
        .prepare(
            "SELECT trainer_id, pokemon_id, ability_id FROM trainer_pokemon_abilities
             ORDER BY trainer_id, pokemon_id, ability_id",
        )
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

/// Every row of every table rendered as text, for before/after comparisons
pub fn snapshot(conn: &Connection) -> Vec<String> {
    let mut out = Vec::new();
    for table in pokedex_reconcile::schema::table_names() {
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", table))
            .unwrap();
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(width);
                for i in 0..width {
                    let cell: rusqlite::types::Value = row.get(i)?;
                    cells.push(format!("{:?}", cell));
                }
                Ok(format!("{}: {}", table, cells.join(" | ")))
            })
            .unwrap();
        for row in rows {
            out.push(row.unwrap());
        }
    }
    out
}

pub fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}
