use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::schema::{EntityTable, ALL_TABLES};

/// A foreign-key value with no matching parent row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DanglingReference {
    pub table: &'static str,
    pub column: &'static str,
    /// SQLite rowid of the child row
    pub row_id: i64,
    pub missing_id: i64,
}

/// Rows of one entity table sharing a normalized name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub table: EntityTable,
    pub key: String,
    pub count: i64,
    pub lowest_id: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub dangling: Vec<DanglingReference>,
    pub duplicates: Vec<DuplicateGroup>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.duplicates.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for d in &self.dangling {
            parts.push(format!(
                "{}.{} (rowid {}) -> missing id {}",
                d.table, d.column, d.row_id, d.missing_id
            ));
        }
        for g in &self.duplicates {
            parts.push(format!("{} has {} rows named {:?}", g.table, g.count, g.key));
        }
        if parts.is_empty() {
            "no integrity problems".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Scan every foreign key declared in the schema for dangling values, and
/// every entity table for duplicate normalized names. Requires the
/// `norm_key` function on `conn`.
pub fn verify_integrity(conn: &Connection) -> Result<IntegrityReport> {
    let mut report = IntegrityReport::default();

    for schema in ALL_TABLES {
        for fk in schema.foreign_keys {
            let sql = format!(
                "SELECT c.rowid, c.{col} FROM {child} c
                 LEFT JOIN {parent} p ON p.{pcol} = c.{col}
                 WHERE c.{col} IS NOT NULL AND p.{pcol} IS NULL
                 ORDER BY c.rowid",
                col = fk.column,
                child = schema.name,
                parent = fk.references_table,
                pcol = fk.references_column,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok(DanglingReference {
                    table: schema.name,
                    column: fk.column,
                    row_id: row.get(0)?,
                    missing_id: row.get(1)?,
                })
            })?;
            for row in rows {
                report.dangling.push(row?);
            }
        }
    }

    for table in EntityTable::ALL {
        let sql = format!(
            "SELECT norm_key(name) AS norm, COUNT(*), MIN(id) FROM {}
             GROUP BY norm HAVING COUNT(*) > 1 ORDER BY norm",
            table.table_name()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(DuplicateGroup {
                table,
                key: row.get(0)?,
                count: row.get(1)?,
                lowest_id: row.get(2)?,
            })
        })?;
        for row in rows {
            report.duplicates.push(row?);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    #[test]
    fn test_clean_store() {
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO types (id, name) VALUES (1, 'Electric');
             INSERT INTO pokemon (id, name, type1_id) VALUES (1, 'Pikachu', 1);",
        )
        .unwrap();

        let report = verify_integrity(&conn).unwrap();
        assert!(report.is_clean(), "{}", report.summary());
    }

    #[test]
    fn test_detects_dangling_and_duplicates() {
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = OFF;
             INSERT INTO types (id, name) VALUES (1, 'Fire'), (2, 'fire');
             INSERT INTO pokemon (id, name, type1_id, type2_id) VALUES (1, 'Charmander', 1, 24);",
        )
        .unwrap();

        let report = verify_integrity(&conn).unwrap();
        assert_eq!(
            report.dangling,
            vec![DanglingReference {
                table: "pokemon",
                column: "type2_id",
                row_id: 1,
                missing_id: 24,
            }]
        );
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].table, EntityTable::Types);
        assert_eq!(report.duplicates[0].key, "fire");
        assert_eq!(report.duplicates[0].lowest_id, 1);
        assert!(!report.is_clean());
    }
}
