use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub const fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
        }
    }
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: false,
        }
    }
}

/// Foreign key reference
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    pub const fn new(column: &'static str, references_table: &'static str) -> Self {
        Self {
            column,
            references_table,
            references_column: "id",
        }
    }
}

/// Non-unique index definition. Names are not unique-constrained: raw
/// data is loaded with its duplicates and reconciliation removes them.
#[derive(Debug, Clone)]
pub struct Index {
    pub columns: &'static [&'static str],
}

impl Index {
    pub const fn on(columns: &'static [&'static str]) -> Self {
        Self { columns }
    }
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub source_file: &'static str,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [ForeignKey],
    /// Extra indexes beyond the per-foreign-key ones
    pub indexes: &'static [Index],
}

impl TableSchema {
    /// Get all tables this table depends on (FK parents)
    pub fn dependencies(&self) -> HashSet<&'static str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table)
            .collect()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

/// The four named entity tables. The link table is not an entity: it is
/// never deduplicated, only kept free of stale ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Pokemon,
    Types,
    Abilities,
    Trainers,
}

impl EntityTable {
    pub const ALL: [EntityTable; 4] = [
        EntityTable::Abilities,
        EntityTable::Pokemon,
        EntityTable::Trainers,
        EntityTable::Types,
    ];

    pub const fn table_name(self) -> &'static str {
        match self {
            EntityTable::Pokemon => "pokemon",
            EntityTable::Types => "types",
            EntityTable::Abilities => "abilities",
            EntityTable::Trainers => "trainers",
        }
    }
}

impl fmt::Display for EntityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_tables_are_registered() {
        for table in EntityTable::ALL {
            let schema = crate::schema::get_table(table.table_name()).unwrap();
            assert!(schema.foreign_keys.iter().all(|fk| fk.column != "name"));
            assert_eq!(schema.columns[1].name, "name");
        }
    }

    #[test]
    fn test_entity_table_serde_name() {
        let json = serde_json::to_string(&EntityTable::Abilities).unwrap();
        assert_eq!(json, "\"abilities\"");
    }
}
