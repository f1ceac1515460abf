//! Table schema definitions for the Pokémon dataset

use super::types::*;

// =============================================================================
// Entity Tables
// =============================================================================

pub static TYPES: TableSchema = TableSchema {
    name: "types",
    source_file: "types.jsonl",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("name", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[Index::on(&["name"])],
};

pub static ABILITIES: TableSchema = TableSchema {
    name: "abilities",
    source_file: "abilities.jsonl",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("name", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[Index::on(&["name"])],
};

pub static TRAINERS: TableSchema = TableSchema {
    name: "trainers",
    source_file: "trainers.jsonl",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("name", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[Index::on(&["name"])],
};

pub static POKEMON: TableSchema = TableSchema {
    name: "pokemon",
    source_file: "pokemon.jsonl",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("name", ColumnType::Text),
        Column::required("type1_id", ColumnType::Integer),
        Column::new("type2_id", ColumnType::Integer),
    ],
    foreign_keys: &[
        ForeignKey::new("type1_id", "types"),
        ForeignKey::new("type2_id", "types"),
    ],
    indexes: &[Index::on(&["name"])],
};

// =============================================================================
// Link Table
// =============================================================================

pub static TRAINER_POKEMON_ABILITIES: TableSchema = TableSchema {
    name: "trainer_pokemon_abilities",
    source_file: "trainer_pokemon_abilities.jsonl",
    columns: &[
        Column::required("trainer_id", ColumnType::Integer),
        Column::required("pokemon_id", ColumnType::Integer),
        Column::required("ability_id", ColumnType::Integer),
    ],
    foreign_keys: &[
        ForeignKey::new("trainer_id", "trainers"),
        ForeignKey::new("pokemon_id", "pokemon"),
        ForeignKey::new("ability_id", "abilities"),
    ],
    indexes: &[],
};

// =============================================================================
// Schema Registry
// =============================================================================

/// All table schemas in dependency order
pub static ALL_TABLES: &[&TableSchema] = &[
    &TYPES,
    &ABILITIES,
    &TRAINERS,
    &POKEMON,
    &TRAINER_POKEMON_ABILITIES,
];

/// Get table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().find(|t| t.name == name).copied()
}

/// Get all table names
pub fn table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}
