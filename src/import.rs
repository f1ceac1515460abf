//! Adds a pokemon fetched from a [`PokemonProvider`] to a reconciled store.
//!
//! Type and ability rows are reused when a row with the same normalized name
//! exists and created otherwise, so an import never reintroduces a
//! duplicate. Each ability gets one link row owned by a trainer picked by a
//! [`TrainerSelector`]. Everything is written in one transaction.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::normalize::{canonical_name, normalize_key};
use crate::provider::PokemonProvider;
use crate::schema::EntityTable;
use crate::store::register_functions;

/// Chooses the owning trainer for each new link row
pub trait TrainerSelector {
    /// Pick one of `trainer_ids`; `None` when there is nothing to pick
    fn select(&mut self, trainer_ids: &[i64]) -> Option<i64>;
}

/// Uniformly random choice among existing trainers
pub struct RandomTrainer {
    rng: StdRng,
}

impl RandomTrainer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible selection
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerSelector for RandomTrainer {
    fn select(&mut self, trainer_ids: &[i64]) -> Option<i64> {
        trainer_ids.choose(&mut self.rng).copied()
    }
}

/// Always the same trainer id, whether or not it exists
pub struct FixedTrainer(pub i64);

impl TrainerSelector for FixedTrainer {
    fn select(&mut self, _trainer_ids: &[i64]) -> Option<i64> {
        Some(self.0)
    }
}

/// Rows written by one successful import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedPokemon {
    pub id: i64,
    pub name: String,
    pub type_ids: Vec<i64>,
    pub ability_ids: Vec<i64>,
    pub trainer_ids: Vec<i64>,
}

/// Fetch `name` from `provider` and insert it with its types, abilities,
/// and one link row per ability.
///
/// The stored name is the provider's name for the pokemon, so an alias such
/// as a numeric id cannot add a second row for an existing pokemon.
///
/// Errors: `Conflict` if a pokemon with the same normalized name exists,
/// `NotFound` if the provider has no such pokemon, `Integrity` if there is
/// no trainer to own it. Any failure leaves the store untouched.
pub fn import_pokemon(
    conn: &mut Connection,
    provider: &impl PokemonProvider,
    selector: &mut impl TrainerSelector,
    name: &str,
) -> Result<ImportedPokemon> {
    if normalize_key(name).is_empty() {
        return Err(Error::NotFound("empty pokemon name".into()));
    }

    register_functions(conn)?;
    ensure_absent(conn, name)?;

    let record = provider.fetch(name)?.ok_or_else(|| {
        Error::NotFound(format!("pokemon {:?} is unknown to the provider", name))
    })?;
    let display_name = canonical_name(&record.name);
    if display_name.is_empty() {
        return Err(Error::Provider(format!("pokemon {:?} has no name", name)));
    }
    if record.types.is_empty() {
        return Err(Error::Provider(format!("pokemon {:?} has no types", name)));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Checked again under the write lock, against the provider's name
    ensure_absent(&tx, &record.name)?;

    let mut type_ids = Vec::new();
    for type_name in &record.types {
        let id = find_or_create(&tx, EntityTable::Types, type_name)?;
        if !type_ids.contains(&id) {
            type_ids.push(id);
        }
    }
    type_ids.truncate(2);

    tx.execute(
        "INSERT INTO pokemon (name, type1_id, type2_id) VALUES (?1, ?2, ?3)",
        params![display_name, type_ids[0], type_ids.get(1)],
    )?;
    let pokemon_id = tx.last_insert_rowid();

    let trainers: Vec<i64> = {
        let mut stmt = tx.prepare("SELECT id FROM trainers ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        ids
    };

    let mut ability_ids = Vec::new();
    let mut trainer_ids = Vec::new();
    for ability_name in &record.abilities {
        let ability_id = find_or_create(&tx, EntityTable::Abilities, ability_name)?;
        let trainer_id = selector.select(&trainers).ok_or_else(|| {
            Error::Integrity(format!("no trainers exist to own {:?}", display_name))
        })?;

        tx.execute(
            "INSERT INTO trainer_pokemon_abilities (trainer_id, pokemon_id, ability_id)
             VALUES (?1, ?2, ?3)",
            params![trainer_id, pokemon_id, ability_id],
        )?;

        ability_ids.push(ability_id);
        trainer_ids.push(trainer_id);
    }

    tx.commit()?;
    tracing::info!(
        id = pokemon_id,
        name = %display_name,
        types = type_ids.len(),
        abilities = ability_ids.len(),
        "imported pokemon"
    );

    Ok(ImportedPokemon {
        id: pokemon_id,
        name: display_name,
        type_ids,
        ability_ids,
        trainer_ids,
    })
}

fn ensure_absent(conn: &Connection, name: &str) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM pokemon WHERE norm_key(name) = ?1 ORDER BY id LIMIT 1",
            [normalize_key(name)],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => Err(Error::Conflict(format!(
            "pokemon {:?} already exists with id {}",
            name, id
        ))),
        None => Ok(()),
    }
}

/// Id of the row named like `raw_name`, inserting it under its canonical
/// name when missing
fn find_or_create(conn: &Connection, table: EntityTable, raw_name: &str) -> Result<i64> {
    let select = format!(
        "SELECT id FROM {} WHERE norm_key(name) = ?1 ORDER BY id LIMIT 1",
        table
    );
    if let Some(id) = conn
        .query_row(&select, [normalize_key(raw_name)], |row| row.get(0))
        .optional()?
    {
        return Ok(id);
    }

    let name = canonical_name(raw_name);
    conn.execute(&format!("INSERT INTO {} (name) VALUES (?1)", table), [&name])?;
    let id = conn.last_insert_rowid();
    tracing::debug!(%table, id, %name, "created row");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let ids = [3, 7, 11, 19];
        let picks = |seed| {
            let mut selector = RandomTrainer::seeded(seed);
            (0..8).map(|_| selector.select(&ids).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
        assert!(picks(42).iter().all(|id| ids.contains(id)));
    }

    #[test]
    fn test_random_selection_reaches_every_trainer() {
        let ids = [1, 2, 3];
        let mut selector = RandomTrainer::seeded(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(selector.select(&ids).unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_random_selection_from_nothing() {
        assert_eq!(RandomTrainer::seeded(1).select(&[]), None);
    }
}
