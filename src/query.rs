//! Read-only lookups over a reconciled store.
//!
//! Name matching is exact and case-sensitive. An unknown name yields an
//! empty list. Storage failures are returned as errors unless the caller
//! asks for [`QueryMode::EmptyOnError`].

use rusqlite::Connection;

use crate::error::Result;

/// How a lookup reports storage failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Propagate the error
    #[default]
    Strict,
    /// Log the error and return an empty list
    EmptyOnError,
}

/// The four name-keyed lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    PokemonByAbility,
    PokemonByType,
    TrainersByPokemon,
    AbilitiesByPokemon,
}

impl Lookup {
    fn sql(self) -> &'static str {
        match self {
            Lookup::PokemonByAbility => {
                "SELECT DISTINCT p.name FROM pokemon p
                 INNER JOIN trainer_pokemon_abilities tpa ON p.id = tpa.pokemon_id
                 INNER JOIN abilities a ON a.id = tpa.ability_id
                 WHERE a.name = ?1"
            }
            Lookup::PokemonByType => {
                "SELECT DISTINCT p.name FROM pokemon p
                 INNER JOIN types t ON t.id = p.type1_id OR t.id = p.type2_id
                 WHERE t.name = ?1"
            }
            Lookup::TrainersByPokemon => {
                "SELECT DISTINCT t.name FROM trainers t
                 INNER JOIN trainer_pokemon_abilities tpa ON t.id = tpa.trainer_id
                 INNER JOIN pokemon p ON p.id = tpa.pokemon_id
                 WHERE p.name = ?1"
            }
            Lookup::AbilitiesByPokemon => {
                "SELECT DISTINCT a.name FROM abilities a
                 INNER JOIN trainer_pokemon_abilities tpa ON a.id = tpa.ability_id
                 INNER JOIN pokemon p ON p.id = tpa.pokemon_id
                 WHERE p.name = ?1"
            }
        }
    }

    /// Run the lookup for `name`
    pub fn run(self, conn: &Connection, name: &str, mode: QueryMode) -> Result<Vec<String>> {
        match (self.fetch(conn, name), mode) {
            (Ok(names), _) => Ok(names),
            (Err(err), QueryMode::EmptyOnError) => {
                tracing::warn!(
                    lookup = ?self,
                    name,
                    error = %err,
                    "lookup failed, returning no results"
                );
                Ok(Vec::new())
            }
            (Err(err), QueryMode::Strict) => Err(err),
        }
    }

    fn fetch(self, conn: &Connection, name: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare_cached(self.sql())?;
        let names = stmt
            .query_map([name], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}

/// Pokemon linked to an ability with exactly this name
pub fn pokemon_by_ability(conn: &Connection, ability: &str) -> Result<Vec<String>> {
    Lookup::PokemonByAbility.run(conn, ability, QueryMode::Strict)
}

/// Pokemon whose first or second type has exactly this name
pub fn pokemon_by_type(conn: &Connection, type_name: &str) -> Result<Vec<String>> {
    Lookup::PokemonByType.run(conn, type_name, QueryMode::Strict)
}

/// Trainers linked to a pokemon with exactly this name
pub fn trainers_by_pokemon(conn: &Connection, pokemon: &str) -> Result<Vec<String>> {
    Lookup::TrainersByPokemon.run(conn, pokemon, QueryMode::Strict)
}

/// Abilities linked to a pokemon with exactly this name
pub fn abilities_by_pokemon(conn: &Connection, pokemon: &str) -> Result<Vec<String>> {
    Lookup::AbilitiesByPokemon.run(conn, pokemon, QueryMode::Strict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    fn seeded() -> Connection {
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO types (id, name) VALUES (1, 'Electric'), (2, 'Fire'), (3, 'Flying');
             INSERT INTO abilities (id, name) VALUES
                 (1, 'Static'), (2, 'Blaze'), (3, 'Lightning Rod');
             INSERT INTO trainers (id, name) VALUES (1, 'Ash'), (2, 'Misty');
             INSERT INTO pokemon (id, name, type1_id, type2_id) VALUES
                 (1, 'Pikachu', 1, NULL), (2, 'Charizard', 2, 3);
             INSERT INTO trainer_pokemon_abilities (trainer_id, pokemon_id, ability_id) VALUES
                 (1, 1, 1), (1, 1, 3), (2, 1, 1), (1, 2, 2);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_pokemon_by_ability() {
        let conn = seeded();
        assert_eq!(pokemon_by_ability(&conn, "Static").unwrap(), vec!["Pikachu"]);
        assert_eq!(pokemon_by_ability(&conn, "Blaze").unwrap(), vec!["Charizard"]);
    }

    #[test]
    fn test_pokemon_by_type_checks_both_slots() {
        let conn = seeded();
        assert_eq!(pokemon_by_type(&conn, "Flying").unwrap(), vec!["Charizard"]);
        assert_eq!(pokemon_by_type(&conn, "Fire").unwrap(), vec!["Charizard"]);
    }

    #[test]
    fn test_trainers_and_abilities_by_pokemon() {
        let conn = seeded();
        let mut trainers = trainers_by_pokemon(&conn, "Pikachu").unwrap();
        trainers.sort();
        assert_eq!(trainers, vec!["Ash", "Misty"]);

        let mut abilities = abilities_by_pokemon(&conn, "Pikachu").unwrap();
        abilities.sort();
        assert_eq!(abilities, vec!["Lightning Rod", "Static"]);
    }

    #[test]
    fn test_unknown_and_case_mismatch_are_empty() {
        let conn = seeded();
        assert!(pokemon_by_type(&conn, "Nonexistent").unwrap().is_empty());
        assert!(pokemon_by_ability(&conn, "static").unwrap().is_empty());
        assert!(trainers_by_pokemon(&conn, "Pika").unwrap().is_empty());
        assert!(abilities_by_pokemon(&conn, "Mew").unwrap().is_empty());
    }

    #[test]
    fn test_storage_error_modes() {
        let conn = seeded();
        conn.execute_batch("DROP TABLE trainer_pokemon_abilities;").unwrap();

        assert!(Lookup::PokemonByAbility
            .run(&conn, "Static", QueryMode::Strict)
            .is_err());
        assert_eq!(
            Lookup::PokemonByAbility
                .run(&conn, "Static", QueryMode::EmptyOnError)
                .unwrap(),
            Vec::<String>::new()
        );
    }
}
