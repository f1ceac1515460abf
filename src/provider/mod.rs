//! External Pokémon data source used by the importer.

pub mod cache;
pub mod client;

pub use cache::*;
pub use client::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::normalize::normalize_key;

/// What the provider knows about one pokemon. Both lists keep the
/// provider's slot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub name: String,
    pub types: Vec<String>,
    pub abilities: Vec<String>,
}

/// Lookup-by-name service. `Ok(None)` means the provider has no such pokemon.
pub trait PokemonProvider {
    fn fetch(&self, name: &str) -> Result<Option<PokemonRecord>>;
}

impl<P: PokemonProvider + ?Sized> PokemonProvider for &P {
    fn fetch(&self, name: &str) -> Result<Option<PokemonRecord>> {
        (**self).fetch(name)
    }
}

/// In-memory provider for tests and offline fixtures, keyed by normalized name
#[derive(Debug, Default, Clone)]
pub struct StaticProvider {
    records: HashMap<String, PokemonRecord>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, types: &[&str], abilities: &[&str]) -> Self {
        self.insert(PokemonRecord {
            name: name.to_string(),
            types: types.iter().map(|s| s.to_string()).collect(),
            abilities: abilities.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn insert(&mut self, record: PokemonRecord) {
        self.records.insert(normalize_key(&record.name), record);
    }
}

impl PokemonProvider for StaticProvider {
    fn fetch(&self, name: &str) -> Result<Option<PokemonRecord>> {
        Ok(self.records.get(&normalize_key(name)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_lookup_ignores_case() {
        let provider = StaticProvider::new().with("charizard", &["fire", "flying"], &["blaze"]);
        let record = provider.fetch("Charizard").unwrap().unwrap();
        assert_eq!(record.types, vec!["fire", "flying"]);
        assert!(provider.fetch("mew").unwrap().is_none());
    }
}
