use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::query::Lookup;

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(version, about = "Reconcile, query and extend a Pokémon SQLite dataset")]
pub struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "POKEDEX_DB", default_value = "pokemon_assessment.db")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load raw JSONL files into a fresh database (replaces --db)
    Load {
        /// Directory containing pokemon.jsonl, types.jsonl, ...
        input_dir: PathBuf,
    },

    /// Correct, repoint and deduplicate the database in one transaction
    Reconcile {
        /// Extra corrections and corrupt-row removals (JSON)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Ignore the built-in typo map
        #[arg(long)]
        no_builtin: bool,

        /// Show a terminal dashboard
        #[arg(long)]
        tui: bool,
    },

    /// Report dangling references and duplicate names without changing anything
    Check,

    /// Row counts per table
    Stats,

    /// Name-keyed lookups against the reconciled database
    Query {
        #[arg(value_enum)]
        kind: LookupKind,

        /// Exact, case-sensitive name
        name: String,

        /// Print an empty list instead of failing on storage errors
        #[arg(long)]
        empty_on_error: bool,
    },

    /// Fetch a pokemon from the provider and add it with its types and abilities
    Import {
        name: String,

        /// Provider base URL
        #[arg(long, default_value = crate::provider::DEFAULT_API_URL)]
        api_url: String,

        /// Custom provider cache directory
        #[arg(short, long)]
        cache_dir: Option<PathBuf>,

        /// Always ask the provider
        #[arg(long)]
        no_cache: bool,

        /// Seed for trainer selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List all table names
    ListTables,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LookupKind {
    /// Pokemon with an ability
    Ability,
    /// Pokemon of a type
    Type,
    /// Trainers owning a pokemon
    Trainers,
    /// Abilities of a pokemon
    Abilities,
}

impl From<LookupKind> for Lookup {
    fn from(kind: LookupKind) -> Self {
        match kind {
            LookupKind::Ability => Lookup::PokemonByAbility,
            LookupKind::Type => Lookup::PokemonByType,
            LookupKind::Trainers => Lookup::TrainersByPokemon,
            LookupKind::Abilities => Lookup::AbilitiesByPokemon,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli =
            Cli::try_parse_from(["pokedex", "--db", "x.db", "query", "ability", "Static"]).unwrap();
        assert_eq!(cli.db, PathBuf::from("x.db"));
        match cli.command {
            Commands::Query { kind, name, empty_on_error } => {
                assert_eq!(Lookup::from(kind), Lookup::PokemonByAbility);
                assert_eq!(name, "Static");
                assert!(!empty_on_error);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_import_with_seed() {
        let cli = Cli::try_parse_from([
            "pokedex",
            "import",
            "charizard",
            "--seed",
            "7",
            "--no-cache",
        ])
        .unwrap();
        match cli.command {
            Commands::Import { name, seed, no_cache, api_url, .. } => {
                assert_eq!(name, "charizard");
                assert_eq!(seed, Some(7));
                assert!(no_cache);
                assert_eq!(api_url, crate::provider::DEFAULT_API_URL);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
