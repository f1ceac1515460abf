pub mod cli;
pub mod error;
pub mod import;
pub mod normalize;
pub mod parser;
pub mod provider;
pub mod query;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod ui;

pub use cli::{Cli, Commands, LookupKind};
pub use error::{Error, Result};
pub use import::{import_pokemon, FixedTrainer, ImportedPokemon, RandomTrainer, TrainerSelector};
pub use provider::{PokeApiClient, PokemonProvider, PokemonRecord, StaticProvider};
pub use query::{Lookup, QueryMode};
pub use reconcile::{reconcile, verify_integrity, ReconcileReport, ReconcileRules};
pub use ui::{LogUi, Phase, SilentUi, Ui, UiApp};
