use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use super::{PokemonProvider, PokemonRecord};
use crate::error::{Error, Result};
use crate::normalize::normalize_key;

pub const DEFAULT_API_URL: &str = "https://pokeapi.co/api/v2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiPokemon {
    name: String,
    types: Vec<ApiTypeSlot>,
    abilities: Vec<ApiAbilitySlot>,
}

#[derive(Debug, Deserialize)]
struct ApiTypeSlot {
    slot: u32,
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Debug, Deserialize)]
struct ApiAbilitySlot {
    slot: u32,
    ability: NamedResource,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

/// Parse a `/pokemon/{name}` response body into a record
pub fn parse_pokemon(body: &str) -> Result<PokemonRecord> {
    let mut api: ApiPokemon = serde_json::from_str(body)?;
    api.types.sort_by_key(|t| t.slot);
    api.abilities.sort_by_key(|a| a.slot);

    Ok(PokemonRecord {
        name: api.name,
        types: api.types.into_iter().map(|t| t.kind.name).collect(),
        abilities: api.abilities.into_iter().map(|a| a.ability.name).collect(),
    })
}

/// Blocking client for the public PokeAPI
pub struct PokeApiClient {
    client: Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pokedex-reconcile/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn pokemon_url(&self, name: &str) -> String {
        format!("{}/pokemon/{}", self.base_url, normalize_key(name).replace(' ', "-"))
    }
}

impl PokemonProvider for PokeApiClient {
    fn fetch(&self, name: &str) -> Result<Option<PokemonRecord>> {
        let url = self.pokemon_url(name);
        tracing::debug!(%url, "fetching pokemon");

        let response = self.client.get(&url).send()?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text()?;
                parse_pokemon(&body).map(Some)
            }
            status => Err(Error::Provider(format!("GET {} returned {}", url, status))),
        }
    }
}
