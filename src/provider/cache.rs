use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::{PokemonProvider, PokemonRecord};
use crate::error::{Error, Result};
use crate::normalize::normalize_key;

/// On-disk store of provider records, one JSON file per pokemon
pub struct ResponseCache {
    cache_dir: PathBuf,
}

impl ResponseCache {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let cache_dir = match custom_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "pokedex-reconcile")
                .ok_or_else(|| Error::Unavailable("could not determine cache directory".into()))?
                .cache_dir()
                .join("pokemon"),
        };

        fs::create_dir_all(&cache_dir)?;

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Entry path for `name`. Anything but letters and digits becomes `-`,
    /// so the path never leaves the cache directory.
    fn record_path(&self, name: &str) -> PathBuf {
        let file: String = normalize_key(name)
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        self.cache_dir.join(format!("{}.json", file))
    }

    /// A cached record, or `None` on a miss. Unreadable entries count as misses.
    pub fn get(&self, name: &str) -> Option<PokemonRecord> {
        let path = self.record_path(name);
        let json = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    pub fn put(&self, name: &str, record: &PokemonRecord) -> Result<()> {
        fs::write(self.record_path(name), serde_json::to_string_pretty(record)?)?;
        Ok(())
    }
}

/// Serves found records from a [`ResponseCache`] before asking `inner`.
/// Not-found answers are never cached.
pub struct CachedProvider<P> {
    inner: P,
    cache: ResponseCache,
}

impl<P: PokemonProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }
}

impl<P: PokemonProvider> PokemonProvider for CachedProvider<P> {
    fn fetch(&self, name: &str) -> Result<Option<PokemonRecord>> {
        if let Some(record) = self.cache.get(name) {
            tracing::debug!(name, "provider cache hit");
            return Ok(Some(record));
        }

        let record = self.inner.fetch(name)?;
        if let Some(record) = &record {
            if let Err(e) = self.cache.put(name, record) {
                tracing::warn!(name, error = %e, "failed to cache provider record");
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;
    use std::cell::Cell;

    struct CountingProvider {
        inner: StaticProvider,
        calls: Cell<usize>,
    }

    impl PokemonProvider for CountingProvider {
        fn fetch(&self, name: &str) -> Result<Option<PokemonRecord>> {
            self.calls.set(self.calls.get() + 1);
            self.inner.fetch(name)
        }
    }

    #[test]
    fn test_second_fetch_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(Some(dir.path().to_path_buf())).unwrap();
        let provider = CachedProvider::new(
            CountingProvider {
                inner: StaticProvider::new().with(
                    "mr-mime",
                    &["psychic", "fairy"],
                    &["soundproof"],
                ),
                calls: Cell::new(0),
            },
            cache,
        );

        let first = provider.fetch("mr-mime").unwrap().unwrap();
        let second = provider.fetch("Mr Mime").unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.inner.calls.get(), 1);
        assert!(dir.path().join("mr-mime.json").exists());
    }

    #[test]
    fn test_not_found_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(Some(dir.path().to_path_buf())).unwrap();
        let provider = CachedProvider::new(StaticProvider::new(), cache);

        assert!(provider.fetch("missingno").unwrap().is_none());
        assert!(!dir.path().join("missingno.json").exists());
    }

    #[test]
    fn test_entry_names_stay_inside_cache_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("cache");
        let cache = ResponseCache::new(Some(dir.clone())).unwrap();
        let record = PokemonRecord {
            name: "escape".into(),
            types: vec!["normal".into()],
            abilities: vec![],
        };

        cache.put("../escape", &record).unwrap();
        cache.put("/tmp/x", &record).unwrap();

        assert!(!root.path().join("escape.json").exists());
        assert!(dir.join("---escape.json").exists());
        assert!(dir.join("-tmp-x.json").exists());
        assert_eq!(cache.get("../escape"), Some(record));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mew.json"), "{not json").unwrap();
        let cache = ResponseCache::new(Some(dir.path().to_path_buf())).unwrap();
        assert!(cache.get("mew").is_none());
    }
}
