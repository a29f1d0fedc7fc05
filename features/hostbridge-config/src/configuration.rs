use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use serde::de::DeserializeOwned;

use crate::{bind, errors::ConfigError};

/// Separator between the segments of a configuration key
pub const KEY_DELIMITER: char = ':';

#[derive(Clone, Debug)]
struct Entry {
    /// Key as it was first registered
    key: String,
    value: Option<String>,
}

/// Immutable flat view over all loaded configuration values.
///
/// Keys are `:` separated and looked up case-insensitively. A key can map to
/// an empty string, which is different from a key that has no value.
#[derive(Clone, Default)]
pub struct Configuration {
    entries: Arc<BTreeMap<String, Entry>>,
}

impl Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.values().map(|e| (&e.key, &e.value)))
            .finish()
    }
}

impl Configuration {
    /// Builds a configuration from pairs, later pairs override earlier ones
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            match entries.get_mut(&normalize(&key)) {
                Some(existing) => existing.value = value,
                None => {
                    entries.insert(normalize(&key), Entry { key, value });
                }
            }
        }
        Configuration {
            entries: Arc::new(entries),
        }
    }

    /// Value of `key`; `None` if the key is absent or has no value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&normalize(key))
            .and_then(|entry| entry.value.as_deref())
    }

    /// Distinguishes an absent key (`None`) from a key without value (`Some(None)`)
    pub fn get_entry(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .get(&normalize(key))
            .map(|entry| entry.value.as_deref())
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    /// The sub-view below `prefix:`, with the prefix stripped from the keys
    pub fn section(&self, prefix: &str) -> Configuration {
        let mut wanted = normalize(prefix);
        wanted.push(KEY_DELIMITER);

        let entries = self
            .entries
            .iter()
            .filter_map(|(normalized, entry)| {
                normalized.strip_prefix(&wanted)?;
                // Strip by length so the stored casing survives
                let key = entry.key[wanted.len()..].to_string();
                Some((
                    normalize(&key),
                    Entry {
                        key,
                        value: entry.value.clone(),
                    },
                ))
            })
            .collect();

        Configuration {
            entries: Arc::new(entries),
        }
    }

    /// Registered keys, ordered case-insensitively
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .values()
            .map(|entry| (entry.key.as_str(), entry.value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deserializes the whole view into `T`.
    ///
    /// Struct fields are matched ignoring case and `_`, so `HeaderName` binds `header_name`.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        bind::bind(self.iter(), "")
    }

    /// Deserializes the section below `prefix` into `T`
    pub fn bind_section<T: DeserializeOwned>(&self, prefix: &str) -> Result<T, ConfigError> {
        bind::bind(self.section(prefix).iter(), prefix)
    }
}

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}
