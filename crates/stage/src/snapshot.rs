//! Frozen configuration snapshots

use std::collections::btree_map;
use std::sync::Arc;

use figment::{providers::Serialized, Figment};
use serde::{de::DeserializeOwned, Serialize, Serializer};
use types::{Dict, Result, StageError, Value};

use crate::factory::render_dict;

/// Immutable, ordered configuration mapping.
///
/// Clones share the same entries; nothing can be inserted or removed once a
/// snapshot exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Arc<Dict>,
}

impl Snapshot {
    pub(crate) fn new(entries: Dict) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Top-level entry
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Entry at a dotted path, walking nested dicts
    pub fn find(&self, path: &str) -> Option<&Value> {
        let mut keys = path.split('.');
        let mut current = self.entries.get(keys.next()?)?;
        for key in keys {
            current = current.as_dict()?.get(key)?;
        }
        Some(current)
    }

    /// Whether a top-level key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of top-level entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-level keys in order
    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.entries.keys()
    }

    /// Top-level entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Borrow the underlying mapping
    pub fn as_dict(&self) -> &Dict {
        &self.entries
    }

    /// Independent, mutable copy of the entries
    pub fn to_dict(&self) -> Dict {
        self.entries.as_ref().clone()
    }

    /// Deserialize the snapshot into a typed configuration
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        Figment::new()
            .merge(Serialized::defaults(self.to_dict()))
            .extract()
            .map_err(|e| StageError::Extract(e.to_string()))
    }

    /// Debug view of the entries
    pub fn render(&self) -> Result<String> {
        render_dict(&self.entries)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
