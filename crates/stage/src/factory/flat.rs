//! Two-level configuration factory
//!
//! Builds `group -> {key: value}`. The first attribute step selects the
//! group, the second selects a key, and a value step commits
//! `group[key] = value` and returns to the group so further keys chain:
//!
//! ```
//! use stage::{Factory, FlatFactory};
//!
//! let mut conf = FlatFactory::new();
//! conf.attr("db")
//!     .attr("port")
//!     .call(5432)?
//!     .attr("host")
//!     .call("localhost")?;
//! assert_eq!(conf.committed()["db"].as_dict().map(|d| d.len()), Some(2));
//! # Ok::<(), stage::StageError>(())
//! ```

use figment::value::Tag;
use tracing::trace;
use types::{is_reserved, BuildError, Dict, Result, Value};

use super::{pack_arguments, Factory};

/// Cursor position of a flat builder session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Cursor {
    #[default]
    Idle,
    Group(String),
    Key { group: String, key: String },
}

/// Flat (two level deep) configuration factory
#[derive(Debug, Clone, Default)]
pub struct FlatFactory {
    committed: Dict,
    cursor: Cursor,
}

impl FlatFactory {
    /// Create an idle factory with nothing committed
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a group; only valid while idle
    pub fn group(&mut self, name: &str) -> Result<&mut Self> {
        match &self.cursor {
            Cursor::Idle => {
                self.cursor = Cursor::Group(name.to_string());
                Ok(self)
            }
            Cursor::Group(current) | Cursor::Key { group: current, .. } => {
                Err(BuildError::GroupInProgress {
                    current: current.clone(),
                    requested: name.to_string(),
                }
                .into())
            }
        }
    }

    /// Select a key within the current group, replacing any pending key
    pub fn key(&mut self, name: &str) -> Result<&mut Self> {
        let group = match &self.cursor {
            Cursor::Idle => {
                return Err(BuildError::NoActiveGroup {
                    key: name.to_string(),
                }
                .into())
            }
            Cursor::Group(group) | Cursor::Key { group, .. } => group.clone(),
        };
        self.cursor = Cursor::Key {
            group,
            key: name.to_string(),
        };
        Ok(self)
    }

    /// Commit a value for the selected key
    pub fn value<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self> {
        self.call(value)
    }

    /// Currently selected group, if any
    pub fn current_group(&self) -> Option<&str> {
        match &self.cursor {
            Cursor::Idle => None,
            Cursor::Group(group) | Cursor::Key { group, .. } => Some(group),
        }
    }

    /// Key awaiting a value, if any
    pub fn current_key(&self) -> Option<&str> {
        match &self.cursor {
            Cursor::Key { key, .. } => Some(key),
            _ => None,
        }
    }

    fn commit(&mut self, value: Value) -> Result<&mut Self> {
        let (group, key) = match std::mem::take(&mut self.cursor) {
            Cursor::Key { group, key } => (group, key),
            other => {
                self.cursor = other;
                return Err(BuildError::NoActiveKey.into());
            }
        };

        trace!(group = %group, key = %key, "committing flat entry");
        let slot = self
            .committed
            .entry(group.clone())
            .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
        if !matches!(slot, Value::Dict(..)) {
            *slot = Value::Dict(Tag::Default, Dict::new());
        }
        if let Value::Dict(_, entries) = slot {
            entries.insert(key, value);
        }

        self.cursor = Cursor::Group(group);
        Ok(self)
    }
}

impl Factory for FlatFactory {
    fn committed(&self) -> &Dict {
        &self.committed
    }

    fn into_committed(self) -> Dict {
        self.committed
    }

    fn attr(&mut self, name: &str) -> &mut Self {
        if is_reserved(name) {
            return self;
        }
        self.cursor = match std::mem::take(&mut self.cursor) {
            Cursor::Idle => Cursor::Group(name.to_string()),
            Cursor::Group(group) => Cursor::Key {
                group,
                key: name.to_string(),
            },
            // a third step has no meaning here
            pending @ Cursor::Key { .. } => pending,
        };
        self
    }

    fn call<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self> {
        self.commit(value.into())
    }

    fn call_many<I, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.commit(pack_arguments(values))
    }

    fn exit(&mut self) {
        self.cursor = Cursor::Idle;
    }
}
