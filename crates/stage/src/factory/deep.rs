//! Three-level configuration factory
//!
//! Attribute steps only pick a key (upper-cased). Levels are opened with
//! scopes: the first scope becomes the slot `committed[KEY]`, a scope opened
//! inside it becomes `committed[KEY][INNER]`. Each level is committed when
//! its scope closes.

use figment::value::Tag;
use tracing::{debug, trace};
use types::{canonical_key, canonicalize, is_reserved, BuildError, Dict, Result, Value};

use super::{pack_arguments, Factory};

/// Scopes that may be open at once: the canonical slot and one nested level
pub const MAX_NESTING: usize = 2;

/// One open scope: the key it is filed under and its entries so far
#[derive(Debug, Clone)]
struct Frame {
    key: String,
    entries: Dict,
}

/// Deep (three level) configuration factory
#[derive(Debug, Clone, Default)]
pub struct DeepFactory {
    committed: Dict,
    key: Option<String>,
    frames: Vec<Frame>,
}

impl DeepFactory {
    /// Create a factory with no open scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Key selected by the last attribute step
    pub fn current_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn store(&mut self, value: Value) -> Result<&mut Self> {
        let frame = self.frames.last_mut().ok_or(BuildError::NoActiveScope)?;
        let key = self.key.clone().ok_or(BuildError::NoActiveKey)?;
        trace!(scope = %frame.key, key = %key, "storing deep entry");
        frame.entries.insert(key, value);
        Ok(self)
    }
}

impl Factory for DeepFactory {
    fn committed(&self) -> &Dict {
        &self.committed
    }

    fn into_committed(self) -> Dict {
        self.committed
    }

    fn attr(&mut self, name: &str) -> &mut Self {
        if !is_reserved(name) {
            self.key = Some(canonical_key(name));
        }
        self
    }

    fn call<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self> {
        self.store(canonicalize(value.into()))
    }

    fn call_many<I, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values
            .into_iter()
            .map(|value| canonicalize(value.into()))
            .collect();
        self.store(pack_arguments(values))
    }

    /// Open a level named by the selected key.
    ///
    /// The key is consumed: a value step right after entering fails with
    /// [`BuildError::NoActiveKey`] until another attribute step selects a key.
    fn enter(&mut self) -> Result<&mut Self> {
        if self.frames.len() >= MAX_NESTING {
            return Err(BuildError::ScopeTooDeep { max: MAX_NESTING }.into());
        }
        // the selected key names the new level, it is not a pending value
        let key = self.key.take().ok_or(BuildError::NoActiveKey)?;
        trace!(key = %key, depth = self.frames.len() + 1, "entering scope");
        self.frames.push(Frame {
            key,
            entries: Dict::new(),
        });
        Ok(self)
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn exit(&mut self) {
        self.key = None;
        let Some(frame) = self.frames.pop() else {
            return;
        };

        let level = Value::Dict(Tag::Default, frame.entries);
        match self.frames.last_mut() {
            Some(parent) => {
                debug!(key = %frame.key, parent = %parent.key, "filing nested scope");
                parent.entries.insert(frame.key, level);
            }
            None => {
                debug!(key = %frame.key, "committing scope");
                self.committed.insert(frame.key, level);
            }
        }
    }
}
