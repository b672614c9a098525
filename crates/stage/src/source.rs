//! Configuration sources and the collaborators that load them
//!
//! A [`Source`] is whatever [`crate::Conf`] is asked to load into a bucket:
//! the committed mapping of a factory, a declared configuration type, a
//! dotted path that a [`Resolve`] implementation turns into another source,
//! or something the manager does not understand (ignored).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use figment::value::Tag;
use types::{Dict, LoadError, Result, Value};

use crate::factory::{DeepFactory, Factory, FlatFactory};

/// Something a bucket can be loaded from
#[derive(Debug, Clone, Default)]
pub enum Source {
    /// Committed mapping of a factory
    Factory(Dict),
    /// Configuration declared on a type and its bases
    Declared(Arc<dyn Introspect>),
    /// Dotted path to another source
    Path(String),
    /// A value with no loading rule
    Opaque(Value),
    /// No source at all
    #[default]
    Absent,
}

impl Source {
    /// Wrap an introspectable declaration
    pub fn declared<T: Introspect + 'static>(declaration: T) -> Self {
        Source::Declared(Arc::new(declaration))
    }

    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Factory(_) => "factory",
            Source::Declared(_) => "declared",
            Source::Path(_) => "path",
            Source::Opaque(_) => "opaque",
            Source::Absent => "absent",
        }
    }
}

impl From<FlatFactory> for Source {
    fn from(factory: FlatFactory) -> Self {
        Source::Factory(factory.into_committed())
    }
}

impl From<DeepFactory> for Source {
    fn from(factory: DeepFactory) -> Self {
        Source::Factory(factory.into_committed())
    }
}

impl From<Declaration> for Source {
    fn from(declaration: Declaration) -> Self {
        Source::declared(declaration)
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Path(path.to_string())
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Source::Path(path)
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Source::Opaque(value)
    }
}

impl<S: Into<Source>> From<Option<S>> for Source {
    fn from(source: Option<S>) -> Self {
        source.map(Into::into).unwrap_or_default()
    }
}

/// One mapping collected from a declaration chain
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Identifier of the declaring type, if known
    pub classname: Option<String>,
    /// Merged mapping attributes of that type
    pub entries: Dict,
}

/// Collects the mapping attributes declared along a type's inheritance chain
pub trait Introspect: fmt::Debug + Send + Sync {
    /// Layers in traversal order, most-derived first
    fn layers(&self) -> Vec<Layer>;
}

/// A named configuration type with attributes and bases.
///
/// Only mapping-valued attributes take part in loading; their contents are
/// merged, in declaration order, into the type's [`Layer`].
#[derive(Debug, Clone, Default)]
pub struct Declaration {
    name: String,
    attributes: Vec<(String, Value)>,
    bases: Vec<Arc<Declaration>>,
}

impl Declaration {
    /// Create a declaration with no attributes and no bases
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare an attribute
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Declare a mapping attribute
    pub fn mapping(self, name: impl Into<String>, entries: Dict) -> Self {
        self.attribute(name, Value::Dict(Tag::Default, entries))
    }

    /// Add a base, searched after this declaration and earlier bases
    pub fn extends(mut self, base: Declaration) -> Self {
        self.bases.push(Arc::new(base));
        self
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn own_layer(&self) -> Option<Layer> {
        let mut entries = Dict::new();
        let mut found = false;
        for (_, value) in &self.attributes {
            if let Value::Dict(_, mapping) = value {
                entries.extend(mapping.clone());
                found = true;
            }
        }
        found.then(|| Layer {
            classname: Some(self.name.clone()),
            entries,
        })
    }

    fn collect(&self, seen: &mut HashSet<String>, layers: &mut Vec<Layer>) {
        if !seen.insert(self.name.clone()) {
            return;
        }
        if let Some(layer) = self.own_layer() {
            layers.push(layer);
        }
        for base in &self.bases {
            base.collect(seen, layers);
        }
    }
}

impl Introspect for Declaration {
    fn layers(&self) -> Vec<Layer> {
        let mut seen = HashSet::new();
        let mut layers = Vec::new();
        self.collect(&mut seen, &mut layers);
        layers
    }
}

/// Turns a dotted path into a source
pub trait Resolve {
    /// Resolve `path`, failing with [`LoadError::NotFound`] when unknown
    fn resolve(&self, path: &str) -> Result<Source>;
}

/// In-memory table of dotted paths
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<String, Source>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under a dotted path
    pub fn register(mut self, path: impl Into<String>, source: impl Into<Source>) -> Self {
        self.entries.insert(path.into(), source.into());
        self
    }

    /// Whether a path is registered
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }
}

impl Resolve for Registry {
    fn resolve(&self, path: &str) -> Result<Source> {
        self.entries.get(path).cloned().ok_or_else(|| {
            LoadError::NotFound {
                path: path.to_string(),
            }
            .into()
        })
    }
}
