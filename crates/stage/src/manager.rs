//! Configuration manager implementation

use figment::value::Tag;
use once_cell::sync::OnceCell;
use tracing::{debug, trace};
use types::{Dict, LoadError, Result, Value};

use crate::snapshot::Snapshot;
use crate::source::{Resolve, Source};

/// Path-to-path resolutions followed before giving up
pub const MAX_RESOLVE_HOPS: usize = 16;

/// Group name for declared layers that carry no class identifier
pub const FALLBACK_GROUP: &str = "options";

/// Result of loading one source into a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The source contributed this many top-level entries
    Loaded { entries: usize },
    /// The source had no loading rule and contributed nothing
    Ignored,
}

/// Ad-hoc overrides applied between defaults and required values
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: Vec<(String, Value)>,
}

impl Overrides {
    /// Create an empty set of overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every entry of a mapping
    pub fn merge(mut self, mapping: Dict) -> Self {
        self.entries.extend(mapping);
        self
    }

    /// Apply a single keyword override
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Whether no override has been added
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Dict> for Overrides {
    fn from(mapping: Dict) -> Self {
        Overrides::new().merge(mapping)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Overrides::new(), |overrides, (key, value)| overrides.set(key, value))
    }
}

/// Configuration manager: default values, required values, and freezing
#[derive(Debug)]
pub struct Conf {
    defaults_bucket: Dict,
    required_bucket: Dict,
    defaults_outcome: LoadOutcome,
    required_outcome: LoadOutcome,
    defaults: OnceCell<Snapshot>,
    required: OnceCell<Snapshot>,
}

impl Conf {
    /// Load defaults and required values; path sources are rejected
    pub fn new(defaults: impl Into<Source>, required: impl Into<Source>) -> Result<Self> {
        Self::load_buckets(defaults.into(), required.into(), None)
    }

    /// Load defaults and required values, resolving path sources with `resolver`
    pub fn with_resolver(
        defaults: impl Into<Source>,
        required: impl Into<Source>,
        resolver: &dyn Resolve,
    ) -> Result<Self> {
        Self::load_buckets(defaults.into(), required.into(), Some(resolver))
    }

    fn load_buckets(
        defaults: Source,
        required: Source,
        resolver: Option<&dyn Resolve>,
    ) -> Result<Self> {
        let mut defaults_bucket = Dict::new();
        let defaults_outcome = Self::load(&mut defaults_bucket, defaults, resolver, "defaults")?;
        let mut required_bucket = Dict::new();
        let required_outcome = Self::load(&mut required_bucket, required, resolver, "required")?;

        Ok(Self {
            defaults_bucket,
            required_bucket,
            defaults_outcome,
            required_outcome,
            defaults: OnceCell::new(),
            required: OnceCell::new(),
        })
    }

    /// Load one source into `destination`
    fn load(
        destination: &mut Dict,
        source: Source,
        resolver: Option<&dyn Resolve>,
        bucket: &str,
    ) -> Result<LoadOutcome> {
        let source = Self::resolve(source, resolver)?;
        debug!(bucket, kind = source.kind(), "loading configuration source");

        let loaded = match source {
            Source::Declared(declaration) => {
                let mut layers = declaration.layers().into_iter();
                let Some(first) = layers.next() else {
                    debug!(bucket, "declaration has no mapping attributes");
                    return Ok(LoadOutcome::Ignored);
                };
                // base keys come from the most-derived layer, its tag is dropped
                let mut loaded = first.entries;
                for layer in layers {
                    let group = layer
                        .classname
                        .unwrap_or_else(|| FALLBACK_GROUP.to_string());
                    trace!(bucket, group = %group, "nesting inherited layer");
                    loaded.insert(group, Value::Dict(Tag::Default, layer.entries));
                }
                loaded
            }
            Source::Factory(committed) => committed,
            Source::Opaque(_) | Source::Absent | Source::Path(_) => {
                debug!(bucket, "source ignored");
                return Ok(LoadOutcome::Ignored);
            }
        };

        let entries = loaded.len();
        destination.extend(loaded);
        debug!(bucket, entries, "configuration source loaded");
        Ok(LoadOutcome::Loaded { entries })
    }

    /// Follow path sources until something loadable turns up
    fn resolve(mut source: Source, resolver: Option<&dyn Resolve>) -> Result<Source> {
        let mut hops = 0;
        while let Source::Path(path) = &source {
            if hops == MAX_RESOLVE_HOPS {
                return Err(LoadError::ResolutionLoop {
                    path: path.clone(),
                    hops,
                }
                .into());
            }
            let resolver = resolver.ok_or_else(|| LoadError::NoResolver { path: path.clone() })?;
            trace!(path = %path, "resolving configuration path");
            source = resolver.resolve(path)?;
            hops += 1;
        }
        Ok(source)
    }

    /// Outcome of loading the defaults source
    pub fn defaults_outcome(&self) -> LoadOutcome {
        self.defaults_outcome
    }

    /// Outcome of loading the required source
    pub fn required_outcome(&self) -> LoadOutcome {
        self.required_outcome
    }

    /// Get configuration default values
    pub fn defaults(&self) -> &Snapshot {
        self.defaults
            .get_or_init(|| Snapshot::new(self.defaults_bucket.clone()))
    }

    /// Get required configuration values
    pub fn required(&self) -> &Snapshot {
        self.required
            .get_or_init(|| Snapshot::new(self.required_bucket.clone()))
    }

    /// Finalize configuration values with no overrides
    pub fn freeze(&self) -> Snapshot {
        self.freeze_with(Overrides::new())
    }

    /// Finalize configuration values.
    ///
    /// Defaults first, then `overrides` in the order given, then required
    /// values, which override everything.
    pub fn freeze_with(&self, overrides: impl Into<Overrides>) -> Snapshot {
        let overrides = overrides.into();
        let mut end = self.defaults_bucket.clone();
        trace!(overrides = overrides.entries.len(), "freezing configuration");
        end.extend(overrides.entries);
        end.extend(self.required_bucket.clone());
        debug!(entries = end.len(), "configuration frozen");
        Snapshot::new(end)
    }

    /// Debug view of the frozen configuration
    pub fn render(&self) -> Result<String> {
        self.freeze().render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{DeepFactory, Factory, FlatFactory};
    use crate::source::{Declaration, Layer, Introspect, Registry};
    use types::StageError;

    fn dict<const N: usize>(pairs: [(&str, Value); N]) -> Dict {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn group(entries: Dict) -> Value {
        Value::Dict(Tag::Default, entries)
    }

    /// Source as handed over by a finished factory
    fn factory_source(pairs: Dict) -> Source {
        Source::Factory(pairs)
    }

    fn host_port_conf() -> Conf {
        Conf::new(
            factory_source(dict([("host", Value::from("a")), ("port", Value::from(1))])),
            factory_source(dict([("port", Value::from(9))])),
        )
        .unwrap()
    }

    #[test]
    fn test_required_wins_over_overrides() {
        let conf = host_port_conf();
        let frozen = conf.freeze_with(dict([("port", Value::from(2)), ("extra", Value::from("x"))]));
        assert_eq!(
            frozen.as_dict(),
            &dict([
                ("host", Value::from("a")),
                ("port", Value::from(9)),
                ("extra", Value::from("x")),
            ])
        );
    }

    #[test]
    fn test_freeze_equals_defaults_updated_by_required() {
        let conf = Conf::new(
            factory_source(dict([("a", Value::from(1)), ("b", Value::from(2))])),
            factory_source(dict([("b", Value::from(20)), ("c", Value::from(30))])),
        )
        .unwrap();

        let mut expected = conf.defaults().to_dict();
        expected.extend(conf.required().to_dict());
        assert_eq!(conf.freeze().as_dict(), &expected);
    }

    #[test]
    fn test_overrides_beat_defaults_only() {
        let conf = host_port_conf();
        let frozen = conf.freeze_with(Overrides::new().set("host", "b").set("port", 3));
        assert_eq!(frozen.get("host"), Some(&Value::from("b")));
        assert_eq!(frozen.get("port"), Some(&Value::from(9)));
    }

    #[test]
    fn test_overrides_apply_in_order() {
        let conf = host_port_conf();
        let overrides = Overrides::new()
            .merge(dict([("host", Value::from("first"))]))
            .set("host", "second");
        assert_eq!(
            conf.freeze_with(overrides).get("host"),
            Some(&Value::from("second"))
        );

        assert!(Overrides::new().is_empty());
        let collected: Overrides = [("host", "third")].into_iter().collect();
        assert!(!collected.is_empty());
        assert_eq!(
            conf.freeze_with(collected).get("host"),
            Some(&Value::from("third"))
        );
    }

    #[test]
    fn test_freeze_is_repeatable_and_pure() {
        let conf = host_port_conf();
        let defaults_before = conf.defaults_bucket.clone();
        let required_before = conf.required_bucket.clone();

        let first = conf.freeze_with(dict([("port", Value::from(2))]));
        let second = conf.freeze_with(dict([("port", Value::from(2))]));
        assert_eq!(first, second);
        assert_eq!(conf.freeze(), conf.freeze());

        assert_eq!(conf.defaults_bucket, defaults_before);
        assert_eq!(conf.required_bucket, required_before);
        assert_eq!(conf.defaults().as_dict(), &defaults_before);
        assert_eq!(conf.required().as_dict(), &required_before);
    }

    #[test]
    fn test_views_are_cached() {
        let conf = host_port_conf();
        assert!(std::ptr::eq(conf.defaults(), conf.defaults()));
        assert!(std::ptr::eq(conf.required(), conf.required()));
    }

    #[test]
    fn test_loads_flat_factory() {
        let mut defaults = FlatFactory::new();
        defaults
            .attr("db")
            .attr("port")
            .call(5432)
            .unwrap()
            .attr("host")
            .call("localhost")
            .unwrap();

        let conf = Conf::new(defaults, Source::Absent).unwrap();
        assert_eq!(conf.defaults_outcome(), LoadOutcome::Loaded { entries: 1 });
        assert_eq!(conf.required_outcome(), LoadOutcome::Ignored);
        assert_eq!(
            conf.freeze().find("db.host"),
            Some(&Value::from("localhost"))
        );
    }

    #[test]
    fn test_loads_deep_factory() {
        let mut required = DeepFactory::new();
        required
            .attr("database")
            .scoped(|c| {
                c.attr("host").call("primary")?;
                Ok(())
            })
            .unwrap();

        let conf = Conf::new(Source::Absent, required).unwrap();
        assert_eq!(
            conf.freeze().find("DATABASE.HOST"),
            Some(&Value::from("primary"))
        );
    }

    #[test]
    fn test_declaration_without_bases() {
        let decl = Declaration::new("Settings").mapping("settings", dict([("x", Value::from(1))]));
        let conf = Conf::new(decl, Source::Absent).unwrap();
        assert_eq!(conf.defaults().as_dict(), &dict([("x", Value::from(1))]));
    }

    #[test]
    fn test_declaration_bases_become_groups() {
        let base = Declaration::new("Base").mapping("m", dict([("timeout", Value::from(30))]));
        let decl = Declaration::new("App")
            .mapping("m", dict([("name", Value::from("app"))]))
            .extends(base);

        let conf = Conf::new(decl, Source::Absent).unwrap();
        assert_eq!(
            conf.defaults().as_dict(),
            &dict([
                ("name", Value::from("app")),
                ("Base", group(dict([("timeout", Value::from(30))]))),
            ])
        );
    }

    #[derive(Debug)]
    struct Untagged;

    impl Introspect for Untagged {
        fn layers(&self) -> Vec<Layer> {
            vec![
                Layer {
                    classname: Some("Own".to_string()),
                    entries: dict([("a", Value::from(1))]),
                },
                Layer {
                    classname: None,
                    entries: dict([("b", Value::from(2))]),
                },
            ]
        }
    }

    #[test]
    fn test_untagged_layer_uses_fallback_group() {
        let conf = Conf::new(Source::declared(Untagged), Source::Absent).unwrap();
        assert_eq!(
            conf.defaults().as_dict(),
            &dict([
                ("a", Value::from(1)),
                (FALLBACK_GROUP, group(dict([("b", Value::from(2))]))),
            ])
        );
    }

    #[test]
    fn test_unrecognized_sources_are_ignored() {
        let conf = Conf::new(Value::from(42), Source::Absent).unwrap();
        assert_eq!(conf.defaults_outcome(), LoadOutcome::Ignored);
        assert_eq!(conf.required_outcome(), LoadOutcome::Ignored);
        assert!(conf.freeze().is_empty());

        let empty = Declaration::new("Empty").attribute("version", 1);
        let conf = Conf::new(empty, Source::Absent).unwrap();
        assert_eq!(conf.defaults_outcome(), LoadOutcome::Ignored);
    }

    #[test]
    fn test_path_sources_resolve() {
        let registry = Registry::new()
            .register(
                "app.conf.Defaults",
                Declaration::new("Defaults").mapping("m", dict([("x", Value::from(1))])),
            )
            .register("app.conf.Alias", "app.conf.Defaults");

        let conf = Conf::with_resolver("app.conf.Alias", Source::Absent, &registry).unwrap();
        assert_eq!(conf.defaults().get("x"), Some(&Value::from(1)));
    }

    #[test]
    fn test_path_failures_propagate() {
        let err = Conf::with_resolver("app.conf.Missing", Source::Absent, &Registry::new())
            .unwrap_err();
        assert!(matches!(err, StageError::Load(LoadError::NotFound { .. })));

        let err = Conf::new("app.conf.Defaults", Source::Absent).unwrap_err();
        assert!(matches!(err, StageError::Load(LoadError::NoResolver { .. })));

        let looping = Registry::new().register("a", "b").register("b", "a");
        let err = Conf::with_resolver("a", Source::Absent, &looping).unwrap_err();
        assert!(matches!(
            err,
            StageError::Load(LoadError::ResolutionLoop { hops: MAX_RESOLVE_HOPS, .. })
        ));
    }
}
