//! Declarative nested configuration for the stage system
//!
//! Build nested mappings with the fluent [`FlatFactory`] (two levels) or the
//! scope-driven [`DeepFactory`] (three levels), hand them to [`Conf`] as
//! defaults or required values, and [`Conf::freeze`] them into an immutable
//! [`Snapshot`]: defaults first, then ad-hoc overrides, then required values,
//! which always win.

pub mod factory;
pub mod manager;
pub mod snapshot;
pub mod source;

pub use factory::{DeepFactory, Factory, FlatFactory, Scope};
pub use manager::{Conf, LoadOutcome, Overrides};
pub use snapshot::Snapshot;
pub use source::{Declaration, Introspect, Layer, Registry, Resolve, Source};
pub use types::{BuildError, Dict, LoadError, Result, StageError, Value};
