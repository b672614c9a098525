//! Builder protocol shared by the flat and deep factories
//!
//! A factory is driven through attribute steps ([`Factory::attr`]), value
//! steps ([`Factory::call`]) and scopes ([`Factory::scope`]). Whatever the
//! factory has committed can be inspected at any time and is eventually
//! handed to [`crate::Conf`] as a [`crate::Source`].

use std::collections::btree_map;
use std::ops::{Deref, DerefMut};

use types::{Dict, Result, StageError, Value};

pub mod deep;
pub mod flat;

pub use deep::DeepFactory;
pub use flat::FlatFactory;

/// Base configuration factory protocol
pub trait Factory: Sized {
    /// Mapping committed so far
    fn committed(&self) -> &Dict;

    /// Consume the factory, keeping only its committed mapping
    fn into_committed(self) -> Dict;

    /// Attribute step: select a group or key by name.
    ///
    /// Names with the reserved `__` prefix leave the cursor untouched.
    fn attr(&mut self, name: &str) -> &mut Self;

    /// Value step with a single argument, stored unwrapped
    fn call<V: Into<Value>>(&mut self, value: V) -> Result<&mut Self>;

    /// Value step with several arguments.
    ///
    /// Follows the argument-count rule: exactly one argument is stored
    /// unwrapped, anything else becomes an ordered array.
    fn call_many<I, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>;

    /// Scope entry
    fn enter(&mut self) -> Result<&mut Self> {
        Ok(self)
    }

    /// Scope exit: drops the in-progress cursor, never the committed mapping
    fn exit(&mut self);

    /// Number of open scopes that hold uncommitted levels
    fn depth(&self) -> usize {
        0
    }

    /// Iterate committed `(key, value)` pairs
    fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.committed().iter()
    }

    /// Debug view of the committed mapping
    fn render(&self) -> Result<String> {
        render_dict(self.committed())
    }

    /// Enter a scope, returning a guard that exits when dropped
    fn scope(&mut self) -> Result<Scope<'_, Self>> {
        self.enter()?;
        let entered = self.depth();
        Ok(Scope {
            factory: self,
            entered,
        })
    }

    /// Run `build` inside a scope
    fn scoped<R, B>(&mut self, build: B) -> Result<R>
    where
        B: FnOnce(&mut Self) -> Result<R>,
    {
        let mut scope = self.scope()?;
        build(&mut scope)
    }
}

/// Active scope on a factory.
///
/// Dereferences to the factory; dropping the guard runs [`Factory::exit`]
/// on every path out of the scope, early returns and unwinding included.
/// A level already closed through the guard is not closed twice.
#[derive(Debug)]
pub struct Scope<'a, F: Factory> {
    factory: &'a mut F,
    entered: usize,
}

impl<F: Factory> Deref for Scope<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.factory
    }
}

impl<F: Factory> DerefMut for Scope<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        self.factory
    }
}

impl<F: Factory> Drop for Scope<'_, F> {
    fn drop(&mut self) {
        // only close our own level, never the enclosing one
        if self.factory.depth() >= self.entered {
            self.factory.exit();
        }
    }
}

/// Pack call arguments by count: one stays unwrapped, others form an array
pub(crate) fn pack_arguments(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::from(values)
    }
}

pub(crate) fn render_dict(dict: &Dict) -> Result<String> {
    serde_yaml::to_string(dict).map_err(|e| StageError::Render(e.to_string()))
}
