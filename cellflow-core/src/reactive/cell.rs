//! Typed node handles.
//!
//! [`Cell`] and [`Stream`] are thin, `Copy` wrappers over a [`NodeId`] that
//! remember the value type. Constructing one appends a definition to the
//! process-wide registry; the node is instantiated lazily in each engine the
//! first time that engine touches it.
//!
//! # Example
//!
//! ```rust,ignore
//! let count = Cell::new(0);
//! let clicks = Stream::<()>::new();
//!
//! let mut engine = Engine::new();
//! engine.change_with(&count, &clicks, |n, _| n + 1);
//! engine.publish(&clicks, ())?;
//! assert_eq!(engine.get_value(&count)?, 1);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::engine::Engine;
use crate::graph::registry;
use crate::graph::{Data, Equality, Initializer, NodeDefinition, NodeId};

/// Anything that names a node with a known value type.
pub trait NodeRef: Copy + 'static {
    type Value: Data;

    fn id(&self) -> NodeId;
}

/// A stateful node: always holds a value once registered in an engine.
pub struct Cell<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Data> Cell<T> {
    /// Create a cell that suppresses values equal to its current one.
    pub fn new(initial: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_options(initial, Equality::by_partial_eq::<T>(), Vec::new())
    }

    /// Create a cell that resolves on every publish, equal or not.
    pub fn indistinct(initial: T) -> Self {
        Self::with_options(initial, Equality::Disabled, Vec::new())
    }

    /// Create a distinct cell whose wiring runs once per engine.
    pub fn with_init<F>(initial: T, init: F) -> Self
    where
        T: PartialEq,
        F: Fn(&mut Engine, Cell<T>) + Send + Sync + 'static,
    {
        let init: Initializer = Arc::new(move |engine: &mut Engine, id: NodeId| {
            init(engine, Cell::from_id(id));
        });
        Self::with_options(initial, Equality::by_partial_eq::<T>(), vec![init])
    }

    pub fn with_options(initial: T, equality: Equality, initializers: Vec<Initializer>) -> Self {
        let id = registry::define(NodeDefinition::cell(
            Arc::new(initial),
            equality,
            initializers,
        ));
        Self::from_id(id)
    }

    /// Wrap an existing ID. The caller vouches for the value type.
    pub fn from_id(id: NodeId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }
}

/// A stateless node: carries a value only during a cycle that triggers it.
pub struct Stream<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Data> Stream<T> {
    pub fn new() -> Self {
        Self::with_options(Equality::Disabled, Vec::new())
    }

    /// Create a stream whose wiring runs once per engine.
    pub fn with_init<F>(init: F) -> Self
    where
        F: Fn(&mut Engine, Stream<T>) + Send + Sync + 'static,
    {
        let init: Initializer = Arc::new(move |engine: &mut Engine, id: NodeId| {
            init(engine, Stream::from_id(id));
        });
        Self::with_options(Equality::Disabled, vec![init])
    }

    pub fn with_options(equality: Equality, initializers: Vec<Initializer>) -> Self {
        Self::from_id(registry::define(NodeDefinition::stream(
            equality,
            initializers,
        )))
    }

    /// Wrap an existing ID. The caller vouches for the value type.
    pub fn from_id(id: NodeId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }
}

impl<T: Data> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! handle_impls {
    ($handle:ident) => {
        impl<T: Data> NodeRef for $handle<T> {
            type Value = T;

            fn id(&self) -> NodeId {
                self.id
            }
        }

        impl<T> Clone for $handle<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $handle<T> {}

        impl<T> PartialEq for $handle<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $handle<T> {}

        impl<T> fmt::Debug for $handle<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($handle), self.id)
            }
        }
    };
}

handle_impls!(Cell);
handle_impls!(Stream);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    #[test]
    fn handles_are_distinct_nodes() {
        let a = Cell::new(1);
        let b = Cell::new(1);
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn constructors_define_registry_entries() {
        let cell = Cell::new(String::from("hi"));
        let stream = Stream::<u8>::new();

        let cell_kind = registry::definition(cell.id()).map(|d| d.kind());
        let stream_kind = registry::definition(stream.id()).map(|d| d.kind());
        assert_eq!(cell_kind, Some(NodeKind::Cell));
        assert_eq!(stream_kind, Some(NodeKind::Stream));
    }

    #[test]
    fn with_init_stores_one_initializer() {
        let cell = Cell::with_init(0_u32, |_, _| {});
        let inits = registry::definition(cell.id()).map(|d| d.initializers().len());
        assert_eq!(inits, Some(1));
    }

    #[test]
    fn debug_names_kind_and_id() {
        let stream = Stream::<()>::from_id(NodeId::from(3));
        assert_eq!(format!("{stream:?}"), "Stream(#3)");
    }
}
