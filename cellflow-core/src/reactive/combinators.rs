//! Combination helpers.
//!
//! Thin layers over [`Engine::connect`]: each declares exactly one edge.

use std::any::TypeId;

use super::cell::{Cell, NodeRef, Stream};
use super::engine::Engine;
use crate::error::{Error, Result};
use crate::graph::{Connection, Data, Inputs, NodeId, Value};

/// A tuple of node handles whose values can be read as one tuple.
pub trait Combinable: Copy + 'static {
    type Output: Data;

    /// Source IDs in tuple order.
    fn ids(&self) -> Vec<NodeId>;

    /// Read the tuple from `inputs`. `None` if any member has no value.
    fn collect(inputs: &Inputs<'_>) -> Result<Option<Self::Output>>;
}

macro_rules! impl_combinable {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: NodeRef),+> Combinable for ($($name,)+) {
            type Output = ($($name::Value,)+);

            fn ids(&self) -> Vec<NodeId> {
                vec![$(self.$idx.id()),+]
            }

            fn collect(inputs: &Inputs<'_>) -> Result<Option<Self::Output>> {
                Ok(Some(($(
                    match inputs.get_opt::<$name::Value>($idx)? {
                        Some(value) => value,
                        None => return Ok(None),
                    },
                )+)))
            }
        }
    };
}

impl_combinable!(A: 0, B: 1);
impl_combinable!(A: 0, B: 1, C: 2);
impl_combinable!(A: 0, B: 1, C: 2, D: 3);

impl Engine {
    /// A stream emitting the tuple of current source values whenever any
    /// source resolves. Nothing is emitted while a member has no value.
    pub fn combine<S: Combinable>(&mut self, sources: S) -> Stream<S::Output> {
        let sink = Stream::new();
        self.connect(
            Connection::new(sink.id(), |inputs, out| {
                if let Some(tuple) = S::collect(inputs)? {
                    out.emit_value(tuple);
                }
                Ok(())
            })
            .sources(sources.ids()),
        );
        sink
    }

    /// A cell holding the tuple of the given cells' values.
    ///
    /// One cell is created per distinct ordered source list and output type;
    /// asking again returns the same cell without adding another edge.
    /// Fails with [`Error::NoValue`] if a member has no current value.
    pub fn combine_cells<S: Combinable>(&mut self, sources: S) -> Result<Cell<S::Output>> {
        let ids = sources.ids();
        let key = (ids.clone(), TypeId::of::<S::Output>());
        if let Some(&id) = self.combined_cells.get(&key) {
            return Ok(Cell::from_id(id));
        }

        let current = self.get_values(&ids);
        if let Some((&missing, _)) = ids.iter().zip(&current).find(|(_, v)| v.is_none()) {
            return Err(Error::NoValue(missing));
        }
        let initial = S::collect(&Inputs::new(&ids, &current))?
            .ok_or(Error::NoValue(ids[0]))?;

        let cell = Cell::indistinct(initial);
        self.connect(
            Connection::new(cell.id(), |inputs, out| {
                if let Some(tuple) = S::collect(inputs)? {
                    out.emit_value(tuple);
                }
                Ok(())
            })
            .sources(ids.iter().copied()),
        );
        self.combined_cells.insert(key, cell.id());
        Ok(cell)
    }

    /// Forward every value of `source` into `sink`.
    pub fn link<S, K>(&mut self, source: &S, sink: &K)
    where
        S: NodeRef,
        K: NodeRef<Value = S::Value>,
    {
        self.connect(
            Connection::new(sink.id(), |inputs, out| {
                if let Some(value) = inputs.raw(0) {
                    out.emit(Value::clone(value));
                }
                Ok(())
            })
            .source(source.id()),
        );
    }

    /// Fold `source` into `cell`: each value of `source` replaces the cell
    /// with `f(current, value)`. The cell is read as a pull, so writing it
    /// does not retrigger the edge.
    pub fn change_with<T, S, F>(&mut self, cell: &Cell<T>, source: &S, f: F)
    where
        T: Data,
        S: NodeRef,
        F: Fn(&T, &S::Value) -> T + 'static,
    {
        self.connect(
            Connection::new(cell.id(), move |inputs, out| {
                let value: S::Value = inputs.get(0)?;
                let current: T = inputs.get(1)?;
                out.emit_value(f(&current, &value));
                Ok(())
            })
            .source(source.id())
            .pull(cell.id()),
        );
    }
}
