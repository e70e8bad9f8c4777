//! Stream operators.
//!
//! Each operator creates a fresh node and wires it with a single `connect`.
//! State an operator keeps across cycles lives in its projection closure.
//! Timing operators (delay, debounce, throttle) are not provided here: they
//! belong to callers that publish again when their timer fires.

use super::cell::{Cell, NodeRef, Stream};
use super::engine::Engine;
use crate::graph::{Connection, Data, Value};

impl Engine {
    /// Emit `f(value)` for every value of `source`.
    pub fn map<S, U, F>(&mut self, source: &S, f: F) -> Stream<U>
    where
        S: NodeRef,
        U: Data,
        F: Fn(&S::Value) -> U + 'static,
    {
        let sink = Stream::new();
        self.connect(
            Connection::new(sink.id(), move |inputs, out| {
                let value: S::Value = inputs.get(0)?;
                out.emit_value(f(&value));
                Ok(())
            })
            .source(source.id()),
        );
        sink
    }

    /// Emit a clone of `value` every time `source` resolves.
    pub fn map_to<S, U>(&mut self, source: &S, value: U) -> Stream<U>
    where
        S: NodeRef,
        U: Data,
    {
        let sink = Stream::new();
        self.connect(
            Connection::new(sink.id(), move |_, out| {
                out.emit_value(value.clone());
                Ok(())
            })
            .source(source.id()),
        );
        sink
    }

    /// Pass through the values of `source` accepted by `predicate`. A
    /// rejected value leaves the output unresolved, cancelling whatever
    /// depends only on it.
    pub fn filter<S, F>(&mut self, source: &S, predicate: F) -> Stream<S::Value>
    where
        S: NodeRef,
        F: Fn(&S::Value) -> bool + 'static,
    {
        let sink = Stream::new();
        self.connect(
            Connection::new(sink.id(), move |inputs, out| {
                let value: S::Value = inputs.get(0)?;
                if predicate(&value) {
                    out.emit_value(value);
                }
                Ok(())
            })
            .source(source.id()),
        );
        sink
    }

    /// Pair each value of `source` with the current value of `pulled`.
    ///
    /// `pulled` never triggers the output. While it has no value, nothing
    /// is emitted.
    pub fn with_latest_from<S, P>(&mut self, source: &S, pulled: &P) -> Stream<(S::Value, P::Value)>
    where
        S: NodeRef,
        P: NodeRef,
    {
        let sink = Stream::new();
        self.connect(
            Connection::new(sink.id(), |inputs, out| {
                let value: S::Value = inputs.get(0)?;
                if let Some(latest) = inputs.get_opt::<P::Value>(1)? {
                    out.emit_value((value, latest));
                }
                Ok(())
            })
            .source(source.id())
            .pull(pulled.id()),
        );
        sink
    }

    /// Accumulate the values of `source` into a cell starting at `seed`.
    pub fn scan<S, A, F>(&mut self, source: &S, seed: A, f: F) -> Cell<A>
    where
        S: NodeRef,
        A: Data,
        F: Fn(&A, &S::Value) -> A + 'static,
    {
        let acc = Cell::indistinct(seed);
        self.change_with(&acc, source, f);
        acc
    }

    /// Forward only the first value of `source` seen by this engine.
    pub fn once<S: NodeRef>(&mut self, source: &S) -> Stream<S::Value> {
        let sink = Stream::new();
        let fired = std::cell::Cell::new(false);
        self.connect(
            Connection::new(sink.id(), move |inputs, out| {
                if fired.get() {
                    return Ok(());
                }
                if let Some(value) = inputs.raw(0) {
                    fired.set(true);
                    out.emit(Value::clone(value));
                }
                Ok(())
            })
            .source(source.id()),
        );
        sink
    }
}
