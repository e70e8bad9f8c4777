//! Dependency edges.
//!
//! An edge links source and pull inputs to one sink through a projection.
//! Publishing to a source triggers the projection; pulls are only read.
//! The projection emits through an [`Emitter`]; not emitting means the sink
//! produced no value this cycle.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use smallvec::SmallVec;

use super::node::{downcast, Data, Equality, NodeId, Value};
use crate::error::{Error, Result};

/// Projection stored on an edge.
pub type Projection = Rc<dyn Fn(&Inputs<'_>, &mut Emitter<'_>) -> Result<()>>;

/// Identifier of an edge within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) u64);

/// A declared dependency, as handed to `Engine::connect`.
///
/// # Example
///
/// ```rust,ignore
/// engine.connect(
///     Connection::new(total.id(), |inputs, out| {
///         let price: f64 = inputs.get(0)?;
///         let qty: u32 = inputs.get(1)?;
///         out.emit_value(price * f64::from(qty));
///         Ok(())
///     })
///     .source(price.id())
///     .pull(qty.id()),
/// );
/// ```
pub struct Connection {
    pub(crate) sources: SmallVec<[NodeId; 4]>,
    pub(crate) pulls: SmallVec<[NodeId; 4]>,
    pub(crate) sink: NodeId,
    pub(crate) map: Projection,
}

impl Connection {
    /// Start a connection into `sink` computed by `map`.
    pub fn new<F>(sink: NodeId, map: F) -> Self
    where
        F: Fn(&Inputs<'_>, &mut Emitter<'_>) -> Result<()> + 'static,
    {
        Self {
            sources: SmallVec::new(),
            pulls: SmallVec::new(),
            sink,
            map: Rc::new(map),
        }
    }

    /// Add a triggering input.
    pub fn source(mut self, id: NodeId) -> Self {
        self.sources.push(id);
        self
    }

    pub fn sources(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.sources.extend(ids);
        self
    }

    /// Add an input that is read but never triggers.
    pub fn pull(mut self, id: NodeId) -> Self {
        self.pulls.push(id);
        self
    }

    pub fn pulls(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.pulls.extend(ids);
        self
    }
}

/// A registered dependency edge.
pub struct Edge {
    id: EdgeId,
    sources: SmallVec<[NodeId; 4]>,
    pulls: SmallVec<[NodeId; 4]>,
    /// Sources followed by pulls, in declaration order.
    inputs: SmallVec<[NodeId; 4]>,
    sink: NodeId,
    map: Projection,
}

impl Edge {
    pub(crate) fn new(id: EdgeId, connection: Connection) -> Self {
        let inputs = connection
            .sources
            .iter()
            .chain(connection.pulls.iter())
            .copied()
            .collect();
        Self {
            id,
            sources: connection.sources,
            pulls: connection.pulls,
            inputs,
            sink: connection.sink,
            map: connection.map,
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    pub fn pulls(&self) -> &[NodeId] {
        &self.pulls
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Whether publishing `id` can trigger this edge.
    pub fn is_triggered_by(&self, id: NodeId) -> bool {
        self.sources.contains(&id)
    }

    pub(crate) fn project(&self, inputs: &Inputs<'_>, emitter: &mut Emitter<'_>) -> Result<()> {
        (self.map)(inputs, emitter)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("id", &self.id)
            .field("sources", &self.sources)
            .field("pulls", &self.pulls)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

/// Current values of an edge's inputs, sources first then pulls.
pub struct Inputs<'a> {
    nodes: &'a [NodeId],
    values: &'a [Option<Value>],
}

impl<'a> Inputs<'a> {
    /// Pair input nodes with their values; both slices share one order.
    pub fn new(nodes: &'a [NodeId], values: &'a [Option<Value>]) -> Self {
        Self { nodes, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The node feeding input `index`.
    pub fn node(&self, index: usize) -> Result<NodeId> {
        self.nodes.get(index).copied().ok_or(Error::MissingInput {
            index,
            len: self.nodes.len(),
        })
    }

    /// The raw value at `index`, if the input currently has one.
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Typed value at `index`; errors if the input has no value.
    pub fn get<T: Data>(&self, index: usize) -> Result<T> {
        let node = self.node(index)?;
        match self.raw(index) {
            Some(value) => downcast(node, value),
            None => Err(Error::NoValue(node)),
        }
    }

    /// Typed value at `index`, or `None` when the input has no value this cycle.
    pub fn get_opt<T: Data>(&self, index: usize) -> Result<Option<T>> {
        let node = self.node(index)?;
        self.raw(index).map(|value| downcast(node, value)).transpose()
    }

    /// All raw values, in input order.
    pub fn values(&self) -> &[Option<Value>] {
        self.values
    }
}

/// Continuation handed to projections.
///
/// Emitting runs the sink's equality policy against its value in the cycle
/// overlay. An equal value leaves the node unresolved; anything else is
/// written to the overlay and, for nodes with persisted state, to the state
/// as well so later steps of the same cycle observe it.
pub struct Emitter<'a> {
    node: NodeId,
    equality: Option<&'a Equality>,
    overlay: &'a mut HashMap<NodeId, Value>,
    state: &'a mut HashMap<NodeId, Value>,
    resolved: &'a mut bool,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(
        node: NodeId,
        equality: Option<&'a Equality>,
        overlay: &'a mut HashMap<NodeId, Value>,
        state: &'a mut HashMap<NodeId, Value>,
        resolved: &'a mut bool,
    ) -> Self {
        Self {
            node,
            equality,
            overlay,
            state,
            resolved,
        }
    }

    /// The node this emitter writes to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn emit(&mut self, value: Value) {
        let suppressed = self
            .equality
            .is_some_and(|eq| eq.is_equal(self.overlay.get(&self.node), &value));
        if suppressed {
            *self.resolved = false;
            return;
        }

        *self.resolved = true;
        if let Some(slot) = self.state.get_mut(&self.node) {
            *slot = Arc::clone(&value);
        }
        self.overlay.insert(self.node, value);
    }

    pub fn emit_value<T: Data>(&mut self, value: T) {
        self.emit(Arc::new(value));
    }
}
