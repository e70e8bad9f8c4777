//! Graph Nodes
//!
//! This module defines node identity and the static definition a node carries
//! in the process-wide registry.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::reactive::Engine;

/// A type-erased node value.
///
/// Values are shared between the persisted state, the per-cycle overlay and
/// subscribers, so cloning one is a reference-count bump.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Bound for anything that can flow through the graph as a typed value.
pub trait Data: Any + Clone + Send + Sync {}

impl<T: Any + Clone + Send + Sync> Data for T {}

/// Downcast a type-erased value read from `node`.
pub fn downcast<T: Data>(node: NodeId, value: &Value) -> Result<T> {
    (**value)
        .downcast_ref::<T>()
        .cloned()
        .ok_or(Error::TypeMismatch {
            node,
            expected: std::any::type_name::<T>(),
        })
}

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    ///
    /// An ID that never gets a definition in the registry is an
    /// externally-owned node: engines treat it as already initialized.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A stateful node. Always has a value once registered in an engine.
    Cell,

    /// A stateless node. Only carries a value while a publish cycle that
    /// triggered it is in flight.
    Stream,
}

/// Comparator used by [`Equality::Custom`]. Returns `true` when the two
/// values are equal and the new one should be suppressed.
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Equality policy deciding whether an emitted value counts as a change.
#[derive(Clone, Default)]
pub enum Equality {
    /// Every emission resolves the node, including value-equal repeats.
    #[default]
    Disabled,

    /// Suppress when the new value is the same allocation as the current one.
    Identity,

    /// Suppress when the comparator reports the values equal.
    Custom(Comparator),
}

impl Equality {
    /// Compare by `PartialEq` on the concrete type `T`.
    ///
    /// Values of any other type never compare equal.
    pub fn by_partial_eq<T: PartialEq + Send + Sync + 'static>() -> Self {
        Self::Custom(Arc::new(|current: &Value, next: &Value| {
            match ((**current).downcast_ref::<T>(), (**next).downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }))
    }

    /// Wrap a custom comparator.
    pub fn custom<F>(compare: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(compare))
    }

    /// Whether `next` should be suppressed given the node's `current` value.
    ///
    /// A node with no current value never suppresses.
    pub fn is_equal(&self, current: Option<&Value>, next: &Value) -> bool {
        match (self, current) {
            (Self::Disabled, _) | (_, None) => false,
            (Self::Identity, Some(current)) => Arc::ptr_eq(current, next),
            (Self::Custom(compare), Some(current)) => compare(current, next),
        }
    }
}

impl fmt::Debug for Equality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Identity => f.write_str("Identity"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Deferred wiring run the first time an engine registers a node.
///
/// Receives the engine and the node's own ID; typically calls `connect`,
/// `subscribe` or `publish` on the engine.
pub type Initializer = Arc<dyn Fn(&mut Engine, NodeId) + Send + Sync>;

/// The static definition of a node, shared by every engine.
///
/// Immutable once it has been placed in the registry.
pub struct NodeDefinition {
    kind: NodeKind,
    initial: Option<Value>,
    equality: Equality,
    initializers: Vec<Initializer>,
}

impl NodeDefinition {
    /// Definition of a stateful node seeded with `initial`.
    pub fn cell(initial: Value, equality: Equality, initializers: Vec<Initializer>) -> Self {
        Self {
            kind: NodeKind::Cell,
            initial: Some(initial),
            equality,
            initializers,
        }
    }

    /// Definition of a stateless node.
    pub fn stream(equality: Equality, initializers: Vec<Initializer>) -> Self {
        Self {
            kind: NodeKind::Stream,
            initial: None,
            equality,
            initializers,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Initial value. Always `Some` for cells, `None` for streams.
    pub fn initial(&self) -> Option<&Value> {
        self.initial.as_ref()
    }

    pub fn equality(&self) -> &Equality {
        &self.equality
    }

    pub fn initializers(&self) -> &[Initializer] {
        &self.initializers
    }
}

impl fmt::Debug for NodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("kind", &self.kind)
            .field("has_initial", &self.initial.is_some())
            .field("equality", &self.equality)
            .field("initializers", &self.initializers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn cell_definition_carries_initial() {
        let def = NodeDefinition::cell(Arc::new(3_i32), Equality::Disabled, Vec::new());
        assert_eq!(def.kind(), NodeKind::Cell);
        let initial = def.initial().map(|v| downcast::<i32>(NodeId::from(0), v));
        assert_eq!(initial.and_then(|r| r.ok()), Some(3));
    }

    #[test]
    fn stream_definition_has_no_initial() {
        let def = NodeDefinition::stream(Equality::Identity, Vec::new());
        assert_eq!(def.kind(), NodeKind::Stream);
        assert!(def.initial().is_none());
    }

    #[test]
    fn partial_eq_policy() {
        let eq = Equality::by_partial_eq::<i32>();
        let a: Value = Arc::new(1_i32);
        let b: Value = Arc::new(1_i32);
        let c: Value = Arc::new(2_i32);

        assert!(eq.is_equal(Some(&a), &b));
        assert!(!eq.is_equal(Some(&a), &c));
        assert!(!eq.is_equal(None, &a));
    }

    #[test]
    fn identity_policy_compares_allocations() {
        let eq = Equality::Identity;
        let a: Value = Arc::new(String::from("x"));
        let b: Value = Arc::new(String::from("x"));

        assert!(eq.is_equal(Some(&a), &Arc::clone(&a)));
        assert!(!eq.is_equal(Some(&a), &b));
    }

    #[test]
    fn disabled_policy_never_suppresses() {
        let a: Value = Arc::new(1_i32);
        assert!(!Equality::Disabled.is_equal(Some(&a), &Arc::clone(&a)));
    }

    #[test]
    fn downcast_reports_mismatch() {
        let v: Value = Arc::new(1_u8);
        let err = downcast::<String>(NodeId::from(4), &v).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
