//! Identity Registry
//!
//! Process-wide, append-only table from [`NodeId`] to its [`NodeDefinition`].
//! Definitions are added when a node constructor runs and are never removed,
//! so every engine in the process sees the same definition for an ID.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use super::node::{NodeDefinition, NodeId};

static DEFINITIONS: OnceLock<DashMap<NodeId, Arc<NodeDefinition>>> = OnceLock::new();

fn definitions() -> &'static DashMap<NodeId, Arc<NodeDefinition>> {
    DEFINITIONS.get_or_init(DashMap::new)
}

/// Store a definition under a fresh ID and return the ID.
pub fn define(definition: NodeDefinition) -> NodeId {
    let id = NodeId::new();
    let kind = definition.kind();
    definitions().insert(id, Arc::new(definition));
    tracing::trace!(node = %id, ?kind, "defined node");
    id
}

/// Look up the definition of `id`.
///
/// The returned handle is detached from the table, so callers may run
/// initializers (which can define more nodes) while holding it.
pub fn definition(id: NodeId) -> Option<Arc<NodeDefinition>> {
    definitions().get(&id).map(|entry| Arc::clone(entry.value()))
}

/// Whether `id` has a definition.
pub fn is_defined(id: NodeId) -> bool {
    definitions().contains_key(&id)
}
