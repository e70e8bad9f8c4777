//! Dependency Graph
//!
//! This module holds the data structures the engine schedules over.
//!
//! # Overview
//!
//! - Nodes are opaque IDs. Their static definitions (kind, initial value,
//!   equality policy, deferred initializers) live in a process-wide registry
//!   shared by every engine.
//! - Edges are owned by one engine. Each edge reads a set of source nodes
//!   (which trigger it) and pull nodes (which are only read) and writes one
//!   sink node.
//! - The live graph is an index from each node to the edges that read it, so
//!   an edge is discoverable from any of its inputs.
//! - Execution plans are derived from the graph per root set and cached until
//!   the next edge is added.

mod edge;
mod node;
pub mod registry;
mod refcount;
mod scheduler;
mod set_map;

pub use edge::{Connection, Edge, EdgeId, Emitter, Inputs, Projection};
pub use node::{
    downcast, Comparator, Data, Equality, Initializer, NodeDefinition, NodeId, NodeKind, Value,
};
pub use refcount::RefCount;
pub use scheduler::{ExecutionPlan, PlanCache};
pub use set_map::SetMap;
