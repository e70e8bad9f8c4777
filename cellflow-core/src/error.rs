//! Error types for the scheduler.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors surfaced by reading values or running a publish cycle.
#[derive(Error, Debug)]
pub enum Error {
    /// The node has no value in this engine.
    ///
    /// Streams only carry a value while a cycle is in flight, so reading one
    /// from outside a cycle ends up here.
    #[error("node {0} has no value")]
    NoValue(NodeId),

    /// A type-erased value could not be downcast to the requested type.
    #[error("type mismatch reading node {node}: expected {expected}")]
    TypeMismatch {
        node: NodeId,
        expected: &'static str,
    },

    /// A projection asked for an input index the edge does not have.
    #[error("input {index} out of range for {len} inputs")]
    MissingInput { index: usize, len: usize },

    /// A user projection or subscription failed.
    #[error(transparent)]
    Callback(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Build a callback error from a plain message.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into().into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
