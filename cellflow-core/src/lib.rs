//! Cellflow Core
//!
//! This crate provides the scheduler underneath the cellflow state-propagation
//! library. Given a set of newly published values it decides which dependent
//! computations run, in what order, exactly once each, and which of them
//! produced nothing this cycle.
//!
//! It implements:
//!
//! - A process-wide registry of node definitions (cells and streams)
//! - Per-engine dependency graphs with source (push) and pull inputs
//! - Memoized execution plans with diamond deduplication
//! - Cancellation that flows through nodes that did not resolve
//! - Typed combinators and operators built on `connect`
//!
//! # Architecture
//!
//! - `graph`: node identity, registry, edges and execution plans
//! - `reactive`: the engine, typed handles, subscriptions, combinators
//!
//! # Example
//!
//! ```rust,ignore
//! use cellflow_core::reactive::{Cell, Engine, Stream};
//!
//! let price = Cell::new(10);
//! let quantity = Cell::new(2);
//! let total = Cell::new(0);
//!
//! let mut engine = Engine::new();
//! let both = engine.combine((price, quantity));
//! let product = engine.map(&both, |(p, q)| p * q);
//! engine.link(&product, &total);
//!
//! engine.publish(&quantity, 3)?;
//! assert_eq!(engine.get_value(&total)?, 30);
//! ```

pub mod graph;
pub mod reactive;

mod config;
mod error;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use graph::{NodeId, Value};
pub use reactive::{Batch, Cell, Engine, NodeRef, Stream, Subscription};
