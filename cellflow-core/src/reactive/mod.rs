//! Reactive Engine
//!
//! This module implements the scheduler and the typed surface built on it.
//!
//! # Concepts
//!
//! ## Cells and streams
//!
//! A [`Cell`] holds state: once an engine touches it, it always has a value.
//! A [`Stream`] is stateless: it only carries a value during a publish cycle
//! that reaches it. Both are `Copy` handles over a [`NodeId`](crate::graph::NodeId).
//!
//! ## Edges
//!
//! [`Engine::connect`] declares how a sink is computed from source inputs
//! (which trigger it) and pull inputs (which are only read). The
//! combinators and operators here are each one such edge.
//!
//! ## Publishing
//!
//! [`Engine::publish`] and [`Engine::publish_in`] run one synchronous cycle:
//! every node reachable from the published roots runs at most once, in
//! dependency order, and subscribers of resolved nodes are notified.
//!
//! # Implementation Notes
//!
//! There is no ambient "current engine". Initializers and subscribers are
//! handed the engine explicitly.

mod cell;
mod combinators;
mod engine;
mod operators;
mod subscriber;

pub use cell::{Cell, NodeRef, Stream};
pub use combinators::Combinable;
pub use engine::{Batch, Engine};
pub use subscriber::{Subscriber, SubscriberId, Subscription, SubscriptionKind};
