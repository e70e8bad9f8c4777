//! Engine
//!
//! The engine is the scheduler proper. It owns one instance's persisted
//! values, equality policies, dependency graph, subscriptions and execution
//! plan cache.
//!
//! # How a publish works
//!
//! 1. The published IDs form the root set. The plan for that exact set is
//!    fetched from the cache or computed.
//! 2. The cycle takes its own copy of the plan's ref-counts, a work queue in
//!    plan order, and an overlay seeded from persisted state.
//! 3. Each queued node is resolved either from the published value or by
//!    running the plan edges that sink into it. Emitting an equal value
//!    (per the node's equality policy) leaves it unresolved.
//! 4. A resolved node runs its regular subscribers, then its singleton.
//! 5. An unresolved node decrements the ref-count of every sink it triggers.
//!    A sink at zero is dropped from the queue and cancels its own sinks in
//!    turn. Pull inputs never take part in cancellation.
//!
//! A failing projection or subscriber aborts the rest of the cycle. Values
//! already written to persisted state stay written.
//!
//! # Threading
//!
//! An engine is single-threaded and runs each publish to completion.
//! Subscribers receive `&mut Engine` and may publish again; the nested call
//! gets its own overlay seeded from the state at that point.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, debug_span, trace};

use super::cell::NodeRef;
use super::subscriber::{Subscriber, SubscriberId, Subscription, SubscriptionKind};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::graph::registry;
use crate::graph::{
    downcast, Connection, Edge, EdgeId, Emitter, Equality, ExecutionPlan, Inputs, NodeId,
    PlanCache, RefCount, SetMap, Value,
};

/// Values to publish together in one cycle.
///
/// Insertion order decides root order when the plan is first computed.
#[derive(Default, Clone)]
pub struct Batch {
    values: IndexMap<NodeId, Value>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a typed value. A second value for the same node replaces the first.
    pub fn with<N: NodeRef>(mut self, node: &N, value: N::Value) -> Self {
        self.values.insert(node.id(), std::sync::Arc::new(value));
        self
    }

    pub fn with_raw(mut self, id: NodeId, value: Value) -> Self {
        self.values.insert(id, value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<IndexMap<NodeId, Value>> for Batch {
    fn from(values: IndexMap<NodeId, Value>) -> Self {
        Self { values }
    }
}

/// One scheduler instance.
pub struct Engine {
    config: EngineConfig,
    /// Persisted values of stateful nodes.
    state: HashMap<NodeId, Value>,
    equality: HashMap<NodeId, Equality>,
    instantiated: HashSet<NodeId>,
    /// Node -> edges reading it as a source or pull.
    graph: SetMap<NodeId, Rc<Edge>>,
    next_edge: u64,
    plans: PlanCache,
    subscriptions: HashMap<NodeId, IndexMap<SubscriberId, Subscriber>>,
    singletons: HashMap<NodeId, Subscriber>,
    /// Synthetic sinks created by `combine_cells`, keyed by ordered sources
    /// and output type.
    pub(super) combined_cells: HashMap<(Vec<NodeId>, std::any::TypeId), NodeId>,
    /// Edges owned by `subscribe_multiple` handles, removed on unsubscribe.
    owned_edges: HashMap<SubscriberId, Rc<Edge>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            state: HashMap::new(),
            equality: HashMap::new(),
            instantiated: HashSet::new(),
            graph: SetMap::new(),
            next_edge: 0,
            plans: PlanCache::new(),
            subscriptions: HashMap::new(),
            singletons: HashMap::new(),
            combined_cells: HashMap::new(),
            owned_edges: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Instantiate `id` on this engine.
    ///
    /// IDs without a registry definition are externally owned and left
    /// alone. Otherwise the first call seeds state (cells only) and the
    /// equality policy, then runs the deferred initializers. Later calls
    /// return immediately.
    pub fn register(&mut self, id: NodeId) {
        if self.instantiated.contains(&id) {
            return;
        }
        let Some(definition) = registry::definition(id) else {
            return;
        };

        // Marked before initializers run so they may touch the node again.
        self.instantiated.insert(id);
        if let Some(initial) = definition.initial() {
            self.state.insert(id, Value::clone(initial));
        }
        self.equality.insert(id, definition.equality().clone());
        trace!(engine = %self.config.label, node = %id, kind = ?definition.kind(), "registered node");

        for init in definition.initializers() {
            init(self, id);
        }
    }

    /// Whether `id` has been instantiated on this engine.
    pub fn is_registered(&self, id: NodeId) -> bool {
        self.instantiated.contains(&id)
    }

    /// Declare a dependency edge.
    ///
    /// Registers every node the edge touches, indexes the edge under each of
    /// its inputs and drops every cached plan.
    pub fn connect(&mut self, connection: Connection) {
        self.connect_edge(connection);
    }

    fn connect_edge(&mut self, connection: Connection) -> Rc<Edge> {
        self.register(connection.sink);
        for &id in connection.sources.iter().chain(connection.pulls.iter()) {
            self.register(id);
        }

        let edge = Rc::new(Edge::new(EdgeId(self.next_edge), connection));
        self.next_edge += 1;
        for &input in edge.inputs() {
            self.graph.insert(input, Rc::clone(&edge));
        }

        if !self.plans.is_empty() {
            debug!(engine = %self.config.label, dropped = self.plans.len(), "invalidated execution plans");
        }
        self.plans.clear();
        trace!(engine = %self.config.label, edge = ?edge, "connected edge");
        edge
    }

    /// Unindex `edge` from every input and drop every cached plan.
    fn disconnect(&mut self, edge: &Rc<Edge>) {
        for input in edge.inputs() {
            self.graph.remove(input, edge);
        }
        self.plans.clear();
        trace!(engine = %self.config.label, edge = ?edge, "disconnected edge");
    }

    /// Current value of a cell.
    pub fn get_value<N: NodeRef>(&mut self, node: &N) -> Result<N::Value> {
        let id = node.id();
        let value = self.get_value_raw(id).ok_or(Error::NoValue(id))?;
        downcast(id, &value)
    }

    /// Current persisted value of `id`, registering it first.
    pub fn get_value_raw(&mut self, id: NodeId) -> Option<Value> {
        self.register(id);
        self.state.get(&id).cloned()
    }

    pub fn get_values(&mut self, ids: &[NodeId]) -> Vec<Option<Value>> {
        ids.iter().map(|&id| self.get_value_raw(id)).collect()
    }

    /// Publish one value in its own cycle.
    pub fn publish<N: NodeRef>(&mut self, node: &N, value: N::Value) -> Result<()> {
        self.publish_in(Batch::new().with(node, value))
    }

    /// Publish several values atomically in a single cycle.
    pub fn publish_in(&mut self, batch: Batch) -> Result<()> {
        let values = batch.values;
        if values.is_empty() {
            return Ok(());
        }

        let roots: Vec<NodeId> = values.keys().copied().collect();
        // Roots may be first-seen; their initializers can add edges, so this
        // has to happen before the plan is looked up.
        for &root in &roots {
            self.register(root);
        }

        let span = debug_span!("publish", engine = %self.config.label, roots = roots.len());
        let _enter = span.enter();

        let plan = self.plan_for(&roots);
        let mut ref_count = plan.ref_count().clone();
        let mut queue: VecDeque<NodeId> = plan.participating().iter().copied().collect();
        let mut overlay = self.state.clone();

        while let Some(id) = queue.pop_front() {
            let mut resolved = false;

            if let Some(value) = values.get(&id) {
                Emitter::new(
                    id,
                    self.equality.get(&id),
                    &mut overlay,
                    &mut self.state,
                    &mut resolved,
                )
                .emit(Value::clone(value));
            } else if let Some(edges) = plan.edges_by_sink().get(&id) {
                for edge in edges {
                    let args: SmallVec<[Option<Value>; 4]> = edge
                        .inputs()
                        .iter()
                        .map(|input| overlay.get(input).cloned())
                        .collect();
                    let inputs = Inputs::new(edge.inputs(), &args);
                    let mut emitter = Emitter::new(
                        id,
                        self.equality.get(&id),
                        &mut overlay,
                        &mut self.state,
                        &mut resolved,
                    );
                    edge.project(&inputs, &mut emitter)?;
                }
            }

            if resolved {
                if let Some(value) = overlay.get(&id).cloned() {
                    trace!(node = %id, "resolved");
                    self.notify(id, &value)?;
                }
            } else {
                trace!(node = %id, "did not resolve");
                self.cancel(id, &mut ref_count, &mut queue);
            }
        }

        Ok(())
    }

    fn plan_for(&mut self, roots: &[NodeId]) -> Rc<ExecutionPlan> {
        if self.config.cache_plans {
            if let Some(plan) = self.plans.get(roots) {
                trace!(roots = roots.len(), "execution plan cache hit");
                return plan;
            }
        }

        let plan = Rc::new(ExecutionPlan::compute(roots, &self.graph));
        debug!(
            roots = roots.len(),
            participating = plan.len(),
            "computed execution plan"
        );
        if self.config.cache_plans {
            self.plans.insert(roots, Rc::clone(&plan));
        }
        plan
    }

    /// Propagate "did not resolve" from `id` to the sinks it triggers.
    fn cancel(&self, id: NodeId, ref_count: &mut RefCount, queue: &mut VecDeque<NodeId>) {
        let Some(edges) = self.graph.get(&id) else {
            return;
        };
        for edge in edges {
            if !edge.is_triggered_by(id) || !ref_count.decrement(edge.sink()) {
                continue;
            }
            if let Some(at) = queue.iter().position(|queued| *queued == edge.sink()) {
                queue.remove(at);
            }
            trace!(node = %edge.sink(), "cancelled");
            self.cancel(edge.sink(), ref_count, queue);
        }
    }

    fn notify(&mut self, id: NodeId, value: &Value) -> Result<()> {
        let regular: Vec<Subscriber> = self
            .subscriptions
            .get(&id)
            .map(|subs| subs.values().cloned().collect())
            .unwrap_or_default();
        for subscriber in regular {
            subscriber.notify(value, self)?;
        }

        if let Some(singleton) = self.singletons.get(&id).cloned() {
            singleton.notify(value, self)?;
        }
        Ok(())
    }

    /// Run `f` every cycle in which `node` resolves.
    pub fn subscribe<N, F>(&mut self, node: &N, f: F) -> Subscription
    where
        N: NodeRef,
        F: Fn(&N::Value, &mut Engine) -> Result<()> + 'static,
    {
        let id = node.id();
        self.subscribe_raw(id, move |value, engine| {
            let value = downcast::<N::Value>(id, value)?;
            f(&value, engine)
        })
    }

    pub fn subscribe_raw<F>(&mut self, id: NodeId, f: F) -> Subscription
    where
        F: Fn(&Value, &mut Engine) -> Result<()> + 'static,
    {
        self.register(id);
        let subscriber = Subscriber::new(f);
        let handle = Subscription::new(id, subscriber.id(), SubscriptionKind::Regular);
        self.subscriptions
            .entry(id)
            .or_default()
            .insert(subscriber.id(), subscriber);
        handle
    }

    /// Install `f` as the only singleton subscriber of `node`, replacing any
    /// previous one.
    pub fn singleton_subscribe<N, F>(&mut self, node: &N, f: F) -> Subscription
    where
        N: NodeRef,
        F: Fn(&N::Value, &mut Engine) -> Result<()> + 'static,
    {
        let id = node.id();
        self.singleton_subscribe_raw(id, move |value, engine| {
            let value = downcast::<N::Value>(id, value)?;
            f(&value, engine)
        })
    }

    pub fn singleton_subscribe_raw<F>(&mut self, id: NodeId, f: F) -> Subscription
    where
        F: Fn(&Value, &mut Engine) -> Result<()> + 'static,
    {
        self.register(id);
        let subscriber = Subscriber::new(f);
        let handle = Subscription::new(id, subscriber.id(), SubscriptionKind::Singleton);
        self.singletons.insert(id, subscriber);
        handle
    }

    /// Remove the singleton subscriber of `id`, if any.
    pub fn clear_singleton(&mut self, id: NodeId) {
        self.singletons.remove(&id);
    }

    pub fn reset_singleton_subscriptions(&mut self) {
        self.singletons.clear();
    }

    /// Remove a subscription.
    ///
    /// A singleton handle only clears the slot while it still holds the
    /// subscriber that handle installed.
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        let node = subscription.node();
        match subscription.kind() {
            SubscriptionKind::Regular => {
                if let Some(subs) = self.subscriptions.get_mut(&node) {
                    subs.shift_remove(&subscription.subscriber());
                    if subs.is_empty() {
                        self.subscriptions.remove(&node);
                    }
                }
                if let Some(edge) = self.owned_edges.remove(&subscription.subscriber()) {
                    self.disconnect(&edge);
                }
            }
            SubscriptionKind::Singleton => {
                let current = self.singletons.get(&node).map(Subscriber::id);
                if current == Some(subscription.subscriber()) {
                    self.singletons.remove(&node);
                }
            }
        }
    }

    /// Subscribe to several nodes at once.
    ///
    /// `f` runs once per cycle in which any of `ids` resolves, with the
    /// current value of each listed node (in order). Unsubscribing also
    /// removes the edge feeding it.
    pub fn subscribe_multiple<F>(&mut self, ids: &[NodeId], f: F) -> Subscription
    where
        F: Fn(&[Option<Value>], &mut Engine) -> Result<()> + 'static,
    {
        let sink = super::cell::Stream::<Vec<Option<Value>>>::new();
        let edge = self.connect_edge(
            Connection::new(sink.id(), |inputs, out| {
                out.emit_value(inputs.values().to_vec());
                Ok(())
            })
            .sources(ids.iter().copied()),
        );
        let handle = self.subscribe(&sink, move |values, engine| f(values, engine));
        self.owned_edges.insert(handle.subscriber(), edge);
        handle
    }

    /// Number of cached execution plans.
    pub fn plan_cache_len(&self) -> usize {
        self.plans.len()
    }

    /// Drop all per-engine state. The process-wide registry is untouched,
    /// so nodes are instantiated afresh the next time they are used.
    pub fn dispose(&mut self) {
        self.state.clear();
        self.equality.clear();
        self.instantiated.clear();
        self.graph.clear();
        self.plans.clear();
        self.subscriptions.clear();
        self.singletons.clear();
        self.combined_cells.clear();
        self.owned_edges.clear();
        debug!(engine = %self.config.label, "disposed engine");
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
