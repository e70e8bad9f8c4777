//! Execution Plans
//!
//! A plan fixes, for one set of root nodes, which nodes take part in a publish
//! cycle and the order in which they run.
//!
//! # Algorithm
//!
//! Depth-first from each root, following only edges the node *triggers*:
//!
//! 1. Every visit bumps the node's ref-count, repeat visits included. That
//!    count is the number of trigger paths converging on the node, which is
//!    what lets a cycle cancel a diamond sink once all of its paths failed.
//! 2. On the first visit, the node's insertion index is pushed past any pull
//!    source already placed, so pull sources run before pull dependents.
//! 3. For each edge reading the node: as a source, record the edge under its
//!    sink and visit the sink; as a pull, remember the node as a pending pull
//!    source of the sink instead of descending.
//! 4. Insert the node at the insertion index (front by default). Children are
//!    placed before their parent is inserted in front of them, which yields a
//!    topological order.
//!
//! Plans are cached per root set and thrown away wholesale whenever an edge
//! is added, since any new edge can change reachability for any root set.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::edge::Edge;
use super::node::NodeId;
use super::refcount::RefCount;
use super::set_map::SetMap;

/// The ordered traversal plus ref-counts for one root set.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    participating: Vec<NodeId>,
    ref_count: RefCount,
    edges_by_sink: SetMap<NodeId, Rc<Edge>>,
    pending_pulls: SetMap<NodeId, NodeId>,
}

impl ExecutionPlan {
    /// Compute the plan for `roots` over `graph` (node -> edges reading it).
    pub fn compute(roots: &[NodeId], graph: &SetMap<NodeId, Rc<Edge>>) -> Self {
        let mut builder = PlanBuilder {
            graph,
            visited: HashSet::new(),
            plan: ExecutionPlan::default(),
        };
        for &root in roots {
            builder.visit(root, 0);
        }
        builder.plan
    }

    /// Participating nodes in execution order.
    pub fn participating(&self) -> &[NodeId] {
        &self.participating
    }

    /// Ref-count snapshot; each cycle works on its own clone.
    pub fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    /// Edges reached through a source, grouped by sink.
    pub fn edges_by_sink(&self) -> &SetMap<NodeId, Rc<Edge>> {
        &self.edges_by_sink
    }

    /// Pull sources recorded for each sink while planning.
    pub fn pending_pulls(&self) -> &SetMap<NodeId, NodeId> {
        &self.pending_pulls
    }

    pub fn len(&self) -> usize {
        self.participating.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participating.is_empty()
    }
}

struct PlanBuilder<'g> {
    graph: &'g SetMap<NodeId, Rc<Edge>>,
    visited: HashSet<NodeId>,
    plan: ExecutionPlan,
}

impl PlanBuilder<'_> {
    fn visit(&mut self, id: NodeId, mut insert_at: usize) {
        self.plan.ref_count.increment(id);
        // Also stops a trigger cycle from recursing forever.
        if !self.visited.insert(id) {
            return;
        }

        if let Some(pulls) = self.plan.pending_pulls.get(&id) {
            insert_at = pulls
                .iter()
                .filter_map(|pull| self.position(*pull))
                .max()
                .map_or(0, |rightmost| rightmost + 1);
        }

        let graph = self.graph;
        if let Some(edges) = graph.get(&id) {
            for edge in edges {
                if edge.is_triggered_by(id) {
                    self.plan.edges_by_sink.insert(edge.sink(), Rc::clone(edge));
                    self.visit(edge.sink(), insert_at);
                } else {
                    self.plan.pending_pulls.insert(edge.sink(), id);
                }
            }
        }

        let at = insert_at.min(self.plan.participating.len());
        self.plan.participating.insert(at, id);
    }

    fn position(&self, id: NodeId) -> Option<usize> {
        self.plan.participating.iter().position(|n| *n == id)
    }
}

/// Memoized plans keyed by root set.
///
/// Single roots are looked up directly; multi-root sets are matched by set
/// equality against earlier keys, regardless of the order roots were given.
#[derive(Debug, Default)]
pub struct PlanCache {
    single: HashMap<NodeId, Rc<ExecutionPlan>>,
    multi: Vec<(HashSet<NodeId>, Rc<ExecutionPlan>)>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, roots: &[NodeId]) -> Option<Rc<ExecutionPlan>> {
        match roots {
            [root] => self.single.get(root).cloned(),
            _ => self
                .multi
                .iter()
                .find(|(key, _)| key.len() == roots.len() && roots.iter().all(|r| key.contains(r)))
                .map(|(_, plan)| Rc::clone(plan)),
        }
    }

    pub fn insert(&mut self, roots: &[NodeId], plan: Rc<ExecutionPlan>) {
        match roots {
            [root] => {
                self.single.insert(*root, plan);
            }
            _ => self.multi.push((roots.iter().copied().collect(), plan)),
        }
    }

    pub fn len(&self) -> usize {
        self.single.len() + self.multi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.single.clear();
        self.multi.clear();
    }
}
