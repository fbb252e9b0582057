// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::node::{Node, NodeId, generate_node_id};
use crate::errors::{BenchError, Result};

/// Internal node structure: the node's id plus its operation.
struct GraphNode<C> {
    id: NodeId,
    op: Box<dyn Node<C>>,
}

/// Directed graph of pipeline nodes, keyed by node id.
///
/// Edges are fixed while building; an edge `a -> b` means `a` must finish
/// before `b` may start. Adding the same edge twice is a no-op. Acyclicity
/// is not checked here: the pipeline reports a cycle when it gets stuck.
pub struct DagGraph<C> {
    graph: DiGraph<GraphNode<C>, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl<C> Default for DagGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for DagGraph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges: Vec<(&str, &str)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].id.as_str(), self.graph[b].id.as_str()))
            .collect();
        f.debug_struct("DagGraph")
            .field("nodes", &self.ids().collect::<Vec<_>>())
            .field("edges", &edges)
            .finish()
    }
}

impl<C> DagGraph<C> {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Add a node under a freshly generated id and return that id.
    pub fn add_node(&mut self, node: impl Node<C> + 'static) -> NodeId {
        let mut id = generate_node_id();
        while self.index.contains_key(&id) {
            id = generate_node_id();
        }
        self.insert(id.clone(), Box::new(node));
        id
    }

    /// Add a node under a caller-chosen id.
    pub fn add_named(&mut self, id: impl Into<NodeId>, node: impl Node<C> + 'static) -> Result<NodeId> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(BenchError::DuplicateNode(id));
        }
        self.insert(id.clone(), Box::new(node));
        Ok(id)
    }

    /// Add the edge `from -> to`.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let a = self.require(from)?;
        let b = self.require(to)?;
        self.graph.update_edge(a, b, ());
        Ok(())
    }

    /// Fan out: add `from -> t` for every `t` in `to`.
    pub fn add_edges(&mut self, from: &str, to: &[&str]) -> Result<()> {
        for t in to {
            self.add_edge(from, t)?;
        }
        Ok(())
    }

    /// Add `ids[0] -> ids[1] -> ... -> ids[n-1]`.
    pub fn chain(&mut self, ids: &[&str]) -> Result<()> {
        for pair in ids.windows(2) {
            self.add_edge(pair[0], pair[1])?;
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All node ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|i| self.graph[i].id.as_str())
    }

    /// Immediate successors of a node, in the order the edges were added.
    pub fn successors_of(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&i| self.ids_of(&self.successors(i)))
            .unwrap_or_default()
    }

    /// Immediate predecessors of a node, in the order the edges were added.
    pub fn predecessors_of(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&i| self.ids_of(&self.predecessors(i)))
            .unwrap_or_default()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn id(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].id
    }

    pub(crate) fn op(&self, idx: NodeIndex) -> &dyn Node<C> {
        self.graph[idx].op.as_ref()
    }

    pub(crate) fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_in_order(idx, Direction::Outgoing)
    }

    pub(crate) fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors_in_order(idx, Direction::Incoming)
    }

    fn neighbors_in_order(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        // petgraph yields the most recently added edge first.
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        out.reverse();
        out
    }

    fn ids_of(&self, idxs: &[NodeIndex]) -> Vec<&str> {
        idxs.iter().map(|&i| self.id(i)).collect()
    }

    fn insert(&mut self, id: NodeId, op: Box<dyn Node<C>>) {
        let idx = self.graph.add_node(GraphNode { id: id.clone(), op });
        self.index.insert(id, idx);
    }

    fn require(&self, id: &str) -> Result<NodeIndex> {
        self.index_of(id)
            .ok_or_else(|| BenchError::UnknownNode(id.to_string()))
    }
}
