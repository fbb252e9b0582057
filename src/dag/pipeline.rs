// src/dag/pipeline.rs

//! Frontier-by-frontier execution of a [`DagGraph`].

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use petgraph::graph::NodeIndex;
use tracing::{debug, info};

use crate::dag::context::SharedContext;
use crate::dag::graph::DagGraph;
use crate::dag::node::NodeId;
use crate::errors::{BenchError, Result};

/// A graph plus the root node its run starts from.
///
/// Only nodes reachable from the root (over successor edges) take part in a
/// run. Each run:
/// 1. collects the reachable nodes by depth-first traversal,
/// 2. computes every node's in-degree,
/// 3. executes the ready frontier (in-degree zero, not yet executed)
///    concurrently on the current task and waits for all of it to settle,
/// 4. decrements the successors' in-degrees and repeats until every node has
///    run, or fails with [`BenchError::CycleDetected`] when nothing is ready.
#[derive(Debug)]
pub struct Pipeline<C> {
    graph: DagGraph<C>,
    root: NodeId,
}

impl<C: Send> Pipeline<C> {
    pub fn new(graph: DagGraph<C>, root: impl Into<NodeId>) -> Result<Self> {
        let root = root.into();
        if !graph.contains(&root) {
            return Err(BenchError::UnknownNode(root));
        }
        Ok(Self { graph, root })
    }

    pub fn graph(&self) -> &DagGraph<C> {
        &self.graph
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Ids of every node reachable from the root, in depth-first pre-order.
    pub fn collect_nodes(&self) -> Vec<&str> {
        self.reachable()
            .into_iter()
            .map(|i| self.graph.id(i))
            .collect()
    }

    /// Run every reachable node once against `ctx`.
    ///
    /// A node returning `Err` is fatal: the frontier it belongs to still
    /// settles, then the run stops with [`BenchError::NodeFailed`].
    pub async fn run(&self, ctx: &SharedContext<C>) -> Result<()> {
        let order = self.reachable();
        let reachable: HashSet<NodeIndex> = order.iter().copied().collect();

        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::with_capacity(order.len());
        for &idx in &order {
            let preds = self.graph.predecessors(idx);
            if let Some(&missing) = preds.iter().find(|p| !reachable.contains(p)) {
                return Err(BenchError::UnreachablePredecessor {
                    node: self.graph.id(idx).to_string(),
                    predecessor: self.graph.id(missing).to_string(),
                });
            }
            in_degree.insert(idx, preds.len());
        }

        info!(root = %self.root, nodes = order.len(), "pipeline: starting run");

        let mut executed: HashSet<NodeIndex> = HashSet::with_capacity(order.len());
        let mut frontier_no = 0usize;

        while executed.len() < order.len() {
            let ready: Vec<NodeIndex> = order
                .iter()
                .copied()
                .filter(|i| !executed.contains(i) && in_degree.get(i) == Some(&0))
                .collect();

            if ready.is_empty() {
                let stuck: Vec<&str> = order
                    .iter()
                    .filter(|i| !executed.contains(i))
                    .map(|&i| self.graph.id(i))
                    .collect();
                return Err(BenchError::CycleDetected(format!(
                    "no runnable node among {:?}",
                    stuck
                )));
            }

            self.check_write_conflicts(&ready)?;

            frontier_no += 1;
            debug!(
                frontier = frontier_no,
                nodes = ?ready.iter().map(|&i| self.graph.id(i)).collect::<Vec<_>>(),
                "pipeline: executing frontier"
            );

            let outcomes = join_all(ready.iter().map(|&idx| async move {
                let outcome = self.graph.op(idx).execute(ctx).await;
                (idx, outcome)
            }))
            .await;

            for (idx, outcome) in outcomes {
                if let Err(source) = outcome {
                    return Err(BenchError::NodeFailed {
                        node: self.graph.id(idx).to_string(),
                        source,
                    });
                }
            }

            for &idx in &ready {
                executed.insert(idx);
                for succ in self.graph.successors(idx) {
                    if let Some(d) = in_degree.get_mut(&succ) {
                        *d = d.saturating_sub(1);
                    }
                }
            }
        }

        info!(
            root = %self.root,
            frontiers = frontier_no,
            failed = ctx.has_failed(),
            "pipeline: run finished"
        );
        Ok(())
    }

    /// Convenience: wrap `state` in a fresh context, run, and hand the context back.
    pub async fn run_with(&self, state: C) -> Result<SharedContext<C>> {
        let ctx = SharedContext::new(state);
        self.run(&ctx).await?;
        Ok(ctx)
    }

    /// Render the reachable graph as a Mermaid `graph TD` diagram.
    pub fn visualize(&self) -> String {
        let mut lines = vec!["graph TD".to_string()];
        for idx in self.reachable() {
            let id = self.graph.id(idx);
            let preds = self.graph.predecessors(idx);
            if preds.is_empty() {
                lines.push(format!("    {id}"));
            }
            for p in preds {
                lines.push(format!("    {} --> {id}", self.graph.id(p)));
            }
        }
        lines.join("\n")
    }

    fn reachable(&self) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let Some(root) = self.graph.index_of(&self.root) else {
            return order;
        };

        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            order.push(idx);
            // Reverse so the first-added successor is visited first.
            stack.extend(self.graph.successors(idx).into_iter().rev());
        }
        order
    }

    fn check_write_conflicts(&self, ready: &[NodeIndex]) -> Result<()> {
        let mut writers: HashMap<&str, NodeIndex> = HashMap::new();
        for &idx in ready {
            for &key in self.graph.op(idx).writes() {
                if let Some(&first) = writers.get(key) {
                    return Err(BenchError::ConflictingWrites {
                        key: key.to_string(),
                        first: self.graph.id(first).to_string(),
                        second: self.graph.id(idx).to_string(),
                    });
                }
                writers.insert(key, idx);
            }
        }
        Ok(())
    }
}
