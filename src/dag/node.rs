// src/dag/node.rs

//! The task node contract.

use std::future::Future;
use std::pin::Pin;

use crate::dag::context::SharedContext;

/// Node identity, unique within one graph.
pub type NodeId = String;

/// Boxed future returned by [`Node::execute`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generate a short opaque node id (8 hex chars).
pub fn generate_node_id() -> NodeId {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// One unit of asynchronous work in a pipeline.
///
/// A node communicates only through the shared context: it reads what its
/// predecessors produced and writes its own outputs back. Recoverable
/// failures should be recorded with [`SharedContext::fail`] so that later
/// nodes can short-circuit; returning `Err` aborts the whole run.
pub trait Node<C>: Send + Sync {
    fn execute<'a>(&'a self, ctx: &'a SharedContext<C>) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Context keys this node writes.
    ///
    /// Two nodes in the same ready frontier must not declare the same key.
    /// Nodes that return an empty slice are not checked.
    fn writes(&self) -> &[&'static str] {
        &[]
    }
}
