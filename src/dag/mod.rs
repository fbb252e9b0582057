// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`node`] defines the task node contract.
//! - [`context`] holds the single shared context of one run.
//! - [`graph`] is the node graph builder.
//! - [`pipeline`] walks the graph from a root and executes it frontier by
//!   frontier.

pub mod context;
pub mod graph;
pub mod node;
pub mod pipeline;

pub use context::{SharedContext, Slot};
pub use graph::DagGraph;
pub use node::{BoxFuture, Node, NodeId, generate_node_id};
pub use pipeline::Pipeline;
