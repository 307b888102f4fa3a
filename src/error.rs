//! Errors surfaced by explicit tree mutations.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors returned when a tree mutation is given invalid arguments.
///
/// Assembling a malformed trace is never an error: the builder degrades to a
/// best-effort tree and reports data-quality problems through its logger
/// instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    /// A node cannot be added as a child of itself.
    #[error("Circular dependency on node {0:?}")]
    ChildIsSelf(NodeId),

    /// The node id was not produced by this tree.
    #[error("Node {0:?} does not belong to this tree")]
    UnknownNode(NodeId),
}
