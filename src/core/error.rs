// This module defines the error types of the instruction selector using the thiserror crate.
// IselError covers every way selecting a function can fail: a generic node that no pattern
// in the table matches (an incomplete target description, or a result type the target has
// no register class for), an operand-selection path the target explicitly does not
// implement (inline-assembly memory operands), a live node the supplied order never
// visited, and an order entry naming no node. Each variant carries the node id and, for
// no-match, the printed node so the driver can report it. None of these are
// recovered inside the selector; they propagate to whoever drives selection. IselResult<T>
// is the usual alias.

//! Error types for instruction selection.

use super::dag::NodeId;
use thiserror::Error;

/// Fatal instruction-selection failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IselError {
    /// No pattern matches a generic node.
    #[error("Cannot select: {description}")]
    NoMatch { node: NodeId, description: String },

    /// No pattern matches a generic node that produces a type the target cannot hold.
    #[error("Cannot select: {description}: {ty} is not a legal type for this target")]
    IllegalType {
        node: NodeId,
        ty: String,
        description: String,
    },

    /// A selection path the target knows it does not implement.
    #[error("Unimplemented: {operation}")]
    Unimplemented { operation: &'static str },

    /// A live node missing from the visitation order.
    #[error("Node {node} was never visited by the selection order")]
    Unvisited { node: NodeId },

    /// An order entry that names no node of the DAG.
    #[error("Selection order refers to unknown node {node}")]
    InvalidOrder { node: NodeId },
}

impl IselError {
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            IselError::NoMatch { .. } | IselError::IllegalType { .. }
        )
    }

    pub fn is_unimplemented(&self) -> bool {
        matches!(self, IselError::Unimplemented { .. })
    }
}

/// Result type alias for selection operations.
pub type IselResult<T> = Result<T, IselError>;
