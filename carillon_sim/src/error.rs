// Error taxonomy for graph construction and simulation stepping.
//
// Module overview:
// - `NetworkError` covers every fallible public operation in this crate.
// - `AttrTarget` names where a missing attribute lookup pointed.
//
// Bulk operations are transactional: any error here means no partial state
// was committed. During `SoundNetwork::update` these errors are demoted to
// per-explorer entries in the tick report instead of aborting the tick.

use crate::behavior::EndBehavior;
use crate::types::{EdgeKey, NodeId};
use std::fmt;
use thiserror::Error;

/// Where a failed attribute lookup was aimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrTarget {
    Node(NodeId),
    Edge(EdgeKey),
}

impl fmt::Display for AttrTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrTarget::Node(node) => write!(f, "node {node}"),
            AttrTarget::Edge(edge) => write!(f, "edge {edge}"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum NetworkError {
    /// Caller passed a value the operation cannot accept (non-finite dt,
    /// negative speed, mismatched bulk lengths, ...).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// An operation referenced a node the graph does not contain.
    #[error("unknown node {node}")]
    UnknownNode { node: NodeId },

    /// An operation referenced a directed edge the graph does not contain.
    #[error("unknown edge {edge}")]
    UnknownEdge { edge: EdgeKey },

    /// A required attribute was never assigned to its node or edge.
    #[error("missing attribute `{attr}` on {target}")]
    MissingAttribute { target: AttrTarget, attr: String },

    /// The requested end behavior has no resolution rule in this build.
    #[error("unsupported end behavior {behavior:?}")]
    UnsupportedBehavior { behavior: EndBehavior },
}

pub type Result<T> = std::result::Result<T, NetworkError>;
