// Core identifier and attribute types shared across the simulation.
//
// Node and curve identifiers are compact newtypes assigned by the host that
// feeds us topology; the simulation never invents ids of its own. All types
// derive `Serialize`/`Deserialize` so blueprints and state snapshots can
// cross the host boundary as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable identifier for a graph node, assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a curve owned by the host's geometry kernel.
///
/// The simulation never evaluates curves itself; it only stores the
/// reference and hands it back through `geometry::CurveEvaluator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurveId(pub u32);

/// A directed edge identified by its endpoints.
///
/// Every undirected connection in a `SoundGraph` is stored as two `EdgeKey`s,
/// one per direction. `reversed()` names the opposite half of the same pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub a: NodeId,
    pub b: NodeId,
}

impl EdgeKey {
    pub const fn new(a: NodeId, b: NodeId) -> Self {
        Self { a, b }
    }

    /// The opposite direction of the same undirected pair.
    pub const fn reversed(self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }
}

impl From<(u32, u32)> for EdgeKey {
    fn from((a, b): (u32, u32)) -> Self {
        Self::new(NodeId(a), NodeId(b))
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {})", self.a, self.b)
    }
}

// ---------------------------------------------------------------------------
// Curve orientation
// ---------------------------------------------------------------------------

/// How a directed edge traverses the curve it shares with its reverse.
///
/// Both directions of a pair reference the same `CurveId`; the direction
/// flag records which end of the curve is the edge's origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveDirection {
    #[default]
    Forward,
    Reverse,
}

impl CurveDirection {
    /// Fold a traversal fraction onto the shared curve's parameter. The
    /// reverse direction samples the curve back to front.
    pub fn oriented(self, t: f64) -> f64 {
        match self {
            CurveDirection::Forward => t,
            CurveDirection::Reverse => 1.0 - t,
        }
    }
}

// ---------------------------------------------------------------------------
// Extensible attribute tags
// ---------------------------------------------------------------------------

/// Value for deployment-specific node/edge tags that have no closed field on
/// `NodeData`/`EdgeData`. Everything the simulation itself reads lives in
/// named fields; tags are carried for the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Number(f64),
    Flag(bool),
    Text(String),
}
