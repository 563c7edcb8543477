// Undirected sound-graph storage.
//
// Module overview:
// - `SoundGraph` owns nodes, edges, adjacency, and per-edge bookkeeping.
// - `NodeData`/`EdgeData` hold musical attributes plus free-form tags.
// - Bulk setters are transactional: validate everything, then apply, so a
//   failed call never leaves the graph half-written.
//
// Every undirected connection is stored as two directed `EdgeKey`s. The two
// halves share their curve and speed (writes go to both) but own their
// occupancy count and played flag independently. Adjacency lists preserve
// declaration order so traversal decisions are reproducible run to run.
//
// See also: `crate::network` for the simulation loop that drives this graph.

use crate::error::{AttrTarget, NetworkError, Result};
use crate::types::{CurveDirection, CurveId, EdgeKey, NodeId, TagValue};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Attribute records
// ---------------------------------------------------------------------------

/// Musical attributes attached to a node. All fields start unset; the typed
/// getters on `SoundGraph` report `MissingAttribute` until they are assigned.
#[derive(Clone, Debug, Default)]
pub struct NodeData {
    /// Raw note datum, interpreted through the network's `Tuner`.
    pub note: Option<f64>,
    /// Loudness datum, clamped to the MIDI range at emission.
    pub note_velocity: Option<f64>,
    /// Note length in seconds.
    pub duration: Option<f64>,
    /// Deployment-specific tags the simulation carries but never reads.
    pub tags: FxHashMap<String, TagValue>,
}

/// Attributes attached to one directed edge.
#[derive(Clone, Debug, Default)]
pub struct EdgeData {
    /// Traversal speed in fraction-of-edge per second. Shared with the
    /// reverse direction.
    pub speed: Option<f64>,
    /// Curve this edge follows. Shared with the reverse direction.
    pub curve: Option<CurveId>,
    /// Which end of the shared curve this direction departs from.
    pub direction: CurveDirection,
    /// Number of live explorers occupying this direction's pair.
    pub mite_count: u32,
    /// Whether any explorer has finished traversing this pair since the
    /// last reset.
    pub played: bool,
    /// Deployment-specific tags the simulation carries but never reads.
    pub tags: FxHashMap<String, TagValue>,
}

/// One entry of a node's adjacency list.
#[derive(Clone, Copy, Debug)]
pub struct Neighbor<'a> {
    /// The node at the far end.
    pub node: NodeId,
    /// The outgoing directed edge leading there.
    pub edge: EdgeKey,
    /// Attributes of that outgoing edge.
    pub attrs: &'a EdgeData,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct SoundGraph {
    nodes: BTreeMap<NodeId, NodeData>,
    edges: BTreeMap<EdgeKey, EdgeData>,
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
    pairs: Vec<EdgeKey>,
}

impl SoundGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -- construction -------------------------------------------------------

    /// Register nodes. Rejects ids that already exist or repeat within the
    /// call; on error nothing is added.
    pub fn add_nodes(&mut self, nodes: &[NodeId]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for &node in nodes {
            if self.nodes.contains_key(&node) || !seen.insert(node) {
                return Err(NetworkError::InvalidArgument {
                    reason: format!("node {node} declared twice"),
                });
            }
        }
        for &node in nodes {
            self.nodes.insert(node, NodeData::default());
            self.adjacency.insert(node, Vec::new());
        }
        Ok(())
    }

    /// Register undirected connections. Each pair materialises as two
    /// directed edges and two adjacency entries. Rejects self-loops,
    /// unknown endpoints, and pairs already declared in either orientation;
    /// on error nothing is added.
    pub fn add_edges(&mut self, pairs: &[(NodeId, NodeId)]) -> Result<()> {
        let mut seen: BTreeSet<EdgeKey> = BTreeSet::new();
        for &(a, b) in pairs {
            if a == b {
                return Err(NetworkError::InvalidArgument {
                    reason: format!("self-loop on node {a}"),
                });
            }
            if !self.nodes.contains_key(&a) {
                return Err(NetworkError::UnknownNode { node: a });
            }
            if !self.nodes.contains_key(&b) {
                return Err(NetworkError::UnknownNode { node: b });
            }
            let key = EdgeKey::new(a, b);
            if self.edges.contains_key(&key) || !seen.insert(key) {
                return Err(NetworkError::InvalidArgument {
                    reason: format!("edge {key} declared twice"),
                });
            }
            seen.insert(key.reversed());
        }
        for &(a, b) in pairs {
            let key = EdgeKey::new(a, b);
            self.edges.insert(key, EdgeData::default());
            self.edges.insert(key.reversed(), EdgeData::default());
            if let Some(list) = self.adjacency.get_mut(&a) {
                list.push(b);
            }
            if let Some(list) = self.adjacency.get_mut(&b) {
                list.push(a);
            }
            self.pairs.push(key);
        }
        Ok(())
    }

    // -- lookup -------------------------------------------------------------

    pub fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(&node)
    }

    pub fn edge(&self, edge: EdgeKey) -> Option<&EdgeData> {
        self.edges.get(&edge)
    }

    pub fn contains_edge(&self, edge: EdgeKey) -> bool {
        self.edges.contains_key(&edge)
    }

    /// Outgoing edges of `node` in declaration order.
    pub fn neighbors(&self, node: NodeId) -> Result<Vec<Neighbor<'_>>> {
        let adjacent = self
            .adjacency
            .get(&node)
            .ok_or(NetworkError::UnknownNode { node })?;
        let mut out = Vec::with_capacity(adjacent.len());
        for &other in adjacent {
            let edge = EdgeKey::new(node, other);
            if let Some(attrs) = self.edges.get(&edge) {
                out.push(Neighbor {
                    node: other,
                    edge,
                    attrs,
                });
            }
        }
        Ok(out)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Directed edge count: twice the number of declared pairs.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Declared pairs in declaration order, one key per undirected
    /// connection (the orientation they were declared in).
    pub fn declared_pairs(&self) -> &[EdgeKey] {
        &self.pairs
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node_data(&self, node: NodeId) -> Result<&NodeData> {
        self.nodes.get(&node).ok_or(NetworkError::UnknownNode { node })
    }

    fn edge_data(&self, edge: EdgeKey) -> Result<&EdgeData> {
        self.edges.get(&edge).ok_or(NetworkError::UnknownEdge { edge })
    }

    // -- typed attribute getters --------------------------------------------

    pub fn edge_speed(&self, edge: EdgeKey) -> Result<f64> {
        self.edge_data(edge)?
            .speed
            .ok_or_else(|| NetworkError::MissingAttribute {
                target: AttrTarget::Edge(edge),
                attr: "speed".to_owned(),
            })
    }

    pub fn edge_curve(&self, edge: EdgeKey) -> Result<(CurveId, CurveDirection)> {
        let data = self.edge_data(edge)?;
        match data.curve {
            Some(curve) => Ok((curve, data.direction)),
            None => Err(NetworkError::MissingAttribute {
                target: AttrTarget::Edge(edge),
                attr: "curve".to_owned(),
            }),
        }
    }

    /// Occupancy of one direction.
    pub fn mite_count(&self, edge: EdgeKey) -> Result<u32> {
        Ok(self.edge_data(edge)?.mite_count)
    }

    /// Combined occupancy of both directions of a pair.
    pub fn pair_mite_count(&self, edge: EdgeKey) -> Result<u32> {
        Ok(self.edge_data(edge)?.mite_count + self.edge_data(edge.reversed())?.mite_count)
    }

    pub fn edge_played(&self, edge: EdgeKey) -> Result<bool> {
        Ok(self.edge_data(edge)?.played)
    }

    pub fn node_note(&self, node: NodeId) -> Result<f64> {
        self.node_data(node)?
            .note
            .ok_or_else(|| NetworkError::MissingAttribute {
                target: AttrTarget::Node(node),
                attr: "note".to_owned(),
            })
    }

    pub fn node_velocity(&self, node: NodeId) -> Result<f64> {
        self.node_data(node)?
            .note_velocity
            .ok_or_else(|| NetworkError::MissingAttribute {
                target: AttrTarget::Node(node),
                attr: "note_velocity".to_owned(),
            })
    }

    pub fn node_duration(&self, node: NodeId) -> Result<f64> {
        self.node_data(node)?
            .duration
            .ok_or_else(|| NetworkError::MissingAttribute {
                target: AttrTarget::Node(node),
                attr: "duration".to_owned(),
            })
    }

    pub fn node_tag(&self, node: NodeId, key: &str) -> Result<&TagValue> {
        self.node_data(node)?
            .tags
            .get(key)
            .ok_or_else(|| NetworkError::MissingAttribute {
                target: AttrTarget::Node(node),
                attr: key.to_owned(),
            })
    }

    pub fn edge_tag(&self, edge: EdgeKey, key: &str) -> Result<&TagValue> {
        self.edge_data(edge)?
            .tags
            .get(key)
            .ok_or_else(|| NetworkError::MissingAttribute {
                target: AttrTarget::Edge(edge),
                attr: key.to_owned(),
            })
    }

    // -- bulk attribute setters ---------------------------------------------
    //
    // All setters accept either one value per target or a single value
    // broadcast to every listed target, and validate everything before
    // touching the graph.

    fn check_len(op: &str, targets: usize, values: usize) -> Result<()> {
        if values == targets || values == 1 {
            Ok(())
        } else {
            Err(NetworkError::InvalidArgument {
                reason: format!("{op}: {values} values for {targets} targets"),
            })
        }
    }

    fn value_for<T: Clone>(values: &[T], index: usize) -> T {
        if values.len() == 1 {
            values[0].clone()
        } else {
            values[index].clone()
        }
    }

    /// Assign traversal speeds. Writes both directions of each listed pair.
    pub fn set_edge_speeds(&mut self, targets: &[EdgeKey], speeds: &[f64]) -> Result<()> {
        Self::check_len("set_edge_speeds", targets.len(), speeds.len())?;
        for &edge in targets {
            self.edge_data(edge)?;
        }
        for &speed in speeds {
            if !speed.is_finite() || speed < 0.0 {
                return Err(NetworkError::InvalidArgument {
                    reason: format!("edge speed {speed} must be finite and non-negative"),
                });
            }
        }
        for (i, &edge) in targets.iter().enumerate() {
            let speed = Self::value_for(speeds, i);
            if let Some(data) = self.edges.get_mut(&edge) {
                data.speed = Some(speed);
            }
            if let Some(data) = self.edges.get_mut(&edge.reversed()) {
                data.speed = Some(speed);
            }
        }
        Ok(())
    }

    /// Assign curves. The listed orientation departs from the curve's start;
    /// the reverse direction samples it back to front.
    pub fn set_edge_curves(&mut self, targets: &[EdgeKey], curves: &[CurveId]) -> Result<()> {
        Self::check_len("set_edge_curves", targets.len(), curves.len())?;
        for &edge in targets {
            self.edge_data(edge)?;
        }
        for (i, &edge) in targets.iter().enumerate() {
            let curve = Self::value_for(curves, i);
            if let Some(data) = self.edges.get_mut(&edge) {
                data.curve = Some(curve);
                data.direction = CurveDirection::Forward;
            }
            if let Some(data) = self.edges.get_mut(&edge.reversed()) {
                data.curve = Some(curve);
                data.direction = CurveDirection::Reverse;
            }
        }
        Ok(())
    }

    fn set_node_scalars(
        &mut self,
        op: &str,
        targets: &[NodeId],
        values: &[f64],
        assign: fn(&mut NodeData, f64),
    ) -> Result<()> {
        Self::check_len(op, targets.len(), values.len())?;
        for &node in targets {
            self.node_data(node)?;
        }
        for &value in values {
            if !value.is_finite() {
                return Err(NetworkError::InvalidArgument {
                    reason: format!("{op}: value {value} must be finite"),
                });
            }
        }
        for (i, &node) in targets.iter().enumerate() {
            let value = Self::value_for(values, i);
            if let Some(data) = self.nodes.get_mut(&node) {
                assign(data, value);
            }
        }
        Ok(())
    }

    pub fn set_node_notes(&mut self, targets: &[NodeId], notes: &[f64]) -> Result<()> {
        self.set_node_scalars("set_node_notes", targets, notes, |data, v| {
            data.note = Some(v)
        })
    }

    pub fn set_node_velocities(&mut self, targets: &[NodeId], velocities: &[f64]) -> Result<()> {
        self.set_node_scalars("set_node_velocities", targets, velocities, |data, v| {
            data.note_velocity = Some(v)
        })
    }

    pub fn set_node_durations(&mut self, targets: &[NodeId], durations: &[f64]) -> Result<()> {
        self.set_node_scalars("set_node_durations", targets, durations, |data, v| {
            data.duration = Some(v)
        })
    }

    /// Attach a tag to each listed node under `key`.
    pub fn set_node_tags(
        &mut self,
        key: &str,
        targets: &[NodeId],
        values: &[TagValue],
    ) -> Result<()> {
        Self::check_len("set_node_tags", targets.len(), values.len())?;
        for &node in targets {
            self.node_data(node)?;
        }
        for (i, &node) in targets.iter().enumerate() {
            let value = Self::value_for(values, i);
            if let Some(data) = self.nodes.get_mut(&node) {
                data.tags.insert(key.to_owned(), value);
            }
        }
        Ok(())
    }

    /// Attach a tag to each listed directed edge under `key`. Unlike speed
    /// and curve, tags are per-direction; list both orientations to tag a
    /// whole pair.
    pub fn set_edge_tags(
        &mut self,
        key: &str,
        targets: &[EdgeKey],
        values: &[TagValue],
    ) -> Result<()> {
        Self::check_len("set_edge_tags", targets.len(), values.len())?;
        for &edge in targets {
            self.edge_data(edge)?;
        }
        for (i, &edge) in targets.iter().enumerate() {
            let value = Self::value_for(values, i);
            if let Some(data) = self.edges.get_mut(&edge) {
                data.tags.insert(key.to_owned(), value);
            }
        }
        Ok(())
    }

    // -- simulation bookkeeping ---------------------------------------------

    /// Record one explorer entering a pair. Both directions count it.
    pub(crate) fn occupy_pair(&mut self, edge: EdgeKey) {
        if let Some(data) = self.edges.get_mut(&edge) {
            data.mite_count += 1;
        }
        if let Some(data) = self.edges.get_mut(&edge.reversed()) {
            data.mite_count += 1;
        }
    }

    /// Record one explorer leaving a pair.
    pub(crate) fn release_pair(&mut self, edge: EdgeKey) {
        if let Some(data) = self.edges.get_mut(&edge) {
            data.mite_count = data.mite_count.saturating_sub(1);
        }
        if let Some(data) = self.edges.get_mut(&edge.reversed()) {
            data.mite_count = data.mite_count.saturating_sub(1);
        }
    }

    /// Mark both directions of a pair as having been fully traversed.
    pub(crate) fn mark_pair_played(&mut self, edge: EdgeKey) {
        if let Some(data) = self.edges.get_mut(&edge) {
            data.played = true;
        }
        if let Some(data) = self.edges.get_mut(&edge.reversed()) {
            data.played = true;
        }
    }

    /// Return every edge to its unoccupied, unplayed state. Attributes and
    /// topology are untouched.
    pub(crate) fn reset_epoch(&mut self) {
        for data in self.edges.values_mut() {
            data.mite_count = 0;
            data.played = false;
        }
    }
}
