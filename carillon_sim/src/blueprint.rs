// Serializable network descriptions.
//
// A `Blueprint` is the whole setup of a network in one value: topology,
// attributes, seed explorers, tuning. It exists so hosts can keep scores in
// JSON files and hand them across process boundaries. Applying a blueprint
// only ever goes through the network's public operations, so everything a
// blueprint can express, host code can express directly.

use crate::behavior::EndBehavior;
use crate::error::{NetworkError, Result};
use crate::network::SoundNetwork;
use crate::note::NotePlayer;
use crate::tuner::Tuner;
use crate::types::{CurveId, EdgeKey, NodeId};
use serde::{Deserialize, Serialize};

/// One explorer to seed after setup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Departure {
    /// Directed edge the explorer departs on, as `(origin, destination)`.
    pub edge: (u32, u32),
    #[serde(default = "default_natural_speed")]
    pub natural_speed: f64,
    pub behavior: EndBehavior,
}

fn default_natural_speed() -> f64 {
    1.0
}

/// A complete network description.
///
/// `nodes` and `edges` are required; every other section is optional and
/// skipped when empty. Attribute lists follow the bulk-setter convention:
/// one value per entry of `edges` (or `nodes`), or a single value broadcast
/// to all of them.
///
/// ```
/// use carillon_sim::blueprint::Blueprint;
/// use carillon_sim::note::NullPlayer;
///
/// let json = r#"{
///     "nodes": [0, 1],
///     "edges": [[0, 1]],
///     "speeds": [0.5],
///     "notes": [60.0, 62.0],
///     "velocities": [100.0],
///     "durations": [0.5],
///     "explorers": [{ "edge": [0, 1], "behavior": "Bounce" }]
/// }"#;
/// let blueprint = Blueprint::from_json(json).unwrap();
/// let mut network = blueprint.build(Box::new(NullPlayer)).unwrap();
/// network.update(1.0).unwrap();
/// assert_eq!(network.explorer_count(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub nodes: Vec<u32>,
    /// Undirected pairs as `(a, b)`; attribute lists below parallel this.
    pub edges: Vec<(u32, u32)>,
    #[serde(default)]
    pub speeds: Vec<f64>,
    #[serde(default)]
    pub curves: Vec<u32>,
    #[serde(default)]
    pub notes: Vec<f64>,
    #[serde(default)]
    pub velocities: Vec<f64>,
    #[serde(default)]
    pub durations: Vec<f64>,
    #[serde(default)]
    pub explorers: Vec<Departure>,
    #[serde(default)]
    pub tuner: Option<Tuner>,
}

impl Blueprint {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| NetworkError::InvalidArgument {
            reason: format!("blueprint parse: {err}"),
        })
    }

    /// Set a network up from scratch: topology, then attributes, then tuner
    /// and seed explorers. Stages run in order and each stage is
    /// all-or-nothing, but a failure partway leaves earlier stages applied.
    /// Use `build` when the half-configured network should be discarded.
    pub fn apply(&self, network: &mut SoundNetwork) -> Result<()> {
        let nodes: Vec<NodeId> = self.nodes.iter().copied().map(NodeId).collect();
        let edges: Vec<(NodeId, NodeId)> = self
            .edges
            .iter()
            .map(|&(a, b)| (NodeId(a), NodeId(b)))
            .collect();
        network.set_up(&nodes, &edges)?;

        let keys: Vec<EdgeKey> = self.edges.iter().map(|&pair| EdgeKey::from(pair)).collect();
        if !self.speeds.is_empty() {
            network.set_edge_speeds(&keys, &self.speeds)?;
        }
        if !self.curves.is_empty() {
            let curves: Vec<CurveId> = self.curves.iter().copied().map(CurveId).collect();
            network.set_edge_curves(&keys, &curves)?;
        }
        if !self.notes.is_empty() {
            network.set_node_notes(&nodes, &self.notes)?;
        }
        if !self.velocities.is_empty() {
            network.set_node_velocities(&nodes, &self.velocities)?;
        }
        if !self.durations.is_empty() {
            network.set_node_durations(&nodes, &self.durations)?;
        }
        if let Some(tuner) = self.tuner {
            network.update_tuner(Some(tuner.a4_reference()), Some(tuner.scale_factor()))?;
        }
        for departure in &self.explorers {
            network.add_explorer(
                EdgeKey::from(departure.edge),
                departure.natural_speed,
                departure.behavior,
            )?;
        }
        Ok(())
    }

    /// Build a fresh network around `player` and apply this blueprint to it.
    pub fn build(&self, player: Box<dyn NotePlayer>) -> Result<SoundNetwork> {
        let mut network = SoundNetwork::new(player);
        self.apply(&mut network)?;
        Ok(network)
    }
}
