// End-behavior resolution: what happens when an explorer finishes its edge.
//
// Resolution is a pure decision over the arrived explorer and the current
// graph; it never mutates anything. The network applies the returned spawn
// list afterwards, which keeps partial failures from leaking state. The
// decision must be made while the arrived explorer still occupies its pair,
// since that occupancy is what stops `Explode` from doubling straight back.

use crate::error::{NetworkError, Result};
use crate::explorer::Explorer;
use crate::graph::SoundGraph;
use crate::types::EdgeKey;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Policy an explorer carries for its own arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndBehavior {
    /// Turn around: one new explorer on the reverse direction.
    Bounce,
    /// Fan out from the destination onto every unoccupied adjacent pair.
    Explode,
    /// Restart somewhere random. Recognised but rejected: accepting it would
    /// make runs irreproducible, so `resolve` reports it unsupported.
    RandomRestart,
}

/// One explorer to create, in the orientation it should travel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spawn {
    pub edge: EdgeKey,
    pub natural_speed: f64,
    pub behavior: EndBehavior,
}

/// Arrival fan-out. `Explode` at a busy junction stays small; four inline
/// slots cover the common cases without allocating.
pub type SpawnList = SmallVec<[Spawn; 4]>;

/// Decide the successors of an explorer that has reached its destination.
pub fn resolve(explorer: &Explorer, graph: &SoundGraph) -> Result<SpawnList> {
    match explorer.behavior() {
        EndBehavior::Bounce => Ok(smallvec![Spawn {
            edge: explorer.edge().reversed(),
            natural_speed: explorer.natural_speed(),
            behavior: EndBehavior::Bounce,
        }]),
        EndBehavior::Explode => {
            let mut spawns = SpawnList::new();
            for neighbor in graph.neighbors(explorer.node_b())? {
                let occupancy =
                    neighbor.attrs.mite_count + graph.mite_count(neighbor.edge.reversed())?;
                if occupancy < 1 {
                    spawns.push(Spawn {
                        edge: neighbor.edge,
                        natural_speed: explorer.natural_speed(),
                        behavior: EndBehavior::Explode,
                    });
                }
            }
            Ok(spawns)
        }
        EndBehavior::RandomRestart => Err(NetworkError::UnsupportedBehavior {
            behavior: EndBehavior::RandomRestart,
        }),
    }
}
