// The simulation loop that turns graph traversal into notes.
//
// Module overview:
// - `SoundNetwork` owns the graph, the live explorers, the tuner, and the
//   per-tick note batch, and is the only mutation path for all of them.
// - `TickReport` summarises what one `update` did, including per-explorer
//   end-behavior failures that were contained instead of aborting the tick.
//
// One `update(dt)` runs in a fixed order: advance every explorer, run start
// hooks, resolve arrivals over a snapshot of the pre-tick population (new
// spawns are not advanced or resolved until the next tick), then flush the
// batch to the player and clear it.
//
// **Critical constraint: one batch per tick.** The player hears exactly one
// `play_notes` call per `update`, empty or not, after all mutation for that
// tick is done. Nothing else in the crate may flush the batch.
//
// See also: `crate::behavior` for the arrival rules this loop applies.

use crate::behavior::{self, EndBehavior};
use crate::error::{NetworkError, Result};
use crate::explorer::Explorer;
use crate::geometry::{CurveEvaluator, PLACEHOLDER_POINT};
use crate::graph::SoundGraph;
use crate::note::{NoteEvent, NotePlayer, NullPlayer, clamp_to_midi};
use crate::tuner::Tuner;
use crate::types::{CurveId, EdgeKey, NodeId, TagValue};
use smallvec::SmallVec;
use std::fmt;

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// What one `update` call did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Notes flushed to the player this tick.
    pub notes: usize,
    /// Explorers created by end behaviors this tick.
    pub spawned: usize,
    /// Explorers retired this tick.
    pub removed: usize,
    /// Arrivals whose resolution failed, keyed by the edge the explorer was
    /// on. The explorer is removed and its occupancy released regardless.
    pub failures: Vec<(EdgeKey, NetworkError)>,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

pub struct SoundNetwork {
    graph: SoundGraph,
    explorers: Vec<Explorer>,
    batch: Vec<NoteEvent>,
    tuner: Tuner,
    player: Box<dyn NotePlayer>,
    start_hook: Option<Box<dyn FnMut(&Explorer) + Send>>,
    ticks: u64,
}

impl fmt::Debug for SoundNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundNetwork")
            .field("nodes", &self.graph.node_count())
            .field("pairs", &self.graph.pair_count())
            .field("explorers", &self.explorers.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl SoundNetwork {
    pub fn new(player: Box<dyn NotePlayer>) -> Self {
        Self {
            graph: SoundGraph::new(),
            explorers: Vec::new(),
            batch: Vec::new(),
            tuner: Tuner::default(),
            player,
            start_hook: None,
            ticks: 0,
        }
    }

    /// A network that discards its batches. For headless use and tests.
    pub fn silent() -> Self {
        Self::new(Box::new(NullPlayer))
    }

    // -- topology and attributes --------------------------------------------

    /// Replace the topology. Validation happens on a scratch graph, so a
    /// failed call leaves the previous topology, explorers, and batch
    /// untouched; a successful one clears live explorers and the pending
    /// batch along with all bookkeeping.
    pub fn set_up(&mut self, nodes: &[NodeId], edges: &[(NodeId, NodeId)]) -> Result<()> {
        let mut graph = SoundGraph::new();
        graph.add_nodes(nodes)?;
        graph.add_edges(edges)?;
        self.graph = graph;
        self.explorers.clear();
        self.batch.clear();
        Ok(())
    }

    /// Read access to the graph. All mutation goes through the network so
    /// occupancy bookkeeping cannot be bypassed.
    pub fn graph(&self) -> &SoundGraph {
        &self.graph
    }

    pub fn set_edge_speeds(&mut self, targets: &[EdgeKey], speeds: &[f64]) -> Result<()> {
        self.graph.set_edge_speeds(targets, speeds)
    }

    pub fn set_edge_curves(&mut self, targets: &[EdgeKey], curves: &[CurveId]) -> Result<()> {
        self.graph.set_edge_curves(targets, curves)
    }

    pub fn set_node_notes(&mut self, targets: &[NodeId], notes: &[f64]) -> Result<()> {
        self.graph.set_node_notes(targets, notes)
    }

    pub fn set_node_velocities(&mut self, targets: &[NodeId], velocities: &[f64]) -> Result<()> {
        self.graph.set_node_velocities(targets, velocities)
    }

    pub fn set_node_durations(&mut self, targets: &[NodeId], durations: &[f64]) -> Result<()> {
        self.graph.set_node_durations(targets, durations)
    }

    pub fn set_node_tags(
        &mut self,
        key: &str,
        targets: &[NodeId],
        values: &[TagValue],
    ) -> Result<()> {
        self.graph.set_node_tags(key, targets, values)
    }

    pub fn set_edge_tags(
        &mut self,
        key: &str,
        targets: &[EdgeKey],
        values: &[TagValue],
    ) -> Result<()> {
        self.graph.set_edge_tags(key, targets, values)
    }

    // -- explorers ----------------------------------------------------------

    /// Seed one explorer at the origin of `edge`. Its effective speed is the
    /// edge's speed times `natural_speed`, captured now; later speed edits
    /// affect only future spawns. Fails without side effects if the edge is
    /// unknown, its speed is unset, the multiplier is invalid, or the
    /// behavior is unsupported.
    pub fn add_explorer(
        &mut self,
        edge: EdgeKey,
        natural_speed: f64,
        behavior: EndBehavior,
    ) -> Result<()> {
        if behavior == EndBehavior::RandomRestart {
            return Err(NetworkError::UnsupportedBehavior { behavior });
        }
        if !natural_speed.is_finite() || natural_speed < 0.0 {
            return Err(NetworkError::InvalidArgument {
                reason: format!("natural speed {natural_speed} must be finite and non-negative"),
            });
        }
        let speed = self.graph.edge_speed(edge)? * natural_speed;
        self.graph.occupy_pair(edge);
        self.explorers
            .push(Explorer::new(edge, speed, natural_speed, behavior));
        Ok(())
    }

    pub fn explorers(&self) -> &[Explorer] {
        &self.explorers
    }

    pub fn explorer_count(&self) -> usize {
        self.explorers.len()
    }

    /// Each live explorer's edge and traversal fraction.
    pub fn explorer_fractions(&self) -> Vec<(EdgeKey, f64)> {
        self.explorers
            .iter()
            .map(|e| (e.edge(), e.location()))
            .collect()
    }

    /// Called for every explorer still flagged `at_start` after the advance
    /// phase, once per tick. A mover leaves its start on its first advance,
    /// so in practice this fires for parked explorers: zero effective speed
    /// or a zero `dt`.
    pub fn set_start_hook(&mut self, hook: Box<dyn FnMut(&Explorer) + Send>) {
        self.start_hook = Some(hook);
    }

    pub fn clear_start_hook(&mut self) {
        self.start_hook = None;
    }

    // -- tuner --------------------------------------------------------------

    pub fn tuner(&self) -> Tuner {
        self.tuner
    }

    /// Retune the network. Takes effect from the next arrival; notes already
    /// flushed are not revised.
    pub fn update_tuner(
        &mut self,
        a4_reference: Option<f64>,
        scale_factor: Option<f64>,
    ) -> Result<()> {
        for value in [a4_reference, scale_factor].into_iter().flatten() {
            if !value.is_finite() {
                return Err(NetworkError::InvalidArgument {
                    reason: format!("tuner parameter {value} must be finite"),
                });
            }
        }
        self.tuner.update(a4_reference, scale_factor);
        Ok(())
    }

    // -- simulation ---------------------------------------------------------

    /// Advance the whole network by `dt` seconds.
    ///
    /// Errors are returned only for contract violations caught before any
    /// mutation (non-finite or negative `dt`). Failures of individual
    /// arrivals are contained per explorer and reported in the `TickReport`;
    /// the rest of the tick proceeds.
    pub fn update(&mut self, dt: f64) -> Result<TickReport> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(NetworkError::InvalidArgument {
                reason: format!("dt {dt} must be finite and non-negative"),
            });
        }

        for explorer in &mut self.explorers {
            explorer.advance(dt);
        }

        let mut report = TickReport::default();
        let live = self.explorers.len();
        let mut remove = vec![false; live];
        for i in 0..live {
            if self.explorers[i].at_start()
                && let Some(hook) = self.start_hook.as_mut()
            {
                hook(&self.explorers[i]);
            }
            if self.explorers[i].at_end() {
                let arrived = self.explorers[i].clone();
                match self.resolve_arrival(&arrived) {
                    Ok(spawned) => report.spawned += spawned,
                    Err(err) => report.failures.push((arrived.edge(), err)),
                }
                self.graph.release_pair(arrived.edge());
                remove[i] = true;
                report.removed += 1;
            }
        }

        // Drop resolved arrivals; everything past `live` was spawned this
        // tick and stays.
        let mut idx = 0;
        self.explorers.retain(|_| {
            let keep = idx >= remove.len() || !remove[idx];
            idx += 1;
            keep
        });

        report.notes = self.batch.len();
        self.player.play_notes(&self.batch);
        self.batch.clear();
        self.ticks += 1;
        Ok(report)
    }

    /// Resolve one arrival atomically: every graph read happens before any
    /// write, so a failure leaves no half-applied note or spawn. The caller
    /// removes the arrived explorer and releases its pair either way.
    fn resolve_arrival(&mut self, arrived: &Explorer) -> Result<usize> {
        let note = self.build_note(arrived.node_b())?;
        let spawns = behavior::resolve(arrived, &self.graph)?;
        let mut speeds: SmallVec<[f64; 4]> = SmallVec::new();
        for spawn in &spawns {
            speeds.push(self.graph.edge_speed(spawn.edge)?);
        }

        self.batch.push(note);
        for (spawn, &speed) in spawns.iter().zip(speeds.iter()) {
            self.graph.occupy_pair(spawn.edge);
            self.explorers.push(Explorer::new(
                spawn.edge,
                speed * spawn.natural_speed,
                spawn.natural_speed,
                spawn.behavior,
            ));
        }
        self.graph.mark_pair_played(arrived.edge());
        Ok(spawns.len())
    }

    fn build_note(&self, node: NodeId) -> Result<NoteEvent> {
        Ok(NoteEvent {
            pitch: self.tuner.tune_pitch(self.graph.node_note(node)?),
            velocity: clamp_to_midi(self.graph.node_velocity(node)?),
            duration: self.graph.node_duration(node)?.max(0.0),
        })
    }

    /// Drop every explorer and pending note and zero all edge bookkeeping.
    /// Topology and attributes survive. Calling it twice is the same as
    /// calling it once; nothing is flushed to the player.
    pub fn reset(&mut self) {
        self.explorers.clear();
        self.batch.clear();
        self.graph.reset_epoch();
    }

    /// Updates performed since construction. Monotonic; `set_up` and
    /// `reset` do not rewind it.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // -- snapshots ----------------------------------------------------------

    /// One position per live explorer, in explorer order. Edges without a
    /// curve, and curves the evaluator cannot sample, report
    /// `PLACEHOLDER_POINT`.
    pub fn state(&self, evaluator: &dyn CurveEvaluator) -> Vec<[f64; 3]> {
        self.explorers
            .iter()
            .map(|e| match self.graph.edge_curve(e.edge()) {
                Ok((curve, direction)) => evaluator
                    .point_at(curve, direction, e.location())
                    .unwrap_or(PLACEHOLDER_POINT),
                Err(_) => PLACEHOLDER_POINT,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SegmentMap;
    use crate::note::CollectingPlayer;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Two nodes joined by one pair at speed 0.5, notes 60/62.
    fn path_network() -> (SoundNetwork, CollectingPlayer) {
        let view = CollectingPlayer::new();
        let mut net = SoundNetwork::new(Box::new(view.clone()));
        net.set_up(&[NodeId(0), NodeId(1)], &[(NodeId(0), NodeId(1))])
            .unwrap();
        net.set_edge_speeds(&[EdgeKey::from((0, 1))], &[0.5]).unwrap();
        net.set_node_notes(&[NodeId(0), NodeId(1)], &[60.0, 62.0])
            .unwrap();
        net.set_node_velocities(&[NodeId(0), NodeId(1)], &[100.0])
            .unwrap();
        net.set_node_durations(&[NodeId(0), NodeId(1)], &[0.5])
            .unwrap();
        (net, view)
    }

    /// Hub node 0 with the given spokes, all speed 1, every node playable.
    fn star_network(spokes: u32) -> (SoundNetwork, CollectingPlayer) {
        let view = CollectingPlayer::new();
        let mut net = SoundNetwork::new(Box::new(view.clone()));
        let nodes: Vec<NodeId> = (0..=spokes).map(NodeId).collect();
        let edges: Vec<(NodeId, NodeId)> =
            (1..=spokes).map(|s| (NodeId(0), NodeId(s))).collect();
        net.set_up(&nodes, &edges).unwrap();
        let keys: Vec<EdgeKey> = edges.iter().map(|&(a, b)| EdgeKey::new(a, b)).collect();
        net.set_edge_speeds(&keys, &[1.0]).unwrap();
        net.set_node_notes(&nodes, &[60.0]).unwrap();
        net.set_node_velocities(&nodes, &[90.0]).unwrap();
        net.set_node_durations(&nodes, &[0.25]).unwrap();
        (net, view)
    }

    #[test]
    fn bounce_walks_the_pair_back_and_forth() {
        let (mut net, view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();

        let report = net.update(1.0).unwrap();
        assert_eq!(report.notes, 0);
        assert_eq!(net.explorer_fractions(), vec![(EdgeKey::from((0, 1)), 0.5)]);

        let report = net.update(1.0).unwrap();
        assert_eq!(report.notes, 1);
        assert_eq!(report.spawned, 1);
        assert_eq!(report.removed, 1);
        assert!(report.failures.is_empty());
        // Arrival at node 1 sounded that node's note.
        assert_eq!(view.all_batches()[1][0].pitch, 62);
        // The replacement departs the reverse direction, unadvanced.
        assert_eq!(net.explorer_fractions(), vec![(EdgeKey::from((1, 0)), 0.0)]);

        net.update(1.0).unwrap();
        let report = net.update(1.0).unwrap();
        assert_eq!(report.notes, 1);
        assert_eq!(view.all_batches()[3][0].pitch, 60);
        assert_eq!(net.explorer_fractions(), vec![(EdgeKey::from((0, 1)), 0.0)]);
    }

    #[test]
    fn bounce_conserves_the_population() {
        let (mut net, _view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        for _ in 0..50 {
            net.update(0.7).unwrap();
            assert_eq!(net.explorer_count(), 1);
            assert_eq!(net.graph().pair_mite_count(EdgeKey::from((0, 1))).unwrap(), 2);
        }
    }

    #[test]
    fn explode_fans_out_to_every_free_pair() {
        let (mut net, _view) = star_network(4);
        net.add_explorer(EdgeKey::from((4, 0)), 1.0, EndBehavior::Explode)
            .unwrap();

        let report = net.update(1.0).unwrap();
        assert_eq!(report.notes, 1);
        assert_eq!(report.spawned, 3);
        let edges: Vec<EdgeKey> = net.explorer_fractions().iter().map(|&(e, _)| e).collect();
        assert_eq!(
            edges,
            vec![
                EdgeKey::from((0, 1)),
                EdgeKey::from((0, 2)),
                EdgeKey::from((0, 3)),
            ]
        );
    }

    #[test]
    fn explode_cannot_double_back_through_its_own_pair() {
        let (mut net, _view) = star_network(3);
        net.add_explorer(EdgeKey::from((1, 0)), 1.0, EndBehavior::Explode)
            .unwrap();

        let report = net.update(1.0).unwrap();
        assert_eq!(report.spawned, 2);
        let edges: Vec<EdgeKey> = net.explorer_fractions().iter().map(|&(e, _)| e).collect();
        assert_eq!(edges, vec![EdgeKey::from((0, 2)), EdgeKey::from((0, 3))]);
    }

    #[test]
    fn explode_wave_dies_at_occupied_leaves() {
        let (mut net, view) = star_network(3);
        net.add_explorer(EdgeKey::from((1, 0)), 1.0, EndBehavior::Explode)
            .unwrap();
        net.update(1.0).unwrap();
        // Both offspring arrive at leaves whose only pair they occupy.
        let report = net.update(1.0).unwrap();
        assert_eq!(report.notes, 2);
        assert_eq!(report.spawned, 0);
        assert_eq!(net.explorer_count(), 0);
        assert_eq!(view.total_notes(), 3);
    }

    #[test]
    fn every_tick_flushes_exactly_one_batch() {
        let (mut net, view) = path_network();
        for _ in 0..4 {
            net.update(1.0).unwrap();
        }
        assert_eq!(view.batch_count(), 4);
        assert_eq!(net.ticks(), 4);
        assert!(view.all_batches().iter().all(Vec::is_empty));
    }

    #[test]
    fn simultaneous_arrivals_share_one_batch() {
        let (mut net, view) = star_network(2);
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.add_explorer(EdgeKey::from((0, 2)), 1.0, EndBehavior::Bounce)
            .unwrap();
        let report = net.update(1.0).unwrap();
        assert_eq!(report.notes, 2);
        assert_eq!(view.batch_count(), 1);
        assert_eq!(view.all_batches()[0].len(), 2);
    }

    #[test]
    fn spawns_do_not_advance_on_their_birth_tick() {
        let (mut net, _view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(2.0).unwrap();
        assert_eq!(net.explorer_fractions(), vec![(EdgeKey::from((1, 0)), 0.0)]);
        net.update(1.0).unwrap();
        assert_eq!(net.explorer_fractions(), vec![(EdgeKey::from((1, 0)), 0.5)]);
    }

    #[test]
    fn invalid_dt_is_rejected_before_any_mutation() {
        let (mut net, view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(1.0).unwrap();
        let before = net.explorer_fractions();

        assert!(net.update(-0.5).is_err());
        assert!(net.update(f64::NAN).is_err());
        assert!(net.update(f64::INFINITY).is_err());

        assert_eq!(net.explorer_fractions(), before);
        assert_eq!(net.ticks(), 1);
        assert_eq!(view.batch_count(), 1);
    }

    #[test]
    fn add_explorer_rejects_unknown_edges_and_bad_speeds() {
        let (mut net, _view) = path_network();
        assert_eq!(
            net.add_explorer(EdgeKey::from((5, 6)), 1.0, EndBehavior::Bounce),
            Err(NetworkError::UnknownEdge {
                edge: EdgeKey::from((5, 6))
            })
        );
        assert!(
            net.add_explorer(EdgeKey::from((0, 1)), -1.0, EndBehavior::Bounce)
                .is_err()
        );
        assert!(
            net.add_explorer(EdgeKey::from((0, 1)), f64::NAN, EndBehavior::Bounce)
                .is_err()
        );
        assert_eq!(net.explorer_count(), 0);
        assert_eq!(net.graph().pair_mite_count(EdgeKey::from((0, 1))).unwrap(), 0);
    }

    #[test]
    fn add_explorer_rejects_random_restart() {
        let (mut net, _view) = path_network();
        let err = net
            .add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::RandomRestart)
            .unwrap_err();
        assert_eq!(
            err,
            NetworkError::UnsupportedBehavior {
                behavior: EndBehavior::RandomRestart
            }
        );
    }

    #[test]
    fn add_explorer_needs_an_edge_speed() {
        let mut net = SoundNetwork::silent();
        net.set_up(&[NodeId(0), NodeId(1)], &[(NodeId(0), NodeId(1))])
            .unwrap();
        let err = net
            .add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap_err();
        assert!(matches!(err, NetworkError::MissingAttribute { .. }));
        // The failed add left no occupancy behind.
        assert_eq!(net.graph().pair_mite_count(EdgeKey::from((0, 1))).unwrap(), 0);
    }

    #[test]
    fn one_explorer_counts_once_per_direction() {
        let (mut net, _view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        let graph = net.graph();
        assert_eq!(graph.mite_count(EdgeKey::from((0, 1))).unwrap(), 1);
        assert_eq!(graph.mite_count(EdgeKey::from((1, 0))).unwrap(), 1);
        assert_eq!(graph.pair_mite_count(EdgeKey::from((0, 1))).unwrap(), 2);
    }

    #[test]
    fn set_up_failure_leaves_the_network_untouched() {
        let (mut net, _view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        let err = net
            .set_up(&[NodeId(0)], &[(NodeId(0), NodeId(9))])
            .unwrap_err();
        assert_eq!(err, NetworkError::UnknownNode { node: NodeId(9) });
        assert_eq!(net.explorer_count(), 1);
        assert_eq!(net.graph().pair_count(), 1);
        assert_eq!(net.graph().edge_speed(EdgeKey::from((0, 1))).unwrap(), 0.5);
    }

    #[test]
    fn set_up_clears_explorers_and_bookkeeping() {
        let (mut net, _view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.set_up(
            &[NodeId(0), NodeId(1), NodeId(2)],
            &[(NodeId(1), NodeId(2))],
        )
        .unwrap();
        assert_eq!(net.explorer_count(), 0);
        assert_eq!(net.graph().pair_mite_count(EdgeKey::from((1, 2))).unwrap(), 0);
        // Attributes do not survive a topology swap.
        assert!(net.graph().node_note(NodeId(1)).is_err());
    }

    #[test]
    fn reset_returns_to_the_configured_state() {
        let (mut net, view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(1.0).unwrap();
        net.update(1.0).unwrap();
        assert!(net.graph().edge_played(EdgeKey::from((0, 1))).unwrap());

        let flushed = view.batch_count();
        net.reset();
        assert_eq!(net.explorer_count(), 0);
        assert_eq!(net.graph().pair_mite_count(EdgeKey::from((0, 1))).unwrap(), 0);
        assert!(!net.graph().edge_played(EdgeKey::from((0, 1))).unwrap());
        assert_eq!(net.graph().edge_speed(EdgeKey::from((0, 1))).unwrap(), 0.5);
        assert_eq!(view.batch_count(), flushed);

        net.reset();
        assert_eq!(net.explorer_count(), 0);

        // The graph is immediately seedable again.
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        assert_eq!(net.update(2.0).unwrap().notes, 1);
    }

    #[test]
    fn failed_arrivals_are_contained_per_explorer() {
        let view = CollectingPlayer::new();
        let mut net = SoundNetwork::new(Box::new(view.clone()));
        net.set_up(
            &[NodeId(0), NodeId(1), NodeId(2), NodeId(3)],
            &[(NodeId(0), NodeId(1)), (NodeId(2), NodeId(3))],
        )
        .unwrap();
        let pairs = [EdgeKey::from((0, 1)), EdgeKey::from((2, 3))];
        net.set_edge_speeds(&pairs, &[1.0]).unwrap();
        // Node 3 never gets a note, so arrivals there cannot resolve.
        net.set_node_notes(&[NodeId(0), NodeId(1), NodeId(2)], &[60.0])
            .unwrap();
        net.set_node_velocities(&[NodeId(0), NodeId(1), NodeId(2)], &[80.0])
            .unwrap();
        net.set_node_durations(&[NodeId(0), NodeId(1), NodeId(2)], &[0.5])
            .unwrap();

        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.add_explorer(EdgeKey::from((2, 3)), 1.0, EndBehavior::Bounce)
            .unwrap();

        let report = net.update(1.0).unwrap();
        assert_eq!(report.removed, 2);
        assert_eq!(report.notes, 1);
        assert_eq!(report.spawned, 1);
        assert_eq!(report.failures.len(), 1);
        let (edge, err) = &report.failures[0];
        assert_eq!(*edge, EdgeKey::from((2, 3)));
        assert!(matches!(err, NetworkError::MissingAttribute { .. }));

        // The healthy explorer bounced; the failed one is gone and its
        // occupancy is released.
        assert_eq!(net.explorer_fractions(), vec![(EdgeKey::from((1, 0)), 0.0)]);
        assert_eq!(net.graph().pair_mite_count(EdgeKey::from((2, 3))).unwrap(), 0);
        assert_eq!(view.all_batches()[0].len(), 1);
    }

    #[test]
    fn start_hook_fires_while_an_explorer_is_parked() {
        let (mut net, _view) = path_network();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        net.set_start_hook(Box::new(move |e| {
            assert!(e.at_start());
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        // Zero multiplier: the explorer never leaves its origin.
        net.add_explorer(EdgeKey::from((0, 1)), 0.0, EndBehavior::Bounce)
            .unwrap();
        net.update(1.0).unwrap();
        net.update(1.0).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 2);

        // A mover has already left its start when hooks run.
        net.clear_start_hook();
        net.reset();
        let moved = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&moved);
        net.set_start_hook(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(0.5).unwrap();
        assert_eq!(moved.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn arrival_marks_the_pair_played() {
        let (mut net, _view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        assert!(!net.graph().edge_played(EdgeKey::from((0, 1))).unwrap());
        net.update(2.0).unwrap();
        assert!(net.graph().edge_played(EdgeKey::from((0, 1))).unwrap());
        assert!(net.graph().edge_played(EdgeKey::from((1, 0))).unwrap());
    }

    #[test]
    fn state_samples_curves_in_the_direction_of_travel() {
        let (mut net, _view) = path_network();
        net.set_edge_curves(&[EdgeKey::from((0, 1))], &[CurveId(7)])
            .unwrap();
        let mut map = SegmentMap::new();
        map.insert(CurveId(7), [0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);

        // Travelling 1 -> 0 samples the shared curve back to front.
        net.add_explorer(EdgeKey::from((1, 0)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(0.5).unwrap();
        assert_eq!(net.state(&map), vec![[7.5, 0.0, 0.0]]);
    }

    #[test]
    fn state_substitutes_a_placeholder_without_geometry() {
        let (mut net, _view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        let map = SegmentMap::new();
        // No curve on the edge at all.
        assert_eq!(net.state(&map), vec![PLACEHOLDER_POINT]);

        // A curve the evaluator cannot sample behaves the same.
        net.set_edge_curves(&[EdgeKey::from((0, 1))], &[CurveId(99)])
            .unwrap();
        assert_eq!(net.state(&map), vec![PLACEHOLDER_POINT]);
    }

    #[test]
    fn retuning_applies_from_the_next_arrival() {
        let (mut net, view) = path_network();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(1.0).unwrap();
        net.update(1.0).unwrap();
        assert_eq!(view.all_batches()[1][0].pitch, 62);

        // Anchor at node 0's datum with double spread: 60 maps to A4.
        net.update_tuner(Some(60.0), Some(2.0)).unwrap();
        net.update(1.0).unwrap();
        net.update(1.0).unwrap();
        assert_eq!(view.all_batches()[3][0].pitch, 69);

        assert!(net.update_tuner(Some(f64::NAN), None).is_err());
        assert_eq!(net.tuner().a4_reference(), 60.0);
    }

    #[test]
    fn velocities_clamp_into_midi_range_at_emission() {
        let (mut net, view) = path_network();
        net.set_node_velocities(&[NodeId(1)], &[900.0]).unwrap();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(2.0).unwrap();
        assert_eq!(view.all_batches()[0][0].velocity, 127);
    }

    #[test]
    fn negative_durations_emit_as_zero() {
        let view = CollectingPlayer::new();
        let mut net = SoundNetwork::new(Box::new(view.clone()));
        net.set_up(&[NodeId(0), NodeId(1)], &[(NodeId(0), NodeId(1))])
            .unwrap();
        net.set_edge_speeds(&[EdgeKey::from((0, 1))], &[1.0]).unwrap();
        net.set_node_notes(&[NodeId(0), NodeId(1)], &[60.0]).unwrap();
        net.set_node_velocities(&[NodeId(0), NodeId(1)], &[80.0])
            .unwrap();
        net.set_node_durations(&[NodeId(0), NodeId(1)], &[-2.0])
            .unwrap();
        net.add_explorer(EdgeKey::from((0, 1)), 1.0, EndBehavior::Bounce)
            .unwrap();
        net.update(1.0).unwrap();
        assert_eq!(view.all_batches()[0][0].duration, 0.0);
    }
}
