// carillon_sim — graph-driven generative audio simulation library.
//
// This crate contains all simulation logic for Carillon: the directed graph
// with its per-node and per-edge musical attributes, the explorers that
// travel its edges, the arrival policies that spawn and remove them, and the
// tick loop that batches the resulting note events. It has no audio or
// geometry dependencies and can be tested, benchmarked, and run headless.
//
// Module overview:
// - `network.rs`:   Top-level SoundNetwork, tick loop, arrival resolution.
// - `graph.rs`:     SoundGraph with bidirectional edge storage and bulk
//                   attribute assignment.
// - `explorer.rs`:  The per-edge traveler state machine.
// - `behavior.rs`:  EndBehavior enum + pure arrival resolution (bounce, explode).
// - `tuner.rs`:     Scalar-to-pitch mapping around MIDI concert A.
// - `note.rs`:      NoteEvent, MIDI clamping, the NotePlayer dispatch boundary.
// - `geometry.rs`:  CurveEvaluator boundary for 3D position queries.
// - `blueprint.rs`: Declarative network descriptions, loadable from JSON.
// - `error.rs`:     NetworkError, the error vocabulary of every fallible call.
// - `types.rs`:     NodeId, EdgeKey, CurveId, curve directions, tag values.
//
// The companion crate `carillon_engine` wraps this library with a wall-clock
// transport and a channel to an audio consumer. That boundary is enforced at
// the compiler level: this crate cannot depend on threads, timers, or any
// output device.
//
// **Critical constraint: one batch per tick.** Every note produced inside one
// `update(dt)` call is handed to the `NotePlayer` in a single call, after all
// position and topology mutation for that tick has finished. Simultaneous
// arrivals therefore get simultaneous onsets, and the player is never called
// concurrently with itself.

pub mod behavior;
pub mod blueprint;
pub mod error;
pub mod explorer;
pub mod geometry;
pub mod graph;
pub mod network;
pub mod note;
pub mod tuner;
pub mod types;
