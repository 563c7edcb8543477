// carillon_engine — real-time plumbing around a carillon_sim network.
//
// The simulation crate is deliberately clockless and deviceless: it advances
// only when someone calls `update(dt)` and hands note batches to whatever
// `NotePlayer` it was built with. This crate supplies the two pieces a live
// performance needs on top of that:
//
// - `dispatch`: a bounded channel `NotePlayer`, the `NoteSink` seam for
//   audio backends, and the `Sequencer` that turns per-tick batches into
//   ordered note-on/note-off commands.
// - `transport`: a background thread that calls `update` at a fixed cadence
//   with wall-clock dt, with start/pause/reset/rate control.
//
// **Critical constraint: the tick thread never blocks on audio.** Batches
// cross to the consumer through `try_send`; when the consumer falls behind,
// batches are dropped and counted rather than stalling the simulation.

pub mod dispatch;
pub mod transport;
