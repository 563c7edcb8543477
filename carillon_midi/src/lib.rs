// carillon_midi — capture network performances as Standard MIDI Files.
//
// - `smf`: an `SmfRecorder` sink for the engine's sequencer, writing SMF
//   Format 1 via the `midly` crate.
// - `score`: the built-in demo blueprint the `perform` binary falls back to
//   when no score file is given.

pub mod score;
pub mod smf;
