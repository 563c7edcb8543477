// Note events and the playback seam.
//
// The simulation core never talks to an audio device. It collects
// `NoteEvent`s into a per-tick batch and hands the batch to a `NotePlayer`
// exactly once per tick. Everything downstream (channels, sequencing, file
// capture) lives behind that trait in companion crates.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Truncate toward zero and clamp into the MIDI data range. Non-finite
/// input saturates at the cast, so it still lands inside 0..=127.
pub fn clamp_to_midi(value: f64) -> u8 {
    (value as i64).clamp(0, 127) as u8
}

/// One note to sound, already resolved to playable values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch, 0..=127.
    pub pitch: u8,
    /// MIDI velocity, 0..=127.
    pub velocity: u8,
    /// Length in seconds, never negative.
    pub duration: f64,
}

/// Downstream consumer of per-tick note batches.
///
/// `play_notes` is called exactly once per `SoundNetwork::update`, after all
/// simulation mutation for that tick has finished, and also when the batch
/// is empty. Calls are never concurrent for one network. Implementations
/// must return promptly; anything slow belongs on another thread.
pub trait NotePlayer: Send {
    fn play_notes(&mut self, notes: &[NoteEvent]);
}

/// Discards every batch. Useful for headless runs and tests that only watch
/// simulation state.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPlayer;

impl NotePlayer for NullPlayer {
    fn play_notes(&mut self, _notes: &[NoteEvent]) {}
}

/// Records every batch it is handed, including empty ones.
///
/// Clones share storage, so keep one clone as an inspection handle and move
/// the other into the network:
///
/// ```
/// use carillon_sim::note::{CollectingPlayer, NotePlayer};
///
/// let view = CollectingPlayer::new();
/// let mut player = view.clone();
/// player.play_notes(&[]);
/// assert_eq!(view.batch_count(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CollectingPlayer {
    batches: Arc<Mutex<Vec<Vec<NoteEvent>>>>,
}

impl CollectingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches received so far, one per tick.
    pub fn batch_count(&self) -> usize {
        self.lock().len()
    }

    pub fn all_batches(&self) -> Vec<Vec<NoteEvent>> {
        self.lock().clone()
    }

    pub fn total_notes(&self) -> usize {
        self.lock().iter().map(Vec::len).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<NoteEvent>>> {
        self.batches.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl NotePlayer for CollectingPlayer {
    fn play_notes(&mut self, notes: &[NoteEvent]) {
        self.lock().push(notes.to_vec());
    }
}
