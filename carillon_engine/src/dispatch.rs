// Batch hand-off and note sequencing.
//
// Architecture: two threads joined by one bounded channel.
//
// - **Tick thread**: owns the network. Its `ChannelPlayer` forwards each
//   non-empty batch as `AudioMessage::Batch`, and the transport sends
//   `AudioMessage::Tick` once per iteration so the consumer's clock follows
//   simulation time.
// - **Consumer thread**: runs `run_consumer`, feeding a `Sequencer` that
//   converts batches into note-on/note-off calls on a `NoteSink`.
//
// The channel is bounded and the tick side only ever `try_send`s: a slow
// consumer costs dropped batches, never a stalled simulation. Note-offs are
// scheduled on the simulation clock, so sequencing is deterministic for a
// given batch/tick stream regardless of thread timing.

use carillon_sim::note::{NoteEvent, NotePlayer};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use tracing::{debug, warn};

/// Default bound for the tick-to-consumer channel. At 50 ticks per second
/// this is over a second of headroom.
pub const DEFAULT_CAPACITY: usize = 64;

/// What crosses from the tick thread to the audio consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioMessage {
    /// Simulation time has advanced to `time` seconds.
    Tick { time: f64 },
    /// One tick's notes. Empty batches are never sent.
    Batch(Vec<NoteEvent>),
}

/// Build the dispatch channel: a player for the network, a tick sender for
/// the transport, and the consumer's receiving end.
pub fn channel(capacity: usize) -> (ChannelPlayer, TickSender, Receiver<AudioMessage>) {
    let (tx, rx) = sync_channel(capacity);
    (
        ChannelPlayer {
            tx: tx.clone(),
            dropped: 0,
        },
        TickSender { tx },
        rx,
    )
}

/// `NotePlayer` that forwards batches over the dispatch channel.
pub struct ChannelPlayer {
    tx: SyncSender<AudioMessage>,
    dropped: u64,
}

impl ChannelPlayer {
    /// Batches discarded because the consumer was not keeping up.
    pub fn dropped_batches(&self) -> u64 {
        self.dropped
    }
}

impl NotePlayer for ChannelPlayer {
    fn play_notes(&mut self, notes: &[NoteEvent]) {
        if notes.is_empty() {
            return;
        }
        match self.tx.try_send(AudioMessage::Batch(notes.to_vec())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                warn!(dropped = self.dropped, "audio consumer behind; batch dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("audio consumer gone; batch discarded");
            }
        }
    }
}

/// Transport-side handle that reports simulation time to the consumer.
pub struct TickSender {
    tx: SyncSender<AudioMessage>,
}

impl TickSender {
    /// Report that simulation time reached `time`. A stale tick is worth
    /// nothing, so a full channel just drops it.
    pub fn tick(&self, time: f64) {
        match self.tx.try_send(AudioMessage::Tick { time }) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                debug!("audio consumer gone; tick discarded");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sequencing
// ---------------------------------------------------------------------------

/// Where sequenced note commands land: a synth, a MIDI file, a test recorder.
///
/// Calls arrive in time order; `time` is simulation seconds. Every
/// `note_on` is matched by exactly one `note_off` once the stream is
/// finished.
pub trait NoteSink {
    fn note_on(&mut self, time: f64, pitch: u8, velocity: u8);
    fn note_off(&mut self, time: f64, pitch: u8);
}

/// A scheduled note-off, ordered so the `BinaryHeap` pops the earliest
/// first. `sequence` breaks time ties in play order.
#[derive(Clone, Copy, Debug)]
struct PendingOff {
    time: f64,
    sequence: u64,
    pitch: u8,
}

impl PartialEq for PendingOff {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingOff {}

impl PartialOrd for PendingOff {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingOff {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest off.
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Turns per-tick batches into an ordered on/off command stream.
///
/// `play` sounds each note at the current clock and schedules its off at
/// `clock + duration`; `advance_to` emits every off that has come due, at
/// its scheduled time rather than the tick that flushed it.
pub struct Sequencer<S: NoteSink> {
    sink: S,
    clock: f64,
    pending: BinaryHeap<PendingOff>,
    next_sequence: u64,
    notes_played: u64,
}

impl<S: NoteSink> Sequencer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            clock: 0.0,
            pending: BinaryHeap::new(),
            next_sequence: 0,
            notes_played: 0,
        }
    }

    /// Move the clock forward and emit every note-off due by `time`. The
    /// clock never moves backwards.
    pub fn advance_to(&mut self, time: f64) {
        if time > self.clock {
            self.clock = time;
        }
        while let Some(head) = self.pending.peek() {
            if head.time > self.clock {
                break;
            }
            if let Some(off) = self.pending.pop() {
                self.sink.note_off(off.time, off.pitch);
            }
        }
    }

    /// Sound a batch at the current clock.
    pub fn play(&mut self, notes: &[NoteEvent]) {
        for note in notes {
            self.sink.note_on(self.clock, note.pitch, note.velocity);
            self.pending.push(PendingOff {
                time: self.clock + note.duration,
                sequence: self.next_sequence,
                pitch: note.pitch,
            });
            self.next_sequence += 1;
            self.notes_played += 1;
        }
    }

    pub fn handle(&mut self, message: AudioMessage) {
        match message {
            AudioMessage::Tick { time } => self.advance_to(time),
            AudioMessage::Batch(notes) => self.play(&notes),
        }
    }

    /// Flush every scheduled note-off and hand the sink back.
    pub fn finish(mut self) -> S {
        while let Some(off) = self.pending.pop() {
            self.sink.note_off(off.time, off.pitch);
        }
        self.sink
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn notes_played(&self) -> u64 {
        self.notes_played
    }
}

/// Consume the channel until every sender is gone, then flush and return
/// the sink. Meant to be the body of the consumer thread.
pub fn run_consumer<S: NoteSink>(rx: Receiver<AudioMessage>, sink: S) -> S {
    let mut sequencer = Sequencer::new(sink);
    for message in rx {
        sequencer.handle(message);
    }
    sequencer.finish()
}
