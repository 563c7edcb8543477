// MIDI file output from sequenced note streams.
//
// `SmfRecorder` implements the engine's `NoteSink`: it timestamps on/off
// commands in MIDI ticks as they arrive and renders a Standard MIDI File
// on demand. Output is SMF Format 1 with a tempo track plus one note track.
//
// Uses the `midly` crate for MIDI writing.

use carillon_engine::dispatch::NoteSink;
use midly::{
    Format, Header, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

#[derive(Clone, Copy, Debug)]
enum EventKind {
    On { pitch: u8, velocity: u8 },
    Off { pitch: u8 },
}

#[derive(Clone, Copy, Debug)]
struct RecordedEvent {
    tick: u32,
    kind: EventKind,
}

/// Collects sequenced notes and renders them as an SMF.
///
/// Simulation seconds map to MIDI ticks through the tempo: one beat per
/// `60 / tempo_bpm` seconds, `TICKS_PER_QUARTER` ticks per beat.
pub struct SmfRecorder {
    tempo_bpm: u16,
    events: Vec<RecordedEvent>,
}

impl SmfRecorder {
    pub fn new(tempo_bpm: u16) -> Self {
        Self {
            tempo_bpm: tempo_bpm.max(1),
            events: Vec::new(),
        }
    }

    pub fn tempo_bpm(&self) -> u16 {
        self.tempo_bpm
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn tick_at(&self, time: f64) -> u32 {
        let ticks_per_second = f64::from(TICKS_PER_QUARTER) * f64::from(self.tempo_bpm) / 60.0;
        (time * ticks_per_second).round() as u32
    }

    /// Render everything recorded so far as an in-memory SMF.
    pub fn to_smf(&self) -> Smf<'static> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
        ));

        // Track 0: tempo track
        let mut tempo_track: Track<'static> = Vec::new();
        let tempo_microseconds = 60_000_000 / u32::from(self.tempo_bpm);
        tempo_track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::Tempo(u24::new(tempo_microseconds))),
        });
        tempo_track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
        });
        smf.tracks.push(tempo_track);

        // Track 1: every note on channel 0. Sorting is stable, so commands
        // that share a tick keep their arrival order.
        let mut sorted: Vec<&RecordedEvent> = self.events.iter().collect();
        sorted.sort_by_key(|event| event.tick);

        let channel = u4::new(0);
        let mut track: Track<'static> = Vec::new();
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::TrackName(b"carillon")),
        });

        let mut last_tick: u32 = 0;
        for event in sorted {
            let delta = event.tick - last_tick;
            let message = match event.kind {
                EventKind::On { pitch, velocity } => MidiMessage::NoteOn {
                    key: u7::new(pitch.min(127)),
                    vel: u7::new(velocity.min(127)),
                },
                EventKind::Off { pitch } => MidiMessage::NoteOff {
                    key: u7::new(pitch.min(127)),
                    vel: u7::new(0),
                },
            };
            track.push(TrackEvent {
                delta: u28::new(delta),
                kind: TrackEventKind::Midi { channel, message },
            });
            last_tick = event.tick;
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);

        smf
    }

    /// Render and write to a file.
    pub fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let smf = self.to_smf();
        let mut buf = Vec::new();
        smf.write(&mut buf)?;
        std::fs::write(path, &buf)?;
        Ok(())
    }
}

impl NoteSink for SmfRecorder {
    fn note_on(&mut self, time: f64, pitch: u8, velocity: u8) {
        self.events.push(RecordedEvent {
            tick: self.tick_at(time),
            kind: EventKind::On { pitch, velocity },
        });
    }

    fn note_off(&mut self, time: f64, pitch: u8) {
        self.events.push(RecordedEvent {
            tick: self.tick_at(time),
            kind: EventKind::Off { pitch },
        });
    }
}
