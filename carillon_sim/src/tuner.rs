// Linear mapping from raw note data to MIDI pitch space.
//
// Node notes are whatever datum the host stored: a MIDI number already, a
// log-frequency, a scale degree. The tuner anchors that datum to concert A
// and stretches it, so one pair of parameters retunes the whole network
// without rewriting the graph.

use crate::note::clamp_to_midi;
use serde::{Deserialize, Serialize};

/// MIDI note number of A4.
pub const MIDI_CONCERT_A: f64 = 69.0;

/// `tune(data) = 69 + (data - a4_reference) * scale_factor`
///
/// The default maps note data through unchanged: a reference of 69 and a
/// factor of 1 make `tune` the identity on MIDI numbers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tuner {
    a4_reference: f64,
    scale_factor: f64,
}

impl Default for Tuner {
    fn default() -> Self {
        Self {
            a4_reference: MIDI_CONCERT_A,
            scale_factor: 1.0,
        }
    }
}

impl Tuner {
    /// `a4_reference` is the raw datum that should sound as A4;
    /// `scale_factor` converts datum distance into semitones.
    pub fn new(a4_reference: f64, scale_factor: f64) -> Self {
        Self {
            a4_reference,
            scale_factor,
        }
    }

    /// Map a raw datum into (fractional) MIDI pitch space.
    pub fn tune(&self, data: f64) -> f64 {
        MIDI_CONCERT_A + (data - self.a4_reference) * self.scale_factor
    }

    /// Map a raw datum to a playable pitch: fractional semitones truncate
    /// toward zero, then clamp into 0..=127.
    pub fn tune_pitch(&self, data: f64) -> u8 {
        clamp_to_midi(self.tune(data))
    }

    /// Adjust either parameter, keeping the other. `None` leaves a field
    /// untouched.
    pub fn update(&mut self, a4_reference: Option<f64>, scale_factor: Option<f64>) {
        if let Some(a4) = a4_reference {
            self.a4_reference = a4;
        }
        if let Some(scale) = scale_factor {
            self.scale_factor = scale;
        }
    }

    pub fn a4_reference(&self) -> f64 {
        self.a4_reference
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }
}
