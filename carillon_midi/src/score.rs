// Built-in demo score: a pentatonic hub-and-ring.
//
// Node 0 is a low hub joined to every ring node; the ring carries a C major
// pentatonic octave. One explorer explodes out of the hub for an opening
// wave, one bounces on the far side of the ring for a steady pulse. Speeds
// are deliberately uneven so the texture drifts instead of looping.

use carillon_sim::behavior::EndBehavior;
use carillon_sim::blueprint::{Blueprint, Departure};

pub fn demo() -> Blueprint {
    Blueprint {
        nodes: vec![0, 1, 2, 3, 4, 5, 6],
        edges: vec![
            // Spokes
            (0, 1),
            (0, 2),
            (0, 3),
            (0, 4),
            (0, 5),
            (0, 6),
            // Ring
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 5),
            (5, 6),
            (6, 1),
        ],
        speeds: vec![
            0.62, 0.55, 0.48, 0.66, 0.51, 0.58, // spokes
            0.27, 0.31, 0.24, 0.35, 0.29, 0.22, // ring
        ],
        // Hub C3, ring C major pentatonic up an octave.
        notes: vec![48.0, 60.0, 62.0, 64.0, 67.0, 69.0, 72.0],
        velocities: vec![110.0, 92.0, 88.0, 96.0, 84.0, 100.0, 90.0],
        durations: vec![0.8, 0.35, 0.4, 0.3, 0.45, 0.35, 0.5],
        explorers: vec![
            Departure {
                edge: (1, 0),
                natural_speed: 1.0,
                behavior: EndBehavior::Explode,
            },
            Departure {
                edge: (4, 5),
                natural_speed: 0.8,
                behavior: EndBehavior::Bounce,
            },
        ],
        ..Blueprint::default()
    }
}
