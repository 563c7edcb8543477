// A single traveller on one directed edge.
//
// An explorer's whole life is the fraction `location` in [0, 1]. It departs
// the edge's origin, advances by `speed * dt` per tick with overshoot
// clamped to 1, and once it reads exactly 1 it is terminal: the network
// resolves its end behavior and removes it. Explorers never migrate between
// edges; continuation is always a new explorer.

use crate::behavior::EndBehavior;
use crate::types::{EdgeKey, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Explorer {
    edge: EdgeKey,
    /// Effective traversal rate: edge speed times `natural_speed`.
    speed: f64,
    /// Intrinsic multiplier, inherited by explorers this one spawns.
    natural_speed: f64,
    location: f64,
    behavior: EndBehavior,
    at_start: bool,
    at_end: bool,
}

impl Explorer {
    pub(crate) fn new(
        edge: EdgeKey,
        speed: f64,
        natural_speed: f64,
        behavior: EndBehavior,
    ) -> Self {
        Self {
            edge,
            speed,
            natural_speed,
            location: 0.0,
            behavior,
            at_start: true,
            at_end: false,
        }
    }

    /// Advance by one tick. Terminal explorers are inert; everything the
    /// overshoot would have carried past the end is discarded by the clamp.
    pub(crate) fn advance(&mut self, dt: f64) {
        if !self.at_end {
            self.location = (self.location + self.speed * dt).min(1.0);
            if self.at_start && self.location != 0.0 {
                self.at_start = false;
            }
            if self.location == 1.0 {
                self.at_end = true;
            }
        }
    }

    pub fn edge(&self) -> EdgeKey {
        self.edge
    }

    /// Origin node of the traversal.
    pub fn node_a(&self) -> NodeId {
        self.edge.a
    }

    /// Destination node of the traversal.
    pub fn node_b(&self) -> NodeId {
        self.edge.b
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn natural_speed(&self) -> f64 {
        self.natural_speed
    }

    /// Fraction of the edge covered so far, in [0, 1].
    pub fn location(&self) -> f64 {
        self.location
    }

    pub fn behavior(&self) -> EndBehavior {
        self.behavior
    }

    /// True until the first tick that moves the explorer off 0.
    pub fn at_start(&self) -> bool {
        self.at_start
    }

    /// True once `location` reads exactly 1. Never unset.
    pub fn at_end(&self) -> bool {
        self.at_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walker(speed: f64) -> Explorer {
        Explorer::new(EdgeKey::from((0, 1)), speed, 1.0, EndBehavior::Bounce)
    }

    #[test]
    fn departure_is_flagged_only_while_unmoved() {
        let mut e = walker(0.5);
        assert!(e.at_start());
        assert_eq!(e.location(), 0.0);

        e.advance(0.2);
        assert!(!e.at_start());
        assert_eq!(e.location(), 0.1);
    }

    #[test]
    fn zero_speed_explorer_stays_at_start() {
        let mut e = walker(0.0);
        e.advance(10.0);
        e.advance(10.0);
        assert!(e.at_start());
        assert!(!e.at_end());
        assert_eq!(e.location(), 0.0);
    }

    #[test]
    fn overshoot_clamps_to_exactly_one() {
        let mut e = walker(0.4);
        e.advance(1.0);
        assert_eq!(e.location(), 0.4);
        e.advance(100.0);
        assert_eq!(e.location(), 1.0);
        assert!(e.at_end());
    }

    #[test]
    fn exact_landing_is_terminal() {
        let mut e = walker(0.5);
        e.advance(1.0);
        e.advance(1.0);
        assert_eq!(e.location(), 1.0);
        assert!(e.at_end());
    }

    #[test]
    fn terminal_explorer_ignores_further_ticks() {
        let mut e = walker(1.0);
        e.advance(5.0);
        assert!(e.at_end());
        let before = e.location();
        e.advance(3.0);
        assert_eq!(e.location(), before);
        assert!(e.at_end());
        assert!(!e.at_start());
    }
}
