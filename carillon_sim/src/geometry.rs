// Geometry seam: where traversal fractions become positions.
//
// The simulation does not own curve geometry; the host does. A
// `CurveEvaluator` answers "where is parameter t on curve c" and the
// network uses it only for state snapshots, never for simulation decisions.

use crate::types::{CurveDirection, CurveId};
use rustc_hash::FxHashMap;

/// Position reported for an explorer whose edge has no curve, or whose
/// curve the evaluator does not know.
pub const PLACEHOLDER_POINT: [f64; 3] = [0.0; 3];

/// Host-side curve sampling.
///
/// `t` is the explorer's raw traversal fraction in [0, 1]; the evaluator
/// decides how `direction` folds it onto the curve, typically via
/// `CurveDirection::oriented`. Return `None` for curves you cannot sample
/// and the network substitutes `PLACEHOLDER_POINT`.
pub trait CurveEvaluator {
    fn point_at(&self, curve: CurveId, direction: CurveDirection, t: f64) -> Option<[f64; 3]>;
}

/// Straight-line evaluator: each curve is a segment between two points.
/// Enough for hosts without a curve kernel, and for visual smoke tests.
#[derive(Clone, Debug, Default)]
pub struct SegmentMap {
    segments: FxHashMap<CurveId, ([f64; 3], [f64; 3])>,
}

impl SegmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, curve: CurveId, start: [f64; 3], end: [f64; 3]) {
        self.segments.insert(curve, (start, end));
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl CurveEvaluator for SegmentMap {
    fn point_at(&self, curve: CurveId, direction: CurveDirection, t: f64) -> Option<[f64; 3]> {
        let &(start, end) = self.segments.get(&curve)?;
        let s = direction.oriented(t);
        Some([
            start[0] + (end[0] - start[0]) * s,
            start[1] + (end[1] - start[1]) * s,
            start[2] + (end[2] - start[2]) * s,
        ])
    }
}
