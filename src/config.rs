//! Tolerance configuration shared by the geometry pipelines.

/// Tolerances and recursion budgets for the geometry kernel.
///
/// A config value is passed explicitly to every pipeline entry point; there
/// is no process-wide mutable state, so independent subpaths can be
/// processed from separate threads with a shared (or copied) config.
///
/// Lower tolerances mean closer fidelity, more output primitives and more
/// work; higher depth limits mean finer adaptive subdivision at a higher
/// worst-case recursion cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryConfig {
    /// Maximum deviation of a biarc approximation from its source curve.
    pub biarc_tolerance: f64,
    /// Recursion ceiling for adaptive biarc splitting.
    pub biarc_max_depth: u32,
    /// Deviation budget for offset construction and validation.
    pub offset_tolerance: f64,
    /// Epsilon for bounding-box pruning and duplicate-hit collapsing in
    /// intersection detection.
    pub intersection_tolerance: f64,
    /// Per-curve recursion ceiling for intersection bisection.
    pub max_intersect_depth: u32,
    /// Angular threshold below which directions count as parallel.
    pub straight_tolerance: f64,
    /// Length threshold below which a tangent or chord counts as degenerate.
    pub straight_distance_tolerance: f64,
    /// Arcs with a smaller radius are emitted as lines instead.
    pub min_arc_radius: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        GeometryConfig {
            biarc_tolerance: 0.1,
            biarc_max_depth: 10,
            offset_tolerance: 0.05,
            intersection_tolerance: 1e-6,
            max_intersect_depth: 10,
            straight_tolerance: 1e-4,
            straight_distance_tolerance: 5e-4,
            min_arc_radius: 0.05,
        }
    }
}

impl GeometryConfig {
    /// Create a config with the default tolerances.
    pub fn new() -> Self {
        Default::default()
    }

    /// Builder method for setting the biarc fitting tolerance.
    pub fn with_biarc_tolerance(mut self, tolerance: f64) -> Self {
        self.biarc_tolerance = tolerance;
        self
    }

    /// Builder method for setting the biarc recursion ceiling.
    pub fn with_biarc_max_depth(mut self, depth: u32) -> Self {
        self.biarc_max_depth = depth;
        self
    }

    /// Builder method for setting the offset tolerance.
    pub fn with_offset_tolerance(mut self, tolerance: f64) -> Self {
        self.offset_tolerance = tolerance;
        self
    }

    /// Builder method for setting the intersection tolerance.
    pub fn with_intersection_tolerance(mut self, tolerance: f64) -> Self {
        self.intersection_tolerance = tolerance;
        self
    }

    /// Builder method for setting the intersection recursion ceiling.
    pub fn with_max_intersect_depth(mut self, depth: u32) -> Self {
        self.max_intersect_depth = depth;
        self
    }

    /// Builder method for setting the minimum arc radius.
    pub fn with_min_arc_radius(mut self, radius: f64) -> Self {
        self.min_arc_radius = radius;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let cfg = GeometryConfig::new()
            .with_biarc_tolerance(0.01)
            .with_biarc_max_depth(4)
            .with_min_arc_radius(0.5);
        assert_eq!(cfg.biarc_tolerance, 0.01);
        assert_eq!(cfg.biarc_max_depth, 4);
        assert_eq!(cfg.min_arc_radius, 0.5);
        // untouched fields keep their defaults
        assert_eq!(cfg.offset_tolerance, GeometryConfig::default().offset_tolerance);
    }
}
