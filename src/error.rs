//! Error types for the geometry kernel.

use thiserror::Error;

/// Errors produced by the geometry pipelines.
///
/// Geometry-local failures (degenerate quadratics, singular Jacobians) are
/// recovered close to where they occur with documented fallbacks and never
/// abort processing of sibling segments or subpaths; only path-level
/// conditions surface to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A computation produced a non-real or otherwise invalid result where
    /// the geometry should guarantee a real solution, e.g. a negative
    /// discriminant in the biarc join quadratic. Fatal for the one segment
    /// only: the caller substitutes a line for it.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The recursion budget ran out before the requested tolerance was
    /// reached. Not fatal: the best approximation found so far is returned
    /// and the condition is surfaced as a diagnostic.
    #[error("tolerance {tolerance} not reached at depth {depth} (worst deviation {deviation})")]
    ToleranceExceeded {
        /// The tolerance that was requested.
        tolerance: f64,
        /// The recursion depth at which the budget ran out.
        depth: u32,
        /// The deviation of the returned approximation.
        deviation: f64,
    },

    /// Offsetting at this radius eliminated all material. Recoverable: a
    /// multi-pass sweep treats it as "no offset at this radius" and stops
    /// sweeping.
    #[error("offset at radius {radius} eliminated all material")]
    EmptyOffset {
        /// The radius that produced no output.
        radius: f64,
    },
}

/// Convenience alias for results using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let e = Error::EmptyOffset { radius: -6.0 };
        assert_eq!(e.to_string(), "offset at radius -6 eliminated all material");
        let e = Error::DegenerateGeometry("negative discriminant".into());
        assert!(e.to_string().contains("negative discriminant"));
    }
}
