//! 2D curve geometry for CNC toolpath generation.
//!
//! The kerf library contains the curve-geometry algorithms a vector
//! toolpath generator is built on: converting cubic Bézier segments into
//! biarc (circular-arc and line) approximations within a numeric
//! tolerance, finding intersections between curve segments, and computing
//! parallel offset paths at a signed radius, including self-intersection
//! detection and clipping. It carries the vocabulary types for points,
//! vectors, segments, arcs and subpaths that these pipelines share.
//!
//! All pipelines are pure functions over immutable values; tolerances and
//! recursion budgets are passed explicitly through [`GeometryConfig`], so
//! independent subpaths can be processed in parallel without shared state.
//!
//! # Examples
//!
//! Fitting a curve with arcs, then cutting an inset toolpath:
//!
//! ```
//! use kerf::{fit, offset, CubicBez, Depth, GeometryConfig, Point, Subpath};
//!
//! let cfg = GeometryConfig::default();
//!
//! // A quarter-circle-ish segment becomes a pair of tangent arcs.
//! let seg = CubicBez::new((1.0, 0.0), (1.0, 0.552), (0.552, 1.0), (0.0, 1.0));
//! let primitives = fit(&seg, Depth::ZERO, &cfg);
//! assert!(!primitives.is_empty());
//!
//! // Insetting a closed square yields a smaller closed loop.
//! let square = Subpath::from_points(
//!     &[
//!         Point::new(0.0, 0.0),
//!         Point::new(10.0, 0.0),
//!         Point::new(10.0, 10.0),
//!         Point::new(0.0, 10.0),
//!     ],
//!     true,
//! );
//! let inset = offset(&[square.clone()], -1.0, &cfg).unwrap();
//! assert!(inset.subpaths[0].signed_area() < square.signed_area());
//! ```

mod arc;
mod biarc;
pub mod common;
mod config;
mod cubicbez;
mod error;
mod intersect;
mod line;
mod offset;
mod param_curve;
mod path;
mod point;
mod quadbez;
mod rect;
mod vec2;

pub use crate::arc::*;
pub use crate::biarc::*;
pub use crate::config::*;
pub use crate::cubicbez::*;
pub use crate::error::*;
pub use crate::intersect::*;
pub use crate::line::*;
pub use crate::offset::*;
pub use crate::param_curve::*;
pub use crate::path::*;
pub use crate::point::*;
pub use crate::quadbez::*;
pub use crate::rect::*;
pub use crate::vec2::*;
