//! Curve linearization for vector geometries
//!
//! Converts circular strings, compound curves, curve polygons, multi-curves
//! and multi-surfaces into line strings and polygons, for tools that cannot
//! read curves. Geometries enter and leave as well-known binary (WKB).
//!
//! # Example
//! ```ignore
//! let linearizer = Linearizer::new(0.5)?;
//! let geometry = Geometry::from_wkb(&wkb)?;
//! if let Some(linear) = linearizer.linearize(Some(&geometry)) {
//!     output.push(linear.to_wkb());
//! }
//! ```

pub mod error;
pub mod geometry;
pub mod linearize;
pub mod feature;
pub mod batch;

pub use error::{Error, Result};
pub use geometry::{Coord, Dimension, Geometry, GeometryKind, WkbByteOrder, read_wkb, write_wkb};
pub use linearize::{ChildTolerance, LinearizeOptions, Linearizer, DEFAULT_TOLERANCE, linearize};
pub use feature::{Feature, id_label, read_features, write_features};
pub use batch::{BatchOptions, BatchOutput, BatchReport, SkipReason, SkippedFeature, linearize_features};
