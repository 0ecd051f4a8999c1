//! Curve linearization
//!
//! This module turns curved geometries into linear ones.
//!
//! # Submodules
//! - `arc` - Circle fitting and chording of a single arc
//! - `segmentize` - Whole-tree arc conversion and best-effort wrappers
//! - `linearizer` - The recursive linearization algorithm

mod arc;
mod segmentize;
mod linearizer;

pub use arc::{
    DEFAULT_FLATTEN_STEP_DEGREES,
    MAX_CHORDS_PER_ARC,
    Circle,
    StepPolicy,
    chord_arc,
    circle_through,
};

pub use segmentize::{
    Attempt,
    SegmentizeError,
    flatten_arcs,
    segmentize,
    segmentize_within,
};

pub use linearizer::{
    DEFAULT_TOLERANCE,
    ChildTolerance,
    LinearizeOptions,
    Linearizer,
    linearize,
};
