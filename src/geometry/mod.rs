//! Geometry module for curve linearization
//!
//! This module provides the geometry tree the linearizer operates on and the
//! binary codec used to exchange it with the outside world.
//!
//! # Submodules
//! - `kind` - Geometry kind and dimension tags, type code normalization
//! - `types` - The geometry tree (Coord, Geometry and its node structs)
//! - `binary` - Well-known binary (WKB) reading and writing

mod kind;
mod types;
mod binary;

pub use kind::{
    Dimension,
    GeometryKind,
    EWKB_M_FLAG,
    EWKB_SRID_FLAG,
    EWKB_Z_FLAG,
};

pub use types::{
    Coord,
    Point,
    CoordSeq,
    Polygon,
    Collection,
    Geometry,
};

pub use binary::{
    WkbByteOrder,
    MAX_NESTING_DEPTH,
    read_wkb,
    write_wkb,
};
