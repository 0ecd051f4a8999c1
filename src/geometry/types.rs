//! Core geometry types
//!
//! A [`Geometry`] is an owned tree: aggregates own their children outright,
//! line-like kinds own their coordinates. Every node records its own
//! [`Dimension`] so Z and M survive a round trip through the linearizer.

use super::kind::{Dimension, GeometryKind};
use serde::Serialize;

/// A coordinate tuple. `z` and `m` are only meaningful when the owning
/// node's dimension says so; otherwise they stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub m: f64,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Coord { x, y, z: 0.0, m: 0.0 }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Coord { x, y, z, m: 0.0 }
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Coord { x, y, z, m }
    }

    /// Planar distance, ignoring Z and M
    pub fn distance_2d(&self, other: &Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn same_xy(&self, other: &Coord) -> bool {
        self.x == other.x && self.y == other.y
    }

    pub fn is_finite(&self, dimension: Dimension) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && (!dimension.has_z() || self.z.is_finite())
            && (!dimension.has_m() || self.m.is_finite())
    }
}

/// A single position; `coord` is `None` for `POINT EMPTY`
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub dimension: Dimension,
    pub coord: Option<Coord>,
}

/// Coordinate sequence backing LineString and CircularString
#[derive(Debug, Clone, PartialEq)]
pub struct CoordSeq {
    pub dimension: Dimension,
    pub coords: Vec<Coord>,
}

/// A linear polygon: first ring is the shell, the rest are holes
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub dimension: Dimension,
    pub rings: Vec<Vec<Coord>>,
}

/// Ordered child geometries of an aggregate node
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub dimension: Dimension,
    pub parts: Vec<Geometry>,
}

/// A geometry node
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(CoordSeq),
    Polygon(Polygon),
    MultiPoint(Collection),
    MultiLineString(Collection),
    MultiPolygon(Collection),
    GeometryCollection(Collection),
    CircularString(CoordSeq),
    /// Segments are LineString or CircularString nodes joined end to start
    CompoundCurve(Collection),
    /// Rings are LineString, CircularString or CompoundCurve nodes
    CurvePolygon(Collection),
    MultiCurve(Collection),
    MultiSurface(Collection),
}

impl Geometry {
    pub fn point(dimension: Dimension, coord: Coord) -> Self {
        Geometry::Point(Point { dimension, coord: Some(coord) })
    }

    pub fn line_string(dimension: Dimension, coords: Vec<Coord>) -> Self {
        Geometry::LineString(CoordSeq { dimension, coords })
    }

    pub fn circular_string(dimension: Dimension, coords: Vec<Coord>) -> Self {
        Geometry::CircularString(CoordSeq { dimension, coords })
    }

    pub fn polygon(dimension: Dimension, rings: Vec<Vec<Coord>>) -> Self {
        Geometry::Polygon(Polygon { dimension, rings })
    }

    /// Build an aggregate of the given kind. Returns `None` for kinds that
    /// hold coordinates rather than child geometries.
    pub fn aggregate(kind: GeometryKind, dimension: Dimension, parts: Vec<Geometry>) -> Option<Self> {
        let collection = Collection { dimension, parts };
        let geometry = match kind {
            GeometryKind::MultiPoint => Geometry::MultiPoint(collection),
            GeometryKind::MultiLineString => Geometry::MultiLineString(collection),
            GeometryKind::MultiPolygon => Geometry::MultiPolygon(collection),
            GeometryKind::GeometryCollection => Geometry::GeometryCollection(collection),
            GeometryKind::CompoundCurve => Geometry::CompoundCurve(collection),
            GeometryKind::CurvePolygon => Geometry::CurvePolygon(collection),
            GeometryKind::MultiCurve => Geometry::MultiCurve(collection),
            GeometryKind::MultiSurface => Geometry::MultiSurface(collection),
            GeometryKind::Point
            | GeometryKind::LineString
            | GeometryKind::Polygon
            | GeometryKind::CircularString => return None,
        };
        Some(geometry)
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
            Geometry::CircularString(_) => GeometryKind::CircularString,
            Geometry::CompoundCurve(_) => GeometryKind::CompoundCurve,
            Geometry::CurvePolygon(_) => GeometryKind::CurvePolygon,
            Geometry::MultiCurve(_) => GeometryKind::MultiCurve,
            Geometry::MultiSurface(_) => GeometryKind::MultiSurface,
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Geometry::Point(p) => p.dimension,
            Geometry::LineString(seq) | Geometry::CircularString(seq) => seq.dimension,
            Geometry::Polygon(p) => p.dimension,
            Geometry::MultiPoint(c)
            | Geometry::MultiLineString(c)
            | Geometry::MultiPolygon(c)
            | Geometry::GeometryCollection(c)
            | Geometry::CompoundCurve(c)
            | Geometry::CurvePolygon(c)
            | Geometry::MultiCurve(c)
            | Geometry::MultiSurface(c) => c.dimension,
        }
    }

    fn collection(&self) -> Option<&Collection> {
        match self {
            Geometry::MultiPoint(c)
            | Geometry::MultiLineString(c)
            | Geometry::MultiPolygon(c)
            | Geometry::GeometryCollection(c)
            | Geometry::CompoundCurve(c)
            | Geometry::CurvePolygon(c)
            | Geometry::MultiCurve(c)
            | Geometry::MultiSurface(c) => Some(c),
            Geometry::Point(_) | Geometry::LineString(_) | Geometry::Polygon(_) | Geometry::CircularString(_) => None,
        }
    }

    /// Child geometries; empty for coordinate-bearing kinds
    pub fn parts(&self) -> &[Geometry] {
        self.collection().map(|c| c.parts.as_slice()).unwrap_or(&[])
    }

    /// A copy of this aggregate holding exactly `parts`. Coordinate-bearing
    /// kinds have no child list and are returned as-is.
    pub fn with_parts(&self, parts: Vec<Geometry>) -> Geometry {
        Geometry::aggregate(self.kind(), self.dimension(), parts).unwrap_or_else(|| self.clone())
    }

    /// True when this node or any descendant is a curved kind
    pub fn has_curves(&self) -> bool {
        self.kind().is_curved() || self.parts().iter().any(Geometry::has_curves)
    }

    /// Total number of stored coordinates in the tree
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(p) => p.coord.is_some() as usize,
            Geometry::LineString(seq) | Geometry::CircularString(seq) => seq.coords.len(),
            Geometry::Polygon(p) => p.rings.iter().map(Vec::len).sum(),
            _ => self.parts().iter().map(Geometry::vertex_count).sum(),
        }
    }

    /// Coordinates of a LineString or CircularString
    pub fn coords(&self) -> Option<&[Coord]> {
        match self {
            Geometry::LineString(seq) | Geometry::CircularString(seq) => Some(&seq.coords),
            _ => None,
        }
    }
}
