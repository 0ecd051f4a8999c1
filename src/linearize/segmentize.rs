//! Whole-tree arc segmentization
//!
//! [`segmentize`] rewrites every curved node of a geometry tree into its
//! linear counterpart in one pass. It either succeeds for the whole tree or
//! reports why it could not; it never returns a half-converted tree.
//! [`flatten_arcs`] and [`segmentize_within`] wrap it as best-effort steps
//! that hand the input back on failure.

use super::arc::{chord_arc, StepPolicy};
use crate::geometry::{Collection, Coord, CoordSeq, Dimension, Geometry, GeometryKind, Polygon};
use thiserror::Error;

/// Gap tolerated between consecutive compound curve segments
const CONTIGUITY_TOLERANCE: f64 = 1e-9;

/// Why a tree could not be segmentized
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentizeError {
    #[error("circular string needs an odd number of points, at least 3 (got {0})")]
    InvalidArcPointCount(usize),

    #[error("non-finite coordinate in {0}")]
    NonFinite(GeometryKind),

    #[error("{0} is not a curve")]
    NotACurve(GeometryKind),

    #[error("{0} cannot be a compound curve segment")]
    InvalidSegment(GeometryKind),

    #[error("compound curve segment {index} does not start where the previous one ends")]
    Discontiguous { index: usize },

    #[error("ring {0} is not closed")]
    UnclosedRing(usize),

    #[error("{child} cannot be a member of {parent}")]
    InvalidMember { parent: GeometryKind, child: GeometryKind },
}

/// Outcome of a best-effort conversion
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// The step produced a new geometry
    Converted(Geometry),
    /// The step failed and the input is handed back untouched
    KeptOriginal(Geometry),
}

impl Attempt {
    pub fn into_geometry(self) -> Geometry {
        match self {
            Attempt::Converted(geometry) | Attempt::KeptOriginal(geometry) => geometry,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Attempt::Converted(_))
    }
}

fn attempt(geometry: Geometry, policy: StepPolicy, step: &'static str) -> Attempt {
    if !geometry.has_curves() {
        return Attempt::Converted(geometry);
    }
    match segmentize(&geometry, policy) {
        Ok(linear) => Attempt::Converted(linear),
        Err(err) => {
            tracing::debug!(
                step,
                kind = %geometry.kind().display_with(geometry.dimension()),
                error = %err,
                "arc conversion failed, keeping geometry"
            );
            Attempt::KeptOriginal(geometry)
        }
    }
}

/// Best-effort arc flattening with a fixed angular step, never coarser than
/// `max_deviation` allows
pub fn flatten_arcs(geometry: Geometry, step_degrees: f64, max_deviation: f64) -> Attempt {
    let policy = StepPolicy::angle_degrees(step_degrees).with_max_deviation(max_deviation);
    attempt(geometry, policy, "flatten")
}

/// Best-effort segmentization bounded by `tolerance`
pub fn segmentize_within(geometry: Geometry, tolerance: f64) -> Attempt {
    attempt(geometry, StepPolicy::deviation(tolerance), "segmentize")
}

/// Convert every arc in the tree into chords
pub fn segmentize(geometry: &Geometry, policy: StepPolicy) -> Result<Geometry, SegmentizeError> {
    match geometry {
        Geometry::Point(_) | Geometry::LineString(_) | Geometry::Polygon(_) => Ok(geometry.clone()),
        Geometry::CircularString(seq) => Ok(Geometry::LineString(CoordSeq {
            dimension: seq.dimension,
            coords: chord_circular_string(seq, policy)?,
        })),
        Geometry::CompoundCurve(collection) => Ok(Geometry::LineString(CoordSeq {
            dimension: collection.dimension,
            coords: chord_compound_curve(collection, policy)?,
        })),
        Geometry::CurvePolygon(collection) => chord_curve_polygon(collection, policy).map(Geometry::Polygon),
        Geometry::MultiCurve(collection) => {
            rebuild_members(collection, GeometryKind::MultiLineString, GeometryKind::LineString, policy)
        }
        Geometry::MultiSurface(collection) => {
            rebuild_members(collection, GeometryKind::MultiPolygon, GeometryKind::Polygon, policy)
        }
        Geometry::MultiPoint(_)
        | Geometry::MultiLineString(_)
        | Geometry::MultiPolygon(_)
        | Geometry::GeometryCollection(_) => {
            if !geometry.has_curves() {
                return Ok(geometry.clone());
            }
            let parts = geometry
                .parts()
                .iter()
                .map(|part| segmentize(part, policy))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(geometry.with_parts(parts))
        }
    }
}

/// Segmentize each member of a curved multi-geometry into `member_kind`
fn rebuild_members(
    collection: &Collection,
    target: GeometryKind,
    member_kind: GeometryKind,
    policy: StepPolicy,
) -> Result<Geometry, SegmentizeError> {
    let mut parts = Vec::with_capacity(collection.parts.len());
    for part in &collection.parts {
        let linear = segmentize(part, policy)?;
        if linear.kind() != member_kind {
            return Err(SegmentizeError::InvalidMember { parent: target, child: part.kind() });
        }
        parts.push(linear);
    }
    Geometry::aggregate(target, collection.dimension, parts)
        .ok_or(SegmentizeError::InvalidMember { parent: target, child: member_kind })
}

fn check_finite(coords: &[Coord], dimension: Dimension, kind: GeometryKind) -> Result<(), SegmentizeError> {
    if coords.iter().all(|c| c.is_finite(dimension)) {
        Ok(())
    } else {
        Err(SegmentizeError::NonFinite(kind))
    }
}

/// Chord a circular string made of one or more arcs sharing end points
fn chord_circular_string(seq: &CoordSeq, policy: StepPolicy) -> Result<Vec<Coord>, SegmentizeError> {
    let coords = &seq.coords;
    if coords.is_empty() {
        return Ok(Vec::new());
    }
    if coords.len() < 3 || coords.len() % 2 == 0 {
        return Err(SegmentizeError::InvalidArcPointCount(coords.len()));
    }
    check_finite(coords, seq.dimension, GeometryKind::CircularString)?;

    let mut points = vec![coords[0]];
    for i in (0..coords.len() - 2).step_by(2) {
        let arc = chord_arc(&coords[i], &coords[i + 1], &coords[i + 2], policy);
        points.extend(arc.into_iter().skip(1));
    }
    Ok(points)
}

/// Coordinates of any curve-like node after chording
fn curve_coords(geometry: &Geometry, policy: StepPolicy) -> Result<Vec<Coord>, SegmentizeError> {
    match geometry {
        Geometry::LineString(seq) => Ok(seq.coords.clone()),
        Geometry::CircularString(seq) => chord_circular_string(seq, policy),
        Geometry::CompoundCurve(collection) => chord_compound_curve(collection, policy),
        other => Err(SegmentizeError::NotACurve(other.kind())),
    }
}

fn chord_compound_curve(collection: &Collection, policy: StepPolicy) -> Result<Vec<Coord>, SegmentizeError> {
    let mut points: Vec<Coord> = Vec::new();
    for (index, segment) in collection.parts.iter().enumerate() {
        if !matches!(segment.kind(), GeometryKind::LineString | GeometryKind::CircularString) {
            return Err(SegmentizeError::InvalidSegment(segment.kind()));
        }
        let coords = curve_coords(segment, policy)?;
        let Some(first) = coords.first() else { continue };
        if let Some(last) = points.last() {
            if last.distance_2d(first) > CONTIGUITY_TOLERANCE {
                return Err(SegmentizeError::Discontiguous { index });
            }
        }
        // The joint vertex is already stored as the previous segment's end
        let skip = usize::from(!points.is_empty());
        points.extend(coords.into_iter().skip(skip));
    }
    Ok(points)
}

fn chord_curve_polygon(collection: &Collection, policy: StepPolicy) -> Result<Polygon, SegmentizeError> {
    let mut rings = Vec::with_capacity(collection.parts.len());
    for (index, ring) in collection.parts.iter().enumerate() {
        let coords = curve_coords(ring, policy)?;
        if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
            if !first.same_xy(last) {
                return Err(SegmentizeError::UnclosedRing(index));
            }
        }
        rings.push(coords);
    }
    Ok(Polygon { dimension: collection.dimension, rings })
}
