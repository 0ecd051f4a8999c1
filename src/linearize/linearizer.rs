//! Recursive curve linearization
//!
//! [`Linearizer::linearize`] turns one geometry tree into an equivalent tree
//! without curve primitives, or reports `None` when that is impossible. It
//! is pure: the input is borrowed, the output is newly built, and no state
//! survives between calls, so one linearizer can be shared across threads.

use super::arc::DEFAULT_FLATTEN_STEP_DEGREES;
use super::segmentize::{flatten_arcs, segmentize_within};
use crate::error::{Error, Result};
use crate::geometry::{read_wkb, write_wkb, Collection, Geometry, GeometryKind, WkbByteOrder};

/// Tolerance used when the caller supplies none
pub const DEFAULT_TOLERANCE: f64 = 3.0;

/// Tolerance handed to child geometries during recursion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ChildTolerance {
    /// Children use the same tolerance as their parent
    #[default]
    Inherit,
    /// Children below the top level use this tolerance instead
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearizeOptions {
    /// Maximum deviation between an arc and its chords
    pub tolerance: f64,
    pub child_tolerance: ChildTolerance,
    /// Angular step of the best-effort flatten passes, in degrees
    pub flatten_step_degrees: f64,
}

impl Default for LinearizeOptions {
    fn default() -> Self {
        LinearizeOptions {
            tolerance: DEFAULT_TOLERANCE,
            child_tolerance: ChildTolerance::Inherit,
            flatten_step_degrees: DEFAULT_FLATTEN_STEP_DEGREES,
        }
    }
}

fn validate_tolerance(value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidTolerance(value))
    }
}

/// Converts curved geometries into linear ones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linearizer {
    options: LinearizeOptions,
}

impl Default for Linearizer {
    fn default() -> Self {
        Linearizer { options: LinearizeOptions::default() }
    }
}

impl Linearizer {
    pub fn new(tolerance: f64) -> Result<Self> {
        Linearizer::with_options(LinearizeOptions { tolerance, ..LinearizeOptions::default() })
    }

    pub fn with_options(options: LinearizeOptions) -> Result<Self> {
        validate_tolerance(options.tolerance)?;
        if let ChildTolerance::Fixed(value) = options.child_tolerance {
            validate_tolerance(value)?;
        }
        if !(options.flatten_step_degrees.is_finite() && options.flatten_step_degrees > 0.0) {
            return Err(Error::InvalidTolerance(options.flatten_step_degrees));
        }
        Ok(Linearizer { options })
    }

    pub fn options(&self) -> &LinearizeOptions {
        &self.options
    }

    pub fn tolerance(&self) -> f64 {
        self.options.tolerance
    }

    /// Linearize one geometry. `None` in gives `None` out; `None` out for a
    /// present input means the geometry could not be made curve-free.
    pub fn linearize(&self, geometry: Option<&Geometry>) -> Option<Geometry> {
        self.linearize_node(geometry?, self.options.tolerance)
    }

    /// Decode, linearize and re-encode one WKB geometry. Decoding errors are
    /// returned; an unconvertible geometry yields `Ok(None)`.
    pub fn linearize_wkb(&self, wkb: &[u8], order: WkbByteOrder) -> Result<Option<Vec<u8>>> {
        let geometry = read_wkb(wkb)?;
        Ok(self.linearize(Some(&geometry)).map(|linear| write_wkb(&linear, order)))
    }

    fn child_tolerance(&self, tolerance: f64) -> f64 {
        match self.options.child_tolerance {
            ChildTolerance::Inherit => tolerance,
            ChildTolerance::Fixed(value) => value,
        }
    }

    fn flatten(&self, geometry: Geometry, tolerance: f64) -> Geometry {
        flatten_arcs(geometry, self.options.flatten_step_degrees, tolerance).into_geometry()
    }

    fn linearize_node(&self, geometry: &Geometry, tolerance: f64) -> Option<Geometry> {
        let child_tolerance = self.child_tolerance(tolerance);
        // Members of a collection are chorded at their own level when the
        // child tolerance differs, so whole-tree passes stop here
        let whole_tree = !geometry.kind().is_collection() || child_tolerance == tolerance;

        let working = if whole_tree {
            self.flatten(geometry.clone(), tolerance)
        } else {
            geometry.clone()
        };

        let working = match working.kind() {
            GeometryKind::MultiCurve => {
                self.relabel(&working, GeometryKind::LineString, Geometry::MultiLineString, child_tolerance)
            }
            GeometryKind::MultiSurface => {
                self.relabel(&working, GeometryKind::Polygon, Geometry::MultiPolygon, child_tolerance)
            }
            _ => working,
        };

        if !working.has_curves() {
            return Some(working);
        }

        let segmented = if whole_tree {
            segmentize_within(working, tolerance).into_geometry()
        } else {
            working
        };
        let children: Vec<Geometry> = segmented
            .parts()
            .iter()
            .filter_map(|child| self.linearize_node(child, child_tolerance))
            .collect();
        let rebuilt = if children.is_empty() {
            segmented
        } else {
            segmented.with_parts(children)
        };

        let result = self.flatten(rebuilt, tolerance);
        if result.has_curves() {
            tracing::debug!(
                kind = %geometry.kind().display_with(geometry.dimension()),
                "curves remain after linearization"
            );
            return None;
        }
        Some(result)
    }

    /// Rebuild a curved multi-geometry as its linear container. Members that
    /// cannot be linearized, or do not linearize to `member`, are dropped.
    fn relabel(
        &self,
        geometry: &Geometry,
        member: GeometryKind,
        container: fn(Collection) -> Geometry,
        child_tolerance: f64,
    ) -> Geometry {
        let parts: Vec<Geometry> = geometry
            .parts()
            .iter()
            .filter_map(|child| self.linearize_node(child, child_tolerance))
            .filter(|linear| linear.kind() == member)
            .collect();
        let dropped = geometry.parts().len() - parts.len();
        if dropped > 0 {
            tracing::debug!(
                dropped,
                kind = %geometry.kind().display_with(geometry.dimension()),
                "dropped members that could not be linearized"
            );
        }
        container(Collection { dimension: geometry.dimension(), parts })
    }
}

/// Linearize with a one-off tolerance. An invalid tolerance yields `None`.
pub fn linearize(geometry: Option<&Geometry>, tolerance: f64) -> Option<Geometry> {
    match Linearizer::new(tolerance) {
        Ok(linearizer) => linearizer.linearize(geometry),
        Err(err) => {
            tracing::warn!(error = %err, "refusing to linearize");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coord, Dimension};

    fn arc() -> Geometry {
        Geometry::circular_string(
            Dimension::Xy,
            vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0), Coord::xy(2.0, 0.0)],
        )
    }

    #[test]
    fn test_null_in_null_out() {
        assert_eq!(Linearizer::default().linearize(None), None);
        assert_eq!(linearize(None, 1.0), None);
    }

    #[test]
    fn test_rejects_bad_tolerances() {
        assert!(matches!(Linearizer::new(0.0), Err(Error::InvalidTolerance(_))));
        assert!(Linearizer::new(-2.0).is_err());
        assert!(Linearizer::new(f64::NAN).is_err());
        let options = LinearizeOptions { child_tolerance: ChildTolerance::Fixed(0.0), ..LinearizeOptions::default() };
        assert!(Linearizer::with_options(options).is_err());
        assert_eq!(linearize(Some(&arc()), -1.0), None);
    }

    #[test]
    fn test_fixed_child_tolerance_applies_below_top_level() {
        let big_arc = Geometry::circular_string(
            Dimension::Xy,
            vec![Coord::xy(-1000.0, 0.0), Coord::xy(0.0, 1000.0), Coord::xy(1000.0, 0.0)],
        );
        // The malformed sibling defeats the top-level flatten, forcing recursion
        let malformed = Geometry::circular_string(Dimension::Xy, vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]);
        let multi = Geometry::aggregate(GeometryKind::MultiCurve, Dimension::Xy, vec![big_arc, malformed]).unwrap();
        let coarse = LinearizeOptions {
            tolerance: 0.01,
            child_tolerance: ChildTolerance::Fixed(100.0),
            flatten_step_degrees: 180.0,
        };
        let fine = LinearizeOptions { child_tolerance: ChildTolerance::Inherit, ..coarse };

        let coarse_out = Linearizer::with_options(coarse).unwrap().linearize(Some(&multi)).unwrap();
        let fine_out = Linearizer::with_options(fine).unwrap().linearize(Some(&multi)).unwrap();
        assert_eq!(coarse_out.parts().len(), 1);
        assert_eq!(coarse_out.vertex_count(), 5);
        assert!(coarse_out.vertex_count() < fine_out.vertex_count());
    }

    #[test]
    fn test_fixed_child_tolerance_on_valid_collections() {
        let big_arc = Geometry::circular_string(
            Dimension::Xy,
            vec![Coord::xy(-1000.0, 0.0), Coord::xy(0.0, 1000.0), Coord::xy(1000.0, 0.0)],
        );
        let fine = Linearizer::new(0.01).unwrap();
        let coarse = Linearizer::with_options(LinearizeOptions {
            tolerance: 0.01,
            child_tolerance: ChildTolerance::Fixed(100.0),
            ..LinearizeOptions::default()
        })
        .unwrap();

        for kind in [GeometryKind::MultiCurve, GeometryKind::GeometryCollection] {
            let collection = Geometry::aggregate(kind, Dimension::Xy, vec![big_arc.clone()]).unwrap();
            let coarse_out = coarse.linearize(Some(&collection)).unwrap();
            let fine_out = fine.linearize(Some(&collection)).unwrap();
            assert!(!coarse_out.has_curves());
            assert_eq!(coarse_out.parts().len(), 1);
            // The 4 degree flatten step bounds the member, not the 0.01 tolerance
            assert!(coarse_out.vertex_count() <= 47, "{} vertices in {}", coarse_out.vertex_count(), kind);
            assert!(coarse_out.vertex_count() < fine_out.vertex_count());
        }

        // A lone arc is the top level and keeps the caller's tolerance
        let top = coarse.linearize(Some(&big_arc)).unwrap();
        assert_eq!(top, fine.linearize(Some(&big_arc)).unwrap());
    }

    #[test]
    fn test_relabel_drops_members_of_the_wrong_kind() {
        let square = Geometry::polygon(
            Dimension::Xy,
            vec![vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 0.0), Coord::xy(1.0, 1.0), Coord::xy(0.0, 0.0)]],
        );
        let multi = Geometry::aggregate(GeometryKind::MultiCurve, Dimension::Xy, vec![square, arc()]).unwrap();
        let out = Linearizer::new(0.1).unwrap().linearize(Some(&multi)).unwrap();
        assert_eq!(out.kind(), GeometryKind::MultiLineString);
        assert_eq!(out.parts().len(), 1);
        assert_eq!(out.parts()[0].kind(), GeometryKind::LineString);
        assert_eq!(read_wkb(&out.to_wkb()).unwrap(), out);
    }

    #[test]
    fn test_linearize_wkb_round_trip() {
        let linearizer = Linearizer::new(0.01).unwrap();
        let out = linearizer.linearize_wkb(&arc().to_wkb(), WkbByteOrder::BigEndian).unwrap().unwrap();
        assert_eq!(out[0], 0);
        let decoded = read_wkb(&out).unwrap();
        assert_eq!(decoded.kind(), GeometryKind::LineString);
        assert!(linearizer.linearize_wkb(&[1, 2, 3], WkbByteOrder::LittleEndian).is_err());
    }
}
