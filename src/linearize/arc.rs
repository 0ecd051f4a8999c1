//! Circular arc chording
//!
//! An arc is given by three control points: start, any point on the arc, end.
//! It is replaced by chords whose end points lie on the circle. The number of
//! chords comes from a [`StepPolicy`]: an angular cap, a sagitta (maximum
//! deviation) cap, or both, whichever is finer.

use crate::geometry::Coord;
use std::f64::consts::PI;

/// Angular step of the best-effort flatten pass, in degrees
pub const DEFAULT_FLATTEN_STEP_DEGREES: f64 = 4.0;

/// Upper bound on chords generated for a single arc
pub const MAX_CHORDS_PER_ARC: usize = 1 << 16;

/// Relative threshold below which three control points count as collinear
const COLLINEAR_EPSILON: f64 = 1e-12;

/// How finely an arc is subdivided
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPolicy {
    /// Largest angle swept by one chord, in radians
    pub max_angle: f64,
    /// Largest distance between a chord and the arc it replaces
    pub max_deviation: f64,
}

impl StepPolicy {
    /// Chords bounded only by their deviation from the arc
    pub fn deviation(tolerance: f64) -> Self {
        StepPolicy { max_angle: f64::INFINITY, max_deviation: tolerance }
    }

    /// Chords bounded only by a fixed angular step
    pub fn angle_degrees(degrees: f64) -> Self {
        StepPolicy { max_angle: degrees.to_radians(), max_deviation: f64::INFINITY }
    }

    pub fn with_max_deviation(self, tolerance: f64) -> Self {
        StepPolicy { max_deviation: tolerance, ..self }
    }

    /// Largest angular step allowed on a circle of `radius`
    pub fn max_step(&self, radius: f64) -> f64 {
        // sagitta of a chord spanning angle t: r * (1 - cos(t / 2))
        let deviation_step = if self.max_deviation.is_finite() {
            2.0 * (1.0 - self.max_deviation / radius).max(-1.0).acos()
        } else {
            2.0 * PI
        };
        deviation_step.min(self.max_angle)
    }
}

/// Circle through three points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Coord,
    pub radius: f64,
}

/// Circle defined by arc control points. A closed arc (start == end) is a
/// full circle with the middle point diametrically opposite the start.
/// Returns `None` for collinear or coincident control points.
pub fn circle_through(p0: &Coord, p1: &Coord, p2: &Coord) -> Option<Circle> {
    if p0.same_xy(p2) {
        if p0.same_xy(p1) {
            return None;
        }
        let center = Coord::xy((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0);
        return Some(Circle { center, radius: p0.distance_2d(p1) / 2.0 });
    }

    // Work relative to p0 to keep precision for large coordinates
    let (bx, by) = (p1.x - p0.x, p1.y - p0.y);
    let (cx, cy) = (p2.x - p0.x, p2.y - p0.y);
    let d = 2.0 * (bx * cy - by * cx);
    let scale = (bx * bx + by * by).max(cx * cx + cy * cy);
    if d.abs() <= COLLINEAR_EPSILON * scale {
        return None;
    }

    let b_sq = bx * bx + by * by;
    let c_sq = cx * cx + cy * cy;
    let ux = (cy * b_sq - by * c_sq) / d;
    let uy = (bx * c_sq - cx * b_sq) / d;
    Some(Circle {
        center: Coord::xy(p0.x + ux, p0.y + uy),
        radius: ux.hypot(uy),
    })
}

fn lerp(a: &Coord, b: &Coord, t: f64) -> (f64, f64) {
    (a.z + (b.z - a.z) * t, a.m + (b.m - a.m) * t)
}

/// Chords needed to sweep `sweep` radians in steps of at most `step`, never
/// fewer than `min_chords`. Past [`MAX_CHORDS_PER_ARC`] the chords no longer
/// honour the step, which is logged.
fn chord_count(sweep: f64, step: f64, min_chords: usize) -> usize {
    let wanted = (sweep / step).ceil();
    if wanted.is_finite() && wanted <= MAX_CHORDS_PER_ARC as f64 {
        return (wanted as usize).max(min_chords);
    }
    tracing::warn!(
        wanted,
        cap = MAX_CHORDS_PER_ARC,
        "arc needs more chords than allowed, chords will deviate beyond tolerance"
    );
    MAX_CHORDS_PER_ARC
}

/// Replace one arc with chords. The result starts with `p0` and ends with
/// `p2`, both copied exactly; every vertex in between lies on the circle.
/// Z and M are interpolated linearly along each half of the arc.
pub fn chord_arc(p0: &Coord, p1: &Coord, p2: &Coord, policy: StepPolicy) -> Vec<Coord> {
    let Some(circle) = circle_through(p0, p1, p2) else {
        // Straight "arc": keep the control points as a polyline
        let mut points = vec![*p0];
        for p in [p1, p2] {
            if !points.last().is_some_and(|last| last.same_xy(p)) {
                points.push(*p);
            }
        }
        if points.len() == 1 {
            points.push(*p2);
        }
        return points;
    };

    let center = circle.center;
    let angle_of = |p: &Coord| (p.y - center.y).atan2(p.x - center.x);
    let (a0, a1, a2) = (angle_of(p0), angle_of(p1), angle_of(p2));

    let full_circle = p0.same_xy(p2);
    let turn = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
    let clockwise = !full_circle && turn < 0.0;

    let ccw_span = |from: f64, to: f64| (to - from).rem_euclid(2.0 * PI);
    let (sweep, mid_sweep) = if full_circle {
        (2.0 * PI, PI)
    } else if clockwise {
        (-ccw_span(a2, a0), -ccw_span(a1, a0))
    } else {
        (ccw_span(a0, a2), ccw_span(a0, a1))
    };

    let min_chords = if full_circle { 3 } else { 2 };
    let chords = chord_count(sweep.abs(), policy.max_step(circle.radius), min_chords);

    let mut points = Vec::with_capacity(chords + 1);
    points.push(*p0);
    for i in 1..chords {
        let swept = sweep * i as f64 / chords as f64;
        let angle = a0 + swept;
        let (z, m) = if swept.abs() <= mid_sweep.abs() {
            lerp(p0, p1, swept / mid_sweep)
        } else {
            lerp(p1, p2, (swept - mid_sweep) / (sweep - mid_sweep))
        };
        points.push(Coord {
            x: center.x + circle.radius * angle.cos(),
            y: center.y + circle.radius * angle.sin(),
            z,
            m,
        });
    }
    points.push(*p2);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_chord_deviation(points: &[Coord], circle: &Circle) -> f64 {
        points
            .windows(2)
            .map(|pair| {
                let mid = Coord::xy((pair[0].x + pair[1].x) / 2.0, (pair[0].y + pair[1].y) / 2.0);
                circle.radius - mid.distance_2d(&circle.center)
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_circle_through_semicircle() {
        let circle = circle_through(&Coord::xy(-10.0, 0.0), &Coord::xy(0.0, 10.0), &Coord::xy(10.0, 0.0)).unwrap();
        assert!(circle.center.distance_2d(&Coord::xy(0.0, 0.0)) < 1e-9);
        assert!((circle.radius - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_points_have_no_circle() {
        assert!(circle_through(&Coord::xy(0.0, 0.0), &Coord::xy(1.0, 1.0), &Coord::xy(2.0, 2.0)).is_none());
        let chords = chord_arc(&Coord::xy(0.0, 0.0), &Coord::xy(1.0, 1.0), &Coord::xy(2.0, 2.0), StepPolicy::deviation(0.1));
        assert_eq!(chords.len(), 3);
    }

    #[test]
    fn test_chords_respect_deviation() {
        let (p0, p1, p2) = (Coord::xy(-10.0, 0.0), Coord::xy(0.0, 10.0), Coord::xy(10.0, 0.0));
        let circle = circle_through(&p0, &p1, &p2).unwrap();
        for tolerance in [5.0, 1.0, 0.1, 0.001] {
            let points = chord_arc(&p0, &p1, &p2, StepPolicy::deviation(tolerance));
            assert!(max_chord_deviation(&points, &circle) <= tolerance + 1e-9);
            assert_eq!(points.first(), Some(&p0));
            assert_eq!(points.last(), Some(&p2));
            for p in &points {
                assert!((p.distance_2d(&circle.center) - circle.radius).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_clockwise_arc_stays_on_the_middle_point_side() {
        // Upper half traversed clockwise from left to right
        let (p0, p1, p2) = (Coord::xy(-1.0, 0.0), Coord::xy(0.0, 1.0), Coord::xy(1.0, 0.0));
        let points = chord_arc(&p0, &p1, &p2, StepPolicy::angle_degrees(10.0));
        assert_eq!(points.len(), 19);
        assert!(points.iter().all(|p| p.y >= -1e-12));
    }

    #[test]
    fn test_full_circle() {
        let (p0, p1) = (Coord::xy(1.0, 0.0), Coord::xy(-1.0, 0.0));
        let points = chord_arc(&p0, &p1, &p0, StepPolicy::angle_degrees(90.0));
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], points[4]);
        assert!(points[2].distance_2d(&p1) < 1e-12);
    }

    #[test]
    fn test_z_and_m_are_interpolated_per_half() {
        let p0 = Coord::xyzm(-1.0, 0.0, 0.0, 10.0);
        let p1 = Coord::xyzm(0.0, 1.0, 5.0, 20.0);
        let p2 = Coord::xyzm(1.0, 0.0, 6.0, 30.0);
        let points = chord_arc(&p0, &p1, &p2, StepPolicy::angle_degrees(45.0));
        assert_eq!(points.len(), 5);
        assert!((points[2].z - 5.0).abs() < 1e-9);
        assert!((points[2].m - 20.0).abs() < 1e-9);
        assert!((points[3].z - 5.5).abs() < 1e-9);
        assert_eq!(points[4], p2);
    }

    #[test]
    fn test_chord_count_bounds() {
        assert_eq!(chord_count(PI, PI / 4.0, 2), 4);
        assert_eq!(chord_count(0.1, PI, 2), 2);
        assert_eq!(chord_count(2.0 * PI, PI, 3), 3);
        assert_eq!(chord_count(PI, 1e-12, 2), MAX_CHORDS_PER_ARC);
        assert_eq!(chord_count(PI, 0.0, 2), MAX_CHORDS_PER_ARC);
    }

    #[test]
    fn test_step_count_is_capped() {
        let (p0, p1, p2) = (Coord::xy(-1e9, 0.0), Coord::xy(0.0, 1e9), Coord::xy(1e9, 0.0));
        let points = chord_arc(&p0, &p1, &p2, StepPolicy::deviation(1e-12));
        assert_eq!(points.len(), MAX_CHORDS_PER_ARC + 1);
    }
}
