//! Geometry kind and dimensionality tags
//!
//! Producers report geometry types inconsistently: ISO codes with a `+1000`
//! style dimension offset, EWKB high-bit flags, or a type name in arbitrary
//! case. Everything is normalized here, once, into a [`GeometryKind`] and a
//! [`Dimension`] so the rest of the crate matches on a single tag.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// EWKB flag marking a Z coordinate (also the legacy OGR 2.5D flag)
pub const EWKB_Z_FLAG: u32 = 0x8000_0000;
/// EWKB flag marking an M coordinate
pub const EWKB_M_FLAG: u32 = 0x4000_0000;
/// EWKB flag marking an embedded SRID
pub const EWKB_SRID_FLAG: u32 = 0x2000_0000;

const EWKB_FLAGS_MASK: u32 = EWKB_Z_FLAG | EWKB_M_FLAG | EWKB_SRID_FLAG;

/// Coordinate dimensionality carried by every geometry node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Dimension {
    #[default]
    Xy,
    Xyz,
    Xym,
    Xyzm,
}

impl Dimension {
    pub fn new(has_z: bool, has_m: bool) -> Self {
        match (has_z, has_m) {
            (false, false) => Dimension::Xy,
            (true, false) => Dimension::Xyz,
            (false, true) => Dimension::Xym,
            (true, true) => Dimension::Xyzm,
        }
    }

    pub fn has_z(self) -> bool {
        matches!(self, Dimension::Xyz | Dimension::Xyzm)
    }

    pub fn has_m(self) -> bool {
        matches!(self, Dimension::Xym | Dimension::Xyzm)
    }

    /// Number of ordinates stored per coordinate
    pub fn ordinates(self) -> usize {
        2 + self.has_z() as usize + self.has_m() as usize
    }

    /// ISO WKB type code offset (0, 1000, 2000 or 3000)
    pub fn iso_offset(self) -> u32 {
        match self {
            Dimension::Xy => 0,
            Dimension::Xyz => 1000,
            Dimension::Xym => 2000,
            Dimension::Xyzm => 3000,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Dimension::Xy => "",
            Dimension::Xyz => " Z",
            Dimension::Xym => " M",
            Dimension::Xyzm => " ZM",
        }
    }
}

/// The concrete geometry kinds understood by the linearizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    CircularString,
    CompoundCurve,
    CurvePolygon,
    MultiCurve,
    MultiSurface,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 12] = [
        GeometryKind::Point,
        GeometryKind::LineString,
        GeometryKind::Polygon,
        GeometryKind::MultiPoint,
        GeometryKind::MultiLineString,
        GeometryKind::MultiPolygon,
        GeometryKind::GeometryCollection,
        GeometryKind::CircularString,
        GeometryKind::CompoundCurve,
        GeometryKind::CurvePolygon,
        GeometryKind::MultiCurve,
        GeometryKind::MultiSurface,
    ];

    /// Base (2D) WKB type code
    pub fn base_code(self) -> u32 {
        match self {
            GeometryKind::Point => 1,
            GeometryKind::LineString => 2,
            GeometryKind::Polygon => 3,
            GeometryKind::MultiPoint => 4,
            GeometryKind::MultiLineString => 5,
            GeometryKind::MultiPolygon => 6,
            GeometryKind::GeometryCollection => 7,
            GeometryKind::CircularString => 8,
            GeometryKind::CompoundCurve => 9,
            GeometryKind::CurvePolygon => 10,
            GeometryKind::MultiCurve => 11,
            GeometryKind::MultiSurface => 12,
        }
    }

    /// ISO WKB type code including the dimension offset
    pub fn iso_code(self, dimension: Dimension) -> u32 {
        self.base_code() + dimension.iso_offset()
    }

    /// Upper case WKT type name
    pub fn name(self) -> &'static str {
        match self {
            GeometryKind::Point => "POINT",
            GeometryKind::LineString => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLineString => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
            GeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
            GeometryKind::CircularString => "CIRCULARSTRING",
            GeometryKind::CompoundCurve => "COMPOUNDCURVE",
            GeometryKind::CurvePolygon => "CURVEPOLYGON",
            GeometryKind::MultiCurve => "MULTICURVE",
            GeometryKind::MultiSurface => "MULTISURFACE",
        }
    }

    /// True for kinds that may hold arc segments.
    ///
    /// The explicit set is authoritative; the name test catches any curve kind
    /// added later without updating the list.
    pub fn is_curved(self) -> bool {
        matches!(
            self,
            GeometryKind::CircularString
                | GeometryKind::CompoundCurve
                | GeometryKind::CurvePolygon
                | GeometryKind::MultiCurve
                | GeometryKind::MultiSurface
        ) || self.name().contains("CURVE")
    }

    /// True for kinds whose children are independent member geometries, as
    /// opposed to the segments or rings of a single curve or surface
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            GeometryKind::MultiPoint
                | GeometryKind::MultiLineString
                | GeometryKind::MultiPolygon
                | GeometryKind::GeometryCollection
                | GeometryKind::MultiCurve
                | GeometryKind::MultiSurface
        )
    }

    /// Linear kind a curved kind becomes once its arcs are chorded
    pub fn linear_counterpart(self) -> GeometryKind {
        match self {
            GeometryKind::CircularString | GeometryKind::CompoundCurve => GeometryKind::LineString,
            GeometryKind::CurvePolygon => GeometryKind::Polygon,
            GeometryKind::MultiCurve => GeometryKind::MultiLineString,
            GeometryKind::MultiSurface => GeometryKind::MultiPolygon,
            other => other,
        }
    }

    pub fn from_base_code(code: u32) -> Result<Self> {
        match code {
            13 => Err(Error::UnsupportedType("abstract CURVE".to_string())),
            14 => Err(Error::UnsupportedType("abstract SURFACE".to_string())),
            _ => GeometryKind::ALL
                .into_iter()
                .find(|kind| kind.base_code() == code)
                .ok_or(Error::UnknownType(code)),
        }
    }

    /// Normalize any WKB type code (ISO offsets or EWKB flags) to a kind and
    /// its dimensionality. The SRID flag is ignored here.
    pub fn from_wkb_code(code: u32) -> Result<(Self, Dimension)> {
        let mut has_z = code & EWKB_Z_FLAG != 0;
        let mut has_m = code & EWKB_M_FLAG != 0;
        let stripped = code & !EWKB_FLAGS_MASK;

        match stripped / 1000 {
            0 => {}
            1 => has_z = true,
            2 => has_m = true,
            3 => {
                has_z = true;
                has_m = true;
            }
            _ => return Err(Error::UnknownType(code)),
        }

        let kind = GeometryKind::from_base_code(stripped % 1000).map_err(|e| match e {
            Error::UnknownType(_) => Error::UnknownType(code),
            other => other,
        })?;
        Ok((kind, Dimension::new(has_z, has_m)))
    }

    /// Parse a type name such as `MultiCurve`, `MULTICURVE Z` or `multicurvezm`,
    /// returning the kind and the dimensionality named by the suffix.
    pub fn parse_name(name: &str) -> Result<(Self, Dimension)> {
        let upper = name.trim().to_ascii_uppercase();
        let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();

        let lookup = |candidate: &str| GeometryKind::ALL.into_iter().find(|k| k.name() == candidate);

        if let Some(kind) = lookup(&compact) {
            return Ok((kind, Dimension::Xy));
        }
        for (suffix, dimension) in [("ZM", Dimension::Xyzm), ("Z", Dimension::Xyz), ("M", Dimension::Xym)] {
            if let Some(kind) = compact.strip_suffix(suffix).and_then(lookup) {
                return Ok((kind, dimension));
            }
        }
        Err(Error::UnsupportedType(name.to_string()))
    }

    /// Display name with a dimension suffix, e.g. `CIRCULARSTRING Z`
    pub fn display_with(self, dimension: Dimension) -> String {
        format!("{}{}", self.name(), dimension.suffix())
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        GeometryKind::parse_name(s).map(|(kind, _)| kind)
    }
}
