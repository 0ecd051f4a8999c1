//! Well-known binary (WKB) exchange codec
//!
//! This is the only boundary format the linearizer speaks. Readers accept
//! both byte orders (per nested geometry, as the format allows), ISO
//! dimension offsets and EWKB flags. Writers emit ISO WKB.

use super::kind::{Dimension, GeometryKind, EWKB_SRID_FLAG};
use super::types::{Collection, Coord, CoordSeq, Geometry, Point, Polygon};
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::marker::PhantomData;

/// Maximum nesting depth accepted by the reader
pub const MAX_NESTING_DEPTH: usize = 64;

/// Byte order of an encoded geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WkbByteOrder {
    BigEndian,
    #[default]
    LittleEndian,
}

impl WkbByteOrder {
    fn from_marker(marker: u8) -> Result<Self> {
        match marker {
            0 => Ok(WkbByteOrder::BigEndian),
            1 => Ok(WkbByteOrder::LittleEndian),
            other => Err(Error::InvalidByteOrder(other)),
        }
    }

    fn marker(self) -> u8 {
        match self {
            WkbByteOrder::BigEndian => 0,
            WkbByteOrder::LittleEndian => 1,
        }
    }
}

/// Decode one geometry. The whole slice must be consumed.
pub fn read_wkb(bytes: &[u8]) -> Result<Geometry> {
    let mut reader = WkbReader { cursor: Cursor::new(bytes) };
    let geometry = reader.read_geometry(0)?;
    let remaining = bytes.len() - reader.offset();
    if remaining > 0 {
        return Err(Error::TrailingBytes(remaining));
    }
    Ok(geometry)
}

/// Encode one geometry as ISO WKB in the requested byte order
pub fn write_wkb(geometry: &Geometry, order: WkbByteOrder) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(estimated_size(geometry));
    match order {
        WkbByteOrder::LittleEndian => WkbWriter::<LittleEndian>::new(&mut buffer, order).write_geometry(geometry),
        WkbByteOrder::BigEndian => WkbWriter::<BigEndian>::new(&mut buffer, order).write_geometry(geometry),
    }
    buffer
}

impl Geometry {
    pub fn from_wkb(bytes: &[u8]) -> Result<Geometry> {
        read_wkb(bytes)
    }

    /// Little endian ISO WKB
    pub fn to_wkb(&self) -> Vec<u8> {
        write_wkb(self, WkbByteOrder::LittleEndian)
    }
}

fn estimated_size(geometry: &Geometry) -> usize {
    9 + geometry.vertex_count() * geometry.dimension().ordinates() * 8
}

struct WkbReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WkbReader<'a> {
    fn offset(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.offset())
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEof { offset: self.offset() }
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| self.eof())
    }

    fn read_u32(&mut self, order: WkbByteOrder) -> Result<u32> {
        let value = match order {
            WkbByteOrder::LittleEndian => self.cursor.read_u32::<LittleEndian>(),
            WkbByteOrder::BigEndian => self.cursor.read_u32::<BigEndian>(),
        };
        value.map_err(|_| self.eof())
    }

    fn read_f64(&mut self, order: WkbByteOrder) -> Result<f64> {
        let value = match order {
            WkbByteOrder::LittleEndian => self.cursor.read_f64::<LittleEndian>(),
            WkbByteOrder::BigEndian => self.cursor.read_f64::<BigEndian>(),
        };
        value.map_err(|_| self.eof())
    }

    /// Read an element count, refusing counts the remaining input cannot hold
    fn read_count(&mut self, order: WkbByteOrder, min_element_size: usize) -> Result<usize> {
        let count = self.read_u32(order)? as usize;
        if count.saturating_mul(min_element_size) > self.remaining() {
            return Err(self.eof());
        }
        Ok(count)
    }

    fn read_coord(&mut self, order: WkbByteOrder, dimension: Dimension) -> Result<Coord> {
        let x = self.read_f64(order)?;
        let y = self.read_f64(order)?;
        let z = if dimension.has_z() { self.read_f64(order)? } else { 0.0 };
        let m = if dimension.has_m() { self.read_f64(order)? } else { 0.0 };
        Ok(Coord { x, y, z, m })
    }

    fn read_coords(&mut self, order: WkbByteOrder, dimension: Dimension) -> Result<Vec<Coord>> {
        let count = self.read_count(order, dimension.ordinates() * 8)?;
        (0..count).map(|_| self.read_coord(order, dimension)).collect()
    }

    fn read_geometry(&mut self, depth: usize) -> Result<Geometry> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::TooDeep(MAX_NESTING_DEPTH));
        }

        let order = WkbByteOrder::from_marker(self.read_u8()?)?;
        let code = self.read_u32(order)?;
        if code & EWKB_SRID_FLAG != 0 {
            let srid = self.read_u32(order)?;
            tracing::debug!(srid, "ignoring SRID embedded in EWKB");
        }
        let (kind, dimension) = GeometryKind::from_wkb_code(code)?;

        let geometry = match kind {
            GeometryKind::Point => {
                let coord = self.read_coord(order, dimension)?;
                let coord = if coord.x.is_nan() && coord.y.is_nan() { None } else { Some(coord) };
                Geometry::Point(Point { dimension, coord })
            }
            GeometryKind::LineString => Geometry::LineString(CoordSeq {
                dimension,
                coords: self.read_coords(order, dimension)?,
            }),
            GeometryKind::CircularString => Geometry::CircularString(CoordSeq {
                dimension,
                coords: self.read_coords(order, dimension)?,
            }),
            GeometryKind::Polygon => {
                let ring_count = self.read_count(order, 4)?;
                let rings = (0..ring_count)
                    .map(|_| self.read_coords(order, dimension))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::Polygon(Polygon { dimension, rings })
            }
            _ => {
                // The smallest possible child is a 9 byte header
                let part_count = self.read_count(order, 9)?;
                let mut parts = Vec::with_capacity(part_count);
                for _ in 0..part_count {
                    let child = self.read_geometry(depth + 1)?;
                    if !accepts_child(kind, child.kind()) {
                        return Err(Error::InvalidChild {
                            parent: kind.to_string(),
                            child: child.kind().to_string(),
                        });
                    }
                    parts.push(child);
                }
                Geometry::aggregate(kind, dimension, parts)
                    .ok_or_else(|| Error::UnsupportedType(kind.to_string()))?
            }
        };
        Ok(geometry)
    }
}

/// Which child kinds an aggregate may hold
fn accepts_child(parent: GeometryKind, child: GeometryKind) -> bool {
    use GeometryKind as K;
    match parent {
        K::MultiPoint => child == K::Point,
        K::MultiLineString => child == K::LineString,
        K::MultiPolygon => child == K::Polygon,
        K::CompoundCurve => matches!(child, K::LineString | K::CircularString),
        K::CurvePolygon | K::MultiCurve => matches!(child, K::LineString | K::CircularString | K::CompoundCurve),
        K::MultiSurface => matches!(child, K::Polygon | K::CurvePolygon),
        K::GeometryCollection => true,
        K::Point | K::LineString | K::Polygon | K::CircularString => false,
    }
}

struct WkbWriter<'a, B: ByteOrder> {
    buffer: &'a mut Vec<u8>,
    order: WkbByteOrder,
    _marker: PhantomData<B>,
}

impl<'a, B: ByteOrder> WkbWriter<'a, B> {
    fn new(buffer: &'a mut Vec<u8>, order: WkbByteOrder) -> Self {
        WkbWriter { buffer, order, _marker: PhantomData }
    }

    fn write_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        B::write_u32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    fn write_f64(&mut self, value: f64) {
        let mut bytes = [0u8; 8];
        B::write_f64(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    fn write_header(&mut self, geometry: &Geometry) {
        self.buffer.push(self.order.marker());
        self.write_u32(geometry.kind().iso_code(geometry.dimension()));
    }

    fn write_coord(&mut self, coord: &Coord, dimension: Dimension) {
        self.write_f64(coord.x);
        self.write_f64(coord.y);
        if dimension.has_z() {
            self.write_f64(coord.z);
        }
        if dimension.has_m() {
            self.write_f64(coord.m);
        }
    }

    fn write_coords(&mut self, coords: &[Coord], dimension: Dimension) {
        self.write_u32(coords.len() as u32);
        for coord in coords {
            self.write_coord(coord, dimension);
        }
    }

    fn write_geometry(&mut self, geometry: &Geometry) {
        self.write_header(geometry);
        match geometry {
            Geometry::Point(point) => {
                let empty = Coord { x: f64::NAN, y: f64::NAN, z: f64::NAN, m: f64::NAN };
                let coord = point.coord.unwrap_or(empty);
                self.write_coord(&coord, point.dimension);
            }
            Geometry::LineString(seq) | Geometry::CircularString(seq) => {
                self.write_coords(&seq.coords, seq.dimension);
            }
            Geometry::Polygon(polygon) => {
                self.write_u32(polygon.rings.len() as u32);
                for ring in &polygon.rings {
                    self.write_coords(ring, polygon.dimension);
                }
            }
            Geometry::MultiPoint(c)
            | Geometry::MultiLineString(c)
            | Geometry::MultiPolygon(c)
            | Geometry::GeometryCollection(c)
            | Geometry::CompoundCurve(c)
            | Geometry::CurvePolygon(c)
            | Geometry::MultiCurve(c)
            | Geometry::MultiSurface(c) => self.write_parts(c),
        }
    }

    fn write_parts(&mut self, collection: &Collection) {
        self.write_u32(collection.parts.len() as u32);
        for part in &collection.parts {
            self.write_geometry(part);
        }
    }
}
