//! Storage text format for drawn shapes.
//!
//! Shapes are stored as `POINT(x y)`, `LINESTRING(x1 y1, x2 y2, ...)` and
//! `POLYGON((x1 y1, ...))`, x being the longitude and y the latitude, the same
//! axis order as GeoJSON. A PostGIS style `SRID=4326;` prefix is accepted and
//! dropped on parse. Polygon rings are stored as drawn: the closing vertex is
//! neither required nor added.

use std::fmt;
use std::str::FromStr;

use geo::{BoundingRect, Centroid, Coord};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::visibility::ViewportBounds;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Outer ring only; holes are not supported.
    Polygon(Vec<Coord>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeometryKind::Point => write!(f, "Point"),
            GeometryKind::LineString => write!(f, "LineString"),
            GeometryKind::Polygon => write!(f, "Polygon"),
        }
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
        }
    }

    pub fn coords(&self) -> &[Coord] {
        match self {
            Geometry::Point(c) => std::slice::from_ref(c),
            Geometry::LineString(cs) | Geometry::Polygon(cs) => cs,
        }
    }

    pub fn to_wkt(&self) -> String {
        self.to_string()
    }

    pub fn parse(text: &str) -> Result<Geometry> {
        let mut body = text.trim();

        if let Some(rest) = strip_prefix_ignore_case(body, "SRID=") {
            match rest.split_once(';') {
                Some((srid, geometry)) if srid.trim().parse::<i32>().is_ok() => {
                    body = geometry.trim();
                }
                _ => return Err(Error::malformed(text, "invalid SRID prefix")),
            }
        }

        let (kind, rest) = if let Some(rest) = strip_prefix_ignore_case(body, "LINESTRING") {
            (GeometryKind::LineString, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(body, "POLYGON") {
            (GeometryKind::Polygon, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(body, "POINT") {
            (GeometryKind::Point, rest)
        } else {
            return Err(Error::malformed(text, "unrecognized geometry keyword"));
        };

        let list = unwrap_parens(rest.trim(), text)?;
        match kind {
            GeometryKind::Point => {
                let coords = parse_pairs(list, text)?;
                if coords.len() != 1 {
                    return Err(Error::malformed(text, "a point has exactly one coordinate"));
                }
                Ok(Geometry::Point(coords[0]))
            }
            GeometryKind::LineString => {
                let coords = parse_pairs(list, text)?;
                if coords.len() < 2 {
                    return Err(Error::malformed(text, "a linestring needs at least two points"));
                }
                Ok(Geometry::LineString(coords))
            }
            GeometryKind::Polygon => {
                let ring = unwrap_parens(list.trim(), text)?;
                let coords = parse_pairs(ring, text)?;
                if coords.len() < 3 {
                    return Err(Error::malformed(text, "a polygon ring needs at least three points"));
                }
                Ok(Geometry::Polygon(coords))
            }
        }
    }

    /// GeoJSON geometry object. Polygon rings are closed on output as GeoJSON
    /// requires.
    pub fn to_geojson(&self) -> Value {
        match self {
            Geometry::Point(c) => json!({
                "type": "Point",
                "coordinates": [c.x, c.y],
            }),
            Geometry::LineString(cs) => json!({
                "type": "LineString",
                "coordinates": positions(cs),
            }),
            Geometry::Polygon(cs) => {
                let mut ring = positions(cs);
                if cs.len() > 1 && cs.first() != cs.last() {
                    ring.push(json!([cs[0].x, cs[0].y]));
                }
                json!({
                    "type": "Polygon",
                    "coordinates": [ring],
                })
            }
        }
    }

    /// Reads a GeoJSON geometry, or the geometry of a GeoJSON feature, as
    /// handed over by the drawing tool.
    pub fn from_geojson(value: &Value) -> Result<Geometry> {
        let malformed = |reason: &str| Error::malformed(&value.to_string(), reason);

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing type"))?;
        if kind == "Feature" {
            let geometry = value
                .get("geometry")
                .ok_or_else(|| malformed("feature without geometry"))?;
            return Geometry::from_geojson(geometry);
        }

        let coordinates = value
            .get("coordinates")
            .ok_or_else(|| malformed("missing coordinates"))?;
        match kind {
            "Point" => {
                let c = position(coordinates).ok_or_else(|| malformed("invalid position"))?;
                Ok(Geometry::Point(c))
            }
            "LineString" => {
                let cs = position_list(coordinates).ok_or_else(|| malformed("invalid positions"))?;
                if cs.len() < 2 {
                    return Err(malformed("a linestring needs at least two points"));
                }
                Ok(Geometry::LineString(cs))
            }
            "Polygon" => {
                let ring = coordinates
                    .as_array()
                    .and_then(|rings| rings.first())
                    .and_then(position_list)
                    .ok_or_else(|| malformed("invalid ring"))?;
                if ring.len() < 3 {
                    return Err(malformed("a polygon ring needs at least three points"));
                }
                Ok(Geometry::Polygon(ring))
            }
            other => Err(malformed(&format!("unsupported geometry type {}", other))),
        }
    }

    /// Bounding box, for fitting the map to one entity.
    pub fn extent(&self) -> Option<ViewportBounds> {
        let rect = geo::LineString::new(self.coords().to_vec()).bounding_rect()?;
        Some(ViewportBounds {
            north: rect.max().y,
            south: rect.min().y,
            east: rect.max().x,
            west: rect.min().x,
        })
    }

    /// Where a detail popup is attached: the point itself, the middle vertex
    /// of a line, the centroid of a polygon.
    pub fn anchor(&self) -> Option<Coord> {
        match self {
            Geometry::Point(c) => Some(*c),
            Geometry::LineString(cs) => cs.get(cs.len() / 2).copied(),
            Geometry::Polygon(cs) => {
                let polygon = geo::Polygon::new(geo::LineString::new(cs.clone()), vec![]);
                polygon.centroid().map(|p| p.0)
            }
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Geometry::Point(c) => write!(f, "POINT({} {})", c.x, c.y),
            Geometry::LineString(cs) => write!(f, "LINESTRING({})", join_pairs(cs)),
            Geometry::Polygon(cs) => write!(f, "POLYGON(({}))", join_pairs(cs)),
        }
    }
}

impl FromStr for Geometry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Geometry> {
        Geometry::parse(s)
    }
}

fn join_pairs(coords: &[Coord]) -> String {
    coords
        .iter()
        .map(|c| format!("{} {}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(", ")
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

fn unwrap_parens<'a>(s: &'a str, input: &str) -> Result<&'a str> {
    s.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .ok_or_else(|| Error::malformed(input, "expected a parenthesised coordinate list"))
}

fn parse_pairs(list: &str, input: &str) -> Result<Vec<Coord>> {
    if list.contains(|c: char| c == '(' || c == ')') {
        return Err(Error::malformed(input, "unexpected parenthesis nesting"));
    }

    list.split(',')
        .map(|pair| {
            let tokens: Vec<&str> = pair.split_whitespace().collect();
            if tokens.len() != 2 {
                return Err(Error::malformed(
                    input,
                    format!("expected two numbers in {:?}", pair.trim()),
                ));
            }
            let x = parse_number(tokens[0], input)?;
            let y = parse_number(tokens[1], input)?;
            Ok(Coord { x, y })
        })
        .collect()
}

fn parse_number(token: &str, input: &str) -> Result<f64> {
    match token.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(Error::malformed(input, format!("{:?} is not a number", token))),
    }
}

fn positions(coords: &[Coord]) -> Vec<Value> {
    coords.iter().map(|c| json!([c.x, c.y])).collect()
}

fn position(value: &Value) -> Option<Coord> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    Some(Coord {
        x: pair[0].as_f64()?,
        y: pair[1].as_f64()?,
    })
}

fn position_list(value: &Value) -> Option<Vec<Coord>> {
    value.as_array()?.iter().map(position).collect()
}
