use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;

use geo::Coord;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geomath::validate_coordinates;
use crate::geometry::Geometry;

pub fn read_whole_file(filename: &str) -> Result<String> {
    let mut file = File::open(filename)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
}

/// Points of the first track, all segments joined in order.
pub fn parse_gpx(gpx_data: &str) -> Result<Vec<TrackPoint>> {
    let gpx = ::gpx::read(BufReader::new(gpx_data.as_bytes()))?;

    let track = match gpx.tracks.first() {
        Some(track) => track,
        None => return Err(Error::malformed("gpx", "no track in file")),
    };

    let mut points = Vec::new();
    for segment in &track.segments {
        for waypoint in &segment.points {
            let point = waypoint.point();
            points.push(TrackPoint {
                lat: point.y(),
                lon: point.x(),
                ele: waypoint.elevation,
            });
        }
    }
    debug!(segments = track.segments.len(), points = points.len(), "track read");
    Ok(points)
}

/// Track as a route line.
pub fn route_geometry(points: &[TrackPoint]) -> Result<Geometry> {
    if points.len() < 2 {
        return Err(Error::malformed("gpx", format!("a route needs 2 points, got {}", points.len())));
    }
    let mut coords = Vec::with_capacity(points.len());
    for p in points {
        if !validate_coordinates(p.lat, p.lon) {
            return Err(Error::InvalidCoordinate { lat: p.lat, lon: p.lon });
        }
        coords.push(Coord { x: p.lon, y: p.lat });
    }
    Ok(Geometry::LineString(coords))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="jalon" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Boucle</name>
    <trkseg>
      <trkpt lat="48.5734" lon="7.7521"><ele>142.0</ele></trkpt>
      <trkpt lat="48.5740" lon="7.7530"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="48.5750" lon="7.7540"><ele>145.5</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn reads_all_segments_of_the_first_track() {
        let points = parse_gpx(TRACK).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], TrackPoint { lat: 48.5734, lon: 7.7521, ele: Some(142.0) });
        assert_eq!(points[1].ele, None);
        assert_eq!(points[2].lon, 7.7540);
    }

    #[test]
    fn builds_a_route_line() {
        let points = parse_gpx(TRACK).unwrap();
        let route = route_geometry(&points).unwrap();
        assert_eq!(
            route.to_wkt(),
            "LINESTRING(7.7521 48.5734, 7.753 48.574, 7.754 48.575)"
        );
        assert!(route_geometry(&points[..1]).is_err());
    }

    #[test]
    fn file_without_tracks_is_rejected() {
        let empty = r#"<?xml version="1.0"?><gpx version="1.1" creator="jalon" xmlns="http://www.topografix.com/GPX/1/1"></gpx>"#;
        assert!(matches!(parse_gpx(empty), Err(Error::MalformedGeometry { .. })));
    }
}
