//! Great-circle helpers over `Coord`s in longitude (x) / latitude (y) degrees.

use geo::Coord;

use crate::error::{Error, Result};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn validate_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

fn checked(c: Coord) -> Result<Coord> {
    if validate_coordinates(c.y, c.x) {
        Ok(c)
    } else {
        Err(Error::InvalidCoordinate { lat: c.y, lon: c.x })
    }
}

/// Distance in metres between two positions.
pub fn haversine_distance(a: Coord, b: Coord) -> Result<f64> {
    let a = checked(a)?;
    let b = checked(b)?;

    let phi1 = a.y.to_radians();
    let phi2 = b.y.to_radians();
    let d_phi = (b.y - a.y).to_radians();
    let d_lambda = (b.x - a.x).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push near-antipodal pairs just past 1
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    Ok(EARTH_RADIUS_M * c)
}

/// Sum of the legs of an ordered path, in metres.
pub fn path_length(points: &[Coord]) -> Result<f64> {
    points
        .windows(2)
        .map(|leg| haversine_distance(leg[0], leg[1]))
        .sum()
}

/// Initial bearing from `a` to `b` in degrees, `[0, 360)`. Identical points
/// give 0.
pub fn bearing(a: Coord, b: Coord) -> f64 {
    if a == b {
        return 0.0;
    }

    let phi1 = a.y.to_radians();
    let phi2 = b.y.to_radians();
    let d_lambda = (b.x - a.x).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let degrees = y.atan2(x).to_degrees();
    let normalized = (degrees + 360.0) % 360.0;
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

pub fn format_distance(meters: f64) -> String {
    if meters < 0.0 {
        return "0 m".to_string();
    }
    if meters < 1000.0 {
        return format!("{} m", meters.round() as i64);
    }
    format!("{:.1} km", meters / 1000.0)
}

pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0 seconds".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    for (count, unit) in [(hours, "hour"), (minutes, "minute"), (secs, "second")] {
        match count {
            0 => {}
            1 => parts.push(format!("1 {}", unit)),
            n => parts.push(format!("{} {}s", n, unit)),
        }
    }
    parts.join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFormat {
    /// Decimal degrees with the given number of decimals.
    Decimal(usize),
    /// Degrees, minutes and whole seconds.
    Dms,
}

impl Default for CoordinateFormat {
    fn default() -> Self {
        CoordinateFormat::Decimal(4)
    }
}

pub fn format_coordinates(lat: f64, lon: f64, format: CoordinateFormat) -> String {
    let lat_dir = if lat >= 0.0 { 'N' } else { 'S' };
    let lon_dir = if lon >= 0.0 { 'E' } else { 'W' };

    match format {
        CoordinateFormat::Decimal(precision) => format!(
            "{:.*}°{}, {:.*}°{}",
            precision,
            lat.abs(),
            lat_dir,
            precision,
            lon.abs(),
            lon_dir
        ),
        CoordinateFormat::Dms => format!(
            "{}{}, {}{}",
            to_dms(lat.abs()),
            lat_dir,
            to_dms(lon.abs()),
            lon_dir
        ),
    }
}

fn to_dms(decimal: f64) -> String {
    let degrees = decimal.floor();
    let minutes_decimal = (decimal - degrees) * 60.0;
    let minutes = minutes_decimal.floor();
    let seconds = ((minutes_decimal - minutes) * 60.0).round();
    format!("{}°{}'{}\"", degrees, minutes, seconds)
}
