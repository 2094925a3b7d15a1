//! Coordinates and the bits of geometry the adapters need.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl LatLng {
    /// Creates a coordinate pair.
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters.
    pub fn haversine_m(&self, other: &LatLng) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        2.0 * a.sqrt().asin() * EARTH_RADIUS_M
    }
}

/// Formats as `"lat,lon"`, the form the planning agent exchanges.
impl Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// The error returned when a `"lat,lon"` string cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseLatLngError(String);

impl Display for ParseLatLngError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid coordinates `{}`, expected `lat,lon`", self.0)
    }
}

impl std::error::Error for ParseLatLngError {}

impl FromStr for LatLng {
    type Err = ParseLatLngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLatLngError(s.to_owned());
        let (lat, lon) = s.split_once(',').ok_or_else(err)?;
        let lat: f64 = lat.trim().parse().map_err(|_| err())?;
        let lon: f64 = lon.trim().parse().map_err(|_| err())?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(err());
        }
        Ok(LatLng { lat, lon })
    }
}

/// Decodes an encoded polyline with precision 5, as produced by Google
/// Routes and OSRM.
///
/// Returns `None` if the string is truncated or contains characters
/// outside the encoding alphabet.
pub fn decode_polyline(encoded: &str) -> Option<Vec<LatLng>> {
    let bytes = encoded.as_bytes();
    let mut idx = 0;
    let mut lat = 0i64;
    let mut lon = 0i64;
    let mut points = Vec::new();

    while idx < bytes.len() {
        lat += next_delta(bytes, &mut idx)?;
        lon += next_delta(bytes, &mut idx)?;
        points.push(LatLng::new(lat as f64 / 1e5, lon as f64 / 1e5));
    }
    Some(points)
}

fn next_delta(bytes: &[u8], idx: &mut usize) -> Option<i64> {
    let mut result = 0i64;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*idx)?;
        if !(63..=126).contains(&byte) || shift > 60 {
            return None;
        }
        *idx += 1;
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Some(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}
