//! Polyline representation and decoding for route geometries.
//!
//! Directions providers ship geometry in Google's encoded polyline format:
//! delta-coded coordinates at 1e5 precision, zig-zag signed, emitted five
//! bits at a time with a continuation bit. Decoding happens at the provider
//! boundary; the planner core only ever sees decoded points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::GeoPoint;

/// Coordinate scale used by the encoding.
const PRECISION: f64 = 1e5;

/// The byte stream ended while a varint still had its continuation bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed route geometry: input truncated at byte {offset}")]
pub struct MalformedPolyline {
    pub offset: usize,
}

/// A route geometry as a decoded coordinate sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<GeoPoint>,
}

impl Polyline {
    /// Creates a Polyline from already-decoded points.
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// Decodes an encoded polyline string.
    ///
    /// An empty string decodes to an empty polyline.
    pub fn decode(encoded: &str) -> Result<Self, MalformedPolyline> {
        let bytes = encoded.as_bytes();
        let mut index = 0;
        let mut lat: i64 = 0;
        let mut lng: i64 = 0;
        let mut points = Vec::new();

        while index < bytes.len() {
            lat += next_delta(bytes, &mut index)?;
            lng += next_delta(bytes, &mut index)?;
            points.push(GeoPoint::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
        }

        Ok(Self { points })
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Consumes the polyline and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }
}

/// Reads one zig-zag varint starting at `*index` and advances past it.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, MalformedPolyline> {
    let mut shift = 0u32;
    let mut result: i64 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(MalformedPolyline { offset: *index });
        };
        *index += 1;

        let chunk = i64::from(byte) - 63;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    if result & 1 != 0 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test-only encoder; the crate never needs to produce geometry, but
    /// round-tripping keeps the decoder honest.
    fn encode(points: &[GeoPoint]) -> String {
        let mut out = String::new();
        let mut prev_lat = 0i64;
        let mut prev_lng = 0i64;

        for point in points {
            let lat = (point.latitude * PRECISION).round() as i64;
            let lng = (point.longitude * PRECISION).round() as i64;
            encode_value(lat - prev_lat, &mut out);
            encode_value(lng - prev_lng, &mut out);
            prev_lat = lat;
            prev_lng = lng;
        }

        out
    }

    fn encode_value(value: i64, out: &mut String) {
        let mut v = if value < 0 { !(value << 1) } else { value << 1 };
        while v >= 0x20 {
            out.push(((0x20 | (v & 0x1f)) + 63) as u8 as char);
            v >>= 5;
        }
        out.push((v + 63) as u8 as char);
    }

    #[test]
    fn test_decodes_reference_string() {
        // Reference example from the polyline algorithm documentation.
        let polyline = Polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = vec![
            GeoPoint::new(38.5, -120.2),
            GeoPoint::new(40.7, -120.95),
            GeoPoint::new(43.252, -126.453),
        ];
        assert_eq!(polyline.points(), &expected[..]);
    }

    #[test]
    fn test_empty_string_decodes_to_empty_polyline() {
        let polyline = Polyline::decode("").unwrap();
        assert!(polyline.points().is_empty());
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        // "_p~iF" alone ends mid-pair; chopping inside a varint ends with
        // the continuation bit still set.
        let err = Polyline::decode("_p~i").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(Polyline::decode("_p~iF~ps").is_err());
    }

    #[test]
    fn test_round_trips_through_encoder() {
        let points = vec![
            GeoPoint::new(38.5, -120.2),
            GeoPoint::new(40.7, -120.95),
            GeoPoint::new(43.252, -126.453),
            GeoPoint::new(-1.00345, 36.99999),
        ];
        let decoded = Polyline::decode(&encode(&points)).unwrap();
        for (got, want) in decoded.points().iter().zip(&points) {
            assert!((got.latitude - want.latitude).abs() < 1e-5);
            assert!((got.longitude - want.longitude).abs() < 1e-5);
        }
    }

    #[test]
    fn test_into_points_returns_owned_sequence() {
        let points = vec![GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)];
        let polyline = Polyline::new(points.clone());
        assert_eq!(polyline.into_points(), points);
    }
}
