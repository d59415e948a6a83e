//! ChargePoint map API station locator adapter.

use serde_json::{Value, json};
use tracing::debug;

use crate::error::PlanError;
use crate::traits::{GeoPoint, StationCandidate, StationLocator};

/// Kilometres per degree of latitude.
const KM_PER_DEG_LAT: f64 = 110.574;
/// Kilometres per degree of longitude at the equator.
const KM_PER_DEG_LON: f64 = 111.320;

#[derive(Debug, Clone)]
pub struct ChargePointConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    /// Half-width of the search bounding box in km.
    pub half_width_km: f64,
    pub page_size: u32,
}

impl ChargePointConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout_secs: 10,
            half_width_km: 7.0,
            page_size: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChargePointClient {
    config: ChargePointConfig,
    client: reqwest::blocking::Client,
}

impl ChargePointClient {
    pub fn new(config: ChargePointConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Bounding box corners (ne_lat, ne_lon, sw_lat, sw_lon) around a point.
    fn bounding_box(&self, point: GeoPoint) -> (f64, f64, f64, f64) {
        let d_lat = self.config.half_width_km / KM_PER_DEG_LAT;
        let d_lon = self.config.half_width_km
            / (KM_PER_DEG_LON * point.latitude.to_radians().cos());
        (
            point.latitude + d_lat,
            point.longitude + d_lon,
            point.latitude - d_lat,
            point.longitude - d_lon,
        )
    }
}

impl StationLocator for ChargePointClient {
    fn stations_near(&self, point: GeoPoint) -> Result<Vec<StationCandidate>, PlanError> {
        let (ne_lat, ne_lon, sw_lat, sw_lon) = self.bounding_box(point);

        // Payload mirrors the map client's own search request, filtered to
        // available DC fast chargers and ranked by distance.
        let payload = json!({
            "station_list": {
                "screen_width": 417.5,
                "screen_height": 548,
                "ne_lat": ne_lat,
                "ne_lon": ne_lon,
                "sw_lat": sw_lat,
                "sw_lon": sw_lon,
                "page_size": self.config.page_size,
                "page_offset": "",
                "sort_by": "distance",
                "reference_lat": point.latitude,
                "reference_lon": point.longitude,
                "include_map_bound": true,
                "filter": {
                    "status_available": true,
                    "dc_fast_charging": true,
                },
                "bound_output": true,
            }
        });

        let body: Value = self
            .client
            .post(&self.config.api_url)
            .header("accept", "*/*")
            .header("accept-language", "en-GB")
            .json(&payload)
            .send()?
            .error_for_status()?
            .json()?;

        let stations = body
            .pointer("/station_list/stations")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!(
            latitude = point.latitude,
            longitude = point.longitude,
            candidates = stations.len(),
            "station search completed"
        );

        Ok(stations.into_iter().filter_map(parse_station).collect())
    }
}

/// Parses one raw station object, tolerating the provider's field aliases.
///
/// Entries without usable coordinates are dropped; the raw payload is kept
/// verbatim on the candidate.
fn parse_station(raw: Value) -> Option<StationCandidate> {
    let latitude = field_f64(&raw, &["lat", "latitude"])?;
    let longitude = field_f64(&raw, &["lon", "longitude"])?;
    let name = ["name", "station_name", "name1"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .unwrap_or("ChargePoint Station")
        .to_string();
    let station_id = raw.get("device_id").and_then(Value::as_i64);

    Some(StationCandidate {
        location: GeoPoint::new(latitude, longitude),
        name,
        station_id,
        raw,
    })
}

fn field_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_uses_latitude_scaled_longitude() {
        let client = ChargePointClient::new(ChargePointConfig::new("http://example.test"))
            .expect("client");
        let (ne_lat, ne_lon, sw_lat, sw_lon) =
            client.bounding_box(GeoPoint::new(45.0, -120.0));

        let d_lat = 7.0 / KM_PER_DEG_LAT;
        let d_lon = 7.0 / (KM_PER_DEG_LON * 45.0_f64.to_radians().cos());
        assert!((ne_lat - (45.0 + d_lat)).abs() < 1e-12);
        assert!((sw_lat - (45.0 - d_lat)).abs() < 1e-12);
        assert!((ne_lon - (-120.0 + d_lon)).abs() < 1e-12);
        assert!((sw_lon - (-120.0 - d_lon)).abs() < 1e-12);
        // Longitude degrees shrink with latitude, so the box is wider in
        // degrees than the latitude span.
        assert!(d_lon > d_lat);
    }

    #[test]
    fn test_parses_station_with_aliased_fields() {
        let raw = json!({
            "latitude": 36.1,
            "longitude": -115.2,
            "station_name": "Downtown Garage",
            "device_id": 4242,
            "ports": [{"level": "dc_fast"}]
        });
        let candidate = parse_station(raw.clone()).expect("candidate");
        assert_eq!(candidate.location, GeoPoint::new(36.1, -115.2));
        assert_eq!(candidate.name, "Downtown Garage");
        assert_eq!(candidate.station_id, Some(4242));
        assert_eq!(candidate.raw, raw);
    }

    #[test]
    fn test_station_without_coordinates_is_dropped() {
        assert!(parse_station(json!({"name": "mystery"})).is_none());
    }

    #[test]
    fn test_station_without_name_gets_default() {
        let candidate = parse_station(json!({"lat": 1.0, "lon": 2.0})).expect("candidate");
        assert_eq!(candidate.name, "ChargePoint Station");
        assert_eq!(candidate.station_id, None);
    }
}
