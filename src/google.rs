//! Google Routes API directions adapter.

use serde::Deserialize;
use serde_json::json;

use crate::error::PlanError;
use crate::polyline::Polyline;
use crate::traits::{DirectionsProvider, GeoPoint, RouteLeg};

const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Clone)]
pub struct GoogleRoutesConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl GoogleRoutesConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://routes.googleapis.com".to_string(),
            api_key: api_key.into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleRoutesClient {
    config: GoogleRoutesConfig,
    client: reqwest::blocking::Client,
}

impl GoogleRoutesClient {
    pub fn new(config: GoogleRoutesConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl DirectionsProvider for GoogleRoutesClient {
    fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        intermediates: &[GeoPoint],
    ) -> Result<RouteLeg, PlanError> {
        let mut payload = json!({
            "origin": waypoint(origin),
            "destination": waypoint(destination),
            "travelMode": "DRIVE",
            "routingPreference": "TRAFFIC_AWARE_OPTIMAL",
        });
        if !intermediates.is_empty() {
            payload["intermediates"] =
                intermediates.iter().map(|point| waypoint(*point)).collect();
        }

        let url = format!("{}/directions/v2:computeRoutes", self.config.base_url);
        let response: RoutesResponse = self
            .client
            .post(url)
            .header("X-Goog-Api-Key", &self.config.api_key)
            .header(
                "X-Goog-FieldMask",
                "routes.distanceMeters,routes.polyline.encodedPolyline",
            )
            .json(&payload)
            .send()?
            .error_for_status()?
            .json()?;

        let route = response
            .routes
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| {
                PlanError::NoRouteAvailable("directions response contained no routes".to_string())
            })?;

        let encoded = route
            .polyline
            .and_then(|polyline| polyline.encoded_polyline)
            .unwrap_or_default();
        let path = Polyline::decode(&encoded)?;

        Ok(RouteLeg {
            distance_miles: route.distance_meters.unwrap_or(0.0) / METERS_PER_MILE,
            encoded_polyline: encoded,
            path,
        })
    }
}

fn waypoint(point: GeoPoint) -> serde_json::Value {
    json!({
        "location": {
            "latLng": {
                "latitude": point.latitude,
                "longitude": point.longitude,
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    routes: Option<Vec<RouteEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteEntry {
    distance_meters: Option<f64>,
    polyline: Option<PolylinePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolylinePayload {
    encoded_polyline: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waypoint_shape_matches_routes_api() {
        let value = waypoint(GeoPoint::new(36.17, -115.14));
        assert_eq!(value["location"]["latLng"]["latitude"], 36.17);
        assert_eq!(value["location"]["latLng"]["longitude"], -115.14);
    }

    #[test]
    fn test_response_parses_nested_polyline() {
        let body = r#"{
            "routes": [{
                "distanceMeters": 160934.4,
                "polyline": {"encodedPolyline": "_p~iF~ps|U_ulLnnqC"}
            }]
        }"#;
        let parsed: RoutesResponse = serde_json::from_str(body).unwrap();
        let route = parsed.routes.unwrap().remove(0);
        assert_eq!(route.distance_meters, Some(160934.4));
        assert_eq!(
            route.polyline.unwrap().encoded_polyline.as_deref(),
            Some("_p~iF~ps|U_ulLnnqC")
        );
    }
}
