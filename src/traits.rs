//! Provider contracts for the charge planner.
//!
//! The planner core is written against these two seams so the external
//! routing and station services can be swapped (or mocked) freely.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::polyline::Polyline;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One routed origin-to-destination segment as returned by a
/// [`DirectionsProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    /// Road distance of the leg in miles.
    pub distance_miles: f64,
    /// The provider's encoded polyline, passed through for display.
    pub encoded_polyline: String,
    /// Decoded route geometry.
    pub path: Polyline,
}

/// A charging station returned by a [`StationLocator`] search.
///
/// The raw provider payload is kept as an opaque JSON tree; its shape is
/// provider-defined and only passed through for display.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCandidate {
    pub location: GeoPoint,
    pub name: String,
    pub station_id: Option<i64>,
    pub raw: serde_json::Value,
}

/// Supplies route geometry and distance between points.
pub trait DirectionsProvider {
    /// Route from `origin` to `destination` through `intermediates` in order.
    ///
    /// A provider that cannot produce a usable route must fail with
    /// [`PlanError::NoRouteAvailable`]; transport failures surface as
    /// [`PlanError::Provider`]. Both abort the plan.
    fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        intermediates: &[GeoPoint],
    ) -> Result<RouteLeg, PlanError>;
}

/// Supplies candidate charging stations near a point, nearest first.
pub trait StationLocator {
    /// Candidates within the locator's coverage area around `point`.
    ///
    /// An empty list means no station; errors are absorbed by the planner
    /// and treated the same way.
    fn stations_near(&self, point: GeoPoint) -> Result<Vec<StationCandidate>, PlanError>;
}
