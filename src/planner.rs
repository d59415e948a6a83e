//! Charge-route planner core.
//!
//! Walks a leg's decoded geometry against the buffered range, places a
//! charging stop at the last reachable point when the range runs out, and
//! replans from that stop until the destination is reachable or no station
//! can be found.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PlanError;
use crate::haversine::distance_miles;
use crate::range::{self, CHARGE_TARGET_PERCENT};
use crate::traits::{DirectionsProvider, GeoPoint, StationCandidate, StationLocator};

const KM_PER_MILE: f64 = 1.609344;

/// Fraction of the locator's coverage distance that must be re-traversed
/// backward before a fallback search is worth issuing. Keeps successive
/// search boxes overlapping so no gap in coverage opens up.
const FALLBACK_OVERLAP: f64 = 0.8;

/// A trip to be planned.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PlanRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Waypoints to pass through, in order. May be empty.
    #[serde(default)]
    pub intermediates: Vec<GeoPoint>,
    /// Range available on the current charge, in miles.
    pub current_range_miles: f64,
    /// State of charge as a percentage in (0, 100].
    pub soc: f64,
}

/// Planner tuning knobs.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Fraction of range held back as a safety margin, in [0, 1).
    pub buffer_percent: f64,
    /// An intermediate waypoint counts as reached when a scanned geometry
    /// point comes within this many miles of it.
    pub waypoint_reach_miles: f64,
    /// Coverage distance of one station search, in km. Drives how far the
    /// backward fallback walks between searches.
    pub station_search_radius_km: f64,
    /// Maximum geometry points walked backward during the fallback search.
    /// Configurable because point spacing varies by directions provider.
    pub fallback_scan_limit: usize,
    /// Upper bound on charging stops before the plan is abandoned.
    pub max_charging_stops: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            buffer_percent: 0.30,
            waypoint_reach_miles: 1.0,
            station_search_radius_km: 14.0,
            fallback_scan_limit: 300,
            max_charging_stops: 20,
        }
    }
}

/// A charging stop inserted into the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargingStop {
    pub location: GeoPoint,
    pub station_name: String,
    /// Great-circle distance from the route point where the search was
    /// issued to the station itself.
    pub distance_from_route_point_miles: f64,
    pub station_id: Option<i64>,
    pub battery_percent_on_arrival: f64,
    pub battery_percent_after_charging: f64,
    /// Raw provider payload for the chosen station.
    pub raw_station: serde_json::Value,
    /// Raw payloads for every candidate returned by the search, nearest
    /// first, retained for downstream display.
    pub all_stations_at_search: Vec<serde_json::Value>,
}

/// Kind of a point in the visualization trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePointKind {
    Origin,
    Intermediate,
    ChargingStation,
    Destination,
}

/// One point of the sequential visualization trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoutePoint {
    pub location: GeoPoint,
    pub kind: RoutePointKind,
}

/// Outcome of a planning request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    pub reachable_without_charging: bool,
    /// Road distance of the first leg as reported by the provider.
    pub total_route_distance_miles: f64,
    pub remaining_range_miles: f64,
    pub final_soc_at_destination: Option<f64>,
    pub stops: Vec<ChargingStop>,
    /// Origin, waypoints, stations, and destination in traversal order.
    pub route_sequence: Vec<RoutePoint>,
    /// Encoded geometry of the first leg, passed through for display.
    pub encoded_polyline: String,
}

/// What a single geometry scan decided.
enum ScanOutcome {
    /// The whole geometry fits within the effective range.
    Completed { reached: Vec<GeoPoint> },
    /// Accumulated distance exceeded the effective range; charging is
    /// needed at the last reachable point.
    RangeExceeded {
        last_reachable: usize,
        reached: Vec<GeoPoint>,
    },
}

/// Plans charge routes against a directions provider and station locator.
#[derive(Debug, Clone)]
pub struct Planner<D, S> {
    directions: D,
    stations: S,
    options: PlanOptions,
}

impl<D, S> Planner<D, S>
where
    D: DirectionsProvider,
    S: StationLocator,
{
    pub fn new(directions: D, stations: S) -> Self {
        Self::with_options(directions, stations, PlanOptions::default())
    }

    pub fn with_options(directions: D, stations: S, options: PlanOptions) -> Self {
        Self {
            directions,
            stations,
            options,
        }
    }

    pub fn directions(&self) -> &D {
        &self.directions
    }

    pub fn stations(&self) -> &S {
        &self.stations
    }

    /// Computes a feasible trip plan, inserting charging stops as needed.
    ///
    /// Returns `Ok` with `reachable_without_charging == false` when no
    /// station can be found; route-acquisition failures are errors.
    pub fn plan(&self, request: &PlanRequest) -> Result<PlanResult, PlanError> {
        self.validate(request)?;

        // Full range is derived once from the request and stays fixed
        // across legs; post-charge range is always a fraction of it.
        let full_range = range::full_range(request.current_range_miles, request.soc);

        let mut current_range = request.current_range_miles;
        let mut origin = request.origin;
        let mut pending = request.intermediates.clone();

        let mut result = PlanResult {
            reachable_without_charging: false,
            total_route_distance_miles: 0.0,
            remaining_range_miles: 0.0,
            final_soc_at_destination: None,
            stops: Vec::new(),
            route_sequence: vec![RoutePoint {
                location: request.origin,
                kind: RoutePointKind::Origin,
            }],
            encoded_polyline: String::new(),
        };

        loop {
            let leg = self
                .directions
                .route(origin, request.destination, &pending)?;
            debug!(
                distance_miles = leg.distance_miles,
                points = leg.path.points().len(),
                stops = result.stops.len(),
                "fetched route leg"
            );

            if result.stops.is_empty() {
                result.total_route_distance_miles = leg.distance_miles;
                result.encoded_polyline = leg.encoded_polyline.clone();
            }

            let effective = range::effective_range(current_range, self.options.buffer_percent);

            // Fast path: the whole leg fits within the buffered range.
            // Reported remaining range and SOC use the actual range.
            if effective >= leg.distance_miles {
                result.reachable_without_charging = true;
                result.remaining_range_miles = current_range - leg.distance_miles;
                result.final_soc_at_destination =
                    Some(range::final_soc(current_range, leg.distance_miles, full_range));
                Self::flush_intermediates(&mut result, pending.drain(..));
                Self::push_trace(&mut result, request.destination, RoutePointKind::Destination);
                return Ok(result);
            }

            let path = leg.path.points();
            match self.scan_leg(path, effective, &mut pending) {
                ScanOutcome::Completed { reached } => {
                    // The geometry summed shorter than the reported road
                    // distance and fit after all.
                    result.reachable_without_charging = true;
                    Self::flush_intermediates(&mut result, reached);
                    Self::flush_intermediates(&mut result, pending.drain(..));
                    Self::push_trace(&mut result, request.destination, RoutePointKind::Destination);
                    return Ok(result);
                }
                ScanOutcome::RangeExceeded {
                    last_reachable,
                    reached,
                } => {
                    Self::flush_intermediates(&mut result, reached);

                    let search_point = path[last_reachable];
                    // Re-derive the distance actually travelled to the
                    // search point; the scan accumulator overshot it.
                    let distance_to_station: f64 = path
                        .windows(2)
                        .take(last_reachable)
                        .map(|pair| distance_miles(pair[0], pair[1]))
                        .sum();
                    let battery_on_arrival =
                        range::final_soc(current_range, distance_to_station, full_range);

                    let found = match self.locate(search_point) {
                        candidates if !candidates.is_empty() => Some((search_point, candidates)),
                        _ => self.fallback_search(path, last_reachable),
                    };

                    let Some((searched_at, candidates)) = found else {
                        // Not fatal: report the trip as unreachable, with
                        // the trace completed through the destination.
                        warn!(
                            latitude = search_point.latitude,
                            longitude = search_point.longitude,
                            "no charging station found, trip unreachable"
                        );
                        result.reachable_without_charging = false;
                        result.remaining_range_miles = 0.0;
                        Self::push_trace(
                            &mut result,
                            request.destination,
                            RoutePointKind::Destination,
                        );
                        return Ok(result);
                    };

                    let nearest = &candidates[0];
                    let stop = ChargingStop {
                        location: nearest.location,
                        station_name: nearest.name.clone(),
                        distance_from_route_point_miles: distance_miles(
                            searched_at,
                            nearest.location,
                        ),
                        station_id: nearest.station_id,
                        battery_percent_on_arrival: battery_on_arrival,
                        battery_percent_after_charging: CHARGE_TARGET_PERCENT,
                        raw_station: nearest.raw.clone(),
                        all_stations_at_search: candidates
                            .iter()
                            .map(|candidate| candidate.raw.clone())
                            .collect(),
                    };
                    info!(
                        station = %stop.station_name,
                        battery_percent_on_arrival = stop.battery_percent_on_arrival,
                        "placed charging stop"
                    );

                    origin = stop.location;
                    Self::push_trace(&mut result, stop.location, RoutePointKind::ChargingStation);
                    result.stops.push(stop);

                    if result.stops.len() > self.options.max_charging_stops {
                        return Err(PlanError::StopLimitExceeded(self.options.max_charging_stops));
                    }

                    // Next leg starts at the station with a 90% charge.
                    current_range = range::post_charge_range(full_range);
                }
            }
        }
    }

    fn validate(&self, request: &PlanRequest) -> Result<(), PlanError> {
        if !(request.soc > 0.0 && request.soc <= 100.0) {
            return Err(PlanError::InvalidInput(format!(
                "soc must be in (0, 100], got {}",
                request.soc
            )));
        }
        if !(request.current_range_miles > 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "current_range_miles must be positive, got {}",
                request.current_range_miles
            )));
        }
        if !(0.0..1.0).contains(&self.options.buffer_percent) {
            return Err(PlanError::InvalidInput(format!(
                "buffer_percent must be in [0, 1), got {}",
                self.options.buffer_percent
            )));
        }
        Ok(())
    }

    /// Walks the geometry pairwise, accumulating distance against the
    /// effective range and matching pending waypoints along the way.
    ///
    /// Matched waypoints are moved out of `pending`; the set is rebuilt
    /// each step rather than mutated mid-iteration.
    fn scan_leg(
        &self,
        path: &[GeoPoint],
        effective_range: f64,
        pending: &mut Vec<GeoPoint>,
    ) -> ScanOutcome {
        let mut accumulated = 0.0;
        let mut last_reachable = 0;
        let mut reached = Vec::new();

        for i in 1..path.len() {
            accumulated += distance_miles(path[i - 1], path[i]);
            if accumulated > effective_range {
                return ScanOutcome::RangeExceeded {
                    last_reachable,
                    reached,
                };
            }
            last_reachable = i;

            let (hit, still_pending): (Vec<_>, Vec<_>) = pending.drain(..).partition(|waypoint| {
                distance_miles(path[i], *waypoint) <= self.options.waypoint_reach_miles
            });
            for waypoint in &hit {
                debug!(
                    latitude = waypoint.latitude,
                    longitude = waypoint.longitude,
                    "reached intermediate stop"
                );
            }
            reached.extend(hit);
            *pending = still_pending;
        }

        ScanOutcome::Completed { reached }
    }

    /// Issues a station search, absorbing transport failures into "no
    /// candidates".
    fn locate(&self, point: GeoPoint) -> Vec<StationCandidate> {
        match self.stations.stations_near(point) {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(
                    latitude = point.latitude,
                    longitude = point.longitude,
                    %error,
                    "station search failed, treating as no candidates"
                );
                Vec::new()
            }
        }
    }

    /// Walks backward from the search point re-issuing searches.
    ///
    /// Searches only start once enough backward distance has accumulated
    /// that the new search box no longer sits inside the previous one,
    /// and the walk is capped at `fallback_scan_limit` points.
    fn fallback_search(
        &self,
        path: &[GeoPoint],
        last_reachable: usize,
    ) -> Option<(GeoPoint, Vec<StationCandidate>)> {
        let min_step_km = self.options.station_search_radius_km * FALLBACK_OVERLAP;
        let floor = last_reachable.saturating_sub(self.options.fallback_scan_limit);
        let mut accumulated_km = 0.0;

        for j in (floor..last_reachable).rev() {
            accumulated_km += distance_miles(path[j], path[j + 1]) * KM_PER_MILE;
            if accumulated_km < min_step_km {
                continue;
            }
            let candidates = self.locate(path[j]);
            if !candidates.is_empty() {
                return Some((path[j], candidates));
            }
        }

        None
    }

    fn flush_intermediates(result: &mut PlanResult, points: impl IntoIterator<Item = GeoPoint>) {
        for point in points {
            Self::push_trace(result, point, RoutePointKind::Intermediate);
        }
    }

    fn push_trace(result: &mut PlanResult, location: GeoPoint, kind: RoutePointKind) {
        result.route_sequence.push(RoutePoint { location, kind });
    }
}
