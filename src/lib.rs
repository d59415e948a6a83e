//! ev-charge-planner core
//!
//! Range-constrained EV trip planning: decide whether a destination is
//! reachable on the current charge and, when it is not, insert charging
//! stops along the route until it is.

pub mod traits;
pub mod planner;
pub mod error;
pub mod google;
pub mod chargepoint;
pub mod haversine;
pub mod polyline;
pub mod range;
