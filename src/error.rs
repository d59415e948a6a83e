//! Planner error taxonomy.

use thiserror::Error;

use crate::polyline::MalformedPolyline;

#[derive(Debug, Error)]
pub enum PlanError {
    /// Request violated an input constraint (SOC, range, buffer).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Route geometry could not be decoded.
    #[error(transparent)]
    MalformedGeometry(#[from] MalformedPolyline),

    /// The directions provider returned no usable route. Fatal for the
    /// whole plan, whichever leg it occurs on.
    #[error("no route available: {0}")]
    NoRouteAvailable(String),

    /// The leg loop hit the configured stop cap without reaching the
    /// destination.
    #[error("charging stop limit exceeded after {0} stops")]
    StopLimitExceeded(usize),

    /// Transport-level failure talking to a provider.
    #[error("provider request failed")]
    Provider(#[from] reqwest::Error),
}
