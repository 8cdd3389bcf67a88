// src/routing/projector.rs

use super::waypoint_index::WaypointIndex;
use crate::error::{DetectorError, DetectorResult};
use crate::types::{Waypoint, MAX_WIRE_ORDINAL};
use tracing::{debug, info};

/// Maps absolute positions onto route ordinals, giving a 1-D
/// "distance along route" proxy.
#[derive(Debug, Default)]
pub struct RouteProjector {
    index: Option<WaypointIndex>,
}

impl RouteProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index on first delivery of a non-empty route.
    /// Returns `Ok(true)` if built, `Ok(false)` if an index already exists.
    pub fn load_route(&mut self, waypoints: &[Waypoint]) -> DetectorResult<bool> {
        if self.index.is_some() {
            debug!("Route re-delivered, waypoint index already built");
            return Ok(false);
        }

        check_route_len(waypoints.len())?;
        let index = WaypointIndex::build(waypoints)?;
        info!("✓ Waypoint index built over {} waypoints", index.len());
        self.index = Some(index);
        Ok(true)
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    pub fn route_len(&self) -> usize {
        self.index.as_ref().map(WaypointIndex::len).unwrap_or(0)
    }

    pub fn project(&self, x: f64, y: f64) -> DetectorResult<usize> {
        self.index
            .as_ref()
            .map(|index| index.nearest(x, y))
            .ok_or(DetectorError::NotReady("waypoint index not built"))
    }
}

/// Every ordinal must survive the egress encoding.
fn check_route_len(len: usize) -> DetectorResult<()> {
    if len > MAX_WIRE_ORDINAL + 1 {
        return Err(DetectorError::RouteTooLong(len));
    }
    Ok(())
}
