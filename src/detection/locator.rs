// src/detection/locator.rs
//
// Finds the nearest stop line strictly ahead of the vehicle along the
// route, measured in waypoint ordinals. Ordinals are assumed to grow
// with progress along the route; a stop line behind the vehicle is
// never wrapped around to a "next lap".

use crate::error::DetectorResult;
use crate::routing::RouteProjector;
use crate::types::StopLinePosition;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCandidate {
    /// Waypoint closest to the light's stop line
    pub stop_waypoint: usize,
    pub light_index: usize,
    /// Waypoints between the vehicle and the stop line
    pub distance: usize,
}

pub struct TrafficLightLocator {
    horizon: usize,
}

impl TrafficLightLocator {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Nearest stop line ahead of `vehicle_ordinal` within the horizon.
    /// Fails only if the projector has no route yet.
    pub fn locate(
        &self,
        projector: &RouteProjector,
        vehicle_ordinal: usize,
        stop_lines: &[StopLinePosition],
    ) -> DetectorResult<Option<LightCandidate>> {
        let mut nearest: Option<LightCandidate> = None;

        for line in stop_lines {
            let stop_ordinal = projector.project(line.x, line.y)?;
            let delta = stop_ordinal as i64 - vehicle_ordinal as i64;
            if delta < 0 {
                continue;
            }

            let distance = delta as usize;
            // Strict comparison: on equal distance the first light listed wins
            if nearest.map_or(true, |best| distance < best.distance) {
                nearest = Some(LightCandidate {
                    stop_waypoint: stop_ordinal,
                    light_index: line.light_index,
                    distance,
                });
            }
        }

        match nearest {
            Some(candidate) if candidate.distance <= self.horizon => Ok(Some(candidate)),
            Some(candidate) => {
                debug!(
                    "Nearest light {} is {} waypoints ahead, beyond horizon {}",
                    candidate.light_index, candidate.distance, self.horizon
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
