// src/types.rs

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Stop line for each known light, index-aligned with the ground-truth light list
    pub stop_line_positions: Vec<[f64; 2]>,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_min_frame_interval_secs")]
    pub min_frame_interval_secs: f64,
    #[serde(default = "default_state_count_threshold")]
    pub state_count_threshold: u32,
    #[serde(default = "default_lookahead_waypoints")]
    pub lookahead_waypoints: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_frame_interval_secs: default_min_frame_interval_secs(),
            state_count_threshold: default_state_count_threshold(),
            lookahead_waypoints: default_lookahead_waypoints(),
        }
    }
}

fn default_min_frame_interval_secs() -> f64 {
    0.5
}

fn default_state_count_threshold() -> u32 {
    3
}

fn default_lookahead_waypoints() -> usize {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// ROUTE & POSE
// ============================================================================

/// A fixed point on the route. `index` is its position in the route sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

impl Waypoint {
    /// Build an ordered route from raw coordinates, numbering waypoints by position.
    pub fn route_from_points(points: &[[f64; 2]]) -> Vec<Waypoint> {
        points
            .iter()
            .enumerate()
            .map(|(index, p)| Waypoint {
                index,
                x: p[0],
                y: p[1],
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLinePosition {
    pub light_index: usize,
    pub x: f64,
    pub y: f64,
}

impl StopLinePosition {
    pub fn from_config(positions: &[[f64; 2]]) -> Vec<StopLinePosition> {
        positions
            .iter()
            .enumerate()
            .map(|(light_index, p)| StopLinePosition {
                light_index,
                x: p[0],
                y: p[1],
            })
            .collect()
    }
}

/// One ground-truth traffic light. Only its presence (and index) matters here;
/// color always comes from the camera classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightObservation {
    pub light_index: usize,
    pub position: (f64, f64),
}

// ============================================================================
// CLASSIFICATION & DECISION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightState {
    Red,
    Yellow,
    Green,
    Unknown,
}

impl LightState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightState::Red => "RED",
            LightState::Yellow => "YELLOW",
            LightState::Green => "GREEN",
            LightState::Unknown => "UNKNOWN",
        }
    }
}

/// The sole externally visible output: where to stop, if anywhere.
/// Highest ordinal the egress encoding can carry.
pub const MAX_WIRE_ORDINAL: usize = i32::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StopDecision {
    pub stop_waypoint: Option<usize>,
}

impl StopDecision {
    pub const NONE: StopDecision = StopDecision {
        stop_waypoint: None,
    };

    pub fn stop_at(waypoint: usize) -> Self {
        Self {
            stop_waypoint: Some(waypoint),
        }
    }

    /// Egress encoding: -1 means "no red light ahead to stop for".
    /// Routes are capped at `MAX_WIRE_ORDINAL`, so every real stop fits.
    pub fn wire_value(&self) -> i32 {
        match self.stop_waypoint {
            None => -1,
            Some(wp) => i32::try_from(wp).unwrap_or_else(|_| {
                warn!("⚠️  Stop waypoint {} does not fit the egress encoding", wp);
                -1
            }),
        }
    }
}

// ============================================================================
// CAMERA
// ============================================================================

/// Raw RGB8 camera frame, row-major, 3 bytes per pixel.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp: f64,
}

impl Frame {
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self
                .width
                .checked_mul(self.height)
                .and_then(|n| n.checked_mul(3))
                == Some(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_value_encoding() {
        assert_eq!(StopDecision::NONE.wire_value(), -1);
        assert_eq!(StopDecision::stop_at(120).wire_value(), 120);
        assert_eq!(StopDecision::default(), StopDecision::NONE);
        assert_eq!(
            StopDecision::stop_at(MAX_WIRE_ORDINAL).wire_value(),
            i32::MAX
        );
    }

    #[test]
    fn test_route_numbering_follows_order() {
        let route = Waypoint::route_from_points(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.5]]);
        assert_eq!(route.len(), 3);
        assert_eq!(route[2].index, 2);
        assert_eq!(route[2].y, 0.5);
    }

    #[test]
    fn test_frame_shape_check() {
        let frame = Frame {
            data: vec![0; 2 * 2 * 3],
            width: 2,
            height: 2,
            timestamp: 0.0,
        };
        assert!(frame.is_well_formed());

        let short = Frame {
            data: vec![0; 5],
            ..frame
        };
        assert!(!short.is_well_formed());

        let huge = Frame {
            data: vec![0; 3],
            width: usize::MAX / 2,
            height: 4,
            timestamp: 0.0,
        };
        assert!(!huge.is_well_formed());
    }
}
