// src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// Route index or pose not available yet; the tick is skipped.
    #[error("Detector not ready: {0}")]
    NotReady(&'static str),

    #[error("Cannot build a waypoint index from an empty route")]
    EmptyRoute,

    #[error("Route has {0} waypoints, more than stop waypoints can address")]
    RouteTooLong(usize),

    #[error("Classifier failure: {0}")]
    Classifier(String),

    #[error("Light update has {lights} lights but only {stop_lines} stop lines are configured")]
    LightCountMismatch { lights: usize, stop_lines: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type DetectorResult<T> = std::result::Result<T, DetectorError>;
