// src/lib.rs

pub mod config;
pub mod detection;
pub mod error;
pub mod pipeline;
pub mod replay;
pub mod routing;
pub mod types;

pub use error::{DetectorError, DetectorResult};
pub use pipeline::DetectionPipeline;
pub use types::{Config, LightState, StopDecision};
