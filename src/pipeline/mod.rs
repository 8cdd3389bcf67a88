// src/pipeline/mod.rs

pub mod detector;
pub mod metrics;
pub mod publisher;
pub mod worker;

pub use detector::DetectionPipeline;
pub use metrics::{DetectorMetrics, MetricsSummary};
pub use publisher::{DecisionLog, DecisionSink, PublishedEntry};
pub use worker::{spawn_detector, DetectorHandle, DetectorInput, SharedPipeline};
