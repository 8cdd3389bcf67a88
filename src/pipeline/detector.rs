// src/pipeline/detector.rs
//
// Orchestrator. Owns all detector state and reacts to the four ingress
// streams. Only `on_image` computes anything; the other three overwrite
// stored state.
//
// Image tick order:
//   1. skip if the route index or the pose is missing (no publish)
//   2. skip if the frame gate is closed (no publish)
//   3. project vehicle and stop lines, locate the nearest light ahead
//   4. no light within horizon → debounce UNKNOWN with no candidate
//   5. otherwise classify the frame and debounce the result
//   6. publish the debouncer's output

use super::metrics::DetectorMetrics;
use super::publisher::DecisionSink;
use crate::detection::{
    Clock, FrameGate, LightClassifier, StateDebouncer, TrafficLightLocator,
};
use crate::error::{DetectorError, DetectorResult};
use crate::routing::RouteProjector;
use crate::types::{
    Config, Frame, LightObservation, LightState, Pose, StopDecision, StopLinePosition, Waypoint,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct DetectionPipeline {
    projector: RouteProjector,
    locator: TrafficLightLocator,
    gate: FrameGate,
    debouncer: StateDebouncer,

    classifier: Box<dyn LightClassifier>,
    clock: Box<dyn Clock>,
    publisher: Box<dyn DecisionSink>,

    stop_lines: Vec<StopLinePosition>,
    pose: Option<Pose>,
    lights: Vec<LightObservation>,
    camera_frame: Option<Frame>,
    last_classification: Option<LightState>,

    metrics: DetectorMetrics,
}

impl DetectionPipeline {
    /// `config` is expected to have passed `Config::validate`.
    pub fn new(
        config: &Config,
        classifier: impl LightClassifier + 'static,
        clock: impl Clock + 'static,
        publisher: impl DecisionSink + 'static,
    ) -> Self {
        info!(
            "Detector: frame interval={:.2}s, state threshold={}, lookahead={} waypoints, {} stop lines",
            config.detector.min_frame_interval_secs,
            config.detector.state_count_threshold,
            config.detector.lookahead_waypoints,
            config.stop_line_positions.len()
        );

        Self {
            projector: RouteProjector::new(),
            locator: TrafficLightLocator::new(config.detector.lookahead_waypoints),
            gate: FrameGate::new(config.min_frame_interval()),
            debouncer: StateDebouncer::new(config.detector.state_count_threshold),
            classifier: Box::new(classifier),
            clock: Box::new(clock),
            publisher: Box::new(publisher),
            stop_lines: config.stop_lines(),
            pose: None,
            lights: Vec::new(),
            camera_frame: None,
            last_classification: None,
            metrics: DetectorMetrics::new(),
        }
    }

    // ========================================================================
    // INGRESS
    // ========================================================================

    pub fn on_pose(&mut self, pose: Pose) {
        self.pose = Some(pose);
    }

    /// Builds the waypoint index on first delivery; later routes are ignored.
    pub fn on_route(&mut self, waypoints: &[Waypoint]) -> DetectorResult<bool> {
        self.projector.load_route(waypoints).map_err(|e| {
            warn!("⚠️  Route update rejected: {}", e);
            e
        })
    }

    /// Replaces the known light list. A list longer than the configured
    /// stop lines cannot be index-aligned and is rejected.
    pub fn on_lights(&mut self, lights: Vec<LightObservation>) -> DetectorResult<()> {
        if lights.len() > self.stop_lines.len() {
            let err = DetectorError::LightCountMismatch {
                lights: lights.len(),
                stop_lines: self.stop_lines.len(),
            };
            error!("✗ {}", err);
            return Err(err);
        }
        self.lights = lights;
        Ok(())
    }

    /// Runs one full tick. Returns the published decision, or `None` if the
    /// frame was skipped (not ready or gated) and nothing was published.
    pub fn on_image(&mut self, frame: Frame) -> Option<StopDecision> {
        self.metrics.inc(&self.metrics.images_received);
        let now = self.clock.now();

        match self.tick(frame, now) {
            Ok(Some(decision)) => {
                self.publisher.publish(decision);
                self.metrics.inc(&self.metrics.decisions_published);
                Some(decision)
            }
            Ok(None) => {
                self.metrics.inc(&self.metrics.skipped_gated);
                None
            }
            Err(e) => {
                debug!("Skipping frame: {}", e);
                self.metrics.inc(&self.metrics.skipped_not_ready);
                None
            }
        }
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// `Ok(None)` means the frame gate rejected the frame.
    fn tick(&mut self, frame: Frame, now: Duration) -> DetectorResult<Option<StopDecision>> {
        if !self.projector.is_ready() {
            return Err(DetectorError::NotReady("waypoint index not built"));
        }
        let pose = self
            .pose
            .ok_or(DetectorError::NotReady("vehicle pose unknown"))?;

        if !self.gate.accept(now) {
            return Ok(None);
        }

        let vehicle_ordinal = self.projector.project(pose.x, pose.y)?;
        // Only lights present in the latest ground-truth update are considered
        let active = &self.stop_lines[..self.lights.len()];
        let candidate = self.locator.locate(&self.projector, vehicle_ordinal, active)?;

        let (raw, stop_waypoint) = match candidate {
            None => {
                self.metrics.inc(&self.metrics.no_candidate);
                (LightState::Unknown, None)
            }
            Some(c) => {
                debug!(
                    "Light {} ahead at waypoint {} ({} waypoints from vehicle at {})",
                    c.light_index, c.stop_waypoint, c.distance, vehicle_ordinal
                );
                (self.classify(&frame), Some(c.stop_waypoint))
            }
        };
        self.camera_frame = Some(frame);

        let before = self.debouncer.committed_state();
        let decision = self.debouncer.observe(raw, stop_waypoint);
        if self.debouncer.committed_state() != before {
            self.metrics.inc(&self.metrics.state_commits);
        }

        Ok(Some(decision))
    }

    /// Classifier failures degrade to UNKNOWN for this tick only.
    fn classify(&mut self, frame: &Frame) -> LightState {
        let started = Instant::now();
        let result = self.classifier.classify(frame);
        self.metrics.set_timing(
            &self.metrics.classify_time_us,
            started.elapsed().as_micros() as u64,
        );

        let state = match result {
            Ok(state) => {
                self.metrics.inc(&self.metrics.classifications);
                state
            }
            Err(e) => {
                warn!("⚠️  Classification failed, treating as UNKNOWN: {}", e);
                self.metrics.inc(&self.metrics.classifier_failures);
                LightState::Unknown
            }
        };

        if self.last_classification != Some(state) {
            info!("Image classification: {}", state.as_str());
            self.last_classification = Some(state);
        }
        state
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn is_route_ready(&self) -> bool {
        self.projector.is_ready()
    }

    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn latest_frame(&self) -> Option<&Frame> {
        self.camera_frame.as_ref()
    }

    pub fn committed_state(&self) -> LightState {
        self.debouncer.committed_state()
    }

    pub fn last_decision(&self) -> StopDecision {
        self.debouncer.last_published()
    }

    pub fn metrics(&self) -> DetectorMetrics {
        self.metrics.clone()
    }
}
