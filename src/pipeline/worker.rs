// src/pipeline/worker.rs
//
// Two ways to drive one detector from several producers:
//   - `spawn_detector`: every stream goes through one channel, consumed
//     by a single blocking worker. Ticks never overlap.
//   - `SharedPipeline`: one lock around the detector, held for the whole
//     of each ingress call, including a full image tick.

use super::detector::DetectionPipeline;
use crate::error::DetectorResult;
use crate::types::{Frame, LightObservation, Pose, StopDecision, Waypoint};
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Clone)]
pub enum DetectorInput {
    Pose(Pose),
    Route(Vec<Waypoint>),
    Lights(Vec<LightObservation>),
    Image(Frame),
}

impl DetectionPipeline {
    /// Route one input to its ingress handler. Returns the published
    /// decision for image ticks that reached the debouncer.
    pub fn dispatch(&mut self, input: DetectorInput) -> Option<StopDecision> {
        match input {
            DetectorInput::Pose(pose) => {
                self.on_pose(pose);
                None
            }
            // Rejections are logged by the handlers; the stream carries on
            DetectorInput::Route(route) => {
                let _ = self.on_route(&route);
                None
            }
            DetectorInput::Lights(lights) => {
                let _ = self.on_lights(lights);
                None
            }
            DetectorInput::Image(frame) => self.on_image(frame),
        }
    }
}

// ============================================================================
// CHANNEL WORKER
// ============================================================================

#[derive(Debug, Clone)]
pub struct DetectorHandle {
    tx: mpsc::Sender<DetectorInput>,
}

impl DetectorHandle {
    pub async fn send(&self, input: DetectorInput) -> Result<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| anyhow!("Detector worker has stopped"))
    }

    pub async fn send_pose(&self, pose: Pose) -> Result<()> {
        self.send(DetectorInput::Pose(pose)).await
    }

    pub async fn send_route(&self, route: Vec<Waypoint>) -> Result<()> {
        self.send(DetectorInput::Route(route)).await
    }

    pub async fn send_lights(&self, lights: Vec<LightObservation>) -> Result<()> {
        self.send(DetectorInput::Lights(lights)).await
    }

    pub async fn send_image(&self, frame: Frame) -> Result<()> {
        self.send(DetectorInput::Image(frame)).await
    }
}

/// Start the worker. It runs until every handle is dropped, then hands
/// the detector back through the join handle.
pub fn spawn_detector(
    pipeline: DetectionPipeline,
    capacity: usize,
) -> (DetectorHandle, JoinHandle<DetectionPipeline>) {
    let (tx, mut rx) = mpsc::channel(capacity.max(1));

    let worker = tokio::task::spawn_blocking(move || {
        let mut pipeline = pipeline;
        let mut processed: u64 = 0;
        while let Some(input) = rx.blocking_recv() {
            pipeline.dispatch(input);
            processed += 1;
        }
        info!("Detector worker stopped after {} inputs", processed);
        pipeline
    });

    (DetectorHandle { tx }, worker)
}

// ============================================================================
// LOCKED HANDLE
// ============================================================================

#[derive(Clone)]
pub struct SharedPipeline {
    inner: Arc<Mutex<DetectionPipeline>>,
}

impl SharedPipeline {
    pub fn new(pipeline: DetectionPipeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    pub fn on_pose(&self, pose: Pose) {
        self.inner.lock().on_pose(pose);
    }

    pub fn on_route(&self, waypoints: &[Waypoint]) -> DetectorResult<bool> {
        self.inner.lock().on_route(waypoints)
    }

    pub fn on_lights(&self, lights: Vec<LightObservation>) -> DetectorResult<()> {
        self.inner.lock().on_lights(lights)
    }

    pub fn on_image(&self, frame: Frame) -> Option<StopDecision> {
        self.inner.lock().on_image(frame)
    }

    /// Run `f` with exclusive access to the detector.
    pub fn with<R>(&self, f: impl FnOnce(&mut DetectionPipeline) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{ManualClock, MonotonicClock};
    use crate::error::DetectorError;
    use crate::types::{Config, LightState};
    use std::thread;
    use std::time::Duration;
    use tokio::sync::watch;

    fn config() -> Config {
        serde_yaml::from_str(
            r#"
detector:
  min_frame_interval_secs: 0.0
stop_line_positions:
  - [120.0, 0.0]
"#,
        )
        .unwrap()
    }

    fn route() -> Vec<Waypoint> {
        let points: Vec<[f64; 2]> = (0..500).map(|i| [i as f64, 0.0]).collect();
        Waypoint::route_from_points(&points)
    }

    fn lights() -> Vec<LightObservation> {
        vec![LightObservation {
            light_index: 0,
            position: (120.0, 5.0),
        }]
    }

    fn frame() -> Frame {
        Frame {
            data: vec![0; 3],
            width: 1,
            height: 1,
            timestamp: 0.0,
        }
    }

    fn always_red(_: &Frame) -> DetectorResult<LightState> {
        Ok(LightState::Red)
    }

    #[tokio::test]
    async fn test_worker_serializes_streams() {
        let (tx, mut rx) = watch::channel(StopDecision::NONE);
        let pipeline = DetectionPipeline::new(&config(), always_red, MonotonicClock::new(), tx);
        let (handle, worker) = spawn_detector(pipeline, 16);

        handle.send_route(route()).await.unwrap();
        handle.send_lights(lights()).await.unwrap();
        handle.send_pose(Pose { x: 50.0, y: 0.0 }).await.unwrap();
        for _ in 0..3 {
            handle.send_image(frame()).await.unwrap();
        }

        drop(handle);
        let pipeline = worker.await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().wire_value(), 120);
        assert_eq!(pipeline.committed_state(), LightState::Red);
        assert_eq!(pipeline.metrics().summary().decisions_published, 3);
    }

    #[tokio::test]
    async fn test_worker_runs_until_last_handle_dropped() {
        let (tx, _rx) = watch::channel(StopDecision::NONE);
        let pipeline = DetectionPipeline::new(&config(), always_red, ManualClock::new(), tx);
        let (handle, worker) = spawn_detector(pipeline, 1);
        let sender = handle.clone();

        drop(handle);
        // One handle is still alive, so the worker keeps running
        sender.send_pose(Pose { x: 0.0, y: 0.0 }).await.unwrap();
        drop(sender);

        let pipeline = worker.await.unwrap();
        assert_eq!(pipeline.pose(), Some(Pose { x: 0.0, y: 0.0 }));
    }

    #[test]
    fn test_shared_pipeline_across_threads() {
        let (tx, rx) = watch::channel(StopDecision::NONE);
        let clock = ManualClock::new();
        let shared = SharedPipeline::new(DetectionPipeline::new(
            &config(),
            always_red,
            clock.clone(),
            tx,
        ));

        shared.on_route(&route()).unwrap();
        shared.on_lights(lights()).unwrap();
        shared.on_pose(Pose { x: 10.0, y: 0.0 });

        let poser = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    shared.on_pose(Pose {
                        x: 10.0 + (i % 50) as f64,
                        y: 0.0,
                    });
                }
            })
        };

        for _ in 0..10 {
            clock.advance(Duration::from_millis(10));
            assert!(shared.on_image(frame()).is_some());
        }
        poser.join().unwrap();

        // Every pose the other thread wrote is short of the stop line
        assert_eq!(rx.borrow().wire_value(), 120);
        assert_eq!(shared.with(|p| p.committed_state()), LightState::Red);
    }

    #[test]
    fn test_shared_pipeline_reports_errors() {
        let (tx, _rx) = watch::channel(StopDecision::NONE);
        let shared = SharedPipeline::new(DetectionPipeline::new(
            &config(),
            always_red,
            ManualClock::new(),
            tx,
        ));

        assert_eq!(shared.on_route(&[]), Err(DetectorError::EmptyRoute));
        assert!(shared.on_image(frame()).is_none());
    }
}
