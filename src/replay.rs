// src/replay.rs
//
// Recorded drive logs. A log is a YAML list of timestamped events
// (route, pose, lights, camera image). Replaying feeds them to a detector
// in time order while a `ManualClock` follows the recorded timestamps, so
// frame gating behaves as it did on the road.

use crate::detection::ManualClock;
use crate::pipeline::DetectionPipeline;
use crate::types::{Frame, LightObservation, Pose, StopDecision, Waypoint};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveLog {
    pub events: Vec<DriveEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveEvent {
    /// Seconds since the start of the recording
    pub t: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Route(Vec<[f64; 2]>),
    Pose([f64; 2]),
    Lights(Vec<[f64; 2]>),
    Image(ImageRef),
}

/// Raw RGB8 frame on disk, relative to the log file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub images: usize,
    pub published: usize,
    pub final_decision: StopDecision,
}

impl DriveLog {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read drive log {}", path.display()))?;
        let log: DriveLog = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse drive log {}", path.display()))?;
        log.validate()?;
        Ok(log)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, event) in self.events.iter().enumerate() {
            event_time(event).with_context(|| format!("Event {} is out of range", i))?;
        }
        Ok(())
    }

    /// Events in timestamp order; ties keep their recorded order.
    pub fn ordered(&self) -> Vec<&DriveEvent> {
        let mut events: Vec<&DriveEvent> = self.events.iter().collect();
        events.sort_by(|a, b| a.t.total_cmp(&b.t));
        events
    }
}

fn event_time(event: &DriveEvent) -> Result<Duration> {
    Duration::try_from_secs_f64(event.t)
        .map_err(|_| anyhow!("invalid timestamp {}", event.t))
}

fn load_frame(base_dir: &Path, image: &ImageRef, t: f64) -> Result<Frame> {
    let path = base_dir.join(&image.path);
    let data =
        fs::read(&path).with_context(|| format!("Failed to read frame {}", path.display()))?;
    Ok(Frame {
        data,
        width: image.width,
        height: image.height,
        timestamp: t,
    })
}

fn lights_from_points(points: &[[f64; 2]]) -> Vec<LightObservation> {
    points
        .iter()
        .enumerate()
        .map(|(light_index, p)| LightObservation {
            light_index,
            position: (p[0], p[1]),
        })
        .collect()
}

/// Feed every event of `log` to `pipeline`. `clock` must be the clock the
/// pipeline was built with.
pub fn replay(
    log: &DriveLog,
    base_dir: &Path,
    pipeline: &mut DetectionPipeline,
    clock: &ManualClock,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for event in log.ordered() {
        clock.set(event_time(event)?);
        summary.events += 1;

        match &event.kind {
            EventKind::Route(points) => {
                // An empty route is logged and skipped like any bad update
                let _ = pipeline.on_route(&Waypoint::route_from_points(points));
            }
            EventKind::Pose(p) => pipeline.on_pose(Pose { x: p[0], y: p[1] }),
            EventKind::Lights(points) => {
                let _ = pipeline.on_lights(lights_from_points(points));
            }
            EventKind::Image(image) => {
                summary.images += 1;
                let frame = load_frame(base_dir, image, event.t)?;
                if let Some(decision) = pipeline.on_image(frame) {
                    summary.published += 1;
                    debug!("t={:.2}s → stop waypoint {}", event.t, decision.wire_value());
                }
            }
        }
    }

    summary.final_decision = pipeline.last_decision();
    info!(
        "✓ Replay finished: {} events, {} images, {} decisions published",
        summary.events, summary.images, summary.published
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::HsvLightClassifier;
    use crate::pipeline::DecisionLog;
    use crate::types::Config;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tl_replay_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_frame(dir: &Path, name: &str, rgb: [u8; 3]) {
        let (w, h) = (16, 16);
        let mut data = vec![40u8; w * h * 3];
        for y in 0..8 {
            for x in 0..8 {
                let idx = (y * w + x) * 3;
                data[idx..idx + 3].copy_from_slice(&rgb);
            }
        }
        fs::write(dir.join(name), data).unwrap();
    }

    #[test]
    fn test_parse_event_kinds() {
        let log: DriveLog = serde_yaml::from_str(
            r#"
events:
  - t: 0.0
    route: [[0.0, 0.0], [1.0, 0.0]]
  - t: 0.1
    pose: [0.5, 0.0]
  - t: 0.2
    lights: [[1.0, 3.0]]
  - t: 0.3
    image: { path: a.rgb, width: 4, height: 2 }
"#,
        )
        .unwrap();

        assert_eq!(log.events.len(), 4);
        assert!(matches!(log.events[1].kind, EventKind::Pose([x, _]) if x == 0.5));
        assert!(matches!(&log.events[3].kind, EventKind::Image(img) if img.width == 4));
        assert!(log.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_timestamp() {
        let log: DriveLog =
            serde_yaml::from_str("events:\n  - t: -1.0\n    pose: [0.0, 0.0]\n").unwrap();
        assert!(log.validate().is_err());
    }

    #[test]
    fn test_timestamp_beyond_duration_range_is_an_error() {
        let log: DriveLog =
            serde_yaml::from_str("events:\n  - t: 1.0e30\n    pose: [0.0, 0.0]\n").unwrap();
        assert!(log.validate().is_err());

        let config: Config =
            serde_yaml::from_str("stop_line_positions:\n  - [0.0, 0.0]\n").unwrap();
        let clock = ManualClock::new();
        let mut pipeline = DetectionPipeline::new(
            &config,
            HsvLightClassifier::new(),
            clock.clone(),
            DecisionLog::new(4),
        );
        // Unvalidated logs are still refused cleanly
        assert!(replay(&log, Path::new("."), &mut pipeline, &clock).is_err());
        assert_eq!(pipeline.pose(), None);
    }

    #[test]
    fn test_events_are_replayed_in_time_order() {
        let log: DriveLog = serde_yaml::from_str(
            r#"
events:
  - t: 2.0
    pose: [3.0, 0.0]
  - t: 1.0
    pose: [2.0, 0.0]
  - t: 1.0
    pose: [1.0, 0.0]
"#,
        )
        .unwrap();

        let order: Vec<f64> = log
            .ordered()
            .iter()
            .map(|e| match e.kind {
                EventKind::Pose(p) => p[0],
                _ => -1.0,
            })
            .collect();
        assert_eq!(order, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_replay_red_light_approach() {
        let dir = scratch_dir("approach");
        write_frame(&dir, "red.rgb", [250, 30, 20]);

        let mut yaml = String::from(
            "events:\n  - t: 0.0\n    route: [",
        );
        let points: Vec<String> = (0..300).map(|i| format!("[{}.0, 0.0]", i)).collect();
        yaml.push_str(&points.join(", "));
        yaml.push_str("]\n  - t: 0.0\n    lights: [[120.0, 4.0]]\n  - t: 0.0\n    pose: [50.0, 0.0]\n");
        // 30 Hz camera for 2 seconds; only every 0.5 s gets through the gate
        for i in 0..60 {
            yaml.push_str(&format!(
                "  - t: {:.4}\n    image: {{ path: red.rgb, width: 16, height: 16 }}\n",
                i as f64 / 30.0
            ));
        }
        let log: DriveLog = serde_yaml::from_str(&yaml).unwrap();

        let config: Config =
            serde_yaml::from_str("stop_line_positions:\n  - [120.0, 4.0]\n").unwrap();
        let clock = ManualClock::new();
        let decisions = DecisionLog::new(16);
        let mut pipeline = DetectionPipeline::new(
            &config,
            HsvLightClassifier::new(),
            clock.clone(),
            decisions.clone(),
        );

        let summary = replay(&log, &dir, &mut pipeline, &clock).unwrap();
        assert_eq!(summary.images, 60);
        assert_eq!(summary.published, 4);
        assert_eq!(decisions.wire_values(), vec![-1, -1, 120, 120]);
        assert_eq!(summary.final_decision, StopDecision::stop_at(120));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_frame_file_is_an_error() {
        let dir = scratch_dir("missing");
        let log: DriveLog = serde_yaml::from_str(
            "events:\n  - t: 0.0\n    image: { path: nope.rgb, width: 1, height: 1 }\n",
        )
        .unwrap();
        let config: Config =
            serde_yaml::from_str("stop_line_positions:\n  - [0.0, 0.0]\n").unwrap();
        let clock = ManualClock::new();
        let mut pipeline =
            DetectionPipeline::new(&config, HsvLightClassifier::new(), clock.clone(), DecisionLog::new(4));

        assert!(replay(&log, &dir, &mut pipeline, &clock).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
