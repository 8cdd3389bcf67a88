// src/detection/classifier.rs
//
// The classifier is an opaque capability: frame in, light state out.
// Any `FnMut(&Frame) -> DetectorResult<LightState>` closure can stand in
// for it (scripted test doubles, remote models). `HsvLightClassifier`
// is the built-in baseline.

use crate::error::{DetectorError, DetectorResult};
use crate::types::{Frame, LightState};
use tracing::debug;

pub trait LightClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> DetectorResult<LightState>;
}

impl<F> LightClassifier for F
where
    F: FnMut(&Frame) -> DetectorResult<LightState> + Send,
{
    fn classify(&mut self, frame: &Frame) -> DetectorResult<LightState> {
        self(frame)
    }
}

// ============================================================================
// HSV CONVERSION
// ============================================================================

/// Convert RGB to HSV.
/// Returns (H: 0-360, S: 0-100, V: 0-255).
#[inline]
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let r_n = r / 255.0;
    let g_n = g / 255.0;
    let b_n = b / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r_n).abs() < 1e-6 {
        60.0 * (((g_n - b_n) / delta) % 6.0)
    } else if (max - g_n).abs() < 1e-6 {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 {
        0.0
    } else {
        (delta / max) * 100.0
    };

    (h, s, max * 255.0)
}

// ============================================================================
// BASELINE CLASSIFIER
// ============================================================================

/// Votes over lit, saturated pixels by hue band. A lit bulb is a small,
/// very bright, strongly saturated blob; everything else is ignored.
#[derive(Debug, Clone)]
pub struct HsvLightClassifier {
    /// Minimum saturation (0-100) for a pixel to vote
    pub min_saturation: f32,
    /// Minimum value (0-255) for a pixel to vote
    pub min_value: f32,
    /// Votes the winning band needs
    pub min_votes: u32,
    /// Share of all votes the winning band needs
    pub min_share: f32,
    /// Sample every n-th pixel in each direction
    pub stride: usize,
}

impl Default for HsvLightClassifier {
    fn default() -> Self {
        Self {
            min_saturation: 55.0,
            min_value: 180.0,
            min_votes: 12,
            min_share: 0.6,
            stride: 2,
        }
    }
}

impl HsvLightClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn band(&self, h: f32, s: f32, v: f32) -> Option<LightState> {
        if s < self.min_saturation || v < self.min_value {
            return None;
        }
        if h < 15.0 || h > 340.0 {
            Some(LightState::Red)
        } else if (35.0..=70.0).contains(&h) {
            Some(LightState::Yellow)
        } else if (85.0..=190.0).contains(&h) {
            Some(LightState::Green)
        } else {
            None
        }
    }
}

impl LightClassifier for HsvLightClassifier {
    fn classify(&mut self, frame: &Frame) -> DetectorResult<LightState> {
        if !frame.is_well_formed() {
            return Err(DetectorError::Classifier(format!(
                "malformed frame: {}x{} with {} bytes",
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }

        let step = self.stride.max(1);
        let mut votes = [0u32; 3];

        for y in (0..frame.height).step_by(step) {
            for x in (0..frame.width).step_by(step) {
                let idx = (y * frame.width + x) * 3;
                let (h, s, v) = rgb_to_hsv(
                    frame.data[idx] as f32,
                    frame.data[idx + 1] as f32,
                    frame.data[idx + 2] as f32,
                );
                match self.band(h, s, v) {
                    Some(LightState::Red) => votes[0] += 1,
                    Some(LightState::Yellow) => votes[1] += 1,
                    Some(LightState::Green) => votes[2] += 1,
                    _ => {}
                }
            }
        }

        let total: u32 = votes.iter().sum();
        let (winner, count) = [LightState::Red, LightState::Yellow, LightState::Green]
            .into_iter()
            .zip(votes)
            .max_by_key(|(_, count)| *count)
            .unwrap_or((LightState::Unknown, 0));

        debug!(
            "HSV votes red={} yellow={} green={} (frame t={:.3})",
            votes[0], votes[1], votes[2], frame.timestamp
        );

        if count < self.min_votes || (count as f32) < self.min_share * total as f32 {
            return Ok(LightState::Unknown);
        }
        Ok(winner)
    }
}
