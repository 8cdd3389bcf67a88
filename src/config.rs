use crate::error::DetectorError;
use crate::types::{Config, StopLinePosition};
use anyhow::{Context, Result};
use std::fs;
use std::time::Duration;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup-time checks. A malformed config is fatal, never a runtime condition.
    pub fn validate(&self) -> Result<(), DetectorError> {
        let interval = self.detector.min_frame_interval_secs;
        if Duration::try_from_secs_f64(interval).is_err() {
            return Err(DetectorError::InvalidConfig(format!(
                "min_frame_interval_secs must be a non-negative duration, got {}",
                interval
            )));
        }
        if self.detector.state_count_threshold == 0 {
            return Err(DetectorError::InvalidConfig(
                "state_count_threshold must be at least 1".to_string(),
            ));
        }
        if self.stop_line_positions.is_empty() {
            return Err(DetectorError::InvalidConfig(
                "stop_line_positions is empty".to_string(),
            ));
        }
        if let Some(i) = self
            .stop_line_positions
            .iter()
            .position(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(DetectorError::InvalidConfig(format!(
                "stop line {} has a non-finite coordinate",
                i
            )));
        }
        Ok(())
    }

    /// Out-of-range values saturate; `validate` rejects them up front.
    pub fn min_frame_interval(&self) -> Duration {
        let secs = self.detector.min_frame_interval_secs;
        Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }

    pub fn stop_lines(&self) -> Vec<StopLinePosition> {
        StopLinePosition::from_config(&self.stop_line_positions)
    }
}
