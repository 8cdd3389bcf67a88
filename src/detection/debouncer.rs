// src/detection/debouncer.rs
//
// Hysteresis filter over raw classifications. A new stop/go decision is
// committed only after the same raw state has been seen for `threshold`
// consecutive accepted frames; until then the last committed decision is
// republished unchanged.

use crate::types::{LightState, StopDecision};
use tracing::info;

pub struct StateDebouncer {
    threshold: u32,
    committed_state: LightState,
    /// `None` until the first observation
    pending_state: Option<LightState>,
    pending_count: u32,
    last_published: StopDecision,
}

impl StateDebouncer {
    /// `threshold` below 1 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            committed_state: LightState::Unknown,
            pending_state: None,
            pending_count: 0,
            last_published: StopDecision::NONE,
        }
    }

    /// Feed one accepted classification and get the decision to publish.
    pub fn observe(&mut self, raw: LightState, candidate: Option<usize>) -> StopDecision {
        if self.pending_state != Some(raw) {
            self.pending_state = Some(raw);
            self.pending_count = 1;
        } else {
            self.pending_count = self.pending_count.saturating_add(1);
        }

        if self.pending_count >= self.threshold {
            self.commit(raw, candidate);
        }

        self.last_published
    }

    fn commit(&mut self, state: LightState, candidate: Option<usize>) {
        if self.committed_state != state {
            info!(
                "🚦 Light state committed: {} → {} after {} frames",
                self.committed_state.as_str(),
                state.as_str(),
                self.pending_count
            );
        }

        self.committed_state = state;
        self.last_published = if state == LightState::Red {
            StopDecision {
                stop_waypoint: candidate,
            }
        } else {
            StopDecision::NONE
        };
    }

    pub fn committed_state(&self) -> LightState {
        self.committed_state
    }

    pub fn pending(&self) -> Option<(LightState, u32)> {
        self.pending_state.map(|s| (s, self.pending_count))
    }

    pub fn last_published(&self) -> StopDecision {
        self.last_published
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
