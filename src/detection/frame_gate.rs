// src/detection/frame_gate.rs
//
// Fixed-minimum-interval rate limiter in front of the classifier.
// Rejected frames are dropped, never queued.

use std::time::Duration;

pub struct FrameGate {
    min_interval: Duration,
    /// `None` until the first frame is accepted
    last_accepted: Option<Duration>,
    accepted: u64,
    rejected: u64,
}

impl FrameGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Accept the frame arriving at `now` if at least `min_interval`
    /// has passed since the last accepted one.
    pub fn accept(&mut self, now: Duration) -> bool {
        let open = match self.last_accepted {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.min_interval,
        };

        if open {
            self.last_accepted = Some(now);
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
        open
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_accepted(&self) -> Option<Duration> {
        self.last_accepted
    }

    /// (accepted, rejected) frame counts
    pub fn counts(&self) -> (u64, u64) {
        (self.accepted, self.rejected)
    }
}
