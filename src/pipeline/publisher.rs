// src/pipeline/publisher.rs
//
// Egress for stop decisions. The detector publishes every tick that
// reaches the debouncer; sinks decide what to keep.

use crate::types::StopDecision;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

pub trait DecisionSink: Send {
    fn publish(&mut self, decision: StopDecision);
}

/// Latest-value channel: a late subscriber only ever sees the newest decision.
impl DecisionSink for watch::Sender<StopDecision> {
    fn publish(&mut self, decision: StopDecision) {
        self.send_replace(decision);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedEntry {
    pub seq: u64,
    pub decision: StopDecision,
}

/// Bounded history of published decisions. Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct DecisionLog {
    inner: Arc<Mutex<LogBuffer>>,
}

#[derive(Debug)]
struct LogBuffer {
    entries: VecDeque<PublishedEntry>,
    capacity: usize,
    next_seq: u64,
    dropped: u64,
}

impl DecisionLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(LogBuffer {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                next_seq: 0,
                dropped: 0,
            })),
        }
    }

    pub fn latest(&self) -> Option<PublishedEntry> {
        self.inner.lock().entries.back().copied()
    }

    pub fn drain(&self) -> Vec<PublishedEntry> {
        self.inner.lock().entries.drain(..).collect()
    }

    /// Wire values of the retained history, oldest first
    pub fn wire_values(&self) -> Vec<i32> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|e| e.decision.wire_value())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of decisions ever published, including evicted ones
    pub fn total_published(&self) -> u64 {
        self.inner.lock().next_seq
    }

    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

impl DecisionSink for DecisionLog {
    fn publish(&mut self, decision: StopDecision) {
        let mut buf = self.inner.lock();
        if buf.entries.len() >= buf.capacity {
            if buf.dropped == 0 {
                warn!(
                    "Decision log full ({} entries), dropping oldest",
                    buf.capacity
                );
            }
            buf.entries.pop_front();
            buf.dropped += 1;
        }
        let seq = buf.next_seq;
        buf.next_seq += 1;
        buf.entries.push_back(PublishedEntry { seq, decision });
    }
}
