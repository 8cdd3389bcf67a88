// src/detection/mod.rs

mod classifier;
mod clock;
mod debouncer;
mod frame_gate;
mod locator;

// Re-export public APIs
pub use classifier::{rgb_to_hsv, HsvLightClassifier, LightClassifier};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use debouncer::StateDebouncer;
pub use frame_gate::FrameGate;
pub use locator::{LightCandidate, TrafficLightLocator};
