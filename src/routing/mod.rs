// src/routing/mod.rs

mod projector;
mod waypoint_index;

pub use projector::RouteProjector;
pub use waypoint_index::WaypointIndex;
