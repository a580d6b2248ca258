//! Transport & traffic simulation engine
//!
//! The engine consumes a per-tick context (tick index, seeded RNG,
//! infrastructure decisions) and produces a `TrafficDelta`. All components
//! reference each other by integer id, all randomness flows through the
//! context, and every tick is bit-reproducible for a given seed and initial
//! state.

mod congestion;
mod fleet;
mod pathfinding;
mod road_graph;
mod route_planner;
pub mod scenario;
mod settings;
mod signal;
mod subsystem;
mod traffic_model;
mod types;

pub use congestion::{congestion_curve, CongestionModel};
pub use fleet::{AdvanceStats, FleetManager, RetryState, SpawnStats, Vehicle};
pub use pathfinding::{edge_cost, find_route, PathfindingError, Route};
pub use road_graph::{Intersection, Lane, LaneSpec, RoadGraph, RoadSegment};
pub use route_planner::RoutePlanner;
pub use settings::{RampBucket, Settings};
pub use signal::{Phase, SignalBank, SignalController, SignalInputs, SignalKind};
pub use subsystem::{InfrastructureDecision, TickContext, TrafficDelta, TransportSubsystem};
pub use traffic_model::{desired_speed, follow_step, safe_gap};
pub use types::{
    IntersectionId, LaneId, Position, RoadClass, SegmentId, SignalId, VehicleId, VehicleState,
};
