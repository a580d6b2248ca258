//! Core id and geometry types for the transport engine
//!
//! Every entity in the road network is referenced by a plain integer id into
//! a dense arena. No component ever holds an owning pointer into the graph.

use std::fmt;

/// A wrapper type for intersection ids (dense arena index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub u32);

/// A wrapper type for road segment ids (dense arena index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

/// A wrapper type for lane ids (dense arena index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneId(pub u32);

/// A wrapper type for vehicle ids (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub u64);

/// A wrapper type for signal controller ids (dense arena index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub u32);

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A 2D position in the simulation plane (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Functional class of a road segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    City,
    Arterial,
    Highway,
}

/// Lifecycle state of a vehicle
///
/// `Spawned -> Moving -> {Waiting <-> Moving} -> Arrived`, with `Rerouting`
/// entered when the planned route becomes infeasible. `Arrived` is terminal;
/// the vehicle leaves the registry at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Spawned,
    Moving,
    Waiting,
    Rerouting,
    Arrived,
}
