//! A* route search over the road network
//!
//! Edge cost is the segment length inflated by the current congestion index;
//! the heuristic is the straight-line distance to the goal, which stays
//! admissible because segment lengths are never shorter than the endpoint
//! distance. Open-set ties are broken by the lowest intersection id so path
//! selection is identical across platforms.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use anyhow::Result;
use ordered_float::OrderedFloat;

use super::congestion::CongestionModel;
use super::road_graph::RoadGraph;
use super::settings::Settings;
use super::types::{IntersectionId, SegmentId};

/// Recoverable pathfinding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathfindingError {
    /// The destination is unreachable from the origin in the current graph
    NoPathFound,
}

impl fmt::Display for PathfindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathfindingError::NoPathFound => write!(f, "no path found"),
        }
    }
}

impl std::error::Error for PathfindingError {}

/// A planned route: total cost and the ordered segment ids to traverse
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub cost: f32,
    pub segments: Vec<SegmentId>,
}

/// Congestion-weighted cost of traversing a segment
pub fn edge_cost(
    graph: &RoadGraph,
    congestion: &CongestionModel,
    segment: SegmentId,
    settings: &Settings,
) -> Result<f32> {
    let length = graph.segment(segment)?.length;
    Ok(length * (1.0 + settings.congestion_penalty_factor * congestion.segment(segment)))
}

/// Find the cheapest route between two intersections
///
/// `avoid` excludes a single segment from consideration, used when a vehicle
/// reroutes around a blocked entry. Both endpoints must already have been
/// validated against the graph by the caller.
pub fn find_route(
    graph: &RoadGraph,
    congestion: &CongestionModel,
    settings: &Settings,
    from: IntersectionId,
    to: IntersectionId,
    avoid: Option<SegmentId>,
) -> Result<Route, PathfindingError> {
    if from == to {
        return Ok(Route {
            cost: 0.0,
            segments: Vec::new(),
        });
    }

    let goal_pos = match graph.intersection(to) {
        Ok(i) => i.position,
        Err(_) => return Err(PathfindingError::NoPathFound),
    };
    if graph.intersection(from).is_err() {
        return Err(PathfindingError::NoPathFound);
    }

    // Min-heap keyed by (f-score, intersection id): equal f-scores pop the
    // lowest id first, never insertion order.
    let mut open: BinaryHeap<Reverse<(OrderedFloat<f32>, IntersectionId)>> = BinaryHeap::new();
    let mut g_score: HashMap<IntersectionId, f32> = HashMap::new();
    let mut came_from: HashMap<IntersectionId, (IntersectionId, SegmentId)> = HashMap::new();

    let start_h = graph
        .intersection(from)
        .map(|i| i.position.distance(&goal_pos))
        .unwrap_or(0.0);
    g_score.insert(from, 0.0);
    open.push(Reverse((OrderedFloat(start_h), from)));

    while let Some(Reverse((OrderedFloat(f), current))) = open.pop() {
        let g = g_score.get(&current).copied().unwrap_or(f32::INFINITY);
        let h = graph
            .intersection(current)
            .map(|i| i.position.distance(&goal_pos))
            .unwrap_or(0.0);
        // Stale heap entry from an earlier, worse g-score.
        if f > g + h + 1e-3 {
            continue;
        }

        if current == to {
            let mut segments = Vec::new();
            let mut node = to;
            while node != from {
                let (prev, segment) = came_from[&node];
                segments.push(segment);
                node = prev;
            }
            segments.reverse();
            return Ok(Route { cost: g, segments });
        }

        for (segment_id, target) in graph.outgoing(current) {
            if avoid == Some(segment_id) {
                continue;
            }
            let Ok(cost) = edge_cost(graph, congestion, segment_id, settings) else {
                continue;
            };
            let tentative = g + cost;
            let best = g_score.get(&target).copied().unwrap_or(f32::INFINITY);
            if tentative < best {
                g_score.insert(target, tentative);
                came_from.insert(target, (current, segment_id));
                let h = graph
                    .intersection(target)
                    .map(|i| i.position.distance(&goal_pos))
                    .unwrap_or(0.0);
                open.push(Reverse((OrderedFloat(tentative + h), target)));
            }
        }
    }

    Err(PathfindingError::NoPathFound)
}
