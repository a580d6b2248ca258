//! Road network graph: intersections, segments, and lanes
//!
//! Entities live in dense, id-indexed arenas; adjacency is kept in a petgraph
//! directed graph whose edge weights are segment ids. Bidirectional roads are
//! modeled as two directed segments. Mutation is only legal between ticks
//! (initialization or infrastructure decisions); every mutation bumps a
//! topology version that the route planner watches.

use anyhow::{bail, Context, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::types::{IntersectionId, LaneId, Position, RoadClass, SegmentId, SignalId};

/// A network intersection
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    pub position: Position,
    /// Controller reference, by id; `None` for unsignalized intersections
    pub signal: Option<SignalId>,
}

/// A directed road segment between two intersections
#[derive(Debug, Clone)]
pub struct RoadSegment {
    pub id: SegmentId,
    pub from: IntersectionId,
    pub to: IntersectionId,
    /// Ordered lane ids belonging to this segment
    pub lanes: Vec<LaneId>,
    /// Length in meters; at least the Euclidean endpoint distance
    pub length: f32,
    pub class: RoadClass,
}

/// A single traffic lane of a segment
#[derive(Debug, Clone)]
pub struct Lane {
    pub id: LaneId,
    pub segment: SegmentId,
    /// Speed limit in m/s
    pub speed_limit: f32,
    /// Maximum concurrent vehicles on this lane
    pub capacity: u32,
}

/// Per-lane parameters supplied when adding a segment
#[derive(Debug, Clone, Copy)]
pub struct LaneSpec {
    pub speed_limit: f32,
    pub capacity: u32,
}

/// The road network
///
/// Arenas are tombstoned on removal so ids stay stable for the lifetime of a
/// run; a query against a removed or never-assigned id fails with an
/// `unknown ... id` error, which callers treat as fatal for the tick.
#[derive(Default)]
pub struct RoadGraph {
    intersections: Vec<Option<Intersection>>,
    segments: Vec<Option<RoadSegment>>,
    lanes: Vec<Option<Lane>>,

    /// Adjacency: node weights are intersection ids, edge weights segment ids
    graph: DiGraph<IntersectionId, SegmentId>,
    /// Intersection id -> petgraph node index (dense, parallel to the arena)
    node_of: Vec<NodeIndex>,

    /// Bumped on every mutation; watched by the route planner
    topology_version: u64,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an intersection and return its id
    pub fn add_intersection(&mut self, position: Position) -> IntersectionId {
        let id = IntersectionId(self.intersections.len() as u32);
        let node = self.graph.add_node(id);
        self.node_of.push(node);
        self.intersections.push(Some(Intersection {
            id,
            position,
            signal: None,
        }));
        self.topology_version += 1;
        id
    }

    /// Add a directed segment with the given lanes
    ///
    /// Fails with `UnknownId` when either endpoint does not exist. The
    /// segment length is the Euclidean distance between the endpoints, so the
    /// straight-line pathfinding heuristic stays admissible.
    pub fn add_segment(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        class: RoadClass,
        lane_specs: &[LaneSpec],
    ) -> Result<SegmentId> {
        let from_pos = self.intersection(from)?.position;
        let to_pos = self.intersection(to)?.position;
        if lane_specs.is_empty() {
            bail!("segment {from} -> {to} must have at least one lane");
        }

        let id = SegmentId(self.segments.len() as u32);
        let mut lanes = Vec::with_capacity(lane_specs.len());
        for spec in lane_specs {
            let lane_id = LaneId(self.lanes.len() as u32);
            self.lanes.push(Some(Lane {
                id: lane_id,
                segment: id,
                speed_limit: spec.speed_limit,
                capacity: spec.capacity,
            }));
            lanes.push(lane_id);
        }

        self.segments.push(Some(RoadSegment {
            id,
            from,
            to,
            lanes,
            length: from_pos.distance(&to_pos).max(1.0),
            class,
        }));
        self.graph
            .add_edge(self.node_of[from.0 as usize], self.node_of[to.0 as usize], id);
        self.topology_version += 1;
        Ok(id)
    }

    /// Remove a segment (incident or infrastructure decision)
    ///
    /// Returns the removed segment so the caller can reconcile vehicles that
    /// referenced it. Its lanes are tombstoned along with it.
    pub fn remove_segment(&mut self, id: SegmentId) -> Result<RoadSegment> {
        let segment = self
            .segments
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .with_context(|| format!("unknown segment id {id}"))?;

        for lane in &segment.lanes {
            if let Some(slot) = self.lanes.get_mut(lane.0 as usize) {
                *slot = None;
            }
        }

        // Edge indices shift on removal, so locate the edge by its weight.
        let from_node = self.node_of[segment.from.0 as usize];
        let edge = self
            .graph
            .edges(from_node)
            .find(|e| *e.weight() == id)
            .map(|e| e.id());
        if let Some(edge) = edge {
            self.graph.remove_edge(edge);
        }

        self.topology_version += 1;
        Ok(segment)
    }

    /// Raise the capacity of every lane of a segment by `extra_per_lane`
    pub fn upgrade_capacity(&mut self, id: SegmentId, extra_per_lane: u32) -> Result<()> {
        let lane_ids = self.segment(id)?.lanes.clone();
        for lane_id in lane_ids {
            if let Some(Some(lane)) = self.lanes.get_mut(lane_id.0 as usize) {
                lane.capacity += extra_per_lane;
            }
        }
        self.topology_version += 1;
        Ok(())
    }

    /// Attach a signal controller reference to an intersection
    pub fn attach_signal(&mut self, intersection: IntersectionId, signal: SignalId) -> Result<()> {
        let slot = self
            .intersections
            .get_mut(intersection.0 as usize)
            .and_then(Option::as_mut)
            .with_context(|| format!("unknown intersection id {intersection}"))?;
        slot.signal = Some(signal);
        Ok(())
    }

    pub fn intersection(&self, id: IntersectionId) -> Result<&Intersection> {
        self.intersections
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .with_context(|| format!("unknown intersection id {id}"))
    }

    pub fn segment(&self, id: SegmentId) -> Result<&RoadSegment> {
        self.segments
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .with_context(|| format!("unknown segment id {id}"))
    }

    pub fn lane(&self, id: LaneId) -> Result<&Lane> {
        self.lanes
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .with_context(|| format!("unknown lane id {id}"))
    }

    /// Outgoing segment ids of an intersection, sorted for stable iteration
    pub fn neighbors(&self, id: IntersectionId) -> Result<Vec<SegmentId>> {
        // Validate the id before touching the node table.
        self.intersection(id)?;
        let node = self.node_of[id.0 as usize];
        let mut out: Vec<SegmentId> = self.graph.edges(node).map(|e| *e.weight()).collect();
        out.sort_unstable();
        Ok(out)
    }

    /// Total vehicle capacity across a segment's lanes
    pub fn segment_capacity(&self, id: SegmentId) -> Result<u32> {
        let segment = self.segment(id)?;
        let mut total = 0;
        for lane in &segment.lanes {
            total += self.lane(*lane)?.capacity;
        }
        Ok(total)
    }

    /// All live intersection ids, ascending
    pub fn intersection_ids(&self) -> Vec<IntersectionId> {
        self.intersections
            .iter()
            .flatten()
            .map(|i| i.id)
            .collect()
    }

    /// All live segment ids, ascending
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.segments.iter().flatten().map(|s| s.id).collect()
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections.iter().flatten().count()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.iter().flatten().count()
    }

    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    /// Iterate outgoing (segment, target intersection) pairs for pathfinding
    pub(crate) fn outgoing(
        &self,
        id: IntersectionId,
    ) -> impl Iterator<Item = (SegmentId, IntersectionId)> + '_ {
        let node = self.node_of[id.0 as usize];
        self.graph
            .edges(node)
            .map(move |e| (*e.weight(), self.graph[e.target()]))
    }
}
