//! Route planning with epoch-validated caching
//!
//! Cached routes are keyed by (origin, destination) and stamped with the
//! congestion epoch they were computed under. The epoch advances when the
//! graph topology changes or when the congestion model reports a material
//! shift, so noise below the materiality threshold never thrashes the cache.

use std::collections::HashMap;

use log::debug;

use super::congestion::CongestionModel;
use super::pathfinding::{find_route, PathfindingError, Route};
use super::road_graph::RoadGraph;
use super::settings::Settings;
use super::types::{IntersectionId, SegmentId};

#[derive(Default)]
pub struct RoutePlanner {
    cache: HashMap<(IntersectionId, IntersectionId), (u64, Route)>,
    epoch: u64,
    /// Last graph topology version folded into the epoch
    seen_topology: u64,
}

impl RoutePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current congestion epoch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Fold a topology change into the epoch, dropping stale cache entries
    pub fn note_topology(&mut self, graph: &RoadGraph) {
        if graph.topology_version() != self.seen_topology {
            self.seen_topology = graph.topology_version();
            self.bump_epoch("topology change");
        }
    }

    /// Fold a material congestion shift into the epoch
    pub fn note_congestion_shift(&mut self) {
        self.bump_epoch("material congestion shift");
    }

    fn bump_epoch(&mut self, reason: &str) {
        self.epoch += 1;
        self.cache.clear();
        debug!("route cache epoch -> {} ({reason})", self.epoch);
    }

    /// Plan a route, serving from cache when the epoch still matches
    pub fn plan(
        &mut self,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        settings: &Settings,
        from: IntersectionId,
        to: IntersectionId,
    ) -> Result<Route, PathfindingError> {
        if let Some((epoch, route)) = self.cache.get(&(from, to)) {
            if *epoch == self.epoch {
                return Ok(route.clone());
            }
        }

        let route = find_route(graph, congestion, settings, from, to, None)?;
        self.cache.insert((from, to), (self.epoch, route.clone()));
        Ok(route)
    }

    /// Plan around a blocked segment; never cached, since the avoidance is
    /// specific to one vehicle's situation
    pub fn plan_avoiding(
        &mut self,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        settings: &Settings,
        from: IntersectionId,
        to: IntersectionId,
        avoid: Option<SegmentId>,
    ) -> Result<Route, PathfindingError> {
        find_route(graph, congestion, settings, from, to, avoid)
    }

    /// Number of cached routes still valid for the current epoch
    pub fn cached_routes(&self) -> usize {
        self.cache
            .values()
            .filter(|(epoch, _)| *epoch == self.epoch)
            .count()
    }
}
