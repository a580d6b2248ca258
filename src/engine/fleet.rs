//! Vehicle registry, spawning, and the per-tick movement pass
//!
//! The fleet manager owns every vehicle exclusively; other components refer
//! to vehicles by id only. The movement pass reads an immutable snapshot of
//! the tick-start state and writes each vehicle's next state into a separate
//! buffer that is swapped in at the end, so per-vehicle update order never
//! changes the outcome. Vehicles are always processed in ascending id order.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;

use anyhow::{Context, Result};
use log::warn;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::Rng;

use super::congestion::CongestionModel;
use super::road_graph::{RoadGraph, RoadSegment};
use super::route_planner::RoutePlanner;
use super::settings::Settings;
use super::signal::{SignalBank, SignalInputs};
use super::traffic_model::{desired_speed, follow_step};
use super::types::{IntersectionId, LaneId, SegmentId, VehicleId, VehicleState};

/// Re-route retry bookkeeping for a stranded vehicle
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    pub attempts: u32,
    /// Current backoff in ticks; doubles on every failed attempt
    pub backoff: u64,
    pub next_attempt: u64,
}

/// A vehicle in the network
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub destination: IntersectionId,
    /// Ordered segment ids; `route_index` points at the segment being driven
    pub route: Vec<SegmentId>,
    pub route_index: usize,
    pub lane: LaneId,
    /// Meters from the start of the current segment
    pub position: f32,
    pub speed: f32,
    pub state: VehicleState,
    /// Present while the vehicle is waiting on a bounded replan schedule
    pub retry: Option<RetryState>,
    /// Segment to route around on the next replan (blocked entry)
    pub avoid: Option<SegmentId>,
    pub spawned_tick: u64,
}

impl Vehicle {
    pub fn current_segment(&self) -> SegmentId {
        self.route[self.route_index]
    }

    fn at_route_end(&self) -> bool {
        self.route_index + 1 >= self.route.len()
    }
}

/// Queued spawn that could not be placed yet (capacity overflow defers to
/// the next tick rather than rejecting)
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpawnRequest {
    pub origin: IntersectionId,
    pub destination: IntersectionId,
}

/// Counters produced by the movement pass
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvanceStats {
    pub arrived: u32,
    pub failed_routes: u32,
    pub rerouted: u32,
}

/// Counters produced by the spawn pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnStats {
    pub spawned: u32,
    pub failed_spawns: u32,
    pub deferred: u32,
}

/// Immutable tick-start view of the fleet used by the movement pass
struct Snapshot {
    /// Per lane: vehicles ordered by (position, id), value is their speed
    lane_order: BTreeMap<LaneId, BTreeMap<(OrderedFloat<f32>, VehicleId), f32>>,
    /// Vehicles per segment
    segment_count: BTreeMap<SegmentId, u32>,
}

/// What lies ahead of a vehicle at its current segment's end
enum Boundary {
    /// Final segment of the route; the vehicle exits at the end
    RouteEnd,
    /// Next segment reachable this tick
    Open(SegmentId),
    /// Signal forbids the movement
    Red,
    /// Next segment is at capacity
    Blocked(SegmentId),
}

#[derive(Default)]
pub struct FleetManager {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    next_id: u64,
    deferred: VecDeque<SpawnRequest>,
}

impl FleetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vehicles still in the registry, including ones that arrived last tick
    /// and have not been reaped yet
    pub fn registry_len(&self) -> usize {
        self.vehicles.len()
    }

    /// Vehicles that are still traveling (everything but `Arrived`)
    pub fn live_count(&self) -> usize {
        self.vehicles
            .values()
            .filter(|v| v.state != VehicleState::Arrived)
            .count()
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Per-segment occupancy derived from the registry (never cached across
    /// ticks, so counters cannot drift)
    pub fn segment_occupancy(&self) -> BTreeMap<SegmentId, u32> {
        let mut counts: BTreeMap<SegmentId, u32> = BTreeMap::new();
        for vehicle in self.vehicles.values() {
            if vehicle.state == VehicleState::Arrived {
                continue;
            }
            *counts.entry(vehicle.current_segment()).or_default() += 1;
        }
        counts
    }

    /// Aggregates consumed by signal controllers on the next tick
    pub fn signal_inputs(&self, graph: &RoadGraph) -> Result<SignalInputs> {
        let mut inputs = SignalInputs::default();
        for vehicle in self.vehicles.values() {
            // A queue is the held vehicle at the line plus the standing
            // vehicles stacked behind it.
            let queued = match vehicle.state {
                VehicleState::Waiting => true,
                VehicleState::Moving => vehicle.speed < 0.5,
                _ => false,
            };
            if queued {
                *inputs
                    .queue_by_segment
                    .entry(vehicle.current_segment())
                    .or_default() += 1;
            }
        }
        for (segment, count) in self.segment_occupancy() {
            let capacity = graph.segment_capacity(segment)?.max(1);
            inputs
                .occupancy_ratio
                .insert(segment, count as f32 / capacity as f32);
        }
        Ok(inputs)
    }

    /// Average speed across traveling vehicles; zero when the network is empty
    pub fn average_speed(&self) -> f32 {
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for vehicle in self.vehicles.values() {
            if vehicle.state != VehicleState::Arrived {
                sum += vehicle.speed;
                count += 1;
            }
        }
        if count > 0 {
            sum / count as f32
        } else {
            0.0
        }
    }

    pub fn waiting_count(&self) -> usize {
        self.vehicles
            .values()
            .filter(|v| v.state == VehicleState::Waiting)
            .count()
    }

    /// React to a removed segment: vehicles on it are despawned (counted as
    /// failed routes by the caller), vehicles routed through it downstream
    /// are flagged for re-routing. Returns (despawned, flagged).
    pub fn handle_segment_removed(&mut self, removed: SegmentId) -> (u32, u32) {
        let mut despawned = 0u32;
        let mut flagged = 0u32;

        self.vehicles.retain(|_, v| {
            if v.state != VehicleState::Arrived && v.current_segment() == removed {
                despawned += 1;
                false
            } else {
                true
            }
        });

        for vehicle in self.vehicles.values_mut() {
            if vehicle.state == VehicleState::Arrived {
                continue;
            }
            if vehicle.route[vehicle.route_index + 1..].contains(&removed) {
                vehicle.state = VehicleState::Rerouting;
                vehicle.avoid = None;
                flagged += 1;
            }
        }
        (despawned, flagged)
    }

    /// The per-tick movement pass (step 3 of the tick)
    #[allow(clippy::too_many_arguments)]
    pub fn advance(
        &mut self,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        signals: &SignalBank,
        planner: &mut RoutePlanner,
        settings: &Settings,
        tick: u64,
    ) -> Result<AdvanceStats> {
        // Reap vehicles that arrived on the previous tick.
        self.vehicles.retain(|_, v| v.state != VehicleState::Arrived);

        let snapshot = self.build_snapshot();
        let mut stats = AdvanceStats::default();

        // Admission bookkeeping for vehicles crossing into new segments this
        // tick. Dynamics read only the snapshot; these counts exist so two
        // crossings cannot overfill a segment, and they are filled in fixed
        // ascending-id order.
        let mut entered_segment: BTreeMap<SegmentId, u32> = BTreeMap::new();
        let mut entered_lane: BTreeMap<LaneId, u32> = BTreeMap::new();

        let mut next: BTreeMap<VehicleId, Vehicle> = BTreeMap::new();

        for vehicle in self.vehicles.values() {
            let updated = match vehicle.state {
                VehicleState::Spawned | VehicleState::Moving => self.step_moving(
                    vehicle,
                    graph,
                    congestion,
                    signals,
                    settings,
                    &snapshot,
                    &mut entered_segment,
                    &mut entered_lane,
                    &mut stats,
                )?,
                VehicleState::Waiting => self.step_waiting(
                    vehicle,
                    graph,
                    congestion,
                    signals,
                    planner,
                    settings,
                    &snapshot,
                    &mut entered_segment,
                    &mut entered_lane,
                    tick,
                    &mut stats,
                )?,
                VehicleState::Rerouting => self.step_rerouting(
                    vehicle,
                    graph,
                    congestion,
                    planner,
                    settings,
                    tick,
                    &mut stats,
                )?,
                // Reaped above.
                VehicleState::Arrived => None,
            };
            if let Some(updated) = updated {
                next.insert(updated.id, updated);
            }
        }

        self.vehicles = next;
        Ok(stats)
    }

    fn build_snapshot(&self) -> Snapshot {
        let mut lane_order: BTreeMap<LaneId, BTreeMap<(OrderedFloat<f32>, VehicleId), f32>> =
            BTreeMap::new();
        let mut segment_count: BTreeMap<SegmentId, u32> = BTreeMap::new();
        for vehicle in self.vehicles.values() {
            lane_order
                .entry(vehicle.lane)
                .or_default()
                .insert((OrderedFloat(vehicle.position), vehicle.id), vehicle.speed);
            *segment_count.entry(vehicle.current_segment()).or_default() += 1;
        }
        Snapshot {
            lane_order,
            segment_count,
        }
    }

    /// Pick the entry lane on a segment: among lanes with room, fewest
    /// occupants, lowest id on ties. When the segment has aggregate room at
    /// least one lane is under its own capacity, so the first-lane fallback
    /// is unreachable through the admission checks.
    fn pick_lane(
        &self,
        graph: &RoadGraph,
        segment: &RoadSegment,
        snapshot: &Snapshot,
        entered_lane: &BTreeMap<LaneId, u32>,
    ) -> Result<LaneId> {
        let mut best = segment.lanes[0];
        let mut best_count = u32::MAX;
        for lane_id in &segment.lanes {
            let count = snapshot
                .lane_order
                .get(lane_id)
                .map(|m| m.len() as u32)
                .unwrap_or(0)
                + entered_lane.get(lane_id).copied().unwrap_or(0);
            if count >= graph.lane(*lane_id)?.capacity {
                continue;
            }
            if count < best_count {
                best = *lane_id;
                best_count = count;
            }
        }
        Ok(best)
    }

    fn segment_has_room(
        &self,
        graph: &RoadGraph,
        snapshot: &Snapshot,
        entered_segment: &BTreeMap<SegmentId, u32>,
        segment: SegmentId,
    ) -> Result<bool> {
        let capacity = graph.segment_capacity(segment)?;
        let used = snapshot.segment_count.get(&segment).copied().unwrap_or(0)
            + entered_segment.get(&segment).copied().unwrap_or(0);
        Ok(used < capacity)
    }

    /// Classify what the vehicle faces at the end of its current segment
    fn boundary(
        &self,
        vehicle: &Vehicle,
        graph: &RoadGraph,
        signals: &SignalBank,
        settings: &Settings,
        snapshot: &Snapshot,
        entered_segment: &BTreeMap<SegmentId, u32>,
        segment: &RoadSegment,
    ) -> Result<Boundary> {
        if vehicle.at_route_end() {
            return Ok(Boundary::RouteEnd);
        }
        let next_segment = vehicle.route[vehicle.route_index + 1];
        if !signals.permits(segment.to, segment.id, settings) {
            return Ok(Boundary::Red);
        }
        if !self.segment_has_room(graph, snapshot, entered_segment, next_segment)? {
            return Ok(Boundary::Blocked(next_segment));
        }
        Ok(Boundary::Open(next_segment))
    }

    #[allow(clippy::too_many_arguments)]
    fn step_moving(
        &self,
        vehicle: &Vehicle,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        signals: &SignalBank,
        settings: &Settings,
        snapshot: &Snapshot,
        entered_segment: &mut BTreeMap<SegmentId, u32>,
        entered_lane: &mut BTreeMap<LaneId, u32>,
        stats: &mut AdvanceStats,
    ) -> Result<Option<Vehicle>> {
        let mut v = vehicle.clone();
        let segment_id = v.current_segment();
        let segment = graph.segment(segment_id)?.clone();
        let lane = graph.lane(v.lane)?;
        let desired = desired_speed(lane.speed_limit, congestion.segment(segment_id), settings);

        let boundary = self.boundary(
            &v,
            graph,
            signals,
            settings,
            snapshot,
            entered_segment,
            &segment,
        )?;

        // Gap to the leading vehicle on this lane, or to the stop line when
        // the boundary ahead is closed this tick.
        let leader = snapshot.lane_order.get(&v.lane).and_then(|m| {
            m.range((
                Bound::Excluded((OrderedFloat(v.position), v.id)),
                Bound::Unbounded,
            ))
            .next()
        });
        let (gap, leading_speed) = match leader {
            Some(((lead_pos, _), lead_speed)) => (
                lead_pos.into_inner() - v.position - settings.vehicle_length,
                *lead_speed,
            ),
            None => match boundary {
                Boundary::RouteEnd | Boundary::Open(_) => (f32::INFINITY, desired),
                Boundary::Red | Boundary::Blocked(_) => (segment.length - v.position, 0.0),
            },
        };

        let (new_speed, advanced) = follow_step(v.speed, desired, gap, leading_speed, settings);
        v.speed = new_speed;
        let new_position = v.position + advanced;

        if v.speed > lane.speed_limit + 1e-3 {
            warn!(
                "vehicle {} exceeded lane {} limit ({:.1} > {:.1}); clamping",
                v.id, v.lane, v.speed, lane.speed_limit
            );
            v.speed = lane.speed_limit;
        }
        debug_assert!(v.speed <= lane.speed_limit + 1e-3);

        // A vehicle braking for a closed boundary equilibrates a standstill
        // gap short of the stop line; treat that as having reached it, or it
        // would never leave the Moving state.
        let held_at_line = matches!(&boundary, Boundary::Red | Boundary::Blocked(_))
            && segment.length - new_position <= settings.min_gap + 0.5
            && v.speed < 0.1;

        if new_position < segment.length && !held_at_line {
            v.position = new_position;
            v.state = VehicleState::Moving;
            return Ok(Some(v));
        }

        // Reached the end of the current segment.
        match boundary {
            Boundary::RouteEnd => {
                v.position = segment.length;
                v.speed = 0.0;
                v.state = VehicleState::Arrived;
                stats.arrived += 1;
            }
            Boundary::Open(next_segment) => {
                let next = graph.segment(next_segment)?;
                v.route_index += 1;
                v.lane = self.pick_lane(graph, next, snapshot, entered_lane)?;
                v.position = (new_position - segment.length).min(next.length);
                // Entering a slower road mid-tick: respect the new limit.
                let next_lane = graph.lane(v.lane)?;
                v.speed = v.speed.min(next_lane.speed_limit);
                v.state = VehicleState::Moving;
                *entered_segment.entry(next_segment).or_default() += 1;
                *entered_lane.entry(v.lane).or_default() += 1;
            }
            Boundary::Red => {
                v.position = new_position.min(segment.length);
                v.speed = 0.0;
                v.state = VehicleState::Waiting;
            }
            Boundary::Blocked(next_segment) => {
                v.position = new_position.min(segment.length);
                v.speed = 0.0;
                v.state = VehicleState::Rerouting;
                v.avoid = Some(next_segment);
            }
        }
        Ok(Some(v))
    }

    /// A waiting vehicle either retries a failed route on its backoff
    /// schedule, or sits at a boundary re-checking the signal and capacity.
    #[allow(clippy::too_many_arguments)]
    fn step_waiting(
        &self,
        vehicle: &Vehicle,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        signals: &SignalBank,
        planner: &mut RoutePlanner,
        settings: &Settings,
        snapshot: &Snapshot,
        entered_segment: &mut BTreeMap<SegmentId, u32>,
        entered_lane: &mut BTreeMap<LaneId, u32>,
        tick: u64,
        stats: &mut AdvanceStats,
    ) -> Result<Option<Vehicle>> {
        let mut v = vehicle.clone();

        if let Some(retry) = v.retry {
            if tick < retry.next_attempt {
                return Ok(Some(v));
            }
            return self.attempt_replan(v, graph, congestion, planner, settings, tick, stats);
        }

        // Boundary wait: re-check the signal and downstream capacity.
        let segment_id = v.current_segment();
        let segment = graph.segment(segment_id)?.clone();
        match self.boundary(
            &v,
            graph,
            signals,
            settings,
            snapshot,
            entered_segment,
            &segment,
        )? {
            Boundary::RouteEnd => {
                // Only reachable if the route was rewritten underneath a
                // waiting vehicle; treat as an arrival at the boundary.
                v.state = VehicleState::Arrived;
                v.speed = 0.0;
                stats.arrived += 1;
            }
            Boundary::Open(next_segment) => {
                let next = graph.segment(next_segment)?;
                v.route_index += 1;
                v.lane = self.pick_lane(graph, next, snapshot, entered_lane)?;
                v.position = 0.0;
                v.speed = 0.0;
                v.state = VehicleState::Moving;
                *entered_segment.entry(next_segment).or_default() += 1;
                *entered_lane.entry(v.lane).or_default() += 1;
            }
            Boundary::Red => {}
            Boundary::Blocked(next_segment) => {
                v.state = VehicleState::Rerouting;
                v.avoid = Some(next_segment);
            }
        }
        Ok(Some(v))
    }

    /// Replan immediately; on failure fall back to the bounded retry schedule
    fn step_rerouting(
        &self,
        vehicle: &Vehicle,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        planner: &mut RoutePlanner,
        settings: &Settings,
        tick: u64,
        stats: &mut AdvanceStats,
    ) -> Result<Option<Vehicle>> {
        let v = vehicle.clone();
        self.attempt_replan(v, graph, congestion, planner, settings, tick, stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt_replan(
        &self,
        mut v: Vehicle,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        planner: &mut RoutePlanner,
        settings: &Settings,
        tick: u64,
        stats: &mut AdvanceStats,
    ) -> Result<Option<Vehicle>> {
        let segment_id = v.current_segment();
        let segment = graph.segment(segment_id)?;
        let from = segment.to;

        match planner.plan_avoiding(graph, congestion, settings, from, v.destination, v.avoid) {
            Ok(route) => {
                // Keep the segment being driven as the route head; the new
                // plan continues from its downstream intersection.
                let mut segments = Vec::with_capacity(route.segments.len() + 1);
                segments.push(segment_id);
                segments.extend(route.segments);
                v.route = segments;
                v.route_index = 0;
                v.state = VehicleState::Moving;
                v.retry = None;
                v.avoid = None;
                stats.rerouted += 1;
                Ok(Some(v))
            }
            Err(_) => {
                let retry = match v.retry {
                    Some(prev) => RetryState {
                        attempts: prev.attempts + 1,
                        backoff: prev.backoff * 2,
                        next_attempt: tick + prev.backoff * 2,
                    },
                    None => RetryState {
                        attempts: 1,
                        backoff: 1,
                        next_attempt: tick + 1,
                    },
                };
                if retry.attempts > settings.max_route_retries {
                    warn!(
                        "vehicle {} stranded at {} after {} replan attempts; despawning",
                        v.id, from, retry.attempts
                    );
                    stats.failed_routes += 1;
                    return Ok(None);
                }
                v.state = VehicleState::Waiting;
                v.speed = 0.0;
                v.retry = Some(retry);
                Ok(Some(v))
            }
        }
    }

    /// The spawn pass (step 4 of the tick)
    ///
    /// Deferred requests from earlier capacity overflows go first, then new
    /// demand drawn from the seeded RNG. Spawn order and every tie-break
    /// derive only from (seed, tick, ascending ids).
    pub fn process_spawns(
        &mut self,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        planner: &mut RoutePlanner,
        rng: &mut StdRng,
        settings: &Settings,
        tick: u64,
    ) -> Result<SpawnStats> {
        let mut stats = SpawnStats::default();

        let mut requests: Vec<SpawnRequest> = self.deferred.drain(..).collect();

        let rate = settings.spawn_rate.max(0.0);
        let mut count = rate.floor() as u32;
        if rng.random::<f32>() < rate.fract() {
            count += 1;
        }

        let intersections = graph.intersection_ids();
        if intersections.len() >= 2 {
            for _ in 0..count {
                let origin = intersections[rng.random_range(0..intersections.len())];
                let destination = intersections[rng.random_range(0..intersections.len())];
                if origin == destination {
                    stats.failed_spawns += 1;
                    continue;
                }
                requests.push(SpawnRequest {
                    origin,
                    destination,
                });
            }
        }

        let mut occupancy = self.segment_occupancy();
        let mut lane_counts: BTreeMap<LaneId, u32> = BTreeMap::new();
        for vehicle in self.vehicles.values() {
            if vehicle.state != VehicleState::Arrived {
                *lane_counts.entry(vehicle.lane).or_default() += 1;
            }
        }

        for request in requests {
            match planner.plan(graph, congestion, settings, request.origin, request.destination) {
                Err(_) => {
                    // Spawned -> NoPathFound -> discarded; a metric, not an error.
                    stats.failed_spawns += 1;
                }
                Ok(route) if route.segments.is_empty() => {
                    stats.failed_spawns += 1;
                }
                Ok(route) => {
                    let first = route.segments[0];
                    let capacity = graph.segment_capacity(first)?;
                    let used = occupancy.get(&first).copied().unwrap_or(0);
                    if used >= capacity {
                        self.deferred.push_back(request);
                        stats.deferred += 1;
                        continue;
                    }

                    let first_segment = graph.segment(first)?;
                    let mut lane = first_segment.lanes[0];
                    let mut best = u32::MAX;
                    for candidate in &first_segment.lanes {
                        let n = lane_counts.get(candidate).copied().unwrap_or(0);
                        if n >= graph.lane(*candidate)?.capacity {
                            continue;
                        }
                        if n < best {
                            lane = *candidate;
                            best = n;
                        }
                    }

                    let id = VehicleId(self.next_id);
                    self.next_id += 1;
                    self.vehicles.insert(
                        id,
                        Vehicle {
                            id,
                            destination: request.destination,
                            route: route.segments,
                            route_index: 0,
                            lane,
                            position: 0.0,
                            speed: 0.0,
                            state: VehicleState::Spawned,
                            retry: None,
                            avoid: None,
                            spawned_tick: tick,
                        },
                    );
                    *occupancy.entry(first).or_default() += 1;
                    *lane_counts.entry(lane).or_default() += 1;
                    stats.spawned += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Direct spawn used by scenarios and tests; returns the id, or `None`
    /// when no route exists (counted by the caller, consistent with the
    /// spawn pass)
    pub fn spawn_vehicle(
        &mut self,
        graph: &RoadGraph,
        congestion: &CongestionModel,
        planner: &mut RoutePlanner,
        settings: &Settings,
        origin: IntersectionId,
        destination: IntersectionId,
        tick: u64,
    ) -> Result<Option<VehicleId>> {
        graph
            .intersection(origin)
            .context("spawn origin must exist")?;
        graph
            .intersection(destination)
            .context("spawn destination must exist")?;

        let route = match planner.plan(graph, congestion, settings, origin, destination) {
            Ok(route) if !route.segments.is_empty() => route,
            _ => return Ok(None),
        };
        let first = graph.segment(route.segments[0])?;
        let mut lane = first.lanes[0];
        let mut best = u32::MAX;
        for candidate in &first.lanes {
            let n = self
                .vehicles
                .values()
                .filter(|v| v.state != VehicleState::Arrived && v.lane == *candidate)
                .count() as u32;
            if n < best {
                lane = *candidate;
                best = n;
            }
        }

        let id = VehicleId(self.next_id);
        self.next_id += 1;
        self.vehicles.insert(
            id,
            Vehicle {
                id,
                destination,
                route: route.segments,
                route_index: 0,
                lane,
                position: 0.0,
                speed: 0.0,
                state: VehicleState::Spawned,
                retry: None,
                avoid: None,
                spawned_tick: tick,
            },
        );
        Ok(Some(id))
    }
}
