//! Per-tick orchestration of the transport engine
//!
//! The subsystem is invoked once per host tick and runs a fixed pipeline:
//! infrastructure decisions, signal advance (on previous-tick aggregates),
//! congestion recompute (on the tick-start occupancy snapshot), vehicle
//! movement (double-buffered), spawns, and finally aggregation into an
//! immutable `TrafficDelta`. This ordering is the determinism guarantee.

use anyhow::Result;
use log::{debug, info};
use rand::rngs::StdRng;

use super::congestion::CongestionModel;
use super::fleet::FleetManager;
use super::road_graph::{LaneSpec, RoadGraph};
use super::route_planner::RoutePlanner;
use super::settings::Settings;
use super::signal::{SignalBank, SignalController, SignalInputs};
use super::types::{IntersectionId, Position, RoadClass, SegmentId, SignalId};

/// Graph mutation applied between ticks
#[derive(Debug, Clone)]
pub enum InfrastructureDecision {
    AddIntersection {
        position: Position,
    },
    AddSegment {
        from: IntersectionId,
        to: IntersectionId,
        class: RoadClass,
        lanes: Vec<LaneSpec>,
    },
    RemoveSegment(SegmentId),
    UpgradeCapacity {
        segment: SegmentId,
        extra_per_lane: u32,
    },
}

/// Host-provided input for one tick
pub struct TickContext<'a> {
    pub tick: u64,
    pub rng: &'a mut StdRng,
    pub infrastructure: Vec<InfrastructureDecision>,
}

impl<'a> TickContext<'a> {
    pub fn new(tick: u64, rng: &'a mut StdRng) -> Self {
        Self {
            tick,
            rng,
            infrastructure: Vec::new(),
        }
    }
}

/// Immutable per-tick output consumed by the host
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficDelta {
    pub tick: u64,
    /// Mean speed of traveling vehicles (m/s)
    pub average_speed: f32,
    /// Vehicle-count-weighted network congestion index
    pub congestion_index: f32,
    /// Per-segment congestion, nonzero entries only, ascending by id
    pub segment_congestion: Vec<(SegmentId, f32)>,
    /// Segments above the congestion report threshold
    pub congested_segments: Vec<SegmentId>,
    /// Vehicles that reached their destination this tick
    pub throughput: u32,
    pub spawned: u32,
    pub failed_spawns: u32,
    /// Spawns pushed to the next tick because the entry segment was full
    pub deferred_spawns: u32,
    /// Vehicles despawned after exhausting replan retries (incl. incident
    /// casualties) -- never silently dropped
    pub failed_routes: u32,
    /// Vehicles that successfully adopted a new route this tick
    pub rerouted: u32,
    pub active_vehicles: u32,
    pub waiting_vehicles: u32,
}

/// The transport & traffic simulation engine
pub struct TransportSubsystem {
    pub graph: RoadGraph,
    pub signals: SignalBank,
    pub congestion: CongestionModel,
    pub planner: RoutePlanner,
    pub fleet: FleetManager,
    pub settings: Settings,
    /// Aggregates captured at the end of the previous tick
    prev_inputs: SignalInputs,
}

impl TransportSubsystem {
    pub fn new(settings: Settings) -> Self {
        Self {
            graph: RoadGraph::new(),
            signals: SignalBank::new(),
            congestion: CongestionModel::new(),
            planner: RoutePlanner::new(),
            fleet: FleetManager::new(),
            settings,
            prev_inputs: SignalInputs::default(),
        }
    }

    /// Register a signal controller and wire the intersection reference
    pub fn add_signal(&mut self, controller: SignalController) -> Result<SignalId> {
        let intersection = controller.intersection;
        let id = self.signals.add(controller);
        self.graph.attach_signal(intersection, id)?;
        Ok(id)
    }

    /// Run one simulation tick
    pub fn tick(&mut self, ctx: &mut TickContext) -> Result<TrafficDelta> {
        // (0) Infrastructure decisions apply between ticks, before anything
        // reads the graph.
        let mut incident_despawns = 0u32;
        let decisions = std::mem::take(&mut ctx.infrastructure);
        for decision in decisions {
            incident_despawns += self.apply_infrastructure(decision)?;
        }
        self.planner.note_topology(&self.graph);

        // (1) Signals advance on the previous tick's aggregates.
        self.signals
            .advance_all(self.settings.dt, &self.prev_inputs, &self.settings);

        // (2) Congestion from the tick-start registry snapshot.
        let occupancy = self.fleet.segment_occupancy();
        let material =
            self.congestion
                .recompute(&self.graph, &occupancy, &self.settings)?;
        if material {
            self.planner.note_congestion_shift();
        }

        // (3) Vehicle movement against the immutable snapshot.
        let advance = self.fleet.advance(
            &self.graph,
            &self.congestion,
            &self.signals,
            &mut self.planner,
            &self.settings,
            ctx.tick,
        )?;

        // (4) Spawns, deferred requests first.
        let spawns = self.fleet.process_spawns(
            &self.graph,
            &self.congestion,
            &mut self.planner,
            ctx.rng,
            &self.settings,
            ctx.tick,
        )?;

        // (5) Aggregate and capture next-tick signal inputs.
        self.prev_inputs = self.fleet.signal_inputs(&self.graph)?;

        let delta = TrafficDelta {
            tick: ctx.tick,
            average_speed: self.fleet.average_speed(),
            congestion_index: self.congestion.network_index(),
            segment_congestion: self.congestion.nonzero_segments(),
            congested_segments: self.congestion.congested_segments(&self.settings),
            throughput: advance.arrived,
            spawned: spawns.spawned,
            failed_spawns: spawns.failed_spawns,
            deferred_spawns: spawns.deferred,
            failed_routes: advance.failed_routes + incident_despawns,
            rerouted: advance.rerouted,
            active_vehicles: self.fleet.live_count() as u32,
            waiting_vehicles: self.fleet.waiting_count() as u32,
        };

        debug!(
            "tick {}: active={} arrived={} spawned={} congestion={:.3}",
            delta.tick,
            delta.active_vehicles,
            delta.throughput,
            delta.spawned,
            delta.congestion_index
        );
        Ok(delta)
    }

    /// Apply one graph mutation; returns vehicles despawned by it
    fn apply_infrastructure(&mut self, decision: InfrastructureDecision) -> Result<u32> {
        match decision {
            InfrastructureDecision::AddIntersection { position } => {
                let id = self.graph.add_intersection(position);
                info!("infrastructure: added intersection {id}");
                Ok(0)
            }
            InfrastructureDecision::AddSegment {
                from,
                to,
                class,
                lanes,
            } => {
                let id = self.graph.add_segment(from, to, class, &lanes)?;
                info!("infrastructure: added segment {id} ({from} -> {to})");
                Ok(0)
            }
            InfrastructureDecision::RemoveSegment(segment) => {
                self.graph.remove_segment(segment)?;
                let (despawned, flagged) = self.fleet.handle_segment_removed(segment);
                info!(
                    "infrastructure: removed segment {segment}; {despawned} vehicles despawned, {flagged} rerouting"
                );
                Ok(despawned)
            }
            InfrastructureDecision::UpgradeCapacity {
                segment,
                extra_per_lane,
            } => {
                self.graph.upgrade_capacity(segment, extra_per_lane)?;
                info!("infrastructure: upgraded capacity of segment {segment}");
                Ok(0)
            }
        }
    }
}
