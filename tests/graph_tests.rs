//! Contract tests for the road graph, pathfinding, route planner,
//! congestion curve, signals, and the car-following model.

use transport_engine::engine::{
    congestion_curve, find_route, follow_step, safe_gap, CongestionModel, IntersectionId,
    LaneSpec, Phase, Position, RoadClass, RoadGraph, RoutePlanner, SegmentId, Settings,
    SignalController, SignalInputs,
};

fn lane(speed_limit: f32, capacity: u32) -> LaneSpec {
    LaneSpec {
        speed_limit,
        capacity,
    }
}

#[test]
fn unknown_ids_are_errors() {
    let mut graph = RoadGraph::new();
    let a = graph.add_intersection(Position::new(0.0, 0.0));

    assert!(graph.intersection(IntersectionId(99)).is_err());
    assert!(graph.segment(SegmentId(0)).is_err());
    assert!(graph
        .add_segment(a, IntersectionId(7), RoadClass::City, &[lane(14.0, 10)])
        .is_err());

    let b = graph.add_intersection(Position::new(100.0, 0.0));
    let s = graph
        .add_segment(a, b, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    assert!(graph.segment(s).is_ok());

    // Removal tombstones the id; later queries fail with UnknownId.
    graph.remove_segment(s).unwrap();
    assert!(graph.segment(s).is_err());
    assert!(graph.neighbors(a).unwrap().is_empty());
}

#[test]
fn graph_mutation_bumps_topology_version() {
    let mut graph = RoadGraph::new();
    let v0 = graph.topology_version();
    let a = graph.add_intersection(Position::new(0.0, 0.0));
    let b = graph.add_intersection(Position::new(50.0, 0.0));
    let s = graph
        .add_segment(a, b, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    assert!(graph.topology_version() > v0);

    let v1 = graph.topology_version();
    graph.upgrade_capacity(s, 5).unwrap();
    assert!(graph.topology_version() > v1);
    assert_eq!(graph.segment_capacity(s).unwrap(), 15);
}

/// Brute-force shortest path over segment lengths, for comparison
fn bellman_ford(
    graph: &RoadGraph,
    from: IntersectionId,
    to: IntersectionId,
) -> Option<f32> {
    let nodes = graph.intersection_ids();
    let mut dist: std::collections::HashMap<IntersectionId, f32> = std::collections::HashMap::new();
    dist.insert(from, 0.0);
    for _ in 0..nodes.len() {
        let mut changed = false;
        for node in &nodes {
            let Some(&d) = dist.get(node) else { continue };
            for segment_id in graph.neighbors(*node).unwrap() {
                let segment = graph.segment(segment_id).unwrap();
                let next = d + segment.length;
                if next < dist.get(&segment.to).copied().unwrap_or(f32::INFINITY) {
                    dist.insert(segment.to, next);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    dist.get(&to).copied()
}

#[test]
fn astar_matches_brute_force_on_small_graphs() {
    let mut graph = RoadGraph::new();
    let settings = Settings::default();
    let congestion = CongestionModel::new();

    // 4x4 grid with a couple of diagonal shortcuts.
    let mut ids = Vec::new();
    for row in 0..4 {
        for col in 0..4 {
            ids.push(graph.add_intersection(Position::new(col as f32 * 100.0, row as f32 * 100.0)));
        }
    }
    let at = |row: usize, col: usize| ids[row * 4 + col];
    for row in 0..4 {
        for col in 0..3 {
            graph
                .add_segment(at(row, col), at(row, col + 1), RoadClass::City, &[lane(14.0, 10)])
                .unwrap();
        }
    }
    for row in 0..3 {
        for col in 0..4 {
            graph
                .add_segment(at(row, col), at(row + 1, col), RoadClass::City, &[lane(14.0, 10)])
                .unwrap();
        }
    }
    graph
        .add_segment(at(0, 0), at(1, 1), RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    graph
        .add_segment(at(1, 2), at(2, 3), RoadClass::City, &[lane(14.0, 10)])
        .unwrap();

    for (from, to) in [
        (at(0, 0), at(3, 3)),
        (at(0, 0), at(2, 3)),
        (at(0, 1), at(3, 3)),
        (at(1, 1), at(3, 3)),
    ] {
        let expected = bellman_ford(&graph, from, to).unwrap();
        let route = find_route(&graph, &congestion, &settings, from, to, None).unwrap();
        assert!(
            (route.cost - expected).abs() < 1e-3,
            "route cost {} != brute force {}",
            route.cost,
            expected
        );
    }

    // The grid is one-way toward higher rows/cols; going backwards fails.
    let unreachable = find_route(&graph, &congestion, &settings, at(3, 3), at(0, 0), None);
    assert!(unreachable.is_err());
    assert!(bellman_ford(&graph, at(3, 3), at(0, 0)).is_none());
}

#[test]
fn astar_breaks_ties_by_lowest_intersection_id() {
    let mut graph = RoadGraph::new();
    let settings = Settings::default();
    let congestion = CongestionModel::new();

    // Perfect diamond: two routes of identical cost.
    let a = graph.add_intersection(Position::new(0.0, 0.0));
    let upper = graph.add_intersection(Position::new(100.0, 100.0));
    let lower = graph.add_intersection(Position::new(100.0, -100.0));
    let c = graph.add_intersection(Position::new(200.0, 0.0));

    let via_upper = graph
        .add_segment(a, upper, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    let upper_out = graph
        .add_segment(upper, c, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    graph
        .add_segment(a, lower, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    graph
        .add_segment(lower, c, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();

    let route = find_route(&graph, &congestion, &settings, a, c, None).unwrap();
    assert_eq!(route.segments, vec![via_upper, upper_out]);
}

#[test]
fn congestion_raises_edge_costs_and_diverts_routes() {
    let mut graph = RoadGraph::new();
    let settings = Settings::default();

    // Short route through `mid`, longer bypass through `far`.
    let a = graph.add_intersection(Position::new(0.0, 0.0));
    let mid = graph.add_intersection(Position::new(100.0, 10.0));
    let far = graph.add_intersection(Position::new(100.0, -150.0));
    let c = graph.add_intersection(Position::new(200.0, 0.0));

    let short_in = graph
        .add_segment(a, mid, RoadClass::City, &[lane(14.0, 4)])
        .unwrap();
    graph
        .add_segment(mid, c, RoadClass::City, &[lane(14.0, 4)])
        .unwrap();
    graph
        .add_segment(a, far, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    graph
        .add_segment(far, c, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();

    let empty = CongestionModel::new();
    let free_route = find_route(&graph, &empty, &settings, a, c, None).unwrap();
    assert_eq!(free_route.segments[0], short_in);

    // Saturate the short leg; the bypass becomes cheaper.
    let mut congested = CongestionModel::new();
    let mut occupancy = std::collections::BTreeMap::new();
    occupancy.insert(short_in, 4);
    congested.recompute(&graph, &occupancy, &settings).unwrap();
    assert!(congested.segment(short_in) > 0.9);

    let diverted = find_route(&graph, &congested, &settings, a, c, None).unwrap();
    assert_ne!(diverted.segments[0], short_in);
}

#[test]
fn route_planner_caches_until_epoch_changes() {
    let mut graph = RoadGraph::new();
    let settings = Settings::default();
    let congestion = CongestionModel::new();
    let mut planner = RoutePlanner::new();

    let a = graph.add_intersection(Position::new(0.0, 0.0));
    let b = graph.add_intersection(Position::new(100.0, 0.0));
    let c = graph.add_intersection(Position::new(200.0, 0.0));
    graph
        .add_segment(a, b, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    graph
        .add_segment(b, c, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    planner.note_topology(&graph);
    let epoch = planner.epoch();

    planner.plan(&graph, &congestion, &settings, a, c).unwrap();
    planner.plan(&graph, &congestion, &settings, a, b).unwrap();
    assert_eq!(planner.cached_routes(), 2);

    // No change: epoch stable, cache kept.
    planner.note_topology(&graph);
    assert_eq!(planner.epoch(), epoch);
    assert_eq!(planner.cached_routes(), 2);

    // Topology change: epoch bumps, cache dropped.
    graph
        .add_segment(a, c, RoadClass::City, &[lane(14.0, 10)])
        .unwrap();
    planner.note_topology(&graph);
    assert!(planner.epoch() > epoch);
    assert_eq!(planner.cached_routes(), 0);

    // The fresh plan sees the new direct segment.
    let route = planner.plan(&graph, &congestion, &settings, a, c).unwrap();
    assert_eq!(route.segments.len(), 1);

    planner.note_congestion_shift();
    assert_eq!(planner.cached_routes(), 0);
}

#[test]
fn congestion_curve_is_monotone_and_bounded() {
    let settings = Settings::default();
    let mut previous = 0.0f32;
    for step in 0..=120 {
        let ratio = step as f32 / 100.0;
        let value = congestion_curve(ratio, &settings);
        assert!((0.0..=1.0).contains(&value));
        assert!(value >= previous, "curve decreased at ratio {ratio}");
        previous = value;
    }
    assert_eq!(congestion_curve(0.3, &settings), 0.0);
    assert!((congestion_curve(1.0, &settings) - 1.0).abs() < 1e-6);
}

#[test]
fn network_index_is_vehicle_weighted() {
    let mut graph = RoadGraph::new();
    let settings = Settings::default();
    let a = graph.add_intersection(Position::new(0.0, 0.0));
    let b = graph.add_intersection(Position::new(100.0, 0.0));
    let c = graph.add_intersection(Position::new(200.0, 0.0));
    let loaded = graph
        .add_segment(a, b, RoadClass::City, &[lane(14.0, 4)])
        .unwrap();
    graph
        .add_segment(b, c, RoadClass::City, &[lane(14.0, 4)])
        .unwrap();

    let mut model = CongestionModel::new();
    let mut occupancy = std::collections::BTreeMap::new();
    occupancy.insert(loaded, 4);
    model.recompute(&graph, &occupancy, &settings).unwrap();

    // The empty segment carries no weight; the index equals the loaded
    // segment's congestion, not the simple mean.
    assert!((model.network_index() - model.segment(loaded)).abs() < 1e-6);
}

#[test]
fn congestion_epoch_only_bumps_on_material_change() {
    let mut graph = RoadGraph::new();
    let settings = Settings::default();
    let a = graph.add_intersection(Position::new(0.0, 0.0));
    let b = graph.add_intersection(Position::new(100.0, 0.0));
    let s = graph
        .add_segment(a, b, RoadClass::City, &[lane(14.0, 100)])
        .unwrap();

    let mut model = CongestionModel::new();
    let mut occupancy = std::collections::BTreeMap::new();

    // Fully loaded: a material jump from the zero baseline.
    occupancy.insert(s, 100);
    assert!(model.recompute(&graph, &occupancy, &settings).unwrap());

    // A one-vehicle wiggle stays under the materiality threshold.
    occupancy.insert(s, 99);
    assert!(!model.recompute(&graph, &occupancy, &settings).unwrap());

    // Draining the segment is material again.
    occupancy.insert(s, 0);
    assert!(model.recompute(&graph, &occupancy, &settings).unwrap());
}

#[test]
fn fixed_time_signal_rolls_and_wraps() {
    let settings = Settings::default();
    let inputs = SignalInputs::default();
    let s0 = SegmentId(0);
    let s1 = SegmentId(1);
    let mut controller = SignalController::fixed_time(
        IntersectionId(0),
        vec![Phase::new(vec![s0], 2.0), Phase::new(vec![s1], 3.0)],
    );

    assert!(controller.permits(s0, &settings));
    assert!(!controller.permits(s1, &settings));

    controller.advance(1.0, &inputs, &settings);
    assert_eq!(controller.current, 0);
    controller.advance(1.0, &inputs, &settings);
    assert_eq!(controller.current, 1);
    assert!(controller.permits(s1, &settings));

    controller.advance(3.0, &inputs, &settings);
    assert_eq!(controller.current, 0, "controller should wrap to phase 0");
}

#[test]
fn adaptive_signal_sizes_upcoming_phase_from_queue_surplus() {
    let settings = Settings::default();
    let s0 = SegmentId(0);
    let s1 = SegmentId(1);
    let mut controller = SignalController::adaptive(
        IntersectionId(0),
        vec![Phase::new(vec![s0], 4.0), Phase::new(vec![s1], 4.0)],
    );

    // One-sided demand: the loaded approach gets the full surplus.
    let mut inputs = SignalInputs::default();
    inputs.queue_by_segment.insert(s1, 10);

    controller.advance(4.0, &inputs, &settings);
    assert_eq!(controller.current, 1);
    let expected = settings.adaptive_min_duration + settings.seconds_per_queued_vehicle * 10.0;
    assert!((controller.phases[1].duration - expected).abs() < 1e-6);

    // An enormous surplus clamps to the configured maximum.
    inputs.queue_by_segment.insert(s0, 1000);
    controller.advance(controller.phases[1].duration, &inputs, &settings);
    assert_eq!(controller.current, 0);
    assert!((controller.phases[0].duration - settings.adaptive_max_duration).abs() < 1e-6);

    // Balanced demand earns no extra green: both phases run the minimum,
    // keeping the cycle short instead of stretching every phase.
    inputs.queue_by_segment.insert(s0, 6);
    inputs.queue_by_segment.insert(s1, 6);
    controller.advance(controller.phases[0].duration, &inputs, &settings);
    assert_eq!(controller.current, 1);
    assert!((controller.phases[1].duration - settings.adaptive_min_duration).abs() < 1e-6);
}

#[test]
fn adaptive_signal_falls_back_to_fixed_when_disabled() {
    let mut settings = Settings::default();
    settings.adaptive_signals_enabled = false;
    let s0 = SegmentId(0);
    let s1 = SegmentId(1);
    let mut controller = SignalController::adaptive(
        IntersectionId(0),
        vec![Phase::new(vec![s0], 4.0), Phase::new(vec![s1], 6.0)],
    );

    let mut inputs = SignalInputs::default();
    inputs.queue_by_segment.insert(s1, 50);

    controller.advance(4.0, &inputs, &settings);
    assert!((controller.phases[1].duration - 6.0).abs() < 1e-6);
}

#[test]
fn ramp_meter_follows_the_occupancy_bucket_table() {
    let settings = Settings::default();
    let mainline = SegmentId(0);
    let ramp = SegmentId(1);
    let mut controller =
        SignalController::ramp_meter(IntersectionId(0), ramp, mainline, &settings);

    // Mainline approaches always flow regardless of phase.
    assert!(controller.permits(mainline, &settings));

    let mut inputs = SignalInputs::default();
    inputs.occupancy_ratio.insert(mainline, 0.9);

    // Roll through a full cycle so the bucket decision is applied.
    let green = controller.phases[0].duration;
    controller.advance(green, &inputs, &settings);
    let jam = settings.ramp_bucket_for(0.9);
    assert!((controller.phases[0].duration - jam.green_duration).abs() < 1e-6);
    assert!((controller.phases[1].duration - jam.red_duration).abs() < 1e-6);

    // Metering disabled: the ramp is always permitted.
    let mut relaxed = Settings::default();
    relaxed.ramp_metering_enabled = false;
    assert!(controller.permits(ramp, &relaxed));
}

#[test]
fn car_following_respects_bounds() {
    let settings = Settings::default();

    // Free road: accelerate toward but never beyond the desired speed.
    let mut speed = 0.0f32;
    for _ in 0..60 {
        let (next, advanced) = follow_step(speed, 14.0, f32::INFINITY, 14.0, &settings);
        assert!(next <= 14.0 + 1e-6);
        assert!(advanced >= 0.0);
        speed = next;
    }
    assert!(speed > 12.0, "should approach the desired speed, got {speed}");

    // Bumper to bumper behind a stopped leader: no forward motion builds up.
    let (next, _) = follow_step(10.0, 14.0, 0.5, 0.0, &settings);
    assert!(next < 10.0, "must brake hard when the gap collapses");

    assert!(safe_gap(0.0, 0.0, &settings) >= settings.min_gap);
    assert!(safe_gap(14.0, 0.0, &settings) > safe_gap(14.0, 14.0, &settings));
}
