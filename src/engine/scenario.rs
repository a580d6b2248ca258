//! Deterministic scenario builders
//!
//! Small, reproducible networks used by the headless runner and the tests.
//! Everything here goes through the normal public mutation API, so a builder
//! is exactly equivalent to a sequence of infrastructure decisions.

use anyhow::{bail, Result};

use super::road_graph::LaneSpec;
use super::settings::Settings;
use super::signal::{Phase, SignalController};
use super::subsystem::TransportSubsystem;
use super::types::{IntersectionId, Position, RoadClass, SegmentId};

const CITY_LANE: LaneSpec = LaneSpec {
    speed_limit: 14.0,
    capacity: 10,
};

const HIGHWAY_LANE: LaneSpec = LaneSpec {
    speed_limit: 30.0,
    capacity: 20,
};

/// A square city grid with two-way streets and signals at every interior
/// intersection. `adaptive` picks the controller family.
///
/// Returns the subsystem and the grid of intersection ids, row-major.
pub fn signalized_grid(
    size: usize,
    spacing: f32,
    adaptive: bool,
    settings: Settings,
) -> Result<(TransportSubsystem, Vec<Vec<IntersectionId>>)> {
    let mut system = TransportSubsystem::new(settings);

    let mut grid = vec![vec![IntersectionId(0); size]; size];
    for (row, grid_row) in grid.iter_mut().enumerate() {
        for (col, cell) in grid_row.iter_mut().enumerate() {
            *cell = system
                .graph
                .add_intersection(Position::new(col as f32 * spacing, row as f32 * spacing));
        }
    }

    // Two directed segments per street; remember both directions so the
    // signal phases can be assembled per approach.
    let mut into: Vec<Vec<Vec<SegmentId>>> = vec![vec![Vec::new(); size]; size];
    let mut add_street = |system: &mut TransportSubsystem,
                          a: IntersectionId,
                          b: IntersectionId,
                          ra: usize,
                          ca: usize,
                          rb: usize,
                          cb: usize|
     -> Result<()> {
        let forward = system
            .graph
            .add_segment(a, b, RoadClass::City, &[CITY_LANE])?;
        let backward = system
            .graph
            .add_segment(b, a, RoadClass::City, &[CITY_LANE])?;
        into[rb][cb].push(forward);
        into[ra][ca].push(backward);
        Ok(())
    };

    for row in 0..size {
        for col in 0..size.saturating_sub(1) {
            add_street(
                &mut system,
                grid[row][col],
                grid[row][col + 1],
                row,
                col,
                row,
                col + 1,
            )?;
        }
    }
    for row in 0..size.saturating_sub(1) {
        for col in 0..size {
            add_street(
                &mut system,
                grid[row][col],
                grid[row + 1][col],
                row,
                col,
                row + 1,
                col,
            )?;
        }
    }

    // Interior intersections get a two-phase signal: east-west approaches,
    // then north-south. Approach direction is recovered from geometry.
    for row in 1..size.saturating_sub(1) {
        for col in 1..size.saturating_sub(1) {
            let intersection = grid[row][col];
            let here = system.graph.intersection(intersection)?.position;
            let mut east_west = Vec::new();
            let mut north_south = Vec::new();
            for segment_id in &into[row][col] {
                let segment = system.graph.segment(*segment_id)?;
                let from = system.graph.intersection(segment.from)?.position;
                if (from.y - here.y).abs() < f32::EPSILON {
                    east_west.push(*segment_id);
                } else {
                    north_south.push(*segment_id);
                }
            }
            let phases = vec![Phase::new(east_west, 10.0), Phase::new(north_south, 10.0)];
            let controller = if adaptive {
                SignalController::adaptive(intersection, phases)
            } else {
                SignalController::fixed_time(intersection, phases)
            };
            system.add_signal(controller)?;
        }
    }

    Ok((system, grid))
}

/// A highway mainline with a metered on-ramp merging at the second
/// interchange.
///
/// Returns the subsystem, the mainline intersections in driving order, and
/// the ramp origin intersection.
pub fn metered_highway(
    mainline_length: usize,
    settings: Settings,
) -> Result<(TransportSubsystem, Vec<IntersectionId>, IntersectionId)> {
    if mainline_length < 2 {
        bail!("a metered highway needs at least two interchanges, got {mainline_length}");
    }
    let mut system = TransportSubsystem::new(settings);

    let spacing = 500.0;
    let mut mainline = Vec::with_capacity(mainline_length);
    for i in 0..mainline_length {
        mainline.push(
            system
                .graph
                .add_intersection(Position::new(i as f32 * spacing, 0.0)),
        );
    }

    let mut mainline_segments = Vec::new();
    for pair in mainline.windows(2) {
        mainline_segments.push(system.graph.add_segment(
            pair[0],
            pair[1],
            RoadClass::Highway,
            &[HIGHWAY_LANE, HIGHWAY_LANE],
        )?);
    }

    // On-ramp merging at the second interchange.
    let merge = mainline[1];
    let ramp_origin = system.graph.add_intersection(Position::new(spacing, 300.0));
    let ramp = system
        .graph
        .add_segment(ramp_origin, merge, RoadClass::Arterial, &[CITY_LANE])?;

    let upstream = mainline_segments[0];
    let controller = SignalController::ramp_meter(merge, ramp, upstream, &system.settings);
    system.add_signal(controller)?;

    Ok((system, mainline, ramp_origin))
}
