//! Congestion model: per-segment saturation and the network-wide index
//!
//! Occupancy ratios are mapped through a piecewise curve whose breakpoints
//! come from `Settings`, so scenarios can be retuned without touching the
//! engine. The network index is the vehicle-count-weighted mean so that
//! empty segments do not dilute the signal.

use std::collections::BTreeMap;

use anyhow::Result;

use super::road_graph::RoadGraph;
use super::settings::Settings;
use super::types::SegmentId;

/// Piecewise congestion curve over the occupancy ratio
///
/// Zero below `free_threshold`, linear up to `mid_congestion` at
/// `heavy_threshold`, then a steeper linear ramp that reaches 1.0 at full
/// occupancy. Clamped to [0, 1] and monotone in occupancy.
pub fn congestion_curve(occupancy_ratio: f32, settings: &Settings) -> f32 {
    let ratio = occupancy_ratio.max(0.0);
    let free = settings.free_threshold;
    let heavy = settings.heavy_threshold;
    let mid = settings.mid_congestion;

    let value = if ratio <= free {
        0.0
    } else if ratio <= heavy {
        mid * (ratio - free) / (heavy - free).max(f32::EPSILON)
    } else {
        mid + (1.0 - mid) * (ratio - heavy) / (1.0 - heavy).max(f32::EPSILON)
    };
    value.clamp(0.0, 1.0)
}

/// Per-segment congestion state, recomputed once per tick from the tick-start
/// occupancy snapshot
#[derive(Default)]
pub struct CongestionModel {
    per_segment: BTreeMap<SegmentId, f32>,
    network_index: f32,
    /// Values at the last epoch bump, used for the materiality check
    epoch_baseline: BTreeMap<SegmentId, f32>,
}

impl CongestionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute all per-segment values and the network index
    ///
    /// Returns true when any segment moved by at least the materiality
    /// threshold since the last bump, i.e. when cached routes are stale
    /// enough to be worth invalidating.
    pub fn recompute(
        &mut self,
        graph: &RoadGraph,
        occupancy: &BTreeMap<SegmentId, u32>,
        settings: &Settings,
    ) -> Result<bool> {
        self.per_segment.clear();

        let mut weighted_sum = 0.0f32;
        let mut vehicle_total = 0u32;

        for segment_id in graph.segment_ids() {
            let count = occupancy.get(&segment_id).copied().unwrap_or(0);
            let capacity = graph.segment_capacity(segment_id)?.max(1);
            let value = congestion_curve(count as f32 / capacity as f32, settings);
            self.per_segment.insert(segment_id, value);

            weighted_sum += value * count as f32;
            vehicle_total += count;
        }

        self.network_index = if vehicle_total > 0 {
            weighted_sum / vehicle_total as f32
        } else {
            0.0
        };

        let material = self.per_segment.iter().any(|(id, value)| {
            let baseline = self.epoch_baseline.get(id).copied().unwrap_or(0.0);
            (value - baseline).abs() >= settings.materiality_threshold
        });
        if material {
            self.epoch_baseline = self.per_segment.clone();
        }
        Ok(material)
    }

    /// Congestion index of a segment; zero for segments not yet seen
    pub fn segment(&self, id: SegmentId) -> f32 {
        self.per_segment.get(&id).copied().unwrap_or(0.0)
    }

    /// Vehicle-count-weighted network congestion index
    pub fn network_index(&self) -> f32 {
        self.network_index
    }

    /// Per-segment values above zero, ascending by segment id
    pub fn nonzero_segments(&self) -> Vec<(SegmentId, f32)> {
        self.per_segment
            .iter()
            .filter(|(_, v)| **v > 0.0)
            .map(|(id, v)| (*id, *v))
            .collect()
    }

    /// Segment ids whose congestion exceeds the report threshold
    pub fn congested_segments(&self, settings: &Settings) -> Vec<SegmentId> {
        self.per_segment
            .iter()
            .filter(|(_, v)| **v >= settings.congested_report_threshold)
            .map(|(id, _)| *id)
            .collect()
    }
}
