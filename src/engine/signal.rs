//! Signal controllers: fixed-time, adaptive, and highway ramp meters
//!
//! All three share one phase state machine and one `advance` entry point;
//! they differ only in how the upcoming phase duration is decided. Adaptive
//! and ramp-metering decisions read exclusively from the previous tick's
//! aggregates, never same-tick data.

use std::collections::BTreeMap;

use super::settings::Settings;
use super::types::{IntersectionId, SegmentId, SignalId};

/// Previous-tick aggregates consumed by adaptive controllers and ramp meters
#[derive(Debug, Clone, Default)]
pub struct SignalInputs {
    /// Stationary vehicles queued on each segment
    pub queue_by_segment: BTreeMap<SegmentId, u32>,
    /// Occupancy ratio (vehicles / capacity) per segment
    pub occupancy_ratio: BTreeMap<SegmentId, f32>,
}

impl SignalInputs {
    pub fn queue(&self, segment: SegmentId) -> u32 {
        self.queue_by_segment.get(&segment).copied().unwrap_or(0)
    }

    pub fn occupancy(&self, segment: SegmentId) -> f32 {
        self.occupancy_ratio.get(&segment).copied().unwrap_or(0.0)
    }
}

/// One signal phase: the approach segments allowed to discharge, and how
/// long the phase runs
#[derive(Debug, Clone)]
pub struct Phase {
    pub permitted: Vec<SegmentId>,
    pub duration: f32,
    /// Duration as configured, kept so adaptive controllers can fall back to
    /// fixed timing when the policy flag is off
    pub base_duration: f32,
}

impl Phase {
    pub fn new(permitted: Vec<SegmentId>, duration: f32) -> Self {
        Self {
            permitted,
            duration,
            base_duration: duration,
        }
    }
}

/// Controller behavior variant
#[derive(Debug, Clone)]
pub enum SignalKind {
    /// City signal with constant configured durations
    FixedTime,
    /// City signal that sizes the upcoming phase from last tick's queue
    /// surplus over the busiest competing phase
    Adaptive,
    /// Highway on-ramp meter: phase 0 is ramp green, phase 1 is metered red.
    /// Only the ramp approach is metered; mainline movements always flow.
    /// The bucket table maps the mainline's prior-tick occupancy to durations.
    RampMeter { mainline: SegmentId, ramp: SegmentId },
}

/// Per-intersection phase state machine
#[derive(Debug, Clone)]
pub struct SignalController {
    pub intersection: IntersectionId,
    pub phases: Vec<Phase>,
    pub current: usize,
    pub elapsed: f32,
    pub kind: SignalKind,
}

impl SignalController {
    pub fn fixed_time(intersection: IntersectionId, phases: Vec<Phase>) -> Self {
        Self {
            intersection,
            phases,
            current: 0,
            elapsed: 0.0,
            kind: SignalKind::FixedTime,
        }
    }

    pub fn adaptive(intersection: IntersectionId, phases: Vec<Phase>) -> Self {
        Self {
            intersection,
            phases,
            current: 0,
            elapsed: 0.0,
            kind: SignalKind::Adaptive,
        }
    }

    /// Ramp meter for an on-ramp merging into `mainline`
    pub fn ramp_meter(
        intersection: IntersectionId,
        ramp: SegmentId,
        mainline: SegmentId,
        settings: &Settings,
    ) -> Self {
        let bucket = settings.ramp_bucket_for(0.0);
        Self {
            intersection,
            phases: vec![
                Phase::new(vec![ramp], bucket.green_duration),
                Phase::new(Vec::new(), bucket.red_duration),
            ],
            current: 0,
            elapsed: 0.0,
            kind: SignalKind::RampMeter { mainline, ramp },
        }
    }

    /// Advance the phase clock by `dt`, rolling (and wrapping) phases whose
    /// duration has elapsed. Upcoming phase durations are decided here, from
    /// previous-tick inputs only.
    pub fn advance(&mut self, dt: f32, inputs: &SignalInputs, settings: &Settings) {
        if self.phases.is_empty() {
            return;
        }
        self.elapsed += dt;
        // Bounded by the phase count per tick so a zero duration cannot spin.
        for _ in 0..self.phases.len().max(1) {
            let duration = self.phases[self.current].duration.max(dt);
            if self.elapsed < duration {
                break;
            }
            self.elapsed -= duration;
            self.current = (self.current + 1) % self.phases.len();
            self.decide_upcoming_duration(inputs, settings);
        }
    }

    fn decide_upcoming_duration(&mut self, inputs: &SignalInputs, settings: &Settings) {
        match &self.kind {
            SignalKind::FixedTime => {}
            SignalKind::Adaptive => {
                if !settings.adaptive_signals_enabled {
                    self.phases[self.current].duration = self.phases[self.current].base_duration;
                    return;
                }
                // Extra green is granted only for demand in excess of the
                // busiest competing phase. Balanced load runs short cycles;
                // a one-sided queue shifts green toward it.
                let queue_of = |phase: &Phase| -> u32 {
                    phase
                        .permitted
                        .iter()
                        .map(|segment| inputs.queue(*segment))
                        .sum()
                };
                let upcoming = queue_of(&self.phases[self.current]);
                let competing = self
                    .phases
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != self.current)
                    .map(|(_, phase)| queue_of(phase))
                    .max()
                    .unwrap_or(0);
                let surplus = upcoming.saturating_sub(competing);
                let duration = settings.adaptive_min_duration
                    + settings.seconds_per_queued_vehicle * surplus as f32;
                self.phases[self.current].duration = duration
                    .clamp(settings.adaptive_min_duration, settings.adaptive_max_duration);
            }
            SignalKind::RampMeter { mainline, .. } => {
                let bucket = settings.ramp_bucket_for(inputs.occupancy(*mainline));
                self.phases[0].duration = bucket.green_duration;
                self.phases[1].duration = bucket.red_duration;
            }
        }
    }

    /// Whether a vehicle arriving from `from` may cross this tick
    pub fn permits(&self, from: SegmentId, settings: &Settings) -> bool {
        if let SignalKind::RampMeter { ramp, .. } = self.kind {
            if !settings.ramp_metering_enabled || from != ramp {
                return true;
            }
        }
        self.phases
            .get(self.current)
            .map(|phase| phase.permitted.contains(&from))
            .unwrap_or(true)
    }
}

/// Dense arena of live controllers plus an intersection lookup
#[derive(Default)]
pub struct SignalBank {
    controllers: Vec<SignalController>,
    by_intersection: BTreeMap<IntersectionId, SignalId>,
}

impl SignalBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller, returning its id for the graph reference
    pub fn add(&mut self, controller: SignalController) -> SignalId {
        let id = SignalId(self.controllers.len() as u32);
        self.by_intersection.insert(controller.intersection, id);
        self.controllers.push(controller);
        id
    }

    /// Advance every controller, in id order
    pub fn advance_all(&mut self, dt: f32, inputs: &SignalInputs, settings: &Settings) {
        for controller in &mut self.controllers {
            controller.advance(dt, inputs, settings);
        }
    }

    /// Whether the movement out of `from` through `intersection` is
    /// permitted this tick; unsignalized intersections always permit
    pub fn permits(
        &self,
        intersection: IntersectionId,
        from: SegmentId,
        settings: &Settings,
    ) -> bool {
        match self.by_intersection.get(&intersection) {
            Some(id) => self.controllers[id.0 as usize].permits(from, settings),
            None => true,
        }
    }

    pub fn controller(&self, id: SignalId) -> Option<&SignalController> {
        self.controllers.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}
