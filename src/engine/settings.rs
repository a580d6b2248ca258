//! Tunable parameters for the transport engine
//!
//! Everything a scenario might want to tune lives here so that the engine
//! itself carries no hardcoded behavioral constants. Defaults are calibrated
//! for a city grid with segment lengths in the low hundreds of meters and a
//! one-second tick.

/// One row of the ramp-metering decision table.
///
/// The table is scanned in order; the first bucket whose `max_occupancy`
/// bound is not exceeded by the mainline occupancy ratio wins. Durations are
/// in seconds and must stay positive so phase rollover always terminates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampBucket {
    /// Upper bound (inclusive) on mainline occupancy ratio for this bucket
    pub max_occupancy: f32,
    /// Green phase duration while in this bucket
    pub green_duration: f32,
    /// Metered (red) phase duration while in this bucket
    pub red_duration: f32,
}

/// Engine configuration consumed through the tick context
#[derive(Debug, Clone)]
pub struct Settings {
    /// Simulated seconds per tick
    pub dt: f32,
    /// Expected vehicle spawns per tick
    pub spawn_rate: f32,
    /// Physical vehicle length in meters, used for gap computation
    pub vehicle_length: f32,
    /// Network-wide speed cap in m/s, applied on top of lane limits
    pub route_speed_cap: f32,

    // Car-following parameters
    /// Maximum acceleration (m/s^2)
    pub a_max: f32,
    /// Comfortable deceleration (m/s^2)
    pub b_comf: f32,
    /// Minimum standstill gap to the leader (m)
    pub min_gap: f32,
    /// Desired time headway to the leader (s)
    pub headway: f32,

    // Congestion curve breakpoints (occupancy ratio)
    /// Below this ratio the congestion index is zero
    pub free_threshold: f32,
    /// Above this ratio the steep ramp toward saturation begins
    pub heavy_threshold: f32,
    /// Congestion index reached at `heavy_threshold`
    pub mid_congestion: f32,

    /// Multiplier applied to a segment's congestion index in edge costs
    pub congestion_penalty_factor: f32,
    /// Fraction of desired speed shed at full congestion
    pub congestion_speed_factor: f32,
    /// Minimum per-segment congestion change that invalidates cached routes
    pub materiality_threshold: f32,
    /// Congestion index above which a segment is reported as congested
    pub congested_report_threshold: f32,

    // Re-route retry policy
    /// Maximum replan attempts before a stranded vehicle is despawned
    pub max_route_retries: u32,

    // Adaptive signal bounds
    /// Lower clamp on an adaptive phase duration (s)
    pub adaptive_min_duration: f32,
    /// Upper clamp on an adaptive phase duration (s)
    pub adaptive_max_duration: f32,
    /// Extra green time granted per queued vehicle on an approach (s)
    pub seconds_per_queued_vehicle: f32,

    /// Ramp-metering decision table, scanned in order of `max_occupancy`
    pub ramp_buckets: Vec<RampBucket>,

    // Policy flags
    /// When false, adaptive controllers run their configured fixed durations
    pub adaptive_signals_enabled: bool,
    /// When false, ramp meters stay green
    pub ramp_metering_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dt: 1.0,
            spawn_rate: 1.0,
            vehicle_length: 4.5,
            route_speed_cap: 33.0,
            a_max: 2.5,
            b_comf: 2.0,
            min_gap: 2.0,
            headway: 1.5,
            free_threshold: 0.5,
            heavy_threshold: 0.8,
            mid_congestion: 0.6,
            congestion_penalty_factor: 2.0,
            congestion_speed_factor: 0.3,
            materiality_threshold: 0.1,
            congested_report_threshold: 0.7,
            max_route_retries: 4,
            adaptive_min_duration: 4.0,
            adaptive_max_duration: 30.0,
            seconds_per_queued_vehicle: 2.0,
            ramp_buckets: vec![
                RampBucket {
                    max_occupancy: 0.5,
                    green_duration: 8.0,
                    red_duration: 1.0,
                },
                RampBucket {
                    max_occupancy: 0.7,
                    green_duration: 4.0,
                    red_duration: 2.0,
                },
                RampBucket {
                    max_occupancy: 0.85,
                    green_duration: 2.0,
                    red_duration: 4.0,
                },
                RampBucket {
                    max_occupancy: f32::INFINITY,
                    green_duration: 1.0,
                    red_duration: 8.0,
                },
            ],
            adaptive_signals_enabled: true,
            ramp_metering_enabled: true,
        }
    }
}

impl Settings {
    /// Resolve the ramp bucket for a mainline occupancy ratio
    pub fn ramp_bucket_for(&self, occupancy_ratio: f32) -> RampBucket {
        for bucket in &self.ramp_buckets {
            if occupancy_ratio <= bucket.max_occupancy {
                return *bucket;
            }
        }
        // The table should end with an unbounded bucket; fall back to the
        // last entry if a scenario misconfigures it.
        *self
            .ramp_buckets
            .last()
            .unwrap_or(&RampBucket {
                max_occupancy: f32::INFINITY,
                green_duration: 1.0,
                red_duration: 8.0,
            })
    }
}
