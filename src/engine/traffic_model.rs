//! Car-following dynamics
//!
//! An IDM-style model: acceleration falls off as speed approaches the
//! desired speed and as the gap to the leader shrinks below the safe gap.
//! All inputs come from the immutable pre-tick snapshot, so the update for
//! one vehicle can never observe another vehicle's same-tick movement.

use super::settings::Settings;

/// Smallest gap used in the interaction term, to keep the math finite when
/// vehicles are bumper to bumper
const GAP_EPSILON: f32 = 0.1;

/// One car-following step: returns (new_speed, distance advanced)
pub fn follow_step(
    speed: f32,
    desired_speed: f32,
    gap: f32,
    leading_speed: f32,
    settings: &Settings,
) -> (f32, f32) {
    let desired = desired_speed.max(0.1);
    let gap = gap.max(GAP_EPSILON);

    let safe = safe_gap(speed, leading_speed, settings);
    let free_term = (speed / desired).powi(4);
    let interaction_term = (safe / gap).powi(2);
    let accel = settings.a_max * (1.0 - free_term - interaction_term);

    let new_speed = (speed + accel * settings.dt).clamp(0.0, desired);
    (new_speed, new_speed * settings.dt)
}

/// Dynamic safe gap to the leader
///
/// Standstill gap plus the headway distance plus a braking term that grows
/// with the closing speed.
pub fn safe_gap(speed: f32, leading_speed: f32, settings: &Settings) -> f32 {
    let braking = speed * (speed - leading_speed)
        / (2.0 * (settings.a_max * settings.b_comf).sqrt());
    (settings.min_gap + speed * settings.headway + braking).max(settings.min_gap)
}

/// Desired speed on a lane, shaped by the segment's congestion index
pub fn desired_speed(lane_limit: f32, congestion: f32, settings: &Settings) -> f32 {
    let capped = lane_limit.min(settings.route_speed_cap);
    capped * (1.0 - settings.congestion_speed_factor * congestion.clamp(0.0, 1.0))
}
