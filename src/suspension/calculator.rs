// ==============================================================================
// calculator.rs — SUSPENSION STATICS (SPRING RATE / DAMPER / SAG)
// ------------------------------------------------------------------------------
// Pure math, no engine types:
//
//   lumped_mass  = opposite_lever / wheelbase * 0.5 * mass
//   spring_rate  = lumped_mass * (2π f)²
//   damper       = ζ * 2 * sqrt(spring_rate * lumped_mass)
//   axle_load    = 0.5 * mass * g * opposite_lever / wheelbase
//   jounce       = max(0, rest_length - axle_load / spring_rate)
//
// The lever arm used for an axle is always the OPPOSITE axle's: the front
// springs carry the share of weight set by the rear lever arm and vice versa.
//
// Degenerate inputs are patched rather than rejected:
// - an axle with no wheels mirrors the other axle's lever arm
// - a wheelbase <= 0 becomes 1.0
// Both keep the numbers finite so a bad vehicle asset still simulates.
// ==============================================================================

use std::f32::consts::PI;

use log::warn;
use nalgebra::Vector3;

use crate::suspension::types::{
    Axle, AxleSuspension, DerivedSuspensionParameters, SuspensionTuning, VehicleChassisSpec,
    WheelPlacement,
};

pub const FALLBACK_WHEELBASE: f32 = 1.0;

/// (front_lever_arm, rear_lever_arm): mean |Y| distance from the centre of
/// mass to the wheels of each axle.
pub fn compute_lever_arms(placements: &[WheelPlacement], center_of_mass: &Vector3<f32>) -> (f32, f32) {
    let mean_arm = |axle: Axle| -> Option<f32> {
        let (sum, count) = placements
            .iter()
            .filter(|p| p.axle == axle)
            .fold((0.0_f32, 0usize), |(s, n), p| {
                (s + (p.offset.y - center_of_mass.y).abs(), n + 1)
            });
        (count > 0).then(|| sum / count as f32)
    };

    match (mean_arm(Axle::Front), mean_arm(Axle::Rear)) {
        (Some(front), Some(rear)) => (front, rear),
        (Some(front), None) => (front, front),
        (None, Some(rear)) => (rear, rear),
        (None, None) => (0.0, 0.0),
    }
}

pub fn compute_wheelbase(front_lever_arm: f32, rear_lever_arm: f32) -> f32 {
    let wheelbase = front_lever_arm + rear_lever_arm;
    if wheelbase > 0.0 { wheelbase } else { FALLBACK_WHEELBASE }
}

#[inline]
fn lumped_mass(vehicle_mass: f32, wheelbase: f32, opposite_lever_arm: f32) -> f32 {
    opposite_lever_arm / wheelbase * 0.5 * vehicle_mass
}

pub fn compute_spring_rate(spring_freq_hz: f32, vehicle_mass: f32, wheelbase: f32, opposite_lever_arm: f32) -> f32 {
    let omega = 2.0 * PI * spring_freq_hz;
    lumped_mass(vehicle_mass, wheelbase, opposite_lever_arm) * omega * omega
}

pub fn compute_damper_coefficient(
    damping_factor: f32,
    vehicle_mass: f32,
    spring_rate: f32,
    wheelbase: f32,
    opposite_lever_arm: f32,
) -> f32 {
    let m = lumped_mass(vehicle_mass, wheelbase, opposite_lever_arm);
    damping_factor * 2.0 * (spring_rate * m).max(0.0).sqrt()
}

/// Static load on one wheel of the axle whose opposite lever arm is given.
pub fn compute_axle_load(vehicle_mass: f32, gravity: f32, wheelbase: f32, opposite_lever_arm: f32) -> f32 {
    0.5 * vehicle_mass * gravity * opposite_lever_arm / wheelbase
}

pub fn compute_static_jounce(axle_load: f32, spring_rate: f32, rest_length: f32) -> f32 {
    if spring_rate <= 0.0 {
        return 0.0;
    }
    let deflection = axle_load / spring_rate;
    (rest_length - deflection).max(0.0)
}

/// Spring, damper and sag for one axle.
pub fn derive_axle(
    tuning: &SuspensionTuning,
    chassis: &VehicleChassisSpec,
    wheelbase: f32,
    opposite_lever_arm: f32,
) -> DerivedSuspensionParameters {
    let spring_rate = compute_spring_rate(tuning.spring_frequency, chassis.mass, wheelbase, opposite_lever_arm);
    let damper = compute_damper_coefficient(tuning.damping_factor, chassis.mass, spring_rate, wheelbase, opposite_lever_arm);
    let load = compute_axle_load(chassis.mass, chassis.gravity, wheelbase, opposite_lever_arm);
    let jounce = compute_static_jounce(load, spring_rate, tuning.rest_length);

    DerivedSuspensionParameters { spring_rate, damper, jounce }
}

/// Full per-axle derivation. With `dual_rear` the rear spring and damper are
/// halved: two rear axles share the rear load.
pub fn derive_suspension(
    front: &SuspensionTuning,
    rear: &SuspensionTuning,
    chassis: &VehicleChassisSpec,
    placements: &[WheelPlacement],
    dual_rear: bool,
) -> AxleSuspension {
    let front_count = placements.iter().filter(|p| p.axle == Axle::Front).count();
    let rear_count = placements.len() - front_count;
    if front_count == 0 || rear_count == 0 {
        warn!(
            "vehicle has {} front / {} rear wheels; mirroring lever arm from the populated axle",
            front_count, rear_count
        );
    }

    let (front_lever_arm, rear_lever_arm) = compute_lever_arms(placements, &chassis.center_of_mass);
    if front_lever_arm + rear_lever_arm <= 0.0 {
        warn!(
            "non-positive wheelbase ({} + {}); check wheel placement, using {}",
            front_lever_arm, rear_lever_arm, FALLBACK_WHEELBASE
        );
    }
    let wheelbase = compute_wheelbase(front_lever_arm, rear_lever_arm);

    let front_params = derive_axle(front, chassis, wheelbase, rear_lever_arm);
    let mut rear_params = derive_axle(rear, chassis, wheelbase, front_lever_arm);
    if dual_rear {
        rear_params = rear_params.shared_across(2);
    }

    AxleSuspension {
        front: front_params,
        rear: rear_params,
        front_lever_arm,
        rear_lever_arm,
        wheelbase,
    }
}
