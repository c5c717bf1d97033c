//! Core shared types for `suspension` (engine-agnostic).
// suspension/types.rs
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axle {
    Front,
    Rear,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Lateral sign in the chassis frame (+X is right).
    pub fn sign(&self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

impl fmt::Display for Axle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axle::Front => write!(f, "front"),
            Axle::Rear => write!(f, "rear"),
        }
    }
}

/// Wheel radius as configured: a fixed value, or "derive it from the wheel model".
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WheelRadius {
    Fixed(f32),
    Auto,
}

impl WheelRadius {
    pub fn resolve(&self, from_bounds: impl FnOnce() -> f32) -> f32 {
        match *self {
            WheelRadius::Fixed(r) => r,
            WheelRadius::Auto => from_bounds(),
        }
    }
}

impl From<Option<f32>> for WheelRadius {
    fn from(value: Option<f32>) -> Self {
        value.map_or(WheelRadius::Auto, WheelRadius::Fixed)
    }
}

// ============================================
// Geometry
// ============================================

/// Where one wheel sits relative to the chassis origin, before jounce and
/// track adjustments are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelPlacement {
    pub offset: Vector3<f32>, // chassis local, +X right, +Y forward, +Z up
    pub width: f32,           // m
    pub radius: f32,          // m (already resolved from WheelRadius)
    pub axle: Axle,
    pub side: Side,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VehicleChassisSpec {
    pub mass: f32,                        // kg
    pub center_of_mass: Vector3<f32>,     // offset from chassis origin
    pub gravity: f32,                     // m/s², magnitude
}

// ============================================
// Tuning
// ============================================

/// Tire force-curve control points plus contact properties.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireTuning {
    pub extremum_slip: f32,
    pub extremum_value: f32,
    pub asymptote_slip: f32,
    pub asymptote_value: f32,
    pub stiffness_factor: f32,
    pub restitution: f32,
}

impl Default for TireTuning {
    fn default() -> Self {
        Self {
            extremum_slip: 0.2,
            extremum_value: 1.0,
            asymptote_slip: 0.6,
            asymptote_value: 0.75,
            stiffness_factor: 1.0,
            restitution: 0.1,
        }
    }
}

/// Per-axle suspension tuning. `rest_length` is expected to exceed `travel`;
/// that is a modelling contract and is not checked.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionTuning {
    pub travel: f32,           // m
    pub rest_length: f32,      // m
    pub spring_frequency: f32, // Hz
    pub damping_factor: f32,   // ratio to critical
    pub tire: TireTuning,
}

impl Default for SuspensionTuning {
    fn default() -> Self {
        Self {
            travel: 0.3,
            rest_length: 0.45,
            spring_frequency: 1.1,
            damping_factor: 0.4,
            tire: TireTuning::default(),
        }
    }
}

/// Spring/damper values derived once per axle at build time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DerivedSuspensionParameters {
    pub spring_rate: f32, // N/m
    pub damper: f32,      // N·s/m
    pub jounce: f32,      // m, static sag
}

impl DerivedSuspensionParameters {
    /// Shares spring and damper across `count` axles carrying the same load.
    /// Jounce is unchanged since the load is shared in the same proportion.
    pub fn shared_across(&self, count: u32) -> Self {
        let n = count.max(1) as f32;
        Self {
            spring_rate: self.spring_rate / n,
            damper: self.damper / n,
            jounce: self.jounce,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AxleSuspension {
    pub front: DerivedSuspensionParameters,
    pub rear: DerivedSuspensionParameters,
    pub front_lever_arm: f32,
    pub rear_lever_arm: f32,
    pub wheelbase: f32,
}

impl AxleSuspension {
    pub fn for_axle(&self, axle: Axle) -> &DerivedSuspensionParameters {
        match axle {
            Axle::Front => &self.front,
            Axle::Rear => &self.rear,
        }
    }
}
