// src/config.rs
//
// Vehicle tuning as a serde struct. Every field has a default, so a tuning
// file only needs the values it changes.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::suspension::{Axle, SuspensionTuning};
use crate::vehicle::{ControlLimits, WheelNodes};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuningConfig {
    pub mass: f32,                        // kg
    pub center_of_mass_offset: [f32; 3],  // from chassis origin
    pub wheel_mass: f32,                  // kg, per wheel
    pub wheel_radius: Option<f32>,        // None = from wheel bounds
    pub wheel_width: Option<f32>,         // None = from wheel bounds

    pub front: SuspensionTuning,
    pub rear: SuspensionTuning,

    pub track_adjustment: f32, // m, pushes wheels outward
    pub four_wheel_drive: bool,
    pub front_brakes: bool,

    pub max_steer_angle: f32,  // rad
    pub max_motor_torque: f32, // N·m
    pub max_brake_torque: f32, // N·m

    pub wheel_nodes: WheelNodes,
}

impl Default for VehicleTuningConfig {
    fn default() -> Self {
        let limits = ControlLimits::default();
        Self {
            mass: 1500.0,
            center_of_mass_offset: [0.0, 0.0, 0.0],
            wheel_mass: 25.0,
            wheel_radius: None,
            wheel_width: None,
            front: SuspensionTuning::default(),
            rear: SuspensionTuning::default(),
            track_adjustment: 0.0,
            four_wheel_drive: false,
            front_brakes: true,
            max_steer_angle: limits.max_steer_angle,
            max_motor_torque: limits.max_motor_torque,
            max_brake_torque: limits.max_brake_torque,
            wheel_nodes: WheelNodes::default(),
        }
    }
}

impl VehicleTuningConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn center_of_mass(&self) -> Vector3<f32> {
        Vector3::from(self.center_of_mass_offset)
    }

    pub fn axle_tuning(&self, axle: Axle) -> &SuspensionTuning {
        match axle {
            Axle::Front => &self.front,
            Axle::Rear => &self.rear,
        }
    }

    pub fn limits(&self) -> ControlLimits {
        ControlLimits {
            max_steer_angle: self.max_steer_angle,
            max_motor_torque: self.max_motor_torque,
            max_brake_torque: self.max_brake_torque,
        }
    }
}
