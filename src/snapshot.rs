// src/snapshot.rs
//
// Serialisable view of one running vehicle, built the same way every tick
// and handed to whoever logs or ships it.

use serde::Serialize;

use crate::backend::PhysicsBackend;
use crate::suspension::{Axle, Side};
use crate::vehicle::{Authority, BuildStage, WheeledVehicle};

#[derive(Debug, Clone, Serialize)]
pub struct WheelSnapshot {
    pub axle: Axle,
    pub side: Side,
    pub rotation: f32,
    pub jounce: f32,
    pub steer_angle: f32,
    pub grounded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub stage: BuildStage,
    pub authority: Authority,
    pub mph: f32,
    pub position: Option<[f32; 3]>,
    pub wheels: Vec<WheelSnapshot>,
}

impl VehicleSnapshot {
    pub fn capture(
        stage: BuildStage,
        authority: Authority,
        vehicle: &WheeledVehicle,
        physics: &dyn PhysicsBackend,
    ) -> Self {
        let position = vehicle
            .chassis()
            .and_then(|c| physics.body_transform(c))
            .map(|iso| {
                let t = iso.translation.vector;
                [t.x, t.y, t.z]
            });

        let wheels = vehicle
            .wheels()
            .iter()
            .map(|w| {
                let state = physics.wheel_state(w.handle);
                WheelSnapshot {
                    axle: w.axle,
                    side: w.side,
                    rotation: state.map_or(w.rotation, |s| s.rotation),
                    jounce: state.map_or(w.jounce, |s| s.jounce),
                    steer_angle: state.map_or(w.steer_angle, |s| s.steer_angle),
                    grounded: state.is_some_and(|s| s.grounded),
                }
            })
            .collect();

        Self {
            stage,
            authority,
            mph: vehicle.mph(physics),
            position,
            wheels,
        }
    }
}
