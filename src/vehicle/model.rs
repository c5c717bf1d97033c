// ==============================================================================
// vehicle/model.rs — WHEELED VEHICLE PHYSICS MODEL
// ------------------------------------------------------------------------------
// Owns one chassis body and its wheels inside a PhysicsBackend.
//
// Lifecycle:
//   create_chassis → add_wheel × N → finalize_initialization → control (per tick)
//   clean_up  releases wheels only
//   destroy   clean_up + chassis
//
// Wheels are kept in the order they were added (FL, FR, RL, RR, [RL2, RR2]),
// which is the index order of the accessors.
// ==============================================================================

use log::{debug, error, info, warn};
use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use super::wheel::{VisualNode, Wheel};
use crate::backend::{BodyHandle, ChassisDesc, PhysicsBackend, WheelControl, WheelDesc, WheelState};
use crate::error::{PhysicsError, VehicleError};
use crate::geometry::{Hpr, SceneGraph};
use crate::suspension::{Axle, Side};

pub const MPS_TO_MPH: f32 = 2.236_936_3;

/// Full-scale values for the normalized control inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlLimits {
    pub max_steer_angle: f32,  // rad at steer = ±1
    pub max_motor_torque: f32, // N·m at accel = ±1
    pub max_brake_torque: f32, // N·m at brake = 1
}

impl Default for ControlLimits {
    fn default() -> Self {
        Self {
            max_steer_angle: 0.6,
            max_motor_torque: 1200.0,
            max_brake_torque: 3000.0,
        }
    }
}

#[derive(Debug)]
pub struct WheeledVehicle {
    chassis: Option<BodyHandle>,
    body_offset: Isometry3<f32>, // chassis node relative to the model root
    wheels: Vec<Wheel>,
    finalized: bool,
    limits: ControlLimits,
}

impl Default for WheeledVehicle {
    fn default() -> Self {
        Self::new(ControlLimits::default())
    }
}

impl WheeledVehicle {
    pub fn new(limits: ControlLimits) -> Self {
        Self {
            chassis: None,
            body_offset: Isometry3::identity(),
            wheels: Vec::new(),
            finalized: false,
            limits,
        }
    }

    pub fn chassis(&self) -> Option<BodyHandle> {
        self.chassis
    }

    pub fn wheels(&self) -> &[Wheel] {
        &self.wheels
    }

    pub fn wheel_count(&self) -> usize {
        self.wheels.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn limits(&self) -> &ControlLimits {
        &self.limits
    }

    pub fn set_limits(&mut self, limits: ControlLimits) {
        self.limits = limits;
    }

    /// Creates the chassis body. Any vehicle this model already owns is
    /// destroyed first.
    pub fn create_chassis(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        desc: &ChassisDesc,
        body_offset: Isometry3<f32>,
    ) -> Result<BodyHandle, VehicleError> {
        self.destroy(physics);

        let handle = physics.create_chassis(desc)?;
        self.chassis = Some(handle);
        self.body_offset = body_offset;
        debug!("chassis {:?} created ({} kg)", handle, desc.mass);
        Ok(handle)
    }

    /// Attaches one wheel; returns its index.
    pub fn add_wheel(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        desc: &WheelDesc,
        axle: Axle,
        side: Side,
        visual: Option<VisualNode>,
    ) -> Result<usize, VehicleError> {
        let chassis = self.chassis.ok_or(VehicleError::NotCreated)?;
        let handle = physics.create_wheel(chassis, desc)?;
        self.wheels.push(Wheel::new(handle, desc.flags, axle, side, visual));
        debug!("wheel {:?} added: {} {:?} at {:?}", handle, axle, side, desc.mount);
        Ok(self.wheels.len() - 1)
    }

    pub fn finalize_initialization(&mut self, physics: &mut dyn PhysicsBackend) -> Result<(), VehicleError> {
        let chassis = self.chassis.ok_or(VehicleError::NotCreated)?;
        physics.finalize_vehicle(chassis)?;
        self.finalized = true;
        info!("vehicle {:?} finalized with {} wheels", chassis, self.wheels.len());
        Ok(())
    }

    /// Pushes normalized inputs to every wheel. Nothing is carried over from
    /// the previous call: each wheel gets a full control record.
    pub fn control(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        acceleration: f32,
        steering: f32,
        brakes: f32,
    ) -> Result<(), VehicleError> {
        let motor = acceleration.clamp(-1.0, 1.0) * self.limits.max_motor_torque;
        let steer = steering.clamp(-1.0, 1.0) * self.limits.max_steer_angle;
        let brake = brakes.clamp(0.0, 1.0) * self.limits.max_brake_torque;

        for wheel in &mut self.wheels {
            let control = WheelControl {
                motor_torque: if wheel.flags.powered { motor } else { 0.0 },
                brake_torque: if wheel.flags.braked { brake } else { 0.0 },
                steer_angle: if wheel.flags.steered { steer } else { 0.0 },
            };
            physics.control_wheel(wheel.handle, &control)?;
            wheel.steer_angle = control.steer_angle;
        }
        Ok(())
    }

    /// Reads every wheel back from the engine and poses its visual node
    /// relative to the node's parent. Returns how many wheels were posed.
    pub fn update_wheel_transforms(&mut self, physics: &dyn PhysicsBackend, scene: &mut dyn SceneGraph) -> usize {
        let Some(chassis) = self.chassis else { return 0 };
        let Some(body_world) = physics.body_transform(chassis) else {
            warn!("chassis {:?} vanished from the physics world", chassis);
            return 0;
        };
        let root_world = body_world * self.body_offset.inverse();

        let mut posed = 0;
        let mut skipped = Vec::new();
        for (index, wheel) in self.wheels.iter_mut().enumerate() {
            let Some(state) = physics.wheel_state(wheel.handle) else {
                skipped.push(index);
                continue;
            };
            wheel.rotation = state.rotation;
            wheel.jounce = state.jounce;
            wheel.steer_angle = state.steer_angle;

            let Some(visual) = wheel.visual else { continue };
            let Some(parent_root) = visual.parent().and_then(|p| scene.root_transform(p)) else {
                skipped.push(index);
                continue;
            };

            let relative = (root_world * parent_root).inverse() * state.transform;
            match visual {
                VisualNode::Dof { node, .. } => {
                    scene.set_dof_transform(node, Hpr::from_rotation(&relative.rotation), relative.translation.vector)
                }
                VisualNode::Matrix { node, .. } => scene.set_local_matrix(node, relative.to_homogeneous()),
            }
            posed += 1;
        }

        if !skipped.is_empty() {
            warn!("wheel transforms skipped for wheels {:?}: missing wheel state or visual parent", skipped);
        }
        posed
    }

    /// Chassis speed in miles per hour; 0 when there is no chassis.
    pub fn mph(&self, physics: &dyn PhysicsBackend) -> f32 {
        self.chassis
            .and_then(|c| physics.linear_velocity(c))
            .map_or(0.0, |v| v.norm() * MPS_TO_MPH)
    }

    pub fn wheel_state(&self, physics: &dyn PhysicsBackend, index: usize) -> Result<WheelState, VehicleError> {
        let wheel = self.wheels.get(index).ok_or(VehicleError::WheelIndex(index))?;
        physics
            .wheel_state(wheel.handle)
            .ok_or(VehicleError::Physics(PhysicsError::UnknownWheel(wheel.handle)))
    }

    pub fn wheel_rotation(&self, physics: &dyn PhysicsBackend, index: usize) -> Result<f32, VehicleError> {
        Ok(self.wheel_state(physics, index)?.rotation)
    }

    pub fn wheel_jounce(&self, physics: &dyn PhysicsBackend, index: usize) -> Result<f32, VehicleError> {
        Ok(self.wheel_state(physics, index)?.jounce)
    }

    /// Releases every wheel handle. The chassis stays alive.
    pub fn clean_up(&mut self, physics: &mut dyn PhysicsBackend) {
        for wheel in self.wheels.drain(..) {
            if let Err(e) = physics.release_wheel(wheel.handle) {
                error!("failed to release wheel {:?}: {}", wheel.handle, e);
            }
        }
        self.finalized = false;
    }

    /// Releases wheels, then the chassis.
    pub fn destroy(&mut self, physics: &mut dyn PhysicsBackend) {
        self.clean_up(physics);
        if let Some(chassis) = self.chassis.take() {
            match physics.release_body(chassis) {
                Ok(()) => debug!("chassis {:?} released", chassis),
                Err(e) => error!("failed to release chassis {:?}: {}", chassis, e),
            }
        }
    }
}

impl Drop for WheeledVehicle {
    fn drop(&mut self) {
        if self.chassis.is_some() || !self.wheels.is_empty() {
            warn!(
                "vehicle dropped with live physics handles (chassis {:?}, {} wheels); call destroy first",
                self.chassis,
                self.wheels.len()
            );
        }
    }
}
