// ==============================================================================
// backend — PHYSICS SDK BOUNDARY
// ------------------------------------------------------------------------------
// PhysicsBackend is the only way the vehicle code touches a physics engine.
// It is passed explicitly into every call that needs it, so there is no
// process-wide physics world and tests can swap in a mock.
//
// Capabilities:
// - rigid bodies: create chassis, release, velocities, forces, impulses
// - wheels: create with suspension/tire params, release, per-wheel control,
//   read back pose / spin / steer / jounce
// - vehicle commit: finalize_vehicle
// - queries: ray cast with hits grouped by collision category
//
// Handles are opaque u64 newtypes; each adapter maps them to its own ids.
// ==============================================================================

pub mod rapier;
pub mod suspension_contact;

use std::collections::HashMap;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::error::PhysicsError;
use crate::suspension::TireTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WheelHandle(pub u64);

/// Collision category bits, as used for ray-cast grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionGroup(pub u32);

impl CollisionGroup {
    pub const GROUND: CollisionGroup = CollisionGroup(0b0001);
    pub const CHASSIS: CollisionGroup = CollisionGroup(0b0010);
    pub const OBSTACLE: CollisionGroup = CollisionGroup(0b0100);
    pub const ALL: CollisionGroup = CollisionGroup(u32::MAX);

    pub fn intersects(&self, other: CollisionGroup) -> bool {
        self.0 & other.0 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelFlags {
    pub powered: bool,
    pub steered: bool,
    pub braked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChassisDesc {
    pub transform: Isometry3<f32>,      // world
    pub mass: f32,                      // kg
    pub center_of_mass: Vector3<f32>,   // chassis local
    pub half_extents: Vector3<f32>,     // collision box
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuspensionDesc {
    pub rest_length: f32, // m
    pub travel: f32,      // m
    pub spring_rate: f32, // N/m
    pub damper: f32,      // N·s/m
}

#[derive(Debug, Clone, PartialEq)]
pub struct WheelDesc {
    pub mount: Vector3<f32>, // wheel centre at rest, chassis local
    pub radius: f32,
    pub width: f32,
    pub mass: f32,
    pub suspension: SuspensionDesc,
    pub tire: TireTuning,
    pub flags: WheelFlags,
}

/// What the vehicle pushes to one wheel each tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelControl {
    pub motor_torque: f32, // N·m, signed
    pub brake_torque: f32, // N·m, >= 0
    pub steer_angle: f32,  // rad, + is right
}

/// What the engine reports back for one wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelState {
    pub transform: Isometry3<f32>, // world pose, spin and steer included
    pub rotation: f32,             // accumulated spin angle, rad
    pub steer_angle: f32,          // rad
    pub jounce: f32,               // m of compression from rest
    pub grounded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub group: CollisionGroup,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
}

/// Ray hits keyed by the collision category of the object hit, nearest first.
pub type GroupedRayHits = HashMap<CollisionGroup, Vec<RayHit>>;

pub trait PhysicsBackend {
    /// Gravity magnitude, m/s².
    fn gravity(&self) -> f32;

    fn create_chassis(&mut self, desc: &ChassisDesc) -> Result<BodyHandle, PhysicsError>;

    /// Releases a body. Wheels attached to it must be released first.
    fn release_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError>;

    fn create_wheel(&mut self, chassis: BodyHandle, desc: &WheelDesc) -> Result<WheelHandle, PhysicsError>;

    fn release_wheel(&mut self, wheel: WheelHandle) -> Result<(), PhysicsError>;

    /// Commits the assembled chassis + wheels to the simulation.
    fn finalize_vehicle(&mut self, chassis: BodyHandle) -> Result<(), PhysicsError>;

    fn control_wheel(&mut self, wheel: WheelHandle, control: &WheelControl) -> Result<(), PhysicsError>;

    fn wheel_state(&self, wheel: WheelHandle) -> Option<WheelState>;

    fn body_transform(&self, body: BodyHandle) -> Option<Isometry3<f32>>;

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vector3<f32>>;

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vector3<f32>>;

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) -> Result<(), PhysicsError>;

    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) -> Result<(), PhysicsError>;

    /// Force applied over the next step only. `at` is a world point; `None` is the centre of mass.
    fn apply_force(&mut self, body: BodyHandle, force: Vector3<f32>, at: Option<Point3<f32>>) -> Result<(), PhysicsError>;

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vector3<f32>, at: Option<Point3<f32>>) -> Result<(), PhysicsError>;

    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        mask: CollisionGroup,
    ) -> GroupedRayHits;
}
