#![allow(dead_code)]

use std::collections::HashMap;

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

use wheeled_vehicle_physics::backend::{
    BodyHandle, ChassisDesc, CollisionGroup, GroupedRayHits, PhysicsBackend, RayHit, WheelControl, WheelDesc,
    WheelHandle, WheelState,
};
use wheeled_vehicle_physics::geometry::{Aabb, NodeId, NodeKind};
use wheeled_vehicle_physics::scene::SceneTree;
use wheeled_vehicle_physics::PhysicsError;

pub const WHEEL_RADIUS: f32 = 0.34;
pub const FRONT_Y: f32 = 1.2;
pub const REAR_Y: f32 = -1.4;
pub const SECOND_REAR_Y: f32 = -2.4;
pub const HALF_TRACK: f32 = 0.8;
pub const WHEEL_Z: f32 = -0.3;

#[derive(Debug, Clone)]
pub struct MockBody {
    pub desc: ChassisDesc,
    pub linvel: Vector3<f32>,
    pub angvel: Vector3<f32>,
    pub finalized: bool,
}

#[derive(Debug, Clone)]
pub struct MockWheel {
    pub chassis: BodyHandle,
    pub desc: WheelDesc,
    pub control: WheelControl,
    pub controls_received: usize,
    pub rotation: f32,
    pub jounce: f32,
}

/// Bookkeeping backend: tracks live handles and the last control per wheel.
#[derive(Debug, Default)]
pub struct MockPhysics {
    pub bodies: HashMap<BodyHandle, MockBody>,
    pub wheels: HashMap<WheelHandle, MockWheel>,
    pub created_bodies: usize,
    pub created_wheels: usize,
    pub fail_wheel_after: Option<usize>, // refuse wheel creation once this many exist
    pub ground: Option<f32>,             // z of a ground plane for cast_ray
    next_id: u64,
}

impl MockPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn live_wheels(&self) -> usize {
        self.wheels.len()
    }

    pub fn wheel(&self, handle: WheelHandle) -> &MockWheel {
        &self.wheels[&handle]
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl PhysicsBackend for MockPhysics {
    fn gravity(&self) -> f32 {
        9.81
    }

    fn create_chassis(&mut self, desc: &ChassisDesc) -> Result<BodyHandle, PhysicsError> {
        let handle = BodyHandle(self.next());
        self.bodies.insert(
            handle,
            MockBody { desc: desc.clone(), linvel: Vector3::zeros(), angvel: Vector3::zeros(), finalized: false },
        );
        self.created_bodies += 1;
        Ok(handle)
    }

    fn release_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        if self.wheels.values().any(|w| w.chassis == body) {
            panic!("body {:?} released while wheels still reference it", body);
        }
        self.bodies.remove(&body).map(|_| ()).ok_or(PhysicsError::UnknownBody(body))
    }

    fn create_wheel(&mut self, chassis: BodyHandle, desc: &WheelDesc) -> Result<WheelHandle, PhysicsError> {
        if !self.bodies.contains_key(&chassis) {
            return Err(PhysicsError::UnknownBody(chassis));
        }
        if self.fail_wheel_after.is_some_and(|n| self.wheels.len() >= n) {
            return Err(PhysicsError::CreationFailed("wheel"));
        }
        let handle = WheelHandle(self.next());
        self.wheels.insert(
            handle,
            MockWheel {
                chassis,
                desc: desc.clone(),
                control: WheelControl::default(),
                controls_received: 0,
                rotation: 0.0,
                jounce: 0.0,
            },
        );
        self.created_wheels += 1;
        Ok(handle)
    }

    fn release_wheel(&mut self, wheel: WheelHandle) -> Result<(), PhysicsError> {
        self.wheels.remove(&wheel).map(|_| ()).ok_or(PhysicsError::UnknownWheel(wheel))
    }

    fn finalize_vehicle(&mut self, chassis: BodyHandle) -> Result<(), PhysicsError> {
        let body = self.bodies.get_mut(&chassis).ok_or(PhysicsError::UnknownBody(chassis))?;
        body.finalized = true;
        Ok(())
    }

    fn control_wheel(&mut self, wheel: WheelHandle, control: &WheelControl) -> Result<(), PhysicsError> {
        let w = self.wheels.get_mut(&wheel).ok_or(PhysicsError::UnknownWheel(wheel))?;
        w.control = *control;
        w.controls_received += 1;
        Ok(())
    }

    fn wheel_state(&self, wheel: WheelHandle) -> Option<WheelState> {
        let w = self.wheels.get(&wheel)?;
        let body = self.bodies.get(&w.chassis)?;
        let local = Isometry3::from_parts(Translation3::from(w.desc.mount), UnitQuaternion::identity());
        Some(WheelState {
            transform: body.desc.transform * local,
            rotation: w.rotation,
            steer_angle: w.control.steer_angle,
            jounce: w.jounce,
            grounded: true,
        })
    }

    fn body_transform(&self, body: BodyHandle) -> Option<Isometry3<f32>> {
        self.bodies.get(&body).map(|b| b.desc.transform)
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.bodies.get(&body).map(|b| b.linvel)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.bodies.get(&body).map(|b| b.angvel)
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) -> Result<(), PhysicsError> {
        self.bodies.get_mut(&body).ok_or(PhysicsError::UnknownBody(body))?.linvel = velocity;
        Ok(())
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) -> Result<(), PhysicsError> {
        self.bodies.get_mut(&body).ok_or(PhysicsError::UnknownBody(body))?.angvel = velocity;
        Ok(())
    }

    fn apply_force(&mut self, body: BodyHandle, _force: Vector3<f32>, _at: Option<Point3<f32>>) -> Result<(), PhysicsError> {
        self.bodies.get(&body).map(|_| ()).ok_or(PhysicsError::UnknownBody(body))
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vector3<f32>, _at: Option<Point3<f32>>) -> Result<(), PhysicsError> {
        let b = self.bodies.get_mut(&body).ok_or(PhysicsError::UnknownBody(body))?;
        b.linvel += impulse / b.desc.mass;
        Ok(())
    }

    fn cast_ray(&self, origin: Point3<f32>, direction: Vector3<f32>, max_distance: f32, mask: CollisionGroup) -> GroupedRayHits {
        let mut hits = GroupedRayHits::new();
        let Some(z) = self.ground else { return hits };
        if !mask.intersects(CollisionGroup::GROUND) || direction.z >= 0.0 {
            return hits;
        }
        let dir = direction.normalize();
        let distance = (z - origin.z) / dir.z;
        if distance >= 0.0 && distance <= max_distance {
            hits.entry(CollisionGroup::GROUND).or_default().push(RayHit {
                group: CollisionGroup::GROUND,
                point: origin + dir * distance,
                normal: Vector3::z(),
                distance,
            });
        }
        hits
    }
}

pub struct VehicleScene {
    pub scene: SceneTree,
    pub root: NodeId,
    pub body: NodeId,
    pub wheels: Vec<NodeId>, // FL, FR, RL, RR, [RL2, RR2]
}

pub const FOUR_WHEEL_NAMES: [&str; 4] = ["dof_wheel_lt_01", "dof_wheel_rt_01", "dof_wheel_lt_02", "dof_wheel_rt_02"];
pub const SECOND_REAR_NAMES: [&str; 2] = ["dof_wheel_lt_03", "dof_wheel_rt_03"];

fn wheel_bounds() -> Aabb {
    Aabb::new(
        Point3::new(-0.1, -WHEEL_RADIUS, -WHEEL_RADIUS),
        Point3::new(0.1, WHEEL_RADIUS, WHEEL_RADIUS),
    )
}

/// Root → body → wheels, with the body node offset from the root so the
/// extractor has an origin offset to remove.
pub fn vehicle_scene(six_wheels: bool, kind: NodeKind) -> VehicleScene {
    let mut scene = SceneTree::new();
    let root = scene.add_node("vehicle", None, NodeKind::Matrix, Isometry3::identity(), None);
    let body = scene.add_node(
        "body",
        Some(root),
        NodeKind::Matrix,
        Isometry3::translation(0.0, 0.0, 0.5),
        Some(Aabb::new(Point3::new(-0.9, -2.2, -0.3), Point3::new(0.9, 2.2, 0.3))),
    );

    let mut layout = vec![
        (FOUR_WHEEL_NAMES[0], -HALF_TRACK, FRONT_Y),
        (FOUR_WHEEL_NAMES[1], HALF_TRACK, FRONT_Y),
        (FOUR_WHEEL_NAMES[2], -HALF_TRACK, REAR_Y),
        (FOUR_WHEEL_NAMES[3], HALF_TRACK, REAR_Y),
    ];
    if six_wheels {
        layout.push((SECOND_REAR_NAMES[0], -HALF_TRACK, SECOND_REAR_Y));
        layout.push((SECOND_REAR_NAMES[1], HALF_TRACK, SECOND_REAR_Y));
    }

    let wheels = layout
        .into_iter()
        .map(|(name, x, y)| scene.add_node(name, Some(body), kind, Isometry3::translation(x, y, WHEEL_Z), Some(wheel_bounds())))
        .collect();

    VehicleScene { scene, root, body, wheels }
}
