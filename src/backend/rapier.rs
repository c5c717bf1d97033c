// src/backend/rapier.rs
//
// PhysicsBackend over a rapier3d world. Wheels are ray-cast: each one is a
// RaycastWheel hanging off a dynamic chassis body, measured and pushed with
// impulses every step before the rapier pipeline runs.

use std::collections::HashMap;

use log::{debug, info, warn};
use nalgebra::{Isometry3, Point3, Vector3};
use rapier3d::prelude::*;

use super::suspension_contact::{build_suspension_contact, wheel_impulses, RaycastWheel};
use super::{
    BodyHandle, ChassisDesc, CollisionGroup, GroupedRayHits, PhysicsBackend, RayHit, WheelControl, WheelDesc,
    WheelHandle, WheelState,
};
use crate::error::PhysicsError;

const GROUP_GROUND: Group = Group::from_bits_truncate(CollisionGroup::GROUND.0);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(CollisionGroup::CHASSIS.0);
const GROUP_OBSTACLE: Group = Group::from_bits_truncate(CollisionGroup::OBSTACLE.0);

const WORLD_LIMIT: Real = 1_000.0;

#[derive(Debug, Default)]
struct RaycastVehicle {
    wheels: Vec<WheelHandle>,
    finalized: bool,
}

pub struct RapierBackend {
    pub gravity: Vector<Real>, // gravity vector
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline, // for raycasting
    wheels: HashMap<WheelHandle, RaycastWheel>,
    vehicles: HashMap<RigidBodyHandle, RaycastVehicle>, // chassis → wheels
    next_wheel: u64,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn body_id(handle: RigidBodyHandle) -> BodyHandle {
    let (index, generation) = handle.into_raw_parts();
    BodyHandle(((generation as u64) << 32) | index as u64)
}

fn rigid_body(handle: BodyHandle) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(handle.0 as u32, (handle.0 >> 32) as u32)
}

impl RapierBackend {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, 0.0, -9.81],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            wheels: HashMap::new(),
            vehicles: HashMap::new(),
            next_wheel: 1,
        }
    }

    /// Static ground slab whose top face is the z = 0 plane.
    pub fn add_ground(&mut self, half_x: Real, half_y: Real) -> BodyHandle {
        let ground_rb = RigidBodyBuilder::fixed().translation(vector![0.0, 0.0, -0.5]).build();
        let handle = self.bodies.insert(ground_rb);

        let collider = ColliderBuilder::cuboid(half_x, half_y, 0.5)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.0)
            .restitution(0.0)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        info!("ground inserted: {}x{} m, bodies = {}, colliders = {}", half_x * 2.0, half_y * 2.0, self.bodies.len(), self.colliders.len());
        body_id(handle)
    }

    /// Fixed box in the OBSTACLE category, e.g. a ramp or kerb.
    pub fn add_obstacle(&mut self, pose: Isometry3<Real>, half_extents: Vector3<Real>) -> BodyHandle {
        let handle = self.bodies.insert(RigidBodyBuilder::fixed().position(pose).build());
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(GROUP_OBSTACLE, GROUP_CHASSIS))
            .friction(1.0)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        body_id(handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn wheel_count(&self) -> usize {
        self.wheels.len()
    }

    fn body(&self, body: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        self.bodies.get(rigid_body(body)).ok_or(PhysicsError::UnknownBody(body))
    }

    fn body_mut(&mut self, body: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies.get_mut(rigid_body(body)).ok_or(PhysicsError::UnknownBody(body))
    }

    pub fn step(&mut self, dt: Real) {
        // 1) Suspension + tire impulses for every committed vehicle
        self.query_pipeline.update(&self.colliders);
        self.apply_wheel_contacts(dt);

        // 2) Step physics
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // 3) Forces last one step; keep bodies out of insane coordinates
        for (handle, body) in self.bodies.iter_mut() {
            body.reset_forces(false);

            let pos = *body.translation();
            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > WORLD_LIMIT
                || pos.y.abs() > WORLD_LIMIT
                || pos.z.abs() > WORLD_LIMIT;

            if bad {
                let reset = vector![0.0, 0.0, 2.0];
                body.set_translation(reset, true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                warn!("reset runaway body {:?} back to {:?}", body_id(handle), reset);
            }
        }
    }

    fn apply_wheel_contacts(&mut self, dt: Real) {
        for (&chassis, vehicle) in self.vehicles.iter() {
            if !vehicle.finalized || vehicle.wheels.is_empty() {
                continue;
            }
            let Some(body) = self.bodies.get(chassis) else { continue };

            let filter = QueryFilter::default()
                .exclude_rigid_body(chassis)
                .groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_OBSTACLE));
            let mass_share = body.mass() / vehicle.wheels.len() as Real;

            // collect impulses here, apply later
            let mut impulses: Vec<(Vector<Real>, Point<Real>)> = Vec::new();

            for handle in &vehicle.wheels {
                let Some(wheel) = self.wheels.get_mut(handle) else { continue };

                match build_suspension_contact(wheel, body, &self.query_pipeline, &self.bodies, &self.colliders, filter) {
                    Some(contact) => {
                        impulses.extend(wheel_impulses(wheel, &contact, mass_share, dt));
                        wheel.suspension_length = contact.suspension_length;
                        wheel.grounded = true;
                        wheel.advance_spin(contact.v_long, dt);
                    }
                    None => {
                        wheel.suspension_length = wheel.rest_length;
                        wheel.grounded = false;
                        wheel.advance_spin(0.0, dt);
                    }
                }
            }

            if let Some(body) = self.bodies.get_mut(chassis) {
                for (impulse, at) in impulses {
                    body.apply_impulse_at_point(impulse, at, true);
                }
            }
        }
    }
}

impl PhysicsBackend for RapierBackend {
    fn gravity(&self) -> f32 {
        self.gravity.norm()
    }

    fn create_chassis(&mut self, desc: &ChassisDesc) -> Result<BodyHandle, PhysicsError> {
        if !desc.mass.is_finite() || desc.mass <= 0.0 {
            return Err(PhysicsError::CreationFailed("chassis mass must be positive"));
        }
        let h = desc.half_extents.map(|e| e.max(0.05));

        let rb = RigidBodyBuilder::dynamic()
            .position(desc.transform)
            .linear_damping(0.05)
            .angular_damping(0.5)
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(rb);

        // box inertia about the requested centre of mass
        let m = desc.mass;
        let inertia = vector![
            m / 3.0 * (h.y * h.y + h.z * h.z),
            m / 3.0 * (h.x * h.x + h.z * h.z),
            m / 3.0 * (h.x * h.x + h.y * h.y)
        ];
        let collider = ColliderBuilder::cuboid(h.x, h.y, h.z)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_OBSTACLE))
            .mass_properties(MassProperties::new(Point::from(desc.center_of_mass), m, inertia))
            .friction(0.0)
            .restitution(0.0)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        self.vehicles.insert(handle, RaycastVehicle::default());
        debug!("chassis created: {:?}, mass {} kg", body_id(handle), m);
        Ok(body_id(handle))
    }

    fn release_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        let handle = rigid_body(body);
        if let Some(vehicle) = self.vehicles.remove(&handle) {
            if !vehicle.wheels.is_empty() {
                warn!("releasing {:?} with {} wheels still attached", body, vehicle.wheels.len());
                for w in vehicle.wheels {
                    self.wheels.remove(&w);
                }
            }
        }
        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            )
            .map(|_| ())
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn create_wheel(&mut self, chassis: BodyHandle, desc: &WheelDesc) -> Result<WheelHandle, PhysicsError> {
        let handle = rigid_body(chassis);
        if self.bodies.get(handle).is_none() {
            return Err(PhysicsError::UnknownBody(chassis));
        }
        let vehicle = self.vehicles.get_mut(&handle).ok_or(PhysicsError::UnknownBody(chassis))?;
        if vehicle.finalized {
            return Err(PhysicsError::AlreadyFinalized(chassis));
        }
        if !desc.radius.is_finite() || desc.radius <= 0.0 {
            return Err(PhysicsError::CreationFailed("wheel radius must be positive"));
        }

        let id = WheelHandle(self.next_wheel);
        self.next_wheel += 1;
        vehicle.wheels.push(id);
        self.wheels.insert(id, RaycastWheel::new(handle, desc));
        Ok(id)
    }

    fn release_wheel(&mut self, wheel: WheelHandle) -> Result<(), PhysicsError> {
        let removed = self.wheels.remove(&wheel).ok_or(PhysicsError::UnknownWheel(wheel))?;
        if let Some(vehicle) = self.vehicles.get_mut(&removed.chassis) {
            vehicle.wheels.retain(|w| *w != wheel);
            // a vehicle that lost its wheels can be re-assembled
            if vehicle.wheels.is_empty() {
                vehicle.finalized = false;
            }
        }
        Ok(())
    }

    fn finalize_vehicle(&mut self, chassis: BodyHandle) -> Result<(), PhysicsError> {
        let vehicle = self
            .vehicles
            .get_mut(&rigid_body(chassis))
            .ok_or(PhysicsError::UnknownBody(chassis))?;
        if vehicle.finalized {
            return Err(PhysicsError::AlreadyFinalized(chassis));
        }
        vehicle.finalized = true;
        info!("vehicle {:?} committed with {} wheels", chassis, vehicle.wheels.len());
        Ok(())
    }

    fn control_wheel(&mut self, wheel: WheelHandle, control: &WheelControl) -> Result<(), PhysicsError> {
        let w = self.wheels.get_mut(&wheel).ok_or(PhysicsError::UnknownWheel(wheel))?;
        w.control = *control;
        Ok(())
    }

    fn wheel_state(&self, wheel: WheelHandle) -> Option<WheelState> {
        let w = self.wheels.get(&wheel)?;
        let body = self.bodies.get(w.chassis)?;
        Some(WheelState {
            transform: body.position() * w.local_pose(),
            rotation: w.rotation,
            steer_angle: w.steer_angle(),
            jounce: w.jounce(),
            grounded: w.grounded,
        })
    }

    fn body_transform(&self, body: BodyHandle) -> Option<Isometry3<f32>> {
        self.body(body).ok().map(|b| *b.position())
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.body(body).ok().map(|b| *b.linvel())
    }

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.body(body).ok().map(|b| *b.angvel())
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_linvel(velocity, true);
        Ok(())
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_angvel(velocity, true);
        Ok(())
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vector3<f32>, at: Option<Point3<f32>>) -> Result<(), PhysicsError> {
        let rb = self.body_mut(body)?;
        match at {
            Some(point) => rb.add_force_at_point(force, point, true),
            None => rb.add_force(force, true),
        }
        Ok(())
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vector3<f32>, at: Option<Point3<f32>>) -> Result<(), PhysicsError> {
        let rb = self.body_mut(body)?;
        match at {
            Some(point) => rb.apply_impulse_at_point(impulse, point, true),
            None => rb.apply_impulse(impulse, true),
        }
        Ok(())
    }

    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        mask: CollisionGroup,
    ) -> GroupedRayHits {
        let mut grouped = GroupedRayHits::new();
        let Some(dir) = direction.try_normalize(1e-6) else {
            return grouped;
        };
        let ray = Ray::new(origin, dir);
        let filter = QueryFilter::default().groups(InteractionGroups::new(Group::ALL, Group::from_bits_truncate(mask.0)));

        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            filter,
            |handle, intersection| {
                let Some(collider) = self.colliders.get(handle) else { return true };
                let Some(distance) = collider.shape().cast_ray(collider.position(), &ray, max_distance, true) else {
                    return true;
                };
                let group = CollisionGroup(collider.collision_groups().memberships.bits());
                grouped.entry(group).or_default().push(RayHit {
                    group,
                    point: ray.point_at(distance),
                    normal: intersection.normal,
                    distance,
                });
                true
            },
        );

        for hits in grouped.values_mut() {
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SuspensionDesc, WheelFlags};
    use crate::suspension::TireTuning;

    fn wheel_desc() -> WheelDesc {
        WheelDesc {
            mount: Vector3::new(-0.8, 1.3, -0.4),
            radius: 0.34,
            width: 0.22,
            mass: 25.0,
            suspension: SuspensionDesc { rest_length: 0.45, travel: 0.3, spring_rate: 16_000.0, damper: 1_900.0 },
            tire: TireTuning::default(),
            flags: WheelFlags::default(),
        }
    }

    #[test]
    fn handle_mapping_round_trips() {
        let h = RigidBodyHandle::from_raw_parts(7, 3);
        assert_eq!(rigid_body(body_id(h)), h);
    }

    #[test]
    fn wheels_rejected_after_finalize() {
        let mut backend = RapierBackend::new();
        let chassis = backend
            .create_chassis(&ChassisDesc {
                transform: Isometry3::translation(0.0, 0.0, 1.0),
                mass: 1000.0,
                center_of_mass: Vector3::zeros(),
                half_extents: Vector3::new(0.9, 2.0, 0.4),
            })
            .unwrap();
        backend.finalize_vehicle(chassis).unwrap();
        assert!(matches!(backend.finalize_vehicle(chassis), Err(PhysicsError::AlreadyFinalized(_))));
        assert!(matches!(
            backend.create_wheel(chassis, &wheel_desc()),
            Err(PhysicsError::AlreadyFinalized(_))
        ));
        assert_eq!(backend.wheel_count(), 0);
        backend.release_body(chassis).unwrap();
        assert_eq!(backend.body_count(), 0);
        assert!(matches!(backend.release_body(chassis), Err(PhysicsError::UnknownBody(_))));
    }
}
