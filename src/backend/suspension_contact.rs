// ==============================================================================
// suspension_contact.rs — RAYCAST SUSPENSION + CONTACT PATCH KINEMATICS
// ------------------------------------------------------------------------------
// Per-wheel state owned by the rapier adapter, and the measurement pass that
// turns one ray cast into a SuspensionContact:
// - geometry: hit point, suspension length, compression (= jounce)
// - kinematics: point velocity at the contact (linvel + ω×r)
// - wheel basis (forward/side) on the ground plane, steered about chassis up
// - slip components (v_long, v_lat)
//
// Chassis frame is +X right, +Y forward, +Z up. The ray starts at the
// suspension top (mount + up * rest_length) and runs rest_length + radius
// down the chassis -Z axis.
//
// Notes:
// - This file does NOT apply impulses. wheel_impulses() only computes them.
// - Ground normal is taken as chassis up; slopes come in through the chassis
//   orientation only.
// ==============================================================================

use std::f32::consts::TAU;

use nalgebra::{Translation3, Unit, UnitQuaternion};
use rapier3d::prelude::*;

use crate::backend::{WheelControl, WheelDesc, WheelFlags};
use crate::suspension::TireForceCurve;

const MIN_ROLLING_SPEED: Real = 0.5; // m/s, floor for slip-angle denominator
const MAX_NORMAL_FORCE: Real = 200_000.0; // N

#[derive(Clone, Debug)]
pub struct RaycastWheel {
    pub chassis: RigidBodyHandle,
    pub mount: Point<Real>, // wheel centre at rest, chassis local
    pub radius: Real,
    pub width: Real,
    pub mass: Real,

    pub rest_length: Real,
    pub travel: Real,
    pub stiffness: Real, // spring constant
    pub damping: Real,   // damper constant

    pub curve: TireForceCurve,
    pub restitution: Real,
    pub flags: WheelFlags,
    pub control: WheelControl,

    // runtime
    pub suspension_length: Real,
    pub rotation: Real,
    pub spin_rate: Real,
    pub grounded: bool,
}

impl RaycastWheel {
    pub fn new(chassis: RigidBodyHandle, desc: &WheelDesc) -> Self {
        Self {
            chassis,
            mount: Point::from(desc.mount),
            radius: desc.radius.max(1e-3),
            width: desc.width,
            mass: desc.mass,
            rest_length: desc.suspension.rest_length,
            travel: desc.suspension.travel,
            stiffness: desc.suspension.spring_rate,
            damping: desc.suspension.damper,
            curve: TireForceCurve::new(&desc.tire),
            restitution: desc.tire.restitution,
            flags: desc.flags,
            control: WheelControl::default(),
            suspension_length: desc.suspension.rest_length,
            rotation: 0.0,
            spin_rate: 0.0,
            grounded: false,
        }
    }

    /// Compression from rest, clamped to travel.
    pub fn jounce(&self) -> Real {
        (self.rest_length - self.suspension_length).clamp(0.0, self.travel.max(0.0))
    }

    /// Steer angle actually applied; unsteered wheels ignore the input.
    pub fn steer_angle(&self) -> Real {
        if self.flags.steered { self.control.steer_angle } else { 0.0 }
    }

    /// Wheel pose in the chassis frame: raised by jounce, steered, spun about X.
    pub fn local_pose(&self) -> Isometry<Real> {
        let centre = self.mount.coords + Vector::z() * self.jounce();
        let steer = UnitQuaternion::from_axis_angle(&Vector::z_axis(), -self.steer_angle());
        let spin = UnitQuaternion::from_axis_angle(&Vector::x_axis(), -self.rotation);
        Isometry::from_parts(Translation3::from(centre), steer * spin)
    }

    pub fn advance_spin(&mut self, v_long: Real, dt: Real) {
        if self.grounded {
            self.spin_rate = v_long / self.radius;
        } else {
            // free wheel: motor spins it up, brake stops it
            let inertia = (0.5 * self.mass * self.radius * self.radius).max(1e-3);
            let powered = if self.flags.powered { self.control.motor_torque } else { 0.0 };
            self.spin_rate += powered / inertia * dt;
            if self.flags.braked && self.control.brake_torque > 0.0 {
                self.spin_rate = 0.0;
            }
        }
        self.rotation = (self.rotation + self.spin_rate * dt).rem_euclid(TAU);
    }
}

#[derive(Clone, Debug)]
pub struct SuspensionContact {
    // geometry
    pub hit_point: Point<Real>,
    pub ground_normal: Vector<Real>,

    // suspension state
    pub suspension_length: Real,
    pub compression: Real,       // unclamped, may exceed travel
    pub suspension_vel: Real,    // + extending, - compressing

    // kinematics
    pub point_vel: Vector<Real>,

    // wheel basis (world)
    pub forward: Vector<Real>,
    pub side: Vector<Real>,

    // slip
    pub v_long: Real,
    pub v_lat: Real,
}

pub(crate) fn compute_suspension_force(compression: Real, suspension_vel: Real, k: Real, c: Real) -> Real {
    let spring = k * compression;
    let damper = -c * suspension_vel;
    (spring + damper).clamp(0.0, MAX_NORMAL_FORCE)
}

pub fn build_suspension_contact(
    wheel: &RaycastWheel,
    body: &RigidBody,
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    filter: QueryFilter,
) -> Option<SuspensionContact> {
    let pos = body.position();
    let rot = pos.rotation;
    let up = rot * Vector::z();
    let down = -up;

    let origin = pos * (wheel.mount + Vector::z() * wheel.rest_length);
    let max_dist = wheel.rest_length + wheel.radius;
    let ray = Ray::new(origin, down);

    let (_collider, toi) = query.cast_ray(bodies, colliders, &ray, max_dist, true, filter)?;

    let hit_point = origin + down * toi;
    let suspension_length = (toi - wheel.radius).max(0.0);
    let compression = wheel.rest_length - suspension_length;

    let com = body.center_of_mass();
    let r = hit_point.coords - com.coords;
    let point_vel = body.linvel() + body.angvel().cross(&r);
    let suspension_vel = point_vel.dot(&up);

    // steered forward, projected on the ground plane
    let steer = UnitQuaternion::from_axis_angle(&Unit::new_normalize(up), -wheel.steer_angle());
    let chassis_forward = rot * Vector::y();
    let forward = {
        let f = steer * chassis_forward;
        let v = f - up * f.dot(&up);
        if v.norm() > 1e-6 { v.normalize() } else { chassis_forward }
    };
    let side = forward.cross(&up);

    Some(SuspensionContact {
        hit_point,
        ground_normal: up,
        suspension_length,
        compression,
        suspension_vel,
        point_vel,
        forward,
        side,
        v_long: point_vel.dot(&forward),
        v_lat: point_vel.dot(&side),
    })
}

/// Impulses for one grounded wheel over `dt`: suspension, bump stop, drive,
/// brake and lateral grip. `mass_share` is the chassis mass carried by this
/// wheel and bounds the friction impulses so they never reverse the motion.
pub fn wheel_impulses(
    wheel: &RaycastWheel,
    contact: &SuspensionContact,
    mass_share: Real,
    dt: Real,
) -> Vec<(Vector<Real>, Point<Real>)> {
    let mut out = Vec::new();
    let n = contact.ground_normal;
    let at = contact.hit_point;

    // --- suspension ---
    let compression = contact.compression.clamp(0.0, wheel.travel.max(0.0));
    let normal_force = compute_suspension_force(compression, contact.suspension_vel, wheel.stiffness, wheel.damping);
    if normal_force > 0.0 {
        out.push((n * (normal_force * dt), at));
    }

    // --- bump stop ---
    if contact.compression > wheel.travel && contact.suspension_vel < 0.0 {
        let j = -(1.0 + wheel.restitution) * contact.suspension_vel * mass_share;
        out.push((n * j, at));
    }

    if normal_force <= 0.0 {
        return out;
    }

    let grip = wheel.curve.peak() * normal_force;

    // --- longitudinal: drive + brake ---
    let mut f_long = 0.0;
    if wheel.flags.powered {
        f_long += wheel.control.motor_torque / wheel.radius;
    }
    if wheel.flags.braked && wheel.control.brake_torque > 0.0 {
        let stop = contact.v_long.abs() * mass_share / dt;
        let brake = (wheel.control.brake_torque / wheel.radius).min(stop);
        f_long -= contact.v_long.signum() * brake;
    }
    let f_long = f_long.clamp(-grip, grip);
    if f_long != 0.0 {
        out.push((contact.forward * (f_long * dt), at));
    }

    // --- lateral grip ---
    let slip = contact.v_lat.atan2(contact.v_long.abs().max(MIN_ROLLING_SPEED));
    let mu = wheel.curve.evaluate(slip);
    let cancel = contact.v_lat.abs() * mass_share / dt;
    let f_lat = (mu * normal_force).min(cancel);
    if f_lat > 0.0 {
        out.push((contact.side * (-contact.v_lat.signum() * f_lat * dt), at));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SuspensionDesc;
    use crate::suspension::TireTuning;
    use approx::assert_relative_eq;

    fn wheel() -> RaycastWheel {
        let desc = WheelDesc {
            mount: nalgebra::Vector3::new(0.8, 1.2, -0.3),
            radius: 0.35,
            width: 0.25,
            mass: 25.0,
            suspension: SuspensionDesc { rest_length: 0.35, travel: 0.2, spring_rate: 20_000.0, damper: 2_000.0 },
            tire: TireTuning::default(),
            flags: WheelFlags { powered: true, steered: true, braked: true },
        };
        RaycastWheel::new(RigidBodyHandle::invalid(), &desc)
    }

    #[test]
    fn suspension_force_never_pulls() {
        assert_eq!(compute_suspension_force(0.0, 5.0, 20_000.0, 2_000.0), 0.0);
        assert_relative_eq!(compute_suspension_force(0.1, 0.0, 20_000.0, 2_000.0), 2_000.0);
        assert_relative_eq!(compute_suspension_force(0.1, -0.5, 20_000.0, 2_000.0), 3_000.0);
    }

    #[test]
    fn jounce_follows_suspension_length() {
        let mut w = wheel();
        assert_eq!(w.jounce(), 0.0);
        w.suspension_length = 0.25;
        assert_relative_eq!(w.jounce(), 0.1, epsilon = 1e-6);
        w.suspension_length = 0.0;
        assert_relative_eq!(w.jounce(), 0.2);
    }

    #[test]
    fn unsteered_wheel_ignores_steer_input() {
        let mut w = wheel();
        w.control.steer_angle = 0.4;
        assert_eq!(w.steer_angle(), 0.4);
        w.flags.steered = false;
        assert_eq!(w.steer_angle(), 0.0);
    }

    #[test]
    fn grounded_spin_matches_rolling_speed() {
        let mut w = wheel();
        w.grounded = true;
        w.advance_spin(3.5, 0.1);
        assert_relative_eq!(w.spin_rate, 10.0, epsilon = 1e-4);
        assert_relative_eq!(w.rotation, 1.0, epsilon = 1e-4);
    }
}
