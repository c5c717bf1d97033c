use std::env;

use log::{error, info, warn};
use nalgebra::{Isometry3, Point3};
use tokio::time::{interval, Duration};

use wheeled_vehicle_physics::geometry::{Aabb, NodeKind};
use wheeled_vehicle_physics::scene::SceneTree;
use wheeled_vehicle_physics::{logging, Authority, FourWheelVehicleBuilder, RapierBackend, VehicleTuningConfig};

const TICK_HZ: u64 = 60;
const RUN_SECONDS: u64 = 8;
const SNAPSHOT_EVERY: u64 = 30;

/// Sedan-sized model: chassis node under a root, four DOF wheel nodes under
/// the chassis using the conventional names so discovery finds them.
fn demo_scene() -> SceneTree {
    let mut scene = SceneTree::new();
    let root = scene.add_node("sedan", None, NodeKind::Matrix, Isometry3::identity(), None);
    let body = scene.add_node(
        "body",
        Some(root),
        NodeKind::Matrix,
        Isometry3::identity(),
        Some(Aabb::new(Point3::new(-0.9, -2.1, -0.2), Point3::new(0.9, 2.1, 0.2))),
    );

    let wheel_bounds = Aabb::new(Point3::new(-0.11, -0.34, -0.34), Point3::new(0.11, 0.34, 0.34));
    for (name, x, y) in [
        ("dof_wheel_lt_01", -0.8, 1.3),
        ("dof_wheel_rt_01", 0.8, 1.3),
        ("dof_wheel_lt_02", -0.8, -1.3),
        ("dof_wheel_rt_02", 0.8, -1.3),
    ] {
        scene.add_node(name, Some(body), NodeKind::Dof, Isometry3::translation(x, y, -0.4), Some(wheel_bounds));
    }
    scene
}

/// (accel, steer, brake) for a given time into the run.
fn drive_script(t: f32) -> (f32, f32, f32) {
    match t {
        t if t < 1.0 => (0.0, 0.0, 0.0), // settle
        t if t < 3.0 => (1.0, 0.0, 0.0),
        t if t < 5.0 => (0.6, 0.4, 0.0),
        _ => (0.0, 0.0, 1.0),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = logging::try_init() {
        eprintln!("logger already initialised: {}", e);
    }
    info!("starting vehicle sim at {} Hz", TICK_HZ);

    let config = match env::args().nth(1) {
        Some(path) => match VehicleTuningConfig::load(&path) {
            Ok(cfg) => {
                info!("tuning loaded from {}", path);
                cfg
            }
            Err(e) => {
                error!("{}: {}", path, e);
                return;
            }
        },
        None => VehicleTuningConfig::default(),
    };

    let mut physics = RapierBackend::new();
    physics.add_ground(500.0, 500.0);
    let mut scene = demo_scene();

    let wheel_nodes = config.wheel_nodes.clone();
    let mut builder = FourWheelVehicleBuilder::new(config, Authority::Local);
    if !builder.create_vehicle(
        &mut physics,
        &scene,
        Isometry3::translation(0.0, 0.0, 1.2),
        "body",
        &wheel_nodes,
    ) {
        error!("no vehicle to drive, exiting");
        return;
    }

    let dt = 1.0 / TICK_HZ as f32;
    let mut ticker = interval(Duration::from_micros(1_000_000 / TICK_HZ));

    for tick in 0..RUN_SECONDS * TICK_HZ {
        ticker.tick().await;

        let (accel, steer, brake) = drive_script(tick as f32 * dt);
        builder.set_controls(accel, steer, brake);
        builder.update_vehicle(&mut physics, dt);

        physics.step(dt);
        builder.update_wheel_transforms(&physics, &mut scene);

        if tick % SNAPSHOT_EVERY == 0 {
            match serde_json::to_string(&builder.snapshot(&physics)) {
                Ok(json) => info!("tick {}: {}", tick, json),
                Err(e) => warn!("snapshot failed: {}", e),
            }
        }
    }

    info!("final speed {:.1} mph", builder.get_mph(&physics));
    builder.destroy(&mut physics);
}
