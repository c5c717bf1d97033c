use approx::assert_relative_eq;
use nalgebra::Vector3;

use wheeled_vehicle_physics::suspension::{
    compute_damper_coefficient, compute_lever_arms, compute_spring_rate, compute_static_jounce, compute_wheelbase,
    derive_suspension, Axle, Side, SuspensionTuning, VehicleChassisSpec, WheelPlacement,
};

const MASSES: [f32; 4] = [400.0, 1500.0, 3200.0, 18_000.0];
const FREQUENCIES: [f32; 4] = [0.6, 1.1, 1.8, 3.0];
const LEVER_ARMS: [f32; 4] = [0.4, 1.2, 1.4, 2.5];

fn placement(y: f32, axle: Axle, side: Side) -> WheelPlacement {
    WheelPlacement { offset: Vector3::new(side.sign() * 0.8, y, -0.3), width: 0.25, radius: 0.35, axle, side }
}

#[test]
fn spring_rate_is_positive_and_quadratic_in_frequency() {
    for mass in MASSES {
        for freq in FREQUENCIES {
            for (front, rear) in LEVER_ARMS.iter().zip(LEVER_ARMS.iter().rev()) {
                let wheelbase = compute_wheelbase(*front, *rear);
                let k = compute_spring_rate(freq, mass, wheelbase, *front);
                let k2 = compute_spring_rate(freq * 2.0, mass, wheelbase, *front);
                assert!(k > 0.0, "k={} for m={} f={}", k, mass, freq);
                assert_relative_eq!(k2 / k, 4.0, max_relative = 1e-4);
            }
        }
    }
}

#[test]
fn zero_damping_factor_always_gives_zero_damper() {
    for mass in MASSES {
        for lever in LEVER_ARMS {
            let k = compute_spring_rate(1.1, mass, 2.6, lever);
            assert_eq!(compute_damper_coefficient(0.0, mass, k, 2.6, lever), 0.0);
        }
    }
}

#[test]
fn static_jounce_is_never_negative() {
    for load in [0.0, 10.0, 3_000.0, 1.0e6] {
        for k in [0.0, 1.0, 16_529.0, 1.0e7] {
            for rest in [0.0, 0.2, 0.45] {
                let j = compute_static_jounce(load, k, rest);
                assert!(j >= 0.0 && j <= rest.max(0.0), "jounce {} for load={} k={} rest={}", j, load, k, rest);
            }
        }
    }
}

#[test]
fn missing_axle_mirrors_exactly() {
    let rear_only = [placement(-1.3, Axle::Rear, Side::Left), placement(-1.5, Axle::Rear, Side::Right)];
    let (front, rear) = compute_lever_arms(&rear_only, &Vector3::zeros());
    assert_eq!(front, rear);
    assert_relative_eq!(rear, 1.4, epsilon = 1e-6);

    let (front, rear) = compute_lever_arms(&[], &Vector3::zeros());
    assert_eq!((front, rear), (0.0, 0.0));
}

#[test]
fn degenerate_layouts_produce_finite_parameters() {
    let tuning = SuspensionTuning::default();
    let layouts: [Vec<WheelPlacement>; 3] = [
        vec![],
        vec![placement(0.0, Axle::Front, Side::Left), placement(0.0, Axle::Front, Side::Right)],
        vec![placement(0.0, Axle::Front, Side::Left), placement(0.0, Axle::Rear, Side::Left)],
    ];

    for mass in MASSES {
        let chassis = VehicleChassisSpec { mass, center_of_mass: Vector3::zeros(), gravity: 9.81 };
        for layout in &layouts {
            let s = derive_suspension(&tuning, &tuning, &chassis, layout, false);
            assert_eq!(s.wheelbase, 1.0);
            for axle in [s.front, s.rear] {
                assert!(axle.spring_rate.is_finite());
                assert!(axle.damper.is_finite());
                assert!(axle.jounce.is_finite() && axle.jounce >= 0.0);
            }
        }
    }
}

#[test]
fn sag_depends_only_on_frequency() {
    // axle load / spring rate = g / ω², so sag is the same for every mass
    let tuning = SuspensionTuning::default();
    let sedan = [
        placement(1.2, Axle::Front, Side::Left),
        placement(1.2, Axle::Front, Side::Right),
        placement(-1.4, Axle::Rear, Side::Left),
        placement(-1.4, Axle::Rear, Side::Right),
    ];
    let omega = 2.0 * std::f32::consts::PI * tuning.spring_frequency;
    let expected = tuning.rest_length - 9.81 / (omega * omega);

    for mass in MASSES {
        let chassis = VehicleChassisSpec { mass, center_of_mass: Vector3::zeros(), gravity: 9.81 };
        let s = derive_suspension(&tuning, &tuning, &chassis, &sedan, false);
        assert_relative_eq!(s.front.jounce, expected, epsilon = 1e-4);
        assert_relative_eq!(s.rear.jounce, expected, epsilon = 1e-4);
    }
}
