// ==============================================================================
// vehicle/builder.rs — FOUR (OR SIX) WHEEL VEHICLE BUILDER
// ------------------------------------------------------------------------------
// Turns a chassis node + named wheel nodes into a finalized physics vehicle:
//
//   extract geometry → lever arms / wheelbase → per-axle spring, damper, sag
//   → jounce + track adjustment (local authority only)
//   → chassis → wheels (FL, FR, RL, RR, [RL2, RR2]) → finalize
//
// Build failures are logged and reported as `false`; whatever was created
// before the failure is released again.
// ==============================================================================

use log::{error, info, warn};
use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use super::model::WheeledVehicle;
use super::wheel::{VisualNode, WheelFlags};
use crate::backend::{ChassisDesc, PhysicsBackend, SuspensionDesc, WheelDesc};
use crate::config::VehicleTuningConfig;
use crate::error::VehicleError;
use crate::geometry::{ChassisGeometryExtractor, SceneGraph, WheelSlot};
use crate::snapshot::VehicleSnapshot;
use crate::suspension::{derive_suspension, Axle, AxleSuspension, Side, VehicleChassisSpec, WheelPlacement};

/// Conventional wheel node names, used when no names are configured.
const DISCOVERY_PAIRS: [(&str, &str, Axle); 3] = [
    ("dof_wheel_lt_01", "dof_wheel_rt_01", Axle::Front),
    ("dof_wheel_lt_02", "dof_wheel_rt_02", Axle::Rear),
    ("dof_wheel_lt_03", "dof_wheel_rt_03", Axle::Rear),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum BuildStage {
    Empty,
    GeometryExtracted,
    SuspensionComputed,
    ChassisCreated,
    WheelsAdded,
    Finalized,
}

/// Whether this host simulates the vehicle. Remote vehicles get their state
/// from elsewhere and skip local suspension authoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    #[default]
    Local,
    Remote,
}

/// Wheel attachment node names. Empty strings mean "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelNodes {
    pub front_left: String,
    pub front_right: String,
    pub rear_left: String,
    pub rear_right: String,
    pub second_rear_left: Option<String>,
    pub second_rear_right: Option<String>,
}

impl WheelNodes {
    pub fn four(front_left: &str, front_right: &str, rear_left: &str, rear_right: &str) -> Self {
        Self {
            front_left: front_left.to_string(),
            front_right: front_right.to_string(),
            rear_left: rear_left.to_string(),
            rear_right: rear_right.to_string(),
            second_rear_left: None,
            second_rear_right: None,
        }
    }

    pub fn with_second_rear(mut self, left: &str, right: &str) -> Self {
        self.second_rear_left = Some(left.to_string());
        self.second_rear_right = Some(right.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.front_left.is_empty()
            && self.front_right.is_empty()
            && self.rear_left.is_empty()
            && self.rear_right.is_empty()
            && self.second_rear_left.is_none()
            && self.second_rear_right.is_none()
    }

    /// Both nodes of the second rear pair supplied.
    pub fn has_second_rear(&self) -> bool {
        matches!(
            (&self.second_rear_left, &self.second_rear_right),
            (Some(l), Some(r)) if !l.is_empty() && !r.is_empty()
        )
    }

    /// Extraction order: FL, FR, RL, RR, then the second rear pair. A pair
    /// with neither name set is left out.
    pub fn slots(&self) -> Vec<WheelSlot> {
        let mut pairs = vec![
            (self.front_left.as_str(), self.front_right.as_str(), Axle::Front),
            (self.rear_left.as_str(), self.rear_right.as_str(), Axle::Rear),
        ];
        if self.has_second_rear() {
            if let (Some(l), Some(r)) = (&self.second_rear_left, &self.second_rear_right) {
                pairs.push((l.as_str(), r.as_str(), Axle::Rear));
            }
        } else if self.second_rear_left.is_some() || self.second_rear_right.is_some() {
            warn!("second rear axle needs both wheel nodes; ignoring the one supplied");
        }

        let mut slots = Vec::with_capacity(6);
        for (left, right, axle) in pairs {
            if left.is_empty() && right.is_empty() {
                continue;
            }
            slots.push(WheelSlot { name: left.to_string(), axle, side: Side::Left });
            slots.push(WheelSlot { name: right.to_string(), axle, side: Side::Right });
        }
        slots
    }

    /// Looks for the conventional `dof_wheel_{lt,rt}_0N` pairs.
    pub fn discover(scene: &dyn SceneGraph) -> Result<Self, VehicleError> {
        let found = |l: &str, r: &str| scene.find_node(l).is_some() && scene.find_node(r).is_some();

        let mut nodes = WheelNodes::default();
        let mut axles = 0;
        for (i, (left, right, _)) in DISCOVERY_PAIRS.iter().enumerate() {
            if !found(left, right) {
                continue;
            }
            axles += 1;
            match i {
                0 => {
                    nodes.front_left = left.to_string();
                    nodes.front_right = right.to_string();
                }
                1 => {
                    nodes.rear_left = left.to_string();
                    nodes.rear_right = right.to_string();
                }
                _ if nodes.rear_left.is_empty() => {
                    warn!("'{}' found without the _02 pair, using it as the rear axle", left);
                    nodes.rear_left = left.to_string();
                    nodes.rear_right = right.to_string();
                }
                _ => {
                    nodes.second_rear_left = Some(left.to_string());
                    nodes.second_rear_right = Some(right.to_string());
                }
            }
        }

        if axles == 0 {
            return Err(VehicleError::NoAxles);
        }
        info!("discovered {} wheel axle(s)", axles);
        Ok(nodes)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Pedals {
    acceleration: f32,
    steering: f32,
    brakes: f32,
}

pub struct FourWheelVehicleBuilder {
    config: VehicleTuningConfig,
    authority: Authority,
    stage: BuildStage,
    vehicle: WheeledVehicle,
    suspension: Option<AxleSuspension>,
    pedals: Pedals,
}

impl FourWheelVehicleBuilder {
    pub fn new(config: VehicleTuningConfig, authority: Authority) -> Self {
        let vehicle = WheeledVehicle::new(config.limits());
        Self {
            config,
            authority,
            stage: BuildStage::Empty,
            vehicle,
            suspension: None,
            pedals: Pedals::default(),
        }
    }

    pub fn config(&self) -> &VehicleTuningConfig {
        &self.config
    }

    /// Takes effect on the next `create_vehicle`.
    pub fn set_config(&mut self, config: VehicleTuningConfig) {
        self.config = config;
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn vehicle(&self) -> &WheeledVehicle {
        &self.vehicle
    }

    /// Spring/damper/sag derived by the last build.
    pub fn suspension(&self) -> Option<&AxleSuspension> {
        self.suspension.as_ref()
    }

    /// Builds the vehicle, destroying any previous one first. Failures are
    /// logged; returns whether the vehicle is ready to drive.
    pub fn create_vehicle(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        scene: &dyn SceneGraph,
        transform: Isometry3<f32>,
        body_node: &str,
        wheel_nodes: &WheelNodes,
    ) -> bool {
        self.try_create_vehicle(physics, scene, transform, body_node, wheel_nodes)
            .is_ok()
    }

    pub fn try_create_vehicle(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        scene: &dyn SceneGraph,
        transform: Isometry3<f32>,
        body_node: &str,
        wheel_nodes: &WheelNodes,
    ) -> Result<(), VehicleError> {
        self.destroy(physics);
        self.vehicle.set_limits(self.config.limits());

        let result = self.build(physics, scene, transform, body_node, wheel_nodes);
        if let Err(e) = &result {
            error!("vehicle '{}' build failed after {:?}: {}", body_node, self.stage, e);
            self.destroy(physics);
        }
        result
    }

    fn build(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        scene: &dyn SceneGraph,
        transform: Isometry3<f32>,
        body_node: &str,
        wheel_nodes: &WheelNodes,
    ) -> Result<(), VehicleError> {
        // --- geometry ---
        let nodes = if wheel_nodes.is_empty() {
            WheelNodes::discover(scene)?
        } else {
            wheel_nodes.clone()
        };
        let slots = nodes.slots();
        if slots.is_empty() {
            return Err(VehicleError::NoAxles);
        }

        let extractor = ChassisGeometryExtractor::new(self.config.wheel_radius.into(), self.config.wheel_width);
        let geometry = extractor.extract(scene, body_node, &slots)?;
        self.stage = BuildStage::GeometryExtracted;

        // --- suspension ---
        let chassis = VehicleChassisSpec {
            mass: self.config.mass,
            center_of_mass: self.config.center_of_mass(),
            gravity: physics.gravity(),
        };
        let placements: Vec<WheelPlacement> = geometry.wheels.iter().map(|w| w.placement.clone()).collect();
        let suspension = derive_suspension(
            &self.config.front,
            &self.config.rear,
            &chassis,
            &placements,
            nodes.has_second_rear(),
        );
        self.suspension = Some(suspension);
        self.stage = BuildStage::SuspensionComputed;

        // --- chassis ---
        let desc = ChassisDesc {
            transform,
            mass: chassis.mass,
            center_of_mass: chassis.center_of_mass,
            half_extents: geometry.half_extents,
        };
        self.vehicle.create_chassis(physics, &desc, geometry.body_offset)?;
        self.stage = BuildStage::ChassisCreated;

        // --- wheels ---
        for wheel in &geometry.wheels {
            let placement = &wheel.placement;
            let tuning = self.config.axle_tuning(placement.axle);
            let params = suspension.for_axle(placement.axle);

            let mut mount = placement.offset;
            if self.authority == Authority::Local {
                mount.z += params.jounce;
                mount.x += placement.side.sign() * self.config.track_adjustment;
            }

            let desc = WheelDesc {
                mount,
                radius: placement.radius,
                width: placement.width,
                mass: self.config.wheel_mass,
                suspension: SuspensionDesc {
                    rest_length: tuning.rest_length,
                    travel: tuning.travel,
                    spring_rate: params.spring_rate,
                    damper: params.damper,
                },
                tire: tuning.tire,
                flags: self.flags_for(placement.axle),
            };
            let visual = VisualNode::new(wheel.kind, wheel.node, scene.parent(wheel.node));
            self.vehicle
                .add_wheel(physics, &desc, placement.axle, placement.side, Some(visual))?;
        }
        self.stage = BuildStage::WheelsAdded;

        self.vehicle.finalize_initialization(physics)?;
        self.stage = BuildStage::Finalized;

        info!(
            "vehicle '{}' built: {} wheels, wheelbase {:.3} m, front k={:.0} c={:.0}, rear k={:.0} c={:.0}",
            body_node,
            self.vehicle.wheel_count(),
            suspension.wheelbase,
            suspension.front.spring_rate,
            suspension.front.damper,
            suspension.rear.spring_rate,
            suspension.rear.damper,
        );
        Ok(())
    }

    fn flags_for(&self, axle: Axle) -> WheelFlags {
        match axle {
            Axle::Front => WheelFlags {
                powered: self.config.four_wheel_drive,
                steered: true,
                braked: self.config.front_brakes,
            },
            Axle::Rear => WheelFlags {
                powered: true,
                steered: false,
                braked: true,
            },
        }
    }

    /// Pushes inputs straight to the engine.
    pub fn control(&mut self, physics: &mut dyn PhysicsBackend, acceleration: f32, steering: f32, brakes: f32) {
        if let Err(e) = self.vehicle.control(physics, acceleration, steering, brakes) {
            error!("vehicle control failed: {}", e);
        }
    }

    /// Caches inputs for the next `update_vehicle`.
    pub fn set_controls(&mut self, acceleration: f32, steering: f32, brakes: f32) {
        self.pedals = Pedals { acceleration, steering, brakes };
    }

    pub fn update_vehicle(&mut self, physics: &mut dyn PhysicsBackend, _delta_time: f32) {
        let Pedals { acceleration, steering, brakes } = self.pedals;
        self.control(physics, acceleration, steering, brakes);
    }

    pub fn update_wheel_transforms(&mut self, physics: &dyn PhysicsBackend, scene: &mut dyn SceneGraph) -> usize {
        self.vehicle.update_wheel_transforms(physics, scene)
    }

    pub fn get_mph(&self, physics: &dyn PhysicsBackend) -> f32 {
        self.vehicle.mph(physics)
    }

    pub fn wheel_rotation(&self, physics: &dyn PhysicsBackend, index: usize) -> Result<f32, VehicleError> {
        self.vehicle.wheel_rotation(physics, index)
    }

    pub fn wheel_jounce(&self, physics: &dyn PhysicsBackend, index: usize) -> Result<f32, VehicleError> {
        self.vehicle.wheel_jounce(physics, index)
    }

    /// Releases the wheels; the chassis body stays.
    pub fn clean_up(&mut self, physics: &mut dyn PhysicsBackend) {
        self.vehicle.clean_up(physics);
        if self.stage > BuildStage::ChassisCreated {
            self.stage = BuildStage::ChassisCreated;
        }
    }

    pub fn destroy(&mut self, physics: &mut dyn PhysicsBackend) {
        self.vehicle.destroy(physics);
        self.stage = BuildStage::Empty;
        self.suspension = None;
    }

    pub fn snapshot(&self, physics: &dyn PhysicsBackend) -> VehicleSnapshot {
        VehicleSnapshot::capture(self.stage, self.authority, &self.vehicle, physics)
    }
}
