// ==============================================================================
// geometry.rs — SCENE BOUNDARY + CHASSIS GEOMETRY EXTRACTION
// ------------------------------------------------------------------------------
// SceneGraph is the narrow contract the vehicle needs from the host scene:
// - look up a named attachment node
// - read its local-to-parent transform, parent and bounding box
// - write a wheel pose back (DOF channels or a raw matrix)
//
// ChassisGeometryExtractor turns named wheel nodes into WheelPlacements:
//
//   offset = body_root⁻¹ · wheel_root.translation
//
// i.e. the wheel position relative to the model root, with the chassis
// node's own offset removed, expressed in the chassis frame. This is the frame
// BEFORE jounce / track adjustments; the builder applies those afterwards.
// ==============================================================================

use log::warn;
use nalgebra::{Isometry3, Matrix4, Point3, Rotation3, UnitQuaternion, Vector3};

use crate::error::VehicleError;
use crate::suspension::{Axle, Side, WheelPlacement, WheelRadius};

pub const FALLBACK_WHEEL_RADIUS: f32 = 0.35;
pub const FALLBACK_WHEEL_WIDTH: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u64);

/// How a node stores its transform; decides how wheel poses are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Independent heading/pitch/roll + translation channels.
    Dof,
    /// Plain local matrix.
    Matrix,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    pub fn extents(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        let e = self.extents();
        e.x <= 0.0 || e.y <= 0.0 || e.z <= 0.0
    }

    pub fn half_extents(&self) -> Vector3<f32> {
        self.extents() * 0.5
    }
}

/// Heading about +Z, pitch about +X, roll about +Y (R = Rz·Rx·Ry).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hpr {
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Hpr {
    pub fn from_rotation(rotation: &UnitQuaternion<f32>) -> Self {
        let m = rotation.to_rotation_matrix();
        let m = m.matrix();
        let pitch = m[(2, 1)].clamp(-1.0, 1.0).asin();
        let roll = (-m[(2, 0)]).atan2(m[(2, 2)]);
        let heading = (-m[(0, 1)]).atan2(m[(1, 1)]);
        Self { heading, pitch, roll }
    }

    pub fn to_rotation(&self) -> UnitQuaternion<f32> {
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), self.heading);
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.pitch);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.roll);
        UnitQuaternion::from_rotation_matrix(&(rz * rx * ry))
    }
}

pub trait SceneGraph {
    fn find_node(&self, name: &str) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Local-to-parent transform.
    fn local_transform(&self, node: NodeId) -> Option<Isometry3<f32>>;

    /// Bounding box in the node's own frame.
    fn bounding_box(&self, node: NodeId) -> Option<Aabb>;

    fn set_dof_transform(&mut self, node: NodeId, hpr: Hpr, translation: Vector3<f32>);

    fn set_local_matrix(&mut self, node: NodeId, matrix: Matrix4<f32>);

    /// Transform relative to the model root (product of local transforms up
    /// the parent chain).
    fn root_transform(&self, node: NodeId) -> Option<Isometry3<f32>> {
        let mut iso = self.local_transform(node)?;
        let mut cursor = self.parent(node);
        while let Some(p) = cursor {
            iso = self.local_transform(p)? * iso;
            cursor = self.parent(p);
        }
        Some(iso)
    }
}

/// One wheel attachment the builder wants extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelSlot {
    pub name: String,
    pub axle: Axle,
    pub side: Side,
}

#[derive(Debug, Clone)]
pub struct ExtractedWheel {
    pub node: NodeId,
    pub kind: NodeKind,
    pub placement: WheelPlacement,
}

#[derive(Debug, Clone)]
pub struct ChassisGeometry {
    pub body_node: NodeId,
    pub body_offset: Isometry3<f32>,
    pub half_extents: Vector3<f32>,
    pub wheels: Vec<ExtractedWheel>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChassisGeometryExtractor {
    pub radius: WheelRadius,
    pub width: Option<f32>,
}

impl ChassisGeometryExtractor {
    pub fn new(radius: WheelRadius, width: Option<f32>) -> Self {
        Self { radius, width }
    }

    pub fn extract(
        &self,
        scene: &dyn SceneGraph,
        body_name: &str,
        slots: &[WheelSlot],
    ) -> Result<ChassisGeometry, VehicleError> {
        let body_node = scene
            .find_node(body_name)
            .ok_or_else(|| VehicleError::MissingBodyNode(body_name.to_string()))?;
        let body_offset = scene
            .root_transform(body_node)
            .ok_or_else(|| VehicleError::MissingBodyNode(body_name.to_string()))?;

        let half_extents = match scene.bounding_box(body_node) {
            Some(b) if !b.is_empty() => b.half_extents(),
            _ => {
                warn!("chassis node '{}' has no usable bounds, using a 1x2x0.5 m box", body_name);
                Vector3::new(1.0, 2.0, 0.5)
            }
        };

        let mut wheels = Vec::with_capacity(slots.len());
        for slot in slots {
            let node = scene
                .find_node(&slot.name)
                .ok_or_else(|| VehicleError::MissingNode(slot.name.clone()))?;
            let wheel_root = scene
                .root_transform(node)
                .ok_or_else(|| VehicleError::MissingNode(slot.name.clone()))?;

            let world = Point3::from(wheel_root.translation.vector);
            let offset = body_offset.inverse_transform_point(&world).coords;

            let bounds = scene.bounding_box(node).filter(|b| !b.is_empty());
            let radius = self.radius.resolve(|| match bounds {
                Some(b) => b.extents().z * 0.5,
                None => {
                    warn!("wheel '{}' has no bounds for auto radius, using {}", slot.name, FALLBACK_WHEEL_RADIUS);
                    FALLBACK_WHEEL_RADIUS
                }
            });
            let width = self
                .width
                .or_else(|| bounds.map(|b| b.extents().x))
                .unwrap_or(FALLBACK_WHEEL_WIDTH);

            wheels.push(ExtractedWheel {
                node,
                kind: scene.node_kind(node).unwrap_or(NodeKind::Matrix),
                placement: WheelPlacement {
                    offset,
                    width,
                    radius,
                    axle: slot.axle,
                    side: slot.side,
                },
            });
        }

        Ok(ChassisGeometry {
            body_node,
            body_offset,
            half_extents,
            wheels,
        })
    }
}
