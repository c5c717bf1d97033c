// vehicle/wheel.rs
use crate::backend::WheelHandle;
use crate::geometry::{NodeId, NodeKind, SceneGraph};
use crate::suspension::{Axle, Side};

pub use crate::backend::WheelFlags;

/// Scene node a wheel's pose is written to. Variant is fixed when the wheel
/// is added; the parent is the node the pose is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualNode {
    Dof { node: NodeId, parent: Option<NodeId> },
    Matrix { node: NodeId, parent: Option<NodeId> },
}

impl VisualNode {
    pub fn new(kind: NodeKind, node: NodeId, parent: Option<NodeId>) -> Self {
        match kind {
            NodeKind::Dof => VisualNode::Dof { node, parent },
            NodeKind::Matrix => VisualNode::Matrix { node, parent },
        }
    }

    /// Looks the node up in `scene`; `None` when it no longer exists.
    pub fn resolve(scene: &dyn SceneGraph, node: NodeId) -> Option<Self> {
        let kind = scene.node_kind(node)?;
        Some(Self::new(kind, node, scene.parent(node)))
    }

    pub fn node(&self) -> NodeId {
        match *self {
            VisualNode::Dof { node, .. } | VisualNode::Matrix { node, .. } => node,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match *self {
            VisualNode::Dof { parent, .. } | VisualNode::Matrix { parent, .. } => parent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wheel {
    pub handle: WheelHandle,       // owned; released by WheeledVehicle::clean_up
    pub visual: Option<VisualNode>, // non-owning
    pub flags: WheelFlags,
    pub axle: Axle,
    pub side: Side,

    // last values read back from the engine
    pub steer_angle: f32,
    pub jounce: f32,
    pub rotation: f32,
}

impl Wheel {
    pub fn new(handle: WheelHandle, flags: WheelFlags, axle: Axle, side: Side, visual: Option<VisualNode>) -> Self {
        Self {
            handle,
            visual,
            flags,
            axle,
            side,
            steer_angle: 0.0,
            jounce: 0.0,
            rotation: 0.0,
        }
    }
}
