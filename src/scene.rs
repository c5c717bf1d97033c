// ==============================================================================
// scene.rs — IN-MEMORY SCENE TREE
// ------------------------------------------------------------------------------
// Minimal SceneGraph implementation: named nodes, parent links, local
// transforms, bounds. Used by the demo binary and the tests in place of the
// host engine's scene graph.
// ==============================================================================

use std::collections::HashMap;

use nalgebra::{Isometry3, Matrix4, Translation3, Vector3};

use crate::geometry::{Aabb, Hpr, NodeId, NodeKind, SceneGraph};

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub local: Isometry3<f32>, // rest transform, never written by posing
    pub bounds: Option<Aabb>,
    pub matrix: Option<Matrix4<f32>>, // last matrix written to a Matrix node
    pub hpr: Hpr,                     // last channels written to a Dof node
    pub dof: Option<Isometry3<f32>>,  // pose built from the Dof channels
}

impl SceneNode {
    /// Transform the node is drawn with: the Dof pose once written, else rest.
    pub fn pose(&self) -> Isometry3<f32> {
        self.dof.unwrap_or(self.local)
    }
}

#[derive(Debug, Default)]
pub struct SceneTree {
    nodes: HashMap<NodeId, SceneNode>,
    by_name: HashMap<String, NodeId>,
    next_id: u64,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        kind: NodeKind,
        local: Isometry3<f32>,
        bounds: Option<Aabb>,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            SceneNode {
                name: name.to_string(),
                parent,
                kind,
                local,
                bounds,
                matrix: None,
                hpr: Hpr::default(),
                dof: None,
            },
        );
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<SceneNode> {
        let node = self.nodes.remove(&id)?;
        self.by_name.remove(&node.name);
        Some(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SceneGraph for SceneTree {
    fn find_node(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    fn local_transform(&self, node: NodeId) -> Option<Isometry3<f32>> {
        self.nodes.get(&node).map(|n| n.local)
    }

    fn bounding_box(&self, node: NodeId) -> Option<Aabb> {
        self.nodes.get(&node)?.bounds
    }

    fn set_dof_transform(&mut self, node: NodeId, hpr: Hpr, translation: Vector3<f32>) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.hpr = hpr;
            n.dof = Some(Isometry3::from_parts(Translation3::from(translation), hpr.to_rotation()));
        }
    }

    fn set_local_matrix(&mut self, node: NodeId, matrix: Matrix4<f32>) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.matrix = Some(matrix);
        }
    }
}
