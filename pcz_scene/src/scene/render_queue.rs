/// RenderQueue — sink for the output of a visibility walk.
///
/// The scene manager pushes each node it finds visible (at most once per
/// frame and camera), plus optional debug geometry. What the host does with
/// the submissions (sorting, batching, drawing) is its own business.

use crate::geometry::AABB;
use crate::portal::{Portal, PortalKey};
use super::scene_node::{NodeKey, SceneNode};

/// Receiver of visible scene content.
///
/// `&mut self` so implementations can accumulate state between `clear`
/// calls.
pub trait RenderQueue {
    /// Forget everything submitted so far. Called at the start of a walk.
    fn clear(&mut self) {}

    /// A node passed culling.
    fn add_node(&mut self, key: NodeKey, node: &SceneNode);

    /// Bounding box display requested for a visible node.
    fn add_bounding_box(&mut self, _key: NodeKey, _world_aabb: &AABB) {}

    /// Portal display requested for a portal the walk passed through.
    fn add_portal(&mut self, _key: PortalKey, _portal: &Portal) {}
}

/// Queue that simply records submissions in order.
///
/// Also accumulates the union of visible node boxes, the usual input for
/// fitting shadow cameras.
#[derive(Debug, Clone, Default)]
pub struct CollectingRenderQueue {
    nodes: Vec<NodeKey>,
    bounding_boxes: Vec<(NodeKey, AABB)>,
    portals: Vec<PortalKey>,
    visible_bounds: AABB,
}

impl CollectingRenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    pub fn bounding_boxes(&self) -> &[(NodeKey, AABB)] {
        &self.bounding_boxes
    }

    pub fn portals(&self) -> &[PortalKey] {
        &self.portals
    }

    /// Union of the world boxes of every submitted node (null when empty).
    pub fn visible_bounds(&self) -> &AABB {
        &self.visible_bounds
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl RenderQueue for CollectingRenderQueue {
    fn clear(&mut self) {
        self.nodes.clear();
        self.bounding_boxes.clear();
        self.portals.clear();
        self.visible_bounds = AABB::NULL;
    }

    fn add_node(&mut self, key: NodeKey, node: &SceneNode) {
        self.nodes.push(key);
        self.visible_bounds = self.visible_bounds.merged(node.world_aabb());
    }

    fn add_bounding_box(&mut self, key: NodeKey, world_aabb: &AABB) {
        self.bounding_boxes.push((key, *world_aabb));
    }

    fn add_portal(&mut self, key: PortalKey, _portal: &Portal) {
        if !self.portals.contains(&key) {
            self.portals.push(key);
        }
    }
}

#[cfg(test)]
#[path = "render_queue_tests.rs"]
mod tests;
