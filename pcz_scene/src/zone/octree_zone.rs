/// OctreeZone — a zone whose nodes are indexed by a loose octree.
///
/// Home and visitor nodes are both stored in the octree; lookups filter
/// visitors out when asked to. The octree covers a configurable box
/// (`"Size"`) down to a configurable depth (`"Depth"`), and is resized to
/// the enclosure node's world box when one is set.

use std::any::Any;
use glam::Vec3;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::camera::{PczCamera, Visibility};
use crate::error::Result;
use crate::geometry::AABB;
use crate::octree::{Octree, OctreeVisitor, SceneQuery};
use crate::scene::{NodeKey, OptionValue, SceneNode};
use super::zone::{Zone, ZoneCore};

/// Type name the octree factory registers.
pub const OCTREE_ZONE_TYPE: &str = "ZoneType_Octree";

/// Half extent of the octree box before any `"Size"` option.
pub const DEFAULT_OCTREE_HALF_EXTENT: f32 = 10000.0;

/// Octree depth before any `"Depth"` option.
pub const DEFAULT_OCTREE_DEPTH: u32 = 8;

/// Deepest `"Depth"` option accepted; each level splits the box in two per axis.
pub const MAX_OCTREE_DEPTH: u32 = 16;

const OPTION_KEYS: &[&str] = &["Size", "Depth"];

pub struct OctreeZone {
    core: ZoneCore,
    octree: Octree<NodeKey>,
}

impl OctreeZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_type(name, OCTREE_ZONE_TYPE)
    }

    /// Octree zone reporting another type name (for zone kinds built on top).
    pub fn with_type(name: impl Into<String>, zone_type: impl Into<String>) -> Self {
        let bounds = AABB::from_center_half_size(Vec3::ZERO, Vec3::splat(DEFAULT_OCTREE_HALF_EXTENT));
        Self {
            core: ZoneCore::new(name, zone_type),
            octree: Octree::new(bounds, DEFAULT_OCTREE_DEPTH),
        }
    }

    pub fn octree(&self) -> &Octree<NodeKey> {
        &self.octree
    }

    /// Re-place every node over a new octree box.
    pub fn resize(&mut self, bounds: AABB) {
        crate::engine_debug!("pcz::OctreeZone", "Zone '{}' octree resized to {:?} - {:?}",
            self.core.name(), bounds.min, bounds.max);
        self.octree.resize(bounds);
    }

    pub fn set_max_depth(&mut self, depth: u32) {
        self.octree.set_max_depth(depth);
    }

    fn place(&mut self, key: NodeKey, node: &SceneNode) {
        self.octree.update(key, node.world_aabb());
    }

    fn unplace_if_released(&mut self, key: NodeKey) {
        if !self.core.holds_node(key) {
            self.octree.remove(key);
        }
    }
}

/// Collects nodes during an octree walk.
struct VisibleNodeCollector<'a> {
    camera: &'a PczCamera,
    results: &'a mut Vec<NodeKey>,
}

impl OctreeVisitor<NodeKey> for VisibleNodeCollector<'_> {
    fn classify(&mut self, cull_bounds: &AABB) -> Visibility {
        self.camera.get_visibility(cull_bounds)
    }

    fn visit(&mut self, key: NodeKey, world_aabb: &AABB, octant_visibility: Visibility) {
        // Partially visible octants cull their nodes one by one
        if octant_visibility == Visibility::Full || self.camera.is_visible_aabb(world_aabb) {
            self.results.push(key);
        }
    }
}

impl Zone for OctreeZone {
    fn core(&self) -> &ZoneCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ZoneCore {
        &mut self.core
    }

    fn add_home_node(&mut self, key: NodeKey, node: &SceneNode) {
        self.core.insert_home_node(key);
        self.place(key, node);
    }

    fn remove_home_node(&mut self, key: NodeKey) {
        self.core.erase_home_node(key);
        self.unplace_if_released(key);
    }

    fn add_visitor_node(&mut self, key: NodeKey, node: &SceneNode) {
        self.core.insert_visitor_node(key);
        self.place(key, node);
    }

    fn remove_visitor_node(&mut self, key: NodeKey) {
        self.core.erase_visitor_node(key);
        self.unplace_if_released(key);
    }

    fn requires_zone_specific_node_data(&self) -> bool {
        true
    }

    fn update_node_zone_data(&mut self, key: NodeKey, node: &SceneNode) {
        if self.core.holds_node(key) {
            self.place(key, node);
        } else {
            self.octree.remove(key);
        }
    }

    fn clear(&mut self) {
        self.core.clear_nodes();
        self.octree.clear();
    }

    fn set_enclosure_node(&mut self, key: NodeKey, world_aabb: AABB) {
        self.core.set_enclosure(Some(key), world_aabb);
        if world_aabb.is_finite() && world_aabb != *self.octree.bounds() {
            self.resize(world_aabb);
        }
    }

    fn bounds(&self) -> AABB {
        *self.octree.bounds()
    }

    fn collect_visible_nodes(
        &self,
        camera: &PczCamera,
        _nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut Vec<NodeKey>,
    ) {
        let mut collector = VisibleNodeCollector { camera, results };
        self.octree.walk(&mut collector);
    }

    fn find_local_nodes(
        &self,
        query: &SceneQuery,
        include_visitors: bool,
        exclude: Option<NodeKey>,
        _nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut FxHashSet<NodeKey>,
    ) {
        let mut found = Vec::new();
        let accept = |key: NodeKey| {
            Some(key) != exclude && (include_visitors || self.core.is_home_node(key))
        };
        self.octree.find_nodes(query, accept, &mut found);
        results.extend(found);
    }

    fn set_option(&mut self, key: &str, value: &OptionValue) -> Result<bool> {
        match key {
            "Size" => {
                let Some(bounds) = value.as_aabb().filter(AABB::is_finite) else {
                    crate::engine_bail!("pcz::OctreeZone", InvalidConfig:
                        "Option 'Size' of zone '{}' expects a finite box, got {:?}", self.core.name(), value);
                };
                self.resize(bounds);
                Ok(true)
            }
            "Depth" => {
                let depth = value.as_int().and_then(|d| u32::try_from(d).ok());
                let Some(depth) = depth.filter(|d| *d <= MAX_OCTREE_DEPTH) else {
                    crate::engine_bail!("pcz::OctreeZone", InvalidConfig:
                        "Option 'Depth' of zone '{}' expects an integer in 0..={}, got {:?}",
                        self.core.name(), MAX_OCTREE_DEPTH, value);
                };
                self.set_max_depth(depth);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn get_option(&self, key: &str) -> Option<OptionValue> {
        match key {
            "Size" => Some(OptionValue::Aabb(*self.octree.bounds())),
            "Depth" => Some(OptionValue::Int(self.octree.max_depth() as i64)),
            _ => None,
        }
    }

    fn option_keys(&self) -> Vec<&'static str> {
        OPTION_KEYS.to_vec()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "octree_zone_tests.rs"]
mod tests;
