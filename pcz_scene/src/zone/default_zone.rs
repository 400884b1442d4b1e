/// DefaultZone — a zone with no spatial partitioning.
///
/// Every lookup is a linear pass over the home and visitor sets, which
/// suits small zones and the manager's fallback zone.

use std::any::Any;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::camera::PczCamera;
use crate::octree::SceneQuery;
use crate::scene::{NodeKey, SceneNode};
use super::zone::{Zone, ZoneCore};

/// Type name the default factory registers.
pub const DEFAULT_ZONE_TYPE: &str = "ZoneType_Default";

pub struct DefaultZone {
    core: ZoneCore,
}

impl DefaultZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ZoneCore::new(name, DEFAULT_ZONE_TYPE),
        }
    }

    fn held_nodes(&self, include_visitors: bool) -> impl Iterator<Item = &NodeKey> {
        let visitors = include_visitors.then(|| self.core.visitor_nodes().iter());
        self.core.home_nodes().iter().chain(visitors.into_iter().flatten())
    }
}

impl Zone for DefaultZone {
    fn core(&self) -> &ZoneCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ZoneCore {
        &mut self.core
    }

    fn collect_visible_nodes(
        &self,
        camera: &PczCamera,
        nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut Vec<NodeKey>,
    ) {
        for &key in self.held_nodes(true) {
            if let Some(node) = nodes.get(key) {
                if camera.is_visible_aabb(node.world_aabb()) {
                    results.push(key);
                }
            }
        }
    }

    fn find_local_nodes(
        &self,
        query: &SceneQuery,
        include_visitors: bool,
        exclude: Option<NodeKey>,
        nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut FxHashSet<NodeKey>,
    ) {
        for &key in self.held_nodes(include_visitors) {
            if Some(key) == exclude {
                continue;
            }
            if let Some(node) = nodes.get(key) {
                if query.touches(node.world_aabb()) {
                    results.insert(key);
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
