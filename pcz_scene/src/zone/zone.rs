/// Zone — a named spatial partition connected to other zones by portals.
///
/// A zone records the nodes living in it (home nodes), the nodes reaching
/// into it through a portal (visitors), and the portals and anti-portals it
/// currently owns. Portal objects themselves belong to the scene manager;
/// zones only hold their keys.
///
/// Traversals that cross zone boundaries (home-zone updates, visibility,
/// queries through portals) are driven by the scene manager over keys. A
/// `Zone` implementation only answers questions about its own contents.

use std::any::Any;
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use crate::camera::{CameraKey, PczCamera};
use crate::error::Result;
use crate::geometry::AABB;
use crate::octree::SceneQuery;
use crate::portal::PortalKey;
use crate::scene::{NodeKey, OptionValue, SceneNode};

new_key_type! {
    /// Handle of a zone owned by the scene manager.
    pub struct ZoneKey;
}

/// State shared by every zone kind.
#[derive(Debug, Clone)]
pub struct ZoneCore {
    name: String,
    zone_type: String,
    portals: Vec<PortalKey>,
    anti_portals: Vec<PortalKey>,
    home_nodes: FxHashSet<NodeKey>,
    visitor_nodes: FxHashSet<NodeKey>,
    enclosure_node: Option<NodeKey>,
    /// World box of the enclosure node, refreshed when it moves
    enclosure_bounds: AABB,
    has_sky: bool,
    last_visible_frame: u64,
    last_visible_camera: Option<CameraKey>,
    /// Portal membership or geometry changed this frame
    portals_updated: bool,
}

impl ZoneCore {
    pub fn new(name: impl Into<String>, zone_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zone_type: zone_type.into(),
            portals: Vec::new(),
            anti_portals: Vec::new(),
            home_nodes: FxHashSet::default(),
            visitor_nodes: FxHashSet::default(),
            enclosure_node: None,
            enclosure_bounds: AABB::NULL,
            has_sky: false,
            last_visible_frame: 0,
            last_visible_camera: None,
            portals_updated: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zone_type(&self) -> &str {
        &self.zone_type
    }

    // ===== PORTALS =====

    pub fn portals(&self) -> &[PortalKey] {
        &self.portals
    }

    pub fn anti_portals(&self) -> &[PortalKey] {
        &self.anti_portals
    }

    pub(crate) fn add_portal(&mut self, key: PortalKey) {
        if !self.portals.contains(&key) {
            self.portals.push(key);
        }
        self.portals_updated = true;
    }

    pub(crate) fn remove_portal(&mut self, key: PortalKey) {
        self.portals.retain(|&k| k != key);
        self.portals_updated = true;
    }

    pub(crate) fn add_anti_portal(&mut self, key: PortalKey) {
        if !self.anti_portals.contains(&key) {
            self.anti_portals.push(key);
        }
        self.portals_updated = true;
    }

    pub(crate) fn remove_anti_portal(&mut self, key: PortalKey) {
        self.anti_portals.retain(|&k| k != key);
        self.portals_updated = true;
    }

    pub fn portals_updated(&self) -> bool {
        self.portals_updated
    }

    pub(crate) fn set_portals_updated(&mut self, updated: bool) {
        self.portals_updated = updated;
    }

    // ===== NODES =====

    pub fn home_nodes(&self) -> &FxHashSet<NodeKey> {
        &self.home_nodes
    }

    pub fn visitor_nodes(&self) -> &FxHashSet<NodeKey> {
        &self.visitor_nodes
    }

    pub fn is_home_node(&self, key: NodeKey) -> bool {
        self.home_nodes.contains(&key)
    }

    pub fn is_visitor_node(&self, key: NodeKey) -> bool {
        self.visitor_nodes.contains(&key)
    }

    /// True when the zone holds the node either way.
    pub fn holds_node(&self, key: NodeKey) -> bool {
        self.is_home_node(key) || self.is_visitor_node(key)
    }

    /// Nothing for a visibility walk to contribute or follow.
    pub fn is_empty(&self) -> bool {
        self.home_nodes.is_empty() && self.visitor_nodes.is_empty() && self.portals.is_empty()
    }

    pub(crate) fn insert_home_node(&mut self, key: NodeKey) -> bool {
        self.home_nodes.insert(key)
    }

    pub(crate) fn erase_home_node(&mut self, key: NodeKey) -> bool {
        self.home_nodes.remove(&key)
    }

    pub(crate) fn insert_visitor_node(&mut self, key: NodeKey) -> bool {
        self.visitor_nodes.insert(key)
    }

    pub(crate) fn erase_visitor_node(&mut self, key: NodeKey) -> bool {
        self.visitor_nodes.remove(&key)
    }

    pub(crate) fn clear_nodes(&mut self) {
        self.home_nodes.clear();
        self.visitor_nodes.clear();
    }

    // ===== ENCLOSURE & SKY =====

    pub fn enclosure_node(&self) -> Option<NodeKey> {
        self.enclosure_node
    }

    pub fn enclosure_bounds(&self) -> &AABB {
        &self.enclosure_bounds
    }

    pub(crate) fn set_enclosure(&mut self, node: Option<NodeKey>, bounds: AABB) {
        self.enclosure_node = node;
        self.enclosure_bounds = if node.is_some() { bounds } else { AABB::NULL };
    }

    pub fn has_sky(&self) -> bool {
        self.has_sky
    }

    pub(crate) fn set_has_sky(&mut self, has_sky: bool) {
        self.has_sky = has_sky;
    }

    // ===== VISIBILITY STAMP =====

    pub fn last_visible_frame(&self) -> u64 {
        self.last_visible_frame
    }

    pub fn last_visible_camera(&self) -> Option<CameraKey> {
        self.last_visible_camera
    }

    pub(crate) fn stamp_visible(&mut self, frame: u64, camera: CameraKey) {
        self.last_visible_frame = frame;
        self.last_visible_camera = Some(camera);
    }
}

/// Behaviour of one zone kind.
///
/// Node registration methods receive the node so spatially partitioned
/// zones can place it immediately. Lookups receive the manager's node table
/// by reference.
pub trait Zone: Any + Send + Sync {
    fn core(&self) -> &ZoneCore;

    fn core_mut(&mut self) -> &mut ZoneCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn zone_type(&self) -> &str {
        self.core().zone_type()
    }

    // ===== NODE MEMBERSHIP =====

    fn add_home_node(&mut self, key: NodeKey, _node: &SceneNode) {
        self.core_mut().insert_home_node(key);
    }

    fn remove_home_node(&mut self, key: NodeKey) {
        self.core_mut().erase_home_node(key);
    }

    fn add_visitor_node(&mut self, key: NodeKey, _node: &SceneNode) {
        self.core_mut().insert_visitor_node(key);
    }

    fn remove_visitor_node(&mut self, key: NodeKey) {
        self.core_mut().erase_visitor_node(key);
    }

    /// Whether nodes held by this zone carry zone-specific data (such as
    /// their octant) that must be refreshed when they move.
    fn requires_zone_specific_node_data(&self) -> bool {
        false
    }

    /// Refresh the zone-specific data of a node held by this zone.
    fn update_node_zone_data(&mut self, _key: NodeKey, _node: &SceneNode) {}

    /// Drop every node reference.
    fn clear(&mut self) {
        self.core_mut().clear_nodes();
    }

    // ===== GEOMETRY =====

    /// Anchor the zone to a node whose world box encloses it.
    fn set_enclosure_node(&mut self, key: NodeKey, world_aabb: AABB) {
        self.core_mut().set_enclosure(Some(key), world_aabb);
    }

    /// May the enclosure node visit neighbouring zones?
    fn enclosure_node_may_visit(&self) -> bool {
        true
    }

    /// World-space extent used to locate unplaced nodes (null when unknown).
    fn bounds(&self) -> AABB {
        *self.core().enclosure_bounds()
    }

    /// Load zone geometry from a text description.
    fn set_zone_geometry(&mut self, _config: &str) -> Result<()> {
        Ok(())
    }

    // ===== LOOKUPS =====

    /// Collect the held nodes the camera sees, honouring its extra culling
    /// planes. Visibility stamps are left to the caller.
    fn collect_visible_nodes(
        &self,
        camera: &PczCamera,
        nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut Vec<NodeKey>,
    );

    /// Collect held nodes touching a query shape.
    ///
    /// Visitors are only reported when `include_visitors` is set. Results
    /// are a set so nodes reached through several zones appear once.
    fn find_local_nodes(
        &self,
        query: &SceneQuery,
        include_visitors: bool,
        exclude: Option<NodeKey>,
        nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut FxHashSet<NodeKey>,
    );

    // ===== OPTIONS & NOTIFICATIONS =====

    /// Apply a zone option; false if the key is not recognised.
    fn set_option(&mut self, _key: &str, _value: &OptionValue) -> Result<bool> {
        Ok(false)
    }

    fn get_option(&self, _key: &str) -> Option<OptionValue> {
        None
    }

    fn option_keys(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn notify_camera_created(&mut self, _key: CameraKey, _camera: &PczCamera) {}

    fn notify_begin_render_scene(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
