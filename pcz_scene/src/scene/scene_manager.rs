//! Portal-connected-zone scene manager.
//!
//! Owns every zone, portal, scene node, camera and light of one scene and
//! hands out slot-map keys for them. Zones only reference nodes and portals
//! by key; all cross-zone work (frame update, visibility, queries) lives in
//! `zone_maintenance` and `visibility` as further `impl` blocks on this type.

use glam::Vec3;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::camera::{Camera, CameraKey, PczCamera};
use crate::error::Result;
use crate::geometry::AABB;
use crate::portal::{Portal, PortalKey, PortalKind, PortalShape};
use crate::zone::{Zone, ZoneFactory, ZoneFactoryRegistry, ZoneKey, DEFAULT_ZONE_TYPE};
use super::light::{LightKey, LightType, PczLight};
use super::options::{BackTouchPolicy, OptionValue};
use super::scene_node::{NodeKey, SceneNode};

/// Name of the zone every manager starts with.
pub const DEFAULT_ZONE_NAME: &str = "Default_Zone";

const LOG_SOURCE: &str = "pcz::SceneManager";

const OPTION_KEYS: [&str; 3] = ["ShowBoundingBoxes", "ShowPortals", "BackTouchPolicy"];

/// Visible list computed for one camera in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct VisibleCacheKey {
    pub(super) camera: CameraKey,
    pub(super) frame: u64,
}

pub struct PczSceneManager {
    pub(super) name: String,
    pub(super) factories: ZoneFactoryRegistry,

    pub(super) zones: SlotMap<ZoneKey, Box<dyn Zone>>,
    pub(super) zone_names: FxHashMap<String, ZoneKey>,
    pub(super) default_zone: ZoneKey,
    pub(super) default_zone_type: String,

    /// Portals and anti-portals share one table and one namespace
    pub(super) portals: SlotMap<PortalKey, Portal>,
    pub(super) portal_names: FxHashMap<String, PortalKey>,

    pub(super) nodes: SlotMap<NodeKey, SceneNode>,
    pub(super) node_names: FxHashMap<String, NodeKey>,

    pub(super) cameras: SlotMap<CameraKey, PczCamera>,
    pub(super) camera_names: FxHashMap<String, CameraKey>,

    pub(super) lights: SlotMap<LightKey, PczLight>,
    pub(super) light_names: FxHashMap<String, LightKey>,

    pub(super) frame_count: u64,
    pub(super) sky_node: Option<NodeKey>,
    pub(super) sky_enabled: bool,

    pub(super) show_bounding_boxes: bool,
    pub(super) show_portals: bool,
    pub(super) back_touch_policy: BackTouchPolicy,

    pub(super) visible_nodes: Vec<NodeKey>,
    pub(super) visible_cache: Option<VisibleCacheKey>,
}

impl PczSceneManager {
    /// Create a manager holding only a `ZoneType_Default` default zone.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let factories = ZoneFactoryRegistry::with_defaults();
        let mut zones: SlotMap<ZoneKey, Box<dyn Zone>> = SlotMap::with_key();
        let default_zone = zones.insert(factories.create_zone(DEFAULT_ZONE_TYPE, DEFAULT_ZONE_NAME)?);
        let mut zone_names = FxHashMap::default();
        zone_names.insert(DEFAULT_ZONE_NAME.to_string(), default_zone);

        Ok(Self {
            name: name.into(),
            factories,
            zones,
            zone_names,
            default_zone,
            default_zone_type: DEFAULT_ZONE_TYPE.to_string(),
            portals: SlotMap::with_key(),
            portal_names: FxHashMap::default(),
            nodes: SlotMap::with_key(),
            node_names: FxHashMap::default(),
            cameras: SlotMap::with_key(),
            camera_names: FxHashMap::default(),
            lights: SlotMap::with_key(),
            light_names: FxHashMap::default(),
            frame_count: 0,
            sky_node: None,
            sky_enabled: false,
            show_bounding_boxes: false,
            show_portals: false,
            back_touch_policy: BackTouchPolicy::default(),
            visible_nodes: Vec::new(),
            visible_cache: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames started by `update_scene_graph`.
    ///
    /// Never rewinds, even across `init`, since node and zone visibility
    /// stamps are compared against it.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Nodes found by the last visibility walk.
    pub fn visible_nodes(&self) -> &[NodeKey] {
        &self.visible_nodes
    }

    // ===== LIFECYCLE =====

    /// Drop every zone and portal and start over with a fresh default zone.
    ///
    /// Nodes, cameras and lights survive but lose their zone assignments;
    /// nodes are re-placed on the next frame.
    pub fn init(&mut self, default_zone_type: &str) -> Result<()> {
        let default_zone = self.factories.create_zone(default_zone_type, DEFAULT_ZONE_NAME)?;

        self.portals.clear();
        self.portal_names.clear();
        self.zones.clear();
        self.zone_names.clear();
        self.default_zone = self.zones.insert(default_zone);
        self.zone_names.insert(DEFAULT_ZONE_NAME.to_string(), self.default_zone);
        self.default_zone_type = default_zone_type.to_string();

        for node in self.nodes.values_mut() {
            node.set_home_zone(None);
            node.take_visiting_zones();
            node.set_anchored(false);
            node.set_moved(true);
        }
        for light in self.lights.values_mut() {
            light.reset_affected_zones();
        }
        for (key, camera) in &self.cameras {
            self.zones[self.default_zone].notify_camera_created(key, camera);
        }
        self.visible_nodes.clear();
        self.visible_cache = None;

        crate::engine_debug!(LOG_SOURCE, "Scene '{}' initialised with default zone type {}",
            self.name, default_zone_type);
        Ok(())
    }

    /// Destroy all nodes, portals, lights and the sky, then re-initialise.
    ///
    /// Cameras are kept but detached from their nodes.
    pub fn clear_scene(&mut self) -> Result<()> {
        self.nodes.clear();
        self.node_names.clear();
        self.lights.clear();
        self.light_names.clear();
        self.sky_node = None;
        self.sky_enabled = false;
        for camera in self.cameras.values_mut() {
            camera.set_node(None);
        }
        let zone_type = self.default_zone_type.clone();
        self.init(&zone_type)
    }

    // ===== ZONE FACTORIES =====

    pub fn zone_factories(&self) -> &ZoneFactoryRegistry {
        &self.factories
    }

    pub fn register_zone_factory(&mut self, factory: Box<dyn ZoneFactory>) -> Result<()> {
        self.factories.register(factory)
    }

    // ===== ZONES =====

    pub fn default_zone(&self) -> ZoneKey {
        self.default_zone
    }

    pub fn default_zone_type(&self) -> &str {
        &self.default_zone_type
    }

    /// Create a zone of a registered type.
    pub fn create_zone(&mut self, zone_type: &str, name: &str) -> Result<ZoneKey> {
        if self.zone_names.contains_key(name) {
            crate::engine_bail!(LOG_SOURCE, DuplicateItem: "A zone named '{}' already exists", name);
        }
        let mut zone = self.factories.create_zone(zone_type, name)?;
        for (key, camera) in &self.cameras {
            zone.notify_camera_created(key, camera);
        }
        let key = self.zones.insert(zone);
        self.zone_names.insert(name.to_string(), key);
        crate::engine_debug!(LOG_SOURCE, "Created zone '{}' of type {}", name, zone_type);
        Ok(key)
    }

    /// Destroy a zone.
    ///
    /// Nodes living in the zone are destroyed when `destroy_scene_nodes` is
    /// set, otherwise they lose their home and are re-placed next frame.
    /// Portals living in the zone are detached and portals leading into it
    /// lose their target. The default zone cannot be destroyed.
    pub fn destroy_zone(&mut self, key: ZoneKey, destroy_scene_nodes: bool) -> Result<()> {
        if key == self.default_zone {
            crate::engine_bail!(LOG_SOURCE, "The default zone cannot be destroyed");
        }
        let Some(zone) = self.zones.remove(key) else {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Zone {:?} not found", key);
        };
        self.zone_names.remove(zone.name());

        for light in self.lights.values_mut() {
            light.remove_zone_from_affected(key);
        }

        let mut homeless = Vec::new();
        for (node_key, node) in &mut self.nodes {
            for visited in node.take_visiting_zones() {
                if let Some(visited_zone) = self.zones.get_mut(visited) {
                    visited_zone.remove_visitor_node(node_key);
                }
            }
            node.set_moved(true);
            if node.home_zone() == Some(key) {
                homeless.push(node_key);
            }
        }
        for node_key in homeless {
            if destroy_scene_nodes {
                self.destroy_scene_node(node_key)?;
            } else if let Some(node) = self.nodes.get_mut(node_key) {
                node.set_home_zone(None);
                node.set_anchored(false);
            }
        }

        for portal in self.portals.values_mut() {
            if portal.current_home_zone() == Some(key) {
                portal.set_current_home_zone(None);
            }
            if portal.new_home_zone() == Some(key) {
                portal.set_new_home_zone(None);
            }
            if portal.target_zone() == Some(key) {
                portal.set_target_zone(None);
                portal.set_target_portal(None);
            }
        }
        self.visible_cache = None;

        crate::engine_debug!(LOG_SOURCE, "Destroyed zone '{}'", zone.name());
        Ok(())
    }

    pub fn destroy_zone_by_name(&mut self, name: &str, destroy_scene_nodes: bool) -> Result<()> {
        let key = self.require_zone_named(name)?;
        self.destroy_zone(key, destroy_scene_nodes)
    }

    pub fn zone(&self, key: ZoneKey) -> Option<&dyn Zone> {
        self.zones.get(key).map(|zone| zone.as_ref())
    }

    pub fn zone_mut(&mut self, key: ZoneKey) -> Option<&mut dyn Zone> {
        self.zones.get_mut(key).map(|zone| zone.as_mut())
    }

    /// Concrete zone access, e.g. `zone_as::<TerrainZone>(key)`.
    pub fn zone_as<T: Zone>(&self, key: ZoneKey) -> Option<&T> {
        self.zones.get(key).and_then(|zone| zone.as_any().downcast_ref::<T>())
    }

    pub fn zone_as_mut<T: Zone>(&mut self, key: ZoneKey) -> Option<&mut T> {
        self.zones.get_mut(key).and_then(|zone| zone.as_any_mut().downcast_mut::<T>())
    }

    pub fn zone_by_name(&self, name: &str) -> Option<ZoneKey> {
        self.zone_names.get(name).copied()
    }

    pub fn zone_keys(&self) -> impl Iterator<Item = ZoneKey> + '_ {
        self.zones.keys()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Load zone geometry from its text description.
    pub fn set_zone_geometry(&mut self, key: ZoneKey, config: &str) -> Result<()> {
        self.require_zone(key)?;
        self.zones[key].set_zone_geometry(config)
    }

    /// Anchor a node to a zone as the zone's enclosure.
    ///
    /// The node's current world box becomes the zone's extent. Zones that
    /// refuse to let their enclosure visit elsewhere also clear the node's
    /// visiting permission.
    pub fn set_enclosure_node(&mut self, zone: ZoneKey, node: NodeKey) -> Result<()> {
        self.require_zone(zone)?;
        self.require_node(node)?;
        let world_aabb = {
            let node = &self.nodes[node];
            node.local_bounds().transformed(&node.world_transform())
        };
        self.move_node_home(node, zone);
        let may_visit = {
            let zone = &mut self.zones[zone];
            zone.set_enclosure_node(node, world_aabb);
            zone.enclosure_node_may_visit()
        };
        let node = &mut self.nodes[node];
        node.set_anchored(true);
        if !may_visit {
            node.set_allowed_to_visit(false);
        }
        Ok(())
    }

    // ===== SCENE NODES =====

    pub fn create_scene_node(&mut self, name: &str) -> Result<NodeKey> {
        if self.node_names.contains_key(name) {
            crate::engine_bail!(LOG_SOURCE, DuplicateItem: "A scene node named '{}' already exists", name);
        }
        let key = self.nodes.insert(SceneNode::new(name));
        self.node_names.insert(name.to_string(), key);
        crate::engine_trace!(LOG_SOURCE, "Created scene node '{}'", name);
        Ok(key)
    }

    /// Destroy a node, removing every reference other objects hold to it.
    pub fn destroy_scene_node(&mut self, key: NodeKey) -> Result<()> {
        let Some(node) = self.nodes.remove(key) else {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Scene node {:?} not found", key);
        };
        self.node_names.remove(node.name());

        if let Some(zone) = node.home_zone().and_then(|home| self.zones.get_mut(home)) {
            zone.remove_home_node(key);
        }
        for &visited in node.visiting_zones() {
            if let Some(zone) = self.zones.get_mut(visited) {
                zone.remove_visitor_node(key);
            }
        }
        for zone in self.zones.values_mut() {
            if zone.core().enclosure_node() == Some(key) {
                zone.core_mut().set_enclosure(None, AABB::NULL);
            }
        }
        for camera in self.cameras.values_mut().filter(|c| c.node() == Some(key)) {
            camera.set_node(None);
        }
        for light in self.lights.values_mut().filter(|l| l.node() == Some(key)) {
            light.set_node(None);
        }
        for portal in self.portals.values_mut().filter(|p| p.node() == Some(key)) {
            portal.set_node(None);
        }
        if self.sky_node == Some(key) {
            self.sky_node = None;
            self.sky_enabled = false;
        }
        self.visible_nodes.retain(|k| *k != key);

        crate::engine_trace!(LOG_SOURCE, "Destroyed scene node '{}'", node.name());
        Ok(())
    }

    pub fn destroy_scene_node_by_name(&mut self, name: &str) -> Result<()> {
        let Some(key) = self.scene_node_by_name(name) else {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Scene node '{}' not found", name);
        };
        self.destroy_scene_node(key)
    }

    pub fn scene_node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub fn scene_node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    pub fn scene_node_by_name(&self, name: &str) -> Option<NodeKey> {
        self.node_names.get(name).copied()
    }

    pub fn scene_node_keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys()
    }

    pub fn scene_node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Move a node into a zone by hand; visitors are recomputed next frame.
    pub fn set_node_home_zone(&mut self, node: NodeKey, zone: ZoneKey) -> Result<()> {
        self.require_zone(zone)?;
        self.require_node(node)?;
        self.move_node_home(node, zone);
        self.nodes[node].set_moved(true);
        Ok(())
    }

    /// Pin a node to a zone (`Some`) or let portals move it again (`None`).
    pub fn anchor_node_to_home_zone(&mut self, node: NodeKey, zone: Option<ZoneKey>) -> Result<()> {
        self.require_node(node)?;
        match zone {
            Some(zone) => {
                self.set_node_home_zone(node, zone)?;
                self.nodes[node].set_anchored(true);
            }
            None => self.nodes[node].set_anchored(false),
        }
        Ok(())
    }

    pub fn set_node_allowed_to_visit(&mut self, node: NodeKey, allowed: bool) -> Result<()> {
        self.require_node(node)?;
        let node = &mut self.nodes[node];
        node.set_allowed_to_visit(allowed);
        node.set_moved(true);
        Ok(())
    }

    // ===== PORTALS =====

    pub fn create_portal(&mut self, name: &str, shape: PortalShape) -> Result<PortalKey> {
        self.insert_portal(name, PortalKind::Portal, shape)
    }

    pub fn create_anti_portal(&mut self, name: &str, shape: PortalShape) -> Result<PortalKey> {
        self.insert_portal(name, PortalKind::AntiPortal, shape)
    }

    fn insert_portal(&mut self, name: &str, kind: PortalKind, shape: PortalShape) -> Result<PortalKey> {
        if self.portal_names.contains_key(name) {
            crate::engine_bail!(LOG_SOURCE, DuplicateItem: "A portal named '{}' already exists", name);
        }
        let key = self.portals.insert(Portal::new(name, kind, shape));
        self.portal_names.insert(name.to_string(), key);
        crate::engine_debug!(LOG_SOURCE, "Created {:?} '{}' ({:?})", kind, name, shape);
        Ok(key)
    }

    pub fn destroy_portal(&mut self, key: PortalKey) -> Result<()> {
        self.remove_portal(key, PortalKind::Portal)
    }

    pub fn destroy_portal_by_name(&mut self, name: &str) -> Result<()> {
        let key = self.require_portal_named(name)?;
        self.destroy_portal(key)
    }

    pub fn destroy_anti_portal(&mut self, key: PortalKey) -> Result<()> {
        self.remove_portal(key, PortalKind::AntiPortal)
    }

    pub fn destroy_anti_portal_by_name(&mut self, name: &str) -> Result<()> {
        let key = self.require_portal_named(name)?;
        self.destroy_anti_portal(key)
    }

    fn remove_portal(&mut self, key: PortalKey, kind: PortalKind) -> Result<()> {
        if self.portals.get(key).map(Portal::kind) != Some(kind) {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "No {:?} with key {:?}", kind, key);
        }
        let Some(portal) = self.portals.remove(key) else {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "No {:?} with key {:?}", kind, key);
        };
        for other in self.portals.values_mut().filter(|p| p.target_portal() == Some(key)) {
            other.set_target_portal(None);
        }
        if let Some(zone) = portal.current_home_zone().and_then(|home| self.zones.get_mut(home)) {
            match kind {
                PortalKind::Portal => zone.core_mut().remove_portal(key),
                PortalKind::AntiPortal => zone.core_mut().remove_anti_portal(key),
            }
        }
        for camera in self.cameras.values_mut() {
            camera.remove_portal_culling_planes(key);
        }
        self.portal_names.remove(portal.name());
        crate::engine_debug!(LOG_SOURCE, "Destroyed {:?} '{}'", kind, portal.name());
        Ok(())
    }

    pub fn portal(&self, key: PortalKey) -> Option<&Portal> {
        self.portals.get(key)
    }

    pub fn portal_mut(&mut self, key: PortalKey) -> Option<&mut Portal> {
        self.portals.get_mut(key)
    }

    /// Portal or anti-portal with this name.
    pub fn portal_by_name(&self, name: &str) -> Option<PortalKey> {
        self.portal_names.get(name).copied()
    }

    pub fn portal_keys(&self) -> impl Iterator<Item = PortalKey> + '_ {
        self.portals.keys()
    }

    /// Give a portal or anti-portal a (new) home zone.
    pub fn add_portal_to_zone(&mut self, portal: PortalKey, zone: ZoneKey) -> Result<()> {
        self.require_zone(zone)?;
        self.require_portal(portal)?;
        let (kind, previous) = {
            let p = &self.portals[portal];
            (p.kind(), p.current_home_zone())
        };
        if let Some(old) = previous.and_then(|old| self.zones.get_mut(old)) {
            old.core_mut().remove_portal(portal);
            old.core_mut().remove_anti_portal(portal);
        }
        self.portals[portal].set_current_home_zone(Some(zone));
        let core = self.zones[zone].core_mut();
        match kind {
            PortalKind::Portal => core.add_portal(portal),
            PortalKind::AntiPortal => core.add_anti_portal(portal),
        }
        Ok(())
    }

    /// Point a portal at the zone it leads to, and optionally at the
    /// matching portal on the far side.
    pub fn set_portal_target(
        &mut self,
        portal: PortalKey,
        target_zone: ZoneKey,
        target_portal: Option<PortalKey>,
    ) -> Result<()> {
        self.require_portal(portal)?;
        self.require_zone(target_zone)?;
        if let Some(target_portal) = target_portal {
            self.require_portal(target_portal)?;
        }
        if self.portals[portal].is_anti_portal() {
            crate::engine_bail!(LOG_SOURCE, "Anti-portal '{}' cannot lead to another zone",
                self.portals[portal].name());
        }
        let p = &mut self.portals[portal];
        p.set_target_zone(Some(target_zone));
        p.set_target_portal(target_portal);
        if let Some(zone) = p.current_home_zone().and_then(|home| self.zones.get_mut(home)) {
            zone.core_mut().set_portals_updated(true);
        }
        Ok(())
    }

    /// Let a node carry a portal.
    ///
    /// With `center_node` the portal's geometry is re-expressed around its
    /// own centre and the node is moved onto that centre, so the portal stays
    /// where it was in the world.
    pub fn attach_portal_to_node(&mut self, portal: PortalKey, node: NodeKey, center_node: bool) -> Result<()> {
        self.require_portal(portal)?;
        self.require_node(node)?;
        if center_node {
            let (position, orientation) = self.portals[portal].adjust_node_to_match(node);
            let node = &mut self.nodes[node];
            node.set_position(position);
            node.set_orientation(orientation);
        } else {
            self.portals[portal].set_node(Some(node));
        }
        Ok(())
    }

    /// Link every portal without a target to the coincident portal of
    /// another zone, in both directions.
    ///
    /// Fails on the first portal for which no partner is found.
    pub fn connect_portals_to_target_zones_by_location(&mut self) -> Result<()> {
        self.refresh_portal_geometry();

        let unconnected: Vec<PortalKey> = self
            .portals
            .iter()
            // Portals not yet placed in a zone are skipped
            .filter(|(_, p)| {
                p.kind() == PortalKind::Portal && p.target_zone().is_none() && p.current_home_zone().is_some()
            })
            .map(|(key, _)| key)
            .collect();

        for key in unconnected {
            // An earlier partner may already have linked this one
            if self.portals[key].target_zone().is_some() {
                continue;
            }
            let home = self.portals[key].current_home_zone();
            let partner = self.portals.iter().find(|(other_key, other)| {
                *other_key != key
                    && other.kind() == PortalKind::Portal
                    && other.current_home_zone().is_some()
                    && other.current_home_zone() != home
                    && self.portals[key].close_to(other)
            });
            let (Some(home), Some((partner, partner_home))) =
                (home, partner.map(|(k, p)| (k, p.current_home_zone())))
            else {
                crate::engine_bail!(LOG_SOURCE, ItemNotFound:
                    "Could not find a matching portal for portal '{}'", self.portals[key].name());
            };

            crate::engine_info!(LOG_SOURCE, "Connecting portal '{}' to portal '{}'",
                self.portals[key].name(), self.portals[partner].name());

            let p = &mut self.portals[key];
            p.set_target_zone(partner_home);
            p.set_target_portal(Some(partner));
            let q = &mut self.portals[partner];
            q.set_target_zone(Some(home));
            q.set_target_portal(Some(key));
        }
        Ok(())
    }

    // ===== CAMERAS =====

    /// Register a camera; every zone is told about it.
    pub fn create_camera(&mut self, name: &str, camera: Camera) -> Result<CameraKey> {
        if self.camera_names.contains_key(name) {
            crate::engine_bail!(LOG_SOURCE, DuplicateItem: "A camera named '{}' already exists", name);
        }
        let key = self.cameras.insert(PczCamera::new(name, camera));
        self.camera_names.insert(name.to_string(), key);
        for zone in self.zones.values_mut() {
            zone.notify_camera_created(key, &self.cameras[key]);
        }
        crate::engine_debug!(LOG_SOURCE, "Created camera '{}'", name);
        Ok(key)
    }

    pub fn destroy_camera(&mut self, key: CameraKey) -> Result<()> {
        let Some(camera) = self.cameras.remove(key) else {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Camera {:?} not found", key);
        };
        self.camera_names.remove(camera.name());
        if self.visible_cache.is_some_and(|cache| cache.camera == key) {
            self.visible_cache = None;
        }
        crate::engine_debug!(LOG_SOURCE, "Destroyed camera '{}'", camera.name());
        Ok(())
    }

    pub fn camera(&self, key: CameraKey) -> Option<&PczCamera> {
        self.cameras.get(key)
    }

    pub fn camera_mut(&mut self, key: CameraKey) -> Option<&mut PczCamera> {
        self.cameras.get_mut(key)
    }

    pub fn camera_by_name(&self, name: &str) -> Option<CameraKey> {
        self.camera_names.get(name).copied()
    }

    /// Make a camera follow a node (or stand alone with `None`).
    pub fn attach_camera_to_node(&mut self, camera: CameraKey, node: Option<NodeKey>) -> Result<()> {
        self.require_camera(camera)?;
        if let Some(node) = node {
            self.require_node(node)?;
            let (position, orientation) = (self.nodes[node].position(), self.nodes[node].orientation());
            self.cameras[camera].sync_to(position, orientation);
        }
        self.cameras[camera].set_node(node);
        Ok(())
    }

    // ===== LIGHTS =====

    pub fn create_light(&mut self, name: &str, light_type: LightType) -> Result<LightKey> {
        if self.light_names.contains_key(name) {
            crate::engine_bail!(LOG_SOURCE, DuplicateItem: "A light named '{}' already exists", name);
        }
        let key = self.lights.insert(PczLight::new(name, light_type));
        self.light_names.insert(name.to_string(), key);
        crate::engine_debug!(LOG_SOURCE, "Created {:?} light '{}'", light_type, name);
        Ok(key)
    }

    pub fn destroy_light(&mut self, key: LightKey) -> Result<()> {
        let Some(light) = self.lights.remove(key) else {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Light {:?} not found", key);
        };
        self.light_names.remove(light.name());
        crate::engine_debug!(LOG_SOURCE, "Destroyed light '{}'", light.name());
        Ok(())
    }

    pub fn light(&self, key: LightKey) -> Option<&PczLight> {
        self.lights.get(key)
    }

    pub fn light_mut(&mut self, key: LightKey) -> Option<&mut PczLight> {
        self.lights.get_mut(key)
    }

    pub fn light_by_name(&self, name: &str) -> Option<LightKey> {
        self.light_names.get(name).copied()
    }

    pub fn light_keys(&self) -> impl Iterator<Item = LightKey> + '_ {
        self.lights.keys()
    }

    pub fn attach_light_to_node(&mut self, light: LightKey, node: Option<NodeKey>) -> Result<()> {
        if !self.lights.contains_key(light) {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Light {:?} not found", light);
        }
        if let Some(node) = node {
            self.require_node(node)?;
        }
        self.lights[light].set_node(node);
        Ok(())
    }

    // ===== SKY =====

    pub fn sky_node(&self) -> Option<NodeKey> {
        self.sky_node
    }

    /// Use a node as the sky; it is anchored to the default zone until
    /// `set_sky_zone` says otherwise.
    pub fn set_sky_node(&mut self, node: Option<NodeKey>) -> Result<()> {
        if let Some(node) = node {
            self.require_node(node)?;
        }
        self.sky_node = node;
        match node {
            Some(_) => self.set_sky_zone(None),
            None => {
                self.sky_enabled = false;
                Ok(())
            }
        }
    }

    /// Anchor the sky node to a zone (the default zone for `None`).
    pub fn set_sky_zone(&mut self, zone: Option<ZoneKey>) -> Result<()> {
        let zone = zone.unwrap_or(self.default_zone);
        self.require_zone(zone)?;
        let Some(sky) = self.sky_node else {
            return Ok(());
        };
        if let Some(old) = self.nodes[sky].home_zone().and_then(|home| self.zones.get_mut(home)) {
            old.core_mut().set_has_sky(false);
        }
        self.move_node_home(sky, zone);
        self.nodes[sky].set_anchored(true);
        self.zones[zone].core_mut().set_has_sky(true);
        Ok(())
    }

    /// Turn sky rendering on or off; stays off without a sky node.
    pub fn enable_sky(&mut self, enable: bool) {
        self.sky_enabled = enable && self.sky_node.is_some();
    }

    pub fn is_sky_enabled(&self) -> bool {
        self.sky_enabled
    }

    // ===== OPTIONS =====

    pub fn back_touch_policy(&self) -> BackTouchPolicy {
        self.back_touch_policy
    }

    pub fn set_back_touch_policy(&mut self, policy: BackTouchPolicy) {
        self.back_touch_policy = policy;
    }

    /// Apply an option.
    ///
    /// Manager keys are handled here; anything else is offered to each zone
    /// until one accepts it. Returns false when nobody knows the key.
    pub fn set_option(&mut self, key: &str, value: &OptionValue) -> Result<bool> {
        match key {
            "ShowBoundingBoxes" => {
                self.show_bounding_boxes = Self::bool_option(key, value)?;
                Ok(true)
            }
            "ShowPortals" => {
                self.show_portals = Self::bool_option(key, value)?;
                Ok(true)
            }
            "BackTouchPolicy" => {
                let Some(text) = value.as_text() else {
                    crate::engine_bail!(LOG_SOURCE, InvalidConfig:
                        "Option 'BackTouchPolicy' expects text, got {:?}", value);
                };
                self.back_touch_policy = text.parse()?;
                Ok(true)
            }
            _ => {
                for zone in self.zones.values_mut() {
                    if zone.set_option(key, value)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Apply an option to one zone only.
    pub fn set_zone_option(&mut self, zone: ZoneKey, key: &str, value: &OptionValue) -> Result<bool> {
        self.require_zone(zone)?;
        self.zones[zone].set_option(key, value)
    }

    pub fn get_option(&self, key: &str) -> Option<OptionValue> {
        match key {
            "ShowBoundingBoxes" => Some(OptionValue::Bool(self.show_bounding_boxes)),
            "ShowPortals" => Some(OptionValue::Bool(self.show_portals)),
            "BackTouchPolicy" => Some(OptionValue::from(self.back_touch_policy.as_str())),
            _ => self.zones.values().find_map(|zone| zone.get_option(key)),
        }
    }

    /// Every key understood by the manager or one of its zones.
    pub fn option_keys(&self) -> Vec<&'static str> {
        let mut keys = OPTION_KEYS.to_vec();
        for zone in self.zones.values() {
            for key in zone.option_keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    fn bool_option(key: &str, value: &OptionValue) -> Result<bool> {
        value.as_bool().ok_or_else(|| crate::engine_err!(LOG_SOURCE, InvalidConfig:
            "Option '{}' expects a boolean, got {:?}", key, value))
    }

    // ===== LOOKUP HELPERS =====

    pub(super) fn require_zone(&self, key: ZoneKey) -> Result<()> {
        if !self.zones.contains_key(key) {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Zone {:?} not found", key);
        }
        Ok(())
    }

    fn require_zone_named(&self, name: &str) -> Result<ZoneKey> {
        self.zone_by_name(name).ok_or_else(|| crate::engine_err!(LOG_SOURCE, ItemNotFound:
            "Zone '{}' not found", name))
    }

    pub(super) fn require_node(&self, key: NodeKey) -> Result<()> {
        if !self.nodes.contains_key(key) {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Scene node {:?} not found", key);
        }
        Ok(())
    }

    fn require_portal(&self, key: PortalKey) -> Result<()> {
        if !self.portals.contains_key(key) {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Portal {:?} not found", key);
        }
        Ok(())
    }

    fn require_portal_named(&self, name: &str) -> Result<PortalKey> {
        self.portal_by_name(name).ok_or_else(|| crate::engine_err!(LOG_SOURCE, ItemNotFound:
            "Portal '{}' not found", name))
    }

    pub(super) fn require_camera(&self, key: CameraKey) -> Result<()> {
        if !self.cameras.contains_key(key) {
            crate::engine_bail!(LOG_SOURCE, ItemNotFound: "Camera {:?} not found", key);
        }
        Ok(())
    }

    /// Current world position of a camera, following its node if attached.
    pub fn camera_position(&self, key: CameraKey) -> Option<Vec3> {
        let camera = self.cameras.get(key)?;
        Some(match camera.node().and_then(|node| self.nodes.get(node)) {
            Some(node) => node.position(),
            None => camera.position(),
        })
    }
}

#[cfg(test)]
#[path = "scene_manager_tests.rs"]
mod tests;
