/// Zone maintenance — the per-frame update that keeps nodes, portals and
/// lights consistent with the zone graph.
///
/// Order matters: transforms are snapshotted first, then portals that
/// crossed other portals change zones, nodes near moving portals are
/// flagged, every moved node gets its home and visited zones recomputed,
/// and finally lights work out which zones they reach.

use glam::Vec3;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::camera::CameraKey;
use crate::octree::SceneQuery;
use crate::portal::{PortalIntersectResult, PortalKey, PortalKind};
use crate::zone::{Zone, ZoneKey};
use super::options::BackTouchPolicy;
use super::scene_manager::PczSceneManager;
use super::scene_node::{NodeKey, SceneNode};

const LOG_SOURCE: &str = "pcz::SceneManager";

/// Smallest-volume zone whose bounds contain `point`, else `fallback`.
pub(super) fn zone_for_point(zones: &SlotMap<ZoneKey, Box<dyn Zone>>, fallback: ZoneKey, point: Vec3) -> ZoneKey {
    let mut best = fallback;
    let mut best_volume = f32::INFINITY;
    for (key, zone) in zones {
        let bounds = zone.bounds();
        if bounds.is_null() || !bounds.contains_point(point) {
            continue;
        }
        let volume = bounds.volume();
        if volume < best_volume {
            best = key;
            best_volume = volume;
        }
    }
    best
}

impl PczSceneManager {
    /// Start a new frame and bring the zone graph up to date.
    ///
    /// `camera` supplies the fallback zone for lights that cannot locate
    /// themselves. Never fails; dangling references are skipped.
    pub fn update_scene_graph(&mut self, camera: Option<CameraKey>) {
        self.frame_count += 1;

        self.update_transforms();
        self.refresh_portal_geometry();
        self.refresh_enclosures();
        self.update_portal_zone_data();
        self.dirty_nodes_by_moving_portals();
        self.update_moved_nodes();
        self.update_light_zones(camera);

        // Cleared last so changes made during this frame are seen by lights
        for zone in self.zones.values_mut() {
            zone.core_mut().set_portals_updated(false);
        }
    }

    /// Zone containing a point; the default zone when none does.
    pub fn find_zone_for_point(&self, point: Vec3) -> ZoneKey {
        zone_for_point(&self.zones, self.default_zone, point)
    }

    // ===== TRANSFORMS =====

    fn update_transforms(&mut self) {
        for node in self.nodes.values_mut() {
            node.update_transform();
        }
        for camera in self.cameras.values_mut() {
            if let Some(node) = camera.node().and_then(|key| self.nodes.get(key)) {
                camera.sync_to(node.position(), node.orientation());
            }
        }
        for light in self.lights.values_mut() {
            let node = light.node().and_then(|key| self.nodes.get(key));
            light.sync_to_node(node);
        }
    }

    /// Push node transforms into every portal's world geometry.
    pub(super) fn refresh_portal_geometry(&mut self) {
        for portal in self.portals.values_mut() {
            let transform = portal.node().and_then(|key| self.nodes.get(key)).map(SceneNode::world_transform);
            portal.update_derived_values(transform.as_ref());
        }
    }

    fn refresh_enclosures(&mut self) {
        for zone in self.zones.values_mut() {
            let Some(key) = zone.core().enclosure_node() else {
                continue;
            };
            match self.nodes.get(key) {
                Some(node) if node.is_moved() => zone.set_enclosure_node(key, *node.world_aabb()),
                _ => {}
            }
        }
    }

    // ===== PORTAL ZONE DATA =====

    fn update_portal_zone_data(&mut self) {
        let zone_keys: Vec<ZoneKey> = self.zones.keys().collect();
        for zone_key in zone_keys {
            self.update_zone_portals(zone_key);
        }
    }

    /// Detect portals of one zone that crossed a larger portal and move
    /// them into that portal's target zone.
    ///
    /// Candidates are gathered during the scan and moved afterwards.
    fn update_zone_portals(&mut self, zone_key: ZoneKey) {
        let Some(zone) = self.zones.get(zone_key) else {
            return;
        };
        let portal_keys = zone.core().portals().to_vec();
        let anti_portal_keys = zone.core().anti_portals().to_vec();
        let mut transfers: Vec<(PortalKey, Option<ZoneKey>)> = Vec::new();

        for (i, &key) in portal_keys.iter().enumerate() {
            let Some(portal) = self.portals.get(key) else {
                continue;
            };
            let moving = portal.needs_update();
            let radius = portal.radius();

            // Same-zone portals leading elsewhere; earlier pairs were already tested
            for &other_key in &portal_keys[i + 1..] {
                let Some(other) = self.portals.get(other_key) else {
                    continue;
                };
                if !moving && !other.needs_update() {
                    continue;
                }
                if other.target_zone() == Some(zone_key) || other.target_zone() == portal.target_zone() {
                    continue;
                }
                if radius > other.radius() {
                    if portal.target_zone().is_some()
                        && other.current_home_zone() != portal.target_zone()
                        && other.crossed_portal(portal)
                    {
                        transfers.push((other_key, portal.target_zone()));
                    }
                } else if radius < other.radius()
                    && other.target_zone().is_some()
                    && portal.current_home_zone() != other.target_zone()
                    && portal.crossed_portal(other)
                {
                    transfers.push((key, other.target_zone()));
                }
            }

            // Smaller anti-portals of this zone
            for &anti_key in &anti_portal_keys {
                let Some(anti) = self.portals.get(anti_key) else {
                    continue;
                };
                if !moving && !anti.needs_update() {
                    continue;
                }
                if radius > anti.radius() && portal.target_zone().is_some() && anti.crossed_portal(portal) {
                    transfers.push((anti_key, portal.target_zone()));
                }
            }

            if !moving {
                continue;
            }

            // A moving portal that crossed a larger portal of its target zone
            // now leads where that portal leads
            let retarget = portal.target_zone().filter(|target| *target != zone_key).and_then(|target| {
                let target_zone = self.zones.get(target)?;
                target_zone.core().portals().iter().find_map(|&far_key| {
                    let far = self.portals.get(far_key)?;
                    let crossed = radius < far.radius()
                        && far.target_zone().is_some()
                        && portal.current_home_zone() != far.target_zone()
                        && portal.crossed_portal(far);
                    crossed.then(|| far.target_zone()).flatten()
                })
            });
            if let Some(new_target) = retarget {
                self.portals[key].set_target_zone(Some(new_target));
                crate::engine_debug!(LOG_SOURCE, "Portal '{}' now leads to zone '{}'",
                    self.portals[key].name(), self.zones.get(new_target).map_or("?", |z| z.name()));
            }
        }

        for &(key, new_home) in &transfers {
            self.portals[key].set_new_home_zone(new_home);
        }
        for (key, _) in transfers {
            self.transfer_portal(key, zone_key);
        }
    }

    /// Move a portal flagged with a new home zone out of `from`.
    fn transfer_portal(&mut self, key: PortalKey, from: ZoneKey) {
        let portal = &mut self.portals[key];
        let Some(new_home) = portal.new_home_zone() else {
            return;
        };
        portal.set_new_home_zone(None);
        if !self.zones.contains_key(new_home) {
            return;
        }
        portal.set_current_home_zone(Some(new_home));
        let kind = portal.kind();

        if let Some(old) = self.zones.get_mut(from) {
            match kind {
                PortalKind::Portal => old.core_mut().remove_portal(key),
                PortalKind::AntiPortal => old.core_mut().remove_anti_portal(key),
            }
        }
        let new_zone = &mut self.zones[new_home];
        match kind {
            PortalKind::Portal => new_zone.core_mut().add_portal(key),
            PortalKind::AntiPortal => new_zone.core_mut().add_anti_portal(key),
        }
        crate::engine_debug!(LOG_SOURCE, "{:?} '{}' moved to zone '{}'",
            kind, self.portals[key].name(), self.zones[new_home].name());
    }

    // ===== NODES =====

    /// Flag every node a moving portal swept over.
    fn dirty_nodes_by_moving_portals(&mut self) {
        let mut dirty = FxHashSet::default();
        for portal in self.portals.values() {
            if portal.is_anti_portal() || !portal.needs_update() {
                continue;
            }
            let Some(zone) = portal.current_home_zone().and_then(|home| self.zones.get(home)) else {
                continue;
            };
            let query = SceneQuery::Aabb(portal.swept_bounds());
            zone.find_local_nodes(&query, true, None, &self.nodes, &mut dirty);
        }
        for key in dirty {
            if let Some(node) = self.nodes.get_mut(key) {
                node.set_moved(true);
            }
        }
    }

    fn update_moved_nodes(&mut self) {
        let moved: Vec<NodeKey> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.is_moved() && node.is_enabled())
            .map(|(key, _)| key)
            .collect();
        for key in moved {
            self.update_node(key);
        }
    }

    /// Recompute one node's home zone, visited zones and zone data.
    fn update_node(&mut self, key: NodeKey) {
        for visited in self.nodes[key].take_visiting_zones() {
            if let Some(zone) = self.zones.get_mut(visited) {
                zone.remove_visitor_node(key);
            }
        }

        self.update_home_zone(key);

        let node = &self.nodes[key];
        if let Some(home) = node.home_zone() {
            if node.allowed_to_visit() {
                self.check_node_against_portals(key, home, None);
            }
        }

        let node = &self.nodes[key];
        let holders: Vec<ZoneKey> = node.home_zone().into_iter().chain(node.visiting_zones().iter().copied()).collect();
        for zone_key in holders {
            if let Some(zone) = self.zones.get_mut(zone_key) {
                if zone.requires_zone_specific_node_data() {
                    zone.update_node_zone_data(key, &self.nodes[key]);
                }
            }
        }
        self.nodes[key].set_moved(false);
    }

    fn update_home_zone(&mut self, key: NodeKey) {
        let node = &self.nodes[key];
        match node.home_zone() {
            Some(home) if self.zones.contains_key(home) => {
                if !node.is_anchored() {
                    let allow_back = self.back_touch_policy == BackTouchPolicy::Always;
                    self.update_node_home_zone(key, home, allow_back);
                }
            }
            _ => {
                let zone = self.find_zone_for_point(node.derived_position());
                self.move_node_home(key, zone);
            }
        }
    }

    /// Follow the portals of `zone_key` the node went through.
    ///
    /// A crossing always moves the node; a back touch only when
    /// `allow_back` is set. The search continues from the new zone since
    /// one frame's motion may cross several portals.
    fn update_node_home_zone(&mut self, key: NodeKey, zone_key: ZoneKey, allow_back: bool) {
        let Some(zone) = self.zones.get(zone_key) else {
            return;
        };
        for portal_key in zone.core().portals().to_vec() {
            let Some(portal) = self.portals.get(portal_key) else {
                continue;
            };
            let Some(target) = portal.target_zone() else {
                continue;
            };
            let node = &self.nodes[key];
            let result = portal.intersects_node(key, node);
            let follow = match result {
                PortalIntersectResult::IntersectCross => true,
                PortalIntersectResult::IntersectBackNoCross => allow_back,
                _ => false,
            };
            if !follow || target == zone_key || Some(target) == node.home_zone() || !self.zones.contains_key(target) {
                continue;
            }

            let next_allow_back = match self.back_touch_policy {
                BackTouchPolicy::Never => false,
                BackTouchPolicy::AfterCrossing => result == PortalIntersectResult::IntersectCross,
                BackTouchPolicy::Always => true,
            };
            self.move_node_home(key, target);
            self.update_node_home_zone(key, target, next_allow_back);
            return;
        }
    }

    /// Register the node as a visitor of every zone it reaches into
    /// through the portals of `zone_key`, recursively.
    fn check_node_against_portals(&mut self, key: NodeKey, zone_key: ZoneKey, ignore: Option<PortalKey>) {
        let Some(zone) = self.zones.get(zone_key) else {
            return;
        };
        if zone.core().enclosure_node() == Some(key) || !self.nodes[key].allowed_to_visit() {
            return;
        }
        for portal_key in zone.core().portals().to_vec() {
            if Some(portal_key) == ignore {
                continue;
            }
            let Some(portal) = self.portals.get(portal_key) else {
                continue;
            };
            let Some(target) = portal.target_zone() else {
                continue;
            };
            let node = &self.nodes[key];
            if Some(target) == node.home_zone() || node.is_visiting_zone(target) || !self.zones.contains_key(target) {
                continue;
            }
            if portal.intersects_node(key, node) == PortalIntersectResult::NoIntersect {
                continue;
            }

            let back = portal.target_portal();
            self.nodes[key].add_visiting_zone(target);
            self.zones[target].add_visitor_node(key, &self.nodes[key]);
            self.check_node_against_portals(key, target, back);
        }
    }

    /// Make `zone` the node's home, keeping both zones' home sets in step.
    pub(super) fn move_node_home(&mut self, key: NodeKey, zone: ZoneKey) {
        let previous = self.nodes[key].home_zone();
        if previous != Some(zone) {
            if let Some(old) = previous.and_then(|old| self.zones.get_mut(old)) {
                old.remove_home_node(key);
            }
            self.nodes[key].set_home_zone(Some(zone));
            crate::engine_trace!(LOG_SOURCE, "Node '{}' now lives in zone '{}'",
                self.nodes[key].name(), self.zones.get(zone).map_or("?", |z| z.name()));
        }
        if let Some(new_zone) = self.zones.get_mut(zone) {
            new_zone.add_home_node(key, &self.nodes[key]);
        }
    }

    // ===== LIGHTS =====

    fn update_light_zones(&mut self, camera: Option<CameraKey>) {
        let fallback = camera
            .and_then(|camera| self.camera_home_zone(camera))
            .unwrap_or(self.default_zone);
        let frame = self.frame_count;

        for light in self.lights.values_mut() {
            if !light.needs_update(&self.zones) {
                continue;
            }
            let home = match light.node() {
                Some(node) => self.nodes.get(node).and_then(SceneNode::home_zone),
                None => Some(zone_for_point(&self.zones, self.default_zone, light.derived_position())),
            };
            light.update_zones(home.unwrap_or(fallback), frame, &self.zones, &self.portals);
            light.clear_needs_update();
        }
    }
}
