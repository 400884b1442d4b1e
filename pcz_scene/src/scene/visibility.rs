/// Visibility — camera walks through the zone graph and spatial queries.
///
/// The walk starts in the camera's home zone and recurses through every
/// portal the camera can see, narrowing the camera's extra culling frustum
/// at each step. Anti-portals are processed in the same distance order and
/// hide whatever later portals they fully cover.

use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::camera::{CameraKey, PczCamera, PczFrustum};
use crate::error::Result;
use crate::geometry::{Ray, Sphere};
use crate::octree::SceneQuery;
use crate::portal::{Portal, PortalKey, PortalKind};
use crate::zone::{Zone, ZoneKey};
use super::light::{LightKey, LightType};
use super::render_queue::RenderQueue;
use super::scene_manager::{PczSceneManager, VisibleCacheKey};
use super::scene_node::{NodeKey, SceneNode};

const LOG_SOURCE: &str = "pcz::SceneManager";

/// State of one camera walk, borrowing only what the walk touches.
struct VisibilityWalk<'a> {
    zones: &'a mut SlotMap<ZoneKey, Box<dyn Zone>>,
    nodes: &'a mut SlotMap<NodeKey, SceneNode>,
    portals: &'a SlotMap<PortalKey, Portal>,
    camera: &'a mut PczCamera,
    camera_key: CameraKey,
    frame: u64,
    queue: &'a mut dyn RenderQueue,
    visible: &'a mut Vec<NodeKey>,
    only_shadow_casters: bool,
    show_bounding_boxes: bool,
    show_portals: bool,
    sky_found: bool,
}

impl VisibilityWalk<'_> {
    fn find_visible_nodes(&mut self, zone_key: ZoneKey) {
        let Some(zone) = self.zones.get(zone_key) else {
            return;
        };
        if zone.core().is_empty() {
            return;
        }
        if zone.core().has_sky() {
            self.sky_found = true;
        }

        let mut candidates = Vec::new();
        zone.collect_visible_nodes(&*self.camera, &*self.nodes, &mut candidates);
        for key in candidates {
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            // Already reached through another zone this frame
            if !node.is_enabled() || node.is_stamped(self.frame, self.camera_key) {
                continue;
            }
            node.stamp_visible(self.frame, self.camera_key);
            self.visible.push(key);
            if !self.only_shadow_casters || node.cast_shadows() {
                self.queue.add_node(key, node);
            }
            if self.show_bounding_boxes || node.show_bounding_box() {
                self.queue.add_bounding_box(key, node.world_aabb());
            }
        }

        let camera_position = self.camera.position();
        let mut sorted: Vec<(f32, PortalKey)> = Vec::new();
        for &key in zone.core().portals().iter().chain(zone.core().anti_portals()) {
            let Some(portal) = self.portals.get(key) else {
                continue;
            };
            if self.camera.is_visible_portal(key, portal) {
                sorted.push((portal.derived_cp().distance_squared(camera_position), key));
            }
        }
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut entries: Vec<Option<PortalKey>> = sorted.into_iter().map(|(_, key)| Some(key)).collect();

        let portals = self.portals;
        for index in 0..entries.len() {
            let Some(key) = entries[index] else {
                continue;
            };
            let portal = &portals[key];
            match portal.kind() {
                PortalKind::Portal => {
                    let Some(target) = portal.target_zone() else {
                        continue;
                    };
                    if self.stamp_zone(target) {
                        self.camera.add_portal_culling_planes(key, portal);
                        self.find_visible_nodes(target);
                        self.camera.remove_portal_culling_planes(key);
                    }
                    if self.show_portals {
                        self.queue.add_portal(key, portal);
                    }
                }
                PortalKind::AntiPortal => {
                    let mut occluder = PczFrustum::new();
                    occluder.set_origin(camera_position);
                    occluder.set_projection_type(self.camera.projection_type());
                    // Box and sphere anti-portals only leave a marker and hide nothing
                    occluder.add_portal_culling_planes(key, portal);
                    if !occluder.has_culling_planes() {
                        continue;
                    }
                    for later in entries[index + 1..].iter_mut() {
                        let hidden = later
                            .and_then(|k| portals.get(k))
                            .is_some_and(|p| occluder.is_fully_visible_portal(p));
                        if hidden {
                            *later = None;
                        }
                    }
                }
            }
        }
    }

    /// Mark a zone as reached; false if this camera already reached it this frame.
    fn stamp_zone(&mut self, zone_key: ZoneKey) -> bool {
        let Some(zone) = self.zones.get_mut(zone_key) else {
            return false;
        };
        let core = zone.core_mut();
        if core.last_visible_frame() == self.frame && core.last_visible_camera() == Some(self.camera_key) {
            return false;
        }
        core.stamp_visible(self.frame, self.camera_key);
        true
    }
}

impl PczSceneManager {
    /// Zone a camera currently stands in: its node's home, else by position.
    pub fn camera_home_zone(&self, key: CameraKey) -> Option<ZoneKey> {
        let camera = self.cameras.get(key)?;
        let attached = camera
            .node()
            .and_then(|node| self.nodes.get(node))
            .and_then(SceneNode::home_zone)
            .filter(|zone| self.zones.contains_key(*zone));
        if let Some(zone) = attached {
            return Some(zone);
        }
        let position = self.camera_position(key)?;
        Some(self.find_zone_for_point(position))
    }

    /// Fill `queue` with the nodes `camera` can see through the zone graph.
    ///
    /// A second call for the same camera in the same frame replays the
    /// cached visible list instead of walking again.
    pub fn find_visible_objects(
        &mut self,
        camera: CameraKey,
        queue: &mut dyn RenderQueue,
        only_shadow_casters: bool,
    ) {
        queue.clear();
        let frame = self.frame_count;
        let cache = VisibleCacheKey { camera, frame };

        if self.visible_cache == Some(cache) {
            for &key in &self.visible_nodes {
                let Some(node) = self.nodes.get(key) else {
                    continue;
                };
                if !only_shadow_casters || node.cast_shadows() {
                    queue.add_node(key, node);
                }
                if self.show_bounding_boxes || node.show_bounding_box() {
                    queue.add_bounding_box(key, node.world_aabb());
                }
            }
            return;
        }

        let Some(home) = self.camera_home_zone(camera) else {
            crate::engine_warn!(LOG_SOURCE, "Visibility requested for unknown camera {:?}", camera);
            return;
        };
        self.sky_enabled = false;
        self.visible_nodes.clear();

        let Some(pcz_camera) = self.cameras.get_mut(camera) else {
            return;
        };
        if let Some(node) = pcz_camera.node().and_then(|key| self.nodes.get(key)) {
            pcz_camera.sync_to(node.position(), node.orientation());
        }
        pcz_camera.remove_all_extra_culling_planes();
        pcz_camera.update();
        if let Some(zone) = self.zones.get_mut(home) {
            zone.core_mut().stamp_visible(frame, camera);
        }

        let mut walk = VisibilityWalk {
            zones: &mut self.zones,
            nodes: &mut self.nodes,
            portals: &self.portals,
            camera: pcz_camera,
            camera_key: camera,
            frame,
            queue,
            visible: &mut self.visible_nodes,
            only_shadow_casters,
            show_bounding_boxes: self.show_bounding_boxes,
            show_portals: self.show_portals,
            sky_found: false,
        };
        walk.find_visible_nodes(home);
        let sky_found = walk.sky_found;

        self.enable_sky(sky_found);
        self.visible_cache = Some(cache);
        for light in self.lights.values_mut() {
            light.refresh_visible_zone_flag(frame, &self.zones);
        }
        crate::engine_trace!(LOG_SOURCE, "Frame {}: {} visible nodes", frame, self.visible_nodes.len());
    }

    /// Update the zone graph for `camera` and collect what it sees.
    pub fn render_scene(&mut self, camera: CameraKey, queue: &mut dyn RenderQueue) -> Result<()> {
        self.require_camera(camera)?;
        for zone in self.zones.values_mut() {
            zone.notify_begin_render_scene();
        }
        self.update_scene_graph(Some(camera));
        self.find_visible_objects(camera, queue, false);
        Ok(())
    }

    // ===== QUERIES =====

    /// Nodes touching `query`.
    ///
    /// With a start zone the search follows portals that touch the query;
    /// without one every zone is searched for its home nodes.
    pub fn find_nodes_in(
        &self,
        query: &SceneQuery,
        start_zone: Option<ZoneKey>,
        exclude: Option<NodeKey>,
    ) -> Vec<NodeKey> {
        let mut results = FxHashSet::default();
        match start_zone {
            Some(zone) => {
                let mut visited = FxHashSet::default();
                self.find_nodes_from(zone, query, exclude, &mut visited, &mut results);
            }
            None => {
                for zone in self.zones.values() {
                    zone.find_local_nodes(query, false, exclude, &self.nodes, &mut results);
                }
            }
        }
        results.into_iter().collect()
    }

    fn find_nodes_from(
        &self,
        zone_key: ZoneKey,
        query: &SceneQuery,
        exclude: Option<NodeKey>,
        visited: &mut FxHashSet<PortalKey>,
        results: &mut FxHashSet<NodeKey>,
    ) {
        let Some(zone) = self.zones.get(zone_key) else {
            return;
        };
        if zone.core().enclosure_node().is_some() && !query.touches(zone.core().enclosure_bounds()) {
            return;
        }
        zone.find_local_nodes(query, true, exclude, &self.nodes, results);

        for &key in zone.core().portals() {
            if visited.contains(&key) {
                continue;
            }
            let Some(portal) = self.portals.get(key) else {
                continue;
            };
            let Some(target) = portal.target_zone() else {
                continue;
            };
            if portal_touches(portal, query) {
                visited.insert(key);
                self.find_nodes_from(target, query, exclude, visited, results);
            }
        }
    }

    /// Nodes whose bounds the ray hits, nearest first.
    pub fn ray_query(&self, ray: &Ray, start_zone: Option<ZoneKey>) -> Vec<(NodeKey, f32)> {
        let mut hits: Vec<(NodeKey, f32)> = self
            .find_nodes_in(&SceneQuery::Ray(*ray), start_zone, None)
            .into_iter()
            .filter_map(|key| {
                let node = self.nodes.get(key)?;
                ray.intersects_aabb(node.world_aabb()).map(|distance| (key, distance))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    /// Visible lights touching a zone seen this frame, nearest first.
    ///
    /// Directional lights always pass and sort as if at distance zero.
    pub fn find_lights_affecting_frustum(&self, camera: CameraKey) -> Vec<LightKey> {
        let Some(pcz_camera) = self.cameras.get(camera) else {
            return Vec::new();
        };
        let position = pcz_camera.position();

        let mut found: Vec<(f32, LightKey)> = Vec::new();
        for (key, light) in &self.lights {
            if !light.is_visible() || !light.affects_visible_zone() {
                continue;
            }
            match light.light_type() {
                LightType::Directional => found.push((0.0, key)),
                LightType::Point | LightType::Spotlight => {
                    let sphere = Sphere::new(light.derived_position(), light.attenuation_range());
                    if pcz_camera.is_visible_sphere(&sphere) {
                        found.push((light.derived_position().distance_squared(position), key));
                    }
                }
            }
        }
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().map(|(_, key)| key).collect()
    }
}

fn portal_touches(portal: &Portal, query: &SceneQuery) -> bool {
    match query {
        SceneQuery::Aabb(aabb) => portal.intersects_aabb(aabb),
        SceneQuery::Sphere(sphere) => portal.intersects_sphere(sphere),
        SceneQuery::Ray(ray) => portal.intersects_ray(ray),
        SceneQuery::Volume(volume) => portal.intersects_volume(volume),
    }
}
