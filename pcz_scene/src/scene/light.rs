/// PczLight — a light that tracks which zones it can reach through portals.
///
/// Each update the light recomputes its affected zones by walking from its
/// home zone through every portal facing it and within its range, narrowing
/// a standalone culling frustum at each portal.

use glam::Vec3;
use slotmap::{new_key_type, SlotMap};
use crate::camera::PczFrustum;
use crate::portal::{Portal, PortalKey, PortalShape};
use crate::zone::{Zone, ZoneKey};
use super::scene_node::{NodeKey, SceneNode};

new_key_type! {
    /// Handle of a light owned by the scene manager.
    pub struct LightKey;
}

/// Default attenuation range (effectively unbounded).
pub const DEFAULT_ATTENUATION_RANGE: f32 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Point,
    Directional,
    Spotlight,
}

#[derive(Debug, Clone)]
pub struct PczLight {
    name: String,
    light_type: LightType,
    visible: bool,
    /// Position relative to the attached node (world position otherwise)
    position: Vec3,
    direction: Vec3,
    attenuation_range: f32,
    node: Option<NodeKey>,

    derived_position: Vec3,
    derived_direction: Vec3,

    affected_zones: Vec<ZoneKey>,
    /// At least one affected zone was visible in the frame of the last update
    affects_visible_zone: bool,
    needs_update: bool,
}

impl PczLight {
    pub fn new(name: impl Into<String>, light_type: LightType) -> Self {
        Self {
            name: name.into(),
            light_type,
            visible: true,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            attenuation_range: DEFAULT_ATTENUATION_RANGE,
            node: None,
            derived_position: Vec3::ZERO,
            derived_direction: Vec3::NEG_Z,
            affected_zones: Vec::new(),
            affects_visible_zone: false,
            needs_update: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
        self.needs_update = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.needs_update = true;
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize_or_zero();
        self.needs_update = true;
    }

    pub fn attenuation_range(&self) -> f32 {
        self.attenuation_range
    }

    pub fn set_attenuation_range(&mut self, range: f32) {
        self.attenuation_range = range;
        self.needs_update = true;
    }

    pub fn node(&self) -> Option<NodeKey> {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeKey>) {
        self.node = node;
        self.needs_update = true;
    }

    pub fn derived_position(&self) -> Vec3 {
        self.derived_position
    }

    pub fn derived_direction(&self) -> Vec3 {
        self.derived_direction
    }

    /// Recompute world placement from the attached node, flagging an
    /// update when it changed.
    pub(crate) fn sync_to_node(&mut self, node: Option<&SceneNode>) {
        let (position, direction) = match node {
            Some(node) => (
                node.world_transform().transform_point3(self.position),
                (node.orientation() * self.direction).normalize_or_zero(),
            ),
            None => (self.position, self.direction),
        };
        if position != self.derived_position || direction != self.derived_direction {
            self.derived_position = position;
            self.derived_direction = direction;
            self.needs_update = true;
        }
    }

    // ===== AFFECTED ZONES =====

    pub fn affected_zones(&self) -> &[ZoneKey] {
        &self.affected_zones
    }

    pub fn affects_zone(&self, zone: ZoneKey) -> bool {
        self.affected_zones.contains(&zone)
    }

    pub fn affects_visible_zone(&self) -> bool {
        self.affects_visible_zone
    }

    pub(crate) fn remove_zone_from_affected(&mut self, zone: ZoneKey) {
        self.affected_zones.retain(|z| *z != zone);
    }

    /// Re-derive `affects_visible_zone` after a visibility walk stamped zones.
    pub(crate) fn refresh_visible_zone_flag(&mut self, frame: u64, zones: &SlotMap<ZoneKey, Box<dyn Zone>>) {
        self.affects_visible_zone = self
            .affected_zones
            .iter()
            .filter_map(|key| zones.get(*key))
            .any(|zone| zone.core().last_visible_frame() == frame);
    }

    /// Forget every affected zone and request a fresh update.
    pub(crate) fn reset_affected_zones(&mut self) {
        self.affected_zones.clear();
        self.affects_visible_zone = false;
        self.needs_update = true;
    }

    /// True if the light changed or the portals of a zone it touches did.
    pub fn needs_update(&self, zones: &SlotMap<ZoneKey, Box<dyn Zone>>) -> bool {
        self.needs_update
            || self
                .affected_zones
                .iter()
                .filter_map(|key| zones.get(*key))
                .any(|zone| zone.core().portals_updated())
    }

    pub(crate) fn clear_needs_update(&mut self) {
        self.needs_update = false;
    }

    /// Recompute the zones this light reaches, starting from its home zone.
    pub(crate) fn update_zones(
        &mut self,
        home_zone: ZoneKey,
        frame: u64,
        zones: &SlotMap<ZoneKey, Box<dyn Zone>>,
        portals: &SlotMap<PortalKey, Portal>,
    ) {
        self.affected_zones.clear();
        self.affects_visible_zone = false;

        let Some(zone) = zones.get(home_zone) else {
            return;
        };
        self.affected_zones.push(home_zone);
        if zone.core().last_visible_frame() == frame {
            self.affects_visible_zone = true;
        }

        let mut frustum = PczFrustum::new();
        frustum.set_origin(self.derived_position);
        self.check_against_portals(home_zone, None, frame, &mut frustum, zones, portals);
    }

    fn check_against_portals(
        &mut self,
        zone_key: ZoneKey,
        ignore: Option<PortalKey>,
        frame: u64,
        frustum: &mut PczFrustum,
        zones: &SlotMap<ZoneKey, Box<dyn Zone>>,
        portals: &SlotMap<PortalKey, Portal>,
    ) {
        let Some(zone) = zones.get(zone_key) else {
            return;
        };
        for &portal_key in zone.core().portals() {
            if Some(portal_key) == ignore {
                continue;
            }
            let Some(portal) = portals.get(portal_key) else {
                continue;
            };
            let Some(target) = portal.target_zone() else {
                continue;
            };
            if !frustum.is_visible_portal(portal_key, portal) {
                continue;
            }

            let to_portal = portal.derived_cp() - self.derived_position;
            let in_range = match self.light_type {
                LightType::Point | LightType::Spotlight => to_portal.length() <= self.attenuation_range,
                LightType::Directional => to_portal.dot(self.derived_direction) >= 0.0,
            };
            // Quads must face the light
            let facing = portal.shape() != PortalShape::Quad || to_portal.dot(portal.derived_direction()) < 0.0;
            if !in_range || !facing || self.affects_zone(target) {
                continue;
            }

            self.affected_zones.push(target);
            if zones.get(target).is_some_and(|z| z.core().last_visible_frame() == frame) {
                self.affects_visible_zone = true;
            }
            frustum.add_portal_culling_planes(portal_key, portal);
            self.check_against_portals(target, portal.target_portal(), frame, frustum, zones, portals);
            frustum.remove_portal_culling_planes(portal_key);
        }
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
