/// PczCamera — a camera that also culls through portal planes.
///
/// The standard six-plane frustum is combined with an extra frustum that
/// grows while the visibility walk passes through portals. `update` must be
/// called once per frame before any portal planes are pushed.

use glam::{Quat, Vec3};
use slotmap::new_key_type;
use crate::geometry::{PlaneSide, Sphere, AABB};
use crate::portal::{Portal, PortalKey, PortalShape};
use crate::scene::NodeKey;
use super::camera::{Camera, ProjectionType};
use super::frustum::{Visibility, PLANE_FAR, PLANE_NEAR};
use super::pcz_frustum::PczFrustum;

new_key_type! {
    /// Handle of a camera owned by the scene manager.
    pub struct CameraKey;
}

/// Named camera with portal culling support.
#[derive(Debug, Clone)]
pub struct PczCamera {
    name: String,
    camera: Camera,
    /// Node the camera follows, if attached
    node: Option<NodeKey>,
    extra_culling_frustum: PczFrustum,
}

impl PczCamera {
    pub fn new(name: impl Into<String>, camera: Camera) -> Self {
        let mut pcz_camera = Self {
            name: name.into(),
            camera,
            node: None,
            extra_culling_frustum: PczFrustum::new(),
        };
        pcz_camera.update();
        pcz_camera
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn position(&self) -> Vec3 {
        self.camera.position()
    }

    pub fn direction(&self) -> Vec3 {
        self.camera.direction()
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.camera.projection_type()
    }

    pub fn node(&self) -> Option<NodeKey> {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeKey>) {
        self.node = node;
    }

    /// Follow a node's world transform.
    pub(crate) fn sync_to(&mut self, position: Vec3, orientation: Quat) {
        self.camera.set_transform(position, orientation);
    }

    pub fn extra_culling_frustum(&self) -> &PczFrustum {
        &self.extra_culling_frustum
    }

    // ===== FRAME SETUP =====

    /// Re-anchor the extra frustum on the camera.
    ///
    /// Perspective cameras also cull everything behind the view position.
    /// Orthographic cameras do not use the origin plane.
    pub fn update(&mut self) {
        let position = self.camera.position();
        let projection_type = self.camera.projection_type();
        let frustum = &mut self.extra_culling_frustum;
        frustum.set_origin(position);
        frustum.set_origin_plane(self.camera.direction(), position);
        frustum.set_projection_type(projection_type);
        frustum.set_use_origin_plane(projection_type == ProjectionType::Perspective);
    }

    pub fn add_portal_culling_planes(&mut self, key: PortalKey, portal: &Portal) -> usize {
        self.extra_culling_frustum.add_portal_culling_planes(key, portal)
    }

    pub fn remove_portal_culling_planes(&mut self, key: PortalKey) {
        self.extra_culling_frustum.remove_portal_culling_planes(key);
    }

    pub fn remove_all_extra_culling_planes(&mut self) {
        self.extra_culling_frustum.remove_all_culling_planes();
    }

    // ===== VISIBILITY =====

    pub fn is_visible_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_null() {
            return false;
        }
        if aabb.is_infinite() {
            return true;
        }
        self.extra_culling_frustum.is_visible_aabb(aabb) && self.camera.frustum().intersects_aabb(aabb)
    }

    pub fn is_visible_sphere(&self, sphere: &Sphere) -> bool {
        self.extra_culling_frustum.is_visible_sphere(sphere) && self.camera.frustum().intersects_sphere(sphere)
    }

    /// Portal visibility from this camera.
    ///
    /// Quads must face the camera and have at least one corner inside every
    /// frustum plane except the near plane. AABB and sphere portals that
    /// contain the camera are always visible.
    pub fn is_visible_portal(&self, key: PortalKey, portal: &Portal) -> bool {
        if !portal.is_enabled() {
            return false;
        }
        match portal.shape() {
            PortalShape::Aabb => {
                let bounds = portal.derived_bounds();
                bounds.contains_point(self.position()) || self.is_visible_aabb(bounds)
            }
            PortalShape::Sphere => {
                let sphere = portal.derived_sphere();
                sphere.contains_point(self.position()) || self.is_visible_sphere(sphere)
            }
            PortalShape::Quad => {
                let to_portal = portal.derived_cp() - self.position();
                if to_portal.dot(portal.derived_direction()) >= 0.0 {
                    return false;
                }
                if !self.extra_culling_frustum.is_visible_portal(key, portal) {
                    return false;
                }
                let corners = portal.derived_corners();
                let infinite_far = self.camera.far() <= 0.0;
                (0..6)
                    .filter(|&i| i != PLANE_NEAR && !(i == PLANE_FAR && infinite_far))
                    .all(|i| {
                        let plane = self.camera.frustum().plane(i);
                        corners.iter().any(|c| plane.side(*c) != PlaneSide::Negative)
                    })
            }
        }
    }

    /// Three-way classification combining both frustums.
    pub fn get_visibility(&self, aabb: &AABB) -> Visibility {
        let standard = self.camera.frustum().classify_aabb(aabb);
        if standard == Visibility::None {
            return Visibility::None;
        }
        match self.extra_culling_frustum.get_visibility(aabb) {
            Visibility::None => Visibility::None,
            Visibility::Partial => Visibility::Partial,
            Visibility::Full => standard,
        }
    }
}

#[cfg(test)]
#[path = "pcz_camera_tests.rs"]
mod tests;
