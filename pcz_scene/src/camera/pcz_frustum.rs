/// PczFrustum — a stack of extra culling planes grown through portals.
///
/// While the visibility walk recurses through a portal, the planes spanned
/// by the frustum origin and each portal edge are pushed here, tagged with
/// the portal. Returning from the recursion pops exactly those planes.
/// Popped planes go back to a reservoir and are reused by later pushes.
///
/// All planes face inward: the negative side is culled.

use glam::Vec3;
use crate::geometry::{Plane, PlaneSide, Sphere, AABB};
use crate::portal::{Portal, PortalKey, PortalShape};
use super::camera::ProjectionType;
use super::frustum::Visibility;

/// An extra culling plane and the portal that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullingPlane {
    pub plane: Plane,
    /// `None` for planes added directly by the user
    pub portal: Option<PortalKey>,
    /// Tag entry for an AABB or sphere portal; never culls anything
    pub marker: bool,
}

/// Extra culling planes around an origin point.
#[derive(Debug, Clone)]
pub struct PczFrustum {
    origin: Vec3,
    origin_plane: Plane,
    use_origin_plane: bool,
    projection_type: ProjectionType,
    active_planes: Vec<CullingPlane>,
    reservoir: Vec<CullingPlane>,
}

impl Default for PczFrustum {
    fn default() -> Self {
        Self::new()
    }
}

impl PczFrustum {
    pub fn new() -> Self {
        Self {
            origin: Vec3::ZERO,
            origin_plane: Plane::default(),
            use_origin_plane: false,
            projection_type: ProjectionType::Perspective,
            active_planes: Vec::new(),
            reservoir: Vec::new(),
        }
    }

    // ===== CONFIGURATION =====

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    pub fn origin_plane(&self) -> &Plane {
        &self.origin_plane
    }

    /// Set the plane through the origin; geometry behind it is culled
    /// when the origin plane is in use.
    pub fn set_origin_plane(&mut self, normal: Vec3, point: Vec3) {
        self.origin_plane = Plane::from_normal_point(normal, point);
    }

    pub fn use_origin_plane(&self) -> bool {
        self.use_origin_plane
    }

    pub fn set_use_origin_plane(&mut self, use_origin_plane: bool) {
        self.use_origin_plane = use_origin_plane;
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
    }

    pub fn active_planes(&self) -> &[CullingPlane] {
        &self.active_planes
    }

    pub fn culling_plane_count(&self) -> usize {
        self.active_planes.len()
    }

    /// Whether any active plane actually culls (markers do not).
    pub fn has_culling_planes(&self) -> bool {
        self.active_planes.iter().any(|p| !p.marker)
    }

    /// Planes waiting for reuse.
    pub fn reservoir_len(&self) -> usize {
        self.reservoir.len()
    }

    // ===== VISIBILITY =====

    /// Box test against the origin plane (if used) and every active plane.
    pub fn is_visible_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_null() {
            return false;
        }
        if aabb.is_infinite() {
            return true;
        }
        self.planes().all(|plane| plane.side_of_aabb(aabb) != PlaneSide::Negative)
    }

    pub fn is_visible_sphere(&self, sphere: &Sphere) -> bool {
        self.planes().all(|plane| plane.distance(sphere.center) >= -sphere.radius)
    }

    /// Portal test: disabled portals, portals facing away and portals whose
    /// planes are already on the stack are not visible.
    pub fn is_visible_portal(&self, key: PortalKey, portal: &Portal) -> bool {
        if !portal.is_enabled() {
            return false;
        }
        if self.active_planes.is_empty() {
            return true;
        }
        if self.active_planes.iter().any(|p| p.portal == Some(key)) {
            return false;
        }
        match portal.shape() {
            PortalShape::Aabb => {
                self.is_visible_aabb(portal.derived_bounds())
            }
            PortalShape::Sphere => self.is_visible_sphere(portal.derived_sphere()),
            PortalShape::Quad => {
                if !self.faces_origin(portal) {
                    return false;
                }
                let corners = portal.derived_corners();
                !self.planes().any(|plane| {
                    corners.iter().all(|c| plane.side(*c) == PlaneSide::Negative)
                })
            }
        }
    }

    /// Strict box test: nothing may lie on the negative side of any plane.
    pub fn is_fully_visible_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_null() {
            return false;
        }
        if aabb.is_infinite() {
            return false;
        }
        self.planes().all(|plane| plane.side_of_aabb(aabb) == PlaneSide::Positive)
    }

    pub fn is_fully_visible_sphere(&self, sphere: &Sphere) -> bool {
        self.planes().all(|plane| plane.distance(sphere.center) > sphere.radius)
    }

    /// Strict portal test used for anti-portal occlusion.
    pub fn is_fully_visible_portal(&self, portal: &Portal) -> bool {
        if !portal.is_enabled() {
            return false;
        }
        if self.active_planes.is_empty() {
            return true;
        }
        match portal.shape() {
            PortalShape::Aabb => {
                self.is_fully_visible_aabb(portal.derived_bounds())
            }
            PortalShape::Sphere => self.is_fully_visible_sphere(portal.derived_sphere()),
            PortalShape::Quad => {
                if !self.faces_origin(portal) {
                    return false;
                }
                let corners = portal.derived_corners();
                !self.planes().any(|plane| {
                    corners.iter().any(|c| plane.side(*c) == PlaneSide::Negative)
                })
            }
        }
    }

    /// Three-way box classification against the origin plane and active planes.
    pub fn get_visibility(&self, aabb: &AABB) -> Visibility {
        if aabb.is_null() {
            return Visibility::None;
        }
        if aabb.is_infinite() {
            return Visibility::Partial;
        }
        let mut all_inside = true;
        for plane in self.planes() {
            match plane.side_of_aabb(aabb) {
                PlaneSide::Negative => return Visibility::None,
                PlaneSide::Both => all_inside = false,
                _ => {}
            }
        }
        if all_inside { Visibility::Full } else { Visibility::Partial }
    }

    fn planes(&self) -> impl Iterator<Item = &Plane> {
        let origin = self.use_origin_plane.then_some(&self.origin_plane);
        let active = self.active_planes.iter().filter(|p| !p.marker).map(|p| &p.plane);
        origin.into_iter().chain(active)
    }

    /// A quad is usable only when its normal points back at the origin.
    fn faces_origin(&self, portal: &Portal) -> bool {
        (portal.derived_cp() - self.origin).dot(portal.derived_direction()) <= 0.0
    }

    // ===== PLANE STACK =====

    /// Push a user plane that no portal owns.
    pub fn add_culling_plane(&mut self, plane: Plane) {
        self.push_plane(plane, None);
    }

    /// Push the planes a portal contributes and return how many were added.
    ///
    /// Quads add one plane per useful edge (an edge fully behind an existing
    /// plane adds nothing) and, if any edge was added, the portal's own plane.
    /// AABB and sphere portals add a single marker entry that only records
    /// the portal as entered; it takes no part in any visibility test.
    pub fn add_portal_culling_planes(&mut self, key: PortalKey, portal: &Portal) -> usize {
        match portal.shape() {
            PortalShape::Aabb | PortalShape::Sphere => {
                self.push_entry(self.origin_plane, Some(key), true);
                1
            }
            PortalShape::Quad => {
                let c = portal.derived_corners();
                let existing = self.active_planes.len();
                let mut added = 0;
                for i in 0..4 {
                    let j = (i + 1) % 4;
                    let edge_culled = self.active_planes[..existing].iter().any(|p| {
                        p.plane.side(c[i]) == PlaneSide::Negative && p.plane.side(c[j]) == PlaneSide::Negative
                    });
                    if edge_culled {
                        continue;
                    }
                    let apex = match self.projection_type {
                        ProjectionType::Perspective => self.origin,
                        ProjectionType::Orthographic => c[j] - self.origin_plane.normal,
                    };
                    self.push_plane(Plane::from_points(apex, c[j], c[i]), Some(key));
                    added += 1;
                }
                if added > 0 {
                    self.push_plane(Plane::from_points(c[2], c[1], c[0]), Some(key));
                    added += 1;
                }
                added
            }
        }
    }

    /// Pop every plane tagged with a portal back into the reservoir.
    pub fn remove_portal_culling_planes(&mut self, key: PortalKey) {
        let mut i = 0;
        while i < self.active_planes.len() {
            if self.active_planes[i].portal == Some(key) {
                let plane = self.active_planes.remove(i);
                self.reservoir.push(plane);
            } else {
                i += 1;
            }
        }
    }

    /// Pop every active plane back into the reservoir.
    pub fn remove_all_culling_planes(&mut self) {
        self.reservoir.append(&mut self.active_planes);
    }

    fn push_plane(&mut self, plane: Plane, portal: Option<PortalKey>) {
        self.push_entry(plane, portal, false);
    }

    fn push_entry(&mut self, plane: Plane, portal: Option<PortalKey>, marker: bool) {
        let mut slot = self.reservoir.pop().unwrap_or(CullingPlane { plane, portal, marker });
        slot.plane = plane;
        slot.portal = portal;
        slot.marker = marker;
        self.active_planes.push(slot);
    }
}

#[cfg(test)]
#[path = "pcz_frustum_tests.rs"]
mod tests;
