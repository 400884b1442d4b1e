/// Portal — a one-way opening between zones, or an occluding anti-portal.
///
/// A portal is a quad, an axis-aligned box or a sphere, described by local
/// corner points. Once per frame the scene manager pushes the owning
/// node's world transform through `update_derived_values`, which keeps both
/// the current and the previous world-space centre and plane. The pair
/// forms a line-swept sphere (capsule) so crossings are caught even when a
/// node or portal moves further than the portal is thick.
///
/// Direction conventions:
/// - Quad: the normal `(c1 - c0) x (c2 - c0)` points back into the home
///   zone. A node crosses when it ends up on the negative side.
/// - AABB / Sphere: direction `+Z` means the surface faces outward (crossing
///   means entering the volume), `-Z` means inward (crossing means leaving).

use std::str::FromStr;
use glam::{Mat4, Quat, Vec3};
use slotmap::new_key_type;
use crate::error::{Error, Result};
use crate::engine_err;
use crate::geometry::{Capsule, PlaneBoundedVolume, Plane, PlaneSide, Ray, Segment, Sphere, AABB};
use crate::scene::{NodeKey, SceneNode};
use crate::zone::ZoneKey;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a portal or anti-portal within a scene manager.
    pub struct PortalKey;
}

// ===== ENUMS =====

/// Traversable portal or occlusion-only anti-portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalKind {
    /// Connects its home zone to a target zone
    Portal,
    /// Hides whatever lies fully behind it; never traversed
    AntiPortal,
}

/// Portal geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalShape {
    /// Four corners, wound counter-clockwise seen from the home zone
    Quad,
    /// Two corners: minimum and maximum
    Aabb,
    /// Two corners: centre and a point on the surface
    Sphere,
}

impl PortalShape {
    /// Number of meaningful corner points for this shape.
    pub fn corner_count(&self) -> usize {
        match self {
            PortalShape::Quad => 4,
            PortalShape::Aabb | PortalShape::Sphere => 2,
        }
    }

    /// Parse a shape name (`"Quad"`, `"AABB"` or `"Sphere"`).
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "Quad" | "QUAD" | "quad" => Ok(PortalShape::Quad),
            "AABB" | "Aabb" | "aabb" => Ok(PortalShape::Aabb),
            "Sphere" | "SPHERE" | "sphere" => Ok(PortalShape::Sphere),
            _ => Err(engine_err!("pcz::Portal", InvalidConfig: "Unknown portal shape '{}'", name)),
        }
    }
}

impl FromStr for PortalShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Result of testing a node against a portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalIntersectResult {
    /// The node does not touch the portal
    NoIntersect,
    /// The node touches the portal from the front
    IntersectNoCross,
    /// The node touches the portal from behind without having crossed it
    IntersectBackNoCross,
    /// The node passed through the portal since the last frame
    IntersectCross,
}

// ===== PORTAL =====

/// A portal or anti-portal.
#[derive(Debug, Clone)]
pub struct Portal {
    name: String,
    kind: PortalKind,
    shape: PortalShape,
    enabled: bool,

    /// Node supplying the world transform
    node: Option<NodeKey>,
    current_home_zone: Option<ZoneKey>,
    /// Pending home zone, applied after a zone's portal scan
    new_home_zone: Option<ZoneKey>,
    target_zone: Option<ZoneKey>,
    target_portal: Option<PortalKey>,

    // ----- local geometry -----
    corners: [Vec3; 4],
    direction: Vec3,
    local_cp: Vec3,
    radius: f32,
    locals_up_to_date: bool,

    // ----- derived (world-space) geometry -----
    derived_corners: [Vec3; 4],
    derived_direction: Vec3,
    derived_cp: Vec3,
    prev_derived_cp: Vec3,
    derived_plane: Plane,
    prev_derived_plane: Plane,
    derived_sphere: Sphere,
    capsule: Capsule,
    derived_bounds: AABB,
    prev_derived_bounds: AABB,
    derived_initialized: bool,
    /// Geometry changed during the last derived update
    moved: bool,
}

impl Portal {
    /// Create a portal with degenerate geometry; set corners before use.
    pub fn new(name: impl Into<String>, kind: PortalKind, shape: PortalShape) -> Self {
        Self {
            name: name.into(),
            kind,
            shape,
            enabled: true,
            node: None,
            current_home_zone: None,
            new_home_zone: None,
            target_zone: None,
            target_portal: None,
            corners: [Vec3::ZERO; 4],
            direction: Vec3::Z,
            local_cp: Vec3::ZERO,
            radius: 0.0,
            locals_up_to_date: false,
            derived_corners: [Vec3::ZERO; 4],
            derived_direction: Vec3::Z,
            derived_cp: Vec3::ZERO,
            prev_derived_cp: Vec3::ZERO,
            derived_plane: Plane::default(),
            prev_derived_plane: Plane::default(),
            derived_sphere: Sphere::new(Vec3::ZERO, 0.0),
            capsule: Capsule::new(Vec3::ZERO, Vec3::ZERO, 0.0),
            derived_bounds: AABB::NULL,
            prev_derived_bounds: AABB::NULL,
            derived_initialized: false,
            moved: true,
        }
    }

    // ===== IDENTITY & LINKS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PortalKind {
        self.kind
    }

    pub fn is_anti_portal(&self) -> bool {
        self.kind == PortalKind::AntiPortal
    }

    pub fn shape(&self) -> PortalShape {
        self.shape
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn node(&self) -> Option<NodeKey> {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeKey>) {
        self.node = node;
        self.moved = true;
    }

    pub fn current_home_zone(&self) -> Option<ZoneKey> {
        self.current_home_zone
    }

    pub(crate) fn set_current_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.current_home_zone = zone;
    }

    pub fn new_home_zone(&self) -> Option<ZoneKey> {
        self.new_home_zone
    }

    pub(crate) fn set_new_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.new_home_zone = zone;
    }

    /// Zone this portal leads into (always `None` for anti-portals).
    pub fn target_zone(&self) -> Option<ZoneKey> {
        self.target_zone
    }

    pub(crate) fn set_target_zone(&mut self, zone: Option<ZoneKey>) {
        if self.kind == PortalKind::Portal {
            self.target_zone = zone;
        }
    }

    /// Reciprocal portal in the target zone, if connected.
    pub fn target_portal(&self) -> Option<PortalKey> {
        self.target_portal
    }

    pub(crate) fn set_target_portal(&mut self, portal: Option<PortalKey>) {
        if self.kind == PortalKind::Portal {
            self.target_portal = portal;
        }
    }

    // ===== LOCAL GEOMETRY =====

    /// Set one local corner.
    pub fn set_corner(&mut self, index: usize, point: Vec3) {
        if index < self.shape.corner_count() {
            self.corners[index] = point;
            self.locals_up_to_date = false;
        }
    }

    /// Set the local corners. Extra points beyond the shape's corner count
    /// are ignored; missing points leave the old corners in place.
    pub fn set_corners(&mut self, corners: &[Vec3]) {
        let count = self.shape.corner_count().min(corners.len());
        self.corners[..count].copy_from_slice(&corners[..count]);
        self.locals_up_to_date = false;
    }

    pub fn corner(&self, index: usize) -> Vec3 {
        self.corners[index]
    }

    /// Set the facing of an AABB or sphere portal (`+Z` outward, `-Z` inward).
    /// Quad directions come from the corners and cannot be set.
    pub fn set_direction(&mut self, direction: Vec3) {
        if self.shape != PortalShape::Quad {
            self.direction = direction;
            self.locals_up_to_date = false;
        }
    }

    /// Local direction (recomputed from the corners for quads).
    pub fn direction(&mut self) -> Vec3 {
        self.ensure_locals();
        self.direction
    }

    /// Bounding radius around the local centre point.
    pub fn radius(&self) -> f32 {
        if self.locals_up_to_date {
            self.radius
        } else {
            Self::compute_locals(self.shape, &self.corners, self.direction).2
        }
    }

    pub fn local_cp(&self) -> Vec3 {
        if self.locals_up_to_date {
            self.local_cp
        } else {
            Self::compute_locals(self.shape, &self.corners, self.direction).1
        }
    }

    fn ensure_locals(&mut self) {
        if !self.locals_up_to_date {
            let (direction, cp, radius) = Self::compute_locals(self.shape, &self.corners, self.direction);
            self.direction = direction;
            self.local_cp = cp;
            self.radius = radius;
            self.locals_up_to_date = true;
        }
    }

    /// (direction, centre point, radius) from local corners.
    fn compute_locals(shape: PortalShape, corners: &[Vec3; 4], direction: Vec3) -> (Vec3, Vec3, f32) {
        match shape {
            PortalShape::Quad => {
                let normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize_or_zero();
                let cp = (corners[0] + corners[1] + corners[2] + corners[3]) * 0.25;
                (normal, cp, (corners[0] - cp).length())
            }
            PortalShape::Aabb => {
                let cp = (corners[0] + corners[1]) * 0.5;
                (direction, cp, (corners[0] - cp).length())
            }
            PortalShape::Sphere => {
                (direction, corners[0], (corners[1] - corners[0]).length())
            }
        }
    }

    /// Outward-facing AABB or sphere portal
    fn faces_outward(direction: Vec3) -> bool {
        direction == Vec3::Z
    }

    // ===== DERIVED GEOMETRY =====

    pub fn derived_corner(&self, index: usize) -> Vec3 {
        self.derived_corners[index]
    }

    pub fn derived_corners(&self) -> &[Vec3] {
        &self.derived_corners[..self.shape.corner_count()]
    }

    pub fn derived_direction(&self) -> Vec3 {
        self.derived_direction
    }

    pub fn derived_cp(&self) -> Vec3 {
        self.derived_cp
    }

    pub fn prev_derived_cp(&self) -> Vec3 {
        self.prev_derived_cp
    }

    pub fn derived_plane(&self) -> &Plane {
        &self.derived_plane
    }

    pub fn prev_derived_plane(&self) -> &Plane {
        &self.prev_derived_plane
    }

    pub fn derived_sphere(&self) -> &Sphere {
        &self.derived_sphere
    }

    /// Sphere swept from the previous to the current centre point.
    pub fn capsule(&self) -> &Capsule {
        &self.capsule
    }

    /// World box of the portal this frame.
    pub fn derived_bounds(&self) -> &AABB {
        &self.derived_bounds
    }

    /// World box covering both the previous and the current placement.
    pub fn swept_bounds(&self) -> AABB {
        self.derived_bounds.merged(&self.prev_derived_bounds)
    }

    /// True when the geometry changed during the last derived update.
    pub fn needs_update(&self) -> bool {
        self.moved || !self.locals_up_to_date
    }

    /// Recompute world-space values from the owning node's transform.
    ///
    /// Without a transform the local geometry is used as-is. The first call
    /// sets the previous values equal to the current ones, so a freshly
    /// placed portal never reports a sweep.
    ///
    /// Returns true when the geometry changed.
    pub fn update_derived_values(&mut self, transform: Option<&Mat4>) -> bool {
        let locals_changed = !self.locals_up_to_date;
        self.ensure_locals();

        let count = self.shape.corner_count();
        let mut corners = [Vec3::ZERO; 4];
        let (cp, direction, bounds) = match transform {
            Some(matrix) => {
                let cp = matrix.transform_point3(self.local_cp);
                match self.shape {
                    PortalShape::Quad => {
                        for i in 0..count {
                            corners[i] = matrix.transform_point3(self.corners[i]);
                        }
                        let direction = matrix.transform_vector3(self.direction).normalize_or_zero();
                        (cp, direction, AABB::from_points(&corners))
                    }
                    PortalShape::Aabb => {
                        let bounds = AABB::new(self.corners[0], self.corners[1]).transformed(matrix);
                        corners[0] = bounds.min;
                        corners[1] = bounds.max;
                        (bounds.center(), self.direction, bounds)
                    }
                    PortalShape::Sphere => {
                        corners[0] = cp;
                        corners[1] = matrix.transform_point3(self.corners[1]);
                        let radius = (corners[1] - cp).length();
                        (cp, self.direction, AABB::from_center_half_size(cp, Vec3::splat(radius)))
                    }
                }
            }
            None => {
                corners[..count].copy_from_slice(&self.corners[..count]);
                let bounds = match self.shape {
                    PortalShape::Quad => AABB::from_points(&corners),
                    PortalShape::Aabb => AABB::new(corners[0], corners[1]),
                    PortalShape::Sphere => AABB::from_center_half_size(self.local_cp, Vec3::splat(self.radius)),
                };
                (self.local_cp, self.direction, bounds)
            }
        };
        let plane = Plane::from_normal_point(direction, cp);

        if self.derived_initialized {
            let changed = locals_changed
                || cp != self.derived_cp
                || plane != self.derived_plane
                || corners != self.derived_corners;
            self.prev_derived_cp = self.derived_cp;
            self.prev_derived_plane = self.derived_plane;
            self.prev_derived_bounds = self.derived_bounds;
            self.moved = changed;
        } else {
            self.prev_derived_cp = cp;
            self.prev_derived_plane = plane;
            self.prev_derived_bounds = bounds;
            self.derived_initialized = true;
            self.moved = true;
        }

        self.derived_corners = corners;
        self.derived_direction = direction;
        self.derived_cp = cp;
        self.derived_plane = plane;
        self.derived_sphere = Sphere::new(cp, self.radius);
        self.derived_bounds = bounds;
        self.capsule = Capsule::new(self.prev_derived_cp, cp, self.radius);
        self.moved
    }

    /// Re-express the portal relative to a node centred on it.
    ///
    /// Returns the position and orientation the node must take. Corners
    /// become node-local; quads are oriented so their local direction is `+Z`.
    pub fn adjust_node_to_match(&mut self, node: NodeKey) -> (Vec3, Quat) {
        self.ensure_locals();
        let cp = self.local_cp;
        let orientation = match self.shape {
            PortalShape::Quad => Quat::from_rotation_arc(Vec3::Z, self.direction),
            PortalShape::Aabb | PortalShape::Sphere => Quat::IDENTITY,
        };
        let to_local = orientation.inverse();
        for corner in &mut self.corners[..self.shape.corner_count()] {
            *corner = to_local * (*corner - cp);
        }
        self.locals_up_to_date = false;
        self.set_node(Some(node));
        (cp, orientation)
    }

    // ===== NODE TESTS =====

    /// Classify a node's motion since the last frame against this portal.
    pub fn intersects_node(&self, node_key: NodeKey, node: &SceneNode) -> PortalIntersectResult {
        if !self.enabled || self.node == Some(node_key) {
            return PortalIntersectResult::NoIntersect;
        }

        let position = node.derived_position();
        let world_aabb = node.world_aabb();

        match self.shape {
            PortalShape::Quad => {
                let path = Segment::new(node.previous_position(), position);
                if self.capsule.intersects_segment(&path)
                    && self.derived_plane.side(position) == PlaneSide::Negative
                    && self.prev_derived_plane.side(node.previous_position()) != PlaneSide::Negative
                {
                    // A node must be smaller than the opening along some axis to pass
                    let half = world_aabb.half_size();
                    if half.min_element() < self.radius {
                        return PortalIntersectResult::IntersectCross;
                    }
                }
                if self.derived_sphere.intersects_aabb(world_aabb)
                    && self.derived_plane.side_of_aabb(world_aabb) == PlaneSide::Both
                {
                    if self.derived_plane.side(position) != PlaneSide::Negative {
                        return PortalIntersectResult::IntersectNoCross;
                    }
                    return PortalIntersectResult::IntersectBackNoCross;
                }
                PortalIntersectResult::NoIntersect
            }
            PortalShape::Aabb => {
                let bounds = AABB::new(self.derived_corners[0], self.derived_corners[1]);
                let inside = bounds.contains_point(position);
                if inside == Self::faces_outward(self.derived_direction) {
                    return PortalIntersectResult::IntersectCross;
                }
                // Only the surface of the box is the opening
                if bounds.intersects(world_aabb) && bounds.intersection(world_aabb) != *world_aabb {
                    return PortalIntersectResult::IntersectNoCross;
                }
                PortalIntersectResult::NoIntersect
            }
            PortalShape::Sphere => {
                let distance2 = self.derived_cp.distance_squared(position);
                let inside = distance2 < self.radius * self.radius;
                if inside == Self::faces_outward(self.derived_direction) {
                    return PortalIntersectResult::IntersectCross;
                }
                let enclosed = world_aabb.is_finite()
                    && world_aabb.corners().iter().all(|c| self.derived_sphere.contains_point(*c));
                if self.derived_sphere.intersects_aabb(world_aabb) && !enclosed {
                    return PortalIntersectResult::IntersectNoCross;
                }
                PortalIntersectResult::NoIntersect
            }
        }
    }

    /// True if this portal's centre passed through `other` since the last
    /// frame. Meant to be called on the smaller of the two portals.
    pub fn crossed_portal(&self, other: &Portal) -> bool {
        if !other.enabled || !self.capsule.intersects(&other.capsule) {
            return false;
        }
        match other.shape {
            PortalShape::Quad => {
                other.derived_plane.side(self.derived_cp) == PlaneSide::Negative
                    && other.prev_derived_plane.side(self.prev_derived_cp) != PlaneSide::Negative
            }
            PortalShape::Aabb => {
                let bounds = AABB::new(other.derived_corners[0], other.derived_corners[1]);
                bounds.contains_point(self.derived_cp) == Self::faces_outward(other.derived_direction)
            }
            PortalShape::Sphere => {
                let inside = self.derived_cp.distance_squared(other.derived_cp) < other.radius * other.radius;
                inside == Self::faces_outward(other.derived_direction)
            }
        }
    }

    /// True if two portals of the same shape sit at the same place.
    pub fn close_to(&self, other: &Portal) -> bool {
        if self.shape != other.shape {
            return false;
        }
        match self.shape {
            PortalShape::Quad => {
                let mine = Sphere::new(self.derived_cp, self.radius * 0.25);
                let theirs = Sphere::new(other.derived_cp, other.radius * 0.25);
                mine.intersects_sphere(&theirs)
            }
            PortalShape::Aabb => {
                self.derived_cp == other.derived_cp
                    && self.corners[0] == other.corners[0]
                    && self.corners[1] == other.corners[1]
            }
            PortalShape::Sphere => {
                self.derived_cp == other.derived_cp && self.radius == other.radius
            }
        }
    }

    // ===== SHAPE QUERIES =====

    /// Approximate box test (quads: bounding sphere plus straddled plane).
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if !self.enabled {
            return false;
        }
        match self.shape {
            PortalShape::Quad => {
                self.derived_sphere.intersects_aabb(aabb)
                    && self.derived_plane.side_of_aabb(aabb) == PlaneSide::Both
            }
            PortalShape::Aabb => AABB::new(self.derived_corners[0], self.derived_corners[1]).intersects(aabb),
            PortalShape::Sphere => self.derived_sphere.intersects_aabb(aabb),
        }
    }

    /// Approximate sphere test.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        if !self.enabled {
            return false;
        }
        match self.shape {
            PortalShape::Quad => {
                sphere.intersects_sphere(&self.derived_sphere)
                    && self.derived_plane.distance(sphere.center).abs() <= sphere.radius
            }
            PortalShape::Aabb => {
                sphere.intersects_aabb(&AABB::new(self.derived_corners[0], self.derived_corners[1]))
            }
            PortalShape::Sphere => sphere.intersects_sphere(&self.derived_sphere),
        }
    }

    /// Plane-bounded volume test. Quads are rejected when every corner lies
    /// outside one of the volume's planes.
    pub fn intersects_volume(&self, volume: &PlaneBoundedVolume) -> bool {
        if !self.enabled {
            return false;
        }
        match self.shape {
            PortalShape::Quad => {
                if !volume.intersects_sphere(&self.derived_sphere) {
                    return false;
                }
                !volume.planes.iter().any(|plane| {
                    self.derived_corners.iter().all(|corner| plane.side(*corner) == volume.outside)
                })
            }
            PortalShape::Aabb => {
                volume.intersects_aabb(&AABB::new(self.derived_corners[0], self.derived_corners[1]))
            }
            PortalShape::Sphere => volume.intersects_sphere(&self.derived_sphere),
        }
    }

    /// Ray test. Quads use the plane hit point and an edge walk.
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        if !self.enabled {
            return false;
        }
        match self.shape {
            PortalShape::Quad => {
                let Some(t) = ray.intersects_plane(&self.derived_plane) else {
                    return false;
                };
                let hit = ray.point_at(t);
                let c = &self.derived_corners;
                let reference = (c[2] - c[1]).cross(hit - c[1]);
                [(0, 1), (2, 3), (3, 0)].iter().all(|&(a, b)| {
                    (c[b] - c[a]).cross(hit - c[a]).dot(reference) >= 0.0
                })
            }
            PortalShape::Aabb => {
                ray.intersects_aabb(&AABB::new(self.derived_corners[0], self.derived_corners[1])).is_some()
            }
            PortalShape::Sphere => ray.intersects_sphere(&self.derived_sphere).is_some(),
        }
    }
}

#[cfg(test)]
#[path = "portal_tests.rs"]
mod tests;
