/// Scene node — a placed, bounded object tracked by the zone graph.
///
/// Nodes are flat: each carries its own world transform and a local-space
/// bounding box. The scene manager snapshots the transform once per frame
/// (`update_transform`), keeping the previous position so portal tests can
/// treat the motion as a segment.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};
use slotmap::new_key_type;
use crate::camera::CameraKey;
use crate::geometry::AABB;
use crate::zone::ZoneKey;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a scene node within a scene manager.
    pub struct NodeKey;
}

// ===== FLAGS =====

bitflags! {
    /// Per-node state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Transform or bounds changed since the last zone refresh
        const MOVED = 1 << 0;
        /// Disabled nodes keep their zones but are skipped by the refresh
        const ENABLED = 1 << 1;
        /// Home zone is fixed; portal crossings are ignored
        const ANCHORED = 1 << 2;
        /// May register as a visitor of neighbouring zones
        const ALLOWED_TO_VISIT = 1 << 3;
        const CAST_SHADOWS = 1 << 4;
        const SHOW_BOUNDING_BOX = 1 << 5;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        NodeFlags::MOVED | NodeFlags::ENABLED | NodeFlags::ALLOWED_TO_VISIT | NodeFlags::CAST_SHADOWS
    }
}

// ===== SCENE NODE =====

#[derive(Debug, Clone)]
pub struct SceneNode {
    name: String,
    position: Vec3,
    orientation: Quat,
    scale: Vec3,
    local_bounds: AABB,

    /// Position as of the last transform snapshot
    derived_position: Vec3,
    /// Position as of the snapshot before that
    previous_position: Vec3,
    world_aabb: AABB,
    transform_dirty: bool,
    snapshot_taken: bool,

    home_zone: Option<ZoneKey>,
    visiting_zones: Vec<ZoneKey>,

    last_visible_frame: u64,
    last_visible_camera: Option<CameraKey>,
    flags: NodeFlags,
}

impl SceneNode {
    /// Create a node at the origin with empty bounds.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_bounds: AABB::NULL,
            derived_position: Vec3::ZERO,
            previous_position: Vec3::ZERO,
            world_aabb: AABB::NULL,
            transform_dirty: true,
            snapshot_taken: false,
            home_zone: None,
            visiting_zones: Vec::new(),
            last_visible_frame: 0,
            last_visible_camera: None,
            flags: NodeFlags::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ===== TRANSFORM =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn local_bounds(&self) -> &AABB {
        &self.local_bounds
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.mark_transform_dirty();
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        self.mark_transform_dirty();
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
        self.mark_transform_dirty();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.mark_transform_dirty();
    }

    /// Set the local-space bounding box (null for a node without extent).
    pub fn set_local_bounds(&mut self, bounds: AABB) {
        self.local_bounds = bounds;
        self.mark_transform_dirty();
    }

    fn mark_transform_dirty(&mut self) {
        self.transform_dirty = true;
        self.flags.insert(NodeFlags::MOVED);
    }

    /// World transform built from the current position, orientation and scale.
    pub fn world_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    /// Take this frame's transform snapshot.
    ///
    /// The first snapshot sets the previous position equal to the current
    /// one so a new node never sweeps in from the origin.
    pub fn update_transform(&mut self) {
        if self.snapshot_taken {
            self.previous_position = self.derived_position;
        } else {
            self.previous_position = self.position;
            self.snapshot_taken = true;
        }
        self.derived_position = self.position;
        if self.transform_dirty {
            self.world_aabb = self.local_bounds.transformed(&self.world_transform());
            self.transform_dirty = false;
        }
    }

    /// World position at the last snapshot.
    pub fn derived_position(&self) -> Vec3 {
        self.derived_position
    }

    /// World position at the snapshot before the last one.
    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    /// World bounding box at the last snapshot.
    pub fn world_aabb(&self) -> &AABB {
        &self.world_aabb
    }

    // ===== ZONES =====

    pub fn home_zone(&self) -> Option<ZoneKey> {
        self.home_zone
    }

    pub(crate) fn set_home_zone(&mut self, zone: Option<ZoneKey>) {
        self.home_zone = zone;
    }

    pub fn visiting_zones(&self) -> &[ZoneKey] {
        &self.visiting_zones
    }

    pub fn is_visiting_zone(&self, zone: ZoneKey) -> bool {
        self.visiting_zones.contains(&zone)
    }

    pub(crate) fn add_visiting_zone(&mut self, zone: ZoneKey) {
        if !self.visiting_zones.contains(&zone) {
            self.visiting_zones.push(zone);
        }
    }

    pub(crate) fn remove_visiting_zone(&mut self, zone: ZoneKey) {
        self.visiting_zones.retain(|z| *z != zone);
    }

    /// Drop every visiting zone, returning them so the zones can forget the node.
    pub(crate) fn take_visiting_zones(&mut self) -> Vec<ZoneKey> {
        std::mem::take(&mut self.visiting_zones)
    }

    // ===== FLAGS =====

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn is_moved(&self) -> bool {
        self.flags.contains(NodeFlags::MOVED)
    }

    pub fn set_moved(&mut self, moved: bool) {
        self.flags.set(NodeFlags::MOVED, moved);
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(NodeFlags::ENABLED)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.flags.set(NodeFlags::ENABLED, enabled);
    }

    pub fn is_anchored(&self) -> bool {
        self.flags.contains(NodeFlags::ANCHORED)
    }

    pub(crate) fn set_anchored(&mut self, anchored: bool) {
        self.flags.set(NodeFlags::ANCHORED, anchored);
    }

    pub fn allowed_to_visit(&self) -> bool {
        self.flags.contains(NodeFlags::ALLOWED_TO_VISIT)
    }

    pub fn set_allowed_to_visit(&mut self, allowed: bool) {
        self.flags.set(NodeFlags::ALLOWED_TO_VISIT, allowed);
    }

    pub fn cast_shadows(&self) -> bool {
        self.flags.contains(NodeFlags::CAST_SHADOWS)
    }

    pub fn set_cast_shadows(&mut self, cast: bool) {
        self.flags.set(NodeFlags::CAST_SHADOWS, cast);
    }

    pub fn show_bounding_box(&self) -> bool {
        self.flags.contains(NodeFlags::SHOW_BOUNDING_BOX)
    }

    pub fn set_show_bounding_box(&mut self, show: bool) {
        self.flags.set(NodeFlags::SHOW_BOUNDING_BOX, show);
    }

    // ===== VISIBILITY STAMP =====

    pub fn last_visible_frame(&self) -> u64 {
        self.last_visible_frame
    }

    pub fn last_visible_camera(&self) -> Option<CameraKey> {
        self.last_visible_camera
    }

    /// True if already stamped visible for this frame and camera.
    pub fn is_stamped(&self, frame: u64, camera: CameraKey) -> bool {
        self.last_visible_frame == frame && self.last_visible_camera == Some(camera)
    }

    pub(crate) fn stamp_visible(&mut self, frame: u64, camera: CameraKey) {
        self.last_visible_frame = frame;
        self.last_visible_camera = Some(camera);
    }
}

#[cfg(test)]
#[path = "scene_node_tests.rs"]
mod tests;
