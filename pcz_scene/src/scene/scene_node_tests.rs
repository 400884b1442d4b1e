use glam::{Quat, Vec3};
use crate::geometry::AABB;
use super::*;

fn unit_node() -> SceneNode {
    let mut node = SceneNode::new("node");
    node.set_local_bounds(AABB::from_center_half_size(Vec3::ZERO, Vec3::ONE));
    node
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_new_node_defaults() {
    let node = SceneNode::new("a");
    assert_eq!(node.name(), "a");
    assert!(node.is_moved());
    assert!(node.is_enabled());
    assert!(node.allowed_to_visit());
    assert!(node.cast_shadows());
    assert!(!node.is_anchored());
    assert!(!node.show_bounding_box());
    assert!(node.home_zone().is_none());
    assert!(node.world_aabb().is_null());
}

// ============================================================================
// Transform snapshots
// ============================================================================

#[test]
fn test_first_snapshot_does_not_sweep() {
    let mut node = unit_node();
    node.set_position(Vec3::new(10.0, 0.0, 0.0));
    node.update_transform();
    assert_eq!(node.previous_position(), Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(node.derived_position(), Vec3::new(10.0, 0.0, 0.0));
}

#[test]
fn test_snapshots_track_previous_position() {
    let mut node = unit_node();
    node.update_transform();
    node.set_position(Vec3::new(0.0, 0.0, 5.0));
    node.update_transform();
    assert_eq!(node.previous_position(), Vec3::ZERO);
    assert_eq!(node.derived_position(), Vec3::new(0.0, 0.0, 5.0));

    // No motion: previous catches up
    node.update_transform();
    assert_eq!(node.previous_position(), Vec3::new(0.0, 0.0, 5.0));
}

#[test]
fn test_world_aabb_follows_transform() {
    let mut node = unit_node();
    node.set_position(Vec3::new(3.0, 0.0, 0.0));
    node.set_scale(Vec3::splat(2.0));
    node.update_transform();
    let aabb = node.world_aabb();
    assert!((aabb.min - Vec3::new(1.0, -2.0, -2.0)).length() < 1e-5);
    assert!((aabb.max - Vec3::new(5.0, 2.0, 2.0)).length() < 1e-5);
}

#[test]
fn test_rotation_grows_world_aabb() {
    let mut node = unit_node();
    node.set_orientation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
    node.update_transform();
    let half = node.world_aabb().half_size();
    assert!((half.x - std::f32::consts::SQRT_2).abs() < 1e-4);
    assert!((half.y - 1.0).abs() < 1e-5);
}

#[test]
fn test_setters_flag_moved() {
    let mut node = unit_node();
    node.set_moved(false);
    node.translate(Vec3::X);
    assert!(node.is_moved());
    assert_eq!(node.position(), Vec3::X);
}

// ============================================================================
// Zones and stamps
// ============================================================================

#[test]
fn test_visiting_zones_are_unique() {
    let mut zones: slotmap::SlotMap<crate::zone::ZoneKey, ()> = slotmap::SlotMap::with_key();
    let a = zones.insert(());
    let b = zones.insert(());

    let mut node = unit_node();
    node.add_visiting_zone(a);
    node.add_visiting_zone(a);
    node.add_visiting_zone(b);
    assert_eq!(node.visiting_zones(), &[a, b]);
    assert!(node.is_visiting_zone(b));

    node.remove_visiting_zone(a);
    assert_eq!(node.visiting_zones(), &[b]);
    assert_eq!(node.take_visiting_zones(), vec![b]);
    assert!(node.visiting_zones().is_empty());
}

#[test]
fn test_visibility_stamp_is_per_camera() {
    let mut cameras: slotmap::SlotMap<crate::camera::CameraKey, ()> = slotmap::SlotMap::with_key();
    let first = cameras.insert(());
    let second = cameras.insert(());

    let mut node = unit_node();
    node.stamp_visible(7, first);
    assert!(node.is_stamped(7, first));
    assert!(!node.is_stamped(7, second));
    assert!(!node.is_stamped(8, first));
}

#[test]
fn test_flags_roundtrip() {
    let mut node = unit_node();
    node.set_anchored(true);
    node.set_allowed_to_visit(false);
    node.set_show_bounding_box(true);
    assert!(node.flags().contains(NodeFlags::ANCHORED | NodeFlags::SHOW_BOUNDING_BOX));
    assert!(!node.flags().contains(NodeFlags::ALLOWED_TO_VISIT));
}
