use glam::Vec3;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::camera::{Camera, CameraKey, PczCamera};
use crate::geometry::{Ray, AABB};
use crate::octree::SceneQuery;
use crate::portal::PortalKey;
use crate::scene::{NodeKey, SceneNode};
use super::*;

fn node_at(nodes: &mut SlotMap<NodeKey, SceneNode>, name: &str, center: Vec3) -> NodeKey {
    let mut node = SceneNode::new(name);
    node.set_local_bounds(AABB::from_center_half_size(Vec3::ZERO, Vec3::splat(0.5)));
    node.set_position(center);
    node.update_transform();
    nodes.insert(node)
}

fn portal_keys(count: usize) -> Vec<PortalKey> {
    let mut map: SlotMap<PortalKey, ()> = SlotMap::with_key();
    (0..count).map(|_| map.insert(())).collect()
}

// ============================================================================
// ZoneCore bookkeeping
// ============================================================================

#[test]
fn test_new_core_is_empty_and_dirty() {
    let core = ZoneCore::new("Hall", DEFAULT_ZONE_TYPE);
    assert!(core.is_empty());
    assert!(core.portals_updated());
    assert!(core.enclosure_bounds().is_null());
    assert_eq!(core.last_visible_camera(), None);
}

#[test]
fn test_portal_membership_marks_updated() {
    let mut core = ZoneCore::new("Hall", DEFAULT_ZONE_TYPE);
    let keys = portal_keys(2);
    core.set_portals_updated(false);

    core.add_portal(keys[0]);
    core.add_portal(keys[0]);
    assert_eq!(core.portals(), &[keys[0]]);
    assert!(core.portals_updated());
    assert!(!core.is_empty());

    core.set_portals_updated(false);
    core.add_anti_portal(keys[1]);
    core.remove_portal(keys[0]);
    assert!(core.portals().is_empty());
    assert_eq!(core.anti_portals(), &[keys[1]]);
    assert!(core.portals_updated());
}

#[test]
fn test_enclosure_cleared_with_node() {
    let mut nodes = SlotMap::with_key();
    let key = node_at(&mut nodes, "walls", Vec3::ZERO);
    let mut core = ZoneCore::new("Hall", DEFAULT_ZONE_TYPE);

    core.set_enclosure(Some(key), *nodes[key].world_aabb());
    assert_eq!(*core.enclosure_bounds(), *nodes[key].world_aabb());

    core.set_enclosure(None, *nodes[key].world_aabb());
    assert!(core.enclosure_bounds().is_null());
}

#[test]
fn test_stamp_visible() {
    let mut cameras: SlotMap<CameraKey, ()> = SlotMap::with_key();
    let camera = cameras.insert(());
    let mut core = ZoneCore::new("Hall", DEFAULT_ZONE_TYPE);

    core.stamp_visible(7, camera);

    assert_eq!(core.last_visible_frame(), 7);
    assert_eq!(core.last_visible_camera(), Some(camera));
}

// ============================================================================
// DefaultZone
// ============================================================================

#[test]
fn test_default_zone_visibility_includes_visitors() {
    let mut nodes = SlotMap::with_key();
    let home = node_at(&mut nodes, "home", Vec3::new(1.0, 0.0, 0.0));
    let visitor = node_at(&mut nodes, "visitor", Vec3::new(-1.0, 0.0, 0.0));
    let behind = node_at(&mut nodes, "behind", Vec3::new(0.0, 0.0, 30.0));
    let mut zone = DefaultZone::new("Hall");
    zone.add_home_node(home, &nodes[home]);
    zone.add_home_node(behind, &nodes[behind]);
    zone.add_visitor_node(visitor, &nodes[visitor]);

    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
    camera.set_position(Vec3::new(0.0, 0.0, 10.0));
    let camera = PczCamera::new("main", camera);

    let mut visible = Vec::new();
    zone.collect_visible_nodes(&camera, &nodes, &mut visible);
    visible.sort();

    let mut expected = vec![home, visitor];
    expected.sort();
    assert_eq!(visible, expected);
}

#[test]
fn test_default_zone_find_local_nodes() {
    let mut nodes = SlotMap::with_key();
    let home = node_at(&mut nodes, "home", Vec3::ZERO);
    let visitor = node_at(&mut nodes, "visitor", Vec3::new(0.0, 0.0, -3.0));
    let far = node_at(&mut nodes, "far", Vec3::new(50.0, 0.0, 0.0));
    let mut zone = DefaultZone::new("Hall");
    zone.add_home_node(home, &nodes[home]);
    zone.add_home_node(far, &nodes[far]);
    zone.add_visitor_node(visitor, &nodes[visitor]);

    let ray = SceneQuery::Ray(Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z));

    let mut results = FxHashSet::default();
    zone.find_local_nodes(&ray, false, None, &nodes, &mut results);
    assert_eq!(results, FxHashSet::from_iter([home]));

    let mut results = FxHashSet::default();
    zone.find_local_nodes(&ray, true, Some(home), &nodes, &mut results);
    assert_eq!(results, FxHashSet::from_iter([visitor]));
}

#[test]
fn test_default_zone_bounds_follow_enclosure() {
    let mut nodes = SlotMap::with_key();
    let key = node_at(&mut nodes, "walls", Vec3::new(5.0, 0.0, 0.0));
    let mut zone = DefaultZone::new("Hall");
    assert!(zone.bounds().is_null());

    zone.set_enclosure_node(key, *nodes[key].world_aabb());

    assert_eq!(zone.bounds(), *nodes[key].world_aabb());
    assert!(zone.enclosure_node_may_visit());
    assert!(!zone.requires_zone_specific_node_data());
}

#[test]
fn test_default_zone_clear() {
    let mut nodes = SlotMap::with_key();
    let key = node_at(&mut nodes, "crate", Vec3::ZERO);
    let mut zone = DefaultZone::new("Hall");
    zone.add_home_node(key, &nodes[key]);
    zone.add_visitor_node(key, &nodes[key]);

    zone.clear();

    assert!(zone.core().is_empty());
}
