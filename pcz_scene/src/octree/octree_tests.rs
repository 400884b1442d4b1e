use glam::Vec3;
use slotmap::SlotMap;
use crate::camera::Visibility;
use crate::geometry::AABB;
use super::*;

slotmap::new_key_type! { struct TestKey; }

fn make_keys(count: usize) -> Vec<TestKey> {
    let mut map = SlotMap::<TestKey, ()>::with_key();
    (0..count).map(|_| map.insert(())).collect()
}

fn world() -> AABB {
    AABB::new(Vec3::splat(-100.0), Vec3::splat(100.0))
}

fn cube(center: Vec3, half: f32) -> AABB {
    AABB::from_center_half_size(center, Vec3::splat(half))
}

/// Visitor accepting everything, recording visited keys.
struct RecordingVisitor {
    visited: Vec<TestKey>,
    classified: usize,
}

impl OctreeVisitor<TestKey> for RecordingVisitor {
    fn classify(&mut self, _cull_bounds: &AABB) -> Visibility {
        self.classified += 1;
        Visibility::Full
    }

    fn visit(&mut self, key: TestKey, _world_aabb: &AABB, _octant_visibility: Visibility) {
        self.visited.push(key);
    }
}

/// Visitor hiding every octant below the root.
struct RootOnlyVisitor {
    visited: Vec<TestKey>,
}

impl OctreeVisitor<TestKey> for RootOnlyVisitor {
    fn classify(&mut self, _cull_bounds: &AABB) -> Visibility {
        Visibility::None
    }

    fn visit(&mut self, key: TestKey, _world_aabb: &AABB, octant_visibility: Visibility) {
        assert_eq!(octant_visibility, Visibility::Partial);
        self.visited.push(key);
    }
}

// ============================================================================
// Insertion
// ============================================================================

#[test]
fn test_new_octree_has_only_root() {
    let octree = Octree::<TestKey>::new(world(), 4);
    assert_eq!(octree.octant_count(), 1);
    assert_eq!(octree.num_nodes(), 0);
    assert_eq!(*octree.bounds(), world());
    assert_eq!(octree.octant(ROOT).map(|o| o.half_size()), Some(Vec3::splat(100.0)));
}

#[test]
fn test_corner_nodes_reach_distinct_leaves() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(5);
    let centers = [
        Vec3::new(-99.0, -99.0, -99.0),
        Vec3::new(99.0, -99.0, -99.0),
        Vec3::new(-99.0, 99.0, -99.0),
        Vec3::new(99.0, 99.0, 99.0),
        Vec3::new(-99.0, -99.0, 99.0),
    ];

    for (key, center) in keys.iter().zip(centers) {
        octree.update(*key, &cube(center, 1.0));
    }

    assert_eq!(octree.num_nodes(), 5);
    let mut octants: Vec<usize> = keys.iter().filter_map(|k| octree.octant_of(*k)).collect();
    for key in &keys {
        assert_eq!(octree.depth_of(*key), Some(4));
    }
    octants.sort_unstable();
    octants.dedup();
    assert_eq!(octants.len(), 5, "every corner node should sit in its own leaf");
}

#[test]
fn test_small_node_never_stuck_at_root() {
    let mut octree = Octree::new(world(), 3);
    let key = make_keys(1)[0];
    // Exactly half the root size on every axis
    octree.update(key, &AABB::new(Vec3::splat(-90.0), Vec3::splat(10.0)));
    assert!(octree.depth_of(key).is_some_and(|d| d >= 1));
}

#[test]
fn test_large_node_stays_at_root() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::ZERO, 60.0));
    assert_eq!(octree.octant_of(key), Some(ROOT));
}

#[test]
fn test_node_outside_bounds_forced_into_root() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::splat(500.0), 1.0));
    assert_eq!(octree.octant_of(key), Some(ROOT));
    assert_eq!(octree.num_nodes(), 1);
}

#[test]
fn test_max_depth_zero_keeps_everything_at_root() {
    let mut octree = Octree::new(world(), 0);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::splat(50.0), 1.0));
    assert_eq!(octree.octant_of(key), Some(ROOT));
    assert_eq!(octree.octant_count(), 1);
}

#[test]
fn test_null_box_removes_node() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::ZERO, 1.0));
    octree.update(key, &AABB::NULL);
    assert!(!octree.contains(key));
    assert_eq!(octree.num_nodes(), 0);
}

// ============================================================================
// Update / remove / count consistency
// ============================================================================

#[test]
fn test_update_moves_node_between_octants() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::splat(50.0), 1.0));
    let first = octree.octant_of(key);
    octree.update(key, &cube(Vec3::splat(-50.0), 1.0));
    assert_ne!(octree.octant_of(key), first);
    assert_eq!(octree.num_nodes(), 1);
}

#[test]
fn test_small_move_keeps_octant() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::splat(60.0), 1.0));
    let first = octree.octant_of(key);
    octree.update(key, &cube(Vec3::splat(60.5), 1.0));
    assert_eq!(octree.octant_of(key), first);
}

#[test]
fn test_counts_follow_insert_and_remove() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(20);
    for (i, key) in keys.iter().enumerate() {
        let offset = i as f32 * 9.0 - 90.0;
        octree.update(*key, &cube(Vec3::new(offset, -offset, offset * 0.5), 0.5 + i as f32 * 0.7));
    }
    assert_eq!(octree.num_nodes(), 20);

    for key in keys.iter().step_by(3) {
        octree.remove(*key);
    }
    assert_eq!(octree.num_nodes(), 13);

    // Each octant's count equals its own nodes plus its children's counts
    for index in 0..octree.octant_count() {
        let Some(octant) = octree.octant(index) else { continue };
        let children: usize = (0..8)
            .filter_map(|slot| octant.child(slot))
            .filter_map(|child| octree.octant(child))
            .map(|child| child.num_nodes())
            .sum();
        assert_eq!(octant.num_nodes(), octant.nodes().len() + children);
    }
}

#[test]
fn test_remove_unknown_key_is_noop() {
    let mut octree = Octree::<TestKey>::new(world(), 4);
    octree.remove(make_keys(1)[0]);
    assert_eq!(octree.num_nodes(), 0);
}

#[test]
fn test_emptied_octants_are_kept() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::splat(50.0), 1.0));
    let allocated = octree.octant_count();
    octree.remove(key);
    assert_eq!(octree.octant_count(), allocated);
}

#[test]
fn test_resize_replaces_nodes() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::splat(150.0), 1.0));
    assert_eq!(octree.octant_of(key), Some(ROOT));

    octree.resize(AABB::new(Vec3::ZERO, Vec3::splat(400.0)));
    assert_eq!(octree.num_nodes(), 1);
    assert!(octree.depth_of(key).is_some_and(|d| d >= 1));
}

#[test]
fn test_clear_drops_everything() {
    let mut octree = Octree::new(world(), 4);
    for key in make_keys(4) {
        octree.update(key, &cube(Vec3::splat(10.0), 1.0));
    }
    octree.clear();
    assert_eq!(octree.num_nodes(), 0);
    assert_eq!(octree.octant_count(), 1);
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_find_returns_inserted_node_exactly_once() {
    let mut octree = Octree::new(world(), 5);
    let keys = make_keys(30);
    for (i, key) in keys.iter().enumerate() {
        let p = (i as f32 * 37.0) % 180.0 - 90.0;
        octree.update(*key, &cube(Vec3::new(p, (p * 1.7) % 90.0, -p * 0.3), 0.5 + (i % 7) as f32 * 3.0));
    }

    for (i, key) in keys.iter().enumerate() {
        let p = (i as f32 * 37.0) % 180.0 - 90.0;
        let aabb = cube(Vec3::new(p, (p * 1.7) % 90.0, -p * 0.3), 0.5 + (i % 7) as f32 * 3.0);
        let mut results = Vec::new();
        octree.find_nodes(&SceneQuery::Aabb(aabb), |_| true, &mut results);
        assert_eq!(results.iter().filter(|k| *k == key).count(), 1);
    }
}

#[test]
fn test_find_respects_filter() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(2);
    octree.update(keys[0], &cube(Vec3::ZERO, 1.0));
    octree.update(keys[1], &cube(Vec3::ONE, 1.0));

    let excluded = keys[0];
    let mut results = Vec::new();
    octree.find_nodes(&SceneQuery::Aabb(cube(Vec3::ZERO, 5.0)), |k| k != excluded, &mut results);
    assert_eq!(results, vec![keys[1]]);
}

#[test]
fn test_find_skips_distant_nodes() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(2);
    octree.update(keys[0], &cube(Vec3::splat(-60.0), 1.0));
    octree.update(keys[1], &cube(Vec3::splat(60.0), 1.0));

    let mut results = Vec::new();
    octree.find_nodes(&SceneQuery::Aabb(cube(Vec3::splat(60.0), 5.0)), |_| true, &mut results);
    assert_eq!(results, vec![keys[1]]);
}

#[test]
fn test_find_full_containment_skips_per_node_tests() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(2);
    // Both nodes land in the same deep octant near (80, 80, 80)
    octree.update(keys[0], &cube(Vec3::splat(80.0), 0.5));
    octree.update(keys[1], &cube(Vec3::splat(81.0), 0.5));
    let leaf = octree.octant_of(keys[0]).and_then(|i| octree.octant(i)).map(|o| o.cull_bounds());
    let Some(leaf_cull) = leaf else { panic!("node should be placed") };

    // Query swallows the leaf's cull bounds, so both nodes are accepted
    let query = AABB::new(leaf_cull.min - Vec3::splat(0.1), leaf_cull.max + Vec3::splat(0.1));
    let mut results = Vec::new();
    octree.find_nodes(&SceneQuery::Aabb(query), |_| true, &mut results);
    assert!(results.contains(&keys[0]));
    assert!(results.contains(&keys[1]));
}

#[test]
fn test_find_whole_root_query_falls_back_to_tests() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(2);
    octree.update(keys[0], &cube(Vec3::splat(-50.0), 1.0));
    octree.update(keys[1], &cube(Vec3::splat(150.0), 1.0)); // outside, held at root

    let mut results = Vec::new();
    octree.find_nodes(&SceneQuery::Aabb(world()), |_| true, &mut results);
    assert!(results.contains(&keys[0]));
    assert!(!results.contains(&keys[1]));
}

// ============================================================================
// Walk
// ============================================================================

#[test]
fn test_walk_visits_every_node_once() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(6);
    for (i, key) in keys.iter().enumerate() {
        octree.update(*key, &cube(Vec3::splat(i as f32 * 30.0 - 80.0), 1.0));
    }

    let mut visitor = RecordingVisitor { visited: Vec::new(), classified: 0 };
    octree.walk(&mut visitor);
    assert_eq!(visitor.visited.len(), 6);
    for key in &keys {
        assert!(visitor.visited.contains(key));
    }
}

#[test]
fn test_walk_full_octant_skips_descendant_classification() {
    let mut octree = Octree::new(world(), 4);
    let key = make_keys(1)[0];
    octree.update(key, &cube(Vec3::splat(90.0), 0.5));

    let mut visitor = RecordingVisitor { visited: Vec::new(), classified: 0 };
    octree.walk(&mut visitor);
    // Only the first child below the root is classified
    assert_eq!(visitor.classified, 1);
}

#[test]
fn test_walk_hidden_children_prunes_subtrees() {
    let mut octree = Octree::new(world(), 4);
    let keys = make_keys(2);
    octree.update(keys[0], &cube(Vec3::ZERO, 70.0)); // root
    octree.update(keys[1], &cube(Vec3::splat(50.0), 1.0)); // deep

    let mut visitor = RootOnlyVisitor { visited: Vec::new() };
    octree.walk(&mut visitor);
    assert_eq!(visitor.visited, vec![keys[0]]);
}

#[test]
fn test_walk_empty_tree_visits_nothing() {
    let octree = Octree::<TestKey>::new(world(), 4);
    let mut visitor = RecordingVisitor { visited: Vec::new(), classified: 0 };
    octree.walk(&mut visitor);
    assert!(visitor.visited.is_empty());
    assert_eq!(visitor.classified, 0);
}
