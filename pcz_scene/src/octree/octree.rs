/// Octree — loose, bounded-depth spatial index of scene nodes.
///
/// Octants live in a flat arena and reference their parent and children by
/// index. Each node is stored in exactly one octant: the deepest one it
/// fits into. An octant's cull bounds are its box grown by its half-size on
/// every side, so any node no larger than half an octant fits into one
/// child without being split.
///
/// Children are created lazily on insertion and never freed. A per-octant
/// subtree count lets walks skip empty branches without a bounds test.

use std::hash::Hash;
use glam::Vec3;
use rustc_hash::FxHashMap;
use crate::camera::Visibility;
use crate::geometry::AABB;
use super::intersection::{Intersection, SceneQuery};

/// Index of the root octant in the arena.
pub const ROOT: usize = 0;

/// A single octant.
#[derive(Debug, Clone)]
pub struct Octant<K> {
    aabb: AABB,
    half_size: Vec3,
    /// Child index bit layout: bit0 = X, bit1 = Y, bit2 = Z (1 = high half)
    children: [Option<usize>; 8],
    parent: Option<usize>,
    nodes: Vec<K>,
    /// Nodes attached to this octant and all of its descendants
    num_nodes: usize,
}

impl<K> Octant<K> {
    fn new(aabb: AABB, parent: Option<usize>) -> Self {
        Self {
            aabb,
            half_size: aabb.half_size(),
            children: [None; 8],
            parent,
            nodes: Vec::new(),
            num_nodes: 0,
        }
    }

    pub fn aabb(&self) -> &AABB {
        &self.aabb
    }

    pub fn half_size(&self) -> Vec3 {
        self.half_size
    }

    /// Box used for culling: the octant box grown by its half-size.
    pub fn cull_bounds(&self) -> AABB {
        AABB { min: self.aabb.min - self.half_size, max: self.aabb.max + self.half_size }
    }

    pub fn nodes(&self) -> &[K] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn child(&self, index: usize) -> Option<usize> {
        self.children.get(index).copied().flatten()
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// True if a box no larger than half this octant would fit in a child.
    fn is_twice_size(&self, aabb: &AABB) -> bool {
        if aabb.is_infinite() {
            return false;
        }
        aabb.size().cmple(self.half_size).all()
    }

    /// Child slot for a box known to fit in a child; only centers matter.
    fn child_index(&self, aabb: &AABB) -> usize {
        let center = self.aabb.center();
        let node_center = aabb.center();
        (node_center.x > center.x) as usize
            | ((node_center.y > center.y) as usize) << 1
            | ((node_center.z > center.z) as usize) << 2
    }

    /// Tight box of the given child slot.
    fn child_aabb(&self, index: usize) -> AABB {
        let center = self.aabb.center();
        AABB {
            min: Vec3::new(
                if index & 1 == 0 { self.aabb.min.x } else { center.x },
                if index & 2 == 0 { self.aabb.min.y } else { center.y },
                if index & 4 == 0 { self.aabb.min.z } else { center.z },
            ),
            max: Vec3::new(
                if index & 1 == 0 { center.x } else { self.aabb.max.x },
                if index & 2 == 0 { center.y } else { self.aabb.max.y },
                if index & 4 == 0 { center.z } else { self.aabb.max.z },
            ),
        }
    }
}

/// Receives octants and nodes during a visibility walk.
pub trait OctreeVisitor<K> {
    /// Classify an octant's cull bounds.
    fn classify(&mut self, cull_bounds: &AABB) -> Visibility;

    /// Visit a node attached to an octant of the given visibility
    /// (`Partial` or `Full`).
    fn visit(&mut self, key: K, world_aabb: &AABB, octant_visibility: Visibility);
}

/// Loose octree over node keys.
#[derive(Debug, Clone)]
pub struct Octree<K> {
    octants: Vec<Octant<K>>,
    max_depth: u32,
    /// Node key -> (octant index, world AABB at last update)
    locations: FxHashMap<K, (usize, AABB)>,
}

impl<K: Copy + Eq + Hash> Octree<K> {
    /// Create an octree with a root covering `bounds`.
    ///
    /// # Arguments
    ///
    /// * `bounds` - World-space box of the root octant
    /// * `max_depth` - Deepest level children may be created at (root = 0)
    pub fn new(bounds: AABB, max_depth: u32) -> Self {
        Self {
            octants: vec![Octant::new(bounds, None)],
            max_depth,
            locations: FxHashMap::default(),
        }
    }

    pub fn bounds(&self) -> &AABB {
        &self.octants[ROOT].aabb
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of nodes currently stored.
    pub fn num_nodes(&self) -> usize {
        self.octants[ROOT].num_nodes
    }

    /// Number of octants allocated so far.
    pub fn octant_count(&self) -> usize {
        self.octants.len()
    }

    pub fn octant(&self, index: usize) -> Option<&Octant<K>> {
        self.octants.get(index)
    }

    pub fn contains(&self, key: K) -> bool {
        self.locations.contains_key(&key)
    }

    /// Octant currently holding a node.
    pub fn octant_of(&self, key: K) -> Option<usize> {
        self.locations.get(&key).map(|(index, _)| *index)
    }

    /// Depth of the octant currently holding a node (root = 0).
    pub fn depth_of(&self, key: K) -> Option<u32> {
        let mut index = self.octant_of(key)?;
        let mut depth = 0;
        while let Some(parent) = self.octants[index].parent {
            index = parent;
            depth += 1;
        }
        Some(depth)
    }

    /// Insert a node or refresh its placement after its bounds changed.
    ///
    /// A node is only re-placed when it no longer belongs in its current
    /// octant; nodes outside the root box are forced into the root.
    /// Null boxes remove the node.
    pub fn update(&mut self, key: K, world_aabb: &AABB) {
        if world_aabb.is_null() {
            self.remove(key);
            return;
        }

        let root_box = self.octants[ROOT].aabb;
        let current = match self.locations.get_mut(&key) {
            Some(entry) => {
                entry.1 = *world_aabb;
                entry.0
            }
            None => {
                if Self::is_in(world_aabb, &root_box) {
                    self.insert(key, world_aabb, ROOT, 0);
                } else {
                    self.attach(key, *world_aabb, ROOT);
                }
                return;
            }
        };

        if Self::is_in(world_aabb, &self.octants[current].aabb) {
            return;
        }

        if Self::is_in(world_aabb, &root_box) {
            self.insert(key, world_aabb, ROOT, 0);
        } else if current != ROOT {
            self.remove(key);
            self.attach(key, *world_aabb, ROOT);
        }
    }

    /// Remove a node. Octants are kept even when they become empty.
    pub fn remove(&mut self, key: K) {
        let Some((index, _)) = self.locations.remove(&key) else {
            return;
        };
        let nodes = &mut self.octants[index].nodes;
        if let Some(pos) = nodes.iter().position(|&k| k == key) {
            nodes.swap_remove(pos);
        }
        self.unref(index);
    }

    /// Rebuild the tree over new bounds, re-placing every stored node.
    pub fn resize(&mut self, bounds: AABB) {
        let stored: Vec<(K, AABB)> = self.locations.iter().map(|(k, (_, aabb))| (*k, *aabb)).collect();
        self.octants.clear();
        self.octants.push(Octant::new(bounds, None));
        self.locations.clear();
        for (key, aabb) in stored {
            self.update(key, &aabb);
        }
    }

    /// Change the maximum depth; existing nodes are re-placed.
    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = max_depth;
        let bounds = self.octants[ROOT].aabb;
        self.resize(bounds);
    }

    /// Drop every node and every child octant.
    pub fn clear(&mut self) {
        let bounds = self.octants[ROOT].aabb;
        self.octants.clear();
        self.octants.push(Octant::new(bounds, None));
        self.locations.clear();
    }

    /// Collect nodes whose world box the query touches.
    ///
    /// Subtrees whose cull bounds lie fully inside the query are accepted
    /// without per-node tests. `accept` filters nodes (exclusion, visitor
    /// policy) before any geometry test.
    pub fn find_nodes<F>(&self, query: &SceneQuery, accept: F, results: &mut Vec<K>)
    where
        F: Fn(K) -> bool,
    {
        self.find_in_octant(ROOT, query, &accept, results, false);
    }

    fn find_in_octant<F>(&self, index: usize, query: &SceneQuery, accept: &F, results: &mut Vec<K>, mut full: bool)
    where
        F: Fn(K) -> bool,
    {
        let octant = &self.octants[index];
        if !full {
            match query.classify(&octant.cull_bounds()) {
                Intersection::Outside => return,
                Intersection::Inside => full = true,
                Intersection::Intersect => {}
            }
        }

        for &key in &octant.nodes {
            if !accept(key) {
                continue;
            }
            if full {
                results.push(key);
            } else if let Some((_, aabb)) = self.locations.get(&key) {
                if query.touches(aabb) {
                    results.push(key);
                }
            }
        }

        for child in octant.children.iter().flatten() {
            self.find_in_octant(*child, query, accept, results, full);
        }
    }

    /// Hierarchical visibility walk.
    ///
    /// The root is always treated as partially visible. Once an octant is
    /// fully visible, all of its descendants are too. Empty subtrees are
    /// skipped without a bounds test.
    pub fn walk(&self, visitor: &mut dyn OctreeVisitor<K>) {
        self.walk_octant(ROOT, visitor, false);
    }

    fn walk_octant(&self, index: usize, visitor: &mut dyn OctreeVisitor<K>, found_visible: bool) {
        let octant = &self.octants[index];
        if octant.num_nodes == 0 {
            return;
        }

        let visibility = if found_visible {
            Visibility::Full
        } else if index == ROOT {
            Visibility::Partial
        } else {
            visitor.classify(&octant.cull_bounds())
        };

        if visibility == Visibility::None {
            return;
        }

        for &key in &octant.nodes {
            if let Some((_, aabb)) = self.locations.get(&key) {
                visitor.visit(key, aabb, visibility);
            }
        }

        let child_found_visible = visibility == Visibility::Full;
        for child in octant.children.iter().flatten() {
            self.walk_octant(*child, visitor, child_found_visible);
        }
    }

    /// Loose containment: the node's center lies strictly inside `aabb`
    /// and the node is smaller than `aabb` on every axis.
    fn is_in(node_aabb: &AABB, aabb: &AABB) -> bool {
        if aabb.is_null() {
            return false;
        }
        if aabb.is_infinite() {
            return true;
        }
        let center = node_aabb.center();
        if !(aabb.max.cmpgt(center).all() && aabb.min.cmplt(center).all()) {
            return false;
        }
        node_aabb.size().cmplt(aabb.size()).all()
    }

    fn insert(&mut self, key: K, world_aabb: &AABB, start: usize, start_depth: u32) {
        let mut index = start;
        let mut depth = start_depth;

        while depth < self.max_depth && self.octants[index].is_twice_size(world_aabb) {
            let slot = self.octants[index].child_index(world_aabb);
            index = match self.octants[index].children[slot] {
                Some(child) => child,
                None => {
                    let child_aabb = self.octants[index].child_aabb(slot);
                    let child = self.octants.len();
                    self.octants.push(Octant::new(child_aabb, Some(index)));
                    self.octants[index].children[slot] = Some(child);
                    child
                }
            };
            depth += 1;
        }

        if self.octant_of(key) == Some(index) {
            return;
        }
        self.remove(key);
        self.attach(key, *world_aabb, index);
    }

    fn attach(&mut self, key: K, world_aabb: AABB, index: usize) {
        self.octants[index].nodes.push(key);
        self.locations.insert(key, (index, world_aabb));
        self.add_ref(index);
    }

    fn add_ref(&mut self, index: usize) {
        let mut current = Some(index);
        while let Some(i) = current {
            self.octants[i].num_nodes += 1;
            current = self.octants[i].parent;
        }
    }

    fn unref(&mut self, index: usize) {
        let mut current = Some(index);
        while let Some(i) = current {
            self.octants[i].num_nodes = self.octants[i].num_nodes.saturating_sub(1);
            current = self.octants[i].parent;
        }
    }
}

#[cfg(test)]
#[path = "octree_tests.rs"]
mod tests;
