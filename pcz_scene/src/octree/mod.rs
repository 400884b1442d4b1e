//! Octree module — loose octree spatial index and query classification.

mod intersection;
mod octree;

pub use intersection::{
    intersect_aabb, intersect_ray, intersect_sphere, intersect_volume,
    Intersection, SceneQuery,
};
pub use octree::{Octant, Octree, OctreeVisitor, ROOT};

#[cfg(test)]
#[path = "intersection_tests.rs"]
mod tests;
