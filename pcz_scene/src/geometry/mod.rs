//! Geometry module — bounding volumes and intersection predicates.
//!
//! Leaf of the crate: boxes, planes, spheres, rays, plane-bounded volumes,
//! and the segment/capsule pair used for swept portal tests.

mod aabb;
mod plane;
mod plane_bounded_volume;
mod ray;
mod segment;
mod sphere;

pub use aabb::AABB;
pub use plane::{Plane, PlaneSide};
pub use plane_bounded_volume::PlaneBoundedVolume;
pub use ray::Ray;
pub use segment::{Capsule, Segment};
pub use sphere::Sphere;

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
