/// PlaneBoundedVolume — convex region bounded by a set of planes.
///
/// A shape is rejected as soon as it lies entirely on the `outside` side
/// of any plane.

use super::aabb::AABB;
use super::plane::{Plane, PlaneSide};
use super::sphere::Sphere;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneBoundedVolume {
    pub planes: Vec<Plane>,
    /// Side of each plane considered outside the volume
    pub outside: PlaneSide,
}

impl Default for PlaneBoundedVolume {
    fn default() -> Self {
        Self { planes: Vec::new(), outside: PlaneSide::Negative }
    }
}

impl PlaneBoundedVolume {
    pub fn new(planes: Vec<Plane>, outside: PlaneSide) -> Self {
        Self { planes, outside }
    }

    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_null() {
            return false;
        }
        if aabb.is_infinite() {
            return true;
        }
        let center = aabb.center();
        let half_size = aabb.half_size();
        self.planes.iter().all(|plane| plane.side_of_box(center, half_size) != self.outside)
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes.iter().all(|plane| {
            let distance = plane.distance(sphere.center);
            match self.outside {
                PlaneSide::Negative => distance >= -sphere.radius,
                _ => distance <= sphere.radius,
            }
        })
    }
}
