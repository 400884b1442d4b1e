/// Ray — half-line used by ray scene queries and portal hit tests.

use glam::Vec3;
use super::aabb::AABB;
use super::plane::Plane;
use super::sphere::Sphere;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; the direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to a plane, if hit in front of the origin.
    pub fn intersects_plane(&self, plane: &Plane) -> Option<f32> {
        let denom = plane.normal.dot(self.direction);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let t = -plane.distance(self.origin) / denom;
        (t >= 0.0).then_some(t)
    }

    /// Entry distance into a box (0 if the origin is inside), slab method.
    pub fn intersects_aabb(&self, aabb: &AABB) -> Option<f32> {
        if aabb.is_null() {
            return None;
        }
        if aabb.is_infinite() {
            return Some(0.0);
        }

        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            if direction.abs() < f32::EPSILON {
                if origin < aabb.min[axis] || origin > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let mut t0 = (aabb.min[axis] - origin) * inv;
            let mut t1 = (aabb.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }

    /// Entry distance into a sphere (0 if the origin is inside).
    pub fn intersects_sphere(&self, sphere: &Sphere) -> Option<f32> {
        let offset = self.origin - sphere.center;
        let radius_sq = sphere.radius * sphere.radius;
        if offset.length_squared() <= radius_sq {
            return Some(0.0);
        }

        let b = offset.dot(self.direction);
        let c = offset.length_squared() - radius_sq;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        (t >= 0.0).then_some(t)
    }
}
