/// Plane — `normal · p + d = 0`, with a signed-side classification.
///
/// The positive side is the half-space the normal points into. Culling
/// code treats the negative side as "outside".

use glam::{Vec3, Vec4};
use super::aabb::AABB;

/// Which side of a plane a point or volume lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Exactly on the plane (points only) or undefined (null boxes)
    NoSide,
    /// Strictly on the side the normal points into
    Positive,
    /// Strictly on the opposite side
    Negative,
    /// Volume straddles the plane
    Both,
}

/// An oriented plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Signed distance term
    pub d: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self { normal: Vec3::Z, d: 0.0 }
    }
}

impl Plane {
    /// Plane with a given normal passing through a point.
    pub fn from_normal_point(normal: Vec3, point: Vec3) -> Self {
        Self { normal, d: -normal.dot(point) }
    }

    /// Plane through three points; normal is `(p1 - p0) x (p2 - p0)`, normalized.
    pub fn from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        Self { normal, d: -normal.dot(p0) }
    }

    /// Plane from a packed `(A, B, C, D)` frustum row.
    pub fn from_vec4(v: Vec4) -> Self {
        Self { normal: v.truncate(), d: v.w }
    }

    /// Redefine this plane in place from three points.
    pub fn redefine(&mut self, p0: Vec3, p1: Vec3, p2: Vec3) {
        *self = Self::from_points(p0, p1, p2);
    }

    /// Signed distance from a point.
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Side of a point.
    pub fn side(&self, point: Vec3) -> PlaneSide {
        let distance = self.distance(point);
        if distance < 0.0 {
            PlaneSide::Negative
        } else if distance > 0.0 {
            PlaneSide::Positive
        } else {
            PlaneSide::NoSide
        }
    }

    /// Side of a box given by center and half-size.
    pub fn side_of_box(&self, center: Vec3, half_size: Vec3) -> PlaneSide {
        let distance = self.distance(center);
        let max_abs_distance = self.normal.abs().dot(half_size);

        if distance < -max_abs_distance {
            PlaneSide::Negative
        } else if distance > max_abs_distance {
            PlaneSide::Positive
        } else {
            PlaneSide::Both
        }
    }

    /// Side of an AABB. Null boxes have no side, infinite boxes straddle.
    pub fn side_of_aabb(&self, aabb: &AABB) -> PlaneSide {
        if aabb.is_null() {
            PlaneSide::NoSide
        } else if aabb.is_infinite() {
            PlaneSide::Both
        } else {
            self.side_of_box(aabb.center(), aabb.half_size())
        }
    }
}

#[cfg(test)]
#[path = "plane_tests.rs"]
mod tests;
