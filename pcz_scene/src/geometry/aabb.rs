/// AABB — axis-aligned bounding box with explicit null and infinite states.
///
/// A null box (`min = +inf`, `max = -inf`) contains nothing and merges as
/// the identity. An infinite box (`min = -inf`, `max = +inf`) contains
/// everything. Finite boxes have `min <= max` on every axis.

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::NULL
    }
}

impl AABB {
    /// Empty box
    pub const NULL: AABB = AABB {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Box containing all of space
    pub const INFINITE: AABB = AABB {
        min: Vec3::splat(f32::NEG_INFINITY),
        max: Vec3::splat(f32::INFINITY),
    };

    /// Create a finite box from two corners (components are sorted).
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Box of the given half-size around a center point.
    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self {
        Self { min: center - half_size, max: center + half_size }
    }

    /// Smallest box enclosing all points (null for an empty slice).
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::NULL, |acc, p| acc.merged_point(*p))
    }

    pub fn is_null(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn is_infinite(&self) -> bool {
        self.min.x == f32::NEG_INFINITY && self.min.y == f32::NEG_INFINITY && self.min.z == f32::NEG_INFINITY
            && self.max.x == f32::INFINITY && self.max.y == f32::INFINITY && self.max.z == f32::INFINITY
    }

    pub fn is_finite(&self) -> bool {
        !self.is_null() && !self.is_infinite()
    }

    /// Center point. Zero for null and infinite boxes.
    pub fn center(&self) -> Vec3 {
        if self.is_finite() { (self.min + self.max) * 0.5 } else { Vec3::ZERO }
    }

    /// Full extent. Zero for a null box, infinite for an infinite box.
    pub fn size(&self) -> Vec3 {
        if self.is_null() {
            Vec3::ZERO
        } else if self.is_infinite() {
            Vec3::splat(f32::INFINITY)
        } else {
            self.max - self.min
        }
    }

    /// Half extent.
    pub fn half_size(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Volume (0 for null, infinite for infinite boxes).
    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// The 8 corners; bit0 selects max.x, bit1 max.y, bit2 max.z.
    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
        }
        corners
    }

    /// Transform this box by a matrix, returning a new box.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the box extents
    /// for a tight result without transforming all 8 corners.
    /// Null and infinite boxes are returned unchanged.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        if !self.is_finite() {
            return *self;
        }

        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        AABB { min: new_min, max: new_max }
    }

    /// Box translated by an offset (null and infinite boxes unchanged).
    pub fn translated(&self, offset: Vec3) -> AABB {
        if !self.is_finite() {
            return *self;
        }
        AABB { min: self.min + offset, max: self.max + offset }
    }

    /// Test if this box fully contains another box.
    ///
    /// A null box is contained by any non-null box; nothing but an infinite
    /// box contains an infinite box.
    pub fn contains(&self, other: &AABB) -> bool {
        if self.is_null() {
            return false;
        }
        if other.is_null() || self.is_infinite() {
            return true;
        }
        if other.is_infinite() {
            return false;
        }
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Test if a point lies inside or on the boundary.
    pub fn contains_point(&self, point: Vec3) -> bool {
        if self.is_null() {
            return false;
        }
        point.x >= self.min.x && point.x <= self.max.x
        && point.y >= self.min.y && point.y <= self.max.y
        && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Test if this box intersects (overlaps or touches) another box.
    pub fn intersects(&self, other: &AABB) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Overlapping region of two boxes (null if they do not intersect).
    pub fn intersection(&self, other: &AABB) -> AABB {
        if !self.intersects(other) {
            return AABB::NULL;
        }
        AABB { min: self.min.max(other.min), max: self.max.min(other.max) }
    }

    /// Smallest box containing both boxes.
    pub fn merged(&self, other: &AABB) -> AABB {
        if self.is_infinite() || other.is_infinite() {
            return AABB::INFINITE;
        }
        AABB { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Smallest box containing this box and a point.
    pub fn merged_point(&self, point: Vec3) -> AABB {
        if self.is_infinite() {
            return *self;
        }
        AABB { min: self.min.min(point), max: self.max.max(point) }
    }

    /// Squared distance from a point to the closest point of the box.
    pub fn squared_distance(&self, point: Vec3) -> f32 {
        if self.is_null() {
            return f32::INFINITY;
        }
        let clamped = point.clamp(self.min, self.max);
        (point - clamped).length_squared()
    }
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;
