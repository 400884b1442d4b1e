/// Segment and Capsule — the swept shapes behind continuous portal tests.
///
/// A capsule is a line-swept sphere: every point within `radius` of a
/// segment. Two capsules intersect when the distance between their core
/// segments is at most the sum of their radii.

use glam::Vec3;

const PARALLEL_EPSILON: f32 = 1e-6;

/// Finite line segment from `start` to `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
}

impl Segment {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Squared distance between the closest points of two segments.
    pub fn squared_distance(&self, other: &Segment) -> f32 {
        let d1 = self.end - self.start;
        let d2 = other.end - other.start;
        let r = self.start - other.start;
        let a = d1.length_squared();
        let e = d2.length_squared();
        let f = d2.dot(r);

        let (s, t) = if a <= PARALLEL_EPSILON && e <= PARALLEL_EPSILON {
            (0.0, 0.0)
        } else if a <= PARALLEL_EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(r);
            if e <= PARALLEL_EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(d2);
                let denom = a * e - b * b;
                let mut s = if denom.abs() > PARALLEL_EPSILON {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let mut t = (b * s + f) / e;
                if t < 0.0 {
                    t = 0.0;
                    s = (-c / a).clamp(0.0, 1.0);
                } else if t > 1.0 {
                    t = 1.0;
                    s = ((b - c) / a).clamp(0.0, 1.0);
                }
                (s, t)
            }
        };

        let closest_self = self.start + d1 * s;
        let closest_other = other.start + d2 * t;
        (closest_self - closest_other).length_squared()
    }

    pub fn distance(&self, other: &Segment) -> f32 {
        self.squared_distance(other).sqrt()
    }
}

/// Line-swept sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub segment: Segment,
    pub radius: f32,
}

impl Capsule {
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self { segment: Segment::new(start, end), radius }
    }

    pub fn intersects(&self, other: &Capsule) -> bool {
        let reach = self.radius + other.radius;
        self.segment.squared_distance(&other.segment) <= reach * reach
    }

    pub fn intersects_segment(&self, segment: &Segment) -> bool {
        self.segment.squared_distance(segment) <= self.radius * self.radius
    }
}
