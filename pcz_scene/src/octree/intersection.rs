/// Intersection — three-way classification of a query shape against a box.
///
/// Used by octree queries to prune subtrees (`Outside`), accept whole
/// subtrees without per-node tests (`Inside`), or fall back to testing
/// each attached node (`Intersect`).

use crate::geometry::{PlaneBoundedVolume, PlaneSide, Ray, Sphere, AABB};

/// How a box relates to a query shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Box is entirely outside the query shape
    Outside,
    /// Box is entirely inside the query shape
    Inside,
    /// Box partially overlaps the query shape
    Intersect,
}

/// A region query against the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneQuery {
    Aabb(AABB),
    Sphere(Sphere),
    Ray(Ray),
    Volume(PlaneBoundedVolume),
}

impl SceneQuery {
    /// Classify a box against this query shape.
    pub fn classify(&self, aabb: &AABB) -> Intersection {
        match self {
            SceneQuery::Aabb(query) => intersect_aabb(query, aabb),
            SceneQuery::Sphere(query) => intersect_sphere(query, aabb),
            SceneQuery::Ray(query) => intersect_ray(query, aabb),
            SceneQuery::Volume(query) => intersect_volume(query, aabb),
        }
    }

    /// True unless the box is entirely outside the query shape.
    pub fn touches(&self, aabb: &AABB) -> bool {
        self.classify(aabb) != Intersection::Outside
    }
}

/// Classify `aabb` against the query box `query`.
pub fn intersect_aabb(query: &AABB, aabb: &AABB) -> Intersection {
    if query.is_null() || aabb.is_null() {
        return Intersection::Outside;
    }
    if query.is_infinite() {
        return Intersection::Inside;
    }
    if aabb.is_infinite() {
        return Intersection::Intersect;
    }
    if !query.intersects(aabb) {
        return Intersection::Outside;
    }

    let strictly_inside = aabb.min.cmpgt(query.min).all() && aabb.max.cmplt(query.max).all();
    if strictly_inside {
        Intersection::Inside
    } else {
        Intersection::Intersect
    }
}

/// Classify `aabb` against a sphere.
pub fn intersect_sphere(query: &Sphere, aabb: &AABB) -> Intersection {
    if aabb.is_null() {
        return Intersection::Outside;
    }
    if aabb.is_infinite() {
        return Intersection::Intersect;
    }

    let radius_sq = query.radius * query.radius;
    if aabb.corners().iter().all(|c| (*c - query.center).length_squared() < radius_sq) {
        return Intersection::Inside;
    }

    if aabb.squared_distance(query.center) <= radius_sq {
        Intersection::Intersect
    } else {
        Intersection::Outside
    }
}

/// Classify `aabb` against a ray. A ray never contains a box.
pub fn intersect_ray(query: &Ray, aabb: &AABB) -> Intersection {
    if aabb.is_null() {
        return Intersection::Outside;
    }
    if aabb.is_infinite() {
        return Intersection::Intersect;
    }
    match query.intersects_aabb(aabb) {
        Some(_) => Intersection::Intersect,
        None => Intersection::Outside,
    }
}

/// Classify `aabb` against a convex plane-bounded volume.
pub fn intersect_volume(query: &PlaneBoundedVolume, aabb: &AABB) -> Intersection {
    if aabb.is_null() {
        return Intersection::Outside;
    }
    if aabb.is_infinite() {
        return Intersection::Intersect;
    }

    let center = aabb.center();
    let half_size = aabb.half_size();
    let mut all_inside = true;

    for plane in &query.planes {
        let side = plane.side_of_box(center, half_size);
        if side == query.outside {
            return Intersection::Outside;
        }
        if side == PlaneSide::Both {
            all_inside = false;
        }
    }

    if all_inside {
        Intersection::Inside
    } else {
        Intersection::Intersect
    }
}
