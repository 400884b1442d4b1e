//! Tests for spheres, rays, plane-bounded volumes, segments and capsules.

use glam::Vec3;
use super::*;

// ============================================================================
// Sphere
// ============================================================================

#[test]
fn test_sphere_intersects_sphere() {
    let a = Sphere::new(Vec3::ZERO, 1.0);
    assert!(a.intersects_sphere(&Sphere::new(Vec3::new(1.5, 0.0, 0.0), 0.5)));
    assert!(!a.intersects_sphere(&Sphere::new(Vec3::new(3.0, 0.0, 0.0), 0.5)));
}

#[test]
fn test_sphere_intersects_aabb() {
    let sphere = Sphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
    let aabb = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    assert!(sphere.intersects_aabb(&aabb));
    assert!(!Sphere::new(Vec3::new(3.0, 3.0, 0.0), 1.0).intersects_aabb(&aabb));
    assert!(!sphere.intersects_aabb(&AABB::NULL));
    assert!(sphere.intersects_aabb(&AABB::INFINITE));
}

// ============================================================================
// Ray
// ============================================================================

#[test]
fn test_ray_direction_normalized() {
    let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0));
    assert!((ray.direction.length() - 1.0).abs() < 1e-6);
    assert_eq!(ray.point_at(2.0), Vec3::new(0.0, 0.0, -2.0));
}

#[test]
fn test_ray_intersects_plane() {
    let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
    let ahead = Plane::from_normal_point(Vec3::Z, Vec3::new(0.0, 0.0, -4.0));
    let behind = Plane::from_normal_point(Vec3::Z, Vec3::new(0.0, 0.0, 4.0));
    assert_eq!(ray.intersects_plane(&ahead), Some(4.0));
    assert_eq!(ray.intersects_plane(&behind), None);
}

#[test]
fn test_ray_intersects_aabb() {
    let ray = Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X);
    let aabb = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    assert_eq!(ray.intersects_aabb(&aabb), Some(9.0));
    let miss = Ray::new(Vec3::new(-10.0, 5.0, 0.0), Vec3::X);
    assert_eq!(miss.intersects_aabb(&aabb), None);
    let inside = Ray::new(Vec3::ZERO, Vec3::Y);
    assert_eq!(inside.intersects_aabb(&aabb), Some(0.0));
}

#[test]
fn test_ray_intersects_sphere() {
    let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z);
    let hit = ray.intersects_sphere(&Sphere::new(Vec3::ZERO, 2.0));
    assert!(matches!(hit, Some(t) if (t - 8.0).abs() < 1e-5));
    assert_eq!(ray.intersects_sphere(&Sphere::new(Vec3::new(5.0, 0.0, 0.0), 1.0)), None);
}

// ============================================================================
// PlaneBoundedVolume
// ============================================================================

fn unit_slab() -> PlaneBoundedVolume {
    // -1 <= x <= 1, inside is the positive side of both planes
    PlaneBoundedVolume::new(
        vec![
            Plane::from_normal_point(Vec3::X, Vec3::new(-1.0, 0.0, 0.0)),
            Plane::from_normal_point(-Vec3::X, Vec3::new(1.0, 0.0, 0.0)),
        ],
        PlaneSide::Negative,
    )
}

#[test]
fn test_pbv_intersects_aabb() {
    let volume = unit_slab();
    assert!(volume.intersects_aabb(&AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5))));
    assert!(volume.intersects_aabb(&AABB::new(Vec3::new(0.5, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.0))));
    assert!(!volume.intersects_aabb(&AABB::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.0))));
    assert!(!volume.intersects_aabb(&AABB::NULL));
    assert!(volume.intersects_aabb(&AABB::INFINITE));
}

#[test]
fn test_pbv_intersects_sphere() {
    let volume = unit_slab();
    assert!(volume.intersects_sphere(&Sphere::new(Vec3::new(1.5, 0.0, 0.0), 1.0)));
    assert!(!volume.intersects_sphere(&Sphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0)));
}

// ============================================================================
// Segment / Capsule
// ============================================================================

#[test]
fn test_segment_distance_crossing() {
    let a = Segment::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
    let b = Segment::new(Vec3::new(0.0, -1.0, 2.0), Vec3::new(0.0, 1.0, 2.0));
    assert!((a.distance(&b) - 2.0).abs() < 1e-5);
}

#[test]
fn test_segment_distance_parallel() {
    let a = Segment::new(Vec3::ZERO, Vec3::X);
    let b = Segment::new(Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, 3.0, 0.0));
    assert!((a.distance(&b) - 3.0).abs() < 1e-5);
}

#[test]
fn test_segment_distance_endpoints() {
    let a = Segment::new(Vec3::ZERO, Vec3::X);
    let b = Segment::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0));
    assert!((a.distance(&b) - 2.0).abs() < 1e-5);
}

#[test]
fn test_segment_distance_degenerate_points() {
    let a = Segment::new(Vec3::ZERO, Vec3::ZERO);
    let b = Segment::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
    assert!((a.distance(&b) - 2.0).abs() < 1e-5);
}

#[test]
fn test_capsule_intersects() {
    let a = Capsule::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 1.0);
    let near = Capsule::new(Vec3::new(5.0, 1.5, 0.0), Vec3::new(5.0, 5.0, 0.0), 1.0);
    let far = Capsule::new(Vec3::new(5.0, 3.0, 0.0), Vec3::new(5.0, 5.0, 0.0), 0.5);
    assert!(a.intersects(&near));
    assert!(!a.intersects(&far));
}

#[test]
fn test_capsule_intersects_segment() {
    let capsule = Capsule::new(Vec3::ZERO, Vec3::Z, 0.5);
    assert!(capsule.intersects_segment(&Segment::new(Vec3::new(-1.0, 0.2, 0.5), Vec3::new(1.0, 0.2, 0.5))));
    assert!(!capsule.intersects_segment(&Segment::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(1.0, 2.0, 0.5))));
}
