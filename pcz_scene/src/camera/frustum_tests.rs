use glam::{Mat4, Vec3};
use crate::geometry::{Sphere, AABB};
use super::*;

fn looking_down_negative_z(far: f32) -> Frustum {
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, far);
    let view = Mat4::look_at_rh(Vec3::ZERO, -Vec3::Z, Vec3::Y);
    Frustum::from_view_projection(&(projection * view))
}

// ============================================================================
// Frustum::from_view_projection
// ============================================================================

#[test]
fn test_frustum_planes_are_normalized() {
    let frustum = looking_down_negative_z(100.0);
    for plane in &frustum.planes {
        let normal_len = Vec3::new(plane.x, plane.y, plane.z).length();
        assert!((normal_len - 1.0).abs() < 1e-4, "plane normal should be unit length");
    }
}

#[test]
fn test_near_plane_sits_at_near_distance() {
    let frustum = looking_down_negative_z(100.0);
    let near = frustum.plane(PLANE_NEAR);
    assert!((near.normal - -Vec3::Z).length() < 1e-4);
    assert!(near.distance(Vec3::new(0.0, 0.0, -0.1)).abs() < 1e-4);
}

#[test]
fn test_infinite_far_plane_never_culls() {
    let projection = Mat4::perspective_infinite_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1);
    let view = Mat4::look_at_rh(Vec3::ZERO, -Vec3::Z, Vec3::Y);
    let frustum = Frustum::from_view_projection(&(projection * view));

    let far_away = AABB::from_center_half_size(Vec3::new(0.0, 0.0, -1.0e6), Vec3::ONE);
    assert!(frustum.intersects_aabb(&far_away));
}

// ============================================================================
// Frustum::intersects_aabb / intersects_sphere
// ============================================================================

#[test]
fn test_aabb_in_front_is_visible() {
    let frustum = looking_down_negative_z(100.0);
    let aabb = AABB::new(Vec3::new(-1.0, -1.0, -10.0), Vec3::new(1.0, 1.0, -8.0));
    assert!(frustum.intersects_aabb(&aabb));
}

#[test]
fn test_aabb_behind_camera_is_culled() {
    let frustum = looking_down_negative_z(100.0);
    let aabb = AABB::new(Vec3::new(-1.0, -1.0, 10.0), Vec3::new(1.0, 1.0, 12.0));
    assert!(!frustum.intersects_aabb(&aabb));
}

#[test]
fn test_aabb_beyond_far_plane_is_culled() {
    let frustum = looking_down_negative_z(10.0);
    let aabb = AABB::new(Vec3::new(-1.0, -1.0, -20.0), Vec3::new(1.0, 1.0, -18.0));
    assert!(!frustum.intersects_aabb(&aabb));
}

#[test]
fn test_special_boxes() {
    let frustum = looking_down_negative_z(100.0);
    assert!(!frustum.intersects_aabb(&AABB::NULL));
    assert!(frustum.intersects_aabb(&AABB::INFINITE));
}

#[test]
fn test_sphere_visibility() {
    let frustum = looking_down_negative_z(100.0);
    assert!(frustum.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0)));
    assert!(!frustum.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0)));
    // Centre behind, radius reaching past the near plane
    assert!(frustum.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 0.5), 1.0)));
}

// ============================================================================
// Frustum::classify_aabb
// ============================================================================

#[test]
fn test_classify_full_partial_none() {
    let projection = Mat4::orthographic_rh(-5.0, 5.0, -5.0, 5.0, 0.1, 100.0);
    let frustum = Frustum::from_view_projection(&projection);

    let inside = AABB::new(Vec3::new(-1.0, -1.0, -10.0), Vec3::new(1.0, 1.0, -5.0));
    let straddling = AABB::new(Vec3::new(4.0, 0.0, -10.0), Vec3::new(6.0, 1.0, -5.0));
    let outside = AABB::new(Vec3::new(10.0, 0.0, -10.0), Vec3::new(12.0, 1.0, -5.0));

    assert_eq!(frustum.classify_aabb(&inside), Visibility::Full);
    assert_eq!(frustum.classify_aabb(&straddling), Visibility::Partial);
    assert_eq!(frustum.classify_aabb(&outside), Visibility::None);
    assert_eq!(frustum.classify_aabb(&AABB::NULL), Visibility::None);
}

// ============================================================================
// Plane constants
// ============================================================================

#[test]
fn test_plane_constants() {
    assert_eq!(PLANE_LEFT, 0);
    assert_eq!(PLANE_RIGHT, 1);
    assert_eq!(PLANE_BOTTOM, 2);
    assert_eq!(PLANE_TOP, 3);
    assert_eq!(PLANE_NEAR, 4);
    assert_eq!(PLANE_FAR, 5);
}
