use glam::Vec3;
use slotmap::SlotMap;
use crate::geometry::AABB;
use crate::portal::{Portal, PortalKey, PortalKind, PortalShape};
use super::*;

/// Camera at +5 on Z looking toward the origin.
fn camera_at_positive_z() -> PczCamera {
    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 1000.0);
    camera.set_position(Vec3::new(0.0, 0.0, 5.0));
    PczCamera::new("main", camera)
}

/// Quad at z = center.z whose normal points toward +Z.
fn quad_facing_positive_z(center: Vec3, half: f32) -> Portal {
    let mut portal = Portal::new("door", PortalKind::Portal, PortalShape::Quad);
    portal.set_corners(&[
        center + Vec3::new(-half, -half, 0.0),
        center + Vec3::new(half, -half, 0.0),
        center + Vec3::new(half, half, 0.0),
        center + Vec3::new(-half, half, 0.0),
    ]);
    portal.update_derived_values(None);
    portal
}

fn portal_key() -> PortalKey {
    let mut map: SlotMap<PortalKey, ()> = SlotMap::with_key();
    map.insert(())
}

fn unit_box(center: Vec3) -> AABB {
    AABB::from_center_half_size(center, Vec3::splat(0.5))
}

// ============================================================================
// Frame setup
// ============================================================================

#[test]
fn test_update_anchors_extra_frustum() {
    let camera = camera_at_positive_z();
    let extra = camera.extra_culling_frustum();
    assert_eq!(extra.origin(), Vec3::new(0.0, 0.0, 5.0));
    assert!((extra.origin_plane().normal - -Vec3::Z).length() < 1e-5);
    assert!(extra.use_origin_plane());
}

#[test]
fn test_orthographic_camera_skips_origin_plane() {
    let mut camera = Camera::orthographic(10.0, 1.0, 0.1, 100.0);
    camera.set_position(Vec3::new(0.0, 0.0, 5.0));
    let camera = PczCamera::new("ortho", camera);
    assert!(!camera.extra_culling_frustum().use_origin_plane());
    assert_eq!(camera.extra_culling_frustum().projection_type(), ProjectionType::Orthographic);
}

// ============================================================================
// Portal visibility
// ============================================================================

#[test]
fn test_portal_ahead_is_visible() {
    let camera = camera_at_positive_z();
    assert!(camera.is_visible_portal(portal_key(), &quad_facing_positive_z(Vec3::ZERO, 1.0)));
}

#[test]
fn test_portal_facing_away_is_culled() {
    let mut camera = camera_at_positive_z();
    camera.camera_mut().set_position(Vec3::new(0.0, 0.0, -5.0));
    camera.camera_mut().look_at(Vec3::ZERO);
    camera.update();
    assert!(!camera.is_visible_portal(portal_key(), &quad_facing_positive_z(Vec3::ZERO, 1.0)));
}

#[test]
fn test_portal_behind_camera_is_culled() {
    let mut camera = camera_at_positive_z();
    camera.camera_mut().look_at(Vec3::new(0.0, 0.0, 10.0));
    camera.update();
    assert!(!camera.is_visible_portal(portal_key(), &quad_facing_positive_z(Vec3::ZERO, 1.0)));
}

#[test]
fn test_box_portal_around_camera_is_visible() {
    let camera = camera_at_positive_z();
    let mut portal = Portal::new("room", PortalKind::Portal, PortalShape::Aabb);
    portal.set_corners(&[Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0)]);
    portal.update_derived_values(None);
    assert!(camera.is_visible_portal(portal_key(), &portal));
}

#[test]
fn test_disabled_portal_is_culled() {
    let camera = camera_at_positive_z();
    let mut portal = quad_facing_positive_z(Vec3::ZERO, 1.0);
    portal.set_enabled(false);
    assert!(!camera.is_visible_portal(portal_key(), &portal));
}

// ============================================================================
// Culling through a portal
// ============================================================================

#[test]
fn test_portal_planes_narrow_the_view() {
    let mut camera = camera_at_positive_z();
    let key = portal_key();
    let portal = quad_facing_positive_z(Vec3::ZERO, 1.0);

    // Inside the 45 degree frustum but outside the cone through the door
    let beside = unit_box(Vec3::new(3.0, 0.0, -5.0));
    assert!(camera.is_visible_aabb(&beside));

    assert_eq!(camera.add_portal_culling_planes(key, &portal), 5);
    assert!(!camera.is_visible_aabb(&beside));
    assert!(camera.is_visible_aabb(&unit_box(Vec3::new(0.0, 0.0, -5.0))));

    camera.remove_portal_culling_planes(key);
    assert!(camera.is_visible_aabb(&beside));
}

#[test]
fn test_get_visibility_combines_frustums() {
    let mut camera = camera_at_positive_z();
    assert_eq!(camera.get_visibility(&unit_box(Vec3::new(0.0, 0.0, -5.0))), Visibility::Full);
    assert_eq!(camera.get_visibility(&unit_box(Vec3::new(0.0, 0.0, 20.0))), Visibility::None);

    camera.add_portal_culling_planes(portal_key(), &quad_facing_positive_z(Vec3::ZERO, 1.0));
    // Straddles the cone edge at x = 2
    assert_eq!(camera.get_visibility(&unit_box(Vec3::new(2.0, 0.0, -5.0))), Visibility::Partial);

    camera.remove_all_extra_culling_planes();
    assert_eq!(camera.extra_culling_frustum().culling_plane_count(), 0);
    assert_eq!(camera.get_visibility(&unit_box(Vec3::new(2.0, 0.0, -5.0))), Visibility::Full);
}
