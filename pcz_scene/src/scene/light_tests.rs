use glam::Vec3;
use slotmap::SlotMap;
use crate::camera::CameraKey;
use crate::portal::{Portal, PortalKey, PortalKind, PortalShape};
use crate::scene::SceneNode;
use crate::zone::{DefaultZone, Zone, ZoneKey};
use super::*;

/// Two zones split by the z = 0 plane; `near` holds z > 0.
struct Rooms {
    zones: SlotMap<ZoneKey, Box<dyn Zone>>,
    portals: SlotMap<PortalKey, Portal>,
    near: ZoneKey,
    far: ZoneKey,
}

/// Quad in the z = 0 plane whose normal points toward +Z.
fn doorway(name: &str, home: ZoneKey, target: ZoneKey) -> Portal {
    let mut portal = Portal::new(name, PortalKind::Portal, PortalShape::Quad);
    portal.set_corners(&[
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
    ]);
    portal.set_current_home_zone(Some(home));
    portal.set_target_zone(Some(target));
    portal.update_derived_values(None);
    portal
}

fn rooms() -> Rooms {
    let mut zones: SlotMap<ZoneKey, Box<dyn Zone>> = SlotMap::with_key();
    let near = zones.insert(Box::new(DefaultZone::new("Near")));
    let far = zones.insert(Box::new(DefaultZone::new("Far")));
    let mut portals = SlotMap::with_key();
    let door = portals.insert(doorway("door", near, far));
    zones[near].core_mut().add_portal(door);
    for zone in zones.values_mut() {
        zone.core_mut().set_portals_updated(false);
    }
    Rooms { zones, portals, near, far }
}

fn camera_key() -> CameraKey {
    let mut map: SlotMap<CameraKey, ()> = SlotMap::with_key();
    map.insert(())
}

fn light_at(light_type: LightType, position: Vec3) -> PczLight {
    let mut light = PczLight::new("lamp", light_type);
    light.set_position(position);
    light.sync_to_node(None);
    light
}

// ============================================================================
// Zone reach
// ============================================================================

#[test]
fn test_point_light_reaches_through_facing_portal() {
    let rooms = rooms();
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));

    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);

    assert_eq!(light.affected_zones(), &[rooms.near, rooms.far]);
}

#[test]
fn test_point_light_out_of_range_stays_home() {
    let rooms = rooms();
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));
    light.set_attenuation_range(2.0);

    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);

    assert_eq!(light.affected_zones(), &[rooms.near]);
}

#[test]
fn test_light_behind_quad_does_not_pass() {
    let rooms = rooms();
    let mut light = light_at(LightType::Spotlight, Vec3::new(0.0, 0.0, -5.0));

    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);

    assert_eq!(light.affected_zones(), &[rooms.near]);
}

#[test]
fn test_directional_light_needs_portal_ahead() {
    let rooms = rooms();
    let mut toward = light_at(LightType::Directional, Vec3::new(0.0, 0.0, 5.0));
    toward.set_direction(Vec3::NEG_Z);
    toward.sync_to_node(None);
    toward.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);
    assert!(toward.affects_zone(rooms.far));

    let mut away = light_at(LightType::Directional, Vec3::new(0.0, 0.0, 5.0));
    away.set_direction(Vec3::Z);
    away.sync_to_node(None);
    away.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);
    assert!(!away.affects_zone(rooms.far));
}

#[test]
fn test_disabled_portal_blocks_light() {
    let mut rooms = rooms();
    for portal in rooms.portals.values_mut() {
        portal.set_enabled(false);
    }
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));

    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);

    assert_eq!(light.affected_zones(), &[rooms.near]);
}

#[test]
fn test_return_portal_is_not_followed_back() {
    let mut rooms = rooms();
    let door = rooms.zones[rooms.near].core().portals()[0];
    // Matching portal on the far side, facing -Z
    let mut back = Portal::new("door_back", PortalKind::Portal, PortalShape::Quad);
    back.set_corners(&[
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(-1.0, -1.0, 0.0),
    ]);
    back.set_current_home_zone(Some(rooms.far));
    back.set_target_zone(Some(rooms.near));
    back.set_target_portal(Some(door));
    back.update_derived_values(None);
    let back = rooms.portals.insert(back);
    rooms.portals[door].set_target_portal(Some(back));
    rooms.zones[rooms.far].core_mut().add_portal(back);

    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));
    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);

    assert_eq!(light.affected_zones(), &[rooms.near, rooms.far]);
}

#[test]
fn test_light_passes_box_portal_then_quad_beyond() {
    let mut zones: SlotMap<ZoneKey, Box<dyn Zone>> = SlotMap::with_key();
    let near = zones.insert(Box::new(DefaultZone::new("Near")));
    let cell = zones.insert(Box::new(DefaultZone::new("Cell")));
    let far = zones.insert(Box::new(DefaultZone::new("Far")));
    let mut portals = SlotMap::with_key();

    let mut cage = Portal::new("cage", PortalKind::Portal, PortalShape::Aabb);
    cage.set_corners(&[Vec3::new(-2.0, -2.0, 3.0), Vec3::new(2.0, 2.0, 7.0)]);
    cage.set_current_home_zone(Some(near));
    cage.set_target_zone(Some(cell));
    cage.update_derived_values(None);
    let cage = portals.insert(cage);
    zones[near].core_mut().add_portal(cage);

    // Below z = 0 and facing the light
    let mut hatch = Portal::new("hatch", PortalKind::Portal, PortalShape::Quad);
    hatch.set_corners(&[
        Vec3::new(-1.0, -1.0, -3.0),
        Vec3::new(1.0, -1.0, -3.0),
        Vec3::new(1.0, 1.0, -3.0),
        Vec3::new(-1.0, 1.0, -3.0),
    ]);
    hatch.set_current_home_zone(Some(cell));
    hatch.set_target_zone(Some(far));
    hatch.update_derived_values(None);
    let hatch = portals.insert(hatch);
    zones[cell].core_mut().add_portal(hatch);

    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));
    light.update_zones(near, 1, &zones, &portals);

    assert_eq!(light.affected_zones(), &[near, cell, far]);
}

#[test]
fn test_affects_visible_zone_follows_frame() {
    let mut rooms = rooms();
    rooms.zones[rooms.far].core_mut().stamp_visible(4, camera_key());
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));

    light.update_zones(rooms.near, 4, &rooms.zones, &rooms.portals);
    assert!(light.affects_visible_zone());

    light.update_zones(rooms.near, 5, &rooms.zones, &rooms.portals);
    assert!(!light.affects_visible_zone());
}

#[test]
fn test_unknown_home_zone_clears_reach() {
    let rooms = rooms();
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));
    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);

    let mut other: SlotMap<ZoneKey, Box<dyn Zone>> = SlotMap::with_key();
    let _ = other.insert(Box::new(DefaultZone::new("a")));
    let _ = other.insert(Box::new(DefaultZone::new("b")));
    let stranger = other.insert(Box::new(DefaultZone::new("c")));
    light.update_zones(stranger, 1, &rooms.zones, &rooms.portals);

    assert!(light.affected_zones().is_empty());
}

// ============================================================================
// Update tracking
// ============================================================================

#[test]
fn test_needs_update_follows_portal_changes() {
    let mut rooms = rooms();
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));
    assert!(light.needs_update(&rooms.zones));

    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);
    light.clear_needs_update();
    assert!(!light.needs_update(&rooms.zones));

    rooms.zones[rooms.far].core_mut().set_portals_updated(true);
    assert!(light.needs_update(&rooms.zones));
}

#[test]
fn test_sync_to_node_derives_world_placement() {
    let mut node = SceneNode::new("post");
    node.set_position(Vec3::new(10.0, 0.0, 0.0));
    node.update_transform();
    let mut light = PczLight::new("lamp", LightType::Point);
    light.set_position(Vec3::new(0.0, 1.0, 0.0));
    light.clear_needs_update();

    light.sync_to_node(Some(&node));
    assert_eq!(light.derived_position(), Vec3::new(10.0, 1.0, 0.0));
    assert_eq!(light.derived_direction(), Vec3::NEG_Z);

    light.clear_needs_update();
    light.sync_to_node(Some(&node));
    assert!(!light.needs_update(&SlotMap::with_key()));
}

#[test]
fn test_remove_zone_from_affected() {
    let rooms = rooms();
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));
    light.update_zones(rooms.near, 1, &rooms.zones, &rooms.portals);

    light.remove_zone_from_affected(rooms.far);

    assert_eq!(light.affected_zones(), &[rooms.near]);
}

#[test]
fn test_refresh_visible_zone_flag_after_walk() {
    let mut rooms = rooms();
    let mut light = light_at(LightType::Point, Vec3::new(0.0, 0.0, 5.0));
    light.update_zones(rooms.near, 2, &rooms.zones, &rooms.portals);
    assert!(!light.affects_visible_zone());

    // A later walk stamps the far zone in frame 2
    rooms.zones[rooms.far].core_mut().stamp_visible(2, camera_key());
    light.refresh_visible_zone_flag(2, &rooms.zones);

    assert!(light.affects_visible_zone());
}
