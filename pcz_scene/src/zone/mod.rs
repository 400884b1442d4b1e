//! Zone module — spatial partitions joined by portals.
//!
//! `Zone` is the capability every zone kind implements; `ZoneCore` carries
//! the state they share. Zones are built through a `ZoneFactoryRegistry`.

mod default_zone;
mod octree_zone;
mod terrain_page_source;
mod terrain_zone;
mod zone;
mod zone_factory;

pub use default_zone::{DefaultZone, DEFAULT_ZONE_TYPE};
pub use octree_zone::{
    OctreeZone, DEFAULT_OCTREE_DEPTH, DEFAULT_OCTREE_HALF_EXTENT, MAX_OCTREE_DEPTH, OCTREE_ZONE_TYPE,
};
pub use terrain_page_source::{
    HeightfieldPageSource, TerrainPage, TerrainPageSource, HEIGHTFIELD_PAGE_SOURCE,
};
pub use terrain_zone::{parse_config, TerrainOptions, TerrainZone, TERRAIN_ZONE_TYPE};
pub use zone::{Zone, ZoneCore, ZoneKey};
pub use zone_factory::{
    DefaultZoneFactory, OctreeZoneFactory, TerrainZoneFactory, ZoneFactory, ZoneFactoryRegistry,
};

#[cfg(test)]
#[path = "zone_tests.rs"]
mod tests;
