/// ZoneFactory — constructors for zone kinds, keyed by zone-type name.
///
/// The scene manager owns one registry, pre-filled with the built-in kinds.
/// Hosts add their own kinds at runtime without touching the manager.

use rustc_hash::FxHashMap;
use crate::error::Result;
use super::default_zone::{DefaultZone, DEFAULT_ZONE_TYPE};
use super::octree_zone::{OctreeZone, OCTREE_ZONE_TYPE};
use super::terrain_zone::{TerrainZone, TERRAIN_ZONE_TYPE};
use super::zone::Zone;

/// Constructor for one zone kind.
pub trait ZoneFactory: Send + Sync {
    /// Zone-type name this factory answers to.
    fn type_name(&self) -> &str;

    fn supports_zone_type(&self, zone_type: &str) -> bool {
        self.type_name() == zone_type
    }

    fn create_zone(&self, name: &str) -> Box<dyn Zone>;
}

pub struct DefaultZoneFactory;

impl ZoneFactory for DefaultZoneFactory {
    fn type_name(&self) -> &str {
        DEFAULT_ZONE_TYPE
    }

    fn create_zone(&self, name: &str) -> Box<dyn Zone> {
        Box::new(DefaultZone::new(name))
    }
}

pub struct OctreeZoneFactory;

impl ZoneFactory for OctreeZoneFactory {
    fn type_name(&self) -> &str {
        OCTREE_ZONE_TYPE
    }

    fn create_zone(&self, name: &str) -> Box<dyn Zone> {
        Box::new(OctreeZone::new(name))
    }
}

pub struct TerrainZoneFactory;

impl ZoneFactory for TerrainZoneFactory {
    fn type_name(&self) -> &str {
        TERRAIN_ZONE_TYPE
    }

    fn create_zone(&self, name: &str) -> Box<dyn Zone> {
        Box::new(TerrainZone::new(name))
    }
}

/// Name-keyed set of zone factories.
#[derive(Default)]
pub struct ZoneFactoryRegistry {
    factories: FxHashMap<String, Box<dyn ZoneFactory>>,
}

impl ZoneFactoryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the default, octree and terrain factories.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [Box<dyn ZoneFactory>; 3] =
            [Box::new(DefaultZoneFactory), Box::new(OctreeZoneFactory), Box::new(TerrainZoneFactory)];
        for factory in builtins {
            registry.factories.insert(factory.type_name().to_string(), factory);
        }
        registry
    }

    pub fn register(&mut self, factory: Box<dyn ZoneFactory>) -> Result<()> {
        let type_name = factory.type_name().to_string();
        if self.factories.contains_key(&type_name) {
            crate::engine_bail!("pcz::ZoneFactoryRegistry", DuplicateItem:
                "A zone factory for type '{}' is already registered", type_name);
        }
        crate::engine_debug!("pcz::ZoneFactoryRegistry", "Registered zone factory '{}'", type_name);
        self.factories.insert(type_name, factory);
        Ok(())
    }

    /// Remove a factory, returning it if it was registered.
    pub fn unregister(&mut self, type_name: &str) -> Option<Box<dyn ZoneFactory>> {
        self.factories.remove(type_name)
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Build a zone of the given type with the first factory supporting it.
    pub fn create_zone(&self, zone_type: &str, name: &str) -> Result<Box<dyn Zone>> {
        let factory = self
            .factories
            .get(zone_type)
            .or_else(|| self.factories.values().find(|f| f.supports_zone_type(zone_type)));
        match factory {
            Some(factory) => Ok(factory.create_zone(name)),
            None => Err(crate::engine_err!("pcz::ZoneFactoryRegistry", ItemNotFound:
                "No zone factory supports zone type '{}'", zone_type)),
        }
    }

    /// Registered type names, sorted.
    pub fn factory_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "zone_factory_tests.rs"]
mod tests;
