/// TerrainZone — an octree zone covering a single page of heightfield terrain.
///
/// The zone wraps an [`OctreeZone`] for node storage and adds the terrain
/// configuration, a registry of page sources, and height lookups over the
/// loaded page. Its enclosure node never visits neighbouring zones.

use std::any::Any;
use std::str::FromStr;
use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use crate::camera::{CameraKey, PczCamera};
use crate::error::Result;
use crate::geometry::AABB;
use crate::octree::SceneQuery;
use crate::scene::{NodeKey, OptionValue, SceneNode};
use super::octree_zone::OctreeZone;
use super::terrain_page_source::{
    HeightfieldPageSource, TerrainPage, TerrainPageSource, HEIGHTFIELD_PAGE_SOURCE,
};
use super::zone::{Zone, ZoneCore};

/// Type name the terrain factory registers.
pub const TERRAIN_ZONE_TYPE: &str = "ZoneType_Terrain";

const TERRAIN_OPTION_KEYS: &[&str] = &[
    "PageSize",
    "TileSize",
    "PrimaryCamera",
    "MaxMipMapLevel",
    "Scale",
    "MaxPixelError",
    "UseTriStrips",
    "VertexProgramMorph",
    "DetailTile",
    "LodMorphStart",
    "VertexNormals",
    "VertexColours",
    "MorphLODFactorParamName",
    "MorphLODFactorParamIndex",
    "CustomMaterialName",
    "WorldTexture",
    "DetailTexture",
];

/// Terrain configuration. Rendering-related entries are stored for the
/// host renderer and have no effect on zone behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainOptions {
    /// Vertices per page side
    pub page_size: u32,
    /// Vertices per tile side
    pub tile_size: u32,
    pub max_geo_mipmap_level: u32,
    /// World units per grid step on X/Z, full height on Y
    pub scale: Vec3,
    pub max_pixel_error: u32,
    pub use_tri_strips: bool,
    pub lod_morph: bool,
    pub lod_morph_start: f32,
    pub detail_tile: u32,
    pub vertex_normals: bool,
    pub vertex_colours: bool,
    pub morph_lod_factor_param_name: String,
    pub morph_lod_factor_param_index: u32,
    pub custom_material_name: String,
    pub world_texture: String,
    pub detail_texture: String,
    /// Name of the camera driving level of detail
    pub primary_camera: Option<String>,
}

impl Default for TerrainOptions {
    fn default() -> Self {
        Self {
            page_size: 0,
            tile_size: 0,
            max_geo_mipmap_level: 0,
            scale: Vec3::ONE,
            max_pixel_error: 4,
            use_tri_strips: false,
            lod_morph: false,
            lod_morph_start: 0.5,
            detail_tile: 1,
            vertex_normals: false,
            vertex_colours: false,
            morph_lod_factor_param_name: String::new(),
            morph_lod_factor_param_index: 3,
            custom_material_name: String::new(),
            world_texture: String::new(),
            detail_texture: String::new(),
            primary_camera: None,
        }
    }
}

impl TerrainOptions {
    /// Tiles along one page side (zero until sizes are configured).
    pub fn tiles_per_page(&self) -> u32 {
        if self.page_size < 2 || self.tile_size < 2 {
            return 0;
        }
        (self.page_size - 1) / (self.tile_size - 1)
    }

    pub fn use_custom_material(&self) -> bool {
        !self.custom_material_name.is_empty()
    }
}

pub struct TerrainZone {
    octree: OctreeZone,
    options: TerrainOptions,
    page_sources: FxHashMap<String, Box<dyn TerrainPageSource>>,
    active_page_source: Option<String>,
    /// Set once geometry is loaded; the page slot then expects a page
    pages_allocated: bool,
    page: Option<TerrainPage>,
}

impl TerrainZone {
    /// Terrain zone with the heightfield page source pre-registered.
    pub fn new(name: impl Into<String>) -> Self {
        let mut page_sources: FxHashMap<String, Box<dyn TerrainPageSource>> = FxHashMap::default();
        page_sources.insert(HEIGHTFIELD_PAGE_SOURCE.to_string(), Box::new(HeightfieldPageSource::new()));
        Self {
            octree: OctreeZone::with_type(name, TERRAIN_ZONE_TYPE),
            options: TerrainOptions::default(),
            page_sources,
            active_page_source: None,
            pages_allocated: false,
            page: None,
        }
    }

    pub fn options(&self) -> &TerrainOptions {
        &self.options
    }

    pub fn octree_zone(&self) -> &OctreeZone {
        &self.octree
    }

    pub fn page(&self) -> Option<&TerrainPage> {
        self.page.as_ref()
    }

    pub fn active_page_source(&self) -> Option<&str> {
        self.active_page_source.as_deref()
    }

    pub fn page_source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.page_sources.keys().cloned().collect();
        names.sort();
        names
    }

    // ===== PAGE SOURCES =====

    pub fn register_page_source(&mut self, type_name: &str, source: Box<dyn TerrainPageSource>) -> Result<()> {
        if self.page_sources.contains_key(type_name) {
            crate::engine_bail!("pcz::TerrainZone", DuplicateItem:
                "The page source {} is already registered", type_name);
        }
        self.page_sources.insert(type_name.to_string(), source);
        crate::engine_info!("pcz::TerrainZone", "Registered a new page source for type {}", type_name);
        Ok(())
    }

    /// Activate a registered page source, shutting down the previous one.
    pub fn select_page_source(&mut self, type_name: &str, options: &[(String, String)]) -> Result<()> {
        if !self.page_sources.contains_key(type_name) {
            crate::engine_bail!("pcz::TerrainZone", ItemNotFound:
                "Cannot locate a terrain page source for type {}", type_name);
        }

        if let Some(previous) = self.active_page_source.take() {
            if let Some(source) = self.page_sources.get_mut(&previous) {
                source.shutdown();
            }
        }

        let (tile_size, page_size) = (self.options.tile_size, self.options.page_size);
        if let Some(source) = self.page_sources.get_mut(type_name) {
            source.initialise(tile_size, page_size, options)?;
        }
        self.active_page_source = Some(type_name.to_string());
        crate::engine_info!("pcz::TerrainZone", "Zone '{}' activated page source {}", self.name(), type_name);
        Ok(())
    }

    fn request_page(&mut self) {
        let Some(source) = self.active_page_source.as_ref().and_then(|name| self.page_sources.get_mut(name)) else {
            return;
        };
        self.page = source.request_page(0, 0);
        if self.page.is_some() {
            crate::engine_debug!("pcz::TerrainZone", "Zone '{}' attached page (0, 0)", self.octree.name());
        }
    }

    // ===== GEOMETRY =====

    /// Drop the loaded page and mark the zone as having no terrain.
    pub fn clear_zone(&mut self) {
        if self.page.take().is_some() {
            if let Some(source) = self.active_page_source.as_ref().and_then(|name| self.page_sources.get_mut(name)) {
                source.expire_page(0, 0);
            }
        }
        self.pages_allocated = false;
    }

    /// Terrain height at a world X/Z position, bilinearly interpolated
    /// between the four surrounding samples. `None` off the page or before
    /// a page is loaded.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let page = self.page.as_ref()?;
        let scale = self.options.scale;
        if page.size < 2 || scale.x <= 0.0 || scale.z <= 0.0 {
            return None;
        }

        let last = (page.size - 1) as f32;
        let (gx, gz) = (x / scale.x, z / scale.z);
        if !(0.0..=last).contains(&gx) || !(0.0..=last).contains(&gz) {
            return None;
        }

        let column = (gx.floor() as u32).min(page.size - 2);
        let row = (gz.floor() as u32).min(page.size - 2);
        let (fx, fz) = (gx - column as f32, gz - row as f32);

        let near = lerp(page.sample(column, row)?, page.sample(column + 1, row)?, fx);
        let far = lerp(page.sample(column, row + 1)?, page.sample(column + 1, row + 1)?, fx);
        Some(lerp(near, far, fz) * scale.y)
    }

    fn load_config(&mut self, settings: &[(String, String)]) -> Result<()> {
        if let Some(v) = parse_setting::<u32>(settings, "DetailTile")? {
            self.options.detail_tile = v;
        }
        if let Some(v) = parse_setting::<u32>(settings, "MaxMipMapLevel")? {
            self.options.max_geo_mipmap_level = v;
        }

        let Some(page_size) = parse_setting::<u32>(settings, "PageSize")? else {
            crate::engine_bail!("pcz::TerrainZone", ItemNotFound: "Missing option 'PageSize'");
        };
        if page_size < 2 {
            crate::engine_bail!("pcz::TerrainZone", InvalidConfig:
                "Option 'PageSize' must be at least 2, got {}", page_size);
        }
        self.options.page_size = page_size;

        let Some(tile_size) = parse_setting::<u32>(settings, "TileSize")? else {
            crate::engine_bail!("pcz::TerrainZone", ItemNotFound: "Missing option 'TileSize'");
        };
        self.options.tile_size = tile_size;

        let mut scale = Vec3::ONE;
        if let Some(v) = parse_setting::<f32>(settings, "PageWorldX")? {
            scale.x = v;
        }
        if let Some(v) = parse_setting::<f32>(settings, "MaxHeight")? {
            scale.y = v;
        }
        if let Some(v) = parse_setting::<f32>(settings, "PageWorldZ")? {
            scale.z = v;
        }
        let steps = (page_size - 1) as f32;
        scale.x /= steps;
        scale.z /= steps;
        self.options.scale = scale;

        if let Some(v) = parse_setting::<u32>(settings, "MaxPixelError")? {
            self.options.max_pixel_error = v;
        }
        self.options.detail_texture = setting(settings, "DetailTexture").unwrap_or_default().to_string();
        self.options.world_texture = setting(settings, "WorldTexture").unwrap_or_default().to_string();
        self.options.vertex_colours |= setting(settings, "VertexColours") == Some("yes");
        self.options.vertex_normals |= setting(settings, "VertexNormals") == Some("yes");
        self.options.use_tri_strips |= setting(settings, "UseTriStrips") == Some("yes");
        self.options.lod_morph |= setting(settings, "VertexProgramMorph") == Some("yes");
        if let Some(v) = parse_setting::<f32>(settings, "LODMorphStart")? {
            self.options.lod_morph_start = v;
        }
        if let Some(v) = setting(settings, "CustomMaterialName") {
            self.options.custom_material_name = v.to_string();
        }
        if let Some(v) = setting(settings, "MorphLODFactorParamName") {
            self.options.morph_lod_factor_param_name = v.to_string();
        }
        if let Some(v) = parse_setting::<u32>(settings, "MorphLODFactorParamIndex")? {
            self.options.morph_lod_factor_param_index = v;
        }

        let Some(source_name) = setting(settings, "PageSource") else {
            crate::engine_bail!("pcz::TerrainZone", ItemNotFound: "Missing option 'PageSource'");
        };
        let prefix = source_name.to_ascii_lowercase();
        let source_options: Vec<(String, String)> = settings
            .iter()
            .filter(|(key, _)| key.to_ascii_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        self.select_page_source(source_name, &source_options)
    }

    fn option_mismatch(&self, key: &str, expected: &str, value: &OptionValue) -> crate::error::Error {
        crate::engine_err!("pcz::TerrainZone", InvalidConfig:
            "Option '{}' of zone '{}' expects {}, got {:?}", key, self.name(), expected, value)
    }

    fn unsigned_option(&self, key: &str, value: &OptionValue) -> Result<u32> {
        value
            .as_int()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.option_mismatch(key, "a non-negative integer", value))
    }

    fn bool_option(&self, key: &str, value: &OptionValue) -> Result<bool> {
        value.as_bool().ok_or_else(|| self.option_mismatch(key, "a boolean", value))
    }

    fn text_option(&self, key: &str, value: &OptionValue) -> Result<String> {
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| self.option_mismatch(key, "text", value))
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Parse `key=value`, `key:value` or `key<TAB>value` lines. Blank lines,
/// `#` comments and `[section]` headers are skipped.
pub fn parse_config(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('['))
        .filter_map(|line| {
            let split = line.find(['=', ':', '\t'])?;
            let key = line[..split].trim();
            let value = line[split + 1..].trim_start_matches(['=', ':', '\t']).trim();
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// First non-empty value for a key.
fn setting<'a>(settings: &'a [(String, String)], key: &str) -> Option<&'a str> {
    settings
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn parse_setting<T: FromStr>(settings: &[(String, String)], key: &str) -> Result<Option<T>> {
    match setting(settings, key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(crate::engine_err!("pcz::TerrainZone", InvalidConfig:
                "Terrain setting '{}' has an unparsable value '{}'", key, raw)),
        },
    }
}

impl Zone for TerrainZone {
    fn core(&self) -> &ZoneCore {
        self.octree.core()
    }

    fn core_mut(&mut self) -> &mut ZoneCore {
        self.octree.core_mut()
    }

    fn add_home_node(&mut self, key: NodeKey, node: &SceneNode) {
        self.octree.add_home_node(key, node);
    }

    fn remove_home_node(&mut self, key: NodeKey) {
        self.octree.remove_home_node(key);
    }

    fn add_visitor_node(&mut self, key: NodeKey, node: &SceneNode) {
        self.octree.add_visitor_node(key, node);
    }

    fn remove_visitor_node(&mut self, key: NodeKey) {
        self.octree.remove_visitor_node(key);
    }

    fn requires_zone_specific_node_data(&self) -> bool {
        self.octree.requires_zone_specific_node_data()
    }

    fn update_node_zone_data(&mut self, key: NodeKey, node: &SceneNode) {
        self.octree.update_node_zone_data(key, node);
    }

    fn clear(&mut self) {
        self.octree.clear();
    }

    fn set_enclosure_node(&mut self, key: NodeKey, world_aabb: AABB) {
        // The terrain keeps its own octree extent
        self.octree.core_mut().set_enclosure(Some(key), world_aabb);
    }

    fn enclosure_node_may_visit(&self) -> bool {
        false
    }

    fn bounds(&self) -> AABB {
        self.octree.bounds()
    }

    fn set_zone_geometry(&mut self, config: &str) -> Result<()> {
        self.clear_zone();
        let settings = parse_config(config);
        self.load_config(&settings)?;

        // Single page, loaded right away
        self.pages_allocated = true;
        self.request_page();

        let scale = self.options.scale;
        let page = self.options.page_size as f32;
        self.octree.resize(AABB::new(Vec3::ZERO, Vec3::new(scale.x * page, scale.y, scale.z * page)));
        crate::engine_debug!("pcz::TerrainZone", "Zone '{}' loaded terrain: page size {}, tile size {}, scale {:?}",
            self.name(), self.options.page_size, self.options.tile_size, scale);
        Ok(())
    }

    fn collect_visible_nodes(
        &self,
        camera: &PczCamera,
        nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut Vec<NodeKey>,
    ) {
        self.octree.collect_visible_nodes(camera, nodes, results);
    }

    fn find_local_nodes(
        &self,
        query: &SceneQuery,
        include_visitors: bool,
        exclude: Option<NodeKey>,
        nodes: &SlotMap<NodeKey, SceneNode>,
        results: &mut FxHashSet<NodeKey>,
    ) {
        self.octree.find_local_nodes(query, include_visitors, exclude, nodes, results);
    }

    fn set_option(&mut self, key: &str, value: &OptionValue) -> Result<bool> {
        match key {
            "PageSize" => self.options.page_size = self.unsigned_option(key, value)?,
            "TileSize" => self.options.tile_size = self.unsigned_option(key, value)?,
            "PrimaryCamera" => self.options.primary_camera = Some(self.text_option(key, value)?),
            "MaxMipMapLevel" => self.options.max_geo_mipmap_level = self.unsigned_option(key, value)?,
            "Scale" => {
                self.options.scale = value
                    .as_vector3()
                    .ok_or_else(|| self.option_mismatch(key, "a vector", value))?;
            }
            "MaxPixelError" => self.options.max_pixel_error = self.unsigned_option(key, value)?,
            "UseTriStrips" => self.options.use_tri_strips = self.bool_option(key, value)?,
            "VertexProgramMorph" => self.options.lod_morph = self.bool_option(key, value)?,
            "DetailTile" => self.options.detail_tile = self.unsigned_option(key, value)?,
            "LodMorphStart" => {
                self.options.lod_morph_start = value
                    .as_real()
                    .ok_or_else(|| self.option_mismatch(key, "a number", value))?;
            }
            "VertexNormals" => self.options.vertex_normals = self.bool_option(key, value)?,
            "VertexColours" => self.options.vertex_colours = self.bool_option(key, value)?,
            "MorphLODFactorParamName" => self.options.morph_lod_factor_param_name = self.text_option(key, value)?,
            "MorphLODFactorParamIndex" => self.options.morph_lod_factor_param_index = self.unsigned_option(key, value)?,
            "CustomMaterialName" => self.options.custom_material_name = self.text_option(key, value)?,
            "WorldTexture" => self.options.world_texture = self.text_option(key, value)?,
            "DetailTexture" => self.options.detail_texture = self.text_option(key, value)?,
            _ => return self.octree.set_option(key, value),
        }
        Ok(true)
    }

    fn get_option(&self, key: &str) -> Option<OptionValue> {
        let o = &self.options;
        let value = match key {
            "PageSize" => OptionValue::Int(o.page_size.into()),
            "TileSize" => OptionValue::Int(o.tile_size.into()),
            "PrimaryCamera" => OptionValue::Text(o.primary_camera.clone()?),
            "MaxMipMapLevel" => OptionValue::Int(o.max_geo_mipmap_level.into()),
            "Scale" => OptionValue::Vector3(o.scale),
            "MaxPixelError" => OptionValue::Int(o.max_pixel_error.into()),
            "UseTriStrips" => OptionValue::Bool(o.use_tri_strips),
            "VertexProgramMorph" => OptionValue::Bool(o.lod_morph),
            "DetailTile" => OptionValue::Int(o.detail_tile.into()),
            "LodMorphStart" => OptionValue::Real(o.lod_morph_start),
            "VertexNormals" => OptionValue::Bool(o.vertex_normals),
            "VertexColours" => OptionValue::Bool(o.vertex_colours),
            "MorphLODFactorParamName" => OptionValue::Text(o.morph_lod_factor_param_name.clone()),
            "MorphLODFactorParamIndex" => OptionValue::Int(o.morph_lod_factor_param_index.into()),
            "CustomMaterialName" => OptionValue::Text(o.custom_material_name.clone()),
            "WorldTexture" => OptionValue::Text(o.world_texture.clone()),
            "DetailTexture" => OptionValue::Text(o.detail_texture.clone()),
            _ => return self.octree.get_option(key),
        };
        Some(value)
    }

    fn option_keys(&self) -> Vec<&'static str> {
        let mut keys = TERRAIN_OPTION_KEYS.to_vec();
        keys.extend(self.octree.option_keys());
        keys
    }

    fn notify_camera_created(&mut self, _key: CameraKey, camera: &PczCamera) {
        if self.options.primary_camera.is_none() {
            self.options.primary_camera = Some(camera.name().to_string());
        }
    }

    fn notify_begin_render_scene(&mut self) {
        if self.pages_allocated && self.page.is_none() {
            self.request_page();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for TerrainZone {
    fn drop(&mut self) {
        if let Some(source) = self.active_page_source.as_ref().and_then(|name| self.page_sources.get_mut(name)) {
            source.shutdown();
        }
    }
}

#[cfg(test)]
#[path = "terrain_zone_tests.rs"]
mod tests;
