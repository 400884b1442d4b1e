/// TerrainPageSource — supplier of heightfield pages for a terrain zone.
///
/// A terrain zone owns a registry of page sources keyed by type name and
/// activates one of them from its geometry configuration. Only the page at
/// (0, 0) is ever requested.

use crate::error::Result;

/// One square page of heights, row-major along +Z, normalised to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainPage {
    pub x: u16,
    pub z: u16,
    pub size: u32,
    pub heights: Vec<f32>,
}

impl TerrainPage {
    /// Height sample at a grid vertex, `None` outside the page.
    pub fn sample(&self, column: u32, row: u32) -> Option<f32> {
        if column >= self.size || row >= self.size {
            return None;
        }
        self.heights.get((row * self.size + column) as usize).copied()
    }
}

/// Source of terrain pages.
pub trait TerrainPageSource: Send + Sync {
    /// Prepare for pages of `page_size` vertices per side. `options` holds
    /// the configuration entries prefixed by the source's type name.
    fn initialise(&mut self, tile_size: u32, page_size: u32, options: &[(String, String)]) -> Result<()>;

    /// Produce the page at the given page coordinates, if available.
    fn request_page(&mut self, x: u16, z: u16) -> Option<TerrainPage>;

    /// Release a page the zone no longer needs.
    fn expire_page(&mut self, _x: u16, _z: u16) {}

    fn shutdown(&mut self);
}

/// Type name under which every terrain zone pre-registers [`HeightfieldPageSource`].
pub const HEIGHTFIELD_PAGE_SOURCE: &str = "Heightfield";

/// Page source serving an in-memory height grid.
///
/// Options (prefixed by `Heightfield.`):
/// - `Heightfield.Flat`: height in `[0, 1]` used when no grid was supplied
/// - `Heightfield.Flip`: `yes` mirrors the grid along Z
pub struct HeightfieldPageSource {
    heights: Option<Vec<f32>>,
    flat_height: f32,
    flip: bool,
    page_size: u32,
    initialised: bool,
}

impl HeightfieldPageSource {
    /// Source producing flat pages until a grid is supplied.
    pub fn new() -> Self {
        Self {
            heights: None,
            flat_height: 0.0,
            flip: false,
            page_size: 0,
            initialised: false,
        }
    }

    /// Source serving a square grid of normalised heights.
    pub fn with_heights(heights: Vec<f32>) -> Self {
        Self { heights: Some(heights), ..Self::new() }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn option_suffix<'a>(key: &'a str) -> &'a str {
        let prefix = HEIGHTFIELD_PAGE_SOURCE.len();
        key.get(prefix..).map(|rest| rest.trim_start_matches('.')).unwrap_or("")
    }
}

impl Default for HeightfieldPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainPageSource for HeightfieldPageSource {
    fn initialise(&mut self, _tile_size: u32, page_size: u32, options: &[(String, String)]) -> Result<()> {
        for (key, value) in options {
            match Self::option_suffix(key).to_ascii_lowercase().as_str() {
                "flat" => {
                    let Ok(height) = value.trim().parse::<f32>() else {
                        crate::engine_bail!("pcz::TerrainZone", InvalidConfig:
                            "Heightfield option '{}' expects a number, got '{}'", key, value);
                    };
                    self.flat_height = height.clamp(0.0, 1.0);
                }
                "flip" => self.flip = value.trim().eq_ignore_ascii_case("yes"),
                _ => {
                    crate::engine_warn!("pcz::TerrainZone", "Ignoring unknown heightfield option '{}'", key);
                }
            }
        }

        if let Some(heights) = &self.heights {
            let expected = (page_size as usize) * (page_size as usize);
            if heights.len() != expected {
                crate::engine_bail!("pcz::TerrainZone", InvalidConfig:
                    "Heightfield holds {} samples, a page of size {} needs {}",
                    heights.len(), page_size, expected);
            }
        }

        self.page_size = page_size;
        self.initialised = true;
        Ok(())
    }

    fn request_page(&mut self, x: u16, z: u16) -> Option<TerrainPage> {
        if !self.initialised || (x, z) != (0, 0) {
            return None;
        }
        let size = self.page_size;
        let mut heights = match &self.heights {
            Some(grid) => grid.clone(),
            None => vec![self.flat_height; (size as usize) * (size as usize)],
        };
        if self.flip {
            let row_len = size as usize;
            let rows: Vec<Vec<f32>> = heights.chunks(row_len).rev().map(<[f32]>::to_vec).collect();
            heights = rows.concat();
        }
        Some(TerrainPage { x, z, size, heights })
    }

    fn shutdown(&mut self) {
        self.initialised = false;
    }
}
