//! Tile maps exported from Tiled as JSON, plus a directory of tile images.
//!
//! Tile gid `n` refers to the `n-1`th image of the tile directory sorted by
//! file name; gid 0 is an empty cell.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use image::RgbaImage;
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::render::ScreenRect;

/// Tiled stores flip/rotation flags in the top bits of each gid.
const GID_FLAGS: u32 = 0xE000_0000;

#[derive(Debug, Clone, Deserialize)]
pub struct TileMapFile {
    pub width: u32,
    pub height: u32,
    pub tilewidth: u32,
    pub tileheight: u32,
    #[serde(default)]
    pub layers: Vec<TileLayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TileLayer {
    #[serde(default)]
    pub name: String,
    /// Absent on object and image layers.
    #[serde(default)]
    pub data: Option<Vec<u32>>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl TileMapFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_str(&text)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn tile_size(&self) -> Vec2 {
        Vec2::new(self.tilewidth as f32, self.tileheight as f32)
    }
}

/// Loads every image in `dir`, ordered by file name. Other files are skipped.
pub fn load_tile_images(dir: impl AsRef<Path>) -> Result<Vec<RgbaImage>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| EngineError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && image::ImageFormat::from_path(path).is_ok())
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.into_rgba8())
                .map_err(|e| EngineError::image(path, e))
        })
        .collect()
}

/// Static collision box for one tile, in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCollider {
    pub center: Vec2,
    pub size: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedTile {
    /// World-space top-left corner.
    pub position: Vec2,
    /// Index into [`SceneMap::tiles`].
    pub tile: usize,
    pub collider: TileCollider,
    /// Where the tile landed on screen last frame.
    pub screen_rect: ScreenRect,
}

pub struct SceneMap {
    file: TileMapFile,
    tiles: Vec<RgbaImage>,
    placed: Vec<PlacedTile>,
    width: u32,
    height: u32,
}

impl SceneMap {
    pub fn load(map_json: impl AsRef<Path>, tiles_dir: impl AsRef<Path>) -> Result<Self> {
        let file = TileMapFile::from_path(map_json.as_ref())?;
        let tiles = load_tile_images(tiles_dir.as_ref())?;
        let map = Self::from_parts(file, tiles)?;
        log::info!(
            "loaded {} ({}x{} px, {} tiles placed from {} images)",
            map_json.as_ref().display(),
            map.width(),
            map.height(),
            map.placed.len(),
            map.tiles.len()
        );
        Ok(map)
    }

    pub fn from_parts(file: TileMapFile, tiles: Vec<RgbaImage>) -> Result<Self> {
        let width = pixel_extent(file.width, file.tilewidth)
            .ok_or_else(|| too_large("width", file.width, file.tilewidth))?;
        let height = pixel_extent(file.height, file.tileheight)
            .ok_or_else(|| too_large("height", file.height, file.tileheight))?;
        let placed = place_tiles(&file, tiles.len())?;
        Ok(Self {
            file,
            tiles,
            placed,
            width,
            height,
        })
    }

    /// Map width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Map height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32)
    }

    pub fn tile_size(&self) -> Vec2 {
        self.file.tile_size()
    }

    pub fn file(&self) -> &TileMapFile {
        &self.file
    }

    pub fn tiles(&self) -> &[RgbaImage] {
        &self.tiles
    }

    pub fn placed(&self) -> &[PlacedTile] {
        &self.placed
    }

    /// Placed tiles, mutable, next to the images they index.
    pub(crate) fn placed_with_tiles(&mut self) -> (&mut [PlacedTile], &[RgbaImage]) {
        (&mut self.placed, &self.tiles)
    }

    pub fn colliders(&self) -> impl Iterator<Item = TileCollider> + '_ {
        self.placed.iter().map(|t| t.collider)
    }
}

/// `count * tile` pixels, if that still fits a screen coordinate.
fn pixel_extent(count: u32, tile: u32) -> Option<u32> {
    count
        .checked_mul(tile)
        .filter(|&px| i32::try_from(px).is_ok())
}

fn too_large(axis: &str, count: u32, tile: u32) -> EngineError {
    EngineError::InvalidMap(format!("{axis} of {count} tiles of {tile}px overflows"))
}

fn place_tiles(file: &TileMapFile, available: usize) -> Result<Vec<PlacedTile>> {
    let (tw, th) = (file.tilewidth, file.tileheight);
    if pixel_extent(1, tw).is_none() || pixel_extent(1, th).is_none() {
        return Err(EngineError::InvalidMap(format!("tile size {tw}x{th} is too large")));
    }
    let size = file.tile_size();
    let mut placed = Vec::new();

    for layer in &file.layers {
        let Some(data) = &layer.data else {
            continue;
        };
        if !layer.visible {
            log::debug!("skipping hidden layer `{}`", layer.name);
            continue;
        }
        if layer.width == 0 {
            return Err(EngineError::InvalidLayer {
                layer: layer.name.clone(),
                reason: "tile layer has zero width".to_owned(),
            });
        }
        let expected = layer.width as usize * layer.height as usize;
        if data.len() != expected {
            return Err(EngineError::InvalidLayer {
                layer: layer.name.clone(),
                reason: format!(
                    "{} cells for a {}x{} layer",
                    data.len(),
                    layer.width,
                    layer.height
                ),
            });
        }

        for (i, &raw) in data.iter().enumerate() {
            let gid = raw & !GID_FLAGS;
            if gid == 0 {
                continue;
            }
            let tile = gid as usize - 1;
            if tile >= available {
                return Err(EngineError::MissingTile {
                    layer: layer.name.clone(),
                    gid,
                    available,
                });
            }
            let col = (i % layer.width as usize) as u32;
            let row = (i / layer.width as usize) as u32;
            let (Some(x), Some(y)) = (pixel_extent(col, tw), pixel_extent(row, th)) else {
                return Err(EngineError::InvalidLayer {
                    layer: layer.name.clone(),
                    reason: format!("cell ({col}, {row}) lies outside pixel space"),
                });
            };
            let position = Vec2::new(x as f32, y as f32);
            placed.push(PlacedTile {
                position,
                tile,
                collider: TileCollider {
                    center: position + size / 2.0,
                    size,
                },
                screen_rect: ScreenRect::new(x as i32, y as i32, tw, th),
            });
        }
    }
    Ok(placed)
}
