//! Self-contained content produced from an Aseprite file.
//!
//! Everything here owns its data and has no ties to the [AsepriteFile] it
//! came from, so it can be handed off or written with
//! [write_raw](crate::write_raw).
//!
//! [AsepriteFile]: crate::AsepriteFile
#![allow(missing_docs)]

use crate::AnimationDirection;
use image::RgbaImage;

/// RGBA8 pixels in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl From<RgbaImage> for RawTexture {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        RawTexture {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RawRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        RawRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// A named area of a sprite sheet texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTextureRegion {
    pub name: String,
    pub bounds: RawRect,
}

/// One step of an animation. `region` indexes the sheet's regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAnimationFrame {
    pub region: u32,
    /// Milliseconds.
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnimationTag {
    pub name: String,
    pub frames: Vec<RawAnimationFrame>,
    pub direction: AnimationDirection,
    /// 0 repeats forever.
    pub repeat: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSliceKey {
    /// First frame this key applies to.
    pub frame: u32,
    pub bounds: RawRect,
    /// Nine-patch center, relative to `bounds`.
    pub center: Option<RawRect>,
    pub pivot: Option<(i32, i32)>,
    pub color: Option<[u8; 4]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSlice {
    pub name: String,
    pub keys: Vec<RawSliceKey>,
}

/// A tileset with its tiles stacked vertically in one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTileset {
    pub name: String,
    pub id: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub texture: RawTexture,
}

impl RawTileset {
    /// Number of tiles in the strip.
    pub fn tile_count(&self) -> u32 {
        if self.tile_height == 0 {
            0
        } else {
            self.texture.height / self.tile_height
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawTilemapTile {
    pub tile: u32,
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotate_90cw: bool,
}

/// Tiles of one tilemap layer, row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTilemapLayer {
    pub name: String,
    pub tileset_id: u32,
    pub columns: u32,
    pub rows: u32,
    /// Position of the cel in tiles. Informational only: `tiles` is
    /// already aligned to the canvas, so the offset must not be applied
    /// again.
    pub offset: (i32, i32),
    pub tiles: Vec<RawTilemapTile>,
}

impl RawTilemapLayer {
    /// Tile at the given grid position.
    pub fn tile(&self, column: u32, row: u32) -> Option<&RawTilemapTile> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.tiles
            .get(row as usize * self.columns as usize + column as usize)
    }
}

/// All tilemap layers of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTilemap {
    pub name: String,
    pub tilesets: Vec<RawTileset>,
    pub layers: Vec<RawTilemapLayer>,
}

/// One flattened frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSprite {
    pub name: String,
    pub texture: RawTexture,
    pub slices: Vec<RawSlice>,
}

/// Every frame of a file packed into one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpriteSheet {
    pub name: String,
    pub texture: RawTexture,
    /// One region per frame, in frame order.
    pub regions: Vec<RawTextureRegion>,
    pub animations: Vec<RawAnimationTag>,
    pub slices: Vec<RawSlice>,
    pub tilesets: Vec<RawTileset>,
    /// One tilemap per frame.
    pub tilemaps: Vec<RawTilemap>,
}

/// Anything that can be written with [write_raw](crate::write_raw).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBundle {
    Sprite(RawSprite),
    Tileset(RawTileset),
    Tilemap(RawTilemap),
    SpriteSheet(RawSpriteSheet),
}

impl RawBundle {
    /// Name of the bundled content.
    pub fn name(&self) -> &str {
        match self {
            RawBundle::Sprite(s) => &s.name,
            RawBundle::Tileset(t) => &t.name,
            RawBundle::Tilemap(t) => &t.name,
            RawBundle::SpriteSheet(s) => &s.name,
        }
    }
}

impl From<RawSprite> for RawBundle {
    fn from(sprite: RawSprite) -> Self {
        RawBundle::Sprite(sprite)
    }
}

impl From<RawTileset> for RawBundle {
    fn from(tileset: RawTileset) -> Self {
        RawBundle::Tileset(tileset)
    }
}

impl From<RawTilemap> for RawBundle {
    fn from(tilemap: RawTilemap) -> Self {
        RawBundle::Tilemap(tilemap)
    }
}

impl From<RawSpriteSheet> for RawBundle {
    fn from(sheet: RawSpriteSheet) -> Self {
        RawBundle::SpriteSheet(sheet)
    }
}
