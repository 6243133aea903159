use crate::{
    pixel::{IndexResolver, Pixels},
    reader::AseReader,
    tile::TileId,
    user_data::UserData,
    AsepriteParseError, PixelFormat, Result,
};
use bitflags::bitflags;
use image::{Rgba, RgbaImage};

/// An id for a [Tileset].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TilesetId(pub(crate) u32);

impl TilesetId {
    /// Create a new TilesetId over a raw u32 value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }
    /// The underlying u32 value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

bitflags! {
    struct TilesetFlags: u32 {
        // Include link to external file.
        const LINKS_EXTERNAL_FILE = 0x0001;
        // Include tiles inside this file.
        const FILE_INCLUDES_TILES = 0x0002;
        // From the spec:
        // Tilemaps using this tileset use tile ID=0 as empty tile
        // (this is the new format). In rare cases this bit is off,
        // the empty tile will be equal to 0xffffffff (used in
        // internal versions of Aseprite).
        const EMPTY_TILE_IS_ID_ZERO = 0x0004;
    }
}

/// The size of a tile in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    width: u16,
    height: u16,
}

impl TileSize {
    /// Tile width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }
    /// Tile height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }
    pub(crate) fn pixels_per_tile(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Various attributes of a tileset.
///
/// The tiles are stored as one vertical strip: tile `n` occupies rows
/// `n * tile_height .. (n + 1) * tile_height`.
#[derive(Debug)]
pub struct Tileset {
    pub(crate) id: TilesetId,
    pub(crate) empty_tile_is_id_zero: bool,
    pub(crate) tile_count: u32,
    pub(crate) tile_size: TileSize,
    pub(crate) name: String,
    pub(crate) image: RgbaImage,
    pub(crate) user_data: Option<UserData>,
}

impl Tileset {
    /// Tileset id.
    pub fn id(&self) -> TilesetId {
        self.id
    }
    /// From the Aseprite file spec:
    /// When true, tilemaps using this tileset use tile ID=0 as empty tile.
    /// In rare cases this is false, the empty tile will be equal to 0xffffffff (used in internal versions of Aseprite).
    pub fn empty_tile_is_id_zero(&self) -> bool {
        self.empty_tile_is_id_zero
    }
    /// Number of tiles.
    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }
    /// Tile width and height.
    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }
    /// Tileset name. May not be unique among tilesets.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// All tiles as one vertical strip.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
    /// The tileset's user data, if any is present.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Id that marks a cell without a tile: 0, or 0xffffffff when
    /// [Tileset::empty_tile_is_id_zero] is false.
    pub fn empty_tile_id(&self) -> TileId {
        if self.empty_tile_is_id_zero {
            TileId(0)
        } else {
            TileId(0xffff_ffff)
        }
    }

    pub(crate) fn is_empty_tile(&self, tile_id: TileId) -> bool {
        tile_id == self.empty_tile_id()
    }

    /// Pixel at (`x`, `y`) inside the given tile. `None` if the tile or the
    /// position does not exist.
    pub(crate) fn tile_pixel(&self, tile_id: TileId, x: u32, y: u32) -> Option<Rgba<u8>> {
        let tile_size = self.tile_size;
        if tile_id.0 >= self.tile_count
            || x >= tile_size.width as u32
            || y >= tile_size.height as u32
        {
            return None;
        }
        let strip_y = tile_id.0 * self.tile_size.height as u32 + y;
        Some(*self.image.get_pixel(x, strip_y))
    }
}

// Tileset as read from its chunk. Pixels are resolved to RGBA once the
// palette is known.
pub(crate) struct TilesetChunk {
    id: TilesetId,
    empty_tile_is_id_zero: bool,
    tile_count: u32,
    tile_size: TileSize,
    name: String,
    pixels: Option<Pixels>,
    pub(crate) user_data: Option<UserData>,
}

impl TilesetChunk {
    pub(crate) fn id(&self) -> TilesetId {
        self.id
    }

    pub(crate) fn parse_chunk(data: &[u8], base: u64, pixel_format: PixelFormat) -> Result<Self> {
        let mut reader = AseReader::at(data, base);
        let id = reader.dword().map(TilesetId)?;
        let flags = reader.dword().map(TilesetFlags::from_bits_truncate)?;
        let empty_tile_is_id_zero = flags.contains(TilesetFlags::EMPTY_TILE_IS_ID_ZERO);
        let tile_count = reader.dword()?;
        let tile_width = reader.word()?;
        let tile_height = reader.word()?;
        let tile_size = TileSize {
            width: tile_width,
            height: tile_height,
        };
        // Base index is only shown in Aseprite's UI.
        let _base_index = reader.short()?;
        reader.skip_reserved(14)?;
        let name = reader.string()?;
        if flags.contains(TilesetFlags::LINKS_EXTERNAL_FILE) {
            let _external_file_id = reader.dword()?;
            let _external_tileset_id = reader.dword()?;
        }
        let pixels = if flags.contains(TilesetFlags::FILE_INCLUDES_TILES) {
            let compressed_length = reader.dword()?;
            let expected_pixel_count = tile_count as usize * tile_size.pixels_per_tile();
            Some(Pixels::from_compressed_block(
                &mut reader,
                compressed_length as usize,
                pixel_format,
                expected_pixel_count,
            )?)
        } else {
            None
        };
        Ok(TilesetChunk {
            id,
            empty_tile_is_id_zero,
            tile_count,
            tile_size,
            name,
            pixels,
            user_data: None,
        })
    }

    pub(crate) fn resolve(self, resolver: Option<&IndexResolver>) -> Result<Tileset> {
        let id = self.id.0;
        let tile_count = self.tile_count;
        // External file tilesets are not supported.
        let pixels = self.pixels.ok_or_else(|| {
            AsepriteParseError::UnsupportedFeature(format!(
                "Tileset {} does not contain pixels. External file tilesets not supported",
                id
            ))
        })?;
        let width = self.tile_size.width as u32;
        let height = (self.tile_size.height as u32)
            .checked_mul(tile_count)
            .ok_or_else(|| {
                AsepriteParseError::InvalidInput(format!(
                    "Tileset {} is too large: {} tiles",
                    id, tile_count
                ))
            })?;
        let image = pixels.into_rgba_image(width, height, resolver)?;
        Ok(Tileset {
            id: self.id,
            empty_tile_is_id_zero: self.empty_tile_is_id_zero,
            tile_count: self.tile_count,
            tile_size: self.tile_size,
            name: self.name,
            image,
            user_data: self.user_data,
        })
    }
}

/// All [Tileset]s of a file in the order they were defined.
#[derive(Debug, Default)]
pub struct Tilesets(Vec<Tileset>);

impl Tilesets {
    pub(crate) fn new(tilesets: Vec<Tileset>) -> Result<Self> {
        for (idx, tileset) in tilesets.iter().enumerate() {
            if tilesets[..idx].iter().any(|t| t.id == tileset.id) {
                return Err(AsepriteParseError::InvalidInput(format!(
                    "Duplicate tileset id: {}",
                    tileset.id.0
                )));
            }
        }
        Ok(Tilesets(tilesets))
    }

    /// Get a reference to a [Tileset] from a [TilesetId], if the entry exists.
    pub fn get(&self, id: TilesetId) -> Option<&Tileset> {
        self.0.iter().find(|t| t.id == id)
    }

    /// Iterate in definition order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tileset> {
        self.0.iter()
    }
}
