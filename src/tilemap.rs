use crate::{
    reader::AseReader,
    tile::{self, Tile},
    AsepriteParseError, Result, Tileset,
};

/// A reference to a tilemap.
///
/// A tilemap describes an image as a collection of tiles from a [Tileset].
///
/// Every non-empty cel in a tilemap layer corresponds to one tilemap. The
/// tilemap covers the whole canvas; tiles outside the cel's data are empty.
#[derive(Debug)]
pub struct Tilemap<'a> {
    pub(crate) data: &'a TilemapData,
    pub(crate) tileset: &'a Tileset,
    pub(crate) pixel_offset: (i32, i32),
    pub(crate) logical_size: (u32, u32),
}

impl<'a> Tilemap<'a> {
    /// Width in number of tiles
    pub fn width(&self) -> u32 {
        self.logical_size.0
    }

    /// Height in number of tiles
    pub fn height(&self) -> u32 {
        self.logical_size.1
    }

    /// Width and height of each tile in the tilemap.
    pub fn tile_size(&self) -> (u32, u32) {
        let sz = self.tileset.tile_size();
        (sz.width() as u32, sz.height() as u32)
    }

    /// Lookup tile at given location.
    ///
    /// Tile coordinates start at (0, 0) in the top left. Cells outside the
    /// cel's data hold the tileset's empty tile.
    ///
    /// Note: Aseprite as of 1.3-beta5 labels tile coordinates relative to the
    /// tile offsets. I.e., if your first column is empty, then the GUI shows
    /// `-1` for the x coordinate of the top-left tile.
    pub fn tile(&self, x: u32, y: u32) -> Tile {
        let (ofs_x, ofs_y) = self.tile_offsets();
        let x = x as i32 - ofs_x;
        let y = y as i32 - ofs_y;
        // The actual tilemap data may be smaller because it does not include
        // any data for empty tiles on the outer rows or columns.
        let empty = || Tile::empty(self.tileset.empty_tile_id());
        if x < 0 || y < 0 {
            return empty();
        }
        self.data
            .tile(x as u32, y as u32)
            .cloned()
            .unwrap_or_else(empty)
    }

    /// Position of the cel's first tile in the canvas grid.
    pub fn tile_offsets(&self) -> (i32, i32) {
        let (x, y) = self.pixel_offset;
        let (tile_width, tile_height) = self.tile_size();
        (
            x.div_euclid(tile_width.max(1) as i32),
            y.div_euclid(tile_height.max(1) as i32),
        )
    }
}

/// Tile grid stored in a tilemap cel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilemapData {
    width: u16,
    height: u16,
    tiles: Vec<Tile>,
}

impl TilemapData {
    /// Width in number of tiles
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in number of tiles
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Tile at the given position in the cel's grid.
    pub fn tile(&self, x: u32, y: u32) -> Option<&Tile> {
        if x >= self.width as u32 || y >= self.height as u32 {
            return None;
        }
        let index = (y as usize * self.width as usize) + x as usize;
        self.tiles.get(index)
    }

    pub(crate) fn parse_chunk(mut reader: AseReader) -> Result<Self> {
        let width = reader.word()?;
        let height = reader.word()?;
        let bits_per_tile = reader.word()?;
        if bits_per_tile != 32 {
            return Err(AsepriteParseError::UnsupportedFeature(format!(
                "Only 32 bits per tile supported, got input with {} bits per tile",
                bits_per_tile
            )));
        }
        let bitmask_header = TileBitmaskHeader::parse(&mut reader)?;
        reader.skip_reserved(10)?;
        let expected_tile_count = width as usize * height as usize;
        let tiles = tile::unzip_tiles(reader, expected_tile_count, &bitmask_header)?;
        Ok(Self {
            width,
            height,
            tiles,
        })
    }
}

#[derive(Debug)]
pub(crate) struct TileBitmaskHeader {
    pub tile_id: u32,
    pub x_flip: u32,
    pub y_flip: u32,
    pub rotate_90cw: u32,
}

impl TileBitmaskHeader {
    pub(crate) fn parse(reader: &mut AseReader) -> Result<Self> {
        let tile_id = reader.dword()?;
        let x_flip = reader.dword()?;
        let y_flip = reader.dword()?;
        let rotate_90cw = reader.dword()?;
        Ok(Self {
            tile_id,
            x_flip,
            y_flip,
            rotate_90cw,
        })
    }
}
