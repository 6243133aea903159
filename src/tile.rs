use crate::{reader::AseReader, tilemap::TileBitmaskHeader, Result};

/// Index of a tile inside its [Tileset](crate::Tileset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

/// A tile is a reference to a single tile in a tilemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Index into the tileset.
    pub id: TileId,
    /// Tile is mirrored horizontally.
    pub flip_x: bool,
    /// Tile is mirrored vertically.
    pub flip_y: bool,
    /// Tile is flipped along its diagonal (rotated by 90 degrees clockwise
    /// when combined with `flip_x`).
    pub rotate_90cw: bool,
}

impl Tile {
    pub(crate) fn empty(id: TileId) -> Self {
        Self {
            id,
            flip_x: false,
            flip_y: false,
            rotate_90cw: false,
        }
    }

    fn parse(bits: u32, header: &TileBitmaskHeader) -> Self {
        Self {
            id: TileId(bits & header.tile_id),
            flip_x: as_bool(bits & header.x_flip),
            flip_y: as_bool(bits & header.y_flip),
            rotate_90cw: as_bool(bits & header.rotate_90cw),
        }
    }
}

pub(crate) fn unzip_tiles(
    reader: AseReader,
    expected_tile_count: usize,
    header: &TileBitmaskHeader,
) -> Result<Vec<Tile>> {
    // Only 32-bit tiles supported for now
    let expected_output_size = 4 * expected_tile_count;
    let bytes = reader.unzip(expected_output_size)?;
    let mut tiles_reader = AseReader::new(&bytes);
    let mut tiles = Vec::with_capacity(expected_tile_count);
    for _ in 0..expected_tile_count {
        let bits = tiles_reader.dword()?;
        tiles.push(Tile::parse(bits, header));
    }
    Ok(tiles)
}

fn as_bool(bitwise_and: u32) -> bool {
    bitwise_and != 0
}
