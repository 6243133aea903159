//! Binary layout of raw bundles.
//!
//! All integers are little endian. A bundle starts with the magic bytes
//! `ARAW`, a `u16` format version and a `u8` kind tag, followed by the
//! content of that kind. Strings and byte blocks carry a `u32` length prefix.

use crate::{
    raw::{
        RawAnimationFrame, RawAnimationTag, RawBundle, RawRect, RawSlice, RawSliceKey, RawSprite,
        RawSpriteSheet, RawTexture, RawTextureRegion, RawTilemap, RawTilemapLayer, RawTilemapTile,
        RawTileset,
    },
    AnimationDirection, RawFormatError,
};
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::{
    convert::TryFrom,
    io::{Cursor, Write},
};

type Result<T> = std::result::Result<T, RawFormatError>;

/// Marker at the start of every bundle.
pub const RAW_MAGIC: [u8; 4] = *b"ARAW";
/// Format version written by this build.
pub const RAW_VERSION: u16 = 1;

const KIND_SPRITE: u8 = 0;
const KIND_TILESET: u8 = 1;
const KIND_TILEMAP: u8 = 2;
const KIND_SPRITE_SHEET: u8 = 3;

bitflags! {
    // Flags byte in front of every tilemap tile.
    struct TileFlags: u8 {
        const FLIP_X = 0b001;
        const FLIP_Y = 0b010;
        const ROTATE_90CW = 0b100;
    }
}

/// Write a bundle to `output`.
pub fn write_raw<W: Write>(output: &mut W, bundle: &RawBundle) -> Result<()> {
    output.write_all(&RAW_MAGIC)?;
    output.write_u16::<LittleEndian>(RAW_VERSION)?;
    match bundle {
        RawBundle::Sprite(sprite) => {
            output.write_u8(KIND_SPRITE)?;
            write_sprite(output, sprite)?;
        }
        RawBundle::Tileset(tileset) => {
            output.write_u8(KIND_TILESET)?;
            write_tileset(output, tileset)?;
        }
        RawBundle::Tilemap(tilemap) => {
            output.write_u8(KIND_TILEMAP)?;
            write_tilemap(output, tilemap)?;
        }
        RawBundle::SpriteSheet(sheet) => {
            output.write_u8(KIND_SPRITE_SHEET)?;
            write_sprite_sheet(output, sheet)?;
        }
    }
    output.flush()?;
    Ok(())
}

/// Write a bundle into a new buffer.
pub fn to_bytes(bundle: &RawBundle) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_raw(&mut bytes, bundle)?;
    Ok(bytes)
}

/// Read a bundle written by [write_raw]. The whole input must be consumed.
pub fn read_raw(data: &[u8]) -> Result<RawBundle> {
    let mut reader = RawReader::new(data);
    let mut magic = [0u8; 4];
    magic.copy_from_slice(reader.bytes(4)?);
    if magic != RAW_MAGIC {
        return Err(RawFormatError::BadMagic(magic));
    }
    let version = reader.u16()?;
    if version == 0 {
        return Err(RawFormatError::InvalidInput(
            "Raw bundle version 0 does not exist".to_owned(),
        ));
    }
    if version > RAW_VERSION {
        return Err(RawFormatError::UnsupportedVersion {
            found: version,
            supported: RAW_VERSION,
        });
    }
    let bundle = match reader.u8()? {
        KIND_SPRITE => RawBundle::Sprite(reader.sprite()?),
        KIND_TILESET => RawBundle::Tileset(reader.tileset()?),
        KIND_TILEMAP => RawBundle::Tilemap(reader.tilemap()?),
        KIND_SPRITE_SHEET => RawBundle::SpriteSheet(reader.sprite_sheet()?),
        kind => return Err(RawFormatError::UnknownKind(kind)),
    };
    if reader.remaining() != 0 {
        return Err(RawFormatError::InvalidInput(format!(
            "{} trailing bytes after bundle",
            reader.remaining()
        )));
    }
    Ok(bundle)
}

fn write_len<W: Write>(output: &mut W, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| RawFormatError::InvalidInput(format!("Length {} exceeds u32", len)))?;
    output.write_u32::<LittleEndian>(len)?;
    Ok(())
}

fn write_string<W: Write>(output: &mut W, value: &str) -> Result<()> {
    write_len(output, value.len())?;
    output.write_all(value.as_bytes())?;
    Ok(())
}

fn write_texture<W: Write>(output: &mut W, texture: &RawTexture) -> Result<()> {
    let expected = texture.width as u64 * texture.height as u64 * 4;
    if texture.pixels.len() as u64 != expected {
        return Err(RawFormatError::InvalidInput(format!(
            "Texture of {}x{} has {} bytes, expected {}",
            texture.width,
            texture.height,
            texture.pixels.len(),
            expected
        )));
    }
    output.write_u32::<LittleEndian>(texture.width)?;
    output.write_u32::<LittleEndian>(texture.height)?;
    write_len(output, texture.pixels.len())?;
    output.write_all(&texture.pixels)?;
    Ok(())
}

fn write_rect<W: Write>(output: &mut W, rect: &RawRect) -> Result<()> {
    output.write_i32::<LittleEndian>(rect.x)?;
    output.write_i32::<LittleEndian>(rect.y)?;
    output.write_u32::<LittleEndian>(rect.width)?;
    output.write_u32::<LittleEndian>(rect.height)?;
    Ok(())
}

fn write_slice<W: Write>(output: &mut W, slice: &RawSlice) -> Result<()> {
    write_string(output, &slice.name)?;
    write_len(output, slice.keys.len())?;
    for key in &slice.keys {
        output.write_u32::<LittleEndian>(key.frame)?;
        write_rect(output, &key.bounds)?;
        match &key.center {
            Some(center) => {
                output.write_u8(1)?;
                write_rect(output, center)?;
            }
            None => output.write_u8(0)?,
        }
        match key.pivot {
            Some((x, y)) => {
                output.write_u8(1)?;
                output.write_i32::<LittleEndian>(x)?;
                output.write_i32::<LittleEndian>(y)?;
            }
            None => output.write_u8(0)?,
        }
        match key.color {
            Some(color) => {
                output.write_u8(1)?;
                output.write_all(&color)?;
            }
            None => output.write_u8(0)?,
        }
    }
    Ok(())
}

fn write_slices<W: Write>(output: &mut W, slices: &[RawSlice]) -> Result<()> {
    write_len(output, slices.len())?;
    for slice in slices {
        write_slice(output, slice)?;
    }
    Ok(())
}

fn write_sprite<W: Write>(output: &mut W, sprite: &RawSprite) -> Result<()> {
    write_string(output, &sprite.name)?;
    write_texture(output, &sprite.texture)?;
    write_slices(output, &sprite.slices)
}

fn write_tileset<W: Write>(output: &mut W, tileset: &RawTileset) -> Result<()> {
    write_string(output, &tileset.name)?;
    output.write_u32::<LittleEndian>(tileset.id)?;
    output.write_u32::<LittleEndian>(tileset.tile_width)?;
    output.write_u32::<LittleEndian>(tileset.tile_height)?;
    write_texture(output, &tileset.texture)
}

fn write_tilesets<W: Write>(output: &mut W, tilesets: &[RawTileset]) -> Result<()> {
    write_len(output, tilesets.len())?;
    for tileset in tilesets {
        write_tileset(output, tileset)?;
    }
    Ok(())
}

fn write_tilemap<W: Write>(output: &mut W, tilemap: &RawTilemap) -> Result<()> {
    write_string(output, &tilemap.name)?;
    write_tilesets(output, &tilemap.tilesets)?;
    write_len(output, tilemap.layers.len())?;
    for layer in &tilemap.layers {
        write_string(output, &layer.name)?;
        output.write_u32::<LittleEndian>(layer.tileset_id)?;
        output.write_u32::<LittleEndian>(layer.columns)?;
        output.write_u32::<LittleEndian>(layer.rows)?;
        output.write_i32::<LittleEndian>(layer.offset.0)?;
        output.write_i32::<LittleEndian>(layer.offset.1)?;
        write_len(output, layer.tiles.len())?;
        for tile in &layer.tiles {
            let mut flags = TileFlags::empty();
            flags.set(TileFlags::FLIP_X, tile.flip_x);
            flags.set(TileFlags::FLIP_Y, tile.flip_y);
            flags.set(TileFlags::ROTATE_90CW, tile.rotate_90cw);
            output.write_u8(flags.bits())?;
            output.write_u32::<LittleEndian>(tile.tile)?;
        }
    }
    Ok(())
}

fn write_sprite_sheet<W: Write>(output: &mut W, sheet: &RawSpriteSheet) -> Result<()> {
    write_string(output, &sheet.name)?;
    write_texture(output, &sheet.texture)?;

    write_len(output, sheet.regions.len())?;
    for region in &sheet.regions {
        write_string(output, &region.name)?;
        write_rect(output, &region.bounds)?;
    }

    write_len(output, sheet.animations.len())?;
    for animation in &sheet.animations {
        write_string(output, &animation.name)?;
        write_len(output, animation.frames.len())?;
        for frame in &animation.frames {
            output.write_u32::<LittleEndian>(frame.region)?;
        }
        for frame in &animation.frames {
            output.write_u32::<LittleEndian>(frame.duration)?;
        }
        output.write_u8(direction_to_u8(animation.direction))?;
        output.write_u16::<LittleEndian>(animation.repeat)?;
    }

    write_slices(output, &sheet.slices)?;
    write_tilesets(output, &sheet.tilesets)?;
    write_len(output, sheet.tilemaps.len())?;
    for tilemap in &sheet.tilemaps {
        write_tilemap(output, tilemap)?;
    }
    Ok(())
}

fn direction_to_u8(direction: AnimationDirection) -> u8 {
    match direction {
        AnimationDirection::Forward => 0,
        AnimationDirection::Reverse => 1,
        AnimationDirection::PingPong => 2,
        AnimationDirection::PingPongReverse => 3,
    }
}

fn direction_from_u8(value: u8) -> Result<AnimationDirection> {
    match value {
        0 => Ok(AnimationDirection::Forward),
        1 => Ok(AnimationDirection::Reverse),
        2 => Ok(AnimationDirection::PingPong),
        3 => Ok(AnimationDirection::PingPongReverse),
        _ => Err(RawFormatError::InvalidInput(format!(
            "Unknown animation direction: {}",
            value
        ))),
    }
}

struct RawReader<'a> {
    input: Cursor<&'a [u8]>,
}

impl<'a> RawReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        RawReader {
            input: Cursor::new(data),
        }
    }

    fn remaining(&self) -> usize {
        let len = self.input.get_ref().len() as u64;
        len.saturating_sub(self.input.position()) as usize
    }

    fn truncated(&self) -> RawFormatError {
        RawFormatError::Truncated {
            offset: self.input.position(),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        let err = self.truncated();
        self.input.read_u8().map_err(|_| err)
    }

    fn u16(&mut self) -> Result<u16> {
        let err = self.truncated();
        self.input.read_u16::<LittleEndian>().map_err(|_| err)
    }

    fn u32(&mut self) -> Result<u32> {
        let err = self.truncated();
        self.input.read_u32::<LittleEndian>().map_err(|_| err)
    }

    fn i32(&mut self) -> Result<i32> {
        let err = self.truncated();
        self.input.read_i32::<LittleEndian>().map_err(|_| err)
    }

    fn flag(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(RawFormatError::InvalidInput(format!(
                "Expected presence flag 0 or 1, got {}",
                value
            ))),
        }
    }

    fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(self.truncated());
        }
        let start = self.input.position() as usize;
        let data: &'a [u8] = *self.input.get_ref();
        self.input.set_position((start + count) as u64);
        Ok(&data[start..start + count])
    }

    // Element count for a following list. Used only as a capacity hint, so
    // it is capped by the bytes left.
    fn count(&mut self) -> Result<(u32, usize)> {
        let count = self.u32()?;
        let hint = (count as usize).min(self.remaining());
        Ok((count, hint))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let offset = self.input.position();
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            RawFormatError::InvalidInput(format!("String at offset {} is not UTF-8", offset))
        })
    }

    fn texture(&mut self) -> Result<RawTexture> {
        let width = self.u32()?;
        let height = self.u32()?;
        let len = self.u32()? as usize;
        let expected = width as u64 * height as u64 * 4;
        if len as u64 != expected {
            return Err(RawFormatError::InvalidInput(format!(
                "Texture of {}x{} has {} bytes, expected {}",
                width, height, len, expected
            )));
        }
        let pixels = self.bytes(len)?.to_vec();
        Ok(RawTexture {
            width,
            height,
            pixels,
        })
    }

    fn rect(&mut self) -> Result<RawRect> {
        let x = self.i32()?;
        let y = self.i32()?;
        let width = self.u32()?;
        let height = self.u32()?;
        Ok(RawRect::new(x, y, width, height))
    }

    fn slice(&mut self) -> Result<RawSlice> {
        let name = self.string()?;
        let (count, hint) = self.count()?;
        let mut keys = Vec::with_capacity(hint);
        for _ in 0..count {
            let frame = self.u32()?;
            let bounds = self.rect()?;
            let center = if self.flag()? {
                Some(self.rect()?)
            } else {
                None
            };
            let pivot = if self.flag()? {
                Some((self.i32()?, self.i32()?))
            } else {
                None
            };
            let color = if self.flag()? {
                let mut color = [0u8; 4];
                color.copy_from_slice(self.bytes(4)?);
                Some(color)
            } else {
                None
            };
            keys.push(RawSliceKey {
                frame,
                bounds,
                center,
                pivot,
                color,
            });
        }
        Ok(RawSlice { name, keys })
    }

    fn slices(&mut self) -> Result<Vec<RawSlice>> {
        let (count, hint) = self.count()?;
        let mut slices = Vec::with_capacity(hint);
        for _ in 0..count {
            slices.push(self.slice()?);
        }
        Ok(slices)
    }

    fn sprite(&mut self) -> Result<RawSprite> {
        let name = self.string()?;
        let texture = self.texture()?;
        let slices = self.slices()?;
        Ok(RawSprite {
            name,
            texture,
            slices,
        })
    }

    fn tileset(&mut self) -> Result<RawTileset> {
        let name = self.string()?;
        let id = self.u32()?;
        let tile_width = self.u32()?;
        let tile_height = self.u32()?;
        let texture = self.texture()?;
        Ok(RawTileset {
            name,
            id,
            tile_width,
            tile_height,
            texture,
        })
    }

    fn tilesets(&mut self) -> Result<Vec<RawTileset>> {
        let (count, hint) = self.count()?;
        let mut tilesets = Vec::with_capacity(hint);
        for _ in 0..count {
            tilesets.push(self.tileset()?);
        }
        Ok(tilesets)
    }

    fn tilemap_layer(&mut self) -> Result<RawTilemapLayer> {
        let name = self.string()?;
        let tileset_id = self.u32()?;
        let columns = self.u32()?;
        let rows = self.u32()?;
        let offset = (self.i32()?, self.i32()?);
        let (count, hint) = self.count()?;
        let mut tiles = Vec::with_capacity(hint);
        for _ in 0..count {
            let bits = self.u8()?;
            let flags = TileFlags::from_bits(bits).ok_or_else(|| {
                RawFormatError::InvalidInput(format!("Unknown tile flags: {:#04x}", bits))
            })?;
            let tile = self.u32()?;
            tiles.push(RawTilemapTile {
                tile,
                flip_x: flags.contains(TileFlags::FLIP_X),
                flip_y: flags.contains(TileFlags::FLIP_Y),
                rotate_90cw: flags.contains(TileFlags::ROTATE_90CW),
            });
        }
        Ok(RawTilemapLayer {
            name,
            tileset_id,
            columns,
            rows,
            offset,
            tiles,
        })
    }

    fn tilemap(&mut self) -> Result<RawTilemap> {
        let name = self.string()?;
        let tilesets = self.tilesets()?;
        let (count, hint) = self.count()?;
        let mut layers = Vec::with_capacity(hint);
        for _ in 0..count {
            layers.push(self.tilemap_layer()?);
        }
        Ok(RawTilemap {
            name,
            tilesets,
            layers,
        })
    }

    fn animation(&mut self) -> Result<RawAnimationTag> {
        let name = self.string()?;
        let (count, hint) = self.count()?;
        let mut regions = Vec::with_capacity(hint);
        for _ in 0..count {
            regions.push(self.u32()?);
        }
        let mut frames = Vec::with_capacity(regions.len());
        for region in regions {
            let duration = self.u32()?;
            frames.push(RawAnimationFrame { region, duration });
        }
        let direction = direction_from_u8(self.u8()?)?;
        let repeat = self.u16()?;
        Ok(RawAnimationTag {
            name,
            frames,
            direction,
            repeat,
        })
    }

    fn sprite_sheet(&mut self) -> Result<RawSpriteSheet> {
        let name = self.string()?;
        let texture = self.texture()?;

        let (count, hint) = self.count()?;
        let mut regions = Vec::with_capacity(hint);
        for _ in 0..count {
            let name = self.string()?;
            let bounds = self.rect()?;
            regions.push(RawTextureRegion { name, bounds });
        }

        let (count, hint) = self.count()?;
        let mut animations = Vec::with_capacity(hint);
        for _ in 0..count {
            animations.push(self.animation()?);
        }

        let slices = self.slices()?;
        let tilesets = self.tilesets()?;

        let (count, hint) = self.count()?;
        let mut tilemaps = Vec::with_capacity(hint);
        for _ in 0..count {
            tilemaps.push(self.tilemap()?);
        }

        Ok(RawSpriteSheet {
            name,
            texture,
            regions,
            animations,
            slices,
            tilesets,
            tilemaps,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn texture(width: u32, height: u32, seed: u8) -> RawTexture {
        let pixels = (0..width * height * 4)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect();
        RawTexture {
            width,
            height,
            pixels,
        }
    }

    fn slice(name: &str) -> RawSlice {
        RawSlice {
            name: name.to_owned(),
            keys: vec![
                RawSliceKey {
                    frame: 0,
                    bounds: RawRect::new(-2, 3, 10, 12),
                    center: Some(RawRect::new(1, 1, 8, 10)),
                    pivot: Some((5, -6)),
                    color: Some([0, 0, 255, 255]),
                },
                RawSliceKey {
                    frame: 3,
                    bounds: RawRect::new(0, 0, 4, 4),
                    center: None,
                    pivot: None,
                    color: None,
                },
            ],
        }
    }

    fn tileset(id: u32) -> RawTileset {
        RawTileset {
            name: format!("tiles {}", id),
            id,
            tile_width: 2,
            tile_height: 2,
            texture: texture(2, 6, id as u8),
        }
    }

    fn tilemap(name: &str) -> RawTilemap {
        RawTilemap {
            name: name.to_owned(),
            tilesets: vec![tileset(7)],
            layers: vec![RawTilemapLayer {
                name: "ground".to_owned(),
                tileset_id: 7,
                columns: 2,
                rows: 1,
                offset: (-1, 2),
                tiles: vec![
                    RawTilemapTile {
                        tile: 0,
                        ..Default::default()
                    },
                    RawTilemapTile {
                        tile: 2,
                        flip_x: true,
                        flip_y: false,
                        rotate_90cw: true,
                    },
                ],
            }],
        }
    }

    fn sprite_sheet() -> RawSpriteSheet {
        RawSpriteSheet {
            name: "hero".to_owned(),
            texture: texture(8, 4, 1),
            regions: vec![
                RawTextureRegion {
                    name: "hero 0".to_owned(),
                    bounds: RawRect::new(0, 0, 4, 4),
                },
                RawTextureRegion {
                    name: "hero 1".to_owned(),
                    bounds: RawRect::new(4, 0, 4, 4),
                },
            ],
            animations: vec![RawAnimationTag {
                name: "walk".to_owned(),
                frames: vec![
                    RawAnimationFrame {
                        region: 0,
                        duration: 100,
                    },
                    RawAnimationFrame {
                        region: 1,
                        duration: 150,
                    },
                ],
                direction: AnimationDirection::PingPongReverse,
                repeat: 3,
            }],
            slices: vec![slice("hitbox")],
            tilesets: vec![tileset(7), tileset(9)],
            tilemaps: vec![tilemap("hero 0"), tilemap("hero 1")],
        }
    }

    #[test]
    fn every_kind_round_trips() {
        let bundles = vec![
            RawBundle::Sprite(RawSprite {
                name: "single".to_owned(),
                texture: texture(3, 2, 9),
                slices: vec![slice("a"), slice("b")],
            }),
            RawBundle::Tileset(tileset(4)),
            RawBundle::Tilemap(tilemap("level")),
            RawBundle::SpriteSheet(sprite_sheet()),
        ];
        for bundle in bundles {
            let bytes = to_bytes(&bundle).unwrap();
            assert_eq!(read_raw(&bytes).unwrap(), bundle);
        }
    }

    #[test]
    fn empty_content_round_trips() {
        let bundle = RawBundle::Sprite(RawSprite {
            name: String::new(),
            texture: texture(0, 0, 0),
            slices: Vec::new(),
        });
        let bytes = to_bytes(&bundle).unwrap();
        assert_eq!(read_raw(&bytes).unwrap(), bundle);
    }

    #[test]
    fn header_and_tileset_layout() {
        let bundle = RawBundle::Tileset(RawTileset {
            name: "ab".to_owned(),
            id: 5,
            tile_width: 1,
            tile_height: 1,
            texture: RawTexture {
                width: 1,
                height: 1,
                pixels: vec![1, 2, 3, 4],
            },
        });
        let bytes = to_bytes(&bundle).unwrap();
        let expected: Vec<u8> = vec![
            b'A', b'R', b'A', b'W', 1, 0, 1, // header
            2, 0, 0, 0, b'a', b'b', // name
            5, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, // id, tile size
            1, 0, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 1, 2, 3, 4, // texture
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn tile_flags_byte() {
        let mut bytes = to_bytes(&RawBundle::Tilemap(tilemap("level"))).unwrap();
        let flags_at = bytes.len() - 5;
        assert_eq!(bytes[flags_at], 0b101);
        assert_eq!(&bytes[flags_at + 1..], &[2, 0, 0, 0]);

        bytes[flags_at] = 0b1000;
        assert!(matches!(
            read_raw(&bytes),
            Err(RawFormatError::InvalidInput(_))
        ));
    }

    #[test]
    fn bad_magic() {
        let mut bytes = to_bytes(&RawBundle::Tileset(tileset(1))).unwrap();
        bytes[0] = b'X';
        match read_raw(&bytes) {
            Err(RawFormatError::BadMagic(magic)) => assert_eq!(&magic, b"XRAW"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn newer_version_is_rejected() {
        let mut bytes = to_bytes(&RawBundle::Tileset(tileset(1))).unwrap();
        bytes[4] = 2;
        match read_raw(&bytes) {
            Err(RawFormatError::UnsupportedVersion { found, supported }) => {
                assert_eq!((found, supported), (2, RAW_VERSION))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn version_zero_is_invalid() {
        let mut bytes = to_bytes(&RawBundle::Tileset(tileset(1))).unwrap();
        bytes[4] = 0;
        assert!(matches!(
            read_raw(&bytes),
            Err(RawFormatError::InvalidInput(_))
        ));
    }

    #[test]
    fn unknown_kind() {
        let mut bytes = to_bytes(&RawBundle::Tileset(tileset(1))).unwrap();
        bytes[6] = 9;
        assert!(matches!(read_raw(&bytes), Err(RawFormatError::UnknownKind(9))));
    }

    #[test]
    fn truncated_input() {
        let bytes = to_bytes(&RawBundle::SpriteSheet(sprite_sheet())).unwrap();
        for len in [0, 3, 6, 7, 20, bytes.len() / 2, bytes.len() - 1].iter() {
            let result = read_raw(&bytes[..*len]);
            assert!(
                matches!(result, Err(RawFormatError::Truncated { .. })),
                "length {}: {:?}",
                len,
                result
            );
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = to_bytes(&RawBundle::Tileset(tileset(1))).unwrap();
        bytes.push(0);
        assert!(matches!(read_raw(&bytes), Err(RawFormatError::InvalidInput(_))));
    }

    #[test]
    fn invalid_utf8_name() {
        let mut bytes = to_bytes(&RawBundle::Tileset(tileset(1))).unwrap();
        // First name byte follows the 7 byte header and the length prefix.
        bytes[11] = 0xff;
        assert!(matches!(read_raw(&bytes), Err(RawFormatError::InvalidInput(_))));
    }

    #[test]
    fn inconsistent_texture_is_not_written() {
        let bundle = RawBundle::Tileset(RawTileset {
            texture: RawTexture {
                width: 2,
                height: 2,
                pixels: vec![0; 3],
            },
            ..tileset(1)
        });
        assert!(matches!(
            to_bytes(&bundle),
            Err(RawFormatError::InvalidInput(_))
        ));
    }
}
