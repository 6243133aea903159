use crate::{
    atlas::{AtlasPacker, MAX_ATLAS_DIMENSION},
    composite::{self, CompositeOptions},
    dedup,
    layer::LayerType,
    raw::{
        RawAnimationFrame, RawAnimationTag, RawRect, RawSlice, RawSliceKey, RawSprite,
        RawSpriteSheet, RawTextureRegion, RawTilemap, RawTilemapLayer, RawTilemapTile, RawTileset,
    },
    tile::Tile,
    tileset::TilesetId,
    AsepriteFile, Layer, ProcessError,
};
use log::{debug, trace};
use std::collections::HashSet;

type Result<T> = std::result::Result<T, ProcessError>;

/// Settings for turning an [AsepriteFile] into raw content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Skip hidden layers.
    pub only_visible_layers: bool,
    /// Draw the background layer.
    pub include_background_layer: bool,
    /// Draw tilemap layers into frames.
    pub include_tilemap_layers: bool,
    /// Store pixel-identical frames only once in the atlas.
    pub merge_duplicates: bool,
    /// Transparent pixels around the whole atlas.
    pub border_padding: u32,
    /// Transparent pixels between neighbouring frames.
    pub spacing: u32,
    /// Transparent pixels added around each frame.
    pub inner_padding: u32,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        ProcessorOptions {
            only_visible_layers: true,
            include_background_layer: false,
            include_tilemap_layers: true,
            merge_duplicates: true,
            border_padding: 0,
            spacing: 0,
            inner_padding: 0,
        }
    }
}

impl ProcessorOptions {
    /// Check that all paddings are within the atlas limits.
    pub fn validate(&self) -> Result<()> {
        let paddings = [
            ("border_padding", self.border_padding),
            ("spacing", self.spacing),
            ("inner_padding", self.inner_padding),
        ];
        for (name, value) in paddings.iter() {
            if *value > MAX_ATLAS_DIMENSION {
                return Err(ProcessError::InvalidOptions(format!(
                    "{} is {}, maximum is {}",
                    name, value, MAX_ATLAS_DIMENSION
                )));
            }
        }
        Ok(())
    }

    /// The layer selection used for flattening frames.
    pub fn composite_options(&self) -> CompositeOptions {
        CompositeOptions {
            only_visible_layers: self.only_visible_layers,
            include_background_layer: self.include_background_layer,
            include_tilemap_layers: self.include_tilemap_layers,
        }
    }

    fn packer(&self) -> AtlasPacker {
        AtlasPacker::new(self.border_padding, self.spacing, self.inner_padding)
    }
}

/// Flatten, deduplicate and pack every frame into one sprite sheet.
///
/// Regions are named `"{name} {frame}"` and come in frame order. Frames with
/// identical pixels share their bounds when `merge_duplicates` is set.
pub fn process_sprite_sheet(
    file: &AsepriteFile,
    name: &str,
    options: &ProcessorOptions,
) -> Result<RawSpriteSheet> {
    options.validate()?;

    let frames = composite::composite_frames(file, &options.composite_options())?;
    let deduplicated = dedup::deduplicate(frames, options.merge_duplicates);
    let atlas = options.packer().pack(&deduplicated.images)?;

    let regions = deduplicated
        .frame_to_image
        .iter()
        .enumerate()
        .map(|(frame, &image)| {
            let p = atlas.placements[image];
            RawTextureRegion {
                name: format!("{} {}", name, frame),
                bounds: RawRect::new(p.x as i32, p.y as i32, p.width, p.height),
            }
        })
        .collect();

    let animations = animations(file)?;
    let slices = slices(file)?;
    let tilesets = file
        .tilesets()
        .iter()
        .map(|t| process_tileset(file, t.id().value()))
        .collect::<Result<Vec<_>>>()?;

    let has_tilemap_layers = file
        .layers()
        .any(|l| matches!(l.layer_type(), LayerType::Tilemap(_)));
    let tilemaps = if has_tilemap_layers {
        (0..file.num_frames())
            .map(|frame| {
                process_tilemap(
                    file,
                    &format!("{} {}", name, frame),
                    frame,
                    options.only_visible_layers,
                )
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    trace!(
        "Sprite sheet '{}': {} regions, {} animations, {} slices",
        name,
        file.num_frames(),
        animations.len(),
        slices.len()
    );
    Ok(RawSpriteSheet {
        name: name.to_owned(),
        texture: atlas.image.into(),
        regions,
        animations,
        slices,
        tilesets,
        tilemaps,
    })
}

/// A single flattened frame with the file's slices.
pub fn process_sprite(
    file: &AsepriteFile,
    name: &str,
    frame: u32,
    options: &ProcessorOptions,
) -> Result<RawSprite> {
    options.validate()?;
    if frame >= file.num_frames() {
        return Err(ProcessError::InvalidFrame(frame));
    }
    let image = composite::composite_frame(file, frame, &options.composite_options())?;
    Ok(RawSprite {
        name: name.to_owned(),
        texture: image.into(),
        slices: slices(file)?,
    })
}

/// The tiles of a tileset as one vertical strip.
pub fn process_tileset(file: &AsepriteFile, tileset_id: u32) -> Result<RawTileset> {
    let tileset = file
        .tilesets()
        .get(TilesetId::new(tileset_id))
        .ok_or(ProcessError::MissingTileset(tileset_id))?;
    let tile_size = tileset.tile_size();
    Ok(RawTileset {
        name: tileset.name().to_owned(),
        id: tileset_id,
        tile_width: tile_size.width() as u32,
        tile_height: tile_size.height() as u32,
        texture: tileset.image().clone().into(),
    })
}

/// The tile grids of all tilemap layers in one frame.
///
/// Each grid covers the whole canvas. Tiles outside of the cel's data are
/// empty.
pub fn process_tilemap(
    file: &AsepriteFile,
    name: &str,
    frame: u32,
    only_visible_layers: bool,
) -> Result<RawTilemap> {
    if frame >= file.num_frames() {
        return Err(ProcessError::InvalidFrame(frame));
    }
    let mut tilesets: Vec<RawTileset> = Vec::new();
    let mut layers = Vec::new();

    for layer in file.layers() {
        let tileset_id = match layer.layer_type() {
            LayerType::Tilemap(id) => id,
            _ => continue,
        };
        if only_visible_layers && !layer.is_visible() {
            debug!("Skipping hidden tilemap layer '{}'", layer.name());
            continue;
        }
        if !tilesets.iter().any(|t| t.id == tileset_id.value()) {
            tilesets.push(process_tileset(file, tileset_id.value())?);
        }
        layers.push(tilemap_layer(file, &layer, tileset_id, frame)?);
    }

    Ok(RawTilemap {
        name: name.to_owned(),
        tilesets,
        layers,
    })
}

fn tilemap_layer(
    file: &AsepriteFile,
    layer: &Layer,
    tileset_id: TilesetId,
    frame: u32,
) -> Result<RawTilemapLayer> {
    let tileset = file
        .tilesets()
        .get(tileset_id)
        .ok_or_else(|| ProcessError::MissingTileset(tileset_id.value()))?;
    let tile_size = tileset.tile_size();
    let tile_width = (tile_size.width() as u32).max(1);
    let tile_height = (tile_size.height() as u32).max(1);
    let columns = (file.width() as u32 + tile_width - 1) / tile_width;
    let rows = (file.height() as u32 + tile_height - 1) / tile_height;

    let tilemap = file.tilemap(layer.id(), frame);
    let offset = tilemap
        .as_ref()
        .map(|t| t.tile_offsets())
        .unwrap_or((0, 0));
    let mut tiles = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        for column in 0..columns {
            let tile = tilemap
                .as_ref()
                .map(|t| t.tile(column, row))
                .unwrap_or_else(|| Tile::empty(tileset.empty_tile_id()));
            tiles.push(RawTilemapTile {
                tile: tile.id.0,
                flip_x: tile.flip_x,
                flip_y: tile.flip_y,
                rotate_90cw: tile.rotate_90cw,
            });
        }
    }

    Ok(RawTilemapLayer {
        name: layer.name().to_owned(),
        tileset_id: tileset_id.value(),
        columns,
        rows,
        offset,
        tiles,
    })
}

fn animations(file: &AsepriteFile) -> Result<Vec<RawAnimationTag>> {
    let mut names = HashSet::new();
    let mut result = Vec::with_capacity(file.num_tags() as usize);
    for tag_id in 0..file.num_tags() {
        let tag = file.tag(tag_id);
        if !names.insert(tag.name()) {
            return Err(ProcessError::DuplicateTagName(tag.name().to_owned()));
        }
        if tag.to_frame() >= file.num_frames() {
            return Err(ProcessError::InvalidFrame(tag.to_frame()));
        }
        let frames = (tag.from_frame()..=tag.to_frame())
            .map(|frame| RawAnimationFrame {
                region: frame,
                duration: file.frame(frame).duration(),
            })
            .collect();
        result.push(RawAnimationTag {
            name: tag.name().to_owned(),
            frames,
            direction: tag.animation_direction(),
            repeat: tag.repeat(),
        });
    }
    Ok(result)
}

fn slices(file: &AsepriteFile) -> Result<Vec<RawSlice>> {
    let mut names = HashSet::new();
    let mut result = Vec::with_capacity(file.slices().len());
    for slice in file.slices() {
        if !names.insert(slice.name.as_str()) {
            return Err(ProcessError::DuplicateSliceName(slice.name.clone()));
        }
        let color = slice.color();
        let keys = slice
            .keys
            .iter()
            .map(|key| RawSliceKey {
                frame: key.from_frame,
                bounds: RawRect::new(key.origin.0, key.origin.1, key.size.0, key.size.1),
                center: key
                    .slice9
                    .map(|(x, y, width, height)| RawRect::new(x, y, width, height)),
                pivot: key.pivot,
                color,
            })
            .collect();
        result.push(RawSlice {
            name: slice.name.clone(),
            keys,
        });
    }
    Ok(result)
}
