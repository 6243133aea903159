//! Flattening the layers of a frame into one image.

use crate::{
    blend::{self, Color8},
    cel::{CelContent, CelId, RawCel},
    layer::{BlendMode, Layer, LayerFlags, LayerType},
    tilemap::TilemapData,
    tileset::Tileset,
    AsepriteFile, ProcessError,
};
use image::RgbaImage;
use log::trace;

type BlendFn = fn(Color8, Color8, u8) -> Color8;

type Result<T> = std::result::Result<T, ProcessError>;

/// Which layers take part when a frame is flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeOptions {
    /// Skip layers that are hidden, either directly or through a parent group.
    pub only_visible_layers: bool,
    /// Draw the background layer.
    pub include_background_layer: bool,
    /// Draw tilemap layers.
    pub include_tilemap_layers: bool,
}

impl Default for CompositeOptions {
    /// What Aseprite shows: visible layers, background and tilemaps included.
    fn default() -> Self {
        CompositeOptions {
            only_visible_layers: true,
            include_background_layer: true,
            include_tilemap_layers: true,
        }
    }
}

impl CompositeOptions {
    fn includes(&self, layer: &Layer) -> bool {
        match layer.layer_type() {
            LayerType::Group => return false,
            LayerType::Tilemap(_) if !self.include_tilemap_layers => return false,
            _ => {}
        }
        if self.only_visible_layers && !layer.is_visible() {
            return false;
        }
        if layer.is_background() && !self.include_background_layer {
            return false;
        }
        !layer.flags().contains(LayerFlags::REFERENCE)
    }
}

/// Flatten one frame. The result has the size of the canvas.
pub fn composite_frame(
    file: &AsepriteFile,
    frame: u32,
    options: &CompositeOptions,
) -> Result<RgbaImage> {
    if frame >= file.num_frames() {
        return Err(ProcessError::InvalidFrame(frame));
    }
    let mut image = RgbaImage::new(file.width() as u32, file.height() as u32);

    let mut cels: Vec<(Layer, &RawCel)> = file
        .framedata
        .frame_cels(frame as u16)
        .map(|(layer_id, cel)| (file.layer(layer_id), cel))
        .filter(|(layer, _)| options.includes(layer))
        .collect();
    // Stable, so document order is kept when all z-indices are zero.
    cels.sort_by_key(|(layer, cel)| {
        let z = cel.data.z_index as i32;
        (layer.id() as i32 + z, z)
    });

    for (layer, _) in cels {
        let cel_id = CelId {
            frame: frame as u16,
            layer: layer.id() as u16,
        };
        draw_cel(&mut image, file, &layer, cel_id, layer.effective_opacity())?;
    }
    trace!("Composited frame {} ({}x{})", frame, image.width(), image.height());
    Ok(image)
}

/// Flatten every frame in order.
pub fn composite_frames(file: &AsepriteFile, options: &CompositeOptions) -> Result<Vec<RgbaImage>> {
    (0..file.num_frames())
        .map(|frame| composite_frame(file, frame, options))
        .collect()
}

// A single cel on an otherwise transparent canvas.
pub(crate) fn cel_image(file: &AsepriteFile, cel_id: CelId) -> Result<RgbaImage> {
    let mut image = RgbaImage::new(file.width() as u32, file.height() as u32);
    if file.framedata.cel(cel_id).is_some() {
        let layer = file.layer(cel_id.layer as u32);
        draw_cel(&mut image, file, &layer, cel_id, layer.opacity())?;
    }
    Ok(image)
}

fn draw_cel(
    image: &mut RgbaImage,
    file: &AsepriteFile,
    layer: &Layer,
    cel_id: CelId,
    layer_opacity: u8,
) -> Result<()> {
    let blend_fn = blend_mode_to_blend_fn(layer.blend_mode());
    let cel = file.framedata.resolved_cel(cel_id).ok_or_else(|| {
        ProcessError::Composite(format!("Cel {} links to a missing cel", cel_id))
    })?;
    let origin = (cel.data.x as i32, cel.data.y as i32);
    let opacity = blend::mul_un8(cel.data.opacity as i32, layer_opacity as i32);
    match &cel.content {
        CelContent::Image(src) => {
            draw_image(image, src, origin, opacity, blend_fn);
            Ok(())
        }
        CelContent::Tilemap(tilemap) => {
            let tileset = match layer.layer_type() {
                LayerType::Tilemap(tileset_id) => file.tilesets().get(tileset_id),
                _ => None,
            }
            .ok_or_else(|| {
                ProcessError::Composite(format!(
                    "Tilemap cel {} has no tileset to draw from",
                    cel_id
                ))
            })?;
            draw_tilemap(image, tilemap, tileset, origin, opacity, blend_fn)
                .map_err(|msg| ProcessError::Composite(format!("Cel {}: {}", cel_id, msg)))
        }
        CelContent::Linked(frame) => Err(ProcessError::Composite(format!(
            "Cel {} links to frame {} which is itself a link",
            cel_id, frame
        ))),
    }
}

fn draw_image(
    image: &mut RgbaImage,
    src: &RgbaImage,
    origin: (i32, i32),
    opacity: u8,
    blend_fn: BlendFn,
) {
    let (x0, y0) = origin;
    let (img_width, img_height) = image.dimensions();

    for (sx, sy, pixel) in src.enumerate_pixels() {
        let x = x0 + sx as i32;
        let y = y0 + sy as i32;
        if x < 0 || y < 0 || x >= img_width as i32 || y >= img_height as i32 {
            continue;
        }
        let backdrop = *image.get_pixel(x as u32, y as u32);
        image.put_pixel(x as u32, y as u32, blend_fn(backdrop, *pixel, opacity));
    }
}

fn draw_tilemap(
    image: &mut RgbaImage,
    tilemap: &TilemapData,
    tileset: &Tileset,
    origin: (i32, i32),
    opacity: u8,
    blend_fn: BlendFn,
) -> std::result::Result<(), String> {
    let (img_width, img_height) = image.dimensions();
    let tile_size = tileset.tile_size();
    let tile_width = tile_size.width() as u32;
    let tile_height = tile_size.height() as u32;

    for tile_y in 0..tilemap.height() as u32 {
        for tile_x in 0..tilemap.width() as u32 {
            let tile = tilemap
                .tile(tile_x, tile_y)
                .ok_or_else(|| format!("tile data ends before ({}, {})", tile_x, tile_y))?;
            if tileset.is_empty_tile(tile.id) {
                continue;
            }
            if tile.id.0 >= tileset.tile_count() {
                return Err(format!(
                    "tile index {} outside of tileset {} with {} tiles",
                    tile.id.0,
                    tileset.id().value(),
                    tileset.tile_count()
                ));
            }
            if tile.rotate_90cw && tile_width != tile_height {
                return Err(format!(
                    "diagonal flip of non-square {}x{} tile",
                    tile_width, tile_height
                ));
            }
            let base_x = origin.0 + (tile_x * tile_width) as i32;
            let base_y = origin.1 + (tile_y * tile_height) as i32;
            for py in 0..tile_height {
                for px in 0..tile_width {
                    let x = base_x + px as i32;
                    let y = base_y + py as i32;
                    if x < 0 || y < 0 || x >= img_width as i32 || y >= img_height as i32 {
                        continue;
                    }
                    let mut sx = if tile.flip_x { tile_width - 1 - px } else { px };
                    let mut sy = if tile.flip_y { tile_height - 1 - py } else { py };
                    if tile.rotate_90cw {
                        std::mem::swap(&mut sx, &mut sy);
                    }
                    let pixel = tileset
                        .tile_pixel(tile.id, sx, sy)
                        .ok_or_else(|| format!("tile {} has no pixel ({}, {})", tile.id.0, sx, sy))?;
                    let backdrop = *image.get_pixel(x as u32, y as u32);
                    image.put_pixel(x as u32, y as u32, blend_fn(backdrop, pixel, opacity));
                }
            }
        }
    }
    Ok(())
}

fn blend_mode_to_blend_fn(mode: BlendMode) -> BlendFn {
    match mode {
        BlendMode::Normal => blend::normal,
        BlendMode::Multiply => blend::multiply,
        BlendMode::Screen => blend::screen,
        BlendMode::Overlay => blend::overlay,
        BlendMode::Darken => blend::darken,
        BlendMode::Lighten => blend::lighten,
        BlendMode::ColorDodge => blend::color_dodge,
        BlendMode::ColorBurn => blend::color_burn,
        BlendMode::HardLight => blend::hard_light,
        BlendMode::SoftLight => blend::soft_light,
        BlendMode::Difference => blend::difference,
        BlendMode::Exclusion => blend::exclusion,
        BlendMode::Hue => blend::hsl_hue,
        BlendMode::Saturation => blend::hsl_saturation,
        BlendMode::Color => blend::hsl_color,
        BlendMode::Luminosity => blend::hsl_luminosity,
        BlendMode::Addition => blend::addition,
        BlendMode::Subtract => blend::subtract,
        BlendMode::Divide => blend::divide,
    }
}
