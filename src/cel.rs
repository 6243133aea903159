use crate::{
    composite,
    layer::{LayerType, LayersData},
    pixel::{IndexResolver, Pixels},
    reader::AseReader,
    tilemap::TilemapData,
    user_data::UserData,
    AsepriteFile, AsepriteParseError, ColorPalette, PixelFormat, ProcessError, Result,
};

use image::RgbaImage;
use std::fmt;

/// A reference to a single Cel. A cel contains the image data at a specific
/// layer and frame. In the timeline view these are the dots.
///
/// You can get a `cel` by going either via frame then layer or vice versa.
///
/// [Official docs for cels](https://www.aseprite.org/docs/cel/).
#[derive(Debug, Clone, Copy)]
pub struct Cel<'a> {
    pub(crate) file: &'a AsepriteFile,
    pub(crate) cel_id: CelId,
}

impl<'a> Cel<'a> {
    /// This cel as an image. Result has the same dimensions as the [AsepriteFile].
    /// If the cel is empty, all image pixels will be transparent.
    ///
    /// The cel is drawn with its layer's blend mode and opacity onto a
    /// transparent canvas, regardless of the layer's visibility.
    pub fn image(&self) -> std::result::Result<RgbaImage, ProcessError> {
        composite::cel_image(self.file, self.cel_id)
    }

    /// Frame index of this cel.
    pub fn frame(&self) -> u32 {
        self.cel_id.frame as u32
    }

    /// Layer index of this cel.
    pub fn layer(&self) -> u32 {
        self.cel_id.layer as u32
    }

    /// Returns `true` if the cel contains no data.
    pub fn is_empty(&self) -> bool {
        self.raw_cel().is_none()
    }

    /// Returns `true` if the cel shares its content with a cel in another frame.
    pub fn is_linked(&self) -> bool {
        self.linked_frame().is_some()
    }

    /// The frame whose cel content this cel reuses, if it is a linked cel.
    pub fn linked_frame(&self) -> Option<u32> {
        match self.raw_cel()?.content {
            CelContent::Linked(frame) => Some(frame as u32),
            _ => None,
        }
    }

    /// Returns `true` if the cel holds tilemap data.
    pub fn is_tilemap(&self) -> bool {
        matches!(
            self.resolved_content(),
            Some(CelContent::Tilemap(_))
        )
    }

    /// Position of the cel's top-left corner on the canvas. `(0, 0)` for
    /// empty cels. Linked cels report the position of the cel they link to.
    pub fn top_left(&self) -> (i32, i32) {
        self.resolved_cel()
            .map(|c| (c.data.x as i32, c.data.y as i32))
            .unwrap_or((0, 0))
    }

    /// Opacity of the cel itself, not including the layer's opacity.
    pub fn opacity(&self) -> u8 {
        self.resolved_cel().map(|c| c.data.opacity).unwrap_or(255)
    }

    /// Order relative to other layers in the same frame. `0` keeps the layer
    /// order.
    pub fn z_index(&self) -> i16 {
        self.raw_cel().map(|c| c.data.z_index).unwrap_or(0)
    }

    /// Returns the cel's user data, if any is present.
    pub fn user_data(&self) -> Option<&'a UserData> {
        self.raw_cel().and_then(|c| c.user_data.as_ref())
    }

    pub(crate) fn raw_cel(&self) -> Option<&'a RawCel> {
        self.file.framedata.cel(self.cel_id)
    }

    // Links are one level deep (checked when parsing).
    fn resolved_cel(&self) -> Option<&'a RawCel> {
        self.file.framedata.resolved_cel(self.cel_id)
    }

    pub(crate) fn resolved_content(&self) -> Option<&'a CelContent> {
        self.resolved_cel().map(|c| &c.content)
    }
}

/// Organizes all Cels into a 2d array.
pub(crate) struct CelsData<I> {
    // Mapping: frame_id -> layer_id -> Option<RawCel>
    data: Vec<Vec<Option<RawCel<I>>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CelId {
    pub frame: u16,
    pub layer: u16,
}

impl fmt::Display for CelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CelId(F{},L{})", self.frame, self.layer)
    }
}

impl<I: fmt::Debug> fmt::Debug for CelsData<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_map();
        for (frame, by_layer) in self.data.iter().enumerate() {
            for (layer, cel) in by_layer.iter().enumerate() {
                if let Some(ref cel) = cel {
                    d.entry(
                        &CelId {
                            frame: frame as u16,
                            layer: layer as u16,
                        },
                        cel,
                    );
                }
            }
        }
        d.finish()
    }
}

impl<I> CelsData<I> {
    pub(crate) fn new(num_frames: u32) -> Self {
        let mut data = Vec::with_capacity(num_frames as usize);
        data.resize_with(num_frames as usize, Vec::new);
        CelsData { data }
    }

    fn check_valid_frame_id(&self, frame_id: u16) -> Result<()> {
        if (frame_id as usize) >= self.data.len() {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Invalid frame reference in Cel: {}",
                frame_id
            )));
        }
        Ok(())
    }

    pub(crate) fn add_cel(&mut self, frame_id: u16, cel: RawCel<I>) -> Result<()> {
        self.check_valid_frame_id(frame_id)?;

        let layer_id = cel.data.layer_index;
        let min_layers = layer_id as usize + 1;
        let layers = &mut self.data[frame_id as usize];
        if layers.len() < min_layers {
            layers.resize_with(min_layers, || None);
        }
        if layers[layer_id as usize].is_some() {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Multiple Cels for frame {}, layer {}",
                frame_id, layer_id
            )));
        }
        layers[layer_id as usize] = Some(cel);

        Ok(())
    }

    /// All cels of a frame with their layer index, ordered by layer.
    pub(crate) fn frame_cels(&self, frame_id: u16) -> impl Iterator<Item = (u32, &RawCel<I>)> {
        self.data[frame_id as usize]
            .iter()
            .enumerate()
            .filter_map(|(layer_id, cel)| cel.as_ref().map(|c| (layer_id as u32, c)))
    }

    // Frame ID must be valid. If Layer ID is out of bounds always returns
    // None.
    pub(crate) fn cel(&self, cel_id: CelId) -> Option<&RawCel<I>> {
        let CelId { frame, layer } = cel_id;
        self.data
            .get(frame as usize)
            .and_then(|layers| layers.get(layer as usize))
            .and_then(|cel| cel.as_ref())
    }

    pub(crate) fn cel_mut(&mut self, cel_id: CelId) -> Option<&mut RawCel<I>> {
        let CelId { frame, layer } = cel_id;
        self.data
            .get_mut(frame as usize)
            .and_then(|layers| layers.get_mut(layer as usize))
            .and_then(|cel| cel.as_mut())
    }

    // The cel itself, or the cel it links to. Linked cels share position,
    // opacity and content with their target.
    pub(crate) fn resolved_cel(&self, cel_id: CelId) -> Option<&RawCel<I>> {
        let cel = self.cel(cel_id)?;
        match cel.content {
            CelContent::Linked(frame) => self.cel(CelId {
                frame,
                layer: cel_id.layer,
            }),
            _ => Some(cel),
        }
    }

    fn validate_cel(&self, frame: usize, layer_index: usize, layers_data: &LayersData) -> Result<()> {
        let cel = match self.data[frame].get(layer_index) {
            Some(Some(cel)) => cel,
            _ => return Ok(()),
        };
        if layer_index >= layers_data.num_layers() as usize {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Invalid layer reference in Cel (f:{},l:{}). File has {} layers",
                frame,
                layer_index,
                layers_data.num_layers()
            )));
        }
        let layer = &layers_data[layer_index as u32];
        match &cel.content {
            CelContent::Image(_) => {
                if let LayerType::Group = layer.layer_type {
                    return Err(AsepriteParseError::InvalidInput(format!(
                        "Invalid cel. Image Cel (f:{},l:{}) in group layer.",
                        frame, layer_index
                    )));
                }
            }
            CelContent::Linked(other_frame) => {
                let other = CelId {
                    frame: *other_frame,
                    layer: layer_index as u16,
                };
                match self.cel(other) {
                    Some(other_cel) => {
                        if let CelContent::Linked(_) = &other_cel.content {
                            return Err(AsepriteParseError::InvalidInput(
                                format!("Invalid Cel reference. Cel (f:{},l:{}) links to cel (f:{},l:{}) but that cel links to another cel.",
                                frame, layer_index, *other_frame, layer_index)
                            ));
                        }
                    }
                    None => {
                        return Err(AsepriteParseError::InvalidInput(
                            format!("Invalid Cel reference. Cel (f:{},l:{}) links to cel (f:{},l:{}) but that cel contains no data.",
                            frame, layer_index, *other_frame, layer_index)
                        ));
                    }
                }
            }
            CelContent::Tilemap(_) => {
                // Verify that a Tilemap cel belongs to a Tilemap layer.
                if let LayerType::Tilemap(_) = layer.layer_type {
                    // Tilemap Layer, ok
                } else {
                    return Err(AsepriteParseError::InvalidInput(format!(
                        "Invalid cel. Tilemap Cel (f:{},l:{}) outside of tilemap layer.",
                        frame, layer_index
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn validate(&self, layers_data: &LayersData) -> Result<()> {
        for frame in 0..self.data.len() {
            for layer_index in 0..self.data[frame].len() {
                self.validate_cel(frame, layer_index, layers_data)?;
            }
        }
        Ok(())
    }
}

impl CelsData<ImageContent> {
    /// Turn every image cel into an RGBA image.
    pub(crate) fn resolve(
        self,
        layers_data: &LayersData,
        pixel_format: PixelFormat,
        palette: Option<&ColorPalette>,
    ) -> Result<CelsData<RgbaImage>> {
        let mut data = Vec::with_capacity(self.data.len());
        for by_layer in self.data {
            let mut resolved = Vec::with_capacity(by_layer.len());
            for (layer_index, cel) in by_layer.into_iter().enumerate() {
                let cel = match cel {
                    Some(cel) => cel,
                    None => {
                        resolved.push(None);
                        continue;
                    }
                };
                let resolver = match (pixel_format, palette) {
                    (
                        PixelFormat::Indexed {
                            transparent_color_index,
                        },
                        Some(palette),
                    ) => Some(IndexResolver {
                        palette,
                        transparent_color_index,
                        layer_is_background: layers_data[layer_index as u32]
                            .flags
                            .is_background(),
                    }),
                    _ => None,
                };
                let RawCel {
                    data: cel_data,
                    content,
                    user_data,
                } = cel;
                let content = match content {
                    CelContent::Image(ImageContent { size, pixels }) => {
                        let image = pixels.into_rgba_image(
                            size.width as u32,
                            size.height as u32,
                            resolver.as_ref(),
                        )?;
                        CelContent::Image(image)
                    }
                    CelContent::Linked(frame) => CelContent::Linked(frame),
                    CelContent::Tilemap(tilemap) => CelContent::Tilemap(tilemap),
                };
                resolved.push(Some(RawCel {
                    data: cel_data,
                    content,
                    user_data,
                }));
            }
            data.push(resolved);
        }
        Ok(CelsData { data })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageSize {
    pub width: u16,
    pub height: u16,
}

impl ImageSize {
    pub(crate) fn parse(reader: &mut AseReader) -> Result<Self> {
        let width = reader.word()?;
        let height = reader.word()?;
        Ok(Self { width, height })
    }

    pub(crate) fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

// CelCommon holds fields which are common to all cel types.
#[derive(Debug, Clone)]
pub(crate) struct CelCommon {
    pub layer_index: u16,
    pub x: i16,
    pub y: i16,
    pub opacity: u8,
    pub z_index: i16,
}

impl CelCommon {
    // Returns the cel type alongside the common fields.
    fn parse(reader: &mut AseReader) -> Result<(Self, u16)> {
        let layer_index = reader.word()?;
        let x = reader.short()?;
        let y = reader.short()?;
        let opacity = reader.byte()?;
        let cel_type = reader.word()?;
        let z_index = reader.short()?;
        reader.skip_reserved(5)?;
        Ok((
            Self {
                layer_index,
                x,
                y,
                opacity,
                z_index,
            },
            cel_type,
        ))
    }
}

pub(crate) struct ImageContent {
    pub size: ImageSize,
    pub pixels: Pixels,
}

impl fmt::Debug for ImageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}x{}, {} bytes>",
            self.size.width,
            self.size.height,
            self.pixels.byte_count()
        )
    }
}

// CelContent holds data specific to each type of cel. `I` is the image
// representation: raw pixels while parsing, RGBA images afterwards.
#[derive(Debug)]
pub(crate) enum CelContent<I = RgbaImage> {
    Image(I),
    Linked(u16),
    Tilemap(TilemapData),
}

#[derive(Debug)]
pub(crate) struct RawCel<I = RgbaImage> {
    pub data: CelCommon,
    pub content: CelContent<I>,
    pub user_data: Option<UserData>,
}

fn parse_raw_cel(mut reader: AseReader, pixel_format: PixelFormat) -> Result<ImageContent> {
    let size = ImageSize::parse(&mut reader)?;
    Pixels::from_raw(reader, pixel_format, size.pixel_count())
        .map(|pixels| ImageContent { size, pixels })
}

fn parse_compressed_cel(mut reader: AseReader, pixel_format: PixelFormat) -> Result<ImageContent> {
    let size = ImageSize::parse(&mut reader)?;
    Pixels::from_compressed(reader, pixel_format, size.pixel_count())
        .map(|pixels| ImageContent { size, pixels })
}

pub(crate) fn parse_chunk(
    data: &[u8],
    base: u64,
    pixel_format: PixelFormat,
) -> Result<RawCel<ImageContent>> {
    let mut reader = AseReader::at(data, base);
    let (common, cel_type) = CelCommon::parse(&mut reader)?;

    let content = match cel_type {
        0 => parse_raw_cel(reader, pixel_format).map(CelContent::Image)?,
        1 => reader.word().map(CelContent::Linked)?,
        2 => parse_compressed_cel(reader, pixel_format).map(CelContent::Image)?,
        3 => TilemapData::parse_chunk(reader).map(CelContent::Tilemap)?,
        _ => {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Invalid/Unsupported Cel type: {}",
                cel_type
            )))
        }
    };
    Ok(RawCel {
        data: common,
        content,
        user_data: None,
    })
}
