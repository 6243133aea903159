use crate::{
    cel::{self, CelId, CelsData, ImageContent},
    layer::{self, LayerChunkContext, LayerData},
    palette::ColorPalette,
    pixel::IndexResolver,
    reader::AseReader,
    slice::{self, Slice},
    tags,
    tileset::{Tileset, TilesetChunk, Tilesets},
    user_data::{self, UserData},
    AsepriteFile, AsepriteParseError, PixelFormat, Result, Tag,
};
use log::{debug, trace};

const HEADER_SIZE: usize = 128;
const HEADER_MAGIC: u16 = 0xA5E0;
const FRAME_MAGIC: u16 = 0xF1FA;
const FRAME_HEADER_SIZE: u64 = 16;
const CHUNK_HEADER_SIZE: u64 = 6;

// Header flags
const LAYER_OPACITY_VALID: u32 = 1;
const LAYERS_HAVE_UUID: u32 = 4;

// Collects chunk contents while the frames are read.
struct ParseInfo {
    palette: Option<ColorPalette>,
    old_palette: Option<ColorPalette>,
    layers: Vec<LayerData>,
    framedata: CelsData<ImageContent>,
    frame_times: Vec<u16>,
    tags: Option<Vec<Tag>>,
    tilesets: Vec<TilesetChunk>,
    sprite_user_data: Option<UserData>,
    user_data_context: Option<UserDataContext>,
    slices: Vec<Slice>,
}

impl ParseInfo {
    fn new(num_frames: u16, default_frame_time: u16) -> Self {
        Self {
            palette: None,
            old_palette: None,
            layers: Vec::new(),
            framedata: CelsData::new(num_frames as u32),
            frame_times: vec![default_frame_time; num_frames as usize],
            tags: None,
            tilesets: Vec::new(),
            sprite_user_data: None,
            user_data_context: None,
            slices: Vec::new(),
        }
    }

    fn add_cel(&mut self, frame_id: u16, cel: cel::RawCel<ImageContent>) -> Result<()> {
        let cel_id = CelId {
            frame: frame_id,
            layer: cel.data.layer_index,
        };
        self.framedata.add_cel(frame_id, cel)?;
        self.user_data_context = Some(UserDataContext::CelId(cel_id));
        Ok(())
    }

    fn add_layer(&mut self, layer_data: LayerData) {
        let idx = self.layers.len();
        self.layers.push(layer_data);
        self.user_data_context = Some(UserDataContext::LayerIndex(idx as u32));
    }

    fn add_tags(&mut self, tags: Vec<Tag>) {
        self.tags = Some(tags);
        self.user_data_context = Some(UserDataContext::TagIndex(0));
    }

    fn add_slice(&mut self, slice: Slice) {
        let idx = self.slices.len();
        self.slices.push(slice);
        self.user_data_context = Some(UserDataContext::SliceIndex(idx as u32));
    }

    fn add_tileset(&mut self, tileset: TilesetChunk) {
        let idx = self.tilesets.len();
        self.tilesets.push(tileset);
        self.user_data_context = Some(UserDataContext::TilesetIndex(idx as u32));
    }

    fn add_user_data(&mut self, user_data: UserData) {
        let context = match self.user_data_context {
            Some(context) => context,
            None => {
                debug!("Ignoring user data chunk without a preceding chunk");
                return;
            }
        };
        match context {
            UserDataContext::CelId(cel_id) => {
                if let Some(cel) = self.framedata.cel_mut(cel_id) {
                    cel.user_data = Some(user_data);
                }
            }
            UserDataContext::LayerIndex(idx) => {
                if let Some(layer) = self.layers.get_mut(idx as usize) {
                    layer.user_data = Some(user_data);
                }
            }
            UserDataContext::Sprite => {
                self.sprite_user_data = Some(user_data);
            }
            UserDataContext::TagIndex(idx) => {
                let tag = self
                    .tags
                    .as_mut()
                    .and_then(|tags| tags.get_mut(idx as usize));
                match tag {
                    Some(tag) => {
                        tag.set_user_data(user_data);
                        self.user_data_context = Some(UserDataContext::TagIndex(idx + 1));
                    }
                    None => debug!("Ignoring user data after the last tag"),
                }
            }
            UserDataContext::SliceIndex(idx) => {
                if let Some(slice) = self.slices.get_mut(idx as usize) {
                    slice.user_data = Some(user_data);
                }
            }
            UserDataContext::TilesetIndex(idx) => {
                if let Some(tileset) = self.tilesets.get_mut(idx as usize) {
                    tileset.user_data = Some(user_data);
                }
                self.user_data_context = Some(UserDataContext::TilesetTiles);
            }
            UserDataContext::TilesetTiles => {
                debug!("Ignoring user data of a single tile");
            }
        }
    }

    fn finish(
        self,
        num_frames: u16,
        width: u16,
        height: u16,
        pixel_format: PixelFormat,
    ) -> Result<AsepriteFile> {
        if self.layers.is_empty() {
            return Err(AsepriteParseError::InvalidInput("No layers found".to_owned()));
        }
        let layers = layer::collect_layers(self.layers)?;

        let palette = self.palette.or(self.old_palette);
        if let (PixelFormat::Indexed { .. }, None) = (pixel_format, &palette) {
            return Err(AsepriteParseError::InvalidInput(
                "Input file uses indexed color mode but does not contain a palette".into(),
            ));
        }

        let tileset_resolver = match (pixel_format, &palette) {
            (
                PixelFormat::Indexed {
                    transparent_color_index,
                },
                Some(palette),
            ) => Some(IndexResolver {
                palette,
                transparent_color_index,
                layer_is_background: false,
            }),
            _ => None,
        };
        let tilesets = self
            .tilesets
            .into_iter()
            .map(|t| t.resolve(tileset_resolver.as_ref()))
            .collect::<Result<Vec<Tileset>>>()?;
        let tilesets = Tilesets::new(tilesets)?;
        layers.validate(&tilesets)?;

        self.framedata.validate(&layers)?;
        let framedata = self
            .framedata
            .resolve(&layers, pixel_format, palette.as_ref())?;

        let tags = self.tags.unwrap_or_default();
        for tag in &tags {
            if tag.to_frame() >= num_frames as u32 {
                return Err(AsepriteParseError::InvalidInput(format!(
                    "Tag '{}' ends at frame {} but the file has {} frames",
                    tag.name(),
                    tag.to_frame(),
                    num_frames
                )));
            }
        }

        Ok(AsepriteFile {
            width,
            height,
            num_frames,
            pixel_format,
            palette,
            layers,
            frame_times: self.frame_times,
            tags,
            framedata,
            tilesets,
            sprite_user_data: self.sprite_user_data,
            slices: self.slices,
        })
    }
}

// file format docs: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md
// v1.3 spec diff doc: https://gist.github.com/dacap/35f3b54fbcd021d099e0166a4f295bab
pub(crate) fn read_aseprite(data: &[u8]) -> Result<AsepriteFile> {
    let mut reader = AseReader::new(data);
    if data.len() < HEADER_SIZE {
        return Err(AsepriteParseError::TruncatedInput {
            offset: 0,
            wanted: HEADER_SIZE,
        });
    }
    let size = reader.dword()?;
    let magic_number = reader.word()?;
    if magic_number != HEADER_MAGIC {
        return Err(AsepriteParseError::InvalidHeader(format!(
            "Invalid magic number for header: {:x} != {:x}",
            magic_number, HEADER_MAGIC
        )));
    }
    if size as usize > data.len() {
        return Err(AsepriteParseError::TruncatedInput {
            offset: data.len() as u64,
            wanted: size as usize - data.len(),
        });
    }

    let num_frames = reader.word()?;
    let width = reader.word()?;
    let height = reader.word()?;
    let color_depth = reader.word()?;
    let flags = reader.dword()?;
    let default_frame_time = reader.word()?;
    let _placeholder1 = reader.dword()?;
    let _placeholder2 = reader.dword()?;
    let transparent_color_index = reader.byte()?;
    reader.skip_reserved(3)?;
    let _num_colors = reader.word()?;
    let pixel_width = reader.byte()?;
    let pixel_height = reader.byte()?;
    let _grid_x = reader.short()?;
    let _grid_y = reader.short()?;
    let _grid_width = reader.word()?;
    let _grid_height = reader.word()?;
    reader.skip_reserved(84)?;

    // Zero means the ratio was never set, which Aseprite reads as 1:1.
    let square = |p: u8| p == 0 || p == 1;
    if !(square(pixel_width) && square(pixel_height) && pixel_width == pixel_height) {
        return Err(AsepriteParseError::UnsupportedFeature(format!(
            "Only pixel width:height ratio of 1:1 supported, got {}:{}",
            pixel_width, pixel_height
        )));
    }

    let pixel_format = parse_pixel_format(color_depth, transparent_color_index)?;
    let layer_context = LayerChunkContext {
        opacity_valid: flags & LAYER_OPACITY_VALID != 0,
        has_uuid: flags & LAYERS_HAVE_UUID != 0,
    };

    let mut parse_info = ParseInfo::new(num_frames, default_frame_time);
    for frame_id in 0..num_frames {
        parse_frame(
            &mut reader,
            frame_id,
            pixel_format,
            layer_context,
            &mut parse_info,
        )?;
    }

    parse_info.finish(num_frames, width, height, pixel_format)
}

fn parse_frame(
    reader: &mut AseReader,
    frame_id: u16,
    pixel_format: PixelFormat,
    layer_context: LayerChunkContext,
    parse_info: &mut ParseInfo,
) -> Result<()> {
    let frame_start = reader.position();
    let num_bytes = reader.dword()? as u64;
    let magic_number = reader.word()?;
    if magic_number != FRAME_MAGIC {
        return Err(AsepriteParseError::InvalidHeader(format!(
            "Invalid magic number for frame {} at offset {}: {:x} != {:x}",
            frame_id, frame_start, magic_number, FRAME_MAGIC
        )));
    }
    let old_num_chunks = reader.word()?;
    let frame_duration_ms = reader.word()?;
    reader.skip_reserved(2)?;
    let new_num_chunks = reader.dword()?;

    if num_bytes < FRAME_HEADER_SIZE {
        return Err(AsepriteParseError::InvalidInput(format!(
            "Frame {} is too small: {} bytes",
            frame_id, num_bytes
        )));
    }
    parse_info.frame_times[frame_id as usize] = frame_duration_ms;

    let num_chunks = if new_num_chunks == 0 {
        old_num_chunks as u32
    } else {
        new_num_chunks
    };
    let frame_end = frame_start + num_bytes;

    for _ in 0..num_chunks {
        let chunk_start = reader.position();
        let chunk_size = reader.dword()? as u64;
        let chunk_type = reader.word()?;
        check_chunk_bytes(chunk_start, chunk_size, frame_end)?;
        let data = reader.bytes((chunk_size - CHUNK_HEADER_SIZE) as usize)?;
        let base = chunk_start + CHUNK_HEADER_SIZE;
        parse_chunk(
            chunk_type,
            chunk_start,
            data,
            base,
            frame_id,
            pixel_format,
            layer_context,
            parse_info,
        )?;
    }

    let position = reader.position();
    if position < frame_end {
        debug!(
            "Skipping {} unused bytes at the end of frame {}",
            frame_end - position,
            frame_id
        );
        reader.skip_reserved((frame_end - position) as usize)?;
    }
    trace!("Decoded frame {} with {} chunks", frame_id, num_chunks);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn parse_chunk(
    chunk_type: u16,
    chunk_start: u64,
    data: &[u8],
    base: u64,
    frame_id: u16,
    pixel_format: PixelFormat,
    layer_context: LayerChunkContext,
    parse_info: &mut ParseInfo,
) -> Result<()> {
    match chunk_type {
        0x0004 | 0x0011 => {
            if parse_info.palette.is_none() && parse_info.old_palette.is_none() {
                let six_bit = chunk_type == 0x0011;
                parse_info.old_palette = Some(ColorPalette::from_old_chunk(data, base, six_bit)?);
            }
            // The sprite's user data follows the first palette chunk.
            parse_info.user_data_context = Some(UserDataContext::Sprite);
        }
        0x2019 => {
            parse_info
                .palette
                .get_or_insert_with(ColorPalette::default)
                .apply_chunk(data, base)?;
            parse_info.user_data_context = Some(UserDataContext::Sprite);
        }
        0x2004 => {
            let layer_data = layer::parse_chunk(data, base, layer_context)?;
            parse_info.add_layer(layer_data);
        }
        0x2005 => {
            let cel = cel::parse_chunk(data, base, pixel_format)?;
            parse_info.add_cel(frame_id, cel)?;
        }
        0x2018 => {
            let tags = tags::parse_chunk(data, base)?;
            if frame_id == 0 {
                parse_info.add_tags(tags);
            } else {
                debug!("Ignoring tags outside of frame 0");
            }
        }
        0x2020 => {
            let user_data = user_data::parse_chunk(data, base)?;
            parse_info.add_user_data(user_data);
        }
        0x2022 => {
            let slice = slice::parse_chunk(data, base)?;
            parse_info.add_slice(slice);
        }
        0x2023 => {
            let tileset = TilesetChunk::parse_chunk(data, base, pixel_format)?;
            parse_info.add_tileset(tileset);
        }
        0x2006 | 0x2007 | 0x2008 | 0x2016 | 0x2017 => {
            debug!(
                "Ignoring chunk type 0x{:04x} at offset {}",
                chunk_type, chunk_start
            );
        }
        _ => {
            return Err(AsepriteParseError::UnsupportedChunk {
                chunk_type,
                offset: chunk_start,
            })
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum UserDataContext {
    CelId(CelId),
    LayerIndex(u32),
    Sprite,
    TagIndex(u16),
    SliceIndex(u32),
    TilesetIndex(u32),
    TilesetTiles,
}

fn check_chunk_bytes(chunk_start: u64, chunk_size: u64, frame_end: u64) -> Result<()> {
    if chunk_size < CHUNK_HEADER_SIZE {
        return Err(AsepriteParseError::InvalidInput(format!(
            "Chunk size is too small {}, minimum_size: {}",
            chunk_size, CHUNK_HEADER_SIZE
        )));
    }
    if chunk_start + chunk_size > frame_end {
        return Err(AsepriteParseError::InvalidInput(format!(
            "Chunk at offset {} of size {} extends past the end of its frame at {}",
            chunk_start, chunk_size, frame_end
        )));
    }
    Ok(())
}

fn parse_pixel_format(color_depth: u16, transparent_color_index: u8) -> Result<PixelFormat> {
    match color_depth {
        8 => Ok(PixelFormat::Indexed {
            transparent_color_index,
        }),
        16 => Ok(PixelFormat::Grayscale),
        32 => Ok(PixelFormat::Rgba),
        _ => Err(AsepriteParseError::InvalidHeader(format!(
            "Unknown pixel format. Color depth: {}",
            color_depth
        ))),
    }
}
