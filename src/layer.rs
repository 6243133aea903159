use crate::{
    reader::AseReader, tileset::TilesetId, user_data::UserData, AsepriteFile, AsepriteParseError,
    Cel, Result, Tilesets,
};
use bitflags::bitflags;
use std::ops::Index;

/// Types of layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    /// A regular image layer. This is the normal layer type.
    Image,
    /// A layer that groups other layers and does not contain any image data.
    /// In Aseprite these are represented by a folder icon.
    Group,
    /// A tilemap layer. Contains a [TilesetId] which references a [Tileset](crate::Tileset).
    Tilemap(TilesetId),
}

bitflags! {
    /// Layer flags as stored in the file.
    pub struct LayerFlags: u32 {
        /// Layer is visible (eye icon is enabled).
        const VISIBLE = 0x0001;
        /// Layer can be modified (lock icon is disabled).
        const EDITABLE = 0x0002;
        /// Layer cannot be moved.
        const MOVEMENT_LOCKED = 0x0004;
        /// Layer is background (stack order cannot be changed).
        const BACKGROUND = 0x0008;
        /// Prefer to link cels when the user copies them.
        const CONTINUOUS = 0x0010;
        /// Prefer to show this group layer collapsed.
        const COLLAPSED = 0x0020;
        /// This is a reference layer.
        const REFERENCE = 0x0040;

        /// Combination Aseprite uses for the background layer.
        const BACKGROUND_LAYER = Self::MOVEMENT_LOCKED.bits | Self::BACKGROUND.bits;
    }
}

impl LayerFlags {
    /// Shortcut for `.contains(LayerFlags::VISIBLE)`.
    pub fn is_visible(&self) -> bool {
        self.contains(LayerFlags::VISIBLE)
    }

    /// Shortcut for `.contains(LayerFlags::BACKGROUND)`.
    pub fn is_background(&self) -> bool {
        self.contains(LayerFlags::BACKGROUND)
    }
}

/// A reference to a single layer.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub(crate) file: &'a AsepriteFile,
    pub(crate) layer_id: u32,
}

impl<'a> Layer<'a> {
    fn data(&self) -> &'a LayerData {
        &self.file.layers[self.layer_id]
    }

    /// This layer's ID.
    pub fn id(&self) -> u32 {
        self.layer_id
    }

    /// Layer's flags
    pub fn flags(&self) -> LayerFlags {
        self.data().flags
    }

    /// Name of the layer
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Blend mode of the layer. Describes how this layer is combined with the
    /// layers underneath it. See [BlendMode] for details.
    pub fn blend_mode(&self) -> BlendMode {
        self.data().blend_mode
    }

    /// Layer opacity. 255 when the file does not store valid layer opacity.
    pub fn opacity(&self) -> u8 {
        self.data().opacity
    }

    /// Describes whether this is a regular, group or tilemap layer.
    pub fn layer_type(&self) -> LayerType {
        self.data().layer_type
    }

    /// The parent of this layer, if any. For layers that are part of a group
    /// this returns the parent layer.
    ///
    /// Does not indicate the blend order of layers (i.e., which layers are
    /// above or below).
    pub fn parent(&self) -> Option<Layer<'a>> {
        self.file.layers.parents[self.layer_id as usize].map(|id| Layer {
            file: self.file,
            layer_id: id,
        })
    }

    /// Returns if this layer is visible. This requires that this layer and all
    /// of its parent layers are visible.
    pub fn is_visible(&self) -> bool {
        let layer_is_visible = self.data().flags.is_visible();
        let parent_is_visible = self.parent().map(|p| p.is_visible()).unwrap_or(true);
        layer_is_visible && parent_is_visible
    }

    /// Returns `true` for the background layer.
    pub fn is_background(&self) -> bool {
        self.data().flags.is_background()
    }

    /// Opacity of this layer combined with the opacity of all its parent
    /// groups.
    pub fn effective_opacity(&self) -> u8 {
        let parent_opacity = self.parent().map(|p| p.effective_opacity()).unwrap_or(255);
        crate::blend::mul_un8(self.opacity() as i32, parent_opacity as i32)
    }

    /// The layer's user data, if any is present.
    pub fn user_data(&self) -> Option<&'a UserData> {
        self.data().user_data.as_ref()
    }

    /// Get a reference to the Cel for this frame in the layer.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is not less than the number of frames.
    pub fn frame(&self, frame_id: u32) -> Cel<'a> {
        self.file.cel(frame_id, self.layer_id)
    }
}

#[derive(Debug)]
pub(crate) struct LayerData {
    pub(crate) flags: LayerFlags,
    pub(crate) name: String,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) layer_type: LayerType,
    pub(crate) user_data: Option<UserData>,
    child_level: u16,
}

#[derive(Debug, Default)]
pub(crate) struct LayersData {
    // Sorted back to front (or bottom to top in the GUI, but groups occur
    // before their children, i.e., lower index)
    pub(crate) layers: Vec<LayerData>,
    parents: Vec<Option<u32>>,
}

impl Index<u32> for LayersData {
    type Output = LayerData;

    fn index(&self, index: u32) -> &Self::Output {
        &self.layers[index as usize]
    }
}

impl LayersData {
    pub(crate) fn num_layers(&self) -> u32 {
        self.layers.len() as u32
    }

    pub(crate) fn validate(&self, tilesets: &Tilesets) -> Result<()> {
        for layer in &self.layers {
            if let LayerType::Tilemap(tileset_id) = layer.layer_type {
                if tilesets.get(tileset_id).is_none() {
                    return Err(AsepriteParseError::InvalidInput(format!(
                        "Tilemap layer '{}' references missing tileset {}",
                        layer.name,
                        tileset_id.value()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Describes how the pixels of a layer are combined with the pixels below.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

// Header flags that change how a layer chunk is read.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LayerChunkContext {
    pub opacity_valid: bool,
    pub has_uuid: bool,
}

pub(crate) fn parse_chunk(data: &[u8], base: u64, context: LayerChunkContext) -> Result<LayerData> {
    let mut reader = AseReader::at(data, base);

    let flags = reader.word()?;
    let layer_type = reader.word()?;
    let child_level = reader.word()?;
    let _default_width = reader.word()?;
    let _default_height = reader.word()?;
    let blend_mode = reader.word()?;
    let opacity = reader.byte()?;
    reader.skip_reserved(3)?;
    let name = reader.string()?;

    let layer_type = match layer_type {
        0 => LayerType::Image,
        1 => LayerType::Group,
        2 => LayerType::Tilemap(TilesetId::new(reader.dword()?)),
        _ => {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Invalid layer type: {}",
                layer_type
            )))
        }
    };
    if context.has_uuid {
        reader.skip_reserved(16)?;
    }

    let flags = LayerFlags::from_bits_truncate(flags as u32);
    let blend_mode = parse_blend_mode(blend_mode)?;
    let opacity = if context.opacity_valid { opacity } else { 255 };

    Ok(LayerData {
        name,
        flags,
        blend_mode,
        opacity,
        layer_type,
        user_data: None,
        child_level,
    })
}

fn parse_blend_mode(id: u16) -> Result<BlendMode> {
    match id {
        0 => Ok(BlendMode::Normal),
        1 => Ok(BlendMode::Multiply),
        2 => Ok(BlendMode::Screen),
        3 => Ok(BlendMode::Overlay),
        4 => Ok(BlendMode::Darken),
        5 => Ok(BlendMode::Lighten),
        6 => Ok(BlendMode::ColorDodge),
        7 => Ok(BlendMode::ColorBurn),
        8 => Ok(BlendMode::HardLight),
        9 => Ok(BlendMode::SoftLight),
        10 => Ok(BlendMode::Difference),
        11 => Ok(BlendMode::Exclusion),
        12 => Ok(BlendMode::Hue),
        13 => Ok(BlendMode::Saturation),
        14 => Ok(BlendMode::Color),
        15 => Ok(BlendMode::Luminosity),
        16 => Ok(BlendMode::Addition),
        17 => Ok(BlendMode::Subtract),
        18 => Ok(BlendMode::Divide),
        _ => Err(AsepriteParseError::InvalidInput(format!(
            "Invalid/Unsupported blend mode: {}",
            id
        ))),
    }
}

fn compute_parents(layers: &[LayerData]) -> Result<Vec<Option<u32>>> {
    let mut result = Vec::with_capacity(layers.len());

    for id in 0..layers.len() {
        let my_child_level = layers[id].child_level;
        let parent = if my_child_level == 0 {
            None
        } else {
            // Find first layer with a lower id and a lower child_level.
            let candidate = (0..id)
                .rev()
                .find(|&candidate| layers[candidate].child_level < my_child_level)
                .ok_or_else(|| {
                    AsepriteParseError::InvalidInput(format!(
                        "Layer '{}' has child level {} but no parent group",
                        layers[id].name, my_child_level
                    ))
                })?;
            if layers[candidate].layer_type != LayerType::Group {
                return Err(AsepriteParseError::InvalidInput(format!(
                    "Parent of layer '{}' is not a group layer",
                    layers[id].name
                )));
            }
            Some(candidate as u32)
        };
        result.push(parent);
    }
    Ok(result)
}

pub(crate) fn collect_layers(layers: Vec<LayerData>) -> Result<LayersData> {
    let parents = compute_parents(&layers)?;
    Ok(LayersData { layers, parents })
}

#[cfg(test)]
mod test {
    use super::*;

    fn layer(name: &str, layer_type: LayerType, child_level: u16) -> LayerData {
        LayerData {
            flags: LayerFlags::VISIBLE,
            name: name.to_owned(),
            blend_mode: BlendMode::Normal,
            opacity: 255,
            layer_type,
            user_data: None,
            child_level,
        }
    }

    #[test]
    fn parents_follow_child_levels() {
        let layers = vec![
            layer("group", LayerType::Group, 0),
            layer("inner group", LayerType::Group, 1),
            layer("deep", LayerType::Image, 2),
            layer("child", LayerType::Image, 1),
            layer("top", LayerType::Image, 0),
        ];
        let parents = compute_parents(&layers).unwrap();
        assert_eq!(parents, vec![None, Some(0), Some(1), Some(0), None]);
    }

    #[test]
    fn orphan_child_is_rejected() {
        let layers = vec![layer("child", LayerType::Image, 1)];
        assert!(compute_parents(&layers).is_err());
    }

    #[test]
    fn parse_tilemap_layer_with_uuid() {
        let mut data = vec![];
        data.extend_from_slice(&[0x01, 0x00]); // visible
        data.extend_from_slice(&[0x02, 0x00]); // tilemap
        data.extend_from_slice(&[0x00, 0x00]); // child level
        data.extend_from_slice(&[0; 4]); // default size
        data.extend_from_slice(&[0x01, 0x00]); // multiply
        data.push(100);
        data.extend_from_slice(&[0; 3]);
        data.extend_from_slice(&[0x02, 0x00, b'm', b'y']);
        data.extend_from_slice(&7_u32.to_le_bytes());
        data.extend_from_slice(&[0xab; 16]);

        let context = LayerChunkContext {
            opacity_valid: true,
            has_uuid: true,
        };
        let layer = parse_chunk(&data, 0, context).unwrap();
        assert_eq!(layer.name, "my");
        assert_eq!(layer.layer_type, LayerType::Tilemap(TilesetId::new(7)));
        assert_eq!(layer.blend_mode, BlendMode::Multiply);
        assert_eq!(layer.opacity, 100);

        let context = LayerChunkContext {
            opacity_valid: false,
            has_uuid: true,
        };
        assert_eq!(parse_chunk(&data, 0, context).unwrap().opacity, 255);
    }
}
