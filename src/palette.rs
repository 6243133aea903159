use crate::{reader::AseReader, AsepriteParseError, Result};

/// The color palette embedded in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorPalette {
    // Ordered by index. Entries the file never set stay transparent black.
    entries: Vec<ColorPaletteEntry>,
}

/// A single entry in a [ColorPalette].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPaletteEntry {
    id: u32,
    rgba8: [u8; 4],
    name: Option<String>,
}

impl ColorPalette {
    /// Build a palette from a list of RGBA colors. The color at position `i`
    /// gets index `i`.
    pub fn from_colors(colors: &[[u8; 4]]) -> Self {
        let entries = colors
            .iter()
            .enumerate()
            .map(|(id, rgba8)| ColorPaletteEntry {
                id: id as u32,
                rgba8: *rgba8,
                name: None,
            })
            .collect();
        ColorPalette { entries }
    }

    /// Total number of colors in the palette.
    pub fn num_colors(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Look up entry at given index.
    pub fn get(&self, index: u32) -> Option<&ColorPaletteEntry> {
        self.entries.get(index as usize)
    }

    /// All entries in index order.
    pub fn entries(&self) -> &[ColorPaletteEntry] {
        &self.entries
    }

    fn resize(&mut self, new_size: usize) {
        let start = self.entries.len() as u32;
        if new_size > self.entries.len() {
            self.entries
                .extend((start..new_size as u32).map(|id| ColorPaletteEntry {
                    id,
                    rgba8: [0, 0, 0, 0],
                    name: None,
                }));
        } else {
            self.entries.truncate(new_size);
        }
    }

    fn set(&mut self, id: u32, rgba8: [u8; 4], name: Option<String>) {
        if id as usize >= self.entries.len() {
            self.resize(id as usize + 1);
        }
        self.entries[id as usize] = ColorPaletteEntry { id, rgba8, name };
    }

    /// Apply a palette chunk (0x2019) on top of the current entries.
    pub(crate) fn apply_chunk(&mut self, data: &[u8], base: u64) -> Result<()> {
        let mut reader = AseReader::at(data, base);

        let num_total_entries = reader.dword()?;
        let first_color_index = reader.dword()?;
        let last_color_index = reader.dword()?;
        reader.skip_reserved(8)?;

        if last_color_index < first_color_index {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Bad palette color indices: first={} last={}",
                first_color_index, last_color_index,
            )));
        }
        if last_color_index >= num_total_entries {
            return Err(AsepriteParseError::InvalidInput(format!(
                "Palette index {} outside of palette size {}",
                last_color_index, num_total_entries
            )));
        }

        self.resize(num_total_entries as usize);
        for id in first_color_index..=last_color_index {
            let flags = reader.word()?;
            let red = reader.byte()?;
            let green = reader.byte()?;
            let blue = reader.byte()?;
            let alpha = reader.byte()?;
            let name = if flags & 1 == 1 {
                Some(reader.string()?)
            } else {
                None
            };
            self.set(id, [red, green, blue, alpha], name);
        }
        Ok(())
    }

    /// Build a palette from one of the deprecated palette chunks (0x0004 or
    /// 0x0011). The latter stores 6 bit color components.
    pub(crate) fn from_old_chunk(data: &[u8], base: u64, six_bit: bool) -> Result<Self> {
        let mut reader = AseReader::at(data, base);
        let mut palette = ColorPalette::default();

        let num_packets = reader.word()?;
        let mut index = 0_u32;
        for _ in 0..num_packets {
            index += reader.byte()? as u32;
            // 0 means 256 colors follow.
            let count = match reader.byte()? {
                0 => 256,
                n => n as u32,
            };
            for _ in 0..count {
                let mut rgb = [reader.byte()?, reader.byte()?, reader.byte()?];
                if six_bit {
                    for c in rgb.iter_mut() {
                        *c = ((*c as u32 * 255) / 63).min(255) as u8;
                    }
                }
                palette.set(index, [rgb[0], rgb[1], rgb[2], 255], None);
                index += 1;
            }
        }
        Ok(palette)
    }
}

impl ColorPaletteEntry {
    /// The id of this entry is the same as its index in the palette.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the RGBA components as an array. Most color libraries allow you to
    /// build an instance of their color type from such an array.
    pub fn raw_rgba8(&self) -> [u8; 4] {
        self.rgba8
    }

    /// Red component.
    pub fn red(&self) -> u8 {
        self.rgba8[0]
    }

    /// Green component.
    pub fn green(&self) -> u8 {
        self.rgba8[1]
    }

    /// Blue component.
    pub fn blue(&self) -> u8 {
        self.rgba8[2]
    }

    /// Alpha value of this color (0 = fully transparent, 255 = fully opaque).
    pub fn alpha(&self) -> u8 {
        self.rgba8[3]
    }

    /// Optional name given to the color in Aseprite.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn palette_chunk_sets_range() {
        // 4 entries total, set indices 1..=2, second one named.
        let mut data = vec![];
        data.extend_from_slice(&4_u32.to_le_bytes());
        data.extend_from_slice(&1_u32.to_le_bytes());
        data.extend_from_slice(&2_u32.to_le_bytes());
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&[0, 0, 10, 20, 30, 255]);
        data.extend_from_slice(&[1, 0, 40, 50, 60, 128, 3, 0, b'r', b'e', b'd']);

        let mut palette = ColorPalette::default();
        palette.apply_chunk(&data, 0).unwrap();
        assert_eq!(palette.num_colors(), 4);
        assert_eq!(palette.get(0).unwrap().raw_rgba8(), [0, 0, 0, 0]);
        assert_eq!(palette.get(1).unwrap().raw_rgba8(), [10, 20, 30, 255]);
        assert_eq!(palette.get(2).unwrap().alpha(), 128);
        assert_eq!(palette.get(2).unwrap().name(), Some("red"));
        assert!(palette.get(4).is_none());
    }

    #[test]
    fn old_palette_scales_six_bit_colors() {
        let data = [1, 0, 0, 2, 63, 0, 0, 0, 63, 32];
        let palette = ColorPalette::from_old_chunk(&data, 0, true).unwrap();
        assert_eq!(palette.num_colors(), 2);
        assert_eq!(palette.get(0).unwrap().raw_rgba8(), [255, 0, 0, 255]);
        assert_eq!(palette.get(1).unwrap().raw_rgba8(), [0, 255, 129, 255]);
    }
}
