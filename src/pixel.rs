use crate::{reader::AseReader, AsepriteParseError, ColorPalette, PixelFormat, Result};
use image::RgbaImage;

// From Aseprite file spec:
// PIXEL: One pixel, depending on the image pixel format:
// Grayscale: BYTE[2], each pixel have 2 bytes in the order Value, Alpha.
// Indexed: BYTE, Each pixel uses 1 byte (the index).
// RGBA: BYTE[4], each pixel have 4 bytes in this order Red, Green, Blue, Alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pixels {
    Rgba(Vec<u8>),
    Grayscale(Vec<u8>),
    Indexed(Vec<u8>),
}

fn output_size(pixel_format: PixelFormat, expected_pixel_count: usize) -> usize {
    pixel_format.bytes_per_pixel() * expected_pixel_count
}

/// Everything needed to turn a palette index into a color.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexResolver<'a> {
    pub palette: &'a ColorPalette,
    pub transparent_color_index: u8,
    // Background layers have no transparency, so the transparent index is
    // drawn with its palette color there.
    pub layer_is_background: bool,
}

impl<'a> IndexResolver<'a> {
    fn resolve(&self, index: u8) -> Result<[u8; 4]> {
        let entry = self.palette.get(index as u32).ok_or_else(|| {
            AsepriteParseError::InvalidInput(format!(
                "Index out of range: {} (max: {})",
                index,
                self.palette.num_colors()
            ))
        })?;
        if index == self.transparent_color_index && !self.layer_is_background {
            Ok([0, 0, 0, 0])
        } else {
            Ok(entry.raw_rgba8())
        }
    }
}

impl Pixels {
    fn from_bytes(bytes: Vec<u8>, pixel_format: PixelFormat) -> Self {
        match pixel_format {
            PixelFormat::Rgba => Pixels::Rgba(bytes),
            PixelFormat::Grayscale => Pixels::Grayscale(bytes),
            PixelFormat::Indexed { .. } => Pixels::Indexed(bytes),
        }
    }

    pub(crate) fn from_raw(
        mut reader: AseReader,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_output_size = output_size(pixel_format, expected_pixel_count);
        let bytes = reader.bytes(expected_output_size)?;
        Ok(Self::from_bytes(bytes.to_vec(), pixel_format))
    }

    pub(crate) fn from_compressed(
        reader: AseReader,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_output_size = output_size(pixel_format, expected_pixel_count);
        reader
            .unzip(expected_output_size)
            .map(|bytes| Self::from_bytes(bytes, pixel_format))
    }

    pub(crate) fn from_compressed_block(
        reader: &mut AseReader,
        compressed_len: usize,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_output_size = output_size(pixel_format, expected_pixel_count);
        reader
            .unzip_block(compressed_len, expected_output_size)
            .map(|bytes| Self::from_bytes(bytes, pixel_format))
    }

    pub(crate) fn byte_count(&self) -> usize {
        match self {
            Pixels::Rgba(v) | Pixels::Grayscale(v) | Pixels::Indexed(v) => v.len(),
        }
    }

    /// Convert to an RGBA image of the given size. Indexed pixels require a
    /// resolver.
    pub(crate) fn into_rgba_image(
        self,
        width: u32,
        height: u32,
        resolver: Option<&IndexResolver>,
    ) -> Result<RgbaImage> {
        let rgba = match self {
            Pixels::Rgba(bytes) => bytes,
            Pixels::Grayscale(bytes) => bytes
                .chunks_exact(2)
                .flat_map(|ga| {
                    let (value, alpha) = (ga[0], ga[1]);
                    [value, value, value, alpha].to_vec()
                })
                .collect(),
            Pixels::Indexed(bytes) => {
                let resolver = resolver.ok_or_else(|| {
                    AsepriteParseError::InvalidInput(
                        "Input file uses indexed color mode but does not contain a palette".into(),
                    )
                })?;
                let mut rgba = Vec::with_capacity(bytes.len() * 4);
                for index in bytes {
                    rgba.extend_from_slice(&resolver.resolve(index)?);
                }
                rgba
            }
        };
        let actual = rgba.len();
        RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            AsepriteParseError::InvalidInput(format!(
                "Invalid data size for {}x{} image. Actual: {} bytes",
                width, height, actual
            ))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::palette::ColorPalette;

    #[test]
    fn grayscale_expands_to_rgba() {
        let pixels = Pixels::Grayscale(vec![10, 255, 200, 0]);
        let image = pixels.into_rgba_image(2, 1, None).unwrap();
        assert_eq!(image.as_raw(), &vec![10, 10, 10, 255, 200, 200, 200, 0]);
    }

    #[test]
    fn indexed_uses_transparent_index_outside_background() {
        let palette = ColorPalette::from_colors(&[[0, 0, 0, 255], [255, 0, 0, 255]]);
        let resolver = IndexResolver {
            palette: &palette,
            transparent_color_index: 0,
            layer_is_background: false,
        };
        let image = Pixels::Indexed(vec![0, 1])
            .into_rgba_image(2, 1, Some(&resolver))
            .unwrap();
        assert_eq!(image.as_raw(), &vec![0, 0, 0, 0, 255, 0, 0, 255]);

        let background = IndexResolver {
            layer_is_background: true,
            ..resolver
        };
        let image = Pixels::Indexed(vec![0, 1])
            .into_rgba_image(2, 1, Some(&background))
            .unwrap();
        assert_eq!(image.as_raw(), &vec![0, 0, 0, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn indexed_out_of_range_fails() {
        let palette = ColorPalette::from_colors(&[[0, 0, 0, 255]]);
        let resolver = IndexResolver {
            palette: &palette,
            transparent_color_index: 0,
            layer_is_background: false,
        };
        let result = Pixels::Indexed(vec![3]).into_rgba_image(1, 1, Some(&resolver));
        assert!(matches!(result, Err(AsepriteParseError::InvalidInput(_))));
    }

    #[test]
    fn wrong_size_is_rejected() {
        let result = Pixels::Rgba(vec![0; 12]).into_rgba_image(2, 2, None);
        assert!(result.is_err());
    }
}
