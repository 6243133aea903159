use crate::ProcessError;
use image::RgbaImage;
use log::trace;

/// Largest width or height of a generated atlas.
pub const MAX_ATLAS_DIMENSION: u32 = 16384;

/// Where an image ended up in the atlas. Does not include inner padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left edge in atlas pixels.
    pub x: u32,
    /// Top edge in atlas pixels.
    pub y: u32,
    /// Width of the placed image.
    pub width: u32,
    /// Height of the placed image.
    pub height: u32,
}

/// A packed texture and the location of every input image in it.
#[derive(Debug, Clone)]
pub struct Atlas {
    /// The packed texture.
    pub image: RgbaImage,
    /// One entry per input image, in input order.
    pub placements: Vec<Placement>,
}

/// Packs images into rows of a single texture.
///
/// Images are placed in input order from left to right. A row ends when the
/// next image would cross the target width, which is chosen so that equally
/// sized images form a square-ish grid of `ceil(sqrt(n))` columns, capped
/// at [MAX_ATLAS_DIMENSION]. Packing fails only when an image does not fit
/// on its own or the rows run past the maximum height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtlasPacker {
    border_padding: u32,
    spacing: u32,
    inner_padding: u32,
}

impl AtlasPacker {
    /// `border_padding` surrounds the whole atlas, `spacing` separates
    /// neighbouring images and `inner_padding` is transparent space added
    /// around each image.
    pub fn new(border_padding: u32, spacing: u32, inner_padding: u32) -> Self {
        AtlasPacker {
            border_padding,
            spacing,
            inner_padding,
        }
    }

    /// Pack `images` into one texture.
    pub fn pack(&self, images: &[RgbaImage]) -> Result<Atlas, ProcessError> {
        let border = self.border_padding as u64;
        let spacing = self.spacing as u64;
        let inner = self.inner_padding as u64;
        let max = MAX_ATLAS_DIMENSION as u64;

        if images.is_empty() {
            let side = 2 * border;
            check_size(side, side)?;
            return Ok(Atlas {
                image: RgbaImage::new(side as u32, side as u32),
                placements: Vec::new(),
            });
        }

        let footprints = images
            .iter()
            .enumerate()
            .map(|(idx, image)| {
                let w = image.width() as u64 + 2 * inner;
                let h = image.height() as u64 + 2 * inner;
                if w + 2 * border > max || h + 2 * border > max {
                    return Err(ProcessError::Packing(format!(
                        "Image {} ({}x{}) does not fit into a {}x{} atlas",
                        idx,
                        image.width(),
                        image.height(),
                        MAX_ATLAS_DIMENSION,
                        MAX_ATLAS_DIMENSION
                    )));
                }
                Ok((w, h))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let columns = grid_columns(footprints.len() as u64);
        let widest = footprints.iter().map(|&(w, _)| w).max().unwrap_or(0);
        // Rows never grow past the atlas limit. `widest` already fits.
        let target_width = (columns * widest + (columns - 1) * spacing)
            .min(max - 2 * border)
            .max(widest);

        let mut positions = Vec::with_capacity(footprints.len());
        let (mut cursor_x, mut cursor_y, mut row_height) = (0u64, 0u64, 0u64);
        let mut row_is_empty = true;
        for &(w, h) in &footprints {
            if !row_is_empty && cursor_x + w > target_width {
                cursor_y += row_height + spacing;
                cursor_x = 0;
                row_height = 0;
            }
            positions.push((cursor_x, cursor_y));
            cursor_x += w + spacing;
            row_height = row_height.max(h);
            row_is_empty = false;
        }

        let right = positions
            .iter()
            .zip(&footprints)
            .map(|(&(x, _), &(w, _))| x + w)
            .max()
            .unwrap_or(0);
        let bottom = positions
            .iter()
            .zip(&footprints)
            .map(|(&(_, y), &(_, h))| y + h)
            .max()
            .unwrap_or(0);
        let width = right + 2 * border;
        let height = bottom + 2 * border;
        check_size(width, height)?;

        let mut atlas = RgbaImage::new(width as u32, height as u32);
        let mut placements = Vec::with_capacity(images.len());
        for (image, &(x, y)) in images.iter().zip(&positions) {
            let left = (border + x + inner) as u32;
            let top = (border + y + inner) as u32;
            for (px, py, pixel) in image.enumerate_pixels() {
                atlas.put_pixel(left + px, top + py, *pixel);
            }
            placements.push(Placement {
                x: left,
                y: top,
                width: image.width(),
                height: image.height(),
            });
        }

        trace!(
            "Packed {} images into a {}x{} atlas",
            images.len(),
            width,
            height
        );
        Ok(Atlas {
            image: atlas,
            placements,
        })
    }
}

fn check_size(width: u64, height: u64) -> Result<(), ProcessError> {
    let max = MAX_ATLAS_DIMENSION as u64;
    if width > max || height > max {
        return Err(ProcessError::Packing(format!(
            "Atlas of {}x{} exceeds the maximum of {}x{}",
            width, height, MAX_ATLAS_DIMENSION, MAX_ATLAS_DIMENSION
        )));
    }
    Ok(())
}

// Smallest c with c * c >= n.
fn grid_columns(n: u64) -> u64 {
    let mut columns = (n as f64).sqrt().ceil() as u64;
    while columns * columns < n {
        columns += 1;
    }
    while columns > 1 && (columns - 1) * (columns - 1) >= n {
        columns -= 1;
    }
    columns.max(1)
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgba;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn filled(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    fn random_images(seed: u64, count: usize) -> Vec<RgbaImage> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let w = (rng.gen::<u8>() % 24) as u32 + 1;
                let h = (rng.gen::<u8>() % 24) as u32 + 1;
                filled(w, h, [rng.gen(), rng.gen(), rng.gen(), 255])
            })
            .collect()
    }

    #[test]
    fn columns_are_ceil_sqrt() {
        assert_eq!(grid_columns(1), 1);
        assert_eq!(grid_columns(2), 2);
        assert_eq!(grid_columns(4), 2);
        assert_eq!(grid_columns(5), 3);
        assert_eq!(grid_columns(9), 3);
        assert_eq!(grid_columns(10), 4);
    }

    #[test]
    fn single_image_with_border_and_spacing() {
        let red = filled(16, 16, [255, 0, 0, 255]);
        let atlas = AtlasPacker::new(1, 1, 0).pack(&[red]).unwrap();
        assert_eq!(atlas.image.dimensions(), (18, 18));
        assert_eq!(
            atlas.placements,
            vec![Placement {
                x: 1,
                y: 1,
                width: 16,
                height: 16
            }]
        );
        assert_eq!(*atlas.image.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*atlas.image.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*atlas.image.get_pixel(16, 16), Rgba([255, 0, 0, 255]));
        assert_eq!(*atlas.image.get_pixel(17, 17), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn equal_images_form_grid() {
        let images: Vec<_> = (0..4).map(|i| filled(8, 8, [i, 0, 0, 255])).collect();
        let atlas = AtlasPacker::new(0, 2, 0).pack(&images).unwrap();
        assert_eq!(atlas.image.dimensions(), (18, 18));
        let origins: Vec<_> = atlas.placements.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(origins, vec![(0, 0), (10, 0), (0, 10), (10, 10)]);
    }

    #[test]
    fn inner_padding_is_excluded_from_placement() {
        let images = vec![filled(4, 4, [1, 1, 1, 255]), filled(4, 4, [2, 2, 2, 255])];
        let atlas = AtlasPacker::new(0, 0, 1).pack(&images).unwrap();
        assert_eq!(atlas.image.dimensions(), (12, 6));
        assert_eq!(
            atlas.placements[1],
            Placement {
                x: 7,
                y: 1,
                width: 4,
                height: 4
            }
        );
        assert_eq!(*atlas.image.get_pixel(6, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*atlas.image.get_pixel(7, 1), Rgba([2, 2, 2, 255]));
    }

    #[test]
    fn empty_input_is_border_square() {
        let atlas = AtlasPacker::new(3, 5, 7).pack(&[]).unwrap();
        assert_eq!(atlas.image.dimensions(), (6, 6));
        assert!(atlas.placements.is_empty());
    }

    #[test]
    fn oversized_image_fails() {
        let wide = RgbaImage::new(MAX_ATLAS_DIMENSION, 1);
        let err = AtlasPacker::new(1, 0, 0).pack(&[wide]).unwrap_err();
        assert!(matches!(err, ProcessError::Packing(_)));

        let exact = RgbaImage::new(MAX_ATLAS_DIMENSION, 1);
        assert!(AtlasPacker::new(0, 0, 0).pack(&[exact]).is_ok());
    }

    #[test]
    fn wide_rows_wrap_at_the_size_limit() {
        let images: Vec<_> = (0..300).map(|_| filled(1000, 1, [9, 9, 9, 255])).collect();
        let atlas = AtlasPacker::new(0, 0, 0).pack(&images).unwrap();
        assert_eq!(atlas.image.dimensions(), (16000, 19));
        assert_eq!((atlas.placements[15].x, atlas.placements[15].y), (15000, 0));
        assert_eq!((atlas.placements[16].x, atlas.placements[16].y), (0, 1));

        let bordered = AtlasPacker::new(100, 0, 0).pack(&images).unwrap();
        assert_eq!(bordered.image.dimensions(), (16200, 219));
    }

    #[test]
    fn placements_never_overlap() {
        for seed in 0..8 {
            let images = random_images(seed, 1 + seed as usize * 5);
            let (border, spacing, inner) = (2, 1, 1);
            let atlas = AtlasPacker::new(border, spacing, inner)
                .pack(&images)
                .unwrap();
            let (atlas_w, atlas_h) = atlas.image.dimensions();
            let footprints: Vec<_> = atlas
                .placements
                .iter()
                .map(|p| {
                    (
                        p.x - inner,
                        p.y - inner,
                        p.x + p.width + inner,
                        p.y + p.height + inner,
                    )
                })
                .collect();
            for (i, a) in footprints.iter().enumerate() {
                assert!(a.0 >= border && a.1 >= border);
                assert!(a.2 <= atlas_w - border && a.3 <= atlas_h - border);
                for b in &footprints[i + 1..] {
                    let disjoint = a.2 <= b.0 || b.2 <= a.0 || a.3 <= b.1 || b.3 <= a.1;
                    assert!(disjoint, "{:?} overlaps {:?}", a, b);
                }
            }
            for (image, p) in images.iter().zip(&atlas.placements) {
                assert_eq!((p.width, p.height), image.dimensions());
                assert_eq!(atlas.image.get_pixel(p.x, p.y), image.get_pixel(0, 0));
            }
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let images = random_images(42, 17);
        let packer = AtlasPacker::new(1, 2, 0);
        let a = packer.pack(&images).unwrap();
        let b = packer.pack(&images).unwrap();
        assert_eq!(a.placements, b.placements);
        assert_eq!(a.image, b.image);
    }
}
