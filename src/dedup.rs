use image::RgbaImage;
use log::trace;
use nohash::IntMap;
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// Result of [deduplicate].
#[derive(Debug, Clone, PartialEq)]
pub struct Deduplicated {
    /// Unique images in order of first occurrence.
    pub images: Vec<RgbaImage>,
    /// For every input image the index of its unique image.
    pub frame_to_image: Vec<usize>,
}

fn content_hash(image: &RgbaImage) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.dimensions().hash(&mut hasher);
    image.as_raw().hash(&mut hasher);
    hasher.finish()
}

fn same_pixels(a: &RgbaImage, b: &RgbaImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}

/// Collapse pixel-identical images.
///
/// With `merge_duplicates` off every image is kept and the mapping is the
/// identity.
pub fn deduplicate(images: Vec<RgbaImage>, merge_duplicates: bool) -> Deduplicated {
    if !merge_duplicates {
        let frame_to_image = (0..images.len()).collect();
        return Deduplicated {
            images,
            frame_to_image,
        };
    }

    let mut unique: Vec<RgbaImage> = Vec::new();
    let mut frame_to_image = Vec::with_capacity(images.len());
    // The hash only narrows down the candidates.
    let mut by_hash: IntMap<u64, Vec<usize>> = IntMap::default();

    for image in images {
        let candidates = by_hash.entry(content_hash(&image)).or_default();
        let existing = candidates
            .iter()
            .copied()
            .find(|&idx| same_pixels(&unique[idx], &image));
        match existing {
            Some(idx) => frame_to_image.push(idx),
            None => {
                let idx = unique.len();
                candidates.push(idx);
                unique.push(image);
                frame_to_image.push(idx);
            }
        }
    }

    trace!(
        "{} frames, {} unique images",
        frame_to_image.len(),
        unique.len()
    );
    Deduplicated {
        images: unique,
        frame_to_image,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgba;

    fn filled(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn identical_images_merge() {
        let red = filled(4, 4, [255, 0, 0, 255]);
        let blue = filled(4, 4, [0, 0, 255, 255]);
        let result = deduplicate(vec![red.clone(), blue.clone(), red.clone()], true);
        assert_eq!(result.images, vec![red, blue]);
        assert_eq!(result.frame_to_image, vec![0, 1, 0]);
    }

    #[test]
    fn single_pixel_difference_is_kept() {
        let a = filled(3, 3, [1, 2, 3, 4]);
        let mut b = a.clone();
        b.put_pixel(2, 2, Rgba([1, 2, 3, 5]));
        let result = deduplicate(vec![a, b], true);
        assert_eq!(result.images.len(), 2);
        assert_eq!(result.frame_to_image, vec![0, 1]);
    }

    #[test]
    fn same_bytes_different_shape_are_distinct() {
        let wide = filled(4, 1, [9, 9, 9, 9]);
        let tall = filled(1, 4, [9, 9, 9, 9]);
        let result = deduplicate(vec![wide, tall], true);
        assert_eq!(result.frame_to_image, vec![0, 1]);
    }

    #[test]
    fn disabled_keeps_everything() {
        let red = filled(2, 2, [255, 0, 0, 255]);
        let result = deduplicate(vec![red.clone(), red.clone(), red], false);
        assert_eq!(result.images.len(), 3);
        assert_eq!(result.frame_to_image, vec![0, 1, 2]);
    }

    #[test]
    fn empty_input() {
        let result = deduplicate(Vec::new(), true);
        assert!(result.images.is_empty());
        assert!(result.frame_to_image.is_empty());
    }
}
