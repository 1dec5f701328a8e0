use image::{GrayImage, Luma, RgbImage};

use crate::errors::{RockAnalysisError, Result};

/// Value written for foreground pixels in binary masks
pub const FOREGROUND: u8 = 255;

/// Largest blur or morphology window accepted, in pixels per side
pub const MAX_KERNEL_SIZE: u32 = 101;

/// Shape of a morphological structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementShape {
    Square,
    Ellipse,
}

/// Structuring element, stored as the list of active offsets from its anchor (the center)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// Build a `size`×`size` element. `size` must be odd and at most [`MAX_KERNEL_SIZE`].
    pub fn new(shape: ElementShape, size: u32) -> Result<Self> {
        if size == 0 || size % 2 == 0 || size > MAX_KERNEL_SIZE {
            return Err(RockAnalysisError::invalid(format!(
                "structuring element size must be an odd number in 1..={}, got {}",
                MAX_KERNEL_SIZE, size
            )));
        }

        let radius = (size / 2) as i32;
        let mut offsets = Vec::new();

        for dy in -radius..=radius {
            // Ellipse rows follow the usual raster-ellipse rule: half width
            // of each row is round(r * sqrt(1 - dy²/r²))
            let half_width = match shape {
                ElementShape::Square => radius,
                ElementShape::Ellipse => {
                    if radius == 0 {
                        0
                    } else {
                        let r = radius as f64;
                        let dy = dy as f64;
                        (r * ((r * r - dy * dy) / (r * r)).sqrt()).round() as i32
                    }
                }
            };
            for dx in -half_width..=half_width {
                offsets.push((dx, dy));
            }
        }

        Ok(Self { size, offsets })
    }

    pub fn square(size: u32) -> Result<Self> {
        Self::new(ElementShape::Square, size)
    }

    pub fn ellipse(size: u32) -> Result<Self> {
        Self::new(ElementShape::Ellipse, size)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

/// Coerce a kernel size to the nearest odd value >= `size`.
/// Zero is rejected since no smoothing window can be centered on it, and
/// so is anything that ends up above [`MAX_KERNEL_SIZE`].
pub fn odd_kernel_size(size: u32) -> Result<u32> {
    if size == 0 {
        return Err(RockAnalysisError::invalid("kernel size must be > 0"));
    }
    let odd = if size % 2 == 0 { size + 1 } else { size };
    if odd > MAX_KERNEL_SIZE {
        return Err(RockAnalysisError::invalid(format!(
            "kernel size {} exceeds the maximum of {}",
            size, MAX_KERNEL_SIZE
        )));
    }
    Ok(odd)
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

#[inline]
pub fn is_foreground(pixel: &Luma<u8>) -> bool {
    pixel[0] > 0
}

/// Reject images that have nothing to analyze
pub fn ensure_non_empty(image: &RgbImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RockAnalysisError::UnsupportedImage(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }
    Ok(())
}

/// Binarize a grayscale image with a fixed threshold.
///
/// Normal polarity marks pixels strictly brighter than `threshold` as
/// foreground; inverted polarity marks the remaining (darker) pixels.
pub fn binarize(image: &GrayImage, threshold: u8, inverted: bool) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let bright = image.get_pixel(x, y)[0] > threshold;
        if bright != inverted {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Count foreground pixels of a binary mask
pub fn count_foreground(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| is_foreground(p)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_kernel_sizes_round_up() {
        for size in (2..40).step_by(2) {
            assert_eq!(odd_kernel_size(size).unwrap(), size + 1);
        }
        for size in (1..40).step_by(2) {
            assert_eq!(odd_kernel_size(size).unwrap(), size);
        }
        assert!(odd_kernel_size(0).is_err());
    }

    #[test]
    fn oversized_kernels_are_rejected() {
        assert_eq!(odd_kernel_size(MAX_KERNEL_SIZE - 1).unwrap(), MAX_KERNEL_SIZE);
        assert_eq!(odd_kernel_size(MAX_KERNEL_SIZE).unwrap(), MAX_KERNEL_SIZE);
        assert!(matches!(
            odd_kernel_size(MAX_KERNEL_SIZE + 1),
            Err(RockAnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            odd_kernel_size(u32::MAX),
            Err(RockAnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            StructuringElement::square(MAX_KERNEL_SIZE + 2),
            Err(RockAnalysisError::InvalidParameter(_))
        ));
        assert!(StructuringElement::ellipse(MAX_KERNEL_SIZE).is_ok());
    }

    #[test]
    fn small_ellipse_is_a_cross() {
        let element = StructuringElement::ellipse(3).unwrap();
        let mut offsets = element.offsets().to_vec();
        offsets.sort();
        assert_eq!(offsets, vec![(-1, 0), (0, -1), (0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn square_covers_full_window() {
        let element = StructuringElement::square(5).unwrap();
        assert_eq!(element.offsets().len(), 25);
        assert!(StructuringElement::square(4).is_err());
    }

    #[test]
    fn binarize_respects_polarity() {
        let image = GrayImage::from_raw(3, 1, vec![10, 128, 200]).unwrap();
        let normal = binarize(&image, 128, false);
        assert_eq!(normal.into_raw(), vec![0, 0, 255]);
        let inverted = binarize(&image, 128, true);
        assert_eq!(inverted.into_raw(), vec![255, 255, 0]);
    }

    #[test]
    fn empty_images_are_unsupported() {
        let image = RgbImage::new(0, 10);
        assert!(matches!(
            ensure_non_empty(&image),
            Err(RockAnalysisError::UnsupportedImage(_))
        ));
    }
}
