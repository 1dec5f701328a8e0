use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

use crate::image_utils::{in_bounds, is_foreground, StructuringElement, FOREGROUND};

/// Applies morphological erosion to a binary mask.
///
/// A pixel survives when every element offset that falls inside the image
/// lands on foreground. Offsets outside the image are ignored, so regions
/// touching the border are not eaten away from the outside.
pub fn erode(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            if !is_foreground(mask.get_pixel(x, y)) {
                continue;
            }

            let mut erode = false;
            for &(dx, dy) in element.offsets() {
                let img_x = x as i32 + dx;
                let img_y = y as i32 + dy;

                if in_bounds(img_x, img_y, width, height)
                    && !is_foreground(mask.get_pixel(img_x as u32, img_y as u32))
                {
                    erode = true;
                    break;
                }
            }

            if !erode {
                result.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    result
}

/// Applies morphological dilation to a binary mask
pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut dilate = false;

            // Symmetric elements make the reflected lookup identical
            for &(dx, dy) in element.offsets() {
                let img_x = x as i32 - dx;
                let img_y = y as i32 - dy;

                if in_bounds(img_x, img_y, width, height)
                    && is_foreground(mask.get_pixel(img_x as u32, img_y as u32))
                {
                    dilate = true;
                    break;
                }
            }

            if dilate {
                result.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    result
}

/// Apply morphological opening (erosion followed by dilation) `iterations` times
pub fn apply_opening(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    let mut current = mask.clone();
    for _ in 0..iterations {
        let eroded = erode(&current, element);
        current = dilate(&eroded, element);
    }
    current
}

/// Apply morphological closing (dilation followed by erosion) `iterations` times
pub fn apply_closing(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    let mut current = mask.clone();
    for _ in 0..iterations {
        let dilated = dilate(&current, element);
        current = erode(&dilated, element);
    }
    current
}

/// Find the outermost boundaries of foreground regions.
///
/// Hole borders and regions nested inside holes are skipped. Each returned
/// contour lists every boundary pixel in tracing order, starting from the
/// first pixel met in a raster scan.
pub fn external_contours(mask: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .map(|contour| contour.points)
        .collect()
}
