#![allow(dead_code)]

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Uniform image of a single gray level
pub fn uniform(width: u32, height: u32, level: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([level, level, level]))
}

/// Black image with a 1 px white horizontal line covering `x0..=x1` on row `y`
pub fn horizontal_line(width: u32, height: u32, y: u32, x0: u32, x1: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BLACK);
    for x in x0..=x1 {
        image.put_pixel(x, y, WHITE);
    }
    image
}

/// Black image with a 1 px white vertical line covering `y0..=y1` on column `x`
pub fn vertical_line(width: u32, height: u32, x: u32, y0: u32, y1: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BLACK);
    for y in y0..=y1 {
        image.put_pixel(x, y, WHITE);
    }
    image
}

/// Paint a filled disc onto an existing image
pub fn paint_disc(image: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    for y in 0..image.height() {
        for x in 0..image.width() {
            let dx = x as i32 - cx;
            let dy = y as i32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                image.put_pixel(x, y, color);
            }
        }
    }
}

/// Single filled disc on a uniform background
pub fn disc(width: u32, height: u32, cx: i32, cy: i32, radius: i32, fg: Rgb<u8>, bg: Rgb<u8>) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, bg);
    paint_disc(&mut image, cx, cy, radius, fg);
    image
}

/// Black image with a 1 px white line from `start` to `end`
pub fn line_segment(width: u32, height: u32, start: (f32, f32), end: (f32, f32)) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BLACK);
    draw_line_segment_mut(&mut image, start, end, WHITE);
    image
}

/// Black image with a white rectangle covering `x0..=x1` by `y0..=y1`
pub fn filled_rect(width: u32, height: u32, x0: u32, x1: u32, y0: u32, y1: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (x0..=x1).contains(&x) && (y0..=y1).contains(&y) {
            WHITE
        } else {
            BLACK
        }
    })
}
