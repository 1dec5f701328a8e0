// src/annotate.rs - Overlay drawing on a copy of the input image

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use imageproc::point::Point;

use crate::features::LineFeature;

pub const FRACTURE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const GRAIN_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const PORE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Draw a line feature, widened to `thickness` pixels across its minor axis
pub fn draw_line_feature(canvas: &mut RgbImage, line: &LineFeature, color: Rgb<u8>, thickness: u32) {
    let [(x1, y1), (x2, y2)] = line.endpoints;
    let horizontal_major = (x2 - x1).abs() >= (y2 - y1).abs();

    for offset in 0..thickness.max(1) as i32 {
        let (ox, oy) = if horizontal_major { (0, offset) } else { (offset, 0) };
        draw_line_segment_mut(
            canvas,
            ((x1 + ox) as f32, (y1 + oy) as f32),
            ((x2 + ox) as f32, (y2 + oy) as f32),
            color,
        );
    }
}

/// Draw a closed contour outline
pub fn draw_contour(canvas: &mut RgbImage, contour: &[Point<i32>], color: Rgb<u8>) {
    match contour.len() {
        0 => {}
        1 => {
            let p = contour[0];
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < canvas.width() && (p.y as u32) < canvas.height() {
                canvas.put_pixel(p.x as u32, p.y as u32, color);
            }
        }
        len => {
            for i in 0..len {
                let p1 = contour[i];
                let p2 = contour[(i + 1) % len];
                draw_line_segment_mut(
                    canvas,
                    (p1.x as f32, p1.y as f32),
                    (p2.x as f32, p2.y as f32),
                    color,
                );
            }
        }
    }
}

/// Draw a circle outline of the given diameter
pub fn draw_circle(canvas: &mut RgbImage, center: (i32, i32), diameter: f64, color: Rgb<u8>) {
    let radius = (diameter / 2.0) as i32;
    draw_hollow_circle_mut(canvas, center, radius, color);
}
