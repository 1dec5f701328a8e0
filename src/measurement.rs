// src/measurement.rs - Pixel-space geometry of detected features

use imageproc::point::Point;
use std::f64::consts::PI;

use crate::features::{LineFeature, Orientation, RegionFeature};
use crate::hough::LineSegment;

/// Length, angle and orientation of a segment
pub fn measure_line(segment: &LineSegment) -> LineFeature {
    let (x1, y1) = segment.start;
    let (x2, y2) = segment.end;
    let dx = x2 - x1;
    let dy = y2 - y1;

    LineFeature {
        endpoints: [segment.start, segment.end],
        length_px: (dx as f64).hypot(dy as f64),
        angle_deg: (dy as f64).atan2(dx as f64).to_degrees(),
        orientation: Orientation::classify(dx, dy),
    }
}

/// Area, equivalent diameter and (optionally) centroid of a contour
pub fn measure_region(contour: Vec<Point<i32>>, with_centroid: bool) -> RegionFeature {
    let area_px = contour_area(&contour);
    let centroid = if with_centroid { Some(contour_centroid(&contour)) } else { None };

    RegionFeature {
        area_px,
        equivalent_diameter_px: equivalent_diameter(area_px),
        centroid,
        contour,
    }
}

/// Diameter of the circle with the given area
#[inline]
pub fn equivalent_diameter(area: f64) -> f64 {
    (4.0 * area / PI).sqrt()
}

/// Polygon moments (m00, m10, m01) of the closed polygon through the points
fn polygon_moments(points: &[Point<i32>]) -> (f64, f64, f64) {
    if points.len() < 3 {
        return (0.0, 0.0, 0.0);
    }

    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;

    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let (x0, y0) = (p.x as f64, p.y as f64);
        let (x1, y1) = (q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += (x0 + x1) * cross;
        m01 += (y0 + y1) * cross;
    }

    (m00 / 2.0, m10 / 6.0, m01 / 6.0)
}

/// Area enclosed by the contour polygon (shoelace formula)
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    polygon_moments(points).0.abs()
}

/// Area-weighted centroid, truncated to integer pixels.
/// Degenerate contours with zero area map to the origin.
pub fn contour_centroid(points: &[Point<i32>]) -> (i32, i32) {
    let (m00, m10, m01) = polygon_moments(points);
    if m00 == 0.0 {
        return (0, 0);
    }
    ((m10 / m00) as i32, (m01 / m00) as i32)
}
