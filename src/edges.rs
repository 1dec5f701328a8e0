// src/edges.rs - Dual-threshold edge detection with a configurable Sobel aperture

use image::{GrayImage, Luma};
use tracing::debug;

use crate::errors::{RockAnalysisError, Result};
use crate::image_utils::FOREGROUND;

/// tan(22.5°) and tan(67.5°), bounds of the four gradient direction sectors
const TAN_22_5: f32 = 0.414_213_56;
const TAN_67_5: f32 = 2.414_213_6;

/// Parameters of the edge detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeParams {
    pub low_threshold: f32,
    pub high_threshold: f32,
    /// Sobel aperture, one of 3, 5 or 7
    pub aperture: u32,
}

impl EdgeParams {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.aperture, 3 | 5 | 7) {
            return Err(RockAnalysisError::invalid(format!(
                "edge aperture must be 3, 5 or 7, got {}",
                self.aperture
            )));
        }
        if self.low_threshold < 0.0 || self.high_threshold < 0.0 {
            return Err(RockAnalysisError::invalid("edge thresholds must be >= 0"));
        }
        Ok(())
    }
}

/// Row-major f32 buffer used for gradients
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0.0; width * height] }
    }

    #[inline]
    fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    /// Read with coordinates clamped to the border
    #[inline]
    fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.get(cx, cy)
    }
}

/// Binomial row of the given length, e.g. 3 -> [1, 2, 1]
fn binomial(length: usize) -> Vec<f32> {
    let mut row = vec![1.0f32];
    for _ in 1..length {
        let mut next = vec![0.0f32; row.len() + 1];
        for (i, &value) in row.iter().enumerate() {
            next[i] += value;
            next[i + 1] += value;
        }
        row = next;
    }
    row
}

/// Smoothing and derivative taps of a Sobel operator of the given aperture
pub(crate) fn sobel_taps(aperture: u32) -> (Vec<f32>, Vec<f32>) {
    let aperture = aperture as usize;
    let smooth = binomial(aperture);
    let base = binomial(aperture - 2);
    let mut derivative = vec![0.0f32; aperture];
    for (i, &value) in base.iter().enumerate() {
        derivative[i] -= value;
        derivative[i + 2] += value;
    }
    (smooth, derivative)
}

/// Correlate with `row_taps` horizontally and `col_taps` vertically
fn separable(source: &Plane, row_taps: &[f32], col_taps: &[f32]) -> Plane {
    let (width, height) = (source.width, source.height);
    let row_radius = (row_taps.len() / 2) as isize;
    let col_radius = (col_taps.len() / 2) as isize;

    let mut horizontal = Plane::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let sum: f32 = row_taps
                .iter()
                .enumerate()
                .map(|(k, &tap)| tap * source.get_clamped(x as isize + k as isize - row_radius, y as isize))
                .sum();
            horizontal.set(x, y, sum);
        }
    }

    let mut result = Plane::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let sum: f32 = col_taps
                .iter()
                .enumerate()
                .map(|(k, &tap)| tap * horizontal.get_clamped(x as isize, y as isize + k as isize - col_radius))
                .sum();
            result.set(x, y, sum);
        }
    }
    result
}

/// Detect edges in a smoothed grayscale image.
///
/// Gradient magnitude is the L1 norm `|gx| + |gy|`. Pixels that are local
/// maxima along the gradient direction and exceed `high_threshold` seed
/// edges; pixels above `low_threshold` join an edge when 8-connected to a
/// seed. Returns a binary mask with edge pixels set to 255.
pub fn detect_edges(image: &GrayImage, params: &EdgeParams) -> Result<GrayImage> {
    params.validate()?;

    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut edges = GrayImage::new(width, height);
    if w == 0 || h == 0 {
        return Ok(edges);
    }

    let (low, high) = if params.low_threshold > params.high_threshold {
        (params.high_threshold, params.low_threshold)
    } else {
        (params.low_threshold, params.high_threshold)
    };

    let mut source = Plane::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels() {
        source.set(x as usize, y as usize, pixel[0] as f32);
    }

    let (smooth, derivative) = sobel_taps(params.aperture);
    let gx = separable(&source, &derivative, &smooth);
    let gy = separable(&source, &smooth, &derivative);

    let mut magnitude = Plane::new(w, h);
    for i in 0..w * h {
        magnitude.data[i] = gx.data[i].abs() + gy.data[i].abs();
    }

    // Non-maximum suppression: 0 = suppressed, 1 = weak candidate, 2 = strong
    let mut state = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let m = magnitude.get(x, y);
            if m <= low {
                continue;
            }

            let dx = gx.get(x, y);
            let dy = gy.get(x, y);
            let ax = dx.abs();
            let ay = dy.abs();
            let (xi, yi) = (x as isize, y as isize);

            let (prev, next) = if ay <= ax * TAN_22_5 {
                (magnitude.get_clamped(xi - 1, yi), magnitude.get_clamped(xi + 1, yi))
            } else if ay > ax * TAN_67_5 {
                (magnitude.get_clamped(xi, yi - 1), magnitude.get_clamped(xi, yi + 1))
            } else if (dx > 0.0) == (dy > 0.0) {
                (magnitude.get_clamped(xi - 1, yi - 1), magnitude.get_clamped(xi + 1, yi + 1))
            } else {
                (magnitude.get_clamped(xi + 1, yi - 1), magnitude.get_clamped(xi - 1, yi + 1))
            };

            if m > prev && m >= next {
                state[y * w + x] = if m > high { 2 } else { 1 };
            }
        }
    }

    // Hysteresis: grow strong pixels through connected weak candidates
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if state[y * w + x] == 2 {
                stack.push((x, y));
            }
        }
    }

    while let Some((x, y)) = stack.pop() {
        edges.put_pixel(x as u32, y as u32, Luma([FOREGROUND]));
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                let idx = ny * w + nx;
                if state[idx] == 1 {
                    state[idx] = 2;
                    stack.push((nx, ny));
                }
            }
        }
    }

    debug!(
        edge_pixels = edges.pixels().filter(|p| p[0] > 0).count(),
        low,
        high,
        aperture = params.aperture,
        "edge detection finished"
    );

    Ok(edges)
}
