// src/preprocess.rs - Grayscale conversion and Gaussian smoothing

use image::{GrayImage, RgbImage};
use imageproc::filter::separable_filter_equal;
use tracing::debug;

use crate::errors::Result;
use crate::image_utils::{ensure_non_empty, odd_kernel_size};

/// Precomputed weights for the common small kernels
const GAUSSIAN_1: [f32; 1] = [1.0];
const GAUSSIAN_3: [f32; 3] = [0.25, 0.5, 0.25];
const GAUSSIAN_5: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];
const GAUSSIAN_7: [f32; 7] = [0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125];

/// First stage shared by every analysis mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    kernel_size: u32,
}

impl Preprocessor {
    /// Even sizes are bumped to the next odd size; zero and sizes above
    /// [`MAX_KERNEL_SIZE`](crate::image_utils::MAX_KERNEL_SIZE) are rejected
    pub fn new(blur_kernel: u32) -> Result<Self> {
        Ok(Self {
            kernel_size: odd_kernel_size(blur_kernel)?,
        })
    }

    /// Kernel size actually used for smoothing
    pub fn kernel_size(&self) -> u32 {
        self.kernel_size
    }

    /// Convert to grayscale and smooth. The input image is left untouched.
    pub fn run(&self, image: &RgbImage) -> Result<GrayImage> {
        ensure_non_empty(image)?;

        let gray = image::imageops::grayscale(image);
        if self.kernel_size == 1 {
            return Ok(gray);
        }

        debug!(kernel_size = self.kernel_size, "smoothing grayscale image");
        let kernel = gaussian_kernel(self.kernel_size);
        Ok(separable_filter_equal(&gray, &kernel))
    }
}

/// 1D Gaussian weights for an odd `size`, normalized to sum to one.
///
/// Sizes up to 7 use fixed binomial-like tables; larger sizes derive sigma
/// from the size as `0.3 * ((size - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    match size {
        1 => GAUSSIAN_1.to_vec(),
        3 => GAUSSIAN_3.to_vec(),
        5 => GAUSSIAN_5.to_vec(),
        7 => GAUSSIAN_7.to_vec(),
        _ => {
            let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
            let center = (size / 2) as f64;
            let scale = -0.5 / (sigma * sigma);
            let weights: Vec<f64> = (0..size)
                .map(|i| {
                    let x = i as f64 - center;
                    (scale * x * x).exp()
                })
                .collect();
            let sum: f64 = weights.iter().sum();
            weights.into_iter().map(|w| (w / sum) as f32).collect()
        }
    }
}
