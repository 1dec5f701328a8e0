// src/calibration.rs - Pixel to millimetre scale factor

use serde::{Deserialize, Serialize};

use crate::errors::{RockAnalysisError, Result};

/// Millimetres per inch, used for DPI based calibration
pub const MM_PER_INCH: f64 = 25.4;

/// Physical length (mm) covered by one pixel.
///
/// Always strictly positive and finite; the only way to obtain one is through
/// the checked constructors below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CalibrationFactor(f64);

impl CalibrationFactor {
    /// Calibrate from the scanner/camera resolution in dots per inch
    pub fn from_dpi(dpi: f64) -> Result<Self> {
        if !(dpi > 0.0) || !dpi.is_finite() {
            return Err(RockAnalysisError::invalid(format!(
                "dpi must be > 0, got {}",
                dpi
            )));
        }
        Self::checked(MM_PER_INCH / dpi)
    }

    /// Calibrate from a measured reference: `pixel_count` pixels span `real_length_mm`
    pub fn from_manual(pixel_count: f64, real_length_mm: f64) -> Result<Self> {
        if !(pixel_count > 0.0) || !pixel_count.is_finite() {
            return Err(RockAnalysisError::invalid(format!(
                "pixel_count must be > 0, got {}",
                pixel_count
            )));
        }
        if !(real_length_mm > 0.0) {
            return Err(RockAnalysisError::invalid(format!(
                "real_length_mm must be > 0, got {}",
                real_length_mm
            )));
        }
        Self::checked(real_length_mm / pixel_count)
    }

    /// Use an already known mm-per-pixel ratio
    pub fn from_mm_per_pixel(mm_per_pixel: f64) -> Result<Self> {
        Self::checked(mm_per_pixel)
    }

    fn checked(mm_per_pixel: f64) -> Result<Self> {
        if mm_per_pixel > 0.0 && mm_per_pixel.is_finite() {
            Ok(CalibrationFactor(mm_per_pixel))
        } else {
            Err(RockAnalysisError::invalid(format!(
                "calibration factor must be a positive finite number, got {}",
                mm_per_pixel
            )))
        }
    }

    #[inline]
    pub fn mm_per_pixel(&self) -> f64 {
        self.0
    }

    /// Convert a pixel length to millimetres
    #[inline]
    pub fn to_length(&self, px: f64) -> f64 {
        px * self.0
    }

    /// Convert a pixel area to square millimetres
    #[inline]
    pub fn to_area(&self, px_area: f64) -> f64 {
        px_area * self.0 * self.0
    }
}

/// Free-function form of [`CalibrationFactor::from_dpi`]
pub fn calibration_from_dpi(dpi: f64) -> Result<CalibrationFactor> {
    CalibrationFactor::from_dpi(dpi)
}

/// Free-function form of [`CalibrationFactor::from_manual`]
pub fn calibration_from_manual(pixel_count: f64, real_length_mm: f64) -> Result<CalibrationFactor> {
    CalibrationFactor::from_manual(pixel_count, real_length_mm)
}

/// How the calibration is described in the configuration file
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum CalibrationSource {
    Dpi { dpi: f64 },
    Manual { pixel_count: f64, real_length_mm: f64 },
}

impl CalibrationSource {
    pub fn resolve(&self) -> Result<CalibrationFactor> {
        match *self {
            CalibrationSource::Dpi { dpi } => CalibrationFactor::from_dpi(dpi),
            CalibrationSource::Manual { pixel_count, real_length_mm } => {
                CalibrationFactor::from_manual(pixel_count, real_length_mm)
            }
        }
    }
}
