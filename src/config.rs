use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::{CalibrationFactor, CalibrationSource};
use crate::errors::{RockAnalysisError, Result};
use crate::features::OrientationFilter;
use crate::image_utils::MAX_KERNEL_SIZE;

/// Configuration for a run of the analyzer
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_output_base_dir")]
    pub output_base_dir: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Also write the annotated PNG next to the records
    #[serde(default = "default_save_annotated")]
    pub save_annotated: bool,

    #[serde(default)]
    pub calibration: Option<CalibrationSource>,

    #[serde(default)]
    pub fracture: FractureParams,

    #[serde(default)]
    pub grain: GrainParams,

    #[serde(default)]
    pub pore: PoreParams,
}

/// Fracture (line) detection parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FractureParams {
    pub blur_kernel: u32,
    pub edge_thresh_low: f32,
    pub edge_thresh_high: f32,
    pub edge_aperture: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    pub morph_kernel: u32,
    pub orientation_filter: OrientationFilter,
}

impl Default for FractureParams {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            edge_thresh_low: 50.0,
            edge_thresh_high: 150.0,
            edge_aperture: 3,
            min_line_length: 50,
            max_line_gap: 10,
            morph_kernel: 3,
            orientation_filter: OrientationFilter::All,
        }
    }
}

/// Grain (bright region) detection parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GrainParams {
    pub blur_kernel: u32,
    pub binarize_thresh: u8,
    pub min_area: f64,
    pub max_area: f64,
    pub morph_open_iterations: u32,
}

impl Default for GrainParams {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            binarize_thresh: 128,
            min_area: 10.0,
            max_area: 1000.0,
            morph_open_iterations: 1,
        }
    }
}

/// Pore (dark region) detection parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PoreParams {
    pub blur_kernel: u32,
    pub binarize_thresh: u8,
    pub min_area: f64,
    /// Regions larger than this are treated as filled artifacts, not pores
    pub fill_thresh: f64,
}

impl Default for PoreParams {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            binarize_thresh: 128,
            min_area: 10.0,
            fill_thresh: 100.0,
        }
    }
}

fn default_output_base_dir() -> String {
    "./results".to_string()
}

fn default_parallel() -> bool {
    true
}

fn default_save_annotated() -> bool {
    true
}

fn check_kernel(name: &str, value: u32) -> Result<()> {
    if value == 0 || value > MAX_KERNEL_SIZE {
        return Err(RockAnalysisError::invalid(format!(
            "{} must be in 1..={}, got {}",
            name, MAX_KERNEL_SIZE, value
        )));
    }
    Ok(())
}

fn check_area_bounds(lower_name: &str, lower: f64, upper_name: &str, upper: f64) -> Result<()> {
    if !(lower >= 0.0) || !(upper >= 0.0) {
        return Err(RockAnalysisError::invalid(format!(
            "{} and {} must be >= 0",
            lower_name, upper_name
        )));
    }
    if lower > upper {
        return Err(RockAnalysisError::invalid(format!(
            "{} ({}) must not exceed {} ({})",
            lower_name, lower, upper_name, upper
        )));
    }
    Ok(())
}

impl FractureParams {
    pub fn validate(&self) -> Result<()> {
        check_kernel("blur_kernel", self.blur_kernel)?;
        check_kernel("morph_kernel", self.morph_kernel)?;
        if !matches!(self.edge_aperture, 3 | 5 | 7) {
            return Err(RockAnalysisError::invalid(format!(
                "edge_aperture must be 3, 5 or 7, got {}",
                self.edge_aperture
            )));
        }
        if !(self.edge_thresh_low >= 0.0) || !(self.edge_thresh_high >= 0.0) {
            return Err(RockAnalysisError::invalid("edge thresholds must be >= 0"));
        }
        Ok(())
    }
}

impl GrainParams {
    pub fn validate(&self) -> Result<()> {
        check_kernel("blur_kernel", self.blur_kernel)?;
        check_area_bounds("min_area", self.min_area, "max_area", self.max_area)
    }
}

impl PoreParams {
    pub fn validate(&self) -> Result<()> {
        check_kernel("blur_kernel", self.blur_kernel)?;
        check_area_bounds("min_area", self.min_area, "fill_thresh", self.fill_thresh)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_base_dir: default_output_base_dir(),
            use_parallel: default_parallel(),
            save_annotated: default_save_annotated(),
            calibration: None,
            fracture: FractureParams::default(),
            grain: GrainParams::default(),
            pore: PoreParams::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RockAnalysisError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| RockAnalysisError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.output_base_dir.trim().is_empty() {
            return Err(RockAnalysisError::Config(
                "output_base_dir must not be empty".to_string(),
            ));
        }

        self.fracture.validate()?;
        self.grain.validate()?;
        self.pore.validate()?;
        self.calibration_factor()?;

        Ok(())
    }

    /// Resolve the configured calibration, if any
    pub fn calibration_factor(&self) -> Result<Option<CalibrationFactor>> {
        self.calibration.as_ref().map(CalibrationSource::resolve).transpose()
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_base_dir)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            RockAnalysisError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
