// src/lib.rs - Library interface for RockMicrograph

pub mod annotate;
pub mod calibration;
pub mod config;
pub mod detection;
pub mod edges;
pub mod errors;
pub mod features;
pub mod hough;
pub mod image_io;
pub mod image_utils;
pub mod logging;
pub mod measurement;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod units;

// Re-export commonly used types and functions
pub use errors::{RockAnalysisError, Result};
pub use config::{Config, FractureParams, GrainParams, PoreParams};
pub use image_io::{InputImage, load_image, save_image};

pub use calibration::{calibration_from_dpi, calibration_from_manual, CalibrationFactor};

pub use pipeline::{
    analyze,
    analyze_fractures,
    analyze_grains,
    analyze_pores,
    AnalysisMode,
    AnalysisResult,
    AnnotatedImage,
    RawImage,
};

pub use detection::{DetectionStrategy, FractureDetector, GrainDetector, PoreDetector};

pub use features::{LineFeature, Orientation, OrientationFilter, RegionFeature};
pub use units::{phi_scale, FractureRecord, GrainRecord, PoreRecord};

pub use output::save_results;
