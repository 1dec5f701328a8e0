// src/pipeline.rs - Shared measurement pipeline for every analysis mode

use image::RgbImage;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

use crate::calibration::CalibrationFactor;
use crate::config::{FractureParams, GrainParams, PoreParams};
use crate::detection::{DetectionStrategy, FractureDetector, GrainDetector, PoreDetector};
use crate::errors::Result;
use crate::image_utils::ensure_non_empty;
use crate::preprocess::Preprocessor;
use crate::units::{FractureRecord, GrainRecord, PoreRecord};

/// Input of every analysis; never modified
pub type RawImage = RgbImage;

/// Copy of the input with the accepted features drawn on top
pub type AnnotatedImage = RgbImage;

/// The three analysis modes
#[derive(Debug, Deserialize, serde::Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Fracture,
    Grain,
    Pore,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Fracture => "fracture",
            AnalysisMode::Grain => "grain",
            AnalysisMode::Pore => "pore",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered measurement records of one analysis call.
///
/// The feature count is derived from the records, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult<R> {
    records: Vec<R>,
}

impl<R> AnalysisResult<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn num_features(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }
}

impl<R: Serialize> Serialize for AnalysisResult<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AnalysisResult", 2)?;
        state.serialize_field("num_features", &self.num_features())?;
        state.serialize_field("records", &self.records)?;
        state.end()
    }
}

/// Run the full pipeline: preprocess, detect, convert units, annotate.
///
/// Either the whole result is produced or the call fails; finding no
/// features is a successful, empty result.
pub fn analyze<S: DetectionStrategy>(
    image: &RawImage,
    strategy: &S,
    calibration: Option<CalibrationFactor>,
) -> Result<(AnalysisResult<S::Record>, AnnotatedImage)> {
    let start_time = Instant::now();
    ensure_non_empty(image)?;

    // Step 1: grayscale + smoothing
    let preprocessor = Preprocessor::new(strategy.blur_kernel())?;
    debug!(
        mode = %strategy.mode(),
        requested_kernel = strategy.blur_kernel(),
        kernel = preprocessor.kernel_size(),
        "preprocessing"
    );
    let smoothed = preprocessor.run(image)?;

    // Step 2: detection, measurement and filtering
    let features = strategy.detect(&smoothed)?;

    // Step 3: physical units
    let records: Vec<S::Record> = features
        .into_iter()
        .map(|feature| strategy.to_record(feature, calibration))
        .collect();

    // Step 4: overlay on a copy of the color input
    let mut annotated = image.clone();
    for record in &records {
        strategy.annotate(&mut annotated, record);
    }

    let result = AnalysisResult::new(records);
    info!(
        mode = %strategy.mode(),
        features = result.num_features(),
        calibrated = calibration.is_some(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "analysis finished"
    );

    Ok((result, annotated))
}

/// Fracture analysis with the given parameters
pub fn analyze_fractures(
    image: &RawImage,
    params: &FractureParams,
    calibration: Option<CalibrationFactor>,
) -> Result<(AnalysisResult<FractureRecord>, AnnotatedImage)> {
    let detector = FractureDetector::new(params.clone())?;
    analyze(image, &detector, calibration)
}

/// Grain analysis with the given parameters
pub fn analyze_grains(
    image: &RawImage,
    params: &GrainParams,
    calibration: Option<CalibrationFactor>,
) -> Result<(AnalysisResult<GrainRecord>, AnnotatedImage)> {
    let detector = GrainDetector::new(params.clone())?;
    analyze(image, &detector, calibration)
}

/// Pore analysis with the given parameters
pub fn analyze_pores(
    image: &RawImage,
    params: &PoreParams,
    calibration: Option<CalibrationFactor>,
) -> Result<(AnalysisResult<PoreRecord>, AnnotatedImage)> {
    let detector = PoreDetector::new(params.clone())?;
    analyze(image, &detector, calibration)
}
