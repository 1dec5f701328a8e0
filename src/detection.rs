// src/detection.rs - Mode-specific detection strategies plugged into the shared pipeline

use image::{GrayImage, RgbImage};
use serde::Serialize;
use tracing::{debug, info};

use crate::annotate::{draw_circle, draw_contour, draw_line_feature, FRACTURE_COLOR, GRAIN_COLOR, PORE_COLOR};
use crate::calibration::CalibrationFactor;
use crate::config::{FractureParams, GrainParams, PoreParams};
use crate::edges::{detect_edges, EdgeParams};
use crate::errors::Result;
use crate::features::{LineFeature, RegionFeature};
use crate::hough::{detect_segments, HoughParams};
use crate::image_utils::{binarize, count_foreground, odd_kernel_size, StructuringElement};
use crate::measurement::{measure_line, measure_region};
use crate::morphology::{apply_closing, apply_opening, external_contours};
use crate::pipeline::AnalysisMode;
use crate::units::{FractureRecord, GrainRecord, PoreRecord};

/// Size of the elliptical element used to clean region masks
const REGION_ELEMENT_SIZE: u32 = 3;

/// Overlay line thickness for fractures
const FRACTURE_LINE_THICKNESS: u32 = 2;

/// Detection policy for one analysis mode.
///
/// The shared pipeline smooths the image with `blur_kernel`, hands the
/// result to `detect`, converts each feature with `to_record` and draws
/// every record with `annotate`.
pub trait DetectionStrategy {
    type Feature;
    type Record: Serialize + Clone;

    fn mode(&self) -> AnalysisMode;

    /// Requested blur kernel size (coerced to odd by the preprocessor)
    fn blur_kernel(&self) -> u32;

    /// Detect, measure and filter features on the smoothed grayscale image
    fn detect(&self, smoothed: &GrayImage) -> Result<Vec<Self::Feature>>;

    /// Attach physical units to a measured feature
    fn to_record(&self, feature: Self::Feature, calibration: Option<CalibrationFactor>) -> Self::Record;

    /// Mark one accepted record on the overlay canvas
    fn annotate(&self, canvas: &mut RgbImage, record: &Self::Record);
}

/// Edge + straight line detection for fractures
#[derive(Debug, Clone)]
pub struct FractureDetector {
    params: FractureParams,
    edges: EdgeParams,
    hough: HoughParams,
    closing: StructuringElement,
}

impl FractureDetector {
    pub fn new(params: FractureParams) -> Result<Self> {
        params.validate()?;

        let morph_kernel = odd_kernel_size(params.morph_kernel)?;
        let edges = EdgeParams {
            low_threshold: params.edge_thresh_low,
            high_threshold: params.edge_thresh_high,
            aperture: params.edge_aperture,
        };
        let hough = HoughParams {
            min_line_length: params.min_line_length,
            max_line_gap: params.max_line_gap,
            // The closing can merge edge traces up to one element apart
            suppression_radius: morph_kernel,
            ..HoughParams::default()
        };

        Ok(Self {
            closing: StructuringElement::square(morph_kernel)?,
            params,
            edges,
            hough,
        })
    }
}

impl DetectionStrategy for FractureDetector {
    type Feature = LineFeature;
    type Record = FractureRecord;

    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Fracture
    }

    fn blur_kernel(&self) -> u32 {
        self.params.blur_kernel
    }

    fn detect(&self, smoothed: &GrayImage) -> Result<Vec<LineFeature>> {
        let edges = detect_edges(smoothed, &self.edges)?;
        let closed = apply_closing(&edges, &self.closing, 1);
        debug!(edge_pixels = count_foreground(&closed), "edge mask closed");
        let segments = detect_segments(&closed, &self.hough);

        let total = segments.len();
        let filter = self.params.orientation_filter;
        let lines: Vec<LineFeature> = segments
            .iter()
            .map(measure_line)
            .filter(|line| filter.accepts(line.orientation))
            .collect();

        info!(
            segments = total,
            kept = lines.len(),
            filter = ?filter,
            "fracture detection finished"
        );
        Ok(lines)
    }

    fn to_record(&self, feature: LineFeature, calibration: Option<CalibrationFactor>) -> FractureRecord {
        FractureRecord::new(feature, calibration)
    }

    fn annotate(&self, canvas: &mut RgbImage, record: &FractureRecord) {
        draw_line_feature(canvas, &record.line, FRACTURE_COLOR, FRACTURE_LINE_THICKNESS);
    }
}

/// Keep regions whose area lies in `[min_area, max_area]`
fn filter_regions(
    contours: Vec<Vec<imageproc::point::Point<i32>>>,
    min_area: f64,
    max_area: f64,
    with_centroid: bool,
) -> Vec<RegionFeature> {
    let total = contours.len();
    let regions: Vec<RegionFeature> = contours
        .into_iter()
        .map(|contour| measure_region(contour, with_centroid))
        .filter(|region| region.area_px >= min_area && region.area_px <= max_area)
        .collect();
    debug!(contours = total, accepted = regions.len(), min_area, max_area, "area filter applied");
    regions
}

/// Threshold + opening + contour detection for bright grains
#[derive(Debug, Clone)]
pub struct GrainDetector {
    params: GrainParams,
    opening: StructuringElement,
}

impl GrainDetector {
    pub fn new(params: GrainParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            opening: StructuringElement::ellipse(REGION_ELEMENT_SIZE)?,
            params,
        })
    }
}

impl DetectionStrategy for GrainDetector {
    type Feature = RegionFeature;
    type Record = GrainRecord;

    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Grain
    }

    fn blur_kernel(&self) -> u32 {
        self.params.blur_kernel
    }

    fn detect(&self, smoothed: &GrayImage) -> Result<Vec<RegionFeature>> {
        let binary = binarize(smoothed, self.params.binarize_thresh, false);
        let opened = apply_opening(&binary, &self.opening, self.params.morph_open_iterations);
        let contours = external_contours(&opened);

        let grains = filter_regions(contours, self.params.min_area, self.params.max_area, false);
        info!(grains = grains.len(), "grain detection finished");
        Ok(grains)
    }

    fn to_record(&self, feature: RegionFeature, calibration: Option<CalibrationFactor>) -> GrainRecord {
        GrainRecord::new(feature, calibration)
    }

    fn annotate(&self, canvas: &mut RgbImage, record: &GrainRecord) {
        let region = &record.region;
        draw_contour(canvas, &region.contour, GRAIN_COLOR);
        // Circle anchored on the first boundary point, not the centroid
        if let Some(first) = region.contour.first() {
            draw_circle(canvas, (first.x, first.y), region.equivalent_diameter_px, GRAIN_COLOR);
        }
    }
}

/// Inverted threshold + opening + closing + contour detection for dark pores
#[derive(Debug, Clone)]
pub struct PoreDetector {
    params: PoreParams,
    element: StructuringElement,
}

impl PoreDetector {
    pub fn new(params: PoreParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            element: StructuringElement::ellipse(REGION_ELEMENT_SIZE)?,
            params,
        })
    }
}

impl DetectionStrategy for PoreDetector {
    type Feature = RegionFeature;
    type Record = PoreRecord;

    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Pore
    }

    fn blur_kernel(&self) -> u32 {
        self.params.blur_kernel
    }

    fn detect(&self, smoothed: &GrayImage) -> Result<Vec<RegionFeature>> {
        let binary = binarize(smoothed, self.params.binarize_thresh, true);
        let opened = apply_opening(&binary, &self.element, 1);
        let filled = apply_closing(&opened, &self.element, 1);
        let contours = external_contours(&filled);

        let pores = filter_regions(contours, self.params.min_area, self.params.fill_thresh, true);
        let total_area: f64 = pores.iter().map(|p| p.area_px).sum();
        let image_area = (smoothed.width() as f64) * (smoothed.height() as f64);
        info!(
            pores = pores.len(),
            pore_area_fraction = if image_area > 0.0 { total_area / image_area } else { 0.0 },
            "pore detection finished"
        );
        Ok(pores)
    }

    fn to_record(&self, feature: RegionFeature, calibration: Option<CalibrationFactor>) -> PoreRecord {
        PoreRecord::new(feature, calibration)
    }

    fn annotate(&self, canvas: &mut RgbImage, record: &PoreRecord) {
        let region = &record.region;
        draw_contour(canvas, &region.contour, PORE_COLOR);
        let center = region.centroid.unwrap_or((0, 0));
        draw_circle(canvas, center, region.equivalent_diameter_px, PORE_COLOR);
    }
}
