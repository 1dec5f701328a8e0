mod common;

use assert_approx_eq::assert_approx_eq;
use common::synthetic_image::{
    disc, filled_rect, horizontal_line, line_segment, paint_disc, uniform, vertical_line, BLACK, WHITE,
};
use image::Rgb;
use rock_micrograph_lib::preprocess::Preprocessor;
use rock_micrograph_lib::{
    analyze_fractures, analyze_grains, analyze_pores, calibration_from_dpi, calibration_from_manual,
    save_results, AnalysisMode, CalibrationFactor, FractureParams, GrainParams, Orientation,
    OrientationFilter, PoreParams, RockAnalysisError,
};

fn tenth_mm() -> Option<CalibrationFactor> {
    Some(CalibrationFactor::from_mm_per_pixel(0.1).unwrap())
}

#[test]
fn even_blur_kernels_are_bumped_to_the_next_odd_size() {
    for k in (2..=20).step_by(2) {
        assert_eq!(Preprocessor::new(k).unwrap().kernel_size(), k + 1);
    }
    assert!(matches!(Preprocessor::new(0), Err(RockAnalysisError::InvalidParameter(_))));
}

#[test]
fn oversized_kernels_are_invalid_parameters() {
    let image = horizontal_line(64, 64, 32, 10, 50);
    let params = FractureParams { morph_kernel: 50_000, ..FractureParams::default() };
    assert!(matches!(
        analyze_fractures(&image, &params, None),
        Err(RockAnalysisError::InvalidParameter(_))
    ));

    let params = PoreParams { blur_kernel: u32::MAX, ..PoreParams::default() };
    assert!(matches!(
        analyze_pores(&image, &params, None),
        Err(RockAnalysisError::InvalidParameter(_))
    ));
}

#[test]
fn calibration_helpers() {
    assert_approx_eq!(calibration_from_dpi(300.0).unwrap().mm_per_pixel(), 25.4 / 300.0, 1e-12);
    assert_approx_eq!(calibration_from_manual(200.0, 5.0).unwrap().mm_per_pixel(), 0.025, 1e-12);
    assert!(calibration_from_dpi(0.0).is_err());
    assert!(calibration_from_dpi(-10.0).is_err());
    assert!(calibration_from_manual(0.0, 5.0).is_err());
}

#[test]
fn single_horizontal_line_is_one_fracture() {
    let image = horizontal_line(200, 100, 50, 50, 149);
    let (result, annotated) = analyze_fractures(&image, &FractureParams::default(), tenth_mm()).unwrap();

    assert_eq!(result.num_features(), 1, "records: {:?}", result.records());
    let record = &result.records()[0];
    assert_eq!(record.line.orientation, Orientation::Horizontal);
    assert_approx_eq!(record.length_mm.unwrap(), 10.0, 0.5);
    assert!(record.line.angle_deg.abs() < 5.0);
    assert_eq!(annotated.dimensions(), image.dimensions());
}

#[test]
fn single_vertical_line_is_one_vertical_fracture() {
    let image = vertical_line(100, 200, 50, 50, 149);
    let (result, _) = analyze_fractures(&image, &FractureParams::default(), None).unwrap();

    assert_eq!(result.num_features(), 1, "records: {:?}", result.records());
    let record = &result.records()[0];
    assert_eq!(record.line.orientation, Orientation::Vertical);
    assert!(record.length_mm.is_none());
}

#[test]
fn diagonal_line_is_one_fracture() {
    let image = line_segment(200, 200, (20.0, 20.0), (120.0, 120.0));
    let (result, _) = analyze_fractures(&image, &FractureParams::default(), None).unwrap();

    assert_eq!(result.num_features(), 1, "records: {:?}", result.records());
    let line = &result.records()[0].line;
    assert_approx_eq!(line.angle_deg, 45.0, 3.0);
    assert_approx_eq!(line.length_px, 100.0 * 2f64.sqrt(), 8.0);
}

#[test]
fn shallow_line_is_one_fracture_over_its_full_extent() {
    let image = line_segment(200, 120, (20.0, 20.0), (150.0, 80.0));
    let (result, _) = analyze_fractures(&image, &FractureParams::default(), None).unwrap();

    assert_eq!(result.num_features(), 1, "records: {:?}", result.records());
    let line = &result.records()[0].line;
    let expected_angle = 60f64.atan2(130.0).to_degrees();
    assert_eq!(line.orientation, Orientation::Horizontal);
    assert_approx_eq!(line.angle_deg, expected_angle, 2.0);
    assert_approx_eq!(line.length_px, 60f64.hypot(130.0), 8.0);

    let [(x1, y1), (x2, y2)] = line.endpoints;
    assert!((x1 - 20).abs() <= 3 && (y1 - 20).abs() <= 3, "start {:?}", (x1, y1));
    assert!((x2 - 150).abs() <= 3 && (y2 - 80).abs() <= 3, "end {:?}", (x2, y2));
}

#[test]
fn wide_bar_gives_one_full_length_fracture_per_edge() {
    let image = filled_rect(200, 100, 30, 170, 45, 55);
    let (result, _) = analyze_fractures(&image, &FractureParams::default(), None).unwrap();

    assert_eq!(result.num_features(), 2, "records: {:?}", result.records());
    for record in result.records() {
        let [(x1, _), (x2, _)] = record.line.endpoints;
        assert_eq!(record.line.orientation, Orientation::Horizontal);
        assert!((x2 - x1).abs() >= 130, "record {:?}", record.line);
    }
}

#[test]
fn orientation_filters_partition_the_lines() {
    let mut image = horizontal_line(200, 200, 30, 20, 139);
    for y in 40..=159 {
        image.put_pixel(170, y, WHITE);
    }

    let detect = |filter: OrientationFilter| {
        let params = FractureParams { orientation_filter: filter, ..FractureParams::default() };
        analyze_fractures(&image, &params, None).unwrap().0
    };

    let all = detect(OrientationFilter::All);
    let horizontal = detect(OrientationFilter::Horizontal);
    let vertical = detect(OrientationFilter::Vertical);

    assert!(horizontal.num_features() >= 1);
    assert!(vertical.num_features() >= 1);
    assert_eq!(all.num_features(), horizontal.num_features() + vertical.num_features());
    assert!(horizontal.records().iter().all(|r| r.line.orientation == Orientation::Horizontal));
    assert!(vertical.records().iter().all(|r| r.line.orientation == Orientation::Vertical));
}

#[test]
fn unknown_orientation_filter_is_rejected() {
    assert!(matches!(
        "diagonal".parse::<OrientationFilter>(),
        Err(RockAnalysisError::InvalidParameter(_))
    ));
}

#[test]
fn single_disc_is_one_grain() {
    let image = disc(64, 64, 32, 32, 10, WHITE, BLACK);
    let (result, _) = analyze_grains(&image, &GrainParams::default(), None).unwrap();

    assert_eq!(result.num_features(), 1);
    let grain = &result.records()[0];
    assert_approx_eq!(grain.region.equivalent_diameter_px, 20.0, 1.5);
    assert!(grain.area_mm2.is_none());
    assert!(grain.equivalent_diameter_mm.is_none());
    assert!(grain.phi.is_none());
}

#[test]
fn calibrated_grain_has_every_physical_field() {
    let image = disc(64, 64, 32, 32, 10, WHITE, BLACK);
    let (result, _) = analyze_grains(&image, &GrainParams::default(), tenth_mm()).unwrap();

    let grain = &result.records()[0];
    let diameter_mm = grain.equivalent_diameter_mm.unwrap();
    assert_approx_eq!(grain.area_mm2.unwrap(), grain.region.area_px * 0.01, 1e-9);
    assert_approx_eq!(diameter_mm, grain.region.equivalent_diameter_px * 0.1, 1e-9);
    assert_approx_eq!(grain.phi.unwrap(), -diameter_mm.log2(), 1e-12);
}

#[test]
fn grain_areas_respect_the_configured_bounds() {
    let mut image = uniform(200, 200, 0);
    paint_disc(&mut image, 30, 30, 3, WHITE);
    paint_disc(&mut image, 80, 30, 8, WHITE);
    paint_disc(&mut image, 50, 120, 14, WHITE);
    paint_disc(&mut image, 140, 130, 20, WHITE);

    let params = GrainParams { min_area: 100.0, max_area: 1000.0, ..GrainParams::default() };
    let (result, _) = analyze_grains(&image, &params, None).unwrap();

    assert_eq!(result.num_features(), 2);
    for grain in result.records() {
        assert!(grain.region.area_px >= params.min_area);
        assert!(grain.region.area_px <= params.max_area);
    }
}

#[test]
fn inverted_grain_bounds_are_rejected() {
    let image = uniform(10, 10, 0);
    let params = GrainParams { min_area: 500.0, max_area: 100.0, ..GrainParams::default() };
    assert!(matches!(
        analyze_grains(&image, &params, None),
        Err(RockAnalysisError::InvalidParameter(_))
    ));
}

#[test]
fn blank_image_has_no_pores() {
    let image = uniform(64, 64, 200);
    let (result, annotated) = analyze_pores(&image, &PoreParams::default(), tenth_mm()).unwrap();
    assert_eq!(result.num_features(), 0);
    assert!(result.records().is_empty());
    assert_eq!(annotated, image);
}

#[test]
fn fully_dark_image_exceeds_the_fill_threshold() {
    let image = uniform(64, 64, 0);
    let (result, _) = analyze_pores(&image, &PoreParams::default(), None).unwrap();
    assert_eq!(result.num_features(), 0);
}

#[test]
fn small_dark_disc_is_one_pore_with_its_centroid() {
    let image = disc(64, 64, 32, 32, 4, Rgb([20, 20, 20]), Rgb([220, 220, 220]));
    let (result, _) = analyze_pores(&image, &PoreParams::default(), tenth_mm()).unwrap();

    assert_eq!(result.num_features(), 1);
    let pore = &result.records()[0];
    let (cx, cy) = pore.region.centroid.unwrap();
    assert!((cx - 32).abs() <= 1 && (cy - 32).abs() <= 1, "centroid {:?}", (cx, cy));
    assert!(pore.region.area_px >= 10.0 && pore.region.area_px <= 100.0);
    assert!(pore.area_mm2.is_some() && pore.equivalent_diameter_mm.is_some());
}

#[test]
fn pore_areas_respect_the_configured_bounds() {
    let mut image = uniform(200, 200, 220);
    let dark = Rgb([20, 20, 20]);
    paint_disc(&mut image, 20, 20, 1, dark);
    paint_disc(&mut image, 60, 30, 4, dark);
    paint_disc(&mut image, 120, 40, 5, dark);
    paint_disc(&mut image, 50, 120, 8, dark);
    paint_disc(&mut image, 140, 140, 14, dark);

    let params = PoreParams::default();
    let (result, _) = analyze_pores(&image, &params, None).unwrap();

    assert_eq!(result.num_features(), 2, "records: {:?}", result.records());
    for pore in result.records() {
        assert!(pore.region.area_px >= params.min_area);
        assert!(pore.region.area_px <= params.fill_thresh);
    }
}

#[test]
fn identical_inputs_give_identical_results() {
    let mut image = horizontal_line(200, 200, 30, 20, 139);
    paint_disc(&mut image, 100, 120, 12, WHITE);

    let params = FractureParams::default();
    let first = analyze_fractures(&image, &params, tenth_mm()).unwrap();
    let second = analyze_fractures(&image, &params, tenth_mm()).unwrap();
    assert_eq!(first, second);

    let first = analyze_grains(&image, &GrainParams::default(), None).unwrap();
    let second = analyze_grains(&image, &GrainParams::default(), None).unwrap();
    assert_eq!(first, second);

    let mut image = uniform(120, 120, 220);
    paint_disc(&mut image, 30, 30, 4, Rgb([20, 20, 20]));
    paint_disc(&mut image, 80, 70, 5, Rgb([20, 20, 20]));
    let first = analyze_pores(&image, &PoreParams::default(), tenth_mm()).unwrap();
    let second = analyze_pores(&image, &PoreParams::default(), tenth_mm()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn saved_document_matches_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let image = disc(64, 64, 32, 32, 10, WHITE, BLACK);
    let (result, annotated) = analyze_grains(&image, &GrainParams::default(), tenth_mm()).unwrap();

    let json_path = save_results(&result, AnalysisMode::Grain, Some(&annotated), dir.path()).unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();

    assert_eq!(doc["mode"], "grain");
    assert_eq!(doc["num_features"], result.num_features());
    assert_eq!(doc["records"].as_array().unwrap().len(), result.num_features());
    assert!(doc["records"][0]["phi"].is_number());
    assert!(json_path.with_extension("png").is_file());
}
