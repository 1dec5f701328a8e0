// src/units.rs - Measurement records with optional physical units

use serde::Serialize;

use crate::calibration::CalibrationFactor;
use crate::features::{LineFeature, RegionFeature};
use crate::measurement::equivalent_diameter;

/// Grain-size phi scale, defined for positive diameters only
pub fn phi_scale(diameter_mm: f64) -> Option<f64> {
    if diameter_mm > 0.0 {
        Some(-diameter_mm.log2())
    } else {
        None
    }
}

/// One fracture line, in pixels and (when calibrated) millimetres
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FractureRecord {
    #[serde(flatten)]
    pub line: LineFeature,
    pub length_mm: Option<f64>,
}

impl FractureRecord {
    pub fn new(line: LineFeature, calibration: Option<CalibrationFactor>) -> Self {
        let length_mm = calibration.map(|c| c.to_length(line.length_px));
        Self { line, length_mm }
    }

    pub fn is_calibrated(&self) -> bool {
        self.length_mm.is_some()
    }
}

/// One grain, in pixels and (when calibrated) millimetres plus phi
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrainRecord {
    #[serde(flatten)]
    pub region: RegionFeature,
    pub area_mm2: Option<f64>,
    pub equivalent_diameter_mm: Option<f64>,
    pub phi: Option<f64>,
}

impl GrainRecord {
    pub fn new(region: RegionFeature, calibration: Option<CalibrationFactor>) -> Self {
        let (area_mm2, equivalent_diameter_mm, phi) = match calibration {
            Some(c) => {
                let area = c.to_area(region.area_px);
                let diameter = equivalent_diameter(area);
                (Some(area), Some(diameter), phi_scale(diameter))
            }
            None => (None, None, None),
        };
        Self { region, area_mm2, equivalent_diameter_mm, phi }
    }

    pub fn is_calibrated(&self) -> bool {
        self.area_mm2.is_some() && self.equivalent_diameter_mm.is_some()
    }
}

/// One pore, in pixels and (when calibrated) millimetres
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoreRecord {
    #[serde(flatten)]
    pub region: RegionFeature,
    pub area_mm2: Option<f64>,
    pub equivalent_diameter_mm: Option<f64>,
}

impl PoreRecord {
    pub fn new(region: RegionFeature, calibration: Option<CalibrationFactor>) -> Self {
        let (area_mm2, equivalent_diameter_mm) = match calibration {
            Some(c) => {
                let area = c.to_area(region.area_px);
                (Some(area), Some(equivalent_diameter(area)))
            }
            None => (None, None),
        };
        Self { region, area_mm2, equivalent_diameter_mm }
    }

    pub fn is_calibrated(&self) -> bool {
        self.area_mm2.is_some() && self.equivalent_diameter_mm.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Orientation;
    use assert_approx_eq::assert_approx_eq;

    fn region(area_px: f64) -> RegionFeature {
        RegionFeature {
            contour: Vec::new(),
            area_px,
            equivalent_diameter_px: equivalent_diameter(area_px),
            centroid: None,
        }
    }

    #[test]
    fn uncalibrated_records_have_no_physical_fields() {
        let grain = GrainRecord::new(region(314.0), None);
        assert!(grain.area_mm2.is_none());
        assert!(grain.equivalent_diameter_mm.is_none());
        assert!(grain.phi.is_none());

        let pore = PoreRecord::new(region(50.0), None);
        assert!(!pore.is_calibrated());
    }

    #[test]
    fn diameter_derives_from_converted_area() {
        let factor = CalibrationFactor::from_mm_per_pixel(0.1).unwrap();
        let grain = GrainRecord::new(region(400.0), Some(factor));
        let area = grain.area_mm2.unwrap();
        assert_approx_eq!(area, 4.0, 1e-9);
        assert_approx_eq!(grain.equivalent_diameter_mm.unwrap(), equivalent_diameter(4.0), 1e-12);
        assert_approx_eq!(
            grain.equivalent_diameter_mm.unwrap(),
            grain.region.equivalent_diameter_px * 0.1,
            1e-9
        );
    }

    #[test]
    fn phi_of_one_millimetre_is_present_and_zero() {
        assert_eq!(phi_scale(1.0), Some(-0.0));
        assert_eq!(phi_scale(0.25), Some(2.0));
        assert_eq!(phi_scale(0.0), None);

        // A grain whose diameter is exactly 1 mm keeps phi == 0.0
        let area_px = std::f64::consts::PI / 4.0 * 100.0;
        let factor = CalibrationFactor::from_mm_per_pixel(0.1).unwrap();
        let grain = GrainRecord::new(region(area_px), Some(factor));
        let phi = grain.phi.expect("phi must be present for a 1 mm grain");
        assert_approx_eq!(phi, 0.0, 1e-9);
    }

    #[test]
    fn zero_area_grain_has_no_phi() {
        let factor = CalibrationFactor::from_mm_per_pixel(0.1).unwrap();
        let grain = GrainRecord::new(region(0.0), Some(factor));
        assert!(grain.is_calibrated());
        assert!(grain.phi.is_none());
    }

    #[test]
    fn fracture_length_scales_linearly() {
        let line = LineFeature {
            endpoints: [(0, 0), (100, 0)],
            length_px: 100.0,
            angle_deg: 0.0,
            orientation: Orientation::Horizontal,
        };
        let factor = CalibrationFactor::from_mm_per_pixel(0.1).unwrap();
        let record = FractureRecord::new(line.clone(), Some(factor));
        assert_approx_eq!(record.length_mm.unwrap(), 10.0, 1e-9);
        assert!(FractureRecord::new(line, None).length_mm.is_none());
    }

    #[test]
    fn serialized_record_uses_flat_field_names() {
        let record = PoreRecord::new(
            RegionFeature { centroid: Some((3, 4)), ..region(10.0) },
            None,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["centroid"], serde_json::json!([3, 4]));
        assert!(json["area_mm2"].is_null());
        assert!(json.get("contour").is_none());
        assert_approx_eq!(json["area_px"].as_f64().unwrap(), 10.0, 1e-12);
    }
}
