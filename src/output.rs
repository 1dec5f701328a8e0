use std::fs;
use std::path::{Path, PathBuf};
use chrono::Local;
use csv::Writer;
use image::RgbImage;
use serde::Serialize;
use tracing::info;

use crate::errors::{RockAnalysisError, Result};
use crate::image_io::save_image;
use crate::pipeline::{AnalysisMode, AnalysisResult};
use crate::units::{FractureRecord, GrainRecord, PoreRecord};

/// Flat tabular view of a record for CSV export
pub trait CsvRecord {
    fn header() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

fn float_cell(value: f64) -> String {
    format!("{:.6}", value)
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(float_cell).unwrap_or_default()
}

impl CsvRecord for FractureRecord {
    fn header() -> &'static [&'static str] {
        &["X1", "Y1", "X2", "Y2", "Length_Px", "Angle_Deg", "Orientation", "Length_Mm"]
    }

    fn fields(&self) -> Vec<String> {
        let [(x1, y1), (x2, y2)] = self.line.endpoints;
        vec![
            x1.to_string(),
            y1.to_string(),
            x2.to_string(),
            y2.to_string(),
            float_cell(self.line.length_px),
            float_cell(self.line.angle_deg),
            self.line.orientation.to_string(),
            optional_cell(self.length_mm),
        ]
    }
}

impl CsvRecord for GrainRecord {
    fn header() -> &'static [&'static str] {
        &["Area_Px", "Equivalent_Diameter_Px", "Area_Mm2", "Equivalent_Diameter_Mm", "Phi"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            float_cell(self.region.area_px),
            float_cell(self.region.equivalent_diameter_px),
            optional_cell(self.area_mm2),
            optional_cell(self.equivalent_diameter_mm),
            optional_cell(self.phi),
        ]
    }
}

impl CsvRecord for PoreRecord {
    fn header() -> &'static [&'static str] {
        &["Area_Px", "Equivalent_Diameter_Px", "Centroid_X", "Centroid_Y", "Area_Mm2", "Equivalent_Diameter_Mm"]
    }

    fn fields(&self) -> Vec<String> {
        let (cx, cy) = match self.region.centroid {
            Some((x, y)) => (x.to_string(), y.to_string()),
            None => (String::new(), String::new()),
        };
        vec![
            float_cell(self.region.area_px),
            float_cell(self.region.equivalent_diameter_px),
            cx,
            cy,
            optional_cell(self.area_mm2),
            optional_cell(self.equivalent_diameter_mm),
        ]
    }
}

/// Persisted JSON document
#[derive(Serialize)]
struct ResultDocument<'a, R: Serialize> {
    mode: AnalysisMode,
    #[serde(flatten)]
    result: &'a AnalysisResult<R>,
}

/// Write records to CSV
pub fn write_csv<R: CsvRecord, P: AsRef<Path>>(records: &[R], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(R::header())?;
    for record in records {
        writer.write_record(record.fields())?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the JSON document for one result
pub fn write_json<R: Serialize, P: AsRef<Path>>(
    result: &AnalysisResult<R>,
    mode: AnalysisMode,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let document = ResultDocument { mode, result };
    let content = serde_json::to_string_pretty(&document)?;
    fs::write(output_path, content)?;

    Ok(())
}

/// Local time stamp used as the default result file stem
pub fn timestamp_stem() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Persist one analysis under `<base_dir>/<mode>/<timestamp>.{json,csv,png}`.
///
/// Returns the path of the JSON document.
pub fn save_results<R, P>(
    result: &AnalysisResult<R>,
    mode: AnalysisMode,
    annotated: Option<&RgbImage>,
    base_dir: P,
) -> Result<PathBuf>
where
    R: Serialize + CsvRecord,
    P: AsRef<Path>,
{
    save_results_as(result, mode, annotated, base_dir, &timestamp_stem())
}

/// Same as [`save_results`] with an explicit file stem
pub fn save_results_as<R, P>(
    result: &AnalysisResult<R>,
    mode: AnalysisMode,
    annotated: Option<&RgbImage>,
    base_dir: P,
    stem: &str,
) -> Result<PathBuf>
where
    R: Serialize + CsvRecord,
    P: AsRef<Path>,
{
    if stem.is_empty() {
        return Err(RockAnalysisError::invalid("output file stem must not be empty"));
    }

    let mode_dir = base_dir.as_ref().join(mode.as_str());
    fs::create_dir_all(&mode_dir)?;

    let json_path = mode_dir.join(format!("{}.json", stem));
    write_json(result, mode, &json_path)?;
    write_csv(result.records(), mode_dir.join(format!("{}.csv", stem)))?;

    if let Some(image) = annotated {
        save_image(image, mode_dir.join(format!("{}.png", stem)))?;
    }

    info!(
        mode = %mode,
        features = result.num_features(),
        path = %json_path.display(),
        "results saved"
    );

    Ok(json_path)
}
