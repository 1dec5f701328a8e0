use std::path::{Path, PathBuf};
use std::time::Instant;
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use tracing::{error, info, warn};

use rock_micrograph_lib::calibration::{CalibrationFactor, CalibrationSource};
use rock_micrograph_lib::config::Config;
use rock_micrograph_lib::detection::{DetectionStrategy, FractureDetector, GrainDetector, PoreDetector};
use rock_micrograph_lib::errors::{RockAnalysisError, Result};
use rock_micrograph_lib::features::OrientationFilter;
use rock_micrograph_lib::image_io::{get_image_files_in_dir, load_image, InputImage};
use rock_micrograph_lib::logging::init_logging;
use rock_micrograph_lib::output::{save_results, save_results_as, timestamp_stem, CsvRecord};
use rock_micrograph_lib::pipeline::{analyze, AnalysisMode};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "RockMicrograph - Fracture, grain and pore measurement")]
struct Args {
    /// Analysis mode
    #[clap(short, long, value_enum)]
    mode: ModeArg,

    /// Path to input image or directory
    #[clap(short, long)]
    input: PathBuf,

    /// Base output directory (overwrites config)
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file; defaults are used when it does not exist
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Scanner resolution in dots per inch (overwrites config calibration)
    #[clap(long, conflicts_with_all = ["pixel_count", "real_length"])]
    dpi: Option<f64>,

    /// Pixel length of a reference object (manual calibration)
    #[clap(long, requires = "real_length")]
    pixel_count: Option<f64>,

    /// Real length of the reference object in millimetres (manual calibration)
    #[clap(long, requires = "pixel_count")]
    real_length: Option<f64>,

    /// Fracture orientation filter: all, horizontal or vertical
    #[clap(long)]
    orientation: Option<String>,

    /// Do not write the annotated PNG
    #[clap(long)]
    no_image: bool,

    /// Log level used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Fracture,
    Grain,
    Pore,
}

impl From<ModeArg> for AnalysisMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Fracture => AnalysisMode::Fracture,
            ModeArg::Grain => AnalysisMode::Grain,
            ModeArg::Pore => AnalysisMode::Pore,
        }
    }
}

/// Settings shared by every image of one run
struct RunContext {
    calibration: Option<CalibrationFactor>,
    output_dir: PathBuf,
    save_image: bool,
    use_parallel: bool,
}

/// Analyze one image and persist its results; returns the JSON path
fn process_image<S>(input: &InputImage, strategy: &S, ctx: &RunContext, stem: Option<String>) -> Result<PathBuf>
where
    S: DetectionStrategy,
    S::Record: CsvRecord,
{
    let (result, annotated) = analyze(&input.image, strategy, ctx.calibration)?;
    let annotated = if ctx.save_image { Some(&annotated) } else { None };

    let json_path = match stem {
        Some(stem) => save_results_as(&result, strategy.mode(), annotated, &ctx.output_dir, &stem)?,
        None => save_results(&result, strategy.mode(), annotated, &ctx.output_dir)?,
    };

    info!(
        image = %input.path.display(),
        features = result.num_features(),
        output = %json_path.display(),
        "image processed"
    );
    Ok(json_path)
}

/// Load and analyze one file of a directory run
fn process_path<S>(path: &Path, strategy: &S, ctx: &RunContext, run_stamp: &str) -> Result<PathBuf>
where
    S: DetectionStrategy,
    S::Record: CsvRecord,
{
    let input = load_image(path)?;
    // Files of one run share a timestamp, so the source name keeps them apart
    let stem = format!("{}_{}", run_stamp, input.filename);
    process_image(&input, strategy, ctx, Some(stem))
}

/// Analyze a single file or every image of a directory
fn run<S>(input_path: &Path, strategy: &S, ctx: &RunContext) -> Result<()>
where
    S: DetectionStrategy + Sync,
    S::Record: CsvRecord,
{
    if input_path.is_file() {
        info!(path = %input_path.display(), "processing single file");
        let input = load_image(input_path)?;
        process_image(&input, strategy, ctx, None)?;
        return Ok(());
    }

    if !input_path.is_dir() {
        return Err(RockAnalysisError::InvalidPath(input_path.to_path_buf()));
    }

    let image_files = get_image_files_in_dir(input_path)?;
    info!(path = %input_path.display(), images = image_files.len(), "processing directory");
    if image_files.is_empty() {
        warn!(path = %input_path.display(), "no supported images found");
        return Ok(());
    }

    let run_stamp = timestamp_stem();
    let outcomes: Vec<(&PathBuf, Result<PathBuf>)> = if ctx.use_parallel {
        image_files
            .par_iter()
            .map(|path| (path, process_path(path, strategy, ctx, &run_stamp)))
            .collect()
    } else {
        image_files
            .iter()
            .map(|path| (path, process_path(path, strategy, ctx, &run_stamp)))
            .collect()
    };

    let mut failures = 0usize;
    for (path, outcome) in &outcomes {
        if let Err(e) = outcome {
            failures += 1;
            error!(path = %path.display(), error = %e, "image failed");
        }
    }
    info!(
        succeeded = outcomes.len() - failures,
        failed = failures,
        "directory processed"
    );

    Ok(())
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if let Some(dpi) = args.dpi {
        config.calibration = Some(CalibrationSource::Dpi { dpi });
    } else if let (Some(pixel_count), Some(real_length_mm)) = (args.pixel_count, args.real_length) {
        config.calibration = Some(CalibrationSource::Manual { pixel_count, real_length_mm });
    }

    if let Some(orientation) = &args.orientation {
        config.fracture.orientation_filter = orientation.parse::<OrientationFilter>()?;
    }

    if args.no_image {
        config.save_annotated = false;
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = Config::from_file_or_default(&args.config)?;
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    let start_time = Instant::now();
    let mode = AnalysisMode::from(args.mode);
    let ctx = RunContext {
        calibration: config.calibration_factor()?,
        output_dir: config.output_dir(),
        save_image: config.save_annotated,
        use_parallel: config.use_parallel,
    };
    if ctx.calibration.is_none() {
        info!("no calibration supplied, reporting pixel units only");
    }

    match mode {
        AnalysisMode::Fracture => run(&args.input, &FractureDetector::new(config.fracture.clone())?, &ctx)?,
        AnalysisMode::Grain => run(&args.input, &GrainDetector::new(config.grain.clone())?, &ctx)?,
        AnalysisMode::Pore => run(&args.input, &PoreDetector::new(config.pore.clone())?, &ctx)?,
    }

    info!(
        mode = %mode,
        elapsed_s = start_time.elapsed().as_secs_f64(),
        "processing completed"
    );

    Ok(())
}
