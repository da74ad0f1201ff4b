use clap::{ArgAction, Parser, ValueHint};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

mod config;
mod data_processor;
mod error;
mod fix_slope;
mod gpx_reader;
mod logger;
mod ride_file;
mod slope_report;

use config::AppConfig;
use data_processor::DataProcessorFactory;
use error::RideError;
use slope_report::{write_points_csv, write_summary_csv, SlopeSummary};

#[derive(Parser, Debug)]
#[command(author, version, about = "Recompute ride slope from altitude and distance", long_about = None)]
struct Cli {
    /// GPX files or folders to process
    #[arg(value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Output folder (overrides the config file)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Processor key to run, repeatable (overrides the config file)
    #[arg(short, long = "processor")]
    processors: Vec<String>,

    /// Worker threads, 0 for one per CPU
    #[arg(long)]
    threads: Option<usize>,

    /// List registered processors and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list: bool,

    /// Write the effective config to this TOML file and exit
    #[arg(long, value_hint = ValueHint::FilePath)]
    write_config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logger::init_logger();
    let cli = Cli::parse();
    log::debug!("Registered data processors: {}", registered_processors());

    if cli.list {
        print_processors();
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            AppConfig::load_from_file(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(output) = cli.output {
        config.output_folder = output;
    }
    if !cli.processors.is_empty() {
        config.processors = cli.processors;
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    config.validate()?;

    if let Some(path) = &cli.write_config {
        config.save_to_file(path)?;
        log::info!("Wrote config to {}", path.display());
        return Ok(());
    }

    let gpx_files = resolve_inputs(&cli.inputs)?;
    if gpx_files.is_empty() {
        return Err("no GPX files found in the given inputs".into());
    }

    fs::create_dir_all(&config.output_folder)?;
    log::info!(
        "Processing {} GPX files with [{}] into {}",
        gpx_files.len(),
        config.processors.join(", "),
        config.output_folder.display()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads())
        .build()?;

    let summaries: Vec<SlopeSummary> = pool.install(|| {
        gpx_files
            .par_iter()
            .map(|path| {
                let filename = display_name(path);
                match process_single_gpx_file(path, &config) {
                    Ok(summary) => summary,
                    Err(e) => {
                        log::error!("{}: {}", filename, e);
                        SlopeSummary::failed(&filename, &e)
                    }
                }
            })
            .collect()
    });

    let summary_path = config.output_folder.join("slope_summary.csv");
    write_summary_csv(&summaries, &summary_path)?;

    let ok = summaries.iter().filter(|s| s.is_ok()).count();
    log::info!(
        "Done: {} processed, {} failed, summary in {}",
        ok,
        summaries.len() - ok,
        summary_path.display()
    );
    Ok(())
}

fn process_single_gpx_file(path: &Path, config: &AppConfig) -> Result<SlopeSummary, RideError> {
    let filename = display_name(path);
    let mut ride = gpx_reader::read_gpx_ride(path)?;

    let changed = DataProcessorFactory::instance().auto_process(&mut ride, &config.processors)?;
    log::info!("{}: {} points, {} processors applied", filename, ride.len(), changed);

    if config.write_points {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "ride".to_string());
        let csv_path = config.output_folder.join(format!("{}_slope.csv", stem));
        write_points_csv(&ride, &csv_path)?;
    }

    Ok(SlopeSummary::from_ride(&filename, &ride))
}

fn resolve_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, RideError> {
    let mut gpx_files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            gpx_files.extend(gpx_reader::collect_gpx_files(input)?);
        } else if gpx_reader::is_gpx(input) {
            gpx_files.push(input.clone());
        } else {
            log::warn!("Skipping {}: not a GPX file or folder", input.display());
        }
    }
    Ok(gpx_files)
}

fn print_processors() {
    let factory = DataProcessorFactory::instance();
    for key in factory.keys() {
        if let Some(processor) = factory.processor(&key) {
            println!("{} - {}", key, processor.name());
            println!("    {}", processor.processor_config().explain());
        }
    }
}

fn registered_processors() -> String {
    DataProcessorFactory::instance().keys().join(", ")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix_slope::FIX_SLOPE_KEY;
    use crate::ride_file::SeriesType;

    const CLIMB: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Climb</name>
    <trkseg>
      <trkpt lat="46.0" lon="7.0"><ele>500.0</ele></trkpt>
      <trkpt lat="46.001" lon="7.0"><ele>510.0</ele></trkpt>
      <trkpt lat="46.002" lon="7.0"><ele>520.0</ele></trkpt>
      <trkpt lat="46.003" lon="7.0"><ele>530.0</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_cli_parses_repeated_processors() {
        let cli = Cli::parse_from([
            "fix-slope",
            "-p",
            FIX_SLOPE_KEY,
            "-p",
            "other",
            "--threads",
            "2",
            "rides",
        ]);
        assert_eq!(cli.processors, vec![FIX_SLOPE_KEY.to_string(), "other".to_string()]);
        assert_eq!(cli.threads, Some(2));
        assert_eq!(cli.inputs, vec![PathBuf::from("rides")]);
    }

    #[test]
    fn test_cli_write_config_flag() {
        let cli = Cli::parse_from(["fix-slope", "--write-config", "fix-slope.toml"]);
        assert_eq!(cli.write_config, Some(PathBuf::from("fix-slope.toml")));
        assert!(cli.inputs.is_empty());
    }

    #[test]
    fn test_registered_processors_lists_fix_slope() {
        assert!(registered_processors().contains(FIX_SLOPE_KEY));
    }

    #[test]
    fn test_process_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("climb.gpx");
        fs::write(&input, CLIMB).unwrap();

        let config = AppConfig {
            output_folder: dir.path().to_path_buf(),
            ..Default::default()
        };
        let summary = process_single_gpx_file(&input, &config).unwrap();

        assert!(summary.is_ok());
        assert!(summary.has_slope);
        assert_eq!(summary.ride_name, "Climb");
        assert_eq!(summary.points, 4);
        // 500 -> 500.2 over ~111 m
        assert!(summary.max_slope_percent > 0.0 && summary.max_slope_percent < 1.0);
        assert!(dir.path().join("climb_slope.csv").exists());

        let mut ride = gpx_reader::read_gpx_ride(&input).unwrap();
        DataProcessorFactory::instance()
            .process(FIX_SLOPE_KEY, &mut ride)
            .unwrap();
        assert!(ride.is_data_present(SeriesType::Slope));
    }

    #[test]
    fn test_unknown_processor_fails_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("climb.gpx");
        fs::write(&input, CLIMB).unwrap();

        let config = AppConfig {
            processors: vec!["no such processor".to_string()],
            output_folder: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(
            process_single_gpx_file(&input, &config),
            Err(RideError::UnknownProcessor(_))
        ));
    }

    #[test]
    fn test_resolve_inputs_mixes_files_and_folders() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("rides");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("a.gpx"), CLIMB).unwrap();
        fs::write(folder.join("b.gpx"), CLIMB).unwrap();
        let single = dir.path().join("c.gpx");
        fs::write(&single, CLIMB).unwrap();
        let other = dir.path().join("notes.txt");
        fs::write(&other, "x").unwrap();

        let files = resolve_inputs(&[folder, single.clone(), other]).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[2], single);
    }
}
