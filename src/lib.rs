//! Trailcam - trail-camera photo organizer.
//!
//! This crate runs wildlife detection over a directory of trail-camera photos
//! and writes renamed copies plus JSON sidecars describing what was found.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod detect;
pub mod error;
pub mod model;
pub mod output;
pub mod photo;
pub mod pipeline;

use clap::{CommandFactory, Parser};
use cli::{Cli, Command, RunArgs};
use config::{BackendKind, Config, load_config, save_config, validate_config};
use detect::build_detector;
use model::{ensure_model, fetch_model, resolve_model_path};
use photo::Photo;
use pipeline::{BatchDriver, RunConfig, analyze_photo};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for trailcam CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.run.verbose, cli.run.quiet);

    // Remove half-written artifacts on interrupt; committed ones stay
    if let Err(e) = ctrlc::set_handler(|| {
        output::cleanup_in_flight();
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    if let Some(Command::Config { action }) = cli.command {
        return handle_config_command(action, cli.run.config.as_deref());
    }

    let mut config = load_config(cli.run.config.as_deref())?;
    apply_overrides(&mut config, &cli.run);
    validate_config(&config)?;

    if let Some(command) = cli.command {
        return handle_command(command, &config, &cli.run);
    }

    let Some(input_dir) = cli.input_dir else {
        let _ = Cli::command().print_help();
        std::process::exit(0);
    };

    run_batch(input_dir, &cli.run, &config)
}

/// Fold CLI flags over file values. Flags win.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(confidence) = args.confidence {
        config.defaults.confidence_threshold = confidence;
    }
    if let Some(backend) = args.backend {
        config.defaults.backend = backend;
    }
    if let Some(placement) = args.placement {
        config.defaults.placement = placement;
    }
    if args.save_all {
        config.defaults.save_all = true;
    }
    if args.move_originals {
        config.defaults.move_originals = true;
    }
    if args.recursive {
        config.defaults.recursive = true;
    }
    if let Some(path) = &args.model_path {
        config.local.model_path = Some(path.clone());
    }
    if let Some(endpoint) = &args.endpoint {
        config.remote.endpoint = Some(endpoint.clone());
    }
    if let Some(key) = &args.api_key {
        config.remote.api_key = Some(key.clone());
    }
}

/// Build the immutable settings for one batch run.
pub fn build_run_config(
    input_dir: PathBuf,
    output_dir: PathBuf,
    args: &RunArgs,
    config: &Config,
) -> RunConfig {
    RunConfig {
        input_dir,
        output_dir,
        threshold: config.defaults.confidence_threshold,
        save_all: config.defaults.save_all,
        move_originals: config.defaults.move_originals,
        placement: config.defaults.placement,
        recursive: config.defaults.recursive,
        max_species_in_name: config.defaults.max_species_in_name,
        show_progress: !args.quiet && !args.no_progress,
    }
}

fn run_batch(input_dir: PathBuf, args: &RunArgs, config: &Config) -> Result<()> {
    let Some(output_dir) = args.output_dir.clone() else {
        return Err(Error::ConfigValidation {
            message: "an output directory is required (-o/--output-dir)".to_string(),
        });
    };

    // Fail on a missing input directory before loading any model
    if !input_dir.is_dir() {
        return Err(Error::InputDirNotFound { path: input_dir });
    }

    let run_config = build_run_config(input_dir, output_dir, args, config);
    let detector = load_detector(config, run_config.show_progress)?;

    let driver = BatchDriver::new(run_config, detector);
    let summary = driver.run()?;
    summary.log();

    if let Some(path) = &args.summary {
        summary.write_json(path)?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}

fn load_detector(config: &Config, show_progress: bool) -> Result<Box<dyn detect::Detector>> {
    let model_path = match config.defaults.backend {
        BackendKind::Local => ensure_model(&config.local, show_progress)?,
        BackendKind::Remote => PathBuf::new(),
    };
    build_detector(config, &model_path)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT is noisy at info; only surface it with -v and up
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_command(command: Command, config: &Config, args: &RunArgs) -> Result<()> {
    match command {
        Command::Detect { image } => handle_detect_command(&image, config),
        Command::Model { action } => handle_model_command(action, config, args),
        Command::Config { action } => handle_config_command(action, args.config.as_deref()),
    }
}

fn handle_detect_command(image: &Path, config: &Config) -> Result<()> {
    let photo = Photo::new(image);
    if !photo.path().is_file() {
        return Err(Error::ImageRead {
            path: image.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let detector = load_detector(config, false)?;
    let threshold = config.defaults.confidence_threshold;
    let analysis = analyze_photo(&photo, detector.as_ref(), threshold).map_err(|f| f.source)?;

    println!("{}", photo.path().display());
    println!(
        "  timestamp: {} ({:?})",
        analysis.timestamp.value.format("%Y-%m-%d %H:%M:%S"),
        analysis.timestamp.origin
    );
    println!(
        "  backend:   {:?} / {}",
        analysis.result.backend.kind, analysis.result.backend.model
    );
    println!("  raw detections:");
    for d in &analysis.raw {
        println!("    {:<24} {:.3}", d.label, d.confidence);
    }
    println!("  canonical (threshold {threshold:.2}):");
    for d in &analysis.result.detections {
        let marker = if d.confidence >= threshold { '*' } else { ' ' };
        let unmapped = if d.mapped { "" } else { " (unmapped)" };
        println!("  {marker} {:<24} {:.3}{unmapped}", d.name, d.confidence);
    }
    if analysis.result.has_wildlife {
        println!("  species:   {}", analysis.result.species().join(", "));
    } else {
        println!("  species:   none (no wildlife)");
    }

    Ok(())
}

fn handle_model_command(action: cli::ModelAction, config: &Config, args: &RunArgs) -> Result<()> {
    use cli::ModelAction;

    match action {
        ModelAction::Fetch { force } => {
            let dest = resolve_model_path(&config.local)?;
            let path = fetch_model(&config.local, &dest, force, !args.quiet)?;
            println!("Model ready: {}", path.display());
            Ok(())
        }
    }
}

fn handle_config_command(action: cli::ConfigAction, explicit: Option<&Path>) -> Result<()> {
    use cli::ConfigAction;

    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config::config_file_path()?,
    };

    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  set [local].model_url or place a model at [local].model_path");
                println!("  trailcam model fetch");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            let shown = toml::to_string_pretty(&config.redacted())
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            print!("{shown}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use config::Placement;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut config = Config::default();
        config.defaults.placement = Placement::ByDate;

        let cli = parse(&[
            "trailcam",
            "in",
            "-o",
            "out",
            "-c",
            "0.6",
            "--placement",
            "by-species",
            "--save-all",
            "--endpoint",
            "https://example.test/detect",
        ]);
        apply_overrides(&mut config, &cli.run);

        assert_eq!(config.defaults.confidence_threshold, 0.6);
        assert_eq!(config.defaults.placement, Placement::BySpecies);
        assert!(config.defaults.save_all);
        assert_eq!(
            config.remote.endpoint.as_deref(),
            Some("https://example.test/detect")
        );
    }

    #[test]
    fn test_absent_flags_keep_file_values() {
        let mut config = Config::default();
        config.defaults.save_all = true;
        config.defaults.confidence_threshold = 0.8;

        let cli = parse(&["trailcam", "in"]);
        apply_overrides(&mut config, &cli.run);

        assert!(config.defaults.save_all);
        assert_eq!(config.defaults.confidence_threshold, 0.8);
    }

    #[test]
    fn test_run_config_progress_follows_quiet() {
        let config = Config::default();
        let cli = parse(&["trailcam", "in", "-o", "out", "-q"]);
        let run = build_run_config("in".into(), "out".into(), &cli.run, &config);
        assert!(!run.show_progress);
        assert_eq!(run.threshold, config.defaults.confidence_threshold);

        let cli = parse(&["trailcam", "in", "-o", "out"]);
        let run = build_run_config("in".into(), "out".into(), &cli.run, &config);
        assert!(run.show_progress);
    }
}
