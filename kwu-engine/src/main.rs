//! kwu-engine - keyword universe builder
//!
//! Drives the two pipeline stages over JSON files:
//! - `build` merges the main dataset with brand/competitor exports into
//!   `universe_v1.json`; with `--classifications` it also scores the universe
//!   and writes `universe_master.json`, one file per subset and
//!   `universe_stats.json`
//! - `init-config` writes the default configuration file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use kwu_common::config::{write_toml_config, ConfigResolver};
use kwu_common::EngineConfig;
use kwu_engine::files::{load_classifications, load_record_set, write_json};
use kwu_engine::{
    build_universe_master, build_universe_v1, SecondarySource, SubsetGenerator, UniverseStats,
    WeightResolver,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for kwu-engine
#[derive(Parser, Debug)]
#[command(name = "kwu-engine")]
#[command(about = "Merge keyword research exports into a scored keyword universe")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build Universe v1 and, given classifications, Universe Master and subsets
    Build(BuildArgs),

    /// Write the default configuration to FILE
    InitConfig {
        /// Destination file
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Main keyword dataset (JSON array of records)
    #[arg(long, value_name = "FILE")]
    main: PathBuf,

    /// Brand ranking export
    #[arg(long, value_name = "FILE")]
    brand: Option<PathBuf>,

    /// Brand display name (overrides configuration)
    #[arg(long, value_name = "NAME")]
    brand_name: Option<String>,

    /// Competitor ranking export, repeatable, merged in the order given
    #[arg(long = "competitor", value_name = "NAME=FILE", value_parser = parse_competitor)]
    competitors: Vec<(String, PathBuf)>,

    /// Classifier output: {"keyword": {"journey_phase": ..., "search_intent": ...}}
    #[arg(long, value_name = "FILE")]
    classifications: Option<PathBuf>,

    /// SERP feature to export as its own subset, repeatable
    #[arg(long = "serp-feature", value_name = "NAME")]
    serp_features: Vec<String>,

    /// Directory for the JSON outputs
    #[arg(long, value_name = "DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Configuration file (otherwise KWU_CONFIG, then the user config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_competitor(value: &str) -> std::result::Result<(String, PathBuf), String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=FILE, got '{}'", value))?;
    let name = name.trim();
    if name.is_empty() || path.trim().is_empty() {
        return Err(format!("expected NAME=FILE, got '{}'", value));
    }
    Ok((name.to_string(), PathBuf::from(path.trim())))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => {
            let config = ConfigResolver::new(args.config.clone())
                .resolve()
                .context("Failed to resolve configuration")?;
            init_tracing(&config);
            run_build(args, &config)
        }
        Command::InitConfig { path, force } => {
            init_tracing(&EngineConfig::default());
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            write_toml_config(&EngineConfig::default(), &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Default configuration written to {}", path.display());
            Ok(())
        }
    }
}

/// Install the tracing subscriber; RUST_LOG wins over `[logging] level`
fn init_tracing(config: &EngineConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting kwu-engine v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
}

fn run_build(args: BuildArgs, config: &EngineConfig) -> Result<()> {
    let main = load_record_set(&args.main, "main")
        .with_context(|| format!("Failed to load main dataset {}", args.main.display()))?;

    let mut secondary = Vec::new();
    if let Some(path) = &args.brand {
        let name = args
            .brand_name
            .clone()
            .unwrap_or_else(|| config.brand_name.clone());
        let records = load_record_set(path, &name)
            .with_context(|| format!("Failed to load brand export {}", path.display()))?;
        secondary.push(SecondarySource::brand(name, records));
    }
    for (name, path) in &args.competitors {
        let records = load_record_set(path, name)
            .with_context(|| format!("Failed to load competitor export {}", path.display()))?;
        secondary.push(SecondarySource::competitor(name.clone(), records));
    }

    let build = build_universe_v1(main, secondary).context("Failed to build Universe v1")?;
    for step in &build.steps {
        info!(
            source = %step.source,
            matched = step.report.matched,
            added = step.report.incoming_only,
            backfilled = step.report.backfilled_total(),
            "Merge step"
        );
    }
    write_output(&args.output_dir, "universe_v1", &build.universe.records)?;

    let Some(path) = &args.classifications else {
        info!("No classifications supplied, stopping after Universe v1");
        return Ok(());
    };

    let classifications = load_classifications(path)
        .with_context(|| format!("Failed to load classifications {}", path.display()))?;
    let resolver = WeightResolver::with_overrides(&config.weights);
    let master = build_universe_master(build.universe, &classifications, &resolver);
    write_output(&args.output_dir, "universe_master", &master.universe.records)?;

    let generator =
        SubsetGenerator::new(&config.subsets, Utc::now()).with_serp_features(&args.serp_features);
    for subset in generator.generate(&master.universe) {
        write_output(&args.output_dir, &subset.name, &subset)?;
    }

    let stats = UniverseStats::compute(&master.universe);
    write_output(&args.output_dir, "universe_stats", &stats)?;

    info!(
        keywords = stats.total_keywords,
        classified = stats.classified_keywords,
        output_dir = %args.output_dir.display(),
        "Build complete"
    );
    Ok(())
}

fn write_output<T: serde::Serialize + ?Sized>(dir: &Path, stem: &str, value: &T) -> Result<()> {
    let path = dir.join(format!("{}.json", stem));
    write_json(&path, value).with_context(|| format!("Failed to write {}", path.display()))
}
