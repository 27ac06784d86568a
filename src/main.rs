//! SaccharumVision CLI
//!
//! Classifies sugarcane leaf images from the command line using the same
//! prediction pipeline as the HTTP server.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use walkdir::WalkDir;

use saccharum_vision::backend::backend_name;
use saccharum_vision::inference::{BatchItem, PredictOptions, PredictionStatus, Predictor};
use saccharum_vision::model::ClassSet;
use saccharum_vision::utils::{format_duration, format_percent};
use saccharum_vision::utils::logging::{init_logging, LogConfig};
use saccharum_vision::AppConfig;

/// SaccharumVision sugarcane leaf disease classifier
#[derive(Parser, Debug)]
#[command(name = "saccharum_vision")]
#[command(version)]
#[command(about = "Sugarcane leaf disease classification with test-time augmentation", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long, env = "SACCHARUM_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a single image or every image in a directory
    Predict {
        /// Path to input image or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Weights record, overrides the configured model path
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Class list JSON, overrides the configured path
        #[arg(long)]
        classes: Option<PathBuf>,

        /// Disable test-time augmentation
        #[arg(long, default_value = "false")]
        no_tta: bool,

        /// Minimum probability for a reliable prediction (0.0-1.0)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Number of augmented variants averaged with the original
        #[arg(short, long)]
        augmentations: Option<usize>,

        /// Random seed for reproducible augmentation
        #[arg(long)]
        seed: Option<u64>,

        /// Print results as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the class labels the model predicts
    Classes {
        /// Class list JSON, overrides the configured path
        #[arg(long)]
        classes: Option<PathBuf>,
    },

    /// Check that the configured model files and directories exist
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    let config = AppConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Predict {
            input,
            model,
            classes,
            no_tta,
            threshold,
            augmentations,
            seed,
            json,
        } => {
            let mut config = config;
            if let Some(model) = model {
                config.model_path = model;
            }
            if let Some(classes) = classes {
                config.classes_path = classes;
            }

            let defaults = config.default_options();
            let options = PredictOptions {
                use_tta: !no_tta,
                threshold: threshold.unwrap_or(defaults.threshold),
                num_augmentations: augmentations.unwrap_or(defaults.num_augmentations),
            };
            cmd_predict(&config, &input, &options, seed, json)?;
        }

        Commands::Classes { classes } => {
            let path = classes.unwrap_or(config.classes_path);
            cmd_classes(&path)?;
        }

        Commands::Check => {
            cmd_check(&config)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +--------------------------------------------------------------+
 |   SaccharumVision                                            |
 |   Sugarcane Leaf Disease Classification with Burn + Rust     |
 +--------------------------------------------------------------+
  "#
        .green()
    );
}

/// Image files under `input`, sorted; a file path is returned as-is
fn collect_images(input: &Path, config: &AppConfig) -> Vec<PathBuf> {
    if !input.is_dir() {
        return vec![input.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| config.is_allowed_extension(n))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn cmd_predict(
    config: &AppConfig,
    input: &Path,
    options: &PredictOptions,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input path not found: {}", input.display());
    }

    info!("Running prediction");
    info!("  Input: {:?}", input);
    info!("  Model: {:?}", config.model_path);

    if !json {
        print_banner();
        println!("{}", "Prediction Configuration:".cyan().bold());
        println!("  Input:     {}", input.display());
        println!("  Model:     {}", config.model_path.display());
        println!("  Backend:   {}", backend_name());
        println!("  Method:    {}", options.method());
        println!("  Threshold: {}", format_percent(options.threshold));
        println!();
    }

    let predictor = Predictor::from_config(config)?;
    let files = collect_images(input, config);
    if files.is_empty() {
        anyhow::bail!("No images found in {}", input.display());
    }

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let start = Instant::now();
    let items = predictor.predict_batch(&files, options, &mut rng);
    let elapsed = start.elapsed().as_secs_f64();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for item in &items {
        print_item(item);
    }

    let failed = items
        .iter()
        .filter(|i| i.result.status == PredictionStatus::Error)
        .count();
    println!(
        "{} {} image(s), {} failed in {}",
        "Done:".cyan().bold(),
        items.len(),
        failed,
        format_duration(elapsed)
    );
    Ok(())
}

fn print_item(item: &BatchItem) {
    let result = &item.result;
    let status = match result.status {
        PredictionStatus::Success => "SUCCESS".green().bold(),
        PredictionStatus::Warning => "WARNING".yellow().bold(),
        PredictionStatus::Error => "ERROR".red().bold(),
    };

    println!("{} {}", status, item.path.display());
    println!("  {}", result.message);
    if result.status.is_usable() {
        for (rank, entry) in result.top_3.iter().enumerate() {
            println!(
                "  {}. {:<10} {:>6.2}%",
                rank + 1,
                entry.class,
                entry.confidence
            );
        }
    }
    println!();
}

fn cmd_classes(path: &Path) -> Result<()> {
    let classes = ClassSet::load(path)?;
    println!("{}", "Classes:".cyan().bold());
    for (i, name) in classes.iter().enumerate() {
        println!("  {:>2}: {}", i, name);
    }
    Ok(())
}

fn cmd_check(config: &AppConfig) -> Result<()> {
    let errors = config.validate_paths();
    if errors.is_empty() {
        println!("{} configuration is valid", "OK:".green().bold());
        return Ok(());
    }

    for e in &errors {
        println!("{} {}", "Error:".red(), e);
    }
    anyhow::bail!("{} configuration problem(s)", errors.len())
}
