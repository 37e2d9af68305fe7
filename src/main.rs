use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use wordlens::config::{self, AppConfig};
use wordlens::{
    DefinitionResult, DetectionFile, Detector, OcrModels, OcrsRecognizer, OcrsWordDetector,
    WordPipeline,
};

#[derive(Parser)]
#[command(name = "wordlens")]
#[command(about = "Read printed words from a photo and look up their definitions")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// JSON array of detection boxes from an external detector.
    /// Without it, the OCR text detector finds the words.
    #[arg(short, long, value_name = "FILE")]
    detections: Option<PathBuf>,

    /// Config file (TOML). Defaults to the per-user config if present.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the OCR models
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Base URL of the definition service
    #[arg(long, value_name = "URL")]
    dictionary_url: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

fn load_config(args: &Cli) -> anyhow::Result<AppConfig> {
    let mut app_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => match config::default_config_path() {
            Some(path) if path.exists() => config::load_config(&path)?,
            _ => AppConfig::default(),
        },
    };

    if let Some(dir) = &args.model_dir {
        app_config.ocr.model_dir = Some(dir.clone());
    }
    if let Some(url) = &args.dictionary_url {
        app_config.lookup.base_url = url.clone();
    }

    Ok(app_config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let app_config = load_config(&args)?;

    // Models load once, when the pipeline is built, and are shared by detector and recognizer
    let models = Arc::new(OcrModels::from_config(&app_config.ocr)?);
    let detector: Arc<dyn Detector> = match &args.detections {
        Some(path) => Arc::new(DetectionFile::new(path)),
        None => Arc::new(OcrsWordDetector::new(models.clone())),
    };
    let recognizer = Arc::new(OcrsRecognizer::new(models));

    let mut pipeline = WordPipeline::new(detector, recognizer, &app_config)?;
    if let Some(debug_dir) = args.debug_out.clone() {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let result = pipeline.run_path(&args.image_path).await;

    if args.json {
        let body = match &result {
            Ok(result) => json!({ "status": "success", "words": result }),
            Err(e) => json!({ "error": format!("Processing failed: {e}") }),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        if result.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let result = result?;

    println!("\n=== Detected Words ===");
    if result.is_empty() {
        println!("No words detected.");
        return Ok(());
    }

    for entry in &result.entries {
        println!("\n{}", entry.word);
        match &entry.definition {
            DefinitionResult::Found(meanings) => {
                for meaning in meanings {
                    println!("  ({})", meaning.part_of_speech);
                    for (i, definition) in meaning.definitions.iter().enumerate() {
                        println!("    {}. {}", i + 1, definition);
                    }
                }
            }
            DefinitionResult::NotFound => println!("  Definition not found"),
            DefinitionResult::LookupError(message) => println!("  Lookup failed: {}", message),
        }
    }

    Ok(())
}
