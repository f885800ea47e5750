// src/main.rs
mod extractors;
mod pipeline;
mod reader;
mod report;
mod storage;
mod utils;

use std::path::PathBuf;

use clap::Parser;
use pipeline::PipelineConfig;
use utils::AppError;

/// Command Line Interface for the registration record extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder with the source documents (.docx, .txt)
    #[arg(default_value = "medico")]
    input_dir: PathBuf,

    /// Output directory for the corpus dumps and the report
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Only remove verbatim copies of the boilerplate block
    #[arg(long)]
    exact: bool,

    /// File holding the boilerplate block to remove (default: built-in checklist)
    #[arg(long)]
    target_file: Option<PathBuf>,

    /// Minimum token overlap (0-1) for a fuzzy boilerplate match
    #[arg(long, default_value_t = extractors::normalize::DEFAULT_SIMILARITY_THRESHOLD)]
    similarity_threshold: f64,

    /// Minimum non-whitespace characters for an unterminated last block
    #[arg(long, default_value_t = extractors::segment::DEFAULT_MIN_TRAILING_CHARS)]
    min_trailing_chars: usize,

    /// Top-level key of the JSON report
    #[arg(long, default_value = report::DEFAULT_CORPUS_NAME)]
    corpus_name: String,

    /// Also export records and audit lists as CSV
    #[arg(long)]
    csv: bool,

    /// Debug mode - save annotated copies of every block
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig, AppError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AppError::Config(format!(
                "Similarity threshold must be between 0 and 1, got {}",
                self.similarity_threshold
            )));
        }

        let target = match &self.target_file {
            Some(path) => {
                tracing::info!("Loading boilerplate target from {}", path.display());
                std::fs::read_to_string(path)?
            }
            None => extractors::normalize::DEFAULT_TARGET.to_string(),
        };
        if target.trim().is_empty() {
            return Err(AppError::Config("Boilerplate target is empty".to_string()));
        }

        Ok(PipelineConfig {
            input_dir: self.input_dir,
            output_dir: self.output_dir,
            target,
            fuzzy: !self.exact,
            similarity_threshold: self.similarity_threshold,
            min_trailing_chars: self.min_trailing_chars,
            corpus_name: self.corpus_name,
            csv: self.csv,
            debug: self.debug,
        })
    }
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Resolve configuration
    let config = args.into_config()?;

    // 4. Run the batch
    let report = pipeline::run(&config)?;

    tracing::info!(
        "Report for '{}' written to {}",
        config.corpus_name,
        config.output_dir.join(storage::REPORT_FILE).display()
    );
    if report.stats().cpfs_repetidos > 0 {
        tracing::warn!("{} block(s) repeat a CPF seen earlier", report.stats().cpfs_repetidos);
    }

    Ok(())
}
