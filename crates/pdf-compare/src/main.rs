//! pdf-compare: visual and textual PDF comparison, and signature page
//! detection.
//!
//! - `pdf-compare folders <left> <right> --match-dir M --mismatch-dir N`
//! - `pdf-compare compare <left.pdf> <right.pdf>`
//! - `pdf-compare signatures <pdf>... -o <dir>`
//! - `pdf-compare classify <pdf>`
//! - `pdf-compare keywords show|set|reset`

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use compare_core::options::CompareOptions;
use compare_engine::{DocumentComparator, FolderDiff};
use compare_pdf::{PageExtractor, PdfRasterizer, TesseractOcr};
use signature_detect::{
    KeywordClassifier, KeywordRegistry, KeywordSet, KeywordStore, SignatureExtraction,
};

#[derive(Parser)]
#[command(
    name = "pdf-compare",
    version,
    about = "Compare PDF documents and detect signature pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file, applied over the global and project-local ones
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Password for encrypted PDFs
    #[arg(long, global = true)]
    password: Option<String>,

    /// Rendering zoom factor (1.0 = 72 DPI, default: 2.0)
    #[arg(long, global = true)]
    zoom: Option<f64>,

    /// Worker threads (default: 4)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Documents per batch (default: 10)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Directory for original and annotated page images
    #[arg(long, global = true)]
    artifact_dir: Option<PathBuf>,

    /// Dump effective merged config as TOML and exit
    #[arg(long, global = true)]
    dump_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two directory trees of PDFs, copying each right-hand document
    /// into the match or mismatch directory
    Folders {
        left: PathBuf,
        right: PathBuf,

        #[arg(long)]
        match_dir: PathBuf,

        #[arg(long)]
        mismatch_dir: PathBuf,
    },

    /// Compare two PDF documents page by page
    Compare { left: PathBuf, right: PathBuf },

    /// Extract signature pages of each PDF into `<stem>_<n>_signatures.pdf`
    Signatures {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the signature pages of one PDF
    Classify { file: PathBuf },

    /// Show or change the signature keywords
    Keywords {
        #[command(subcommand)]
        action: KeywordAction,
    },
}

#[derive(Subcommand)]
enum KeywordAction {
    /// Print the active keyword lists
    Show,

    /// Replace both keyword lists
    Set {
        /// Primary keyword (repeatable)
        #[arg(long = "primary")]
        primary: Vec<String>,

        /// Secondary keyword (repeatable)
        #[arg(long = "secondary")]
        secondary: Vec<String>,
    },

    /// Restore the packaged default lists
    Reset,
}

/// Load config from the global, project-local and explicit TOML files.
/// Later files override earlier ones wholesale. Missing global and local
/// files are skipped; a file that exists but is malformed is an error.
fn load_config(explicit: Option<&Path>) -> Result<CompareOptions> {
    let global = dirs::config_dir().map(|dir| dir.join("pdf-compare").join("config.toml"));
    let local = PathBuf::from(".pdf-compare.toml");
    load_layers(global.as_deref(), &local, explicit)
}

fn load_layers(global: Option<&Path>, local: &Path, explicit: Option<&Path>) -> Result<CompareOptions> {
    let mut opts = CompareOptions::default();

    // 1. Global config: ~/.config/pdf-compare/config.toml
    if let Some(path) = global.filter(|p| p.exists()) {
        log::debug!("Loading config {}", path.display());
        opts = CompareOptions::load(path)?;
    }

    // 2. Project-local config: ./.pdf-compare.toml
    if local.exists() {
        log::debug!("Loading config {}", local.display());
        opts = CompareOptions::load(local)?;
    }

    // 3. --config
    if let Some(path) = explicit {
        opts = CompareOptions::load(path)?;
    }

    Ok(opts)
}

/// Apply CLI flags on top of config-loaded options.
/// Only overrides when the CLI flag was explicitly provided.
fn apply_cli_overrides(opts: &mut CompareOptions, cli: &Cli) -> Result<()> {
    if cli.verbose > 0 {
        opts.verbose = cli.verbose;
    }
    if cli.password.is_some() {
        opts.password = cli.password.clone();
    }
    if let Some(zoom) = cli.zoom {
        opts.zoom_factor = zoom;
    }
    if let Some(workers) = cli.workers {
        opts.max_workers = workers;
    }
    if let Some(batch_size) = cli.batch_size {
        opts.batch_size = batch_size;
    }
    if let Some(ref dir) = cli.artifact_dir {
        opts.artifact_dir = dir.clone();
    }
    opts.validate()?;
    Ok(())
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(cli.verbose)))
        .init();

    let options = match load_config(cli.config.as_deref())
        .and_then(|mut opts| apply_cli_overrides(&mut opts, &cli).map(|_| opts))
    {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    // Handle --dump-config
    if cli.dump_config {
        match options.to_toml_string() {
            Ok(s) => {
                println!("{}", s);
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    }

    let Some(command) = &cli.command else {
        eprintln!("Usage: pdf-compare <COMMAND> [options]   (see --help)");
        process::exit(1);
    };

    let result = match command {
        Commands::Folders {
            left,
            right,
            match_dir,
            mismatch_dir,
        } => run_folders(left, right, match_dir, mismatch_dir, &options),
        Commands::Compare { left, right } => run_compare(left, right, &options),
        Commands::Signatures { files, output } => run_signatures(files, output, &options),
        Commands::Classify { file } => run_classify(file, &options),
        Commands::Keywords { action } => run_keywords(action, &options),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", text);
    Ok(())
}

fn run_folders(
    left: &Path,
    right: &Path,
    match_dir: &Path,
    mismatch_dir: &Path,
    options: &CompareOptions,
) -> Result<()> {
    log::info!("Comparing {} against {}", left.display(), right.display());

    let rasterizer = PdfRasterizer::from_options(options);
    let report = FolderDiff::new(&rasterizer, options)
        .run(left, right, match_dir, mismatch_dir)
        .context("Folder comparison failed")?;

    log::info!(
        "Done: {} matched, {} mismatched, {} errors",
        report.matches.len(),
        report.mismatches.len(),
        report.errors.len()
    );
    print_json(&serde_json::to_value(&report)?)
}

fn run_compare(left: &Path, right: &Path, options: &CompareOptions) -> Result<()> {
    let rasterizer = PdfRasterizer::from_options(options);
    let verdict = DocumentComparator::new(&rasterizer, options)
        .compare_paths(left, right)
        .with_context(|| format!("Failed to compare {} and {}", left.display(), right.display()))?;
    print_json(&verdict.to_json())
}

fn run_signatures(files: &[PathBuf], output: &Path, options: &CompareOptions) -> Result<()> {
    let registry = open_registry(options)?;
    let keywords = registry.snapshot();

    let rasterizer = PdfRasterizer::from_options(options);
    let ocr = ocr_engine(options);
    let extractor = PageExtractor::new(options.password.clone());

    let outcomes = SignatureExtraction::new(&rasterizer, &ocr, &extractor, options)
        .run(files, &keywords, output)
        .context("Signature extraction failed")?;

    for outcome in &outcomes {
        log::info!("{}", outcome.message);
    }
    print_json(&serde_json::to_value(&outcomes)?)
}

fn run_classify(file: &Path, options: &CompareOptions) -> Result<()> {
    let registry = open_registry(options)?;
    let keywords = registry.snapshot();

    let rasterizer = PdfRasterizer::from_options(options);
    let ocr = ocr_engine(options);
    let result = KeywordClassifier::new(&rasterizer, &ocr)
        .classify_path(file, &keywords)
        .with_context(|| format!("Failed to classify {}", file.display()))?;
    print_json(&result.to_json())
}

fn run_keywords(action: &KeywordAction, options: &CompareOptions) -> Result<()> {
    let registry = open_registry(options)?;
    match action {
        KeywordAction::Show => {}
        KeywordAction::Set { primary, secondary } => {
            registry
                .set_keywords(KeywordSet::new(primary, secondary))
                .context("Failed to save keywords")?;
            log::info!("Keywords saved to {}", options.keywords_file.display());
        }
        KeywordAction::Reset => {
            registry
                .load_defaults()
                .context("Failed to save keywords")?;
            log::info!("Default keywords restored");
        }
    }
    let json = registry.snapshot().to_json()?;
    println!("{}", json);
    Ok(())
}

fn open_registry(options: &CompareOptions) -> Result<KeywordRegistry> {
    let store = KeywordStore::new(&options.keywords_file);
    KeywordRegistry::open(store)
        .with_context(|| format!("Failed to load keywords from {}", options.keywords_file.display()))
}

fn ocr_engine(options: &CompareOptions) -> TesseractOcr {
    if !TesseractOcr::is_available() {
        log::warn!("tesseract not found; pages without a text layer will not be recognized");
    }
    TesseractOcr::new(&options.ocr_language)
}
