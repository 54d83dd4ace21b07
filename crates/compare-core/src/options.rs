//! Comparison and classification options shared across the engines.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompareError, Result};

/// All tunables consumed by the comparison and classification engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    // -- General --
    pub verbose: u8,

    // -- Similarity --
    pub text_similarity_threshold: f64,
    pub image_similarity_threshold: f64,

    // -- Rendering --
    /// Sampling scale applied when rasterizing pages (1.0 = 72 DPI).
    pub zoom_factor: f64,

    // -- Difference regions --
    /// Per-pixel intensity cutoff (0-255) for the binary difference mask.
    pub diff_intensity_threshold: u8,
    pub region_size_threshold: u32,
    pub region_merge_distance: u32,
    pub region_enlarge_margin: u32,
    pub annotate_arrows: bool,
    pub artifact_dir: PathBuf,

    // -- Batching --
    pub batch_size: usize,
    pub max_workers: usize,
    /// Treat byte-identical files as matching without rendering them.
    pub identical_file_fast_path: bool,

    // -- Classification --
    pub ocr_language: String,
    pub keywords_file: PathBuf,

    // -- Input (CLI only, not from config file) --
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            verbose: 0,
            text_similarity_threshold: 0.95,
            image_similarity_threshold: 0.95,
            zoom_factor: 2.0,
            diff_intensity_threshold: 30,
            region_size_threshold: 20,
            region_merge_distance: 30,
            region_enlarge_margin: 5,
            annotate_arrows: true,
            artifact_dir: PathBuf::from("compare_artifacts"),
            batch_size: 10,
            max_workers: 4,
            identical_file_fast_path: true,
            ocr_language: "eng".to_string(),
            keywords_file: PathBuf::from("keywords.json"),
            password: None,
        }
    }
}

impl CompareOptions {
    /// Parse options from TOML text and check every value against its range.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let opts: CompareOptions = toml::from_str(contents)
            .map_err(|e| CompareError::Config(format!("Malformed configuration: {}", e)))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Load options from a TOML file. A missing file is an error here;
    /// callers that treat absence as "use defaults" check existence first.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CompareError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            CompareError::Config(msg) => {
                CompareError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CompareError::Config(format!("Failed to serialize options: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("text_similarity_threshold", self.text_similarity_threshold)?;
        check_unit("image_similarity_threshold", self.image_similarity_threshold)?;

        if !self.zoom_factor.is_finite() || self.zoom_factor < 1.0 {
            return Err(CompareError::Config(format!(
                "zoom_factor must be >= 1.0 (got {})",
                self.zoom_factor
            )));
        }
        if self.batch_size == 0 {
            return Err(CompareError::Config("batch_size must be > 0".to_string()));
        }
        if self.max_workers == 0 {
            return Err(CompareError::Config("max_workers must be > 0".to_string()));
        }
        if self.ocr_language.trim().is_empty() {
            return Err(CompareError::Config(
                "ocr_language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Rendering resolution in dots per inch for the configured zoom factor.
    pub fn render_dpi(&self) -> u32 {
        (72.0 * self.zoom_factor).round() as u32
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CompareError::Config(format!(
            "{} must be within [0, 1] (got {})",
            name, value
        )))
    }
}
