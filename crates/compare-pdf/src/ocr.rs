//! Tesseract OCR via its command-line tool.

use std::process::Command;

use compare_core::error::{CompareError, Result};
use compare_core::plugin::OcrEngine;
use compare_core::raster::Raster;
use compare_metrics::image_io;

/// Runs `tesseract <image> stdout -l <language>` on a PNG of the raster.
pub struct TesseractOcr {
    language: String,
}

impl TesseractOcr {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }

    /// True when a `tesseract` binary can be found on `PATH`.
    pub fn is_available() -> bool {
        Command::new("which")
            .arg("tesseract")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "Tesseract"
    }

    fn recognize(&self, raster: &Raster) -> Result<String> {
        let tmp_dir = tempfile::TempDir::new()?;
        let image_path = tmp_dir.path().join("page.png");
        image_io::write_png(raster, &image_path)?;

        let output = Command::new("tesseract")
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(CompareError::Ocr(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CompareError::Ocr(
                "tesseract not found (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(CompareError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_page_yields_no_words() {
        if !TesseractOcr::is_available() {
            return;
        }
        let raster = Raster::filled(200, 100, &[255, 255, 255]);
        let text = TesseractOcr::default().recognize(&raster).unwrap();
        assert!(text.trim().is_empty());
    }

    #[test]
    fn test_unknown_language_fails() {
        if !TesseractOcr::is_available() {
            return;
        }
        let raster = Raster::filled(50, 50, &[255, 255, 255]);
        let result = TesseractOcr::new("no-such-language").recognize(&raster);
        assert!(matches!(result, Err(CompareError::Ocr(_))));
    }
}
