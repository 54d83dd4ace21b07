//! PDF page rendering via `pdftoppm` (poppler-utils).

use std::path::{Path, PathBuf};
use std::process::Command;

use compare_core::error::{CompareError, Result};
use compare_core::raster::Raster;
use compare_metrics::image_io;

/// Check that pdftoppm is available on the system.
pub fn check_pdftoppm() -> Result<()> {
    let which = Command::new("which")
        .arg("pdftoppm")
        .output()
        .map_err(|e| CompareError::Other(format!("Failed to check for pdftoppm: {}", e)))?;

    if !which.status.success() {
        return Err(CompareError::Other(
            "pdftoppm (poppler-utils) is required for page rendering. \
             Install with: brew install poppler (macOS) or apt install poppler-utils (Linux)"
                .to_string(),
        ));
    }
    Ok(())
}

/// Render one page (1-based `page_num`) to an RGB raster at `dpi`.
pub fn render_page(
    pdf_path: &Path,
    page_num: u32,
    dpi: u32,
    password: Option<&str>,
) -> Result<Raster> {
    let tmp_dir = tempfile::TempDir::new()?;
    let prefix = tmp_dir.path().join("page");

    log::debug!(
        "[pdftoppm] Rendering page {} of {} at {} DPI",
        page_num,
        pdf_path.display(),
        dpi
    );

    let mut command = Command::new("pdftoppm");
    command
        .arg("-png")
        .arg("-singlefile")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-f")
        .arg(page_num.to_string())
        .arg("-l")
        .arg(page_num.to_string());
    if let Some(password) = password {
        command.arg("-upw").arg(password);
    }

    let output = command
        .arg(pdf_path.as_os_str())
        .arg(prefix.as_os_str())
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CompareError::Other(
                "pdftoppm not found (install poppler-utils)".to_string(),
            ),
            _ => CompareError::UnreadablePage(format!("Failed to run pdftoppm: {}", e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CompareError::UnreadablePage(format!(
            "pdftoppm failed for page {} of {}: {}",
            page_num,
            pdf_path.display(),
            stderr.trim()
        )));
    }

    let rendered = rendered_path(&prefix);
    if !rendered.exists() {
        return Err(CompareError::UnreadablePage(format!(
            "No image rendered for page {} of {}",
            page_num,
            pdf_path.display()
        )));
    }

    image_io::read_raster(&rendered)
}

/// `-singlefile` writes exactly `<prefix>.png`.
fn rendered_path(prefix: &Path) -> PathBuf {
    prefix.with_extension("png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let prefix = dir.path().join("page");
        assert_eq!(rendered_path(&prefix), dir.path().join("page.png"));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        if check_pdftoppm().is_err() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let result = render_page(&dir.path().join("absent.pdf"), 1, 72, None);
        assert!(matches!(result, Err(CompareError::UnreadablePage(_))));
    }
}
