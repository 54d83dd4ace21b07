//! Page, document and folder comparison.
//!
//! [`PageComparator`] scores one page pair, [`DocumentComparator`] aggregates
//! pages into a document verdict and [`FolderDiff`] pairs and compares whole
//! directory trees on a worker pool.

pub mod document;
pub mod folder;
pub mod page;

pub use document::DocumentComparator;
pub use folder::{pair_documents, FolderDiff};
pub use page::PageComparator;

#[cfg(test)]
pub(crate) mod testing {
    //! A rasterizer over plain-text stand-ins for PDFs.
    //!
    //! Each line of a fake file is a page: `text[;shape]`. The shape is
    //! `x,y,w,h` for a black square on the white page, `wide` for a wider
    //! page, or `broken` for a page that fails to render. A line starting
    //! with `!` makes the whole document fail to open.

    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use compare_core::document::{Document, Page};
    use compare_core::error::{CompareError, Result};
    use compare_core::options::CompareOptions;
    use compare_core::plugin::PageRasterizer;
    use compare_core::raster::Raster;

    pub const WIDTH: u32 = 60;
    pub const HEIGHT: u32 = 40;

    pub struct FakeRasterizer {
        calls: AtomicUsize,
        width: u32,
        height: u32,
    }

    impl FakeRasterizer {
        pub fn new() -> Self {
            Self::with_size(WIDTH, HEIGHT)
        }

        /// Render every page at `width` x `height` instead of the default.
        pub fn with_size(width: u32, height: u32) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                width,
                height,
            }
        }

        pub fn render_calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn open_doc(&self, path: &Path) -> Document {
            self.open(path).unwrap()
        }
    }

    fn lines(path: &Path) -> Result<Vec<String>> {
        Ok(std::fs::read_to_string(path)?
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn split(line: &str) -> (&str, Option<&str>) {
        match line.split_once(';') {
            Some((text, shape)) => (text, Some(shape)),
            None => (line, None),
        }
    }

    impl PageRasterizer for FakeRasterizer {
        fn name(&self) -> &str {
            "fake"
        }

        fn open(&self, path: &Path) -> Result<Document> {
            let lines = lines(path)?;
            if lines.iter().any(|l| l.starts_with('!')) {
                return Err(CompareError::UnreadablePage(format!(
                    "cannot open {}",
                    path.display()
                )));
            }
            let pages = lines
                .iter()
                .enumerate()
                .map(|(i, line)| Page::new(i, Some(split(line).0.to_string())))
                .collect();
            Ok(Document::new(path, pages))
        }

        fn rasterize(&self, document: &Document, index: usize) -> Result<Raster> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lines = lines(&document.path)?;
            let line = lines
                .get(index)
                .ok_or_else(|| CompareError::InvalidInput(format!("no page {}", index)))?;

            match split(line).1 {
                None => Ok(Raster::filled(self.width, self.height, &[255, 255, 255])),
                Some("wide") => Ok(Raster::filled(
                    self.width + 20,
                    self.height,
                    &[255, 255, 255],
                )),
                Some("broken") => Err(CompareError::UnreadablePage(format!(
                    "page {} is corrupt",
                    index
                ))),
                Some(shape) => {
                    let v: Vec<u32> = shape.split(',').map(|n| n.parse().unwrap()).collect();
                    let mut raster = Raster::filled(self.width, self.height, &[255, 255, 255]);
                    for y in v[1]..v[1] + v[3] {
                        for x in v[0]..v[0] + v[2] {
                            raster.pixel_mut(x, y).copy_from_slice(&[0, 0, 0]);
                        }
                    }
                    Ok(raster)
                }
            }
        }
    }

    /// Write a fake document at `dir/relative`, creating parent directories.
    pub fn write_fake(dir: &Path, relative: &str, pages: &[&str]) -> PathBuf {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, pages.join("\n")).unwrap();
        path
    }

    /// Default options with artifacts under `dir/artifacts`.
    pub fn options_in(dir: &Path) -> CompareOptions {
        CompareOptions {
            artifact_dir: dir.join("artifacts"),
            ..CompareOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use compare_core::options::CompareOptions;
    use compare_pdf::fixtures::{write_pdf, FixturePage};
    use compare_pdf::render::check_pdftoppm;
    use compare_pdf::PdfRasterizer;

    use super::*;

    #[test]
    fn test_identical_pdfs_match_end_to_end() {
        if check_pdftoppm().is_err() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let pages = [
            FixturePage::text("Declarations"),
            FixturePage::text("Coverage"),
            FixturePage::text("Signature"),
        ];
        let left = dir.path().join("a/policy.pdf");
        let right = dir.path().join("b/policy.pdf");
        std::fs::create_dir_all(left.parent().unwrap()).unwrap();
        std::fs::create_dir_all(right.parent().unwrap()).unwrap();
        write_pdf(&left, &pages);
        write_pdf(&right, &pages);

        let options = CompareOptions {
            zoom_factor: 1.0,
            identical_file_fast_path: false,
            artifact_dir: dir.path().join("artifacts"),
            ..CompareOptions::default()
        };
        let rasterizer = PdfRasterizer::from_options(&options);
        let verdict = DocumentComparator::new(&rasterizer, &options)
            .compare_paths(&left, &right)
            .unwrap();

        assert!(verdict.matched);
        assert_eq!(verdict.pages.len(), 3);
        assert_eq!(verdict.artifact_count(), 0);
        assert!(!options.artifact_dir.exists());
    }

    #[test]
    fn test_changed_text_is_localized_end_to_end() {
        if check_pdftoppm().is_err() {
            return;
        }
        let dir = tempfile::TempDir::new().unwrap();
        let left = dir.path().join("left.pdf");
        let right = dir.path().join("right.pdf");
        write_pdf(&left, &[FixturePage::text("Premium due: 1000 USD")]);
        write_pdf(&right, &[FixturePage::text("Balance: none")]);

        let options = CompareOptions {
            artifact_dir: dir.path().join("artifacts"),
            ..CompareOptions::default()
        };
        let rasterizer = PdfRasterizer::from_options(&options);
        let verdict = DocumentComparator::new(&rasterizer, &options)
            .compare_paths(&left, &right)
            .unwrap();

        assert!(!verdict.matched);
        let page = verdict.pages[0].result.as_ref().unwrap();
        assert!(!page.regions.is_empty());
        assert_eq!(verdict.artifact_count(), 2);
    }
}
