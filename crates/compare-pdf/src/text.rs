//! Loading PDFs with lopdf and reading their text layer.

use std::path::Path;

use lopdf::Document as PdfDocument;

use compare_core::document::Page;
use compare_core::error::{CompareError, Result};

/// Load a PDF, decrypting it with `password` when it is encrypted.
pub fn load_pdf(path: &Path, password: Option<&str>) -> Result<PdfDocument> {
    let mut doc = PdfDocument::load(path).map_err(|e| {
        CompareError::UnreadablePage(format!("Failed to load {}: {}", path.display(), e))
    })?;

    if doc.is_encrypted() {
        match password {
            Some(password) => doc.decrypt(password).map_err(|e| {
                CompareError::UnreadablePage(format!(
                    "Failed to decrypt {}: {}",
                    path.display(),
                    e
                ))
            })?,
            None => log::warn!(
                "{} is encrypted and no password was given",
                path.display()
            ),
        }
    }

    Ok(doc)
}

/// Text layer of every page, in page order. Pages whose text cannot be
/// extracted are reported without text so callers fall back to OCR.
pub fn page_texts(doc: &PdfDocument) -> Vec<Page> {
    doc.get_pages()
        .keys()
        .enumerate()
        .map(|(index, &page_num)| {
            let text = match doc.extract_text(&[page_num]) {
                Ok(text) => Some(text),
                Err(e) => {
                    log::warn!("No text layer for page {}: {}", page_num, e);
                    None
                }
            };
            Page::new(index, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{write_pdf, FixturePage};

    #[test]
    fn test_page_texts_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(
            &path,
            &[
                FixturePage::text("First page"),
                FixturePage::blank(),
                FixturePage::text("Signature of Insured"),
            ],
        );

        let doc = load_pdf(&path, None).unwrap();
        let pages = page_texts(&doc);
        assert_eq!(pages.len(), 3);
        assert!(pages[0].text.as_deref().unwrap().contains("First page"));
        assert!(!pages[1].has_text());
        assert!(pages[2]
            .text
            .as_deref()
            .unwrap()
            .contains("Signature of Insured"));
        assert_eq!(pages[2].index, 2);
    }

    #[test]
    fn test_load_garbage_is_unreadable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 this is not really a pdf").unwrap();
        assert!(matches!(
            load_pdf(&path, None),
            Err(CompareError::UnreadablePage(_))
        ));
    }
}
