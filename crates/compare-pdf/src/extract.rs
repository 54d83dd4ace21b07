//! Writing a subset of a PDF's pages to a new file.
//!
//! The page tree of the source document is replaced by a flat tree whose
//! kids are the requested pages in the caller's order. Attributes a page
//! inherits from its ancestors are copied onto the page first, then objects
//! no longer reachable are pruned.

use std::path::Path;

use lopdf::{Dictionary, Document as PdfDocument, Object, ObjectId};

use compare_core::error::{CompareError, Result};

use crate::text::load_pdf;

/// Page attributes that may be inherited from the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Extracts pages into derived documents.
#[derive(Debug, Clone, Default)]
pub struct PageExtractor {
    password: Option<String>,
}

impl PageExtractor {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    /// Write the pages at `indices` (0-based, in the given order, duplicates
    /// allowed) of `source` to `dest`.
    ///
    /// The output is written to a temporary file next to `dest` and moved into
    /// place only once it is complete.
    pub fn extract(&self, source: &Path, indices: &[usize], dest: &Path) -> Result<()> {
        if indices.is_empty() {
            return Err(CompareError::InvalidInput(
                "No pages requested for extraction".to_string(),
            ));
        }

        let mut doc = load_pdf(source, self.password.as_deref())?;
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

        if let Some(&bad) = indices.iter().find(|&&i| i >= page_ids.len()) {
            return Err(CompareError::InvalidInput(format!(
                "Page index {} out of range ({} has {} pages)",
                bad,
                source.display(),
                page_ids.len()
            )));
        }

        let selected: Vec<ObjectId> = indices.iter().map(|&i| page_ids[i]).collect();
        rebuild_page_tree(&mut doc, &selected)?;
        doc.prune_objects();
        doc.compress();

        save_atomic(&mut doc, dest)?;
        log::info!(
            "Extracted {} page(s) from {} to {}",
            indices.len(),
            source.display(),
            dest.display()
        );
        Ok(())
    }
}

/// Point the catalog's page tree root at exactly `selected`, in order.
fn rebuild_page_tree(doc: &mut PdfDocument, selected: &[ObjectId]) -> Result<()> {
    let root_id = page_tree_root(doc)?;

    let mut kids = Vec::with_capacity(selected.len());
    let mut placed: Vec<ObjectId> = Vec::with_capacity(selected.len());

    for &page_id in selected {
        let mut page = flattened_page(doc, page_id)?;
        page.set("Parent", Object::Reference(root_id));

        let id = if placed.contains(&page_id) {
            doc.add_object(page)
        } else {
            doc.objects.insert(page_id, Object::Dictionary(page));
            placed.push(page_id);
            page_id
        };
        kids.push(Object::Reference(id));
    }

    let root = doc
        .get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| CompareError::Write(format!("Invalid page tree: {}", e)))?;
    root.set("Count", Object::Integer(kids.len() as i64));
    root.set("Kids", Object::Array(kids));
    root.remove(b"Parent");
    Ok(())
}

fn page_tree_root(doc: &PdfDocument) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| CompareError::Write(format!("Document has no page tree: {}", e)))
}

/// Copy of a page dictionary with inherited attributes made explicit.
fn flattened_page(doc: &PdfDocument, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| CompareError::Write(format!("Invalid page {:?}: {}", page_id, e)))?
        .clone();

    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited(doc, &page, key) {
            page.set(key, value);
        }
    }
    Ok(page)
}

/// Walk the `Parent` chain looking for `key`.
fn inherited(doc: &PdfDocument, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded in case of a cyclic tree.
    for _ in 0..64 {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn save_atomic(doc: &mut PdfDocument, dest: &Path) -> Result<()> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| CompareError::Write(format!("Failed to create {}: {}", dir.display(), e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| CompareError::Write(format!("Failed to create temp file: {}", e)))?;
    doc.save_to(&mut tmp)
        .map_err(|e| CompareError::Write(format!("Failed to write {}: {}", dest.display(), e)))?;
    tmp.persist(dest)
        .map_err(|e| CompareError::Write(format!("Failed to write {}: {}", dest.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{write_pdf, FixturePage};
    use crate::text::page_texts;

    fn media_widths(path: &Path) -> Vec<i64> {
        let doc = PdfDocument::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let page = doc.get_dictionary(id).unwrap();
                let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
                media[2].as_i64().unwrap()
            })
            .collect()
    }

    fn five_page_pdf(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("source.pdf");
        let pages: Vec<FixturePage> = (0..5)
            .map(|i| FixturePage::text(&format!("Page {}", i + 1)).with_width(600 + i))
            .collect();
        write_pdf(&path, &pages);
        path
    }

    #[test]
    fn test_extract_preserves_given_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = five_page_pdf(dir.path());
        let dest = dir.path().join("out.pdf");

        PageExtractor::default()
            .extract(&source, &[3, 0, 2], &dest)
            .unwrap();

        assert_eq!(media_widths(&dest), vec![603, 600, 602]);
    }

    #[test]
    fn test_extract_allows_duplicates() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = five_page_pdf(dir.path());
        let dest = dir.path().join("dup.pdf");

        PageExtractor::default()
            .extract(&source, &[1, 1, 4], &dest)
            .unwrap();

        assert_eq!(media_widths(&dest), vec![601, 601, 604]);
    }

    #[test]
    fn test_extracted_pages_keep_inherited_resources() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = five_page_pdf(dir.path());
        let dest = dir.path().join("text.pdf");

        PageExtractor::default().extract(&source, &[4], &dest).unwrap();

        let doc = PdfDocument::load(&dest).unwrap();
        let pages = page_texts(&doc);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.as_deref().unwrap().contains("Page 5"));
    }

    #[test]
    fn test_out_of_range_index_fails_without_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = five_page_pdf(dir.path());
        let dest = dir.path().join("bad.pdf");

        let result = PageExtractor::default().extract(&source, &[0, 5], &dest);
        assert!(matches!(result, Err(CompareError::InvalidInput(_))));
        assert!(!dest.exists());
    }

    #[test]
    fn test_empty_selection_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = five_page_pdf(dir.path());
        let result = PageExtractor::default().extract(&source, &[], &dir.path().join("x.pdf"));
        assert!(matches!(result, Err(CompareError::InvalidInput(_))));
    }

    #[test]
    fn test_unwritable_destination_is_write_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = five_page_pdf(dir.path());
        // A regular file where the destination directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let result =
            PageExtractor::default().extract(&source, &[0], &blocker.join("out.pdf"));
        assert!(matches!(result, Err(CompareError::Write(_))));
    }
}
