//! Small in-memory PDFs for tests.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};

/// One page of a generated PDF.
#[derive(Debug, Clone)]
pub struct FixturePage {
    pub text: Option<String>,
    /// MediaBox width in points; pages are 792pt tall.
    pub width: i64,
}

impl FixturePage {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            width: 612,
        }
    }

    pub fn blank() -> Self {
        Self {
            text: None,
            width: 612,
        }
    }

    pub fn with_width(mut self, width: i64) -> Self {
        self.width = width;
        self
    }
}

/// Build a PDF whose font resources live on the page tree root, so pages
/// inherit them.
pub fn pdf_bytes(pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut page_ids = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        if let Some(text) = &page.text {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap_or_default(),
        ));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(page.width),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        page_ids.push(page_id);
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
        ("Resources", Object::Reference(resources_id)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = doc.save_to(&mut buffer);
    buffer
}

/// Write [`pdf_bytes`] to `path`.
///
/// # Panics
/// Panics when the file cannot be written; intended for test setup only.
pub fn write_pdf(path: &Path, pages: &[FixturePage]) {
    std::fs::write(path, pdf_bytes(pages)).unwrap_or_else(|e| {
        panic!("failed to write fixture {}: {}", path.display(), e)
    });
}
