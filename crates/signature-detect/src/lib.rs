//! Signature page detection.
//!
//! Pages are read from their text layer, or through OCR when a page has
//! none, and classified with a two-tier keyword rule: a page is a signature
//! page when it contains a primary keyword and no secondary phrase.

pub mod classifier;
pub mod extraction;
pub mod keywords;

pub use classifier::{ClassificationResult, KeywordClassifier};
pub use extraction::{output_name, signature_count, ExtractionOutcome, SignatureExtraction};
pub use keywords::{KeywordMatcher, KeywordRegistry, KeywordSet, KeywordStore};
