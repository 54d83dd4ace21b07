//! Comparison of two directory trees.
//!
//! Documents are paired by file name. Pairs are compared on a fixed-size
//! rayon pool in bounded batches; within a batch, results are routed as
//! they arrive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use compare_core::error::{CompareError, Result};
use compare_core::options::CompareOptions;
use compare_core::plugin::PageRasterizer;
use compare_core::report::{FolderReport, ReportEntry};

use crate::document::DocumentComparator;

/// A document present in both trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPair {
    pub name: String,
    pub left: PathBuf,
    pub right: PathBuf,
}

/// Result of matching two trees by file name.
#[derive(Debug, Default)]
pub struct Pairing {
    pub pairs: Vec<DocumentPair>,
    /// One [`CompareError::MissingCounterpart`] per unpaired document.
    pub missing: Vec<CompareError>,
}

/// Outcome of one pair, as routed into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairStatus {
    Matched,
    Mismatched,
    Failed,
}

pub struct FolderDiff<'a> {
    rasterizer: &'a dyn PageRasterizer,
    options: &'a CompareOptions,
}

impl<'a> FolderDiff<'a> {
    pub fn new(rasterizer: &'a dyn PageRasterizer, options: &'a CompareOptions) -> Self {
        Self {
            rasterizer,
            options,
        }
    }

    /// Compare every same-named document under `left_dir` and `right_dir`.
    ///
    /// The right-hand copy of each matched document is copied into
    /// `match_dir`, and of each mismatched one into `mismatch_dir`; existing
    /// files there are left alone. Unreadable documents are reported as errors.
    pub fn run(
        &self,
        left_dir: &Path,
        right_dir: &Path,
        match_dir: &Path,
        mismatch_dir: &Path,
    ) -> Result<FolderReport> {
        let pairing = pair_documents(left_dir, right_dir)?;
        for missing in &pairing.missing {
            log::warn!("{}", missing);
        }

        for dir in [match_dir, mismatch_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                CompareError::Write(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_workers)
            .build()
            .map_err(|e| CompareError::Other(format!("Failed to start worker pool: {}", e)))?;

        let batches = pairing.pairs.chunks(self.options.batch_size);
        log::info!(
            "Comparing {} document pair(s) in {} batch(es) on {} worker(s)",
            pairing.pairs.len(),
            batches.len(),
            self.options.max_workers
        );

        let mut report = FolderReport::default();
        for (number, batch) in batches.enumerate() {
            log::info!("Batch {}: {} pair(s)", number + 1, batch.len());

            let (tx, rx) = mpsc::channel();
            pool.in_place_scope(|scope| {
                for pair in batch {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let status = self.process_pair(pair, match_dir, mismatch_dir);
                        // The receiver outlives the scope.
                        let _ = tx.send((pair.name.clone(), status));
                    });
                }
                drop(tx);

                for (name, status) in rx.iter() {
                    route(&mut report, &name, status);
                }
            });
        }

        log::info!(
            "{} matched, {} mismatched, {} error(s)",
            report.matches.len(),
            report.mismatches.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn process_pair(&self, pair: &DocumentPair, match_dir: &Path, mismatch_dir: &Path) -> PairStatus {
        let comparator = DocumentComparator::new(self.rasterizer, self.options);
        let verdict = match comparator.compare_paths(&pair.left, &pair.right) {
            Ok(verdict) => verdict,
            Err(e) => {
                log::error!("Error comparing {}: {}", pair.name, e);
                return PairStatus::Failed;
            }
        };

        let (status, dest_dir) = if verdict.matched {
            (PairStatus::Matched, match_dir)
        } else {
            (PairStatus::Mismatched, mismatch_dir)
        };

        match copy_if_absent(&pair.right, &dest_dir.join(&pair.name)) {
            Ok(()) => status,
            Err(e) => {
                log::error!("Error copying {}: {}", pair.name, e);
                PairStatus::Failed
            }
        }
    }
}

fn route(report: &mut FolderReport, name: &str, status: PairStatus) {
    match status {
        PairStatus::Matched => report.matches.push(ReportEntry::matched(name)),
        PairStatus::Mismatched => report.mismatches.push(ReportEntry::mismatched(name)),
        PairStatus::Failed => report.errors.push(ReportEntry::error(name)),
    }
}

/// Copy `src` to `dest` unless `dest` already exists.
fn copy_if_absent(src: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        log::debug!("{} already exists, not copying", dest.display());
        return Ok(());
    }
    std::fs::copy(src, dest).map_err(|e| {
        CompareError::Write(format!("Failed to copy to {}: {}", dest.display(), e))
    })?;
    Ok(())
}

/// Pair documents by file name across two trees.
///
/// Names are compared exactly, so pairing is case-sensitive. When a tree
/// holds the same name more than once, the first one found wins (files of a
/// directory before its subdirectories, each in sorted order).
pub fn pair_documents(left_dir: &Path, right_dir: &Path) -> Result<Pairing> {
    let left = collect_pdfs(left_dir)?;
    let right = collect_pdfs(right_dir)?;
    log::info!(
        "Found {} document(s) in {} and {} in {}",
        left.len(),
        left_dir.display(),
        right.len(),
        right_dir.display()
    );

    let mut pairing = Pairing::default();
    for (name, left_path) in &left {
        match right.get(name) {
            Some(right_path) => pairing.pairs.push(DocumentPair {
                name: name.clone(),
                left: left_path.clone(),
                right: right_path.clone(),
            }),
            None => pairing.missing.push(CompareError::MissingCounterpart(format!(
                "{} is missing from {}",
                name,
                right_dir.display()
            ))),
        }
    }
    for name in right.keys().filter(|name| !left.contains_key(*name)) {
        pairing.missing.push(CompareError::MissingCounterpart(format!(
            "{} is missing from {}",
            name,
            left_dir.display()
        )));
    }

    Ok(pairing)
}

/// Every PDF below `dir` (extension matched in any case), keyed by file name.
pub fn collect_pdfs(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    if !dir.is_dir() {
        return Err(CompareError::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&current)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            if path.is_dir() {
                subdirs.push(path);
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !has_pdf_extension(name) {
                continue;
            }
            if let Some(existing) = files.get(name) {
                log::warn!(
                    "Duplicate file name {}: keeping {}, ignoring {}",
                    name,
                    existing.display(),
                    path.display()
                );
                continue;
            }
            files.insert(name.to_string(), path.clone());
        }
        // Reversed so the walk visits subdirectories in sorted order.
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(files)
}

/// `.pdf` in any letter case; the rest of the name stays case-sensitive.
fn has_pdf_extension(name: &str) -> bool {
    name.len() > 4
        && name
            .get(name.len() - 4..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{options_in, write_fake, FakeRasterizer};

    fn names(entries: &[ReportEntry]) -> Vec<String> {
        let mut names: Vec<String> = entries.iter().map(|e| e.message.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_only_common_names_are_compared() {
        let dir = tempfile::TempDir::new().unwrap();
        write_fake(dir.path(), "a/x.pdf", &["X"]);
        write_fake(dir.path(), "a/y.pdf", &["Y"]);
        write_fake(dir.path(), "b/y.pdf", &["Y"]);
        write_fake(dir.path(), "b/z.pdf", &["Z"]);

        let pairing = pair_documents(&dir.path().join("a"), &dir.path().join("b")).unwrap();
        assert_eq!(pairing.pairs.len(), 1);
        assert_eq!(pairing.pairs[0].name, "y.pdf");
        assert_eq!(pairing.missing.len(), 2);
        let missing: Vec<String> = pairing.missing.iter().map(|e| e.to_string()).collect();
        assert!(missing[0].contains("x.pdf"));
        assert!(missing[1].contains("z.pdf"));
        assert!(pairing
            .missing
            .iter()
            .all(|e| matches!(e, CompareError::MissingCounterpart(_))));

        let options = options_in(dir.path());
        let rasterizer = FakeRasterizer::new();
        let report = FolderDiff::new(&rasterizer, &options)
            .run(
                &dir.path().join("a"),
                &dir.path().join("b"),
                &dir.path().join("match"),
                &dir.path().join("mismatch"),
            )
            .unwrap();

        assert_eq!(names(&report.matches), vec!["y.pdf"]);
        assert!(report.mismatches.is_empty());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_results_are_partitioned_and_copied() {
        let dir = tempfile::TempDir::new().unwrap();
        for i in 0..7 {
            let name = format!("same{}.pdf", i);
            write_fake(dir.path(), &format!("a/{}", name), &["Page", "Page two"]);
            write_fake(dir.path(), &format!("b/nested/{}", name), &["Page", "Page two"]);
        }
        write_fake(dir.path(), "a/changed.pdf", &["Page"]);
        write_fake(dir.path(), "b/changed.pdf", &["Page;0,0,20,20"]);
        write_fake(dir.path(), "a/broken.pdf", &["Page"]);
        write_fake(dir.path(), "b/broken.pdf", &["!unopenable"]);

        let options = CompareOptions {
            batch_size: 3,
            max_workers: 2,
            ..options_in(dir.path())
        };
        let rasterizer = FakeRasterizer::new();
        let match_dir = dir.path().join("match");
        let mismatch_dir = dir.path().join("mismatch");
        let report = FolderDiff::new(&rasterizer, &options)
            .run(&dir.path().join("a"), &dir.path().join("b"), &match_dir, &mismatch_dir)
            .unwrap();

        assert_eq!(report.total(), 9);
        assert_eq!(report.matches.len(), 7);
        assert_eq!(names(&report.mismatches), vec!["changed.pdf"]);
        assert_eq!(names(&report.errors), vec!["broken.pdf"]);
        assert_eq!(report.errors[0].title, "Error File");
        assert_eq!(report.mismatches[0].download_link, "changed.pdf");

        assert!(match_dir.join("same3.pdf").exists());
        assert!(mismatch_dir.join("changed.pdf").exists());
        assert!(!match_dir.join("broken.pdf").exists());
        assert!(!mismatch_dir.join("broken.pdf").exists());
    }

    #[test]
    fn test_existing_copies_are_kept() {
        let dir = tempfile::TempDir::new().unwrap();
        write_fake(dir.path(), "a/doc.pdf", &["Page"]);
        write_fake(dir.path(), "b/doc.pdf", &["Page"]);
        let match_dir = dir.path().join("match");
        std::fs::create_dir_all(&match_dir).unwrap();
        std::fs::write(match_dir.join("doc.pdf"), b"earlier run").unwrap();

        let options = options_in(dir.path());
        let rasterizer = FakeRasterizer::new();
        let report = FolderDiff::new(&rasterizer, &options)
            .run(
                &dir.path().join("a"),
                &dir.path().join("b"),
                &match_dir,
                &dir.path().join("mismatch"),
            )
            .unwrap();

        assert_eq!(report.matches.len(), 1);
        assert_eq!(std::fs::read(match_dir.join("doc.pdf")).unwrap(), b"earlier run");
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        let options = options_in(dir.path());
        let rasterizer = FakeRasterizer::new();
        let result = FolderDiff::new(&rasterizer, &options).run(
            &dir.path().join("a"),
            &dir.path().join("absent"),
            &dir.path().join("match"),
            &dir.path().join("mismatch"),
        );
        assert!(matches!(result, Err(CompareError::InvalidInput(_))));
    }

    #[test]
    fn test_collect_pdfs_matches_any_extension_case_recursively() {
        let dir = tempfile::TempDir::new().unwrap();
        write_fake(dir.path(), "t/one.pdf", &["1"]);
        write_fake(dir.path(), "t/deep/er/two.pdf", &["2"]);
        write_fake(dir.path(), "t/THREE.PDF", &["3"]);
        write_fake(dir.path(), "t/four.Pdf", &["4"]);
        std::fs::write(dir.path().join("t/notes.txt"), b"skip").unwrap();
        std::fs::write(dir.path().join("t/.pdf"), b"skip").unwrap();

        let found = collect_pdfs(&dir.path().join("t")).unwrap();
        let keys: Vec<&str> = found.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["THREE.PDF", "four.Pdf", "one.pdf", "two.pdf"]);
    }

    #[test]
    fn test_upper_case_extension_is_compared_and_pairing_stays_case_sensitive() {
        let dir = tempfile::TempDir::new().unwrap();
        write_fake(dir.path(), "a/SCAN.PDF", &["Scan"]);
        write_fake(dir.path(), "b/SCAN.PDF", &["Scan"]);
        write_fake(dir.path(), "a/memo.PDF", &["Memo"]);
        write_fake(dir.path(), "b/memo.pdf", &["Memo"]);

        let pairing = pair_documents(&dir.path().join("a"), &dir.path().join("b")).unwrap();
        let paired: Vec<&str> = pairing.pairs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(paired, vec!["SCAN.PDF"]);
        // memo.PDF and memo.pdf are different names
        assert_eq!(pairing.missing.len(), 2);

        let options = options_in(dir.path());
        let rasterizer = FakeRasterizer::new();
        let match_dir = dir.path().join("match");
        let report = FolderDiff::new(&rasterizer, &options)
            .run(
                &dir.path().join("a"),
                &dir.path().join("b"),
                &match_dir,
                &dir.path().join("mismatch"),
            )
            .unwrap();

        assert_eq!(names(&report.matches), vec!["SCAN.PDF"]);
        assert!(match_dir.join("SCAN.PDF").exists());
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let dir = tempfile::TempDir::new().unwrap();
        write_fake(dir.path(), "t/a/doc.pdf", &["first"]);
        write_fake(dir.path(), "t/b/doc.pdf", &["second"]);

        let found = collect_pdfs(&dir.path().join("t")).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found["doc.pdf"].ends_with("a/doc.pdf"));
    }
}
