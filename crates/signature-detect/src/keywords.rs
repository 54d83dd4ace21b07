//! Keyword lists, their compiled matcher, and their persistence.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use compare_core::error::{CompareError, Result};

const DEFAULT_KEYWORDS_JSON: &str = include_str!("../data/default_keywords.json");

static DEFAULT_KEYWORDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::from_json(DEFAULT_KEYWORDS_JSON).unwrap_or_else(|e| {
        log::error!("Packaged default keywords are invalid: {}", e);
        KeywordSet::default()
    })
});

// ---------------------------------------------------------------------------
// KeywordSet
// ---------------------------------------------------------------------------

/// Primary (positive) and secondary (excluding) keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet {
    #[serde(rename = "primary_keywords", default)]
    pub primary: Vec<String>,
    #[serde(rename = "secondary_keywords", default)]
    pub secondary: Vec<String>,
}

impl KeywordSet {
    /// Build a set, trimming keywords and dropping empty ones.
    pub fn new<P, S>(primary: P, secondary: S) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let set = Self {
            primary: clean(primary),
            secondary: clean(secondary),
        };
        for keyword in set.primary.iter().filter(|k| set.secondary.contains(*k)) {
            log::warn!(
                "Keyword {:?} is both primary and secondary and can never match",
                keyword
            );
        }
        set
    }

    /// The lists shipped with the library.
    pub fn defaults() -> Self {
        DEFAULT_KEYWORDS.clone()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: KeywordSet = serde_json::from_str(json)
            .map_err(|e| CompareError::Config(format!("Malformed keyword file: {}", e)))?;
        Ok(Self::new(raw.primary, raw.secondary))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CompareError::Other(format!("Failed to serialize keywords: {}", e)))
    }
}

fn clean<I>(keywords: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// KeywordMatcher
// ---------------------------------------------------------------------------

/// A [`KeywordSet`] compiled for matching page text.
///
/// Primary keywords match case-insensitively as whole words, taken
/// literally. Secondary keywords match as case-insensitive substrings.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    primary: Option<Regex>,
    secondary: Vec<String>,
}

impl KeywordMatcher {
    pub fn new(set: &KeywordSet) -> Result<Self> {
        let primary = if set.primary.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = set.primary.iter().map(|k| regex::escape(k)).collect();
            let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
            Some(Regex::new(&pattern).map_err(|e| {
                CompareError::Config(format!("Invalid primary keywords: {}", e))
            })?)
        };
        let secondary = set.secondary.iter().map(|k| k.to_lowercase()).collect();
        Ok(Self { primary, secondary })
    }

    pub fn matches_primary(&self, text: &str) -> bool {
        self.primary.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// The first secondary keyword found in `text`, if any.
    pub fn excluded_by(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.secondary
            .iter()
            .find(|k| lower.contains(k.as_str()))
            .map(String::as_str)
    }

    /// A signature page has a primary keyword and no secondary keyword.
    pub fn is_signature_text(&self, text: &str) -> bool {
        self.matches_primary(text) && self.excluded_by(text).is_none()
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// A JSON keyword file on disk.
#[derive(Debug, Clone)]
pub struct KeywordStore {
    path: PathBuf,
}

impl KeywordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<KeywordSet> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            CompareError::Config(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        KeywordSet::from_json(&json).map_err(|e| match e {
            CompareError::Config(msg) => {
                CompareError::Config(format!("{}: {}", self.path.display(), msg))
            }
            other => other,
        })
    }

    /// Write the set and return once the file is fully in place.
    pub fn save(&self, set: &KeywordSet) -> Result<()> {
        let json = set.to_json()?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| {
            CompareError::Write(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let write_err =
            |e: std::io::Error| CompareError::Write(format!("{}: {}", self.path.display(), e));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        log::info!(
            "Saved {} primary and {} secondary keyword(s) to {}",
            set.primary.len(),
            set.secondary.len(),
            self.path.display()
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Process-wide current keywords, optionally backed by a [`KeywordStore`].
///
/// Readers take a snapshot and classify against it; replacing the lists
/// swaps the whole set at once, so a reader sees either the old or the new
/// lists, never a mix.
#[derive(Debug)]
pub struct KeywordRegistry {
    current: RwLock<Arc<KeywordSet>>,
    store: Option<KeywordStore>,
}

impl KeywordRegistry {
    /// Registry holding the packaged defaults, with no backing file.
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(Arc::new(KeywordSet::defaults())),
            store: None,
        }
    }

    /// Registry backed by `store`: its contents when the file exists,
    /// the packaged defaults otherwise.
    pub fn open(store: KeywordStore) -> Result<Self> {
        let initial = if store.exists() {
            store.load()?
        } else {
            KeywordSet::defaults()
        };
        Ok(Self {
            current: RwLock::new(Arc::new(initial)),
            store: Some(store),
        })
    }

    pub fn snapshot(&self) -> Arc<KeywordSet> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Replace both lists. The new set is persisted first; when that fails
    /// the current set is left unchanged.
    pub fn set_keywords(&self, set: KeywordSet) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(&set)?;
        }
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(set);
        Ok(())
    }

    /// Reset to the packaged defaults.
    pub fn load_defaults(&self) -> Result<()> {
        self.set_keywords(KeywordSet::defaults())
    }

    /// Write the current set to the backing store, if any.
    pub fn persist(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.snapshot()),
            None => Ok(()),
        }
    }
}
