use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::DocumentError;

/// Format-specific text extraction and reinsertion.
pub trait DocumentHandler: Send + Sync {
    /// Collect the distinct, non-blank run texts of the document at `path`.
    fn extract(&self, path: &Path) -> Result<ExtractedText, DocumentError>;

    /// Write a copy of `path` to `output_path` with every run rewritten through
    /// `translations`. The source file is left untouched.
    fn reinsert(
        &self,
        path: &Path,
        translations: &TranslationMap,
        output_path: &Path,
    ) -> Result<(), DocumentError>;
}

/// Distinct text fragments pulled from a document, in first-seen order.
///
/// Consumed by iteration; it cannot be rewound.
#[derive(Debug)]
pub struct ExtractedText {
    fragments: std::vec::IntoIter<String>,
}

impl ExtractedText {
    pub fn from_runs<I>(runs: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let fragments: Vec<String> = runs
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .filter(|text| seen.insert(text.clone()))
            .collect();

        Self {
            fragments: fragments.into_iter(),
        }
    }
}

impl Iterator for ExtractedText {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.fragments.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.fragments.size_hint()
    }
}

impl ExactSizeIterator for ExtractedText {}

/// Original fragment -> translated fragment, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationMap {
    entries: Vec<(String, String)>,
    /// Position of each original in `entries`.
    index: HashMap<String, usize>,
}

impl TranslationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every fragment to itself.
    pub fn identity<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        fragments.into_iter().map(|f| (f.clone(), f)).collect()
    }

    /// Insert or overwrite the translation of `original`.
    pub fn insert(&mut self, original: String, translated: String) {
        match self.index.get(&original) {
            Some(&at) => self.entries[at].1 = translated,
            None => {
                self.index.insert(original.clone(), self.entries.len());
                self.entries.push((original, translated));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(o, t)| (o.as_str(), t.as_str()))
    }

    /// Rewrite one run by literal substring replacement.
    ///
    /// Each original found in the run is replaced in map order, and later
    /// replacements see the output of earlier ones. Overlapping or nested
    /// originals therefore resolve by insertion order, and an original that
    /// also occurs inside a longer run is replaced there too. Returns `None`
    /// when nothing matched.
    pub fn substitute_fragments(&self, run_text: &str) -> Option<String> {
        let mut text = run_text.to_string();
        let mut changed = false;

        for (original, translated) in &self.entries {
            if text.contains(original.as_str()) {
                text = text.replace(original.as_str(), translated);
                changed = true;
            }
        }

        changed.then_some(text)
    }
}

impl FromIterator<(String, String)> for TranslationMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = TranslationMap::new();
        for (original, translated) in iter {
            map.insert(original, translated);
        }
        map
    }
}
