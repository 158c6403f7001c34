use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::interface::{DocumentHandler, ExtractedText, TranslationMap};
use super::ooxml::{self, Package, RunLayout};
use crate::error::DocumentError;

const DOCUMENT_PART: &str = "word/document.xml";

const WORD_RUNS: RunLayout = RunLayout {
    run_tag: b"w:r",
    text_tag: b"w:t",
    container_tag: None,
    preserve_space: true,
    separators: &[(b"w:br", '\n'), (b"w:cr", '\n'), (b"w:tab", '\t')],
};

/// Word documents: runs of the main document part, which covers body
/// paragraphs and table cells.
pub struct DocxHandler;

impl DocxHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentHandler for DocxHandler {
    fn extract(&self, path: &Path) -> Result<ExtractedText, DocumentError> {
        let mut package = Package::open(path)?;
        let xml = package
            .read_part(DOCUMENT_PART)
            .map_err(|e| ooxml::read_error(path, format!("missing {}: {}", DOCUMENT_PART, e)))?;

        let runs = ooxml::collect_runs(&xml, &WORD_RUNS).map_err(|e| ooxml::read_error(path, e))?;
        debug!("Found {} runs in {:?}", runs.len(), path);

        Ok(ExtractedText::from_runs(runs))
    }

    fn reinsert(
        &self,
        path: &Path,
        translations: &TranslationMap,
        output_path: &Path,
    ) -> Result<(), DocumentError> {
        let mut package = Package::open(path)?;
        let xml = package
            .read_part(DOCUMENT_PART)
            .map_err(|e| ooxml::read_error(path, format!("missing {}: {}", DOCUMENT_PART, e)))?;

        let (rewritten, count) = ooxml::rewrite_runs(&xml, &WORD_RUNS, translations)
            .map_err(|e| ooxml::read_error(path, e))?;
        debug!("Rewrote {} runs in {:?}", count, path);

        let mut parts = HashMap::new();
        parts.insert(DOCUMENT_PART.to_string(), rewritten);
        package.write_with_parts(output_path, parts)
    }
}
