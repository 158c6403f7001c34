use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::interface::{DocumentHandler, ExtractedText, TranslationMap};
use super::ooxml::{self, Package, RunLayout};
use crate::error::DocumentError;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

const SHAPE_RUNS: RunLayout = RunLayout {
    run_tag: b"a:r",
    text_tag: b"a:t",
    container_tag: Some(b"p:txBody"),
    preserve_space: false,
    separators: &[],
};

fn slide_part_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("static regex"))
}

/// Slide part names ordered by slide number.
fn slide_parts(package: &Package) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| {
            let number = slide_part_pattern()
                .captures(&name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())?;
            Some((number, name))
        })
        .collect();
    slides.sort();
    slides.into_iter().map(|(_, name)| name).collect()
}

/// PowerPoint decks: runs inside shape text frames on every slide.
pub struct PptxHandler;

impl PptxHandler {
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path) -> Result<(Package, Vec<String>), DocumentError> {
        let package = Package::open(path)?;
        if !package.has_part(PRESENTATION_PART) {
            return Err(ooxml::read_error(path, format!("missing {}", PRESENTATION_PART)));
        }
        let slides = slide_parts(&package);
        Ok((package, slides))
    }
}

impl Default for PptxHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentHandler for PptxHandler {
    fn extract(&self, path: &Path) -> Result<ExtractedText, DocumentError> {
        let (mut package, slides) = Self::open(path)?;

        let mut runs = Vec::new();
        for slide in &slides {
            let xml = package
                .read_part(slide)
                .map_err(|e| ooxml::read_error(path, format!("{}: {}", slide, e)))?;
            let slide_runs = ooxml::collect_runs(&xml, &SHAPE_RUNS)
                .map_err(|e| ooxml::read_error(path, format!("{}: {}", slide, e)))?;
            runs.extend(slide_runs);
        }

        debug!("Found {} runs across {} slides in {:?}", runs.len(), slides.len(), path);
        Ok(ExtractedText::from_runs(runs))
    }

    fn reinsert(
        &self,
        path: &Path,
        translations: &TranslationMap,
        output_path: &Path,
    ) -> Result<(), DocumentError> {
        let (mut package, slides) = Self::open(path)?;

        let mut parts = HashMap::new();
        for slide in slides {
            let xml = package
                .read_part(&slide)
                .map_err(|e| ooxml::read_error(path, format!("{}: {}", slide, e)))?;
            let (rewritten, count) = ooxml::rewrite_runs(&xml, &SHAPE_RUNS, translations)
                .map_err(|e| ooxml::read_error(path, format!("{}: {}", slide, e)))?;
            if count > 0 {
                debug!("Rewrote {} runs in {}", count, slide);
                parts.insert(slide, rewritten);
            }
        }

        package.write_with_parts(output_path, parts)
    }
}
