//! Run-level access to the XML parts of an Office Open XML package.
//!
//! Both DOCX and PPTX store visible text in "runs" (`w:r` / `a:r`) whose
//! characters sit in one or more text nodes (`w:t` / `a:t`). The walker below
//! keeps every parsed event so a part can be written back byte-for-byte except
//! for the runs that were rewritten.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::interface::TranslationMap;
use crate::error::DocumentError;

/// Element names that locate runs in one part type.
#[derive(Debug, Clone, Copy)]
pub struct RunLayout {
    pub run_tag: &'static [u8],
    pub text_tag: &'static [u8],
    /// When set, only runs nested inside this element count.
    pub container_tag: Option<&'static [u8]>,
    /// Mark rewritten text nodes `xml:space="preserve"`.
    pub preserve_space: bool,
    /// Empty elements inside a run that read as a character (breaks, tabs).
    pub separators: &'static [(&'static [u8], char)],
}

impl RunLayout {
    /// Character a separator element stands for. Breaks typed as anything
    /// but `textWrapping` (page and column breaks) carry no text.
    fn separator_for(&self, element: &BytesStart) -> Option<char> {
        let name = element.name();
        let (_, ch) = self
            .separators
            .iter()
            .find(|(tag, _)| *tag == name.as_ref())?;

        let typed_break = element
            .attributes()
            .flatten()
            .any(|attr| attr.key.local_name().as_ref() == b"type" && attr.value.as_ref() != b"textWrapping");
        (!typed_break).then_some(*ch)
    }
}

#[derive(Debug, Clone, Copy)]
struct TextSlot {
    /// Index of the text element's start tag.
    start: usize,
    /// Index of the character data event.
    text: usize,
}

#[derive(Debug, Clone, Copy)]
enum Piece {
    Text(TextSlot),
    Separator(char),
}

#[derive(Debug, Default)]
struct RunSpan {
    pieces: Vec<Piece>,
}

impl RunSpan {
    /// Text slots grouped by the separators between them, plus the separators.
    fn segments(&self) -> (Vec<Vec<TextSlot>>, Vec<char>) {
        let mut groups = vec![Vec::new()];
        let mut separators = Vec::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(slot) => {
                    if let Some(group) = groups.last_mut() {
                        group.push(*slot);
                    }
                }
                Piece::Separator(ch) => {
                    separators.push(*ch);
                    groups.push(Vec::new());
                }
            }
        }
        (groups, separators)
    }
}

/// Split `text` at `separators`, which must occur in it in exactly that order.
fn split_at_separators<'a>(text: &'a str, separators: &[char]) -> Option<Vec<&'a str>> {
    let found: Vec<(usize, char)> = text
        .char_indices()
        .filter(|(_, ch)| separators.contains(ch))
        .collect();
    if !found.iter().map(|(_, ch)| *ch).eq(separators.iter().copied()) {
        return None;
    }

    let mut parts = Vec::with_capacity(found.len() + 1);
    let mut from = 0;
    for (at, ch) in found {
        parts.push(&text[from..at]);
        from = at + ch.len_utf8();
    }
    parts.push(&text[from..]);
    Some(parts)
}

struct ParsedPart {
    events: Vec<Event<'static>>,
    runs: Vec<RunSpan>,
}

impl ParsedPart {
    fn parse(xml: &str, layout: &RunLayout) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut events = Vec::new();
        let mut runs: Vec<RunSpan> = Vec::new();
        // `None` marks a run outside the container; its end tag must not pop a real run.
        let mut run_stack: Vec<Option<usize>> = Vec::new();
        let mut container_depth = 0usize;
        let mut open_text: Option<usize> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| format!("XML error at position {}: {}", reader.buffer_position(), e))?;

            match &event {
                Event::Eof => break,
                Event::Start(e) => {
                    let name = e.name();
                    let name = name.as_ref();
                    if Some(name) == layout.container_tag {
                        container_depth += 1;
                    } else if name == layout.run_tag {
                        if layout.container_tag.is_none() || container_depth > 0 {
                            runs.push(RunSpan::default());
                            run_stack.push(Some(runs.len() - 1));
                        } else {
                            run_stack.push(None);
                        }
                    } else if name == layout.text_tag {
                        open_text = Some(events.len());
                    }
                }
                Event::End(e) => {
                    let name = e.name();
                    let name = name.as_ref();
                    if Some(name) == layout.container_tag {
                        container_depth = container_depth.saturating_sub(1);
                    } else if name == layout.run_tag {
                        run_stack.pop();
                    } else if name == layout.text_tag {
                        open_text = None;
                    }
                }
                Event::Empty(e) => {
                    if let (None, Some(Some(run))) = (open_text, run_stack.last()) {
                        if let Some(ch) = layout.separator_for(e) {
                            runs[*run].pieces.push(Piece::Separator(ch));
                        }
                    }
                }
                Event::Text(_) | Event::CData(_) => {
                    if let (Some(start), Some(Some(run))) = (open_text, run_stack.last()) {
                        runs[*run].pieces.push(Piece::Text(TextSlot {
                            start,
                            text: events.len(),
                        }));
                    }
                }
                _ => {}
            }

            events.push(event.into_owned());
        }

        Ok(Self { events, runs })
    }

    fn run_text(&self, run: &RunSpan) -> Result<String, String> {
        let mut text = String::new();
        for piece in &run.pieces {
            let slot = match piece {
                Piece::Text(slot) => slot,
                Piece::Separator(ch) => {
                    text.push(*ch);
                    continue;
                }
            };
            match &self.events[slot.text] {
                Event::Text(t) => {
                    let unescaped = t.unescape().map_err(|e| e.to_string())?;
                    text.push_str(&unescaped);
                }
                Event::CData(c) => {
                    text.push_str(&String::from_utf8_lossy(c));
                }
                _ => {}
            }
        }
        Ok(text)
    }

    fn run_texts(&self) -> Result<Vec<String>, String> {
        self.runs.iter().map(|run| self.run_text(run)).collect()
    }

    /// Returns the number of runs rewritten.
    ///
    /// Text between two separators lands in the first text node of that
    /// segment and the segment's other nodes are emptied. A run is left as it
    /// was when the rewritten text no longer has the run's separators in
    /// order, or has text for a segment without a text node.
    fn apply(&mut self, translations: &TranslationMap, layout: &RunLayout) -> Result<usize, String> {
        let mut edits: Vec<Vec<(TextSlot, String)>> = Vec::new();
        for run in &self.runs {
            let original = self.run_text(run)?;
            let replaced = match translations.substitute_fragments(&original) {
                Some(replaced) if replaced != original => replaced,
                _ => continue,
            };

            let (groups, separators) = run.segments();
            let Some(parts) = split_at_separators(&replaced, &separators) else {
                debug!("Keeping run {:?}: its breaks were not kept by {:?}", original, replaced);
                continue;
            };

            let mut run_edits = Vec::new();
            let mut placeable = true;
            for (group, part) in groups.iter().zip(parts) {
                match group.split_first() {
                    Some((first, rest)) => {
                        run_edits.push((*first, part.to_string()));
                        run_edits.extend(rest.iter().map(|slot| (*slot, String::new())));
                    }
                    None if part.is_empty() => {}
                    None => placeable = false,
                }
            }

            if placeable && !run_edits.is_empty() {
                edits.push(run_edits);
            } else {
                debug!("Keeping run {:?}: no text node for {:?}", original, replaced);
            }
        }

        let count = edits.len();
        for (slot, text) in edits.into_iter().flatten() {
            let filled = !text.is_empty();
            self.events[slot.text] = Event::Text(BytesText::new(&text).into_owned());
            if layout.preserve_space && filled {
                mark_preserve_space(&mut self.events[slot.start]);
            }
        }

        Ok(count)
    }

    fn serialize(self) -> Result<Vec<u8>, String> {
        let mut writer = Writer::new(Vec::new());
        for event in self.events {
            writer.write_event(event).map_err(|e| e.to_string())?;
        }
        Ok(writer.into_inner())
    }
}

fn mark_preserve_space(event: &mut Event<'static>) {
    if let Event::Start(start) = event {
        let has_space = start
            .attributes()
            .flatten()
            .any(|attr| attr.key.as_ref() == b"xml:space");
        if !has_space {
            start.push_attribute(("xml:space", "preserve"));
        }
    }
}

/// Text of every run in `xml`, in document order.
pub fn collect_runs(xml: &str, layout: &RunLayout) -> Result<Vec<String>, String> {
    ParsedPart::parse(xml, layout)?.run_texts()
}

/// Rewrite every run of `xml` through `translations`.
pub fn rewrite_runs(
    xml: &str,
    layout: &RunLayout,
    translations: &TranslationMap,
) -> Result<(Vec<u8>, usize), String> {
    let mut part = ParsedPart::parse(xml, layout)?;
    let count = part.apply(translations, layout)?;
    Ok((part.serialize()?, count))
}

/// An opened OOXML package.
pub struct Package {
    archive: ZipArchive<File>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let file = File::open(path).map_err(|e| read_error(path, e))?;
        let archive = ZipArchive::new(file).map_err(|e| read_error(path, e))?;
        Ok(Self { archive })
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    pub fn read_part(&mut self, name: &str) -> Result<String, zip::result::ZipError> {
        let mut entry = self.archive.by_name(name)?;
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Copy the package to `output_path`, substituting the given parts.
    pub fn write_with_parts(
        mut self,
        output_path: &Path,
        mut replaced: HashMap<String, Vec<u8>>,
    ) -> Result<(), DocumentError> {
        let file = File::create(output_path).map_err(|e| write_error(output_path, e))?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..self.archive.len() {
            let name = self
                .archive
                .by_index_raw(index)
                .map_err(|e| write_error(output_path, e))?
                .name()
                .to_string();

            match replaced.remove(&name) {
                Some(bytes) => {
                    writer
                        .start_file(name, options)
                        .map_err(|e| write_error(output_path, e))?;
                    writer
                        .write_all(&bytes)
                        .map_err(|e| write_error(output_path, e))?;
                }
                None => {
                    let entry = self
                        .archive
                        .by_index_raw(index)
                        .map_err(|e| write_error(output_path, e))?;
                    writer
                        .raw_copy_file(entry)
                        .map_err(|e| write_error(output_path, e))?;
                }
            }
        }

        writer.finish().map_err(|e| write_error(output_path, e))?;
        debug!("Wrote package {:?}", output_path);
        Ok(())
    }
}

pub fn read_error(path: &Path, reason: impl ToString) -> DocumentError {
    DocumentError::Read {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

pub fn write_error(path: &Path, reason: impl ToString) -> DocumentError {
    DocumentError::Write {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
