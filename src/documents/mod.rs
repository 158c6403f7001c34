pub mod interface;
pub mod ooxml;
pub mod docx;
pub mod pptx;

pub use interface::*;
pub use docx::DocxHandler;
pub use pptx::PptxHandler;

use std::path::Path;

use crate::error::DocumentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pptx,
}

impl DocumentFormat {
    /// Format for a filename, by extension, ignoring case.
    pub fn from_filename(filename: &str) -> Result<Self, DocumentError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "docx" => Ok(DocumentFormat::Docx),
            "pptx" => Ok(DocumentFormat::Pptx),
            _ => Err(DocumentError::UnsupportedFormat(format!(".{}", extension))),
        }
    }

    pub fn handler(&self) -> Box<dyn DocumentHandler> {
        match self {
            DocumentFormat::Docx => Box::new(DocxHandler::new()),
            DocumentFormat::Pptx => Box::new(PptxHandler::new()),
        }
    }
}

/// Pick the handler for `filename`. Does no I/O.
pub fn handler_for(filename: &str) -> Result<Box<dyn DocumentHandler>, DocumentError> {
    DocumentFormat::from_filename(filename).map(|format| format.handler())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub fn write_package(path: &Path, parts: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    pub fn docx_document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    /// One text shape per entry, plus a picture shape with no text frame.
    pub fn pptx_slide(shape_texts: &[&str]) -> String {
        let shapes: String = shape_texts
            .iter()
            .map(|text| {
                format!(
                    "<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>",
                    escape(text)
                )
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:pic><p:nvPicPr/></p:pic>{}</p:spTree></p:cSld></p:sld>"#,
            shapes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_by_extension_ignores_case() {
        assert_eq!(DocumentFormat::from_filename("report.docx").unwrap(), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_filename("DECK.PPTX").unwrap(), DocumentFormat::Pptx);
        assert_eq!(DocumentFormat::from_filename("a.b.Docx").unwrap(), DocumentFormat::Docx);
    }

    #[test]
    fn test_unsupported_extensions() {
        match DocumentFormat::from_filename("test.txt") {
            Err(DocumentError::UnsupportedFormat(ext)) => assert_eq!(ext, ".txt"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
        assert!(handler_for("legacy.doc").is_err());
        assert!(handler_for("no_extension").is_err());
    }

    #[test]
    fn test_handler_for_missing_file_does_no_io_until_used() {
        let handler = handler_for("/nonexistent/report.docx").unwrap();
        assert!(matches!(
            handler.extract(Path::new("/nonexistent/report.docx")),
            Err(DocumentError::Read { .. })
        ));
    }
}
