use crate::error::{Error, Result};
use lopdf::Document;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    PlainText,
    Pdf,
}

impl Extractor {
    /// `.pdf` files go through the PDF reader; everything else is read as UTF-8.
    pub fn for_path(path: &Path) -> Self {
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            Extractor::Pdf
        } else {
            Extractor::PlainText
        }
    }

    pub fn extract(&self, path: &Path) -> Result<String> {
        match self {
            Extractor::PlainText => fs::read_to_string(path).map_err(|e| failure(path, e)),
            Extractor::Pdf => extract_pdf(path),
        }
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    let doc = Document::load(path).map_err(|e| failure(path, e))?;

    let mut text = String::new();
    for page in doc.get_pages().keys() {
        let page_text = doc.extract_text(&[*page]).map_err(|e| failure(path, e))?;
        if page_text.trim().is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&page_text);
    }
    Ok(text)
}

fn failure(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::ExtractionFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
