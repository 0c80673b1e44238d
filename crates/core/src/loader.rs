use crate::error::LoadError;
use crate::models::{Document, FileType};
use lopdf::Document as PdfDocument;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, LoadError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, LoadError> {
        let document =
            PdfDocument::load(path).map_err(|error| LoadError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| LoadError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(LoadError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}

/// Files directly inside `dir` with a recognised extension, sorted by path.
pub fn discover_documents(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!(path = %dir.display(), "data directory does not exist");
        return Vec::new();
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if FileType::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// Loads every recognised file in `dir`. A file that fails to parse is
/// recorded in [`LoadReport::skipped`] and never aborts the load.
pub fn load_documents(dir: &Path) -> LoadReport {
    load_documents_with(dir, &LopdfExtractor)
}

pub fn load_documents_with(dir: &Path, pdf: &dyn PdfExtractor) -> LoadReport {
    let mut report = LoadReport::default();

    for path in discover_documents(dir) {
        match load_file(&path, pdf) {
            Ok(documents) => {
                info!(file = %path.display(), documents = documents.len(), "loaded");
                report.documents.extend(documents);
            }
            Err(error) => {
                warn!(file = %path.display(), reason = %error, "skipping unreadable file");
                report.skipped.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    info!(
        documents = report.documents.len(),
        skipped = report.skipped.len(),
        "document load finished"
    );
    report
}

pub fn load_file(path: &Path, pdf: &dyn PdfExtractor) -> Result<Vec<Document>, LoadError> {
    let source_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoadError::MissingFileName(path.display().to_string()))?
        .to_string();

    let file_type = FileType::from_path(path)
        .ok_or_else(|| LoadError::UnsupportedExtension(path.display().to_string()))?;

    let documents = match file_type {
        FileType::Pdf => pdf
            .extract_pages(path)?
            .into_iter()
            .map(|page| Document {
                text: page.text,
                source_name: source_name.clone(),
                file_type,
                page: Some(page.number),
            })
            .collect(),
        FileType::Markdown => {
            let raw = String::from_utf8(fs::read(path)?)?;
            vec![Document {
                text: markdown_to_text(&raw)?,
                source_name,
                file_type,
                page: None,
            }]
        }
        FileType::Text => vec![Document {
            text: String::from_utf8(fs::read(path)?)?,
            source_name,
            file_type,
            page: None,
        }],
    };

    Ok(documents)
}

/// Reduces markdown to readable prose: markup is dropped, paragraph breaks kept.
pub fn markdown_to_text(markdown: &str) -> Result<String, LoadError> {
    // Order matters: rules before list bullets, bold before italics.
    let rules: [(&str, &str); 11] = [
        (r"(?m)^[ \t]*(```|~~~).*$", ""),
        (r"(?m)^[ \t]{0,3}#{1,6}[ \t]+", ""),
        (r"(?m)^[ \t]{0,3}>[ \t]?", ""),
        (r"(?m)^[ \t]{0,3}([-*_][ \t]*){3,}$", ""),
        (r"(?m)^([ \t]*)[-*+][ \t]+", "$1"),
        (r"!\[([^\]]*)\]\([^)]*\)", "$1"),
        (r"\[([^\]]+)\]\([^)]*\)", "$1"),
        (r"\*\*([^*]+)\*\*", "$1"),
        (r"__([^_]+)__", "$1"),
        (r"\*([^*\n]+)\*", "$1"),
        (r"`([^`]+)`", "$1"),
    ];

    let mut text = markdown.replace("\r\n", "\n");
    for (pattern, replacement) in rules {
        text = Regex::new(pattern)?
            .replace_all(&text, replacement)
            .into_owned();
    }

    let blank_runs = Regex::new(r"\n[ \t]*(\n[ \t]*)+\n")?;
    Ok(blank_runs.replace_all(&text, "\n\n").trim().to_string())
}
