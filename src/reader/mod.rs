// src/reader/mod.rs
//! Loads source documents from a folder and joins them into one corpus.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

use crate::extractors::segment::{header_line, DELIMITER};
use crate::extractors::text::unify_newlines;
use crate::utils::error::ReadError;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DOCUMENT_PART: &str = "word/document.xml";

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// File name, used in the block header.
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderContents {
    pub documents: Vec<RawDocument>,
    /// Files that could not be read.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Docx,
    PlainText,
}

impl DocumentKind {
    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

// --- Folder Reading ---
/// Reads every `.docx` and `.txt` file in `dir`, in file-name order.
///
/// Only a missing or unreadable directory is an error. Files that fail to
/// parse are logged and listed in `skipped`.
pub fn read_folder<P: AsRef<Path>>(dir: P) -> Result<FolderContents, ReadError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ReadError::InputDirMissing(dir.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut contents = FolderContents::default();
    for path in paths {
        let Some(kind) = DocumentKind::of(&path) else {
            tracing::debug!("Ignoring unsupported file: {}", path.display());
            continue;
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        // Office lock files such as "~$ficha.docx"
        if name.starts_with("~$") {
            tracing::debug!("Ignoring lock file: {}", name);
            continue;
        }

        let result = match kind {
            DocumentKind::Docx => read_docx(&path),
            DocumentKind::PlainText => read_text_file(&path),
        };
        match result {
            Ok(text) => {
                tracing::info!("Read {} ({} chars)", name, text.chars().count());
                contents.documents.push(RawDocument { name, text });
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", name, e);
                contents.skipped.push(name);
            }
        }
    }

    tracing::info!(
        "Loaded {} document(s) from {} ({} skipped)",
        contents.documents.len(),
        dir.display(),
        contents.skipped.len()
    );
    Ok(contents)
}

fn read_text_file(path: &Path) -> Result<String, ReadError> {
    let bytes = fs::read(path)?;
    Ok(unify_newlines(&String::from_utf8_lossy(&bytes)))
}

/// Paragraph text of a `.docx` file, one paragraph per line.
pub fn read_docx(path: &Path) -> Result<String, ReadError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(ZipError::FileNotFound) => {
            return Err(ReadError::MissingDocumentPart(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    document_xml_to_text(&xml)
}

fn is_word(node: &roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WORD_NS)
}

/// Flattens WordprocessingML into lines. Runs contribute `w:t` text,
/// `w:tab` as a tab and `w:br`/`w:cr` as a line break. Whitespace-only
/// paragraphs are dropped.
pub fn document_xml_to_text(xml: &str) -> Result<String, ReadError> {
    let doc = roxmltree::Document::parse(xml)?;

    let mut lines = Vec::new();
    for paragraph in doc.descendants().filter(|n| is_word(n, "p")) {
        let mut line = String::new();
        for node in paragraph.descendants() {
            // Content of nested paragraphs (text boxes) belongs to them
            let owner = node.ancestors().find(|a| is_word(a, "p"));
            if owner != Some(paragraph) {
                continue;
            }
            let in_run = node.parent().is_some_and(|p| is_word(&p, "r"));
            if is_word(&node, "t") {
                line.push_str(node.text().unwrap_or(""));
            } else if in_run && is_word(&node, "tab") {
                line.push('\t');
            } else if in_run && (is_word(&node, "br") || is_word(&node, "cr")) {
                line.push('\n');
            }
        }
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }

    Ok(lines.join("\n"))
}

// --- Corpus Assembly ---
/// Frames each non-blank document with its header line and the delimiter.
pub fn concatenate(documents: &[RawDocument]) -> String {
    let mut corpus = String::new();
    for doc in documents {
        if doc.text.trim().is_empty() {
            tracing::warn!("Document {} has no text, leaving it out of the corpus", doc.name);
            continue;
        }
        corpus.push_str(&header_line(&doc.name));
        corpus.push('\n');
        corpus.push_str(&doc.text);
        corpus.push('\n');
        corpus.push_str(DELIMITER);
        corpus.push_str("\n\n");
    }
    corpus
}
