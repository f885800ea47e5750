// src/extractors/section.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;

use crate::report::{Extracted, Field};

// --- Regex Patterns for Section Markers (Lazy Static) ---
// Start of the professional formation section. Accepts the label with or
// without cedilla/tilde, as typed in the source documents.
static FORMACAO_START_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)FORMA[ÇC][AÃ]O\s+PROFISSIONAL",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

// Start of the payment section, which runs to the end of the block
static RECEBIMENTO_START_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)RECEBIMENTO",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

// --- Data Structures ---
/// The three verbatim sections of a record block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    pub cadastro: Extracted,
    pub formacao: Extracted,
    pub recebimento: Extracted,
}

impl Sections {
    /// Registration text used for field lookups (the whole block when no
    /// other section marker exists).
    pub fn cadastro_text(&self) -> &str {
        self.cadastro.as_found().unwrap_or("")
    }
}

/// Earliest start offset among all patterns.
fn find_marker(text: &str, patterns: &[Regex]) -> Option<usize> {
    patterns.iter().filter_map(|re| re.find(text)).map(|m| m.start()).min()
}

fn section(text: &str, field: Field) -> Extracted {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Extracted::NotFound(field)
    } else {
        Extracted::Found(trimmed.to_string())
    }
}

/// Splits a block into registration, formation and payment sections.
///
/// Section labels stay inside their own section. A formation marker that
/// appears after the payment marker is malformed nesting: it is left inside
/// the payment text, which is truncated at the end of the block.
pub fn split_sections(block: &str) -> Sections {
    let formacao_at = find_marker(block, &FORMACAO_START_RE);
    let recebimento_at = find_marker(block, &RECEBIMENTO_START_RE);

    let (cadastro_end, formacao, recebimento) = match (formacao_at, recebimento_at) {
        (Some(f), Some(r)) if f < r => (
            f,
            section(&block[f..r], Field::Formacao),
            section(&block[r..], Field::Recebimento),
        ),
        (Some(f), None) => {
            tracing::debug!("No RECEBIMENTO marker, formation section runs to end of block");
            (f, section(&block[f..], Field::Formacao), Extracted::NotFound(Field::Recebimento))
        }
        (formacao_at, Some(r)) => {
            if formacao_at.is_some() {
                tracing::warn!(
                    "FORMACAO PROFISSIONAL appears after RECEBIMENTO; keeping it inside the payment section"
                );
            }
            (r, Extracted::NotFound(Field::Formacao), section(&block[r..], Field::Recebimento))
        }
        (None, None) => (
            block.len(),
            Extracted::NotFound(Field::Formacao),
            Extracted::NotFound(Field::Recebimento),
        ),
    };

    // A block that opens with a section marker has no registration text of
    // its own; the whole block is searched instead.
    let cadastro = match section(&block[..cadastro_end], Field::Cadastro) {
        Extracted::NotFound(_) => section(block, Field::Cadastro),
        found => found,
    };

    Sections { cadastro, formacao, recebimento }
}
