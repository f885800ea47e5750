// src/extractors/segment.rs
//! Splits the normalized corpus into per-record blocks.
//!
//! Each source document is framed by a header line `---- <file> ----` and a
//! closing delimiter line of dashes. A block runs from its header to the
//! delimiter, the next header, or the end of input.

use once_cell::sync::Lazy;
use regex::Regex;

use super::text::non_whitespace_len;

// --- Constants ---
/// Closing delimiter written after every document.
pub const DELIMITER: &str = "---------------------------------";

/// Minimum non-whitespace characters for an unterminated trailing block.
pub const DEFAULT_MIN_TRAILING_CHARS: usize = 20;

// --- Regex Patterns (Lazy Static) ---
static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^---- (.+?) ----[ \t]*\r?$").expect("Failed to compile HEADER_RE")
});

// The exact delimiter line followed by a blank line (or the end of input).
// Shorter or longer dash rules inside a document are ordinary text.
static DELIMITER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^{}[ \t]*\r?(?:\n[ \t]*\r?(?:\n|\z)|\z)",
        regex::escape(DELIMITER)
    ))
    .expect("Failed to compile DELIMITER_RE")
});

/// Formats the header line that opens a document.
pub fn header_line(source: &str) -> String {
    format!("---- {} ----", source)
}

/// True for header and delimiter lines.
pub fn is_marker_line(line: &str) -> bool {
    let line = line.trim_end_matches(['\n', '\r']);
    HEADER_RE.is_match(line) || line.trim_end() == DELIMITER
}

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBlock<'a> {
    /// Position among the yielded blocks, starting at 0.
    pub index: usize,
    /// Source file named in the header.
    pub source: &'a str,
    /// Body between the markers, trimmed.
    pub text: &'a str,
}

/// Lazy iterator over the blocks of a corpus. Cloning restarts from the
/// clone's position.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    rest: &'a str,
    next_index: usize,
    min_trailing_chars: usize,
}

pub fn segment(cleaned: &str, min_trailing_chars: usize) -> Blocks<'_> {
    Blocks { rest: cleaned, next_index: 0, min_trailing_chars }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = RecordBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Anything before the next header is not part of a record
            let caps = HEADER_RE.captures(self.rest)?;
            let header = caps.get(0)?;
            let source = caps.get(1)?.as_str();
            if header.start() > 0 && !self.rest[..header.start()].trim().is_empty() {
                tracing::debug!("Discarding {} bytes of text outside any record", header.start());
            }

            let body_start = header.end();
            let after_header = &self.rest[body_start..];
            let next_header = HEADER_RE.find(after_header);
            let delimiter = DELIMITER_RE.find(after_header);

            let (body, terminated, consumed) = match (delimiter, next_header) {
                (Some(d), Some(h)) if d.start() < h.start() => {
                    (&after_header[..d.start()], true, body_start + d.end())
                }
                (Some(d), None) => (&after_header[..d.start()], true, body_start + d.end()),
                (_, Some(h)) => (&after_header[..h.start()], true, body_start + h.start()),
                (None, None) => (after_header, false, self.rest.len()),
            };
            self.rest = &self.rest[consumed..];

            // A delimiter glued to the next header still closes this body
            let body = body.trim();
            let body = body.strip_suffix(DELIMITER).map_or(body, str::trim_end);
            let keep = if terminated {
                !body.is_empty()
            } else {
                let content = non_whitespace_len(body);
                if content < self.min_trailing_chars {
                    tracing::debug!(
                        "Dropping unterminated trailing block '{}' ({} chars < {})",
                        source,
                        content,
                        self.min_trailing_chars
                    );
                }
                content >= self.min_trailing_chars
            };

            if keep {
                let block = RecordBlock { index: self.next_index, source, text: body };
                self.next_index += 1;
                return Some(block);
            }
            if !terminated {
                return None;
            }
            tracing::debug!("Skipping empty block for '{}'", source);
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn framed(name: &str, body: &str) -> String {
        format!("{}\n{}\n{}\n\n", header_line(name), body, DELIMITER)
    }

    #[test]
    fn splits_framed_documents_in_order() {
        let corpus = [framed("a.docx", "Nome: Ana"), framed("b.docx", "Nome: Bia\nCPF: 1")].concat();
        let blocks: Vec<_> = segment(&corpus, DEFAULT_MIN_TRAILING_CHARS).collect();
        assert_eq!(
            blocks,
            vec![
                RecordBlock { index: 0, source: "a.docx", text: "Nome: Ana" },
                RecordBlock { index: 1, source: "b.docx", text: "Nome: Bia\nCPF: 1" },
            ]
        );
    }

    #[test]
    fn leading_text_is_discarded() {
        let corpus = format!("lixo antes do primeiro arquivo\n{}", framed("a.docx", "Nome: Ana"));
        let blocks: Vec<_> = segment(&corpus, DEFAULT_MIN_TRAILING_CHARS).collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Nome: Ana");
    }

    #[test]
    fn zero_markers_yield_nothing() {
        assert_eq!(segment("Nome: Ana\nCPF: 1\n", 0).count(), 0);
        assert_eq!(segment("", 0).count(), 0);
    }

    #[test]
    fn trailing_block_needs_minimum_content() {
        let short = format!("{}{}\nabc\n", framed("a.docx", "Nome: Ana"), header_line("b.docx"));
        assert_eq!(segment(&short, 20).count(), 1);

        let long = format!(
            "{}{}\nNome: Bia Souza\nCPF: 22222222222\n",
            framed("a.docx", "Nome: Ana"),
            header_line("b.docx")
        );
        let blocks: Vec<_> = segment(&long, 20).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].source, "b.docx");
    }

    #[test]
    fn header_without_delimiter_ends_at_next_header() {
        let corpus = format!("{}\nNome: Ana\n{}", header_line("a.docx"), framed("b.docx", "Nome: Bia"));
        let blocks: Vec<_> = segment(&corpus, DEFAULT_MIN_TRAILING_CHARS).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "Nome: Ana");
        assert_eq!(blocks[1].index, 1);
    }

    #[test]
    fn empty_framed_documents_are_skipped_without_gaps_in_index() {
        let corpus = [framed("a.docx", "  "), framed("b.docx", "Nome: Bia")].concat();
        let blocks: Vec<_> = segment(&corpus, 0).collect();
        assert_eq!(blocks, vec![RecordBlock { index: 0, source: "b.docx", text: "Nome: Bia" }]);
    }

    #[test]
    fn iteration_is_lazy_and_restartable() {
        let corpus = [framed("a.docx", "A"), framed("b.docx", "B"), framed("c.docx", "C")].concat();
        let mut blocks = segment(&corpus, 0);
        assert_eq!(blocks.next().map(|b| b.text), Some("A"));

        let replay = blocks.clone();
        let rest: Vec<_> = blocks.map(|b| b.text).collect();
        let replayed: Vec<_> = replay.map(|b| b.text).collect();
        assert_eq!(rest, vec!["B", "C"]);
        assert_eq!(replayed, rest);
    }

    #[test]
    fn dash_rules_inside_a_document_do_not_end_it() {
        let body = "Nome: Ana\n--------------------\nCPF: 12345678901\nNome da mãe: Maria";
        let corpus = [framed("a.docx", body), framed("b.docx", "Nome: Bia")].concat();
        let blocks: Vec<_> = segment(&corpus, DEFAULT_MIN_TRAILING_CHARS).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, body);
        assert_eq!(blocks[1].text, "Nome: Bia");
    }

    #[test]
    fn delimiter_without_blank_line_is_not_kept_in_the_body() {
        let corpus = format!(
            "{}\nNome: Ana\n{}\n{}",
            header_line("a.docx"),
            DELIMITER,
            framed("b.docx", "Nome: Bia")
        );
        let blocks: Vec<_> = segment(&corpus, DEFAULT_MIN_TRAILING_CHARS).collect();
        assert_eq!(blocks[0].text, "Nome: Ana");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn delimiter_at_end_of_input_closes_the_block() {
        let corpus = format!("{}\nabc\n{}", header_line("a.docx"), DELIMITER);
        let blocks: Vec<_> = segment(&corpus, 20).collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "abc");
    }

    #[test]
    fn marker_lines_are_recognised() {
        assert!(is_marker_line("---- arquivo.docx ----\n"));
        assert!(is_marker_line(DELIMITER));
        assert!(is_marker_line(&format!("{}\n", DELIMITER)));
        assert!(!is_marker_line("--------------------"));
        assert!(!is_marker_line("- Endereço: Rua A"));
        assert!(!is_marker_line("Nome: Ana"));
    }
}
