// src/utils/text_debug.rs
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::utils::error::AppError;

/// Wraps each highlighted span as `[[kind:text]]`. Spans that overlap an
/// earlier one are dropped.
pub fn annotate(text: &str, highlights: &[(usize, usize, &str)]) -> String {
    let mut sorted = highlights.to_vec();
    sorted.sort_by_key(|h| (h.0, std::cmp::Reverse(h.1)));

    let mut out = String::with_capacity(text.len() + highlights.len() * 8);
    let mut last_pos = 0;
    for (start, end, kind) in sorted {
        if start < last_pos || end > text.len() || start >= end {
            continue;
        }
        out.push_str(&text[last_pos..start]);
        out.push_str("[[");
        out.push_str(kind);
        out.push(':');
        out.push_str(&text[start..end]);
        out.push_str("]]");
        last_pos = end;
    }
    out.push_str(&text[last_pos..]);
    out
}

/// Finds every match of the labelled patterns and annotates them.
pub fn annotate_matches(text: &str, patterns: &[(Regex, &str)]) -> String {
    let highlights: Vec<(usize, usize, &str)> = patterns
        .iter()
        .flat_map(|(re, kind)| re.find_iter(text).map(move |m| (m.start(), m.end(), *kind)))
        .collect();
    annotate(text, &highlights)
}

/// Saves an annotated copy of `text` for manual review
pub fn save_debug_text(text: &str, path: &Path, patterns: &[(Regex, &str)]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, annotate_matches(text, patterns))?;
    tracing::debug!("Saved debug text to {}", path.display());
    Ok(())
}
