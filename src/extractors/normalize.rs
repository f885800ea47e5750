// src/extractors/normalize.rs
//! Boilerplate removal over the concatenated corpus.
//!
//! Exact mode strips verbatim copies of the target block. Fuzzy mode runs the
//! exact pass first and then scores line windows against the target with a
//! token-set overlap, so it always removes at least what exact mode removes.

// --- Imports ---
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::segment::is_marker_line;
use super::text::{fold, unify_newlines};

// --- Constants ---
/// Minimum token-set overlap for a window to count as a boilerplate variant.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Minimum overlap between a corpus line and some target line for that line
/// to be removable.
const LINE_SIMILARITY: f64 = 0.5;

/// The "FASE 2" checklist pasted into most records.
pub const DEFAULT_TARGET: &str = concat!(
    " FASE 2️⃣\n",
    "Documentos necessários: \n",
    "✅Carteira de identidade frente e verso: anexo\n",
    "✅Carteira CRM frente/verso: declaração anexo\n",
    "✅Diploma medicina: certificado anexo\n",
    "✅Certidão de Casamento (se casado): anexo\n",
    "✅Comprovante de endereço: anexo\n",
    "✅PIS / Carteira de trabalho : PIS 12964420094 carteira anexo\n",
    "✅ Certificado de residência médica OU declaraçao de residência médica EM CURSO\n",
    "✅ Certificado de especialidade/pós graduação: anexo \n",
    "✅Certificados de cursos diversos (ACLS, ATLS, PALS ou qualquer outro): anexo\n",
    "✅Currículo atualizado: anexo\n",
    "Esses documentos devem ser entregues até 20/05/2021. Podem ser enviados escaneados ou digitalizados para o email OU para meu WhatsApp.\n",
    "medicals.apoio@gmail.com\n",
    "Qualquer dúvida entre em contato comigo\n",
    "☎️ 027 99937-6146 ",
);

// --- Regex Patterns (Lazy Static) ---
static MULTI_NEWLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Failed to compile MULTI_NEWLINE_RE"));

static COMPARE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,:.;()\-]+").expect("Failed to compile COMPARE_PUNCT_RE"));

// Words that vary between copies of the checklist without changing its meaning
static STOPWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:anexo|v)\b").expect("Failed to compile STOPWORD_RE"));

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCorpus {
    pub text: String,
    /// Number of boilerplate instances removed.
    pub removed: usize,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    target: String,
    fuzzy: bool,
    threshold: f64,
}

impl Normalizer {
    pub fn new(target: impl Into<String>, fuzzy: bool) -> Self {
        Self {
            target: collapse_blank_runs(&unify_newlines(&target.into())),
            fuzzy,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Removes the target block from `corpus`. Never fails; a target that
    /// matches nothing leaves the text as is (apart from blank-line collapsing).
    pub fn normalize(&self, corpus: &str) -> NormalizedCorpus {
        if self.target.trim().is_empty() {
            tracing::warn!("Normalization target is blank, skipping boilerplate removal");
            return NormalizedCorpus { text: corpus.to_string(), removed: 0 };
        }

        // Collapsing can line up a new copy, so repeat until none is left
        let mut text = collapse_blank_runs(corpus);
        let mut exact_removed = 0;
        loop {
            let (cleaned, count) = remove_exact(&text, &self.target);
            if count == 0 {
                break;
            }
            exact_removed += count;
            text = collapse_blank_runs(&cleaned);
        }
        if exact_removed > 0 {
            tracing::info!("Removed {} exact occurrence(s) of the target block", exact_removed);
        } else {
            tracing::info!("No exact occurrence of the target block found");
        }

        let mut removed = exact_removed;
        if self.fuzzy {
            let (cleaned, fuzzy_removed) = remove_similar(&text, &self.target, self.threshold);
            tracing::info!(
                "Fuzzy pass removed {} variant block(s) (threshold {:.2})",
                fuzzy_removed,
                self.threshold
            );
            text = collapse_blank_runs(&cleaned);
            removed += fuzzy_removed;
        }

        NormalizedCorpus { text, removed }
    }
}

fn collapse_blank_runs(text: &str) -> String {
    MULTI_NEWLINE_RE.replace_all(text, "\n\n").into_owned()
}

fn remove_exact(corpus: &str, target: &str) -> (String, usize) {
    let count = corpus.matches(target).count();
    if count == 0 {
        return (corpus.to_string(), 0);
    }
    (corpus.replace(target, ""), count)
}

/// A non-blank line of the corpus with its byte span (newline included).
struct LineSpan<'a> {
    start: usize,
    end: usize,
    text: &'a str,
    /// Close enough to some target line to be part of a variant block.
    boilerplate: bool,
}

fn looks_like_target_line(line: &str, target_lines: &[HashSet<String>]) -> bool {
    if is_marker_line(line) {
        return false;
    }
    let tokens = token_set(line);
    target_lines.iter().any(|t| similarity(&tokens, t) >= LINE_SIMILARITY)
}

/// Shrinks a scored window to its outermost boilerplate lines, then grows it
/// over adjacent boilerplate lines that the fixed window did not reach.
fn fit_span(lines: &[LineSpan<'_>], first: usize, last: usize, floor: usize) -> Option<(usize, usize)> {
    let mut start = (first..=last).find(|&k| lines[k].boilerplate)?;
    let mut end = (start..=last).rev().find(|&k| lines[k].boilerplate)?;
    while start > floor && lines[start - 1].boilerplate {
        start -= 1;
    }
    while end + 1 < lines.len() && lines[end + 1].boilerplate {
        end += 1;
    }
    Some((start, end))
}

fn remove_similar(text: &str, target: &str, threshold: f64) -> (String, usize) {
    let target_tokens = token_set(target);
    let target_lines: Vec<HashSet<String>> =
        target.lines().map(token_set).filter(|t| !t.is_empty()).collect();
    let window_len = target_lines.len();
    if target_tokens.is_empty() || window_len == 0 {
        return (text.to_string(), 0);
    }

    let mut offset = 0;
    let mut lines: Vec<LineSpan> = Vec::new();
    for raw in text.split_inclusive('\n') {
        let (start, end) = (offset, offset + raw.len());
        offset = end;
        if !raw.trim().is_empty() {
            let boilerplate = looks_like_target_line(raw, &target_lines);
            lines.push(LineSpan { start, end, text: raw, boilerplate });
        }
    }

    let score_at = |i: usize| -> Option<f64> {
        let window = lines.get(i..i + window_len)?;
        if window.iter().any(|l| is_marker_line(l.text)) {
            return None;
        }
        let joined: String = window.iter().map(|l| l.text).collect();
        Some(similarity(&token_set(&joined), &target_tokens))
    };

    // Only boilerplate-like lines are ever dropped; data lines inside or
    // around a variant stay in place.
    let mut drop_line = vec![false; lines.len()];
    let mut blocks = 0;
    let mut floor = 0;
    let mut i = 0;
    while i + window_len <= lines.len() {
        let Some(score) = score_at(i).filter(|s| *s >= threshold) else {
            i += 1;
            continue;
        };

        // Prefer the best aligned window among the overlapping ones
        let mut best = (i, score);
        for j in i + 1..i + window_len {
            if let Some(s) = score_at(j) {
                if s > best.1 {
                    best = (j, s);
                }
            }
        }

        let Some((start, end)) = fit_span(&lines, best.0, best.0 + window_len - 1, floor) else {
            i += 1;
            continue;
        };
        let kept: String = lines[start..=end]
            .iter()
            .filter(|l| l.boilerplate)
            .map(|l| l.text)
            .collect();
        let span_score = similarity(&token_set(&kept), &target_tokens);
        if span_score < threshold {
            i += 1;
            continue;
        }

        tracing::debug!(
            "Removing variant block at bytes {}..{} (score {:.3})",
            lines[start].start,
            lines[end].end,
            span_score
        );
        for k in start..=end {
            drop_line[k] = lines[k].boilerplate;
        }
        blocks += 1;
        floor = end + 1;
        i = end + 1;
    }

    if blocks == 0 {
        return (text.to_string(), 0);
    }

    let mut cleaned = String::with_capacity(text.len());
    let mut last = 0;
    for line in lines.iter().zip(&drop_line).filter(|(_, drop)| **drop).map(|(l, _)| l) {
        cleaned.push_str(&text[last..line.start]);
        last = line.end;
    }
    cleaned.push_str(&text[last..]);
    (cleaned, blocks)
}

/// Comparison form: NFKC, lowercase, no accents or variation selectors,
/// punctuation and stop-words blanked.
fn compare_form(s: &str) -> String {
    let folded = fold(&s.nfkc().collect::<String>());
    let spaced = COMPARE_PUNCT_RE.replace_all(&folded, " ");
    let without_stopwords = STOPWORD_RE.replace_all(&spaced, " ");
    without_stopwords.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_set(s: &str) -> HashSet<String> {
    compare_form(s).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Shared tokens over the size of the larger set.
pub fn similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / a.len().max(b.len()) as f64
}
