// src/extractors/text.rs
//! Small string helpers shared by the normalizer and the field rules.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile WHITESPACE_RUN_RE"));

/// Lowercases and strips diacritics so that labels like "Nome da Mãe" and
/// "NOME DA MAE" compare equal.
pub fn fold(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Collapses whitespace runs and trims surrounding spaces and `;.-` noise.
pub fn norm_space(s: &str) -> String {
    WHITESPACE_RUN_RE
        .replace_all(s, " ")
        .trim()
        .trim_matches(|c| matches!(c, ' ' | ';' | '.' | '-'))
        .to_string()
}

/// Returns the trimmed text after the first `:` of a line, if non-empty.
pub fn value_after_colon(line: &str) -> Option<String> {
    let (_, value) = line.split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Counts characters that are not whitespace.
pub fn non_whitespace_len(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

/// Converts CRLF and lone CR line endings to LF.
pub fn unify_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Keeps ASCII digits only.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_accents_and_case() {
        assert_eq!(fold("Nome da MÃE"), "nome da mae");
        assert_eq!(fold("FORMAÇÃO Profissional"), "formacao profissional");
        assert_eq!(fold("Município"), "municipio");
    }

    #[test]
    fn norm_space_collapses_and_trims_noise() {
        assert_eq!(norm_space("  Rua   A,\n 10 ; "), "Rua A, 10");
        assert_eq!(norm_space("- 40 horas."), "40 horas");
    }

    #[test]
    fn value_after_colon_requires_content() {
        assert_eq!(value_after_colon("Nome: Ana Lima ").as_deref(), Some("Ana Lima"));
        assert_eq!(value_after_colon("Hora: 10:30").as_deref(), Some("10:30"));
        assert_eq!(value_after_colon("Nome da mãe:   "), None);
        assert_eq!(value_after_colon("Sem rotulo"), None);
    }

    #[test]
    fn line_endings_become_lf() {
        assert_eq!(unify_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn counts_and_digits() {
        assert_eq!(non_whitespace_len(" a b\n\tc "), 3);
        assert_eq!(digits_only("123.456.789-09"), "12345678909");
    }
}
