// src/extractors/identity.rs
//! Identity card (RG/CI), birthplace and marital status fields.
//!
//! Each field has an ordered list of patterns. The first pattern that
//! matches anywhere in the text wins and contributes all of its matches.

use once_cell::sync::Lazy;
use regex::Regex;

// --- Regex Patterns (Lazy Static) ---
fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|pat| Regex::new(pat).ok()).collect()
}

static RG_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)N[úu]mero\s+(?:de\s+)?identidade[ \t]*:[ \t]*([0-9.]+)",
        r"(?i)\bRG\s*\([^)]*\)[ \t]*:[ \t]*([0-9.]+)-\w{1,3}",
        r"(?i)\bRG\s*\([^)]*\)[ \t]*:[ \t]*([0-9.]+)",
        r"(?i)\bRG[ \t]*:[ \t]*([0-9.]+)",
    ])
});

static UF_CI_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)\bUF\s*CI[ \t]*:[ \t]*(\w{2})",
        r"(?i)\bRG\s*\([^)]*\)[ \t]*:[ \t]*[0-9.]+-(\w{2})",
        r"(?i)-\s*(\w{2})\s*/\s*\w+\s*/",
        r"(?i)-\s*(\w{2})\s*,\s*[ÓO]RG[ÃA]O",
    ])
});

static ORGAO_EMISSOR_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)[ÓO]rg[ãa]o\s+emissor\s+CI[ \t]*:[ \t]*([A-ZÀ-Ú]{2,10})",
        r"(?i)/\s*([A-ZÀ-Ú]{2,10})\s*/\s*\d{2}/\d{2}/\d{4}",
        r"(?i)[ÓO]RG[ÃA]O\s+EMISSOR\s+([A-ZÀ-Ú]{2,10})",
        r"(?i)\b\w{2}\s*/\s*([A-ZÀ-Ú]{2,10})\s*/",
    ])
});

static DATA_EMISSAO_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)Data\s+de\s+emiss[ãa]o\s+CI[ \t]*:[ \t]*(\d{2}/\d{2}/\d{4})",
        r"(?i)/\s*\w+\s*/\s*(\d{2}/\d{2}/\d{4})",
        r"(?i)DATA\s+EMISS[ÃA]O\s+(\d{2}/\d{2}/\d{4})",
    ])
});

static MUNICIPIO_NASCIMENTO_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)Munic[íi]pio\s+de\s+nascimento[ \t]*:[ \t]*([^\n-]+)",
        r"(?i)Munic[íi]pio\s+de\s+nascimento[ \t]*:[ \t]*([^\n]+)",
    ])
});

static UF_NASCIMENTO_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)\bUF\s*DE\s+NASCIMENTO[ \t]*:[ \t]*(\w{2})",
        r"(?i)\bUF:[ \t]*(\w{2})\b",
    ])
});

static ESTADO_CIVIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:-[ \t]*)?estado[ \t]*civil[ \t]*:[ \t]*([^\r\n]+?)[ \t]*$")
        .expect("Failed to compile ESTADO_CIVIL_RE")
});

// --- Data Structures ---
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDocs {
    pub rg: Vec<String>,
    pub uf_ci: Vec<String>,
    pub orgao_emissor_ci: Vec<String>,
    pub data_emissao_ci: Vec<String>,
    pub endereco_nascimento: Vec<String>,
}

/// Captures of the first pattern (in declaration order) that matches at all.
fn first_rule_matches(patterns: &[Regex], text: &str) -> Vec<String> {
    for re in patterns {
        let found: Vec<String> = re
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !found.is_empty() {
            tracing::trace!("Pattern '{}' matched {} time(s)", re.as_str(), found.len());
            return found;
        }
    }
    Vec::new()
}

pub fn extract_identity(text: &str) -> IdentityDocs {
    if text.trim().is_empty() {
        return IdentityDocs::default();
    }

    let rg = first_rule_matches(&RG_RE, text)
        .into_iter()
        .map(|v| v.replace('.', ""))
        .filter(|v| !v.is_empty())
        .collect();
    let uf_ci = first_rule_matches(&UF_CI_RE, text).into_iter().map(|v| v.to_uppercase()).collect();
    let orgao_emissor_ci = first_rule_matches(&ORGAO_EMISSOR_RE, text)
        .into_iter()
        .map(|v| v.to_uppercase())
        .collect();
    let data_emissao_ci = first_rule_matches(&DATA_EMISSAO_RE, text);

    IdentityDocs {
        rg,
        uf_ci,
        orgao_emissor_ci,
        data_emissao_ci,
        endereco_nascimento: birthplaces(text),
    }
}

/// `"<municipio> - <UF>"`, pairing municipalities and birth UFs by position.
fn birthplaces(text: &str) -> Vec<String> {
    let municipios: Vec<String> = first_rule_matches(&MUNICIPIO_NASCIMENTO_RE, text)
        .into_iter()
        .map(|m| m.trim_end_matches([' ', '.', ';']).to_string())
        .filter(|m| !m.is_empty())
        .collect();
    let ufs: Vec<String> = first_rule_matches(&UF_NASCIMENTO_RE, text)
        .into_iter()
        .map(|uf| uf.to_uppercase())
        .collect();

    municipios
        .into_iter()
        .enumerate()
        .map(|(i, municipio)| match ufs.get(i) {
            Some(uf) => format!("{} - {}", municipio, uf),
            None => municipio,
        })
        .collect()
}

/// Every `Estado civil:` value, in document order.
pub fn extract_estado_civil(text: &str) -> Vec<String> {
    let normalized = text.replace('\u{a0}', " ");
    ESTADO_CIVIL_RE
        .captures_iter(&normalized)
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
