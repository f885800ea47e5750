// src/extractors/fields.rs

// --- Imports ---
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::contacts::extract_contacts;
use super::identity::{extract_estado_civil, extract_identity};
use super::section::split_sections;
use super::segment::RecordBlock;
use super::text::{digits_only, fold, value_after_colon};
use crate::report::{AuditLists, Extracted, ExtractedRecord, Field};

// --- Rule Model ---
/// One way of finding a singular field.
///
/// `label` and `exclude` are tested against the accent-folded, lowercased
/// line; `capture` receives the original trimmed line.
pub struct LineRule {
    pub name: &'static str,
    label: Regex,
    exclude: Option<Regex>,
    capture: fn(&str) -> Option<String>,
}

impl LineRule {
    fn new(
        name: &'static str,
        label: &str,
        exclude: Option<&str>,
        capture: fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            name,
            label: Regex::new(label).expect("Failed to compile rule label"),
            exclude: exclude.map(|pat| Regex::new(pat).expect("Failed to compile rule exclusion")),
            capture,
        }
    }

    fn selects(&self, line: &str) -> bool {
        let folded = fold(line);
        self.label.is_match(&folded)
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(&folded))
    }

    /// First capture over the selected lines, in document order.
    pub fn apply(&self, text: &str) -> Option<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && self.selects(line))
            .find_map(|line| (self.capture)(line))
    }
}

/// Evaluates rules in declaration order; the first rule that captures wins.
pub fn first_match(rules: &[LineRule], text: &str) -> Option<String> {
    rules.iter().find_map(|rule| {
        let value = rule.apply(text)?;
        tracing::trace!("Rule '{}' captured '{}'", rule.name, value);
        Some(value)
    })
}

// --- Value Patterns (Lazy Static) ---
static NAME_AFTER_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bnome\s+(.+)$").expect("Failed to compile NAME_AFTER_WORD_RE"));

static CPF_CANDIDATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d.\-]{11,18}").expect("Failed to compile CPF_CANDIDATE_RE"));

static FIFTEEN_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{15}").expect("Failed to compile FIFTEEN_DIGITS_RE"));

// Day, month, year in the order they are tried
static DATE_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{2,4})\b", // 02/10/1992, 01.09.86
        r"\b(\d{1,2})[-/.](\d{1,2})(\d{4})\b",        // 27/021996
        r"\b(\d{2})(\d{2})(\d{4})\b",                 // 02101992
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

// --- Capture Functions ---
fn capture_after_colon(line: &str) -> Option<String> {
    value_after_colon(line)
}

fn capture_after_name_word(line: &str) -> Option<String> {
    let caps = NAME_AFTER_WORD_RE.captures(line)?;
    let value = caps[1].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// First fragment on the line with exactly 11 digits.
fn capture_cpf(line: &str) -> Option<String> {
    CPF_CANDIDATE_RE
        .find_iter(line)
        .map(|m| digits_only(m.as_str()))
        .find(|digits| digits.len() == 11)
}

fn capture_cns_contiguous(line: &str) -> Option<String> {
    let compact = line.replace(' ', "");
    FIFTEEN_DIGITS_RE.find(&compact).map(|m| m.as_str().to_string())
}

fn capture_cns_scattered(line: &str) -> Option<String> {
    let digits = digits_only(line);
    (digits.len() >= 15).then(|| digits[..15].to_string())
}

fn capture_birth_date(line: &str) -> Option<String> {
    let after = value_after_colon(line).unwrap_or_else(|| line.to_string());

    for re in DATE_RE.iter() {
        let Some(caps) = re.captures(&after) else { continue };
        if let Some(iso) = iso_date(&caps[1], &caps[2], &caps[3]) {
            return Some(iso);
        }
    }

    // Digits only: DDMMYYYY or DDMMYY
    let digits = digits_only(&after);
    match digits.len() {
        n if n >= 8 => iso_date(&digits[0..2], &digits[2..4], &digits[4..8]),
        6 => iso_date(&digits[0..2], &digits[2..4], &digits[4..6]),
        _ => None,
    }
}

/// Calendar-checked `YYYY-MM-DD`. Two-digit years from 30 are 19xx.
fn iso_date(day: &str, month: &str, year: &str) -> Option<String> {
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = match year.len() {
        2 => {
            let y: i32 = year.parse().ok()?;
            if y >= 30 { 1900 + y } else { 2000 + y }
        }
        4 => year.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

// --- Rule Tables (Lazy Static) ---
static NOME_RULES: Lazy<Vec<LineRule>> = Lazy::new(|| {
    vec![
        LineRule::new("nome:valor", r"nome", Some(r"\bmae\b|\bpai\b"), capture_after_colon),
        LineRule::new("nome:palavra", r"nome", Some(r"\bmae\b|\bpai\b"), capture_after_name_word),
    ]
});

static CPF_RULES: Lazy<Vec<LineRule>> =
    Lazy::new(|| vec![LineRule::new("cpf", r"cpf", Some(r"pix"), capture_cpf)]);

static CNS_RULES: Lazy<Vec<LineRule>> = Lazy::new(|| {
    vec![
        LineRule::new("cns:contiguo", r"cns", None, capture_cns_contiguous),
        LineRule::new("cns:digitos", r"cns", None, capture_cns_scattered),
    ]
});

static MAE_RULES: Lazy<Vec<LineRule>> =
    Lazy::new(|| vec![LineRule::new("nome_mae", r"nome da mae", None, capture_after_colon)]);

// "nome da pai" shows up as a typo in some forms
static PAI_RULES: Lazy<Vec<LineRule>> =
    Lazy::new(|| vec![LineRule::new("nome_pai", r"nome d[oa] pai", None, capture_after_colon)]);

static DATA_NASCIMENTO_RULES: Lazy<Vec<LineRule>> = Lazy::new(|| {
    vec![LineRule::new("data_nascimento", r"data de nascimento", None, capture_birth_date)]
});

/// Label patterns highlighted in debug dumps, with their kind.
pub static DEBUG_LABELS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bnome\b[^:\n]*:", "nome"),
        (r"(?i)\bcpf\b", "cpf"),
        (r"(?i)\bcns\b", "cns"),
        (r"(?i)data\s+de\s+nascimento", "data_nascimento"),
        (r"(?i)\bRG\b|identidade", "rg"),
        (r"(?i)estado\s*civil", "estado_civil"),
        (r"(?i)endere[cç]o", "endereco"),
        (r"(?i)\bCRM\b", "crm"),
        (r"(?i)\btel\b\.?|telefone", "telefone"),
        (r"(?i)contato\s+de\s+urg[êe]ncia", "emergencia"),
        (r"(?i)carga\s+hor[aá]ria", "carga_horaria"),
        (r"(?i)forma[çc][aã]o\s+profissional|recebimento", "secao"),
    ]
    .into_iter()
    .filter_map(|(pat, kind)| Regex::new(pat).ok().map(|re| (re, kind)))
    .collect()
});

// --- Main Extractor Structure ---
#[derive(Debug, Default)]
pub struct RecordExtractor;

impl RecordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the full field schema from one block and records missing
    /// high-value fields in `audits`. Never fails: the worst case is a record
    /// of placeholders that appears in every audit list.
    pub fn extract(&self, block: &RecordBlock<'_>, audits: &mut AuditLists) -> ExtractedRecord {
        let sections = split_sections(block.text);
        let cadastro = sections.cadastro_text();

        let identity = extract_identity(cadastro);
        let contacts = extract_contacts(cadastro);

        let record = ExtractedRecord {
            bloco: block.index,
            arquivo: block.source.to_string(),
            nome: Extracted::from_option(first_match(&NOME_RULES, cadastro), Field::Nome),
            cpf: Extracted::from_option(first_match(&CPF_RULES, cadastro), Field::Cpf),
            cns: Extracted::from_option(first_match(&CNS_RULES, cadastro), Field::Cns),
            nome_mae: Extracted::from_option(first_match(&MAE_RULES, cadastro), Field::NomeMae),
            nome_pai: Extracted::from_option(first_match(&PAI_RULES, cadastro), Field::NomePai),
            data_nascimento: Extracted::from_option(
                first_match(&DATA_NASCIMENTO_RULES, cadastro),
                Field::DataNascimento,
            ),
            rg: identity.rg,
            uf_ci: identity.uf_ci,
            orgao_emissor_ci: identity.orgao_emissor_ci,
            data_emissao_ci: identity.data_emissao_ci,
            endereco_nascimento: identity.endereco_nascimento,
            estado_civil: extract_estado_civil(cadastro),
            endereco: contacts.endereco,
            crm: contacts.crm,
            email: contacts.email,
            telefone: contacts.telefone,
            telefone_emergencia: contacts.telefone_emergencia,
            tipo_contato_emergencia: contacts.tipo_contato_emergencia,
            carga_horaria_semanal: contacts.carga_horaria_semanal,
            cadastro: sections.cadastro,
            formacao: sections.formacao,
            recebimento: sections.recebimento,
        };

        audits.observe(&record);
        tracing::debug!(
            "Block {} ({}): nome={} cpf={} cns={}",
            record.bloco,
            record.arquivo,
            record.nome.as_str(),
            record.cpf.as_str(),
            record.cns.as_str()
        );
        record
    }
}
