// src/extractors/contacts.rs
//! Contact, address and workload fields. Every field may occur several times
//! in a block; all matches are kept in document order.

use once_cell::sync::Lazy;
use regex::Regex;

use super::text::norm_space;

// --- Regex Patterns (Lazy Static) ---
static ENDERECO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*[-–•]?[ \t]*Endere[cç]o(?:[ \t]+completo)?(?:[ \t]+com[ \t]+CEP)?[ \t]*[:\-][ \t]*(.+)$",
    )
    .expect("Failed to compile ENDERECO_RE")
});

// Postal code and whatever follows it on the address line
static CEP_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[;,.]?\s*CEP\b.*$").expect("Failed to compile CEP_SUFFIX_RE")
});

static CRM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCRM(?:[-/ ]?[A-Z]{2})?\s*[:\-]?\s*(\d[\d.]*)").expect("Failed to compile CRM_RE")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("Failed to compile EMAIL_RE")
});

// Brazilian phone numbers: optional +55, optional area code, 5+4 / 4+4 / 8-9 digits
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?:\+?55\s*)?
        (?:\(?\d{2}\)?\s*)?
        (?:
            \d{5}[-\s]?\d{4}
          | \d{4}[-\s]?\d{4}
          | \d{8,9}
        )",
    )
    .expect("Failed to compile PHONE_RE")
});

static TEL_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*[-–•]*[ \t]*(?:Tel\.?|TEL)[ \t]*:?.*$").expect("Failed to compile TEL_LINE_RE")
});

static EMERGENCY_MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)contato\s+de\s+urg[êe]ncia").expect("Failed to compile EMERGENCY_MENTION_RE")
});

static EMERGENCY_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*[-–•]*[ \t]*(?:CONTATO[ \t]+DE[ \t]+URG[ÊE]NCIA|Em[ \t]+caso[ \t]+de[ \t]+necessidade,[ \t]*ligar[ \t]+para|Tel\.?[ \t]*do[ \t]+contato[ \t]+de[ \t]+urg[êe]ncia)[ \t]*:?.*$",
    )
    .expect("Failed to compile EMERGENCY_LINE_RE")
});

static PARENTHESIZED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("Failed to compile PARENTHESIZED_RE"));

static LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-zÀ-ÿ]").expect("Failed to compile LETTER_RE"));

static WORKLOAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Carga\s+hor[aá]ria\s+semanal\s*[:\-][ \t]*(.+)").expect("Failed to compile WORKLOAD_RE")
});

// --- Data Structures ---
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contacts {
    pub endereco: Vec<String>,
    pub crm: Vec<String>,
    pub email: Vec<String>,
    pub telefone: Vec<String>,
    pub telefone_emergencia: Vec<String>,
    pub tipo_contato_emergencia: Vec<String>,
    pub carga_horaria_semanal: Vec<String>,
}

pub fn extract_contacts(text: &str) -> Contacts {
    let mut contacts = Contacts {
        endereco: extract_addresses(text),
        crm: CRM_RE
            .captures_iter(text)
            .map(|c| c[1].trim_end_matches('.').to_string())
            .collect(),
        email: EMAIL_RE.find_iter(text).map(|m| m.as_str().to_string()).collect(),
        telefone: extract_phones(text),
        carga_horaria_semanal: WORKLOAD_RE
            .captures_iter(text)
            .map(|c| norm_space(&c[1]))
            .filter(|v| !v.is_empty())
            .collect(),
        ..Contacts::default()
    };

    for line in EMERGENCY_LINE_RE.find_iter(text) {
        let line = line.as_str();
        contacts
            .telefone_emergencia
            .extend(PHONE_RE.find_iter(line).map(|m| norm_space(m.as_str())));
        contacts.tipo_contato_emergencia.extend(emergency_contact_kinds(line));
    }

    contacts
}

fn extract_addresses(text: &str) -> Vec<String> {
    ENDERECO_RE
        .captures_iter(text)
        .map(|c| norm_space(&CEP_SUFFIX_RE.replace(&norm_space(&c[1]), "")))
        .filter(|addr| !addr.is_empty())
        .collect()
}

/// Phones on `Tel...` lines, skipping the emergency-contact ones.
fn extract_phones(text: &str) -> Vec<String> {
    TEL_LINE_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|line| !EMERGENCY_MENTION_RE.is_match(line))
        .flat_map(|line| PHONE_RE.find_iter(line).map(|m| norm_space(m.as_str())))
        .collect()
}

/// Who the emergency contact is: alphabetic text in parentheses, or else
/// the words before the first digit after the label.
fn emergency_contact_kinds(line: &str) -> Vec<String> {
    let from_parens: Vec<String> = PARENTHESIZED_RE
        .captures_iter(line)
        .map(|c| c[1].to_string())
        .filter(|t| LETTER_RE.is_match(t))
        .map(|t| norm_space(&t))
        .collect();
    if !from_parens.is_empty() {
        return from_parens;
    }

    let tail = line.split_once(':').map_or(line, |(_, tail)| tail);
    let before_digits = tail.split(|c: char| c.is_ascii_digit()).next().unwrap_or("");
    let candidate = norm_space(before_digits);
    let candidate = candidate
        .trim_matches(|c| matches!(c, ' ' | ':' | ';' | '.' | ',' | '-' | '–' | '•' | '('))
        .trim();
    if LETTER_RE.is_match(candidate) {
        vec![candidate.to_string()]
    } else {
        Vec::new()
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collects_every_phone_in_document_order() {
        let text = "Telefone: (27) 99999-1111\nNome: Ana\nTelefone: 27 3333-2222";
        assert_eq!(extract_contacts(text).telefone, vec!["(27) 99999-1111", "27 3333-2222"]);
    }

    #[test]
    fn emergency_lines_are_kept_apart_from_regular_phones() {
        let text = "Tel.: 27 99999-1111\nTel. do contato de urgência: 27 98888-7777 (mãe)\n";
        let contacts = extract_contacts(text);
        assert_eq!(contacts.telefone, vec!["27 99999-1111"]);
        assert_eq!(contacts.telefone_emergencia, vec!["27 98888-7777"]);
        assert_eq!(contacts.tipo_contato_emergencia, vec!["mãe"]);
    }

    #[test]
    fn emergency_kind_falls_back_to_text_before_number() {
        let text = "CONTATO DE URGÊNCIA: Esposo João 27 97777-6666";
        let contacts = extract_contacts(text);
        assert_eq!(contacts.telefone_emergencia, vec!["27 97777-6666"]);
        assert_eq!(contacts.tipo_contato_emergencia, vec!["Esposo João"]);

        let numbers_only = extract_contacts("Em caso de necessidade, ligar para: 27 97777-6666");
        assert!(numbers_only.tipo_contato_emergencia.is_empty());
        assert_eq!(numbers_only.telefone_emergencia.len(), 1);
    }

    #[test]
    fn addresses_drop_postal_code() {
        let text = "- Endereço completo: Rua das Flores, 10, Vitória/ES; CEP 29000-000\nEndereco: Av. Central 5";
        assert_eq!(
            extract_contacts(text).endereco,
            vec!["Rua das Flores, 10, Vitória/ES", "Av. Central 5"]
        );
    }

    #[test]
    fn crm_email_and_workload() {
        let text = "CRM-ES: 12.345\nCRM 6789.\nE-mail: ana@exemplo.com.br / ana2@x.org\nCarga horária semanal: 40 horas";
        let contacts = extract_contacts(text);
        assert_eq!(contacts.crm, vec!["12.345", "6789"]);
        assert_eq!(contacts.email, vec!["ana@exemplo.com.br", "ana2@x.org"]);
        assert_eq!(contacts.carga_horaria_semanal, vec!["40 horas"]);
    }

    #[test]
    fn nothing_found_gives_empty_sequences() {
        assert_eq!(extract_contacts("Nome: Ana"), Contacts::default());
    }

    #[test]
    fn repeated_values_are_not_deduplicated() {
        let text = "Telefone: 27 99999-1111\nTelefone: 27 99999-1111";
        assert_eq!(extract_contacts(text).telefone.len(), 2);
    }
}
