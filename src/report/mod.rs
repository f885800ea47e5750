// src/report/mod.rs
//! Extracted record model, audit accumulator and the final report.

use std::collections::HashSet;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Corpus name used as the top-level key when none is configured.
pub const DEFAULT_CORPUS_NAME: &str = "medico";

/// Keys every serialized record carries, in output order.
pub const RECORD_SCHEMA: [&str; 22] = [
    "nome",
    "cpf",
    "cns",
    "nome_mae",
    "nome_pai",
    "data_nascimento",
    "cadastro",
    "formacao",
    "recebimento",
    "rg",
    "uf_ci",
    "orgao_emissor_ci",
    "data_emissao_ci",
    "endereco_nascimento",
    "estado_civil",
    "endereco",
    "crm",
    "email",
    "telefone",
    "telefone_emergencia",
    "tipo_contato_emergencia",
    "carga_horaria_semanal",
];

/// Fields that can be reported as not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Nome,
    Cpf,
    Cns,
    NomeMae,
    NomePai,
    DataNascimento,
    Cadastro,
    Formacao,
    Recebimento,
}

impl Field {
    /// Descriptive marker written in place of a missing value.
    pub fn placeholder(self) -> &'static str {
        match self {
            Field::Nome => "NOME nao detectado",
            Field::Cpf => "CPF nao detectado",
            Field::Cns => "CNS nao detectado",
            Field::NomeMae => "MAE nao detectada",
            Field::NomePai => "PAI nao detectado",
            Field::DataNascimento => "DATA_NASCIMENTO nao detectada",
            Field::Cadastro => "CADASTRO nao detectado",
            Field::Formacao => "FORMACAO PROFISSIONAL nao detectada",
            Field::Recebimento => "RECEBIMENTO nao detectado",
        }
    }
}

/// A singular value: either found in the source or explicitly missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Found(String),
    NotFound(Field),
}

impl Extracted {
    pub fn from_option(value: Option<String>, field: Field) -> Self {
        match value {
            Some(v) => Extracted::Found(v),
            None => Extracted::NotFound(field),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Extracted::Found(_))
    }

    pub fn as_found(&self) -> Option<&str> {
        match self {
            Extracted::Found(v) => Some(v),
            Extracted::NotFound(_) => None,
        }
    }

    /// The value, or the placeholder text when missing.
    pub fn as_str(&self) -> &str {
        match self {
            Extracted::Found(v) => v,
            Extracted::NotFound(field) => field.placeholder(),
        }
    }
}

impl Serialize for Extracted {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One record per block. Sequences keep document order and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    pub bloco: usize,
    pub arquivo: String,
    pub nome: Extracted,
    pub cpf: Extracted,
    pub cns: Extracted,
    pub nome_mae: Extracted,
    pub nome_pai: Extracted,
    pub data_nascimento: Extracted,
    pub cadastro: Extracted,
    pub formacao: Extracted,
    pub recebimento: Extracted,
    pub rg: Vec<String>,
    pub uf_ci: Vec<String>,
    pub orgao_emissor_ci: Vec<String>,
    pub data_emissao_ci: Vec<String>,
    pub endereco_nascimento: Vec<String>,
    pub estado_civil: Vec<String>,
    pub endereco: Vec<String>,
    pub crm: Vec<String>,
    pub email: Vec<String>,
    pub telefone: Vec<String>,
    pub telefone_emergencia: Vec<String>,
    pub tipo_contato_emergencia: Vec<String>,
    pub carga_horaria_semanal: Vec<String>,
}

impl ExtractedRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            bloco: self.bloco,
            arquivo: self.arquivo.clone(),
            nome: self.nome.clone(),
            cpf: self.cpf.clone(),
        }
    }

    /// Flattened value of a schema column; sequences are joined with `"; "`.
    pub fn column(&self, name: &str) -> Option<String> {
        let joined = |values: &[String]| values.join("; ");
        let value = match name {
            "bloco" => self.bloco.to_string(),
            "arquivo" => self.arquivo.clone(),
            "nome" => self.nome.as_str().to_string(),
            "cpf" => self.cpf.as_str().to_string(),
            "cns" => self.cns.as_str().to_string(),
            "nome_mae" => self.nome_mae.as_str().to_string(),
            "nome_pai" => self.nome_pai.as_str().to_string(),
            "data_nascimento" => self.data_nascimento.as_str().to_string(),
            "cadastro" => self.cadastro.as_str().to_string(),
            "formacao" => self.formacao.as_str().to_string(),
            "recebimento" => self.recebimento.as_str().to_string(),
            "rg" => joined(&self.rg),
            "uf_ci" => joined(&self.uf_ci),
            "orgao_emissor_ci" => joined(&self.orgao_emissor_ci),
            "data_emissao_ci" => joined(&self.data_emissao_ci),
            "endereco_nascimento" => joined(&self.endereco_nascimento),
            "estado_civil" => joined(&self.estado_civil),
            "endereco" => joined(&self.endereco),
            "crm" => joined(&self.crm),
            "email" => joined(&self.email),
            "telefone" => joined(&self.telefone),
            "telefone_emergencia" => joined(&self.telefone_emergencia),
            "tipo_contato_emergencia" => joined(&self.tipo_contato_emergencia),
            "carga_horaria_semanal" => joined(&self.carga_horaria_semanal),
            _ => return None,
        };
        Some(value)
    }
}

/// Identifies a record in the audit lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordKey {
    pub bloco: usize,
    pub arquivo: String,
    pub nome: Extracted,
    pub cpf: Extracted,
}

/// Records whose high-value fields could not be resolved. Append-only for
/// the duration of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditLists {
    #[serde(rename = "cns_nao_identificados")]
    pub cns: Vec<RecordKey>,
    #[serde(rename = "mae_nao_identificados")]
    pub mae: Vec<RecordKey>,
    #[serde(rename = "pai_nao_identificados")]
    pub pai: Vec<RecordKey>,
    #[serde(rename = "data_nascimento_nao_identificados")]
    pub data_nascimento: Vec<RecordKey>,
}

impl AuditLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` to every list whose field it is missing.
    pub fn observe(&mut self, record: &ExtractedRecord) {
        let checks = [
            (&record.cns, &mut self.cns),
            (&record.nome_mae, &mut self.mae),
            (&record.nome_pai, &mut self.pai),
            (&record.data_nascimento, &mut self.data_nascimento),
        ];
        for (value, list) in checks {
            if !value.is_found() {
                list.push(record.key());
            }
        }
    }

    /// Named lists in output order.
    pub fn named(&self) -> [(&'static str, &[RecordKey]); 4] {
        [
            ("cns_nao_identificados", self.cns.as_slice()),
            ("mae_nao_identificados", self.mae.as_slice()),
            ("pai_nao_identificados", self.pai.as_slice()),
            ("data_nascimento_nao_identificados", self.data_nascimento.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub total_blocos: usize,
    pub cns_nao_identificados: usize,
    pub mae_nao_identificados: usize,
    pub pai_nao_identificados: usize,
    pub data_nascimento_nao_identificados: usize,
    pub cpfs_unicos: usize,
    pub cpfs_repetidos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportBody {
    pub blocos: Vec<ExtractedRecord>,
    #[serde(flatten)]
    pub audits: AuditLists,
    pub estatisticas: ReportStats,
}

/// Root result, serialized as `{ "<corpus name>": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub corpus_name: String,
    pub body: ReportBody,
}

impl Report {
    pub fn records(&self) -> &[ExtractedRecord] {
        &self.body.blocos
    }

    pub fn audits(&self) -> &AuditLists {
        &self.body.audits
    }

    pub fn stats(&self) -> &ReportStats {
        &self.body.estatisticas
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.corpus_name, &self.body)?;
        map.end()
    }
}

/// Wraps records and audits under the corpus name and computes totals.
/// No filtering: every record passed in is reported.
pub fn build(corpus_name: &str, records: Vec<ExtractedRecord>, audits: AuditLists) -> Report {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut repeated = 0;
    for record in &records {
        if let Some(cpf) = record.cpf.as_found() {
            if !seen.insert(cpf) {
                repeated += 1;
                tracing::warn!("CPF {} appears again in block {} ({})", cpf, record.bloco, record.arquivo);
            }
        }
    }

    let stats = ReportStats {
        total_blocos: records.len(),
        cns_nao_identificados: audits.cns.len(),
        mae_nao_identificados: audits.mae.len(),
        pai_nao_identificados: audits.pai.len(),
        data_nascimento_nao_identificados: audits.data_nascimento.len(),
        cpfs_unicos: seen.len(),
        cpfs_repetidos: repeated,
    };

    Report {
        corpus_name: corpus_name.to_string(),
        body: ReportBody { blocos: records, audits, estatisticas: stats },
    }
}
