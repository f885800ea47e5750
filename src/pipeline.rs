// src/pipeline.rs
//! Wires the stages together: read, concatenate, normalize, segment,
//! extract, build, store.

use std::path::PathBuf;

use crate::extractors::fields::DEBUG_LABELS;
use crate::extractors::normalize::{DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TARGET};
use crate::extractors::segment::DEFAULT_MIN_TRAILING_CHARS;
use crate::extractors::{segment, NormalizedCorpus, Normalizer, RecordExtractor};
use crate::reader;
use crate::report::{self, AuditLists, Report, DEFAULT_CORPUS_NAME};
use crate::storage::{RunMetadata, StorageManager};
use crate::utils::error::AppError;
use crate::utils::text_debug;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Boilerplate block to strip before segmentation.
    pub target: String,
    pub fuzzy: bool,
    pub similarity_threshold: f64,
    pub min_trailing_chars: usize,
    pub corpus_name: String,
    pub csv: bool,
    pub debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_CORPUS_NAME),
            output_dir: PathBuf::from("./output"),
            target: DEFAULT_TARGET.to_string(),
            fuzzy: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_trailing_chars: DEFAULT_MIN_TRAILING_CHARS,
            corpus_name: DEFAULT_CORPUS_NAME.to_string(),
            csv: false,
            debug: false,
        }
    }
}

/// Result of the in-memory stages.
#[derive(Debug, Clone)]
pub struct Processed {
    pub normalized: NormalizedCorpus,
    pub report: Report,
}

/// Normalize, segment, extract and build. Infallible: every block yields
/// exactly one record.
pub fn process_corpus(corpus: &str, config: &PipelineConfig) -> Processed {
    let normalized = Normalizer::new(config.target.as_str(), config.fuzzy)
        .with_threshold(config.similarity_threshold)
        .normalize(corpus);

    let extractor = RecordExtractor::new();
    let mut audits = AuditLists::new();
    let records: Vec<_> = segment(&normalized.text, config.min_trailing_chars)
        .map(|block| extractor.extract(&block, &mut audits))
        .collect();

    if records.is_empty() {
        tracing::warn!("No record blocks found in the corpus");
    }

    let report = report::build(&config.corpus_name, records, audits);
    Processed { normalized, report }
}

/// Runs the whole batch and writes every output file.
pub fn run(config: &PipelineConfig) -> Result<Report, AppError> {
    let contents = reader::read_folder(&config.input_dir)?;
    let storage = StorageManager::new(&config.output_dir)?;

    let corpus = reader::concatenate(&contents.documents);
    storage.save_text("all_texts.txt", &corpus)?;

    let processed = process_corpus(&corpus, config);
    storage.save_text("normalizado.txt", &processed.normalized.text)?;

    if config.debug {
        let debug_dir = storage.base_dir().join("debug");
        for block in segment(&processed.normalized.text, config.min_trailing_chars) {
            let path = debug_dir.join(format!("bloco_{:03}.txt", block.index));
            if let Err(e) = text_debug::save_debug_text(block.text, &path, &DEBUG_LABELS) {
                tracing::warn!("Failed to write debug dump for block {}: {}", block.index, e);
            }
        }
    }

    let report = processed.report;
    storage.save_report(&report)?;
    if config.csv {
        storage.save_csv_exports(&report)?;
    }

    let stats = report.stats();
    storage.save_run_metadata(&RunMetadata {
        input_dir: config.input_dir.display().to_string(),
        source_files: contents.documents.iter().map(|d| d.name.clone()).collect(),
        skipped_files: contents.skipped.clone(),
        fuzzy: config.fuzzy,
        similarity_threshold: config.similarity_threshold,
        boilerplate_removed: processed.normalized.removed,
        total_blocos: stats.total_blocos,
    })?;

    tracing::info!(
        "Processing finished. Blocks: {}, boilerplate removed: {}, CNS missing: {}, mother missing: {}, father missing: {}, birth date missing: {}, unique CPFs: {}",
        stats.total_blocos,
        processed.normalized.removed,
        stats.cns_nao_identificados,
        stats.mae_nao_identificados,
        stats.pai_nao_identificados,
        stats.data_nascimento_nao_identificados,
        stats.cpfs_unicos
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::segment::DELIMITER;
    use crate::report::{Extracted, Field};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn framed(name: &str, body: &str) -> String {
        format!("---- {} ----\n{}\n{}\n\n", name, body, DELIMITER)
    }

    fn config() -> PipelineConfig {
        PipelineConfig { target: "FASE 2\nDocumentos necessarios: anexo\n".into(), ..PipelineConfig::default() }
    }

    #[test]
    fn one_record_per_block() {
        let corpus = [
            framed("a.docx", "Nome: Ana\nCPF: 12345678901"),
            framed("b.docx", "Nome: Bia\nCNS: 700001082841506"),
            framed("c.docx", "Texto sem rotulos reconhecidos"),
        ]
        .concat();

        let processed = process_corpus(&corpus, &config());
        let records = processed.report.records();
        assert_eq!(records.len(), 3);
        assert_eq!(processed.report.stats().total_blocos, 3);
        let indexes: Vec<usize> = records.iter().map(|r| r.bloco).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        let files: Vec<&str> = records.iter().map(|r| r.arquivo.as_str()).collect();
        assert_eq!(files, vec!["a.docx", "b.docx", "c.docx"]);
    }

    #[test]
    fn two_markers_without_boilerplate() {
        let corpus = [framed("a.docx", "Nome: Ana"), framed("b.docx", "Nome: Bia")].concat();
        let processed = process_corpus(&corpus, &config());
        assert_eq!(processed.normalized.removed, 0);
        assert_eq!(processed.report.records().len(), 2);
    }

    #[test]
    fn boilerplate_is_removed_before_extraction() {
        let target = "FASE 2\nDocumentos necessarios: anexo\n";
        let corpus = framed("a.docx", &format!("Nome: Ana\n{}CPF: 12345678901", target));
        let processed = process_corpus(&corpus, &config());
        assert_eq!(processed.normalized.removed, 1);
        assert!(!processed.normalized.text.contains("FASE 2"));
        assert_eq!(processed.report.records()[0].cpf, Extracted::Found("12345678901".into()));
    }

    #[test]
    fn audit_lists_match_missing_fields() {
        let corpus = [
            framed("a.docx", "Nome: Ana\nCPF: 12345678901"),
            framed("b.docx", "Nome: Bia\nCNS: 700001082841506\nNome da mãe: Maria\nNome do pai: João\nData de nascimento: 01/01/1990"),
        ]
        .concat();
        let processed = process_corpus(&corpus, &config());
        let records = processed.report.records();
        let audits = processed.report.audits();

        assert_eq!(records[0].cns, Extracted::NotFound(Field::Cns));
        assert_eq!(audits.cns, vec![records[0].key()]);
        assert_eq!(audits.mae, vec![records[0].key()]);
        assert_eq!(audits.pai, vec![records[0].key()]);
        assert_eq!(audits.data_nascimento, vec![records[0].key()]);
    }

    #[test]
    fn empty_corpus_gives_empty_report() {
        let processed = process_corpus("", &config());
        assert_eq!(processed.report.stats().total_blocos, 0);
        assert!(processed.report.audits().cns.is_empty());
    }

    #[test]
    fn run_writes_all_outputs() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("a.txt"), "Nome: Ana\nCPF: 12345678901\n").unwrap();
        fs::write(input.path().join("b.txt"), "Nome: Bia\nTelefone: 27 99999-1111\n").unwrap();

        let config = PipelineConfig {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().join("saida"),
            csv: true,
            debug: true,
            ..config()
        };
        let report = run(&config).unwrap();
        assert_eq!(report.records().len(), 2);

        let out = &config.output_dir;
        for file in ["all_texts.txt", "normalizado.txt", "cpfs_blocos.json", "run_meta.json", "blocos.csv"] {
            assert!(out.join(file).is_file(), "Missing output '{}'", file);
        }
        assert!(out.join("debug").join("bloco_001.txt").is_file());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("cpfs_blocos.json")).unwrap()).unwrap();
        assert_eq!(json["medico"]["blocos"][1]["telefone"], serde_json::json!(["27 99999-1111"]));
    }

    #[test]
    fn crlf_text_files_keep_line_anchored_fields() {
        let input = TempDir::new().unwrap();
        fs::write(input.path().join("a.txt"), "Nome: Ana\r\nCPF: 12345678901\r\nEstado civil: Casada\r\n").unwrap();

        let contents = reader::read_folder(input.path()).unwrap();
        let processed = process_corpus(&reader::concatenate(&contents.documents), &config());
        let record = &processed.report.records()[0];
        assert_eq!(record.estado_civil, vec!["Casada"]);
        assert_eq!(record.cpf, Extracted::Found("12345678901".into()));
    }

    #[test]
    fn dash_rule_inside_a_document_keeps_the_rest_of_the_record() {
        let corpus = framed("a.docx", "Nome: Ana\n--------------------\nCPF: 12345678901\nNome da mãe: Maria");
        let processed = process_corpus(&corpus, &config());
        let records = processed.report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cpf, Extracted::Found("12345678901".into()));
        assert_eq!(records[0].nome_mae, Extracted::Found("Maria".into()));
    }

    #[test]
    fn run_fails_on_missing_input_dir() {
        let output = TempDir::new().unwrap();
        let config = PipelineConfig {
            input_dir: output.path().join("nao_existe"),
            output_dir: output.path().to_path_buf(),
            ..config()
        };
        assert!(matches!(run(&config), Err(AppError::Read(_))));
    }
}
