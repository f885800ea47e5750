// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::report::{Report, RecordKey, RECORD_SCHEMA};
use crate::utils::error::StorageError;

/// File name of the JSON report.
pub const REPORT_FILE: &str = "cpfs_blocos.json";

// Identification columns lead the block export
const LEADING_COLUMNS: [&str; 4] = ["cpf", "nome", "cns", "data_nascimento"];

/// Facts about one run, written next to the report.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub input_dir: String,
    pub source_files: Vec<String>,
    pub skipped_files: Vec<String>,
    pub fuzzy: bool,
    pub similarity_threshold: f64,
    pub boilerplate_removed: usize,
    pub total_blocos: usize,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes an intermediate text (raw or normalized corpus)
    pub fn save_text(&self, filename: &str, text: &str) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(filename);
        fs::write(&file_path, text).map_err(StorageError::IoError)?;
        tracing::info!("Saved {} ({} bytes)", file_path.display(), text.len());
        Ok(file_path)
    }

    /// Saves the report as pretty-printed UTF-8 JSON
    pub fn save_report(&self, report: &Report) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(REPORT_FILE);
        self.write_json(&file_path, report)?;
        tracing::info!("Saved report with {} block(s) to {}", report.records().len(), file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about the run in JSON format
    pub fn save_run_metadata(&self, meta: &RunMetadata) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("run_meta.json");

        let metadata = serde_json::json!({
            "run": meta,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_json(&file_path, &metadata)?;

        tracing::info!("Saved run metadata to {}", file_path.display());
        Ok(file_path)
    }

    /// Tabular exports: `blocos.csv` plus one CSV per non-empty audit list
    pub fn save_csv_exports(&self, report: &Report) -> Result<Vec<PathBuf>, StorageError> {
        let mut written = Vec::new();

        let columns: Vec<&str> = ["bloco", "arquivo"]
            .into_iter()
            .chain(LEADING_COLUMNS)
            .chain(RECORD_SCHEMA.into_iter().filter(|c| !LEADING_COLUMNS.contains(c)))
            .collect();

        let blocks_path = self.base_dir.join("blocos.csv");
        let mut writer = csv::Writer::from_path(&blocks_path)?;
        writer.write_record(&columns)?;
        for record in report.records() {
            let row: Vec<String> = columns
                .iter()
                .map(|c| record.column(c).unwrap_or_default())
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush().map_err(StorageError::IoError)?;
        written.push(blocks_path);

        for (name, keys) in report.audits().named() {
            if keys.is_empty() {
                continue;
            }
            let path = self.base_dir.join(format!("{}.csv", name));
            write_audit_csv(&path, keys)?;
            written.push(path);
        }

        tracing::info!("Saved {} CSV export(s) to {}", written.len(), self.base_dir.display());
        Ok(written)
    }

    fn write_json<T: Serialize + ?Sized>(&self, file_path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(file_path, json).map_err(StorageError::IoError)
    }
}

fn write_audit_csv(path: &Path, keys: &[RecordKey]) -> Result<(), StorageError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["bloco", "arquivo", "nome", "cpf"])?;
    for key in keys {
        writer.write_record([
            key.bloco.to_string().as_str(),
            key.arquivo.as_str(),
            key.nome.as_str(),
            key.cpf.as_str(),
        ])?;
    }
    writer.flush().map_err(StorageError::IoError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::empty_record;
    use crate::report::{build, AuditLists, Extracted};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_report() -> Report {
        let mut record = empty_record(0);
        record.cpf = Extracted::Found("12345678901".into());
        record.nome = Extracted::Found("Ana Lima".into());
        record.nome_mae = Extracted::Found("Maria".into());
        record.telefone = vec!["27 99999-1111".into(), "27 98888-2222".into()];
        let mut audits = AuditLists::new();
        audits.observe(&record);
        build("medico", vec![record], audits)
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("saida").join("medico");
        let storage = StorageManager::new(&nested).unwrap();
        assert!(storage.base_dir().is_dir());
    }

    #[test]
    fn report_json_round_trips_and_keeps_accents() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let mut report = sample_report();
        report.body.blocos[0].nome_pai = Extracted::Found("José".into());

        let path = storage.save_report(&report).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("José"));

        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["medico"]["blocos"][0]["cpf"], serde_json::json!("12345678901"));
        assert_eq!(value["medico"]["blocos"][0]["cns"], serde_json::json!("CNS nao detectado"));
    }

    #[test]
    fn run_metadata_has_timestamp() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let meta = RunMetadata {
            input_dir: "medico".into(),
            source_files: vec!["a.docx".into()],
            skipped_files: vec![],
            fuzzy: true,
            similarity_threshold: 0.7,
            boilerplate_removed: 3,
            total_blocos: 1,
        };
        let path = storage.save_run_metadata(&meta).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert!(value["extraction_timestamp"].is_string());
        assert_eq!(value["run"]["boilerplate_removed"], serde_json::json!(3));
    }

    #[test]
    fn csv_exports_lead_with_identification_columns() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let written = storage.save_csv_exports(&sample_report()).unwrap();

        // mae was found, so its audit list is empty and not exported
        let names: Vec<String> = written
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(
            names,
            vec![
                "blocos.csv",
                "cns_nao_identificados.csv",
                "pai_nao_identificados.csv",
                "data_nascimento_nao_identificados.csv",
            ]
        );

        let mut reader = csv::Reader::from_path(dir.path().join("blocos.csv")).unwrap();
        let headers = reader.headers().unwrap().clone();
        let header_names: Vec<&str> = headers.iter().take(6).collect();
        assert_eq!(header_names, vec!["bloco", "arquivo", "cpf", "nome", "cns", "data_nascimento"]);
        assert_eq!(headers.len(), 2 + RECORD_SCHEMA.len());

        let row = reader.records().next().unwrap().unwrap();
        let telefone_at = headers.iter().position(|h| h == "telefone").unwrap();
        assert_eq!(&row[telefone_at], "27 99999-1111; 27 98888-2222");
        assert_eq!(&row[2], "12345678901");
    }
}
