// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Input directory not found: {0}")]
    InputDirMissing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Invalid .docx archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Malformed document XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Document has no word/document.xml part: {0}")]
    MissingDocumentPart(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reading source documents failed: {0}")]
    Read(#[from] ReadError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
