use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MetavizError {
    #[error("invalid accession: {0}")]
    InvalidAccession(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("upload could not be decoded: {0}")]
    UploadDecode(String),

    #[error("upload {filename} could not be parsed: {message}")]
    UploadParse { filename: String, message: String },

    #[error("no file was uploaded")]
    NoUpload,

    #[error("upload contained no accessions")]
    NoAccessions,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("Entrez request failed: {0}")]
    EntrezHttp(String),

    #[error("Entrez returned status {status}: {message}")]
    EntrezStatus { status: u16, message: String },

    #[error("failed to decode Entrez records: {0}")]
    RecordDecode(String),

    #[error("Entrez returned no record for: {}", .0.join(", "))]
    UnknownAccessions(Vec<String>),

    #[error("failed to load catalog table {path}: {message}")]
    CatalogLoad { path: String, message: String },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
