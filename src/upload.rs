use std::fmt;
use std::sync::OnceLock;

use base64::{Engine as _, engine::general_purpose};
use bio::io::fasta;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::AccessionId;
use crate::error::MetavizError;

/// A file handed over by the upload widget.
///
/// `contents` is the data-URI envelope (`data:<mime>;base64,<payload>`) or
/// `None` when the user has not picked a file yet.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub contents: Option<String>,
    pub filename: String,
    pub last_modified: Option<i64>,
}

impl UploadedFile {
    pub fn from_data_uri(contents: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
            filename: filename.into(),
            last_modified: None,
        }
    }

    /// Wraps raw bytes in the same envelope the browser produces.
    pub fn from_bytes(bytes: &[u8], filename: impl Into<String>) -> Self {
        let payload = general_purpose::STANDARD.encode(bytes);
        Self::from_data_uri(
            format!("data:application/octet-stream;base64,{payload}"),
            filename,
        )
    }

    pub fn with_last_modified(mut self, timestamp: i64) -> Self {
        self.last_modified = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    LineList,
    Fasta,
    /// Unrecognised name, parsed as a line list anyway.
    Fallback,
}

impl UploadKind {
    pub fn from_filename(filename: &str) -> Self {
        let name = filename.to_ascii_lowercase();
        if name.contains("csv") || name.contains("txt") {
            UploadKind::LineList
        } else if name.contains("fasta") {
            UploadKind::Fasta
        } else {
            UploadKind::Fallback
        }
    }
}

/// User-facing notice shown in place of results when an upload is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadNotice {
    pub filename: String,
    pub message: String,
}

impl fmt::Display for UploadNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "There was an error processing {}: {}",
            self.filename, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Empty,
    Parsed(Vec<AccessionId>),
    Failed(UploadNotice),
}

pub fn extract_accessions(upload: &UploadedFile) -> UploadOutcome {
    let contents = match upload.contents.as_deref() {
        Some(contents) if !contents.trim().is_empty() => contents,
        _ => return UploadOutcome::Empty,
    };

    match decode_and_parse(contents, &upload.filename) {
        Ok(accessions) => {
            debug!(
                filename = %upload.filename,
                count = accessions.len(),
                "extracted accessions"
            );
            UploadOutcome::Parsed(accessions)
        }
        Err(err) => {
            warn!(filename = %upload.filename, error = %err, "upload rejected");
            UploadOutcome::Failed(UploadNotice {
                filename: upload.filename.clone(),
                message: err.to_string(),
            })
        }
    }
}

fn decode_and_parse(contents: &str, filename: &str) -> Result<Vec<AccessionId>, MetavizError> {
    let bytes = decode_data_uri(contents)?;
    let text = std::str::from_utf8(&bytes).map_err(|err| MetavizError::UploadParse {
        filename: filename.to_string(),
        message: format!("not UTF-8 text: {err}"),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let result = match UploadKind::from_filename(filename) {
        UploadKind::LineList => parse_line_list(text),
        UploadKind::Fasta => parse_fasta_ids(text),
        UploadKind::Fallback => {
            warn!(filename, "unrecognised upload name, reading one accession per line");
            parse_line_list(text)
        }
    };
    result.map_err(|err| match err {
        MetavizError::UploadParse { message, .. } => MetavizError::UploadParse {
            filename: filename.to_string(),
            message,
        },
        other => MetavizError::UploadParse {
            filename: filename.to_string(),
            message: other.to_string(),
        },
    })
}

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^data:(?P<mime>[^;,]*)(?P<params>(?:;[^;,]*)*),(?P<payload>.*)$")
            .expect("data URI pattern is valid")
    })
}

pub fn decode_data_uri(contents: &str) -> Result<Vec<u8>, MetavizError> {
    let captures = data_uri_pattern()
        .captures(contents.trim())
        .ok_or_else(|| MetavizError::UploadDecode("missing data URI header".to_string()))?;
    let payload = &captures["payload"];
    let is_base64 = captures["params"]
        .split(';')
        .any(|param| param.eq_ignore_ascii_case("base64"));

    if !is_base64 {
        return Ok(payload.as_bytes().to_vec());
    }

    let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|err| MetavizError::UploadDecode(err.to_string()))
}

/// One accession per line; only the first field of a delimited line counts.
pub fn parse_line_list(text: &str) -> Result<Vec<AccessionId>, MetavizError> {
    text.lines()
        .map(|line| {
            line.split([',', ';', '\t'])
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches('"')
        })
        .filter(|entry| !entry.is_empty())
        .map(str::parse::<AccessionId>)
        .collect()
}

/// Record ids from FASTA headers, kept with their version suffix.
pub fn parse_fasta_ids(text: &str) -> Result<Vec<AccessionId>, MetavizError> {
    // The reader expects '>' on the first line it sees.
    let reader = fasta::Reader::new(text.trim_start().as_bytes());
    reader
        .records()
        .enumerate()
        .map(|(index, record)| {
            let record = record.map_err(|err| fasta_error(index, err.to_string()))?;
            AccessionId::from_record_id(record.id())
                .map_err(|err| fasta_error(index, err.to_string()))
        })
        .collect()
}

fn fasta_error(index: usize, message: String) -> MetavizError {
    MetavizError::UploadParse {
        filename: "FASTA".to_string(),
        message: format!("record {}: {message}", index + 1),
    }
}
