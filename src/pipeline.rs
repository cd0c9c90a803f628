use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{AggregatedMetadata, YearPoint, aggregate};
use crate::domain::{AccessionId, MoleculeType};
use crate::entrez::EntrezClient;
use crate::error::MetavizError;
use crate::upload::{UploadOutcome, UploadedFile, extract_accessions};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub filename: String,
    /// Upload timestamp in seconds since the epoch, when the client sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    pub molecule: MoleculeType,
    pub accession_count: usize,
    pub record_count: usize,
    pub metadata: AggregatedMetadata,
    pub year_series: Vec<YearPoint>,
}

/// Extract, fetch and aggregate for one uploaded file.
#[derive(Clone)]
pub struct Pipeline<E: EntrezClient> {
    entrez: E,
}

impl<E: EntrezClient> Pipeline<E> {
    pub fn new(entrez: E) -> Self {
        Self { entrez }
    }

    /// Runs the whole submission. Upload problems stop here without any
    /// network traffic.
    pub fn run(
        &self,
        upload: &UploadedFile,
        molecule: MoleculeType,
        sink: &dyn ProgressSink,
    ) -> Result<SubmissionResult, MetavizError> {
        sink.event(ProgressEvent {
            message: match upload.last_modified {
                Some(modified) => format!(
                    "phase=Extract; reading {} (modified {modified})",
                    upload.filename
                ),
                None => format!("phase=Extract; reading {}", upload.filename),
            },
            elapsed: None,
        });

        let accessions = match extract_accessions(upload) {
            UploadOutcome::Empty => return Err(MetavizError::NoUpload),
            UploadOutcome::Failed(notice) => {
                return Err(MetavizError::UploadParse {
                    filename: notice.filename,
                    message: notice.message,
                });
            }
            UploadOutcome::Parsed(accessions) if accessions.is_empty() => {
                return Err(MetavizError::NoAccessions);
            }
            UploadOutcome::Parsed(accessions) => accessions,
        };
        info!(
            filename = %upload.filename,
            accessions = accessions.len(),
            "accessions extracted"
        );

        let (record_count, metadata) = self.aggregate_accessions(&accessions, molecule, sink)?;
        let year_series = metadata.year_series();

        Ok(SubmissionResult {
            filename: upload.filename.clone(),
            last_modified: upload.last_modified,
            molecule,
            accession_count: accessions.len(),
            record_count,
            metadata,
            year_series,
        })
    }

    /// Fetches `accessions` in one batch and aggregates the returned records.
    pub fn aggregate_accessions(
        &self,
        accessions: &[AccessionId],
        molecule: MoleculeType,
        sink: &dyn ProgressSink,
    ) -> Result<(usize, AggregatedMetadata), MetavizError> {
        if accessions.is_empty() {
            return Err(MetavizError::NoAccessions);
        }

        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; requesting {} {} records",
                accessions.len(),
                molecule
            ),
            elapsed: None,
        });
        let started = Instant::now();
        let records = self
            .entrez
            .fetch_records(accessions, molecule)
            .inspect_err(|err| warn!(error = %err, "record fetch failed"))?;
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; received {} records", records.len()),
            elapsed: Some(started.elapsed()),
        });

        let started = Instant::now();
        let metadata = aggregate(&records);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Aggregate; {} accessions in joined table",
                metadata.joined.len()
            ),
            elapsed: Some(started.elapsed()),
        });

        Ok((records.len(), metadata))
    }
}
