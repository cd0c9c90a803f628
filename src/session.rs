use tracing::debug;

use crate::domain::MoleculeType;
use crate::entrez::EntrezClient;
use crate::error::MetavizError;
use crate::export::{CsvDownload, joined_table_csv};
use crate::pipeline::{Pipeline, ProgressSink, SubmissionResult};
use crate::upload::UploadedFile;

/// Holds the tables derived from the latest successful submission of one
/// user. Nothing here outlives the session.
#[derive(Debug, Default)]
pub struct Session {
    latest: Option<SubmissionResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A failed submission clears earlier results so stale charts are never
    /// shown next to an error.
    pub fn submit<E: EntrezClient>(
        &mut self,
        pipeline: &Pipeline<E>,
        upload: &UploadedFile,
        molecule: MoleculeType,
        sink: &dyn ProgressSink,
    ) -> Result<&SubmissionResult, MetavizError> {
        self.latest = None;
        let result = pipeline.run(upload, molecule, sink)?;
        Ok(&*self.latest.insert(result))
    }

    pub fn latest(&self) -> Option<&SubmissionResult> {
        self.latest.as_ref()
    }

    /// `metaframe.csv` for the latest submission, or `None` before any
    /// submission has succeeded.
    pub fn download_csv(&self) -> Result<Option<CsvDownload>, MetavizError> {
        let Some(result) = &self.latest else {
            debug!("CSV download requested without aggregated data");
            return Ok(None);
        };
        joined_table_csv(&result.metadata.joined).map(Some)
    }
}
