use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info};

use crate::config::EntrezConfig;
use crate::domain::{AccessionId, MoleculeType};
use crate::error::MetavizError;
use crate::gbseq::{FetchedRecord, parse_gbset};

pub trait EntrezClient: Send + Sync {
    /// Fetches full records for every id in one batched round trip.
    fn fetch_records(
        &self,
        ids: &[AccessionId],
        molecule: MoleculeType,
    ) -> Result<Vec<FetchedRecord>, MetavizError>;
}

impl<T: EntrezClient + ?Sized> EntrezClient for &T {
    fn fetch_records(
        &self,
        ids: &[AccessionId],
        molecule: MoleculeType,
    ) -> Result<Vec<FetchedRecord>, MetavizError> {
        (**self).fetch_records(ids, molecule)
    }
}

#[derive(Clone)]
pub struct EntrezHttpClient {
    client: Client,
    config: EntrezConfig,
}

impl EntrezHttpClient {
    pub fn new(config: EntrezConfig) -> Result<Self, MetavizError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("metaviz/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MetavizError::EntrezHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| MetavizError::EntrezHttp(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn efetch_url(&self) -> String {
        format!("{}/efetch.fcgi", self.config.base_url.trim_end_matches('/'))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, MetavizError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Entrez request failed".to_string());
        Err(MetavizError::EntrezStatus { status, message })
    }
}

impl EntrezClient for EntrezHttpClient {
    fn fetch_records(
        &self,
        ids: &[AccessionId],
        molecule: MoleculeType,
    ) -> Result<Vec<FetchedRecord>, MetavizError> {
        if ids.is_empty() {
            return Err(MetavizError::NoAccessions);
        }

        let params = efetch_params(ids, molecule, &self.config);
        info!(
            db = molecule.entrez_db(),
            count = ids.len(),
            "fetching records from Entrez"
        );

        // POST keeps long id lists out of the URL.
        let response = self
            .client
            .post(self.efetch_url())
            .form(&params)
            .send()
            .map_err(|err| MetavizError::EntrezHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| MetavizError::EntrezHttp(err.to_string()))?;

        let records = parse_gbset(&body)?;
        ensure_all_returned(ids, &records)?;
        debug!(records = records.len(), "Entrez fetch complete");
        Ok(records)
    }
}

/// Form fields for a single `efetch` call covering all `ids`.
pub fn efetch_params(
    ids: &[AccessionId],
    molecule: MoleculeType,
    config: &EntrezConfig,
) -> Vec<(&'static str, String)> {
    let joined = ids
        .iter()
        .map(AccessionId::as_str)
        .collect::<Vec<_>>()
        .join(",");

    let mut params = vec![
        ("db", molecule.entrez_db().to_string()),
        ("id", joined),
        ("rettype", "gb".to_string()),
        ("retmode", "xml".to_string()),
        ("tool", config.tool.clone()),
    ];
    if let Some(email) = config.email.as_deref().filter(|v| !v.trim().is_empty()) {
        params.push(("email", email.trim().to_string()));
    }
    if let Some(api_key) = config.api_key.as_deref().filter(|v| !v.trim().is_empty()) {
        params.push(("api_key", api_key.trim().to_string()));
    }
    params
}

/// Every requested accession must come back; partial batches are an error.
pub fn ensure_all_returned(
    ids: &[AccessionId],
    records: &[FetchedRecord],
) -> Result<(), MetavizError> {
    // Entrez matches ids case-insensitively and answers in upper case.
    let returned = records
        .iter()
        .map(|record| crate::domain::strip_version(&record.accession).to_ascii_uppercase())
        .collect::<BTreeSet<_>>();

    let missing = ids
        .iter()
        .map(AccessionId::base)
        .filter(|base| !returned.contains(&base.to_ascii_uppercase()))
        .map(str::to_string)
        .collect::<BTreeSet<_>>();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MetavizError::UnknownAccessions(missing.into_iter().collect()))
    }
}
