use std::io::{self, Write};

use serde::Serialize;

use crate::catalog::{ClassificationNode, SeriesPoint, SpeciesCount, TaxonomyCount};
use crate::domain::MoleculeType;
use crate::pipeline::{ProgressEvent, ProgressSink, SubmissionResult};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_submission(result: &SubmissionResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_series(points: &[SeriesPoint]) -> io::Result<()> {
        Self::print_json(&points)
    }

    pub fn print_ranked(rows: &[TaxonomyCount]) -> io::Result<()> {
        Self::print_json(&rows)
    }

    pub fn print_species(rows: &[SpeciesCount]) -> io::Result<()> {
        Self::print_json(&rows)
    }

    pub fn print_options(options: &[&str]) -> io::Result<()> {
        Self::print_json(&options)
    }

    pub fn print_classification(tree: &[ClassificationNode]) -> io::Result<()> {
        Self::print_json(&tree)
    }

    pub fn print_total(molecule: MoleculeType, count: u64) -> io::Result<()> {
        Self::print_json(&serde_json::json!({ "molecule": molecule, "count": count }))
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress lines on stderr, keeping stdout clean for JSON.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.2?})", event.message, elapsed),
            None => eprintln!("{}", event.message),
        }
    }
}
