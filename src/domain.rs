use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MetavizError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MoleculeType {
    Nucleotide,
    Protein,
}

impl MoleculeType {
    /// Entrez database holding records of this molecule type.
    pub fn entrez_db(self) -> &'static str {
        match self {
            MoleculeType::Nucleotide => "nuccore",
            MoleculeType::Protein => "protein",
        }
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoleculeType::Nucleotide => write!(f, "nucleotide"),
            MoleculeType::Protein => write!(f, "protein"),
        }
    }
}

impl FromStr for MoleculeType {
    type Err = MetavizError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nucleotide" => Ok(MoleculeType::Nucleotide),
            "protein" => Ok(MoleculeType::Protein),
            _ => Err(MetavizError::InvalidSelection(value.to_string())),
        }
    }
}

/// Sequence accession as submitted to Entrez.
///
/// Parsing with [`FromStr`] drops any `.N` version suffix, which is what the
/// plain-list upload path wants. Identifiers read from FASTA headers are
/// kept verbatim through [`AccessionId::from_record_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessionId(String);

impl AccessionId {
    pub fn from_record_id(value: &str) -> Result<Self, MetavizError> {
        let trimmed = value.trim();
        validate_accession(trimmed, value)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accession without its version suffix.
    pub fn base(&self) -> &str {
        strip_version(&self.0)
    }
}

impl fmt::Display for AccessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccessionId {
    type Err = MetavizError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let stripped = strip_version(value.trim());
        validate_accession(stripped, value)?;
        Ok(Self(stripped.to_string()))
    }
}

pub fn strip_version(value: &str) -> &str {
    match value.split_once('.') {
        Some((base, _)) => base,
        None => value,
    }
}

fn validate_accession(candidate: &str, original: &str) -> Result<(), MetavizError> {
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return Err(MetavizError::InvalidAccession(original.to_string()));
    }
    Ok(())
}

/// Taxonomy (or host, or region) choice made in a dropdown.
///
/// The UI boundary decides between the two variants; nothing downstream
/// inspects value shapes to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Single(String),
    Multiple(Vec<String>),
}

impl Selection {
    pub fn from_values(mut values: Vec<String>) -> Result<Self, MetavizError> {
        match values.len() {
            0 => Err(MetavizError::InvalidSelection(
                "at least one value is required".to_string(),
            )),
            1 => Ok(Selection::Single(values.remove(0))),
            _ => Ok(Selection::Multiple(values)),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::Single(selected) => selected == value,
            Selection::Multiple(selected) => selected.iter().any(|item| item == value),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Single(value) => write!(f, "{value}"),
            Selection::Multiple(values) => write!(f, "{}", values.join(", ")),
        }
    }
}
