//! Records returned by Entrez `efetch` with `rettype=gb&retmode=xml`.
//!
//! Only the pieces the aggregator reads are modelled: the primary accession
//! and the feature table with its qualifiers. Everything else in a `GBSeq`
//! element (sequence, references, comments) is skipped by the deserializer.

use quick_xml::de::from_str;
use serde::Serialize;

use crate::error::MetavizError;

pub const SOURCE_FEATURE: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Qualifier {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub key: String,
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedRecord {
    pub accession: String,
    pub features: Vec<Feature>,
}

impl FetchedRecord {
    /// Every value of `name` across all `source` features, in record order.
    pub fn source_qualifiers<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.features
            .iter()
            .filter(|feature| feature.key == SOURCE_FEATURE)
            .flat_map(|feature| feature.qualifiers.iter())
            .filter(move |qualifier| qualifier.name == name)
            .filter_map(|qualifier| qualifier.value.as_deref())
    }
}

mod xml {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct GbSet {
        #[serde(rename = "GBSeq", default)]
        pub seqs: Vec<GbSeq>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GbSeq {
        #[serde(rename = "GBSeq_primary-accession")]
        pub primary_accession: Option<String>,
        #[serde(rename = "GBSeq_accession-version")]
        pub accession_version: Option<String>,
        #[serde(rename = "GBSeq_feature-table", default)]
        pub feature_table: Option<FeatureTable>,
    }

    #[derive(Debug, Deserialize)]
    pub struct FeatureTable {
        #[serde(rename = "GBFeature", default)]
        pub features: Vec<GbFeature>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GbFeature {
        #[serde(rename = "GBFeature_key")]
        pub key: String,
        #[serde(rename = "GBFeature_quals", default)]
        pub quals: Option<Quals>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Quals {
        #[serde(rename = "GBQualifier", default)]
        pub qualifiers: Vec<GbQualifier>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GbQualifier {
        #[serde(rename = "GBQualifier_name")]
        pub name: String,
        #[serde(rename = "GBQualifier_value", default)]
        pub value: Option<String>,
    }
}

pub fn parse_gbset(payload: &str) -> Result<Vec<FetchedRecord>, MetavizError> {
    // efetch reports some failures as a plain-text body with status 200.
    if !payload.contains("<GBSet") {
        let snippet: String = payload.trim().chars().take(200).collect();
        return Err(MetavizError::RecordDecode(format!(
            "response is not a GBSet document: {snippet}"
        )));
    }
    let set: xml::GbSet =
        from_str(payload).map_err(|err| MetavizError::RecordDecode(err.to_string()))?;

    set.seqs
        .into_iter()
        .enumerate()
        .map(|(index, seq)| {
            let accession = seq
                .primary_accession
                .or_else(|| {
                    seq.accession_version
                        .map(|value| crate::domain::strip_version(&value).to_string())
                })
                .ok_or_else(|| {
                    MetavizError::RecordDecode(format!("record {index} has no accession"))
                })?;
            let features = seq
                .feature_table
                .map(|table| table.features)
                .unwrap_or_default()
                .into_iter()
                .map(|feature| Feature {
                    key: feature.key,
                    qualifiers: feature
                        .quals
                        .map(|quals| quals.qualifiers)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|qualifier| Qualifier {
                            name: qualifier.name,
                            value: qualifier.value,
                        })
                        .collect(),
                })
                .collect();
            Ok(FetchedRecord {
                accession,
                features,
            })
        })
        .collect()
}
