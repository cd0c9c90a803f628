//! Precomputed per-taxonomy tables shipped next to the binary.
//!
//! Loaded once at startup and only read afterwards. Every query takes a
//! [`Selection`] and returns owned rows ready for charting or export.

use std::collections::BTreeMap;

use camino::Utf8Path;
use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{MoleculeType, Selection};
use crate::error::MetavizError;

pub const TIMELINE_FILE: &str = "year-cumulative-taxonomy_x2.csv";
pub const DESCRIPTIVE_FILE: &str = "descriptive-taxonomy_x2.csv";
pub const COUNTRY_FILE: &str = "country-taxonomy.csv";
pub const HOST_FILE: &str = "host-taxonomy.csv";
pub const ISOLATION_SOURCE_FILE: &str = "isolation-source-taxonomy.csv";
pub const HOST_SPECIES_FILE: &str = "host-species.csv";
pub const REGION_SPECIES_FILE: &str = "geography_species.csv";
pub const CLASSIFICATION_FILE: &str = "sunburst_500.csv";

/// Bar and pie charts show this many entries.
pub const DEFAULT_TOP: usize = 10;

/// Yearly counts per taxonomy; `_x` columns are protein, `_y` nucleotide.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimelineRow {
    #[serde(rename = "Taxonomy")]
    pub taxonomy: String,
    #[serde(rename = "Collection_Date")]
    pub collection_date: String,
    #[serde(rename = "Count_x")]
    pub protein_count: u64,
    #[serde(rename = "Cumulative_Count_x")]
    pub protein_cumulative: u64,
    #[serde(rename = "Count_y")]
    pub nucleotide_count: u64,
    #[serde(rename = "Cumulative_Count_y")]
    pub nucleotide_cumulative: u64,
}

/// Protein record counts per taxonomy, including records without a
/// collection year.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DescriptiveRow {
    #[serde(rename = "Taxonomy")]
    pub taxonomy: String,
    #[serde(rename = "Count_x")]
    pub protein_count: u64,
}

/// One species placed in the Baltimore > family > genus > species hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassificationRow {
    pub baltimore: String,
    #[serde(rename = "Family", default)]
    pub family: String,
    #[serde(rename = "Genus", default)]
    pub genus: String,
    #[serde(rename = "Species", default)]
    pub species: String,
}

impl ClassificationRow {
    /// Levels down to the first blank one.
    fn path(&self) -> impl Iterator<Item = &str> {
        [&self.baltimore, &self.family, &self.genus, &self.species]
            .into_iter()
            .map(|level| level.trim())
            .take_while(|level| !level.is_empty())
    }
}

/// Sunburst node; `count` is the number of species rows beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationNode {
    pub name: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClassificationNode>,
}

#[derive(Default)]
struct NodeBuilder {
    count: u64,
    children: BTreeMap<String, NodeBuilder>,
}

impl NodeBuilder {
    fn into_nodes(children: BTreeMap<String, NodeBuilder>) -> Vec<ClassificationNode> {
        children
            .into_iter()
            .map(|(name, node)| ClassificationNode {
                name,
                count: node.count,
                children: Self::into_nodes(node.children),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaxonomyCount {
    #[serde(rename = "Taxonomy")]
    pub taxonomy: String,
    #[serde(alias = "Country", alias = "Host", alias = "Isolation_Source")]
    pub label: String,
    #[serde(rename = "Count")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpeciesCount {
    #[serde(alias = "Host", alias = "Geographical_Region", default)]
    pub group: Option<String>,
    #[serde(rename = "Species")]
    pub species: String,
    #[serde(rename = "Count")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    #[serde(rename = "Taxonomy")]
    pub taxonomy: String,
    #[serde(rename = "Collection_Date")]
    pub collection_date: String,
    #[serde(rename = "Count")]
    pub count: u64,
    #[serde(rename = "Cumulative_Count")]
    pub cumulative_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineMode {
    Cumulative,
    OneYear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub taxonomy: String,
    pub collection_date: String,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RankedTable {
    Countries,
    Hosts,
    IsolationSources,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub timeline: Vec<TimelineRow>,
    pub descriptive: Vec<DescriptiveRow>,
    pub countries: Vec<TaxonomyCount>,
    pub hosts: Vec<TaxonomyCount>,
    pub isolation_sources: Vec<TaxonomyCount>,
    pub host_species: Vec<SpeciesCount>,
    pub region_species: Vec<SpeciesCount>,
    pub classification: Vec<ClassificationRow>,
}

impl Catalog {
    pub fn load(dir: &Utf8Path) -> Result<Self, MetavizError> {
        let catalog = Self {
            timeline: read_table(&dir.join(TIMELINE_FILE))?,
            descriptive: read_table(&dir.join(DESCRIPTIVE_FILE))?,
            countries: read_table(&dir.join(COUNTRY_FILE))?,
            hosts: read_table(&dir.join(HOST_FILE))?,
            isolation_sources: read_table(&dir.join(ISOLATION_SOURCE_FILE))?,
            host_species: read_table(&dir.join(HOST_SPECIES_FILE))?,
            region_species: read_table(&dir.join(REGION_SPECIES_FILE))?,
            classification: read_table(&dir.join(CLASSIFICATION_FILE))?,
        };
        debug!(
            dir = %dir,
            timeline_rows = catalog.timeline.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Dropdown options: distinct taxonomy names in first-seen order.
    pub fn taxonomies(&self) -> Vec<&str> {
        distinct(self.timeline.iter().map(|row| row.taxonomy.as_str()))
    }

    pub fn hosts(&self) -> Vec<&str> {
        distinct(self.host_species.iter().filter_map(|row| row.group.as_deref()))
    }

    pub fn regions(&self) -> Vec<&str> {
        distinct(self.region_species.iter().filter_map(|row| row.group.as_deref()))
    }

    /// Sequence count card. Protein totals come from the descriptive table,
    /// which also counts records without a collection year; nucleotide
    /// totals sum the yearly timeline.
    pub fn sequence_total(&self, selection: &Selection, molecule: MoleculeType) -> u64 {
        match molecule {
            MoleculeType::Protein => self
                .descriptive
                .iter()
                .filter(|row| selection.matches(&row.taxonomy))
                .map(|row| row.protein_count)
                .sum(),
            MoleculeType::Nucleotide => self
                .timeline_rows(selection, molecule)
                .iter()
                .map(|point| point.count)
                .sum(),
        }
    }

    /// Baltimore classes with their families, genera and species.
    pub fn classification_tree(&self) -> Vec<ClassificationNode> {
        let mut roots: BTreeMap<String, NodeBuilder> = BTreeMap::new();
        for row in &self.classification {
            let mut level = &mut roots;
            for name in row.path() {
                let node = level.entry(name.to_string()).or_default();
                node.count += 1;
                level = &mut node.children;
            }
        }
        NodeBuilder::into_nodes(roots)
    }

    pub fn timeline_rows(&self, selection: &Selection, molecule: MoleculeType) -> Vec<TimelinePoint> {
        self.timeline
            .iter()
            .filter(|row| selection.matches(&row.taxonomy))
            .map(|row| {
                let (count, cumulative_count) = match molecule {
                    MoleculeType::Protein => (row.protein_count, row.protein_cumulative),
                    MoleculeType::Nucleotide => (row.nucleotide_count, row.nucleotide_cumulative),
                };
                TimelinePoint {
                    taxonomy: row.taxonomy.clone(),
                    collection_date: row.collection_date.clone(),
                    count,
                    cumulative_count,
                }
            })
            .collect()
    }

    pub fn timeline_series(
        &self,
        selection: &Selection,
        molecule: MoleculeType,
        mode: TimelineMode,
    ) -> Vec<SeriesPoint> {
        self.timeline_rows(selection, molecule)
            .into_iter()
            .map(|point| SeriesPoint {
                value: match mode {
                    TimelineMode::Cumulative => point.cumulative_count,
                    TimelineMode::OneYear => point.count,
                },
                taxonomy: point.taxonomy,
                collection_date: point.collection_date,
            })
            .collect()
    }

    pub fn top(&self, table: RankedTable, selection: &Selection, limit: usize) -> Vec<TaxonomyCount> {
        let rows = match table {
            RankedTable::Countries => &self.countries,
            RankedTable::Hosts => &self.hosts,
            RankedTable::IsolationSources => &self.isolation_sources,
        };
        top_by_count(
            rows.iter().filter(|row| selection.matches(&row.taxonomy)),
            |row: &TaxonomyCount| row.count,
            limit,
        )
    }

    /// Species most often sequenced from the selected hosts.
    pub fn species_for_hosts(&self, hosts: &Selection, limit: usize) -> Vec<SpeciesCount> {
        species_for_groups(&self.host_species, hosts, limit)
    }

    /// Species most often sequenced in the selected regions; rows without a
    /// region are ignored.
    pub fn species_for_regions(&self, regions: &Selection, limit: usize) -> Vec<SpeciesCount> {
        species_for_groups(&self.region_species, regions, limit)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values.map(str::trim).filter(|value| !value.is_empty()) {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn species_for_groups(rows: &[SpeciesCount], selection: &Selection, limit: usize) -> Vec<SpeciesCount> {
    top_by_count(
        rows.iter().filter(|row| {
            row.group
                .as_deref()
                .filter(|group| !group.trim().is_empty())
                .is_some_and(|group| selection.matches(group))
        }),
        |row: &SpeciesCount| row.count,
        limit,
    )
}

fn top_by_count<'a, T, I, F>(rows: I, count: F, limit: usize) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> u64,
{
    let mut selected: Vec<T> = rows.cloned().collect();
    selected.sort_by(|a, b| count(b).cmp(&count(a)));
    selected.truncate(limit);
    selected
}

fn read_table<T: DeserializeOwned>(path: &Utf8Path) -> Result<Vec<T>, MetavizError> {
    let load_error = |message: String| MetavizError::CatalogLoad {
        path: path.to_string(),
        message,
    };
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| load_error(err.to_string()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|err| load_error(err.to_string()))
}
