//! Country, host and collection-year aggregation over fetched records.
//!
//! Each attribute is flattened into its own per-accession table (one row per
//! matching `source` qualifier, duplicates kept), counted independently, and
//! finally joined per accession with absent cells filled by [`UNKNOWN`].

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::gbseq::FetchedRecord;

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Country,
    Host,
    CollectionDate,
}

impl Attribute {
    pub fn qualifier_name(self) -> &'static str {
        match self {
            Attribute::Country => "country",
            Attribute::Host => "host",
            Attribute::CollectionDate => "collection_date",
        }
    }
}

/// Drops sub-national detail: `"USA: California"` becomes `"USA"`.
pub fn normalize_country(raw: &str) -> String {
    match raw.split_once(':') {
        Some((country, _)) => country.to_string(),
        None => raw.to_string(),
    }
}

/// Drops strain or sampling detail. `;` takes precedence over `,`.
pub fn normalize_host(raw: &str) -> String {
    if let Some((host, _)) = raw.split_once(';') {
        host.to_string()
    } else if let Some((host, _)) = raw.split_once(',') {
        host.to_string()
    } else {
        raw.to_string()
    }
}

/// Parses an INSDC `collection_date`; `None` when the value is not a date.
pub fn parse_collection_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // "2020-05-01T13:45Z" style timestamps.
    let value = match value.split_once('T') {
        Some((date, time)) if time.contains(':') => date,
        _ => value,
    };

    if value.len() == 4 && value.chars().all(|ch| ch.is_ascii_digit()) {
        return value
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }

    const FULL_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%b-%Y", "%Y/%m/%d"];
    for format in FULL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    // Month precision: "2020-05" and "May-2020".
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("01-{value}"), "%d-%b-%Y"))
        .ok()
}

pub fn parse_collection_year(raw: &str) -> Option<i32> {
    parse_collection_date(raw).map(|date| date.year())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRow<V> {
    pub accession: String,
    pub value: V,
}

/// One row per (accession, qualifier value) pair for a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeTable<V> {
    pub rows: Vec<AttributeRow<V>>,
}

impl<V> AttributeTable<V> {
    pub fn extract<F>(records: &[FetchedRecord], attribute: Attribute, normalize: F) -> Self
    where
        F: Fn(&str) -> V,
    {
        let rows = records
            .iter()
            .flat_map(|record| {
                record
                    .source_qualifiers(attribute.qualifier_name())
                    .map(|raw| AttributeRow {
                        accession: record.accession.clone(),
                        value: normalize(raw),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Occurrence counts keyed by normalized value, iterated in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountTable<K: Ord> {
    counts: BTreeMap<K, usize>,
}

impl<K: Ord + Clone> CountTable<K> {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut counts = BTreeMap::new();
        for value in values {
            *counts.entry(value).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn get(&self, key: &K) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.counts.iter().map(|(key, count)| (key, *count))
    }

    /// Highest count first; equal counts keep key order.
    pub fn sorted_by_count(&self) -> Vec<(K, usize)> {
        let mut entries: Vec<(K, usize)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    pub fn top(&self, n: usize) -> Vec<(K, usize)> {
        let mut entries = self.sorted_by_count();
        entries.truncate(n);
        entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub count: usize,
    pub cumulative_count: usize,
}

/// Ascending (year, count, running total) series for the timeline chart.
pub fn year_series(years: &CountTable<i32>) -> Vec<YearPoint> {
    let mut cumulative_count = 0;
    years
        .iter()
        .map(|(year, count)| {
            cumulative_count += count;
            YearPoint {
                year: *year,
                count,
                cumulative_count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinedRow {
    #[serde(rename = "Accession")]
    pub accession: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Year")]
    pub year: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JoinedRecordTable {
    pub rows: Vec<JoinedRow>,
}

#[derive(Default)]
struct JoinCells {
    country: Option<String>,
    host: Option<String>,
    year: Option<String>,
}

impl JoinedRecordTable {
    /// Full outer join of the three attribute tables on accession.
    ///
    /// Rows are ordered by accession. Where an accession has several values
    /// for one attribute, the first present value in record order is used.
    pub fn outer_join(
        countries: &AttributeTable<String>,
        hosts: &AttributeTable<String>,
        years: &AttributeTable<Option<i32>>,
    ) -> Self {
        let mut cells: BTreeMap<&str, JoinCells> = BTreeMap::new();

        for row in &countries.rows {
            let entry = cells.entry(row.accession.as_str()).or_default();
            entry.country.get_or_insert_with(|| row.value.clone());
        }
        for row in &hosts.rows {
            let entry = cells.entry(row.accession.as_str()).or_default();
            entry.host.get_or_insert_with(|| row.value.clone());
        }
        for row in &years.rows {
            let entry = cells.entry(row.accession.as_str()).or_default();
            if entry.year.is_none() {
                entry.year = row.value.map(|year| year.to_string());
            }
        }

        let rows = cells
            .into_iter()
            .map(|(accession, cells)| JoinedRow {
                accession: accession.to_string(),
                country: cells.country.unwrap_or_else(|| UNKNOWN.to_string()),
                host: cells.host.unwrap_or_else(|| UNKNOWN.to_string()),
                year: cells.year.unwrap_or_else(|| UNKNOWN.to_string()),
            })
            .collect();

        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedMetadata {
    pub countries: CountTable<String>,
    pub hosts: CountTable<String>,
    pub years: CountTable<i32>,
    pub joined: JoinedRecordTable,
}

impl AggregatedMetadata {
    pub fn year_series(&self) -> Vec<YearPoint> {
        year_series(&self.years)
    }
}

pub fn aggregate(records: &[FetchedRecord]) -> AggregatedMetadata {
    let country_rows = AttributeTable::extract(records, Attribute::Country, normalize_country);
    let host_rows = AttributeTable::extract(records, Attribute::Host, normalize_host);
    let year_rows =
        AttributeTable::extract(records, Attribute::CollectionDate, parse_collection_year);

    let countries = CountTable::from_values(country_rows.rows.iter().map(|row| row.value.clone()));
    let hosts = CountTable::from_values(host_rows.rows.iter().map(|row| row.value.clone()));
    // Unparseable dates stay in the per-accession table but have no year to count.
    let years = CountTable::from_values(year_rows.rows.iter().filter_map(|row| row.value));

    let joined = JoinedRecordTable::outer_join(&country_rows, &host_rows, &year_rows);

    info!(
        records = records.len(),
        countries = countries.len(),
        hosts = hosts.len(),
        years = years.len(),
        joined_rows = joined.len(),
        "aggregated record metadata"
    );

    AggregatedMetadata {
        countries,
        hosts,
        years,
        joined,
    }
}
