use std::io::Write;

use camino::Utf8Path;
use csv::WriterBuilder;
use serde::Serialize;

use crate::aggregate::JoinedRecordTable;
use crate::catalog::TimelinePoint;
use crate::error::MetavizError;

pub const METAFRAME_FILENAME: &str = "metaframe.csv";
pub const SPECIES_YEAR_FILENAME: &str = "species-year.csv";

const JOINED_COLUMNS: [&str; 4] = ["Accession", "Country", "Host", "Year"];
const TIMELINE_COLUMNS: [&str; 4] = ["Taxonomy", "Collection_Date", "Count", "Cumulative_Count"];

/// A CSV file ready to be handed to the browser or written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDownload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl CsvDownload {
    /// Writes next to the target first and renames into place.
    pub fn write_atomically(&self, destination: &Utf8Path) -> Result<(), MetavizError> {
        let parent = destination
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix("metaviz-csv")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MetavizError::Filesystem(err.to_string()))?;
        temp.write_all(&self.content)
            .map_err(|err| MetavizError::Filesystem(err.to_string()))?;
        temp.persist(destination.as_std_path())
            .map_err(|err| MetavizError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

pub fn joined_table_csv(table: &JoinedRecordTable) -> Result<CsvDownload, MetavizError> {
    Ok(CsvDownload {
        filename: METAFRAME_FILENAME.to_string(),
        content: semicolon_csv(&JOINED_COLUMNS, &table.rows)?,
    })
}

pub fn timeline_csv(points: &[TimelinePoint]) -> Result<CsvDownload, MetavizError> {
    Ok(CsvDownload {
        filename: SPECIES_YEAR_FILENAME.to_string(),
        content: semicolon_csv(&TIMELINE_COLUMNS, points)?,
    })
}

/// `;`-delimited, header always present, no index column.
fn semicolon_csv<T: Serialize>(columns: &[&str], rows: &[T]) -> Result<Vec<u8>, MetavizError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(columns)
        .map_err(|err| MetavizError::Csv(err.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| MetavizError::Csv(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| MetavizError::Csv(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::JoinedRow;

    #[test]
    fn empty_table_still_has_header() {
        let csv = joined_table_csv(&JoinedRecordTable { rows: Vec::new() }).unwrap();
        assert_eq!(csv.filename, "metaframe.csv");
        assert_eq!(String::from_utf8(csv.content).unwrap(), "Accession;Country;Host;Year\n");
    }

    #[test]
    fn values_with_delimiter_are_quoted() {
        let table = JoinedRecordTable {
            rows: vec![JoinedRow {
                accession: "AB1".to_string(),
                country: "USA".to_string(),
                host: "Homo sapiens; female".to_string(),
                year: "2020".to_string(),
            }],
        };
        let csv = joined_table_csv(&table).unwrap();
        let text = String::from_utf8(csv.content).unwrap();
        assert!(text.ends_with("AB1;USA;\"Homo sapiens; female\";2020\n"));
    }
}
