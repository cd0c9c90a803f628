use metaviz::aggregate::{UNKNOWN, aggregate, normalize_country, normalize_host};
use metaviz::gbseq::{Feature, FetchedRecord, Qualifier};

fn source(quals: &[(&str, &str)]) -> Feature {
    Feature {
        key: "source".to_string(),
        qualifiers: quals
            .iter()
            .map(|(name, value)| Qualifier {
                name: name.to_string(),
                value: Some(value.to_string()),
            })
            .collect(),
    }
}

fn record(accession: &str, features: Vec<Feature>) -> FetchedRecord {
    FetchedRecord {
        accession: accession.to_string(),
        features,
    }
}

fn example_records() -> Vec<FetchedRecord> {
    vec![
        record(
            "AB1",
            vec![source(&[
                ("country", "USA: California"),
                ("host", "Homo sapiens; female"),
                ("collection_date", "2020-05-01"),
            ])],
        ),
        record("AB2", vec![source(&[("country", "Brazil")])]),
    ]
}

#[test]
fn worked_example() {
    let result = aggregate(&example_records());

    let countries: Vec<_> = result.countries.iter().map(|(k, v)| (k.as_str(), v)).collect();
    assert_eq!(countries, vec![("Brazil", 1), ("USA", 1)]);
    let hosts: Vec<_> = result.hosts.iter().map(|(k, v)| (k.as_str(), v)).collect();
    assert_eq!(hosts, vec![("Homo sapiens", 1)]);
    let years: Vec<_> = result.years.iter().map(|(k, v)| (*k, v)).collect();
    assert_eq!(years, vec![(2020, 1)]);

    let rows: Vec<_> = result
        .joined
        .rows
        .iter()
        .map(|row| {
            (
                row.accession.as_str(),
                row.country.as_str(),
                row.host.as_str(),
                row.year.as_str(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("AB1", "USA", "Homo sapiens", "2020"),
            ("AB2", "Brazil", UNKNOWN, UNKNOWN),
        ]
    );
}

#[test]
fn country_normalization_applies_everywhere() {
    let records = vec![record("X1", vec![source(&[("country", "Viet Nam: Hanoi: district 1")])])];
    let result = aggregate(&records);
    assert_eq!(normalize_country("Viet Nam: Hanoi: district 1"), "Viet Nam");
    assert_eq!(result.countries.get(&"Viet Nam".to_string()), 1);
    assert_eq!(result.joined.rows[0].country, "Viet Nam");
}

#[test]
fn host_semicolon_takes_precedence() {
    assert_eq!(normalize_host("Sus scrofa, wild; juvenile"), "Sus scrofa, wild");
    let records = vec![record("X1", vec![source(&[("host", "Sus scrofa, wild; juvenile")])])];
    let result = aggregate(&records);
    assert_eq!(result.joined.rows[0].host, "Sus scrofa, wild");
}

#[test]
fn multiple_source_features_are_flattened() {
    let records = vec![record(
        "M1",
        vec![
            source(&[("country", "Kenya")]),
            Feature {
                key: "gene".to_string(),
                qualifiers: vec![Qualifier {
                    name: "country".to_string(),
                    value: Some("Ignored".to_string()),
                }],
            },
            source(&[("country", "Uganda: Kampala")]),
        ],
    )];
    let result = aggregate(&records);
    assert_eq!(result.countries.total(), 2);
    assert_eq!(result.countries.get(&"Ignored".to_string()), 0);
    assert_eq!(result.joined.len(), 1);
    assert_eq!(result.joined.rows[0].country, "Kenya");
}

#[test]
fn joined_rows_cover_union_of_attribute_tables() {
    let records = vec![
        record("A", vec![source(&[("host", "Bos taurus")])]),
        record("B", vec![source(&[("collection_date", "not recorded")])]),
        record("C", vec![source(&[("strain", "x")])]),
        record("D", Vec::new()),
    ];
    let result = aggregate(&records);

    let accessions: Vec<_> = result.joined.rows.iter().map(|r| r.accession.as_str()).collect();
    assert_eq!(accessions, vec!["A", "B"]);
    let b = &result.joined.rows[1];
    assert_eq!((b.country.as_str(), b.host.as_str(), b.year.as_str()), (UNKNOWN, UNKNOWN, UNKNOWN));
    for row in &result.joined.rows {
        assert!(!row.accession.is_empty() && !row.country.is_empty());
        assert!(!row.host.is_empty() && !row.year.is_empty());
    }
}

#[test]
fn unparseable_dates_are_not_counted() {
    let records = vec![
        record("A", vec![source(&[("collection_date", "2019/2020")])]),
        record("B", vec![source(&[("collection_date", "12-Mar-2019")])]),
    ];
    let result = aggregate(&records);
    assert_eq!(result.years.total(), 1);
    assert_eq!(result.years.get(&2019), 1);
    assert_eq!(result.joined.rows[0].year, UNKNOWN);
}

#[test]
fn counts_ignore_other_missing_attributes() {
    let records = vec![
        record("A", vec![source(&[("country", "Peru")])]),
        record("B", vec![source(&[("country", "Peru"), ("host", "Homo sapiens")])]),
        record("C", vec![source(&[("host", "Homo sapiens")])]),
    ];
    let result = aggregate(&records);
    assert_eq!(result.countries.total(), 2);
    assert_eq!(result.hosts.total(), 2);
    assert_eq!(result.years.total(), 0);
}

#[test]
fn duplicate_records_are_counted_twice() {
    let mut records = example_records();
    records.push(records[0].clone());
    let result = aggregate(&records);
    assert_eq!(result.countries.get(&"USA".to_string()), 2);
    assert_eq!(result.joined.len(), 2);
}

#[test]
fn aggregation_is_deterministic() {
    let records = example_records();
    assert_eq!(aggregate(&records), aggregate(&records));
    let first = serde_json::to_string(&aggregate(&records)).unwrap();
    let second = serde_json::to_string(&aggregate(&records)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn year_series_is_cumulative() {
    let records = vec![
        record("A", vec![source(&[("collection_date", "2018")])]),
        record("B", vec![source(&[("collection_date", "2020-01")])]),
        record("C", vec![source(&[("collection_date", "2018-07-04")])]),
    ];
    let series = aggregate(&records).year_series();
    let points: Vec<_> = series
        .iter()
        .map(|p| (p.year, p.count, p.cumulative_count))
        .collect();
    assert_eq!(points, vec![(2018, 2, 2), (2020, 1, 3)]);
}
