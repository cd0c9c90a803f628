use std::fs;

use assert_matches::assert_matches;

use metaviz::config::{Config, ConfigLoader, DEFAULT_ENTREZ_BASE_URL, EntrezEntry};
use metaviz::error::MetavizError;

#[test]
fn resolve_config_fills_defaults() {
    let config = Config {
        schema_version: None,
        entrez: Some(EntrezEntry {
            email: Some("lab@example.org".to_string()),
            ..EntrezEntry::default()
        }),
        catalog_dir: Some("fixtures".to_string()),
    };
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.entrez.email.as_deref(), Some("lab@example.org"));
    assert_eq!(resolved.entrez.tool, "metaviz");
    assert_eq!(resolved.entrez.base_url, DEFAULT_ENTREZ_BASE_URL);
    assert_eq!(resolved.catalog_dir.as_str(), "fixtures");
}

#[test]
fn unsupported_schema_is_rejected() {
    let config = Config {
        schema_version: Some(7),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, MetavizError::ConfigParse(_));
}

#[test]
fn resolve_reads_explicit_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metaviz.json");
    fs::write(
        &path,
        r#"{ "entrez": { "tool": "lab-dashboard", "timeout_secs": 30 }, "catalog_dir": "tables" }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.entrez.tool, "lab-dashboard");
    assert_eq!(resolved.entrez.timeout_secs, 30);
    assert_eq!(resolved.catalog_dir.as_str(), "tables");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, MetavizError::ConfigRead(_));
}
