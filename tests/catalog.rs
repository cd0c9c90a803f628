use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use metaviz::catalog::{
    CLASSIFICATION_FILE, COUNTRY_FILE, Catalog, DEFAULT_TOP, DESCRIPTIVE_FILE, HOST_FILE,
    HOST_SPECIES_FILE, ISOLATION_SOURCE_FILE, REGION_SPECIES_FILE, RankedTable, TIMELINE_FILE,
    TimelineMode,
};
use metaviz::domain::{MoleculeType, Selection};
use metaviz::error::MetavizError;
use metaviz::export::timeline_csv;

fn write_fixture(dir: &Utf8PathBuf) {
    let files = [
        (
            TIMELINE_FILE,
            "Taxonomy,Collection_Date,Count_x,Cumulative_Count_x,Count_y,Cumulative_Count_y\n\
             Coronaviridae,2019,4,4,10,10\n\
             Coronaviridae,2020,6,10,30,40\n\
             Picornaviridae,2020,1,1,2,2\n",
        ),
        (
            DESCRIPTIVE_FILE,
            "Taxonomy,Count_x,Count_y\nCoronaviridae,13,41\nPicornaviridae,1,2\n",
        ),
        (
            CLASSIFICATION_FILE,
            "baltimore,Family,Genus,Species\n\
             IV,Coronaviridae,Betacoronavirus,SARS-CoV-2\n\
             IV,Coronaviridae,Alphacoronavirus,HCoV-229E\n\
             VI,Retroviridae,Lentivirus,HIV-1\n",
        ),
        (
            COUNTRY_FILE,
            "Taxonomy,Country,Count\nCoronaviridae,USA,8\nCoronaviridae,China,12\nPicornaviridae,Brazil,3\n",
        ),
        (HOST_FILE, "Taxonomy,Host,Count\nCoronaviridae,Homo sapiens,20\n"),
        (
            ISOLATION_SOURCE_FILE,
            "Taxonomy,Isolation_Source,Count\nCoronaviridae,nasopharyngeal swab,5\nCoronaviridae,feces,9\n",
        ),
        (
            HOST_SPECIES_FILE,
            "Host,Species,Count\nHomo sapiens,SARS-CoV-2,100\nHomo sapiens,Enterovirus A,7\nSus scrofa,PEDV,12\n",
        ),
        (
            REGION_SPECIES_FILE,
            "Geographical_Region,Species,Count\nEurope,SARS-CoV-2,40\n,Orphan virus,999\nAsia,Dengue virus,13\n",
        ),
    ];
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn load_fixture() -> (tempfile::TempDir, Catalog) {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    write_fixture(&dir);
    let catalog = Catalog::load(&dir).unwrap();
    (temp, catalog)
}

#[test]
fn taxonomy_options_are_distinct() {
    let (_temp, catalog) = load_fixture();
    assert_eq!(catalog.taxonomies(), vec!["Coronaviridae", "Picornaviridae"]);
}

#[test]
fn host_and_region_options_skip_blanks() {
    let (_temp, catalog) = load_fixture();
    assert_eq!(catalog.hosts(), vec!["Homo sapiens", "Sus scrofa"]);
    assert_eq!(catalog.regions(), vec!["Europe", "Asia"]);
}

#[test]
fn classification_tree_is_loaded() {
    let (_temp, catalog) = load_fixture();
    let tree = catalog.classification_tree();
    let classes: Vec<_> = tree.iter().map(|node| (node.name.as_str(), node.count)).collect();
    assert_eq!(classes, vec![("IV", 2), ("VI", 1)]);
    let genera: Vec<_> = tree[0].children[0]
        .children
        .iter()
        .map(|node| node.name.as_str())
        .collect();
    assert_eq!(genera, vec!["Alphacoronavirus", "Betacoronavirus"]);
}

#[test]
fn molecule_selects_count_columns() {
    let (_temp, catalog) = load_fixture();
    let corona = Selection::Single("Coronaviridae".to_string());
    // Protein totals include records with no collection year.
    assert_eq!(catalog.sequence_total(&corona, MoleculeType::Protein), 13);
    assert_eq!(catalog.sequence_total(&corona, MoleculeType::Nucleotide), 40);

    let both = Selection::Multiple(vec![
        "Coronaviridae".to_string(),
        "Picornaviridae".to_string(),
    ]);
    let series = catalog.timeline_series(&both, MoleculeType::Nucleotide, TimelineMode::Cumulative);
    let values: Vec<_> = series.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![10, 40, 2]);

    let yearly = catalog.timeline_series(&both, MoleculeType::Protein, TimelineMode::OneYear);
    let values: Vec<_> = yearly.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![4, 6, 1]);
}

#[test]
fn ranked_tables_read_their_label_column() {
    let (_temp, catalog) = load_fixture();
    let corona = Selection::Single("Coronaviridae".to_string());

    let countries = catalog.top(RankedTable::Countries, &corona, DEFAULT_TOP);
    let labels: Vec<_> = countries.iter().map(|row| row.label.as_str()).collect();
    assert_eq!(labels, vec!["China", "USA"]);

    let sources = catalog.top(RankedTable::IsolationSources, &corona, 1);
    assert_eq!(sources[0].label, "feces");
}

#[test]
fn species_queries_filter_by_group() {
    let (_temp, catalog) = load_fixture();
    let humans = catalog.species_for_hosts(&Selection::Single("Homo sapiens".to_string()), 5);
    let species: Vec<_> = humans.iter().map(|row| row.species.as_str()).collect();
    assert_eq!(species, vec!["SARS-CoV-2", "Enterovirus A"]);

    let regions = catalog.species_for_regions(
        &Selection::Multiple(vec!["Europe".to_string(), "Asia".to_string()]),
        DEFAULT_TOP,
    );
    let species: Vec<_> = regions.iter().map(|row| row.species.as_str()).collect();
    assert_eq!(species, vec!["SARS-CoV-2", "Dengue virus"]);
}

#[test]
fn timeline_export_is_species_year_csv() {
    let (_temp, catalog) = load_fixture();
    let rows = catalog.timeline_rows(
        &Selection::Single("Picornaviridae".to_string()),
        MoleculeType::Nucleotide,
    );
    let download = timeline_csv(&rows).unwrap();
    assert_eq!(download.filename, "species-year.csv");
    assert_eq!(
        String::from_utf8(download.content).unwrap(),
        "Taxonomy;Collection_Date;Count;Cumulative_Count\nPicornaviridae;2020;2;2\n"
    );
}

#[test]
fn written_download_lands_at_destination() {
    let (temp, catalog) = load_fixture();
    let rows = catalog.timeline_rows(
        &Selection::Single("Coronaviridae".to_string()),
        MoleculeType::Protein,
    );
    let download = timeline_csv(&rows).unwrap();
    let target = Utf8PathBuf::from_path_buf(temp.path().join("out.csv")).unwrap();
    download.write_atomically(&target).unwrap();
    assert_eq!(fs::read(target.as_std_path()).unwrap(), download.content);
}

#[test]
fn missing_table_is_a_load_error() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let err = Catalog::load(&dir).unwrap_err();
    assert_matches!(err, MetavizError::CatalogLoad { .. });
}
