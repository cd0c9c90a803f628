use std::fs;
use std::process::ExitCode;
use std::time::UNIX_EPOCH;

use camino::Utf8PathBuf;
use clap::{ArgGroup, Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metaviz::catalog::{Catalog, DEFAULT_TOP, RankedTable, TimelineMode};
use metaviz::config::ConfigLoader;
use metaviz::domain::{MoleculeType, Selection};
use metaviz::entrez::EntrezHttpClient;
use metaviz::error::MetavizError;
use metaviz::export::{CsvDownload, timeline_csv};
use metaviz::output::{JsonOutput, StderrProgress};
use metaviz::pipeline::Pipeline;
use metaviz::session::Session;
use metaviz::upload::UploadedFile;

#[derive(Parser)]
#[command(name = "metaviz")]
#[command(about = "Explore NCBI viral sequence metadata by country, host and collection year")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch records for an accession list or FASTA file and aggregate metadata")]
    Aggregate(AggregateArgs),
    #[command(about = "Query the precomputed taxonomy catalog")]
    Catalog(CatalogArgs),
}

#[derive(Args)]
struct AggregateArgs {
    file: Utf8PathBuf,

    #[arg(long, value_enum, default_value = "protein")]
    molecule: MoleculeType,

    /// Write the per-accession table as metaframe.csv (file or directory).
    #[arg(long)]
    csv: Option<Utf8PathBuf>,

    #[arg(long)]
    quiet: bool,
}

#[derive(Args)]
struct CatalogArgs {
    #[command(subcommand)]
    command: CatalogCommand,
}

#[derive(Subcommand)]
enum CatalogCommand {
    #[command(about = "List taxonomy names available for selection")]
    Taxonomies,
    #[command(about = "List host names available for species queries")]
    Hosts,
    #[command(about = "List geographic regions available for species queries")]
    Regions,
    #[command(about = "Total sequence count for the selected taxonomies")]
    Total(TotalArgs),
    #[command(about = "Baltimore class, family, genus and species hierarchy")]
    Baltimore,
    #[command(about = "Sequence counts per collection year")]
    Timeline(TimelineArgs),
    #[command(about = "Top countries, hosts or isolation sources")]
    Top(TopArgs),
    #[command(about = "Top species for hosts or geographic regions")]
    Species(SpeciesArgs),
}

#[derive(Args)]
struct TimelineArgs {
    #[arg(long = "taxonomy", required = true)]
    taxonomies: Vec<String>,

    #[arg(long, value_enum, default_value = "protein")]
    molecule: MoleculeType,

    #[arg(long, value_enum, default_value = "cumulative")]
    mode: TimelineMode,

    /// Write the selected rows as species-year.csv (file or directory).
    #[arg(long)]
    csv: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct TotalArgs {
    #[arg(long = "taxonomy", required = true)]
    taxonomies: Vec<String>,

    #[arg(long, value_enum, default_value = "protein")]
    molecule: MoleculeType,
}

#[derive(Args)]
struct TopArgs {
    #[arg(value_enum)]
    table: RankedTable,

    #[arg(long = "taxonomy", required = true)]
    taxonomies: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_TOP)]
    limit: usize,
}

#[derive(Args)]
#[command(group(ArgGroup::new("by").required(true).args(["hosts", "regions"])))]
struct SpeciesArgs {
    #[arg(long = "host")]
    hosts: Vec<String>,

    #[arg(long = "region")]
    regions: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_TOP)]
    limit: usize,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MetavizError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MetavizError) -> u8 {
    match error {
        MetavizError::NoUpload
        | MetavizError::NoAccessions
        | MetavizError::UploadDecode(_)
        | MetavizError::UploadParse { .. }
        | MetavizError::InvalidAccession(_)
        | MetavizError::InvalidSelection(_) => 2,
        MetavizError::EntrezHttp(_)
        | MetavizError::EntrezStatus { .. }
        | MetavizError::RecordDecode(_)
        | MetavizError::UnknownAccessions(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Aggregate(args) => run_aggregate(args, config.entrez),
        Commands::Catalog(args) => {
            let catalog = Catalog::load(&config.catalog_dir)?;
            run_catalog(args.command, &catalog)
        }
    }
}

fn run_aggregate(
    args: AggregateArgs,
    entrez: metaviz::config::EntrezConfig,
) -> miette::Result<()> {
    let bytes = fs::read(&args.file)
        .map_err(|err| MetavizError::Filesystem(format!("read {}: {err}", args.file)))?;
    let filename = args.file.file_name().unwrap_or(args.file.as_str()).to_string();
    let mut upload = UploadedFile::from_bytes(&bytes, filename);
    if let Some(modified) = fs::metadata(&args.file)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
    {
        upload = upload.with_last_modified(modified.as_secs() as i64);
    }

    let pipeline = Pipeline::new(EntrezHttpClient::new(entrez)?);
    let mut session = Session::new();
    let result = if args.quiet {
        session.submit(&pipeline, &upload, args.molecule, &JsonOutput)?
    } else {
        session.submit(&pipeline, &upload, args.molecule, &StderrProgress)?
    };
    JsonOutput::print_submission(result).into_diagnostic()?;

    if let Some(destination) = args.csv {
        if let Some(download) = session.download_csv()? {
            write_download(&download, destination)?;
        }
    }
    Ok(())
}

fn run_catalog(command: CatalogCommand, catalog: &Catalog) -> miette::Result<()> {
    match command {
        CatalogCommand::Taxonomies => JsonOutput::print_options(&catalog.taxonomies()).into_diagnostic(),
        CatalogCommand::Hosts => JsonOutput::print_options(&catalog.hosts()).into_diagnostic(),
        CatalogCommand::Regions => JsonOutput::print_options(&catalog.regions()).into_diagnostic(),
        CatalogCommand::Total(args) => {
            let selection = Selection::from_values(args.taxonomies)?;
            let count = catalog.sequence_total(&selection, args.molecule);
            JsonOutput::print_total(args.molecule, count).into_diagnostic()
        }
        CatalogCommand::Baltimore => {
            JsonOutput::print_classification(&catalog.classification_tree()).into_diagnostic()
        }
        CatalogCommand::Timeline(args) => {
            let selection = Selection::from_values(args.taxonomies)?;
            let series = catalog.timeline_series(&selection, args.molecule, args.mode);
            JsonOutput::print_series(&series).into_diagnostic()?;
            if let Some(destination) = args.csv {
                let rows = catalog.timeline_rows(&selection, args.molecule);
                write_download(&timeline_csv(&rows)?, destination)?;
            }
            Ok(())
        }
        CatalogCommand::Top(args) => {
            let selection = Selection::from_values(args.taxonomies)?;
            let rows = catalog.top(args.table, &selection, args.limit);
            JsonOutput::print_ranked(&rows).into_diagnostic()
        }
        CatalogCommand::Species(args) => {
            let rows = if args.hosts.is_empty() {
                catalog.species_for_regions(&Selection::from_values(args.regions)?, args.limit)
            } else {
                catalog.species_for_hosts(&Selection::from_values(args.hosts)?, args.limit)
            };
            JsonOutput::print_species(&rows).into_diagnostic()
        }
    }
}

fn write_download(download: &CsvDownload, destination: Utf8PathBuf) -> miette::Result<()> {
    let target = if destination.is_dir() {
        destination.join(&download.filename)
    } else {
        destination
    };
    download.write_atomically(&target)?;
    eprintln!("wrote {target}");
    Ok(())
}
