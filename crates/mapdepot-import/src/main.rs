//! mapdepot - map-data import tool

use anyhow::Result;
use clap::Parser;
use mapdepot_common::logging::{init_logging, LogConfig, LogLevel};
use mapdepot_import::config::Settings;
use mapdepot_import::pipeline::Importer;
use mapdepot_import::progress::ConsoleProgress;
use mapdepot_import::storage::MongoSink;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

// The auto short help flag is disabled so -h can select the storage host;
// --help still works.
#[derive(Parser, Debug)]
#[command(
    name = "mapdepot",
    version,
    about = "Loads a map-data export into a document store",
    disable_help_flag = true
)]
struct Cli {
    /// Source map-data file to import
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Storage host (ignored when a connection string is configured)
    #[arg(short = 'h', long = "host")]
    host: Option<String>,

    /// Destination database name (ignored when a connection string is configured)
    #[arg(short = 'd', long = "database")]
    database: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print help
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Normal runs keep the console quiet so the progress line stays readable;
    // verbose mode turns on debug diagnostics.
    let log_config = if cli.verbose {
        LogConfig::builder()
            .level(LogLevel::Debug)
            .log_file_prefix("mapdepot".to_string())
            .build()
    } else {
        LogConfig::builder()
            .level(LogLevel::Warn)
            .log_file_prefix("mapdepot".to_string())
            .build()
    };

    // Environment variables take precedence over the flag-derived defaults.
    let log_config = LogConfig::from_env().unwrap_or(log_config);
    let _ = init_logging(&log_config);

    if let Err(e) = run(&cli).await {
        error!(error = %e, "Import failed");
        eprintln!("Error importing map data. Message: {e}");
        process::exit(1);
    }

    println!("Processing complete.");
}

/// Resolve configuration, connect the sink, and drive the import run
async fn run(cli: &Cli) -> Result<()> {
    info!("Starting import");

    let settings = Settings::resolve(cli.host.as_deref(), cli.database.as_deref())?;
    let sink = MongoSink::connect(&settings.connection_string).await?;

    let importer = Importer::new(&cli.input, sink)
        .with_progress(Box::new(ConsoleProgress::new()));
    let counts = importer.run().await?;

    info!(
        points = counts.points,
        paths = counts.paths,
        groups = counts.groups,
        "Finished"
    );

    Ok(())
}
