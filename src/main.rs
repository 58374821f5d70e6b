use anyhow::Result;
use bundesroster::harness::{HarnessOptions, run_harness};
use bundesroster::pipeline::{MEMBERS_URL, ScrapeOptions, WIKIPEDIA_API_URL, run_scrape};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bundesroster", about = "Bundestag member roster scraper")]
struct Cli {
    #[arg(long, default_value = ".cache")]
    cache_dir: PathBuf,

    #[arg(long, default_value = "data.sqlite")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape the member list and replace the local database contents
    Scrape {
        #[arg(long, default_value = MEMBERS_URL)]
        url: String,
    },
    /// Run the pipeline twice against a page snapshot and report stability
    Harness {
        #[arg(long)]
        page: PathBuf,
        #[arg(long, default_value = "data/harness")]
        work_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape { url } => {
            let report = run_scrape(&ScrapeOptions {
                url,
                cache_dir: cli.cache_dir,
                db_path: cli.db_path,
                api_endpoint: Some(WIKIPEDIA_API_URL.to_string()),
            })?;

            info!(
                rows = report.rows_parsed,
                resolved = report.resolved,
                unresolved = report.unresolved,
                saved = report.saved,
                "scrape summary"
            );
        }
        Commands::Harness { page, work_dir } => {
            let report = run_harness(&HarnessOptions {
                page_path: page,
                work_dir,
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
