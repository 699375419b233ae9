use anyhow::Result;
use clap::{Parser, Subcommand};
use sf311::config::{FetchMode, load_config};
use sf311::detail::fetch_ticket_detail;
use sf311::model::{Offense, RunReport};
use sf311::pipeline::{detail_source_for, run, type_distribution};
use sf311::store::load_offenses;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sf311", about = "Scrape and enrich 311 ticket listings")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Fetch {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        no_enrich: bool,
        #[arg(long)]
        workers: Option<usize>,
    },
    Parse {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        detail_dir: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        no_enrich: bool,
    },
    Detail { id: String },
    Summary {
        #[arg(long)]
        input: PathBuf,
    },
    Validate,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            page,
            out,
            no_enrich,
            workers,
        } => {
            config.fetch.mode = FetchMode::Http;
            if let Some(page) = page {
                config.listing.page = page;
            }
            if let Some(workers) = workers {
                config.enrich.workers = workers;
            }
            if let Some(out) = out {
                config.output.path = Some(std::path::absolute(out)?);
            }
            config.enrich.enabled &= !no_enrich;
            config.validate()?;

            let outcome = run(&config)?;
            print_offenses(&outcome.offenses);
            log_report(&outcome.report);
            print_distribution(&outcome.offenses);
        }
        Commands::Parse {
            file,
            detail_dir,
            out,
            no_enrich,
        } => {
            config.fetch.mode = FetchMode::File;
            // Command-line paths are relative to the working directory, not the config file.
            config.fetch.listing_file = Some(std::path::absolute(file)?);
            if let Some(dir) = detail_dir {
                config.fetch.detail_dir = Some(std::path::absolute(dir)?);
            }
            if let Some(out) = out {
                config.output.path = Some(std::path::absolute(out)?);
            }
            config.enrich.enabled &= !no_enrich;
            config.validate()?;

            let outcome = run(&config)?;
            print_offenses(&outcome.offenses);
            log_report(&outcome.report);
        }
        Commands::Detail { id } => {
            let source = detail_source_for(&config)?;
            let detail = fetch_ticket_detail(source.as_ref(), &id);
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Commands::Summary { input } => {
            let offenses = load_offenses(&input)?;
            println!("{} offenses", offenses.len());
            print_distribution(&offenses);
        }
        Commands::Validate => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn print_offenses(offenses: &[Offense]) {
    for offense in offenses {
        println!("{offense}");
    }
    println!("Total: {} offenses", offenses.len());
}

fn print_distribution(offenses: &[Offense]) {
    for (offense_type, count) in type_distribution(offenses) {
        println!("  {offense_type}: {count}");
    }
}

fn log_report(report: &RunReport) {
    info!(
        url = %report.source_url,
        page = report.page,
        tier = report.tier.map(|t| t.as_str()).unwrap_or("none"),
        containers = report.containers_found,
        parsed = report.records_parsed,
        enriched = report.enrichment.attempted,
        failed = report.enrichment.failed,
        "run summary"
    );
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
