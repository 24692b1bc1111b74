use clap::{Parser, Subcommand};
use doadores_sync::app::ports::{PublisherPort, SourcePort};
use doadores_sync::infra::github::GithubPublisher;
use doadores_sync::infra::http_source::{FileSource, HttpSource};
use doadores_sync::observability::metrics::{self, MetricName};
use doadores_sync::observability::init_logging;
use doadores_sync::{Config, PublishOutcome, Result, SyncError, SyncUseCase};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "doadores-sync")]
#[command(about = "Publishes the masked equipment-donor list to GitHub")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./doadores.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, transform and publish the donor list
    Run {
        /// Read the CSV from a local file instead of the published URL
        #[arg(long)]
        input: Option<PathBuf>,
        /// Render the JSON without publishing it
        #[arg(long)]
        dry_run: bool,
        /// Also write the rendered JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fetch and validate the spreadsheet only
    Check {
        /// Read the CSV from a local file instead of the published URL
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print the effective configuration
    ShowConfig,
}

fn build_source(config: &Config, input: Option<PathBuf>) -> Result<Box<dyn SourcePort>> {
    Ok(match input {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new(
            config.source_url.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        )?),
    })
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            dry_run,
            output,
        } => {
            let source = build_source(&config, input)?;
            let use_case = if dry_run {
                SyncUseCase::dry_run(source, config)
            } else {
                // Resolve the token before downloading anything.
                let token = config.access_token()?;
                let publisher: Box<dyn PublisherPort> =
                    Box::new(GithubPublisher::from_config(&config, &token)?);
                SyncUseCase::new(source, publisher, config)
            };

            let report = use_case.execute().await?;

            if let Some(path) = &output {
                tokio::fs::write(path, &report.document).await?;
                info!(path = %path.display(), "Wrote rendered JSON");
            }

            match report.outcome {
                PublishOutcome::DryRun if output.is_none() => println!("{}", report.document),
                PublishOutcome::DryRun => {}
                outcome => {
                    eprintln!("✅ {} ({}): {} rows, {} records", report.output_path, outcome, report.rows, report.records);
                }
            }
            if report.invalid_tax_ids > 0 {
                warn!("{} rows have an invalid CPF", report.invalid_tax_ids);
            }
        }
        Commands::Check { input } => {
            let source = build_source(&config, input)?;
            let rows = SyncUseCase::dry_run(source, config).check().await?;
            println!("✅ {} rows passed validation", rows.len());
        }
        Commands::ShowConfig => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| SyncError::Config(e.to_string()))?;
            println!("{rendered}");
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging();
    if let Err(e) = metrics::init() {
        warn!("Metrics disabled: {}", e);
    }

    let code = match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            metrics::increment(MetricName::RunFailures, 1);
            error!(category = e.category(), "Run failed: {}", e);
            eprintln!("❌ [{}] {}", e.category(), e);
            ExitCode::FAILURE
        }
    };

    metrics::push_if_configured().await;
    code
}
