use anyhow::{Context, Result};
use clap::Parser;
use harvest_common::observability::{LogConfig, init_logging};
use harvest_config::{HarvestConfig, HarvestConfigLoader};

mod cli;
mod collect;

const DEFAULT_CONFIG: &str = "harvest.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials usually live in a local .env next to the config.
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    // 1) Load config: defaults < file < HARVEST__* env < CLI flags
    let loader = match &cli.config {
        Some(path) => HarvestConfigLoader::new().with_file(path),
        None => HarvestConfigLoader::new().with_optional_file(DEFAULT_CONFIG),
    };
    let mut cfg: HarvestConfig = loader.load().context("failed to load configuration")?;
    cli.apply(&mut cfg);

    // 2) Logging from the merged config
    let log_path = init_logging(LogConfig {
        log_dir: cfg.log.dir.clone(),
        emit_stderr: cfg.log.stderr,
        format: cfg.log.format,
        default_filter: cfg.log.filter.clone(),
        ..LogConfig::default()
    })?;
    tracing::debug!(log_file = %log_path.display(), "logging.ready");

    // 3) Run
    let report = collect::run(&cli.command, &cfg).await?;

    println!("{} ({} rows)", report.path.display(), report.rows);
    if !report.skipped.is_empty() {
        eprintln!(
            "skipped {} of {} after fetch errors: {}",
            report.skipped.len(),
            report.parents,
            report.skipped.join(", ")
        );
    }
    Ok(())
}
