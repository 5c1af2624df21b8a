//! Gazette CLI - archive audit and batch processing for digitized
//! newspaper collections.
//!
//! Thin front end over `gazette-core`: wires the REST catalog, the webroot
//! content fetcher, and the legacy metadata loader into the audit
//! orchestrator, and exposes the batch executor for bulk OCR/tiling jobs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gazette_core::{
    AuditConfig, AuditOrchestrator, BatchExecutor, GazetteError, JobSpec, PhpDefineLoader,
    RestCatalog, WebrootFetcher,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit code when the audit found discrepancies or a strict batch had
/// failing jobs.
const EXIT_DISCREPANCIES: i32 = 1;
/// Exit code for fatal setup errors (missing root, empty archive).
const EXIT_FATAL: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "gazette")]
#[command(about = "Archive audit and batch processing for digitized newspapers")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit a local archive tree against the remote catalog
    Audit {
        /// Archive root containing issue directories
        #[arg(long)]
        root: PathBuf,

        /// Catalog REST base URL (overrides config)
        #[arg(long)]
        catalog_url: Option<String>,

        /// Webroot the catalog's page paths resolve under (overrides config)
        #[arg(long)]
        webroot: Option<PathBuf>,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the plain-text discrepancy ledger to this path
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Print the full report as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Run a queue of external jobs in fixed-width cohorts
    Batch {
        /// Newline-delimited JSON file of job specs
        #[arg(long)]
        jobs: PathBuf,

        /// Cohort width (defaults to 80% of logical cores)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Label for progress logging
        #[arg(long, default_value = "batch")]
        label: String,

        /// Exit non-zero if any job failed
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let exit_code = match args.command {
        Command::Audit {
            root,
            catalog_url,
            webroot,
            config,
            ledger,
            json,
        } => run_audit(root, catalog_url, webroot, config, ledger, json).await?,
        Command::Batch {
            jobs,
            concurrency,
            label,
            strict,
        } => run_batch(jobs, concurrency, &label, strict).await?,
    };

    std::process::exit(exit_code);
}

async fn run_audit(
    root: PathBuf,
    catalog_url: Option<String>,
    webroot: Option<PathBuf>,
    config_path: Option<PathBuf>,
    ledger: Option<PathBuf>,
    json: bool,
) -> Result<i32> {
    let mut config = match config_path {
        Some(path) => AuditConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AuditConfig::default(),
    };
    if let Some(url) = catalog_url {
        config.catalog_base_url = url;
    }
    if let Some(dir) = webroot {
        config.webroot = dir;
    }

    let catalog = Arc::new(RestCatalog::new(
        &config.catalog_base_url,
        Duration::from_secs(config.http_timeout_secs),
    )?);
    let fetcher = Arc::new(WebrootFetcher::new(&config.webroot));
    let loader = Arc::new(PhpDefineLoader::new(config.metadata_file_name.clone()));

    let orchestrator = AuditOrchestrator::new(config, catalog, fetcher, loader);
    let report = match orchestrator.run(&root).await {
        Ok(report) => report,
        Err(e @ (GazetteError::RootMissing(_) | GazetteError::NoPagesFound(_))) => {
            eprintln!("{}", e);
            return Ok(EXIT_FATAL);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_summary());
    }
    if let Some(path) = ledger {
        report.write_ledger(&path)?;
        info!("Ledger written to {}", path.display());
    }

    Ok(if report.has_discrepancies() {
        EXIT_DISCREPANCIES
    } else {
        0
    })
}

async fn run_batch(
    jobs_path: PathBuf,
    concurrency: Option<usize>,
    label: &str,
    strict: bool,
) -> Result<i32> {
    let contents = std::fs::read_to_string(&jobs_path)
        .with_context(|| format!("reading jobs file {}", jobs_path.display()))?;

    let mut executor = BatchExecutor::new();
    if let Some(n) = concurrency {
        executor.set_concurrency(n);
    }
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let spec: JobSpec = serde_json::from_str(line)
            .with_context(|| format!("jobs file line {}", line_no + 1))?;
        executor.enqueue(spec);
    }

    if executor.queued() == 0 {
        eprintln!("No jobs in {}", jobs_path.display());
        return Ok(EXIT_FATAL);
    }

    let summary = executor.run_all(label).await?;
    println!(
        "{} job(s): {} succeeded, {} failed, {} cohort(s)",
        summary.outcomes.len(),
        summary.succeeded(),
        summary.failed(),
        summary.cohorts
    );
    for outcome in summary.outcomes.iter().filter(|o| !o.success()) {
        println!("  failed: {} ({:?})", outcome.label, outcome.status);
    }

    Ok(if strict && summary.failed() > 0 {
        EXIT_DISCREPANCIES
    } else {
        0
    })
}
