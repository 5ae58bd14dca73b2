use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cardinals_common::{load_or_default, Category, FileConfig, Secrets};
use cardinals_scout::cycle::{CycleController, CycleOutcome, Envelope};
use cardinals_scout::digest::Digest;
use cardinals_scout::notify::{DigestTransport, ResendTransport};
use cardinals_scout::report::{cleanup_old_reports, write_report};
use cardinals_scout::store::AccumulationStore;
use cardinals_scout::traits::SerperSearcher;

#[derive(Parser)]
#[command(name = "cardinals", about = "Climate Cardinals weekly newsletter pipeline")]
struct Cli {
    /// Path to config TOML file (optional; defaults apply when absent)
    #[arg(long, global = true, default_value = "./cardinals.toml")]
    config: PathBuf,

    /// Override `[output] data_dir`
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest, accumulate and (on the send day) dispatch the digest
    Run {
        /// Harvest even if today's harvest already ran
        #[arg(long)]
        force: bool,
        /// Log the digest instead of emailing it; the week is never reset
        #[arg(long)]
        dry_run: bool,
    },
    /// Re-render the full HTML report from the accumulated tables
    Report,
    /// Print accumulated row counts per category
    Counts,
    /// Delete old HTML reports, keeping the most recent
    Cleanup {
        #[arg(long)]
        keep: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let mut config = load_or_default(&cli.config)?;
    config.apply_env_overrides();
    if let Some(dir) = &cli.data_dir {
        config.output.data_dir = dir.clone();
    }
    info!(config = %cli.config.display(), data_dir = %config.output.data_dir.display(), "Config loaded");

    let today = Local::now().date_naive();

    let command = cli.command.unwrap_or(Command::Run {
        force: false,
        dry_run: false,
    });
    match command {
        Command::Run { force, dry_run } => run(config, force, dry_run, today).await,
        Command::Report => {
            let store = AccumulationStore::new(&config.output.data_dir);
            let digest = Digest::load(&store);
            let path = write_report(store.dir(), &digest, today)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Counts => {
            let store = AccumulationStore::new(&config.output.data_dir);
            for category in Category::ALL {
                println!("{:<12} {:>5}", category.label(), store.row_count(category));
            }
            Ok(())
        }
        Command::Cleanup { keep, dry_run } => {
            let keep = keep.unwrap_or(config.output.keep_recent_reports);
            let removed = cleanup_old_reports(&config.output.data_dir, keep, dry_run)?;
            let verb = if dry_run { "would delete" } else { "deleted" };
            for path in &removed {
                println!("{verb} {}", path.display());
            }
            println!("{} report(s) {verb}", removed.len());
            Ok(())
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("cardinals=info".parse()?);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn run(
    config: FileConfig,
    force: bool,
    dry_run: bool,
    today: chrono::NaiveDate,
) -> Result<()> {
    let secrets = Secrets::from_env();
    secrets.log_redacted();

    let api_key = secrets
        .serper_api_key
        .as_deref()
        .context("SERPER_API_KEY is required to harvest")?;
    let searcher = Arc::new(SerperSearcher::new(api_key)?);

    let transport: Option<Arc<dyn DigestTransport>> = match &secrets.resend_api_key {
        Some(key) if secrets.email_configured() => Some(Arc::new(ResendTransport::new(key.clone())?)),
        _ => None,
    };
    let envelope = secrets.sender_email.clone().map(|from| Envelope {
        from,
        to: secrets.recipient_emails.clone(),
    });

    let controller = CycleController::new(config, searcher, transport, envelope)
        .with_force(force)
        .with_dry_run(dry_run);
    let outcome = controller.run(today).await?;
    print_summary(&outcome);
    Ok(())
}

fn print_summary(outcome: &CycleOutcome) {
    info!(phase = ?outcome.phase, send = ?outcome.send, "Cycle complete");
    println!("===== WEEKLY TOTALS =====");
    for category in Category::ALL {
        println!(
            "{:<12} {:>5}  (+{} today)",
            category.label(),
            outcome.totals.get(category),
            outcome.harvested.get(category)
        );
    }
}
