// crates/cli/src/main.rs
//! reportlens binary: upload an annual report and watch the ingestion
//! progress bar converge to 100% exactly when the backend reports ready.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use reportlens_client::ApiClient;
use reportlens_coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorEvent, Phase, Submission,
};

/// Default backend if neither the flag nor REPORTLENS_BASE_URL is set.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Parser, Debug)]
#[command(
    name = "reportlens",
    version,
    about = "Upload an annual report and watch ingestion progress"
)]
struct Args {
    /// Path to the annual report (PDF).
    report: PathBuf,

    /// Company hint used if the backend cannot detect one from the document.
    #[arg(long, default_value = "TCS")]
    company: String,

    /// Reporting period.
    #[arg(long, default_value = "FY25")]
    period: String,

    /// Base URL of the ingestion backend.
    #[arg(long)]
    base_url: Option<String>,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Flag, then REPORTLENS_BASE_URL, then the default.
fn resolve_base_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("REPORTLENS_BASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Running => "processing",
        Phase::Converging => "finalizing",
        Phase::Complete => "complete",
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg:>10} [{bar:40.cyan/blue}] {pos:>3}%")?
            .progress_chars("=>-"),
    );
    Ok(bar)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let bytes = tokio::fs::read(&args.report)
        .await
        .with_context(|| format!("failed to read {}", args.report.display()))?;
    let file_name = args
        .report
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.pdf".to_string());
    let submission = Submission {
        file_name,
        bytes,
        company_hint: args.company.clone(),
        period: args.period.clone(),
    };

    let base_url = resolve_base_url(args.base_url.clone());
    let client = ApiClient::new(base_url.clone())
        .with_context(|| format!("failed to build client for {base_url}"))?;
    let handle = Coordinator::spawn(client.clone(), client, CoordinatorConfig::default());
    let mut watch = handle.watch();
    let mut events = handle.events();

    // InitiationFailure surfaces here, before any progress bar is shown.
    let key = handle
        .start_job(submission)
        .await
        .context("upload failed")?;
    eprintln!("Processing annual report for {key}...");

    let bar = progress_bar()?;
    bar.set_message(phase_label(Phase::Running));

    loop {
        tokio::select! {
            changed = watch.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = watch.borrow_and_update().clone();
                bar.set_position(snap.percent.floor() as u64);
                bar.set_message(phase_label(snap.phase));
            }
            ev = events.recv() => match ev {
                Ok(CoordinatorEvent::Completed { job, .. }) => {
                    bar.set_position(100);
                    bar.finish_with_message(phase_label(Phase::Complete));
                    eprintln!("{job}: ingestion complete; dashboard data is ready.");
                    return Ok(());
                }
                Ok(CoordinatorEvent::PollAttemptFailed { attempt, error, .. }) => {
                    tracing::warn!(attempt, %error, "status poll failed; still waiting");
                }
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                handle.cancel().await;
                bar.abandon_with_message("cancelled");
                anyhow::bail!("cancelled before the backend finished");
            }
        }
    }

    anyhow::bail!("coordinator stopped unexpectedly")
}
