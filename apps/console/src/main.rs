mod view;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, load_settings_from, settings::normalize_server_url, AdminActions,
    ManualErrorPanel, RelayTestPanel, SessionController, UiContext,
};
use shared::domain::{CircuitSlot, ExamNumber, RelayChoice};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::view::ConsoleView;

#[derive(Parser, Debug)]
#[command(name = "relay-console", about = "Operator console for the relay exam station")]
struct Cli {
    /// Settings file; defaults to relay_console.toml in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a timed exam and finish it on Ctrl-C or when time runs out.
    Exam { exam_number: String },
    #[command(subcommand)]
    Test(TestCommand),
    #[command(subcommand)]
    Errors(ErrorsCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
enum TestCommand {
    Run,
    Status,
}

#[derive(Subcommand, Debug)]
enum ErrorsCommand {
    /// Activate manual errors, given as SLOT=RELAY or SLOT=RELAY:LABEL.
    Set {
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    Reset,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Login {
        code: String,
    },
    Wifi {
        ssid: String,
        #[arg(default_value = "")]
        password: String,
    },
    ClearDatabase,
    Shutdown,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    Install,
    Fetch { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    if let Some(url) = &cli.server_url {
        settings.server_url = normalize_server_url(url);
    }
    info!(server_url = %settings.server_url, "relay console starting");

    let view = Arc::new(ConsoleView::new(cli.yes));
    let ctx = UiContext::new(settings, view).context("failed to set up backend client")?;

    match cli.command {
        Command::Exam { exam_number } => run_exam(ctx, ExamNumber::new(exam_number)).await?,
        Command::Test(TestCommand::Run) => RelayTestPanel::new(ctx).run_test().await?,
        Command::Test(TestCommand::Status) => {
            let report = RelayTestPanel::new(ctx).relay_status().await?;
            for (relay, on) in &report.energized {
                println!("relay {relay:>3}: {}", if *on { "ON" } else { "off" });
            }
            println!(
                "{} of {} relays active",
                report.active_count, report.total_count
            );
        }
        Command::Errors(ErrorsCommand::Set { assignments }) => {
            let panel = ManualErrorPanel::new(ctx);
            for assignment in &assignments {
                let (slot, choice) = parse_assignment(assignment)?;
                panel.set_selection(slot, choice).await?;
            }
            panel.submit().await?;
        }
        Command::Errors(ErrorsCommand::Reset) => ManualErrorPanel::new(ctx).reset().await?,
        Command::Admin(command) => {
            let admin = AdminActions::new(ctx.clone());
            match command {
                AdminCommand::Login { code } => admin.admin_login(&code).await?,
                AdminCommand::Wifi { ssid, password } => {
                    admin.connect_wifi(&ssid, &password).await?
                }
                AdminCommand::ClearDatabase => {
                    admin.clear_database().await?;
                    tokio::time::sleep(ctx.settings.reload_delay()).await;
                }
                AdminCommand::Shutdown => admin.shutdown_system().await?,
            }
        }
        Command::Cache(CacheCommand::Install) => {
            let cache = ctx.offline_cache();
            let count = cache.install().await?;
            let pruned = cache.activate().await;
            println!(
                "cached {count} assets in {} (pruned {})",
                cache.name(),
                pruned.len()
            );
        }
        Command::Cache(CacheCommand::Fetch { path }) => {
            let cache = ctx.offline_cache();
            if let Err(err) = cache.install().await {
                info!(error = %err, "offline cache unavailable; fetching from network");
            }
            let (source, asset) = cache.fetch(&path).await?;
            println!(
                "{path}: {} bytes, status {}, from {source:?}",
                asset.body.len(),
                asset.status
            );
        }
    }

    Ok(())
}

async fn run_exam(ctx: UiContext, exam_number: ExamNumber) -> Result<()> {
    let redirect_delay = u64::from(ctx.settings.redirect_delay_secs);
    let session = SessionController::new(ctx);
    session.start(exam_number).await?;
    println!("Press Ctrl-C to finish the exam.");

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            // Expiry may already have claimed the finish; its outcome is awaited below.
            if let Err(err) = session.finish().await {
                debug!(error = %err, "explicit finish did not run");
            }
            session.wait_finished().await
        }
        outcome = session.wait_finished() => {
            info!("exam time expired");
            outcome
        }
    };
    let summary = outcome.context("the backend did not confirm the end of the exam")?;
    info!(exam_number = %summary.exam_number, duration_secs = summary.duration_secs, "exam closed");

    // Let the redirect countdown play out before exiting.
    tokio::time::sleep(std::time::Duration::from_secs(redirect_delay + 1)).await;
    Ok(())
}

fn parse_assignment(raw: &str) -> Result<(CircuitSlot, Option<RelayChoice>)> {
    let Some((slot, rest)) = raw.split_once('=') else {
        bail!("expected SLOT=RELAY[:LABEL], got '{raw}'");
    };
    let slot: u8 = slot
        .trim()
        .parse()
        .with_context(|| format!("invalid slot in '{raw}'"))?;
    let (relay, label) = rest.split_once(':').unwrap_or((rest, ""));
    let relay: u32 = relay
        .trim()
        .parse()
        .with_context(|| format!("invalid relay id in '{raw}'"))?;
    let label = if label.trim().is_empty() {
        format!("Relay {relay}")
    } else {
        label.trim().to_string()
    };
    Ok((CircuitSlot(slot), RelayChoice::new(relay, label)))
}
