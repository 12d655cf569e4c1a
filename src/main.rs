use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use log::{error, LevelFilter};
use modpack_sync_lib::config::{default_log_dir, SyncConfig};
use modpack_sync_lib::logging;
use modpack_sync_lib::sync::{ModpackSync, SyncOutcome, SyncStatus, SyncSummary};
use std::path::PathBuf;
use std::process::ExitCode;

/// Syncs a Minecraft profile with the latest version of a Modrinth modpack.
#[derive(Parser)]
#[command(name = "modpack-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the Minecraft profile folder
    #[arg(long = "minecraft", alias = "profile", value_name = "DIR")]
    minecraft: PathBuf,

    /// Modrinth API URL listing the modpack's versions
    /// (e.g. https://api.modrinth.com/v2/project/<slug>/version)
    #[arg(long, value_name = "URL")]
    api: String,

    /// Directory for log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Bring the profile up to date with the latest modpack version (default)
    Sync,
    /// Show the latest remote version and the cached archives
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_dir = cli.log_dir.clone().unwrap_or_else(default_log_dir);
    if let Err(e) = logging::setup_logging(&log_dir, level).await {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = SyncConfig::new(cli.minecraft, cli.api);
    let sync = match ModpackSync::new(config) {
        Ok(sync) => sync,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => sync.run().await.map(|outcome| report_outcome(&outcome)),
        Command::Status => sync.status().await.map(|status| report_status(&status)),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn report_outcome(outcome: &SyncOutcome) -> ExitCode {
    match outcome {
        SyncOutcome::VersionUnavailable { reason } => {
            println!("Could not check for a new modpack version: {}", reason);
            ExitCode::SUCCESS
        }
        SyncOutcome::UpToDate { archive_file_name } => {
            println!("Modpack is already up to date ({}).", archive_file_name);
            ExitCode::SUCCESS
        }
        SyncOutcome::Updated(summary) => report_summary(summary),
    }
}

fn report_summary(summary: &SyncSummary) -> ExitCode {
    println!();
    println!("Modpack {}:", summary.archive_file_name);
    println!("- {} stale mods removed", summary.deleted.len());
    for (name, reason) in &summary.delete_failures {
        println!("  ! could not remove {}: {}", name, reason);
    }
    println!("- {} files checked or downloaded", summary.downloads.len());
    for report in summary.failed_downloads() {
        println!("  ! {}", report);
    }
    println!("- {} overrides applied", summary.overrides.len());
    for report in summary.failed_overrides() {
        println!("  ! {}", report.path.display());
    }

    if summary.is_complete() {
        println!("Modpack updated successfully.");
        ExitCode::SUCCESS
    } else {
        println!("Modpack applied with errors; run again to retry.");
        ExitCode::FAILURE
    }
}

fn report_status(status: &SyncStatus) -> ExitCode {
    match &status.latest {
        Ok(latest) => println!(
            "Latest remote version: {} ({})",
            latest.version_number, latest.filename
        ),
        Err(reason) => println!("Latest remote version: unavailable ({})", reason),
    }

    match &status.latest_cached {
        Some(archive) => {
            let modified: DateTime<Local> = archive.modified.into();
            println!(
                "Newest cached archive: {} ({})",
                archive.file_name,
                modified.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => println!("Newest cached archive: none"),
    }

    println!(
        "Profile is {}",
        if status.up_to_date {
            "up to date"
        } else {
            "not up to date"
        }
    );
    ExitCode::SUCCESS
}
