//! spmirror CLI - mirror SharePoint document libraries locally
//!
//! Provides commands for:
//! - Running full, incremental, and dry syncs
//! - Viewing mirror status and run history
//! - Listing and exporting mirrored document metadata
//! - Verifying blob storage integrity
//! - Resetting delta cursors and probing connectivity
//!
//! Exit codes: 0 success, 1 configuration error, 2 connection/auth error,
//! 3 sync failed, 4 another sync in progress.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::export::ExportCommand;
use commands::list::ListCommand;
use commands::reset_cursors::ResetCursorsCommand;
use commands::status::StatusCommand;
use commands::sync::SyncCommand;
use commands::test_connection::TestConnectionCommand;
use commands::verify::VerifyCommand;
use output::OutputFormat;
use spmirror_core::SyncError;

#[derive(Debug, Parser)]
#[command(
    name = "spmirror",
    version,
    about = "Mirror SharePoint document libraries into a content-addressed local store"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize the mirror against the configured site
    Sync(SyncCommand),
    /// Show mirror status and run history
    Status(StatusCommand),
    /// List mirrored documents
    List(ListCommand),
    /// Export document metadata as JSON or JSONL
    Export(ExportCommand),
    /// Re-hash stored blobs against the catalog
    Verify(VerifyCommand),
    /// Drop stored delta cursors; the next run re-enumerates fully
    ResetCursors(ResetCursorsCommand),
    /// Check credentials and site reachability
    TestConnection(TestConnectionCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Sync(cmd) => cmd.execute(config, format).await,
        Commands::Status(cmd) => cmd.execute(config, format).await,
        Commands::List(cmd) => cmd.execute(config, format).await,
        Commands::Export(cmd) => cmd.execute(config).await,
        Commands::Verify(cmd) => cmd.execute(config, format).await,
        Commands::ResetCursors(cmd) => cmd.execute(config, format).await,
        Commands::TestConnection(cmd) => cmd.execute(config, format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Maps error kinds to the documented exit codes.
fn exit_code_for(err: &SyncError) -> u8 {
    match err {
        SyncError::Config(_) => 1,
        SyncError::Auth(_) | SyncError::TransientNetwork { .. } => 2,
        SyncError::AlreadyRunning => 4,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_match_documentation() {
        assert_eq!(exit_code_for(&SyncError::Config("x".into())), 1);
        assert_eq!(exit_code_for(&SyncError::Auth("x".into())), 2);
        assert_eq!(
            exit_code_for(&SyncError::TransientNetwork {
                attempts: 5,
                message: "x".into()
            }),
            2
        );
        assert_eq!(exit_code_for(&SyncError::AlreadyRunning), 4);
        assert_eq!(exit_code_for(&SyncError::Cancelled), 3);
        assert_eq!(exit_code_for(&SyncError::Storage("disk".into())), 3);
    }

    #[test]
    fn test_cli_parses_sync_flags() {
        let cli = Cli::try_parse_from([
            "spmirror",
            "sync",
            "--full",
            "--dry-run",
            "--library",
            "Documents",
        ])
        .unwrap();
        match cli.command {
            Commands::Sync(cmd) => {
                assert!(cmd.full);
                assert!(cmd.dry_run);
                assert_eq!(cmd.library.as_deref(), Some("Documents"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["spmirror", "--json", "-vv", "status"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
