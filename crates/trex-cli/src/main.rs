//! # trex CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trex_cli::keys::{run_keygen, run_recover, run_sign_claim, KeygenArgs, RecoverArgs, SignClaimArgs};
use trex_cli::scenario::{run_verify, VerifyArgs};

/// T-REX core CLI.
///
/// Claim-signing keys, claim signatures, signer recovery, and offline
/// investor verification.
#[derive(Parser, Debug)]
#[command(name = "trex", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a claim-signing key.
    Keygen(KeygenArgs),

    /// Sign a claim about a subject identity.
    SignClaim(SignClaimArgs),

    /// Recover the signer address of a claim signature.
    Recover(RecoverArgs),

    /// Evaluate investor verification for a YAML scenario.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::SignClaim(args) => run_sign_claim(&args),
        Commands::Recover(args) => run_recover(&args),
        Commands::Verify(args) => run_verify(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
