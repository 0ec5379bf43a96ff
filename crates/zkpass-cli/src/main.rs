//! # zkpass CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules. Results go to
//! stdout; logs go to stderr.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zkpass_client::ZkPassConfig;

/// zkPass DVR protocol toolchain.
///
/// Digests and signs Data Verification Requests, requests proofs from a
/// zkPass proving service, and verifies the proofs it returns.
#[derive(Parser, Debug)]
#[command(name = "zkpass", version, about)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Digest and sign DVRs.
    Dvr(zkpass_cli::dvr::DvrArgs),
    /// Generate and verify proofs.
    Proof(zkpass_cli::proof::ProofArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let output = match &cli.command {
        Commands::Dvr(args) => zkpass_cli::dvr::run(args)?,
        Commands::Proof(args) => {
            zkpass_cli::proof::run(args, ZkPassConfig::from_env()?).await?
        }
    };
    println!("{output}");
    Ok(())
}

fn init_tracing(json: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
