//! # DVR Subcommand
//!
//! Digest and sign Data Verification Requests read from JSON files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use zkpass_core::KeysetEndpoint;
use zkpass_crypto::PrivateKeyPem;
use zkpass_dvr::DataVerificationRequest;

/// Arguments for the dvr subcommand.
#[derive(Args, Debug)]
pub struct DvrArgs {
    #[command(subcommand)]
    pub command: DvrCommand,
}

#[derive(Subcommand, Debug)]
pub enum DvrCommand {
    /// Print the SHA-256 digest of a DVR's canonical form.
    Digest {
        /// DVR JSON file.
        dvr: PathBuf,
    },
    /// Sign a DVR into a compact JWS token.
    Sign {
        /// DVR JSON file.
        dvr: PathBuf,
        /// PEM private key of the Verifier.
        #[arg(long)]
        key: PathBuf,
        /// Keyset URL to advertise in the token header.
        #[arg(long, requires = "kid")]
        jku: Option<String>,
        /// Key id within the keyset.
        #[arg(long, requires = "jku")]
        kid: Option<String>,
    },
}

pub fn run(args: &DvrArgs) -> anyhow::Result<String> {
    match &args.command {
        DvrCommand::Digest { dvr } => Ok(read_dvr(dvr)?.digest()?.to_string()),
        DvrCommand::Sign { dvr, key, jku, kid } => {
            let dvr = read_dvr(dvr)?;
            let key = read_private_key(key)?;
            let hint = match (jku, kid) {
                (Some(jku), Some(kid)) => Some(KeysetEndpoint::new(jku.as_str(), kid.as_str())),
                _ => None,
            };
            let token = dvr.sign_to_jws_token(&key, hint.as_ref())?;
            tracing::info!(dvr_id = %dvr.dvr_id, "DVR signed");
            Ok(token)
        }
    }
}

/// Read and validate a DVR JSON file.
pub fn read_dvr(path: &Path) -> anyhow::Result<DataVerificationRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading DVR {}", path.display()))?;
    DataVerificationRequest::from_json(&raw)
        .with_context(|| format!("parsing DVR {}", path.display()))
}

fn read_private_key(path: &Path) -> anyhow::Result<PrivateKeyPem> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("reading key {}", path.display()))?;
    PrivateKeyPem::new(pem).with_context(|| format!("loading key {}", path.display()))
}
