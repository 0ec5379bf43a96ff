//! # Proof Subcommand
//!
//! `generate` plays the Holder against the configured proving service.
//! `verify` plays the Verifier: the DVR given on the command line is the
//! only one registered, so the proof must have been requested for it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use zkpass_client::{retry_transient, JwksKeyResolver, ZkPassConfig, ZkPassServiceClient};
use zkpass_core::ZkVm;
use zkpass_dvr::{UserDataTokens, DEFAULT_USER_DATA_TAG};
use zkpass_protocol::{
    DvrLookup, HolderSession, InMemoryDvrLookup, LookupMetadataValidator, ProofVerifier,
};
use zkpass_zkp::{MockZkVmBackend, ProofEngine, ZkVmRegistry};

use crate::dvr::read_dvr;

/// Arguments for the proof subcommand.
#[derive(Args, Debug)]
pub struct ProofArgs {
    #[command(subcommand)]
    pub command: ProofCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProofCommand {
    /// Request a proof from the proving service.
    Generate {
        /// File holding the Verifier-signed DVR token.
        #[arg(long)]
        dvr_token: PathBuf,
        /// User data token file, as `path` or `tag=path`. Repeatable.
        #[arg(long = "user-data", required = true)]
        user_data: Vec<String>,
    },
    /// Verify a proof token against the DVR it was requested for.
    ///
    /// Receipts are checked with the mock zkVM backends built into this
    /// binary. Only proofs from a mock proving service can be accepted;
    /// genuine r0 or sp1 receipts are rejected at the final check.
    Verify {
        /// File holding the proof token.
        proof: PathBuf,
        /// The DVR JSON as issued.
        #[arg(long)]
        dvr: PathBuf,
        /// Proof TTL in seconds; overrides ZKPASS_PROOF_TTL_SECS.
        #[arg(long)]
        ttl: Option<u64>,
    },
}

pub async fn run(args: &ProofArgs, config: ZkPassConfig) -> anyhow::Result<String> {
    match &args.command {
        ProofCommand::Generate {
            dvr_token,
            user_data,
        } => generate(config, dvr_token, user_data).await,
        ProofCommand::Verify { proof, dvr, ttl } => verify(config, proof, dvr, *ttl).await,
    }
}

async fn generate(
    config: ZkPassConfig,
    dvr_token: &Path,
    user_data: &[String],
) -> anyhow::Result<String> {
    let dvr_token = read_token(dvr_token)?;
    let tokens = read_user_data(user_data)?;
    let engine: Arc<dyn ProofEngine> = Arc::new(service_client(config)?);

    let proof = retry_transient(|| {
        let engine = engine.clone();
        let tokens = &tokens;
        let dvr_token = &dvr_token;
        async move {
            HolderSession::new(engine)
                .generate_proof(tokens, dvr_token)
                .await
        }
    })
    .await?;
    Ok(proof)
}

async fn verify(
    config: ZkPassConfig,
    proof: &Path,
    dvr: &Path,
    ttl: Option<u64>,
) -> anyhow::Result<String> {
    let proof_token = read_token(proof)?;
    let expected = read_dvr(dvr)?;
    let ttl = ttl.unwrap_or(config.proof_ttl_secs);
    let cache = Duration::from_secs(config.jwks_cache_secs);

    let client = service_client(config)?;
    let resolver = Arc::new(JwksKeyResolver::new(client.http().clone(), cache));
    let lookup = Arc::new(InMemoryDvrLookup::new());
    lookup.put(expected).await?;
    let validator = LookupMetadataValidator::new(lookup, ttl);

    let accepted = ProofVerifier::new(Arc::new(client), resolver)
        .verify(&proof_token, &validator)
        .await?;
    Ok(serde_json::to_string_pretty(&accepted.output)?)
}

/// Receipt verifiers compiled into this binary. Mock only.
fn backends() -> ZkVmRegistry {
    ZkVm::ALL
        .iter()
        .fold(ZkVmRegistry::new(), |registry, zkvm| {
            registry.with_backend(Arc::new(MockZkVmBackend::new(*zkvm)))
        })
}

fn service_client(config: ZkPassConfig) -> anyhow::Result<ZkPassServiceClient> {
    let url = config.service_url.clone();
    ZkPassServiceClient::new(config, backends())
        .with_context(|| format!("configuring proving service {url}"))
}

fn read_token(path: &Path) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading token {}", path.display()))?;
    let token = raw.trim();
    if token.is_empty() {
        bail!("token file {} is empty", path.display());
    }
    Ok(token.to_string())
}

/// Split a `--user-data` argument into its tag and path.
pub fn parse_user_data_arg(arg: &str) -> (String, PathBuf) {
    match arg.split_once('=') {
        Some((tag, path)) if !tag.is_empty() => (tag.to_string(), PathBuf::from(path)),
        _ => (DEFAULT_USER_DATA_TAG.to_string(), PathBuf::from(arg)),
    }
}

/// Load every `--user-data` argument into one token map.
pub fn read_user_data(args: &[String]) -> anyhow::Result<UserDataTokens> {
    let mut tokens = UserDataTokens::new();
    for arg in args {
        let (tag, path) = parse_user_data_arg(arg);
        if tokens.get(&tag).is_some() {
            bail!("user data tag {tag:?} given more than once");
        }
        tokens.insert(tag, read_token(&path)?);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use zkpass_core::ZkPassError;
    use zkpass_zkp::ZkVmBackend;

    fn file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn user_data_arg_tags() {
        assert_eq!(
            parse_user_data_arg("bank=/tmp/bank.jws"),
            ("bank".to_string(), PathBuf::from("/tmp/bank.jws"))
        );
        assert_eq!(
            parse_user_data_arg("/tmp/user.jws"),
            (String::new(), PathBuf::from("/tmp/user.jws"))
        );
        assert_eq!(
            parse_user_data_arg("=/tmp/odd.jws"),
            (String::new(), PathBuf::from("=/tmp/odd.jws"))
        );
    }

    #[test]
    fn user_data_files_are_trimmed_and_tagged() {
        let bank = file("bank-token\n");
        let health = file("  health-token ");
        let args = vec![
            format!("bank={}", bank.path().display()),
            format!("health={}", health.path().display()),
        ];
        let tokens = read_user_data(&args).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.get("bank"), Some("bank-token"));
        assert_eq!(tokens.get("health"), Some("health-token"));
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let a = file("a");
        let b = file("b");
        let args = vec![
            a.path().display().to_string(),
            b.path().display().to_string(),
        ];
        assert!(read_user_data(&args).is_err());
    }

    #[test]
    fn empty_token_file_is_rejected() {
        let empty = file("\n");
        assert!(read_token(empty.path()).is_err());
    }

    #[test]
    fn every_zkvm_has_a_backend() {
        let registry = backends();
        for zkvm in ZkVm::ALL {
            assert!(registry.contains(zkvm));
        }
    }

    #[test]
    fn verify_help_names_the_mock_backends() {
        use clap::Args as _;
        let proof = ProofArgs::augment_args(clap::Command::new("proof"));
        let verify = proof.find_subcommand("verify").unwrap();
        let help = verify.get_long_about().unwrap().to_string();
        assert!(help.contains("mock zkVM backends"));
    }

    #[tokio::test]
    async fn generate_without_api_key_fails_before_network() {
        let dvr_token = file("dvr-token");
        let user = file("user-token");
        let args = ProofArgs {
            command: ProofCommand::Generate {
                dvr_token: dvr_token.path().into(),
                user_data: vec![user.path().display().to_string()],
            },
        };
        // Port 1 is never listening; MissingApiKey must come first.
        let err = run(&args, ZkPassConfig::local(1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ZkPassError>(),
            Some(ZkPassError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn verify_rejects_garbage_proof_before_network() {
        let (_, pk) = zkpass_crypto::generate_key_pair().unwrap();
        let dvr = zkpass_dvr::DataVerificationRequest::builder("Age Check")
            .versions(MockZkVmBackend::new(ZkVm::R0).version_info())
            .query("[]")
            .user_data_verifying_key(pk.clone())
            .dvr_verifying_key(pk)
            .build()
            .unwrap();
        let dvr_file = file(&dvr.serialize().unwrap());
        let proof = file("not-a-proof");
        let args = ProofArgs {
            command: ProofCommand::Verify {
                proof: proof.path().into(),
                dvr: dvr_file.path().into(),
                ttl: None,
            },
        };
        let err = run(&args, ZkPassConfig::local(1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ZkPassError>(),
            Some(ZkPassError::InvalidProof(_))
        ));
    }
}
