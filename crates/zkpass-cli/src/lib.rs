//! # zkpass-cli: DVR Protocol Command-Line Interface
//!
//! ## Subcommands
//!
//! - `dvr digest` / `dvr sign`: Verifier-side DVR preparation
//! - `proof generate`: Holder-side proof request against the proving service
//! - `proof verify`: Verifier-side proof verification
//!
//! ## Crate Policy
//!
//! - Argument parsing lives next to each handler; handlers return the text
//!   to print and delegate to the protocol crates.
//! - Service settings come from `ZKPASS_*` environment variables.

pub mod dvr;
pub mod proof;
