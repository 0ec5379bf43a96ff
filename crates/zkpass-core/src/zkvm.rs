//! # zkVM Registry
//!
//! The proving service runs queries inside one of a fixed set of zkVMs. A
//! DVR names the zkVM it targets (`zkvm` field) and carries the query
//! engine and query method versions of that backend, so the service can
//! refuse a DVR built for a different engine build.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ZkPassError;

/// A registered zkVM backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZkVm {
    /// RISC Zero.
    R0,
    /// Succinct SP1.
    Sp1,
}

impl ZkVm {
    /// All registered backends.
    pub const ALL: [ZkVm; 2] = [ZkVm::R0, ZkVm::Sp1];

    /// The wire name of this backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::R0 => "r0",
            Self::Sp1 => "sp1",
        }
    }
}

impl Default for ZkVm {
    fn default() -> Self {
        Self::R0
    }
}

impl std::fmt::Display for ZkVm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZkVm {
    type Err = ZkPassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r0" => Ok(Self::R0),
            "sp1" => Ok(Self::Sp1),
            other => Err(ZkPassError::InvalidZkVmName(other.to_string())),
        }
    }
}

/// The engine and method versions a zkVM backend reports.
///
/// `query_method_ver` identifies the guest program image; two backends built
/// from different guest code report different method versions even when
/// their engine versions agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEngineVersionInfo {
    pub query_engine_ver: String,
    pub query_method_ver: String,
}
