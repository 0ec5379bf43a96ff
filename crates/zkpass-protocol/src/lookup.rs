//! # DVR Lookup
//!
//! The Verifier registers every DVR it issues and consumes it when the
//! matching proof arrives. The lookup is the only shared mutable state in
//! the protocol, and it must hand each DVR out at most once: a proof can be
//! verified against a DVR one time, and a second proof (or a replay of the
//! first) for the same id fails with `DvrNotFound`.
//!
//! [`DvrLookup`] is the collaborator trait, so deployments can back it with
//! a database or distributed store. [`InMemoryDvrLookup`] is the in-process
//! implementation; removal happens under one lock acquisition, so two
//! concurrent takes of the same id cannot both succeed. DVRs that never
//! receive a proof are dropped by [`InMemoryDvrLookup::prune_older_than`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use zkpass_core::{DvrId, ZkPassError};
use zkpass_dvr::DataVerificationRequest;

/// Storage for issued DVRs, keyed by `dvr_id`.
#[async_trait]
pub trait DvrLookup: Send + Sync {
    /// Register a DVR under its own `dvr_id`.
    ///
    /// # Errors
    ///
    /// `MalformedDvr` if the id is already registered.
    async fn put(&self, dvr: DataVerificationRequest) -> Result<(), ZkPassError>;

    /// Remove and return the DVR for `id`, if still registered.
    async fn take_if_present(
        &self,
        id: &DvrId,
    ) -> Result<Option<DataVerificationRequest>, ZkPassError>;
}

#[derive(Debug)]
struct Registered {
    dvr: DataVerificationRequest,
    registered_at: Instant,
}

/// Process-local lookup table.
#[derive(Debug, Default)]
pub struct InMemoryDvrLookup {
    entries: Mutex<HashMap<DvrId, Registered>>,
}

impl InMemoryDvrLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, id: &DvrId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Drop DVRs registered more than `max_age` ago. Returns how many were
    /// dropped.
    pub fn prune_older_than(&self, max_age: Duration) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.registered_at.elapsed() <= max_age);
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!(pruned, "pruned unanswered DVRs");
        }
        pruned
    }
}

#[async_trait]
impl DvrLookup for InMemoryDvrLookup {
    async fn put(&self, dvr: DataVerificationRequest) -> Result<(), ZkPassError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&dvr.dvr_id) {
            return Err(ZkPassError::MalformedDvr(format!(
                "DVR id {} is already registered",
                dvr.dvr_id
            )));
        }
        debug!(dvr_id = %dvr.dvr_id, "DVR registered");
        entries.insert(
            dvr.dvr_id.clone(),
            Registered {
                dvr,
                registered_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn take_if_present(
        &self,
        id: &DvrId,
    ) -> Result<Option<DataVerificationRequest>, ZkPassError> {
        let taken = self.entries.lock().remove(id).map(|entry| entry.dvr);
        debug!(dvr_id = %id, found = taken.is_some(), "DVR lookup consumed");
        Ok(taken)
    }
}
