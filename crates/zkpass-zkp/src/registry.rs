//! # zkVM Backend Registry
//!
//! Maps each registered [`ZkVm`] to its receipt verifier. Engines look the
//! backend up by the zkVM they are configured for; a zkVM without a
//! registered backend is an `InvalidZkVmName` error.
//!
//! [`verify_proof_token`] is the cryptographic check every engine shares:
//! the service signature first, then the receipt.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use zkpass_core::{PublicKey, ZkPassError, ZkVm};
use zkpass_crypto::verify_jws_token;

use crate::proof::ZkPassProof;
use crate::traits::{VerifiedProof, ZkVmBackend};

/// Registered zkVM backends.
#[derive(Clone, Default)]
pub struct ZkVmRegistry {
    backends: HashMap<ZkVm, Arc<dyn ZkVmBackend>>,
}

impl ZkVmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under the zkVM it reports. Replaces any previous
    /// registration for that zkVM.
    pub fn register(&mut self, backend: Arc<dyn ZkVmBackend>) {
        self.backends.insert(backend.zkvm(), backend);
    }

    pub fn with_backend(mut self, backend: Arc<dyn ZkVmBackend>) -> Self {
        self.register(backend);
        self
    }

    pub fn get(&self, zkvm: ZkVm) -> Result<Arc<dyn ZkVmBackend>, ZkPassError> {
        self.backends
            .get(&zkvm)
            .cloned()
            .ok_or_else(|| ZkPassError::InvalidZkVmName(zkvm.to_string()))
    }

    /// Look a backend up by registry name (`"r0"`, `"sp1"`).
    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn ZkVmBackend>, ZkPassError> {
        self.get(name.parse()?)
    }

    pub fn contains(&self, zkvm: ZkVm) -> bool {
        self.backends.contains_key(&zkvm)
    }

    /// Registered zkVMs, in registry order.
    pub fn zkvms(&self) -> Vec<ZkVm> {
        ZkVm::ALL
            .iter()
            .copied()
            .filter(|z| self.contains(*z))
            .collect()
    }
}

impl std::fmt::Debug for ZkVmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZkVmRegistry")
            .field("zkvms", &self.zkvms())
            .finish()
    }
}

/// Verify a proof token's service signature, then its receipt.
///
/// # Errors
///
/// - `Jose` or `KeyFormat` if the service signature does not verify.
/// - `InvalidProof` if the payload is not a proof or the receipt fails.
pub fn verify_proof_token(
    proof_token: &str,
    service_signing_key: &PublicKey,
    backend: &dyn ZkVmBackend,
) -> Result<VerifiedProof, ZkPassError> {
    let verified = verify_jws_token(service_signing_key, proof_token)?;
    let proof = ZkPassProof::from_value(verified.data)?;
    let output = backend.verify_zkproof(&proof.zkproof)?;
    debug!(
        dvr_id = %proof.dvr_id,
        zkvm = %backend.zkvm(),
        "proof token verified"
    );
    Ok(VerifiedProof { output, proof })
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::mock::MockZkVmBackend;
    use crate::proof::tests::sample_proof;
    use serde_json::json;
    use zkpass_crypto::{generate_key_pair, sign_data_to_jws_token};

    fn registry() -> ZkVmRegistry {
        ZkVmRegistry::new().with_backend(Arc::new(MockZkVmBackend::new(ZkVm::R0)))
    }

    #[test]
    fn unregistered_zkvm_is_invalid_name() {
        match registry().get(ZkVm::Sp1) {
            Err(ZkPassError::InvalidZkVmName(name)) => assert_eq!(name, "sp1"),
            other => panic!("expected InvalidZkVmName, got {:?}", other.map(|b| b.zkvm())),
        }
    }

    #[test]
    fn unknown_name_is_invalid_name() {
        assert!(matches!(
            registry().get_by_name("risc1"),
            Err(ZkPassError::InvalidZkVmName(_))
        ));
        assert_eq!(registry().get_by_name("r0").unwrap().zkvm(), ZkVm::R0);
    }

    #[test]
    fn registration_replaces_same_zkvm() {
        let mut reg = ZkVmRegistry::new();
        reg.register(Arc::new(MockZkVmBackend::new(ZkVm::Sp1)));
        reg.register(Arc::new(MockZkVmBackend::new(ZkVm::Sp1)));
        reg.register(Arc::new(MockZkVmBackend::new(ZkVm::R0)));
        assert_eq!(reg.zkvms(), vec![ZkVm::R0, ZkVm::Sp1]);
    }

    #[test]
    fn verifies_signature_then_receipt() {
        let backend = MockZkVmBackend::new(ZkVm::R0);
        let (sk, pk) = generate_key_pair().unwrap();
        let mut proof = sample_proof();
        proof.zkproof = backend.prove(&json!({"result": true})).unwrap();
        let token = sign_data_to_jws_token(&sk, serde_json::to_value(&proof).unwrap(), None).unwrap();

        let verified = verify_proof_token(&token, &pk, &backend).unwrap();
        assert_eq!(verified.output, json!({"result": true}));
        assert_eq!(verified.proof, proof);
    }

    #[test]
    fn wrong_service_key_fails_before_receipt() {
        let backend = MockZkVmBackend::new(ZkVm::R0);
        let (sk, _) = generate_key_pair().unwrap();
        let (_, other) = generate_key_pair().unwrap();
        let token =
            sign_data_to_jws_token(&sk, serde_json::to_value(sample_proof()).unwrap(), None).unwrap();
        assert!(matches!(
            verify_proof_token(&token, &other, &backend),
            Err(ZkPassError::Jose(_))
        ));
    }

    #[test]
    fn bad_receipt_is_invalid_proof() {
        let backend = MockZkVmBackend::new(ZkVm::R0);
        let (sk, pk) = generate_key_pair().unwrap();
        let token =
            sign_data_to_jws_token(&sk, serde_json::to_value(sample_proof()).unwrap(), None).unwrap();
        assert!(matches!(
            verify_proof_token(&token, &pk, &backend),
            Err(ZkPassError::InvalidProof(_))
        ));
    }
}
