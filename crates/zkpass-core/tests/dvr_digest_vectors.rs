//! # DVR Digest Test Vectors
//!
//! Fixed inputs with digests computed independently (`printf ... | sha256sum`
//! over the RFC 8785 form). If these fail, a Verifier built from this crate
//! and a proving service will disagree on which DVR a proof answers.

use zkpass_core::{sha256_hex, CanonicalBytes};

const AGE_CHECK_DIGEST: &str = "5f43719598a0a8ea172eab3a6eff5cf778bc93c11cc027e54ab833b7e733a64b";

fn age_check_dvr_shuffled() -> serde_json::Value {
    serde_json::json!({
        "zkvm": "r0",
        "user_data_verifying_key": {"PublicKey": {"y": "BBB", "x": "AAA"}},
        "query_method_ver": "abc",
        "query_engine_ver": "1.0.0",
        "query": r#"[{"assign":{"ok":{">=":[{"dvar":"age"},18]}}},{"output":{"result":{"lvar":"ok"}}}]"#,
        "dvr_verifying_key": {"KeysetEndpoint": {"kid": "k-1", "jku": "https://verifier.example/jwks.json"}},
        "dvr_title": "Age Check",
        "dvr_id": "3f1c"
    })
}

#[test]
fn age_check_vector() {
    let cb = CanonicalBytes::new(&age_check_dvr_shuffled()).unwrap();
    assert_eq!(sha256_hex(&cb), AGE_CHECK_DIGEST);
}

#[test]
fn explicit_null_user_data_url_matches_absent() {
    let mut with_null = age_check_dvr_shuffled();
    with_null["user_data_url"] = serde_json::Value::Null;
    let cb = CanonicalBytes::new(&with_null).unwrap();
    assert_eq!(sha256_hex(&cb), AGE_CHECK_DIGEST);
}

#[test]
fn single_character_change_changes_digest() {
    let mut altered = age_check_dvr_shuffled();
    altered["dvr_title"] = serde_json::json!("Age check");
    let cb = CanonicalBytes::new(&altered).unwrap();
    assert_ne!(sha256_hex(&cb), AGE_CHECK_DIGEST);
}
