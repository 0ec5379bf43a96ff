//! # Canonical Serialization: JCS-Compatible Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used in DVR digest computation.
//!
//! ## Security Invariant
//!
//! A proof binds itself to a DVR by embedding the DVR's digest. The Verifier
//! recomputes that digest from its own copy of the DVR, so the byte sequence
//! fed to SHA-256 must not depend on how the DVR was built (parsed from a
//! wire payload, assembled with the builder, or round-tripped through a
//! token). `CanonicalBytes` guarantees this:
//!
//! 1. **Reject floats**: DVR fields are strings; a float anywhere in the
//!    tree means a caller passed something that is not a DVR field value.
//! 2. **Drop nulls inside objects**: an absent optional field and an
//!    explicit `null` describe the same DVR and must digest identically.
//! 3. **Sort keys**: serialization uses `serde_jcs` (RFC 8785): sorted keys,
//!    compact separators, deterministic number formatting.
//!
//! The inner text is private, so nothing downstream can hand a
//! non-canonical byte string to [`crate::sha256_digest`].

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// JCS text of a DVR-shaped value; the only input [`crate::sha256_digest`]
/// accepts.
///
/// # Invariants
///
/// - Built only through [`CanonicalBytes::new()`] or
///   [`CanonicalBytes::from_value()`].
/// - No floats anywhere, no `null` object members.
/// - Sorted keys and compact separators (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` for a float anywhere in the tree,
    /// `SerializationFailed` if the value has no JSON form.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        Self::from_value(serde_json::to_value(obj)?)
    }

    pub fn from_value(mut value: Value) -> Result<Self, CanonicalizationError> {
        prune(&mut value)?;
        Ok(Self(serde_jcs::to_string(&value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Canonical text of a JSON value.
///
/// Used for values that travel as opaque strings inside a DVR (the query
/// expression), so that two semantically equal query objects produce the
/// same string regardless of key order.
pub fn canonical_json_string(value: &Value) -> Result<String, CanonicalizationError> {
    Ok(CanonicalBytes::from_value(value.clone())?.0)
}

/// Drop `null` members and fail on floats, in place.
fn prune(value: &mut Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Number(n) if n.is_f64() => {
            Err(CanonicalizationError::FloatRejected(n.as_f64().unwrap_or(f64::NAN)))
        }
        Value::Object(members) => {
            members.retain(|_, v| !v.is_null());
            members.values_mut().try_for_each(prune)
        }
        Value::Array(items) => items.iter_mut().try_for_each(prune),
        _ => Ok(()),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn float_free_json() -> impl Strategy<Value = Value> {
        let scalar = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,30}".prop_map(Value::String),
        ];
        scalar.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_]{1,10}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn canonicalization_is_deterministic(value in float_free_json()) {
            prop_assert_eq!(
                CanonicalBytes::new(&value).unwrap(),
                CanonicalBytes::new(&value).unwrap()
            );
        }

        #[test]
        fn canonical_output_is_a_fixed_point(value in float_free_json()) {
            let once = CanonicalBytes::new(&value).unwrap();
            let reparsed: Value = serde_json::from_slice(once.as_bytes()).unwrap();
            let twice = CanonicalBytes::from_value(reparsed).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn reversed_insertion_order_digests_identically(
            keys in prop::collection::btree_set("[a-z]{1,8}", 1..8)
        ) {
            let forward: serde_json::Map<String, Value> = keys
                .iter()
                .map(|k| (k.clone(), Value::String(k.to_uppercase())))
                .collect();
            let backward: serde_json::Map<String, Value> = keys
                .iter()
                .rev()
                .map(|k| (k.clone(), Value::String(k.to_uppercase())))
                .collect();
            prop_assert_eq!(
                CanonicalBytes::from_value(Value::Object(forward)).unwrap(),
                CanonicalBytes::from_value(Value::Object(backward)).unwrap()
            );
        }
    }
}
