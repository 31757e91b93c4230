//! Deterministic content fingerprints for change detection.
//!
//! Reconciliation never diffs records field by field. Each declaration is
//! reduced to a canonical JSON string (mapping keys recursively sorted,
//! array order preserved), hashed with BLAKE3, and compared byte-for-byte
//! against the hash stored on the latest persisted version. Identical
//! semantic input must always produce identical output regardless of the
//! key order the configuration document used.

use crate::avatar::StoredAvatar;
use crate::declaration::{ActionAuth, ActionDeclaration, AgentDeclaration};
use serde_json::{json, Map, Value};

/// Rebuild a JSON value with every object's keys in sorted order.
///
/// Arrays keep their order; scalars pass through untouched.
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, nested) in entries {
                sorted.insert(key.clone(), sort_keys(nested));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Canonical string form of a JSON value.
pub fn canonical_string(value: &Value) -> String {
    sort_keys(value).to_string()
}

/// Hex BLAKE3 digest of the canonical form of `value`.
pub fn digest(value: &Value) -> String {
    hex::encode(blake3::hash(canonical_string(value).as_bytes()).as_bytes())
}

/// Fingerprint of an agent's identity-relevant content.
///
/// Covers the declaration fields plus the resolved instructions text and
/// avatar path. Actions are excluded: they are fingerprinted independently
/// (see [`action_fingerprint`]) so an action-only edit never bumps the
/// agent's own version history.
pub fn agent_fingerprint(
    decl: &AgentDeclaration,
    instructions: &str,
    avatar: Option<&StoredAvatar>,
) -> String {
    digest(&json!({
        "id": decl.id,
        "name": decl.name,
        "description": decl.description,
        "instructions": instructions,
        "provider": decl.provider,
        "model": decl.model,
        "category": decl.category,
        "model_parameters": decl.model_parameters,
        "recursion_limit": decl.recursion_limit,
        "tools": decl.tools,
        "tool_resources": decl.tool_resources,
        "avatar_path": avatar.map(|a| a.path.as_str()),
    }))
}

/// Fingerprint of an action's plaintext metadata.
///
/// Computed before credential fields are encrypted: ciphertexts are
/// randomized per write, so the stored ciphertext can never serve as a
/// change signal. The stored record carries this hash instead.
pub fn action_fingerprint(decl: &ActionDeclaration, raw_spec: &str) -> String {
    let auth = match &decl.auth {
        ActionAuth::None => json!({ "type": "none" }),
        ActionAuth::ServiceHttp { api_key } => json!({
            "type": "service_http",
            "api_key": api_key,
        }),
        ActionAuth::OAuth {
            client_url,
            authorization_url,
            scope,
            oauth_client_id,
            oauth_client_secret,
            token_exchange_method,
        } => json!({
            "type": "oauth",
            "client_url": client_url,
            "authorization_url": authorization_url,
            "scope": scope,
            "oauth_client_id": oauth_client_id,
            "oauth_client_secret": oauth_client_secret,
            "token_exchange_method": token_exchange_method,
        }),
    };

    digest(&json!({
        "domain": decl.domain,
        "raw_spec": raw_spec,
        "auth": auth,
        "privacy_policy_url": decl.privacy_policy_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sorts_nested_object_keys() {
        let value = json!({
            "b": { "z": 1, "a": 2 },
            "a": [ { "y": true, "x": false } ],
        });
        assert_eq!(
            canonical_string(&value),
            r#"{"a":[{"x":false,"y":true}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn preserves_array_order() {
        let value = json!({ "items": ["c", "a", "b"] });
        assert_eq!(canonical_string(&value), r#"{"items":["c","a","b"]}"#);
    }

    #[test]
    fn digest_is_stable_for_equal_values() {
        let a = json!({ "model": "gpt-4o", "tools": ["search", "code"] });
        let b = json!({ "tools": ["search", "code"], "model": "gpt-4o" });
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn digest_differs_on_content_change() {
        let a = json!({ "instructions": "Be kind." });
        let b = json!({ "instructions": "Be curt." });
        assert_ne!(digest(&a), digest(&b));
    }

    proptest! {
        /// Insertion order of object keys never affects the digest.
        #[test]
        fn digest_ignores_key_order(entries in proptest::collection::hash_map("[a-z]{1,8}", any::<i64>(), 1..16)) {
            let entries: Vec<(String, i64)> = entries.into_iter().collect();
            let forward: Map<String, Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            let reverse: Map<String, Value> = entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            prop_assert_eq!(digest(&Value::Object(forward)), digest(&Value::Object(reverse)));
        }
    }
}
