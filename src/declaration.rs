//! Declared desired state: agents and their external-API actions.
//!
//! Declarations are the in-memory form of the `agents:` list the caller
//! extracts from the top-level configuration document. Fields are explicit
//! and optional where the document allows omission; shape rules live in
//! [`crate::validate`] so one pass can report every problem at once.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One agent as declared in configuration.
///
/// `id` is the stable reconciliation key. Exactly one instructions source
/// must be present, and at most one icon source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDeclaration {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inline instruction text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Path to an instruction file, resolved against the base directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_file: Option<String>,
    /// Inline icon image, base64-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Path to an icon image file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_file: Option<String>,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Opaque provider-specific parameters, passed through untouched.
    #[serde(default)]
    pub model_parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursion_limit: Option<u32>,
    #[serde(default)]
    pub tools: Vec<String>,
    /// Opaque per-tool resource configuration, passed through untouched.
    #[serde(default)]
    pub tool_resources: Map<String, Value>,
    #[serde(default)]
    pub actions: Vec<ActionDeclaration>,
}

/// One external-API action as declared under an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDeclaration {
    pub domain: String,
    /// Inline OpenAPI document text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// Path to an OpenAPI document, resolved against the base directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_file: Option<String>,
    #[serde(default)]
    pub auth: ActionAuth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy_url: Option<String>,
}

/// Authentication scheme for an action, discriminated by `type`.
///
/// Credential-bearing fields hold plaintext here; they are encrypted on the
/// way into the store and never persisted as declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionAuth {
    #[default]
    None,
    ServiceHttp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
    #[serde(rename = "oauth")]
    OAuth {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authorization_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        oauth_client_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        oauth_client_secret: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_exchange_method: Option<String>,
    },
}

impl AgentDeclaration {
    /// Minimal declaration used as a starting point in tests and tooling.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            instructions: None,
            instructions_file: None,
            icon: None,
            icon_file: None,
            provider: String::new(),
            model: String::new(),
            category: None,
            model_parameters: Map::new(),
            recursion_limit: None,
            tools: Vec::new(),
            tool_resources: Map::new(),
            actions: Vec::new(),
        }
    }
}
