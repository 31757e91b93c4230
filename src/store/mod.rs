//! Persisted records and the store ports they live behind.
//!
//! Records are the actual-state side of reconciliation. Every mutation the
//! engine performs is an idempotent upsert keyed by a stable identifier, so
//! a partially-completed pass converges on re-run without manual cleanup.

pub mod memory;
pub mod sled;

use crate::avatar::StoredAvatar;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub use self::memory::MemoryStore;
pub use self::sled::SledStore;

/// Record owner. Engine-managed records all carry the reserved system
/// sentinel; end users may read them but never mutate them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner(String);

impl Owner {
    const SYSTEM: &'static str = "system";

    /// The reserved sentinel marking engine-managed records.
    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured identity of an action: which domain, for which agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    pub domain: String,
    pub agent_id: String,
}

impl ActionKey {
    pub fn new(domain: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            agent_id: agent_id.into(),
        }
    }
}

/// Deterministic action record identifier derived from an [`ActionKey`].
///
/// The same domain/agent pair always derives the same id, which is what
/// makes the action upsert idempotent across passes and restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(String);

impl ActionId {
    pub fn derive(key: &ActionKey) -> Self {
        Self(crate::hash::digest(&json!({
            "domain": key.domain,
            "agent_id": key.agent_id,
        })))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry in an agent's version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentVersion {
    pub config_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AgentVersion {
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            config_hash: config_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// Persisted agent state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub owner: Owner,
    pub name: String,
    pub description: Option<String>,
    /// Resolved instruction text, never a file reference.
    pub instructions: String,
    pub avatar: Option<StoredAvatar>,
    pub provider: String,
    pub model: String,
    pub category: Option<String>,
    pub model_parameters: Map<String, Value>,
    pub recursion_limit: Option<u32>,
    pub tools: Vec<String>,
    pub tool_resources: Map<String, Value>,
    /// Identifiers of this agent's reconciled actions.
    pub action_ids: Vec<ActionId>,
    /// Append-only; the last entry's hash is the change-detection target.
    pub versions: Vec<AgentVersion>,
}

impl AgentRecord {
    pub fn latest_hash(&self) -> Option<&str> {
        self.versions.last().map(|v| v.config_hash.as_str())
    }
}

/// Persisted action auth metadata. Credential fields hold ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoredAuth {
    None,
    ServiceHttp {
        api_key: Option<String>,
    },
    #[serde(rename = "oauth")]
    OAuth {
        client_url: Option<String>,
        authorization_url: Option<String>,
        scope: Option<String>,
        oauth_client_id: Option<String>,
        oauth_client_secret: Option<String>,
        token_exchange_method: Option<String>,
    },
}

/// Persisted action state, scoped to its owning agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub agent_id: String,
    pub owner: Owner,
    pub domain: String,
    /// The spec document exactly as resolved, for later request execution.
    pub raw_spec: String,
    pub privacy_policy_url: Option<String>,
    pub auth: StoredAuth,
    /// Fingerprint of the plaintext metadata this record was built from.
    pub config_hash: String,
}

/// Agent persistence port.
pub trait AgentStore: Send + Sync {
    fn get_agent(&self, id: &str, owner: &Owner) -> Result<Option<AgentRecord>, StoreError>;
    fn create_agent(&self, record: &AgentRecord) -> Result<AgentRecord, StoreError>;
    fn update_agent(&self, record: &AgentRecord) -> Result<AgentRecord, StoreError>;
    fn delete_agent(&self, id: &str, owner: &Owner) -> Result<(), StoreError>;
    fn list_agents_by_owner(&self, owner: &Owner) -> Result<Vec<AgentRecord>, StoreError>;
}

/// Action persistence port.
pub trait ActionStore: Send + Sync {
    fn get_action(&self, id: &ActionId) -> Result<Option<ActionRecord>, StoreError>;
    fn create_action(&self, record: &ActionRecord) -> Result<ActionRecord, StoreError>;
    fn update_action(&self, record: &ActionRecord) -> Result<ActionRecord, StoreError>;
    fn delete_action(&self, id: &ActionId) -> Result<(), StoreError>;
    fn list_actions_for_agent(
        &self,
        agent_id: &str,
        owner: &Owner,
    ) -> Result<Vec<ActionRecord>, StoreError>;
}
