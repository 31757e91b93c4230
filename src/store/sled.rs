//! Sled-backed store adapter.
//!
//! Agents and actions live in separate trees. Values are serialized as JSON
//! rather than a binary codec: the records carry open-ended
//! `serde_json::Value` fields, which need a self-describing format to round
//! trip. Agent keys encode `(owner, id)` as a JSON array so composite keys
//! stay structured and order-stable.

use super::{ActionId, ActionRecord, ActionStore, AgentRecord, AgentStore, Owner};
use crate::error::StoreError;
use std::path::Path;

pub struct SledStore {
    agents: sled::Tree,
    actions: sled::Tree,
}

impl SledStore {
    /// Open (or create) a store rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(backend)?;
        Ok(Self {
            agents: db.open_tree("agents").map_err(backend)?,
            actions: db.open_tree("actions").map_err(backend)?,
        })
    }

    /// Flush dirty buffers to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.agents.flush().map_err(backend)?;
        self.actions.flush().map_err(backend)?;
        Ok(())
    }

    fn agent_key(id: &str, owner: &Owner) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(&(owner.as_str(), id)).map_err(serialization)
    }
}

fn backend(error: sled::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

fn serialization(error: serde_json::Error) -> StoreError {
    StoreError::Serialization(error.to_string())
}

impl AgentStore for SledStore {
    fn get_agent(&self, id: &str, owner: &Owner) -> Result<Option<AgentRecord>, StoreError> {
        let key = Self::agent_key(id, owner)?;
        match self.agents.get(key).map_err(backend)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(serialization)?)),
            None => Ok(None),
        }
    }

    fn create_agent(&self, record: &AgentRecord) -> Result<AgentRecord, StoreError> {
        let key = Self::agent_key(&record.id, &record.owner)?;
        let bytes = serde_json::to_vec(record).map_err(serialization)?;
        self.agents.insert(key, bytes).map_err(backend)?;
        Ok(record.clone())
    }

    fn update_agent(&self, record: &AgentRecord) -> Result<AgentRecord, StoreError> {
        let key = Self::agent_key(&record.id, &record.owner)?;
        if self.agents.get(&key).map_err(backend)?.is_none() {
            return Err(StoreError::NotFound(format!("agent {}", record.id)));
        }
        let bytes = serde_json::to_vec(record).map_err(serialization)?;
        self.agents.insert(key, bytes).map_err(backend)?;
        Ok(record.clone())
    }

    fn delete_agent(&self, id: &str, owner: &Owner) -> Result<(), StoreError> {
        let key = Self::agent_key(id, owner)?;
        self.agents.remove(key).map_err(backend)?;
        Ok(())
    }

    fn list_agents_by_owner(&self, owner: &Owner) -> Result<Vec<AgentRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.agents.iter() {
            let (_, bytes) = entry.map_err(backend)?;
            let record: AgentRecord = serde_json::from_slice(&bytes).map_err(serialization)?;
            if &record.owner == owner {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl ActionStore for SledStore {
    fn get_action(&self, id: &ActionId) -> Result<Option<ActionRecord>, StoreError> {
        match self.actions.get(id.as_str()).map_err(backend)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(serialization)?)),
            None => Ok(None),
        }
    }

    fn create_action(&self, record: &ActionRecord) -> Result<ActionRecord, StoreError> {
        let bytes = serde_json::to_vec(record).map_err(serialization)?;
        self.actions
            .insert(record.id.as_str(), bytes)
            .map_err(backend)?;
        Ok(record.clone())
    }

    fn update_action(&self, record: &ActionRecord) -> Result<ActionRecord, StoreError> {
        if self
            .actions
            .get(record.id.as_str())
            .map_err(backend)?
            .is_none()
        {
            return Err(StoreError::NotFound(format!("action {}", record.id)));
        }
        let bytes = serde_json::to_vec(record).map_err(serialization)?;
        self.actions
            .insert(record.id.as_str(), bytes)
            .map_err(backend)?;
        Ok(record.clone())
    }

    fn delete_action(&self, id: &ActionId) -> Result<(), StoreError> {
        self.actions.remove(id.as_str()).map_err(backend)?;
        Ok(())
    }

    fn list_actions_for_agent(
        &self,
        agent_id: &str,
        owner: &Owner,
    ) -> Result<Vec<ActionRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.actions.iter() {
            let (_, bytes) = entry.map_err(backend)?;
            let record: ActionRecord = serde_json::from_slice(&bytes).map_err(serialization)?;
            if record.agent_id == agent_id && &record.owner == owner {
                records.push(record);
            }
        }
        Ok(records)
    }
}
