//! In-memory store adapter.
//!
//! Backs unit and integration tests, and doubles as write-count
//! instrumentation: the idempotence guarantee ("an unchanged second pass
//! performs zero writes") is asserted against `write_count`.

use super::{ActionId, ActionRecord, ActionStore, AgentRecord, AgentStore, Owner};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    agents: RwLock<HashMap<(String, Owner), AgentRecord>>,
    actions: RwLock<HashMap<ActionId, ActionRecord>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating operations performed across both record kinds.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl AgentStore for MemoryStore {
    fn get_agent(&self, id: &str, owner: &Owner) -> Result<Option<AgentRecord>, StoreError> {
        Ok(self
            .agents
            .read()
            .get(&(id.to_string(), owner.clone()))
            .cloned())
    }

    fn create_agent(&self, record: &AgentRecord) -> Result<AgentRecord, StoreError> {
        self.record_write();
        self.agents
            .write()
            .insert((record.id.clone(), record.owner.clone()), record.clone());
        Ok(record.clone())
    }

    fn update_agent(&self, record: &AgentRecord) -> Result<AgentRecord, StoreError> {
        let key = (record.id.clone(), record.owner.clone());
        let mut agents = self.agents.write();
        if !agents.contains_key(&key) {
            return Err(StoreError::NotFound(format!("agent {}", record.id)));
        }
        self.record_write();
        agents.insert(key, record.clone());
        Ok(record.clone())
    }

    fn delete_agent(&self, id: &str, owner: &Owner) -> Result<(), StoreError> {
        self.record_write();
        self.agents.write().remove(&(id.to_string(), owner.clone()));
        Ok(())
    }

    fn list_agents_by_owner(&self, owner: &Owner) -> Result<Vec<AgentRecord>, StoreError> {
        Ok(self
            .agents
            .read()
            .values()
            .filter(|record| &record.owner == owner)
            .cloned()
            .collect())
    }
}

impl ActionStore for MemoryStore {
    fn get_action(&self, id: &ActionId) -> Result<Option<ActionRecord>, StoreError> {
        Ok(self.actions.read().get(id).cloned())
    }

    fn create_action(&self, record: &ActionRecord) -> Result<ActionRecord, StoreError> {
        self.record_write();
        self.actions.write().insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }

    fn update_action(&self, record: &ActionRecord) -> Result<ActionRecord, StoreError> {
        let mut actions = self.actions.write();
        if !actions.contains_key(&record.id) {
            return Err(StoreError::NotFound(format!("action {}", record.id)));
        }
        self.record_write();
        actions.insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }

    fn delete_action(&self, id: &ActionId) -> Result<(), StoreError> {
        self.record_write();
        self.actions.write().remove(id);
        Ok(())
    }

    fn list_actions_for_agent(
        &self,
        agent_id: &str,
        owner: &Owner,
    ) -> Result<Vec<ActionRecord>, StoreError> {
        Ok(self
            .actions
            .read()
            .values()
            .filter(|record| record.agent_id == agent_id && &record.owner == owner)
            .cloned()
            .collect())
    }
}
