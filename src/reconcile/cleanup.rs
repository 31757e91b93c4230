//! Orphan removal: delete system-owned records no longer declared.

use crate::store::{ActionStore, AgentRecord, AgentStore, Owner};
use crate::error::StoreError;
use std::collections::HashSet;

/// Removes agents (and their actions) whose ids dropped out of the
/// declaration list. Strictly best-effort: every orphan is attempted, and
/// failures are logged rather than raised — the next pass retries them.
pub struct OrphanCleanup<'a> {
    agents: &'a dyn AgentStore,
    actions: &'a dyn ActionStore,
    owner: &'a Owner,
}

impl<'a> OrphanCleanup<'a> {
    pub fn new(agents: &'a dyn AgentStore, actions: &'a dyn ActionStore, owner: &'a Owner) -> Self {
        Self {
            agents,
            actions,
            owner,
        }
    }

    /// Delete stored agents not named in `declared_ids`.
    ///
    /// Returns the number of agents fully removed.
    pub fn remove_orphans(&self, declared_ids: &HashSet<String>) -> usize {
        let stored = match self.agents.list_agents_by_owner(self.owner) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list agents for orphan cleanup");
                return 0;
            }
        };

        let mut removed = 0;
        for record in stored {
            if declared_ids.contains(&record.id) {
                continue;
            }
            match self.remove_agent(&record) {
                Ok(()) => {
                    tracing::info!(agent_id = %record.id, "removed orphaned agent");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(agent_id = %record.id, error = %e, "failed to remove orphaned agent");
                }
            }
        }
        removed
    }

    /// Actions go first so a partial failure leaves the agent record (and
    /// with it, the retry trigger on the next pass) in place.
    fn remove_agent(&self, record: &AgentRecord) -> Result<(), StoreError> {
        for action in self
            .actions
            .list_actions_for_agent(&record.id, self.owner)?
        {
            self.actions.delete_action(&action.id)?;
        }
        self.agents.delete_agent(&record.id, self.owner)
    }
}
