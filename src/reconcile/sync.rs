//! Top-level sync pass.

use super::{AgentReconciler, OrphanCleanup, ReconcileOutcome};
use crate::avatar::AvatarStore;
use crate::content::ContentResolver;
use crate::declaration::AgentDeclaration;
use crate::secrets::Cipher;
use crate::store::{ActionStore, AgentStore, Owner};
use crate::validate::DEFAULT_MAX_INSTRUCTIONS_LEN;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// One agent that failed to reconcile, tagged with its declared id.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub agent_id: String,
    pub message: String,
}

/// Aggregated result of one sync pass, intended for structured logging by
/// the caller. `success` is false iff any per-agent error occurred; cleanup
/// failures never flip it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub removed: usize,
    pub errors: Vec<SyncFailure>,
    pub success: bool,
}

impl SyncReport {
    fn empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }
}

/// Drives one full reconciliation pass over a declared agent list.
///
/// Stateless across invocations apart from the persisted records; safe to
/// re-run after a crash, converging on the same end state.
pub struct Syncer {
    resolver: ContentResolver,
    agents: Arc<dyn AgentStore>,
    actions: Arc<dyn ActionStore>,
    cipher: Arc<dyn Cipher>,
    avatars: Arc<dyn AvatarStore>,
    owner: Owner,
    max_instructions_len: usize,
}

impl Syncer {
    pub fn new(
        resolver: ContentResolver,
        agents: Arc<dyn AgentStore>,
        actions: Arc<dyn ActionStore>,
        cipher: Arc<dyn Cipher>,
        avatars: Arc<dyn AvatarStore>,
    ) -> Self {
        Self {
            resolver,
            agents,
            actions,
            cipher,
            avatars,
            owner: Owner::system(),
            max_instructions_len: DEFAULT_MAX_INSTRUCTIONS_LEN,
        }
    }

    pub fn with_max_instructions_len(mut self, max_instructions_len: usize) -> Self {
        self.max_instructions_len = max_instructions_len;
        self
    }

    /// Run one pass: reconcile every declared agent, then remove orphans.
    ///
    /// An empty declaration list is a valid terminal state and returns
    /// immediately — it does not wipe the store.
    pub fn sync(&self, declared: &[AgentDeclaration]) -> SyncReport {
        if declared.is_empty() {
            tracing::info!("no agents declared, nothing to reconcile");
            return SyncReport::empty();
        }

        let reconciler = AgentReconciler::new(
            &self.resolver,
            self.agents.as_ref(),
            self.actions.as_ref(),
            self.cipher.as_ref(),
            self.avatars.as_ref(),
            &self.owner,
            self.max_instructions_len,
        );

        let mut report = SyncReport::empty();
        for decl in declared {
            match reconciler.reconcile(decl) {
                Ok((_, outcome)) => {
                    report.synced += 1;
                    match outcome {
                        ReconcileOutcome::Created => {
                            tracing::info!(agent_id = %decl.id, "created agent")
                        }
                        ReconcileOutcome::Updated => {
                            tracing::info!(agent_id = %decl.id, "updated agent")
                        }
                        ReconcileOutcome::Unchanged => {
                            tracing::debug!(agent_id = %decl.id, "agent unchanged")
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(agent_id = %decl.id, error = %e, "agent failed to reconcile");
                    report.errors.push(SyncFailure {
                        agent_id: decl.id.clone(),
                        message: e.to_string(),
                    });
                    report.success = false;
                }
            }
        }

        // Cleanup runs regardless of per-agent outcomes, against the full
        // declared-id list: an agent that failed this pass is still
        // declared and must not be treated as an orphan.
        let declared_ids: HashSet<String> = declared.iter().map(|d| d.id.clone()).collect();
        report.removed = OrphanCleanup::new(self.agents.as_ref(), self.actions.as_ref(), &self.owner)
            .remove_orphans(&declared_ids);

        tracing::info!(
            synced = report.synced,
            removed = report.removed,
            errors = report.errors.len(),
            "sync pass complete"
        );
        report
    }
}
