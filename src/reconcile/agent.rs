//! Per-agent reconciliation.

use super::ActionReconciler;
use crate::avatar::{AvatarStore, StoredAvatar};
use crate::content::{ContentKind, ContentResolver, ResolvedContent};
use crate::declaration::AgentDeclaration;
use crate::error::SyncError;
use crate::hash;
use crate::secrets::Cipher;
use crate::store::{ActionStore, AgentRecord, AgentStore, AgentVersion, Owner};
use crate::validate;

/// What a reconciliation pass did to the agent's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    /// Content fingerprint matched the latest stored version; no version
    /// was appended. The action-id list may still have been refreshed.
    Unchanged,
}

/// The unit of work the orchestrator drives for one declared agent.
pub struct AgentReconciler<'a> {
    resolver: &'a ContentResolver,
    agents: &'a dyn AgentStore,
    actions: &'a dyn ActionStore,
    cipher: &'a dyn Cipher,
    avatars: &'a dyn AvatarStore,
    owner: &'a Owner,
    max_instructions_len: usize,
}

impl<'a> AgentReconciler<'a> {
    pub fn new(
        resolver: &'a ContentResolver,
        agents: &'a dyn AgentStore,
        actions: &'a dyn ActionStore,
        cipher: &'a dyn Cipher,
        avatars: &'a dyn AvatarStore,
        owner: &'a Owner,
        max_instructions_len: usize,
    ) -> Self {
        Self {
            resolver,
            agents,
            actions,
            cipher,
            avatars,
            owner,
            max_instructions_len,
        }
    }

    /// Reconcile one declared agent against the store.
    ///
    /// Validation happens before any I/O. The agent's own record is written
    /// only when the fingerprint moved, and never when one of its actions
    /// failed to reconcile.
    pub fn reconcile(
        &self,
        decl: &AgentDeclaration,
    ) -> Result<(AgentRecord, ReconcileOutcome), SyncError> {
        validate::validate_agent(decl).into_result()?;

        let instructions = self.resolve_instructions(decl)?;
        validate::validate_instructions(&instructions, self.max_instructions_len)?;
        let avatar = self.resolve_avatar(decl)?;

        let fingerprint = hash::agent_fingerprint(decl, &instructions, avatar.as_ref());
        let existing = self.agents.get_agent(&decl.id, self.owner)?;

        // Actions come first: if one of them cannot be built, this agent
        // must fail without its record having been touched.
        let action_records = ActionReconciler::new(self.resolver, self.actions, self.cipher, self.owner)
            .reconcile(&decl.id, &decl.actions)?;
        let action_ids: Vec<_> = action_records.into_iter().map(|r| r.id).collect();

        match existing {
            None => {
                let record = AgentRecord {
                    id: decl.id.clone(),
                    owner: self.owner.clone(),
                    name: decl.name.clone(),
                    description: decl.description.clone(),
                    instructions,
                    avatar,
                    provider: decl.provider.clone(),
                    model: decl.model.clone(),
                    category: decl.category.clone(),
                    model_parameters: decl.model_parameters.clone(),
                    recursion_limit: decl.recursion_limit,
                    tools: decl.tools.clone(),
                    tool_resources: decl.tool_resources.clone(),
                    action_ids,
                    versions: vec![AgentVersion::new(fingerprint)],
                };
                let created = self.agents.create_agent(&record)?;
                Ok((created, ReconcileOutcome::Created))
            }
            Some(mut record) => {
                let mut dirty = false;
                let outcome = if record.latest_hash() == Some(fingerprint.as_str()) {
                    ReconcileOutcome::Unchanged
                } else {
                    record.name = decl.name.clone();
                    record.description = decl.description.clone();
                    record.instructions = instructions;
                    record.avatar = avatar;
                    record.provider = decl.provider.clone();
                    record.model = decl.model.clone();
                    record.category = decl.category.clone();
                    record.model_parameters = decl.model_parameters.clone();
                    record.recursion_limit = decl.recursion_limit;
                    record.tools = decl.tools.clone();
                    record.tool_resources = decl.tool_resources.clone();
                    record.versions.push(AgentVersion::new(fingerprint));
                    dirty = true;
                    ReconcileOutcome::Updated
                };

                // The action list is not part of the fingerprint; sync it
                // whenever it moved, without touching version history.
                if record.action_ids != action_ids {
                    record.action_ids = action_ids;
                    dirty = true;
                }

                if dirty {
                    let updated = self.agents.update_agent(&record)?;
                    Ok((updated, outcome))
                } else {
                    Ok((record, outcome))
                }
            }
        }
    }

    fn resolve_instructions(&self, decl: &AgentDeclaration) -> Result<String, SyncError> {
        match (&decl.instructions, &decl.instructions_file) {
            (Some(inline), _) => Ok(inline.clone()),
            (None, Some(file)) => self.resolver.load_text(file),
            (None, None) => Err(SyncError::InvalidConfiguration(
                "one of instructions or instructions_file is required".to_string(),
            )),
        }
    }

    fn resolve_avatar(&self, decl: &AgentDeclaration) -> Result<Option<StoredAvatar>, SyncError> {
        let image = if let Some(inline) = &decl.icon {
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, inline.trim())
                .map_err(|e| SyncError::Avatar(format!("invalid inline icon data: {}", e)))?
        } else if let Some(file) = &decl.icon_file {
            match self.resolver.load(file, ContentKind::Binary)? {
                ResolvedContent::Binary(bytes) => bytes,
                _ => unreachable!("binary load returns binary content"),
            }
        } else {
            return Ok(None);
        };
        self.avatars.store(&decl.id, &image).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::FsAvatarStore;
    use crate::declaration::{ActionAuth, ActionDeclaration};
    use crate::secrets::AgeCipher;
    use crate::store::MemoryStore;

    struct Harness {
        dir: tempfile::TempDir,
        store: MemoryStore,
        cipher: AgeCipher,
        owner: Owner,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                store: MemoryStore::new(),
                cipher: AgeCipher::new("test"),
                owner: Owner::system(),
            }
        }

        fn reconcile(
            &self,
            decl: &AgentDeclaration,
        ) -> Result<(AgentRecord, ReconcileOutcome), SyncError> {
            let resolver = ContentResolver::new(self.dir.path());
            let avatars = FsAvatarStore::new(self.dir.path().join("avatars"));
            AgentReconciler::new(
                &resolver,
                &self.store,
                &self.store,
                &self.cipher,
                &avatars,
                &self.owner,
                validate::DEFAULT_MAX_INSTRUCTIONS_LEN,
            )
            .reconcile(decl)
        }
    }

    fn support_agent() -> AgentDeclaration {
        let mut decl = AgentDeclaration::new("support", "Support");
        decl.provider = "openai".to_string();
        decl.model = "gpt-4o".to_string();
        decl.instructions = Some("Be kind.".to_string());
        decl
    }

    fn weather_action() -> ActionDeclaration {
        ActionDeclaration {
            domain: "weather.example.com".to_string(),
            spec: Some(
                "openapi: 3.0.0\ninfo:\n  title: W\n  version: \"1\"\npaths:\n  /f: {}\n"
                    .to_string(),
            ),
            spec_file: None,
            auth: ActionAuth::None,
            privacy_policy_url: None,
        }
    }

    #[test]
    fn creates_record_with_first_version() {
        let harness = Harness::new();
        let (record, outcome) = harness.reconcile(&support_agent()).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Created);
        assert_eq!(record.versions.len(), 1);
        assert_eq!(record.owner, Owner::system());
        assert_eq!(record.instructions, "Be kind.");
    }

    #[test]
    fn unchanged_declaration_skips_write() {
        let harness = Harness::new();
        harness.reconcile(&support_agent()).unwrap();
        let writes = harness.store.write_count();

        let (record, outcome) = harness.reconcile(&support_agent()).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(record.versions.len(), 1);
        assert_eq!(harness.store.write_count(), writes);
    }

    #[test]
    fn changed_instructions_append_one_version() {
        let harness = Harness::new();
        let (first, _) = harness.reconcile(&support_agent()).unwrap();

        let mut changed = support_agent();
        changed.instructions = Some("Be brief.".to_string());
        let (second, outcome) = harness.reconcile(&changed).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Updated);
        assert_eq!(second.versions.len(), 2);
        assert_ne!(second.latest_hash(), first.latest_hash());
        assert_eq!(second.instructions, "Be brief.");
    }

    #[test]
    fn validation_failure_reaches_no_store() {
        let harness = Harness::new();
        let mut decl = support_agent();
        decl.model = String::new();

        let err = harness.reconcile(&decl).unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfiguration(_)));
        assert_eq!(harness.store.write_count(), 0);
    }

    #[test]
    fn instructions_from_file() {
        let harness = Harness::new();
        std::fs::write(harness.dir.path().join("prompt.md"), "From the file.").unwrap();

        let mut decl = support_agent();
        decl.instructions = None;
        decl.instructions_file = Some("prompt.md".to_string());

        let (record, _) = harness.reconcile(&decl).unwrap();
        assert_eq!(record.instructions, "From the file.");
    }

    #[test]
    fn missing_instructions_file_fails_without_write() {
        let harness = Harness::new();
        let mut decl = support_agent();
        decl.instructions = None;
        decl.instructions_file = Some("absent.md".to_string());

        let err = harness.reconcile(&decl).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(harness.store.write_count(), 0);
    }

    #[test]
    fn action_failure_leaves_agent_unwritten() {
        let harness = Harness::new();
        let mut decl = support_agent();
        let mut action = weather_action();
        action.spec = Some("not: openapi".to_string());
        decl.actions.push(action);

        assert!(harness.reconcile(&decl).is_err());
        assert!(harness
            .store
            .get_agent("support", &Owner::system())
            .unwrap()
            .is_none());
    }

    #[test]
    fn action_edit_refreshes_actions_without_version_bump() {
        let harness = Harness::new();
        let mut decl = support_agent();
        decl.actions.push(weather_action());
        let (first, _) = harness.reconcile(&decl).unwrap();
        assert_eq!(first.action_ids.len(), 1);

        let mut edited = decl.clone();
        edited.actions[0].spec = Some(
            "openapi: 3.0.0\ninfo:\n  title: W2\n  version: \"2\"\npaths:\n  /f: {}\n".to_string(),
        );
        let (second, outcome) = harness.reconcile(&edited).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(second.versions.len(), 1);
        assert_eq!(second.action_ids, first.action_ids);
    }

    #[test]
    fn dropped_action_is_removed_from_id_list() {
        let harness = Harness::new();
        let mut decl = support_agent();
        decl.actions.push(weather_action());
        harness.reconcile(&decl).unwrap();

        let mut without = decl.clone();
        without.actions.clear();
        let (record, outcome) = harness.reconcile(&without).unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert!(record.action_ids.is_empty());
    }

    #[test]
    fn inline_icon_is_stored_and_fingerprinted() {
        let harness = Harness::new();
        let mut decl = support_agent();
        decl.icon = Some(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b"png-bytes",
        ));

        let (record, _) = harness.reconcile(&decl).unwrap();
        let avatar = record.avatar.expect("avatar stored");
        assert!(std::path::Path::new(&avatar.path).exists());

        // A different icon is a content change.
        let mut changed = decl.clone();
        changed.icon = Some(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b"other-bytes",
        ));
        let (updated, outcome) = harness.reconcile(&changed).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Updated);
        assert_eq!(updated.versions.len(), 2);
    }
}
