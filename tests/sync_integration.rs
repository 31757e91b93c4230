//! End-to-end sync passes against real adapters.
//!
//! Exercises the orchestrator's core guarantees: idempotence, change
//! detection, per-agent failure isolation, and orphan removal.

use attune::avatar::FsAvatarStore;
use attune::content::ContentResolver;
use attune::declaration::{ActionAuth, ActionDeclaration, AgentDeclaration};
use attune::secrets::{is_encrypted, AgeCipher, Cipher};
use attune::store::{
    ActionStore, AgentStore, MemoryStore, Owner, SledStore, StoredAuth,
};
use attune::Syncer;
use std::sync::Arc;

const WEATHER_SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Weather
  version: "1.0"
paths:
  /forecast: {}
"#;

struct Harness {
    dir: tempfile::TempDir,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            store: Arc::new(MemoryStore::new()),
        }
    }

    fn syncer(&self) -> Syncer {
        Syncer::new(
            ContentResolver::new(self.dir.path()),
            self.store.clone(),
            self.store.clone(),
            Arc::new(AgeCipher::new("test-passphrase")),
            Arc::new(FsAvatarStore::new(self.dir.path().join("avatars"))),
        )
    }

    fn write_file(&self, name: &str, content: &str) {
        std::fs::write(self.dir.path().join(name), content).unwrap();
    }
}

fn agent(id: &str, instructions: &str) -> AgentDeclaration {
    let mut decl = AgentDeclaration::new(id, id);
    decl.provider = "openai".to_string();
    decl.model = "gpt-4o".to_string();
    decl.instructions = Some(instructions.to_string());
    decl
}

fn weather_action(auth: ActionAuth) -> ActionDeclaration {
    ActionDeclaration {
        domain: "weather.example.com".to_string(),
        spec: Some(WEATHER_SPEC.to_string()),
        spec_file: None,
        auth,
        privacy_policy_url: None,
    }
}

#[test]
fn first_pass_creates_agent_with_one_version() {
    let harness = Harness::new();
    let report = harness.syncer().sync(&[agent("support", "Be kind.")]);

    assert!(report.success);
    assert_eq!(report.synced, 1);
    assert_eq!(report.removed, 0);
    assert!(report.errors.is_empty());

    let record = harness
        .store
        .get_agent("support", &Owner::system())
        .unwrap()
        .expect("agent persisted");
    assert_eq!(record.versions.len(), 1);
    assert_eq!(record.instructions, "Be kind.");
}

#[test]
fn unchanged_second_pass_performs_zero_writes() {
    let harness = Harness::new();
    let mut decl = agent("support", "Be kind.");
    decl.actions.push(weather_action(ActionAuth::ServiceHttp {
        api_key: Some("sk-123".to_string()),
    }));

    let first = harness.syncer().sync(&[decl.clone()]);
    assert!(first.success);
    let writes_after_first = harness.store.write_count();

    let second = harness.syncer().sync(&[decl]);
    assert!(second.success);
    assert_eq!(second.synced, first.synced);
    assert_eq!(harness.store.write_count(), writes_after_first);

    let record = harness
        .store
        .get_agent("support", &Owner::system())
        .unwrap()
        .unwrap();
    assert_eq!(record.versions.len(), 1);
}

#[test]
fn instruction_change_appends_exactly_one_version() {
    let harness = Harness::new();
    harness.syncer().sync(&[agent("support", "A")]);
    harness.syncer().sync(&[agent("support", "B")]);

    let record = harness
        .store
        .get_agent("support", &Owner::system())
        .unwrap()
        .unwrap();
    assert_eq!(record.versions.len(), 2);
    assert_ne!(
        record.versions[0].config_hash,
        record.versions[1].config_hash
    );
    assert_eq!(record.instructions, "B");
}

#[test]
fn broken_agent_does_not_stop_the_pass() {
    let harness = Harness::new();
    let mut broken = agent("broken", "");
    broken.instructions = None; // no instructions source at all

    let report = harness.syncer().sync(&[
        agent("ok1", "First."),
        broken,
        agent("ok2", "Second."),
    ]);

    assert!(!report.success);
    assert_eq!(report.synced, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].agent_id, "broken");

    let owner = Owner::system();
    assert!(harness.store.get_agent("ok1", &owner).unwrap().is_some());
    assert!(harness.store.get_agent("ok2", &owner).unwrap().is_some());
    assert!(harness.store.get_agent("broken", &owner).unwrap().is_none());
}

#[test]
fn undeclared_agent_is_removed_with_its_actions() {
    let harness = Harness::new();
    let mut b = agent("b", "Second agent.");
    b.actions.push(weather_action(ActionAuth::None));

    harness.syncer().sync(&[agent("a", "First agent."), b]);
    let owner = Owner::system();
    assert!(!harness
        .store
        .list_actions_for_agent("b", &owner)
        .unwrap()
        .is_empty());

    let report = harness.syncer().sync(&[agent("a", "First agent.")]);
    assert!(report.success);
    assert_eq!(report.removed, 1);
    assert!(harness.store.get_agent("b", &owner).unwrap().is_none());
    assert!(harness
        .store
        .list_actions_for_agent("b", &owner)
        .unwrap()
        .is_empty());
    assert!(harness.store.get_agent("a", &owner).unwrap().is_some());
}

#[test]
fn missing_instructions_file_is_reported_per_agent() {
    let harness = Harness::new();
    let mut decl = agent("support", "");
    decl.instructions = None;
    decl.instructions_file = Some("nope/missing.md".to_string());

    let report = harness.syncer().sync(&[decl]);
    assert!(!report.success);
    assert_eq!(report.synced, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].agent_id, "support");
    assert!(report.errors[0].message.contains("not found"));
}

#[test]
fn empty_declaration_list_is_a_successful_noop() {
    let harness = Harness::new();
    harness.syncer().sync(&[agent("support", "Be kind.")]);
    let writes = harness.store.write_count();

    let report = harness.syncer().sync(&[]);
    assert!(report.success);
    assert_eq!(report.synced, 0);
    assert_eq!(report.removed, 0);

    // An empty list is a no-op terminal state, not an instruction to wipe.
    assert!(harness
        .store
        .get_agent("support", &Owner::system())
        .unwrap()
        .is_some());
    assert_eq!(harness.store.write_count(), writes);
}

#[test]
fn failed_but_declared_agent_is_not_an_orphan() {
    let harness = Harness::new();
    harness.syncer().sync(&[agent("support", "Be kind.")]);

    let mut broken = agent("support", "");
    broken.instructions = None;
    broken.instructions_file = Some("missing.md".to_string());

    let report = harness.syncer().sync(&[broken]);
    assert!(!report.success);
    assert_eq!(report.removed, 0);
    assert!(harness
        .store
        .get_agent("support", &Owner::system())
        .unwrap()
        .is_some());
}

#[test]
fn instructions_file_resolves_against_manifest_directory() {
    let harness = Harness::new();
    harness.write_file("prompt.md", "From disk.");

    let mut decl = agent("support", "");
    decl.instructions = None;
    decl.instructions_file = Some("prompt.md".to_string());

    let report = harness.syncer().sync(&[decl]);
    assert!(report.success);
    let record = harness
        .store
        .get_agent("support", &Owner::system())
        .unwrap()
        .unwrap();
    assert_eq!(record.instructions, "From disk.");
}

#[test]
fn escaping_instructions_path_fails_the_agent() {
    let harness = Harness::new();
    let mut decl = agent("support", "");
    decl.instructions = None;
    decl.instructions_file = Some("../../outside.md".to_string());

    let report = harness.syncer().sync(&[decl]);
    assert!(!report.success);
    assert!(report.errors[0].message.contains("escapes"));
}

#[test]
fn credentials_survive_restart_encrypted() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db");
    let cipher = AgeCipher::new("test-passphrase");

    let mut decl = agent("support", "Be kind.");
    decl.actions.push(weather_action(ActionAuth::ServiceHttp {
        api_key: Some("sk-secret".to_string()),
    }));

    {
        let store = Arc::new(SledStore::open(&db_path).unwrap());
        let syncer = Syncer::new(
            ContentResolver::new(dir.path()),
            store.clone(),
            store,
            Arc::new(AgeCipher::new("test-passphrase")),
            Arc::new(FsAvatarStore::new(dir.path().join("avatars"))),
        );
        assert!(syncer.sync(&[decl.clone()]).success);
    }

    // Reopen as a fresh process would.
    let store = Arc::new(SledStore::open(&db_path).unwrap());
    let actions = store
        .list_actions_for_agent("support", &Owner::system())
        .unwrap();
    assert_eq!(actions.len(), 1);
    match &actions[0].auth {
        StoredAuth::ServiceHttp { api_key: Some(key) } => {
            assert!(is_encrypted(key));
            assert_eq!(cipher.decrypt(key).unwrap(), "sk-secret");
        }
        other => panic!("expected encrypted service_http auth, got {:?}", other),
    }

    // A re-run against the reopened store detects no change.
    let syncer = Syncer::new(
        ContentResolver::new(dir.path()),
        store.clone(),
        store.clone(),
        Arc::new(AgeCipher::new("test-passphrase")),
        Arc::new(FsAvatarStore::new(dir.path().join("avatars"))),
    );
    assert!(syncer.sync(&[decl]).success);
    let record = store
        .get_agent("support", &Owner::system())
        .unwrap()
        .unwrap();
    assert_eq!(record.versions.len(), 1);
}

#[test]
fn oauth_credentials_are_encrypted_field_by_field() {
    let harness = Harness::new();
    let mut decl = agent("support", "Be kind.");
    decl.actions.push(weather_action(ActionAuth::OAuth {
        client_url: Some("https://example.com/token".to_string()),
        authorization_url: Some("https://example.com/authorize".to_string()),
        scope: Some("read".to_string()),
        oauth_client_id: Some("client-id".to_string()),
        oauth_client_secret: None,
        token_exchange_method: None,
    }));

    assert!(harness.syncer().sync(&[decl]).success);
    let actions = harness
        .store
        .list_actions_for_agent("support", &Owner::system())
        .unwrap();
    match &actions[0].auth {
        StoredAuth::OAuth {
            client_url,
            oauth_client_id,
            oauth_client_secret,
            ..
        } => {
            // URLs are not credentials and stay readable.
            assert_eq!(client_url.as_deref(), Some("https://example.com/token"));
            assert!(is_encrypted(oauth_client_id.as_deref().unwrap()));
            // Absent fields are never encrypted-as-empty.
            assert!(oauth_client_secret.is_none());
        }
        other => panic!("expected oauth auth, got {:?}", other),
    }
}
