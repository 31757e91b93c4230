//! Per-action reconciliation.

use crate::content::{parse_structured, ContentResolver};
use crate::declaration::{ActionAuth, ActionDeclaration};
use crate::error::SyncError;
use crate::hash;
use crate::secrets::Cipher;
use crate::store::{ActionId, ActionKey, ActionRecord, ActionStore, Owner, StoredAuth};
use crate::validate;

/// Creates or updates one action record per declared action.
///
/// Any failure here propagates: an agent whose advertised capability cannot
/// be honestly constructed is not marked as synced.
pub struct ActionReconciler<'a> {
    resolver: &'a ContentResolver,
    store: &'a dyn ActionStore,
    cipher: &'a dyn Cipher,
    owner: &'a Owner,
}

impl<'a> ActionReconciler<'a> {
    pub fn new(
        resolver: &'a ContentResolver,
        store: &'a dyn ActionStore,
        cipher: &'a dyn Cipher,
        owner: &'a Owner,
    ) -> Self {
        Self {
            resolver,
            store,
            cipher,
            owner,
        }
    }

    /// Reconcile every declared action for `agent_id`, in declaration order.
    pub fn reconcile(
        &self,
        agent_id: &str,
        declared: &[ActionDeclaration],
    ) -> Result<Vec<ActionRecord>, SyncError> {
        let mut records = Vec::with_capacity(declared.len());
        for decl in declared {
            records.push(self.reconcile_one(agent_id, decl)?);
        }
        Ok(records)
    }

    fn reconcile_one(
        &self,
        agent_id: &str,
        decl: &ActionDeclaration,
    ) -> Result<ActionRecord, SyncError> {
        let raw_spec = self.resolve_spec(decl)?;
        let document = match &decl.spec_file {
            Some(file) => {
                let path = self.resolver.resolve(file)?;
                parse_structured(&raw_spec).map_err(|message| SyncError::Parse { path, message })?
            }
            None => parse_structured(&raw_spec)
                .map_err(|e| SyncError::InvalidApiSpec(format!("spec does not parse: {}", e)))?,
        };
        validate::validate_api_document(&document)?;

        let id = ActionId::derive(&ActionKey::new(&decl.domain, agent_id));
        let fingerprint = hash::action_fingerprint(decl, &raw_spec);

        let existing = self.store.get_action(&id)?;
        if let Some(existing) = &existing {
            if existing.config_hash == fingerprint {
                tracing::debug!(domain = %decl.domain, agent_id, "action unchanged, skipping write");
                return Ok(existing.clone());
            }
        }

        let record = ActionRecord {
            id,
            agent_id: agent_id.to_string(),
            owner: self.owner.clone(),
            domain: decl.domain.clone(),
            raw_spec,
            privacy_policy_url: decl.privacy_policy_url.clone(),
            auth: self.encrypt_auth(&decl.auth)?,
            config_hash: fingerprint,
        };

        let stored = if existing.is_some() {
            tracing::info!(domain = %decl.domain, agent_id, "updating action");
            self.store.update_action(&record)?
        } else {
            tracing::info!(domain = %decl.domain, agent_id, "creating action");
            self.store.create_action(&record)?
        };
        Ok(stored)
    }

    fn resolve_spec(&self, decl: &ActionDeclaration) -> Result<String, SyncError> {
        match (&decl.spec, &decl.spec_file) {
            (Some(inline), _) => Ok(inline.clone()),
            (None, Some(file)) => self.resolver.load_text(file),
            (None, None) => Err(SyncError::InvalidConfiguration(
                "one of spec or spec_file is required".to_string(),
            )),
        }
    }

    /// Encrypt credential-bearing fields; absent fields stay absent.
    fn encrypt_auth(&self, auth: &ActionAuth) -> Result<StoredAuth, SyncError> {
        Ok(match auth {
            ActionAuth::None => StoredAuth::None,
            ActionAuth::ServiceHttp { api_key } => StoredAuth::ServiceHttp {
                api_key: self.encrypt_opt(api_key)?,
            },
            ActionAuth::OAuth {
                client_url,
                authorization_url,
                scope,
                oauth_client_id,
                oauth_client_secret,
                token_exchange_method,
            } => StoredAuth::OAuth {
                client_url: client_url.clone(),
                authorization_url: authorization_url.clone(),
                scope: scope.clone(),
                oauth_client_id: self.encrypt_opt(oauth_client_id)?,
                oauth_client_secret: self.encrypt_opt(oauth_client_secret)?,
                token_exchange_method: token_exchange_method.clone(),
            },
        })
    }

    fn encrypt_opt(&self, value: &Option<String>) -> Result<Option<String>, SyncError> {
        match value {
            Some(plaintext) => Ok(Some(self.cipher.encrypt(plaintext)?)),
            None => Ok(None),
        }
    }
}
