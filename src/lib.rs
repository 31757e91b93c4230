//! Attune: declarative agent reconciliation.
//!
//! Takes the agent list declared in a static configuration document and
//! makes the persistent store match it — idempotently, with per-agent
//! failure isolation, hash-based change detection, and encrypted
//! credential storage. Run it once at startup; re-running an unchanged
//! configuration performs no writes.

pub mod avatar;
pub mod content;
pub mod declaration;
pub mod error;
pub mod hash;
pub mod logging;
pub mod reconcile;
pub mod secrets;
pub mod settings;
pub mod store;
pub mod validate;

pub use declaration::{ActionAuth, ActionDeclaration, AgentDeclaration};
pub use error::{StoreError, SyncError};
pub use reconcile::{SyncFailure, SyncReport, Syncer};
