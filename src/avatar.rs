//! Avatar storage port and filesystem adapter.
//!
//! Icon bytes from a declaration are handed to an `AvatarStore`, which
//! persists them and reports back where they landed. The returned path
//! participates in the agent fingerprint, so the adapter must be
//! deterministic: identical bytes for the same owner must map to the same
//! path on every pass.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Location of a stored avatar image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAvatar {
    pub path: String,
    /// Short content tag identifying the stored bytes.
    pub source_tag: String,
}

/// Avatar storage port consumed by the agent reconciler.
pub trait AvatarStore: Send + Sync {
    fn store(&self, owner_id: &str, image: &[u8]) -> Result<StoredAvatar, SyncError>;
}

/// Content-addressed avatar files under a fixed directory.
///
/// Re-storing identical bytes is a no-op, which keeps repeated sync passes
/// free of avatar writes.
pub struct FsAvatarStore {
    dir: PathBuf,
}

impl FsAvatarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AvatarStore for FsAvatarStore {
    fn store(&self, owner_id: &str, image: &[u8]) -> Result<StoredAvatar, SyncError> {
        let tag = hex::encode(&blake3::hash(image).as_bytes()[..8]);
        let path = self.dir.join(format!("{}-{}.img", owner_id, tag));

        if !path.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                SyncError::Avatar(format!(
                    "failed to create avatar directory {}: {}",
                    self.dir.display(),
                    e
                ))
            })?;
            std::fs::write(&path, image).map_err(|e| {
                SyncError::Avatar(format!("failed to write {}: {}", path.display(), e))
            })?;
        }

        Ok(StoredAvatar {
            path: path.to_string_lossy().into_owned(),
            source_tag: tag,
        })
    }
}
