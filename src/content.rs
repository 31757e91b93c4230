//! File content resolution for declaration-referenced files.
//!
//! Declarations reference instruction text, icon images, and API specs by
//! path. The resolver turns those references into loaded content: absolute
//! (and tilde) paths are trusted as explicit administrator intent, relative
//! paths are resolved against the directory containing the configuration
//! document and must stay inside it. Pure reads, no caching; a sync pass
//! reads each referenced file once.

use crate::error::SyncError;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// How a referenced file should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Structured,
    Binary,
    /// Pick text or structured from the file extension.
    Auto,
}

/// Loaded content of a referenced file.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedContent {
    Text(String),
    Structured(Value),
    Binary(Vec<u8>),
}

/// Resolves declaration paths against a base directory and loads them.
#[derive(Debug, Clone)]
pub struct ContentResolver {
    base_dir: PathBuf,
}

impl ContentResolver {
    /// Create a resolver rooted at `base_dir`, normally the directory
    /// containing the configuration document.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let base_dir = dunce::canonicalize(&base_dir).unwrap_or(base_dir);
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a raw path reference to an absolute path.
    ///
    /// Resolution order:
    /// 1. Absolute path: used as-is.
    /// 2. `~/` prefix: expanded against `$HOME`, then used as-is.
    /// 3. Anything else: joined onto the base directory. The normalized
    ///    result must remain a descendant of the base directory.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, SyncError> {
        let candidate = Path::new(raw);
        if candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            let home = std::env::var("HOME")
                .map_err(|_| SyncError::InvalidConfiguration("HOME not set".to_string()))?;
            return Ok(PathBuf::from(home).join(rest));
        }

        let base = normalize(&self.base_dir);
        let joined = normalize(&base.join(candidate));
        if !joined.starts_with(&base) {
            return Err(SyncError::PathTraversal(joined));
        }
        Ok(joined)
    }

    /// Resolve and load a referenced file.
    pub fn load(&self, raw: &str, kind: ContentKind) -> Result<ResolvedContent, SyncError> {
        let path = self.resolve(raw)?;
        let kind = match kind {
            ContentKind::Auto => detect_kind(&path),
            explicit => explicit,
        };

        match kind {
            ContentKind::Binary => Ok(ResolvedContent::Binary(read_bytes(&path)?)),
            ContentKind::Text => Ok(ResolvedContent::Text(read_text(&path)?)),
            ContentKind::Structured => {
                let text = read_text(&path)?;
                Ok(ResolvedContent::Structured(parse_by_extension(
                    &text, &path,
                )?))
            }
            ContentKind::Auto => unreachable!("auto resolved above"),
        }
    }

    /// Load a referenced file as text.
    pub fn load_text(&self, raw: &str) -> Result<String, SyncError> {
        let path = self.resolve(raw)?;
        read_text(&path)
    }

    /// Load a referenced file as raw bytes.
    pub fn load_binary(&self, raw: &str) -> Result<Vec<u8>, SyncError> {
        let path = self.resolve(raw)?;
        read_bytes(&path)
    }
}

/// Parse structured text with no path context, e.g. an inline spec.
///
/// JSON is attempted first so JSON parse errors stay precise; anything else
/// falls through to YAML, which also accepts JSON-ish input.
pub fn parse_structured(text: &str) -> Result<Value, String> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    serde_json::to_value(yaml).map_err(|e| e.to_string())
}

fn detect_kind(path: &Path) -> ContentKind {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") | Some("json") => ContentKind::Structured,
        _ => ContentKind::Text,
    }
}

fn parse_by_extension(text: &str, path: &Path) -> Result<Value, SyncError> {
    let parsed: Result<Value, String> = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(text).map_err(|e| e.to_string()),
        _ => {
            let yaml: Result<serde_yaml::Value, _> = serde_yaml::from_str(text);
            yaml.map_err(|e| e.to_string())
                .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string()))
        }
    };
    parsed.map_err(|message| SyncError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn read_text(path: &Path) -> Result<String, SyncError> {
    std::fs::read_to_string(path).map_err(|e| read_error(path, e))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, SyncError> {
    std::fs::read(path).map_err(|e| read_error(path, e))
}

fn read_error(path: &Path, error: std::io::Error) -> SyncError {
    if error.kind() == std::io::ErrorKind::NotFound {
        SyncError::FileNotFound(path.to_path_buf())
    } else {
        SyncError::Read {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

/// Lexically normalize a path: strip `.`, fold `..` into its parent.
///
/// Works without touching the filesystem so traversal is rejected before
/// any read is attempted.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
