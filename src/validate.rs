//! Structural validation of agent and action declarations.
//!
//! Validators aggregate every problem into a report instead of stopping at
//! the first, so a single pass over a broken document can name all of its
//! defects. Content-level rules that need resolved data (instruction length,
//! OpenAPI shape) are separate functions invoked by the reconcilers after
//! resolution.

use crate::declaration::{ActionAuth, ActionDeclaration, AgentDeclaration};
use crate::error::SyncError;
use serde_json::Value;

/// Default upper bound on resolved instruction length, in characters.
pub const DEFAULT_MAX_INSTRUCTIONS_LEN: usize = 10_000;

/// Aggregated validation outcome for one declaration.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub subject: String,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Collapse the report into a `SyncError` when invalid.
    pub fn into_result(self) -> Result<(), SyncError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SyncError::InvalidConfiguration(self.errors.join("; ")))
        }
    }
}

/// Validate an agent declaration, including each nested action.
pub fn validate_agent(decl: &AgentDeclaration) -> ValidationReport {
    let mut report = ValidationReport::new(decl.id.clone());

    for (field, value) in [
        ("id", &decl.id),
        ("name", &decl.name),
        ("provider", &decl.provider),
        ("model", &decl.model),
    ] {
        if value.trim().is_empty() {
            report.add_error(format!("{} is required", field));
        }
    }

    match (&decl.instructions, &decl.instructions_file) {
        (Some(_), Some(_)) => {
            report.add_error("instructions and instructions_file are mutually exclusive")
        }
        (None, None) => report.add_error("one of instructions or instructions_file is required"),
        _ => {}
    }

    if decl.icon.is_some() && decl.icon_file.is_some() {
        report.add_error("icon and icon_file are mutually exclusive");
    }

    for (index, action) in decl.actions.iter().enumerate() {
        for error in validate_action(action).errors {
            report.add_error(format!("actions[{}]: {}", index, error));
        }
    }

    report
}

/// Validate a single action declaration.
pub fn validate_action(decl: &ActionDeclaration) -> ValidationReport {
    let mut report = ValidationReport::new(decl.domain.clone());

    if decl.domain.trim().is_empty() {
        report.add_error("domain is required");
    }

    match (&decl.spec, &decl.spec_file) {
        (Some(_), Some(_)) => report.add_error("spec and spec_file are mutually exclusive"),
        (None, None) => report.add_error("one of spec or spec_file is required"),
        _ => {}
    }

    // The auth discriminant itself is enforced by the tagged enum at parse
    // time; only oauth carries required fields beyond the tag.
    if let ActionAuth::OAuth {
        client_url,
        authorization_url,
        ..
    } = &decl.auth
    {
        if client_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            report.add_error("oauth auth requires client_url");
        }
        if authorization_url
            .as_deref()
            .map_or(true, |u| u.trim().is_empty())
        {
            report.add_error("oauth auth requires authorization_url");
        }
    }

    report
}

/// Validate resolved instruction text against the configured bound.
pub fn validate_instructions(text: &str, max_len: usize) -> Result<(), SyncError> {
    if text.trim().is_empty() {
        return Err(SyncError::InstructionsEmpty);
    }
    let actual = text.chars().count();
    if actual > max_len {
        return Err(SyncError::InstructionsTooLong {
            limit: max_len,
            actual,
        });
    }
    Ok(())
}

/// Validate that a resolved spec document is a usable OpenAPI description.
///
/// Requires a version marker (`openapi` or `swagger`), an `info` object,
/// and at least one of `paths`/`components`.
pub fn validate_api_document(doc: &Value) -> Result<(), SyncError> {
    let object = doc
        .as_object()
        .ok_or_else(|| SyncError::InvalidApiSpec("document is not an object".to_string()))?;

    if !object.contains_key("openapi") && !object.contains_key("swagger") {
        return Err(SyncError::InvalidApiSpec(
            "missing openapi/swagger version field".to_string(),
        ));
    }
    if !object.get("info").map_or(false, Value::is_object) {
        return Err(SyncError::InvalidApiSpec(
            "missing info object".to_string(),
        ));
    }
    if !object.contains_key("paths") && !object.contains_key("components") {
        return Err(SyncError::InvalidApiSpec(
            "document declares no paths or components".to_string(),
        ));
    }
    Ok(())
}
