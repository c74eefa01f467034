//! Error types for permission parsing, query validation and authorization checks.

use crate::evaluator::Denial;
use crate::permission::Resource;
use http::StatusCode;
use serde::Serialize;
use std::fmt;

// ── Permission parsing ─────────────────────────────────────────────────

/// Why a string is not a valid permission identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// Not `*` and not exactly three dot-separated segments.
    WrongSegmentCount(usize),
    /// The first segment names no known resource.
    UnknownResource(String),
    /// The second segment is neither `*` nor a well-formed id for the resource.
    BadResourceId { resource: Resource, value: String },
    /// The third segment is not an action of the resource.
    UnknownAction { resource: Resource, action: String },
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::WrongSegmentCount(n) => {
                write!(f, "expected `resource.resourceId.action`, got {n} segment(s)")
            }
            PermissionError::UnknownResource(name) => write!(f, "unknown resource '{name}'"),
            PermissionError::BadResourceId { resource, value } => write!(
                f,
                "invalid {resource} id '{value}': expected '*' or '{}_' followed by 8-32 base58 characters",
                resource.id_prefix()
            ),
            PermissionError::UnknownAction { resource, action } => {
                write!(f, "unknown {resource} action '{action}'")
            }
        }
    }
}

impl std::error::Error for PermissionError {}

// ── Query schema ───────────────────────────────────────────────────────

/// Machine-readable kind of a [`SchemaIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Neither a string nor an object.
    InvalidType,
    /// Object carrying neither `and` nor `or`.
    MissingShape,
    /// Object carrying both `and` and `or`.
    ConflictingShape,
    /// Object key other than `and`/`or`.
    UnknownKey,
    /// `and`/`or` with no members.
    EmptyList,
    /// Nesting beyond the configured maximum depth.
    TooDeep,
    /// Leaf rejected by strict permission checking.
    InvalidPermission,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::InvalidType => "invalid_type",
            IssueCode::MissingShape => "missing_shape",
            IssueCode::ConflictingShape => "conflicting_shape",
            IssueCode::UnknownKey => "unknown_key",
            IssueCode::EmptyList => "empty_list",
            IssueCode::TooDeep => "too_deep",
            IssueCode::InvalidPermission => "invalid_permission",
        }
    }
}

/// A single structural problem found in a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    /// Location inside the query, e.g. `query.and[1].or[0]`.
    pub path: String,
    pub message: String,
    pub code: IssueCode,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
        }
    }
}

/// A query payload that does not match the leaf / `and` / `or` grammar.
///
/// Always a caller defect: carries the offending input alongside every issue
/// found. Subtrees nested past the depth limit are echoed as `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub input: serde_json::Value,
    pub issues: Vec<SchemaIssue>,
}

impl SchemaError {
    pub fn new(input: serde_json::Value, issues: Vec<SchemaIssue>) -> Self {
        Self { input, issues }
    }

    /// Whether any issue has the given code.
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// JSON error body for a request-validation response.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": "Invalid permission query",
            "details": self.issues,
            "input": self.input,
        })
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid permission query {}", self.input)?;
        for issue in &self.issues {
            write!(f, "\n  - {}: {} ({})", issue.path, issue.message, issue.code.as_str())?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

// ── Authorization checks ───────────────────────────────────────────────

/// Outcome of a failed [`PermissionCheck`](crate::check::PermissionCheck).
///
/// Keeps a malformed requirement (`Invalid`, a 400) apart from a valid
/// requirement the caller does not meet (`Denied`, a 403).
#[derive(Debug, Clone, PartialEq)]
pub enum AuthzError {
    Invalid(SchemaError),
    Denied(Denial),
}

impl AuthzError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthzError::Invalid(err) => err.status_code(),
            AuthzError::Denied(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AuthzError::Invalid(err) => err.to_json(),
            AuthzError::Denied(denial) => serde_json::json!({ "error": denial.message() }),
        }
    }
}

impl fmt::Display for AuthzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthzError::Invalid(err) => write!(f, "{err}"),
            AuthzError::Denied(denial) => write!(f, "Access denied: {}", denial.message()),
        }
    }
}

impl std::error::Error for AuthzError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthzError::Invalid(err) => Some(err),
            AuthzError::Denied(_) => None,
        }
    }
}

impl From<SchemaError> for AuthzError {
    fn from(err: SchemaError) -> Self {
        AuthzError::Invalid(err)
    }
}

impl From<Denial> for AuthzError {
    fn from(denial: Denial) -> Self {
        AuthzError::Denied(denial)
    }
}

// ── Configuration ──────────────────────────────────────────────────────

/// A single validation error detail from [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationDetail {
    pub key: String,
    pub message: String,
}

/// Error type for loading or validating engine configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O or YAML parsing error occurred while loading config.
    Load(String),
    /// Constraint violations on the loaded values.
    Validation(Vec<ConfigValidationDetail>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Validation(details) => {
                write!(f, "Config validation errors:")?;
                for detail in details {
                    write!(f, "\n  - {}: {}", detail.key, detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
