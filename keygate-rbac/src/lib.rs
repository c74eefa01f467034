//! Permission query engine for Keygate.
//!
//! Decides whether a caller's granted permissions satisfy a boolean
//! requirement. Used to gate root-key management calls and
//! permission-gated key verification.
//!
//! # Overview
//!
//! - **Permission identifiers** ([`permission`]) are either the legacy `*` or
//!   `resource.resourceId.action`, e.g. `api.api_3ZbHzBvAcQWj2K.read_key` or
//!   `ratelimit.*.limit`.
//! - **Queries** ([`Query`]) combine permission strings with `and` / `or`.
//!   On the wire a query is a bare string or `{"and": [...]}` / `{"or": [...]}`.
//! - **Grants** are the flat list of permission and role strings the caller
//!   holds.
//!
//! # Usage
//!
//! ```
//! use keygate_rbac::PermissionEngine;
//! use serde_json::json;
//!
//! let engine = PermissionEngine::default();
//! let query = json!({"and": ["api.*.read_api", "api.*.create_key"]});
//!
//! let decision = engine.evaluate_value(&query, &["api.*.read_api"]).unwrap();
//! assert_eq!(decision.message(), Some("Role api.*.create_key not allowed"));
//! ```
//!
//! # Outcomes
//!
//! Evaluation distinguishes two failures:
//!
//! - [`SchemaError`]: the query is malformed. Caller bug, maps to 400. The
//!   query is rejected before any evaluation.
//! - [`Decision::Denied`]: the query is valid but not satisfied. Normal
//!   business outcome, maps to 403. Leaves deny with `Role {x} not allowed`,
//!   an exhausted `or` with `No role matched`.
//!
//! [`PermissionCheck`] and [`authorize`] fold both into [`AuthzError`].
//!
//! # Wildcards
//!
//! With the default [`WildcardPolicy::Literal`], grants are matched by plain
//! string equality: a granted `*` only satisfies a `*` leaf. Callers that
//! want `*` (and `resource.*.action`) to imply narrower permissions either
//! expand grants themselves or configure [`WildcardPolicy::Expand`].

pub mod check;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod permission;
pub mod query;

pub use check::{authorize, PermissionCheck, PermissionHolder};
pub use config::{EngineConfig, WildcardPolicy};
pub use error::{AuthzError, ConfigError, IssueCode, PermissionError, SchemaError, SchemaIssue};
pub use evaluator::{evaluate, Decision, Denial, PermissionEngine, NO_ROLE_MATCHED};
pub use permission::{
    validate_permission, validate_resource_id, ApiAction, ApiId, Permission, RatelimitAction,
    RatelimitNamespaceId, Resource,
};
pub use query::{validate_query, Query, QueryValidator};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::check::{PermissionCheck, PermissionHolder};
    pub use crate::config::EngineConfig;
    pub use crate::error::{AuthzError, SchemaError};
    pub use crate::evaluator::{Decision, PermissionEngine};
    pub use crate::query::Query;
}
