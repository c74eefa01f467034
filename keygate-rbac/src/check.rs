//! Reusable permission requirements for privileged operations.

use crate::error::{AuthzError, SchemaError};
use crate::evaluator::{Decision, PermissionEngine};
use crate::query::Query;

/// Anything carrying granted permission or role strings.
///
/// Implement this on key, root-key or session types so they can be passed
/// straight to [`PermissionCheck::check`].
pub trait PermissionHolder {
    /// Granted permissions and roles, in any order. May contain `*`.
    fn permissions(&self) -> &[String];
}

impl PermissionHolder for Vec<String> {
    fn permissions(&self) -> &[String] {
        self
    }
}

impl PermissionHolder for [String] {
    fn permissions(&self) -> &[String] {
        self
    }
}

/// A query validated once, then checked against many holders.
///
/// ```
/// use keygate_rbac::{PermissionCheck, PermissionEngine, Query};
///
/// let engine = PermissionEngine::default();
/// let check = PermissionCheck::new(
///     Query::and(["api.*.read_api", "api.*.create_key"]),
///     &engine,
/// )
/// .unwrap();
///
/// let grants = vec!["api.*.read_api".to_string()];
/// let err = check.check(&grants).unwrap_err();
/// assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
/// ```
#[derive(Debug, Clone)]
pub struct PermissionCheck {
    query: Query,
    engine: PermissionEngine,
}

impl PermissionCheck {
    /// Validate `query` under `engine`'s configuration.
    pub fn new(query: Query, engine: &PermissionEngine) -> Result<Self, SchemaError> {
        engine.validate(&query)?;
        Ok(Self {
            query,
            engine: engine.clone(),
        })
    }

    /// Build a check from a raw JSON query.
    pub fn from_value(
        value: &serde_json::Value,
        engine: &PermissionEngine,
    ) -> Result<Self, SchemaError> {
        let query = engine.validate_query(value)?;
        Ok(Self {
            query,
            engine: engine.clone(),
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Evaluate against raw grant strings.
    pub fn decide<S: AsRef<str>>(&self, grants: &[S]) -> Decision {
        self.engine.decide(&self.query, grants)
    }

    /// `Ok(())` if `holder` satisfies the query, [`AuthzError::Denied`] otherwise.
    pub fn check<H: PermissionHolder + ?Sized>(&self, holder: &H) -> Result<(), AuthzError> {
        self.decide(holder.permissions())
            .into_result()
            .map_err(AuthzError::Denied)
    }
}

/// Validate `query` and check it against `holder` in one step.
///
/// Malformed queries surface as [`AuthzError::Invalid`], unmet ones as
/// [`AuthzError::Denied`].
pub fn authorize<H: PermissionHolder + ?Sized>(
    engine: &PermissionEngine,
    query: &serde_json::Value,
    holder: &H,
) -> Result<(), AuthzError> {
    PermissionCheck::from_value(query, engine)?.check(holder)
}
