//! Query evaluation against a caller's grants.

use crate::config::{EngineConfig, WildcardPolicy, MAX_DEPTH_LIMIT};
use crate::error::{ConfigError, SchemaError};
use crate::permission::{Permission, WILDCARD};
use crate::query::{Query, QueryValidator};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Denial message of an `or` whose members all failed.
pub const NO_ROLE_MATCHED: &str = "No role matched";

/// Why a valid query was not satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    message: String,
    causes: Vec<String>,
}

impl Denial {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Denial of a single leaf: `Role {leaf} not allowed`.
    pub fn leaf(leaf: &str) -> Self {
        Self::new(format!("Role {leaf} not allowed"))
    }

    /// Caller-facing message, surfaced verbatim in error responses.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Per-branch messages of an exhausted `or`, only filled with
    /// `verbose_denials` enabled.
    pub fn causes(&self) -> &[String] {
        &self.causes
    }
}

/// Result of evaluating a valid query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_valid(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Allowed => None,
            Decision::Denied(denial) => Some(denial.message()),
        }
    }

    /// `Ok(())` when allowed, the [`Denial`] otherwise.
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => Err(denial),
        }
    }
}

impl Serialize for Decision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Decision::Allowed => {
                let mut state = serializer.serialize_struct("Decision", 1)?;
                state.serialize_field("valid", &true)?;
                state.end()
            }
            Decision::Denied(denial) => {
                let len = if denial.causes.is_empty() { 2 } else { 3 };
                let mut state = serializer.serialize_struct("Decision", len)?;
                state.serialize_field("valid", &false)?;
                state.serialize_field("message", &denial.message)?;
                if !denial.causes.is_empty() {
                    state.serialize_field("causes", &denial.causes)?;
                }
                state.end()
            }
        }
    }
}

/// A caller's granted permission and role strings, borrowed for one evaluation.
struct Grants<'a> {
    raw: Vec<&'a str>,
    /// Structured grants, parsed only under [`WildcardPolicy::Expand`].
    parsed: Vec<Permission>,
    policy: WildcardPolicy,
}

impl<'a> Grants<'a> {
    fn new<S: AsRef<str>>(grants: &'a [S], policy: WildcardPolicy) -> Self {
        let raw: Vec<&str> = grants.iter().map(AsRef::as_ref).collect();
        let parsed = match policy {
            WildcardPolicy::Literal => Vec::new(),
            WildcardPolicy::Expand => raw.iter().filter_map(|g| g.parse().ok()).collect(),
        };
        Self {
            raw,
            parsed,
            policy,
        }
    }

    fn satisfies(&self, leaf: &str) -> bool {
        if self.raw.iter().any(|g| *g == leaf) {
            return true;
        }
        match self.policy {
            WildcardPolicy::Literal => false,
            WildcardPolicy::Expand => {
                if self.raw.iter().any(|g| *g == WILDCARD) {
                    return true;
                }
                match leaf.parse::<Permission>() {
                    Ok(required) => self.parsed.iter().any(|g| g.covers(&required)),
                    Err(_) => false,
                }
            }
        }
    }
}

/// Validates and evaluates permission queries.
///
/// Stateless apart from its configuration; clone it freely and share it
/// across threads.
///
/// ```
/// use keygate_rbac::{PermissionEngine, Query};
///
/// let engine = PermissionEngine::default();
/// let query = Query::or(["api.*.read_api", "ratelimit.*.limit"]);
/// let decision = engine.evaluate(&query, &["ratelimit.*.limit"]).unwrap();
/// assert!(decision.is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermissionEngine {
    config: EngineConfig,
    validator: QueryValidator,
}

impl PermissionEngine {
    /// Build an engine, clamping `max_depth` into `1..=1024`.
    ///
    /// Use [`try_new`](Self::try_new) to reject an out-of-range config instead.
    pub fn new(mut config: EngineConfig) -> Self {
        let clamped = config.max_depth.clamp(1, MAX_DEPTH_LIMIT);
        if clamped != config.max_depth {
            tracing::warn!(
                requested = config.max_depth,
                max_depth = clamped,
                "max_depth out of range, clamped"
            );
            config.max_depth = clamped;
        }
        let validator = QueryValidator::from_config(&config);
        Self { config, validator }
    }

    /// Build an engine from a config that passes [`EngineConfig::validate`].
    pub fn try_new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Turn a raw JSON query into a [`Query`] under this engine's limits.
    pub fn validate_query(&self, value: &serde_json::Value) -> Result<Query, SchemaError> {
        self.validator.parse(value)
    }

    /// Structurally check a [`Query`] built in Rust.
    pub fn validate(&self, query: &Query) -> Result<(), SchemaError> {
        self.validator.check(query)
    }

    /// Validate `query`, then evaluate it against `grants`.
    ///
    /// A malformed query is never evaluated, not even partially.
    pub fn evaluate<S: AsRef<str>>(
        &self,
        query: &Query,
        grants: &[S],
    ) -> Result<Decision, SchemaError> {
        self.validate(query)?;
        Ok(self.decide(query, grants))
    }

    /// Validate a raw JSON query, then evaluate it against `grants`.
    pub fn evaluate_value<S: AsRef<str>>(
        &self,
        value: &serde_json::Value,
        grants: &[S],
    ) -> Result<Decision, SchemaError> {
        let query = self.validate_query(value)?;
        Ok(self.decide(&query, grants))
    }

    /// Evaluate a query that has already passed this engine's validation.
    pub(crate) fn decide<S: AsRef<str>>(&self, query: &Query, grants: &[S]) -> Decision {
        let grants = Grants::new(grants, self.config.wildcard);
        let decision = self.eval(query, &grants);
        if let Decision::Denied(denial) = &decision {
            tracing::debug!(reason = denial.message(), "permission query denied");
        }
        decision
    }

    fn eval(&self, query: &Query, grants: &Grants<'_>) -> Decision {
        match query {
            Query::Leaf(leaf) => {
                let matched = grants.satisfies(leaf);
                tracing::trace!(leaf = %leaf, matched, "leaf comparison");
                if matched {
                    Decision::Allowed
                } else {
                    Decision::Denied(Denial::leaf(leaf))
                }
            }
            Query::And(members) => {
                for member in members {
                    let decision = self.eval(member, grants);
                    if !decision.is_valid() {
                        return decision;
                    }
                }
                Decision::Allowed
            }
            Query::Or(members) => {
                let mut causes = Vec::new();
                for member in members {
                    match self.eval(member, grants) {
                        Decision::Allowed => return Decision::Allowed,
                        Decision::Denied(denial) if self.config.verbose_denials => {
                            causes.push(denial.message);
                        }
                        Decision::Denied(_) => {}
                    }
                }
                Decision::Denied(Denial {
                    message: NO_ROLE_MATCHED.to_string(),
                    causes,
                })
            }
        }
    }
}

/// Validate and evaluate `query` with the default [`EngineConfig`].
pub fn evaluate<S: AsRef<str>>(query: &Query, grants: &[S]) -> Result<Decision, SchemaError> {
    PermissionEngine::default().evaluate(query, grants)
}
