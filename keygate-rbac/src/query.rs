//! Permission queries.
//!
//! A query is a boolean expression over permission strings. On the wire it
//! is either a bare string or an object with exactly one of `and` / `or`:
//!
//! ```json
//! {"and": ["api.*.read_api", {"or": ["api.*.create_key", "*"]}]}
//! ```
//!
//! Raw JSON only becomes a [`Query`] through [`QueryValidator`], which
//! rejects every other shape with a [`SchemaError`] listing all issues.
//! `Query` values built in Rust are re-checked by
//! [`PermissionEngine`](crate::evaluator::PermissionEngine) before evaluation,
//! since the builders cannot stop an empty `and`/`or`.

use crate::config::EngineConfig;
use crate::error::{IssueCode, SchemaError, SchemaIssue};
use crate::permission::Permission;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

const AND: &str = "and";
const OR: &str = "or";
const ROOT: &str = "query";

/// A permission requirement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub enum Query {
    /// The grant set must contain this string. May be a legacy role name.
    Leaf(String),
    /// Every member must hold, checked left to right.
    And(Vec<Query>),
    /// At least one member must hold, checked left to right.
    Or(Vec<Query>),
}

impl Query {
    pub fn leaf(value: impl Into<String>) -> Self {
        Query::Leaf(value.into())
    }

    pub fn and<I, Q>(members: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<Query>,
    {
        Query::And(members.into_iter().map(Into::into).collect())
    }

    pub fn or<I, Q>(members: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<Query>,
    {
        Query::Or(members.into_iter().map(Into::into).collect())
    }

    /// Nesting depth; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Query::Leaf(_) => 1,
            Query::And(members) | Query::Or(members) => {
                1 + members.iter().map(Query::depth).max().unwrap_or(0)
            }
        }
    }

    /// Every leaf value, left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Query::Leaf(value) => out.push(value),
            Query::And(members) | Query::Or(members) => {
                for member in members {
                    member.collect_leaves(out);
                }
            }
        }
    }

    /// The wire form of this query.
    pub fn to_value(&self) -> Value {
        match self {
            Query::Leaf(value) => Value::String(value.clone()),
            Query::And(members) => combinator_value(AND, members.iter().map(Query::to_value)),
            Query::Or(members) => combinator_value(OR, members.iter().map(Query::to_value)),
        }
    }
}

fn combinator_value(key: &str, members: impl Iterator<Item = Value>) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), Value::Array(members.collect()));
    Value::Object(map)
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Query::Leaf(value.to_string())
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Query::Leaf(value)
    }
}

impl From<Permission> for Query {
    fn from(permission: Permission) -> Self {
        Query::Leaf(permission.to_string())
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl TryFrom<Value> for Query {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        validate_query(&value)
    }
}

/// Validate a raw query with the default [`EngineConfig`].
pub fn validate_query(value: &Value) -> Result<Query, SchemaError> {
    QueryValidator::default().parse(value)
}

/// Structural checks for queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryValidator {
    max_depth: usize,
    strict_leaves: bool,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl QueryValidator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            strict_leaves: config.strict_leaves,
        }
    }

    /// Turn a raw JSON query into a [`Query`], or report every issue found.
    pub fn parse(&self, value: &Value) -> Result<Query, SchemaError> {
        let mut issues = Vec::new();
        match self.parse_node(value, ROOT, 1, &mut issues) {
            Some(query) if issues.is_empty() => Ok(query),
            _ => Err(self.reject(value.clone(), issues)),
        }
    }

    /// Re-check a [`Query`] built in Rust: non-empty lists, depth, strict leaves.
    pub fn check(&self, query: &Query) -> Result<(), SchemaError> {
        let mut issues = Vec::new();
        self.check_node(query, ROOT, 1, &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(self.reject(self.echo(query, 1), issues))
        }
    }

    /// Wire form of `query` for error reports, with `null` past `max_depth`.
    fn echo(&self, query: &Query, depth: usize) -> Value {
        if depth > self.max_depth {
            return Value::Null;
        }
        let (key, members) = match query {
            Query::Leaf(leaf) => return Value::String(leaf.clone()),
            Query::And(members) => (AND, members),
            Query::Or(members) => (OR, members),
        };
        combinator_value(key, members.iter().map(|member| self.echo(member, depth + 1)))
    }

    fn reject(&self, input: Value, issues: Vec<SchemaIssue>) -> SchemaError {
        tracing::debug!(
            input = %input,
            issues = issues.len(),
            "rejected malformed permission query"
        );
        SchemaError::new(input, issues)
    }

    fn parse_node(
        &self,
        value: &Value,
        path: &str,
        depth: usize,
        issues: &mut Vec<SchemaIssue>,
    ) -> Option<Query> {
        if depth > self.max_depth {
            issues.push(self.too_deep(path));
            return None;
        }

        match value {
            Value::String(leaf) => {
                self.check_leaf(leaf, path, issues);
                Some(Query::Leaf(leaf.clone()))
            }
            Value::Object(map) => {
                for key in map.keys().filter(|k| k.as_str() != AND && k.as_str() != OR) {
                    issues.push(SchemaIssue::new(
                        format!("{path}.{key}"),
                        IssueCode::UnknownKey,
                        format!("unexpected key '{key}', expected only '{AND}' or '{OR}'"),
                    ));
                }

                match (map.get(AND), map.get(OR)) {
                    (Some(_), Some(_)) => {
                        issues.push(SchemaIssue::new(
                            path,
                            IssueCode::ConflictingShape,
                            format!("'{AND}' and '{OR}' cannot be combined in one object"),
                        ));
                        None
                    }
                    (None, None) => {
                        issues.push(SchemaIssue::new(
                            path,
                            IssueCode::MissingShape,
                            format!("object must have an '{AND}' or '{OR}' key"),
                        ));
                        None
                    }
                    (Some(members), None) => self
                        .parse_members(members, &format!("{path}.{AND}"), depth, issues)
                        .map(Query::And),
                    (None, Some(members)) => self
                        .parse_members(members, &format!("{path}.{OR}"), depth, issues)
                        .map(Query::Or),
                }
            }
            other => {
                issues.push(SchemaIssue::new(
                    path,
                    IssueCode::InvalidType,
                    format!(
                        "expected a permission string or an object with '{AND}' or '{OR}', got {}",
                        json_type(other)
                    ),
                ));
                None
            }
        }
    }

    fn parse_members(
        &self,
        value: &Value,
        path: &str,
        depth: usize,
        issues: &mut Vec<SchemaIssue>,
    ) -> Option<Vec<Query>> {
        let Value::Array(items) = value else {
            issues.push(SchemaIssue::new(
                path,
                IssueCode::InvalidType,
                format!("expected an array of queries, got {}", json_type(value)),
            ));
            return None;
        };
        if items.is_empty() {
            issues.push(self.empty_list(path));
            return None;
        }

        // Parse every member so all issues are reported, not just the first.
        let members: Vec<Option<Query>> = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.parse_node(item, &format!("{path}[{i}]"), depth + 1, issues))
            .collect();
        members.into_iter().collect()
    }

    fn check_node(&self, query: &Query, path: &str, depth: usize, issues: &mut Vec<SchemaIssue>) {
        if depth > self.max_depth {
            issues.push(self.too_deep(path));
            return;
        }

        let (key, members) = match query {
            Query::Leaf(leaf) => {
                self.check_leaf(leaf, path, issues);
                return;
            }
            Query::And(members) => (AND, members),
            Query::Or(members) => (OR, members),
        };
        let path = format!("{path}.{key}");
        if members.is_empty() {
            issues.push(self.empty_list(&path));
        }
        for (i, member) in members.iter().enumerate() {
            self.check_node(member, &format!("{path}[{i}]"), depth + 1, issues);
        }
    }

    fn check_leaf(&self, leaf: &str, path: &str, issues: &mut Vec<SchemaIssue>) {
        if !self.strict_leaves {
            return;
        }
        if let Err(err) = leaf.parse::<Permission>() {
            issues.push(SchemaIssue::new(
                path,
                IssueCode::InvalidPermission,
                format!("'{leaf}' is not a valid permission: {err}"),
            ));
        }
    }

    fn empty_list(&self, path: &str) -> SchemaIssue {
        SchemaIssue::new(path, IssueCode::EmptyList, "expected at least one query")
    }

    fn too_deep(&self, path: &str) -> SchemaIssue {
        SchemaIssue::new(
            path,
            IssueCode::TooDeep,
            format!("query nesting exceeds the maximum depth of {}", self.max_depth),
        )
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn depth_counts_root() {
        assert_eq!(Query::leaf("a").depth(), 1);
        assert_eq!(Query::and(["a", "b"]).depth(), 2);
        assert_eq!(Query::or([Query::and(["a"]), Query::leaf("b")]).depth(), 3);
    }

    #[test]
    fn leaves_in_order() {
        let query = Query::and([Query::leaf("a"), Query::or(["b", "c"])]);
        assert_eq!(query.leaves(), vec!["a", "b", "c"]);
    }

    #[test]
    fn wire_form_is_preserved() {
        let raw = json!({"and": ["a", {"or": ["b", "c"]}]});
        let query = validate_query(&raw).unwrap();
        assert_eq!(query.to_value(), raw);
    }

    #[test]
    fn nested_paths_are_reported() {
        let raw = json!({"and": ["a", {"or": []}]});
        let err = validate_query(&raw).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "query.and[1].or");
        assert_eq!(err.issues[0].code, IssueCode::EmptyList);
    }

    #[test]
    fn rejected_input_is_cut_at_max_depth() {
        let validator = QueryValidator::from_config(&EngineConfig::new().with_max_depth(2));
        let query = Query::and([Query::or([Query::and(["a"])]), Query::leaf("b")]);
        let err = validator.check(&query).unwrap_err();
        assert_eq!(err.input, json!({"and": [{"or": [null]}, "b"]}));
        assert_eq!(err.issues[0].path, "query.and[0].or[0]");
        assert_eq!(err.issues[0].code, IssueCode::TooDeep);
    }
}
