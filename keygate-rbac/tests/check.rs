use http::StatusCode;
use keygate_rbac::{
    authorize, AuthzError, Decision, EngineConfig, IssueCode, PermissionCheck, PermissionEngine,
    PermissionHolder, Query, WildcardPolicy,
};
use serde_json::json;

struct RootKey {
    id: String,
    permissions: Vec<String>,
}

impl RootKey {
    fn new(id: &str, permissions: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl PermissionHolder for RootKey {
    fn permissions(&self) -> &[String] {
        &self.permissions
    }
}

#[test]
fn check_passes() {
    let engine = PermissionEngine::default();
    let check = PermissionCheck::new(Query::leaf("api.*.create_key"), &engine).unwrap();
    let key = RootKey::new("key_1", &["api.*.create_key", "api.*.read_api"]);
    assert!(check.check(&key).is_ok(), "{}", key.id);
}

#[test]
fn check_rejects_with_403() {
    let engine = PermissionEngine::default();
    let check = PermissionCheck::new(
        Query::and(["api.*.read_api", "api.*.create_key"]),
        &engine,
    )
    .unwrap();
    let key = RootKey::new("key_1", &["api.*.read_api"]);

    let err = check.check(&key).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(
        err.to_json(),
        json!({"error": "Role api.*.create_key not allowed"})
    );
    match err {
        AuthzError::Denied(denial) => {
            assert_eq!(denial.message(), "Role api.*.create_key not allowed")
        }
        other => panic!("unexpected: {other}"),
    }
}

#[test]
fn malformed_requirement_never_builds() {
    let engine = PermissionEngine::default();
    let err = PermissionCheck::new(Query::Or(vec![]), &engine).unwrap_err();
    assert!(err.has_code(IssueCode::EmptyList));

    let err = PermissionCheck::from_value(&json!({"xor": ["a"]}), &engine).unwrap_err();
    assert!(err.has_code(IssueCode::MissingShape));
    assert!(err.has_code(IssueCode::UnknownKey));
}

#[test]
fn one_check_many_holders() {
    let engine = PermissionEngine::default();
    let check =
        PermissionCheck::from_value(&json!({"or": ["ratelimit.*.limit", "*"]}), &engine).unwrap();

    assert!(check.check(&RootKey::new("a", &["ratelimit.*.limit"])).is_ok());
    assert!(check.check(&RootKey::new("b", &["*"])).is_ok());
    assert!(check.check(&RootKey::new("c", &["api.*.read_api"])).is_err());
    assert_eq!(check.decide(&["*"]), Decision::Allowed);
    assert_eq!(check.query(), &Query::or(["ratelimit.*.limit", "*"]));
}

#[test]
fn check_follows_engine_policy() {
    let engine = PermissionEngine::new(EngineConfig::new().with_wildcard(WildcardPolicy::Expand));
    let check = PermissionCheck::new(Query::leaf("api.api_3ZbHzBvAcQWj2K.delete_key"), &engine)
        .unwrap();
    assert!(check.check(&RootKey::new("a", &["api.*.delete_key"])).is_ok());
    assert!(check.check(&vec!["*".to_string()]).is_ok());
}

#[test]
fn vec_and_slice_are_holders() {
    let engine = PermissionEngine::default();
    let check = PermissionCheck::new(Query::leaf("admin"), &engine).unwrap();
    let grants = vec!["admin".to_string()];
    assert!(check.check(&grants).is_ok());
    assert!(check.check(grants.as_slice()).is_ok());
}

#[test]
fn authorize_distinguishes_outcomes() {
    let engine = PermissionEngine::default();
    let key = RootKey::new("a", &["api.*.read_api"]);

    assert!(authorize(&engine, &json!("api.*.read_api"), &key).is_ok());

    let denied = authorize(&engine, &json!("api.*.delete_api"), &key).unwrap_err();
    assert!(matches!(denied, AuthzError::Denied(_)));
    assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);

    let invalid = authorize(&engine, &json!({"and": []}), &key).unwrap_err();
    assert!(matches!(invalid, AuthzError::Invalid(_)));
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(invalid.to_json()["error"], "Invalid permission query");
    assert_eq!(invalid.to_json()["details"][0]["code"], "empty_list");
}
