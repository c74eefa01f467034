//! Permission identifiers.
//!
//! A permission is either the legacy wildcard `*` or a structured
//! `resource.resourceId.action` triple:
//!
//! ```text
//! api.*.read_api
//! api.api_3ZbHzBvAcQWj2K.create_key
//! ratelimit.rl_9dXr2mLQpTn8.limit
//! ```
//!
//! Each resource owns its id prefix and its closed set of actions. The
//! string predicates ([`validate_permission`], [`validate_resource_id`]) and
//! the typed parse ([`Permission::from_str`]) share the same grammar.

use crate::error::PermissionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The legacy "every permission" wildcard, also used as a resource-id wildcard.
pub const WILDCARD: &str = "*";

/// Characters allowed after the `<prefix>_` of a resource id.
///
/// Base58: digits and ASCII letters minus `0`, `O`, `I` and `l`.
pub const ID_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const ID_MIN_LEN: usize = 8;
const ID_MAX_LEN: usize = 32;

fn is_id_char(c: u8) -> bool {
    matches!(c, b'1'..=b'9' | b'A'..=b'H' | b'J'..=b'N' | b'P'..=b'Z' | b'a'..=b'k' | b'm'..=b'z')
}

/// Check a resource id against `^{prefix}_[base58]{8,32}$`, or the `*` wildcard.
///
/// No normalization is applied: the check is case-sensitive and does not trim.
pub fn validate_resource_id(prefix: &str, value: &str) -> bool {
    if value == WILDCARD {
        return true;
    }
    let Some(rest) = value
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };
    (ID_MIN_LEN..=ID_MAX_LEN).contains(&rest.len()) && rest.bytes().all(is_id_char)
}

/// Check whether `value` is a valid permission identifier.
///
/// Equivalent to `value.parse::<Permission>().is_ok()`.
pub fn validate_permission(value: &str) -> bool {
    value.parse::<Permission>().is_ok()
}

// ── Resources ──────────────────────────────────────────────────────────

/// A namespace of permission identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Api,
    Ratelimit,
}

impl Resource {
    /// Every supported resource, in declaration order.
    pub const ALL: [Resource; 2] = [Resource::Api, Resource::Ratelimit];

    /// The first segment of a permission string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Resource::Api => "api",
            Resource::Ratelimit => "ratelimit",
        }
    }

    /// The prefix of concrete ids for this resource (`api_…`, `rl_…`).
    pub const fn id_prefix(&self) -> &'static str {
        match self {
            Resource::Api => "api",
            Resource::Ratelimit => "rl",
        }
    }

    /// The action names this resource accepts.
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Resource::Api => ApiAction::NAMES,
            Resource::Ratelimit => RatelimitAction::NAMES,
        }
    }

    /// Look up a resource by its permission-string name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Actions ────────────────────────────────────────────────────────────

macro_rules! actions {
    (
        $(#[$meta:meta])*
        $name:ident for $resource:path {
            $($variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];
            pub const NAMES: &'static [&'static str] = &[$($text,)+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = PermissionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(PermissionError::UnknownAction {
                        resource: $resource,
                        action: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

actions! {
    /// Actions on the `api` resource.
    ApiAction for Resource::Api {
        ReadApi => "read_api",
        CreateApi => "create_api",
        DeleteApi => "delete_api",
        UpdateApi => "update_api",
        CreateKey => "create_key",
        UpdateKey => "update_key",
        DeleteKey => "delete_key",
        ReadKey => "read_key",
    }
}

actions! {
    /// Actions on the `ratelimit` resource.
    RatelimitAction for Resource::Ratelimit {
        Limit => "limit",
        CreateNamespace => "create_namespace",
        ReadNamespace => "read_namespace",
        UpdateNamespace => "update_namespace",
        DeleteNamespace => "delete_namespace",
    }
}

// ── Resource ids ───────────────────────────────────────────────────────

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident for $resource:expr) => {
        $(#[$meta])*
        ///
        /// Either the `*` wildcard or a validated concrete id. Only
        /// constructible through [`parse`](Self::parse) or
        /// [`wildcard`](Self::wildcard).
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(Option<String>);

        impl $name {
            pub const RESOURCE: Resource = $resource;

            /// The id matching every instance of the resource.
            pub fn wildcard() -> Self {
                Self(None)
            }

            pub fn parse(value: &str) -> Result<Self, PermissionError> {
                if value == WILDCARD {
                    Ok(Self(None))
                } else if validate_resource_id(Self::RESOURCE.id_prefix(), value) {
                    Ok(Self(Some(value.to_string())))
                } else {
                    Err(PermissionError::BadResourceId {
                        resource: Self::RESOURCE,
                        value: value.to_string(),
                    })
                }
            }

            pub fn is_wildcard(&self) -> bool {
                self.0.is_none()
            }

            pub fn as_str(&self) -> &str {
                self.0.as_deref().unwrap_or(WILDCARD)
            }

            /// A wildcard covers every id; a concrete id covers only itself.
            pub fn covers(&self, other: &Self) -> bool {
                self.is_wildcard() || self == other
            }
        }

        impl FromStr for $name {
            type Err = PermissionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

resource_id! {
    /// Id of an API (`api_…`).
    ApiId for Resource::Api
}

resource_id! {
    /// Id of a ratelimit namespace (`rl_…`).
    RatelimitNamespaceId for Resource::Ratelimit
}

// ── Permission ─────────────────────────────────────────────────────────

/// A parsed permission identifier.
///
/// Serializes to and from its canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    /// Legacy `*`: every permission in every resource.
    Wildcard,
    Api {
        id: ApiId,
        action: ApiAction,
    },
    Ratelimit {
        id: RatelimitNamespaceId,
        action: RatelimitAction,
    },
}

impl Permission {
    pub fn api(id: ApiId, action: ApiAction) -> Self {
        Permission::Api { id, action }
    }

    pub fn ratelimit(id: RatelimitNamespaceId, action: RatelimitAction) -> Self {
        Permission::Ratelimit { id, action }
    }

    /// Whether holding `self` implies holding `other`.
    ///
    /// `*` covers everything. Otherwise resource and action must be equal and
    /// the id of `self` must be `*` or equal to the id of `other`.
    pub fn covers(&self, other: &Permission) -> bool {
        match (self, other) {
            (Permission::Wildcard, _) => true,
            (
                Permission::Api { id, action },
                Permission::Api {
                    id: other_id,
                    action: other_action,
                },
            ) => action == other_action && id.covers(other_id),
            (
                Permission::Ratelimit { id, action },
                Permission::Ratelimit {
                    id: other_id,
                    action: other_action,
                },
            ) => action == other_action && id.covers(other_id),
            _ => false,
        }
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WILDCARD {
            return Ok(Permission::Wildcard);
        }

        let segments: Vec<&str> = s.split('.').collect();
        let &[resource, id, action] = segments.as_slice() else {
            return Err(PermissionError::WrongSegmentCount(segments.len()));
        };

        match Resource::from_name(resource) {
            Some(Resource::Api) => Ok(Permission::Api {
                id: id.parse()?,
                action: action.parse()?,
            }),
            Some(Resource::Ratelimit) => Ok(Permission::Ratelimit {
                id: id.parse()?,
                action: action.parse()?,
            }),
            None => Err(PermissionError::UnknownResource(resource.to_string())),
        }
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.to_string()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Wildcard => f.write_str(WILDCARD),
            Permission::Api { id, action } => {
                write!(f, "{}.{}.{}", Resource::Api, id, action)
            }
            Permission::Ratelimit { id, action } => {
                write!(f, "{}.{}.{}", Resource::Ratelimit, id, action)
            }
        }
    }
}
