//! xAPI agents, groups, and identity resolution.
//!
//! An agent is identified by exactly one of four inverse-functional keys.
//! [`Agent::identity`] resolves which key is present, in the fixed precedence
//! order `mbox`, `account`, `openid`, `mbox_sha1sum`. Groups without any key
//! are anonymous and identified only by their members.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An account on an external system, identified by home page and name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "homePage")]
    pub home_page: String,
    pub name: String,
}

/// An xAPI agent or group.
///
/// `object_type` is `"Agent"` (or absent) for individuals and `"Group"` for
/// groups; groups may carry a `member` list. Unknown fields round-trip
/// through `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "objectType", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbox_sha1sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Vec<Agent>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which inverse-functional identifier an agent carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKey {
    Mbox,
    Account,
    Openid,
    MboxSha1sum,
}

impl IdentityKey {
    /// Wire-format field name for this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKey::Mbox => "mbox",
            IdentityKey::Account => "account",
            IdentityKey::Openid => "openid",
            IdentityKey::MboxSha1sum => "mbox_sha1sum",
        }
    }
}

/// A resolved agent identity: the key that was present and its value.
///
/// For `account` the value is the serialized `{homePage, name}` object, so
/// identity comparison is structural.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub key: IdentityKey,
    pub value: Value,
}

impl Agent {
    /// Resolve which identity key this agent carries, if any.
    ///
    /// Returns `None` for anonymous groups (and malformed agents); callers
    /// decide whether that is an error.
    pub fn identity(&self) -> Option<Identity> {
        if let Some(mbox) = &self.mbox {
            return Some(Identity {
                key: IdentityKey::Mbox,
                value: Value::String(mbox.clone()),
            });
        }
        if let Some(account) = &self.account {
            let value = serde_json::to_value(account).unwrap_or(Value::Null);
            return Some(Identity {
                key: IdentityKey::Account,
                value,
            });
        }
        if let Some(openid) = &self.openid {
            return Some(Identity {
                key: IdentityKey::Openid,
                value: Value::String(openid.clone()),
            });
        }
        if let Some(sha) = &self.mbox_sha1sum {
            return Some(Identity {
                key: IdentityKey::MboxSha1sum,
                value: Value::String(sha.clone()),
            });
        }
        None
    }

    /// Returns `true` if this actor is a group.
    pub fn is_group(&self) -> bool {
        self.object_type.as_deref() == Some("Group")
    }

    /// Returns `true` if the given agent carries the same identity.
    ///
    /// Anonymous values (no identity key on either side) never match.
    pub fn same_identity(&self, other: &Agent) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbox_agent(mbox: &str) -> Agent {
        Agent {
            mbox: Some(mbox.into()),
            ..Agent::default()
        }
    }

    #[test]
    fn identity_precedence_prefers_mbox() {
        let agent = Agent {
            mbox: Some("mailto:a@example.com".into()),
            openid: Some("https://openid.example.com/a".into()),
            ..Agent::default()
        };
        let identity = agent.identity().unwrap();
        assert_eq!(identity.key, IdentityKey::Mbox);
    }

    #[test]
    fn account_identity_is_structural() {
        let a = Agent {
            account: Some(Account {
                home_page: "https://lms.example.com".into(),
                name: "alice".into(),
            }),
            ..Agent::default()
        };
        let b = Agent {
            name: Some("Alice".into()),
            account: Some(Account {
                home_page: "https://lms.example.com".into(),
                name: "alice".into(),
            }),
            ..Agent::default()
        };
        assert!(a.same_identity(&b));
    }

    #[test]
    fn anonymous_group_has_no_identity() {
        let group = Agent {
            object_type: Some("Group".into()),
            member: Some(vec![mbox_agent("mailto:a@example.com")]),
            ..Agent::default()
        };
        assert!(group.identity().is_none());
        assert!(!group.same_identity(&group.clone()));
    }

    #[test]
    fn agent_round_trips_unknown_fields() {
        let json = r#"{"mbox":"mailto:a@example.com","custom":"x"}"#;
        let agent: Agent = serde_json::from_str(json).unwrap();
        assert_eq!(agent.extra.get("custom"), Some(&Value::String("x".into())));
        let back = serde_json::to_value(&agent).unwrap();
        assert_eq!(back.get("custom"), Some(&Value::String("x".into())));
    }
}
