//! xAPI statements and their persisted envelope.
//!
//! A [`Statement`] is the immutable actor-verb-object event record. The
//! server wraps it in a [`StatementRecord`] which carries the mutable
//! bookkeeping fields (`active`, `voided`, `refs`) that never appear on the
//! wire statement itself.
//!
//! Canonical equality ([`Statement::matches`]) compares the key-sorted JSON
//! form with `stored` and `authority` removed; it is the basis for duplicate
//! and conflict detection.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::agent::Agent;
use crate::tenant::TenantId;

/// Verb URI that marks a statement as voiding its StatementRef target.
pub const VOID_VERB: &str = "http://adlnet.gov/expapi/verbs/voided";

/// A statement's verb: an IRI plus an optional display language map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An activity definition: the describable part of an activity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An activity object, identified by IRI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "objectType", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<ActivityDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A pointer to another statement by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementRef {
    #[serde(rename = "objectType")]
    pub object_type: String,
    pub id: Uuid,
}

impl StatementRef {
    pub fn new(id: Uuid) -> Self {
        Self {
            object_type: "StatementRef".into(),
            id,
        }
    }
}

/// A statement nested as the object of another statement.
///
/// SubStatements cannot carry an `id` and cannot nest further SubStatements;
/// the validator enforces both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubStatement {
    #[serde(rename = "objectType")]
    pub object_type: String,
    pub actor: Agent,
    pub verb: Verb,
    pub object: Box<StatementObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The object of a statement, dispatched on `objectType`.
///
/// A missing `objectType` means `Activity`, per the wire specification.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatementObject {
    Activity(Activity),
    Agent(Agent),
    Group(Agent),
    SubStatement(Box<SubStatement>),
    StatementRef(StatementRef),
}

impl<'de> Deserialize<'de> for StatementObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let object_type = value
            .get("objectType")
            .and_then(Value::as_str)
            .unwrap_or("Activity");

        match object_type {
            "Activity" => serde_json::from_value(value)
                .map(StatementObject::Activity)
                .map_err(D::Error::custom),
            "Agent" => serde_json::from_value(value)
                .map(StatementObject::Agent)
                .map_err(D::Error::custom),
            "Group" => serde_json::from_value(value)
                .map(StatementObject::Group)
                .map_err(D::Error::custom),
            "SubStatement" => serde_json::from_value(value)
                .map(StatementObject::SubStatement)
                .map_err(D::Error::custom),
            "StatementRef" => serde_json::from_value(value)
                .map(StatementObject::StatementRef)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "unknown objectType `{other}`"
            ))),
        }
    }
}

impl StatementObject {
    /// The id of the referenced statement, if this object is a StatementRef.
    pub fn statement_ref(&self) -> Option<Uuid> {
        match self {
            StatementObject::StatementRef(r) => Some(r.id),
            _ => None,
        }
    }

    /// The activity IRI, if this object is an activity.
    pub fn activity_id(&self) -> Option<&str> {
        match self {
            StatementObject::Activity(a) => Some(&a.id),
            _ => None,
        }
    }

    /// The agent or group value, if this object is one.
    pub fn agent(&self) -> Option<&Agent> {
        match self {
            StatementObject::Agent(a) | StatementObject::Group(a) => Some(a),
            _ => None,
        }
    }
}

/// One-or-many list of activities, as context activity lists appear on the
/// wire either as a single object or an array.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActivityList(pub Vec<Activity>);

impl<'de> Deserialize<'de> for ActivityList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(Activity),
            Many(Vec<Activity>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(activity) => ActivityList(vec![activity]),
            OneOrMany::Many(activities) => ActivityList(activities),
        })
    }
}

/// Context activity lists: parent, grouping, category, other.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextActivities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ActivityList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping: Option<ActivityList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ActivityList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<ActivityList>,
}

impl ContextActivities {
    /// All activities across the four lists, in list order.
    pub fn all(&self) -> impl Iterator<Item = &Activity> {
        [&self.parent, &self.grouping, &self.category, &self.other]
            .into_iter()
            .flatten()
            .flat_map(|list| list.0.iter())
    }
}

/// A statement's context.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<Agent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Agent>,
    #[serde(
        rename = "contextActivities",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub context_activities: Option<ContextActivities>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A declared attachment on a statement: the receiver checks the multipart
/// body against these hashes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachmentHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha2: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An xAPI statement as submitted and stored.
///
/// `id`, `timestamp`, `stored`, and `authority` are optional on input; the
/// storer stamps all four before persistence. Unknown fields round-trip
/// through `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub actor: Agent,
    pub verb: Verb,
    pub object: StatementObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<Agent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentHeader>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Statement {
    /// The key-sorted JSON form with `stored` and `authority` removed.
    ///
    /// `serde_json`'s object map is BTreeMap-backed, so serializing already
    /// yields key-sorted objects at every level.
    pub fn canonical_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("stored");
            map.remove("authority");
        }
        value
    }

    /// Structural equality, excluding the server-owned `stored` and
    /// `authority` fields.
    pub fn matches(&self, other: &Statement) -> bool {
        self.canonical_value() == other.canonical_value()
    }

    /// Duplicate-detection equality against a persisted copy.
    ///
    /// Like [`Statement::matches`], except that a submission without a
    /// `timestamp` also ignores the persisted copy's timestamp, which the
    /// server defaulted when the statement was first stored. Resubmitting
    /// the same timestamp-less statement is a no-op, not a conflict.
    pub fn matches_persisted(&self, persisted: &Statement) -> bool {
        if self.timestamp.is_some() {
            return self.matches(persisted);
        }
        let strip = |statement: &Statement| {
            let mut value = statement.canonical_value();
            if let Some(map) = value.as_object_mut() {
                map.remove("timestamp");
            }
            value
        };
        strip(self) == strip(persisted)
    }

    /// The id of the statement this one references, if its object is a
    /// StatementRef.
    pub fn statement_ref_target(&self) -> Option<Uuid> {
        self.object.statement_ref()
    }

    /// Returns `true` if this statement voids its StatementRef target.
    pub fn is_voiding(&self) -> bool {
        self.verb.id == VOID_VERB && self.statement_ref_target().is_some()
    }
}

/// The persisted envelope around a statement.
///
/// `active` stays false until the owning batch finishes linking and voiding;
/// `voided` and `refs` are mutated in place by later batches. `refs` is the
/// ordered transitive reference chain, nearest target first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub tenant: TenantId,
    pub id: Uuid,
    pub statement: Statement,
    pub active: bool,
    pub voided: bool,
    pub refs: Vec<Uuid>,
    pub stored: DateTime<Utc>,
}

impl StatementRecord {
    /// Wrap a stamped statement for insertion: inactive, unvoided, unlinked.
    pub fn new(tenant: TenantId, id: Uuid, statement: Statement, stored: DateTime<Utc>) -> Self {
        Self {
            tenant,
            id,
            statement,
            active: false,
            voided: false,
            refs: Vec::new(),
            stored,
        }
    }
}
