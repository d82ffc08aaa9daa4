//! Document resources: state, agent profile, and activity profile.
//!
//! A document's identity is its composite [`DocumentKey`]; its `sha` is a
//! content digest used as the ETag for optimistic concurrency, never as
//! identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::agent::Agent;
use crate::tenant::TenantId;

/// The three document resource kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    State,
    AgentProfile,
    ActivityProfile,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::State => "state",
            DocumentKind::AgentProfile => "agentProfile",
            DocumentKind::ActivityProfile => "activityProfile",
        }
    }
}

/// Composite key identifying a document within a tenant.
///
/// Which scoping fields are required depends on the kind: state needs
/// `activity_id` + `agent` (+ optional `registration`), activity profiles
/// need `activity_id`, agent profiles need `agent`. A key with no
/// `document_id` is partial; partial keys are only meaningful for listing
/// and (for state documents) multi-delete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentKey {
    pub tenant: TenantId,
    pub kind: DocumentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Uuid>,
}

impl DocumentKey {
    /// Returns `true` if `other` falls within this key's scope: every field
    /// set here must match, fields left unset match anything.
    ///
    /// Agents are compared by resolved identity.
    pub fn covers(&self, other: &DocumentKey) -> bool {
        if self.tenant != other.tenant || self.kind != other.kind {
            return false;
        }
        if let Some(id) = &self.document_id {
            if other.document_id.as_ref() != Some(id) {
                return false;
            }
        }
        if let Some(activity) = &self.activity_id {
            if other.activity_id.as_ref() != Some(activity) {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            match &other.agent {
                Some(theirs) if agent.same_identity(theirs) => {}
                _ => return false,
            }
        }
        if let Some(registration) = &self.registration {
            if other.registration.as_ref() != Some(registration) {
                return false;
            }
        }
        true
    }

    /// Returns `true` if both keys address the same document: every field
    /// equal, agents compared by resolved identity.
    pub fn same_document(&self, other: &DocumentKey) -> bool {
        let agents_match = match (&self.agent, &other.agent) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_identity(b),
            _ => false,
        };
        self.tenant == other.tenant
            && self.kind == other.kind
            && self.document_id == other.document_id
            && self.activity_id == other.activity_id
            && self.registration == other.registration
            && agents_match
    }
}

/// Document content, dispatched once at the store boundary by content type.
///
/// JSON content is held parsed so POST merges never re-inspect types at the
/// use site; everything else is text or opaque bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DocumentContent {
    Json(Map<String, Value>),
    Text(String),
    Binary(Vec<u8>),
}

impl DocumentContent {
    /// The exact bytes the `sha` digest covers.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            DocumentContent::Json(map) => {
                serde_json::to_vec(map).unwrap_or_default()
            }
            DocumentContent::Text(text) => text.as_bytes().to_vec(),
            DocumentContent::Binary(bytes) => bytes.clone(),
        }
    }

    /// Returns `true` for content that lives outside the store as a blob.
    pub fn is_binary(&self) -> bool {
        matches!(self, DocumentContent::Binary(_))
    }
}

/// Quoted uppercase hex SHA-1 over the exact content bytes, used verbatim as
/// the ETag.
pub fn etag_for(bytes: &[u8]) -> String {
    let digest = Sha1::digest(bytes);
    format!("\"{}\"", hex::encode_upper(digest))
}

/// A stored document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: DocumentKey,
    pub content: DocumentContent,
    pub content_type: String,
    pub sha: String,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Recompute `sha` from the current content.
    pub fn refresh_sha(&mut self) {
        self.sha = etag_for(&self.content.bytes());
    }
}
