//! Per-kind document policy, as data.

use lrx_types::{DocumentKey, DocumentKind, FieldError};

/// What `destroy` accepts for a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestroyPolicy {
    /// The full composite key is required; one document is deleted.
    ExactKey,
    /// A partial key (no document id) deletes everything it covers.
    AllowPartial,
}

/// Configuration for one document kind.
///
/// Passed to the single generic engine; there are no per-kind subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentConfig {
    pub kind: DocumentKind,
    /// Wire name of the identifier field, for error messages.
    pub identifier: &'static str,
    pub requires_activity: bool,
    pub requires_agent: bool,
    pub allows_registration: bool,
    pub destroy_policy: DestroyPolicy,
    /// State documents may be replaced by a bare PUT without ETag headers.
    pub etag_exempt_put: bool,
}

impl DocumentConfig {
    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::State => Self {
                kind,
                identifier: "stateId",
                requires_activity: true,
                requires_agent: true,
                allows_registration: true,
                destroy_policy: DestroyPolicy::AllowPartial,
                etag_exempt_put: true,
            },
            DocumentKind::AgentProfile => Self {
                kind,
                identifier: "profileId",
                requires_activity: false,
                requires_agent: true,
                allows_registration: false,
                destroy_policy: DestroyPolicy::ExactKey,
                etag_exempt_put: false,
            },
            DocumentKind::ActivityProfile => Self {
                kind,
                identifier: "profileId",
                requires_activity: true,
                requires_agent: false,
                allows_registration: false,
                destroy_policy: DestroyPolicy::ExactKey,
                etag_exempt_put: false,
            },
        }
    }

    /// Check a key's scoping fields against this configuration.
    ///
    /// `need_id` demands the identifier as well (show/store/exact destroy).
    pub fn check_key(&self, key: &DocumentKey, need_id: bool) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let kind = self.kind.as_str();

        if need_id && key.document_id.is_none() {
            errors.push(FieldError::new(
                self.identifier,
                format!("is required for {kind} documents"),
            ));
        }
        if self.requires_activity && key.activity_id.is_none() {
            errors.push(FieldError::new(
                "activityId",
                format!("is required for {kind} documents"),
            ));
        }
        if self.requires_agent && key.agent.is_none() {
            errors.push(FieldError::new(
                "agent",
                format!("is required for {kind} documents"),
            ));
        }
        if !self.allows_registration && key.registration.is_some() {
            errors.push(FieldError::new(
                "registration",
                format!("is not allowed for {kind} documents"),
            ));
        }
        errors
    }
}
