use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;

/// Credential-scoped namespace owning a set of statements and documents.
///
/// Every store operation is scoped by a `TenantId`; records belonging to one
/// tenant are never visible to another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity a tenant's credential presents when storing statements.
///
/// The storer stamps `agent` into each statement's `authority` field; the
/// stamped value is excluded from canonical equality so resubmission under a
/// different credential of the same tenant is not a conflict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    pub tenant: TenantId,
    pub agent: Agent,
}

impl Authority {
    pub fn new(tenant: TenantId, agent: Agent) -> Self {
        Self { tenant, agent }
    }
}
