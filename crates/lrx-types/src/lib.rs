//! Foundation types for the Learning Record Exchange (lrx).
//!
//! This crate provides the core identity, statement, and document types used
//! throughout the lrx system. Every other lrx crate depends on `lrx-types`.
//!
//! # Key Types
//!
//! - [`TenantId`] — Credential-scoped namespace owning statements and documents
//! - [`Authority`] — Tenant identity snapshot stamped onto stored statements
//! - [`Agent`] / [`IdentityKey`] — xAPI actors and their identifying key
//! - [`Statement`] / [`StatementObject`] — The immutable actor-verb-object event
//! - [`StatementRecord`] — Persisted envelope carrying `active`/`voided`/`refs`
//! - [`Document`] / [`DocumentKey`] — ETag-guarded key/value resources
//! - [`FieldError`] — Unit of aggregated validation reporting

pub mod agent;
pub mod document;
pub mod error;
pub mod statement;
pub mod tenant;

pub use agent::{Account, Agent, Identity, IdentityKey};
pub use document::{
    etag_for, Document, DocumentContent, DocumentKey, DocumentKind,
};
pub use error::FieldError;
pub use statement::{
    Activity, ActivityDefinition, ActivityList, AttachmentHeader, Context, ContextActivities,
    Statement, StatementObject, StatementRef, StatementRecord, SubStatement, Verb, VOID_VERB,
};
pub use tenant::{Authority, TenantId};
