//! Attachment part handling.
//!
//! The multipart body is split by an external parser; this module receives
//! the raw parts, extracts each part's header block, and checks the declared
//! `x-experience-api-hash` against the hashes the batch's statements
//! declare. Byte storage is delegated through [`AttachmentSink`].

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use lrx_store::{StoreError, StoreResult};
use lrx_types::{Statement, TenantId};

use crate::error::LedgerError;

/// One parsed attachment part: its headers' essentials plus the body bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentPart {
    pub content_type: String,
    pub hash: String,
    pub body: Vec<u8>,
}

/// Where attachment bytes go once validated. Storage itself is an external
/// collaborator; the in-memory sink backs the tests.
pub trait AttachmentSink: Send + Sync {
    fn store(
        &self,
        tenant: &TenantId,
        hash: &str,
        content_type: &str,
        body: &[u8],
    ) -> StoreResult<()>;
}

/// In-memory attachment sink for tests and embedding.
#[derive(Default)]
pub struct MemorySink {
    inner: RwLock<HashMap<(TenantId, String), (String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant: &TenantId, hash: &str) -> Option<(String, Vec<u8>)> {
        self.inner
            .read()
            .ok()?
            .get(&(tenant.clone(), hash.to_string()))
            .cloned()
    }
}

impl AttachmentSink for MemorySink {
    fn store(
        &self,
        tenant: &TenantId,
        hash: &str,
        content_type: &str,
        body: &[u8],
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        inner.insert(
            (tenant.clone(), hash.to_string()),
            (content_type.to_string(), body.to_vec()),
        );
        Ok(())
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse one raw multipart part into headers and body.
///
/// Parts delimit the header block from the body with a blank line, using
/// either CRLF or bare LF line endings; header names compare
/// case-insensitively. Both `content-type` and `x-experience-api-hash` are
/// required.
pub fn parse_part(raw: &[u8]) -> Result<AttachmentPart, LedgerError> {
    let delim: &[u8] = if find_subslice(raw, b"\r\n").is_some() {
        b"\r\n"
    } else {
        b"\n"
    };

    // Skip leading blank lines left over from the boundary split.
    let mut start = 0;
    while raw[start..].starts_with(delim) {
        start += delim.len();
    }
    let raw = &raw[start..];

    let blank = [delim, delim].concat();
    let split = find_subslice(raw, &blank).ok_or_else(|| {
        LedgerError::invalid("attachments", "part has no header/body separator")
    })?;
    let header_block = String::from_utf8_lossy(&raw[..split]);
    let body = raw[split + blank.len()..].to_vec();

    let mut headers: HashMap<String, String> = HashMap::new();
    for line in header_block.lines() {
        let Some((name, value)) = line.split_once(':') else {
            return Err(LedgerError::invalid(
                "attachments",
                format!("malformed part header `{line}`"),
            ));
        };
        headers.insert(
            name.trim().to_ascii_lowercase(),
            value.trim().to_string(),
        );
    }

    let content_type = headers.remove("content-type").ok_or_else(|| {
        LedgerError::invalid("attachments", "part is missing a content-type header")
    })?;
    let hash = headers.remove("x-experience-api-hash").ok_or_else(|| {
        LedgerError::invalid(
            "attachments",
            "part is missing an x-experience-api-hash header",
        )
    })?;

    Ok(AttachmentPart {
        content_type,
        hash,
        body,
    })
}

/// Check that every part's hash is declared by some statement in the batch.
pub fn check_declared_hashes(
    statements: &[Statement],
    parts: &[AttachmentPart],
) -> Result<(), LedgerError> {
    let declared: HashSet<&str> = statements
        .iter()
        .filter_map(|s| s.attachments.as_ref())
        .flatten()
        .filter_map(|a| a.sha2.as_deref())
        .collect();

    for part in parts {
        if !declared.contains(part.hash.as_str()) {
            return Err(LedgerError::invalid(
                "attachments",
                format!(
                    "attachment hash `{}` is not declared by any statement",
                    part.hash
                ),
            ));
        }
    }
    Ok(())
}
