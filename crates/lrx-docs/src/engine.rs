//! The generic document engine.
//!
//! All three kinds flow through the same show/store/destroy/index code;
//! behavior differences come from [`DocumentConfig`]. ETag checks are
//! read-then-write: two concurrent mutations can both pass their
//! precondition before either commits, which is an accepted limitation of
//! this layer (a store-native conditional write would be needed to close
//! it).

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use lrx_store::{DocumentStore, StoreResult};
use lrx_types::{Document, DocumentContent, DocumentKey};
use lrx_validate::{validate_atom, Atom};

use crate::config::{DestroyPolicy, DocumentConfig};
use crate::error::DocumentError;

/// HTTP method the mutation arrived with; PUT replaces, POST merges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Put,
    Post,
}

/// One document mutation.
#[derive(Clone, Debug)]
pub struct StoreRequest {
    pub key: DocumentKey,
    pub content: Vec<u8>,
    pub content_type: String,
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    pub method: Method,
    /// Raw `Updated` header value; validated as a timestamp.
    pub updated: Option<String>,
}

/// Removes the backing blob of binary document content on destroy.
///
/// Blob storage is an external collaborator; this is only its boundary.
pub trait BlobRemover: Send + Sync {
    fn remove(&self, key: &DocumentKey, sha: &str) -> StoreResult<()>;
}

/// ETag-guarded CRUD over the three document resource kinds.
pub struct DocumentEngine<'a> {
    store: &'a dyn DocumentStore,
    blobs: Option<&'a dyn BlobRemover>,
}

impl<'a> DocumentEngine<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store, blobs: None }
    }

    /// Attach a blob remover for binary content cleanup.
    pub fn with_blob_remover(mut self, blobs: &'a dyn BlobRemover) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Read one document by its full key.
    pub fn show(&self, key: &DocumentKey) -> Result<Document, DocumentError> {
        let config = DocumentConfig::for_kind(key.kind);
        self.check_key(&config, key, true)?;
        self.store.get(key)?.ok_or(DocumentError::NotFound)
    }

    /// List documents under a partial key, optionally updated after `since`.
    pub fn index(
        &self,
        key: &DocumentKey,
        since: Option<&str>,
    ) -> Result<Vec<Document>, DocumentError> {
        let config = DocumentConfig::for_kind(key.kind);
        self.check_key(&config, key, false)?;
        let since = since.map(parse_updated).transpose()?;
        Ok(self.store.list(key, since)?)
    }

    /// Create or mutate one document under ETag guard.
    pub fn store(&self, request: StoreRequest) -> Result<Document, DocumentError> {
        let config = DocumentConfig::for_kind(request.key.kind);
        self.check_key(&config, &request.key, true)?;

        let updated_at = request
            .updated
            .as_deref()
            .map(parse_updated)
            .transpose()?
            .unwrap_or_else(Utc::now);

        let existing = self.store.get(&request.key)?;
        check_etag(
            existing.as_ref().map(|d| d.sha.as_str()),
            request.if_match.as_deref(),
            request.if_none_match.as_deref(),
            request.method == Method::Put && !config.etag_exempt_put,
        )?;

        let mime = mime_type(&request.content_type);
        let mut document = match (existing, request.method) {
            // POST over an existing document merges; everything else
            // replaces wholesale.
            (Some(existing), Method::Post) => merge(existing, mime, &request.content)?,
            _ => Document {
                key: request.key,
                content: parse_content(mime, request.content)?,
                content_type: mime.to_string(),
                sha: String::new(),
                updated_at,
            },
        };
        document.updated_at = updated_at;
        document.refresh_sha();

        debug!(
            kind = config.kind.as_str(),
            sha = %document.sha,
            "storing document"
        );
        self.store.put(document.clone())?;
        Ok(document)
    }

    /// Delete one document, or everything under a partial key where the
    /// kind's policy permits it.
    pub fn destroy(&self, key: &DocumentKey) -> Result<u64, DocumentError> {
        let config = DocumentConfig::for_kind(key.kind);

        if key.document_id.is_none() {
            if config.destroy_policy != DestroyPolicy::AllowPartial {
                return Err(DocumentError::invalid(
                    config.identifier,
                    format!(
                        "is required to delete {} documents",
                        config.kind.as_str()
                    ),
                ));
            }
            self.check_key(&config, key, false)?;
            self.remove_blobs(self.store.list(key, None)?)?;
            let deleted = self.store.delete_matching(key)?;
            debug!(kind = config.kind.as_str(), deleted, "destroyed documents");
            return Ok(deleted);
        }

        self.check_key(&config, key, true)?;
        let document = self.store.get(key)?.ok_or(DocumentError::NotFound)?;
        self.remove_blobs(vec![document])?;
        self.store.delete(key)?;
        Ok(1)
    }

    fn check_key(
        &self,
        config: &DocumentConfig,
        key: &DocumentKey,
        need_id: bool,
    ) -> Result<(), DocumentError> {
        let errors = config.check_key(key, need_id);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DocumentError::Validation(errors))
        }
    }

    fn remove_blobs(&self, documents: Vec<Document>) -> Result<(), DocumentError> {
        let Some(blobs) = self.blobs else {
            return Ok(());
        };
        for document in documents.iter().filter(|d| d.content.is_binary()) {
            blobs.remove(&document.key, &document.sha)?;
        }
        Ok(())
    }
}

fn parse_updated(raw: &str) -> Result<DateTime<Utc>, DocumentError> {
    let errors = validate_atom(Atom::Timestamp, "Updated", &Value::String(raw.into()));
    if !errors.is_empty() {
        return Err(DocumentError::Validation(errors));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| DocumentError::invalid("Updated", "is not a valid timestamp"))
}

/// Strip content-type parameters (`; charset=...`) down to the mime type.
fn mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

fn parse_content(mime: &str, bytes: Vec<u8>) -> Result<DocumentContent, DocumentError> {
    match mime {
        "application/json" => {
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|_| DocumentError::invalid("content", "must be parsable as JSON"))?;
            match value {
                Value::Object(map) => Ok(DocumentContent::Json(map)),
                _ => Err(DocumentError::invalid(
                    "content",
                    "JSON must contain an object at the top level",
                )),
            }
        }
        m if m.starts_with("text/") => String::from_utf8(bytes)
            .map(DocumentContent::Text)
            .map_err(|_| DocumentError::invalid("content", "text content must be valid UTF-8")),
        _ => Ok(DocumentContent::Binary(bytes)),
    }
}

fn merge(
    existing: Document,
    mime: &str,
    content: &[u8],
) -> Result<Document, DocumentError> {
    if existing.content_type != "application/json" || mime != "application/json" {
        return Err(DocumentError::invalid(
            "content",
            "both existing and incoming content types must be application/json to merge",
        ));
    }
    let DocumentContent::Json(mut base) = existing.content else {
        return Err(DocumentError::invalid(
            "content",
            "existing content is not a JSON object",
        ));
    };
    let incoming = match parse_content(mime, content.to_vec())? {
        DocumentContent::Json(map) => map,
        _ => unreachable!("application/json always parses to Json"),
    };

    // Shallow merge: new top-level keys win.
    for (key, value) in incoming {
        base.insert(key, value);
    }

    Ok(Document {
        content: DocumentContent::Json(base),
        ..existing
    })
}

/// Apply the ETag precondition rules against the current `sha`.
///
/// Header values compare after unquoting and uppercasing. `conflict_check`
/// is the bare-PUT rule; state documents switch it off.
fn check_etag(
    sha: Option<&str>,
    if_match: Option<&str>,
    if_none_match: Option<&str>,
    conflict_check: bool,
) -> Result<(), DocumentError> {
    if let Some(header) = if_match {
        if sha != Some(normalize_etag(header).as_str()) {
            return Err(DocumentError::PreconditionFailed(
                "Precondition (If-Match) failed.".into(),
            ));
        }
    } else if if_none_match == Some("*") && sha.is_some() {
        return Err(DocumentError::PreconditionFailed(
            "Precondition (If-None-Match) failed.".into(),
        ));
    } else if conflict_check && sha.is_some() && if_none_match.is_none() {
        return Err(DocumentError::Conflict(
            "Check the current state of the resource then set the \"If-Match\" header \
             with the current ETag to resolve the conflict."
                .into(),
        ));
    }
    Ok(())
}

fn normalize_etag(header: &str) -> String {
    let trimmed = header.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    format!("\"{}\"", unquoted.to_ascii_uppercase())
}
