//! Statement ingestion engine for the Learning Record Exchange.
//!
//! This crate is the heart of lrx. It provides:
//! - Duplicate and conflict detection within a batch and against the ledger
//! - Reference-chain linking (`refs`) across arbitrarily-ordered batches
//! - Void semantics for the voiding verb
//! - The two-phase batch storer that stages all of the above and flips
//!   statements visible atomically
//! - Attachment part parsing against declared statement hashes
//!
//! # Batch lifecycle
//!
//! `Received → Validated → PersistedInactive → Linked → Voided → Active`
//!
//! Transitions are strictly sequential; a failure aborts the remaining
//! stages and leaves already-persisted rows durable but invisible
//! (`active = false`).

pub mod attachments;
pub mod dedup;
pub mod error;
pub mod linker;
pub mod storer;
pub mod voiding;

pub use attachments::{
    check_declared_hashes, parse_part, AttachmentPart, AttachmentSink, MemorySink,
};
pub use dedup::{detect_duplicates, DedupOutcome};
pub use error::LedgerError;
pub use linker::Linker;
pub use storer::{BatchState, Storer};
pub use voiding::apply_voids;
