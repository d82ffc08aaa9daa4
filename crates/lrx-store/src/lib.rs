//! Persistence boundary for the Learning Record Exchange.
//!
//! This crate defines the trait boundary the engines sit on top of, the
//! concrete predicate and pipeline values the read side constructs, and the
//! `RwLock`-guarded in-memory backend used by tests and embedding.
//!
//! # Key Types
//!
//! - [`StatementStore`] / [`DocumentStore`] — Store trait boundaries
//! - [`StatementFilter`] — Predicate over the statement ledger
//! - [`Pipeline`] / [`Stage`] — Grouping/aggregation query representation
//! - [`InMemoryStore`] — In-memory implementation of both traits

pub mod error;
pub mod filter;
pub mod memory;
pub mod pipeline;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use filter::{ActivityMatch, AgentMatch, SortOrder, StatementFilter};
pub use memory::InMemoryStore;
pub use pipeline::{
    AggregateResult, Dimension, Interval, ObjectBucket, Pipeline, Stage, TimeBucket,
};
pub use traits::{DocumentStore, StatementStore};
